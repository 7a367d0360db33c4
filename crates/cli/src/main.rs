//! env-cleaner postinstall binary.

// CLI binary needs to output to stdout/stderr - this is intentional
#![allow(clippy::print_stdout, clippy::print_stderr)]

use env_cleaner_install::cli::{self, EXIT_INSTALL, EXIT_OK, OkEnvelope, exit_code_for, render_error};
use env_cleaner_install::tracing::init_tracing;
use env_cleaner_provision::InstallReport;

fn main() {
    // NOTE: tracing may be unusable during a panic, so plain stderr is used.
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("Installer panicked: {panic_info}");
        eprintln!("Internal error occurred. Run with RUST_LOG=debug for more information.");
    }));

    let cli = cli::parse();

    if let Err(e) = init_tracing(&cli.tracing_config()) {
        eprintln!("{e:?}");
        std::process::exit(cli::EXIT_CLI);
    }

    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Fatal error: Failed to create tokio runtime: {e}");
            std::process::exit(EXIT_INSTALL);
        }
    };

    let exit_code = match rt.block_on(env_cleaner_install::run(&cli)) {
        Ok(report) => {
            print_report(&report, cli.json);
            EXIT_OK
        }
        Err(err) => {
            render_error(&err, cli.json);
            exit_code_for(&err)
        }
    };

    std::process::exit(exit_code);
}

fn print_report(report: &InstallReport, json_mode: bool) {
    if json_mode {
        match serde_json::to_string(&OkEnvelope::new(report)) {
            Ok(json) => println!("{json}"),
            Err(_) => eprintln!("Error serializing install report"),
        }
    } else {
        println!("{report}");
    }
}
