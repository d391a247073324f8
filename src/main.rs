use std::process::ExitCode;

use clap::Parser;

use photofe::cli::{self, CliArgs};
use photofe::logger;
use photofe::settings::Settings;
use photofe::shell::Shell;

fn main() -> ExitCode {
    let args = CliArgs::parse();

    // Flags override the settings file for this run only.
    let mut settings = Settings::load();
    if let Some(capacity) = args.history {
        settings.history_capacity = capacity;
    }
    if let Some(quality) = args.quality {
        settings.jpeg_quality = quality;
    }

    logger::set_verbose(args.verbose);
    if settings.log_to_file {
        logger::init();
    }

    if !args.wants_shell() {
        return cli::run(args, &settings);
    }

    let mut shell = Shell::new(settings);
    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();
    match shell.run(stdin.lock(), &mut stdout) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            photofe::log_err!("Shell terminated: {}", e);
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}
