mod app;
mod cli;
mod config;
mod error;
mod http;
mod paths;

use tracing_subscriber::EnvFilter;

fn main() {
    let cli = cli::Cli::parse_args();
    init_tracing(cli.verbose);

    if let Err(err) = app::run(cli) {
        let code = error::exit_code(&err);
        if code != error::EXIT_INTERRUPTED {
            eprintln!("error: {err:#}");
        }
        std::process::exit(code);
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_env("RAC1_LOG")
        .unwrap_or_else(|_| EnvFilter::new(format!("rac1={default_level}")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
