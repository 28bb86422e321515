use clap::Parser;
use excavate::report::Reporter;
use tracing_subscriber::EnvFilter;

mod cli;

const LOG_ENV: &str = "EXCAVATE_LOG";

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() {
    init_tracing();

    let cli = cli::Cli::parse();
    let mut reporter = Reporter::new(cli.verbosity());
    let options = match cli.into_options() {
        Ok(v) => v,
        Err(e) => {
            reporter.fatal(format!("excavate: failed to resolve working directory: {e}"));
            std::process::exit(2);
        }
    };

    if let Err(e) = excavate::app::run(&options, &mut reporter) {
        tracing::debug!(code = e.code(), "run failed");
        reporter.fatal(format!("excavate: {e}"));
        std::process::exit(1);
    }
}
