use clap::Parser;
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = transcastctl::Cli::parse();
    let default_filter = if cli.verbose {
        "info,transcast_core=debug,transcastctl=debug"
    } else {
        "warn"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = transcastctl::run(cli) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
