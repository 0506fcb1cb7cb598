mod cli;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::Cli;
use merchant_insights::settings::load_settings;

fn main() {
    let cli = Cli::parse();
    let settings = load_settings();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.log_level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = cli::run(cli, settings) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
