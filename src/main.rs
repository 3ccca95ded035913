use std::path::PathBuf;

use bidwatch::app::App;
use bidwatch::config::Config;
use clap::Parser;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "bidwatch", about = "Resilient marketplace auction watcher", version)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let config = match Config::load(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {e}");
            std::process::exit(1);
        }
    };

    config.init_logging();
    info!("bidwatch starting");

    if let Err(e) = App::run(config).await {
        error!(error = %e, "Fatal error");
        std::process::exit(1);
    }

    info!("bidwatch stopped");
}
