use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "zonesync",
    about = "zonesync - unbound local-data cluster synchronizer",
    version = env!("CARGO_PKG_VERSION"),
    propagate_version = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[arg(short, long, env = "ZONESYNC_CONFIG", default_value = "config.json")]
    pub config: PathBuf,

    #[arg(short, long, env = "RUST_LOG", help = "Overrides the configured log level")]
    pub log_level: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Run the configured roles (default if no command specified)")]
    Serve,

    #[command(about = "Validate the configuration file and exit")]
    CheckConfig,
}
