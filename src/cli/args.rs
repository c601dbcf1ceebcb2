use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "arbor")]
#[command(
    about = "Naming service for a distributed file store: directory tree, path locks and replica placement"
)]
pub struct Args {
    #[arg(long, global = true, help = "Config file to use instead of the default location")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(about = "Run the naming service")]
    Serve {
        #[arg(long, help = "Client service listen address (overrides server.bind)")]
        bind: Option<String>,

        #[arg(
            long,
            help = "Storage node registration listen address (overrides server.registration_bind)"
        )]
        registration_bind: Option<String>,
    },
    #[command(about = "Manage configuration")]
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    #[command(about = "Show current configuration values")]
    Show,
    #[command(about = "Show config file path")]
    Path,
}
