use clap::Parser;

mod cli;
mod commands;

use arbor::error;
use cli::{Args, Commands};

#[tokio::main]
async fn main() {
    match run().await {
        Ok(code) => {
            std::process::exit(code);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

async fn run() -> error::Result<i32> {
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("ARBOR_LOG").unwrap_or_else(|_| "info".to_string()))
        .init();

    let args = Args::parse();

    match args.command {
        Commands::Serve {
            bind,
            registration_bind,
        } => {
            commands::run_server(args.config.as_deref(), bind, registration_bind).await?;
            Ok(0)
        }
        Commands::Config { action } => {
            commands::handle_config_command(action, args.config.as_deref())?;
            Ok(0)
        }
    }
}
