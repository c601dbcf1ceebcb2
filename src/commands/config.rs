use std::path::Path;

use crate::cli::ConfigAction;
use arbor::config::load_config_from;
use arbor::error::Result;

pub fn handle_config_command(action: Option<ConfigAction>, explicit: Option<&Path>) -> Result<()> {
    let config_path = super::resolve_config_path(explicit)?;
    match action {
        Some(ConfigAction::Path) => {
            println!("Config location: {}", config_path.display());
        }
        None | Some(ConfigAction::Show) => {
            let config = load_config_from(&config_path)?;
            println!("Config file: {}", config_path.display());
            if !config_path.exists() {
                println!("  (not present, showing defaults)");
            }
            println!();
            println!("Current configuration:");
            println!("  Server:");
            println!("    bind: {}", config.server.get_bind());
            println!(
                "    registration_bind: {}",
                config.server.get_registration_bind()
            );
            println!("  Replication:");
            println!("    enabled: {}", config.replication.get_enabled());
            println!(
                "    read_threshold: {}",
                config.replication.get_read_threshold()
            );
            println!("  Storage:");
            println!(
                "    request_timeout_ms: {}",
                config.storage.get_request_timeout_ms()
            );
        }
    }
    Ok(())
}
