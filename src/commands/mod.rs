pub mod config;
pub mod serve;

pub use config::handle_config_command;
pub use serve::run_server;

use std::path::{Path, PathBuf};

use arbor::config::get_config_path;
use arbor::error::Result;

fn resolve_config_path(explicit: Option<&Path>) -> Result<PathBuf> {
    match explicit {
        Some(path) => Ok(path.to_path_buf()),
        None => get_config_path(),
    }
}
