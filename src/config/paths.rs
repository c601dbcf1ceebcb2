use crate::error::{ArborError, Result};
use directories::ProjectDirs;
use std::path::PathBuf;

pub fn get_config_dir() -> Result<PathBuf> {
    if let Ok(config_dir) = std::env::var("ARBOR_CONFIG_DIR") {
        return Ok(PathBuf::from(config_dir));
    }

    let project_dirs = ProjectDirs::from("com", "arbor", "arbor")
        .ok_or_else(|| ArborError::Config("Could not determine config directory".to_string()))?;

    Ok(project_dirs.config_dir().to_path_buf())
}

pub fn get_config_path() -> Result<PathBuf> {
    Ok(get_config_dir()?.join("config.toml"))
}
