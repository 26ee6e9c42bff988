//! Shell configuration loading

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tarfs_core::VfsConfig;

/// Settings for one shell session
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ShellConfig {
    /// User name shown in the prompt and written to the action log
    pub user: String,
    /// Host name shown in the prompt
    pub host: String,
    /// Tar archive to mount
    pub archive: PathBuf,
    /// CSV action log; `null` disables logging
    pub log_file: Option<PathBuf>,
    /// Commands executed before the interactive session starts
    pub startup_script: Option<PathBuf>,
    pub vfs: VfsConfig,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            user: "user".to_string(),
            host: "localhost".to_string(),
            archive: PathBuf::from("vfs.tar"),
            log_file: Some(PathBuf::from("actions.csv")),
            startup_script: None,
            vfs: VfsConfig::default(),
        }
    }
}

pub fn load_config(config_path: Option<&Path>) -> Result<ShellConfig> {
    match config_path {
        Some(path) => {
            let content = fs::read_to_string(path)
                .with_context(|| format!("failed to read config file {}", path.display()))?;
            let config: ShellConfig = serde_json::from_str(&content)
                .with_context(|| format!("invalid config file {}", path.display()))?;
            Ok(config)
        }
        None => Ok(ShellConfig::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_config_loading_default() {
        let config = load_config(None).unwrap();
        assert_eq!(config.user, "user");
        assert_eq!(config.archive, PathBuf::from("vfs.tar"));
        assert_eq!(config.vfs.home, "bs");
        assert!(config.startup_script.is_none());
    }

    #[test]
    fn test_config_loading_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        let config_json = r#"{
            "user": "balasova",
            "host": "vm",
            "archive": "/tmp/home.tar",
            "log_file": null,
            "startup_script": "start.sh",
            "vfs": { "mount_under_home": false }
        }"#;
        temp_file.write_all(config_json.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = load_config(Some(temp_file.path())).unwrap();
        assert_eq!(config.user, "balasova");
        assert_eq!(config.host, "vm");
        assert_eq!(config.archive, PathBuf::from("/tmp/home.tar"));
        assert!(config.log_file.is_none());
        assert_eq!(config.startup_script, Some(PathBuf::from("start.sh")));
        assert_eq!(config.vfs.home, "bs");
        assert!(!config.vfs.mount_under_home);
    }

    #[test]
    fn test_config_loading_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_config(Some(dir.path().join("missing.json").as_path())).is_err());

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(b"{ not json").unwrap();
        temp_file.flush().unwrap();
        let err = load_config(Some(temp_file.path())).unwrap_err();
        assert!(err.to_string().starts_with("invalid config file"));
    }
}
