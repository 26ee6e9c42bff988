//! Configuration types for tarfs core

use serde::{Deserialize, Serialize};

/// Name of the home directory when none is configured.
pub const DEFAULT_HOME: &str = "bs";

/// How the archive is laid out in the virtual tree
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VfsConfig {
    /// Name of the single top-level directory that acts as the user's home.
    pub home: String,
    /// Place archive members under the home directory instead of at the root.
    pub mount_under_home: bool,
}

impl Default for VfsConfig {
    fn default() -> Self {
        Self {
            home: DEFAULT_HOME.to_string(),
            mount_under_home: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: VfsConfig = serde_json::from_str(r#"{ "mount_under_home": false }"#).unwrap();
        assert_eq!(config.home, "bs");
        assert!(!config.mount_under_home);
    }

    #[test]
    fn test_empty_config_is_default() {
        let config: VfsConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, VfsConfig::default());
    }
}
