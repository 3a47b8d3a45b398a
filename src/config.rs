//! Configuration and paths

use crate::error::{Error, Result};
use crate::process::Invocation;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// All configurable paths and constants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub boot_dir: PathBuf,
    pub boot_command: Invocation,
    pub scripts_dir: PathBuf,
    pub upgrade_script: PathBuf,
    pub reboot_dir: PathBuf,
    pub reboot_command: PathBuf,
    pub ulpm_script: PathBuf,
    pub spool_dir: PathBuf,
    /// Inbox size at which the storage-full event fires
    pub storage_capacity: usize,
    pub poll_interval_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        let home = PathBuf::from(HOME_DIR);

        Self {
            boot_command: Invocation::new("./boot.sh"),
            scripts_dir: home.join("sms_scripts"),
            upgrade_script: PathBuf::from("./upgrade.sh"),
            reboot_dir: home.clone(),
            reboot_command: PathBuf::from("/sbin/reboot"),
            ulpm_script: PathBuf::from("./ulpm.sh"),
            spool_dir: home.join("sms_spool"),
            boot_dir: home,
            storage_capacity: 30,
            poll_interval_ms: 1000,
        }
    }
}

impl Config {
    /// Read a JSON config file. Keys not present keep their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        let config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Create config for testing with custom paths
    pub fn for_test(temp_dir: &Path) -> Self {
        Self {
            boot_dir: temp_dir.to_path_buf(),
            boot_command: Invocation::new("./boot.sh"),
            scripts_dir: temp_dir.join("sms_scripts"),
            upgrade_script: PathBuf::from("./upgrade.sh"),
            reboot_dir: temp_dir.to_path_buf(),
            reboot_command: PathBuf::from("/sbin/reboot"),
            ulpm_script: PathBuf::from("./ulpm.sh"),
            spool_dir: temp_dir.join("sms_spool"),
            storage_capacity: 5,
            poll_interval_ms: 10,
        }
    }
}

/// Home directory of the FX30 user
pub const HOME_DIR: &str = "/home/root";

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.boot_dir, PathBuf::from("/home/root"));
        assert_eq!(config.boot_command.to_string(), "./boot.sh");
        assert_eq!(config.scripts_dir, PathBuf::from("/home/root/sms_scripts"));
        assert_eq!(config.reboot_command, PathBuf::from("/sbin/reboot"));
    }

    #[test]
    fn test_test_config() {
        let temp = std::env::temp_dir();
        let config = Config::for_test(&temp);
        assert_eq!(config.boot_dir, temp);
        assert!(config.spool_dir.starts_with(&temp));
    }

    #[test]
    fn test_load_partial_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("taringa.json");
        std::fs::write(
            &path,
            r#"{"spool_dir": "/tmp/spool", "boot_command": {"program": "sh", "args": ["-c", "true"]}}"#,
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.spool_dir, PathBuf::from("/tmp/spool"));
        assert_eq!(config.boot_command.to_string(), "sh -c true");
        // Untouched keys keep defaults
        assert_eq!(config.scripts_dir, PathBuf::from("/home/root/sms_scripts"));
    }

    #[test]
    fn test_load_missing_file() {
        let temp = TempDir::new().unwrap();
        let result = Config::load(&temp.path().join("nope.json"));
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
