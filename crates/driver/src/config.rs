//! Driver configuration
//!
//! The configuration file is the driver's registry: the device to bind, the
//! optional COM-port name, and the flag that suppresses external naming.
//! Absence of any value means "use defaults", never an error.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DriverConfig {
    #[serde(default)]
    pub device: DeviceSettings,
    #[serde(default)]
    pub naming: NamingSettings,
    #[serde(default)]
    pub log: LogSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceSettings {
    /// USB vendor id to bind (Prolific)
    #[serde(default = "DeviceSettings::default_vendor_id")]
    pub vendor_id: u16,
    /// USB product id to bind (PL2303)
    #[serde(default = "DeviceSettings::default_product_id")]
    pub product_id: u16,
}

impl DeviceSettings {
    fn default_vendor_id() -> u16 {
        0x067B
    }

    fn default_product_id() -> u16 {
        0x2303
    }
}

impl Default for DeviceSettings {
    fn default() -> Self {
        DeviceSettings {
            vendor_id: Self::default_vendor_id(),
            product_id: Self::default_product_id(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamingSettings {
    /// Suppress the COM-port symbolic link entirely
    #[serde(default)]
    pub skip_external_naming: bool,
    /// Explicit port name; defaults to COM{n} from the port counter
    #[serde(default)]
    pub port_name: Option<String>,
    /// Directory where interface markers and COM links are published
    #[serde(default = "NamingSettings::default_link_dir")]
    pub link_dir: PathBuf,
}

impl NamingSettings {
    fn default_link_dir() -> PathBuf {
        PathBuf::from("/run/pl2303d")
    }
}

impl Default for NamingSettings {
    fn default() -> Self {
        NamingSettings {
            skip_external_naming: false,
            port_name: None,
            link_dir: Self::default_link_dir(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogSettings {
    #[serde(default = "LogSettings::default_level")]
    pub level: String,
}

impl LogSettings {
    fn default_level() -> String {
        "info".to_string()
    }
}

impl Default for LogSettings {
    fn default() -> Self {
        LogSettings {
            level: Self::default_level(),
        }
    }
}

impl DriverConfig {
    /// Load from an explicit path, or fall back to defaults when no file
    /// exists at the default location
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let default = Self::default_path();
                if default.exists() {
                    Self::from_file(&default)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    fn from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        toml::from_str(&raw)
            .with_context(|| format!("Failed to parse config {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let raw = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, raw)
            .with_context(|| format!("Failed to write config {}", path.display()))?;
        Ok(())
    }

    pub fn default_path() -> PathBuf {
        PathBuf::from("/etc/pl2303d/config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_bind_pl2303() {
        let config = DriverConfig::default();
        assert_eq!(config.device.vendor_id, 0x067B);
        assert_eq!(config.device.product_id, 0x2303);
        assert!(!config.naming.skip_external_naming);
        assert!(config.naming.port_name.is_none());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: DriverConfig = toml::from_str(
            r#"
            [naming]
            skip_external_naming = true
            "#,
        )
        .unwrap();
        assert!(config.naming.skip_external_naming);
        assert_eq!(config.device.vendor_id, 0x067B);
        assert_eq!(config.log.level, "info");
    }

    #[test]
    fn test_save_and_reload_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = DriverConfig::default();
        config.naming.port_name = Some("COM7".to_string());
        config.save(&path).unwrap();

        let loaded = DriverConfig::load(Some(&path)).unwrap();
        assert_eq!(loaded.naming.port_name.as_deref(), Some("COM7"));
    }
}
