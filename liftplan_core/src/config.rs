//! Configuration file support for Liftplan.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/liftplan/config.toml`.

use crate::error::{Error, Result};
use crate::types::Equipment;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub equipment: EquipmentConfig,

    #[serde(default)]
    pub planning: PlanningConfig,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Equipment availability configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EquipmentConfig {
    #[serde(default = "default_equipment")]
    pub available: Vec<String>,
}

impl Default for EquipmentConfig {
    fn default() -> Self {
        Self {
            available: default_equipment(),
        }
    }
}

impl EquipmentConfig {
    /// Parse configured names into typed equipment. Unknown names are
    /// warned about and skipped.
    pub fn parsed(&self) -> BTreeSet<Equipment> {
        let mut out = BTreeSet::new();
        for name in &self.available {
            match Equipment::parse(name) {
                Some(equipment) => {
                    out.insert(equipment);
                }
                None => {
                    tracing::warn!("Unknown equipment name '{}' in config; skipping", name);
                }
            }
        }
        out
    }
}

/// Planning parameters configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlanningConfig {
    #[serde(default = "default_time_budget_minutes")]
    pub time_budget_minutes: u32,

    /// How many days of set-log history feed loading suggestions and
    /// previous bests.
    #[serde(default = "default_history_window_days")]
    pub history_window_days: i64,
}

impl Default for PlanningConfig {
    fn default() -> Self {
        Self {
            time_budget_minutes: default_time_budget_minutes(),
            history_window_days: default_history_window_days(),
        }
    }
}

// Default value functions
fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir().unwrap_or_else(|| {
        let home = std::env::var("HOME").expect("HOME environment variable not set");
        PathBuf::from(home).join(".local/share")
    });
    base.join("liftplan")
}

fn default_equipment() -> Vec<String> {
    vec![
        "barbell".into(),
        "dumbbells".into(),
        "rack".into(),
        "bench".into(),
        "pullup_bar".into(),
        "bodyweight".into(),
    ]
}

fn default_time_budget_minutes() -> u32 {
    60
}

fn default_history_window_days() -> i64 {
    90
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir().unwrap_or_else(|| {
            let home = std::env::var("HOME").expect("HOME environment variable not set");
            PathBuf::from(home).join(".config")
        });
        base.join("liftplan").join("config.toml")
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(!config.equipment.available.is_empty());
        assert_eq!(config.planning.time_budget_minutes, 60);
        assert_eq!(config.planning.history_window_days, 90);
    }

    #[test]
    fn test_config_roundtrip() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();

        assert_eq!(
            config.planning.time_budget_minutes,
            parsed.planning.time_budget_minutes
        );
        assert_eq!(config.equipment.available, parsed.equipment.available);
    }

    #[test]
    fn test_partial_config() {
        let toml_str = r#"
[planning]
time_budget_minutes = 45
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.planning.time_budget_minutes, 45);
        assert_eq!(config.planning.history_window_days, 90); // default
    }

    #[test]
    fn test_equipment_parsing_skips_unknown_names() {
        let config = EquipmentConfig {
            available: vec!["barbell".into(), "hyperdrive".into(), "Dumbbell".into()],
        };
        let parsed = config.parsed();
        assert!(parsed.contains(&Equipment::Barbell));
        assert!(parsed.contains(&Equipment::Dumbbells));
        assert_eq!(parsed.len(), 2);
    }
}
