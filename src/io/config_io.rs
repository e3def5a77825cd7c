use std::fs;
use std::path::Path;

use crate::model::config::StoreConfig;

pub const CONFIG_FILE: &str = "systema.toml";

/// Error type for config file operations
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not parse systema.toml: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("could not edit systema.toml: {0}")]
    Edit(#[from] toml_edit::TomlError),
    #[error("unknown config key: {0}")]
    UnknownKey(String),
    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Largest accepted `recovery.prune_days` (about a century)
pub const MAX_PRUNE_DAYS: i64 = 36_500;

/// Keys `sy config` can read and write, as `section.key`
pub const KNOWN_KEYS: &[&str] = &[
    "autosave.debounce_ms",
    "recovery.enabled",
    "recovery.prune_days",
];

/// Read the config. A missing file is the default config; an unparseable one
/// is an error the caller decides how to surface.
pub fn read_config(data_root: &Path) -> Result<StoreConfig, ConfigError> {
    let path = data_root.join(CONFIG_FILE);
    if !path.exists() {
        return Ok(StoreConfig::default());
    }
    let text = fs::read_to_string(&path)?;
    Ok(toml::from_str(&text)?)
}

/// Read the raw document for round-trip-safe editing; empty when absent.
pub fn read_config_document(data_root: &Path) -> Result<toml_edit::DocumentMut, ConfigError> {
    let path = data_root.join(CONFIG_FILE);
    if !path.exists() {
        return Ok(toml_edit::DocumentMut::new());
    }
    let text = fs::read_to_string(&path)?;
    Ok(text.parse()?)
}

/// Write the document back, preserving comments and layout.
pub fn write_config_document(
    data_root: &Path,
    doc: &toml_edit::DocumentMut,
) -> Result<(), ConfigError> {
    fs::create_dir_all(data_root)?;
    fs::write(data_root.join(CONFIG_FILE), doc.to_string())?;
    Ok(())
}

/// Effective value of a known key, defaults included
pub fn get_value(config: &StoreConfig, key: &str) -> Result<String, ConfigError> {
    match key {
        "autosave.debounce_ms" => Ok(config.autosave.debounce_ms.to_string()),
        "recovery.enabled" => Ok(config.recovery.enabled.to_string()),
        "recovery.prune_days" => Ok(config.recovery.prune_days.to_string()),
        _ => Err(ConfigError::UnknownKey(key.to_string())),
    }
}

/// Set a known key in the document, typed according to the key
pub fn set_value(doc: &mut toml_edit::DocumentMut, key: &str, value: &str) -> Result<(), ConfigError> {
    let (section, name) = key
        .split_once('.')
        .filter(|_| KNOWN_KEYS.contains(&key))
        .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;

    let invalid = || ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    };
    let item = match key {
        "recovery.enabled" => toml_edit::value(value.parse::<bool>().map_err(|_| invalid())?),
        "autosave.debounce_ms" => {
            let ms = value.parse::<u64>().map_err(|_| invalid())?;
            toml_edit::value(i64::try_from(ms).map_err(|_| invalid())?)
        }
        _ => {
            let days = value.parse::<i64>().map_err(|_| invalid())?;
            if !(0..=MAX_PRUNE_DAYS).contains(&days) {
                return Err(invalid());
            }
            toml_edit::value(days)
        }
    };

    if !doc.contains_key(section) {
        doc[section] = toml_edit::Item::Table(toml_edit::Table::new());
    }
    doc[section][name] = item;
    Ok(())
}
