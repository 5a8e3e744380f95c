//! AccessoryInformation record (manufacturer, model, serial, firmware)
//!
//! Stored as JSON in the persistence directory so the serial number the
//! controller sees stays the same across restarts.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::constants::{accessory, paths};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessoryInfo {
    pub name: String,
    #[serde(default = "default_manufacturer")]
    pub manufacturer: String,
    #[serde(default = "default_model")]
    pub model: String,
    pub serial_number: String,
    #[serde(default = "default_firmware")]
    pub firmware_revision: String,
}

fn default_manufacturer() -> String {
    accessory::DEFAULT_MANUFACTURER.to_string()
}

fn default_model() -> String {
    accessory::DEFAULT_MODEL.to_string()
}

fn default_firmware() -> String {
    accessory::DEFAULT_FIRMWARE.to_string()
}

/// Values supplied on the command line or through `HOMEKIT_TV_*`
#[derive(Debug, Clone, Default)]
pub struct InfoOverrides {
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub serial_number: Option<String>,
    pub firmware_revision: Option<String>,
}

/// `TV-` followed by the first 12 hex digits of the machine id
pub fn default_serial() -> String {
    fs::read_to_string(paths::MACHINE_ID)
        .ok()
        .and_then(|id| serial_from_machine_id(&id))
        .unwrap_or_else(|| accessory::FALLBACK_SERIAL.to_string())
}

fn serial_from_machine_id(id: &str) -> Option<String> {
    let hex: String = id
        .trim()
        .chars()
        .filter(char::is_ascii_hexdigit)
        .take(12)
        .collect();
    (hex.len() == 12).then(|| format!("TV-{}", hex.to_lowercase()))
}

impl AccessoryInfo {
    pub fn path(persist_dir: &Path) -> PathBuf {
        persist_dir.join(paths::ACCESSORY_FILE)
    }

    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            manufacturer: default_manufacturer(),
            model: default_model(),
            serial_number: default_serial(),
            firmware_revision: default_firmware(),
        }
    }

    /// Load the stored record (or start a new one), apply overrides and the
    /// current display name, then write it back
    pub fn resolve(persist_dir: &Path, name: &str, overrides: &InfoOverrides) -> Result<Self> {
        fs::create_dir_all(persist_dir)
            .with_context(|| format!("Failed to create persistence directory {:?}", persist_dir))?;

        let path = Self::path(persist_dir);
        let mut info = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<Self>(&contents) {
                Ok(info) => info,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Ignoring unreadable accessory info");
                    Self::new(name)
                }
            },
            Err(_) => {
                info!(path = %path.display(), "No stored accessory info, creating");
                Self::new(name)
            }
        };

        info.name = name.to_string();
        if let Some(v) = &overrides.manufacturer {
            info.manufacturer = v.clone();
        }
        if let Some(v) = &overrides.model {
            info.model = v.clone();
        }
        if let Some(v) = &overrides.serial_number {
            info.serial_number = v.clone();
        }
        if let Some(v) = &overrides.firmware_revision {
            info.firmware_revision = v.clone();
        }

        info.save(&path)?;
        Ok(info)
    }

    fn save(&self, path: &Path) -> Result<()> {
        let json =
            serde_json::to_string_pretty(self).context("Failed to serialize accessory info")?;
        fs::write(path, json)
            .with_context(|| format!("Failed to write accessory info to {:?}", path))?;
        Ok(())
    }
}
