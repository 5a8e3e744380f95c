//! Steam integration for accessory state changes
//!
//! Power off restarts Steam; selecting an input writes that account as
//! Steam's AutoLoginUser so the restarted client logs into it.

use anyhow::{Context, Result};
use tracing::info;

use crate::accessory::AccessoryHooks;
use crate::process;
use crate::steam::SteamConfig;

pub struct SteamHandlers {
    steam: SteamConfig,
    process_name: String,
}

impl SteamHandlers {
    pub fn new(steam: SteamConfig, process_name: impl Into<String>) -> Self {
        Self {
            steam,
            process_name: process_name.into(),
        }
    }
}

impl AccessoryHooks for SteamHandlers {
    fn on_power_changed(&self, is_on: bool) -> Result<()> {
        info!(power = if is_on { "on" } else { "off" }, "[handler] power changed");
        if !is_on {
            info!(process = %self.process_name, "Restarting Steam");
            process::terminate_by_name(&self.process_name)
                .context(format!("Failed to restart {} on power off", self.process_name))?;
        }
        Ok(())
    }

    fn on_input_changed(&self, identifier: u32, label: &str, slug: &str) -> Result<()> {
        info!(identifier, label, slug, "[handler] input changed");
        // No rollback: the visible selection stays even if this fails
        self.steam
            .set_selected_account(slug)
            .context(format!("Failed to set Steam AutoLoginUser to {slug}"))?;
        info!(account = slug, "Set Steam AutoLoginUser");
        Ok(())
    }
}
