//! Command-line interface

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::accessory_info::InfoOverrides;
use crate::constants::{accessory, network, paths, steam};
use crate::ipc::ControlRequest;

#[derive(Debug, Parser)]
#[command(
    name = "steam-switcher-tv",
    version,
    about = "Steam user switcher exposed as a TV accessory"
)]
pub struct Cli {
    #[command(flatten)]
    pub serve: ServeArgs,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Send a command to a running accessory
    Ctl {
        /// Accessory address (defaults to --bind/--port)
        #[arg(long)]
        addr: Option<String>,

        #[command(subcommand)]
        action: CtlAction,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PowerArg {
    On,
    Off,
}

#[derive(Debug, Clone, Subcommand)]
pub enum CtlAction {
    /// Switch the TV on or off (off restarts Steam)
    Power { state: PowerArg },
    /// Select an input by identifier
    Input { identifier: u32 },
    /// Show current power and input
    State,
    /// List input sources
    Inputs,
    Ping,
}

impl CtlAction {
    pub fn request(&self) -> ControlRequest {
        match self {
            CtlAction::Power { state } => ControlRequest::SetActive(*state == PowerArg::On),
            CtlAction::Input { identifier } => ControlRequest::SetActiveIdentifier(*identifier),
            CtlAction::State => ControlRequest::GetState,
            CtlAction::Inputs => ControlRequest::ListInputs,
            CtlAction::Ping => ControlRequest::Ping,
        }
    }
}

#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Accessory name
    #[arg(long, env = "HOMEKIT_TV_NAME", default_value = accessory::DEFAULT_NAME)]
    pub name: String,

    /// TCP port
    #[arg(long, default_value_t = network::DEFAULT_PORT)]
    pub port: u16,

    /// Bind/advertise address: "auto" detects your LAN IPv4, or provide an explicit address
    #[arg(long, default_value = "auto")]
    pub bind: String,

    /// Comma-separated list of input labels (overrides Steam users; slugs auto-generated)
    #[arg(long, default_value = "")]
    pub inputs: String,

    /// Persistence directory for accessory state
    #[arg(long)]
    pub persist: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(long)]
    pub debug: bool,

    /// Path to loginusers.vdf
    #[arg(long)]
    pub login_users: Option<PathBuf>,

    /// Path to registry.vdf
    #[arg(long)]
    pub registry: Option<PathBuf>,

    /// Process terminated when the TV is switched off
    #[arg(long, default_value = steam::PROCESS_NAME)]
    pub restart_process: String,

    #[arg(long, env = "HOMEKIT_TV_MFR")]
    pub manufacturer: Option<String>,

    #[arg(long, env = "HOMEKIT_TV_MODEL")]
    pub model: Option<String>,

    #[arg(long, env = "HOMEKIT_TV_SN")]
    pub serial_number: Option<String>,

    #[arg(long, env = "HOMEKIT_TV_FW")]
    pub firmware_revision: Option<String>,
}

impl ServeArgs {
    /// `$XDG_STATE_HOME/homekit-steam-user-switcher` unless overridden
    pub fn persist_dir(&self) -> PathBuf {
        self.persist.clone().unwrap_or_else(|| {
            dirs::state_dir()
                .or_else(|| dirs::home_dir().map(|home| home.join(".local/state")))
                .unwrap_or_else(|| PathBuf::from("."))
                .join(paths::APP_DIR)
        })
    }

    pub fn info_overrides(&self) -> InfoOverrides {
        InfoOverrides {
            manufacturer: self.manufacturer.clone(),
            model: self.model.clone(),
            serial_number: self.serial_number.clone(),
            firmware_revision: self.firmware_revision.clone(),
        }
    }
}
