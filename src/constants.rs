//! Application-wide constants
//!
//! This module contains all magic numbers and string literals used throughout
//! the application, providing a single source of truth for constant values.

/// Steam file locations and the registry path we rewrite
pub mod steam {
    /// loginusers.vdf relative to the home directory
    pub const LOGIN_USERS: &str = ".local/share/Steam/config/loginusers.vdf";

    /// registry.vdf relative to the home directory
    pub const REGISTRY: &str = ".steam/registry.vdf";

    /// Top-level section in loginusers.vdf holding one record per SteamID
    pub const USERS_SECTION: &str = "users";

    /// Login name field (used verbatim for AutoLoginUser)
    pub const ACCOUNT_NAME: &str = "AccountName";

    /// Display name field
    pub const PERSONA_NAME: &str = "PersonaName";

    /// Section path from the document root down to the auto-login leaf
    pub const AUTO_LOGIN_PATH: [&str; 5] = ["Registry", "HKCU", "Software", "Valve", "Steam"];

    /// Leaf holding the account Steam logs into on next start
    pub const AUTO_LOGIN_USER: &str = "AutoLoginUser";

    /// Process restarted when the TV is switched off
    pub const PROCESS_NAME: &str = "steam";
}

/// Accessory defaults and timing
pub mod accessory {
    use std::time::Duration;

    /// Delay before power flips back on after an Off request
    pub const RESTORE_DELAY: Duration = Duration::from_secs(2);

    /// Label reported for identifiers outside the catalog
    pub const UNKNOWN_LABEL: &str = "Unknown";

    /// Slug reported for identifiers outside the catalog
    pub const UNKNOWN_SLUG: &str = "-";

    /// Pairing code handed to the protocol driver
    pub const PAIRING_CODE: &str = "111-11-111";

    pub const DEFAULT_NAME: &str = "Steam Switcher";
    pub const DEFAULT_MANUFACTURER: &str = "HomeSteam";

    /// Stable model string, deliberately not the display name
    pub const DEFAULT_MODEL: &str = "Steam User Switcher";
    pub const DEFAULT_FIRMWARE: &str = "1.0";

    /// Serial used when no machine id is readable
    pub const FALLBACK_SERIAL: &str = "TV-000000000000";

    /// Catalog used when no Steam accounts can be read
    pub const FALLBACK_INPUTS: [(&str, &str); 2] = [
        ("Steam User 1", "user1"),
        ("Steam User 2", "user2"),
    ];
}

/// Network defaults for the control endpoint
pub mod network {
    pub const DEFAULT_PORT: u16 = 51826;

    /// Bind values that trigger LAN address detection
    pub const AUTO_BIND: [&str; 3] = ["auto", "", "0.0.0.0"];

    /// Public address used only to pick the outbound interface (nothing is sent)
    pub const PROBE_ADDR: &str = "8.8.8.8:80";

    /// Maximum control message size (1 MiB)
    pub const MAX_MESSAGE_SIZE: usize = 1024 * 1024;
}

/// Filesystem paths
pub mod paths {
    /// Per-process command name, `{}` replaced by the PID
    pub const PROC_COMM_FORMAT: &str = "/proc/{}/comm";

    pub const PROC_DIR: &str = "/proc";

    pub const MACHINE_ID: &str = "/etc/machine-id";

    /// Directory name under the XDG state dir
    pub const APP_DIR: &str = "homekit-steam-user-switcher";

    /// Accessory information persisted between runs
    pub const ACCESSORY_FILE: &str = "accessory.json";
}
