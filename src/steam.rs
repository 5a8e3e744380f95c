//! Steam account registry access
//!
//! Reads the known accounts from `loginusers.vdf` and reads/writes the
//! `AutoLoginUser` leaf inside `registry.vdf`. The write is a
//! read-modify-write of the whole document without locking; it goes through a
//! temporary file in the same directory so a failure never truncates the
//! registry.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, info};

use crate::constants::steam;
use crate::vdf::{self, Section};

#[derive(Debug, Error)]
pub enum ConfigReadError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: vdf::ParseError,
    },

    #[error("{} has no {key}", path.display())]
    MissingKey { path: PathBuf, key: String },
}

#[derive(Debug, Error)]
pub enum ConfigWriteError {
    #[error(transparent)]
    Read(#[from] ConfigReadError),

    #[error("failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// One entry from loginusers.vdf
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    /// Login name, written verbatim as AutoLoginUser
    pub account_id: String,
    pub display_name: Option<String>,
}

/// Locations of the two Steam registry files
#[derive(Debug, Clone)]
pub struct SteamConfig {
    pub login_users: PathBuf,
    pub registry: PathBuf,
}

impl SteamConfig {
    pub fn new(login_users: PathBuf, registry: PathBuf) -> Self {
        Self {
            login_users,
            registry,
        }
    }

    /// Default Steam-on-Linux locations under the home directory
    pub fn default_paths() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        Self::new(home.join(steam::LOGIN_USERS), home.join(steam::REGISTRY))
    }

    /// Accounts in file order; records without an AccountName are skipped
    pub fn list_accounts(&self) -> Result<Vec<Account>, ConfigReadError> {
        let doc = load(&self.login_users)?;
        let users = doc
            .get_section(steam::USERS_SECTION)
            .ok_or_else(|| missing(&self.login_users, steam::USERS_SECTION))?;

        let accounts: Vec<Account> = users
            .iter()
            .filter_map(|(steam_id, record)| {
                let vdf::Value::Section(record) = record else {
                    debug!(steam_id, "Skipping non-section entry in users");
                    return None;
                };
                let account_id = record
                    .get_str(steam::ACCOUNT_NAME)
                    .filter(|name| !name.is_empty());
                let Some(account_id) = account_id else {
                    debug!(steam_id, "Skipping user without AccountName");
                    return None;
                };
                Some(Account {
                    account_id: account_id.to_string(),
                    display_name: record
                        .get_str(steam::PERSONA_NAME)
                        .filter(|name| !name.is_empty())
                        .map(str::to_string),
                })
            })
            .collect();

        debug!(path = %self.login_users.display(), count = accounts.len(), "Loaded Steam accounts");
        Ok(accounts)
    }

    /// Current AutoLoginUser
    pub fn selected_account(&self) -> Result<String, ConfigReadError> {
        let doc = load(&self.registry)?;
        doc.path(&steam::AUTO_LOGIN_PATH)
            .and_then(|section| section.get_str(steam::AUTO_LOGIN_USER))
            .map(str::to_string)
            .ok_or_else(|| missing(&self.registry, &auto_login_key()))
    }

    /// Overwrite AutoLoginUser, preserving everything else in registry.vdf
    pub fn set_selected_account(&self, account_id: &str) -> Result<(), ConfigWriteError> {
        let mut doc = load(&self.registry)?;
        let steam_section = doc
            .path_mut(&steam::AUTO_LOGIN_PATH)
            .ok_or_else(|| missing(&self.registry, &auto_login_key()))?;
        steam_section.set_str(steam::AUTO_LOGIN_USER, account_id);

        write_atomic(&self.registry, &vdf::to_string(&doc)).map_err(|source| {
            ConfigWriteError::Io {
                path: self.registry.clone(),
                source,
            }
        })?;

        info!(path = %self.registry.display(), account = account_id, "Updated AutoLoginUser");
        Ok(())
    }
}

fn auto_login_key() -> String {
    let mut key = steam::AUTO_LOGIN_PATH.join("/");
    key.push('/');
    key.push_str(steam::AUTO_LOGIN_USER);
    key
}

fn missing(path: &Path, key: &str) -> ConfigReadError {
    ConfigReadError::MissingKey {
        path: path.to_path_buf(),
        key: key.to_string(),
    }
}

fn load(path: &Path) -> Result<Section, ConfigReadError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigReadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    vdf::parse(&contents).map_err(|source| ConfigReadError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Write to a sibling temp file, then rename over the target
///
/// Symlinks are resolved first so the link stays in place and its target is
/// the file that gets replaced. The target's permissions carry over.
fn write_atomic(path: &Path, contents: &str) -> io::Result<()> {
    let target = match fs::canonicalize(path) {
        Ok(target) => target,
        Err(e) if e.kind() == io::ErrorKind::NotFound => path.to_path_buf(),
        Err(e) => return Err(e),
    };
    let dir = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(contents.as_bytes())?;
    if let Ok(metadata) = fs::metadata(&target) {
        tmp.as_file().set_permissions(metadata.permissions())?;
    }
    tmp.as_file().sync_all()?;
    tmp.persist(&target).map_err(|e| e.error)?;
    Ok(())
}
