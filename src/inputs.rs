//! Input catalog: the TV "channels", one per Steam account

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::constants::accessory::FALLBACK_INPUTS;
use crate::steam::{Account, SteamConfig};

#[derive(Debug, Error, PartialEq, Eq)]
#[error("no usable inputs")]
pub struct NoInputsError;

/// Protocol InputSourceType, guessed from the label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputSourceType {
    Other = 0,
    HomeScreen = 1,
    Tuner = 2,
    Hdmi = 3,
    CompositeVideo = 4,
    SVideo = 5,
    ComponentVideo = 6,
    Dvi = 7,
    AirPlay = 8,
    Usb = 9,
    Application = 10,
}

impl InputSourceType {
    /// Keyword heuristics; first match wins, order matters
    pub fn guess(label: &str) -> Self {
        let s = label.to_lowercase();
        let s = s.as_str();
        if s.contains("hdmi") {
            Self::Hdmi
        } else if s.contains("airplay") || s.contains("cast") {
            Self::AirPlay
        } else if s.contains("app") {
            Self::Application
        } else if s.contains("usb") {
            Self::Usb
        } else if s.contains("dvi") {
            Self::Dvi
        } else if s.contains("component") {
            Self::ComponentVideo
        } else if s.contains("svideo") {
            Self::SVideo
        } else if s.contains("composite") || matches!(s, "av" | "video") {
            Self::CompositeVideo
        } else if matches!(s, "tuner" | "tv" | "antenna") {
            Self::Tuner
        } else if s.contains("home") {
            Self::HomeScreen
        } else {
            Self::Other
        }
    }

    pub fn code(self) -> u8 {
        self as u8
    }
}

/// One selectable input source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Input {
    pub identifier: u32,
    pub label: String,
    /// Account id in accounts mode; normalized label in override mode
    pub slug: String,
    pub source_type: InputSourceType,
}

impl Input {
    pub fn new(identifier: u32, label: impl Into<String>, slug: impl Into<String>) -> Self {
        let label = label.into();
        Self {
            identifier,
            source_type: InputSourceType::guess(&label),
            label,
            slug: slug.into(),
        }
    }
}

/// Lowercase, alphanumerics only
pub fn slugify(label: &str) -> String {
    label
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Split a comma-separated `--inputs` value, dropping blank entries
pub fn parse_labels(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn enumerate<I>(items: I) -> Vec<Input>
where
    I: IntoIterator<Item = (String, String)>,
{
    items
        .into_iter()
        .zip(1u32..)
        .map(|((label, slug), identifier)| Input::new(identifier, label, slug))
        .collect()
}

/// Inputs from explicit labels, slugs derived from the labels
pub fn from_labels(labels: &[String]) -> Result<Vec<Input>, NoInputsError> {
    if labels.is_empty() {
        return Err(NoInputsError);
    }
    Ok(enumerate(labels.iter().map(|label| (label.clone(), slugify(label)))))
}

/// Inputs from Steam accounts; slug is the account id used for write-back
pub fn from_accounts(accounts: &[Account]) -> Result<Vec<Input>, NoInputsError> {
    let inputs = enumerate(
        accounts
            .iter()
            .filter(|account| !account.account_id.is_empty())
            .map(|account| {
                let label = account
                    .display_name
                    .clone()
                    .unwrap_or_else(|| account.account_id.clone());
                (label, account.account_id.clone())
            }),
    );
    if inputs.is_empty() {
        Err(NoInputsError)
    } else {
        Ok(inputs)
    }
}

/// Fixed two-input catalog used when nothing else resolves
pub fn fallback() -> Vec<Input> {
    enumerate(
        FALLBACK_INPUTS
            .iter()
            .map(|(label, slug)| (label.to_string(), slug.to_string())),
    )
}

/// Identifier of the input whose slug equals `account`
pub fn find_by_slug(inputs: &[Input], account: &str) -> Option<u32> {
    inputs
        .iter()
        .find(|input| input.slug == account)
        .map(|input| input.identifier)
}

/// Built catalog plus the identifier matching the current AutoLoginUser
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    pub inputs: Vec<Input>,
    pub initial_identifier: Option<u32>,
}

impl Catalog {
    /// Override labels win; otherwise Steam accounts; otherwise the fallback
    pub fn build(steam: &SteamConfig, override_labels: &[String]) -> Self {
        if !override_labels.is_empty() {
            if let Ok(inputs) = from_labels(override_labels) {
                info!(count = inputs.len(), "Using inputs from --inputs");
                return Self {
                    inputs,
                    initial_identifier: None,
                };
            }
        }

        let inputs = match steam.list_accounts() {
            Ok(accounts) => match from_accounts(&accounts) {
                Ok(inputs) => inputs,
                Err(e) => {
                    warn!(
                        path = %steam.login_users.display(),
                        error = %e,
                        "No Steam accounts found; falling back to defaults"
                    );
                    return Self::fallback();
                }
            },
            Err(e) => {
                warn!(error = %e, "Failed to read Steam users; falling back to defaults");
                return Self::fallback();
            }
        };

        let initial_identifier = match steam.selected_account() {
            Ok(current) => {
                let found = find_by_slug(&inputs, &current);
                if found.is_none() {
                    debug!(account = %current, "AutoLoginUser does not match any input");
                }
                found
            }
            Err(e) => {
                debug!(error = %e, "Could not read AutoLoginUser");
                None
            }
        };

        Self {
            inputs,
            initial_identifier,
        }
    }

    pub fn fallback() -> Self {
        Self {
            inputs: fallback(),
            initial_identifier: None,
        }
    }

    pub fn labels(&self) -> Vec<&str> {
        self.inputs.iter().map(|input| input.label.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn account(id: &str, name: Option<&str>) -> Account {
        Account {
            account_id: id.to_string(),
            display_name: name.map(str::to_string),
        }
    }

    fn steam_fixture(login_users: Option<&str>, registry: Option<&str>) -> (TempDir, SteamConfig) {
        let dir = TempDir::new().unwrap();
        let config = SteamConfig::new(
            dir.path().join("loginusers.vdf"),
            dir.path().join("registry.vdf"),
        );
        if let Some(text) = login_users {
            fs::write(&config.login_users, text).unwrap();
        }
        if let Some(text) = registry {
            fs::write(&config.registry, text).unwrap();
        }
        (dir, config)
    }

    const TWO_USERS: &str = r#""users"
{
	"1" { "AccountName" "bob99" "PersonaName" "Bob" }
	"2" { "AccountName" "carol_w" }
}
"#;

    fn registry_selecting(account: &str) -> String {
        format!(
            "\"Registry\" {{ \"HKCU\" {{ \"Software\" {{ \"Valve\" {{ \"Steam\" {{ \
             \"AutoLoginUser\" \"{account}\" }} }} }} }} }}"
        )
    }

    #[test]
    fn test_identifiers_are_dense_from_one() {
        for n in 1..=12 {
            let labels: Vec<String> = (0..n).map(|i| format!("Input {i}")).collect();
            let inputs = from_labels(&labels).unwrap();
            let ids: Vec<u32> = inputs.iter().map(|i| i.identifier).collect();
            assert_eq!(ids, (1..=n as u32).collect::<Vec<_>>());
        }
    }

    #[test]
    fn test_from_labels_slugifies() {
        let inputs = from_labels(&["Living Room".to_string(), "Kid's PC #2".to_string()]).unwrap();
        assert_eq!(inputs[0].slug, "livingroom");
        assert_eq!(inputs[1].slug, "kidspc2");
        assert_eq!(inputs[1].label, "Kid's PC #2");
    }

    #[test]
    fn test_from_labels_empty_is_error() {
        assert_eq!(from_labels(&[]), Err(NoInputsError));
    }

    #[test]
    fn test_from_accounts_uses_display_name_and_account_slug() {
        let accounts = [account("bob99", Some("Bob")), account("carol_w", None)];
        let inputs = from_accounts(&accounts).unwrap();
        assert_eq!(
            inputs,
            vec![Input::new(1, "Bob", "bob99"), Input::new(2, "carol_w", "carol_w")]
        );
    }

    #[test]
    fn test_from_accounts_skips_blank_ids_without_gaps() {
        let inputs = from_accounts(&[account("", Some("Ghost")), account("dave", None)]).unwrap();
        assert_eq!(inputs.len(), 1);
        assert_eq!(inputs[0].identifier, 1);
        assert_eq!(inputs[0].slug, "dave");
    }

    #[test]
    fn test_from_accounts_empty_is_error() {
        assert_eq!(from_accounts(&[]), Err(NoInputsError));
    }

    #[test]
    fn test_parse_labels() {
        assert_eq!(parse_labels(" Bob , ,Carol,"), vec!["Bob".to_string(), "Carol".to_string()]);
        assert!(parse_labels("").is_empty());
    }

    #[test]
    fn test_guess_source_type() {
        assert_eq!(InputSourceType::guess("HDMI 1"), InputSourceType::Hdmi);
        assert_eq!(InputSourceType::guess("Chromecast"), InputSourceType::AirPlay);
        assert_eq!(InputSourceType::guess("Apple TV App"), InputSourceType::Application);
        assert_eq!(InputSourceType::guess("USB Stick"), InputSourceType::Usb);
        assert_eq!(InputSourceType::guess("AV"), InputSourceType::CompositeVideo);
        assert_eq!(InputSourceType::guess("tv"), InputSourceType::Tuner);
        assert_eq!(InputSourceType::guess("Home"), InputSourceType::HomeScreen);
        assert_eq!(InputSourceType::guess("Bob"), InputSourceType::Other);
        assert_eq!(InputSourceType::Application.code(), 10);
    }

    #[test]
    fn test_build_resolves_initial_identifier() {
        let (_dir, steam) = steam_fixture(Some(TWO_USERS), Some(&registry_selecting("carol_w")));
        let catalog = Catalog::build(&steam, &[]);
        assert_eq!(catalog.labels(), vec!["Bob", "carol_w"]);
        assert_eq!(catalog.initial_identifier, Some(2));
    }

    #[test]
    fn test_build_unmatched_selection_leaves_initial_unset() {
        let (_dir, steam) = steam_fixture(Some(TWO_USERS), Some(&registry_selecting("mallory")));
        assert_eq!(Catalog::build(&steam, &[]).initial_identifier, None);
    }

    #[test]
    fn test_build_unreadable_registry_leaves_initial_unset() {
        let (_dir, steam) = steam_fixture(Some(TWO_USERS), None);
        let catalog = Catalog::build(&steam, &[]);
        assert_eq!(catalog.inputs.len(), 2);
        assert_eq!(catalog.initial_identifier, None);
    }

    #[test]
    fn test_build_override_skips_resolution() {
        let (_dir, steam) = steam_fixture(Some(TWO_USERS), Some(&registry_selecting("carol_w")));
        let catalog = Catalog::build(&steam, &["carol_w".to_string(), "Other".to_string()]);
        assert_eq!(catalog.labels(), vec!["carol_w", "Other"]);
        assert_eq!(catalog.initial_identifier, None);
    }

    #[test]
    fn test_build_falls_back_without_accounts() {
        let (_dir, steam) = steam_fixture(None, None);
        assert_eq!(Catalog::build(&steam, &[]), Catalog::fallback());

        let (_dir, steam) = steam_fixture(Some("\"users\" { }"), None);
        let catalog = Catalog::build(&steam, &[]);
        assert_eq!(catalog.labels(), vec!["Steam User 1", "Steam User 2"]);
        assert_eq!(catalog.inputs[1].slug, "user2");
    }
}
