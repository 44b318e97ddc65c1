use std::path::PathBuf;
use std::str::FromStr;

use tracing::warn;
use wc_bridge_core::InteractorSettings;

use crate::wc::DEFAULT_RELAY_URL;

#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub project_id: String,
    pub relay_url: String,
    pub sessions_path: PathBuf,
    pub event_buffer: usize,
    pub reject_unconvertible_requests: bool,
    pub signer_seed: String,
    pub user_wallet_id: String,
    pub card_id: Option<String>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            project_id: String::new(),
            relay_url: DEFAULT_RELAY_URL.to_owned(),
            sessions_path: PathBuf::from("wc_sessions.json"),
            event_buffer: 64,
            reject_unconvertible_requests: false,
            signer_seed: "wc-bridge-dev-seed".to_owned(),
            user_wallet_id: "default-wallet".to_owned(),
            card_id: None,
        }
    }
}

impl BridgeConfig {
    /// Defaults overridden by `WC_BRIDGE_*` variables. Unparsable values keep
    /// the default.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            project_id: lookup("WC_BRIDGE_PROJECT_ID").unwrap_or(defaults.project_id),
            relay_url: lookup("WC_BRIDGE_RELAY_URL").unwrap_or(defaults.relay_url),
            sessions_path: lookup("WC_BRIDGE_SESSIONS_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.sessions_path),
            event_buffer: parsed(&lookup, "WC_BRIDGE_EVENT_BUFFER", defaults.event_buffer)
                .max(1),
            reject_unconvertible_requests: parsed(
                &lookup,
                "WC_BRIDGE_REJECT_UNCONVERTIBLE",
                defaults.reject_unconvertible_requests,
            ),
            signer_seed: lookup("WC_BRIDGE_SIGNER_SEED").unwrap_or(defaults.signer_seed),
            user_wallet_id: lookup("WC_BRIDGE_USER_WALLET_ID").unwrap_or(defaults.user_wallet_id),
            card_id: lookup("WC_BRIDGE_CARD_ID")
                .filter(|id| !id.is_empty())
                .or(defaults.card_id),
        }
    }

    pub fn interactor_settings(&self) -> InteractorSettings {
        InteractorSettings {
            reject_unconvertible_requests: self.reject_unconvertible_requests,
        }
    }
}

fn parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    match lookup(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(key, value = %raw, "ignoring unparsable config value");
            default
        }),
        None => default,
    }
}
