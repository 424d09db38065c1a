use std::str::FromStr;
use std::time::Duration;

use solana_sdk::pubkey::Pubkey;
use tracing::warn;

use crate::constants::{CIVIC_PORTAL, DEFAULT_REFRESH_SECS, DEFAULT_TX_TIMEOUT_SECS, ENCORE_PORTAL};

/// Settings resolved once at startup and passed to every component.
#[derive(Clone, Debug)]
pub struct DropSettings {
    pub candy_machine_id: Option<Pubkey>,
    /// Set when a supplied identifier failed to parse; refreshes are skipped.
    pub config_error: Option<String>,
    pub rpc_url: String,
    pub ws_url: String,
    /// Gallery filter: only NFTs whose metadata names this update authority.
    pub update_authority: Option<Pubkey>,
    pub tx_timeout: Duration,
    pub refresh_interval: Duration,
    pub verification_portal: String,
    pub civic_portal: String,
}

impl DropSettings {
    pub fn new(rpc_url: &str, candy_machine: Option<&str>) -> Self {
        let mut settings = Self {
            candy_machine_id: None,
            config_error: None,
            rpc_url: rpc_url.to_string(),
            ws_url: websocket_url(rpc_url),
            update_authority: None,
            tx_timeout: Duration::from_secs(DEFAULT_TX_TIMEOUT_SECS),
            refresh_interval: Duration::from_secs(DEFAULT_REFRESH_SECS),
            verification_portal: ENCORE_PORTAL.to_string(),
            civic_portal: CIVIC_PORTAL.to_string(),
        };
        if let Some(raw) = candy_machine.map(str::trim).filter(|s| !s.is_empty()) {
            match Pubkey::from_str(raw) {
                Ok(id) => settings.candy_machine_id = Some(id),
                Err(e) => {
                    warn!(candy_machine = raw, "invalid candy machine id: {e}");
                    settings.config_error =
                        Some(format!("Invalid candy machine id {raw}: {e}"));
                }
            }
        }
        settings
    }

    pub fn with_update_authority(mut self, update_authority: Option<&str>) -> Self {
        if let Some(raw) = update_authority.map(str::trim).filter(|s| !s.is_empty()) {
            match Pubkey::from_str(raw) {
                Ok(pk) => self.update_authority = Some(pk),
                Err(e) => warn!(update_authority = raw, "ignoring invalid update authority: {e}"),
            }
        }
        self
    }

    pub fn with_tx_timeout(mut self, timeout: Duration) -> Self {
        self.tx_timeout = timeout;
        self
    }

    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }
}

pub fn cluster_to_url(cluster: &str) -> &str {
    match cluster {
        "localnet" | "localhost" => "http://127.0.0.1:8899",
        "devnet" => "https://api.devnet.solana.com",
        "mainnet-beta" | "mainnet" => "https://api.mainnet-beta.solana.com",
        url => url,
    }
}

/// Pubsub endpoint paired with an RPC url. The local validator serves it one port up.
pub fn websocket_url(rpc_url: &str) -> String {
    if let Some(rest) = rpc_url.strip_prefix("http://127.0.0.1:8899") {
        return format!("ws://127.0.0.1:8900{rest}");
    }
    if let Some(rest) = rpc_url.strip_prefix("https://") {
        return format!("wss://{rest}");
    }
    if let Some(rest) = rpc_url.strip_prefix("http://") {
        return format!("ws://{rest}");
    }
    rpc_url.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_candy_machine_id() {
        let id = Pubkey::new_unique();
        let settings = DropSettings::new("https://api.devnet.solana.com", Some(&id.to_string()));
        assert_eq!(settings.candy_machine_id, Some(id));
        assert!(settings.config_error.is_none());
        assert_eq!(settings.refresh_interval, Duration::from_secs(20));
    }

    #[test]
    fn test_invalid_candy_machine_id_is_recorded() {
        let settings = DropSettings::new("https://api.devnet.solana.com", Some("not-a-key"));
        assert!(settings.candy_machine_id.is_none());
        assert!(settings.config_error.is_some());
    }

    #[test]
    fn test_missing_candy_machine_id() {
        let settings = DropSettings::new("https://api.devnet.solana.com", Some("  "));
        assert!(settings.candy_machine_id.is_none());
        assert!(settings.config_error.is_none());
    }

    #[test]
    fn test_websocket_url() {
        assert_eq!(
            websocket_url("https://api.devnet.solana.com"),
            "wss://api.devnet.solana.com"
        );
        assert_eq!(websocket_url("http://127.0.0.1:8899"), "ws://127.0.0.1:8900");
        assert_eq!(cluster_to_url("localnet"), "http://127.0.0.1:8899");
        assert_eq!(cluster_to_url("http://rpc.example"), "http://rpc.example");
    }
}
