use solana_sdk::{
    pubkey::Pubkey,
    signature::{read_keypair_file, Keypair, Signer},
};

use crate::errors::WalletError;

/// The user's wallet as seen by the client.
#[derive(Debug, Default)]
pub enum WalletContext {
    #[default]
    Disconnected,
    /// Address known, no signing capability.
    WatchOnly(Pubkey),
    Connected(Keypair),
}

impl WalletContext {
    pub fn connect(path: &str) -> Result<Self, WalletError> {
        read_keypair_file(path)
            .map(WalletContext::Connected)
            .map_err(|e| WalletError::Keypair {
                path: path.to_string(),
                reason: e.to_string(),
            })
    }

    pub fn public_key(&self) -> Option<Pubkey> {
        match self {
            WalletContext::Disconnected => None,
            WalletContext::WatchOnly(pubkey) => Some(*pubkey),
            WalletContext::Connected(keypair) => Some(keypair.pubkey()),
        }
    }

    pub fn signer(&self) -> Option<&Keypair> {
        match self {
            WalletContext::Connected(keypair) => Some(keypair),
            _ => None,
        }
    }

    /// Both an address and signing capability are present.
    pub fn is_capable(&self) -> bool {
        self.signer().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capabilities() {
        assert!(WalletContext::Disconnected.public_key().is_none());
        assert!(!WalletContext::Disconnected.is_capable());

        let watch = WalletContext::WatchOnly(Pubkey::new_unique());
        assert!(watch.public_key().is_some());
        assert!(!watch.is_capable());

        let keypair = Keypair::new();
        let pubkey = keypair.pubkey();
        let connected = WalletContext::Connected(keypair);
        assert_eq!(connected.public_key(), Some(pubkey));
        assert!(connected.is_capable());
    }

    #[test]
    fn test_connect_missing_file() {
        let err = WalletContext::connect("/nonexistent/keypair.json").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/keypair.json"));
    }
}
