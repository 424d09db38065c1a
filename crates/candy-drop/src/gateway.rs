//! Identity-gated minting: gatekeeper network dispatch, gateway token
//! lookups and the single live token-account subscription.

use std::time::{Duration, Instant};

use anchor_lang::AnchorDeserialize;
use solana_account_decoder::UiAccountEncoding;
use solana_client::pubsub_client::{AccountSubscription, PubsubClient};
use solana_client::rpc_config::RpcAccountInfoConfig;
use solana_sdk::{commitment_config::CommitmentConfig, pubkey::Pubkey};
use tracing::{debug, info, warn};

use crate::chain::{ChainReader, Commitment};
use crate::constants::{CIVIC_NETWORK, ENCORE_NETWORKS};
use crate::eligibility::Gatekeeper;
use crate::errors::{ChainError, MintError};
use crate::pda::gateway_token;
use crate::state::GatewayToken;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GatekeeperProtocol {
    /// Ask the network for a token, then poll its status.
    RequestAndPoll,
    /// Send the user to an external verification page and watch the token account.
    PopupSubscription,
}

impl GatekeeperProtocol {
    pub fn from_network(network: &Pubkey) -> Result<Self, MintError> {
        if *network == CIVIC_NETWORK {
            Ok(GatekeeperProtocol::RequestAndPoll)
        } else if ENCORE_NETWORKS.contains(network) {
            Ok(GatekeeperProtocol::PopupSubscription)
        } else {
            Err(MintError::UnknownGatekeeper(*network))
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenStatus {
    Missing,
    Active,
    /// Frozen, revoked or expired.
    Inactive,
}

pub trait TokenSubscription {
    /// Returns true when the watched account changed within `timeout`.
    fn wait_for_change(&mut self, timeout: Duration) -> bool;

    fn unsubscribe(self: Box<Self>);
}

pub trait IdentityGateway {
    fn token_status(
        &self,
        owner: &Pubkey,
        network: &Pubkey,
        now: i64,
    ) -> Result<TokenStatus, ChainError>;

    /// Starts verification and returns the URL the user must visit.
    fn request_token(
        &self,
        owner: &Pubkey,
        network: &Pubkey,
        protocol: GatekeeperProtocol,
    ) -> Result<String, ChainError>;

    fn subscribe(&self, token: &Pubkey) -> Result<Box<dyn TokenSubscription>, ChainError>;
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GateStep {
    /// A valid gateway token exists; minting may proceed.
    Ready,
    Pending { prompt: String },
    Expired,
    Idle,
}

struct PendingVerification {
    owner: Pubkey,
    network: Pubkey,
    deadline: Instant,
    prompt: String,
}

/// Tracks at most one verification and at most one live subscription.
#[derive(Default)]
pub struct GatewaySession {
    pending: Option<PendingVerification>,
    subscription: Option<Box<dyn TokenSubscription>>,
}

impl GatewaySession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn has_subscription(&self) -> bool {
        self.subscription.is_some()
    }

    pub fn begin<G: IdentityGateway>(
        &mut self,
        gateway: &G,
        owner: &Pubkey,
        gatekeeper: &Gatekeeper,
        now: i64,
        deadline: Instant,
    ) -> Result<GateStep, MintError> {
        let protocol = GatekeeperProtocol::from_network(&gatekeeper.network)?;
        self.teardown();

        if gateway.token_status(owner, &gatekeeper.network, now)? == TokenStatus::Active {
            debug!(network = %gatekeeper.network, "gateway token already active");
            return Ok(GateStep::Ready);
        }

        let prompt = gateway.request_token(owner, &gatekeeper.network, protocol)?;
        if protocol == GatekeeperProtocol::PopupSubscription {
            let token = gateway_token(owner, &gatekeeper.network);
            self.subscription = Some(gateway.subscribe(&token)?);
        }
        info!(network = %gatekeeper.network, ?protocol, "identity verification requested");
        self.pending = Some(PendingVerification {
            owner: *owner,
            network: gatekeeper.network,
            deadline,
            prompt: prompt.clone(),
        });
        Ok(GateStep::Pending { prompt })
    }

    /// Advances a pending verification. `wait` bounds how long a live
    /// subscription is awaited; polled networks are checked once.
    pub fn poll<G: IdentityGateway>(
        &mut self,
        gateway: &G,
        now: i64,
        at: Instant,
        wait: Duration,
    ) -> Result<GateStep, MintError> {
        let Some(pending) = &self.pending else {
            return Ok(GateStep::Idle);
        };
        let (owner, network, deadline) = (pending.owner, pending.network, pending.deadline);
        let prompt = pending.prompt.clone();

        if let Some(subscription) = self.subscription.as_mut() {
            if subscription.wait_for_change(wait) {
                debug!(%network, "gateway token account changed");
            }
        }

        let status = match gateway.token_status(&owner, &network, now) {
            Ok(status) => status,
            Err(e) => {
                self.teardown();
                return Err(e.into());
            }
        };
        if status == TokenStatus::Active {
            self.teardown();
            return Ok(GateStep::Ready);
        }
        if at >= deadline {
            warn!(%network, "identity verification timed out");
            self.teardown();
            return Ok(GateStep::Expired);
        }
        Ok(GateStep::Pending { prompt })
    }

    pub fn cancel(&mut self) {
        self.teardown();
    }

    fn teardown(&mut self) {
        self.pending = None;
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
    }
}

impl Drop for GatewaySession {
    fn drop(&mut self) {
        self.teardown();
    }
}

// ---------------------------------------------------------------------------
// RPC implementation
// ---------------------------------------------------------------------------

pub struct RpcGateway<'a, C> {
    chain: &'a C,
    ws_url: String,
    civic_portal: String,
    verification_portal: String,
}

impl<'a, C: ChainReader> RpcGateway<'a, C> {
    pub fn new(chain: &'a C, ws_url: &str, civic_portal: &str, verification_portal: &str) -> Self {
        Self {
            chain,
            ws_url: ws_url.to_string(),
            civic_portal: civic_portal.to_string(),
            verification_portal: verification_portal.to_string(),
        }
    }
}

impl<C: ChainReader> IdentityGateway for RpcGateway<'_, C> {
    fn token_status(
        &self,
        owner: &Pubkey,
        network: &Pubkey,
        now: i64,
    ) -> Result<TokenStatus, ChainError> {
        let address = gateway_token(owner, network);
        let Some(account) = self.chain.fetch_account(&address, Commitment::Processed)? else {
            return Ok(TokenStatus::Missing);
        };
        let token = GatewayToken::deserialize(&mut account.data.as_slice())
            .map_err(|_| ChainError::Decode(address))?;
        Ok(if token.is_valid(now) {
            TokenStatus::Active
        } else {
            TokenStatus::Inactive
        })
    }

    fn request_token(
        &self,
        owner: &Pubkey,
        network: &Pubkey,
        protocol: GatekeeperProtocol,
    ) -> Result<String, ChainError> {
        Ok(match protocol {
            GatekeeperProtocol::RequestAndPoll => {
                format!("{}/?wallet={}", self.civic_portal, owner)
            }
            GatekeeperProtocol::PopupSubscription => {
                format!("{}/?gkNetwork={}", self.verification_portal, network)
            }
        })
    }

    fn subscribe(&self, token: &Pubkey) -> Result<Box<dyn TokenSubscription>, ChainError> {
        let config = RpcAccountInfoConfig {
            encoding: Some(UiAccountEncoding::Base64),
            commitment: Some(CommitmentConfig::confirmed()),
            ..Default::default()
        };
        let subscription = PubsubClient::account_subscribe(&self.ws_url, token, Some(config))
            .map_err(|e| ChainError::Unreachable(format!("{}: {e}", self.ws_url)))?;
        debug!(%token, "subscribed to gateway token");
        Ok(Box::new(PubsubTokenSubscription { subscription }))
    }
}

struct PubsubTokenSubscription {
    subscription: AccountSubscription,
}

impl TokenSubscription for PubsubTokenSubscription {
    fn wait_for_change(&mut self, timeout: Duration) -> bool {
        self.subscription.1.recv_timeout(timeout).is_ok()
    }

    fn unsubscribe(self: Box<Self>) {
        let (mut client, _receiver) = self.subscription;
        if let Err(e) = client.send_unsubscribe() {
            debug!("unsubscribe failed: {e}");
        }
        if client.shutdown().is_err() {
            debug!("subscription thread panicked during shutdown");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_networks() {
        assert_eq!(
            GatekeeperProtocol::from_network(&CIVIC_NETWORK).unwrap(),
            GatekeeperProtocol::RequestAndPoll
        );
        for network in ENCORE_NETWORKS {
            assert_eq!(
                GatekeeperProtocol::from_network(&network).unwrap(),
                GatekeeperProtocol::PopupSubscription
            );
        }
    }

    #[test]
    fn test_unknown_network_is_rejected() {
        let network = Pubkey::new_unique();
        match GatekeeperProtocol::from_network(&network) {
            Err(MintError::UnknownGatekeeper(pk)) => assert_eq!(pk, network),
            other => panic!("expected unknown gatekeeper, got {other:?}"),
        }
    }

    #[test]
    fn test_gateway_token_validity() {
        let mut token = GatewayToken {
            version: 0,
            parent_gateway_token: None,
            owner_wallet: Pubkey::new_unique(),
            owner_identity: None,
            gatekeeper_network: CIVIC_NETWORK,
            issuing_gatekeeper: Pubkey::new_unique(),
            state: crate::state::GatewayTokenState::Active,
            expire_time: None,
        };
        assert!(token.is_valid(100));
        token.expire_time = Some(50);
        assert!(!token.is_valid(100));
        token.expire_time = Some(150);
        assert!(token.is_valid(100));
        token.state = crate::state::GatewayTokenState::Frozen;
        assert!(!token.is_valid(100));
    }
}
