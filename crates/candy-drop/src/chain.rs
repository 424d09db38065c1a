use std::thread;
use std::time::{Duration, Instant};

use anchor_lang::AccountDeserialize;
use solana_account_decoder::UiAccountEncoding;
use solana_client::client_error::{ClientError, ClientErrorKind};
use solana_client::rpc_client::RpcClient;
use solana_client::rpc_config::{RpcAccountInfoConfig, RpcProgramAccountsConfig};
use solana_client::rpc_filter::{Memcmp, RpcFilterType};
use solana_sdk::{
    account::Account,
    commitment_config::CommitmentConfig,
    hash::Hash,
    instruction::InstructionError,
    pubkey::Pubkey,
    signature::Signature,
    transaction::{Transaction, TransactionError},
};
use tracing::{debug, warn};

use crate::constants::SPL_TOKEN_ID;
use crate::errors::ChainError;
use crate::state::CandyMachine;

const CONFIRM_POLL_INTERVAL: Duration = Duration::from_millis(500);
const TOKEN_ACCOUNT_LEN: u64 = 165;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Commitment {
    Processed,
    Confirmed,
}

impl Commitment {
    pub fn config(self) -> CommitmentConfig {
        match self {
            Commitment::Processed => CommitmentConfig::processed(),
            Commitment::Confirmed => CommitmentConfig::confirmed(),
        }
    }
}

/// A token account held by a wallet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenHolding {
    pub address: Pubkey,
    pub mint: Pubkey,
    pub amount: u64,
}

/// Read side of the chain. Every read names the commitment it needs.
pub trait ChainReader {
    fn fetch_candy_machine(
        &self,
        address: &Pubkey,
        commitment: Commitment,
    ) -> Result<CandyMachine, ChainError>;

    /// `Ok(None)` when the account does not exist.
    fn fetch_account(
        &self,
        address: &Pubkey,
        commitment: Commitment,
    ) -> Result<Option<Account>, ChainError>;

    fn native_balance(&self, owner: &Pubkey, commitment: Commitment) -> Result<u64, ChainError>;

    fn token_balance(
        &self,
        token_account: &Pubkey,
        commitment: Commitment,
    ) -> Result<u64, ChainError>;

    fn token_accounts_by_owner(&self, owner: &Pubkey) -> Result<Vec<TokenHolding>, ChainError>;
}

pub trait ChainWriter {
    fn latest_blockhash(&self) -> Result<Hash, ChainError>;

    fn minimum_balance_for_rent_exemption(&self, len: usize) -> Result<u64, ChainError>;

    fn send_transaction(&self, transaction: &Transaction) -> Result<Signature, ChainError>;

    /// Blocks until `signature` reaches `commitment` or `timeout` elapses.
    fn confirm_transaction(
        &self,
        signature: &Signature,
        timeout: Duration,
        commitment: Commitment,
    ) -> Result<(), ChainError>;
}

// ---------------------------------------------------------------------------
// RPC implementation
// ---------------------------------------------------------------------------

pub struct RpcChain {
    rpc: RpcClient,
    url: String,
}

impl RpcChain {
    pub fn new(rpc_url: &str) -> Self {
        let rpc =
            RpcClient::new_with_commitment(rpc_url.to_string(), CommitmentConfig::confirmed());
        Self {
            rpc,
            url: rpc_url.to_string(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn classify(&self, err: &ClientError) -> ChainError {
        classify_client_error(err, &self.url)
    }
}

impl ChainReader for RpcChain {
    fn fetch_candy_machine(
        &self,
        address: &Pubkey,
        commitment: Commitment,
    ) -> Result<CandyMachine, ChainError> {
        let account = self
            .fetch_account(address, commitment)?
            .ok_or(ChainError::AccountNotFound(*address))?;
        decode_candy_machine(address, &account)
    }

    fn fetch_account(
        &self,
        address: &Pubkey,
        commitment: Commitment,
    ) -> Result<Option<Account>, ChainError> {
        self.rpc
            .get_account_with_commitment(address, commitment.config())
            .map(|response| response.value)
            .map_err(|e| self.classify(&e))
    }

    fn native_balance(&self, owner: &Pubkey, commitment: Commitment) -> Result<u64, ChainError> {
        self.rpc
            .get_balance_with_commitment(owner, commitment.config())
            .map(|response| response.value)
            .map_err(|e| self.classify(&e))
    }

    fn token_balance(
        &self,
        token_account: &Pubkey,
        commitment: Commitment,
    ) -> Result<u64, ChainError> {
        let account = self
            .fetch_account(token_account, commitment)?
            .ok_or(ChainError::AccountNotFound(*token_account))?;
        read_token_amount(&account.data).ok_or(ChainError::Decode(*token_account))
    }

    fn token_accounts_by_owner(&self, owner: &Pubkey) -> Result<Vec<TokenHolding>, ChainError> {
        let config = RpcProgramAccountsConfig {
            filters: Some(vec![
                RpcFilterType::DataSize(TOKEN_ACCOUNT_LEN),
                RpcFilterType::Memcmp(Memcmp::new_base58_encoded(32, owner.as_ref())),
            ]),
            account_config: RpcAccountInfoConfig {
                encoding: Some(UiAccountEncoding::Base64),
                ..Default::default()
            },
            ..Default::default()
        };
        let accounts = self
            .rpc
            .get_program_accounts_with_config(&SPL_TOKEN_ID, config)
            .map_err(|e| self.classify(&e))?;

        Ok(accounts
            .into_iter()
            .filter_map(|(address, account)| {
                let mint = Pubkey::try_from(account.data.get(0..32)?).ok()?;
                let amount = read_token_amount(&account.data)?;
                Some(TokenHolding {
                    address,
                    mint,
                    amount,
                })
            })
            .collect())
    }
}

impl ChainWriter for RpcChain {
    fn latest_blockhash(&self) -> Result<Hash, ChainError> {
        self.rpc.get_latest_blockhash().map_err(|e| self.classify(&e))
    }

    fn minimum_balance_for_rent_exemption(&self, len: usize) -> Result<u64, ChainError> {
        self.rpc
            .get_minimum_balance_for_rent_exemption(len)
            .map_err(|e| self.classify(&e))
    }

    fn send_transaction(&self, transaction: &Transaction) -> Result<Signature, ChainError> {
        self.rpc
            .send_transaction(transaction)
            .map_err(|e| self.classify(&e))
    }

    fn confirm_transaction(
        &self,
        signature: &Signature,
        timeout: Duration,
        commitment: Commitment,
    ) -> Result<(), ChainError> {
        await_confirmation(
            || {
                let statuses = self
                    .rpc
                    .get_signature_statuses(&[*signature])
                    .map_err(|e| self.classify(&e))?;
                Ok(match statuses.value.into_iter().next().flatten() {
                    None => SignatureState::Unseen,
                    Some(status) => match status.err.clone() {
                        Some(err) => SignatureState::Failed(err),
                        None => SignatureState::Landed {
                            satisfied: status.satisfies_commitment(commitment.config()),
                        },
                    },
                })
            },
            timeout,
            CONFIRM_POLL_INTERVAL,
        )
        .inspect_err(|e| debug!(%signature, error = %e, "confirmation ended"))
    }
}

// ---------------------------------------------------------------------------
// Confirmation polling
// ---------------------------------------------------------------------------

/// What one status lookup reported for a sent signature.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SignatureState {
    Unseen,
    Landed { satisfied: bool },
    Failed(TransactionError),
}

/// Polls `status` until the signature lands at the requested commitment.
///
/// Lookup errors are logged and retried; only a failed transaction ends the
/// wait before `timeout`.
pub fn await_confirmation<F>(
    mut status: F,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<(), ChainError>
where
    F: FnMut() -> Result<SignatureState, ChainError>,
{
    let deadline = Instant::now() + timeout;
    loop {
        match status() {
            Ok(SignatureState::Landed { satisfied: true }) => return Ok(()),
            Ok(SignatureState::Failed(err)) => return Err(classify_transaction_error(&err)),
            Ok(_) => {}
            Err(e) => warn!(error = %e, "signature status lookup failed, retrying"),
        }
        if Instant::now() >= deadline {
            return Err(ChainError::Timeout(timeout));
        }
        thread::sleep(poll_interval);
    }
}

// ---------------------------------------------------------------------------
// Decoding and error classification
// ---------------------------------------------------------------------------

pub fn decode_candy_machine(address: &Pubkey, account: &Account) -> Result<CandyMachine, ChainError> {
    if account.owner != crate::ID {
        return Err(ChainError::Decode(*address));
    }
    CandyMachine::try_deserialize(&mut account.data.as_slice())
        .map_err(|_| ChainError::Decode(*address))
}

/// SPL token account amount (bytes 64..72, little endian).
pub fn read_token_amount(data: &[u8]) -> Option<u64> {
    let bytes: [u8; 8] = data.get(64..72)?.try_into().ok()?;
    Some(u64::from_le_bytes(bytes))
}

pub fn classify_transaction_error(err: &TransactionError) -> ChainError {
    match err {
        TransactionError::InstructionError(_, InstructionError::Custom(code)) => {
            ChainError::Program { code: *code }
        }
        TransactionError::InsufficientFundsForFee
        | TransactionError::InsufficientFundsForRent { .. } => ChainError::InsufficientFundsForFee,
        other => ChainError::TransactionFailed(other.to_string()),
    }
}

pub fn classify_client_error(err: &ClientError, rpc_url: &str) -> ChainError {
    if let Some(tx_err) = err.get_transaction_error() {
        return classify_transaction_error(&tx_err);
    }
    match err.kind() {
        ClientErrorKind::Io(_) => ChainError::Unreachable(rpc_url.to_string()),
        ClientErrorKind::Reqwest(e) if e.is_connect() || e.is_timeout() => {
            ChainError::Unreachable(rpc_url.to_string())
        }
        ClientErrorKind::SigningError(e) => ChainError::Signing(e.to_string()),
        _ => ChainError::Rpc(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_custom_instruction_error_maps_to_program_code() {
        let err = TransactionError::InstructionError(2, InstructionError::Custom(0x137));
        assert_eq!(
            classify_transaction_error(&err),
            ChainError::Program { code: 0x137 }
        );
    }

    #[test]
    fn test_fee_shortfall_is_classified() {
        assert_eq!(
            classify_transaction_error(&TransactionError::InsufficientFundsForFee),
            ChainError::InsufficientFundsForFee
        );
    }

    #[test]
    fn test_other_transaction_errors_keep_their_message() {
        let err = TransactionError::BlockhashNotFound;
        assert!(matches!(
            classify_transaction_error(&err),
            ChainError::TransactionFailed(_)
        ));
    }

    #[test]
    fn test_read_token_amount() {
        let mut data = vec![0u8; 165];
        data[64..72].copy_from_slice(&42u64.to_le_bytes());
        assert_eq!(read_token_amount(&data), Some(42));
        assert_eq!(read_token_amount(&data[..70]), None);
    }

    #[test]
    fn test_decode_rejects_foreign_owner() {
        let address = Pubkey::new_unique();
        let account = Account {
            lamports: 1,
            data: vec![0u8; 64],
            owner: Pubkey::new_unique(),
            executable: false,
            rent_epoch: 0,
        };
        assert_eq!(
            decode_candy_machine(&address, &account).unwrap_err(),
            ChainError::Decode(address)
        );
    }

    #[test]
    fn test_confirmation_survives_status_lookup_errors() {
        let mut calls = 0;
        let result = await_confirmation(
            || {
                calls += 1;
                match calls {
                    1 | 2 => Err(ChainError::Unreachable("http://127.0.0.1:1".into())),
                    3 => Ok(SignatureState::Unseen),
                    4 => Ok(SignatureState::Landed { satisfied: false }),
                    _ => Ok(SignatureState::Landed { satisfied: true }),
                }
            },
            Duration::from_secs(5),
            Duration::from_millis(1),
        );
        assert_eq!(result, Ok(()));
        assert_eq!(calls, 5);
    }

    #[test]
    fn test_confirmation_times_out_only_after_the_deadline() {
        let timeout = Duration::from_millis(30);
        let started = Instant::now();
        let mut calls = 0;
        let result = await_confirmation(
            || {
                calls += 1;
                Err(ChainError::Unreachable("http://127.0.0.1:1".into()))
            },
            timeout,
            Duration::from_millis(1),
        );
        assert_eq!(result, Err(ChainError::Timeout(timeout)));
        assert!(started.elapsed() >= timeout);
        assert!(calls > 1);
    }

    #[test]
    fn test_failed_transaction_ends_confirmation_early() {
        let mut calls = 0;
        let result = await_confirmation(
            || {
                calls += 1;
                Ok(SignatureState::Failed(TransactionError::InstructionError(
                    0,
                    InstructionError::Custom(6010),
                )))
            },
            Duration::from_secs(5),
            Duration::from_millis(1),
        );
        assert_eq!(result, Err(ChainError::Program { code: 6010 }));
        assert_eq!(calls, 1);
    }
}
