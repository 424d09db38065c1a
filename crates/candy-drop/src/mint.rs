use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use solana_sdk::{
    instruction::Instruction,
    pubkey::Pubkey,
    signature::{Keypair, Signature, Signer},
    transaction::Transaction,
};
use tracing::{info, warn};

use crate::chain::{ChainReader, ChainWriter, Commitment};
use crate::constants::*;
use crate::eligibility::DropSnapshot;
use crate::errors::{ChainError, MintError};
use crate::gateway::{GateStep, GatewaySession, IdentityGateway};
use crate::instructions::{mint_instructions, setup_instructions};
use crate::pda::{get_ata, metadata_pda};
use crate::wallet::WalletContext;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Caller-supplied instructions sent as their own transactions around the mint.
#[derive(Clone, Debug, Default)]
pub struct MintHooks {
    pub before: Vec<Instruction>,
    pub after: Vec<Instruction>,
}

/// A mint account created by a confirmed setup transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PreparedMint {
    pub mint: Pubkey,
    pub token_account: Pubkey,
    pub signature: Signature,
}

/// How the caller should resynchronise drop state after an attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FollowUp {
    Refresh(Commitment),
    /// Local state is stale enough to discard; reset and reload everything.
    Reload,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MintOutcome {
    Success,
    SetupFailed,
    /// Confirmed, but no metadata exists for the new mint.
    LikelyFailed,
    SoldOut,
    NotLive,
    InsufficientFunds,
    Timeout,
    Cancelled,
    Failed(String),
}

impl MintOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, MintOutcome::Success)
    }

    pub fn message(&self) -> String {
        match self {
            MintOutcome::Success => "Congratulations! Mint succeeded!".into(),
            MintOutcome::SetupFailed => "Mint failed! Please try again!".into(),
            MintOutcome::LikelyFailed => format!(
                "Mint likely failed! Anti-bot SOL {} fee potentially charged! \
                 Check the explorer to confirm the mint failed and if so, \
                 make sure you are eligible to mint before trying again.",
                BOT_FEE as f64 / LAMPORTS_PER_SOL as f64
            ),
            MintOutcome::SoldOut => "SOLD OUT!".into(),
            MintOutcome::NotLive => "Minting period hasn't started yet.".into(),
            MintOutcome::InsufficientFunds => {
                "Insufficient funds to mint. Please fund your wallet.".into()
            }
            MintOutcome::Timeout => "Timed out waiting for confirmation! Please try again.".into(),
            MintOutcome::Cancelled => "Mint cancelled.".into(),
            MintOutcome::Failed(detail) => format!("Minting failed! Please try again! ({detail})"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MintAttempt {
    pub setup: Option<PreparedMint>,
    pub mint: Option<Pubkey>,
    pub signature: Option<Signature>,
    pub metadata_found: bool,
    pub outcome: MintOutcome,
    pub follow_up: FollowUp,
}

impl MintAttempt {
    fn new(setup: Option<PreparedMint>) -> Self {
        Self {
            setup,
            mint: None,
            signature: None,
            metadata_found: false,
            outcome: MintOutcome::Failed("not attempted".into()),
            follow_up: FollowUp::Refresh(Commitment::Confirmed),
        }
    }

    fn fail(mut self, err: &ChainError) -> Self {
        self.outcome = classify_failure(err);
        self.follow_up = match self.outcome {
            MintOutcome::SoldOut => FollowUp::Reload,
            _ => FollowUp::Refresh(Commitment::Confirmed),
        };
        self
    }
}

#[derive(Debug)]
pub enum GatedMint {
    /// Wallet or drop state missing.
    Skipped,
    AwaitingVerification { prompt: String },
    Completed(MintAttempt),
}

/// Maps a classified chain failure onto the user-facing outcome.
pub fn classify_failure(err: &ChainError) -> MintOutcome {
    match err {
        ChainError::Program { code } => match *code {
            ERR_LEGACY_SOLD_OUT | ERR_CANDY_MACHINE_EMPTY => MintOutcome::SoldOut,
            ERR_LEGACY_NOT_LIVE | ERR_CANDY_MACHINE_NOT_LIVE => MintOutcome::NotLive,
            ERR_LEGACY_NOT_ENOUGH_SOL | ERR_NOT_ENOUGH_TOKENS | ERR_NOT_ENOUGH_SOL => {
                MintOutcome::InsufficientFunds
            }
            other => MintOutcome::Failed(format!("program error {other:#x}")),
        },
        ChainError::InsufficientFundsForFee => MintOutcome::InsufficientFunds,
        ChainError::Timeout(_) => MintOutcome::Timeout,
        ChainError::Signing(_) => MintOutcome::Cancelled,
        ChainError::AccountNotFound(_)
        | ChainError::Unreachable(_)
        | ChainError::TransactionFailed(_)
        | ChainError::Decode(_)
        | ChainError::Rpc(_) => MintOutcome::Failed(err.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// Clears the in-flight flag when dropped.
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Runs mint attempts, at most one at a time.
pub struct MintOrchestrator {
    in_flight: AtomicBool,
    prepared: Mutex<Option<PreparedMint>>,
    tx_timeout: Duration,
    verification_timeout: Duration,
}

impl MintOrchestrator {
    pub fn new(tx_timeout: Duration) -> Self {
        Self {
            in_flight: AtomicBool::new(false),
            prepared: Mutex::new(None),
            tx_timeout,
            verification_timeout: Duration::from_secs(DEFAULT_VERIFICATION_SECS),
        }
    }

    pub fn with_verification_timeout(mut self, timeout: Duration) -> Self {
        self.verification_timeout = timeout;
        self
    }

    pub fn is_minting(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn prepared_mint(&self) -> Option<PreparedMint> {
        match self.prepared.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    /// Forgets any prepared mint account, e.g. after a full reload.
    pub fn reset(&self) {
        self.set_prepared(None);
    }

    fn set_prepared(&self, value: Option<PreparedMint>) {
        match self.prepared.lock() {
            Ok(mut guard) => *guard = value,
            Err(poisoned) => *poisoned.into_inner() = value,
        }
    }

    fn try_lock(&self) -> Result<InFlightGuard<'_>, MintError> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| InFlightGuard(&self.in_flight))
            .map_err(|_| MintError::AttemptInFlight)
    }

    /// Runs one mint attempt. `Ok(None)` when the wallet cannot sign or no
    /// drop state is loaded.
    pub fn attempt_mint<C: ChainReader + ChainWriter>(
        &self,
        chain: &C,
        wallet: &WalletContext,
        snapshot: Option<&mut DropSnapshot>,
        hooks: &MintHooks,
    ) -> Result<Option<MintAttempt>, MintError> {
        let (Some(payer), Some(snapshot)) = (wallet.signer(), snapshot) else {
            return Ok(None);
        };
        let _guard = self.try_lock()?;
        Ok(Some(self.run(chain, payer, snapshot, hooks)))
    }

    /// Like `attempt_mint`, but first clears the drop's gatekeeper when it
    /// has one and minting is open.
    #[allow(clippy::too_many_arguments)]
    pub fn mint_with_gateway<C: ChainReader + ChainWriter, G: IdentityGateway>(
        &self,
        chain: &C,
        gateway: &G,
        session: &mut GatewaySession,
        wallet: &WalletContext,
        snapshot: Option<&mut DropSnapshot>,
        hooks: &MintHooks,
        now: i64,
    ) -> Result<GatedMint, MintError> {
        let (Some(payer), Some(snapshot)) = (wallet.signer(), snapshot) else {
            return Ok(GatedMint::Skipped);
        };
        let _guard = self.try_lock()?;

        if let Some(gatekeeper) = snapshot.config.gatekeeper.filter(|_| snapshot.state.is_active) {
            let deadline = Instant::now() + self.verification_timeout;
            match session.begin(gateway, &payer.pubkey(), &gatekeeper, now, deadline)? {
                GateStep::Ready => {}
                GateStep::Pending { prompt } => {
                    return Ok(GatedMint::AwaitingVerification { prompt })
                }
                GateStep::Expired | GateStep::Idle => return Ok(GatedMint::Skipped),
            }
        }

        Ok(GatedMint::Completed(self.run(chain, payer, snapshot, hooks)))
    }

    fn run<C: ChainReader + ChainWriter>(
        &self,
        chain: &C,
        payer: &Keypair,
        snapshot: &mut DropSnapshot,
        hooks: &MintHooks,
    ) -> MintAttempt {
        let payer_key = payer.pubkey();
        let mut attempt = MintAttempt::new(self.prepared_mint());

        if !hooks.before.is_empty() {
            if let Err(e) = self.send_and_confirm(chain, &hooks.before, payer, &[]) {
                warn!("pre-mint transaction failed: {e}");
                return attempt.fail(&e);
            }
        }

        // Either reuse a confirmed setup, run one now, or inline it into the mint.
        let mut mint_signer = None;
        let mut inline_setup = Vec::new();
        let mint = match attempt.setup {
            Some(prepared) => prepared.mint,
            None if snapshot.state.needs_setup_transaction => match self.send_setup(chain, payer) {
                Ok(prepared) => {
                    info!(mint = %prepared.mint, signature = %prepared.signature, "setup transaction confirmed");
                    self.set_prepared(Some(prepared));
                    attempt.setup = Some(prepared);
                    prepared.mint
                }
                Err(e) => {
                    warn!("setup transaction failed: {e}");
                    attempt.outcome = MintOutcome::SetupFailed;
                    return attempt;
                }
            },
            None => {
                let mint_keypair = Keypair::new();
                let rent = match chain.minimum_balance_for_rent_exemption(MINT_LAYOUT) {
                    Ok(rent) => rent,
                    Err(e) => return attempt.fail(&e),
                };
                match setup_instructions(&payer_key, &mint_keypair.pubkey(), rent) {
                    Ok(ixs) => inline_setup = ixs,
                    Err(e) => {
                        attempt.outcome = MintOutcome::Failed(e.to_string());
                        return attempt;
                    }
                }
                let mint = mint_keypair.pubkey();
                mint_signer = Some(mint_keypair);
                mint
            }
        };
        attempt.mint = Some(mint);

        let plan = match mint_instructions(
            &snapshot.config,
            &payer_key,
            &mint,
            snapshot.state.is_whitelist_user,
            snapshot.state.user_price,
        ) {
            Ok(plan) => plan,
            Err(e) => {
                attempt.outcome = MintOutcome::Failed(e.to_string());
                return attempt;
            }
        };

        let mut instructions = inline_setup;
        instructions.extend(plan.instructions);
        let mut signers: Vec<&Keypair> = plan.extra_signers.iter().collect();
        if let Some(kp) = &mint_signer {
            signers.push(kp);
        }

        let signature = match self.sign_and_send(chain, &instructions, payer, &signers) {
            Ok(signature) => signature,
            Err(e) => {
                warn!(%mint, "mint transaction rejected: {e}");
                return attempt.fail(&e);
            }
        };
        attempt.signature = Some(signature);
        info!(%signature, %mint, "mint transaction sent");

        if let Err(e) = chain.confirm_transaction(&signature, self.tx_timeout, Commitment::Confirmed) {
            warn!(%signature, "mint transaction failed: {e}");
            return attempt.fail(&e);
        }

        attempt.metadata_found = matches!(
            chain.fetch_account(&metadata_pda(&mint), Commitment::Processed),
            Ok(Some(_))
        );

        let mut cleanup = plan.cleanup;
        cleanup.extend(hooks.after.iter().cloned());
        if !cleanup.is_empty() {
            if let Err(e) = self.send_and_confirm(chain, &cleanup, payer, &[]) {
                warn!("post-mint cleanup failed: {e}");
            }
        }

        if attempt.metadata_found {
            snapshot.state.record_mint_success();
            self.set_prepared(None);
            attempt.outcome = MintOutcome::Success;
            attempt.follow_up = FollowUp::Refresh(Commitment::Processed);
            info!(%mint, remaining = snapshot.state.items_remaining, "mint succeeded");
        } else {
            warn!(%mint, "mint confirmed without metadata");
            attempt.outcome = MintOutcome::LikelyFailed;
            attempt.follow_up = FollowUp::Refresh(Commitment::Confirmed);
        }
        attempt
    }

    fn send_setup<C: ChainReader + ChainWriter>(
        &self,
        chain: &C,
        payer: &Keypair,
    ) -> Result<PreparedMint, ChainError> {
        let mint = Keypair::new();
        let rent = chain.minimum_balance_for_rent_exemption(MINT_LAYOUT)?;
        let instructions = setup_instructions(&payer.pubkey(), &mint.pubkey(), rent)
            .map_err(|e| ChainError::TransactionFailed(e.to_string()))?;
        let signature = self.send_and_confirm(chain, &instructions, payer, &[&mint])?;
        Ok(PreparedMint {
            mint: mint.pubkey(),
            token_account: get_ata(&payer.pubkey(), &mint.pubkey()),
            signature,
        })
    }

    fn send_and_confirm<C: ChainWriter>(
        &self,
        chain: &C,
        instructions: &[Instruction],
        payer: &Keypair,
        extra_signers: &[&Keypair],
    ) -> Result<Signature, ChainError> {
        let signature = self.sign_and_send(chain, instructions, payer, extra_signers)?;
        chain.confirm_transaction(&signature, self.tx_timeout, Commitment::Confirmed)?;
        Ok(signature)
    }

    fn sign_and_send<C: ChainWriter>(
        &self,
        chain: &C,
        instructions: &[Instruction],
        payer: &Keypair,
        extra_signers: &[&Keypair],
    ) -> Result<Signature, ChainError> {
        let blockhash = chain.latest_blockhash()?;

        let mut signers: Vec<&dyn Signer> = vec![payer];
        for kp in extra_signers {
            signers.push(*kp);
        }

        let mut tx = Transaction::new_with_payer(instructions, Some(&payer.pubkey()));
        tx.try_sign(&signers, blockhash)
            .map_err(|e| ChainError::Signing(e.to_string()))?;
        chain.send_transaction(&tx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_sold_out_codes() {
        for code in [311, 0x137, 6010] {
            assert_eq!(classify_failure(&ChainError::Program { code }), MintOutcome::SoldOut);
        }
    }

    #[test]
    fn test_classify_not_live_and_funds() {
        assert_eq!(classify_failure(&ChainError::Program { code: 312 }), MintOutcome::NotLive);
        assert_eq!(classify_failure(&ChainError::Program { code: 6011 }), MintOutcome::NotLive);
        for code in [0x135, 6007, 6008] {
            assert_eq!(
                classify_failure(&ChainError::Program { code }),
                MintOutcome::InsufficientFunds
            );
        }
        assert_eq!(
            classify_failure(&ChainError::InsufficientFundsForFee),
            MintOutcome::InsufficientFunds
        );
    }

    #[test]
    fn test_classify_timeout_cancel_and_generic() {
        assert_eq!(
            classify_failure(&ChainError::Timeout(Duration::from_secs(60))),
            MintOutcome::Timeout
        );
        assert_eq!(
            classify_failure(&ChainError::Signing("declined".into())),
            MintOutcome::Cancelled
        );
        assert!(matches!(
            classify_failure(&ChainError::Program { code: 6020 }),
            MintOutcome::Failed(_)
        ));
        assert!(matches!(
            classify_failure(&ChainError::Rpc("boom".into())),
            MintOutcome::Failed(_)
        ));
    }

    #[test]
    fn test_sold_out_message_and_reload() {
        let attempt = MintAttempt::new(None).fail(&ChainError::Program { code: 0x137 });
        assert_eq!(attempt.outcome.message(), "SOLD OUT!");
        assert_eq!(attempt.follow_up, FollowUp::Reload);
    }

    #[test]
    fn test_bot_fee_message() {
        assert!(MintOutcome::LikelyFailed.message().contains("0.01"));
    }

    #[test]
    fn test_lock_is_exclusive() {
        let orchestrator = MintOrchestrator::new(Duration::from_secs(1));
        let guard = orchestrator.try_lock().unwrap();
        assert!(orchestrator.is_minting());
        assert!(matches!(orchestrator.try_lock(), Err(MintError::AttemptInFlight)));
        drop(guard);
        assert!(!orchestrator.is_minting());
        assert!(orchestrator.try_lock().is_ok());
    }
}
