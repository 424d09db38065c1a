#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;
use std::time::Duration;

use anchor_lang::AccountSerialize;
use candy_drop::chain::TokenHolding;
use candy_drop::gateway::{GatekeeperProtocol, IdentityGateway, TokenStatus, TokenSubscription};
use candy_drop::instructions::sighash;
use candy_drop::pda::{collection_pda, metadata_pda};
use candy_drop::state::{CandyMachine, CandyMachineData, CollectionPDA};
use candy_drop::{
    ChainError, ChainReader, ChainWriter, Commitment, DropSettings, DropSnapshot, RefreshOutcome,
    StateRefresher, WalletContext,
};
use solana_sdk::{
    account::Account,
    hash::Hash,
    pubkey::Pubkey,
    signature::{Keypair, Signature},
    transaction::Transaction,
};

pub const NOW: i64 = 1_700_000_000;
pub const PRICE: u64 = 1_000_000_000;

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub fn candy_machine(items_available: u64, items_redeemed: u64) -> CandyMachine {
    CandyMachine {
        authority: Pubkey::new_unique(),
        wallet: Pubkey::new_unique(),
        token_mint: None,
        items_redeemed,
        data: CandyMachineData {
            uuid: "abc123".into(),
            price: PRICE,
            symbol: "CNDY".into(),
            items_available,
            go_live_date: Some(NOW - 60),
            retain_authority: true,
            ..Default::default()
        },
    }
}

pub fn settings(id: &Pubkey) -> DropSettings {
    DropSettings::new("http://127.0.0.1:8899", Some(&id.to_string()))
        .with_tx_timeout(Duration::from_secs(5))
}

pub fn connected_wallet() -> WalletContext {
    WalletContext::Connected(Keypair::new())
}

pub fn anchor_account<T: AccountSerialize>(account: &T) -> Account {
    let mut data = Vec::new();
    account.try_serialize(&mut data).unwrap();
    Account {
        lamports: 1_000_000,
        data,
        owner: candy_drop::ID,
        executable: false,
        rent_epoch: 0,
    }
}

/// Refreshes against `chain` and unwraps the snapshot.
pub fn snapshot(chain: &MockChain, settings: &DropSettings, wallet: &WalletContext) -> DropSnapshot {
    match StateRefresher::new(chain, settings).refresh(wallet, Commitment::Confirmed, NOW) {
        RefreshOutcome::Updated(snapshot) => snapshot,
        other => panic!("expected a snapshot, got {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// MockChain
// ---------------------------------------------------------------------------

#[derive(Default, Clone, Copy, Debug)]
pub struct Calls {
    pub fetch_candy_machine: usize,
    pub fetch_account: usize,
    pub native_balance: usize,
    pub token_balance: usize,
    pub send_transaction: usize,
    pub confirm_transaction: usize,
}

impl Calls {
    pub fn total(&self) -> usize {
        self.fetch_candy_machine
            + self.fetch_account
            + self.native_balance
            + self.token_balance
            + self.send_transaction
            + self.confirm_transaction
    }
}

pub struct MockChain {
    pub candy_machine_id: Pubkey,
    pub candy_machine: RefCell<Result<CandyMachine, ChainError>>,
    pub accounts: RefCell<HashMap<Pubkey, Account>>,
    pub native: RefCell<Result<u64, ChainError>>,
    /// Token account -> amount. Missing accounts fail with `AccountNotFound`.
    pub tokens: RefCell<HashMap<Pubkey, u64>>,
    pub holdings: RefCell<Vec<TokenHolding>>,
    pub send_results: RefCell<VecDeque<ChainError>>,
    pub confirm_results: RefCell<VecDeque<Result<(), ChainError>>>,
    /// Whether a confirmed `mint_nft` creates the mint's metadata account.
    pub mint_creates_metadata: Cell<bool>,
    pub sent: RefCell<Vec<Transaction>>,
    pub calls: RefCell<Calls>,
    pending_mints: RefCell<HashMap<Signature, Pubkey>>,
}

impl MockChain {
    pub fn new(id: Pubkey, candy_machine: CandyMachine) -> Self {
        Self {
            candy_machine_id: id,
            candy_machine: RefCell::new(Ok(candy_machine)),
            accounts: RefCell::new(HashMap::new()),
            native: RefCell::new(Ok(10 * PRICE)),
            tokens: RefCell::new(HashMap::new()),
            holdings: RefCell::new(Vec::new()),
            send_results: RefCell::new(VecDeque::new()),
            confirm_results: RefCell::new(VecDeque::new()),
            mint_creates_metadata: Cell::new(true),
            sent: RefCell::new(Vec::new()),
            calls: RefCell::new(Calls::default()),
            pending_mints: RefCell::new(HashMap::new()),
        }
    }

    pub fn calls(&self) -> Calls {
        *self.calls.borrow()
    }

    pub fn link_collection(&self, collection_mint: Pubkey) {
        let pda = collection_pda(&self.candy_machine_id);
        let account = anchor_account(&CollectionPDA {
            mint: collection_mint,
            candy_machine: self.candy_machine_id,
        });
        self.accounts.borrow_mut().insert(pda, account);
    }

    /// Fails the next `send_transaction` with `err`.
    pub fn reject_next_send(&self, err: ChainError) {
        self.send_results.borrow_mut().push_back(err);
    }

    pub fn queue_confirm(&self, result: Result<(), ChainError>) {
        self.confirm_results.borrow_mut().push_back(result);
    }

    pub fn sent_count(&self) -> usize {
        self.sent.borrow().len()
    }
}

fn mint_nft_target(tx: &Transaction) -> Option<Pubkey> {
    let discriminator = sighash("mint_nft");
    tx.message.instructions.iter().find_map(|ix| {
        let program = tx.message.account_keys.get(ix.program_id_index as usize)?;
        if *program != candy_drop::ID || !ix.data.starts_with(&discriminator) {
            return None;
        }
        let mint_index = *ix.accounts.get(5)? as usize;
        tx.message.account_keys.get(mint_index).copied()
    })
}

impl ChainReader for MockChain {
    fn fetch_candy_machine(
        &self,
        _address: &Pubkey,
        _commitment: Commitment,
    ) -> Result<CandyMachine, ChainError> {
        self.calls.borrow_mut().fetch_candy_machine += 1;
        self.candy_machine.borrow().clone()
    }

    fn fetch_account(
        &self,
        address: &Pubkey,
        _commitment: Commitment,
    ) -> Result<Option<Account>, ChainError> {
        self.calls.borrow_mut().fetch_account += 1;
        Ok(self.accounts.borrow().get(address).cloned())
    }

    fn native_balance(&self, _owner: &Pubkey, _commitment: Commitment) -> Result<u64, ChainError> {
        self.calls.borrow_mut().native_balance += 1;
        self.native.borrow().clone()
    }

    fn token_balance(
        &self,
        token_account: &Pubkey,
        _commitment: Commitment,
    ) -> Result<u64, ChainError> {
        self.calls.borrow_mut().token_balance += 1;
        self.tokens
            .borrow()
            .get(token_account)
            .copied()
            .ok_or(ChainError::AccountNotFound(*token_account))
    }

    fn token_accounts_by_owner(&self, _owner: &Pubkey) -> Result<Vec<TokenHolding>, ChainError> {
        Ok(self.holdings.borrow().clone())
    }
}

impl ChainWriter for MockChain {
    fn latest_blockhash(&self) -> Result<Hash, ChainError> {
        Ok(Hash::new_unique())
    }

    fn minimum_balance_for_rent_exemption(&self, _len: usize) -> Result<u64, ChainError> {
        Ok(1_461_600)
    }

    fn send_transaction(&self, transaction: &Transaction) -> Result<Signature, ChainError> {
        self.calls.borrow_mut().send_transaction += 1;
        if let Some(err) = self.send_results.borrow_mut().pop_front() {
            return Err(err);
        }
        self.sent.borrow_mut().push(transaction.clone());
        let signature = transaction.signatures[0];
        if let Some(mint) = mint_nft_target(transaction) {
            self.pending_mints.borrow_mut().insert(signature, mint);
        }
        Ok(signature)
    }

    fn confirm_transaction(
        &self,
        signature: &Signature,
        _timeout: Duration,
        _commitment: Commitment,
    ) -> Result<(), ChainError> {
        self.calls.borrow_mut().confirm_transaction += 1;
        let result = self.confirm_results.borrow_mut().pop_front().unwrap_or(Ok(()));
        if result.is_ok() && self.mint_creates_metadata.get() {
            if let Some(mint) = self.pending_mints.borrow_mut().remove(signature) {
                self.accounts.borrow_mut().insert(
                    metadata_pda(&mint),
                    Account {
                        lamports: 5_616_720,
                        data: vec![4u8; 679],
                        owner: candy_drop::constants::METADATA_PROGRAM_ID,
                        executable: false,
                        rent_epoch: 0,
                    },
                );
            }
        }
        result
    }
}

// ---------------------------------------------------------------------------
// MockGateway
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MockGateway {
    pub status: Cell<Option<TokenStatus>>,
    pub requests: Cell<usize>,
    pub live_subscriptions: Rc<Cell<usize>>,
    pub unsubscribed: Rc<Cell<usize>>,
    pending_change: Rc<Cell<bool>>,
}

impl MockGateway {
    pub fn with_status(status: TokenStatus) -> Self {
        let gateway = Self::default();
        gateway.status.set(Some(status));
        gateway
    }

    /// Simulates the gatekeeper issuing a token out of band.
    pub fn issue_token(&self) {
        self.status.set(Some(TokenStatus::Active));
        self.pending_change.set(true);
    }
}

impl IdentityGateway for MockGateway {
    fn token_status(
        &self,
        _owner: &Pubkey,
        _network: &Pubkey,
        _now: i64,
    ) -> Result<TokenStatus, ChainError> {
        Ok(self.status.get().unwrap_or(TokenStatus::Missing))
    }

    fn request_token(
        &self,
        _owner: &Pubkey,
        network: &Pubkey,
        protocol: GatekeeperProtocol,
    ) -> Result<String, ChainError> {
        self.requests.set(self.requests.get() + 1);
        Ok(match protocol {
            GatekeeperProtocol::RequestAndPoll => "https://getpass.civic.com".to_string(),
            GatekeeperProtocol::PopupSubscription => {
                format!("https://verify.encore.fans/?gkNetwork={network}")
            }
        })
    }

    fn subscribe(&self, _token: &Pubkey) -> Result<Box<dyn TokenSubscription>, ChainError> {
        self.live_subscriptions.set(self.live_subscriptions.get() + 1);
        Ok(Box::new(MockSubscription {
            live: Rc::clone(&self.live_subscriptions),
            unsubscribed: Rc::clone(&self.unsubscribed),
            pending_change: Rc::clone(&self.pending_change),
        }))
    }
}

pub struct MockSubscription {
    live: Rc<Cell<usize>>,
    unsubscribed: Rc<Cell<usize>>,
    pending_change: Rc<Cell<bool>>,
}

impl TokenSubscription for MockSubscription {
    fn wait_for_change(&mut self, _timeout: Duration) -> bool {
        self.pending_change.replace(false)
    }

    fn unsubscribe(self: Box<Self>) {
        self.live.set(self.live.get() - 1);
        self.unsubscribed.set(self.unsubscribed.get() + 1);
    }
}
