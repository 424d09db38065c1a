use std::io;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use ratatui::prelude::*;
use solana_sdk::pubkey::Pubkey;

use candy_drop::gateway::{GateStep, GatewaySession, RpcGateway};
use candy_drop::metadata::{list_owned_nfts, load_gallery, GalleryItem, HttpMetadataFetcher};
use candy_drop::mint::GatedMint;
use candy_drop::refresh::SkipReason;
use candy_drop::{
    Commitment, DropSettings, DropSnapshot, FollowUp, MintAttempt, MintHooks, MintOrchestrator,
    MintOutcome, RefreshOutcome, RefreshTimer, RpcChain, StateRefresher, WalletContext,
};

use crate::ui;

/// Upper bound on how long the event loop blocks between redraws.
const IDLE_TICK: Duration = Duration::from_millis(500);
/// How long a pending verification waits on its subscription per tick.
const VERIFY_WAIT: Duration = Duration::from_millis(200);

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Dashboard,
    Confirm,
    Verify,
}

// ---------------------------------------------------------------------------
// App
// ---------------------------------------------------------------------------

pub struct App {
    pub chain: RpcChain,
    pub settings: DropSettings,
    pub keypair_path: Option<String>,
    pub wallet: WalletContext,
    pub should_quit: bool,
    pub screen: Screen,
    pub message_log: Vec<String>,
    pub verbose: bool,

    // Drop state
    pub snapshot: Option<DropSnapshot>,
    pub last_refresh: Option<Instant>,
    /// Why the most recent refresh produced no snapshot.
    pub refresh_error: Option<String>,
    pub timer: RefreshTimer,

    // Minting
    pub orchestrator: MintOrchestrator,
    pub hooks: MintHooks,
    pub session: GatewaySession,
    pub verification_prompt: Option<String>,
    pub last_attempt: Option<MintAttempt>,

    pub gallery: Vec<GalleryItem>,
}

impl App {
    pub fn new(settings: DropSettings, keypair_path: Option<String>, verbose: bool) -> Self {
        let mut app = Self {
            chain: RpcChain::new(&settings.rpc_url),
            timer: RefreshTimer::new(settings.refresh_interval),
            orchestrator: MintOrchestrator::new(settings.tx_timeout),
            settings,
            keypair_path,
            wallet: WalletContext::Disconnected,
            should_quit: false,
            screen: Screen::Dashboard,
            message_log: Vec::new(),
            verbose,
            snapshot: None,
            last_refresh: None,
            refresh_error: None,
            hooks: MintHooks::default(),
            session: GatewaySession::new(),
            verification_prompt: None,
            last_attempt: None,
            gallery: Vec::new(),
        };
        app.push_log("Welcome to Candy Drop");
        match app.settings.candy_machine_id {
            Some(id) => app.push_log(format!("Candy machine: {id}")),
            None => {
                let msg = app
                    .settings
                    .config_error
                    .clone()
                    .unwrap_or_else(|| "No candy machine configured.".into());
                app.push_log(msg);
            }
        }
        app
    }

    pub fn push_log(&mut self, msg: impl Into<String>) {
        let msg = msg.into();
        if self.verbose {
            eprintln!("[INFO] {}", msg);
        }
        self.message_log.push(msg);
        if self.message_log.len() > 100 {
            self.message_log.remove(0);
        }
    }

    pub fn is_minting(&self) -> bool {
        self.orchestrator.is_minting()
    }

    pub fn can_mint(&self) -> bool {
        self.wallet.is_capable()
            && self
                .snapshot
                .as_ref()
                .is_some_and(|s| s.state.can_mint(self.is_minting()))
    }

    pub fn run(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    ) -> io::Result<()> {
        self.timer.start(Instant::now());

        while !self.should_quit {
            if self.timer.due(Instant::now()) {
                self.refresh(Commitment::Confirmed);
                self.timer.complete(Instant::now());
            }
            if self.session.is_pending() {
                self.poll_verification();
            }

            terminal.draw(|frame| ui::draw(frame, self))?;

            let wait = self
                .timer
                .time_until_due(Instant::now())
                .map_or(IDLE_TICK, |d| d.min(IDLE_TICK));
            if !event::poll(wait)? {
                continue;
            }
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                if key.modifiers.contains(KeyModifiers::CONTROL)
                    && key.code == KeyCode::Char('c')
                {
                    self.should_quit = true;
                    continue;
                }
                match self.screen {
                    Screen::Dashboard => self.handle_dashboard(key.code),
                    Screen::Confirm => self.handle_confirm(key.code),
                    Screen::Verify => self.handle_verify(key.code),
                }
            }
        }

        self.timer.stop();
        self.session.cancel();
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Key handlers
    // -----------------------------------------------------------------------

    fn handle_dashboard(&mut self, key: KeyCode) {
        match key {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('r') => self.timer.trigger(Instant::now()),
            KeyCode::Char('c') => {
                self.connect_wallet();
                self.refresh_gallery();
            }
            KeyCode::Char('g') if self.wallet.public_key().is_some() => self.refresh_gallery(),
            KeyCode::Char('m') if self.can_mint() => self.screen = Screen::Confirm,
            KeyCode::Char('m') => self.push_log("Minting is not available right now."),
            _ => {}
        }
    }

    fn handle_confirm(&mut self, key: KeyCode) {
        match key {
            KeyCode::Char('y') | KeyCode::Char('Y') => {
                self.screen = Screen::Dashboard;
                self.mint();
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                self.screen = Screen::Dashboard;
                self.push_log(MintOutcome::Cancelled.message());
            }
            _ => {}
        }
    }

    fn handle_verify(&mut self, key: KeyCode) {
        match key {
            KeyCode::Esc => {
                self.session.cancel();
                self.verification_prompt = None;
                self.screen = Screen::Dashboard;
                self.push_log("Verification abandoned.");
            }
            KeyCode::Char('q') => self.should_quit = true,
            _ => {}
        }
    }

    // -----------------------------------------------------------------------
    // Wallet
    // -----------------------------------------------------------------------

    pub fn connect_wallet(&mut self) {
        let Some(path) = self.keypair_path.clone() else {
            self.push_log("No keypair configured. Pass --keypair or set KEYPAIR.");
            return;
        };
        match WalletContext::connect(&path) {
            Ok(wallet) => {
                self.wallet = wallet;
                if let Some(pubkey) = self.wallet.public_key() {
                    self.push_log(format!("Wallet connected: {}", pubkey));
                }
                self.timer.trigger(Instant::now());
            }
            Err(e) => self.push_log(e.to_string()),
        }
    }

    // -----------------------------------------------------------------------
    // Refresh
    // -----------------------------------------------------------------------

    /// Runs one refresh cycle. A failed cycle keeps the previous snapshot.
    pub fn refresh(&mut self, commitment: Commitment) {
        let outcome = StateRefresher::new(&self.chain, &self.settings).refresh(
            &self.wallet,
            commitment,
            unix_now(),
        );
        match outcome {
            RefreshOutcome::Updated(snapshot) => {
                self.snapshot = Some(snapshot);
                self.last_refresh = Some(Instant::now());
                self.refresh_error = None;
            }
            RefreshOutcome::Skipped(reason) => {
                let msg = match reason {
                    SkipReason::WalletNotReady => "Wallet not connected.".to_string(),
                    SkipReason::MissingDropId => "No candy machine configured.".to_string(),
                    SkipReason::ConfigError(msg) => msg,
                };
                self.refresh_error = Some(msg);
            }
            RefreshOutcome::Failed(msg) => {
                if self.refresh_error.as_ref() != Some(&msg) {
                    self.push_log(msg.clone());
                }
                self.refresh_error = Some(msg);
            }
        }
    }

    pub fn refresh_gallery(&mut self) {
        let Some(owner) = self.wallet.public_key() else {
            return;
        };
        match list_owned_nfts(&self.chain, &owner, self.settings.update_authority.as_ref()) {
            Ok(nfts) => {
                self.gallery = load_gallery(&HttpMetadataFetcher, &nfts);
                self.push_log(format!("Gallery: {} NFT(s)", self.gallery.len()));
            }
            Err(e) => self.push_log(format!("Failed to load gallery: {e}")),
        }
    }

    // -----------------------------------------------------------------------
    // Mint
    // -----------------------------------------------------------------------

    pub fn mint(&mut self) {
        let gateway = RpcGateway::new(
            &self.chain,
            &self.settings.ws_url,
            &self.settings.civic_portal,
            &self.settings.verification_portal,
        );
        let result = self.orchestrator.mint_with_gateway(
            &self.chain,
            &gateway,
            &mut self.session,
            &self.wallet,
            self.snapshot.as_mut(),
            &self.hooks,
            unix_now(),
        );
        match result {
            Ok(GatedMint::Skipped) => {
                self.push_log("Connect a wallet and wait for drop state before minting.")
            }
            Ok(GatedMint::AwaitingVerification { prompt }) => {
                self.push_log(format!("Complete identity verification at {prompt}"));
                self.verification_prompt = Some(prompt);
                self.screen = Screen::Verify;
            }
            Ok(GatedMint::Completed(attempt)) => self.finish_attempt(attempt),
            Err(e) => self.push_log(format!("Mint failed: {e}")),
        }
    }

    fn poll_verification(&mut self) {
        let gateway = RpcGateway::new(
            &self.chain,
            &self.settings.ws_url,
            &self.settings.civic_portal,
            &self.settings.verification_portal,
        );
        let step = self
            .session
            .poll(&gateway, unix_now(), Instant::now(), VERIFY_WAIT);
        match step {
            Ok(GateStep::Pending { .. }) | Ok(GateStep::Idle) => {}
            Ok(GateStep::Ready) => {
                self.verification_prompt = None;
                self.screen = Screen::Dashboard;
                self.push_log("Identity verified.");
                self.mint();
            }
            Ok(GateStep::Expired) => {
                self.verification_prompt = None;
                self.screen = Screen::Dashboard;
                self.push_log("Identity verification timed out.");
            }
            Err(e) => {
                self.verification_prompt = None;
                self.screen = Screen::Dashboard;
                self.push_log(format!("Verification failed: {e}"));
            }
        }
    }

    /// Re-reads drop state the way a finished attempt asks for.
    pub fn apply_follow_up(&mut self, follow_up: FollowUp) {
        match follow_up {
            FollowUp::Refresh(commitment) => self.refresh(commitment),
            FollowUp::Reload => {
                self.orchestrator.reset();
                self.snapshot = None;
                self.refresh(Commitment::Confirmed);
            }
        }
    }

    fn finish_attempt(&mut self, attempt: MintAttempt) {
        if let Some(setup) = &attempt.setup {
            self.push_log(format!("Setup TX: {}", setup.signature));
        }
        if let Some(sig) = &attempt.signature {
            self.push_log(format!("Mint TX: {}", sig));
        }
        self.push_log(attempt.outcome.message());

        self.apply_follow_up(attempt.follow_up);
        self.timer.complete(Instant::now());

        if attempt.outcome.is_success() {
            self.refresh_gallery();
        }
        self.last_attempt = Some(attempt);
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

pub fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

pub fn short_pubkey(pubkey: &Pubkey) -> String {
    let s = pubkey.to_string();
    if s.len() > 12 {
        format!("{}..{}", &s[..4], &s[s.len() - 4..])
    } else {
        s
    }
}

pub fn lamports_to_sol(lamports: u64) -> String {
    let sol = lamports as f64 / 1_000_000_000.0;
    if sol == 0.0 {
        "0".to_string()
    } else if sol < 0.001 {
        format!("{:.9}", sol)
    } else {
        format!("{:.4}", sol)
    }
}

pub fn format_duration(secs: i64) -> String {
    if secs <= 0 {
        return "0s".into();
    }
    let days = secs / 86400;
    let hours = (secs % 86400) / 3600;
    let mins = (secs % 3600) / 60;
    if days > 0 {
        format!("{}d {}h", days, hours)
    } else if hours > 0 {
        format!("{}h {}m", hours, mins)
    } else if mins > 0 {
        format!("{}m {}s", mins, secs % 60)
    } else {
        format!("{}s", secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lamports_to_sol() {
        assert_eq!(lamports_to_sol(0), "0");
        assert_eq!(lamports_to_sol(1_500_000_000), "1.5000");
        assert_eq!(lamports_to_sol(10_000), "0.000010000");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(-5), "0s");
        assert_eq!(format_duration(45), "45s");
        assert_eq!(format_duration(125), "2m 5s");
        assert_eq!(format_duration(3 * 3600 + 60), "3h 1m");
        assert_eq!(format_duration(2 * 86400 + 7200), "2d 2h");
    }

    #[test]
    fn test_short_pubkey() {
        let pk = Pubkey::new_unique();
        let s = short_pubkey(&pk);
        assert_eq!(s.len(), 10);
        assert!(pk.to_string().starts_with(&s[..4]));
    }

    fn offline_app() -> App {
        // Nothing listens on port 1; a disconnected wallet skips every chain read.
        let id = Pubkey::new_unique().to_string();
        let settings = DropSettings::new("http://127.0.0.1:1", Some(&id));
        App::new(settings, None, false)
    }

    fn stale_snapshot() -> DropSnapshot {
        let cm = candy_drop::state::CandyMachine::default();
        DropSnapshot {
            config: candy_drop::DropConfig::from_candy_machine(Pubkey::new_unique(), &cm, None),
            state: candy_drop::DropState::default(),
            fetched_at: 0,
        }
    }

    #[test]
    fn test_reload_follow_up_drops_the_snapshot() {
        let mut app = offline_app();
        app.snapshot = Some(stale_snapshot());
        app.apply_follow_up(FollowUp::Reload);
        assert!(app.snapshot.is_none());
        assert!(app.orchestrator.prepared_mint().is_none());
        assert_eq!(app.refresh_error.as_deref(), Some("Wallet not connected."));
    }

    #[test]
    fn test_refresh_follow_up_runs_a_refresh() {
        let mut app = offline_app();
        assert!(app.refresh_error.is_none());
        app.apply_follow_up(FollowUp::Refresh(Commitment::Processed));
        assert_eq!(app.refresh_error.as_deref(), Some("Wallet not connected."));
    }
}
