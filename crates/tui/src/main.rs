mod app;
mod ui;

use std::fs::OpenOptions;
use std::io::{self, stdout};
use std::path::Path;
use std::str::FromStr;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::prelude::*;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use candy_drop::config::cluster_to_url;
use candy_drop::constants::{DEFAULT_REFRESH_SECS, DEFAULT_TX_TIMEOUT_SECS};
use candy_drop::gateway::{GateStep, RpcGateway};
use candy_drop::metadata::GalleryItem;
use candy_drop::mint::GatedMint;
use candy_drop::{Commitment, DropSettings, DropSnapshot, MintAttempt, WalletContext};

use app::lamports_to_sol;

#[derive(Parser)]
#[command(name = "candy-drop-tui")]
#[command(about = "Terminal client for a Candy Machine v2 drop")]
struct Cli {
    /// Candy machine account address
    #[arg(long, env = "CANDY_MACHINE_ID")]
    candy_machine: Option<String>,

    /// Solana cluster (localnet, devnet, mainnet-beta, or a custom RPC URL)
    #[arg(long, env = "SOLANA_NETWORK", default_value = "devnet")]
    cluster: String,

    /// Only show NFTs whose metadata names this update authority
    #[arg(long, env = "UPDATE_AUTHORITY")]
    update_authority: Option<String>,

    /// Path to the keypair JSON file used as the wallet
    #[arg(long, env = "KEYPAIR")]
    keypair: Option<String>,

    /// Seconds to wait for a transaction to confirm
    #[arg(long, default_value_t = DEFAULT_TX_TIMEOUT_SECS)]
    tx_timeout_secs: u64,

    /// Seconds between drop state refreshes
    #[arg(long, default_value_t = DEFAULT_REFRESH_SECS)]
    refresh_secs: u64,

    /// File that receives diagnostic logs
    #[arg(long, default_value = "candy-drop.log")]
    log_file: String,

    /// Log filter (trace, debug, info, warn, error); falls back to RUST_LOG
    #[arg(long)]
    log_level: Option<String>,

    /// Print progress info to stderr
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    action: Option<Action>,
}

#[derive(Subcommand)]
enum Action {
    /// Read-only drop state dump
    Status,
    /// Mint one NFT, waiting for identity verification if the drop requires it
    Mint,
    /// List NFTs held by the wallet
    Gallery,
}

impl Action {
    fn name(&self) -> &'static str {
        match self {
            Action::Status => "status",
            Action::Mint => "mint",
            Action::Gallery => "gallery",
        }
    }
}

// ---------------------------------------------------------------------------
// JSON output types
// ---------------------------------------------------------------------------

#[derive(Serialize)]
#[serde(tag = "type")]
enum CliOutput {
    #[serde(rename = "success")]
    Success {
        action: String,
        signature: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        details: Option<serde_json::Value>,
    },
    #[serde(rename = "noop")]
    Noop { action: String, message: String },
    #[serde(rename = "error")]
    Error { action: String, error: String },
    #[serde(rename = "status")]
    Status(DropStatus),
    #[serde(rename = "gallery")]
    Gallery { wallet: String, items: Vec<GalleryItem> },
}

impl CliOutput {
    fn error(action: &str, error: impl Into<String>) -> Self {
        CliOutput::Error {
            action: action.into(),
            error: error.into(),
        }
    }
}

#[derive(Serialize)]
struct DropStatus {
    candy_machine: String,
    wallet: String,
    items_available: u64,
    items_redeemed: u64,
    items_remaining: u64,
    price: String,
    user_price: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    go_live_date: Option<i64>,
    is_active: bool,
    is_presale: bool,
    is_whitelist_user: bool,
    is_whitelist_only: bool,
    is_valid_balance: bool,
    is_sold_out: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    token_mint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    gatekeeper_network: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    collection_mint: Option<String>,
    estimated_tx_size: usize,
    needs_setup_transaction: bool,
    button: String,
}

fn build_status_output(snap: &DropSnapshot, wallet: &WalletContext) -> CliOutput {
    let (config, state) = (&snap.config, &snap.state);
    CliOutput::Status(DropStatus {
        candy_machine: config.id.to_string(),
        wallet: wallet
            .public_key()
            .map(|pk| pk.to_string())
            .unwrap_or_default(),
        items_available: config.items_available,
        items_redeemed: config.items_redeemed,
        items_remaining: state.items_remaining,
        price: lamports_to_sol(config.price),
        user_price: lamports_to_sol(state.user_price),
        go_live_date: config.go_live_date,
        is_active: state.is_active,
        is_presale: state.is_presale,
        is_whitelist_user: state.is_whitelist_user,
        is_whitelist_only: state.is_whitelist_only,
        is_valid_balance: state.is_valid_balance,
        is_sold_out: state.is_sold_out,
        token_mint: config.token_mint.map(|m| m.to_string()),
        gatekeeper_network: config.gatekeeper.map(|g| g.network.to_string()),
        collection_mint: config.collection.map(|c| c.mint.to_string()),
        estimated_tx_size: state.estimated_tx_size,
        needs_setup_transaction: state.needs_setup_transaction,
        button: state.button_label(false).to_string(),
    })
}

fn build_mint_output(attempt: &MintAttempt, remaining: Option<u64>) -> Result<CliOutput, CliOutput> {
    match attempt.signature {
        Some(signature) if attempt.outcome.is_success() => Ok(CliOutput::Success {
            action: "mint".into(),
            signature: signature.to_string(),
            details: Some(serde_json::json!({
                "mint": attempt.mint.map(|m| m.to_string()),
                "setup_signature": attempt.setup.map(|s| s.signature.to_string()),
                "items_remaining": remaining,
            })),
        }),
        _ => Err(CliOutput::error("mint", attempt.outcome.message())),
    }
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

fn setup_logging(path: &Path, level: Option<&str>) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open log file {}", path.display()))?;

    // A user-provided level wins over RUST_LOG.
    let filter = match level {
        Some(level) => EnvFilter::from_str(level).map_err(|_| {
            anyhow!(
                "Invalid log level: {:?}. Valid levels are: trace, debug, info, warn, error.",
                level
            )
        })?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow!("failed to install log subscriber: {e}"))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(Path::new(&cli.log_file), cli.log_level.as_deref())?;

    let settings = DropSettings::new(cluster_to_url(&cli.cluster), cli.candy_machine.as_deref())
        .with_update_authority(cli.update_authority.as_deref())
        .with_tx_timeout(Duration::from_secs(cli.tx_timeout_secs))
        .with_refresh_interval(Duration::from_secs(cli.refresh_secs));
    tracing::info!(rpc = %settings.rpc_url, "candy-drop starting");

    match cli.action {
        Some(action) => {
            run_oneshot(settings, cli.keypair, cli.verbose, action);
            Ok(())
        }
        None => Ok(run_interactive(settings, cli.keypair)?),
    }
}

fn run_interactive(settings: DropSettings, keypair: Option<String>) -> io::Result<()> {
    // Panic hook: always restore terminal.
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(panic);
    }));

    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = app::App::new(settings, keypair, false);
    if app.keypair_path.is_some() {
        app.connect_wallet();
        app.refresh_gallery();
    }
    let result = app.run(&mut terminal);

    disable_raw_mode()?;
    execute!(io::stdout(), LeaveAlternateScreen)?;

    result
}

fn print_output(output: &CliOutput) {
    match serde_json::to_string(output) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("failed to encode output: {e}"),
    }
}

fn run_oneshot(settings: DropSettings, keypair: Option<String>, verbose: bool, action: Action) {
    let action_name = action.name();
    let mut app = app::App::new(settings, keypair, verbose);
    app.connect_wallet();

    let output = if app.wallet.is_capable() {
        match action {
            Action::Status => run_status(&mut app),
            Action::Mint => run_mint(&mut app),
            Action::Gallery => run_gallery(&mut app),
        }
    } else {
        Err(CliOutput::error(
            action_name,
            "No wallet connected. Pass --keypair or set KEYPAIR.",
        ))
    };

    match output {
        Ok(output) => print_output(&output),
        Err(output) => {
            print_output(&output);
            std::process::exit(1);
        }
    }
}

fn refresh_or_error(app: &mut app::App, action: &str) -> Result<(), CliOutput> {
    app.refresh(Commitment::Confirmed);
    match (&app.snapshot, &app.refresh_error) {
        (Some(_), _) => Ok(()),
        (None, Some(error)) => Err(CliOutput::error(action, error.clone())),
        (None, None) => Err(CliOutput::error(action, "Drop state unavailable")),
    }
}

fn run_status(app: &mut app::App) -> Result<CliOutput, CliOutput> {
    refresh_or_error(app, "status")?;
    app.snapshot
        .as_ref()
        .map(|snap| build_status_output(snap, &app.wallet))
        .ok_or_else(|| CliOutput::error("status", "Drop state unavailable"))
}

fn run_gallery(app: &mut app::App) -> Result<CliOutput, CliOutput> {
    app.refresh_gallery();
    Ok(CliOutput::Gallery {
        wallet: app
            .wallet
            .public_key()
            .map(|pk| pk.to_string())
            .unwrap_or_default(),
        items: app.gallery.clone(),
    })
}

fn run_mint(app: &mut app::App) -> Result<CliOutput, CliOutput> {
    refresh_or_error(app, "mint")?;
    if !app.can_mint() {
        let message = match &app.snapshot {
            Some(s) if s.state.is_sold_out => "Drop is sold out".to_string(),
            Some(s) => format!("Minting unavailable ({})", s.state.button_label(false)),
            None => "Drop state unavailable".to_string(),
        };
        return Ok(CliOutput::Noop {
            action: "mint".into(),
            message,
        });
    }

    let attempt = match run_gated_mint(app)? {
        Some(attempt) => attempt,
        None => wait_for_verification(app)?,
    };
    app.apply_follow_up(attempt.follow_up);

    let remaining = app.snapshot.as_ref().map(|s| s.state.items_remaining);
    build_mint_output(&attempt, remaining)
}

/// One gated mint call. `Ok(None)` when verification is pending.
fn run_gated_mint(app: &mut app::App) -> Result<Option<MintAttempt>, CliOutput> {
    let gateway = RpcGateway::new(
        &app.chain,
        &app.settings.ws_url,
        &app.settings.civic_portal,
        &app.settings.verification_portal,
    );
    let result = app.orchestrator.mint_with_gateway(
        &app.chain,
        &gateway,
        &mut app.session,
        &app.wallet,
        app.snapshot.as_mut(),
        &app.hooks,
        app::unix_now(),
    );
    match result {
        Ok(GatedMint::Completed(attempt)) => Ok(Some(attempt)),
        Ok(GatedMint::AwaitingVerification { prompt }) => {
            eprintln!("Complete identity verification at {}", prompt);
            Ok(None)
        }
        Ok(GatedMint::Skipped) => Err(CliOutput::error("mint", "Wallet or drop state missing")),
        Err(e) => Err(CliOutput::error("mint", e.to_string())),
    }
}

fn wait_for_verification(app: &mut app::App) -> Result<MintAttempt, CliOutput> {
    let started = Instant::now();
    loop {
        let gateway = RpcGateway::new(
            &app.chain,
            &app.settings.ws_url,
            &app.settings.civic_portal,
            &app.settings.verification_portal,
        );
        let step = app
            .session
            .poll(&gateway, app::unix_now(), Instant::now(), Duration::from_secs(1))
            .map_err(|e| CliOutput::error("mint", e.to_string()))?;
        match step {
            GateStep::Ready => {
                app.push_log(format!(
                    "Identity verified after {}s",
                    started.elapsed().as_secs()
                ));
                return run_gated_mint(app)?
                    .ok_or_else(|| CliOutput::error("mint", "Identity verification incomplete"));
            }
            GateStep::Pending { .. } => std::thread::sleep(Duration::from_millis(500)),
            GateStep::Expired | GateStep::Idle => {
                return Err(CliOutput::error("mint", "Identity verification timed out"))
            }
        }
    }
}
