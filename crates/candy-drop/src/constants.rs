use solana_sdk::{pubkey, pubkey::Pubkey};

// Well-known program IDs
pub const SPL_TOKEN_ID: Pubkey = pubkey!("TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA");
pub const ATA_PROGRAM_ID: Pubkey = pubkey!("ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL");
pub const SYSTEM_PROGRAM_ID: Pubkey = pubkey!("11111111111111111111111111111111");
pub const METADATA_PROGRAM_ID: Pubkey = pubkey!("metaqbxxUerdq28cj1RbAWkYQm3ybzjb6a8bt518x1s");
pub const GATEWAY_PROGRAM_ID: Pubkey = pubkey!("gatem74V238djXdzWnJf94Wo1DcnuGkfijbf3AuBhfs");

pub const RENT_SYSVAR: Pubkey = pubkey!("SysvarRent111111111111111111111111111111111");
pub const CLOCK_SYSVAR: Pubkey = pubkey!("SysvarC1ock11111111111111111111111111111111");
pub const SLOT_HASHES_SYSVAR: Pubkey = pubkey!("SysvarS1otHashes111111111111111111111111111");
pub const INSTRUCTIONS_SYSVAR: Pubkey = pubkey!("Sysvar1nstructions1111111111111111111111111");

// Gatekeeper networks
pub const CIVIC_NETWORK: Pubkey = pubkey!("ignREusXmGrscGNUesoU9mxfds9AiYTezUKex2PsZV6");
pub const ENCORE_NETWORKS: [Pubkey; 2] = [
    pubkey!("ttib7tuX8PTWPqFsmUFQTj78MbRhUmqxidJRDv4hRRE"),
    pubkey!("tibePmPaoTgrs929rWpu755EXaxC7M3SthVCf6GzjZt"),
];

pub const ENCORE_PORTAL: &str = "https://verify.encore.fans";
pub const CIVIC_PORTAL: &str = "https://getpass.civic.com";

// Mint transaction size model (bytes)
pub const MINT_TX_BASE_SIZE: usize = 892;
pub const MINT_TX_COLLECTION_SIZE: usize = 182;
pub const MINT_TX_TOKEN_MINT_SIZE: usize = 66;
pub const MINT_TX_WHITELIST_SIZE: usize = 34;
pub const MINT_TX_WHITELIST_BURN_SIZE: usize = 34;
pub const MINT_TX_GATEKEEPER_SIZE: usize = 33;
pub const MINT_TX_GATEKEEPER_EXPIRE_SIZE: usize = 66;
/// Largest mint transaction that still leaves room for the inline setup instructions.
pub const MINT_TX_SIZE_CEILING: usize = 1230;

// Candy machine program error codes. Legacy codes predate the anchor 6000 offset.
pub const ERR_LEGACY_NOT_ENOUGH_SOL: u32 = 0x135;
pub const ERR_LEGACY_SOLD_OUT: u32 = 0x137;
pub const ERR_LEGACY_NOT_LIVE: u32 = 0x138;
pub const ERR_NOT_ENOUGH_TOKENS: u32 = 6007;
pub const ERR_NOT_ENOUGH_SOL: u32 = 6008;
pub const ERR_CANDY_MACHINE_EMPTY: u32 = 6010;
pub const ERR_CANDY_MACHINE_NOT_LIVE: u32 = 6011;

/// Lamports the program keeps from a bot-tax failure (0.01 SOL).
pub const BOT_FEE: u64 = 10_000_000;

/// Size of an SPL mint account.
pub const MINT_LAYOUT: usize = 82;

pub const DEFAULT_REFRESH_SECS: u64 = 20;
pub const DEFAULT_TX_TIMEOUT_SECS: u64 = 60;

pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;
/// How long a pending identity verification may stay open.
pub const DEFAULT_VERIFICATION_SECS: u64 = 300;
