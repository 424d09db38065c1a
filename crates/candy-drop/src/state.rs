use anchor_lang::prelude::*;

/// Candy machine account. Config lines follow `data` in the account and are
/// never read by this client.
#[account]
#[derive(Debug, Default)]
pub struct CandyMachine {
    pub authority: Pubkey,
    /// Treasury receiving the mint price.
    pub wallet: Pubkey,
    /// When set, the price is paid in this SPL token instead of lamports.
    pub token_mint: Option<Pubkey>,
    pub items_redeemed: u64,
    pub data: CandyMachineData,
}

impl CandyMachine {
    pub const CREATOR_SEED: &'static [u8] = b"candy_machine";
}

/// Links a candy machine to its collection mint. PDA seeds = [b"collection", candy_machine].
#[account]
#[derive(Debug, Default)]
pub struct CollectionPDA {
    pub mint: Pubkey,
    pub candy_machine: Pubkey,
}

impl CollectionPDA {
    pub const SEED: &'static [u8] = b"collection";
}

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, Default, PartialEq)]
pub struct CandyMachineData {
    pub uuid: String,
    pub price: u64,
    pub symbol: String,
    pub seller_fee_basis_points: u16,
    pub max_supply: u64,
    pub is_mutable: bool,
    pub retain_authority: bool,
    pub go_live_date: Option<i64>,
    pub end_settings: Option<EndSettings>,
    pub creators: Vec<Creator>,
    pub hidden_settings: Option<HiddenSettings>,
    pub whitelist_mint_settings: Option<WhitelistMintSettings>,
    pub items_available: u64,
    pub gatekeeper: Option<GatekeeperConfig>,
}

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct EndSettings {
    pub end_setting_type: EndSettingType,
    /// Unix timestamp for `Date`, item count for `Amount`.
    pub number: u64,
}

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum EndSettingType {
    Date,
    Amount,
}

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, Default, PartialEq)]
pub struct Creator {
    pub address: Pubkey,
    pub verified: bool,
    pub share: u8,
}

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, Default, PartialEq)]
pub struct HiddenSettings {
    pub name: String,
    pub uri: String,
    pub hash: [u8; 32],
}

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct WhitelistMintSettings {
    pub mode: WhitelistMintMode,
    pub mint: Pubkey,
    pub presale: bool,
    pub discount_price: Option<u64>,
}

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum WhitelistMintMode {
    /// A whitelist token is burned for every mint.
    BurnEveryTime,
    NeverBurn,
}

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct GatekeeperConfig {
    pub gatekeeper_network: Pubkey,
    /// Gateway tokens are expired by the mint when set.
    pub expire_on_use: bool,
}

// ---------------------------------------------------------------------------
// Foreign accounts (plain borsh, no anchor discriminator)
// ---------------------------------------------------------------------------

/// Identity pass issued by a gatekeeper network.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct GatewayToken {
    pub version: u8,
    pub parent_gateway_token: Option<Pubkey>,
    pub owner_wallet: Pubkey,
    pub owner_identity: Option<Pubkey>,
    pub gatekeeper_network: Pubkey,
    pub issuing_gatekeeper: Pubkey,
    pub state: GatewayTokenState,
    pub expire_time: Option<i64>,
}

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum GatewayTokenState {
    Active,
    Frozen,
    Revoked,
}

impl GatewayToken {
    pub const SEED: &'static [u8] = b"gateway";
    pub const EXPIRE_SEED: &'static [u8] = b"expire";

    pub fn is_valid(&self, now: i64) -> bool {
        self.state == GatewayTokenState::Active && self.expire_time.map_or(true, |t| t > now)
    }
}

/// Leading fields of a token-metadata `Metadata` account. Strings are
/// zero-padded on chain.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct MetadataHeader {
    pub key: u8,
    pub update_authority: Pubkey,
    pub mint: Pubkey,
    pub name: String,
    pub symbol: String,
    pub uri: String,
    pub seller_fee_basis_points: u16,
}

impl MetadataHeader {
    pub fn name(&self) -> &str {
        self.name.trim_end_matches('\0')
    }

    pub fn uri(&self) -> &str {
        self.uri.trim_end_matches('\0')
    }
}
