//! Pure drop rules: supply accounting, mint eligibility and the mint
//! transaction size model. Everything here is I/O free; the refresher feeds
//! it chain reads.

use solana_sdk::pubkey::Pubkey;

use crate::constants::*;
use crate::state::{CandyMachine, EndSettingType, WhitelistMintMode};

// ---------------------------------------------------------------------------
// DropConfig
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EndCondition {
    /// Minting stops after this unix timestamp.
    Date(i64),
    /// Minting stops after this many items.
    Amount(u64),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WhitelistConfig {
    pub mint: Pubkey,
    pub presale: bool,
    pub burn_every_time: bool,
    pub discount_price: Option<u64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Gatekeeper {
    pub network: Pubkey,
    pub expire_on_use: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CollectionLink {
    pub pda: Pubkey,
    pub mint: Pubkey,
}

/// Normalized view of a candy machine account, rebuilt on every fetch.
#[derive(Clone, Debug, PartialEq)]
pub struct DropConfig {
    pub id: Pubkey,
    pub authority: Pubkey,
    pub treasury: Pubkey,
    pub go_live_date: Option<i64>,
    pub price: u64,
    pub items_available: u64,
    pub items_redeemed: u64,
    pub items_remaining: u64,
    pub whitelist: Option<WhitelistConfig>,
    pub is_whitelist_only: bool,
    pub end_condition: Option<EndCondition>,
    pub token_mint: Option<Pubkey>,
    pub gatekeeper: Option<Gatekeeper>,
    pub retain_authority: bool,
    pub collection: Option<CollectionLink>,
}

impl DropConfig {
    pub fn from_candy_machine(
        id: Pubkey,
        candy_machine: &CandyMachine,
        collection: Option<CollectionLink>,
    ) -> Self {
        let data = &candy_machine.data;
        let whitelist = data.whitelist_mint_settings.map(|wl| WhitelistConfig {
            mint: wl.mint,
            presale: wl.presale,
            burn_every_time: wl.mode == WhitelistMintMode::BurnEveryTime,
            discount_price: wl.discount_price,
        });
        // Without a discount or presale the program only lets whitelist holders mint.
        let is_whitelist_only = whitelist
            .map(|wl| wl.discount_price.is_none() && !wl.presale)
            .unwrap_or(false);
        let end_condition = data.end_settings.map(|end| match end.end_setting_type {
            EndSettingType::Date => {
                EndCondition::Date(i64::try_from(end.number).unwrap_or(i64::MAX))
            }
            EndSettingType::Amount => EndCondition::Amount(end.number),
        });

        Self {
            id,
            authority: candy_machine.authority,
            treasury: candy_machine.wallet,
            go_live_date: data.go_live_date,
            price: data.price,
            items_available: data.items_available,
            items_redeemed: candy_machine.items_redeemed,
            items_remaining: data.items_available.saturating_sub(candy_machine.items_redeemed),
            whitelist,
            is_whitelist_only,
            end_condition,
            token_mint: candy_machine.token_mint,
            gatekeeper: data.gatekeeper.map(|gk| Gatekeeper {
                network: gk.gatekeeper_network,
                expire_on_use: gk.expire_on_use,
            }),
            retain_authority: data.retain_authority,
            collection,
        }
    }

    /// Price charged to this wallet. Whitelist holders pay the discount price when one is set.
    pub fn price_for(&self, is_whitelist_user: bool) -> u64 {
        match self.whitelist {
            Some(wl) if is_whitelist_user => wl.discount_price.unwrap_or(self.price),
            _ => self.price,
        }
    }

    pub fn size_features(&self) -> SizeFeatures {
        SizeFeatures {
            collection: self.collection.is_some() && self.retain_authority,
            token_mint: self.token_mint.is_some(),
            whitelist: self.whitelist.is_some(),
            whitelist_burn: self.whitelist.map(|wl| wl.burn_every_time).unwrap_or(false),
            gatekeeper: self.gatekeeper.is_some(),
            gatekeeper_expire: self.gatekeeper.map(|gk| gk.expire_on_use).unwrap_or(false),
        }
    }
}

// ---------------------------------------------------------------------------
// Supply
// ---------------------------------------------------------------------------

/// Items still mintable: an amount end condition caps the supply.
pub fn items_remaining(
    items_available: u64,
    items_redeemed: u64,
    end_condition: Option<EndCondition>,
) -> u64 {
    let limit = match end_condition {
        Some(EndCondition::Amount(amount)) => amount.min(items_available),
        _ => items_available,
    };
    limit.saturating_sub(items_redeemed)
}

// ---------------------------------------------------------------------------
// Transaction size model
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SizeFeatures {
    /// Collection PDA exists and the machine retains update authority.
    pub collection: bool,
    pub token_mint: bool,
    pub whitelist: bool,
    pub whitelist_burn: bool,
    pub gatekeeper: bool,
    pub gatekeeper_expire: bool,
}

pub fn estimate_mint_tx_size(features: &SizeFeatures) -> usize {
    let mut size = MINT_TX_BASE_SIZE;
    if features.collection {
        size += MINT_TX_COLLECTION_SIZE;
    }
    if features.token_mint {
        size += MINT_TX_TOKEN_MINT_SIZE;
    }
    if features.whitelist {
        size += MINT_TX_WHITELIST_SIZE;
    }
    if features.whitelist_burn {
        size += MINT_TX_WHITELIST_BURN_SIZE;
    }
    if features.gatekeeper {
        size += MINT_TX_GATEKEEPER_SIZE;
    }
    if features.gatekeeper_expire {
        size += MINT_TX_GATEKEEPER_EXPIRE_SIZE;
    }
    size
}

pub fn needs_setup_transaction(estimated_size: usize) -> bool {
    estimated_size > MINT_TX_SIZE_CEILING
}

// ---------------------------------------------------------------------------
// DropState
// ---------------------------------------------------------------------------

/// Wallet-specific reads gathered by the refresher. `None` means the read
/// failed or did not apply.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WalletChecks {
    pub whitelist_tokens: Option<u64>,
    pub payment_balance: Option<u64>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DropState {
    pub is_active: bool,
    pub is_presale: bool,
    pub is_whitelist_user: bool,
    pub is_whitelist_only: bool,
    pub is_valid_balance: bool,
    pub items_remaining: u64,
    pub is_sold_out: bool,
    pub user_price: u64,
    pub estimated_tx_size: usize,
    pub needs_setup_transaction: bool,
}

impl DropState {
    pub fn evaluate(config: &DropConfig, checks: &WalletChecks, now: i64) -> Self {
        let time_gate_passed = config.go_live_date.map(|t| t < now).unwrap_or(false);

        let mut is_presale = false;
        let mut is_whitelist_user = false;
        if let Some(wl) = config.whitelist {
            is_presale = wl.presale && config.go_live_date.map(|t| t > now).unwrap_or(true);
            is_whitelist_user = checks.whitelist_tokens.map(|n| n > 0).unwrap_or(false);
        }

        let mut is_active = time_gate_passed || (is_presale && is_whitelist_user);
        if config.is_whitelist_only {
            is_active &= is_whitelist_user;
        }

        let user_price = config.price_for(is_whitelist_user);
        let is_valid_balance = checks
            .payment_balance
            .map(|balance| balance >= user_price)
            .unwrap_or(false);
        is_active &= is_valid_balance;

        if let Some(EndCondition::Date(end)) = config.end_condition {
            if end < now {
                is_active = false;
            }
        }

        let items_remaining = items_remaining(
            config.items_available,
            config.items_redeemed,
            config.end_condition,
        );
        let is_sold_out = items_remaining == 0;
        if is_sold_out {
            is_active = false;
        }

        let estimated_tx_size = estimate_mint_tx_size(&config.size_features());

        Self {
            is_active,
            is_presale,
            is_whitelist_user,
            is_whitelist_only: config.is_whitelist_only,
            is_valid_balance,
            items_remaining,
            is_sold_out,
            user_price,
            estimated_tx_size,
            needs_setup_transaction: needs_setup_transaction(estimated_tx_size),
        }
    }

    /// Optimistic update after a confirmed mint, ahead of the next refresh.
    pub fn record_mint_success(&mut self) {
        self.items_remaining = self.items_remaining.saturating_sub(1);
        self.is_sold_out = self.items_remaining == 0;
        if self.is_sold_out {
            self.is_active = false;
        }
    }

    pub fn can_mint(&self, is_minting: bool) -> bool {
        self.is_active && !is_minting
    }

    pub fn button_label(&self, is_minting: bool) -> &'static str {
        if self.is_sold_out {
            "Sold Out"
        } else if is_minting {
            "Minting..."
        } else if self.is_presale || self.is_whitelist_only {
            "Whitelist Mint"
        } else {
            "Mint NFT"
        }
    }
}

/// Config and derived state from one refresh cycle.
#[derive(Clone, Debug, PartialEq)]
pub struct DropSnapshot {
    pub config: DropConfig,
    pub state: DropState,
    pub fetched_at: i64,
}
