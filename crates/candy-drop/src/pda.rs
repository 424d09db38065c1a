use solana_sdk::pubkey::Pubkey;

use crate::constants::{ATA_PROGRAM_ID, GATEWAY_PROGRAM_ID, METADATA_PROGRAM_ID, SPL_TOKEN_ID};
use crate::state::{CandyMachine, CollectionPDA, GatewayToken};

pub fn get_ata(wallet: &Pubkey, mint: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(
        &[wallet.as_ref(), SPL_TOKEN_ID.as_ref(), mint.as_ref()],
        &ATA_PROGRAM_ID,
    )
    .0
}

pub fn metadata_pda(mint: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(
        &[b"metadata", METADATA_PROGRAM_ID.as_ref(), mint.as_ref()],
        &METADATA_PROGRAM_ID,
    )
    .0
}

pub fn master_edition_pda(mint: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(
        &[b"metadata", METADATA_PROGRAM_ID.as_ref(), mint.as_ref(), b"edition"],
        &METADATA_PROGRAM_ID,
    )
    .0
}

/// Signer PDA the candy machine uses as verified first creator.
pub fn candy_machine_creator(candy_machine: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(
        &[CandyMachine::CREATOR_SEED, candy_machine.as_ref()],
        &crate::ID,
    )
}

pub fn collection_pda(candy_machine: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(&[CollectionPDA::SEED, candy_machine.as_ref()], &crate::ID).0
}

pub fn collection_authority_record(collection_mint: &Pubkey, authority: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(
        &[
            b"metadata",
            METADATA_PROGRAM_ID.as_ref(),
            collection_mint.as_ref(),
            b"collection_authority",
            authority.as_ref(),
        ],
        &METADATA_PROGRAM_ID,
    )
    .0
}

/// Gateway token of `owner` on `network`. The zero seed is the token index.
pub fn gateway_token(owner: &Pubkey, network: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(
        &[owner.as_ref(), GatewayToken::SEED, &[0u8; 8], network.as_ref()],
        &GATEWAY_PROGRAM_ID,
    )
    .0
}

pub fn network_expire_feature(network: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(
        &[network.as_ref(), GatewayToken::EXPIRE_SEED],
        &GATEWAY_PROGRAM_ID,
    )
    .0
}
