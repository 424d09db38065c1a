use solana_sdk::{
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
    signature::{Keypair, Signer},
    system_instruction,
};

use crate::constants::*;
use crate::eligibility::DropConfig;
use crate::errors::MintError;
use crate::pda::*;

/// Anchor instruction discriminator: first 8 bytes of SHA-256("global:<name>")
pub fn sighash(name: &str) -> Vec<u8> {
    let hash = solana_sdk::hash::hash(format!("global:{}", name).as_bytes());
    hash.to_bytes()[..8].to_vec()
}

/// Instructions for one transaction plus the throwaway signers they need.
pub struct MintPlan {
    pub instructions: Vec<Instruction>,
    /// Revokes delegations granted for the mint. Sent after it.
    pub cleanup: Vec<Instruction>,
    pub extra_signers: Vec<Keypair>,
}

/// Creates the NFT mint and its token account holding one token.
pub fn setup_instructions(
    payer: &Pubkey,
    mint: &Pubkey,
    mint_rent: u64,
) -> Result<Vec<Instruction>, MintError> {
    let token_account = get_ata(payer, mint);
    Ok(vec![
        system_instruction::create_account(
            payer,
            mint,
            mint_rent,
            MINT_LAYOUT as u64,
            &SPL_TOKEN_ID,
        ),
        spl_token::instruction::initialize_mint(&SPL_TOKEN_ID, mint, payer, Some(payer), 0)
            .map_err(|e| MintError::Build(e.to_string()))?,
        spl_associated_token_account::instruction::create_associated_token_account(
            payer,
            payer,
            mint,
            &SPL_TOKEN_ID,
        ),
        spl_token::instruction::mint_to(&SPL_TOKEN_ID, mint, &token_account, payer, &[], 1)
            .map_err(|e| MintError::Build(e.to_string()))?,
    ])
}

/// Builds `mint_nft` with its remaining accounts, the delegations it
/// consumes and, when a collection is linked, `set_collection_during_mint`.
pub fn mint_instructions(
    config: &DropConfig,
    payer: &Pubkey,
    mint: &Pubkey,
    is_whitelist_user: bool,
    user_price: u64,
) -> Result<MintPlan, MintError> {
    let (creator, creator_bump) = candy_machine_creator(&config.id);
    let metadata = metadata_pda(mint);

    let mut instructions = Vec::new();
    let mut cleanup = Vec::new();
    let mut extra_signers = Vec::new();

    let mut accounts = vec![
        AccountMeta::new(config.id, false),                     // candy_machine
        AccountMeta::new_readonly(creator, false),              // candy_machine_creator
        AccountMeta::new(*payer, true),                         // payer
        AccountMeta::new(config.treasury, false),               // wallet
        AccountMeta::new(metadata, false),                      // metadata
        AccountMeta::new(*mint, false),                         // mint
        AccountMeta::new_readonly(*payer, true),                // mint_authority
        AccountMeta::new_readonly(*payer, true),                // update_authority
        AccountMeta::new(master_edition_pda(mint), false),      // master_edition
        AccountMeta::new_readonly(METADATA_PROGRAM_ID, false),  // token_metadata_program
        AccountMeta::new_readonly(SPL_TOKEN_ID, false),         // token_program
        AccountMeta::new_readonly(SYSTEM_PROGRAM_ID, false),    // system_program
        AccountMeta::new_readonly(RENT_SYSVAR, false),          // rent
        AccountMeta::new_readonly(CLOCK_SYSVAR, false),         // clock
        AccountMeta::new_readonly(SLOT_HASHES_SYSVAR, false),   // recent_slothashes
        AccountMeta::new_readonly(INSTRUCTIONS_SYSVAR, false),  // instruction_sysvar_account
    ];

    if let Some(gk) = config.gatekeeper {
        accounts.push(AccountMeta::new(gateway_token(payer, &gk.network), false));
        if gk.expire_on_use {
            accounts.push(AccountMeta::new_readonly(GATEWAY_PROGRAM_ID, false));
            accounts.push(AccountMeta::new_readonly(network_expire_feature(&gk.network), false));
        }
    }

    if let Some(wl) = config.whitelist {
        let whitelist_token = get_ata(payer, &wl.mint);
        accounts.push(AccountMeta::new(whitelist_token, false));
        if wl.burn_every_time {
            let burn_authority = Keypair::new();
            accounts.push(AccountMeta::new(wl.mint, false));
            accounts.push(AccountMeta::new_readonly(burn_authority.pubkey(), true));
            if is_whitelist_user {
                instructions.push(
                    spl_token::instruction::approve(
                        &SPL_TOKEN_ID,
                        &whitelist_token,
                        &burn_authority.pubkey(),
                        payer,
                        &[],
                        1,
                    )
                    .map_err(|e| MintError::Build(e.to_string()))?,
                );
                cleanup.push(
                    spl_token::instruction::revoke(&SPL_TOKEN_ID, &whitelist_token, payer, &[])
                        .map_err(|e| MintError::Build(e.to_string()))?,
                );
            }
            extra_signers.push(burn_authority);
        }
    }

    if let Some(token_mint) = config.token_mint {
        let payment_account = get_ata(payer, &token_mint);
        let transfer_authority = Keypair::new();
        accounts.push(AccountMeta::new(payment_account, false));
        accounts.push(AccountMeta::new_readonly(transfer_authority.pubkey(), true));
        instructions.push(
            spl_token::instruction::approve(
                &SPL_TOKEN_ID,
                &payment_account,
                &transfer_authority.pubkey(),
                payer,
                &[],
                user_price,
            )
            .map_err(|e| MintError::Build(e.to_string()))?,
        );
        cleanup.push(
            spl_token::instruction::revoke(&SPL_TOKEN_ID, &payment_account, payer, &[])
                .map_err(|e| MintError::Build(e.to_string()))?,
        );
        extra_signers.push(transfer_authority);
    }

    let mut data = sighash("mint_nft");
    data.push(creator_bump);
    instructions.push(Instruction::new_with_bytes(crate::ID, &data, accounts));

    if let Some(collection) = config.collection.filter(|_| config.retain_authority) {
        let accounts = vec![
            AccountMeta::new_readonly(config.id, false),                      // candy_machine
            AccountMeta::new_readonly(metadata, false),                       // metadata
            AccountMeta::new_readonly(*payer, true),                          // payer
            AccountMeta::new(collection.pda, false),                          // collection_pda
            AccountMeta::new_readonly(METADATA_PROGRAM_ID, false),            // token_metadata_program
            AccountMeta::new_readonly(INSTRUCTIONS_SYSVAR, false),            // instructions
            AccountMeta::new_readonly(collection.mint, false),                // collection_mint
            AccountMeta::new_readonly(metadata_pda(&collection.mint), false), // collection_metadata
            AccountMeta::new_readonly(master_edition_pda(&collection.mint), false), // collection_master_edition
            AccountMeta::new_readonly(config.authority, false),               // authority
            AccountMeta::new_readonly(
                collection_authority_record(&collection.mint, &collection.pda),
                false,
            ), // collection_authority_record
        ];
        instructions.push(Instruction::new_with_bytes(
            crate::ID,
            &sighash("set_collection_during_mint"),
            accounts,
        ));
    }

    Ok(MintPlan {
        instructions,
        cleanup,
        extra_signers,
    })
}
