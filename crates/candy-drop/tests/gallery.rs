mod common;

use std::collections::HashMap;

use anchor_lang::AnchorSerialize;
use candy_drop::chain::TokenHolding;
use candy_drop::constants::METADATA_PROGRAM_ID;
use candy_drop::errors::MetadataError;
use candy_drop::metadata::{list_owned_nfts, load_gallery, MetadataFetcher, OffChainMetadata};
use candy_drop::pda::metadata_pda;
use candy_drop::state::MetadataHeader;
use solana_sdk::{account::Account, pubkey::Pubkey};

use common::*;

fn holding(mint: Pubkey, amount: u64) -> TokenHolding {
    TokenHolding {
        address: Pubkey::new_unique(),
        mint,
        amount,
    }
}

fn put_metadata(chain: &MockChain, mint: Pubkey, update_authority: Pubkey, name: &str) {
    let header = MetadataHeader {
        key: 4,
        update_authority,
        mint,
        name: format!("{name}{}", "\0".repeat(32 - name.len())),
        symbol: "CNDY".into(),
        uri: format!("https://arweave.net/{mint}"),
        seller_fee_basis_points: 500,
    };
    let mut data = Vec::new();
    header.serialize(&mut data).unwrap();
    data.resize(679, 0);
    chain.accounts.borrow_mut().insert(
        metadata_pda(&mint),
        Account {
            lamports: 5_616_720,
            data,
            owner: METADATA_PROGRAM_ID,
            executable: false,
            rent_epoch: 0,
        },
    );
}

struct StaticFetcher(HashMap<String, OffChainMetadata>);

impl MetadataFetcher for StaticFetcher {
    fn fetch(&self, uri: &str) -> Result<OffChainMetadata, MetadataError> {
        self.0.get(uri).cloned().ok_or_else(|| MetadataError::Fetch {
            uri: uri.to_string(),
            reason: "404".into(),
        })
    }
}

#[test]
fn test_lists_single_tokens_with_metadata() {
    let chain = MockChain::new(Pubkey::new_unique(), candy_machine(10, 0));
    let authority = Pubkey::new_unique();
    let (nft, fungible, bare) = (Pubkey::new_unique(), Pubkey::new_unique(), Pubkey::new_unique());
    put_metadata(&chain, nft, authority, "Candy #1");
    put_metadata(&chain, fungible, authority, "Candy Coin");
    *chain.holdings.borrow_mut() = vec![holding(nft, 1), holding(fungible, 500), holding(bare, 1)];

    let nfts = list_owned_nfts(&chain, &Pubkey::new_unique(), None).unwrap();
    assert_eq!(nfts.len(), 1);
    assert_eq!(nfts[0].mint, nft);
    assert_eq!(nfts[0].name, "Candy #1");
    assert_eq!(nfts[0].uri, format!("https://arweave.net/{nft}"));
}

#[test]
fn test_update_authority_filter() {
    let chain = MockChain::new(Pubkey::new_unique(), candy_machine(10, 0));
    let ours = Pubkey::new_unique();
    let (a, b) = (Pubkey::new_unique(), Pubkey::new_unique());
    put_metadata(&chain, a, ours, "Candy #1");
    put_metadata(&chain, b, Pubkey::new_unique(), "Other #9");
    *chain.holdings.borrow_mut() = vec![holding(a, 1), holding(b, 1)];

    let owner = Pubkey::new_unique();
    assert_eq!(list_owned_nfts(&chain, &owner, None).unwrap().len(), 2);
    let filtered = list_owned_nfts(&chain, &owner, Some(&ours)).unwrap();
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0].mint, a);
}

#[test]
fn test_gallery_prefers_off_chain_json() {
    let chain = MockChain::new(Pubkey::new_unique(), candy_machine(10, 0));
    let authority = Pubkey::new_unique();
    let (a, b) = (Pubkey::new_unique(), Pubkey::new_unique());
    put_metadata(&chain, a, authority, "Candy #1");
    put_metadata(&chain, b, authority, "Candy #2");
    *chain.holdings.borrow_mut() = vec![holding(a, 1), holding(b, 1)];

    let fetcher = StaticFetcher(HashMap::from([(
        format!("https://arweave.net/{a}"),
        OffChainMetadata {
            name: "Candy Number One".into(),
            image: "https://arweave.net/1.png".into(),
            description: "first".into(),
        },
    )]));

    let nfts = list_owned_nfts(&chain, &Pubkey::new_unique(), Some(&authority)).unwrap();
    let gallery = load_gallery(&fetcher, &nfts);
    assert_eq!(gallery.len(), 2);
    assert_eq!(gallery[0].name, "Candy Number One");
    assert_eq!(gallery[0].image, "https://arweave.net/1.png");
    assert_eq!(gallery[1].name, "Candy #2");
    assert!(gallery[1].image.is_empty());
}
