use anchor_lang::AnchorDeserialize;
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use tracing::{debug, warn};

use crate::chain::{ChainReader, Commitment};
use crate::errors::{ChainError, MetadataError};
use crate::pda::metadata_pda;
use crate::state::MetadataHeader;

/// An NFT in the wallet, with its on-chain name and off-chain JSON location.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OwnedNft {
    pub mint: Pubkey,
    pub name: String,
    pub uri: String,
}

/// Fields of the off-chain JSON shown in the gallery.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OffChainMetadata {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct GalleryItem {
    pub mint: String,
    pub name: String,
    pub image: String,
    pub description: String,
}

pub trait MetadataFetcher {
    fn fetch(&self, uri: &str) -> Result<OffChainMetadata, MetadataError>;
}

pub struct HttpMetadataFetcher;

impl MetadataFetcher for HttpMetadataFetcher {
    fn fetch(&self, uri: &str) -> Result<OffChainMetadata, MetadataError> {
        let body: String = ureq::get(uri)
            .call()
            .map_err(|e| MetadataError::Fetch {
                uri: uri.to_string(),
                reason: e.to_string(),
            })?
            .into_body()
            .read_to_string()
            .map_err(|e| MetadataError::Fetch {
                uri: uri.to_string(),
                reason: e.to_string(),
            })?;
        parse_off_chain(uri, &body)
    }
}

pub fn parse_off_chain(uri: &str, body: &str) -> Result<OffChainMetadata, MetadataError> {
    serde_json::from_str(body).map_err(|e| MetadataError::Parse {
        uri: uri.to_string(),
        reason: e.to_string(),
    })
}

pub fn decode_metadata(data: &[u8]) -> Option<MetadataHeader> {
    MetadataHeader::deserialize(&mut &data[..]).ok()
}

/// NFTs held by `owner`: token accounts with exactly one token whose mint has
/// metadata, optionally restricted to one update authority.
pub fn list_owned_nfts<C: ChainReader>(
    chain: &C,
    owner: &Pubkey,
    update_authority: Option<&Pubkey>,
) -> Result<Vec<OwnedNft>, ChainError> {
    let holdings = chain.token_accounts_by_owner(owner)?;
    let mut nfts = Vec::new();
    for holding in holdings.into_iter().filter(|h| h.amount == 1) {
        let address = metadata_pda(&holding.mint);
        let account = match chain.fetch_account(&address, Commitment::Confirmed) {
            Ok(Some(account)) => account,
            Ok(None) => continue,
            Err(e) => {
                debug!(mint = %holding.mint, "metadata lookup failed: {e}");
                continue;
            }
        };
        let Some(header) = decode_metadata(&account.data) else {
            debug!(mint = %holding.mint, "undecodable metadata account");
            continue;
        };
        if update_authority.is_some_and(|ua| *ua != header.update_authority) {
            continue;
        }
        nfts.push(OwnedNft {
            mint: holding.mint,
            name: header.name().to_string(),
            uri: header.uri().to_string(),
        });
    }
    Ok(nfts)
}

/// Resolves off-chain JSON for each NFT. Items whose JSON cannot be fetched
/// keep their on-chain name.
pub fn load_gallery<F: MetadataFetcher>(fetcher: &F, nfts: &[OwnedNft]) -> Vec<GalleryItem> {
    nfts.iter()
        .map(|nft| match fetcher.fetch(&nft.uri) {
            Ok(json) => GalleryItem {
                mint: nft.mint.to_string(),
                name: if json.name.is_empty() {
                    nft.name.clone()
                } else {
                    json.name
                },
                image: json.image,
                description: json.description,
            },
            Err(e) => {
                warn!("{e}");
                GalleryItem {
                    mint: nft.mint.to_string(),
                    name: nft.name.clone(),
                    image: String::new(),
                    description: String::new(),
                }
            }
        })
        .collect()
}
