//! Token display metadata.
//!
//! Lookups go through a [`MetadataSource`]; resolved entries are cached per mint
//! and the native mint never leaves the process.

use anyhow::anyhow;
use async_trait::async_trait;
use dashmap::DashMap;
use futures::future::join_all;
use once_cell::sync::Lazy;
use reqwest::Client;
use serde::Deserialize;
use solana_sdk::pubkey::Pubkey;
use std::{collections::HashMap, str::FromStr, sync::Arc, time::Duration};
use tracing::{debug, warn};

use crate::common::{error::SwapError, raydium_api::build_http_client, types::AnyResult};
use crate::constants::{
    SOL_DECIMALS, SOL_LOGO_URI, SOL_MINT, SOL_NAME, SOL_SYMBOL, UNKNOWN_NAME, UNKNOWN_SYMBOL,
    trade::history::FALLBACK_DECIMALS,
};
use crate::parser::types::{EnrichedSwap, SwapTransactionRecord, TokenMetadata};

static NATIVE_METADATA: Lazy<TokenMetadata> = Lazy::new(|| TokenMetadata {
    mint: SOL_MINT,
    symbol: SOL_SYMBOL.to_string(),
    name: SOL_NAME.to_string(),
    decimals: SOL_DECIMALS,
    logo_uri: Some(SOL_LOGO_URI.to_string()),
});

/// Metadata for the wrapped native mint.
pub fn native_metadata() -> TokenMetadata {
    NATIVE_METADATA.clone()
}

/// Placeholder used when a lookup fails.
pub fn unknown_metadata(mint: Pubkey, decimals: Option<u8>) -> TokenMetadata {
    TokenMetadata {
        mint,
        symbol: UNKNOWN_SYMBOL.to_string(),
        name: UNKNOWN_NAME.to_string(),
        decimals: decimals.unwrap_or(FALLBACK_DECIMALS),
        logo_uri: None,
    }
}

#[async_trait]
pub trait MetadataSource: Send + Sync {
    async fn fetch(&self, mint: &Pubkey) -> AnyResult<TokenMetadata>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JupiterToken {
    address: String,
    name: String,
    symbol: String,
    decimals: u8,
    #[serde(rename = "logoURI", default)]
    logo_uri: Option<String>,
}

/// Jupiter token list client, `GET {host}/tokens/v1/token/{mint}`.
#[derive(Clone)]
pub struct JupiterTokenApi {
    http: Client,
    host: String,
}

impl JupiterTokenApi {
    pub fn new(host: impl Into<String>, timeout_millis: u64) -> AnyResult<Self> {
        Ok(Self {
            http: build_http_client(Duration::from_millis(timeout_millis))?,
            host: host.into(),
        })
    }

    fn token_url(&self, mint: &Pubkey) -> String {
        format!("{}/tokens/v1/token/{mint}", self.host.trim_end_matches('/'))
    }
}

#[async_trait]
impl MetadataSource for JupiterTokenApi {
    async fn fetch(&self, mint: &Pubkey) -> AnyResult<TokenMetadata> {
        let url = self.token_url(mint);
        debug!(%url, "fetching token metadata");
        let response = self.http.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("metadata request for {mint} returned {status}"));
        }
        // 未收录的代币返回 `null`
        let Some(token) = response.json::<Option<JupiterToken>>().await? else {
            return Err(anyhow!("{mint} is not in the token list"));
        };
        let address = Pubkey::from_str(&token.address)?;
        if address != *mint {
            return Err(anyhow!("token list answered {address} for {mint}"));
        }
        Ok(TokenMetadata {
            mint: address,
            symbol: token.symbol,
            name: token.name,
            decimals: token.decimals,
            logo_uri: token.logo_uri.filter(|uri| !uri.is_empty()),
        })
    }
}

/// Batch resolver with a per-mint cache.
pub struct MetadataEnricher {
    source: Arc<dyn MetadataSource>,
    cache: DashMap<Pubkey, TokenMetadata>,
}

impl MetadataEnricher {
    pub fn new(source: Arc<dyn MetadataSource>) -> Self {
        Self { source, cache: DashMap::new() }
    }

    pub fn cached(&self, mint: &Pubkey) -> Option<TokenMetadata> {
        self.cache.get(mint).map(|entry| entry.value().clone())
    }

    /// Resolves one mint. Never fails: a failed lookup yields the placeholder with
    /// `ledger_decimals` (or the fallback), and is retried on the next call.
    pub async fn resolve(&self, mint: &Pubkey, ledger_decimals: Option<u8>) -> TokenMetadata {
        if *mint == SOL_MINT {
            return native_metadata();
        }
        if let Some(hit) = self.cached(mint) {
            return hit;
        }
        match self.source.fetch(mint).await {
            Ok(metadata) => {
                self.cache.insert(*mint, metadata.clone());
                metadata
            }
            Err(e) => {
                let err = SwapError::MetadataFetchFailure {
                    mint: mint.to_string(),
                    reason: e.to_string(),
                };
                warn!(error = %err, "using placeholder metadata");
                unknown_metadata(*mint, ledger_decimals)
            }
        }
    }

    /// Resolves every distinct mint concurrently.
    pub async fn resolve_many(&self, mints: &[(Pubkey, Option<u8>)]) -> HashMap<Pubkey, TokenMetadata> {
        let mut wanted: HashMap<Pubkey, Option<u8>> = HashMap::with_capacity(mints.len());
        for (mint, decimals) in mints {
            let entry = wanted.entry(*mint).or_insert(None);
            if entry.is_none() {
                *entry = *decimals;
            }
        }

        let resolved = join_all(wanted.iter().map(|(mint, decimals)| async move {
            (*mint, self.resolve(mint, *decimals).await)
        }))
        .await;
        resolved.into_iter().collect()
    }

    /// Attaches metadata to both legs of every record, keeping record order.
    pub async fn enrich(&self, records: Vec<SwapTransactionRecord>) -> Vec<EnrichedSwap> {
        let mints: Vec<(Pubkey, Option<u8>)> = records
            .iter()
            .flat_map(|record| {
                [
                    (record.input_token.mint, Some(record.input_token.decimals)),
                    (record.output_token.mint, Some(record.output_token.decimals)),
                ]
            })
            .collect();
        let metadata = self.resolve_many(&mints).await;

        let lookup = |mint: &Pubkey, decimals: u8| {
            metadata.get(mint).cloned().unwrap_or_else(|| unknown_metadata(*mint, Some(decimals)))
        };
        records
            .into_iter()
            .map(|record| EnrichedSwap {
                input_metadata: lookup(&record.input_token.mint, record.input_token.decimals),
                output_metadata: lookup(&record.output_token.mint, record.output_token.decimals),
                record,
            })
            .collect()
    }
}
