//! Ledger access used by every component.
//!
//! Components only see [`LedgerRpc`]; the nonblocking RPC client implements it for
//! real clusters and tests provide in-memory ledgers.

use async_trait::async_trait;
use serde_json::Value;
use solana_address_lookup_table_interface::state::AddressLookupTable;
use solana_client::rpc_client::GetConfirmedSignaturesForAddress2Config;
use solana_commitment_config::CommitmentConfig;
use solana_rpc_client_api::{
    client_error::{Error as ClientError, ErrorKind as ClientErrorKind},
    config::{RpcSendTransactionConfig, RpcTransactionConfig},
    request::{RpcError, RpcResponseErrorData},
};
use solana_sdk::{
    hash::Hash, message::AddressLookupTableAccount, pubkey::Pubkey, signature::Signature,
    transaction::VersionedTransaction,
};
use solana_transaction_status::{TransactionConfirmationStatus, UiTransactionEncoding};
use std::str::FromStr;
use tracing::{debug, warn};

use crate::common::error::{SubmitError, SwapError};
use crate::common::types::{AnyResult, RetryPolicy, SolanaRpcClient};

/// One entry of a `getSignaturesForAddress` listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureInfo {
    pub signature: String,
    /// The ledger flagged the transaction as failed
    pub failed: bool,
    pub block_time: Option<i64>,
}

/// Coarse status of a submitted signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureState {
    Processing,
    Confirmed,
    Failed(String),
}

#[async_trait]
pub trait LedgerRpc: Send + Sync {
    async fn latest_blockhash(&self) -> AnyResult<Hash>;

    /// Raw account data, `None` when the account does not exist.
    async fn account_data(&self, address: &Pubkey) -> AnyResult<Option<Vec<u8>>>;

    /// Most recent signatures first.
    async fn signatures_for_address(
        &self,
        address: &Pubkey,
        limit: usize,
    ) -> AnyResult<Vec<SignatureInfo>>;

    /// `getTransaction` with `jsonParsed` encoding and v0 support, as raw JSON.
    async fn transaction_json(&self, signature: &str) -> AnyResult<Option<Value>>;

    async fn send_transaction(
        &self,
        transaction: &VersionedTransaction,
    ) -> Result<Signature, SubmitError>;

    async fn signature_state(&self, signature: &Signature) -> AnyResult<Option<SignatureState>>;
}

/// Fetches a recent blockhash, retrying with a fixed pause.
pub async fn latest_blockhash_with_retry(
    ledger: &dyn LedgerRpc,
    policy: RetryPolicy,
) -> Result<Hash, SwapError> {
    let attempts = policy.attempts.max(1);
    let mut last_error = String::new();
    for attempt in 1..=attempts {
        match ledger.latest_blockhash().await {
            Ok(hash) => return Ok(hash),
            Err(e) => {
                warn!(attempt, attempts, error = %e, "failed to fetch latest blockhash");
                last_error = e.to_string();
            }
        }
        if attempt < attempts {
            tokio::time::sleep(policy.interval).await;
        }
    }
    Err(SwapError::NetworkTimeout(format!(
        "no blockhash after {attempts} attempts: {last_error}"
    )))
}

/// Loads an address lookup table so messages can be compiled against it.
pub async fn fetch_lookup_table(
    ledger: &dyn LedgerRpc,
    key: &Pubkey,
) -> Result<AddressLookupTableAccount, SwapError> {
    let data = ledger
        .account_data(key)
        .await
        .map_err(|e| SwapError::Rpc(e.to_string()))?
        .ok_or_else(|| {
            SwapError::TransactionBuildFailure(format!("lookup table {key} does not exist"))
        })?;
    let table = AddressLookupTable::deserialize(&data).map_err(|e| {
        SwapError::TransactionBuildFailure(format!("lookup table {key} is malformed: {e}"))
    })?;
    Ok(AddressLookupTableAccount { key: *key, addresses: table.addresses.to_vec() })
}

/// Maps an RPC submission error onto retry semantics.
pub fn classify_submit_error(err: &ClientError) -> SubmitError {
    match err.kind() {
        ClientErrorKind::RpcError(RpcError::RpcResponseError { message, data, .. }) => {
            match data {
                RpcResponseErrorData::SendTransactionPreflightFailure(sim) => {
                    // 过期的 blockhash 也会以预检失败的形式返回
                    if format!("{:?}", sim.err).contains("BlockhashNotFound") {
                        return SubmitError::Transient(message.clone());
                    }
                    SubmitError::Simulation {
                        message: message.clone(),
                        logs: sim.logs.clone().unwrap_or_default(),
                    }
                }
                _ if is_expired_blockhash(message) => SubmitError::Transient(message.clone()),
                _ => SubmitError::Rejected(message.clone()),
            }
        }
        ClientErrorKind::Io(_) | ClientErrorKind::Reqwest(_) => {
            SubmitError::Transient(err.to_string())
        }
        _ if is_expired_blockhash(&err.to_string()) => SubmitError::Transient(err.to_string()),
        _ => SubmitError::Rejected(err.to_string()),
    }
}

fn is_expired_blockhash(message: &str) -> bool {
    message.contains("Blockhash not found") || message.contains("BlockhashNotFound")
}

#[async_trait]
impl LedgerRpc for SolanaRpcClient {
    async fn latest_blockhash(&self) -> AnyResult<Hash> {
        Ok(self.get_latest_blockhash().await?)
    }

    async fn account_data(&self, address: &Pubkey) -> AnyResult<Option<Vec<u8>>> {
        let response = self.get_account_with_commitment(address, self.commitment()).await?;
        Ok(response.value.map(|account| account.data))
    }

    async fn signatures_for_address(
        &self,
        address: &Pubkey,
        limit: usize,
    ) -> AnyResult<Vec<SignatureInfo>> {
        let config = GetConfirmedSignaturesForAddress2Config {
            before: None,
            until: None,
            limit: Some(limit),
            commitment: Some(CommitmentConfig::confirmed()),
        };
        let statuses = self.get_signatures_for_address_with_config(address, config).await?;
        Ok(statuses
            .into_iter()
            .map(|status| SignatureInfo {
                signature: status.signature,
                failed: status.err.is_some(),
                block_time: status.block_time,
            })
            .collect())
    }

    async fn transaction_json(&self, signature: &str) -> AnyResult<Option<Value>> {
        let signature = Signature::from_str(signature)?;
        let config = RpcTransactionConfig {
            encoding: Some(UiTransactionEncoding::JsonParsed),
            commitment: Some(CommitmentConfig::confirmed()),
            max_supported_transaction_version: Some(0),
        };
        let tx = self.get_transaction_with_config(&signature, config).await?;
        Ok(Some(serde_json::to_value(&tx)?))
    }

    async fn send_transaction(
        &self,
        transaction: &VersionedTransaction,
    ) -> Result<Signature, SubmitError> {
        let config = RpcSendTransactionConfig {
            skip_preflight: false,
            preflight_commitment: Some(self.commitment().commitment),
            max_retries: Some(0),
            ..RpcSendTransactionConfig::default()
        };
        match self.send_transaction_with_config(transaction, config).await {
            Ok(signature) => {
                debug!(%signature, "transaction accepted by rpc");
                Ok(signature)
            }
            Err(e) => Err(classify_submit_error(&e)),
        }
    }

    async fn signature_state(&self, signature: &Signature) -> AnyResult<Option<SignatureState>> {
        let response = self.get_signature_statuses(&[*signature]).await?;
        let Some(Some(status)) = response.value.into_iter().next() else {
            return Ok(None);
        };
        if let Some(err) = status.err {
            return Ok(Some(SignatureState::Failed(err.to_string())));
        }
        Ok(Some(match status.confirmation_status {
            Some(TransactionConfirmationStatus::Processed) => SignatureState::Processing,
            _ => SignatureState::Confirmed,
        }))
    }
}
