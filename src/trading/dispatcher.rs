//! Signing and submission.
//!
//! Signing is delegated to a [`WalletSigner`]; the dispatcher only adds the
//! engine's own partial signatures, submits, and decides whether a failure is
//! worth one retry.

use async_trait::async_trait;
use solana_sdk::{
    pubkey::Pubkey,
    signature::{Keypair, Signature},
    signer::Signer,
    transaction::VersionedTransaction,
};
use std::sync::Arc;
use tracing::{info, warn};

use crate::common::{
    error::{SubmitError, SwapError},
    ledger::{LedgerRpc, SignatureState, latest_blockhash_with_retry},
    types::{AnyResult, RetryPolicy},
};
use crate::trading::common::envelope::{AssembledTransaction, sign_partial};
use crate::trading::lifecycle::{CallbackRef, StatusUpdate};

/// External signing capability (a wallet adapter, an HSM, a local keypair).
#[async_trait]
pub trait WalletSigner: Send + Sync {
    fn pubkey(&self) -> Pubkey;

    /// Adds the wallet's signature, leaving signatures already present intact.
    async fn sign_transaction(
        &self,
        transaction: VersionedTransaction,
    ) -> AnyResult<VersionedTransaction>;
}

/// Local keypair wallet.
#[derive(Clone)]
pub struct KeypairWallet {
    keypair: Arc<Keypair>,
}

impl KeypairWallet {
    pub fn new(keypair: Arc<Keypair>) -> Self {
        Self { keypair }
    }
}

#[async_trait]
impl WalletSigner for KeypairWallet {
    fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    async fn sign_transaction(
        &self,
        mut transaction: VersionedTransaction,
    ) -> AnyResult<VersionedTransaction> {
        sign_partial(&mut transaction, &self.keypair)?;
        Ok(transaction)
    }
}

/// Outcome of confirmation polling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmationStatus {
    Confirmed,
    Failed(String),
    /// Polling ran out before the ledger gave an answer
    Inconclusive,
}

pub struct SigningDispatcher {
    ledger: Arc<dyn LedgerRpc>,
    blockhash_retry: RetryPolicy,
    confirmation: Option<RetryPolicy>,
}

impl SigningDispatcher {
    pub fn new(
        ledger: Arc<dyn LedgerRpc>,
        blockhash_retry: RetryPolicy,
        confirmation: Option<RetryPolicy>,
    ) -> Self {
        Self { ledger, blockhash_retry, confirmation }
    }

    /// Signs (partial signers first, then the wallet) and submits.
    ///
    /// Simulation failures are reported with their logs and never retried. A
    /// transient failure is retried once after re-stamping a fresh blockhash and
    /// re-signing; a second transient failure is a [`SwapError::NetworkTimeout`].
    pub async fn sign_and_send(
        &self,
        assembled: AssembledTransaction,
        wallet: &dyn WalletSigner,
        callback: &CallbackRef,
    ) -> Result<Signature, SwapError> {
        let AssembledTransaction { envelope, partial_signers } = assembled;
        let mut unsigned = envelope.into_unsigned_transaction()?;

        let reason = match self.submit(&unsigned, &partial_signers, wallet, callback, 1).await {
            Ok(signature) => return Ok(signature),
            Err(SubmitError::Transient(reason)) => reason,
            Err(err) => return Err(self.fail(err, callback).await),
        };

        warn!(%reason, "transient submission failure, retrying with a fresh blockhash");
        notify(callback, StatusUpdate::Retrying { reason }).await;
        let blockhash = latest_blockhash_with_retry(self.ledger.as_ref(), self.blockhash_retry).await?;
        unsigned.message.set_recent_blockhash(blockhash);
        unsigned.signatures.fill(Signature::default());

        match self.submit(&unsigned, &partial_signers, wallet, callback, 2).await {
            Ok(signature) => Ok(signature),
            Err(err) => Err(self.fail(err, callback).await),
        }
    }

    /// [`Self::sign_and_send`] followed by confirmation polling when enabled.
    pub async fn sign_send_and_confirm(
        &self,
        assembled: AssembledTransaction,
        wallet: &dyn WalletSigner,
        callback: &CallbackRef,
    ) -> Result<(Signature, Option<ConfirmationStatus>), SwapError> {
        let signature = self.sign_and_send(assembled, wallet, callback).await?;
        let status = match self.confirmation {
            Some(policy) => Some(self.wait_for_confirmation(&signature, policy, callback).await),
            None => None,
        };
        Ok((signature, status))
    }

    pub async fn wait_for_confirmation(
        &self,
        signature: &Signature,
        policy: RetryPolicy,
        callback: &CallbackRef,
    ) -> ConfirmationStatus {
        let attempts = policy.attempts.max(1);
        for attempt in 1..=attempts {
            match self.ledger.signature_state(signature).await {
                Ok(Some(SignatureState::Confirmed)) => {
                    info!(%signature, "transaction confirmed");
                    notify(callback, StatusUpdate::Confirmed { signature: *signature }).await;
                    return ConfirmationStatus::Confirmed;
                }
                Ok(Some(SignatureState::Failed(reason))) => {
                    warn!(%signature, %reason, "transaction failed on chain");
                    notify(
                        callback,
                        StatusUpdate::Failed { signature: *signature, reason: reason.clone() },
                    )
                    .await;
                    return ConfirmationStatus::Failed(reason);
                }
                Ok(_) => {}
                Err(e) => warn!(%signature, attempt, error = %e, "status lookup failed"),
            }
            if attempt < attempts {
                tokio::time::sleep(policy.interval).await;
            }
        }
        notify(callback, StatusUpdate::Inconclusive { signature: *signature }).await;
        ConfirmationStatus::Inconclusive
    }

    async fn submit(
        &self,
        unsigned: &VersionedTransaction,
        partial_signers: &[Arc<Keypair>],
        wallet: &dyn WalletSigner,
        callback: &CallbackRef,
        attempt: usize,
    ) -> Result<Signature, SubmitError> {
        let mut transaction = unsigned.clone();
        for signer in partial_signers {
            sign_partial(&mut transaction, signer)
                .map_err(|e| SubmitError::Rejected(e.to_string()))?;
        }
        notify(callback, StatusUpdate::Signing).await;
        let signed = wallet
            .sign_transaction(transaction)
            .await
            .map_err(|e| SubmitError::Rejected(format!("wallet failed to sign: {e}")))?;

        notify(callback, StatusUpdate::Submitting { attempt }).await;
        let signature = self.ledger.send_transaction(&signed).await?;
        info!(%signature, attempt, "transaction submitted");
        notify(callback, StatusUpdate::Submitted { signature }).await;
        Ok(signature)
    }

    async fn fail(&self, err: SubmitError, callback: &CallbackRef) -> SwapError {
        if let SubmitError::Simulation { message, logs } = &err {
            warn!(%message, log_lines = logs.len(), "simulation rejected transaction");
            notify(
                callback,
                StatusUpdate::SimulationFailed { message: message.clone(), logs: logs.clone() },
            )
            .await;
        }
        err.into()
    }
}

pub(crate) async fn notify(callback: &CallbackRef, update: StatusUpdate) {
    if let Err(e) = callback.on_status(update).await {
        warn!(error = %e, "status callback failed");
    }
}
