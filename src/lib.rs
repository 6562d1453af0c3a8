pub mod common;
pub mod constants;
pub mod instruction;
pub mod parser;
pub mod trading;
pub mod utils;

pub use crate::common::{
    EngineConfig, FeeSpec, LedgerRpc, QuoteStrategy, RetryPolicy, SolanaRpcClient, SubmitError,
    SwapError,
};
pub use crate::instruction::pumpfun::CreateTokenParams;
pub use crate::parser::{EnrichedSwap, SwapTransactionRecord, TokenAmount, TokenMetadata};
pub use crate::trading::{
    CallbackRef, ConfirmationStatus, FnCallback, KeypairWallet, NoopCallback, StatusUpdate,
    SwapQuote, TransactionStatusCallback, TxFormat, Venue, WalletSigner,
};

use crate::common::{
    AmmVenue, JupiterTokenApi, MetadataEnricher, MetadataSource, RaydiumApiClient,
    RaydiumApiConfig, ledger::fetch_lookup_table,
};
use crate::constants::{SOL_MINT, trade::trade::DEFAULT_LAUNCH_SLIPPAGE};
use crate::parser::{ReconstructionConfig, SwapReconstructor};
use crate::trading::{
    AssembledTransaction, FeePatchOutcome, QuoteAggregator, QuoteRequest, SigningDispatcher,
    TransactionAssembler, TransactionPatcher, dispatcher::notify,
};
use crate::utils::calc::common::{compute_commission, split_commission};
use solana_sdk::{
    instruction::Instruction,
    pubkey::Pubkey,
    signature::{Keypair, Signature},
    signer::Signer,
};
use std::sync::Arc;
use tracing::{info, warn};

/// A swap between two mints, priced by whichever venue the engine selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapRequest {
    pub input_mint: Pubkey,
    pub output_mint: Pubkey,
    /// Raw input amount in the input mint's smallest unit
    pub amount: u64,
    /// Falls back to the configured default when `None`
    pub slippage_bps: Option<u16>,
}

/// What happened to the platform commission of one submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommissionReceipt {
    pub amount: u64,
    /// The transfer was part of the main transaction
    pub embedded: bool,
    /// Signature of the separately submitted fee transaction
    pub companion_signature: Option<Signature>,
    pub error: Option<SwapError>,
}

impl CommissionReceipt {
    pub fn collected(&self) -> bool {
        self.embedded || self.companion_signature.is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SwapOutcome {
    pub signature: Signature,
    pub quote: SwapQuote,
    pub commission: CommissionReceipt,
    /// `None` when confirmation polling is disabled
    pub confirmation: Option<ConfirmationStatus>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LaunchOutcome {
    pub mint: Pubkey,
    pub signature: Signature,
    /// SOL spent on the initial buy, after the commission was taken out
    pub initial_buy_lamports: u64,
    pub commission: CommissionReceipt,
    pub confirmation: Option<ConfirmationStatus>,
}

/// Submission result for a transaction the caller built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub signature: Signature,
    pub commission: CommissionReceipt,
    pub confirmation: Option<ConfirmationStatus>,
}

/// Swap engine context.
///
/// Owns the ledger client, the venue clients and the metadata cache, and wires
/// quoting, assembly, fee injection and dispatch into complete flows. Cheap to
/// share behind an `Arc`.
pub struct SwapEngine {
    config: EngineConfig,
    ledger: Arc<dyn LedgerRpc>,
    amm: Arc<dyn AmmVenue>,
    aggregator: QuoteAggregator,
    assembler: TransactionAssembler,
    patcher: TransactionPatcher,
    dispatcher: SigningDispatcher,
    reconstructor: SwapReconstructor,
    enricher: MetadataEnricher,
}

impl SwapEngine {
    /// Connects to the configured RPC endpoint and venue hosts.
    pub fn new(config: EngineConfig) -> Result<Self, SwapError> {
        let rpc = Arc::new(SolanaRpcClient::new_with_commitment(
            config.rpc_url.clone(),
            config.commitment,
        ));
        let amm = RaydiumApiClient::new(RaydiumApiConfig {
            base_host: config.raydium_api_host.clone(),
            swap_host: config.raydium_swap_host.clone(),
            timeout_millis: config.http_timeout_millis,
        })
        .map_err(|e| SwapError::Config(format!("raydium client: {e}")))?;
        let metadata = JupiterTokenApi::new(config.metadata_host.clone(), config.http_timeout_millis)
            .map_err(|e| SwapError::Config(format!("metadata client: {e}")))?;

        info!(rpc = %config.rpc_url, fee_enabled = config.fee.is_enabled(), "swap engine ready");
        Ok(Self::with_components(config, rpc, Arc::new(amm), Arc::new(metadata)))
    }

    /// Builds the engine around caller-supplied collaborators.
    pub fn with_components(
        config: EngineConfig,
        ledger: Arc<dyn LedgerRpc>,
        amm: Arc<dyn AmmVenue>,
        metadata: Arc<dyn MetadataSource>,
    ) -> Self {
        let aggregator = QuoteAggregator::new(
            amm.clone(),
            ledger.clone(),
            config.quote_strategy,
            config.min_quote_input,
        );
        let assembler = TransactionAssembler::new(ledger.clone(), config.blockhash_retry);
        let dispatcher =
            SigningDispatcher::new(ledger.clone(), config.blockhash_retry, config.confirmation);
        let reconstructor =
            SwapReconstructor::new(ledger.clone(), ReconstructionConfig::from(&config));
        Self {
            aggregator,
            assembler,
            patcher: TransactionPatcher,
            dispatcher,
            reconstructor,
            enricher: MetadataEnricher::new(metadata),
            config,
            ledger,
            amm,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn ledger(&self) -> &Arc<dyn LedgerRpc> {
        &self.ledger
    }

    pub fn metadata(&self) -> &MetadataEnricher {
        &self.enricher
    }

    fn tx_format(&self) -> TxFormat {
        if self.config.use_versioned { TxFormat::Versioned } else { TxFormat::Legacy }
    }

    fn slippage_or_default(&self, slippage_bps: Option<u16>) -> u16 {
        slippage_bps.unwrap_or(self.config.default_slippage_bps)
    }

    /// Commission owed on `base_amount` under the configured fee.
    pub fn commission_for(&self, base_amount: u64) -> u64 {
        let fee = &self.config.fee;
        if fee.is_enabled() { compute_commission(base_amount, fee.percentage_bps()) } else { 0 }
    }

    pub async fn quote(&self, request: &SwapRequest) -> Result<SwapQuote, SwapError> {
        self.aggregator.quote(&self.quote_request(request)).await
    }

    fn quote_request(&self, request: &SwapRequest) -> QuoteRequest {
        QuoteRequest {
            input_mint: request.input_mint,
            output_mint: request.output_mint,
            amount: request.amount,
            slippage_bps: self.slippage_or_default(request.slippage_bps),
        }
    }

    /// Quote, assemble, inject the commission and submit.
    pub async fn swap(
        &self,
        wallet: &dyn WalletSigner,
        request: SwapRequest,
        callback: CallbackRef,
    ) -> Result<SwapOutcome, SwapError> {
        let quote = self.quote(&request).await?;
        self.execute_quote(wallet, quote, &callback).await
    }

    /// Buys `mint` on its bonding curve with `sol_amount` lamports.
    pub async fn buy_on_curve(
        &self,
        wallet: &dyn WalletSigner,
        mint: Pubkey,
        sol_amount: u64,
        slippage_bps: Option<u16>,
        callback: CallbackRef,
    ) -> Result<SwapOutcome, SwapError> {
        let request = SwapRequest { input_mint: SOL_MINT, output_mint: mint, amount: sol_amount, slippage_bps };
        let quote = self
            .aggregator
            .quote_venue(Venue::PumpFunCurve, &self.quote_request(&request))
            .await?;
        self.execute_quote(wallet, quote, &callback).await
    }

    /// Sells `token_amount` raw units of `mint` back to its bonding curve.
    pub async fn sell_on_curve(
        &self,
        wallet: &dyn WalletSigner,
        mint: Pubkey,
        token_amount: u64,
        slippage_bps: Option<u16>,
        callback: CallbackRef,
    ) -> Result<SwapOutcome, SwapError> {
        let request = SwapRequest { input_mint: mint, output_mint: SOL_MINT, amount: token_amount, slippage_bps };
        let quote = self
            .aggregator
            .quote_venue(Venue::PumpFunCurve, &self.quote_request(&request))
            .await?;
        self.execute_quote(wallet, quote, &callback).await
    }

    async fn execute_quote(
        &self,
        wallet: &dyn WalletSigner,
        quote: SwapQuote,
        callback: &CallbackRef,
    ) -> Result<SwapOutcome, SwapError> {
        let payer = wallet.pubkey();
        let assembled = match quote.venue {
            Venue::RaydiumAmm => {
                self.assembler
                    .from_amm_quote(self.amm.as_ref(), &quote, &payer, self.tx_format())
                    .await?
            }
            Venue::PumpFunCurve => {
                let priority_fee = self.priority_fee_micro_lamports().await;
                self.assembler
                    .from_curve_quote(&quote, &payer, priority_fee, self.tx_format())
                    .await?
            }
        };

        let AssembledTransaction { envelope, partial_signers } = assembled;
        let patched = self.patcher.apply_fee_spec(
            envelope,
            quote.native_side_amount(),
            &self.config.fee,
            None,
        );
        let submission = self.dispatch_patched(patched, partial_signers, wallet, callback).await?;

        info!(
            signature = %submission.signature,
            venue = %quote.venue,
            commission = submission.commission.amount,
            "swap submitted"
        );
        Ok(SwapOutcome {
            signature: submission.signature,
            quote,
            commission: submission.commission,
            confirmation: submission.confirmation,
        })
    }

    /// Creates a curve token and buys into it in one transaction.
    ///
    /// The commission is split off `sol_amount` first; the remainder funds the
    /// initial buy.
    pub async fn launch_token(
        &self,
        wallet: &dyn WalletSigner,
        mint: Arc<Keypair>,
        token: CreateTokenParams,
        sol_amount: u64,
        slippage_bps: Option<u16>,
        callback: CallbackRef,
    ) -> Result<LaunchOutcome, SwapError> {
        let creator = wallet.pubkey();
        let mint_pubkey = mint.pubkey();
        let bps = if self.config.fee.is_enabled() { self.config.fee.percentage_bps() } else { 0 };
        let (net, commission) = split_commission(sol_amount, bps);

        let priority_fee = self.priority_fee_micro_lamports().await;
        let assembled = self
            .assembler
            .create_and_buy(
                &creator,
                mint,
                &token,
                net,
                slippage_bps.unwrap_or(DEFAULT_LAUNCH_SLIPPAGE),
                priority_fee,
            )
            .await?;

        let AssembledTransaction { envelope, partial_signers } = assembled;
        let patched =
            self.patcher.apply_fee(envelope, commission, self.config.fee.recipient(), None);
        let submission = self.dispatch_patched(patched, partial_signers, wallet, &callback).await?;

        info!(mint = %mint_pubkey, signature = %submission.signature, net, commission, "token launched");
        Ok(LaunchOutcome {
            mint: mint_pubkey,
            signature: submission.signature,
            initial_buy_lamports: net,
            commission: submission.commission,
            confirmation: submission.confirmation,
        })
    }

    /// Compiles caller instructions against the given lookup tables.
    pub async fn assemble_instructions(
        &self,
        payer: &Pubkey,
        instructions: Vec<Instruction>,
        lookup_table_addresses: &[Pubkey],
        partial_signers: Vec<Arc<Keypair>>,
    ) -> Result<AssembledTransaction, SwapError> {
        let mut tables = Vec::with_capacity(lookup_table_addresses.len());
        for address in lookup_table_addresses {
            tables.push(fetch_lookup_table(self.ledger.as_ref(), address).await?);
        }
        let format = if tables.is_empty() { self.tx_format() } else { TxFormat::Versioned };
        self.assembler.assemble(payer, instructions, &tables, format, partial_signers).await
    }

    /// Injects a commission on `fee_base` into an already built transaction and
    /// submits it.
    pub async fn submit_with_commission(
        &self,
        wallet: &dyn WalletSigner,
        assembled: AssembledTransaction,
        fee_base: u64,
        callback: CallbackRef,
    ) -> Result<Submission, SwapError> {
        let AssembledTransaction { envelope, partial_signers } = assembled;
        let patched = self.patcher.apply_fee_spec(envelope, fee_base, &self.config.fee, None);
        self.dispatch_patched(patched, partial_signers, wallet, &callback).await
    }

    /// Sends the main transaction, then the companion fee transaction if the
    /// patcher produced one. A failed companion never fails the call.
    async fn dispatch_patched(
        &self,
        patched: FeePatchOutcome,
        partial_signers: Vec<Arc<Keypair>>,
        wallet: &dyn WalletSigner,
        callback: &CallbackRef,
    ) -> Result<Submission, SwapError> {
        let FeePatchOutcome { envelope, fee_added, fee_amount, companion, error } = patched;
        let mut commission =
            CommissionReceipt { amount: fee_amount, embedded: fee_added, companion_signature: None, error };

        let main = AssembledTransaction { envelope, partial_signers };
        let (signature, confirmation) =
            self.dispatcher.sign_send_and_confirm(main, wallet, callback).await?;

        if let Some(companion) = companion {
            match self
                .dispatcher
                .sign_and_send(AssembledTransaction::new(companion), wallet, callback)
                .await
            {
                Ok(fee_signature) => {
                    info!(%fee_signature, amount = fee_amount, "commission sent separately");
                    commission.companion_signature = Some(fee_signature);
                    commission.error = None;
                }
                Err(e) => {
                    let err = SwapError::FeeInjectionFailure(format!(
                        "commission transaction failed: {e}"
                    ));
                    warn!(error = %err, amount = fee_amount, "commission not collected");
                    commission.error = Some(err);
                }
            }
            notify(
                callback,
                StatusUpdate::CommissionSettled {
                    signature: commission.companion_signature,
                    error: commission.error.as_ref().map(ToString::to_string),
                },
            )
            .await;
        } else if let Some(err) = &commission.error {
            warn!(error = %err, "swap submitted without commission");
            notify(
                callback,
                StatusUpdate::CommissionSettled { signature: None, error: Some(err.to_string()) },
            )
            .await;
        }

        Ok(Submission { signature, commission, confirmation })
    }

    async fn priority_fee_micro_lamports(&self) -> u64 {
        let raw = self.amm.priority_fee().await;
        raw.trim().parse::<u64>().unwrap_or_else(|e| {
            warn!(%raw, error = %e, "unparseable priority fee, using none");
            0
        })
    }

    /// Swaps reconstructed from the wallet's recent history, newest first.
    pub async fn recent_swaps(&self, wallet: &Pubkey) -> Result<Vec<SwapTransactionRecord>, SwapError> {
        self.reconstructor.recent_swaps(wallet).await
    }

    /// [`Self::recent_swaps`] with token metadata attached to both legs.
    pub async fn recent_swaps_enriched(
        &self,
        wallet: &Pubkey,
    ) -> Result<Vec<EnrichedSwap>, SwapError> {
        let records = self.recent_swaps(wallet).await?;
        Ok(self.enricher.enrich(records).await)
    }
}
