use solana_compute_budget_interface::ComputeBudgetInstruction;
use solana_sdk::{
    hash::Hash,
    instruction::Instruction,
    message::{AddressLookupTableAccount, v0},
    pubkey::Pubkey,
    signature::Keypair,
    signer::Signer,
};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::common::{
    bonding_curve::BondingCurveAccount,
    error::SwapError,
    ledger::{LedgerRpc, latest_blockhash_with_retry},
    raydium_api::{AmmSwapBuild, AmmVenue, TxVersion},
    types::RetryPolicy,
};
use crate::constants::{is_native_mint, trade::trade::DEFAULT_COMPUTE_UNIT_LIMIT};
use crate::instruction::{
    pumpfun::{CreateTokenParams, CurveTradeParams, PumpFunInstructionBuilder},
    token::get_associated_token_address,
};
use crate::trading::common::envelope::{AssembledTransaction, TransactionEnvelope, WireEncoding};
use crate::trading::quote::{SwapQuote, VenuePayload};

/// Message format for transactions the engine compiles itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TxFormat {
    Legacy,
    #[default]
    Versioned,
}

/// Compute budget prefix; a zero price emits only the limit.
pub fn compute_budget_instructions(unit_price: u64, unit_limit: u32) -> Vec<Instruction> {
    let mut instructions = Vec::with_capacity(2);
    if unit_limit > 0 {
        instructions.push(ComputeBudgetInstruction::set_compute_unit_limit(unit_limit));
    }
    if unit_price > 0 {
        instructions.push(ComputeBudgetInstruction::set_compute_unit_price(unit_price));
    }
    instructions
}

/// Builds transaction envelopes from instructions, venue payloads or curve state.
pub struct TransactionAssembler {
    ledger: Arc<dyn LedgerRpc>,
    blockhash_retry: RetryPolicy,
}

impl TransactionAssembler {
    pub fn new(ledger: Arc<dyn LedgerRpc>, blockhash_retry: RetryPolicy) -> Self {
        Self { ledger, blockhash_retry }
    }

    pub async fn latest_blockhash(&self) -> Result<Hash, SwapError> {
        latest_blockhash_with_retry(self.ledger.as_ref(), self.blockhash_retry).await
    }

    /// Compiles `instructions` against a fresh blockhash.
    ///
    /// Versioned output uses the supplied lookup tables; the envelope is classified
    /// by whether any table ended up referenced.
    pub async fn assemble(
        &self,
        payer: &Pubkey,
        instructions: Vec<Instruction>,
        lookup_tables: &[AddressLookupTableAccount],
        format: TxFormat,
        partial_signers: Vec<Arc<Keypair>>,
    ) -> Result<AssembledTransaction, SwapError> {
        if instructions.is_empty() {
            return Err(SwapError::TransactionBuildFailure("no instructions to assemble".to_string()));
        }
        let blockhash = self.latest_blockhash().await?;
        let envelope = compile_envelope(payer, instructions, lookup_tables, format, blockhash)?;
        debug!(
            %payer,
            instructions = envelope.instruction_count(),
            legacy = envelope.is_legacy(),
            "assembled transaction"
        );
        Ok(AssembledTransaction { envelope, partial_signers })
    }

    /// Wraps a venue-built base64 transaction.
    pub fn from_venue_payload(&self, payload: &str) -> Result<AssembledTransaction, SwapError> {
        TransactionEnvelope::from_wire(payload, WireEncoding::Base64).map(AssembledTransaction::new)
    }

    /// Asks the AMM venue to build the swap for `quote` and takes its first payload.
    pub async fn from_amm_quote(
        &self,
        venue: &dyn AmmVenue,
        quote: &SwapQuote,
        wallet: &Pubkey,
        format: TxFormat,
    ) -> Result<AssembledTransaction, SwapError> {
        let VenuePayload::Amm(amm_quote) = &quote.payload else {
            return Err(SwapError::TransactionBuildFailure(format!(
                "quote from {} cannot be built by the amm venue",
                quote.venue
            )));
        };

        let compute_unit_price = venue.priority_fee().await;
        let wrap_sol = is_native_mint(&quote.input_mint);
        let unwrap_sol = is_native_mint(&quote.output_mint);
        let request = AmmSwapBuild {
            quote: amm_quote.clone(),
            wallet: *wallet,
            tx_version: match format {
                TxFormat::Legacy => TxVersion::Legacy,
                TxFormat::Versioned => TxVersion::V0,
            },
            compute_unit_price,
            wrap_sol,
            unwrap_sol,
            input_account: (!wrap_sol)
                .then(|| get_associated_token_address(wallet, &quote.input_mint)),
            output_account: (!unwrap_sol)
                .then(|| get_associated_token_address(wallet, &quote.output_mint)),
        };

        let payloads = venue
            .build_swap_transactions(&request)
            .await
            .map_err(|e| SwapError::TransactionBuildFailure(e.to_string()))?;
        let Some(first) = payloads.first() else {
            return Err(SwapError::TransactionBuildFailure(
                "venue returned no transactions".to_string(),
            ));
        };
        if payloads.len() > 1 {
            warn!(count = payloads.len(), "venue returned several transactions, using the first");
        }
        self.from_venue_payload(first)
    }

    /// Builds a curve buy (SOL in) or sell (SOL out) for `quote`.
    pub async fn from_curve_quote(
        &self,
        quote: &SwapQuote,
        payer: &Pubkey,
        priority_fee_micro_lamports: u64,
        format: TxFormat,
    ) -> Result<AssembledTransaction, SwapError> {
        let VenuePayload::Curve(curve) = &quote.payload else {
            return Err(SwapError::TransactionBuildFailure(format!(
                "quote from {} is not a bonding-curve quote",
                quote.venue
            )));
        };
        let is_buy = is_native_mint(&quote.input_mint);
        let mint = if is_buy { quote.output_mint } else { quote.input_mint };
        let params = CurveTradeParams {
            payer: *payer,
            mint,
            bonding_curve: curve.clone(),
            input_amount: quote.input_amount,
            slippage_basis_points: quote.slippage_bps,
            fixed_output_amount: None,
            create_output_mint_ata: is_buy,
        };
        let trade = if is_buy {
            PumpFunInstructionBuilder::build_buy_instructions(&params)?
        } else {
            PumpFunInstructionBuilder::build_sell_instructions(&params)?
        };

        let mut instructions =
            compute_budget_instructions(priority_fee_micro_lamports, DEFAULT_COMPUTE_UNIT_LIMIT);
        instructions.extend(trade);
        self.assemble(payer, instructions, &[], format, Vec::new()).await
    }

    /// Creates a new curve for `mint` and buys `sol_amount` worth in the same
    /// transaction. The mint keypair is attached as a partial signer.
    pub async fn create_and_buy(
        &self,
        creator: &Pubkey,
        mint: Arc<Keypair>,
        token: &CreateTokenParams,
        sol_amount: u64,
        slippage_bps: u16,
        priority_fee_micro_lamports: u64,
    ) -> Result<AssembledTransaction, SwapError> {
        let mint_pubkey = mint.pubkey();
        let mut instructions =
            compute_budget_instructions(priority_fee_micro_lamports, DEFAULT_COMPUTE_UNIT_LIMIT);
        instructions.push(PumpFunInstructionBuilder::build_create_instruction(
            creator,
            &mint_pubkey,
            token,
        ));
        if sol_amount > 0 {
            let params = CurveTradeParams {
                payer: *creator,
                mint: mint_pubkey,
                bonding_curve: BondingCurveAccount::initial(&mint_pubkey, *creator),
                input_amount: sol_amount,
                slippage_basis_points: slippage_bps,
                fixed_output_amount: None,
                create_output_mint_ata: true,
            };
            instructions.extend(PumpFunInstructionBuilder::build_buy_instructions(&params)?);
        }
        self.assemble(creator, instructions, &[], TxFormat::Versioned, vec![mint]).await
    }
}

/// Compiles instructions into an envelope for a known blockhash.
pub fn compile_envelope(
    payer: &Pubkey,
    instructions: Vec<Instruction>,
    lookup_tables: &[AddressLookupTableAccount],
    format: TxFormat,
    blockhash: Hash,
) -> Result<TransactionEnvelope, SwapError> {
    match format {
        TxFormat::Legacy => {
            if !lookup_tables.is_empty() {
                return Err(SwapError::TransactionBuildFailure(
                    "legacy transactions cannot use lookup tables".to_string(),
                ));
            }
            Ok(TransactionEnvelope::legacy(instructions, *payer, Some(blockhash)))
        }
        TxFormat::Versioned => {
            let message = v0::Message::try_compile(payer, &instructions, lookup_tables, blockhash)
                .map_err(|e| SwapError::TransactionBuildFailure(e.to_string()))?;
            Ok(TransactionEnvelope::from_v0(message))
        }
    }
}
