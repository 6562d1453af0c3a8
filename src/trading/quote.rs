//! Venue selection and pricing.
//!
//! The AMM venue is tried first when its registry lists the pair; the bonding
//! curve covers SOL pairs of tokens that have not migrated yet.

use solana_sdk::pubkey::Pubkey;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::common::{
    bonding_curve::BondingCurveAccount,
    error::SwapError,
    ledger::LedgerRpc,
    raydium_api::{AmmQuote, AmmVenue},
    types::QuoteStrategy,
};
use crate::constants::{is_native_mint, trade::trade::BPS_DENOMINATOR};
use crate::instruction::utils::pumpfun::get_bonding_curve_pda;
use crate::utils::calc::{
    common::compute_minimum_out,
    pumpfun::{
        get_buy_token_amount_from_sol_amount, get_sell_sol_amount_from_token_amount,
        price_impact_bps, total_fee_basis_points,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Venue {
    RaydiumAmm,
    PumpFunCurve,
}

/// What the assembler needs from the venue that produced a quote.
#[derive(Debug, Clone, PartialEq)]
pub enum VenuePayload {
    Amm(AmmQuote),
    Curve(BondingCurveAccount),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SwapQuote {
    pub venue: Venue,
    pub input_mint: Pubkey,
    pub output_mint: Pubkey,
    pub input_amount: u64,
    pub estimated_output_amount: u64,
    pub minimum_output_amount: u64,
    pub price_impact_bps: u32,
    pub slippage_bps: u16,
    pub route: Vec<String>,
    pub payload: VenuePayload,
}

impl SwapQuote {
    pub fn new(
        venue: Venue,
        input_mint: Pubkey,
        output_mint: Pubkey,
        input_amount: u64,
        estimated_output_amount: u64,
        minimum_output_amount: u64,
        price_impact_bps: u32,
        slippage_bps: u16,
        route: Vec<String>,
        payload: VenuePayload,
    ) -> Result<Self, SwapError> {
        if minimum_output_amount > estimated_output_amount {
            return Err(SwapError::VenueResponse(format!(
                "minimum output {minimum_output_amount} exceeds estimate {estimated_output_amount}"
            )));
        }
        Ok(Self {
            venue,
            input_mint,
            output_mint,
            input_amount,
            estimated_output_amount,
            minimum_output_amount,
            price_impact_bps,
            slippage_bps,
            route,
            payload,
        })
    }

    /// Amount of native SOL moved by this swap, the base for the platform commission.
    ///
    /// SOL input: the input amount. SOL output: the estimated output. Token to
    /// token swaps have no SOL side and carry no commission.
    pub fn native_side_amount(&self) -> u64 {
        if is_native_mint(&self.input_mint) {
            self.input_amount
        } else if is_native_mint(&self.output_mint) {
            self.estimated_output_amount
        } else {
            0
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuoteRequest {
    pub input_mint: Pubkey,
    pub output_mint: Pubkey,
    pub amount: u64,
    pub slippage_bps: u16,
}

pub struct QuoteAggregator {
    amm: Arc<dyn AmmVenue>,
    ledger: Arc<dyn LedgerRpc>,
    strategy: QuoteStrategy,
    min_input: u64,
}

impl QuoteAggregator {
    pub fn new(
        amm: Arc<dyn AmmVenue>,
        ledger: Arc<dyn LedgerRpc>,
        strategy: QuoteStrategy,
        min_input: u64,
    ) -> Self {
        Self { amm, ledger, strategy, min_input }
    }

    pub fn strategy(&self) -> QuoteStrategy {
        self.strategy
    }

    pub async fn quote(&self, request: &QuoteRequest) -> Result<SwapQuote, SwapError> {
        validate(request)?;

        let chosen = match self.strategy {
            QuoteStrategy::FirstAvailable => {
                let mut first = None;
                for venue in [Venue::RaydiumAmm, Venue::PumpFunCurve] {
                    if let Some(quote) = self.try_venue(venue, request).await {
                        first = Some(quote);
                        break;
                    }
                }
                first
            }
            QuoteStrategy::BestOutput => {
                let (amm, curve) = futures::join!(
                    self.try_venue(Venue::RaydiumAmm, request),
                    self.try_venue(Venue::PumpFunCurve, request)
                );
                [amm, curve].into_iter().flatten().reduce(|best, candidate| {
                    if is_better(&candidate, &best) { candidate } else { best }
                })
            }
        };

        let quote = chosen
            .ok_or_else(|| SwapError::quote_unavailable(request.input_mint, request.output_mint))?;

        self.check_output(request, &quote)?;

        info!(
            venue = ?quote.venue,
            input = %quote.input_mint,
            output = %quote.output_mint,
            estimated = quote.estimated_output_amount,
            minimum = quote.minimum_output_amount,
            "quote selected"
        );
        Ok(quote)
    }

    /// Prices the pair on one venue only, without falling back.
    pub async fn quote_venue(
        &self,
        venue: Venue,
        request: &QuoteRequest,
    ) -> Result<SwapQuote, SwapError> {
        validate(request)?;
        let quote = match venue {
            Venue::RaydiumAmm => self.quote_amm(request).await?,
            Venue::PumpFunCurve => self.quote_curve(request).await?,
        }
        .ok_or_else(|| SwapError::quote_unavailable(request.input_mint, request.output_mint))?;
        self.check_output(request, &quote)?;
        Ok(quote)
    }

    fn check_output(&self, request: &QuoteRequest, quote: &SwapQuote) -> Result<(), SwapError> {
        if quote.estimated_output_amount == 0 {
            if request.amount >= self.min_input {
                return Err(SwapError::InsufficientLiquidity {
                    input_mint: request.input_mint.to_string(),
                    amount: request.amount,
                });
            }
            warn!(
                amount = request.amount,
                min_input = self.min_input,
                "dust input quotes to zero output"
            );
        }
        Ok(())
    }

    /// `None` when the venue cannot price the pair; errors are logged, not raised.
    async fn try_venue(&self, venue: Venue, request: &QuoteRequest) -> Option<SwapQuote> {
        let result = match venue {
            Venue::RaydiumAmm => self.quote_amm(request).await,
            Venue::PumpFunCurve => self.quote_curve(request).await,
        };
        match result {
            Ok(quote) => quote,
            Err(e) => {
                warn!(?venue, error = %e, "venue failed to quote");
                None
            }
        }
    }

    async fn quote_amm(&self, request: &QuoteRequest) -> Result<Option<SwapQuote>, SwapError> {
        for mint in [&request.input_mint, &request.output_mint] {
            if is_native_mint(mint) {
                continue;
            }
            let listed = self
                .amm
                .is_listed(mint)
                .await
                .map_err(|e| SwapError::VenueResponse(e.to_string()))?;
            if !listed {
                debug!(%mint, "mint not listed on amm venue");
                return Ok(None);
            }
        }

        let Some(amm_quote) = self
            .amm
            .quote_exact_in(
                &request.input_mint,
                &request.output_mint,
                request.amount,
                request.slippage_bps,
            )
            .await
            .map_err(|e| SwapError::VenueResponse(e.to_string()))?
        else {
            return Ok(None);
        };

        let estimated = amm_quote.output_amount;
        let minimum = if amm_quote.other_amount_threshold <= estimated {
            amm_quote.other_amount_threshold
        } else {
            compute_minimum_out(estimated, request.slippage_bps)
        };
        let quote = SwapQuote::new(
            Venue::RaydiumAmm,
            request.input_mint,
            request.output_mint,
            request.amount,
            estimated,
            minimum,
            amm_quote.price_impact_bps,
            request.slippage_bps,
            amm_quote.route.clone(),
            VenuePayload::Amm(amm_quote),
        )?;
        Ok(Some(quote))
    }

    async fn quote_curve(&self, request: &QuoteRequest) -> Result<Option<SwapQuote>, SwapError> {
        let (token_mint, is_buy) = if is_native_mint(&request.input_mint) {
            (request.output_mint, true)
        } else if is_native_mint(&request.output_mint) {
            (request.input_mint, false)
        } else {
            return Ok(None);
        };

        let Some(curve) = load_bonding_curve(self.ledger.as_ref(), &token_mint).await? else {
            return Ok(None);
        };
        if !curve.is_tradable() {
            debug!(mint = %token_mint, "bonding curve complete, token has migrated");
            return Ok(None);
        }

        let vt = u128::from(curve.virtual_token_reserves);
        let vs = u128::from(curve.virtual_sol_reserves);
        let fee_bps = total_fee_basis_points(&curve.creator);
        let amount = u128::from(request.amount);

        let (estimated, ideal) = if is_buy {
            let estimated = get_buy_token_amount_from_sol_amount(
                vt,
                vs,
                u128::from(curve.real_token_reserves),
                &curve.creator,
                request.amount,
            );
            let net_in = amount * 10_000 / (10_000 + fee_bps);
            (estimated, if vs == 0 { 0 } else { net_in * vt / vs })
        } else {
            let estimated =
                get_sell_sol_amount_from_token_amount(vt, vs, &curve.creator, request.amount);
            let gross = if vt == 0 { 0 } else { amount * vs / vt };
            (estimated, gross * (10_000 - fee_bps) / 10_000)
        };

        let quote = SwapQuote::new(
            Venue::PumpFunCurve,
            request.input_mint,
            request.output_mint,
            request.amount,
            estimated,
            compute_minimum_out(estimated, request.slippage_bps),
            price_impact_bps(ideal, u128::from(estimated)),
            request.slippage_bps,
            vec![curve.account.to_string()],
            VenuePayload::Curve(curve),
        )?;
        Ok(Some(quote))
    }
}

fn validate(request: &QuoteRequest) -> Result<(), SwapError> {
    if request.amount == 0 {
        return Err(SwapError::InvalidInput("amount must be positive".to_string()));
    }
    if request.input_mint == request.output_mint {
        return Err(SwapError::InvalidInput("input and output mint are identical".to_string()));
    }
    if u64::from(request.slippage_bps) > BPS_DENOMINATOR {
        return Err(SwapError::InvalidInput(format!(
            "slippage of {} bps exceeds 10000",
            request.slippage_bps
        )));
    }
    Ok(())
}

fn is_better(candidate: &SwapQuote, best: &SwapQuote) -> bool {
    candidate.estimated_output_amount > best.estimated_output_amount
        || (candidate.estimated_output_amount == best.estimated_output_amount
            && candidate.price_impact_bps < best.price_impact_bps)
}

/// Reads the curve account for `mint`; `None` when no curve exists.
pub async fn load_bonding_curve(
    ledger: &dyn LedgerRpc,
    mint: &Pubkey,
) -> Result<Option<BondingCurveAccount>, SwapError> {
    let address = get_bonding_curve_pda(mint);
    let Some(data) = ledger
        .account_data(&address)
        .await
        .map_err(|e| SwapError::Rpc(e.to_string()))?
    else {
        return Ok(None);
    };
    BondingCurveAccount::from_account_data(address, &data)
        .map(Some)
        .map_err(SwapError::VenueResponse)
}

impl std::fmt::Display for Venue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RaydiumAmm => f.write_str("raydium"),
            Self::PumpFunCurve => f.write_str("pumpfun"),
        }
    }
}
