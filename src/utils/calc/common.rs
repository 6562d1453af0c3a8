//! Fee and slippage arithmetic.
//!
//! All functions floor and use `u128` intermediates, so no input can overflow.

use crate::constants::trade::trade::BPS_DENOMINATOR;

/// Platform commission owed on `amount`: `floor(amount * fee_bps / 10000)`.
///
/// Zero means "no fee". Basis points above 10000 are clamped, so the result never
/// exceeds `amount`.
#[inline]
pub fn compute_commission(amount: u64, fee_bps: u16) -> u64 {
    let bps = u128::from(fee_bps).min(u128::from(BPS_DENOMINATOR));
    (u128::from(amount) * bps / u128::from(BPS_DENOMINATOR)) as u64
}

/// Lowest acceptable output: `floor(estimated * (10000 - slippage_bps) / 10000)`.
#[inline]
pub fn compute_minimum_out(estimated: u64, slippage_bps: u16) -> u64 {
    let slippage = u128::from(slippage_bps).min(u128::from(BPS_DENOMINATOR));
    let keep = u128::from(BPS_DENOMINATOR) - slippage;
    (u128::from(estimated) * keep / u128::from(BPS_DENOMINATOR)) as u64
}

/// Splits a gross amount into `(net, commission)` with `net + commission == total`.
#[inline]
pub fn split_commission(total: u64, fee_bps: u16) -> (u64, u64) {
    let commission = compute_commission(total, fee_bps);
    (total - commission, commission)
}

/// Upper bound for a max-cost argument: `amount * (10000 + bps) / 10000`, saturating.
#[inline]
pub fn calculate_with_slippage_buy(amount: u64, basis_points: u16) -> u64 {
    let scaled = u128::from(amount) * (u128::from(BPS_DENOMINATOR) + u128::from(basis_points))
        / u128::from(BPS_DENOMINATOR);
    u64::try_from(scaled).unwrap_or(u64::MAX)
}

/// Lower bound for a min-output argument. Never returns zero for a non-zero amount.
#[inline]
pub fn calculate_with_slippage_sell(amount: u64, basis_points: u16) -> u64 {
    if amount == 0 {
        return 0;
    }
    compute_minimum_out(amount, basis_points).max(1)
}
