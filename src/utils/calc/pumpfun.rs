//! Pump.fun bonding-curve pricing including protocol and creator fees.

use solana_sdk::pubkey::Pubkey;

use crate::instruction::utils::pumpfun::global_constants::{
    CREATOR_FEE_BASIS_POINTS, FEE_BASIS_POINTS,
};

/// Total fee charged on a trade; the creator share only applies when the curve
/// has a creator.
#[inline]
pub fn total_fee_basis_points(creator: &Pubkey) -> u128 {
    if *creator != Pubkey::default() {
        u128::from(FEE_BASIS_POINTS + CREATOR_FEE_BASIS_POINTS)
    } else {
        u128::from(FEE_BASIS_POINTS)
    }
}

/// Tokens bought with `amount` lamports. Fees are charged on top of the curve input.
pub fn get_buy_token_amount_from_sol_amount(
    virtual_token_reserves: u128,
    virtual_sol_reserves: u128,
    real_token_reserves: u128,
    creator: &Pubkey,
    amount: u64,
) -> u64 {
    if amount == 0 || virtual_token_reserves == 0 {
        return 0;
    }

    let total_fee_basis_points = total_fee_basis_points(creator);
    let input_amount = u128::from(amount) * 10_000 / (total_fee_basis_points + 10_000);
    let denominator = virtual_sol_reserves + input_amount;
    if denominator == 0 {
        return 0;
    }

    let tokens_received = input_amount * virtual_token_reserves / denominator;
    tokens_received.min(real_token_reserves) as u64
}

/// Lamports received for selling `amount` tokens, net of fees.
pub fn get_sell_sol_amount_from_token_amount(
    virtual_token_reserves: u128,
    virtual_sol_reserves: u128,
    creator: &Pubkey,
    amount: u64,
) -> u64 {
    if amount == 0 {
        return 0;
    }

    let denominator = virtual_token_reserves + u128::from(amount);
    if denominator == 0 {
        return 0;
    }
    let sol_cost = u128::from(amount) * virtual_sol_reserves / denominator;

    let total_fee_basis_points = total_fee_basis_points(creator);
    let fee = (sol_cost * total_fee_basis_points).div_ceil(10_000);
    sol_cost.saturating_sub(fee) as u64
}

/// Price impact in basis points of receiving `actual_out` where the spot price
/// promised `ideal_out`.
#[inline]
pub fn price_impact_bps(ideal_out: u128, actual_out: u128) -> u32 {
    if ideal_out == 0 || actual_out >= ideal_out {
        return 0;
    }
    ((ideal_out - actual_out) * 10_000 / ideal_out).min(10_000) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::utils::pumpfun::global_constants::{
        INITIAL_REAL_TOKEN_RESERVES, INITIAL_VIRTUAL_SOL_RESERVES, INITIAL_VIRTUAL_TOKEN_RESERVES,
    };

    #[test]
    fn buy_on_fresh_curve() {
        let creator = Pubkey::new_unique();
        let tokens = get_buy_token_amount_from_sol_amount(
            INITIAL_VIRTUAL_TOKEN_RESERVES as u128,
            INITIAL_VIRTUAL_SOL_RESERVES as u128,
            INITIAL_REAL_TOKEN_RESERVES as u128,
            &creator,
            1_000_000_000,
        );
        // ~34.6M tokens (6 decimals) for 1 SOL before the curve moves
        assert!(tokens > 34_000_000_000_000 && tokens < 35_000_000_000_000, "{tokens}");
    }

    #[test]
    fn buy_is_capped_by_real_reserves() {
        let tokens = get_buy_token_amount_from_sol_amount(
            1_000_000,
            1_000,
            10,
            &Pubkey::default(),
            1_000_000,
        );
        assert_eq!(tokens, 10);
    }

    #[test]
    fn sell_deducts_fees() {
        let gross = 1_000u128 * 30_000_000_000 / (1_073_000_000_000_000 + 1_000);
        let net = get_sell_sol_amount_from_token_amount(
            1_073_000_000_000_000,
            30_000_000_000,
            &Pubkey::default(),
            1_000,
        );
        assert!(u128::from(net) <= gross);
        assert_eq!(get_sell_sol_amount_from_token_amount(1, 1, &Pubkey::default(), 0), 0);
    }

    #[test]
    fn impact_is_bounded() {
        assert_eq!(price_impact_bps(0, 0), 0);
        assert_eq!(price_impact_bps(100, 100), 0);
        assert_eq!(price_impact_bps(100, 99), 100);
        assert_eq!(price_impact_bps(100, 0), 10_000);
    }
}
