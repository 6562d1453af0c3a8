//! Pump.fun bonding curve account.
//!
//! Only the reserves, the completion flag and the creator matter for quoting
//! and instruction building; the account is decoded straight from ledger bytes.

use borsh::BorshDeserialize;
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;

use crate::instruction::utils::pumpfun::global_constants::{
    INITIAL_REAL_TOKEN_RESERVES, INITIAL_VIRTUAL_SOL_RESERVES, INITIAL_VIRTUAL_TOKEN_RESERVES,
    TOKEN_TOTAL_SUPPLY,
};
use crate::instruction::utils::pumpfun::get_bonding_curve_pda;

const DISCRIMINATOR_LEN: usize = 8;
/// Reserves, supply, complete flag, creator and mayhem flag
const BODY_LEN: usize = 8 * 5 + 1 + 32 + 1;

#[derive(Debug, Clone, Serialize, Deserialize, Default, BorshDeserialize, PartialEq, Eq)]
pub struct BondingCurveAccount {
    /// Account address
    #[borsh(skip)]
    pub account: Pubkey,
    /// Virtual token reserves used for price calculations
    pub virtual_token_reserves: u64,
    /// Virtual SOL reserves used for price calculations
    pub virtual_sol_reserves: u64,
    /// Actual token reserves available for trading
    pub real_token_reserves: u64,
    /// Actual SOL reserves available for trading
    pub real_sol_reserves: u64,
    /// Total supply of tokens
    pub token_total_supply: u64,
    /// Whether the bonding curve is complete/finalized
    pub complete: bool,
    /// Creator of the bonding curve
    pub creator: Pubkey,
    /// Whether this is a mayhem mode token
    pub is_mayhem_mode: bool,
}

impl BondingCurveAccount {
    /// Decodes raw account data (discriminator included).
    ///
    /// Curves created before the creator field existed are shorter; missing
    /// trailing fields decode as zero.
    pub fn from_account_data(account: Pubkey, data: &[u8]) -> Result<Self, String> {
        if data.len() < DISCRIMINATOR_LEN + 8 * 5 + 1 {
            return Err(format!("bonding curve account too short: {} bytes", data.len()));
        }
        let mut body = data[DISCRIMINATOR_LEN..].to_vec();
        if body.len() < BODY_LEN {
            body.resize(BODY_LEN, 0);
        }
        let mut curve = <Self as BorshDeserialize>::deserialize(&mut body.as_slice())
            .map_err(|e| e.to_string())?;
        curve.account = account;
        Ok(curve)
    }

    /// Curve state right after `create`, before any trade.
    pub fn initial(mint: &Pubkey, creator: Pubkey) -> Self {
        Self {
            account: get_bonding_curve_pda(mint),
            virtual_token_reserves: INITIAL_VIRTUAL_TOKEN_RESERVES,
            virtual_sol_reserves: INITIAL_VIRTUAL_SOL_RESERVES,
            real_token_reserves: INITIAL_REAL_TOKEN_RESERVES,
            real_sol_reserves: 0,
            token_total_supply: TOKEN_TOTAL_SUPPLY,
            complete: false,
            creator,
            is_mayhem_mode: false,
        }
    }

    /// A migrated curve no longer trades; its liquidity moved to an AMM pool.
    pub fn is_tradable(&self) -> bool {
        !self.complete && self.real_token_reserves > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(curve: &BondingCurveAccount, with_creator: bool) -> Vec<u8> {
        let mut data = vec![23, 183, 248, 55, 96, 216, 172, 96];
        for v in [
            curve.virtual_token_reserves,
            curve.virtual_sol_reserves,
            curve.real_token_reserves,
            curve.real_sol_reserves,
            curve.token_total_supply,
        ] {
            data.extend_from_slice(&v.to_le_bytes());
        }
        data.push(curve.complete as u8);
        if with_creator {
            data.extend_from_slice(curve.creator.as_ref());
            data.push(0);
        }
        data
    }

    #[test]
    fn decodes_current_and_legacy_layouts() {
        let mint = Pubkey::new_unique();
        let creator = Pubkey::new_unique();
        let curve = BondingCurveAccount::initial(&mint, creator);

        let decoded = BondingCurveAccount::from_account_data(curve.account, &encode(&curve, true))
            .unwrap();
        assert_eq!(decoded, curve);

        let legacy = BondingCurveAccount::from_account_data(curve.account, &encode(&curve, false))
            .unwrap();
        assert_eq!(legacy.creator, Pubkey::default());
        assert_eq!(legacy.virtual_sol_reserves, curve.virtual_sol_reserves);

        assert!(BondingCurveAccount::from_account_data(curve.account, &[0u8; 12]).is_err());
    }

    #[test]
    fn decodes_padded_on_chain_account() {
        let mut curve = BondingCurveAccount::initial(&Pubkey::new_unique(), Pubkey::new_unique());
        curve.real_sol_reserves = 12_345_678;
        curve.is_mayhem_mode = true;
        let mut data = encode(&curve, true);
        *data.last_mut().unwrap() = 1;
        data.resize(151, 0);

        let decoded = BondingCurveAccount::from_account_data(curve.account, &data).unwrap();
        assert_eq!(decoded, curve);
    }

    #[test]
    fn complete_or_drained_curve_is_not_tradable() {
        let mut curve = BondingCurveAccount::initial(&Pubkey::new_unique(), Pubkey::default());
        assert!(curve.is_tradable());
        curve.real_token_reserves = 0;
        assert!(!curve.is_tradable());
        curve.real_token_reserves = 1;
        curve.complete = true;
        assert!(!curve.is_tradable());
    }
}
