use solana_sdk::{
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
};

use crate::{
    common::{bonding_curve::BondingCurveAccount, error::SwapError},
    constants::{
        ASSOCIATED_TOKEN_PROGRAM_META, RENT_META, SYSTEM_PROGRAM_META, TOKEN_PROGRAM_META,
    },
    instruction::{
        token::{create_associated_token_account_idempotent, get_associated_token_address},
        utils::pumpfun::{
            accounts, get_bonding_curve_pda, get_creator_vault_pda, get_fee_config_pda,
            get_global_volume_accumulator_pda, get_metadata_pda, get_user_volume_accumulator_pda,
            global_constants,
        },
    },
    utils::calc::{
        common::{calculate_with_slippage_buy, calculate_with_slippage_sell},
        pumpfun::{get_buy_token_amount_from_sol_amount, get_sell_sol_amount_from_token_amount},
    },
};

const BUY_DISCRIMINATOR: [u8; 8] = [102, 6, 61, 18, 1, 218, 235, 234];
const SELL_DISCRIMINATOR: [u8; 8] = [51, 230, 133, 164, 1, 127, 131, 173];
const CREATE_DISCRIMINATOR: [u8; 8] = [24, 30, 200, 40, 5, 28, 7, 119];

/// Inputs for a single curve trade.
#[derive(Debug, Clone)]
pub struct CurveTradeParams {
    pub payer: Pubkey,
    pub mint: Pubkey,
    pub bonding_curve: BondingCurveAccount,
    /// Lamports to spend on a buy, tokens to sell on a sell
    pub input_amount: u64,
    pub slippage_basis_points: u16,
    /// Exact output to request instead of the curve estimate
    pub fixed_output_amount: Option<u64>,
    pub create_output_mint_ata: bool,
}

/// Token metadata for a new curve.
#[derive(Debug, Clone)]
pub struct CreateTokenParams {
    pub name: String,
    pub symbol: String,
    pub uri: String,
}

/// Instruction builder for PumpFun protocol
pub struct PumpFunInstructionBuilder;

impl PumpFunInstructionBuilder {
    pub fn build_buy_instructions(params: &CurveTradeParams) -> Result<Vec<Instruction>, SwapError> {
        if params.input_amount == 0 {
            return Err(SwapError::InvalidInput("Amount cannot be zero".to_string()));
        }
        let bonding_curve = &params.bonding_curve;
        if bonding_curve.complete {
            return Err(SwapError::TransactionBuildFailure(format!(
                "bonding curve for {} is complete",
                params.mint
            )));
        }

        let buy_token_amount = match params.fixed_output_amount {
            Some(amount) => amount,
            None => get_buy_token_amount_from_sol_amount(
                bonding_curve.virtual_token_reserves as u128,
                bonding_curve.virtual_sol_reserves as u128,
                bonding_curve.real_token_reserves as u128,
                &bonding_curve.creator,
                params.input_amount,
            ),
        };
        if buy_token_amount == 0 {
            return Err(SwapError::InsufficientLiquidity {
                input_mint: crate::constants::SOL_MINT.to_string(),
                amount: params.input_amount,
            });
        }

        let max_sol_cost =
            calculate_with_slippage_buy(params.input_amount, params.slippage_basis_points);

        let bonding_curve_addr = curve_address(bonding_curve, &params.mint);
        let associated_bonding_curve =
            get_associated_token_address(&bonding_curve_addr, &params.mint);
        let user_token_account = get_associated_token_address(&params.payer, &params.mint);
        let creator_vault = get_creator_vault_pda(&bonding_curve.creator);
        let user_volume_accumulator = get_user_volume_accumulator_pda(&params.payer);

        let mut instructions = Vec::with_capacity(2);

        if params.create_output_mint_ata {
            instructions.push(create_associated_token_account_idempotent(
                &params.payer,
                &params.payer,
                &params.mint,
            ));
        }

        let mut buy_data = [0u8; 24];
        buy_data[..8].copy_from_slice(&BUY_DISCRIMINATOR);
        buy_data[8..16].copy_from_slice(&buy_token_amount.to_le_bytes());
        buy_data[16..24].copy_from_slice(&max_sol_cost.to_le_bytes());

        let accounts: [AccountMeta; 16] = [
            global_constants::GLOBAL_ACCOUNT_META,
            global_constants::FEE_RECIPIENT_META,
            AccountMeta::new_readonly(params.mint, false),
            AccountMeta::new(bonding_curve_addr, false),
            AccountMeta::new(associated_bonding_curve, false),
            AccountMeta::new(user_token_account, false),
            AccountMeta::new(params.payer, true),
            SYSTEM_PROGRAM_META,
            TOKEN_PROGRAM_META,
            AccountMeta::new(creator_vault, false),
            accounts::EVENT_AUTHORITY_META,
            accounts::PUMPFUN_META,
            AccountMeta::new(get_global_volume_accumulator_pda(), false),
            AccountMeta::new(user_volume_accumulator, false),
            AccountMeta::new_readonly(get_fee_config_pda(), false),
            accounts::FEE_PROGRAM_META,
        ];

        instructions.push(Instruction::new_with_bytes(
            accounts::PUMPFUN,
            &buy_data,
            accounts.to_vec(),
        ));

        Ok(instructions)
    }

    pub fn build_sell_instructions(
        params: &CurveTradeParams,
    ) -> Result<Vec<Instruction>, SwapError> {
        if params.input_amount == 0 {
            return Err(SwapError::InvalidInput("Amount cannot be zero".to_string()));
        }
        let bonding_curve = &params.bonding_curve;
        if bonding_curve.complete {
            return Err(SwapError::TransactionBuildFailure(format!(
                "bonding curve for {} is complete",
                params.mint
            )));
        }

        let min_sol_output = match params.fixed_output_amount {
            Some(fixed) => fixed,
            None => {
                let sol_amount = get_sell_sol_amount_from_token_amount(
                    bonding_curve.virtual_token_reserves as u128,
                    bonding_curve.virtual_sol_reserves as u128,
                    &bonding_curve.creator,
                    params.input_amount,
                );
                calculate_with_slippage_sell(sol_amount, params.slippage_basis_points)
            }
        };

        let bonding_curve_addr = curve_address(bonding_curve, &params.mint);
        let associated_bonding_curve =
            get_associated_token_address(&bonding_curve_addr, &params.mint);
        let user_token_account = get_associated_token_address(&params.payer, &params.mint);
        let creator_vault = get_creator_vault_pda(&bonding_curve.creator);

        let mut sell_data = [0u8; 24];
        sell_data[..8].copy_from_slice(&SELL_DISCRIMINATOR);
        sell_data[8..16].copy_from_slice(&params.input_amount.to_le_bytes());
        sell_data[16..24].copy_from_slice(&min_sol_output.to_le_bytes());

        let accounts: [AccountMeta; 14] = [
            global_constants::GLOBAL_ACCOUNT_META,
            global_constants::FEE_RECIPIENT_META,
            AccountMeta::new_readonly(params.mint, false),
            AccountMeta::new(bonding_curve_addr, false),
            AccountMeta::new(associated_bonding_curve, false),
            AccountMeta::new(user_token_account, false),
            AccountMeta::new(params.payer, true),
            SYSTEM_PROGRAM_META,
            AccountMeta::new(creator_vault, false),
            TOKEN_PROGRAM_META,
            accounts::EVENT_AUTHORITY_META,
            accounts::PUMPFUN_META,
            AccountMeta::new_readonly(get_fee_config_pda(), false),
            accounts::FEE_PROGRAM_META,
        ];

        Ok(vec![Instruction::new_with_bytes(accounts::PUMPFUN, &sell_data, accounts.to_vec())])
    }

    /// `create` for a new mint; `creator` pays and signs alongside the mint keypair.
    pub fn build_create_instruction(
        creator: &Pubkey,
        mint: &Pubkey,
        token: &CreateTokenParams,
    ) -> Instruction {
        let bonding_curve = get_bonding_curve_pda(mint);
        let associated_bonding_curve = get_associated_token_address(&bonding_curve, mint);
        let metadata = get_metadata_pda(mint);

        let mut data = Vec::with_capacity(
            8 + 12 + token.name.len() + token.symbol.len() + token.uri.len() + 32,
        );
        data.extend_from_slice(&CREATE_DISCRIMINATOR);
        for field in [&token.name, &token.symbol, &token.uri] {
            data.extend_from_slice(&(field.len() as u32).to_le_bytes());
            data.extend_from_slice(field.as_bytes());
        }
        data.extend_from_slice(creator.as_ref());

        let accounts = vec![
            AccountMeta::new(*mint, true),
            global_constants::MINT_AUTHORITY_META,
            AccountMeta::new(bonding_curve, false),
            AccountMeta::new(associated_bonding_curve, false),
            global_constants::GLOBAL_ACCOUNT_META,
            accounts::MPL_TOKEN_METADATA_META,
            AccountMeta::new(metadata, false),
            AccountMeta::new(*creator, true),
            SYSTEM_PROGRAM_META,
            TOKEN_PROGRAM_META,
            ASSOCIATED_TOKEN_PROGRAM_META,
            RENT_META,
            accounts::EVENT_AUTHORITY_META,
            accounts::PUMPFUN_META,
        ];

        Instruction::new_with_bytes(accounts::PUMPFUN, &data, accounts)
    }
}

fn curve_address(curve: &BondingCurveAccount, mint: &Pubkey) -> Pubkey {
    if curve.account == Pubkey::default() { get_bonding_curve_pda(mint) } else { curve.account }
}
