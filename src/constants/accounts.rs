use solana_sdk::{instruction::AccountMeta, pubkey, pubkey::Pubkey};

pub const SYSTEM_PROGRAM: Pubkey = pubkey!("11111111111111111111111111111111");
pub const TOKEN_PROGRAM: Pubkey = pubkey!("TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA");
pub const ASSOCIATED_TOKEN_PROGRAM: Pubkey =
    pubkey!("ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL");
pub const RENT: Pubkey = pubkey!("SysvarRent111111111111111111111111111111111");
pub const COMPUTE_BUDGET_PROGRAM: Pubkey =
    pubkey!("ComputeBudget111111111111111111111111111111");

// META

pub const SYSTEM_PROGRAM_META: AccountMeta =
    AccountMeta { pubkey: SYSTEM_PROGRAM, is_signer: false, is_writable: false };

pub const TOKEN_PROGRAM_META: AccountMeta =
    AccountMeta { pubkey: TOKEN_PROGRAM, is_signer: false, is_writable: false };

pub const ASSOCIATED_TOKEN_PROGRAM_META: AccountMeta =
    AccountMeta { pubkey: ASSOCIATED_TOKEN_PROGRAM, is_signer: false, is_writable: false };

pub const RENT_META: AccountMeta =
    AccountMeta { pubkey: RENT, is_signer: false, is_writable: false };
