//! Associated token account helpers.

use solana_sdk::{
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
};

use crate::constants::{
    ASSOCIATED_TOKEN_PROGRAM, SYSTEM_PROGRAM_META, TOKEN_PROGRAM, TOKEN_PROGRAM_META,
};

/// Associated token account for `owner` under the classic token program.
#[inline]
pub fn get_associated_token_address(owner: &Pubkey, mint: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(
        &[owner.as_ref(), TOKEN_PROGRAM.as_ref(), mint.as_ref()],
        &ASSOCIATED_TOKEN_PROGRAM,
    )
    .0
}

/// `CreateIdempotent` for the associated token account of `owner`, paid by `payer`.
pub fn create_associated_token_account_idempotent(
    payer: &Pubkey,
    owner: &Pubkey,
    mint: &Pubkey,
) -> Instruction {
    let ata = get_associated_token_address(owner, mint);
    Instruction::new_with_bytes(
        ASSOCIATED_TOKEN_PROGRAM,
        &[1],
        vec![
            AccountMeta::new(*payer, true),
            AccountMeta::new(ata, false),
            AccountMeta::new_readonly(*owner, false),
            AccountMeta::new_readonly(*mint, false),
            SYSTEM_PROGRAM_META,
            TOKEN_PROGRAM_META,
        ],
    )
}
