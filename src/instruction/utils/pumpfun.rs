use solana_sdk::pubkey::Pubkey;

/// Constants used as seeds for deriving PDAs (Program Derived Addresses)
pub mod seeds {
    /// Seed for bonding curve PDAs
    pub const BONDING_CURVE_SEED: &[u8] = b"bonding-curve";

    /// Seed for creator vault PDAs
    pub const CREATOR_VAULT_SEED: &[u8] = b"creator-vault";

    /// Seed for metadata PDAs
    pub const METADATA_SEED: &[u8] = b"metadata";

    pub const USER_VOLUME_ACCUMULATOR_SEED: &[u8] = b"user_volume_accumulator";
    pub const GLOBAL_VOLUME_ACCUMULATOR_SEED: &[u8] = b"global_volume_accumulator";
    pub const FEE_CONFIG_SEED: &[u8] = b"fee_config";
}

pub mod global_constants {
    use solana_sdk::{instruction::AccountMeta, pubkey, pubkey::Pubkey};

    pub const INITIAL_VIRTUAL_TOKEN_RESERVES: u64 = 1_073_000_000_000_000;
    pub const INITIAL_VIRTUAL_SOL_RESERVES: u64 = 30_000_000_000;
    pub const INITIAL_REAL_TOKEN_RESERVES: u64 = 793_100_000_000_000;
    pub const TOKEN_TOTAL_SUPPLY: u64 = 1_000_000_000_000_000;

    /// Protocol fee on every curve trade
    pub const FEE_BASIS_POINTS: u64 = 95;
    /// Creator share, charged only when the curve records a creator
    pub const CREATOR_FEE_BASIS_POINTS: u64 = 30;

    /// Public key for the global PDA
    pub const GLOBAL_ACCOUNT: Pubkey = pubkey!("4wTV1YmiEkRvAtNtsSGPtUrqRYQMe5SKy2uB4Jjaxnjf");

    /// Public key for the fee recipient
    pub const FEE_RECIPIENT: Pubkey = pubkey!("CebN5WGQ4jvEPvsVU4EoHEpgzq1VV7AbicfhtW4xC9iM");

    pub const MINT_AUTHORITY: Pubkey = pubkey!("TSLvdd1pWpHVjahSpsvCXUbgwsL3JAcvokwaKt1eokM");

    pub const GLOBAL_ACCOUNT_META: AccountMeta =
        AccountMeta { pubkey: GLOBAL_ACCOUNT, is_signer: false, is_writable: false };

    pub const FEE_RECIPIENT_META: AccountMeta =
        AccountMeta { pubkey: FEE_RECIPIENT, is_signer: false, is_writable: true };

    pub const MINT_AUTHORITY_META: AccountMeta =
        AccountMeta { pubkey: MINT_AUTHORITY, is_signer: false, is_writable: false };
}

/// Constants related to program accounts and authorities
pub mod accounts {
    use solana_sdk::{instruction::AccountMeta, pubkey, pubkey::Pubkey};

    /// Pump.fun program
    pub const PUMPFUN: Pubkey = pubkey!("6EF8rrecthR5Dkzon8Nwu78hRvfCKubJ14M5uBEwF6P");

    /// Authority for program events
    pub const EVENT_AUTHORITY: Pubkey = pubkey!("Ce6TQqeHC9p8KetsN6JsjHK7UTZk7nasjjnr7XxXp9F1");

    /// Metaplex token metadata program
    pub const MPL_TOKEN_METADATA: Pubkey = pubkey!("metaqbxxUerdq28cj1RbAWkYQm3ybzjb6a8bt518x1s");

    pub const FEE_PROGRAM: Pubkey = pubkey!("pfeeUxB6jkeY1Hxd7CsFCAjcbHA9rWtchMGdZ6VojVZ");

    // META

    pub const PUMPFUN_META: AccountMeta =
        AccountMeta { pubkey: PUMPFUN, is_signer: false, is_writable: false };

    pub const EVENT_AUTHORITY_META: AccountMeta =
        AccountMeta { pubkey: EVENT_AUTHORITY, is_signer: false, is_writable: false };

    pub const MPL_TOKEN_METADATA_META: AccountMeta =
        AccountMeta { pubkey: MPL_TOKEN_METADATA, is_signer: false, is_writable: false };

    pub const FEE_PROGRAM_META: AccountMeta =
        AccountMeta { pubkey: FEE_PROGRAM, is_signer: false, is_writable: false };
}

#[inline]
pub fn get_bonding_curve_pda(mint: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(&[seeds::BONDING_CURVE_SEED, mint.as_ref()], &accounts::PUMPFUN).0
}

#[inline]
pub fn get_creator_vault_pda(creator: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(&[seeds::CREATOR_VAULT_SEED, creator.as_ref()], &accounts::PUMPFUN)
        .0
}

#[inline]
pub fn get_global_volume_accumulator_pda() -> Pubkey {
    Pubkey::find_program_address(&[seeds::GLOBAL_VOLUME_ACCUMULATOR_SEED], &accounts::PUMPFUN).0
}

#[inline]
pub fn get_user_volume_accumulator_pda(user: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(
        &[seeds::USER_VOLUME_ACCUMULATOR_SEED, user.as_ref()],
        &accounts::PUMPFUN,
    )
    .0
}

#[inline]
pub fn get_fee_config_pda() -> Pubkey {
    Pubkey::find_program_address(
        &[seeds::FEE_CONFIG_SEED, accounts::PUMPFUN.as_ref()],
        &accounts::FEE_PROGRAM,
    )
    .0
}

#[inline]
pub fn get_metadata_pda(mint: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(
        &[seeds::METADATA_SEED, accounts::MPL_TOKEN_METADATA.as_ref(), mint.as_ref()],
        &accounts::MPL_TOKEN_METADATA,
    )
    .0
}
