//! 常用代币常量定义
//!
//! Wrapped SOL 的 mint 以及元数据回退时使用的固定值

use solana_sdk::pubkey;

pub use solana_sdk::pubkey::Pubkey;

/// SOL Mint (Wrapped SOL)
pub const SOL_MINT: Pubkey = pubkey!("So11111111111111111111111111111111111111112");

/// Native SOL precision
pub const SOL_DECIMALS: u8 = 9;

/// Lamports per SOL
pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;

pub const SOL_SYMBOL: &str = "SOL";
pub const SOL_NAME: &str = "Solana";
pub const SOL_LOGO_URI: &str = "https://raw.githubusercontent.com/trustwallet/assets/master/blockchains/solana/info/logo.png";

/// Symbol used when a mint cannot be resolved
pub const UNKNOWN_SYMBOL: &str = "Unknown";
/// Name used when a mint cannot be resolved
pub const UNKNOWN_NAME: &str = "Unknown Token";

#[inline]
pub fn is_native_mint(mint: &Pubkey) -> bool {
    *mint == SOL_MINT
}
