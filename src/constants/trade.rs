//! Defaults shared by quoting, fee injection, dispatch and reconstruction.

pub mod trade {
    /// 1% slippage
    pub const DEFAULT_SLIPPAGE: u16 = 100;
    /// Slippage used by bonding-curve launches when the caller gives none (20%)
    pub const DEFAULT_LAUNCH_SLIPPAGE: u16 = 2000;
    /// 0.5% platform commission
    pub const DEFAULT_COMMISSION_BPS: u16 = 50;
    pub const BPS_DENOMINATOR: u64 = 10_000;
    /// Inputs below this many raw units may legitimately quote to zero
    pub const MIN_QUOTE_INPUT: u64 = 1_000;
    /// Fallback compute unit price (micro-lamports) when the fee endpoint is unavailable
    pub const DEFAULT_PRIORITY_FEE: &str = "5000";
    pub const DEFAULT_COMPUTE_UNIT_LIMIT: u32 = 250_000;
}

pub mod history {
    pub const DEFAULT_SIGNATURE_LIMIT: usize = 30;
    pub const DEFAULT_BATCH_SIZE: usize = 5;
    /// Native balance moves at or below this many lamports are treated as noise
    pub const NATIVE_MATERIALITY_THRESHOLD: u64 = 1_000_000;
    /// Decimals assumed when neither the ledger nor the metadata source knows them
    pub const FALLBACK_DECIMALS: u8 = 9;
}

pub mod retry {
    use std::time::Duration;

    pub const BLOCKHASH_ATTEMPTS: usize = 3;
    pub const BLOCKHASH_INTERVAL: Duration = Duration::from_millis(500);
    pub const CONFIRMATION_ATTEMPTS: usize = 6;
    pub const CONFIRMATION_INTERVAL: Duration = Duration::from_millis(1500);
}
