use solana_commitment_config::CommitmentConfig;
use solana_sdk::pubkey::Pubkey;
use std::{env, str::FromStr, time::Duration};

use crate::common::error::SwapError;
use crate::constants::trade::{history, retry, trade};

/// Platform commission settings applied to every outgoing swap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeSpec {
    percentage_bps: u16,
    recipient: Pubkey,
}

impl FeeSpec {
    pub fn new(percentage_bps: u16, recipient: Pubkey) -> Result<Self, SwapError> {
        if u64::from(percentage_bps) > trade::BPS_DENOMINATOR {
            return Err(SwapError::InvalidInput(format!(
                "commission of {percentage_bps} bps exceeds 10000"
            )));
        }
        Ok(Self { percentage_bps, recipient })
    }

    /// No commission at all; patching becomes a no-op.
    pub fn disabled() -> Self {
        Self { percentage_bps: 0, recipient: Pubkey::default() }
    }

    pub fn percentage_bps(&self) -> u16 {
        self.percentage_bps
    }

    pub fn recipient(&self) -> &Pubkey {
        &self.recipient
    }

    pub fn is_enabled(&self) -> bool {
        self.percentage_bps > 0 && self.recipient != Pubkey::default()
    }
}

/// How the quote aggregator chooses between venues that can both price a pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QuoteStrategy {
    /// Take the first venue in priority order that returns a quote (AMM, then curve)
    #[default]
    FirstAvailable,
    /// Price every venue and keep the largest estimated output
    BestOutput,
}

/// Bounded retry with a fixed pause between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: usize,
    pub interval: Duration,
}

impl RetryPolicy {
    pub const fn new(attempts: usize, interval: Duration) -> Self {
        Self { attempts, interval }
    }

    pub const fn blockhash() -> Self {
        Self::new(retry::BLOCKHASH_ATTEMPTS, retry::BLOCKHASH_INTERVAL)
    }

    pub const fn confirmation() -> Self {
        Self::new(retry::CONFIRMATION_ATTEMPTS, retry::CONFIRMATION_INTERVAL)
    }
}

/// Engine-wide configuration.
///
/// Built with [`EngineConfig::new`] or [`EngineConfig::from_env`] and refined with
/// the `with_*` methods.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub rpc_url: String,
    pub commitment: CommitmentConfig,
    pub fee: FeeSpec,
    /// Slippage applied when a request carries none
    pub default_slippage_bps: u16,
    /// Raydium v3 API host (mint registry, priority fee)
    pub raydium_api_host: String,
    /// Raydium trade API host (compute / transaction)
    pub raydium_swap_host: String,
    /// Token metadata API host
    pub metadata_host: String,
    pub http_timeout_millis: u64,
    pub quote_strategy: QuoteStrategy,
    pub min_quote_input: u64,
    /// Number of recent signatures inspected when reconstructing history
    pub signature_limit: usize,
    /// Ledger records fetched concurrently per batch
    pub batch_size: usize,
    pub native_threshold: u64,
    pub blockhash_retry: RetryPolicy,
    pub confirmation: Option<RetryPolicy>,
    /// Submit transactions as v0 messages when the engine assembles them itself
    pub use_versioned: bool,
}

impl EngineConfig {
    pub fn new(rpc_url: impl Into<String>, commitment: CommitmentConfig) -> Self {
        Self {
            rpc_url: rpc_url.into(),
            commitment,
            fee: FeeSpec::disabled(),
            default_slippage_bps: trade::DEFAULT_SLIPPAGE,
            raydium_api_host: "https://api-v3.raydium.io".to_string(),
            raydium_swap_host: "https://transaction-v1.raydium.io".to_string(),
            metadata_host: "https://api.jup.ag".to_string(),
            http_timeout_millis: 10_000,
            quote_strategy: QuoteStrategy::default(),
            min_quote_input: trade::MIN_QUOTE_INPUT,
            signature_limit: history::DEFAULT_SIGNATURE_LIMIT,
            batch_size: history::DEFAULT_BATCH_SIZE,
            native_threshold: history::NATIVE_MATERIALITY_THRESHOLD,
            blockhash_retry: RetryPolicy::blockhash(),
            confirmation: Some(RetryPolicy::confirmation()),
            use_versioned: true,
        }
    }

    /// Reads `RPC_URL`, `COMMISSION_WALLET`, `COMMISSION_BPS`, `RAYDIUM_API_HOST`,
    /// `RAYDIUM_SWAP_HOST` and `TOKEN_METADATA_HOST`.
    ///
    /// A commission wallet without `COMMISSION_BPS` uses the 0.5% default.
    pub fn from_env() -> Result<Self, SwapError> {
        let rpc_url = env::var("RPC_URL")
            .map_err(|_| SwapError::Config("RPC_URL is not set".to_string()))?;
        let mut config = Self::new(rpc_url, CommitmentConfig::confirmed());

        if let Ok(wallet) = env::var("COMMISSION_WALLET") {
            let recipient = Pubkey::from_str(wallet.trim()).map_err(|e| {
                SwapError::Config(format!("COMMISSION_WALLET is not a valid address: {e}"))
            })?;
            let bps = match env::var("COMMISSION_BPS") {
                Ok(raw) => raw.trim().parse::<u16>().map_err(|e| {
                    SwapError::Config(format!("COMMISSION_BPS is not a number: {e}"))
                })?,
                Err(_) => trade::DEFAULT_COMMISSION_BPS,
            };
            config.fee = FeeSpec::new(bps, recipient)?;
        }
        if let Ok(host) = env::var("RAYDIUM_API_HOST") {
            config.raydium_api_host = host;
        }
        if let Ok(host) = env::var("RAYDIUM_SWAP_HOST") {
            config.raydium_swap_host = host;
        }
        if let Ok(host) = env::var("TOKEN_METADATA_HOST") {
            config.metadata_host = host;
        }
        Ok(config)
    }

    pub fn with_fee(mut self, fee: FeeSpec) -> Self {
        self.fee = fee;
        self
    }

    pub fn with_default_slippage(mut self, slippage_bps: u16) -> Self {
        self.default_slippage_bps = slippage_bps;
        self
    }

    pub fn with_quote_strategy(mut self, strategy: QuoteStrategy) -> Self {
        self.quote_strategy = strategy;
        self
    }

    pub fn with_hosts(
        mut self,
        raydium_api_host: impl Into<String>,
        raydium_swap_host: impl Into<String>,
        metadata_host: impl Into<String>,
    ) -> Self {
        self.raydium_api_host = raydium_api_host.into();
        self.raydium_swap_host = raydium_swap_host.into();
        self.metadata_host = metadata_host.into();
        self
    }

    pub fn with_history_limits(mut self, signature_limit: usize, batch_size: usize) -> Self {
        self.signature_limit = signature_limit;
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_blockhash_retry(mut self, policy: RetryPolicy) -> Self {
        self.blockhash_retry = policy;
        self
    }

    /// `None` disables confirmation polling after submission.
    pub fn with_confirmation(mut self, policy: Option<RetryPolicy>) -> Self {
        self.confirmation = policy;
        self
    }

    pub fn with_versioned(mut self, use_versioned: bool) -> Self {
        self.use_versioned = use_versioned;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new("https://api.mainnet-beta.solana.com", CommitmentConfig::confirmed())
    }
}

pub type SolanaRpcClient = solana_client::nonblocking::rpc_client::RpcClient;
pub type AnyResult<T> = anyhow::Result<T>;
