use thiserror::Error;

/// Errors surfaced by the swap engine components.
///
/// Per-item failures inside batch operations (one ledger record, one mint lookup)
/// are logged and skipped rather than returned; everything here is a logical
/// failure the caller has to handle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SwapError {
    #[error("no venue can price {input_mint} -> {output_mint}")]
    QuoteUnavailable { input_mint: String, output_mint: String },

    #[error("insufficient liquidity: {amount} raw units of {input_mint} quote to zero output")]
    InsufficientLiquidity { input_mint: String, amount: u64 },

    #[error("failed to build transaction: {0}")]
    TransactionBuildFailure(String),

    #[error("failed to inject fee instruction: {0}")]
    FeeInjectionFailure(String),

    #[error("transaction simulation failed: {message}")]
    SimulationFailure { message: String, logs: Vec<String> },

    #[error("network timeout: {0}")]
    NetworkTimeout(String),

    #[error("failed to parse ledger record {signature}: {reason}")]
    ReconstructionParseFailure { signature: String, reason: String },

    #[error("failed to fetch metadata for {mint}: {reason}")]
    MetadataFetchFailure { mint: String, reason: String },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("rpc error: {0}")]
    Rpc(String),

    #[error("unexpected venue response: {0}")]
    VenueResponse(String),
}

impl SwapError {
    pub fn quote_unavailable(input_mint: impl ToString, output_mint: impl ToString) -> Self {
        Self::QuoteUnavailable {
            input_mint: input_mint.to_string(),
            output_mint: output_mint.to_string(),
        }
    }

    pub fn parse_failure(signature: impl ToString, reason: impl ToString) -> Self {
        Self::ReconstructionParseFailure {
            signature: signature.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Simulation logs, when the ledger returned any.
    pub fn logs(&self) -> &[String] {
        match self {
            Self::SimulationFailure { logs, .. } => logs,
            _ => &[],
        }
    }
}

/// Raw submission failure, classified before the dispatcher maps it to [`SwapError`].
#[derive(Debug, Clone, Error)]
pub enum SubmitError {
    /// Preflight simulation rejected the transaction; retrying cannot help.
    #[error("simulation failed: {message}")]
    Simulation { message: String, logs: Vec<String> },

    /// Connectivity or expiry problem; a fresh blockhash may fix it.
    #[error("transient submission failure: {0}")]
    Transient(String),

    /// Any other RPC rejection.
    #[error("submission rejected: {0}")]
    Rejected(String),
}

impl From<SubmitError> for SwapError {
    fn from(err: SubmitError) -> Self {
        match err {
            SubmitError::Simulation { message, logs } => Self::SimulationFailure { message, logs },
            SubmitError::Transient(msg) => Self::NetworkTimeout(msg),
            SubmitError::Rejected(msg) => Self::Rpc(msg),
        }
    }
}
