pub mod bonding_curve;
pub mod error;
pub mod ledger;
pub mod raydium_api;
pub mod token_metadata;
pub mod types;

pub use error::{SubmitError, SwapError};
pub use ledger::{LedgerRpc, SignatureInfo, SignatureState};
pub use raydium_api::{AmmQuote, AmmVenue, RaydiumApiClient, RaydiumApiConfig};
pub use token_metadata::{JupiterTokenApi, MetadataEnricher, MetadataSource};
pub use types::*;
