pub mod envelope;
pub mod fee_patcher;
pub mod transaction_builder;

pub use envelope::{AssembledTransaction, TransactionEnvelope, WireEncoding};
pub use fee_patcher::{FeePatchOutcome, TransactionPatcher, encode_transfer_data};
pub use transaction_builder::{TransactionAssembler, TxFormat, compute_budget_instructions};
