//! 账本记录解析模块
//!
//! 从钱包历史交易中还原兑换记录

pub mod swap_reconstructor;
pub mod transaction_adapter;
pub mod types;

pub use swap_reconstructor::{ReconstructionConfig, SwapReconstructor, reconstruct_swap};
pub use transaction_adapter::{AdapterError, TransactionAdapter};
pub use types::*;
