pub mod accounts;
pub mod tokens;
pub mod trade;

pub use accounts::*;
pub use tokens::*;
