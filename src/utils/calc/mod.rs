pub mod common;
pub mod pumpfun;
