pub mod pumpfun;
pub mod token;
pub mod utils;
