pub mod common;
pub mod dispatcher;
pub mod lifecycle;
pub mod quote;

pub use common::{
    AssembledTransaction, FeePatchOutcome, TransactionAssembler, TransactionEnvelope,
    TransactionPatcher, TxFormat,
};
pub use dispatcher::{ConfirmationStatus, KeypairWallet, SigningDispatcher, WalletSigner};
pub use lifecycle::{CallbackRef, FnCallback, NoopCallback, StatusUpdate, TransactionStatusCallback};
pub use quote::{QuoteAggregator, QuoteRequest, SwapQuote, Venue, VenuePayload};
