//! Transfer construction and routing
//!
//! - Public transactions (signed, nonce-sequenced)
//! - Private transfer gate with public fallback
//! - Encrypted balance top-up

pub mod encryptor;
pub mod private_gate;
pub mod transaction;

pub use encryptor::{AutoEncryptor, FundingOutcome};
pub use private_gate::{GateOutcome, Ineligible, PrivateTransferGate};
pub use transaction::{Transaction, TransactionBuilder};
