//! Wallet identity and inputs
//!
//! - Credential loading (wallet.json)
//! - Target list loading (targets.txt)
//! - Ed25519 signing

pub mod credentials;
pub mod signer;
pub mod targets;

pub use credentials::Wallet;
pub use signer::Signer;
pub use targets::load_targets;
