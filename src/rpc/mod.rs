//! Node RPC access
//!
//! - `client`: the [`ChainRpc`] seam and its reqwest implementation
//! - `oracle`: best-effort reads with explicit fallbacks
//! - `types`: request/response shapes

pub mod client;
pub mod oracle;
pub mod types;

#[cfg(test)]
pub(crate) mod mock;

pub use client::{ChainRpc, HttpRpcClient};
pub use oracle::{BalanceOracle, Reading};
pub use types::{AccountInfo, EncryptedBalanceState, PendingPrivateTransfer};
