//! Best-effort account reads
//!
//! Every read returns a [`Reading`]: either the live value or a conservative
//! default together with the error that forced it. Callers decide what a
//! fallback means for them instead of the failure disappearing in a log line.

use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use tracing::{debug, warn};

use super::client::ChainRpc;
use super::types::{AccountInfo, EncryptedBalanceState};
use crate::error::Error;
use crate::wallet::Wallet;

/// Outcome of a best-effort read
#[derive(Debug)]
pub enum Reading<T> {
    /// Value reported by the node
    Fresh(T),
    /// Default substituted after a failed read
    Fallback { value: T, error: Error },
}

impl<T> Reading<T> {
    fn from_result(result: crate::error::Result<T>, default: T) -> Self {
        match result {
            Ok(value) => Reading::Fresh(value),
            Err(error) => Reading::Fallback {
                value: default,
                error,
            },
        }
    }

    pub fn value(&self) -> &T {
        match self {
            Reading::Fresh(value) | Reading::Fallback { value, .. } => value,
        }
    }

    pub fn into_value(self) -> T {
        match self {
            Reading::Fresh(value) | Reading::Fallback { value, .. } => value,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Reading::Fallback { .. })
    }

    pub fn error(&self) -> Option<&Error> {
        match self {
            Reading::Fresh(_) => None,
            Reading::Fallback { error, .. } => Some(error),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Reading<U> {
        match self {
            Reading::Fresh(value) => Reading::Fresh(f(value)),
            Reading::Fallback { value, error } => Reading::Fallback {
                value: f(value),
                error,
            },
        }
    }
}

/// Read-only view of account state on the node
#[derive(Clone)]
pub struct BalanceOracle {
    rpc: Arc<dyn ChainRpc>,
}

impl BalanceOracle {
    pub fn new(rpc: Arc<dyn ChainRpc>) -> Self {
        Self { rpc }
    }

    /// Account summary; empty account on failure
    pub async fn account(&self, address: &str) -> Reading<AccountInfo> {
        let reading = Reading::from_result(self.rpc.account(address).await, AccountInfo::default());
        if let Some(e) = reading.error() {
            warn!("Failed to fetch account {}: {}", address, e);
        }
        reading
    }

    /// Current nonce; 0 on failure
    pub async fn nonce(&self, address: &str) -> Reading<u64> {
        self.account(address).await.map(|info| info.nonce)
    }

    /// Whether the account has registered a public key; false on failure
    pub async fn has_public_key(&self, address: &str) -> Reading<bool> {
        self.account(address).await.map(|info| info.has_public_key)
    }

    /// Decoded public key bytes; `None` on failure or when undecodable
    pub async fn public_key(&self, address: &str) -> Reading<Option<Vec<u8>>> {
        let reading = Reading::from_result(self.rpc.public_key(address).await, None);
        if let Some(e) = reading.error() {
            warn!("Failed to fetch public key of {}: {}", address, e);
        }

        reading.map(|key| {
            key.and_then(|encoded| match BASE64.decode(encoded.trim()) {
                Ok(bytes) => Some(bytes),
                Err(e) => {
                    debug!("Public key of {} is not base64: {}", address, e);
                    None
                }
            })
        })
    }

    /// Encrypted and public raw balances of our own wallet; zeros on failure
    pub async fn balances(&self, wallet: &Wallet) -> Reading<EncryptedBalanceState> {
        let result = self
            .rpc
            .encrypted_balance(wallet.address(), &wallet.private_key_b64())
            .await;
        let reading = Reading::from_result(result, EncryptedBalanceState::default());
        if let Some(e) = reading.error() {
            warn!("Failed to fetch encrypted balance: {}", e);
        }
        reading
    }
}
