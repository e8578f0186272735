//! Private transfer eligibility and execution
//!
//! A recipient is paid privately only when all of these hold:
//! 1. the local encrypted balance covers one transfer
//! 2. the coin flip says "private"
//! 3. the recipient has registered a public key
//! 4. that key decodes to exactly 32 bytes
//!
//! Anything else, including a failed private attempt, sends the caller down
//! the public path.

use std::fmt;
use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, warn};

use crate::config::PrivateConfig;
use crate::error::Error;
use crate::rpc::types::PrivateTransferRequest;
use crate::rpc::{BalanceOracle, ChainRpc, EncryptedBalanceState};
use crate::wallet::Wallet;

/// Why a recipient was not paid privately
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ineligible {
    Disabled,
    InsufficientEncryptedBalance { available: u64, required: u64 },
    CoinFlip,
    NoPublicKey,
    InvalidPublicKey { len: usize },
}

impl fmt::Display for Ineligible {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ineligible::Disabled => write!(f, "private transfers disabled"),
            Ineligible::InsufficientEncryptedBalance {
                available,
                required,
            } => write!(
                f,
                "encrypted balance {} < required {}",
                available, required
            ),
            Ineligible::CoinFlip => write!(f, "public selected"),
            Ineligible::NoPublicKey => write!(f, "recipient has no public key"),
            Ineligible::InvalidPublicKey { len } => {
                write!(f, "recipient public key is {} bytes", len)
            }
        }
    }
}

/// Result of running one recipient through the gate
#[derive(Debug)]
pub enum GateOutcome {
    /// Private transfer accepted by the node
    Sent { tx_hash: Option<String> },
    /// Not attempted
    Ineligible(Ineligible),
    /// Attempted and failed
    Failed(Error),
}

impl GateOutcome {
    pub fn is_sent(&self) -> bool {
        matches!(self, GateOutcome::Sent { .. })
    }
}

/// Whether the cached encrypted balance covers one transfer
pub fn has_private_funds(cache: &EncryptedBalanceState, amount_raw: u64) -> bool {
    cache.encrypted_raw >= amount_raw
}

/// Per-recipient private/public decision
pub struct PrivateTransferGate {
    rpc: Arc<dyn ChainRpc>,
    oracle: BalanceOracle,
    enabled: bool,
    attempt_probability: f64,
    rng: StdRng,
}

impl PrivateTransferGate {
    pub fn new(rpc: Arc<dyn ChainRpc>, config: &PrivateConfig) -> Self {
        Self::with_rng(rpc, config, StdRng::from_entropy())
    }

    /// Deterministic coin flips for reproducible runs
    pub fn with_seed(rpc: Arc<dyn ChainRpc>, config: &PrivateConfig, seed: u64) -> Self {
        Self::with_rng(rpc, config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(rpc: Arc<dyn ChainRpc>, config: &PrivateConfig, rng: StdRng) -> Self {
        Self {
            oracle: BalanceOracle::new(rpc.clone()),
            rpc,
            enabled: config.enabled,
            attempt_probability: config.attempt_probability.clamp(0.0, 1.0),
            rng,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn flip(&mut self) -> bool {
        self.rng.gen_bool(self.attempt_probability)
    }

    /// Check eligibility without touching the network beyond key lookups
    async fn check(
        &mut self,
        recipient: &str,
        amount_raw: u64,
        cache: &EncryptedBalanceState,
    ) -> Result<[u8; 32], Ineligible> {
        if !self.enabled {
            return Err(Ineligible::Disabled);
        }

        if !has_private_funds(cache, amount_raw) {
            return Err(Ineligible::InsufficientEncryptedBalance {
                available: cache.encrypted_raw,
                required: amount_raw,
            });
        }

        if !self.flip() {
            return Err(Ineligible::CoinFlip);
        }

        if !self.oracle.has_public_key(recipient).await.into_value() {
            return Err(Ineligible::NoPublicKey);
        }

        let key = self
            .oracle
            .public_key(recipient)
            .await
            .into_value()
            .ok_or(Ineligible::NoPublicKey)?;

        let len = key.len();
        key.try_into()
            .map_err(|_| Ineligible::InvalidPublicKey { len })
    }

    /// Try to pay `recipient` privately
    ///
    /// On success the cached encrypted balance is reduced by `amount_raw`.
    /// No nonce is consumed either way.
    pub async fn attempt(
        &mut self,
        wallet: &Wallet,
        recipient: &str,
        amount_raw: u64,
        cache: &mut EncryptedBalanceState,
    ) -> GateOutcome {
        let recipient_key = match self.check(recipient, amount_raw, cache).await {
            Ok(key) => key,
            Err(reason) => {
                debug!("{}: {}", recipient, reason);
                return GateOutcome::Ineligible(reason);
            }
        };

        let request = PrivateTransferRequest {
            from: wallet.address().to_string(),
            to: recipient.to_string(),
            amount: amount_raw.to_string(),
            from_private_key: wallet.private_key_b64(),
            to_public_key: BASE64.encode(recipient_key),
        };

        match self.rpc.private_transfer(&request).await {
            Ok(tx_hash) => {
                cache.encrypted_raw = cache.encrypted_raw.saturating_sub(amount_raw);
                info!(
                    "Private transfer of {} raw to {} accepted ({} raw encrypted left)",
                    amount_raw, recipient, cache.encrypted_raw
                );
                GateOutcome::Sent { tx_hash }
            }
            Err(e) => {
                warn!("Private transfer to {} failed: {}", recipient, e);
                GateOutcome::Failed(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::mock::MockRpc;

    const AMOUNT: u64 = 100_000;

    fn config(probability: f64) -> PrivateConfig {
        PrivateConfig {
            enabled: true,
            attempt_probability: probability,
        }
    }

    fn funded(encrypted_raw: u64) -> EncryptedBalanceState {
        EncryptedBalanceState {
            encrypted_raw,
            public_raw: 0,
        }
    }

    #[tokio::test]
    async fn test_insufficient_balance_always_public() {
        let mock = Arc::new(
            MockRpc::new("octSender").with_public_key("octR", &BASE64.encode([2u8; 32])),
        );
        let wallet = MockRpc::wallet("octSender");

        for seed in 0..32 {
            let mut gate = PrivateTransferGate::with_seed(mock.clone(), &config(1.0), seed);
            let mut cache = funded(50_000);
            let outcome = gate.attempt(&wallet, "octR", AMOUNT, &mut cache).await;

            assert!(matches!(
                outcome,
                GateOutcome::Ineligible(Ineligible::InsufficientEncryptedBalance {
                    available: 50_000,
                    required: AMOUNT
                })
            ));
            assert_eq!(cache.encrypted_raw, 50_000);
        }

        assert!(mock.private_transfers().is_empty());
        assert_eq!(mock.public_key_lookups(), 0);
    }

    #[tokio::test]
    async fn test_coin_flip_public() {
        let mock = Arc::new(
            MockRpc::new("octSender").with_public_key("octR", &BASE64.encode([2u8; 32])),
        );
        let wallet = MockRpc::wallet("octSender");
        let mut gate = PrivateTransferGate::new(mock.clone(), &config(0.0));
        let mut cache = funded(1_000_000);

        let outcome = gate.attempt(&wallet, "octR", AMOUNT, &mut cache).await;
        assert!(matches!(outcome, GateOutcome::Ineligible(Ineligible::CoinFlip)));
        assert!(mock.private_transfers().is_empty());
    }

    #[tokio::test]
    async fn test_recipient_without_key() {
        let mock = Arc::new(MockRpc::new("octSender"));
        let wallet = MockRpc::wallet("octSender");
        let mut gate = PrivateTransferGate::new(mock.clone(), &config(1.0));
        let mut cache = funded(1_000_000);

        let outcome = gate.attempt(&wallet, "octNoKey", AMOUNT, &mut cache).await;
        assert!(matches!(outcome, GateOutcome::Ineligible(Ineligible::NoPublicKey)));
    }

    #[tokio::test]
    async fn test_wrong_key_length() {
        let mock = Arc::new(
            MockRpc::new("octSender").with_public_key("octShort", &BASE64.encode([2u8; 16])),
        );
        let wallet = MockRpc::wallet("octSender");
        let mut gate = PrivateTransferGate::new(mock.clone(), &config(1.0));
        let mut cache = funded(1_000_000);

        let outcome = gate.attempt(&wallet, "octShort", AMOUNT, &mut cache).await;
        assert!(matches!(
            outcome,
            GateOutcome::Ineligible(Ineligible::InvalidPublicKey { len: 16 })
        ));
        assert!(mock.private_transfers().is_empty());
    }

    #[tokio::test]
    async fn test_private_success_decrements_cache() {
        let recipient_key = BASE64.encode([2u8; 32]);
        let mock = Arc::new(MockRpc::new("octSender").with_public_key("octR", &recipient_key));
        let wallet = MockRpc::wallet("octSender");
        let mut gate = PrivateTransferGate::new(mock.clone(), &config(1.0));
        let mut cache = funded(250_000);

        let outcome = gate.attempt(&wallet, "octR", AMOUNT, &mut cache).await;
        assert!(outcome.is_sent());
        assert_eq!(cache.encrypted_raw, 150_000);

        let requests = mock.private_transfers();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].amount, "100000");
        assert_eq!(requests[0].to_public_key, recipient_key);
        assert_eq!(requests[0].from_private_key, wallet.private_key_b64());
    }

    #[tokio::test]
    async fn test_private_failure_keeps_cache() {
        let mock = Arc::new(
            MockRpc::new("octSender").with_public_key("octR", &BASE64.encode([2u8; 32])),
        );
        mock.fail_private_transfers(true);
        let wallet = MockRpc::wallet("octSender");
        let mut gate = PrivateTransferGate::new(mock.clone(), &config(1.0));
        let mut cache = funded(250_000);

        let outcome = gate.attempt(&wallet, "octR", AMOUNT, &mut cache).await;
        assert!(matches!(outcome, GateOutcome::Failed(_)));
        assert_eq!(cache.encrypted_raw, 250_000);
    }

    #[tokio::test]
    async fn test_disabled_gate() {
        let mock = Arc::new(MockRpc::new("octSender"));
        let wallet = MockRpc::wallet("octSender");
        let config = PrivateConfig {
            enabled: false,
            attempt_probability: 1.0,
        };
        let mut gate = PrivateTransferGate::new(mock, &config);
        let mut cache = funded(1_000_000);

        let outcome = gate.attempt(&wallet, "octR", AMOUNT, &mut cache).await;
        assert!(matches!(outcome, GateOutcome::Ineligible(Ineligible::Disabled)));
    }
}
