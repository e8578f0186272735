//! One-shot encrypted balance top-up
//!
//! Runs once per batch before any recipient is processed. The top-up is
//! optimistic: after the propagation wait the cached snapshot is adjusted
//! locally and never re-read within the batch.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::config::EncryptionConfig;
use crate::error::Error;
use crate::rpc::types::EncryptBalanceRequest;
use crate::rpc::{ChainRpc, EncryptedBalanceState};
use crate::wallet::Wallet;

/// What the funding policy asks for, given a balance snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FundingPlan {
    /// Encrypted balance already covers one transfer
    AlreadyFunded,
    /// Public balance cannot cover the top-up plus the safety buffer
    Insufficient,
    /// Encrypt exactly this many micro-units
    Encrypt(u64),
}

/// Funding policy
pub fn plan_funding(
    state: &EncryptedBalanceState,
    min_raw: u64,
    safety_buffer_raw: u64,
) -> FundingPlan {
    if state.encrypted_raw >= min_raw {
        FundingPlan::AlreadyFunded
    } else if state.public_raw < min_raw.saturating_add(safety_buffer_raw) {
        FundingPlan::Insufficient
    } else {
        FundingPlan::Encrypt(min_raw)
    }
}

/// Result of a funding pass
#[derive(Debug)]
pub enum FundingOutcome {
    AlreadyFunded,
    Underfunded { public_raw: u64, required: u64 },
    ToppedUp { amount_raw: u64 },
    RequestFailed(Error),
}

impl FundingOutcome {
    /// Whether private transfers can be attempted this batch
    pub fn funded(&self) -> bool {
        matches!(
            self,
            FundingOutcome::AlreadyFunded | FundingOutcome::ToppedUp { .. }
        )
    }
}

/// Moves public balance into the encrypted pool when it runs dry
pub struct AutoEncryptor {
    rpc: Arc<dyn ChainRpc>,
    safety_buffer_raw: u64,
    propagation_delay: Duration,
}

impl AutoEncryptor {
    pub fn new(rpc: Arc<dyn ChainRpc>, config: &EncryptionConfig) -> Self {
        Self {
            rpc,
            safety_buffer_raw: config.safety_buffer_raw,
            propagation_delay: config.propagation_delay(),
        }
    }

    /// Make sure the encrypted balance can cover at least one `min_raw` transfer
    pub async fn ensure_funded(
        &self,
        wallet: &Wallet,
        min_raw: u64,
        cache: &mut EncryptedBalanceState,
    ) -> FundingOutcome {
        let amount_raw = match plan_funding(cache, min_raw, self.safety_buffer_raw) {
            FundingPlan::AlreadyFunded => return FundingOutcome::AlreadyFunded,
            FundingPlan::Insufficient => {
                info!(
                    "Public balance {} raw too low to encrypt {} raw (+{} buffer)",
                    cache.public_raw, min_raw, self.safety_buffer_raw
                );
                return FundingOutcome::Underfunded {
                    public_raw: cache.public_raw,
                    required: min_raw.saturating_add(self.safety_buffer_raw),
                };
            }
            FundingPlan::Encrypt(amount_raw) => amount_raw,
        };

        let request = EncryptBalanceRequest {
            address: wallet.address().to_string(),
            amount: amount_raw.to_string(),
            private_key: wallet.private_key_b64(),
        };

        if let Err(e) = self.rpc.encrypt_balance(&request).await {
            warn!("Encrypt balance request failed: {}", e);
            return FundingOutcome::RequestFailed(e);
        }

        info!(
            "Encrypting {} raw, waiting {:?} for it to settle",
            amount_raw, self.propagation_delay
        );
        tokio::time::sleep(self.propagation_delay).await;

        cache.encrypted_raw = cache.encrypted_raw.saturating_add(amount_raw);
        cache.public_raw = cache.public_raw.saturating_sub(amount_raw);

        FundingOutcome::ToppedUp { amount_raw }
    }
}
