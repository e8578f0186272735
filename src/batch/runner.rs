//! One pass over the target list
//!
//! `ClaimPending -> Funding -> Iterating -> Done`. Nothing carries over
//! between batches except the wallet: nonce and balances are fetched fresh.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use backoff::{future::retry, ExponentialBackoff};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::Error;
use crate::rpc::types::ClaimRequest;
use crate::rpc::{BalanceOracle, ChainRpc};
use crate::trading::{
    AutoEncryptor, FundingOutcome, GateOutcome, PrivateTransferGate, TransactionBuilder,
};
use crate::wallet::Wallet;

/// Claim pass result
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClaimStats {
    pub claimed: usize,
    pub failed: usize,
}

/// Batch summary
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub total: usize,
    pub private_sent: usize,
    pub public_sent: usize,
    pub failed: usize,
    /// Failures that were rejected only after a transient retry; the first
    /// submission may have been accepted
    pub unconfirmed: usize,
    pub claims: ClaimStats,
    pub funded: bool,
    /// Shutdown was requested before every recipient was processed
    pub cancelled: bool,
}

impl BatchSummary {
    pub fn succeeded(&self) -> usize {
        self.private_sent + self.public_sent
    }
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} transfers succeeded ({} private, {} public, {} failed), claimed {}/{} pending",
            self.succeeded(),
            self.total,
            self.private_sent,
            self.public_sent,
            self.failed,
            self.claims.claimed,
            self.claims.claimed + self.claims.failed,
        )?;
        if self.unconfirmed > 0 {
            write!(f, " [{} unconfirmed]", self.unconfirmed)?;
        }
        if self.cancelled {
            write!(f, " [cancelled]")?;
        }
        Ok(())
    }
}

/// Drives claim, funding and per-recipient transfers for one wallet
pub struct BatchRunner {
    wallet: Arc<Wallet>,
    rpc: Arc<dyn ChainRpc>,
    oracle: BalanceOracle,
    gate: PrivateTransferGate,
    encryptor: AutoEncryptor,
    config: Config,
}

impl BatchRunner {
    pub fn new(wallet: Arc<Wallet>, rpc: Arc<dyn ChainRpc>, config: Config) -> Self {
        let gate = PrivateTransferGate::new(rpc.clone(), &config.private);
        Self::with_gate(wallet, rpc, config, gate)
    }

    /// Use a prepared gate (seeded coin flips)
    pub fn with_gate(
        wallet: Arc<Wallet>,
        rpc: Arc<dyn ChainRpc>,
        config: Config,
        gate: PrivateTransferGate,
    ) -> Self {
        Self {
            oracle: BalanceOracle::new(rpc.clone()),
            encryptor: AutoEncryptor::new(rpc.clone(), &config.encryption),
            wallet,
            rpc,
            gate,
            config,
        }
    }

    pub fn wallet(&self) -> &Wallet {
        &self.wallet
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run one full batch over `targets`
    pub async fn run_batch(
        &mut self,
        targets: &[String],
        cancel: &CancellationToken,
    ) -> BatchSummary {
        let amount_oct = self.config.transfer.amount_oct;
        let amount_raw = self.config.transfer.amount_raw();
        let tx_delay = self.config.schedule.tx_delay();

        let mut summary = BatchSummary {
            total: targets.len(),
            ..Default::default()
        };

        info!(
            "Starting batch: {} recipients, {} OCT each",
            targets.len(),
            amount_oct
        );

        // ClaimPending
        summary.claims = self.claim_pending().await;

        // Funding
        let mut balances = self.oracle.balances(&self.wallet).await.into_value();
        if self.gate.is_enabled() {
            let outcome = self
                .encryptor
                .ensure_funded(&self.wallet, amount_raw, &mut balances)
                .await;
            summary.funded = outcome.funded();
            if let FundingOutcome::ToppedUp { amount_raw } = outcome {
                info!("Encrypted balance topped up by {} raw", amount_raw);
            }
        }

        let nonce_reading = self.oracle.nonce(self.wallet.address()).await;
        if nonce_reading.is_fallback() {
            // Restarting from 0 risks reusing nonces; sends may be rejected
            warn!("Nonce unavailable, numbering from 0 for this batch");
        }
        let mut nonce = nonce_reading.into_value();
        debug!("Starting nonce {}", nonce);

        // Iterating
        for (i, recipient) in targets.iter().enumerate() {
            if cancel.is_cancelled() {
                warn!("Shutdown requested, stopping after {} of {}", i, targets.len());
                summary.cancelled = true;
                break;
            }

            let outcome = self
                .gate
                .attempt(&self.wallet, recipient, amount_raw, &mut balances)
                .await;

            let paid_privately = match outcome {
                GateOutcome::Sent { tx_hash } => {
                    summary.private_sent += 1;
                    match tx_hash {
                        Some(hash) => info!(
                            "[{}/{}] private -> {} {}{}",
                            i + 1,
                            targets.len(),
                            recipient,
                            self.config.transfer.explorer_url,
                            hash
                        ),
                        None => info!("[{}/{}] private -> {}", i + 1, targets.len(), recipient),
                    }
                    true
                }
                GateOutcome::Ineligible(_) => false,
                GateOutcome::Failed(e) => {
                    warn!("Falling back to public transfer for {}: {}", recipient, e);
                    false
                }
            };

            if !paid_privately {
                // Consumed before sending so a failed send never frees it
                nonce += 1;
                match self.send_public(recipient, amount_oct, nonce).await {
                    Ok(hash) => {
                        summary.public_sent += 1;
                        info!(
                            "[{}/{}] public -> {} (nonce {}) {}{}",
                            i + 1,
                            targets.len(),
                            recipient,
                            nonce,
                            self.config.transfer.explorer_url,
                            hash
                        );
                    }
                    Err(failure) => {
                        summary.failed += 1;
                        if failure.possibly_landed() {
                            summary.unconfirmed += 1;
                            warn!(
                                "Nonce {} rejected after {} attempts; an earlier submission may have landed",
                                nonce, failure.attempts
                            );
                        }
                        error!(
                            "[{}/{}] public -> {} (nonce {}) failed: {}",
                            i + 1,
                            targets.len(),
                            recipient,
                            nonce,
                            failure.error
                        );
                    }
                }
            }

            if i + 1 < targets.len() && !tx_delay.is_zero() {
                tokio::select! {
                    _ = tokio::time::sleep(tx_delay) => {}
                    _ = cancel.cancelled() => {}
                }
            }
        }

        info!("Batch complete: {}", summary);
        summary
    }

    /// Claim every pending incoming private transfer
    ///
    /// Each claim is independent; one failure does not stop the rest.
    pub async fn claim_pending(&self) -> ClaimStats {
        let mut stats = ClaimStats::default();
        let private_key = self.wallet.private_key_b64();

        let pending = match self
            .rpc
            .pending_private_transfers(self.wallet.address(), &private_key)
            .await
        {
            Ok(pending) => pending,
            Err(e) => {
                warn!("Failed to list pending private transfers: {}", e);
                return stats;
            }
        };

        if pending.is_empty() {
            debug!("No pending private transfers");
            return stats;
        }

        info!("Claiming {} pending private transfers", pending.len());
        for transfer in pending {
            let request = ClaimRequest {
                recipient_address: self.wallet.address().to_string(),
                private_key: private_key.clone(),
                transfer_id: transfer.id.clone(),
            };

            match self.rpc.claim_private_transfer(&request).await {
                Ok(()) => {
                    stats.claimed += 1;
                    info!("Claimed private transfer {}", transfer.id);
                }
                Err(e) => {
                    stats.failed += 1;
                    warn!("Failed to claim private transfer {}: {}", transfer.id, e);
                }
            }
        }

        stats
    }

    /// Build, sign and submit a public transfer with `nonce`
    ///
    /// Transient failures resend the same signed transaction. A timed-out
    /// attempt may still have been accepted by the node, so a rejection that
    /// follows a retry (typically a duplicate nonce) is reported through
    /// [`SendFailure::possibly_landed`] instead of being treated as success.
    async fn send_public(
        &self,
        recipient: &str,
        amount_oct: f64,
        nonce: u64,
    ) -> std::result::Result<String, SendFailure> {
        let tx = TransactionBuilder::new(&self.wallet)
            .build(recipient, amount_oct, nonce)
            .map_err(|error| SendFailure { error, attempts: 0 })?;

        let max_attempts = self.config.transfer.max_send_attempts;
        let base_delay = Duration::from_millis(self.config.transfer.retry_base_delay_ms);
        let policy = ExponentialBackoff {
            initial_interval: base_delay,
            max_interval: base_delay * 8,
            max_elapsed_time: None,
            ..Default::default()
        };

        let attempts = AtomicU32::new(0);
        let rpc = &self.rpc;
        let tx = &tx;
        let attempts = &attempts;

        retry(policy, || async move {
            let attempt = attempts.fetch_add(1, Ordering::Relaxed) + 1;
            match rpc.send_transaction(tx).await {
                Ok(hash) => Ok(hash),
                Err(e) if e.is_retryable() && attempt < max_attempts => {
                    warn!(
                        "Send to {} failed (attempt {}/{}): {}",
                        tx.to, attempt, max_attempts, e
                    );
                    Err(backoff::Error::transient(e))
                }
                Err(e) => Err(backoff::Error::permanent(e)),
            }
        })
        .await
        .map_err(|error| SendFailure {
            error,
            attempts: attempts.load(Ordering::Relaxed),
        })
    }
}

/// A public send that did not succeed
#[derive(Debug)]
struct SendFailure {
    error: Error,
    attempts: u32,
}

impl SendFailure {
    /// Rejected after at least one transient failure
    fn possibly_landed(&self) -> bool {
        self.attempts > 1 && self.error.is_rejection()
    }
}
