//! Public transfer construction
//!
//! The signature covers the compact JSON encoding of
//! `{from, to, amount, nonce, ou, timestamp}` in exactly that key order.
//! `signature` and `public_key` are appended only after signing.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Serialize};

use crate::config::MICRO_UNITS_PER_OCT;
use crate::error::{Error, Result};
use crate::wallet::{Signer, Wallet};

/// Amounts at or above this (in OCT) fall into the higher fee tier
pub const HIGH_FEE_TIER_THRESHOLD_OCT: f64 = 1000.0;

/// Fields covered by the signature, in wire order
#[derive(Serialize)]
struct SignedFields<'a> {
    from: &'a str,
    to: &'a str,
    amount: u64,
    nonce: u64,
    ou: &'a str,
    timestamp: f64,
}

/// Signed public transfer as submitted to `/send-tx`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub from: String,
    pub to: String,
    /// Micro-units
    pub amount: u64,
    pub nonce: u64,
    pub ou: String,
    /// Seconds since the epoch, fractional
    pub timestamp: f64,
    /// Base64 Ed25519 signature
    pub signature: String,
    /// Base64 Ed25519 public key
    pub public_key: String,
}

impl Transaction {
    /// Exact bytes the signature was computed over
    pub fn canonical_bytes(&self) -> Result<Vec<u8>> {
        canonical_bytes(
            &self.from,
            &self.to,
            self.amount,
            self.nonce,
            &self.ou,
            self.timestamp,
        )
    }
}

fn canonical_bytes(
    from: &str,
    to: &str,
    amount: u64,
    nonce: u64,
    ou: &str,
    timestamp: f64,
) -> Result<Vec<u8>> {
    let fields = SignedFields {
        from,
        to,
        amount,
        nonce,
        ou,
        timestamp,
    };
    serde_json::to_vec(&fields).map_err(Error::from)
}

/// Convert OCT to micro-units, truncating any remainder
pub fn amount_to_micro_units(amount_oct: f64) -> u64 {
    // `as` saturates: negatives and NaN land on 0
    (amount_oct * MICRO_UNITS_PER_OCT as f64).floor() as u64
}

/// Fee tier indicator for an amount in OCT
pub fn fee_tier(amount_oct: f64) -> &'static str {
    if amount_oct < HIGH_FEE_TIER_THRESHOLD_OCT {
        "1"
    } else {
        "3"
    }
}

/// Current wall-clock time in fractional seconds
pub fn now_timestamp() -> f64 {
    chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

/// Build and sign a transfer with an explicit key seed
pub fn build(from: &str, to: &str, amount_oct: f64, nonce: u64, seed: &[u8]) -> Result<Transaction> {
    let signer = Signer::from_seed(seed)?;
    build_with_signer(&signer, from, to, amount_oct, nonce, now_timestamp())
}

fn build_with_signer(
    signer: &Signer,
    from: &str,
    to: &str,
    amount_oct: f64,
    nonce: u64,
    timestamp: f64,
) -> Result<Transaction> {
    let amount = amount_to_micro_units(amount_oct);
    let ou = fee_tier(amount_oct);

    let message = canonical_bytes(from, to, amount, nonce, ou, timestamp)?;
    let signature = signer.sign(&message);

    Ok(Transaction {
        from: from.to_string(),
        to: to.to_string(),
        amount,
        nonce,
        ou: ou.to_string(),
        timestamp,
        signature: BASE64.encode(signature),
        public_key: signer.public_key_b64(),
    })
}

/// Transaction builder bound to the sending wallet
pub struct TransactionBuilder<'a> {
    wallet: &'a Wallet,
}

impl<'a> TransactionBuilder<'a> {
    pub fn new(wallet: &'a Wallet) -> Self {
        Self { wallet }
    }

    /// Build a transfer stamped with the current time
    pub fn build(&self, to: &str, amount_oct: f64, nonce: u64) -> Result<Transaction> {
        self.build_at(to, amount_oct, nonce, now_timestamp())
    }

    /// Build a transfer with a fixed timestamp
    pub fn build_at(
        &self,
        to: &str,
        amount_oct: f64,
        nonce: u64,
        timestamp: f64,
    ) -> Result<Transaction> {
        build_with_signer(
            self.wallet.signer(),
            self.wallet.address(),
            to,
            amount_oct,
            nonce,
            timestamp,
        )
    }
}
