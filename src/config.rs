//! Configuration loading and validation

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Micro-units per OCT
pub const MICRO_UNITS_PER_OCT: u64 = 1_000_000;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub files: FilesConfig,
    #[serde(default)]
    pub rpc: RpcConfig,
    #[serde(default)]
    pub transfer: TransferConfig,
    #[serde(default)]
    pub private: PrivateConfig,
    #[serde(default)]
    pub encryption: EncryptionConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
}

/// Input file locations
#[derive(Debug, Clone, Deserialize)]
pub struct FilesConfig {
    /// Wallet store (JSON with priv/addr/rpc)
    #[serde(default = "default_wallet_path")]
    pub wallet_path: String,
    /// Newline-delimited recipient addresses, re-read every batch
    #[serde(default = "default_targets_path")]
    pub targets_path: String,
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            wallet_path: default_wallet_path(),
            targets_path: default_targets_path(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RpcConfig {
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransferConfig {
    /// Amount sent to every recipient, in OCT
    #[serde(default = "default_amount_oct")]
    pub amount_oct: f64,
    /// Prefix for human-readable transaction links
    #[serde(default = "default_explorer_url")]
    pub explorer_url: String,
    /// Total attempts for a public send (first try included)
    #[serde(default = "default_max_send_attempts")]
    pub max_send_attempts: u32,
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            amount_oct: default_amount_oct(),
            explorer_url: default_explorer_url(),
            max_send_attempts: default_max_send_attempts(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
        }
    }
}

impl TransferConfig {
    /// Transfer amount in micro-units (truncated)
    pub fn amount_raw(&self) -> u64 {
        crate::trading::transaction::amount_to_micro_units(self.amount_oct)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PrivateConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Chance that an eligible recipient is attempted privately
    #[serde(default = "default_attempt_probability")]
    pub attempt_probability: f64,
}

impl Default for PrivateConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            attempt_probability: default_attempt_probability(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EncryptionConfig {
    /// Public balance kept on top of the encrypted amount
    #[serde(default = "default_safety_buffer_raw")]
    pub safety_buffer_raw: u64,
    /// Wait after an encrypt request before transfers start
    #[serde(default = "default_propagation_delay_secs")]
    pub propagation_delay_secs: u64,
}

impl Default for EncryptionConfig {
    fn default() -> Self {
        Self {
            safety_buffer_raw: default_safety_buffer_raw(),
            propagation_delay_secs: default_propagation_delay_secs(),
        }
    }
}

impl EncryptionConfig {
    pub fn propagation_delay(&self) -> Duration {
        Duration::from_secs(self.propagation_delay_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleConfig {
    /// Wait between the end of one batch and the start of the next
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Pause between consecutive recipients
    #[serde(default = "default_tx_delay_ms")]
    pub tx_delay_ms: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            tx_delay_ms: default_tx_delay_ms(),
        }
    }
}

impl ScheduleConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn tx_delay(&self) -> Duration {
        Duration::from_millis(self.tx_delay_ms)
    }
}

// Default value functions
fn default_wallet_path() -> String {
    "wallet.json".to_string()
}

fn default_targets_path() -> String {
    "targets.txt".to_string()
}

fn default_timeout_ms() -> u64 {
    30000
}

fn default_amount_oct() -> f64 {
    0.1
}

fn default_explorer_url() -> String {
    "https://octrascan.io/tx/".to_string()
}

fn default_max_send_attempts() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    500
}

fn default_attempt_probability() -> f64 {
    0.5
}

fn default_safety_buffer_raw() -> u64 {
    MICRO_UNITS_PER_OCT
}

fn default_propagation_delay_secs() -> u64 {
    10
}

fn default_interval_secs() -> u64 {
    24 * 60 * 60
}

fn default_tx_delay_ms() -> u64 {
    2000
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from file and environment variables
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let settings = config::Config::builder()
            // Load from file if exists
            .add_source(config::File::from(path).required(false))
            // Override with environment variables (prefix AUTOSEND_)
            .add_source(
                config::Environment::with_prefix("AUTOSEND")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?;

        let config: Config = settings
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if !self.transfer.amount_oct.is_finite() || self.transfer.amount_oct <= 0.0 {
            anyhow::bail!("amount_oct must be a positive number");
        }

        if self.transfer.amount_raw() == 0 {
            anyhow::bail!(
                "amount_oct {} is below one micro-unit",
                self.transfer.amount_oct
            );
        }

        if self.transfer.max_send_attempts == 0 {
            anyhow::bail!("max_send_attempts must be at least 1");
        }

        if self.transfer.explorer_url.trim().is_empty() {
            anyhow::bail!("explorer_url cannot be empty");
        }

        let p = self.private.attempt_probability;
        if !(0.0..=1.0).contains(&p) {
            anyhow::bail!("attempt_probability must be between 0 and 1, got {}", p);
        }

        if self.schedule.interval_secs == 0 {
            tracing::warn!("schedule.interval_secs is 0 - batches will run back to back");
        }

        Ok(())
    }

    /// Get configuration for display
    pub fn masked_display(&self) -> String {
        format!(
            r#"Configuration:
  Files:
    wallet: {}
    targets: {}
  RPC:
    timeout: {}ms
  Transfer:
    amount: {} OCT ({} raw)
    explorer: {}
    max_send_attempts: {}
  Private:
    enabled: {}
    attempt_probability: {}
  Encryption:
    safety_buffer: {} raw
    propagation_delay: {}s
  Schedule:
    interval: {}s
    tx_delay: {}ms
"#,
            self.files.wallet_path,
            self.files.targets_path,
            self.rpc.timeout_ms,
            self.transfer.amount_oct,
            self.transfer.amount_raw(),
            self.transfer.explorer_url,
            self.transfer.max_send_attempts,
            self.private.enabled,
            self.private.attempt_probability,
            self.encryption.safety_buffer_raw,
            self.encryption.propagation_delay_secs,
            self.schedule.interval_secs,
            self.schedule.tx_delay_ms,
        )
    }
}
