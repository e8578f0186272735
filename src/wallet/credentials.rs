//! Wallet store loading
//!
//! The wallet file is a JSON object `{ "priv", "addr", "rpc" }` where `priv`
//! is the base64 encoded 32-byte seed.

use std::path::Path;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::Deserialize;
use tracing::info;
use url::Url;

use super::signer::{Signer, SEED_LEN};
use crate::error::{Error, Result};

/// On-disk wallet record
#[derive(Deserialize)]
struct WalletFile {
    #[serde(rename = "priv")]
    private_key: String,
    #[serde(rename = "addr")]
    address: String,
    rpc: String,
}

/// Wallet identity, immutable for the lifetime of the process
pub struct Wallet {
    seed: [u8; SEED_LEN],
    address: String,
    rpc_url: Url,
    signer: Signer,
}

impl Wallet {
    /// Load the wallet from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Wallet(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let wallet = Self::from_json(&content)?;
        info!("Loaded wallet {}", wallet.address);
        Ok(wallet)
    }

    /// Parse a wallet from its JSON representation
    pub fn from_json(content: &str) -> Result<Self> {
        let file: WalletFile = serde_json::from_str(content)
            .map_err(|e| Error::Wallet(format!("Failed to parse wallet JSON: {}", e)))?;

        let seed_bytes = BASE64
            .decode(file.private_key.trim())
            .map_err(|e| Error::InvalidKeyMaterial(format!("priv is not base64: {}", e)))?;

        Self::new(&seed_bytes, &file.address, &file.rpc)
    }

    /// Build a wallet from raw parts
    pub fn new(seed: &[u8], address: &str, rpc: &str) -> Result<Self> {
        let signer = Signer::from_seed(seed)?;
        let seed: [u8; SEED_LEN] = seed
            .try_into()
            .map_err(|_| Error::InvalidKeyMaterial("seed length".to_string()))?;

        let address = address.trim();
        if address.is_empty() {
            return Err(Error::Wallet("addr is empty".to_string()));
        }

        let rpc_url = Url::parse(rpc.trim())
            .map_err(|e| Error::Wallet(format!("Invalid rpc URL {}: {}", rpc, e)))?;

        Ok(Self {
            seed,
            address: address.to_string(),
            rpc_url,
            signer,
        })
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn rpc_url(&self) -> &Url {
        &self.rpc_url
    }

    pub fn signer(&self) -> &Signer {
        &self.signer
    }

    /// Seed re-encoded as base64 for endpoints that take the private key
    pub fn private_key_b64(&self) -> String {
        BASE64.encode(self.seed)
    }
}

impl std::fmt::Debug for Wallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wallet")
            .field("address", &self.address)
            .field("rpc_url", &self.rpc_url.as_str())
            .field("seed", &"***")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn wallet_json(seed: &[u8]) -> String {
        format!(
            r#"{{"priv": "{}", "addr": "octSender", "rpc": "http://127.0.0.1:8080"}}"#,
            BASE64.encode(seed)
        )
    }

    #[test]
    fn test_load_wallet() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("wallet.json");
        std::fs::write(&path, wallet_json(&[3u8; 32])).unwrap();

        let wallet = Wallet::load(&path).unwrap();
        assert_eq!(wallet.address(), "octSender");
        assert_eq!(wallet.rpc_url().as_str(), "http://127.0.0.1:8080/");
        assert_eq!(wallet.private_key_b64(), BASE64.encode([3u8; 32]));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempdir().unwrap();
        let err = Wallet::load(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, Error::Wallet(_)));
    }

    #[test]
    fn test_short_seed_rejected() {
        let err = Wallet::from_json(&wallet_json(&[3u8; 16])).unwrap_err();
        assert!(matches!(err, Error::InvalidKeyMaterial(_)));
    }

    #[test]
    fn test_malformed_json_and_url() {
        assert!(matches!(
            Wallet::from_json(r#"{"addr": "x"}"#),
            Err(Error::Wallet(_))
        ));

        let json = format!(
            r#"{{"priv": "{}", "addr": "octSender", "rpc": "not a url"}}"#,
            BASE64.encode([1u8; 32])
        );
        assert!(matches!(Wallet::from_json(&json), Err(Error::Wallet(_))));
    }

    #[test]
    fn test_debug_masks_seed() {
        let wallet = Wallet::from_json(&wallet_json(&[3u8; 32])).unwrap();
        let debug = format!("{:?}", wallet);
        assert!(debug.contains("***"));
        assert!(!debug.contains(&BASE64.encode([3u8; 32])));
    }
}
