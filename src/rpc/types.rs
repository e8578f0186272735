//! Wire types for the node RPC
//!
//! The node is inconsistent about numbers: nonces, raw balances and ids show
//! up both as JSON numbers and as numeric strings. The lenient deserializers
//! below accept either.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// `GET /balance/{address}`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccountInfo {
    #[serde(default, deserialize_with = "de_u64")]
    pub nonce: u64,
    /// Public balance in OCT
    #[serde(default, deserialize_with = "de_f64")]
    pub balance: f64,
    #[serde(default)]
    pub has_public_key: bool,
}

/// `GET /public_key/{address}`
#[derive(Debug, Clone, Deserialize)]
pub struct PublicKeyResponse {
    #[serde(default)]
    pub public_key: Option<String>,
}

/// Snapshot of the sender's balances in micro-units
///
/// `GET /view_encrypted_balance/{address}`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct EncryptedBalanceState {
    #[serde(rename = "encrypted_balance_raw", default, deserialize_with = "de_u64")]
    pub encrypted_raw: u64,
    #[serde(rename = "public_balance_raw", default, deserialize_with = "de_u64")]
    pub public_raw: u64,
}

/// Incoming private transfer waiting to be claimed
#[derive(Debug, Clone, Deserialize)]
pub struct PendingPrivateTransfer {
    #[serde(deserialize_with = "de_string")]
    pub id: String,
    /// Sender-assigned fields, passed through untouched
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

/// `GET /pending_private_transfers`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PendingTransfersResponse {
    #[serde(default)]
    pub pending_transfers: Vec<PendingPrivateTransfer>,
}

/// `POST /claim_private_transfer`
#[derive(Debug, Clone, Serialize)]
pub struct ClaimRequest {
    pub recipient_address: String,
    pub private_key: String,
    pub transfer_id: String,
}

/// `POST /encrypt_balance`
#[derive(Debug, Clone, Serialize)]
pub struct EncryptBalanceRequest {
    pub address: String,
    /// Micro-units, decimal string
    pub amount: String,
    pub private_key: String,
}

/// `POST /private_transfer`
#[derive(Debug, Clone, Serialize)]
pub struct PrivateTransferRequest {
    pub from: String,
    pub to: String,
    /// Micro-units, decimal string
    pub amount: String,
    pub from_private_key: String,
    pub to_public_key: String,
}

/// Acknowledgement body shared by the POST endpoints
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AckResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub tx_hash: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

fn de_u64<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .ok_or_else(|| de::Error::custom(format!("expected unsigned integer, got {}", n))),
        Value::String(s) => s.trim().parse().map_err(de::Error::custom),
        Value::Null => Ok(0),
        other => Err(de::Error::custom(format!(
            "expected unsigned integer, got {}",
            other
        ))),
    }
}

fn de_f64<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| de::Error::custom(format!("expected number, got {}", n))),
        Value::String(s) => s.trim().parse().map_err(de::Error::custom),
        Value::Null => Ok(0.0),
        other => Err(de::Error::custom(format!("expected number, got {}", other))),
    }
}

fn de_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(de::Error::custom(format!("expected id, got {}", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_info_lenient_numbers() {
        let info: AccountInfo =
            serde_json::from_str(r#"{"nonce": "12", "balance": "3.5", "has_public_key": true}"#)
                .unwrap();
        assert_eq!(info.nonce, 12);
        assert_eq!(info.balance, 3.5);
        assert!(info.has_public_key);

        let info: AccountInfo = serde_json::from_str(r#"{"nonce": 4, "balance": 1}"#).unwrap();
        assert_eq!(info.nonce, 4);
        assert!(!info.has_public_key);
    }

    #[test]
    fn test_encrypted_balance_state() {
        let state: EncryptedBalanceState = serde_json::from_str(
            r#"{"encrypted_balance_raw": "250000", "public_balance_raw": 9000000, "extra": 1}"#,
        )
        .unwrap();
        assert_eq!(
            state,
            EncryptedBalanceState {
                encrypted_raw: 250_000,
                public_raw: 9_000_000
            }
        );
    }

    #[test]
    fn test_pending_transfers_keep_payload() {
        let response: PendingTransfersResponse = serde_json::from_str(
            r#"{"pending_transfers": [
                {"id": 17, "sender": "octX", "encrypted_data": "abc"},
                {"id": "18", "sender": "octY"}
            ]}"#,
        )
        .unwrap();

        assert_eq!(response.pending_transfers.len(), 2);
        assert_eq!(response.pending_transfers[0].id, "17");
        assert_eq!(response.pending_transfers[0].payload["sender"], "octX");
        assert_eq!(response.pending_transfers[1].id, "18");
    }

    #[test]
    fn test_pending_transfers_missing_list() {
        let response: PendingTransfersResponse = serde_json::from_str("{}").unwrap();
        assert!(response.pending_transfers.is_empty());
    }
}
