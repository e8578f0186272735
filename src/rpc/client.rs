//! HTTP client for the node RPC
//!
//! Every call is a single request; retry policy lives with the caller.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;
use url::Url;

use super::types::{
    AccountInfo, AckResponse, ClaimRequest, EncryptBalanceRequest, EncryptedBalanceState,
    PendingPrivateTransfer, PendingTransfersResponse, PrivateTransferRequest, PublicKeyResponse,
};
use crate::error::{Error, Result};
use crate::trading::transaction::Transaction;

/// Header carrying the sender's private key on private endpoints
pub const PRIVATE_KEY_HEADER: &str = "X-Private-Key";

/// Remote RPC surface consumed by the batch logic
#[async_trait]
pub trait ChainRpc: Send + Sync {
    /// Nonce, public balance and public-key registration of an account
    async fn account(&self, address: &str) -> Result<AccountInfo>;

    /// Published base64 public key, if any
    async fn public_key(&self, address: &str) -> Result<Option<String>>;

    /// Incoming private transfers waiting to be claimed
    async fn pending_private_transfers(
        &self,
        address: &str,
        private_key: &str,
    ) -> Result<Vec<PendingPrivateTransfer>>;

    async fn claim_private_transfer(&self, request: &ClaimRequest) -> Result<()>;

    async fn encrypted_balance(
        &self,
        address: &str,
        private_key: &str,
    ) -> Result<EncryptedBalanceState>;

    async fn encrypt_balance(&self, request: &EncryptBalanceRequest) -> Result<()>;

    /// Shielded transfer; returns the transaction hash when the node reports one
    async fn private_transfer(&self, request: &PrivateTransferRequest) -> Result<Option<String>>;

    /// Submit a signed public transaction; returns its hash
    async fn send_transaction(&self, transaction: &Transaction) -> Result<String>;
}

/// reqwest-backed [`ChainRpc`]
pub struct HttpRpcClient {
    client: Client,
    base_url: Url,
}

impl HttpRpcClient {
    /// Create a client for the node at `base_url`
    pub fn new(base_url: &Url, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        // Url::join drops the last segment unless the base ends with '/'
        let mut base_url = base_url.clone();
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self { client, base_url })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| Error::Config(format!("Invalid endpoint {}: {}", path, e)))
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        private_key: Option<&str>,
    ) -> Result<T> {
        let url = self.endpoint(path)?;
        debug!("GET {}", url);

        let mut request = self.client.get(url).query(query);
        if let Some(key) = private_key {
            request = request.header(PRIVATE_KEY_HEADER, key);
        }

        let response = check_status(request.send().await?).await?;
        let body = response.text().await?;
        serde_json::from_str(&body)
            .map_err(|e| Error::Deserialization(format!("{}: {}", path, e)))
    }

    async fn post_json<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<String> {
        let url = self.endpoint(path)?;
        debug!("POST {}", url);

        let response = self.client.post(url).json(body).send().await?;
        let response = check_status(response).await?;
        Ok(response.text().await?)
    }
}

#[async_trait]
impl ChainRpc for HttpRpcClient {
    async fn account(&self, address: &str) -> Result<AccountInfo> {
        self.get_json(&format!("balance/{}", address), &[], None).await
    }

    async fn public_key(&self, address: &str) -> Result<Option<String>> {
        let response: PublicKeyResponse = self
            .get_json(&format!("public_key/{}", address), &[], None)
            .await?;
        Ok(response.public_key.filter(|key| !key.is_empty()))
    }

    async fn pending_private_transfers(
        &self,
        address: &str,
        private_key: &str,
    ) -> Result<Vec<PendingPrivateTransfer>> {
        let response: PendingTransfersResponse = self
            .get_json(
                "pending_private_transfers",
                &[("address", address)],
                Some(private_key),
            )
            .await?;
        Ok(response.pending_transfers)
    }

    async fn claim_private_transfer(&self, request: &ClaimRequest) -> Result<()> {
        let body = self.post_json("claim_private_transfer", request).await?;
        parse_ack(&body).map(|_| ())
    }

    async fn encrypted_balance(
        &self,
        address: &str,
        private_key: &str,
    ) -> Result<EncryptedBalanceState> {
        self.get_json(
            &format!("view_encrypted_balance/{}", address),
            &[],
            Some(private_key),
        )
        .await
    }

    async fn encrypt_balance(&self, request: &EncryptBalanceRequest) -> Result<()> {
        let body = self.post_json("encrypt_balance", request).await?;
        parse_ack(&body).map(|_| ())
    }

    async fn private_transfer(&self, request: &PrivateTransferRequest) -> Result<Option<String>> {
        let body = self.post_json("private_transfer", request).await?;
        parse_ack(&body)
    }

    async fn send_transaction(&self, transaction: &Transaction) -> Result<String> {
        let body = self.post_json("send-tx", transaction).await?;
        parse_send_response(&body)
    }
}

/// Turn non-2xx responses into [`Error::RpcRejected`]
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(Error::RpcRejected {
        status: status.as_u16(),
        body,
    })
}

/// Interpret a POST acknowledgement body
///
/// Bodies that are not JSON are taken as success since the status was 2xx.
pub fn parse_ack(body: &str) -> Result<Option<String>> {
    let Ok(ack) = serde_json::from_str::<AckResponse>(body) else {
        return Ok(None);
    };

    if let Some(error) = ack.error {
        return Err(Error::TransactionRejected(error));
    }

    let failed_status = ack
        .status
        .as_deref()
        .map(|s| matches!(s, "error" | "failed" | "rejected"))
        .unwrap_or(false);

    if ack.success == Some(false) || failed_status {
        return Err(Error::TransactionRejected(
            ack.message.unwrap_or_else(|| body.to_string()),
        ));
    }

    Ok(ack.tx_hash)
}

/// Extract the hash from a `/send-tx` reply
///
/// The node answers either `{"status": "accepted", "tx_hash": ...}` or a
/// plain `OK <hash>` line.
pub fn parse_send_response(body: &str) -> Result<String> {
    let trimmed = body.trim();

    if let Ok(ack) = serde_json::from_str::<AckResponse>(trimmed) {
        if let Some(error) = ack.error {
            return Err(Error::TransactionRejected(error));
        }
        return match (ack.status.as_deref(), ack.tx_hash) {
            (Some("accepted") | None, Some(hash)) if !hash.is_empty() => Ok(hash),
            _ => Err(Error::TransactionRejected(trimmed.to_string())),
        };
    }

    if let Some(hash) = trimmed.strip_prefix("OK") {
        let hash = hash.trim();
        if !hash.is_empty() {
            return Ok(hash.to_string());
        }
    }

    Err(Error::TransactionRejected(trimmed.to_string()))
}
