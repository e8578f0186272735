//! In-memory [`ChainRpc`] for tests
//!
//! Records every call so tests can assert on what reached the node.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use super::client::ChainRpc;
use super::types::{
    AccountInfo, ClaimRequest, EncryptBalanceRequest, EncryptedBalanceState,
    PendingPrivateTransfer, PrivateTransferRequest,
};
use crate::error::{Error, Result};
use crate::trading::transaction::Transaction;
use crate::wallet::Wallet;

#[derive(Default)]
struct State {
    nonce: u64,
    balances: EncryptedBalanceState,
    public_keys: HashMap<String, String>,
    pending: Vec<PendingPrivateTransfer>,
    failing_claims: HashSet<String>,
    rejected_recipients: HashSet<String>,
    transient_send_failures: u32,

    fail_account_reads: bool,
    fail_balance_reads: bool,
    fail_pending_list: bool,
    fail_encrypt: bool,
    fail_private_transfers: bool,

    public_key_lookups: usize,
    claim_attempts: Vec<String>,
    claimed: Vec<String>,
    encrypt_requests: Vec<EncryptBalanceRequest>,
    private_transfers: Vec<PrivateTransferRequest>,
    send_attempts: Vec<Transaction>,
    sent: Vec<Transaction>,
}

pub struct MockRpc {
    address: String,
    state: Mutex<State>,
}

impl MockRpc {
    pub fn new(address: &str) -> Self {
        Self {
            address: address.to_string(),
            state: Mutex::new(State::default()),
        }
    }

    /// Wallet matching this mock's sender address
    pub fn wallet(address: &str) -> Wallet {
        Wallet::new(&[11u8; 32], address, "http://127.0.0.1:1").unwrap()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    pub fn with_nonce(self, nonce: u64) -> Self {
        self.state().nonce = nonce;
        self
    }

    pub fn with_balances(self, encrypted_raw: u64, public_raw: u64) -> Self {
        self.state().balances = EncryptedBalanceState {
            encrypted_raw,
            public_raw,
        };
        self
    }

    pub fn with_public_key(self, address: &str, key_b64: &str) -> Self {
        self.state()
            .public_keys
            .insert(address.to_string(), key_b64.to_string());
        self
    }

    pub fn with_pending(self, ids: &[&str]) -> Self {
        self.state().pending = ids
            .iter()
            .map(|id| PendingPrivateTransfer {
                id: id.to_string(),
                payload: Default::default(),
            })
            .collect();
        self
    }

    pub fn with_failing_claim(self, id: &str) -> Self {
        self.state().failing_claims.insert(id.to_string());
        self
    }

    pub fn with_rejected_recipient(self, address: &str) -> Self {
        self.state().rejected_recipients.insert(address.to_string());
        self
    }

    /// Fail the next `count` sends with a connection error
    pub fn with_transient_send_failures(self, count: u32) -> Self {
        self.state().transient_send_failures = count;
        self
    }

    pub fn fail_account_reads(&self, fail: bool) {
        self.state().fail_account_reads = fail;
    }

    pub fn fail_balance_reads(&self, fail: bool) {
        self.state().fail_balance_reads = fail;
    }

    pub fn fail_pending_list(&self, fail: bool) {
        self.state().fail_pending_list = fail;
    }

    pub fn fail_encrypt(&self, fail: bool) {
        self.state().fail_encrypt = fail;
    }

    pub fn fail_private_transfers(&self, fail: bool) {
        self.state().fail_private_transfers = fail;
    }

    pub fn public_key_lookups(&self) -> usize {
        self.state().public_key_lookups
    }

    pub fn claim_attempts(&self) -> Vec<String> {
        self.state().claim_attempts.clone()
    }

    pub fn claimed(&self) -> Vec<String> {
        self.state().claimed.clone()
    }

    pub fn encrypt_requests(&self) -> Vec<EncryptBalanceRequest> {
        self.state().encrypt_requests.clone()
    }

    pub fn private_transfers(&self) -> Vec<PrivateTransferRequest> {
        self.state().private_transfers.clone()
    }

    pub fn send_attempts(&self) -> Vec<Transaction> {
        self.state().send_attempts.clone()
    }

    pub fn sent(&self) -> Vec<Transaction> {
        self.state().sent.clone()
    }

    pub fn sent_nonces(&self) -> Vec<u64> {
        self.state().sent.iter().map(|tx| tx.nonce).collect()
    }
}

#[async_trait]
impl ChainRpc for MockRpc {
    async fn account(&self, address: &str) -> Result<AccountInfo> {
        let state = self.state();
        if state.fail_account_reads {
            return Err(Error::RpcConnection("connection refused".to_string()));
        }

        if address == self.address {
            Ok(AccountInfo {
                nonce: state.nonce,
                balance: state.balances.public_raw as f64 / 1_000_000.0,
                has_public_key: true,
            })
        } else {
            Ok(AccountInfo {
                nonce: 0,
                balance: 0.0,
                has_public_key: state.public_keys.contains_key(address),
            })
        }
    }

    async fn public_key(&self, address: &str) -> Result<Option<String>> {
        let mut state = self.state();
        state.public_key_lookups += 1;
        Ok(state.public_keys.get(address).cloned())
    }

    async fn pending_private_transfers(
        &self,
        _address: &str,
        _private_key: &str,
    ) -> Result<Vec<PendingPrivateTransfer>> {
        let state = self.state();
        if state.fail_pending_list {
            return Err(Error::RpcConnection("connection reset".to_string()));
        }
        Ok(state.pending.clone())
    }

    async fn claim_private_transfer(&self, request: &ClaimRequest) -> Result<()> {
        let mut state = self.state();
        state.claim_attempts.push(request.transfer_id.clone());
        if state.failing_claims.contains(&request.transfer_id) {
            return Err(Error::RpcRejected {
                status: 400,
                body: "already claimed".to_string(),
            });
        }
        state.claimed.push(request.transfer_id.clone());
        Ok(())
    }

    async fn encrypted_balance(
        &self,
        _address: &str,
        _private_key: &str,
    ) -> Result<EncryptedBalanceState> {
        let state = self.state();
        if state.fail_balance_reads {
            return Err(Error::RpcTimeout("view_encrypted_balance".to_string()));
        }
        Ok(state.balances)
    }

    async fn encrypt_balance(&self, request: &EncryptBalanceRequest) -> Result<()> {
        let mut state = self.state();
        if state.fail_encrypt {
            return Err(Error::TransactionRejected("encryption failed".to_string()));
        }
        state.encrypt_requests.push(request.clone());
        Ok(())
    }

    async fn private_transfer(&self, request: &PrivateTransferRequest) -> Result<Option<String>> {
        let mut state = self.state();
        state.private_transfers.push(request.clone());
        if state.fail_private_transfers {
            return Err(Error::RpcRejected {
                status: 500,
                body: "proof generation failed".to_string(),
            });
        }
        Ok(Some(format!("private-{}", state.private_transfers.len())))
    }

    async fn send_transaction(&self, transaction: &Transaction) -> Result<String> {
        let mut state = self.state();
        state.send_attempts.push(transaction.clone());

        if state.transient_send_failures > 0 {
            state.transient_send_failures -= 1;
            return Err(Error::RpcConnection("connection reset".to_string()));
        }
        if state.rejected_recipients.contains(&transaction.to) {
            return Err(Error::TransactionRejected("recipient blocked".to_string()));
        }

        state.sent.push(transaction.clone());
        Ok(format!("hash-{}", transaction.nonce))
    }
}
