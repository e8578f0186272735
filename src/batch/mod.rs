//! Batch execution
//!
//! ```text
//! Scheduler ─► BatchRunner ─► claim ─► AutoEncryptor ─► per recipient:
//!                                                        PrivateTransferGate
//!                                                          └─ fallback ─► TransactionBuilder + send
//! ```

pub mod runner;
pub mod scheduler;

pub use runner::{BatchRunner, BatchSummary, ClaimStats};
pub use scheduler::Scheduler;
