//! OCT Autosend Library
//!
//! Recurring transfers from one wallet to a target list, preferring private
//! transfers when the encrypted balance allows and falling back to signed
//! public transactions.

pub mod batch;
pub mod cli;
pub mod config;
pub mod error;
pub mod rpc;
pub mod trading;
pub mod wallet;

// Re-export commonly used types
pub use config::Config;
pub use error::{Error, Result};
