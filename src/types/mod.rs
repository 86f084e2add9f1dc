//! Shared types for plotledger

pub mod error;

pub use error::{LedgerError, Result};
