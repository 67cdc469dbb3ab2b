//! Wallet exposure scanner: collects a wallet's on-chain history, derives
//! risk signals, and computes the live matrix of outstanding ERC-20
//! approvals worth revoking.
//!
//! Scans are best-effort by design: a flaky upstream degrades a dimension
//! to empty or partial data, and only malformed input fails a request.

pub mod chain;
pub mod config;
pub mod core;
pub mod db;
pub mod signals;

pub use crate::chain::{Chain, ChainAdapter};
pub use crate::config::Config;
pub use crate::core::scanner::{ScanError, Scanner};
pub use crate::core::ExposureReport;
