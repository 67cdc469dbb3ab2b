pub mod approvals;
pub mod history;
pub mod scanner;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One historical transaction as reported by the explorer.
/// Immutable once fetched; lives only for the duration of one scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub hash: String,
    pub from: String,
    pub to: String,
    /// Raw call data as a 0x-prefixed hex string ("0x" for plain transfers).
    pub input: String,
    /// "1" when the transaction reverted, "0" otherwise (explorer convention).
    #[serde(rename = "isError", default)]
    pub is_error: String,
    /// Populated only for contract-creation transactions.
    #[serde(rename = "contractAddress", default)]
    pub contract_address: String,
    #[serde(rename = "timeStamp", default)]
    pub time_stamp: String,
}

impl TransactionRecord {
    pub fn failed(&self) -> bool {
        self.is_error == "1"
    }
}

/// One ERC-20 transfer event, reduced to the fields the engine needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenTransferRecord {
    #[serde(rename = "contractAddress")]
    pub contract_address: String,
    #[serde(rename = "tokenSymbol", default)]
    pub token_symbol: String,
}

/// An outstanding approval: `spender` may move up to `amount` of `token`.
/// Only strictly-positive amounts ever reach a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowanceEntry {
    /// Token symbol as first seen in the transfer history.
    pub token: String,
    pub spender: String,
    /// Decimal string; uint256 amounts exceed native integer width.
    pub amount: String,
    #[serde(rename = "tokenAddress")]
    pub token_address: String,
}

/// Signals derived from one wallet's history. Never mutated after derivation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RiskSignals {
    pub failed_tx_count: usize,
    pub blacklist_hit_count: usize,
    pub unverified_interaction_count: usize,
    pub outstanding_approval_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    High,
    Medium,
    Low,
}

/// A human-readable finding attached to a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    #[serde(rename = "type")]
    pub alert_type: String,
    pub severity: Severity,
    pub description: String,
}

/// Per-scan counters surfaced to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScanSummary {
    pub transactions: usize,
    pub failed: usize,
    pub blacklisted_hits: usize,
    pub unverified_interactions: usize,
}

/// The final, immutable result of one scan. No shared state across requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExposureReport {
    pub wallet: String,
    pub chain: String,
    pub timestamp: DateTime<Utc>,
    pub score: f64,
    pub labels: Vec<String>,
    pub alerts: Vec<Alert>,
    pub summary: ScanSummary,
    pub ai_summary: String,
    /// Populated by the revoke-check flow; empty for a plain deep scan.
    pub approvals: Vec<AllowanceEntry>,
    /// Allowance pairs that could not be checked (failed or timed out).
    /// Absence of evidence for a pair is not evidence of zero allowance.
    pub skipped_allowance_checks: usize,
}
