use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::chain::evm::EvmAdapter;
use crate::chain::{normalize_address, AdapterError, Chain, ChainAdapter};
use crate::config::Config;
use crate::core::approvals::{build_allowance_matrix, extract_spenders, MatrixOptions, MatrixOutcome};
use crate::core::history::collect_history;
use crate::core::{ExposureReport, RiskSignals, ScanSummary, TransactionRecord};
use crate::signals;

/// Minimal-call threshold: an input string of at most this many characters
/// ("0x" plus up to a bare selector) carries no real payload.
const MIN_PAYLOAD_INPUT_LEN: usize = 10;

/// Hard request failure. Everything else degrades to a partial report.
#[derive(Debug)]
pub enum ScanError {
    UnsupportedChain(String),
    InvalidAddress(String),
}

impl std::fmt::Display for ScanError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScanError::UnsupportedChain(name) => write!(f, "unsupported chain: {name}"),
            ScanError::InvalidAddress(addr) => write!(f, "invalid wallet address: {addr}"),
        }
    }
}

impl std::error::Error for ScanError {}

/// The exposure and risk aggregation engine.
///
/// Owns one adapter and one normalized blacklist per supported chain, both
/// built from injected config at startup. Read-only after construction, so
/// concurrent scans share it without locking; all per-scan state is local to
/// the request.
pub struct Scanner {
    adapters: HashMap<Chain, Arc<dyn ChainAdapter>>,
    blacklists: HashMap<Chain, HashSet<String>>,
    tx_limit: usize,
    matrix_opts: MatrixOptions,
}

impl Scanner {
    pub fn new(config: &Config) -> Result<Self, AdapterError> {
        let call_timeout = Duration::from_secs(config.scan.call_timeout_secs);
        let mut adapters: HashMap<Chain, Arc<dyn ChainAdapter>> = HashMap::new();
        let mut blacklists = HashMap::new();

        for (chain, chain_config) in [
            (Chain::Eth, &config.chains.eth),
            (Chain::Bsc, &config.chains.bsc),
        ] {
            adapters.insert(chain, Arc::new(EvmAdapter::new(chain_config, call_timeout)?) as _);
            blacklists.insert(
                chain,
                chain_config
                    .blacklist
                    .iter()
                    .map(|addr| normalize_address(addr))
                    .collect(),
            );
        }

        Ok(Self {
            adapters,
            blacklists,
            tx_limit: config.scan.tx_limit,
            matrix_opts: MatrixOptions {
                concurrency: config.scan.allowance_concurrency,
                call_timeout,
                deadline: Duration::from_secs(config.scan.scan_deadline_secs),
            },
        })
    }

    /// History plus risk score. Does not touch allowances.
    pub async fn deep_scan(&self, wallet: &str, chain: &str) -> Result<ExposureReport, ScanError> {
        self.scan(wallet, chain, false).await
    }

    /// Full flow: history, risk score, and the live allowance matrix.
    pub async fn revoke_check(&self, wallet: &str, chain: &str) -> Result<ExposureReport, ScanError> {
        self.scan(wallet, chain, true).await
    }

    async fn scan(
        &self,
        wallet: &str,
        chain_name: &str,
        check_approvals: bool,
    ) -> Result<ExposureReport, ScanError> {
        let chain = Chain::parse(chain_name)
            .ok_or_else(|| ScanError::UnsupportedChain(chain_name.to_string()))?;
        let adapter = self
            .adapters
            .get(&chain)
            .ok_or_else(|| ScanError::UnsupportedChain(chain_name.to_string()))?;

        // First gate: reject malformed input before any network call.
        if !adapter.validate_address(wallet) {
            return Err(ScanError::InvalidAddress(wallet.to_string()));
        }
        let owner = normalize_address(wallet);

        let history = collect_history(adapter.as_ref(), &owner, self.tx_limit).await;

        let outcome = if check_approvals {
            let spenders = extract_spenders(&history.transactions);
            build_allowance_matrix(
                Arc::clone(adapter),
                &owner,
                &history.token_pairs,
                &spenders,
                &self.matrix_opts,
            )
            .await
        } else {
            MatrixOutcome::default()
        };

        let blacklist = self.blacklists.get(&chain);
        let mut risk_signals = derive_signals(&history.transactions, blacklist);
        risk_signals.outstanding_approval_count = outcome.approvals.len();

        let assessment = signals::assess(&risk_signals);
        let ai_summary = signals::summary_sentence(assessment.score, &risk_signals);

        info!(
            wallet = %owner,
            chain = %chain,
            score = assessment.score,
            approvals = outcome.approvals.len(),
            skipped = outcome.skipped_pairs,
            "scan complete"
        );

        Ok(ExposureReport {
            wallet: wallet.to_string(),
            chain: chain.as_str().to_string(),
            timestamp: Utc::now(),
            score: assessment.score,
            labels: assessment.labels,
            alerts: assessment.alerts,
            summary: ScanSummary {
                transactions: history.transactions.len(),
                failed: risk_signals.failed_tx_count,
                blacklisted_hits: risk_signals.blacklist_hit_count,
                unverified_interactions: risk_signals.unverified_interaction_count,
            },
            ai_summary,
            approvals: outcome.approvals,
            skipped_allowance_checks: outcome.skipped_pairs,
        })
    }

    #[cfg(test)]
    pub(crate) fn with_adapter(
        chain: Chain,
        adapter: Arc<dyn ChainAdapter>,
        blacklist: HashSet<String>,
    ) -> Self {
        Self {
            adapters: HashMap::from([(chain, adapter)]),
            blacklists: HashMap::from([(chain, blacklist)]),
            tx_limit: 50,
            matrix_opts: MatrixOptions::default(),
        }
    }
}

/// Count the scorer's input signals over the transaction set.
///
/// "Unverified interaction" deliberately preserves the legacy heuristic: a
/// transaction with no `contractAddress` (i.e. not a contract creation) whose
/// input carries more than a bare selector. That conflates "non-creation tx
/// with payload" with "unverified contract"; kept for score compatibility.
fn derive_signals(
    transactions: &[TransactionRecord],
    blacklist: Option<&HashSet<String>>,
) -> RiskSignals {
    let mut derived = RiskSignals::default();
    for tx in transactions {
        if tx.failed() {
            derived.failed_tx_count += 1;
        }
        if let Some(blacklist) = blacklist {
            if !tx.to.is_empty() && blacklist.contains(&normalize_address(&tx.to)) {
                derived.blacklist_hit_count += 1;
            }
        }
        if tx.contract_address.is_empty() && tx.input.len() > MIN_PAYLOAD_INPUT_LEN {
            derived.unverified_interaction_count += 1;
        }
    }
    derived
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::testing::StubAdapter;
    use crate::core::TokenTransferRecord;

    const WALLET: &str = "0x9999000000000000000000000000000000000009";
    const TOKEN: &str = "0xaaaa000000000000000000000000000000000001";
    const SPENDER: &str = "0x1111000000000000000000000000000000000001";
    const BAD_GUY: &str = "0xbad0000000000000000000000000000000000bad";

    fn tx(to: &str, input: &str, is_error: &str) -> TransactionRecord {
        TransactionRecord {
            hash: "0xhash".into(),
            from: WALLET.into(),
            to: to.into(),
            input: input.into(),
            is_error: is_error.into(),
            contract_address: String::new(),
            time_stamp: "1700000000".into(),
        }
    }

    fn approve_input(spender: &str) -> String {
        format!("0x095ea7b3{:0>64}{:0>64}", &spender[2..], "f")
    }

    fn scanner(adapter: StubAdapter) -> Scanner {
        Scanner::with_adapter(
            Chain::Eth,
            Arc::new(adapter),
            HashSet::from([BAD_GUY.to_string()]),
        )
    }

    #[test]
    fn builds_timed_adapters_from_injected_config() {
        // Construction wires one adapter per chain with a timed HTTP client;
        // a client build failure would surface here instead of degrading to
        // an untimed client.
        let config = crate::config::Config::default();
        assert!(Scanner::new(&config).is_ok());
    }

    #[tokio::test]
    async fn rejects_unsupported_chain_and_bad_address() {
        let s = scanner(StubAdapter::default());
        assert!(matches!(
            s.deep_scan(WALLET, "DOGE").await,
            Err(ScanError::UnsupportedChain(_))
        ));
        assert!(matches!(
            s.deep_scan("0xnot-an-address", "ETH").await,
            Err(ScanError::InvalidAddress(_))
        ));
        // BSC parses but this scanner has no adapter for it
        assert!(matches!(
            s.deep_scan(WALLET, "bsc").await,
            Err(ScanError::UnsupportedChain(_))
        ));
    }

    #[tokio::test]
    async fn deep_scan_scores_history_without_allowance_queries() {
        let adapter = StubAdapter::default().with_transactions(vec![
            tx(SPENDER, "0x", "1"),                 // failed plain transfer
            tx(BAD_GUY, "0xdeadbeef0102", "0"),     // blacklisted, payload
            tx(SPENDER, "0x01", "0"),               // short input, not "unverified"
        ]);
        let report = scanner(adapter).deep_scan(WALLET, "eth").await.unwrap();

        assert_eq!(report.chain, "ETH");
        assert_eq!(report.summary.transactions, 3);
        assert_eq!(report.summary.failed, 1);
        assert_eq!(report.summary.blacklisted_hits, 1);
        assert_eq!(report.summary.unverified_interactions, 1);
        // 3.0 + 1.5 (failed) + 3.0 (blacklist) = 7.5
        assert_eq!(report.score, 7.5);
        assert!(report
            .labels
            .contains(&"Interacted With Malicious Contract".to_string()));
        assert!(report.labels.contains(&"Moderate Risk".to_string()));
        assert!(report.approvals.is_empty());
        assert!(report.ai_summary.contains("elevated risk"));
    }

    #[tokio::test]
    async fn revoke_check_builds_the_allowance_worklist() {
        let adapter = StubAdapter::default()
            .with_transactions(vec![tx(SPENDER, &approve_input(SPENDER), "0")])
            .with_transfers(vec![TokenTransferRecord {
                contract_address: TOKEN.into(),
                token_symbol: "AAA".into(),
            }])
            .with_allowance(TOKEN, SPENDER, 250);

        let report = scanner(adapter).revoke_check(WALLET, "ETH").await.unwrap();

        assert_eq!(report.approvals.len(), 1);
        assert_eq!(report.approvals[0].token, "AAA");
        assert_eq!(report.approvals[0].spender, SPENDER);
        assert_eq!(report.approvals[0].amount, "250");
        assert_eq!(report.approvals[0].token_address, TOKEN);
        assert_eq!(report.skipped_allowance_checks, 0);
    }

    #[tokio::test]
    async fn transfer_fetch_failure_still_yields_a_report() {
        let adapter = StubAdapter::default()
            .with_transactions(vec![tx(SPENDER, "0x", "1")])
            .failing_transfers();

        let report = scanner(adapter).revoke_check(WALLET, "ETH").await.unwrap();

        // signals computed from the surviving dimension, approvals empty
        assert_eq!(report.summary.failed, 1);
        assert_eq!(report.score, 4.5);
        assert!(report.labels.contains(&"Low Risk".to_string()));
        assert!(report.approvals.is_empty());
    }

    #[test]
    fn blacklist_matching_is_case_insensitive() {
        let blacklist = HashSet::from([BAD_GUY.to_string()]);
        let txs = vec![tx(&BAD_GUY.to_ascii_uppercase().replacen("0X", "0x", 1), "0x", "0")];
        let derived = derive_signals(&txs, Some(&blacklist));
        assert_eq!(derived.blacklist_hit_count, 1);
    }

    #[test]
    fn unverified_heuristic_ignores_contract_creations() {
        let mut creation = tx("", "0x6080604052deadbeef", "0");
        creation.contract_address = TOKEN.into();
        let derived = derive_signals(&[creation], None);
        assert_eq!(derived.unverified_interaction_count, 0);
    }
}
