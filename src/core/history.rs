use std::collections::HashSet;
use tracing::{debug, warn};

use crate::chain::{normalize_address, ChainAdapter};
use crate::core::TransactionRecord;

/// Fallback symbol when the explorer omits one for a token contract.
const UNKNOWN_SYMBOL: &str = "UNKNOWN";

/// The bounded, deduplicated working set for one scan.
///
/// Either dimension may be empty because the wallet is quiet or because the
/// fetch for that dimension failed; the flags distinguish the two so report
/// consumers can see the extent of missing data.
#[derive(Debug, Default)]
pub struct WalletHistory {
    pub transactions: Vec<TransactionRecord>,
    /// (token contract, symbol), deduplicated by case-normalized contract
    /// address, first-seen symbol kept.
    pub token_pairs: Vec<(String, String)>,
    pub tx_fetch_failed: bool,
    pub transfer_fetch_failed: bool,
}

/// Collect a wallet's recent transactions and token transfers.
///
/// The two fetches run concurrently. A failed fetch degrades to an empty
/// dimension rather than failing the scan: a partial picture is still useful
/// for risk scoring.
pub async fn collect_history(
    adapter: &dyn ChainAdapter,
    wallet: &str,
    limit: usize,
) -> WalletHistory {
    let (tx_result, transfer_result) = tokio::join!(
        adapter.fetch_transactions(wallet, limit),
        adapter.fetch_token_transfers(wallet, limit),
    );

    let mut history = WalletHistory::default();

    match tx_result {
        Ok(txs) => {
            debug!(wallet, count = txs.len(), "transaction history fetched");
            history.transactions = txs;
        }
        Err(e) => {
            warn!(wallet, error = %e, "transaction fetch failed, continuing without");
            history.tx_fetch_failed = true;
        }
    }

    match transfer_result {
        Ok(transfers) => {
            let mut seen = HashSet::new();
            for transfer in &transfers {
                let contract = normalize_address(&transfer.contract_address);
                // first occurrence wins; a later, conflicting symbol is discarded
                if !seen.insert(contract.clone()) {
                    continue;
                }
                let symbol = if transfer.token_symbol.is_empty() {
                    UNKNOWN_SYMBOL.to_string()
                } else {
                    transfer.token_symbol.clone()
                };
                history.token_pairs.push((contract, symbol));
            }
            debug!(
                wallet,
                transfers = transfers.len(),
                tokens = history.token_pairs.len(),
                "token transfers fetched"
            );
        }
        Err(e) => {
            warn!(wallet, error = %e, "token transfer fetch failed, continuing without");
            history.transfer_fetch_failed = true;
        }
    }

    history
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::testing::StubAdapter;
    use crate::core::TokenTransferRecord;

    fn transfer(contract: &str, symbol: &str) -> TokenTransferRecord {
        TokenTransferRecord {
            contract_address: contract.into(),
            token_symbol: symbol.into(),
        }
    }

    #[tokio::test]
    async fn dedupes_tokens_keeping_first_symbol() {
        let adapter = StubAdapter::default().with_transfers(vec![
            transfer("0xAAA0000000000000000000000000000000000001", "DAI"),
            transfer("0xaaa0000000000000000000000000000000000001", "SAI"), // case variant
            transfer("0xBBB0000000000000000000000000000000000002", ""),
        ]);

        let history = collect_history(&adapter, "0xwallet", 50).await;
        assert_eq!(
            history.token_pairs,
            vec![
                ("0xaaa0000000000000000000000000000000000001".to_string(), "DAI".to_string()),
                ("0xbbb0000000000000000000000000000000000002".to_string(), "UNKNOWN".to_string()),
            ]
        );
        assert!(!history.transfer_fetch_failed);
    }

    #[tokio::test]
    async fn transfer_failure_degrades_to_empty() {
        let adapter = StubAdapter::default()
            .with_transactions(vec![])
            .failing_transfers();

        let history = collect_history(&adapter, "0xwallet", 50).await;
        assert!(history.token_pairs.is_empty());
        assert!(history.transfer_fetch_failed);
        assert!(!history.tx_fetch_failed);
    }

    #[tokio::test]
    async fn tx_failure_degrades_to_empty() {
        let adapter = StubAdapter::default().failing_transactions();

        let history = collect_history(&adapter, "0xwallet", 50).await;
        assert!(history.transactions.is_empty());
        assert!(history.tx_fetch_failed);
    }
}
