use ethers::types::U256;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::chain::{normalize_address, ChainAdapter};
use crate::core::{AllowanceEntry, TransactionRecord};

/// 4-byte selector of `approve(address,uint256)`.
const APPROVE_SELECTOR: &str = "0x095ea7b3";

/// Upper bound on the allowance worker pool, whatever the config says.
const MAX_CONCURRENCY: usize = 20;

/// Limits for one allowance fan-out.
#[derive(Debug, Clone)]
pub struct MatrixOptions {
    pub concurrency: usize,
    pub call_timeout: Duration,
    /// Deadline for the whole fan-out; on expiry, partial results are returned.
    pub deadline: Duration,
}

impl Default for MatrixOptions {
    fn default() -> Self {
        Self {
            concurrency: 8,
            call_timeout: Duration::from_secs(10),
            deadline: Duration::from_secs(45),
        }
    }
}

/// Result of one fan-out: positive allowances found, plus the number of
/// (token, spender) pairs whose query failed or timed out. A skipped pair
/// is unknown, not zero.
#[derive(Debug, Default)]
pub struct MatrixOutcome {
    pub approvals: Vec<AllowanceEntry>,
    pub skipped_pairs: usize,
}

/// Distinct addresses this wallet has issued `approve` calls to.
///
/// Qualification is purely syntactic: the call data starts with the approve
/// selector, and the transaction target is the spender candidate. Addresses
/// are lowercased so case variants collapse to one entry. An empty set means
/// no exposure, not an error.
pub fn extract_spenders(transactions: &[TransactionRecord]) -> BTreeSet<String> {
    transactions
        .iter()
        .filter(|tx| tx.input.starts_with(APPROVE_SELECTOR))
        .filter(|tx| !tx.to.is_empty())
        .map(|tx| normalize_address(&tx.to))
        .collect()
}

/// Query the live allowance for every (token, spender) pair and keep the
/// strictly-positive ones.
///
/// This is the scan's dominant cost: T tokens and S spenders mean T×S
/// external queries. They run on a fixed-size worker pool (semaphore
/// permits) so rate-limited upstreams are not overwhelmed. Each query
/// carries its own timeout and fails independently; sibling queries and the
/// scan itself are never aborted by one failure. On overall deadline expiry
/// whatever has completed is returned.
pub async fn build_allowance_matrix(
    adapter: Arc<dyn ChainAdapter>,
    owner: &str,
    token_pairs: &[(String, String)],
    spenders: &BTreeSet<String>,
    opts: &MatrixOptions,
) -> MatrixOutcome {
    let total = token_pairs.len() * spenders.len();
    if total == 0 {
        return MatrixOutcome::default();
    }

    let semaphore = Arc::new(Semaphore::new(opts.concurrency.clamp(1, MAX_CONCURRENCY)));
    let deadline = Instant::now() + opts.deadline;
    let mut join_set = JoinSet::new();

    for (token, symbol) in token_pairs {
        for spender in spenders {
            let adapter = Arc::clone(&adapter);
            let semaphore = Arc::clone(&semaphore);
            let owner = owner.to_string();
            let token = token.clone();
            let symbol = symbol.clone();
            let spender = spender.clone();
            let call_timeout = opts.call_timeout;

            join_set.spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return None, // pool closed during shutdown
                };
                let query = adapter.fetch_allowance(&owner, &token, &spender);
                match tokio::time::timeout(call_timeout, query).await {
                    Ok(Ok(amount)) => Some((token, symbol, spender, amount)),
                    Ok(Err(e)) => {
                        debug!(%token, %spender, error = %e, "allowance query failed, skipping pair");
                        None
                    }
                    Err(_) => {
                        debug!(%token, %spender, "allowance query timed out, skipping pair");
                        None
                    }
                }
            });
        }
    }

    let mut outcome = MatrixOutcome::default();
    let mut settled = 0usize;

    loop {
        match tokio::time::timeout_at(deadline, join_set.join_next()).await {
            Ok(Some(joined)) => {
                settled += 1;
                match joined {
                    Ok(Some((token, symbol, spender, amount))) => {
                        if amount > U256::zero() {
                            outcome.approvals.push(AllowanceEntry {
                                token: symbol,
                                spender,
                                amount: amount.to_string(),
                                token_address: token,
                            });
                        }
                    }
                    Ok(None) => outcome.skipped_pairs += 1,
                    Err(e) => {
                        warn!(error = %e, "allowance task panicked, skipping pair");
                        outcome.skipped_pairs += 1;
                    }
                }
            }
            Ok(None) => break,
            Err(_) => {
                join_set.abort_all();
                outcome.skipped_pairs += total - settled;
                warn!(
                    completed = settled,
                    total, "allowance fan-out hit scan deadline, returning partial results"
                );
                break;
            }
        }
    }

    // Stable order for consumers and tests; the queries themselves finish
    // in no particular order.
    outcome
        .approvals
        .sort_by(|a, b| a.token.cmp(&b.token).then_with(|| a.spender.cmp(&b.spender)));
    outcome
}
