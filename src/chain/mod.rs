pub mod evm;

use async_trait::async_trait;
use ethers::types::{Address, U256};
use ethers::utils::to_checksum;

use crate::core::{TokenTransferRecord, TransactionRecord};

/// Supported networks. Adding a chain means adding an adapter plus a config entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Chain {
    Eth,
    Bsc,
}

impl Chain {
    /// Parse a caller-supplied chain name ("ETH", "bsc", ...).
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "ETH" => Some(Chain::Eth),
            "BSC" => Some(Chain::Bsc),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Chain::Eth => "ETH",
            Chain::Bsc => "BSC",
        }
    }
}

impl std::fmt::Display for Chain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Uniform read-only access to one blockchain network.
///
/// Adapters hold no business logic: they validate input shape, perform the
/// outbound call, and decode the response. Every fetch applies the caller's
/// result cap; results are most-recent-first where the source supports it,
/// but callers must not assume a total order.
#[async_trait]
pub trait ChainAdapter: Send + Sync {
    /// Syntactic + checksum validation. Never touches the network.
    fn validate_address(&self, addr: &str) -> bool;

    /// Recent transactions for an address, capped at `limit`.
    async fn fetch_transactions(
        &self,
        addr: &str,
        limit: usize,
    ) -> Result<Vec<TransactionRecord>, AdapterError>;

    /// Recent ERC-20 transfer events touching an address, capped at `limit`.
    async fn fetch_token_transfers(
        &self,
        addr: &str,
        limit: usize,
    ) -> Result<Vec<TokenTransferRecord>, AdapterError>;

    /// Live `allowance(owner, spender)` read on a token contract.
    /// May legitimately return zero; a failure is independent per pair.
    async fn fetch_allowance(
        &self,
        owner: &str,
        token: &str,
        spender: &str,
    ) -> Result<U256, AdapterError>;
}

/// Failure of a single adapter operation.
#[derive(Debug)]
pub enum AdapterError {
    Http(reqwest::Error),
    /// The upstream answered but reported an error (rate limit, bad key, ...).
    Api(String),
    /// The upstream answered with a payload we could not interpret.
    Decode(String),
}

impl std::fmt::Display for AdapterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AdapterError::Http(e) => write!(f, "HTTP error: {e}"),
            AdapterError::Api(e) => write!(f, "upstream API error: {e}"),
            AdapterError::Decode(e) => write!(f, "decode error: {e}"),
        }
    }
}

impl std::error::Error for AdapterError {}

/// Lowercase an address for comparison and deduplication.
pub fn normalize_address(addr: &str) -> String {
    addr.to_ascii_lowercase()
}

/// web3-style address check: `0x` + 40 hex chars; mixed-case input must
/// additionally match its EIP-55 checksum.
pub fn is_valid_address(addr: &str) -> bool {
    let Some(body) = addr.strip_prefix("0x") else {
        return false;
    };
    if body.len() != 40 || !body.bytes().all(|b| b.is_ascii_hexdigit()) {
        return false;
    }
    let has_upper = body.bytes().any(|b| b.is_ascii_uppercase());
    let has_lower = body.bytes().any(|b| b.is_ascii_lowercase());
    if has_upper && has_lower {
        match addr.parse::<Address>() {
            Ok(parsed) => to_checksum(&parsed, None) == addr,
            Err(_) => false,
        }
    } else {
        true
    }
}
