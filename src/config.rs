use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Config {
    pub chains: ChainsConfig,
    pub scan: ScanConfig,
    pub database: DatabaseConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ChainsConfig {
    pub eth: ChainConfig,
    pub bsc: ChainConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ChainConfig {
    /// JSON-RPC node endpoint used for allowance reads.
    pub rpc_url: String,
    /// Etherscan-style explorer API base URL.
    pub explorer_url: String,
    pub explorer_api_key: String,
    /// Addresses known or suspected to be malicious on this chain.
    pub blacklist: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ScanConfig {
    /// Result cap for transaction and token-transfer fetches (explorer page size).
    pub tx_limit: usize,
    /// Concurrent outbound allowance queries (1-20).
    pub allowance_concurrency: usize,
    /// Timeout for a single outbound call, seconds.
    pub call_timeout_secs: u64,
    /// Overall deadline for one allowance fan-out, seconds.
    pub scan_deadline_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            chains: ChainsConfig::default(),
            scan: ScanConfig::default(),
            database: DatabaseConfig::default(),
        }
    }
}

impl Default for ChainsConfig {
    fn default() -> Self {
        Self {
            eth: ChainConfig {
                rpc_url: "https://rpc.ankr.com/eth".into(),
                explorer_url: "https://api.etherscan.io/api".into(),
                explorer_api_key: String::new(),
                blacklist: Vec::new(),
            },
            bsc: ChainConfig {
                rpc_url: "https://bsc-dataseed1.binance.org".into(),
                explorer_url: "https://api.bscscan.com/api".into(),
                explorer_api_key: String::new(),
                blacklist: Vec::new(),
            },
        }
    }
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            rpc_url: String::new(),
            explorer_url: String::new(),
            explorer_api_key: String::new(),
            blacklist: Vec::new(),
        }
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            tx_limit: 50,
            allowance_concurrency: 8,
            call_timeout_secs: 10,
            scan_deadline_secs: 45,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "data/scan_log.db".into(),
        }
    }
}

impl Config {
    /// Load config from a TOML file. Falls back to defaults if file doesn't exist.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            tracing::info!("Config file {} not found, using defaults", path.display());
            return Self::default();
        }
        match std::fs::read_to_string(path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(config) => {
                    tracing::info!("Config loaded from {}", path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to parse {}: {e}, using defaults", path.display());
                    Self::default()
                }
            },
            Err(e) => {
                tracing::warn!("Failed to read {}: {e}, using defaults", path.display());
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = Config::default();
        assert_eq!(config.scan.tx_limit, 50);
        assert!(config.scan.allowance_concurrency >= 1);
        assert!(config.chains.eth.explorer_url.contains("etherscan"));
        assert!(config.chains.bsc.rpc_url.contains("binance"));
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = Config::load("does/not/exist.toml");
        assert_eq!(config.scan.tx_limit, Config::default().scan.tx_limit);
    }

    #[test]
    fn partial_toml_keeps_defaults_for_rest() {
        let parsed: Config = toml::from_str(
            r#"
            [scan]
            allowance_concurrency = 4

            [chains.eth]
            explorer_api_key = "KEY123"
            blacklist = ["0xBAD0000000000000000000000000000000000bad"]
            "#,
        )
        .unwrap();
        assert_eq!(parsed.scan.allowance_concurrency, 4);
        assert_eq!(parsed.scan.tx_limit, 50);
        assert_eq!(parsed.chains.eth.explorer_api_key, "KEY123");
        assert_eq!(parsed.chains.eth.blacklist.len(), 1);
        assert!(parsed.chains.bsc.explorer_url.contains("bscscan"));
    }
}
