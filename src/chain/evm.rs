use async_trait::async_trait;
use ethers::types::{Address, U256};
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;

use super::{is_valid_address, AdapterError, ChainAdapter};
use crate::config::ChainConfig;
use crate::core::{TokenTransferRecord, TransactionRecord};

/// 4-byte selector of `allowance(address,address)`.
const ALLOWANCE_SELECTOR: &str = "dd62ed3e";

/// Hard cap on explorer page size, matching the upstream maximum we rely on.
const MAX_FETCH_LIMIT: usize = 100;

/// Minimal JSON-RPC client for an EVM node. Read-only: `eth_call` is the
/// only method the engine needs.
pub struct EvmRpc {
    url: String,
    client: Client,
}

impl EvmRpc {
    pub fn new(url: &str, client: Client) -> Self {
        Self {
            url: url.to_string(),
            client,
        }
    }

    pub async fn call(&self, method: &str, params: Vec<Value>) -> Result<Value, AdapterError> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });

        let resp = self
            .client
            .post(&self.url)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(AdapterError::Http)?;

        let json: Value = resp.json().await.map_err(AdapterError::Http)?;

        if let Some(err) = json.get("error").filter(|e| !e.is_null()) {
            return Err(AdapterError::Api(err.to_string()));
        }

        Ok(json["result"].clone())
    }

    /// Read-only contract call against the latest block.
    pub async fn eth_call(&self, to: &str, data: &str) -> Result<String, AdapterError> {
        let result = self
            .call("eth_call", vec![json!({"to": to, "data": data}), json!("latest")])
            .await?;
        result
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| AdapterError::Decode(format!("non-string eth_call result: {result}")))
    }
}

/// Chain adapter for EVM networks: history via an etherscan-style explorer
/// API, allowances via raw `eth_call` against the configured node.
pub struct EvmAdapter {
    explorer_url: String,
    api_key: String,
    client: Client,
    rpc: EvmRpc,
}

impl EvmAdapter {
    /// Every outbound call goes through a client with a hard timeout; a
    /// client that cannot be built is a startup error, not something to
    /// paper over with an untimed fallback.
    pub fn new(config: &ChainConfig, call_timeout: Duration) -> Result<Self, AdapterError> {
        let client = Client::builder()
            .timeout(call_timeout)
            .build()
            .map_err(AdapterError::Http)?;
        let rpc = EvmRpc::new(&config.rpc_url, client.clone());
        Ok(Self {
            explorer_url: config.explorer_url.clone(),
            api_key: config.explorer_api_key.clone(),
            client,
            rpc,
        })
    }

    /// One `module=account` explorer query, returning the `result` array.
    async fn explorer_query(&self, action: &str, addr: &str, limit: usize) -> Result<Value, AdapterError> {
        let limit = limit.clamp(1, MAX_FETCH_LIMIT);
        let offset = limit.to_string();
        let resp = self
            .client
            .get(&self.explorer_url)
            .query(&[
                ("module", "account"),
                ("action", action),
                ("address", addr),
                ("page", "1"),
                ("offset", offset.as_str()),
                ("sort", "desc"),
                ("apikey", self.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(AdapterError::Http)?;

        let body: Value = resp.json().await.map_err(AdapterError::Http)?;
        let result = body["result"].clone();

        // The explorer reports errors (rate limit, bad key) in-band: status "0"
        // with a message string where the result array would be. An empty
        // history also comes back as status "0", but with an empty array.
        if result.is_array() {
            Ok(result)
        } else {
            let message = body["message"].as_str().unwrap_or("unknown explorer error");
            Err(AdapterError::Api(format!("{action}: {message}")))
        }
    }
}

#[async_trait]
impl ChainAdapter for EvmAdapter {
    fn validate_address(&self, addr: &str) -> bool {
        is_valid_address(addr)
    }

    async fn fetch_transactions(
        &self,
        addr: &str,
        limit: usize,
    ) -> Result<Vec<TransactionRecord>, AdapterError> {
        let result = self.explorer_query("txlist", addr, limit).await?;
        serde_json::from_value(result)
            .map_err(|e| AdapterError::Decode(format!("txlist: {e}")))
    }

    async fn fetch_token_transfers(
        &self,
        addr: &str,
        limit: usize,
    ) -> Result<Vec<TokenTransferRecord>, AdapterError> {
        let result = self.explorer_query("tokentx", addr, limit).await?;
        serde_json::from_value(result)
            .map_err(|e| AdapterError::Decode(format!("tokentx: {e}")))
    }

    async fn fetch_allowance(
        &self,
        owner: &str,
        token: &str,
        spender: &str,
    ) -> Result<U256, AdapterError> {
        let data = encode_allowance_call(owner, spender)?;
        let raw = self.rpc.eth_call(token, &data).await?;
        decode_uint256(&raw)
    }
}

/// ABI-encode `allowance(owner, spender)` calldata: selector plus two
/// addresses left-padded to 32 bytes each.
fn encode_allowance_call(owner: &str, spender: &str) -> Result<String, AdapterError> {
    let owner: Address = owner
        .parse()
        .map_err(|_| AdapterError::Decode(format!("bad owner address: {owner}")))?;
    let spender: Address = spender
        .parse()
        .map_err(|_| AdapterError::Decode(format!("bad spender address: {spender}")))?;
    Ok(format!(
        "0x{ALLOWANCE_SELECTOR}{:0>64}{:0>64}",
        hex::encode(owner.as_bytes()),
        hex::encode(spender.as_bytes()),
    ))
}

/// Decode a hex-quantity `eth_call` return into a U256.
fn decode_uint256(raw: &str) -> Result<U256, AdapterError> {
    let body = raw.strip_prefix("0x").unwrap_or(raw);
    if body.is_empty() {
        // Empty return data: the target is not a contract or has no such
        // function. Not a number, so not treated as zero.
        return Err(AdapterError::Decode("empty return data".into()));
    }
    U256::from_str_radix(body, 16)
        .map_err(|e| AdapterError::Decode(format!("bad uint256 {raw}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const OWNER: &str = "0x1111111111111111111111111111111111111111";
    const SPENDER: &str = "0x2222222222222222222222222222222222222222";

    #[test]
    fn allowance_calldata_layout() {
        let data = encode_allowance_call(OWNER, SPENDER).unwrap();
        // 0x + 8 selector chars + 2 * 64 argument chars
        assert_eq!(data.len(), 2 + 8 + 128);
        assert!(data.starts_with("0xdd62ed3e"));
        assert!(data.contains(&format!("{:0>64}", &OWNER[2..])));
        assert!(data.ends_with(&format!("{:0>64}", &SPENDER[2..])));
    }

    #[test]
    fn allowance_calldata_rejects_garbage() {
        assert!(encode_allowance_call("not-an-address", SPENDER).is_err());
    }

    #[test]
    fn decodes_uint256_quantities() {
        assert_eq!(decode_uint256("0x0").unwrap(), U256::zero());
        assert_eq!(decode_uint256("0x64").unwrap(), U256::from(100u64));
        // full-width word, as eth_call actually returns it
        let word = format!("0x{:0>64}", "de0b6b3a7640000");
        assert_eq!(
            decode_uint256(&word).unwrap(),
            U256::from(1_000_000_000_000_000_000u64)
        );
        // larger than u128
        let max = decode_uint256(&format!("0x{}", "f".repeat(64))).unwrap();
        assert_eq!(max, U256::MAX);
    }

    #[test]
    fn empty_return_is_an_error_not_zero() {
        assert!(decode_uint256("0x").is_err());
        assert!(decode_uint256("0xzz").is_err());
    }

    #[test]
    fn explorer_records_deserialize() {
        // Trimmed etherscan-style payloads; unknown fields are ignored.
        let txs: Vec<TransactionRecord> = serde_json::from_value(serde_json::json!([
            {
                "hash": "0xabc",
                "from": OWNER,
                "to": SPENDER,
                "input": "0x",
                "isError": "0",
                "contractAddress": "",
                "timeStamp": "1700000000",
                "gasUsed": "21000"
            }
        ]))
        .unwrap();
        assert_eq!(txs.len(), 1);
        assert!(!txs[0].failed());

        let transfers: Vec<TokenTransferRecord> = serde_json::from_value(serde_json::json!([
            {"contractAddress": "0xToken", "tokenSymbol": "DAI", "value": "1"}
        ]))
        .unwrap();
        assert_eq!(transfers[0].token_symbol, "DAI");
    }
}
