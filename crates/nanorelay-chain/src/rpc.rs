//! JSON-RPC-style client for the node's HTTP action API (§4.4).
//!
//! Calls are plain `{"action": "..."}` POST bodies against `rpc_url`,
//! mirroring the shape of the upstream node's RPC protocol rather than
//! JSON-RPC 2.0 envelopes.

use nanorelay_core::{Address, AccountInfo, Amount, BlockHash, BlockInfo, BlockSubtype, PaymentError, StateBlock};
use serde_json::{json, Value};

#[derive(Clone)]
pub struct RpcClient {
    rpc_url: String,
    pow_url: Option<String>,
    client: reqwest::Client,
}

impl RpcClient {
    pub fn new(rpc_url: impl Into<String>, pow_url: Option<String>) -> Self {
        Self {
            rpc_url: rpc_url.into(),
            pow_url: pow_url.filter(|s| !s.is_empty()),
            client: reqwest::Client::new(),
        }
    }

    async fn call(&self, body: Value) -> Result<Value, PaymentError> {
        let resp = self.client.post(&self.rpc_url).json(&body).send().await?;
        let json: Value = resp.json().await?;
        if let Some(err) = json.get("error").and_then(Value::as_str) {
            return Err(classify_rpc_error(err));
        }
        Ok(json)
    }

    pub async fn account_info(&self, account: &Address) -> Result<Option<AccountInfo>, PaymentError> {
        let result = self
            .call(json!({
                "action": "account_info",
                "account": account.to_display(),
            }))
            .await;

        let result = match result {
            Err(PaymentError::NotFound) => return Ok(None),
            other => other?,
        };

        let frontier = result["frontier"]
            .as_str()
            .ok_or_else(|| PaymentError::upstream("account_info missing frontier"))?;
        let balance = result["balance"]
            .as_str()
            .ok_or_else(|| PaymentError::upstream("account_info missing balance"))?;
        let block_count = result["block_count"]
            .as_str()
            .ok_or_else(|| PaymentError::upstream("account_info missing block_count"))?;
        let confirmation_height = result["confirmation_height"]
            .as_str()
            .ok_or_else(|| PaymentError::upstream("account_info missing confirmation_height"))?;

        Ok(Some(AccountInfo {
            frontier: BlockHash::from_hex(frontier)
                .map_err(|_| PaymentError::upstream("bad frontier hex"))?,
            balance: balance
                .parse::<Amount>()
                .map_err(|_| PaymentError::upstream("bad balance"))?,
            block_count: block_count
                .parse()
                .map_err(|_| PaymentError::upstream("bad block_count"))?,
            confirmation_height: confirmation_height
                .parse()
                .map_err(|_| PaymentError::upstream("bad confirmation_height"))?,
        }))
    }

    pub async fn block_info(&self, hash: &BlockHash) -> Result<BlockInfo, PaymentError> {
        let result = self
            .call(json!({
                "action": "block_info",
                "json_block": "true",
                "hash": hash.to_hex(),
            }))
            .await?;

        let subtype = match result["subtype"].as_str() {
            Some("send") => BlockSubtype::Send,
            Some("receive") => BlockSubtype::Receive,
            Some("change") => BlockSubtype::Change,
            Some("open") => BlockSubtype::Open,
            Some("epoch") => BlockSubtype::Epoch,
            _ => return Err(PaymentError::upstream("block_info: unknown subtype")),
        };
        let amount = result["amount"]
            .as_str()
            .ok_or_else(|| PaymentError::upstream("block_info missing amount"))?
            .parse()
            .map_err(|_| PaymentError::upstream("bad amount"))?;
        let block_account = Address::from_display(
            result["block_account"]
                .as_str()
                .ok_or_else(|| PaymentError::upstream("block_info missing block_account"))?,
        )?;
        let contents = &result["contents"];
        let link = decode_link(
            contents["link"]
                .as_str()
                .ok_or_else(|| PaymentError::upstream("block_info missing link"))?,
        )?;
        let previous = BlockHash::from_hex(
            contents["previous"]
                .as_str()
                .ok_or_else(|| PaymentError::upstream("block_info missing previous"))?,
        )
        .map_err(|_| PaymentError::upstream("bad previous hex"))?;

        Ok(BlockInfo {
            subtype,
            amount,
            block_account,
            link,
            previous,
        })
    }

    pub async fn process(&self, block: &StateBlock, subtype: BlockSubtype) -> Result<BlockHash, PaymentError> {
        let result = self
            .call(json!({
                "action": "process",
                "json_block": "true",
                "subtype": subtype_str(subtype),
                "block": block,
            }))
            .await?;
        let hash = result["hash"]
            .as_str()
            .ok_or_else(|| PaymentError::upstream("process missing hash"))?;
        BlockHash::from_hex(hash).map_err(|_| PaymentError::upstream("bad process hash"))
    }

    pub async fn active_difficulty(&self) -> Result<u64, PaymentError> {
        let result = self.call(json!({"action": "active_difficulty"})).await?;
        let hex = result["network_current"]
            .as_str()
            .ok_or_else(|| PaymentError::upstream("active_difficulty missing network_current"))?;
        u64::from_str_radix(hex, 16).map_err(|_| PaymentError::upstream("bad difficulty hex"))
    }

    /// Generate PoW for `previous`, dispatching locally or to `pow_url`
    /// depending on configuration (§4.4).
    pub async fn generate_pow(&self, previous: &BlockHash, difficulty: u64) -> Result<u64, PaymentError> {
        match &self.pow_url {
            Some(url) => {
                let resp = self
                    .client
                    .post(url)
                    .json(&json!({
                        "action": "work_generate",
                        "hash": previous.to_hex(),
                        "difficulty": format!("{:016x}", difficulty),
                    }))
                    .send()
                    .await?;
                let json: Value = resp.json().await?;
                let work = json["work"]
                    .as_str()
                    .ok_or_else(|| PaymentError::upstream("work_generate missing work"))?;
                u64::from_str_radix(work, 16).map_err(|_| PaymentError::upstream("bad work hex"))
            }
            None => {
                let previous_bytes = *previous.as_bytes();
                tokio::task::spawn_blocking(move || {
                    nanorelay_crypto::pow::generate_local(&previous_bytes, difficulty)
                })
                .await
                .map_err(|e| PaymentError::internal(format!("pow task join: {e}")))
            }
        }
    }

    /// Hashes of blocks pending receipt on `account` (§4.7).
    pub async fn pending(&self, account: &Address) -> Result<Vec<BlockHash>, PaymentError> {
        let result = self
            .call(json!({
                "action": "pending",
                "account": account.to_display(),
            }))
            .await?;
        let blocks = result["blocks"]
            .as_array()
            .cloned()
            .unwrap_or_default();
        blocks
            .iter()
            .filter_map(Value::as_str)
            .map(|h| BlockHash::from_hex(h).map_err(|_| PaymentError::upstream("bad pending hash")))
            .collect()
    }
}

fn subtype_str(subtype: BlockSubtype) -> &'static str {
    match subtype {
        BlockSubtype::Send => "send",
        BlockSubtype::Receive => "receive",
        BlockSubtype::Change => "change",
        BlockSubtype::Open => "open",
        BlockSubtype::Epoch => "epoch",
    }
}

fn decode_link(hex_or_account: &str) -> Result<[u8; 32], PaymentError> {
    if let Ok(bytes) = hex::decode(hex_or_account) {
        if bytes.len() == 32 {
            let mut arr = [0u8; 32];
            arr.copy_from_slice(&bytes);
            return Ok(arr);
        }
    }
    Address::from_display(hex_or_account).map(|a| *a.as_bytes())
}

fn classify_rpc_error(err: &str) -> PaymentError {
    match err {
        "Account not found" => PaymentError::NotFound,
        "Unreceivable" => PaymentError::conflict("unreceivable"),
        other => PaymentError::upstream(other),
    }
}
