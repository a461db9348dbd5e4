use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, error, info};

use super::{
    json_u64, AccountAddress, AccountResource, ArgValue, FunctionCall, FunctionId, LedgerClient, LocalAccount,
    MoveModule, TransactionRecord, APTOS_COIN_TYPE,
};
use crate::config::{NetworkConfig, TransactionOptions};
use crate::error::{AgentError, AgentResult};

/// Client for a node's REST API and the matching faucet.
pub struct RestLedger {
    client: Client,
    node_url: String,
    faucet_url: String,
    options: TransactionOptions,
}

impl RestLedger {
    pub fn new(network: &NetworkConfig, options: TransactionOptions) -> AgentResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(network.request_timeout_secs))
            .user_agent(concat!("aptos-agent/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            node_url: network.node_url.trim_end_matches('/').to_string(),
            faucet_url: network.faucet_url.trim_end_matches('/').to_string(),
            options,
        })
    }

    fn node(&self, path: &str) -> String {
        format!("{}{}", self.node_url, path)
    }

    async fn check(response: Response) -> AgentResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| v["message"].as_str().map(String::from))
            .unwrap_or(body);
        error!("Ledger API error {}: {}", status, message);
        Err(AgentError::api(status.as_u16(), message))
    }

    async fn sequence_number(&self, address: AccountAddress) -> AgentResult<u64> {
        let response = self
            .client
            .get(self.node(&format!("/accounts/{}", address)))
            .send()
            .await?;
        let account: Value = Self::check(response).await?.json().await?;

        json_u64(&account["sequence_number"])
            .ok_or_else(|| AgentError::api(200, "account response has no sequence_number"))
    }
}

#[async_trait]
impl LedgerClient for RestLedger {
    fn name(&self) -> &str {
        "rest"
    }

    async fn account_balance(&self, address: AccountAddress) -> AgentResult<u64> {
        let call = FunctionCall::new(FunctionId::new(AccountAddress::from_u8(1), "coin", "balance"))
            .with_type_argument(APTOS_COIN_TYPE)
            .with_argument(ArgValue::Address(address));

        match self.view(&call).await {
            Ok(values) => values
                .first()
                .and_then(json_u64)
                .ok_or_else(|| AgentError::api(200, "balance view returned no value")),
            // Accounts that never received coins have no coin store yet.
            Err(AgentError::Api { status, message })
                if status == StatusCode::NOT_FOUND.as_u16()
                    || message.contains("COIN_STORE_NOT_PUBLISHED") =>
            {
                debug!("No coin store for {}, reporting zero balance", address);
                Ok(0)
            }
            Err(e) => Err(e),
        }
    }

    async fn fund_account(&self, address: AccountAddress, octas: u64) -> AgentResult<Vec<String>> {
        info!("Requesting {} octas from faucet for {}", octas, address);

        let response = self
            .client
            .post(format!("{}/mint", self.faucet_url))
            .query(&[("amount", octas.to_string()), ("address", address.to_string())])
            .send()
            .await?;

        let hashes: Vec<String> = Self::check(response).await?.json().await?;
        debug!("Faucet transactions: {:?}", hashes);
        Ok(hashes)
    }

    async fn submit_transaction(&self, sender: &LocalAccount, call: &FunctionCall) -> AgentResult<String> {
        let sequence_number = self.sequence_number(sender.address()).await?;
        let expiration = chrono::Utc::now().timestamp().max(0) as u64 + self.options.expiration_secs;

        let mut body = json!({
            "sender": sender.address().to_string(),
            "sequence_number": sequence_number.to_string(),
            "max_gas_amount": self.options.max_gas_amount.to_string(),
            "gas_unit_price": self.options.gas_unit_price.to_string(),
            "expiration_timestamp_secs": expiration.to_string(),
            "payload": call.entry_payload(),
        });

        debug!("Encoding submission for {}", call.function);
        let response = self
            .client
            .post(self.node("/transactions/encode_submission"))
            .json(&body)
            .send()
            .await?;
        let signing_message: String = Self::check(response).await?.json().await?;

        let message = hex::decode(signing_message.trim_start_matches("0x"))
            .map_err(|e| AgentError::signing(format!("node returned a malformed signing message: {}", e)))?;
        let signature = sender.sign(&message);

        body["signature"] = json!({
            "type": "ed25519_signature",
            "public_key": sender.public_key_hex(),
            "signature": format!("0x{}", hex::encode(signature)),
        });

        let response = self
            .client
            .post(self.node("/transactions"))
            .json(&body)
            .send()
            .await?;
        let submitted: Value = Self::check(response).await?.json().await?;

        let hash = submitted["hash"]
            .as_str()
            .ok_or_else(|| AgentError::api(202, "submission response has no hash"))?
            .to_string();
        info!("Submitted {} as {}", call.function, hash);
        Ok(hash)
    }

    async fn transaction_by_hash(&self, hash: &str) -> AgentResult<TransactionRecord> {
        let response = self
            .client
            .get(self.node(&format!("/transactions/by_hash/{}", hash)))
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            debug!("Transaction {} not visible yet", hash);
            return Ok(TransactionRecord::pending(hash));
        }

        let json: Value = Self::check(response).await?.json().await?;
        Ok(TransactionRecord::from_json(hash, &json))
    }

    async fn account_resources(&self, address: AccountAddress) -> AgentResult<Vec<AccountResource>> {
        let response = self
            .client
            .get(self.node(&format!("/accounts/{}/resources", address)))
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        Ok(Self::check(response).await?.json().await?)
    }

    async fn account_modules(&self, address: AccountAddress, limit: usize) -> AgentResult<Vec<MoveModule>> {
        let response = self
            .client
            .get(self.node(&format!("/accounts/{}/modules", address)))
            .query(&[("limit", limit.to_string())])
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        Ok(Self::check(response).await?.json().await?)
    }

    async fn view(&self, call: &FunctionCall) -> AgentResult<Vec<Value>> {
        debug!("View {}", call.function);

        let response = self
            .client
            .post(self.node("/view"))
            .json(&call.view_body())
            .send()
            .await?;

        Ok(Self::check(response).await?.json().await?)
    }
}
