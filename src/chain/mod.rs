//! Asynchronous ledger operations exposed to the agent.
//!
//! Each function here is one round of work against a [`LedgerClient`] and is
//! meant to be driven through the [`Bridge`](crate::bridge::Bridge); the
//! synchronous wrappers live in [`tools`](crate::tools).

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{AgentError, AgentResult};
use crate::ledger::function::encode_entry_call;
use crate::ledger::{
    apt_to_octas, find_function, AccountAddress, AccountResource, AddressArg, ArgValue, Balance,
    FunctionCall, FunctionId, LedgerClient, LocalAccount, MoveFunction, MoveModule, TransactionRecord,
    TransactionStatus, MAX_FAUCET_APT,
};

/// Account that publishes the launchpad module used for token creation
/// (`0xe522476ab48374606d11cc8e7a360e229e37fd84fb533fcde63e091090c62149`).
pub const LAUNCHPAD_ADDRESS: AccountAddress = AccountAddress::new([
    0xe5, 0x22, 0x47, 0x6a, 0xb4, 0x83, 0x74, 0x60, 0x6d, 0x11, 0xcc, 0x8e, 0x7a, 0x36, 0x0e, 0x22,
    0x9e, 0x37, 0xfd, 0x84, 0xfb, 0x53, 0x3f, 0xcd, 0xe6, 0x3e, 0x09, 0x10, 0x90, 0xc6, 0x21, 0x49,
]);
pub const LAUNCHPAD_MODULE: &str = "launchpad";
pub const CREATE_TOKEN_FUNCTION: &str = "create_fa_simple";

pub const TOKEN_STORE_TYPE: &str = "0x3::token::TokenStore";

const MAX_BYTECODE_CHARS: usize = 300;
const MAX_LISTED_PARAMS: usize = 5;

/// Polling budget for transactions the caller wants settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOptions {
    pub poll_interval: Duration,
    pub max_attempts: u32,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(500),
            max_attempts: 20,
        }
    }
}

pub async fn get_balance(ledger: &dyn LedgerClient, address: AccountAddress) -> AgentResult<Balance> {
    debug!("Getting balance for wallet: {}", address);
    let balance = Balance::from_octas(ledger.account_balance(address).await?);
    info!("Wallet {} balance: {}", address, balance);
    Ok(balance)
}

/// Rejects faucet requests above [`MAX_FAUCET_APT`]; returns the amount in octas.
pub fn validate_faucet_amount(amount_apt: u64) -> AgentResult<u64> {
    if amount_apt > MAX_FAUCET_APT {
        return Err(AgentError::validation(format!(
            "Amount too large. Please specify an amount of at most {} APT",
            MAX_FAUCET_APT
        )));
    }
    apt_to_octas(amount_apt)
}

pub async fn fund_wallet(
    ledger: &dyn LedgerClient,
    address: AccountAddress,
    amount_apt: u64,
    wait: WaitOptions,
) -> AgentResult<AccountAddress> {
    let octas = validate_faucet_amount(amount_apt)?;
    info!("Funding wallet {} with {} APT", address, amount_apt);

    for hash in ledger.fund_account(address, octas).await? {
        let record = wait_for_transaction(ledger, &hash, wait).await?;
        if let TransactionStatus::Failed { vm_status } = record.status {
            return Err(AgentError::api(500, format!("faucet transaction {} failed: {}", hash, vm_status)));
        }
    }

    Ok(address)
}

pub async fn transfer(
    ledger: &dyn LedgerClient,
    sender: &LocalAccount,
    recipient: &AddressArg,
    amount_octas: u64,
) -> AgentResult<String> {
    let recipient = recipient.resolve()?;
    let call = FunctionCall::new(FunctionId::new(AccountAddress::from_u8(1), "aptos_account", "transfer"))
        .with_arguments([ArgValue::Address(recipient), ArgValue::U64(amount_octas)]);

    let hash = ledger.submit_transaction(sender, &call).await?;
    info!("Transfer of {} octas to {}: {}", amount_octas, recipient, hash);
    Ok(hash)
}

pub async fn create_token(
    ledger: &dyn LedgerClient,
    sender: &LocalAccount,
    name: &str,
    symbol: &str,
    icon_uri: &str,
    project_uri: &str,
) -> AgentResult<String> {
    info!(
        "Creating FA with name: {}, symbol: {}, icon_uri: {}, project_uri: {}",
        name, symbol, icon_uri, project_uri
    );

    let call = FunctionCall::new(FunctionId::new(LAUNCHPAD_ADDRESS, LAUNCHPAD_MODULE, CREATE_TOKEN_FUNCTION))
        .with_arguments(
            [name, symbol, icon_uri, project_uri]
                .into_iter()
                .map(|field| ArgValue::String(field.to_string())),
        );

    ledger.submit_transaction(sender, &call).await
}

pub async fn get_transaction(ledger: &dyn LedgerClient, hash: &str) -> AgentResult<TransactionRecord> {
    let hash = hash.trim();
    if hash.is_empty() {
        return Err(AgentError::validation("transaction hash is empty"));
    }
    ledger.transaction_by_hash(hash).await
}

/// Polls until `hash` leaves the pending state or the budget runs out.
pub async fn wait_for_transaction(
    ledger: &dyn LedgerClient,
    hash: &str,
    wait: WaitOptions,
) -> AgentResult<TransactionRecord> {
    let attempts = wait.max_attempts.max(1);
    for attempt in 1..=attempts {
        let record = ledger.transaction_by_hash(hash).await?;
        if !record.status.is_pending() {
            return Ok(record);
        }
        debug!("Transaction {} still pending (attempt {}/{})", hash, attempt, attempts);
        if attempt < attempts {
            tokio::time::sleep(wait.poll_interval).await;
        }
    }

    warn!("Gave up waiting for transaction {}", hash);
    Err(AgentError::timeout(format!(
        "transaction {} still pending after {} checks",
        hash, attempts
    )))
}

pub async fn get_account_resources(
    ledger: &dyn LedgerClient,
    address: AccountAddress,
) -> AgentResult<Vec<AccountResource>> {
    ledger.account_resources(address).await
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleListing {
    pub modules: Vec<MoveModule>,
    pub note: String,
}

/// Lists up to `limit` modules, trimming bulky fields so the result stays
/// small enough to hand to a language model.
pub async fn get_account_modules(
    ledger: &dyn LedgerClient,
    address: AccountAddress,
    limit: usize,
) -> AgentResult<ModuleListing> {
    let modules = ledger
        .account_modules(address, limit)
        .await?
        .into_iter()
        .map(summarize_module)
        .collect();

    Ok(ModuleListing {
        modules,
        note: format!(
            "Requested up to {} modules. Large fields were truncated to keep the response small.",
            limit
        ),
    })
}

pub fn summarize_module(mut module: MoveModule) -> MoveModule {
    let length = module.bytecode.chars().count();
    if length > MAX_BYTECODE_CHARS {
        let kept: String = module.bytecode.chars().take(MAX_BYTECODE_CHARS).collect();
        module.bytecode = format!("{}...(truncated {} chars)", kept, length - MAX_BYTECODE_CHARS);
    }

    if let Some(abi) = module.abi.as_mut() {
        for function in &mut abi.exposed_functions {
            if function.params.len() > MAX_LISTED_PARAMS {
                function.params.truncate(MAX_LISTED_PARAMS);
                function.params.push("...truncated".to_string());
            }
        }
    }

    module
}

/// Looks up a token in the account's `0x3::token::TokenStore`. `None` when
/// the account holds no such token.
pub async fn get_token_balance(
    ledger: &dyn LedgerClient,
    address: AccountAddress,
    creator_address: &str,
    collection_name: &str,
    token_name: &str,
) -> AgentResult<Option<Value>> {
    let token_id = format!("{}::{}::{}", creator_address, collection_name, token_name);

    let found = ledger
        .account_resources(address)
        .await?
        .into_iter()
        .filter(|resource| resource.resource_type == TOKEN_STORE_TYPE)
        .find_map(|resource| resource.data["tokens"].get(&token_id).cloned());

    Ok(found)
}

pub async fn execute_view_function(ledger: &dyn LedgerClient, call: &FunctionCall) -> AgentResult<Vec<Value>> {
    debug!(
        "Executing view function {} with type args {:?} and args {:?}",
        call.function, call.type_arguments, call.arguments
    );
    ledger.view(call).await
}

/// Finds the ABI for `function`, first in `cached` modules, then (when
/// `fetch_missing` is set) by listing the module owner's modules.
pub async fn resolve_function_abi(
    ledger: &dyn LedgerClient,
    function: &FunctionId,
    cached: &[MoveModule],
    fetch_missing: bool,
    limit: usize,
) -> AgentResult<(MoveFunction, Option<Vec<MoveModule>>)> {
    if let Some(abi) = find_function(cached, function) {
        debug!("Using cached ABI for module: {}::{}", function.address, function.module);
        return Ok((abi.clone(), None));
    }

    if fetch_missing {
        info!("Fetching ABI for module: {}::{}", function.address, function.module);
        let fetched = ledger.account_modules(function.address, limit).await?;
        if let Some(abi) = find_function(&fetched, function) {
            let abi = abi.clone();
            return Ok((abi, Some(fetched)));
        }
    }

    Err(AgentError::validation(format!(
        "Function `{}` not found in ABI",
        function
    )))
}

/// Validates `arguments` against `abi` and submits the call.
pub async fn execute_entry_function(
    ledger: &dyn LedgerClient,
    sender: &LocalAccount,
    function: FunctionId,
    abi: &MoveFunction,
    type_arguments: Vec<String>,
    arguments: &[Value],
) -> AgentResult<String> {
    let call = encode_entry_call(function, abi, type_arguments, arguments)?;
    debug!("Serialized arguments: {}", json!(call.arguments));

    let hash = ledger.submit_transaction(sender, &call).await?;
    info!("Transaction submitted successfully! Txn Hash: {}", hash);
    Ok(hash)
}
