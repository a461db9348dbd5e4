//! In-process ledger.
//!
//! Serves the same [`LedgerClient`] surface as the REST node without leaving
//! the process: coin balances, a faucet, transfers, a transaction log, and
//! the storage contract published at a configurable address. Every trait
//! call counts as one request, so callers can check how many round trips an
//! operation made.

use async_trait::async_trait;
use serde_json::{json, Value};
use sha3::{Digest, Sha3_256};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::{
    AccountAddress, AccountResource, ArgValue, FunctionCall, LedgerClient, LocalAccount, ModuleAbi,
    MoveFunction, MoveModule, TransactionRecord, TransactionStatus, APTOS_COIN_TYPE,
};
use crate::chain::{CREATE_TOKEN_FUNCTION, LAUNCHPAD_ADDRESS, LAUNCHPAD_MODULE};
use crate::contract::{self, Signer, StorageFunction, ValueStore};
use crate::error::{AgentError, AgentResult};

const FRAMEWORK_ADDRESS: AccountAddress = AccountAddress::from_u8(0x1);
const FAUCET_ADDRESS: AccountAddress = AccountAddress::from_u8(0xfa);

/// Every transaction is charged a flat amount of gas.
const GAS_PER_TRANSACTION: u64 = 10;
const GAS_UNIT_PRICE: u64 = 100;

#[derive(Debug, Default, Clone)]
struct AccountState {
    balance: u64,
    sequence_number: u64,
}

#[derive(Default)]
struct LedgerState {
    accounts: HashMap<AccountAddress, AccountState>,
    transactions: HashMap<String, TransactionRecord>,
    published: HashMap<AccountAddress, Vec<AccountResource>>,
    storage: ValueStore,
    faucet_sequence: u64,
    version: u64,
}

pub struct InMemoryLedger {
    state: RwLock<LedgerState>,
    requests: AtomicU64,
    storage_address: AccountAddress,
    latency: Duration,
}

impl InMemoryLedger {
    pub fn new(storage_address: AccountAddress) -> Self {
        Self {
            state: RwLock::new(LedgerState::default()),
            requests: AtomicU64::new(0),
            storage_address,
            latency: Duration::ZERO,
        }
    }

    /// Delays every request by `latency`, to stand in for a network hop.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn storage_address(&self) -> AccountAddress {
        self.storage_address
    }

    pub fn request_count(&self) -> u64 {
        self.requests.load(Ordering::SeqCst)
    }

    /// Places an extra resource under `address`, e.g. a token store.
    pub async fn publish_resource(&self, address: AccountAddress, resource: AccountResource) {
        let mut state = self.state.write().await;
        state.published.entry(address).or_default().push(resource);
    }

    async fn round_trip(&self, operation: &str) {
        let count = self.requests.fetch_add(1, Ordering::SeqCst) + 1;
        debug!("In-memory ledger request #{}: {}", count, operation);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }

    fn framework_modules() -> Vec<MoveModule> {
        let aptos_account = ModuleAbi {
            address: FRAMEWORK_ADDRESS.to_string(),
            name: "aptos_account".to_string(),
            friends: Vec::new(),
            exposed_functions: vec![entry_abi("transfer", &["&signer", "address", "u64"], 0)],
            structs: Vec::new(),
        };
        let coin = ModuleAbi {
            address: FRAMEWORK_ADDRESS.to_string(),
            name: "coin".to_string(),
            friends: Vec::new(),
            exposed_functions: vec![view_abi("balance", &["address"], &["u64"], 1)],
            structs: Vec::new(),
        };

        vec![module(aptos_account), module(coin)]
    }

    fn launchpad_modules() -> Vec<MoveModule> {
        vec![module(ModuleAbi {
            address: LAUNCHPAD_ADDRESS.to_string(),
            name: LAUNCHPAD_MODULE.to_string(),
            friends: Vec::new(),
            exposed_functions: vec![entry_abi(
                CREATE_TOKEN_FUNCTION,
                &[
                    "&signer",
                    "0x1::string::String",
                    "0x1::string::String",
                    "0x1::string::String",
                    "0x1::string::String",
                ],
                0,
            )],
            structs: Vec::new(),
        })]
    }
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new(AccountAddress::from_hex("0xcafe").unwrap_or(AccountAddress::ZERO))
    }
}

fn entry_abi(name: &str, params: &[&str], generics: usize) -> MoveFunction {
    MoveFunction {
        name: name.to_string(),
        visibility: "public".to_string(),
        is_entry: true,
        is_view: false,
        generic_type_params: vec![json!({ "constraints": [] }); generics],
        params: params.iter().map(|p| p.to_string()).collect(),
        returns: Vec::new(),
    }
}

fn view_abi(name: &str, params: &[&str], returns: &[&str], generics: usize) -> MoveFunction {
    MoveFunction {
        is_entry: false,
        is_view: true,
        returns: returns.iter().map(|r| r.to_string()).collect(),
        ..entry_abi(name, params, generics)
    }
}

fn module(abi: ModuleAbi) -> MoveModule {
    MoveModule {
        // Move bytecode magic followed by the module name.
        bytecode: format!("0xa11ceb0b{}", hex::encode(abi.name.as_bytes())),
        abi: Some(abi),
    }
}

fn failed(vm_status: impl Into<String>) -> TransactionStatus {
    TransactionStatus::Failed {
        vm_status: vm_status.into(),
    }
}

fn exact_args(call: &FunctionCall, expected: usize) -> Result<&[Value], TransactionStatus> {
    if call.arguments.len() != expected {
        return Err(failed("NUMBER_OF_ARGUMENTS_MISMATCH"));
    }
    Ok(&call.arguments)
}

fn decode_arg(param_type: &str, value: &Value) -> Result<ArgValue, TransactionStatus> {
    ArgValue::from_json(param_type, value).map_err(|_| failed("FAILED_TO_DESERIALIZE_ARGUMENT"))
}

impl LedgerState {
    fn record(
        &mut self,
        sender: AccountAddress,
        sequence_number: u64,
        payload: Value,
        status: TransactionStatus,
    ) -> String {
        self.version += 1;

        let mut hasher = Sha3_256::new();
        hasher.update(sender.as_bytes());
        hasher.update(sequence_number.to_le_bytes());
        hasher.update(self.version.to_le_bytes());
        hasher.update(payload.to_string().as_bytes());
        let hash = format!("0x{}", hex::encode(hasher.finalize()));

        let record = TransactionRecord {
            hash: hash.clone(),
            status,
            sender: Some(sender),
            sequence_number: Some(sequence_number),
            payload,
            gas_used: GAS_PER_TRANSACTION,
            timestamp_us: u64::try_from(chrono::Utc::now().timestamp_micros()).ok(),
        };
        self.transactions.insert(hash.clone(), record);
        hash
    }

    fn execute(&mut self, sender: AccountAddress, call: &FunctionCall, storage_address: AccountAddress) -> TransactionStatus {
        let result = self.try_execute(sender, call, storage_address);
        result.unwrap_or_else(|status| status)
    }

    fn try_execute(
        &mut self,
        sender: AccountAddress,
        call: &FunctionCall,
        storage_address: AccountAddress,
    ) -> Result<TransactionStatus, TransactionStatus> {
        let function = &call.function;

        if function.address == FRAMEWORK_ADDRESS && function.module == "aptos_account" && function.name == "transfer" {
            let args = exact_args(call, 2)?;
            let ArgValue::Address(recipient) = decode_arg("address", &args[0])? else {
                return Err(failed("FAILED_TO_DESERIALIZE_ARGUMENT"));
            };
            let ArgValue::U64(amount) = decode_arg("u64", &args[1])? else {
                return Err(failed("FAILED_TO_DESERIALIZE_ARGUMENT"));
            };

            let available = self.accounts.get(&sender).map(|a| a.balance).unwrap_or(0);
            if available < amount {
                return Err(failed(
                    "Move abort in 0x1::coin: EINSUFFICIENT_BALANCE(0x10006): Not enough coins to complete transaction",
                ));
            }
            if let Some(account) = self.accounts.get_mut(&sender) {
                account.balance -= amount;
            }
            let receiver = self.accounts.entry(recipient).or_default();
            receiver.balance = receiver.balance.saturating_add(amount);
            return Ok(TransactionStatus::Succeeded);
        }

        if function.address == storage_address && function.module == contract::MODULE_NAME {
            return match StorageFunction::from_name(&function.name) {
                Some(StorageFunction::Store) => {
                    let args = exact_args(call, 1)?;
                    let ArgValue::U64(value) = decode_arg("u64", &args[0])? else {
                        return Err(failed("FAILED_TO_DESERIALIZE_ARGUMENT"));
                    };
                    self.storage.store(&Signer::authenticated(sender), value);
                    Ok(TransactionStatus::Succeeded)
                }
                Some(_) => Err(failed("EXECUTE_ENTRY_FUNCTION_CALLED_ON_NON_ENTRY_FUNCTION")),
                None => Err(failed("LINKER_ERROR")),
            };
        }

        if function.address == LAUNCHPAD_ADDRESS
            && function.module == LAUNCHPAD_MODULE
            && function.name == CREATE_TOKEN_FUNCTION
        {
            let args = exact_args(call, 4)?;
            for arg in args {
                if !arg.is_string() {
                    return Err(failed("FAILED_TO_DESERIALIZE_ARGUMENT"));
                }
            }
            return Ok(TransactionStatus::Succeeded);
        }

        Err(failed("LINKER_ERROR"))
    }

    fn evaluate_view(&self, call: &FunctionCall, storage_address: AccountAddress) -> AgentResult<Vec<Value>> {
        let function = &call.function;
        let address_arg = |index: usize| -> AgentResult<AccountAddress> {
            let value = call
                .arguments
                .get(index)
                .ok_or_else(|| AgentError::api(400, format!("{} expects an address argument", function)))?;
            match ArgValue::from_json("address", value) {
                Ok(ArgValue::Address(address)) => Ok(address),
                _ => Err(AgentError::api(400, format!("Invalid address argument for {}", function))),
            }
        };

        if function.address == FRAMEWORK_ADDRESS && function.module == "coin" && function.name == "balance" {
            let address = address_arg(0)?;
            let balance = self.accounts.get(&address).map(|a| a.balance).unwrap_or(0);
            return Ok(vec![json!(balance.to_string())]);
        }

        if function.address == storage_address && function.module == contract::MODULE_NAME {
            match StorageFunction::from_name(&function.name) {
                Some(StorageFunction::Get) => {
                    let address = address_arg(0)?;
                    return Ok(vec![json!(self.storage.get(&address).to_string())]);
                }
                Some(StorageFunction::MeaningOfView) => {
                    return Ok(vec![json!(ValueStore::meaning_of_view().to_string())]);
                }
                Some(StorageFunction::Store) | None => {}
            }
        }

        Err(AgentError::api(
            400,
            format!("{} is not a view function or does not exist", function),
        ))
    }
}

#[async_trait]
impl LedgerClient for InMemoryLedger {
    fn name(&self) -> &str {
        "memory"
    }

    async fn account_balance(&self, address: AccountAddress) -> AgentResult<u64> {
        self.round_trip("account_balance").await;
        let state = self.state.read().await;
        Ok(state.accounts.get(&address).map(|a| a.balance).unwrap_or(0))
    }

    async fn fund_account(&self, address: AccountAddress, octas: u64) -> AgentResult<Vec<String>> {
        self.round_trip("fund_account").await;
        let mut guard = self.state.write().await;
        let state = &mut *guard;

        let account = state.accounts.entry(address).or_default();
        account.balance = account.balance.saturating_add(octas);

        let sequence_number = state.faucet_sequence;
        state.faucet_sequence += 1;
        let payload = json!({
            "type": "entry_function_payload",
            "function": "0x1::aptos_account::transfer",
            "type_arguments": [],
            "arguments": [address.to_string(), octas.to_string()],
        });
        let hash = state.record(FAUCET_ADDRESS, sequence_number, payload, TransactionStatus::Succeeded);

        info!("Faucet credited {} octas to {}", octas, address);
        Ok(vec![hash])
    }

    async fn submit_transaction(&self, sender: &LocalAccount, call: &FunctionCall) -> AgentResult<String> {
        self.round_trip("submit_transaction").await;
        let sender = sender.address();
        let mut guard = self.state.write().await;
        let state = &mut *guard;

        let fee = GAS_PER_TRANSACTION * GAS_UNIT_PRICE;
        let account = state.accounts.get_mut(&sender).ok_or_else(|| {
            AgentError::api(
                400,
                "Invalid transaction: Type: Validation Code: SENDING_ACCOUNT_DOES_NOT_EXIST",
            )
        })?;
        if account.balance < fee {
            return Err(AgentError::api(
                400,
                "Invalid transaction: Type: Validation Code: INSUFFICIENT_BALANCE_FOR_TRANSACTION_FEE",
            ));
        }
        account.balance -= fee;
        let sequence_number = account.sequence_number;
        account.sequence_number += 1;

        let status = state.execute(sender, call, self.storage_address);
        debug!("Executed {} from {}: {}", call.function, sender, status);
        Ok(state.record(sender, sequence_number, call.entry_payload(), status))
    }

    async fn transaction_by_hash(&self, hash: &str) -> AgentResult<TransactionRecord> {
        self.round_trip("transaction_by_hash").await;
        let state = self.state.read().await;
        Ok(state
            .transactions
            .get(hash)
            .cloned()
            .unwrap_or_else(|| TransactionRecord::pending(hash)))
    }

    async fn account_resources(&self, address: AccountAddress) -> AgentResult<Vec<AccountResource>> {
        self.round_trip("account_resources").await;
        let state = self.state.read().await;
        let mut resources = Vec::new();

        if let Some(account) = state.accounts.get(&address) {
            resources.push(AccountResource {
                resource_type: "0x1::account::Account".to_string(),
                data: json!({
                    "authentication_key": address.to_string(),
                    "sequence_number": account.sequence_number.to_string(),
                }),
            });
            resources.push(AccountResource {
                resource_type: format!("0x1::coin::CoinStore<{}>", APTOS_COIN_TYPE),
                data: json!({ "coin": { "value": account.balance.to_string() } }),
            });
        }
        if let Some(resource) = state.storage.resource(&self.storage_address, &address) {
            resources.push(resource);
        }
        if let Some(extra) = state.published.get(&address) {
            resources.extend(extra.iter().cloned());
        }

        Ok(resources)
    }

    async fn account_modules(&self, address: AccountAddress, limit: usize) -> AgentResult<Vec<MoveModule>> {
        self.round_trip("account_modules").await;

        let modules = if address == self.storage_address {
            vec![module(contract::module_abi(&address))]
        } else if address == FRAMEWORK_ADDRESS {
            Self::framework_modules()
        } else if address == LAUNCHPAD_ADDRESS {
            Self::launchpad_modules()
        } else {
            Vec::new()
        };

        Ok(modules.into_iter().take(limit).collect())
    }

    async fn view(&self, call: &FunctionCall) -> AgentResult<Vec<Value>> {
        self.round_trip("view").await;
        let state = self.state.read().await;
        state.evaluate_view(call, self.storage_address)
    }
}
