// Ledger access: addresses, accounts, wire types and the client seam
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::error::{AgentError, AgentResult};

pub mod account;
pub mod address;
pub mod function;
pub mod memory;
pub mod rest;

pub use account::LocalAccount;
pub use address::{AccountAddress, AddressArg};
pub use function::{ArgValue, FunctionCall, FunctionId, FunctionKind, FunctionRequest};
pub use memory::InMemoryLedger;
pub use rest::RestLedger;

/// Smallest ledger unit per APT.
pub const OCTAS_PER_APT: u64 = 100_000_000;

/// Largest faucet request accepted, in APT.
pub const MAX_FAUCET_APT: u64 = 1000;

pub const APTOS_COIN_TYPE: &str = "0x1::aptos_coin::AptosCoin";

pub fn apt_to_octas(apt: u64) -> AgentResult<u64> {
    apt.checked_mul(OCTAS_PER_APT)
        .ok_or_else(|| AgentError::validation(format!("{} APT overflows the octa range", apt)))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    pub octas: u64,
}

impl Balance {
    pub fn from_octas(octas: u64) -> Self {
        Self { octas }
    }

    pub fn apt(&self) -> f64 {
        self.octas as f64 / OCTAS_PER_APT as f64
    }
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{:08} APT",
            self.octas / OCTAS_PER_APT,
            self.octas % OCTAS_PER_APT
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TransactionStatus {
    /// Unknown to the node so far: still propagating, or never submitted.
    Pending,
    Succeeded,
    Failed { vm_status: String },
}

impl TransactionStatus {
    pub fn is_pending(&self) -> bool {
        matches!(self, TransactionStatus::Pending)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, TransactionStatus::Succeeded)
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionStatus::Pending => write!(f, "pending"),
            TransactionStatus::Succeeded => write!(f, "succeeded"),
            TransactionStatus::Failed { vm_status } => write!(f, "failed ({})", vm_status),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub hash: String,
    #[serde(flatten)]
    pub status: TransactionStatus,
    pub sender: Option<AccountAddress>,
    pub sequence_number: Option<u64>,
    pub payload: Value,
    pub gas_used: u64,
    pub timestamp_us: Option<u64>,
}

impl TransactionRecord {
    pub fn pending(hash: impl Into<String>) -> Self {
        Self {
            hash: hash.into(),
            status: TransactionStatus::Pending,
            sender: None,
            sequence_number: None,
            payload: Value::Null,
            gas_used: 0,
            timestamp_us: None,
        }
    }

    /// Reads a transaction as returned by the node's REST API.
    pub fn from_json(hash: &str, json: &Value) -> Self {
        let status = if json["type"].as_str() == Some("pending_transaction") {
            TransactionStatus::Pending
        } else if json["success"].as_bool().unwrap_or(false) {
            TransactionStatus::Succeeded
        } else {
            TransactionStatus::Failed {
                vm_status: json["vm_status"].as_str().unwrap_or("unknown").to_string(),
            }
        };

        Self {
            hash: json["hash"].as_str().unwrap_or(hash).to_string(),
            status,
            sender: json["sender"]
                .as_str()
                .and_then(|s| AccountAddress::from_hex(s).ok()),
            sequence_number: json_u64(&json["sequence_number"]),
            payload: json.get("payload").cloned().unwrap_or(Value::Null),
            gas_used: json_u64(&json["gas_used"]).unwrap_or(0),
            timestamp_us: json_u64(&json["timestamp"]),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountResource {
    #[serde(rename = "type")]
    pub resource_type: String,
    pub data: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveModule {
    pub bytecode: String,
    #[serde(default)]
    pub abi: Option<ModuleAbi>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleAbi {
    pub address: String,
    pub name: String,
    #[serde(default)]
    pub friends: Vec<String>,
    #[serde(default)]
    pub exposed_functions: Vec<MoveFunction>,
    #[serde(default)]
    pub structs: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveFunction {
    pub name: String,
    #[serde(default)]
    pub visibility: String,
    #[serde(default)]
    pub is_entry: bool,
    #[serde(default)]
    pub is_view: bool,
    #[serde(default)]
    pub generic_type_params: Vec<Value>,
    #[serde(default)]
    pub params: Vec<String>,
    #[serde(default, rename = "return")]
    pub returns: Vec<String>,
}

impl MoveFunction {
    /// `None` for public functions that are neither entry nor view; those
    /// cannot be invoked from outside the ledger.
    pub fn kind(&self) -> Option<FunctionKind> {
        if self.is_view {
            Some(FunctionKind::View)
        } else if self.is_entry {
            Some(FunctionKind::Entry)
        } else {
            None
        }
    }
}

/// Finds `id` among module ABIs previously listed for its address.
pub fn find_function<'a>(modules: &'a [MoveModule], id: &FunctionId) -> Option<&'a MoveFunction> {
    modules
        .iter()
        .filter_map(|module| module.abi.as_ref())
        .filter(|abi| abi.name == id.module)
        .flat_map(|abi| abi.exposed_functions.iter())
        .find(|function| function.name == id.name)
}

/// Access to a ledger node and its faucet.
///
/// Absence is not an error anywhere on this trait: unknown accounts have no
/// resources and a zero balance, unknown transactions are pending.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    fn name(&self) -> &str;

    /// Balance in octas.
    async fn account_balance(&self, address: AccountAddress) -> AgentResult<u64>;

    /// Asks the faucet to credit `octas`; returns the faucet's transaction hashes.
    async fn fund_account(&self, address: AccountAddress, octas: u64) -> AgentResult<Vec<String>>;

    /// Signs and submits an entry function call; returns the transaction hash
    /// once the node has acknowledged it.
    async fn submit_transaction(&self, sender: &LocalAccount, call: &FunctionCall) -> AgentResult<String>;

    async fn transaction_by_hash(&self, hash: &str) -> AgentResult<TransactionRecord>;

    async fn account_resources(&self, address: AccountAddress) -> AgentResult<Vec<AccountResource>>;

    async fn account_modules(&self, address: AccountAddress, limit: usize) -> AgentResult<Vec<MoveModule>>;

    /// Read-only function evaluation. Never submits a transaction.
    async fn view(&self, call: &FunctionCall) -> AgentResult<Vec<Value>>;
}

/// The REST API encodes 64-bit integers as strings.
pub(crate) fn json_u64(value: &Value) -> Option<u64> {
    match value {
        Value::String(text) => text.parse().ok(),
        Value::Number(number) => number.as_u64(),
        _ => None,
    }
}
