// Storage contract: one u64 per account, created on first store
use serde_json::json;
use std::collections::HashMap;

use crate::ledger::{
    AccountAddress, AccountResource, FunctionKind, LocalAccount, ModuleAbi, MoveFunction,
};

pub const MODULE_NAME: &str = "storage";
pub const RESOURCE_NAME: &str = "Storage";
pub const MEANING_OF_VIEW: u64 = 42;

/// An authenticated transaction sender, as handed to entry functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signer {
    address: AccountAddress,
}

impl Signer {
    /// Only the holder of the account's key can produce its signer.
    pub fn from_account(account: &LocalAccount) -> Self {
        Self {
            address: account.address(),
        }
    }

    /// Signer for a sender whose signature the ledger has already checked.
    pub(crate) fn authenticated(address: AccountAddress) -> Self {
        Self { address }
    }

    pub fn address(&self) -> AccountAddress {
        self.address
    }
}

/// Per-account `Storage { value: u64 }` resources.
///
/// An address is either absent or holds exactly one value. `store` creates
/// or overwrites; there is no removal.
#[derive(Debug, Default, Clone)]
pub struct ValueStore {
    values: HashMap<AccountAddress, u64>,
}

impl ValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(&mut self, owner: &Signer, value: u64) {
        self.values.insert(owner.address(), value);
    }

    pub fn get(&self, address: &AccountAddress) -> u64 {
        self.values.get(address).copied().unwrap_or(0)
    }

    pub fn exists(&self, address: &AccountAddress) -> bool {
        self.values.contains_key(address)
    }

    pub fn meaning_of_view() -> u64 {
        MEANING_OF_VIEW
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The resource as the ledger reports it for `address`, if present.
    pub fn resource(&self, module_address: &AccountAddress, address: &AccountAddress) -> Option<AccountResource> {
        self.values.get(address).map(|value| AccountResource {
            resource_type: resource_type(module_address),
            data: json!({ "value": value.to_string() }),
        })
    }
}

pub fn resource_type(module_address: &AccountAddress) -> String {
    format!("{}::{}::{}", module_address, MODULE_NAME, RESOURCE_NAME)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageFunction {
    Store,
    Get,
    MeaningOfView,
}

impl StorageFunction {
    pub const ALL: [StorageFunction; 3] = [
        StorageFunction::Store,
        StorageFunction::Get,
        StorageFunction::MeaningOfView,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            StorageFunction::Store => "store",
            StorageFunction::Get => "get",
            StorageFunction::MeaningOfView => "meaning_of_view",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.name() == name)
    }

    pub fn kind(&self) -> FunctionKind {
        match self {
            StorageFunction::Store => FunctionKind::Entry,
            StorageFunction::Get | StorageFunction::MeaningOfView => FunctionKind::View,
        }
    }

    pub fn abi(&self) -> MoveFunction {
        let (params, returns) = match self {
            StorageFunction::Store => (vec!["&signer", "u64"], vec![]),
            StorageFunction::Get => (vec!["address"], vec!["u64"]),
            StorageFunction::MeaningOfView => (vec![], vec!["u64"]),
        };

        MoveFunction {
            name: self.name().to_string(),
            visibility: "public".to_string(),
            is_entry: self.kind() == FunctionKind::Entry,
            is_view: self.kind() == FunctionKind::View,
            generic_type_params: Vec::new(),
            params: params.into_iter().map(String::from).collect(),
            returns: returns.into_iter().map(String::from).collect(),
        }
    }
}

pub fn module_abi(module_address: &AccountAddress) -> ModuleAbi {
    ModuleAbi {
        address: module_address.to_string(),
        name: MODULE_NAME.to_string(),
        friends: Vec::new(),
        exposed_functions: StorageFunction::ALL.iter().map(StorageFunction::abi).collect(),
        structs: vec![json!({
            "name": RESOURCE_NAME,
            "is_native": false,
            "abilities": ["key"],
            "generic_type_params": [],
            "fields": [{ "name": "value", "type": "u64" }],
        })],
    }
}
