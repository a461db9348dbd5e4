use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info};

use super::ToolOutput;
use crate::bridge::Bridge;
use crate::chain::{self, WaitOptions};
use crate::config::AgentConfig;
use crate::error::{AgentError, AgentResult};
use crate::ledger::{
    AccountAddress, AddressArg, FunctionCall, FunctionId, FunctionKind, FunctionRequest, LedgerClient,
    LocalAccount, MoveModule, MAX_FAUCET_APT,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolOptions {
    pub module_limit: usize,
    pub fetch_missing_abi: bool,
    pub wait: WaitOptions,
}

impl Default for ToolOptions {
    fn default() -> Self {
        Self {
            module_limit: 10,
            fetch_missing_abi: false,
            wait: WaitOptions::default(),
        }
    }
}

impl ToolOptions {
    pub fn from_config(config: &AgentConfig) -> Self {
        Self {
            module_limit: config.modules.module_limit,
            fetch_missing_abi: config.modules.fetch_missing_abi,
            wait: WaitOptions {
                poll_interval: config.transactions.wait_poll_interval(),
                max_attempts: config.transactions.wait_max_attempts,
            },
        }
    }
}

/// Synchronous ledger tools for an agent.
///
/// Every method blocks on the shared [`Bridge`] and never fails outright:
/// errors come back as a failed [`ToolOutput`] and leave the bridge usable
/// for the next call.
///
/// `default_identity` is the address balance and funding requests use when
/// the caller names none. Hosts usually pass the user's configured wallet,
/// or the agent's own address when there is no user wallet. Resource and
/// module listings default to the agent's own address.
pub struct ChainTools {
    bridge: Arc<Bridge>,
    ledger: Arc<dyn LedgerClient>,
    wallet: LocalAccount,
    default_identity: AccountAddress,
    user_wallet: Option<AccountAddress>,
    abi_cache: Mutex<HashMap<AccountAddress, Vec<MoveModule>>>,
    options: ToolOptions,
}

impl ChainTools {
    pub fn new(
        bridge: Arc<Bridge>,
        ledger: Arc<dyn LedgerClient>,
        wallet: LocalAccount,
        default_identity: AccountAddress,
    ) -> Self {
        Self {
            bridge,
            ledger,
            wallet,
            default_identity,
            user_wallet: None,
            abi_cache: Mutex::new(HashMap::new()),
            options: ToolOptions::default(),
        }
    }

    pub fn with_user_wallet(mut self, user_wallet: Option<AccountAddress>) -> Self {
        self.user_wallet = user_wallet;
        self
    }

    pub fn with_options(mut self, options: ToolOptions) -> Self {
        self.options = options;
        self
    }

    pub fn wallet(&self) -> &LocalAccount {
        &self.wallet
    }

    pub fn default_identity(&self) -> AccountAddress {
        self.default_identity
    }

    pub fn bridge(&self) -> &Bridge {
        &self.bridge
    }

    fn resolve(address: Option<&str>, fallback: AccountAddress) -> AgentResult<AccountAddress> {
        match address.map(str::trim).filter(|a| !a.is_empty()) {
            Some(text) => AccountAddress::from_hex(text),
            None => Ok(fallback),
        }
    }

    fn cached_modules(&self, address: &AccountAddress) -> Vec<MoveModule> {
        let cache = self.abi_cache.lock().unwrap_or_else(PoisonError::into_inner);
        cache.get(address).cloned().unwrap_or_default()
    }

    fn cache_modules(&self, address: AccountAddress, modules: Vec<MoveModule>) {
        let mut cache = self.abi_cache.lock().unwrap_or_else(PoisonError::into_inner);
        cache.insert(address, modules);
    }

    pub fn get_user_wallet(&self) -> ToolOutput {
        match self.user_wallet {
            Some(address) => ToolOutput::ok(address.to_string()).with_data(json!({ "address": address })),
            None => ToolOutput::ok("No user wallet is configured"),
        }
    }

    pub fn get_balance_in_apt(&self, address: Option<&str>) -> ToolOutput {
        let result = Self::resolve(address, self.default_identity).and_then(|target| {
            self.bridge
                .run(chain::get_balance(self.ledger.as_ref(), target))
                .map(|balance| (target, balance))
        });

        match result {
            Ok((target, balance)) => ToolOutput::ok(format!("{}", balance)).with_data(json!({
                "address": target,
                "octas": balance.octas,
                "apt": balance.apt(),
            })),
            Err(e) => ToolOutput::from_error("Error getting balance", &e),
        }
    }

    pub fn fund_wallet_in_apt(&self, amount: Option<u64>, target: Option<&str>) -> ToolOutput {
        let Some(amount) = amount else {
            return ToolOutput::failure(
                "Error funding wallet",
                format!("Please specify an amount of APT to fund (maximum {} APT)", MAX_FAUCET_APT),
            );
        };

        let result = Self::resolve(target, self.default_identity).and_then(|target| {
            // Checked here as well so an oversized request never reaches the bridge.
            chain::validate_faucet_amount(amount)?;
            self.bridge.run(chain::fund_wallet(
                self.ledger.as_ref(),
                target,
                amount,
                self.options.wait,
            ))
        });

        match result {
            Ok(funded) => ToolOutput::ok(format!("Funded wallet {} with {} APT", funded, amount))
                .with_data(json!({ "address": funded, "amount_apt": amount })),
            Err(e) => ToolOutput::from_error("Error funding wallet", &e),
        }
    }

    /// Sends from `sender`, or from the agent's wallet when `None`.
    pub fn transfer_in_octa(&self, receiver: AddressArg, amount: u64, sender: Option<&LocalAccount>) -> ToolOutput {
        let sender = sender.unwrap_or(&self.wallet);
        let result = self
            .bridge
            .run(chain::transfer(self.ledger.as_ref(), sender, &receiver, amount));

        match result {
            Ok(hash) => ToolOutput::ok(format!("Transfer submitted: {}", hash))
                .with_data(json!({ "hash": hash, "amount_octas": amount })),
            Err(e) => ToolOutput::from_error("Error transferring funds", &e),
        }
    }

    pub fn create_token(&self, name: &str, symbol: &str, icon_uri: &str, project_uri: &str) -> ToolOutput {
        let result = self.bridge.run(chain::create_token(
            self.ledger.as_ref(),
            &self.wallet,
            name,
            symbol,
            icon_uri,
            project_uri,
        ));

        match result {
            Ok(hash) => ToolOutput::ok(format!("Token creation submitted: {}", hash)).with_data(json!({ "hash": hash })),
            Err(e) => ToolOutput::from_error("Error creating token", &e),
        }
    }

    pub fn get_transaction(&self, hash: &str) -> ToolOutput {
        match self.bridge.run(chain::get_transaction(self.ledger.as_ref(), hash)) {
            Ok(record) => {
                let content = format!("Transaction {} is {}", record.hash, record.status);
                match serde_json::to_value(&record) {
                    Ok(data) => ToolOutput::ok(content).with_data(data),
                    Err(e) => ToolOutput::failure("Error getting transaction", e),
                }
            }
            Err(e) => ToolOutput::from_error("Error getting transaction", &e),
        }
    }

    pub fn get_account_resources(&self, address: Option<&str>) -> ToolOutput {
        let result = Self::resolve(address, self.wallet.address()).and_then(|target| {
            debug!("target_address: {}", target);
            self.bridge
                .run(chain::get_account_resources(self.ledger.as_ref(), target))
        });

        match result {
            Ok(resources) if resources.is_empty() => {
                ToolOutput::ok("No resources found for this account").with_data(json!([]))
            }
            Ok(resources) => ToolOutput::ok(format!("{} resources found", resources.len()))
                .with_data(json!(resources)),
            Err(e) => ToolOutput::from_error("Error getting account resources", &e),
        }
    }

    /// Lists modules and remembers their ABIs for later entry calls.
    pub fn get_account_modules(&self, address: Option<&str>, limit: Option<usize>) -> ToolOutput {
        let limit = limit.unwrap_or(self.options.module_limit);
        let result = Self::resolve(address, self.wallet.address()).and_then(|target| {
            self.bridge
                .run(chain::get_account_modules(self.ledger.as_ref(), target, limit))
                .map(|listing| (target, listing))
        });

        match result {
            Ok((_, listing)) if listing.modules.is_empty() => ToolOutput::ok("No modules found for this account"),
            Ok((target, listing)) => {
                self.cache_modules(target, listing.modules.clone());
                info!("Cached {} module ABIs for {}", listing.modules.len(), target);
                ToolOutput::ok(format!("{} modules found. {}", listing.modules.len(), listing.note))
                    .with_data(json!(listing))
            }
            Err(e) => ToolOutput::from_error("Error getting account modules", &e),
        }
    }

    pub fn get_token_balance(
        &self,
        address: &str,
        creator_address: &str,
        collection_name: &str,
        token_name: &str,
    ) -> ToolOutput {
        let result = AccountAddress::from_hex(address).and_then(|target| {
            self.bridge.run(chain::get_token_balance(
                self.ledger.as_ref(),
                target,
                creator_address,
                collection_name,
                token_name,
            ))
        });

        match result {
            Ok(Some(token)) => ToolOutput::ok(token.to_string()).with_data(token),
            Ok(None) => ToolOutput::ok("Token not found"),
            Err(e) => ToolOutput::from_error("Error getting token balance", &e),
        }
    }

    fn function_request(
        kind: FunctionKind,
        function_id: &str,
        type_args: Vec<String>,
        args: Vec<Value>,
    ) -> AgentResult<FunctionRequest> {
        let function = function_id.parse::<FunctionId>()?;
        Ok(FunctionRequest::new(
            kind,
            FunctionCall {
                function,
                type_arguments: type_args,
                arguments: args,
            },
        ))
    }

    pub fn execute_view_function(&self, function_id: &str, type_args: Vec<String>, args: Vec<Value>) -> ToolOutput {
        match Self::function_request(FunctionKind::View, function_id, type_args, args) {
            Ok(request) => self.execute_function(request),
            Err(e) => ToolOutput::from_error("Error executing view function", &e),
        }
    }

    /// Submits an entry call after validating it against the module ABI
    /// cached by [`get_account_modules`](Self::get_account_modules), or
    /// fetched on demand when `fetch_missing_abi` is set.
    pub fn execute_entry_function(&self, function_id: &str, type_args: Vec<String>, args: Vec<Value>) -> ToolOutput {
        match Self::function_request(FunctionKind::Entry, function_id, type_args, args) {
            Ok(request) => self.execute_function(request),
            Err(e) => ToolOutput::from_error("Error executing entry function", &e),
        }
    }

    /// Views are answered from the query path; entry calls are signed by the
    /// agent's wallet and submitted.
    pub fn execute_function(&self, request: FunctionRequest) -> ToolOutput {
        let kind = request.kind();
        let call = request.into_call();
        debug!("Executing {:?} function {}", kind, call.function);

        if kind.is_mutating() {
            match self.submit_entry(call) {
                Ok(hash) => ToolOutput::ok(format!("Transaction submitted: {}", hash))
                    .with_data(json!({ "txn_hash": hash })),
                Err(e) => ToolOutput::from_error("Error executing entry function", &e),
            }
        } else {
            match self.bridge.run(chain::execute_view_function(self.ledger.as_ref(), &call)) {
                Ok(values) => {
                    ToolOutput::ok(Value::Array(values.clone()).to_string()).with_data(Value::Array(values))
                }
                Err(e) => ToolOutput::from_error("Error executing view function", &e),
            }
        }
    }

    fn submit_entry(&self, call: FunctionCall) -> AgentResult<String> {
        let FunctionCall {
            function,
            type_arguments,
            arguments,
        } = call;
        let cached = self.cached_modules(&function.address);
        let ledger = self.ledger.as_ref();
        let options = self.options;

        let (hash, fetched) = self.bridge.run(async {
            let (abi, fetched) = chain::resolve_function_abi(
                ledger,
                &function,
                &cached,
                options.fetch_missing_abi,
                options.module_limit,
            )
            .await?;
            let owner = function.address;
            let hash =
                chain::execute_entry_function(ledger, &self.wallet, function, &abi, type_arguments, &arguments).await?;
            Ok::<_, AgentError>((hash, fetched.map(|modules| (owner, modules))))
        })?;

        if let Some((owner, modules)) = fetched {
            self.cache_modules(owner, modules);
        }
        Ok(hash)
    }
}
