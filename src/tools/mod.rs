use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt::Display;
use tracing::{debug, warn};

pub mod chain;

pub use chain::{ChainTools, ToolOptions};

use crate::error::AgentError;
use crate::ledger::AddressArg;

/// What a tool call hands back to the agent: plain text plus optional
/// structured data, or a human-readable failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolOutput {
    pub success: bool,
    pub content: String,
    pub data: Option<Value>,
    pub error: Option<String>,
}

impl ToolOutput {
    pub fn ok(content: impl Into<String>) -> Self {
        Self {
            success: true,
            content: content.into(),
            data: None,
            error: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn failure(context: &str, error: impl Display) -> Self {
        let message = format!("{}: {}", context, error);
        warn!("{}", message);
        Self {
            success: false,
            content: String::new(),
            data: None,
            error: Some(message),
        }
    }

    /// A failure whose `data.error_kind` says where it came from: `bridge`
    /// for lifecycle misuse, `validation` for bad input, `network` for the
    /// node or faucet, `internal` for anything else.
    pub fn from_error(context: &str, error: &AgentError) -> Self {
        let kind = if error.is_misuse() {
            "bridge"
        } else if error.is_validation() {
            "validation"
        } else if error.is_network() {
            "network"
        } else {
            "internal"
        };
        Self::failure(context, error).with_data(json!({ "error_kind": kind }))
    }
}

/// A tool as described to the agent. `mutating` tools submit transactions;
/// the rest are answered from read-only queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub mutating: bool,
}

pub const TOOL_SPECS: &[ToolSpec] = &[
    ToolSpec {
        name: "get_user_wallet",
        description: "Returns the user's configured wallet address, if any.",
        mutating: false,
    },
    ToolSpec {
        name: "get_balance",
        description: "Balance of an address in APT. Defaults to the configured identity.",
        mutating: false,
    },
    ToolSpec {
        name: "fund_wallet",
        description: "Requests up to 1000 APT from the test-network faucet for an address.",
        mutating: true,
    },
    ToolSpec {
        name: "transfer",
        description: "Transfers an amount in octas from the agent's wallet to a receiver.",
        mutating: true,
    },
    ToolSpec {
        name: "create_token",
        description: "Creates a fungible asset with a name, symbol, icon URI and project URI.",
        mutating: true,
    },
    ToolSpec {
        name: "get_transaction",
        description: "Status, payload, gas usage and timestamp of a transaction by hash.",
        mutating: false,
    },
    ToolSpec {
        name: "get_account_resources",
        description: "All resources stored under an address.",
        mutating: false,
    },
    ToolSpec {
        name: "get_account_modules",
        description: "Modules published by an address, with their ABIs.",
        mutating: false,
    },
    ToolSpec {
        name: "get_token_balance",
        description: "Balance of a specific token held in an account's token store.",
        mutating: false,
    },
    ToolSpec {
        name: "execute_view_function",
        description: "Evaluates a view function without submitting a transaction.",
        mutating: false,
    },
    ToolSpec {
        name: "execute_entry_function",
        description: "Submits a transaction calling an entry function, validated against its ABI.",
        mutating: true,
    },
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tool", rename_all = "snake_case")]
pub enum ToolInput {
    GetUserWallet,
    GetBalance {
        #[serde(default)]
        address: Option<String>,
    },
    FundWallet {
        #[serde(default)]
        amount: Option<u64>,
        #[serde(default)]
        address: Option<String>,
    },
    Transfer {
        receiver: AddressArg,
        amount: u64,
    },
    CreateToken {
        name: String,
        symbol: String,
        icon_uri: String,
        project_uri: String,
    },
    GetTransaction {
        hash: String,
    },
    GetAccountResources {
        #[serde(default)]
        address: Option<String>,
    },
    GetAccountModules {
        #[serde(default)]
        address: Option<String>,
        #[serde(default)]
        limit: Option<usize>,
    },
    GetTokenBalance {
        address: String,
        creator_address: String,
        collection_name: String,
        token_name: String,
    },
    ExecuteViewFunction {
        function_id: String,
        #[serde(default)]
        type_args: Vec<String>,
        #[serde(default)]
        args: Vec<Value>,
    },
    ExecuteEntryFunction {
        function_id: String,
        #[serde(default)]
        type_args: Vec<String>,
        #[serde(default)]
        args: Vec<Value>,
    },
}

impl ToolInput {
    pub fn name(&self) -> &'static str {
        match self {
            ToolInput::GetUserWallet => "get_user_wallet",
            ToolInput::GetBalance { .. } => "get_balance",
            ToolInput::FundWallet { .. } => "fund_wallet",
            ToolInput::Transfer { .. } => "transfer",
            ToolInput::CreateToken { .. } => "create_token",
            ToolInput::GetTransaction { .. } => "get_transaction",
            ToolInput::GetAccountResources { .. } => "get_account_resources",
            ToolInput::GetAccountModules { .. } => "get_account_modules",
            ToolInput::GetTokenBalance { .. } => "get_token_balance",
            ToolInput::ExecuteViewFunction { .. } => "execute_view_function",
            ToolInput::ExecuteEntryFunction { .. } => "execute_entry_function",
        }
    }

    pub fn spec(&self) -> Option<&'static ToolSpec> {
        TOOL_SPECS.iter().find(|spec| spec.name == self.name())
    }

    pub fn is_mutating(&self) -> bool {
        self.spec().map(|spec| spec.mutating).unwrap_or(true)
    }
}

pub struct ToolRegistry {
    tools: ChainTools,
}

impl ToolRegistry {
    pub fn new(tools: ChainTools) -> Self {
        Self { tools }
    }

    pub fn tools(&self) -> &ChainTools {
        &self.tools
    }

    pub fn execute(&self, input: ToolInput) -> ToolOutput {
        debug!("Executing tool {}", input.name());
        let tools = &self.tools;

        match input {
            ToolInput::GetUserWallet => tools.get_user_wallet(),
            ToolInput::GetBalance { address } => tools.get_balance_in_apt(address.as_deref()),
            ToolInput::FundWallet { amount, address } => tools.fund_wallet_in_apt(amount, address.as_deref()),
            ToolInput::Transfer { receiver, amount } => tools.transfer_in_octa(receiver, amount, None),
            ToolInput::CreateToken {
                name,
                symbol,
                icon_uri,
                project_uri,
            } => tools.create_token(&name, &symbol, &icon_uri, &project_uri),
            ToolInput::GetTransaction { hash } => tools.get_transaction(&hash),
            ToolInput::GetAccountResources { address } => tools.get_account_resources(address.as_deref()),
            ToolInput::GetAccountModules { address, limit } => {
                tools.get_account_modules(address.as_deref(), limit)
            }
            ToolInput::GetTokenBalance {
                address,
                creator_address,
                collection_name,
                token_name,
            } => tools.get_token_balance(&address, &creator_address, &collection_name, &token_name),
            ToolInput::ExecuteViewFunction {
                function_id,
                type_args,
                args,
            } => tools.execute_view_function(&function_id, type_args, args),
            ToolInput::ExecuteEntryFunction {
                function_id,
                type_args,
                args,
            } => tools.execute_entry_function(&function_id, type_args, args),
        }
    }

    /// Parses a `{"tool": "...", ...}` call and executes it.
    pub fn execute_json(&self, call: &str) -> ToolOutput {
        match serde_json::from_str::<ToolInput>(call) {
            Ok(input) => self.execute(input),
            Err(e) => ToolOutput::failure("Error parsing tool call", e),
        }
    }

    pub fn list_tools(&self) -> &'static [ToolSpec] {
        TOOL_SPECS
    }
}
