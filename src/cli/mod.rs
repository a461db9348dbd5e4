use clap::{Parser, Subcommand, ValueEnum};
use serde_json::Value;
use std::path::PathBuf;

use crate::ledger::AddressArg;
use crate::tools::ToolInput;

#[derive(Parser, Debug)]
#[command(name = "aptos-agent")]
#[command(about = "Ledger tools for agents, one blocking call at a time")]
#[command(long_about = "Runs wallet, token, transaction and Move function tools against an Aptos-style ledger through a synchronous bridge")]
#[command(version)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to the config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Ledger backend
    #[arg(long, value_enum, global = true, default_value = "rest")]
    pub ledger: LedgerKind,

    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum LedgerKind {
    /// The configured REST node and faucet
    Rest,
    /// An in-process ledger, forgotten on exit
    Memory,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the user's configured wallet
    Wallet,

    /// Show a balance in APT
    Balance {
        /// Address to query (defaults to the configured identity)
        address: Option<String>,
    },

    /// Request APT from the faucet
    Fund {
        /// Amount in APT, at most 1000
        amount: u64,
        /// Address to fund (defaults to the configured identity)
        #[arg(long)]
        address: Option<String>,
    },

    /// Transfer octas from the agent's wallet
    Transfer {
        /// Receiver address
        receiver: String,
        /// Amount in octas
        amount: u64,
    },

    /// Create a fungible asset through the launchpad module
    CreateToken {
        name: String,
        symbol: String,
        icon_uri: String,
        project_uri: String,
    },

    /// Look up a transaction by hash
    Tx {
        hash: String,
    },

    /// List account resources
    Resources {
        address: Option<String>,
    },

    /// List account modules
    Modules {
        address: Option<String>,
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Look up a token in an account's token store
    TokenBalance {
        address: String,
        creator_address: String,
        collection_name: String,
        token_name: String,
    },

    /// Evaluate a view function
    View {
        /// Function id, `address::module::function`
        function_id: String,
        /// Arguments; JSON values are passed through, anything else as a string
        args: Vec<String>,
        #[arg(short = 't', long = "type-arg")]
        type_args: Vec<String>,
    },

    /// Submit an entry function call
    Entry {
        /// Function id, `address::module::function`
        function_id: String,
        /// Arguments; JSON values are passed through, anything else as a string
        args: Vec<String>,
        #[arg(short = 't', long = "type-arg")]
        type_args: Vec<String>,
        /// Fetch the module ABI when it was not listed first
        #[arg(long)]
        fetch_abi: bool,
    },

    /// List the available tools
    Tools,

    /// Execute a JSON tool call, e.g. '{"tool":"get_balance"}'
    Call {
        json: String,
    },

    /// Write a default config file
    ConfigInit {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

impl Commands {
    /// The tool call this command maps to, if it maps to one.
    pub fn tool_input(&self) -> Option<ToolInput> {
        let input = match self {
            Commands::Wallet => ToolInput::GetUserWallet,
            Commands::Balance { address } => ToolInput::GetBalance {
                address: address.clone(),
            },
            Commands::Fund { amount, address } => ToolInput::FundWallet {
                amount: Some(*amount),
                address: address.clone(),
            },
            Commands::Transfer { receiver, amount } => ToolInput::Transfer {
                receiver: AddressArg::from(receiver.as_str()),
                amount: *amount,
            },
            Commands::CreateToken {
                name,
                symbol,
                icon_uri,
                project_uri,
            } => ToolInput::CreateToken {
                name: name.clone(),
                symbol: symbol.clone(),
                icon_uri: icon_uri.clone(),
                project_uri: project_uri.clone(),
            },
            Commands::Tx { hash } => ToolInput::GetTransaction { hash: hash.clone() },
            Commands::Resources { address } => ToolInput::GetAccountResources {
                address: address.clone(),
            },
            Commands::Modules { address, limit } => ToolInput::GetAccountModules {
                address: address.clone(),
                limit: *limit,
            },
            Commands::TokenBalance {
                address,
                creator_address,
                collection_name,
                token_name,
            } => ToolInput::GetTokenBalance {
                address: address.clone(),
                creator_address: creator_address.clone(),
                collection_name: collection_name.clone(),
                token_name: token_name.clone(),
            },
            Commands::View {
                function_id,
                args,
                type_args,
            } => ToolInput::ExecuteViewFunction {
                function_id: function_id.clone(),
                type_args: type_args.clone(),
                args: args.iter().map(|arg| parse_arg(arg)).collect(),
            },
            Commands::Entry {
                function_id,
                args,
                type_args,
                ..
            } => ToolInput::ExecuteEntryFunction {
                function_id: function_id.clone(),
                type_args: type_args.clone(),
                args: args.iter().map(|arg| parse_arg(arg)).collect(),
            },
            Commands::Tools | Commands::Call { .. } | Commands::ConfigInit { .. } => return None,
        };
        Some(input)
    }
}

/// Reads a command-line argument as JSON, falling back to a plain string so
/// addresses and words need no quoting.
pub fn parse_arg(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}
