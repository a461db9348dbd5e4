//! # aptos-agent - Ledger tools for synchronous agent hosts
//!
//! aptos-agent exposes an Aptos-style ledger to a host that works one
//! blocking call at a time, such as a language-model agent loop. Every
//! ledger operation is asynchronous internally and is driven to completion
//! on a single event loop owned by a [`Bridge`].
//!
//! ## Features
//!
//! - **Synchronous Bridge**: open, call and close over one current-thread runtime
//! - **Wallet Operations**: balances, faucet funding, transfers and token creation
//! - **Transaction Lookup**: pending, failed and succeeded transactions by hash
//! - **Move Functions**: view and entry calls validated against module ABIs
//! - **Storage Module**: the `store` / `get` / `meaning_of_view` resource model
//! - **Pluggable Ledgers**: a REST client for real networks and an in-process ledger
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use aptos_agent::{Bridge, ChainTools, InMemoryLedger, LocalAccount};
//!
//! fn main() -> aptos_agent::AgentResult<()> {
//!     let bridge = Arc::new(Bridge::new());
//!     bridge.open()?;
//!
//!     let wallet = LocalAccount::generate();
//!     let identity = wallet.address();
//!     let tools = ChainTools::new(bridge.clone(), Arc::new(InMemoryLedger::default()), wallet, identity);
//!
//!     println!("{}", tools.fund_wallet_in_apt(Some(10), None).content);
//!     println!("{}", tools.get_balance_in_apt(None).content);
//!
//!     bridge.close()?;
//!     Ok(())
//! }
//! ```

pub mod bridge;
pub mod chain;
pub mod cli;
pub mod config;
pub mod contract;
pub mod error;
pub mod ledger;
pub mod tools;

// Re-export commonly used types
pub use bridge::{Bridge, BridgeError, BridgeResult};
pub use config::{AgentConfig, ConfigManager};
pub use error::{AgentError, AgentResult};
pub use ledger::{AccountAddress, InMemoryLedger, LedgerClient, LocalAccount, RestLedger};
pub use tools::{ChainTools, ToolInput, ToolOptions, ToolOutput, ToolRegistry};

/// The current version of aptos-agent
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
