// Configuration: TOML file with environment overrides
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{AgentError, AgentResult};
use crate::ledger::{AccountAddress, LocalAccount};

pub const DEVNET_NODE_URL: &str = "https://api.devnet.aptoslabs.com/v1";
pub const DEVNET_FAUCET_URL: &str = "https://faucet.devnet.aptoslabs.com";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub network: NetworkConfig,
    pub wallet: WalletConfig,
    pub transactions: TransactionOptions,
    pub modules: ModuleOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub node_url: String,
    pub faucet_url: String,
    pub request_timeout_secs: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            node_url: DEVNET_NODE_URL.to_string(),
            faucet_url: DEVNET_FAUCET_URL.to_string(),
            request_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalletConfig {
    /// Hex ed25519 key of the agent's own account. A fresh key is generated
    /// per run when unset.
    pub private_key: Option<String>,
    /// The human user's wallet, used as the default identity when set.
    pub user_address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransactionOptions {
    pub max_gas_amount: u64,
    pub gas_unit_price: u64,
    pub expiration_secs: u64,
    pub wait_poll_interval_ms: u64,
    pub wait_max_attempts: u32,
}

impl Default for TransactionOptions {
    fn default() -> Self {
        Self {
            max_gas_amount: 200_000,
            gas_unit_price: 100,
            expiration_secs: 600,
            wait_poll_interval_ms: 500,
            wait_max_attempts: 20,
        }
    }
}

impl TransactionOptions {
    pub fn wait_poll_interval(&self) -> Duration {
        Duration::from_millis(self.wait_poll_interval_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModuleOptions {
    /// Page size for module listings.
    pub module_limit: usize,
    /// Fetch a module's ABI when an entry call targets a module that was not
    /// listed earlier in the session.
    pub fetch_missing_abi: bool,
    /// Where the in-process ledger publishes the storage module.
    pub storage_address: String,
}

impl Default for ModuleOptions {
    fn default() -> Self {
        Self {
            module_limit: 10,
            fetch_missing_abi: false,
            storage_address: "0xcafe".to_string(),
        }
    }
}

impl AgentConfig {
    /// Applies `APTOS_NODE_URL`, `APTOS_FAUCET_URL`, `APTOS_PRIVATE_KEY` and
    /// `DEVNET_WALLET_ADDRESS` from `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("APTOS_NODE_URL") {
            self.network.node_url = url;
        }
        if let Some(url) = lookup("APTOS_FAUCET_URL") {
            self.network.faucet_url = url;
        }
        if let Some(key) = lookup("APTOS_PRIVATE_KEY") {
            self.wallet.private_key = Some(key);
        }
        if let Some(address) = lookup("DEVNET_WALLET_ADDRESS") {
            self.wallet.user_address = Some(address);
        }
    }

    pub fn validate(&self) -> AgentResult<()> {
        if self.network.node_url.trim().is_empty() {
            return Err(AgentError::config("network.node_url is empty"));
        }
        if self.network.faucet_url.trim().is_empty() {
            return Err(AgentError::config("network.faucet_url is empty"));
        }
        if self.network.request_timeout_secs == 0 {
            return Err(AgentError::config("network.request_timeout_secs must be > 0"));
        }
        if self.modules.module_limit == 0 {
            return Err(AgentError::config("modules.module_limit must be > 0"));
        }
        self.user_wallet()?;
        self.storage_address()?;
        Ok(())
    }

    pub fn user_wallet(&self) -> AgentResult<Option<AccountAddress>> {
        self.wallet
            .user_address
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(|s| {
                AccountAddress::from_hex(s)
                    .map_err(|e| AgentError::config(format!("wallet.user_address: {}", e)))
            })
            .transpose()
    }

    pub fn agent_account(&self) -> AgentResult<LocalAccount> {
        match self.wallet.private_key.as_deref() {
            Some(key) if !key.trim().is_empty() => LocalAccount::from_private_key_hex(key),
            _ => {
                let account = LocalAccount::generate();
                info!("No private key configured, generated agent account {}", account.address());
                Ok(account)
            }
        }
    }

    pub fn storage_address(&self) -> AgentResult<AccountAddress> {
        AccountAddress::from_hex(&self.modules.storage_address)
            .map_err(|e| AgentError::config(format!("modules.storage_address: {}", e)))
    }
}

pub struct ConfigManager {
    path: PathBuf,
}

impl ConfigManager {
    pub fn new() -> Self {
        let path = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("aptos-agent")
            .join("config.toml");
        Self { path }
    }

    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the config file (defaults when it does not exist) and applies
    /// environment overrides.
    pub fn load_config(&self) -> AgentResult<AgentConfig> {
        let mut config = self.load_file()?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn load_file(&self) -> AgentResult<AgentConfig> {
        if !self.path.exists() {
            debug!("No config at {}, using defaults", self.path.display());
            return Ok(AgentConfig::default());
        }

        let text = std::fs::read_to_string(&self.path)?;
        let config = toml::from_str(&text)?;
        debug!("Loaded config from {}", self.path.display());
        Ok(config)
    }

    pub fn save_config(&self, config: &AgentConfig) -> AgentResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, toml::to_string_pretty(config)?)?;
        info!("Wrote config to {}", self.path.display());
        Ok(())
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}
