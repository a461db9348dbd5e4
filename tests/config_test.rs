use std::collections::HashMap;

use aptos_agent::config::{DEVNET_FAUCET_URL, DEVNET_NODE_URL};
use aptos_agent::ledger::AccountAddress;
use aptos_agent::tools::ToolOptions;
use aptos_agent::{AgentConfig, ConfigManager};

#[test]
fn test_defaults_point_at_devnet() {
    let config = AgentConfig::default();
    assert_eq!(config.network.node_url, DEVNET_NODE_URL);
    assert_eq!(config.network.faucet_url, DEVNET_FAUCET_URL);
    assert_eq!(config.modules.module_limit, 10);
    assert!(!config.modules.fetch_missing_abi);
    assert!(config.validate().is_ok());
    assert_eq!(config.user_wallet().unwrap(), None);
    assert_eq!(config.storage_address().unwrap(), AccountAddress::from_hex("0xcafe").unwrap());
}

#[test]
fn test_missing_file_loads_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let manager = ConfigManager::with_path(dir.path().join("absent.toml"));
    assert_eq!(manager.load_file().unwrap(), AgentConfig::default());
}

#[test]
fn test_save_and_load_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let manager = ConfigManager::with_path(dir.path().join("nested").join("config.toml"));

    let mut config = AgentConfig::default();
    config.network.node_url = "http://127.0.0.1:8080/v1".to_string();
    config.wallet.user_address = Some("0xabc".to_string());
    config.transactions.wait_max_attempts = 5;
    config.modules.fetch_missing_abi = true;

    manager.save_config(&config).unwrap();
    assert!(manager.path().exists());
    assert_eq!(manager.load_file().unwrap(), config);
}

#[test]
fn test_partial_file_fills_in_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[network]\nnode_url = \"http://localhost:8080/v1\"\n").unwrap();

    let config = ConfigManager::with_path(&path).load_file().unwrap();
    assert_eq!(config.network.node_url, "http://localhost:8080/v1");
    assert_eq!(config.network.faucet_url, DEVNET_FAUCET_URL);
    assert_eq!(config.transactions.max_gas_amount, 200_000);
}

#[test]
fn test_malformed_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "network = [").unwrap();
    assert!(ConfigManager::with_path(&path).load_file().is_err());
}

#[test]
fn test_env_overrides() {
    let env: HashMap<&str, &str> = HashMap::from([
        ("APTOS_NODE_URL", "http://node"),
        ("APTOS_FAUCET_URL", "http://faucet"),
        ("DEVNET_WALLET_ADDRESS", "0x5"),
    ]);

    let mut config = AgentConfig::default();
    config.apply_env(|key| env.get(key).map(|v| v.to_string()));

    assert_eq!(config.network.node_url, "http://node");
    assert_eq!(config.network.faucet_url, "http://faucet");
    assert_eq!(config.user_wallet().unwrap(), Some(AccountAddress::from_u8(5)));
    assert_eq!(config.wallet.private_key, None);
}

#[test]
fn test_validation_rejects_bad_values() {
    let mut config = AgentConfig::default();
    config.wallet.user_address = Some("not hex".to_string());
    assert!(config.validate().is_err());

    let mut config = AgentConfig::default();
    config.modules.module_limit = 0;
    assert!(config.validate().is_err());

    let mut config = AgentConfig::default();
    config.network.node_url = " ".to_string();
    assert!(config.validate().is_err());
}

#[test]
fn test_agent_account_from_configured_key() {
    let mut config = AgentConfig::default();
    let generated = config.agent_account().unwrap();

    config.wallet.private_key = Some(generated.private_key_hex());
    assert_eq!(config.agent_account().unwrap().address(), generated.address());

    config.wallet.private_key = Some("zz".to_string());
    assert!(config.agent_account().is_err());
}

#[test]
fn test_tool_options_follow_config() {
    let mut config = AgentConfig::default();
    config.modules.module_limit = 3;
    config.transactions.wait_poll_interval_ms = 50;

    let options = ToolOptions::from_config(&config);
    assert_eq!(options.module_limit, 3);
    assert_eq!(options.wait.poll_interval.as_millis(), 50);
    assert_eq!(options.wait.max_attempts, 20);
}
