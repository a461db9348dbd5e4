use anyhow::Context;
use clap::Parser;
use std::process;
use std::sync::Arc;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use aptos_agent::cli::{Args, Commands, LedgerKind};
use aptos_agent::{
    AgentConfig, Bridge, ChainTools, ConfigManager, InMemoryLedger, LedgerClient, RestLedger, ToolOptions,
    ToolOutput, ToolRegistry,
};

// The bridge owns the only runtime, so main stays synchronous.
fn main() {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with_writer(std::io::stderr)
        .init();

    match run(args) {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            error!("Error: {:#}", e);
            eprintln!("Error: {:#}", e);
            process::exit(1);
        }
    }
}

/// Returns whether the command succeeded.
fn run(args: Args) -> anyhow::Result<bool> {
    info!("aptos-agent v{}", aptos_agent::VERSION);

    let manager = match &args.config {
        Some(path) => ConfigManager::with_path(path),
        None => ConfigManager::new(),
    };

    if let Commands::ConfigInit { force } = args.command {
        if manager.path().exists() && !force {
            anyhow::bail!("{} already exists, pass --force to overwrite", manager.path().display());
        }
        manager.save_config(&AgentConfig::default())?;
        println!("Wrote {}", manager.path().display());
        return Ok(true);
    }

    let mut config = manager.load_config().context("loading config")?;
    if let Commands::Entry { fetch_abi: true, .. } = args.command {
        config.modules.fetch_missing_abi = true;
    }

    if let Commands::Tools = args.command {
        for spec in aptos_agent::tools::TOOL_SPECS {
            let marker = if spec.mutating { "*" } else { " " };
            println!("{} {:<24} {}", marker, spec.name, spec.description);
        }
        return Ok(true);
    }

    let ledger = build_ledger(&config, args.ledger)?;
    let bridge = Arc::new(Bridge::new());
    bridge.open()?;

    let registry = build_registry(&config, bridge.clone(), ledger)?;
    let output = match &args.command {
        Commands::Call { json } => registry.execute_json(json),
        command => match command.tool_input() {
            Some(input) => registry.execute(input),
            None => ToolOutput::failure("Error", "command does not map to a tool"),
        },
    };

    bridge.close()?;
    print_output(&output)?;
    Ok(output.success)
}

fn build_ledger(config: &AgentConfig, kind: LedgerKind) -> anyhow::Result<Arc<dyn LedgerClient>> {
    let ledger: Arc<dyn LedgerClient> = match kind {
        LedgerKind::Rest => Arc::new(RestLedger::new(&config.network, config.transactions.clone())?),
        LedgerKind::Memory => Arc::new(InMemoryLedger::new(config.storage_address()?)),
    };
    debug!("Using {} ledger", ledger.name());
    Ok(ledger)
}

fn build_registry(
    config: &AgentConfig,
    bridge: Arc<Bridge>,
    ledger: Arc<dyn LedgerClient>,
) -> anyhow::Result<ToolRegistry> {
    let wallet = config.agent_account()?;
    let user_wallet = config.user_wallet()?;
    let identity = user_wallet.unwrap_or_else(|| wallet.address());
    info!("Agent wallet {}, default identity {}", wallet.address(), identity);

    let tools = ChainTools::new(bridge, ledger, wallet, identity)
        .with_user_wallet(user_wallet)
        .with_options(ToolOptions::from_config(config));
    Ok(ToolRegistry::new(tools))
}

fn print_output(output: &ToolOutput) -> anyhow::Result<()> {
    if output.success {
        println!("{}", output.content);
        if let Some(data) = &output.data {
            println!("{}", serde_json::to_string_pretty(data)?);
        }
    } else if let Some(error) = &output.error {
        eprintln!("{}", error);
    }
    Ok(())
}
