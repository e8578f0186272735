//! CLI command implementations

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::batch::{BatchRunner, Scheduler};
use crate::config::Config;
use crate::rpc::{BalanceOracle, ChainRpc, HttpRpcClient};
use crate::wallet::{load_targets, Wallet};

/// Wallet, RPC client and initial target list
struct Inputs {
    wallet: Arc<Wallet>,
    rpc: Arc<dyn ChainRpc>,
    targets: Vec<String>,
}

/// Load wallet and targets; failures here are fatal
fn load_inputs(config: &Config) -> Result<Inputs> {
    let wallet = Wallet::load(Path::new(&config.files.wallet_path))
        .with_context(|| format!("Failed to load wallet {}", config.files.wallet_path))?;

    let targets = load_targets(Path::new(&config.files.targets_path), wallet.address())
        .with_context(|| format!("Failed to load targets {}", config.files.targets_path))?;
    info!("Loaded {} targets", targets.len());

    let rpc = HttpRpcClient::new(
        wallet.rpc_url(),
        Duration::from_millis(config.rpc.timeout_ms),
    )?;

    Ok(Inputs {
        wallet: Arc::new(wallet),
        rpc: Arc::new(rpc),
        targets,
    })
}

/// Run batches forever until Ctrl-C
pub async fn start(config: &Config) -> Result<()> {
    let inputs = load_inputs(config)?;

    info!("Starting autosend for {}", inputs.wallet.address());
    info!(
        "Amount: {} OCT per recipient, {} recipients, every {}s",
        config.transfer.amount_oct,
        inputs.targets.len(),
        config.schedule.interval_secs
    );

    let runner = BatchRunner::new(inputs.wallet, inputs.rpc, config.clone());
    let cancel = CancellationToken::new();
    let mut handle = Scheduler::new(runner, &config.files.targets_path).spawn(cancel.clone());

    tokio::select! {
        result = &mut handle => {
            // The scheduler only returns after cancellation
            let batches = result.context("Scheduler task failed")?;
            warn!("Scheduler exited unexpectedly after {} batches", batches);
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received, finishing current transfer...");
            cancel.cancel();
            let batches = handle.await.context("Scheduler task failed")?;
            info!("Stopped after {} batches", batches);
        }
    }

    Ok(())
}

/// Run a single batch and print its summary
pub async fn once(config: &Config) -> Result<()> {
    let inputs = load_inputs(config)?;

    let mut runner = BatchRunner::new(inputs.wallet, inputs.rpc, config.clone());
    let cancel = CancellationToken::new();

    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    let summary = runner.run_batch(&inputs.targets, &cancel).await;
    println!("{}", summary);

    if summary.failed > 0 {
        error!("{} transfers failed", summary.failed);
    }

    Ok(())
}

/// Show nonce and balances of the wallet
pub async fn balance(config: &Config) -> Result<()> {
    let wallet = Wallet::load(Path::new(&config.files.wallet_path))
        .with_context(|| format!("Failed to load wallet {}", config.files.wallet_path))?;
    let rpc: Arc<dyn ChainRpc> = Arc::new(HttpRpcClient::new(
        wallet.rpc_url(),
        Duration::from_millis(config.rpc.timeout_ms),
    )?);
    let oracle = BalanceOracle::new(rpc);

    let account = oracle.account(wallet.address()).await;
    let balances = oracle.balances(&wallet).await;

    println!("Wallet:            {}", wallet.address());
    println!("RPC:               {}", wallet.rpc_url());
    println!("Nonce:             {}", account.value().nonce);
    println!("Public balance:    {} OCT", account.value().balance);
    println!("Public (raw):      {}", balances.value().public_raw);
    println!("Encrypted (raw):   {}", balances.value().encrypted_raw);
    println!(
        "Transfers covered: {} private",
        balances.value().encrypted_raw / config.transfer.amount_raw().max(1)
    );

    if let Some(e) = account.error().or(balances.error()) {
        anyhow::bail!("Balance query incomplete: {}", e);
    }

    Ok(())
}

/// Show current configuration
pub fn show_config(config: &Config) -> Result<()> {
    println!("{}", config.masked_display());
    Ok(())
}
