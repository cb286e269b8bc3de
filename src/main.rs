//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// Line-oriented runner for the matching engine.
// Reads one JSON trade input per line from stdin, feeds the engine worker and writes one JSON
// order output per line to stdout for every order affected by a trade.
//--------------------------------------------------------------------------------------------------
// To process a file:   cargo run -- < orders.jsonl
// To run a demo:       cargo run -- --demo
// Tuning:              cargo run -- --inbound-capacity 64 --outbound-capacity 64 --asset-supply 5000
use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{Level, info, warn};

use trade_matching::{
    EngineClient, EngineConfig, EngineWorker, OrderOutput, OutboundOrders, TradeInput, Transformer,
};

/// CLI options for the application
#[derive(Parser, Debug)]
#[command(name = "trade-matching", about = "Price-time priority order matching engine")]
struct Opt {
    /// Capacity of the inbound order channel (overrides ENGINE_INBOUND_CAPACITY)
    #[arg(long)]
    inbound_capacity: Option<usize>,

    /// Capacity of the outbound order channel (overrides ENGINE_OUTBOUND_CAPACITY)
    #[arg(long)]
    outbound_capacity: Option<usize>,

    /// Issued quantity for newly seen assets (overrides DEFAULT_ASSET_SUPPLY)
    #[arg(long)]
    asset_supply: Option<u64>,

    /// Feed a small built-in order sequence instead of reading stdin
    #[arg(long)]
    demo: bool,
}

impl Opt {
    fn apply(&self, mut config: EngineConfig) -> EngineConfig {
        if let Some(capacity) = self.inbound_capacity.filter(|c| *c > 0) {
            config.inbound_capacity = capacity;
        }
        if let Some(capacity) = self.outbound_capacity.filter(|c| *c > 0) {
            config.outbound_capacity = capacity;
        }
        if let Some(supply) = self.asset_supply {
            config.default_asset_supply = supply;
        }
        config
    }
}

/// Writes every emitted order to stdout until the engine closes the stream.
async fn write_outputs(mut outbound: OutboundOrders) -> Result<usize> {
    let mut stdout = tokio::io::stdout();
    let mut written = 0;

    while let Some(order) = outbound.recv().await {
        let mut line = serde_json::to_string(&OrderOutput::from(&order))?;
        line.push('\n');
        stdout.write_all(line.as_bytes()).await?;
        written += 1;
    }
    stdout.flush().await?;
    Ok(written)
}

/// Validates and submits one input. Rejected inputs are logged and skipped.
async fn submit_input(client: &EngineClient, transformer: &mut Transformer, input: TradeInput) -> Result<()> {
    let order_id = input.order_id.clone();
    match transformer.transform_input(input) {
        Ok(order) => {
            client.submit(order).await?;
        }
        Err(err) => warn!(order = %order_id, error = %err, "Rejected trade input"),
    }
    Ok(())
}

fn demo_inputs() -> Vec<TradeInput> {
    let input = |order_id: &str, investor_id: &str, current_shares: i64, shares: u64, price: f64, side: &str| TradeInput {
        order_id: order_id.to_string(),
        investor_id: investor_id.to_string(),
        asset_id: "asset1".to_string(),
        current_shares,
        shares,
        price,
        order_type: side.to_string(),
    };

    vec![
        input("1", "Investor 1", 10, 5, 5.0, "SELL"),
        input("2", "Investor 2", 0, 5, 5.0, "BUY"),
        input("3", "Investor 1", 10, 5, 9.0, "SELL"),
        input("4", "Investor 1", 10, 5, 8.0, "SELL"),
        input("5", "Investor 2", 0, 8, 10.0, "BUY"),
        input("6", "Investor 3", 0, 3, 1.0, "HOLD"),
    ]
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let opt = Opt::parse();

    // Initialize logging; stdout carries the order records
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(Level::INFO)
        .init();

    let config = opt.apply(EngineConfig::from_env().context("failed to load configuration")?);
    info!(?config, "Starting matching engine");

    let mut transformer = Transformer::from_config(&config);
    let (client, outbound, handle) = EngineWorker::new(config)
        .start()
        .context("failed to start matching engine")?;
    let writer = tokio::spawn(write_outputs(outbound));

    if opt.demo {
        for input in demo_inputs() {
            submit_input(&client, &mut transformer, input).await?;
        }
    } else {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<TradeInput>(&line) {
                Ok(input) => submit_input(&client, &mut transformer, input).await?,
                Err(err) => warn!(error = %err, "Skipping malformed input line"),
            }
        }
    }

    client.wait_idle().await;
    client.shutdown().await?;
    drop(client);

    let engine = tokio::task::spawn_blocking(move || handle.join())
        .await?
        .map_err(|_| anyhow::anyhow!("matching engine thread panicked"))?;
    let written = writer.await??;

    info!(
        transactions = engine.transactions().len(),
        resting_orders = engine.resting_orders_count(),
        emitted_orders = written,
        "Matching engine finished"
    );
    Ok(())
}
