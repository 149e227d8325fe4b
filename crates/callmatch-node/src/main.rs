//! Runs one Callmatch engine: ticks auctions on a fixed period and shuts
//! down cleanly on Ctrl-C.

use std::process::ExitCode;

use callmatch_node::{CliArgs, Node, init_logging};
use callmatch_types::{Asset, Result, constants};
use clap::Parser;

#[tokio::main]
async fn main() -> ExitCode {
    let args = CliArgs::parse();
    init_logging(&args.log_level, args.json_logs);

    match run(&args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(%err, class = ?err.class(), "node stopped with error");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: &CliArgs) -> Result<()> {
    let config = args.engine_config()?;
    tracing::info!(
        engine = constants::ENGINE_NAME,
        version = constants::VERSION,
        instrument = %config.instrument.symbol(),
        config = %serde_json::to_string(&config)?,
        "starting"
    );

    let node = Node::build(config);
    let scheduler = node.start_auctions();

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown requested");

    let stats = scheduler.shutdown().await?;
    tracing::info!(
        last_auction = ?node.engine.last_auction_id(),
        auctions = stats.completed,
        resting_orders = node.gateway.orders().len(),
        "final auction state"
    );

    node.ledger.verify_rows()?;
    for asset in Asset::ALL {
        node.ledger.verify_supply(asset)?;
    }
    Ok(())
}
