use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use optimistic_store::{
    Item, ItemId, MockRemote, OperationKind, OptimisticController, Payload, UpdateOutcome,
};
use serde::Deserialize;
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "optimistic-smoke")]
#[command(about = "Smoke checks for the optimistic update controller against an in-memory remote")]
struct Cli {
    /// Artificial latency added to every remote call
    #[arg(long, default_value_t = 0)]
    latency_ms: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Runs the built-in create/update/delete/rollback scenario
    Scenario,
    /// Replays a JSON list of operations and prints the final snapshot
    Replay {
        #[arg(long)]
        file: PathBuf,
        /// JSON array of items seeded into both the mirror and the remote
        #[arg(long)]
        seed: Option<PathBuf>,
    },
}

#[derive(Debug, Deserialize)]
struct ReplayStep {
    #[serde(default)]
    kind: OperationKind,
    #[serde(default)]
    id: Option<ItemId>,
    #[serde(default)]
    payload: Payload,
    /// Make the remote fail this step
    #[serde(default)]
    fail: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let latency = Duration::from_millis(cli.latency_ms);

    match cli.command {
        Command::Scenario => run_scenario(latency).await,
        Command::Replay { file, seed } => replay(&file, seed.as_deref(), latency).await,
    }
}

fn remote_with(items: Vec<Item>, latency: Duration) -> Arc<MockRemote> {
    let remote = MockRemote::with_items(items);
    if latency.is_zero() {
        Arc::new(remote)
    } else {
        Arc::new(remote.with_latency(latency))
    }
}

fn check(name: &str, passed: bool) -> Result<()> {
    if !passed {
        bail!("check failed: {}", name);
    }
    println!("ok   {}", name);
    Ok(())
}

async fn run_scenario(latency: Duration) -> Result<()> {
    let seed = vec![
        Item::new(1).with_field("name", "Walnut desk").with_field("price", 420),
        Item::new(2).with_field("name", "Oak chair").with_field("price", 95),
    ];
    let remote = remote_with(seed.clone(), latency);
    let controller = OptimisticController::builder()
        .items(seed)
        .shared_operation(remote.clone())
        .build()?;

    let created = controller
        .create(json!({"name": "Brass lamp", "price": 60}))
        .await?
        .into_item()
        .context("create returned no item")?;
    check("create reconciles with server id", created.id == ItemId::from("srv-1"))?;

    controller.update_item(1, json!({"price": 399})).await?;
    let desk = controller.get(&ItemId::from(1)).await.context("desk missing")?;
    check("update merges payload", desk.field("price") == Some(&json!(399)))?;
    check("update clears optimistic marker", !desk.optimistic)?;

    remote.fail_next(1, "inventory service down").await;
    let before = controller.items().await;
    let failed = controller.update_item(2, json!({"price": 1})).await;
    check("failed update is reported", failed.is_err())?;
    check("failed update rolls back", controller.items().await == before)?;
    check(
        "failure message kept as last error",
        controller
            .last_error()
            .await
            .is_some_and(|message| message.contains("inventory service down")),
    )?;

    let missing = controller.update_item(99, json!({})).await?;
    check("unknown id is not found", matches!(missing, UpdateOutcome::NotFound(_)))?;

    controller.delete(2).await?;
    check("delete removes item", controller.get(&ItemId::from(2)).await.is_none())?;
    check("no pending records remain", controller.pending_ids().await.is_empty())?;
    check("mirror matches remote", controller.items().await == remote.items().await)?;

    println!("{}", serde_json::to_string_pretty(&controller.snapshot().await)?);
    Ok(())
}

async fn replay(file: &Path, seed: Option<&Path>, latency: Duration) -> Result<()> {
    let steps: Vec<ReplayStep> = read_json(file)?;
    let seed: Vec<Item> = match seed {
        Some(path) => read_json(path)?,
        None => Vec::new(),
    };

    let remote = remote_with(seed.clone(), latency);
    let controller = OptimisticController::builder()
        .items(seed)
        .shared_operation(remote.clone())
        .build()?;

    for (index, step) in steps.into_iter().enumerate() {
        if step.fail {
            remote.fail_next(1, "replay step marked to fail").await;
        }
        match controller.update(step.id, step.payload, step.kind).await {
            Ok(outcome) => println!("step {:>3} {:<6} {:?}", index, step.kind, outcome),
            Err(err) => println!("step {:>3} {:<6} error: {}", index, step.kind, err),
        }
    }

    println!("{}", serde_json::to_string_pretty(&controller.snapshot().await)?);
    Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read '{}'", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Failed to parse '{}'", path.display()))
}
