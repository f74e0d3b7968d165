//! Show worker versions, partitions and storage usage.

use anyhow::Result;
use offline_cache::{CacheStorage, PartitionNames};
use offline_sdk::{format_bytes, CacheSize};
use serde::Serialize;

use super::StatusArgs;
use crate::context::Context;
use crate::output::{format_duration_ms, phase_badge};
use crate::state::{WorkerRecord, WorkerState};

#[derive(Serialize)]
struct PartitionInfo {
    name: String,
    entries: usize,
    stale: bool,
}

#[derive(Serialize)]
struct StatusReport {
    worker: WorkerState,
    partitions: Vec<PartitionInfo>,
    size: Option<CacheSize>,
    store_keys: usize,
    store_bytes: u64,
}

/// Run the status command.
pub async fn run(args: StatusArgs, ctx: &Context) -> Result<()> {
    let state = ctx.load_state()?;
    let storage = ctx.cache_storage().await?;
    let names = PartitionNames::from_config(&ctx.config.worker);

    let mut partitions = Vec::new();
    for name in storage.keys().await? {
        partitions.push(PartitionInfo {
            entries: storage.entry_count(&name).await?,
            stale: names.is_stale(&name),
            name,
        });
    }

    let manager = ctx.manager(&storage, true).await?;
    let size = manager.size().await;
    let store_keys = manager.store().keys().await;
    let store_bytes = manager.store().storage().size_bytes().await?;

    if ctx.output.is_json() {
        ctx.output.json(&StatusReport {
            worker: state,
            partitions,
            size,
            store_keys: store_keys.len(),
            store_bytes,
        });
        return Ok(());
    }

    ctx.output.header("Worker");
    ctx.output.kv("App", &ctx.config.worker.app_name);
    ctx.output.kv("Origin", ctx.config.worker.origin.as_str());
    ctx.output.kv("Configured version", &ctx.config.worker.version);
    print_record(ctx, "Active", state.active.as_ref());
    print_record(ctx, "Waiting", state.waiting.as_ref());
    if state.waiting.is_some() {
        ctx.output
            .info("A new version is waiting. Run `offline activate` to switch to it.");
    }

    ctx.output.header("Partitions");
    if partitions.is_empty() {
        ctx.output.info("No cache partitions.");
    } else {
        ctx.output.table_row(&["NAME", "ENTRIES", "STATE"], &[40, 8, 8]);
        for partition in &partitions {
            let entries = partition.entries.to_string();
            let label = if partition.stale { "stale" } else { "current" };
            ctx.output
                .table_row(&[&partition.name, &entries, label], &[40, 8, 8]);
            if args.entries {
                for key in storage.entries(&partition.name).await? {
                    ctx.output.list_item(key.as_str());
                }
            }
        }
    }

    ctx.output.header("Storage");
    match &size {
        Some(size) => {
            ctx.output.kv("Usage", &size.usage);
            ctx.output.kv("Quota", &size.quota);
            ctx.output.kv("Used", &size.percent_used);
        }
        None => ctx.output.kv("Usage", "unavailable"),
    }
    ctx.output.kv("Store entries", &store_keys.len().to_string());
    ctx.output.kv("Store file", &format_bytes(store_bytes));
    ctx.output
        .kv("Store TTL", &format_duration_ms(ctx.config.store.ttl_ms));

    Ok(())
}

fn print_record(ctx: &Context, label: &str, record: Option<&WorkerRecord>) {
    match record {
        Some(record) => ctx.output.kv(
            label,
            &format!(
                "{} ({}, installed {})",
                record.version,
                phase_badge(record.phase),
                record.installed_at.format("%Y-%m-%d %H:%M:%S UTC")
            ),
        ),
        None => ctx.output.kv(label, "-"),
    }
}
