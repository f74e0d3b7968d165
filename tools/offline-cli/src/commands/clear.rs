//! Clear every cache partition and expired store entry.

use std::sync::Arc;

use anyhow::Result;
use dialoguer::Confirm;

use super::ClearArgs;
use crate::context::Context;

/// Run the clear command.
pub async fn run(args: ClearArgs, ctx: &Context) -> Result<()> {
    if !args.yes {
        let confirmed = Confirm::new()
            .with_prompt("Delete every cache partition and all expired store entries?")
            .default(false)
            .interact()?;

        if !confirmed {
            ctx.output.warn("Clear cancelled");
            return Ok(());
        }
    }

    let state = ctx.load_state()?;
    let storage = ctx.cache_storage().await?;
    let network = ctx.network()?;
    let registration = Arc::new(ctx.registration(&state, &storage, &network));
    let manager = ctx.manager(&storage, false).await?.with_controller(registration);

    let report = manager.clear_all().await;

    if ctx.output.is_json() {
        ctx.output.json(&report);
        return Ok(());
    }

    if report.worker_cleared {
        ctx.output.success("Cache partitions cleared");
    } else {
        ctx.output
            .warn("No active worker; cache partitions were left in place");
    }
    ctx.output.kv("Store entries scanned", &report.store.scanned.to_string());
    ctx.output.kv("Expired entries removed", &report.store.removed.to_string());
    if report.store.corrupt > 0 {
        ctx.output
            .warn(&format!("{} corrupt store entries skipped", report.store.corrupt));
    }

    Ok(())
}
