//! Add URLs to the page-managed precache partition.

use anyhow::{Context as _, Result};
use serde::Serialize;

use super::PrecacheArgs;
use crate::context::Context;

#[derive(Serialize)]
struct PrecacheReport<'a> {
    partition: &'a str,
    stored: usize,
}

/// Run the precache command.
pub async fn run(args: PrecacheArgs, ctx: &Context) -> Result<()> {
    let storage = ctx.cache_storage().await?;
    let network = ctx.network()?;
    let manager = ctx.manager(&storage, true).await?.with_precache(
        storage.clone(),
        network,
        &ctx.config.page,
        ctx.config.worker.origin.clone(),
    );

    let partition = ctx.config.page.precache_partition.as_str();
    let spinner = ctx
        .output
        .spinner(&format!("Precaching {} URLs into {}", args.urls.len(), partition));
    let stored = manager.precache(&args.urls).await;
    spinner.finish_and_clear();
    let stored = stored.context("Precache failed; nothing was stored")?;

    if ctx.output.is_json() {
        ctx.output.json(&PrecacheReport { partition, stored });
        return Ok(());
    }

    for url in &args.urls {
        ctx.output.list_item(url);
    }
    ctx.output
        .success(&format!("Stored {} entries in {}", stored, partition));

    Ok(())
}
