//! Install the configured worker version.

use anyhow::{Context as _, Result};
use offline_cache::{CacheStorage, RegisterOutcome};
use serde::Serialize;

use super::InstallArgs;
use crate::context::Context;

#[derive(Serialize)]
struct InstallReport<'a> {
    version: &'a str,
    activated: bool,
    precached: usize,
    partitions: Vec<String>,
}

/// Run the install command.
pub async fn run(args: InstallArgs, ctx: &Context) -> Result<()> {
    let version = ctx.config.worker.version.as_str();
    let mut state = ctx.load_state()?;

    if state.active.as_ref().is_some_and(|active| active.version == version) {
        ctx.output.info(&format!("Version {} is already active", version));
        return Ok(());
    }

    let storage = ctx.cache_storage().await?;
    let network = ctx.network()?;
    let registration = ctx.registration(&state, &storage, &network);
    let worker = ctx
        .new_worker(&storage, &network)
        .with_skip_waiting_on_install(!args.wait);

    ctx.output.header(&format!(
        "Installing {} {}",
        ctx.config.worker.app_name, version
    ));
    let precached = ctx.config.worker.precache.len();
    let spinner = ctx.output.spinner(&format!("Precaching {} URLs", precached));
    let outcome = registration.register(worker).await;
    spinner.finish_and_clear();
    let outcome = outcome.with_context(|| format!("Failed to install {}", version))?;

    let activated = outcome == RegisterOutcome::Activated;
    if activated {
        state.activate(version);
    } else {
        state.wait(version);
    }
    ctx.save_state(&state)?;

    let partitions = storage.keys().await?;
    if ctx.output.is_json() {
        ctx.output.json(&InstallReport {
            version,
            activated,
            precached,
            partitions,
        });
        return Ok(());
    }

    ctx.output.kv("Precached", &precached.to_string());
    ctx.output.kv("Partitions", &partitions.join(", "));
    if activated {
        ctx.output.success(&format!("Version {} is active", version));
    } else {
        ctx.output.success(&format!("Version {} installed and waiting", version));
        ctx.output.info("Run `offline activate` to switch to it.");
    }

    Ok(())
}
