//! Activate a waiting worker version.

use anyhow::{Context as _, Result};
use dialoguer::Confirm;
use offline_cache::ControlMessage;
use serde::Serialize;

use super::ActivateArgs;
use crate::context::Context;

#[derive(Serialize)]
struct ActivateReport<'a> {
    version: &'a str,
    previous: Option<&'a str>,
}

/// Run the activate command.
pub async fn run(args: ActivateArgs, ctx: &Context) -> Result<()> {
    let mut state = ctx.load_state()?;
    let Some(waiting) = state.waiting.clone() else {
        ctx.output.info("No version is waiting to activate.");
        return Ok(());
    };
    let previous = state.active.as_ref().map(|active| active.version.clone());

    if !args.yes {
        let confirmed = Confirm::new()
            .with_prompt(format!(
                "New version {} is available. Activate it now?",
                waiting.version
            ))
            .default(true)
            .interact()?;

        if !confirmed {
            ctx.output.warn("Activation cancelled");
            return Ok(());
        }
    }

    let storage = ctx.cache_storage().await?;
    let network = ctx.network()?;
    let registration = ctx.registration(&state, &storage, &network);
    registration
        .post_message(ControlMessage::SkipWaiting)
        .await
        .with_context(|| format!("Failed to activate {}", waiting.version))?;

    state.activate(&waiting.version);
    ctx.save_state(&state)?;

    if ctx.output.is_json() {
        ctx.output.json(&ActivateReport {
            version: &waiting.version,
            previous: previous.as_deref(),
        });
        return Ok(());
    }

    if let Some(previous) = &previous {
        ctx.output.kv("Replaced", previous);
    }
    ctx.output.success(&format!("Version {} is active", waiting.version));

    Ok(())
}
