//! Keyed expiry store commands.

use anyhow::Result;
use serde_json::Value;

use super::{StoreArgs, StoreCommand};
use crate::context::Context;

/// Run the store command.
pub async fn run(args: StoreArgs, ctx: &Context) -> Result<()> {
    let sweep = !matches!(args.command, StoreCommand::Cleanup);
    let store = ctx.store(sweep).await?;

    match args.command {
        StoreCommand::Get { key } => match store.get::<Value>(&key).await {
            Some(value) if ctx.output.is_json() => ctx.output.json(&value),
            Some(value) => println!("{}", serde_json::to_string_pretty(&value)?),
            None if ctx.output.is_json() => ctx.output.json(&Value::Null),
            None => ctx.output.warn(&format!("No live entry for '{}'", key)),
        },
        StoreCommand::Set { key, value } => {
            let value = parse_value(&value);
            store.set(&key, &value).await;
            ctx.output
                .success(&format!("Stored {}", store.derive_key(&key)));
        }
        StoreCommand::Remove { key } => {
            store.remove(&key).await;
            ctx.output
                .success(&format!("Removed {}", store.derive_key(&key)));
        }
        StoreCommand::Cleanup => {
            let report = store.cleanup().await;
            if ctx.output.is_json() {
                ctx.output.json(&report);
            } else {
                ctx.output.kv("Scanned", &report.scanned.to_string());
                ctx.output.kv("Removed", &report.removed.to_string());
                ctx.output
                    .kv("Other versions", &report.stale_version.to_string());
                ctx.output.kv("Corrupt", &report.corrupt.to_string());
                if report.failed > 0 {
                    ctx.output
                        .warn(&format!("{} storage operations failed", report.failed));
                }
            }
        }
        StoreCommand::List => {
            let keys = store.keys().await;
            if ctx.output.is_json() {
                ctx.output.json(&keys);
            } else if keys.is_empty() {
                ctx.output.info("Store is empty.");
            } else {
                for key in &keys {
                    ctx.output.list_item(key);
                }
            }
        }
    }

    Ok(())
}

/// JSON when it parses, otherwise the raw string.
fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}
