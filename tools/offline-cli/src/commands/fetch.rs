//! Route one request through the active worker.

use std::time::Instant;

use anyhow::{Context as _, Result};
use offline_core::{CacheStatus, Destination, Request};
use offline_sdk::format_bytes;
use serde::Serialize;

use super::FetchArgs;
use crate::context::Context;
use crate::output::status_badge;

#[derive(Serialize)]
struct FetchReport {
    url: String,
    status: u16,
    cache: CacheStatus,
    content_type: Option<String>,
    bytes: u64,
    elapsed_ms: u128,
}

/// Run the fetch command.
pub async fn run(args: FetchArgs, ctx: &Context) -> Result<()> {
    let mut request = Request::resolve(&ctx.config.worker.origin, &args.url)?;
    if let Some(destination) = &args.destination {
        request = request.with_destination(Destination::from_name(destination));
    }
    for raw in &args.headers {
        let (name, value) = parse_header(raw)?;
        request = request.with_header(name, value);
    }

    let state = ctx.load_state()?;
    let storage = ctx.cache_storage().await?;
    let network = ctx.network()?;
    let registration = ctx.registration(&state, &storage, &network);

    let started = Instant::now();
    let (response, cache) = registration
        .fetch(&request)
        .await
        .with_context(|| format!("Request to {} failed", request.url))?;

    let report = FetchReport {
        url: request.url.to_string(),
        status: response.status,
        cache,
        content_type: response.content_type().map(str::to_string),
        bytes: response.size_bytes(),
        elapsed_ms: started.elapsed().as_millis(),
    };

    if ctx.output.is_json() {
        ctx.output.json(&report);
        return Ok(());
    }

    ctx.output.kv("URL", &report.url);
    ctx.output.kv("Status", &report.status.to_string());
    ctx.output.kv("Cache", &status_badge(cache));
    ctx.output
        .kv("Content-Type", report.content_type.as_deref().unwrap_or("-"));
    ctx.output.kv("Size", &format_bytes(report.bytes));
    ctx.output.kv("Time", &format!("{}ms", report.elapsed_ms));
    if state.active.is_none() {
        ctx.output
            .debug("no worker installed; the request went straight to the network");
    }

    if args.body {
        println!();
        println!("{}", response.text_body());
    }

    Ok(())
}

/// Split a `Name: value` header argument.
fn parse_header(raw: &str) -> Result<(&str, &str)> {
    match raw.split_once(':') {
        Some((name, value)) if !name.trim().is_empty() => Ok((name.trim(), value.trim())),
        _ => anyhow::bail!("Invalid header '{}', expected 'Name: value'", raw),
    }
}
