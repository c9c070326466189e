//! Change preview utility for TallyHost billing
//!
//! Prices a service change and prints the delta lines with their totals.
//!
//! Usage:
//!   cargo run --bin preview-change request.json
//!   cat request.json | cargo run --bin preview-change
//!
//! Environment:
//! - `BILLING_*`: pricing settings (see `PricingSettings`)
//! - `RUST_LOG`: log filter (default: info)
//! - `LOG_FORMAT`: `json` for structured logs on stderr

use anyhow::Context;
use std::env;
use std::io::{self, Read};
use tallyhost_billing::{preview, PreviewRequest, PricingSettings};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if env::var("LOG_FORMAT").is_ok_and(|format| format.eq_ignore_ascii_case("json")) {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
            .init();
    }
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let raw = match env::args().nth(1) {
        Some(path) => std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read change request from {}", path))?,
        None => {
            let mut raw = String::new();
            io::stdin()
                .read_to_string(&mut raw)
                .context("Failed to read change request from stdin")?;
            raw
        }
    };

    let request: PreviewRequest =
        serde_json::from_str(&raw).context("Invalid change request document")?;
    let settings = PricingSettings::from_env()?;

    let preview = preview(&request, settings)?;
    println!("{}", serde_json::to_string_pretty(&preview)?);

    Ok(())
}
