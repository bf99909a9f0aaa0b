//! # Shapesnap
//!
//! Replays recorded strokes through a detection session and prints what was
//! recognized.

use clap::Parser;
use shapesnap_cli::{run, CliArgs};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize structured tracing with optional JSON format.
///
/// Set `RUST_LOG` to control log levels (default: `shapesnap=info,shapesnap_core=info`).
/// Set `RUST_LOG_FORMAT=json` for JSON output.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("shapesnap=info,shapesnap_cli=info,shapesnap_core=info"));

    // Logs go to stderr so stdout stays machine-readable
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_writer(std::io::stderr);

    if std::env::var("RUST_LOG_FORMAT").as_deref() == Ok("json") {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer.json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let args = CliArgs::parse();
    tracing::debug!(strokes = args.strokes.len(), "starting shapesnap");

    for report in run(&args).await? {
        if args.json {
            println!("{}", serde_json::to_string(&report)?);
        } else {
            println!("{}", report.render());
        }
    }
    Ok(())
}
