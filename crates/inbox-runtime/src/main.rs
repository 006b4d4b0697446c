//! # Group Inbox Runtime
//!
//! Reads decrypted group messages as newline-delimited JSON from stdin and
//! runs them through the reconciliation pipeline.
//!
//! ## Startup Sequence
//!
//! 1. Load configuration from the environment
//! 2. Install the tracing subscriber (`GI_LOG_LEVEL`)
//! 3. Open the job store and wire the pipeline
//! 4. Re-drain jobs left by a previous run
//! 5. Consume stdin until EOF or Ctrl+C, then flush and stop

use anyhow::Result;
use inbox_runtime::{InboxConfig, InboxRuntime};
use tokio::io::BufReader;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    let config = InboxConfig::from_env()?;

    // Initialize logging
    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let runtime = InboxRuntime::new(config)?;
    runtime.start().await?;

    info!("Reading group messages from stdin. Press Ctrl+C or close input to stop.");
    let stdin = BufReader::new(tokio::io::stdin());
    tokio::select! {
        result = runtime.run_input(stdin) => {
            let lines = result?;
            info!(lines, "Input closed");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupt received");
        }
    }

    runtime.shutdown().await;
    Ok(())
}
