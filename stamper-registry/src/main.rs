//! `stamper` binary: run the registry or talk to a running one.

use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    stamper_registry::cli::run().await
}
