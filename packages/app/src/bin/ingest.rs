//! One ad hoc pipeline run, driven by hand instead of by the scheduler.

use anyhow::Result;
use app::connectors::RunConnectorOptions;
use clap::Parser;

#[derive(Parser)]
#[command(about = "Run one ingestion pass across the configured connectors")]
struct Cli {
    /// Only run the ATS-platform connectors, skipping search-based sources.
    #[arg(long)]
    ats_only: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    app::bootstrap::init_tracing();
    let cli = Cli::parse();
    let ctx = app::bootstrap::init().await?;

    let options = if cli.ats_only {
        RunConnectorOptions::ats_only()
    } else {
        RunConnectorOptions::default()
    };

    let run_id = ctx.pipeline().run("manual_ingest", options, false).await?;
    println!("ingestion run {run_id} complete");
    Ok(())
}
