//! Historical seed run: drives every connector like `ingest`, but tags
//! every inserted job `is_backfill = true` so it never fires an alert or
//! burns an LLM call.

use anyhow::Result;
use app::connectors::RunConnectorOptions;
use clap::Parser;

#[derive(Parser)]
#[command(about = "Seed the canonical job table from a historical connector sweep")]
struct Cli {
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

    let run_id = ctx.pipeline().run("backfill", options, true).await?;
    println!("backfill run {run_id} complete");
    Ok(())
}
