//! Re-run normalize/dedup/score/insert over one source's already-captured
//! raw jobs for a given day, without refetching. Useful after a rule
//! change to see how it would have scored yesterday's postings.

use anyhow::Result;
use app::domain::raw_job::RawJob;
use chrono::NaiveDate;
use clap::Parser;

#[derive(Parser)]
#[command(about = "Replay one source's captured raw jobs for a given date")]
struct Cli {
    #[arg(long)]
    source: String,

    /// YYYY-MM-DD
    #[arg(long)]
    date: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    app::bootstrap::init_tracing();
    let cli = Cli::parse();
    let date = NaiveDate::parse_from_str(&cli.date, "%Y-%m-%d")?;
    let ctx = app::bootstrap::init().await?;

    let raw_jobs = RawJob::find_by_source_and_date(&cli.source, date, &ctx.pool).await?;
    if raw_jobs.is_empty() {
        println!("no raw jobs captured for {} on {date}", cli.source);
        return Ok(());
    }

    let run_id = ctx.pipeline().replay("replay", raw_jobs, false).await?;
    println!("replay run {run_id} complete");
    Ok(())
}
