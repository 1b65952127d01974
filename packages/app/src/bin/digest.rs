//! Ad hoc morning/evening digest, for operators who want one off-cycle.

use anyhow::Result;
use app::digest::{self, DigestKind};
use clap::{Parser, ValueEnum};

#[derive(Parser)]
#[command(about = "Send a morning or evening digest")]
struct Cli {
    kind: Slot,

    /// Include every active job regardless of score band.
    #[arg(long)]
    force_all: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum Slot {
    Morning,
    Evening,
}

#[tokio::main]
async fn main() -> Result<()> {
    app::bootstrap::init_tracing();
    let cli = Cli::parse();
    let ctx = app::bootstrap::init().await?;

    let kind = match cli.kind {
        Slot::Morning => DigestKind::Morning,
        Slot::Evening => DigestKind::Evening,
    };

    let count = digest::run(&ctx.pool, ctx.notifier.as_ref(), kind, cli.force_all).await?;
    println!("{} digest sent with {count} jobs", kind.label());
    Ok(())
}
