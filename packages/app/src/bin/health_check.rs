//! Liveness probe for process supervisors: exits 0 if the database is
//! reachable, 1 otherwise. Deliberately skips rule-file loading and
//! connector setup so it stays cheap to run often.

use std::process::ExitCode;

use app::config::AppConfig;
use sqlx::postgres::PgPoolOptions;

#[tokio::main]
async fn main() -> ExitCode {
    let config = match AppConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("config error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let pool = match PgPoolOptions::new()
        .max_connections(1)
        .connect(&config.database_url)
        .await
    {
        Ok(p) => p,
        Err(e) => {
            eprintln!("database unreachable: {e}");
            return ExitCode::FAILURE;
        }
    };

    match sqlx::query("SELECT 1").execute(&pool).await {
        Ok(_) => {
            println!("ok");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("database query failed: {e}");
            ExitCode::FAILURE
        }
    }
}
