//! Runs pending SQLx migrations against the database.
//!
//! Migrations are embedded at compile time; run this before starting the
//! API against a fresh database.

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;

use leadscout_store::PgLeadStore;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;

    println!("Running database migrations...");

    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&database_url)
        .await?;

    PgLeadStore::new(pool).migrate().await?;

    println!("Migrations completed successfully.");

    Ok(())
}
