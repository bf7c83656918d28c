//! Adds `events.custom_type` and its partial index to an existing database.
//!
//! Usage: `DATABASE_URL=sqlite://data/cafe.db add-event-custom-type`

use cafe_client::config::Config;
use cafe_client::migration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

async fn run() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    let pool = migration::connect(&config.database).await?;

    let report = migration::add_custom_type_column(&pool).await?;
    if report.column_added {
        tracing::info!("Column events.custom_type added");
    } else {
        tracing::info!("Column events.custom_type was already present");
    }
    if report.index_created {
        tracing::info!("Index {} created", migration::CUSTOM_TYPE_INDEX);
    }
    tracing::info!(
        "events: {} rows total, {} custom, {} with custom_type set",
        report.total_rows,
        report.custom_rows,
        report.rows_with_custom_type
    );

    pool.close().await;
    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cafe_client=info,add_event_custom_type=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = run().await {
        tracing::error!("Migration failed: {:#}", e);
        std::process::exit(1);
    }

    tracing::info!("Migration completed");
}
