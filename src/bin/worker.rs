use std::sync::Arc;
use std::time::Duration;

use graphile_worker::WorkerOptions;
use sqlx::postgres::PgPoolOptions;

use taskhub::config::AppConfig;
use taskhub::queue::{GraphileQueue, QueueHandle};
use taskhub::tasks;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "taskhub=debug,graphile_worker=info,sqlx=warn".to_string());
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let config = AppConfig::from_env()?;

    let db = PgPoolOptions::new()
        .max_connections((config.queue.concurrency as u32).max(1) + 1)
        .connect(&config.database_url)
        .await?;

    // Chain stages re-enqueue their successor through this handle.
    let queue = QueueHandle::new(Arc::new(
        GraphileQueue::connect(db.clone(), &config.queue.schema).await?,
    ));

    let options = tasks::register(
        WorkerOptions::default()
            .concurrency(config.queue.concurrency)
            .poll_interval(Duration::from_millis(config.queue.poll_interval_ms))
            .schema(&config.queue.schema)
            .pg_pool(db)
            .add_extension(queue),
    )
    .with_crontab(tasks::PERIODIC_CRONTAB)?;

    let worker = options.init().await?;

    tracing::info!(schema = %config.queue.schema, "worker ready, polling for jobs");
    worker.run().await?;

    Ok(())
}
