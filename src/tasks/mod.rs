mod dto;
pub mod handlers;
pub mod jobs;

use axum::Router;
use graphile_worker::WorkerOptions;

use crate::state::AppState;

pub use jobs::{ChainTask, ErrorTask, LongRunningTask, PeriodicTask, SimpleTask, CHAIN_STAGES};

pub fn router() -> Router<AppState> {
    Router::new().merge(handlers::task_routes())
}

/// Explicit registry of every job the worker can execute, keyed by the
/// identifier declared on each payload type.
pub fn register(options: WorkerOptions) -> WorkerOptions {
    options
        .define_job::<SimpleTask>()
        .define_job::<LongRunningTask>()
        .define_job::<ErrorTask>()
        .define_job::<PeriodicTask>()
        .define_job::<ChainTask>()
}

/// Crontab entry that keeps the periodic report firing every five minutes.
pub const PERIODIC_CRONTAB: &str = "*/5 * * * * periodic_task";
