use graphile_worker::{IntoTaskHandlerResult, TaskHandler, WorkerContext};
use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::info;

use crate::queue::QueueHandle;

/// Number of stages the demo chain runs through.
pub const CHAIN_STAGES: u32 = 3;

pub(crate) const DEMO_FAILURE_MESSAGE: &str = "This is a sample error";

fn now_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| "unknown".into())
}

/// Sleeps for the given duration and names how long it took.
pub(crate) async fn simulate_delay(seconds: u64) -> String {
    tokio::time::sleep(std::time::Duration::from_secs(seconds)).await;
    format!("Task completed after {seconds} seconds")
}

/// The one failure this codebase ever produces on purpose.
pub(crate) fn demo_failure() -> Result<(), String> {
    Err(DEMO_FAILURE_MESSAGE.to_string())
}

pub(crate) fn double(value: i64) -> i64 {
    value * 2
}

/// Logs a timestamped message and nothing else.
#[derive(Debug, Serialize, Deserialize)]
pub struct SimpleTask {}

impl TaskHandler for SimpleTask {
    const IDENTIFIER: &'static str = "simple_task";

    async fn run(self, _ctx: WorkerContext) -> impl IntoTaskHandlerResult {
        info!("Simple task executed at {}", now_rfc3339());
        Ok::<(), String>(())
    }
}

/// Simulates a long-running operation by sleeping inside the worker.
#[derive(Debug, Serialize, Deserialize)]
pub struct LongRunningTask {
    #[serde(default = "default_seconds")]
    pub seconds: u64,
}

fn default_seconds() -> u64 {
    10
}

impl TaskHandler for LongRunningTask {
    const IDENTIFIER: &'static str = "long_running_task";

    async fn run(self, _ctx: WorkerContext) -> impl IntoTaskHandlerResult {
        info!("Starting long running task at {}", now_rfc3339());
        let result = simulate_delay(self.seconds).await;
        info!(%result, "Long running task completed at {}", now_rfc3339());
        Ok::<(), String>(())
    }
}

/// Always fails, so the queue's failure-reporting path stays exercised.
/// The error is not caught here; the queue runtime records the failed run.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorTask {}

impl TaskHandler for ErrorTask {
    const IDENTIFIER: &'static str = "error_task";

    async fn run(self, _ctx: WorkerContext) -> impl IntoTaskHandlerResult {
        info!("Starting error task");
        demo_failure()
    }
}

/// Reports the current time; also wired into the worker crontab.
#[derive(Debug, Serialize, Deserialize)]
pub struct PeriodicTask {}

impl TaskHandler for PeriodicTask {
    const IDENTIFIER: &'static str = "periodic_task";

    async fn run(self, _ctx: WorkerContext) -> impl IntoTaskHandlerResult {
        info!("Periodic task executed at {}", now_rfc3339());
        Ok::<(), String>(())
    }
}

/// One stage of the doubling chain.
///
/// Each stage doubles its input and, while stages remain, enqueues the next
/// stage with the doubled value as its sole input. Stage N+1 therefore only
/// starts once stage N has completed successfully.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainTask {
    pub value: i64,
    #[serde(default = "default_remaining")]
    pub remaining: u32,
}

fn default_remaining() -> u32 {
    1
}

impl ChainTask {
    pub(crate) fn next_stage(&self) -> Option<ChainTask> {
        (self.remaining > 1).then(|| ChainTask {
            value: double(self.value),
            remaining: self.remaining - 1,
        })
    }
}

impl TaskHandler for ChainTask {
    const IDENTIFIER: &'static str = "chain_task";

    async fn run(self, ctx: WorkerContext) -> impl IntoTaskHandlerResult {
        let result = double(self.value);
        info!("Chain task received value: {}, produced {}", self.value, result);

        if let Some(next) = self.next_stage() {
            let queue = ctx
                .get_ext::<QueueHandle>()
                .ok_or_else(|| "queue handle missing from worker context".to_string())?;
            queue.submit(next).await.map_err(|e| e.to_string())?;
        }

        Ok::<(), String>(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn doubling_three_stages_from_two_yields_sixteen() {
        assert_eq!(double(double(double(2))), 16);
    }

    #[test]
    fn next_stage_carries_doubled_value_until_stages_run_out() {
        let first = ChainTask {
            value: 2,
            remaining: CHAIN_STAGES,
        };
        let second = first.next_stage().expect("two stages left");
        assert_eq!(second.value, 4);
        assert_eq!(second.remaining, 2);

        let third = second.next_stage().expect("one stage left");
        assert_eq!(third.value, 8);
        assert_eq!(third.remaining, 1);

        assert!(third.next_stage().is_none());
        assert_eq!(double(third.value), 16);
    }

    #[test]
    fn delay_defaults_to_ten_seconds() {
        let task: LongRunningTask = serde_json::from_str("{}").expect("empty payload");
        assert_eq!(task.seconds, 10);
    }

    #[tokio::test(start_paused = true)]
    async fn delay_lasts_at_least_the_requested_duration() {
        let start = tokio::time::Instant::now();
        let message = simulate_delay(5).await;
        assert!(start.elapsed() >= Duration::from_secs(5));
        assert_eq!(message, "Task completed after 5 seconds");
    }

    #[test]
    fn error_task_always_fails_with_the_fixed_message() {
        let err = demo_failure().unwrap_err();
        assert_eq!(err, DEMO_FAILURE_MESSAGE);
    }
}
