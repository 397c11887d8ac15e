use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use tracing::{info, instrument};

use crate::state::AppState;

use super::dto::TaskDemoResponse;
use super::jobs::{ChainTask, ErrorTask, LongRunningTask, PeriodicTask, SimpleTask, CHAIN_STAGES};

pub fn task_routes() -> Router<AppState> {
    Router::new().route("/tasks/demo", get(task_demo))
}

/// Fire-and-forget submission of every demo job.
///
/// None of the submissions wait for execution; the response carries the queue
/// handles so callers can look jobs up later. One of the five is guaranteed
/// to fail once it runs; that is the point of it.
#[instrument(skip(state))]
pub async fn task_demo(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<TaskDemoResponse>), (StatusCode, String)> {
    let simple_task_id = state.queue.submit(SimpleTask {}).await.map_err(internal)?;

    // Override the default of 10 seconds
    let long_task_id = state
        .queue
        .submit(LongRunningTask { seconds: 5 })
        .await
        .map_err(internal)?;

    let error_task_id = state.queue.submit(ErrorTask {}).await.map_err(internal)?;

    let periodic_task_id = state.queue.submit(PeriodicTask {}).await.map_err(internal)?;

    // Three-stage doubling chain starting at 2; later stages enqueue
    // themselves, so the handle is the first stage's id.
    let chain_task_id = state
        .queue
        .submit(ChainTask {
            value: 2,
            remaining: CHAIN_STAGES,
        })
        .await
        .map_err(internal)?;

    info!(
        %simple_task_id,
        %long_task_id,
        %error_task_id,
        %periodic_task_id,
        %chain_task_id,
        "all demo tasks queued"
    );

    Ok((
        StatusCode::ACCEPTED,
        Json(TaskDemoResponse {
            simple_task_id,
            long_task_id,
            error_task_id,
            periodic_task_id,
            chain_task_id,
            message: "All tasks have been queued".to_string(),
        }),
    ))
}

fn internal<E: std::error::Error>(e: E) -> (StatusCode, String) {
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

#[cfg(test)]
mod task_demo_tests {
    use super::*;

    #[tokio::test]
    async fn returns_accepted_with_all_six_keys() {
        let state = AppState::fake();
        let (status, Json(body)) = task_demo(State(state))
            .await
            .expect("submission against fake queue should succeed");

        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(body.message, "All tasks have been queued");

        let value = serde_json::to_value(&body).expect("response serializes");
        let obj = value.as_object().expect("response is an object");
        assert_eq!(obj.len(), 6);
        for key in [
            "simple_task_id",
            "long_task_id",
            "error_task_id",
            "periodic_task_id",
            "chain_task_id",
            "message",
        ] {
            assert!(obj[key].is_string(), "{key} should be a string");
        }
    }

    #[tokio::test]
    async fn handles_are_distinct_per_submission() {
        let state = AppState::fake();
        let (_, Json(body)) = task_demo(State(state)).await.expect("handler ok");

        let ids = [
            &body.simple_task_id,
            &body.long_task_id,
            &body.error_task_id,
            &body.periodic_task_id,
            &body.chain_task_id,
        ];
        for (i, a) in ids.iter().enumerate() {
            for b in ids.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }
}
