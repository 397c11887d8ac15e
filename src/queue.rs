use std::fmt;
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use graphile_worker::{JobSpec, TaskHandler, WorkerUtils};
use serde::Serialize;
use sqlx::PgPool;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum QueueError {
    /// The broker refused or could not accept the job.
    #[error("failed to queue {identifier}: {message}")]
    Rejected { identifier: String, message: String },

    /// The job payload could not be serialized.
    #[error("invalid payload for {identifier}: {source}")]
    Payload {
        identifier: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Seam between the application and the external job queue.
///
/// Submission is fire-and-forget: the returned handle identifies the queued
/// job, execution happens later in the worker process.
#[async_trait]
pub trait QueueClient: Send + Sync {
    async fn submit_raw(
        &self,
        identifier: &str,
        payload: serde_json::Value,
    ) -> Result<String, QueueError>;
}

/// Postgres-backed queue client over `graphile_worker`.
#[derive(Clone)]
pub struct GraphileQueue {
    utils: WorkerUtils,
}

impl GraphileQueue {
    /// Connects the client and ensures the queue schema exists.
    ///
    /// The schema name must be a plain lowercase identifier; it is handed to
    /// the queue library as-is.
    pub async fn connect(db: PgPool, schema: &str) -> anyhow::Result<Self> {
        let utils = WorkerUtils::new(db, schema.to_string());
        utils
            .migrate()
            .await
            .context("migrate job queue schema")?;
        Ok(Self { utils })
    }
}

#[async_trait]
impl QueueClient for GraphileQueue {
    async fn submit_raw(
        &self,
        identifier: &str,
        payload: serde_json::Value,
    ) -> Result<String, QueueError> {
        let job = self
            .utils
            .add_raw_job(identifier, payload, JobSpec::default())
            .await
            .map_err(|e| QueueError::Rejected {
                identifier: identifier.to_string(),
                message: e.to_string(),
            })?;
        debug!(%identifier, job_id = *job.id(), "job queued");
        Ok(job.id().to_string())
    }
}

/// Cloneable handle to the queue client.
///
/// Lives in the API's `AppState` and rides along as a worker extension so
/// running jobs can enqueue follow-up work.
#[derive(Clone)]
pub struct QueueHandle(Arc<dyn QueueClient>);

impl QueueHandle {
    pub fn new(client: Arc<dyn QueueClient>) -> Self {
        Self(client)
    }

    /// Submit a typed job under its registered identifier.
    pub async fn submit<T>(&self, task: T) -> Result<String, QueueError>
    where
        T: TaskHandler + Serialize,
    {
        let payload = serde_json::to_value(&task).map_err(|source| QueueError::Payload {
            identifier: T::IDENTIFIER.to_string(),
            source,
        })?;
        self.0.submit_raw(T::IDENTIFIER, payload).await
    }
}

impl fmt::Debug for QueueHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueueHandle").finish_non_exhaustive()
    }
}
