use serde::Serialize;

/// One handle per submitted job plus a confirmation message.
#[derive(Debug, Serialize)]
pub struct TaskDemoResponse {
    pub simple_task_id: String,
    pub long_task_id: String,
    pub error_task_id: String,
    pub periodic_task_id: String,
    pub chain_task_id: String,
    pub message: String,
}
