//! Task types for the A2A protocol.
//!
//! A task tracks one unit of work an agent performs in response to a
//! `message/send` call.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::schema::Message;

/// Unique identifier for a task.
pub type TaskId = String;

/// Lifecycle state of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskState {
    /// Accepted, not started.
    Submitted,
    /// Being processed.
    Working,
    /// Waiting for more input from the client.
    InputRequired,
    /// Finished successfully.
    Completed,
    /// Cancelled by the client.
    Canceled,
    /// Finished with an error.
    Failed,
    /// Refused by the agent.
    Rejected,
}

impl TaskState {
    /// Whether no further transitions are possible.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskState::Completed | TaskState::Canceled | TaskState::Failed | TaskState::Rejected
        )
    }
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TaskState::Submitted => "submitted",
            TaskState::Working => "working",
            TaskState::InputRequired => "input-required",
            TaskState::Completed => "completed",
            TaskState::Canceled => "canceled",
            TaskState::Failed => "failed",
            TaskState::Rejected => "rejected",
        };
        f.write_str(name)
    }
}

/// Current status of a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskStatus {
    /// Lifecycle state.
    pub state: TaskState,
    /// Agent message accompanying the state, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
    /// When the state was entered.
    pub timestamp: DateTime<Utc>,
}

impl TaskStatus {
    fn new(state: TaskState, message: Option<Message>) -> Self {
        Self {
            state,
            message,
            timestamp: Utc::now(),
        }
    }
}

/// A task in the A2A protocol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Object discriminator, always `task`.
    #[serde(default = "task_kind")]
    pub kind: String,
    /// Unique identifier.
    pub id: TaskId,
    /// Conversation the task belongs to.
    pub context_id: String,
    /// Current status.
    pub status: TaskStatus,
    /// Messages exchanged for this task, oldest first.
    #[serde(default)]
    pub history: Vec<Message>,
    /// Free-form metadata.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

fn task_kind() -> String {
    "task".to_string()
}

impl Task {
    /// Create a submitted task with a fresh identifier.
    pub fn new(context_id: impl Into<String>) -> Self {
        Self::with_id(uuid::Uuid::new_v4().to_string(), context_id)
    }

    /// Create a submitted task with a specific identifier.
    pub fn with_id(id: impl Into<String>, context_id: impl Into<String>) -> Self {
        Self {
            kind: task_kind(),
            id: id.into(),
            context_id: context_id.into(),
            status: TaskStatus::new(TaskState::Submitted, None),
            history: Vec::new(),
            metadata: None,
        }
    }

    /// Current state.
    pub fn state(&self) -> TaskState {
        self.status.state
    }

    /// Whether the task reached a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.status.state.is_terminal()
    }

    /// Append a message to the history.
    pub fn add_message(&mut self, message: Message) {
        self.history.push(message);
    }

    /// Mark the task as being processed.
    pub fn start(&mut self) {
        self.status = TaskStatus::new(TaskState::Working, None);
    }

    /// Mark the task as completed with the agent's reply.
    pub fn complete(&mut self, reply: Message) {
        self.history.push(reply.clone());
        self.status = TaskStatus::new(TaskState::Completed, Some(reply));
    }

    /// Mark the task as failed.
    pub fn fail(&mut self, error: impl Into<String>) {
        let message = Message::agent(error).in_task(self.id.clone(), self.context_id.clone());
        self.status = TaskStatus::new(TaskState::Failed, Some(message));
    }

    /// Mark the task as cancelled.
    pub fn cancel(&mut self) {
        self.status = TaskStatus::new(TaskState::Canceled, None);
    }

    /// Copy of the task keeping only the last `length` history entries.
    pub fn with_history_length(&self, length: Option<usize>) -> Self {
        let mut task = self.clone();
        if let Some(length) = length {
            let skip = task.history.len().saturating_sub(length);
            task.history.drain(..skip);
        }
        task
    }
}
