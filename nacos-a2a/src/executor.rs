//! Agent execution.
//!
//! An [`AgentExecutor`] turns an incoming message into the agent's reply.
//! Plain async functions can be used through [`executor_fn`].

use async_trait::async_trait;
use std::future::Future;
use thiserror::Error;

use crate::schema::Message;
use crate::task::TaskId;

/// Input for one execution.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Task being executed.
    pub task_id: TaskId,
    /// Conversation the task belongs to.
    pub context_id: String,
    /// The message that triggered the execution.
    pub message: Message,
    /// Earlier messages of the task, oldest first, excluding `message`.
    pub history: Vec<Message>,
}

/// Errors reported by an executor.
#[derive(Debug, Error)]
pub enum ExecutorError {
    /// The agent could not produce a reply.
    #[error("Agent execution failed: {0}")]
    Failed(String),

    /// The message cannot be handled by this agent.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// Runs an agent for a task.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AgentExecutor: Send + Sync {
    /// Produce the agent's reply for `context`.
    async fn execute(&self, context: RequestContext) -> Result<Message, ExecutorError>;

    /// Called when a running task is cancelled.
    async fn cancel(&self, _task_id: &str) -> Result<(), ExecutorError> {
        Ok(())
    }
}

/// Executor backed by an async function.
pub struct FnExecutor<F> {
    func: F,
}

impl<F> std::fmt::Debug for FnExecutor<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnExecutor").finish_non_exhaustive()
    }
}

/// Wrap an async function as an [`AgentExecutor`].
///
/// ```rust
/// use nacos_a2a::{executor_fn, Message};
///
/// let executor = executor_fn(|ctx| async move {
///     Ok(Message::agent(format!("echo: {}", ctx.message.text_content())))
/// });
/// ```
pub fn executor_fn<F, Fut>(func: F) -> FnExecutor<F>
where
    F: Fn(RequestContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Message, ExecutorError>> + Send + 'static,
{
    FnExecutor { func }
}

#[async_trait]
impl<F, Fut> AgentExecutor for FnExecutor<F>
where
    F: Fn(RequestContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Message, ExecutorError>> + Send + 'static,
{
    async fn execute(&self, context: RequestContext) -> Result<Message, ExecutorError> {
        (self.func)(context).await
    }
}
