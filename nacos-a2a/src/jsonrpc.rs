//! JSON-RPC binding of the A2A protocol.
//!
//! [`RequestHandler`] implements `message/send`, `tasks/get` and
//! `tasks/cancel` over a [`TaskStore`] and an [`AgentExecutor`]. It does not
//! depend on any HTTP framework; the `server` feature mounts it on axum.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{debug, info, warn};

use crate::executor::{AgentExecutor, RequestContext};
use crate::schema::Message;
use crate::store::{InMemoryTaskStore, StoreError, TaskStore};
use crate::task::{Task, TaskId, TaskState};

/// JSON-RPC protocol version.
pub const JSONRPC_VERSION: &str = "2.0";

/// Default time an agent gets to answer one message.
pub const DEFAULT_TASK_TIMEOUT: Duration = Duration::from_secs(60);

/// JSON-RPC and A2A error codes.
pub mod error_codes {
    /// Invalid JSON.
    pub const PARSE_ERROR: i64 = -32700;
    /// Not a valid request object.
    pub const INVALID_REQUEST: i64 = -32600;
    /// Unknown method.
    pub const METHOD_NOT_FOUND: i64 = -32601;
    /// Invalid method parameters.
    pub const INVALID_PARAMS: i64 = -32602;
    /// Internal error.
    pub const INTERNAL_ERROR: i64 = -32603;
    /// No task with the given id.
    pub const TASK_NOT_FOUND: i64 = -32001;
    /// The task is already in a terminal state.
    pub const TASK_NOT_CANCELABLE: i64 = -32002;
}

/// A JSON-RPC request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    /// Protocol version, must be `2.0`.
    pub jsonrpc: String,
    /// Request id, echoed in the response.
    #[serde(default)]
    pub id: Value,
    /// Method name.
    pub method: String,
    /// Method parameters.
    #[serde(default)]
    pub params: Value,
}

impl JsonRpcRequest {
    /// Create a request.
    pub fn new(id: impl Into<Value>, method: impl Into<String>, params: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: id.into(),
            method: method.into(),
            params,
        }
    }
}

/// A JSON-RPC error object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    /// Error code.
    pub code: i64,
    /// Short description.
    pub message: String,
    /// Additional information.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    /// Create an error.
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// Invalid JSON.
    pub fn parse_error(detail: impl Into<String>) -> Self {
        Self::new(error_codes::PARSE_ERROR, format!("Parse error: {}", detail.into()))
    }

    /// Invalid request object.
    pub fn invalid_request(detail: impl Into<String>) -> Self {
        Self::new(error_codes::INVALID_REQUEST, format!("Invalid request: {}", detail.into()))
    }

    /// Invalid parameters.
    pub fn invalid_params(detail: impl Into<String>) -> Self {
        Self::new(error_codes::INVALID_PARAMS, format!("Invalid params: {}", detail.into()))
    }

    /// Unknown method.
    pub fn method_not_found(method: &str) -> Self {
        Self::new(error_codes::METHOD_NOT_FOUND, format!("Method not found: {}", method))
    }

    /// Unknown task.
    pub fn task_not_found(task_id: &str) -> Self {
        Self::new(error_codes::TASK_NOT_FOUND, format!("Task not found: {}", task_id))
    }

    /// Internal failure.
    pub fn internal(detail: impl Into<String>) -> Self {
        Self::new(error_codes::INTERNAL_ERROR, detail)
    }
}

impl From<StoreError> for JsonRpcError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => Self::task_not_found(&id),
            other => Self::internal(other.to_string()),
        }
    }
}

/// A JSON-RPC response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    /// Protocol version.
    pub jsonrpc: String,
    /// Id of the request this answers.
    pub id: Value,
    /// Successful result.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    /// Successful response.
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Error response.
    pub fn failure(id: Value, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }
}

/// Parameters of `message/send`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageSendParams {
    /// The message.
    pub message: Message,
    /// Client preferences; accepted and ignored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub configuration: Option<Value>,
    /// Free-form metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

/// Parameters of `tasks/get`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskQueryParams {
    /// Task id.
    pub id: TaskId,
    /// Number of most recent history entries to return.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history_length: Option<usize>,
}

/// Parameters of `tasks/cancel`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskIdParams {
    /// Task id.
    pub id: TaskId,
}

/// Dispatches A2A JSON-RPC requests.
pub struct RequestHandler {
    executor: Arc<dyn AgentExecutor>,
    store: Arc<dyn TaskStore>,
    task_timeout: Duration,
    running: Mutex<HashMap<TaskId, Arc<Notify>>>,
}

impl std::fmt::Debug for RequestHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestHandler")
            .field("task_timeout", &self.task_timeout)
            .finish_non_exhaustive()
    }
}

impl RequestHandler {
    /// Create a handler with an in-memory task store.
    pub fn new(executor: Arc<dyn AgentExecutor>) -> Self {
        Self {
            executor,
            store: Arc::new(InMemoryTaskStore::new()),
            task_timeout: DEFAULT_TASK_TIMEOUT,
            running: Mutex::new(HashMap::new()),
        }
    }

    /// Use a custom task store.
    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn TaskStore>) -> Self {
        self.store = store;
        self
    }

    /// Set the time an agent gets to answer one message.
    #[must_use]
    pub fn with_task_timeout(mut self, timeout: Duration) -> Self {
        self.task_timeout = timeout;
        self
    }

    /// The task store.
    pub fn store(&self) -> &Arc<dyn TaskStore> {
        &self.store
    }

    /// Handle a raw request body.
    pub async fn handle_body(&self, body: &str) -> JsonRpcResponse {
        match serde_json::from_str::<Value>(body) {
            Ok(value) => self.handle_value(value).await,
            Err(e) => JsonRpcResponse::failure(Value::Null, JsonRpcError::parse_error(e.to_string())),
        }
    }

    /// Handle a parsed request document.
    pub async fn handle_value(&self, value: Value) -> JsonRpcResponse {
        let id = value.get("id").cloned().unwrap_or(Value::Null);
        match serde_json::from_value::<JsonRpcRequest>(value) {
            Ok(request) => self.handle(request).await,
            Err(e) => JsonRpcResponse::failure(id, JsonRpcError::invalid_request(e.to_string())),
        }
    }

    /// Handle a request.
    pub async fn handle(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        let id = request.id;
        if request.jsonrpc != JSONRPC_VERSION {
            return JsonRpcResponse::failure(
                id,
                JsonRpcError::invalid_request(format!("unsupported jsonrpc version '{}'", request.jsonrpc)),
            );
        }

        debug!(method = %request.method, "Handling JSON-RPC request");
        let result = match request.method.as_str() {
            "message/send" => match parse_params(request.params) {
                Ok(params) => self.send_message(params).await,
                Err(e) => Err(e),
            },
            "tasks/get" => match parse_params(request.params) {
                Ok(params) => self.get_task(params).await,
                Err(e) => Err(e),
            },
            "tasks/cancel" => match parse_params(request.params) {
                Ok(params) => self.cancel_task(params).await,
                Err(e) => Err(e),
            },
            other => Err(JsonRpcError::method_not_found(other)),
        };

        match result.and_then(|task| {
            serde_json::to_value(task).map_err(|e| JsonRpcError::internal(e.to_string()))
        }) {
            Ok(value) => JsonRpcResponse::success(id, value),
            Err(error) => JsonRpcResponse::failure(id, error),
        }
    }

    /// Run the agent for a message and return the resulting task.
    pub async fn send_message(&self, params: MessageSendParams) -> Result<Task, JsonRpcError> {
        let mut message = params.message;

        let (mut task, is_new) = match message.task_id.as_deref() {
            Some(task_id) => {
                let task = self
                    .store
                    .get(task_id)
                    .await?
                    .ok_or_else(|| JsonRpcError::task_not_found(task_id))?;
                if task.is_terminal() {
                    return Err(JsonRpcError::invalid_params(format!(
                        "task {} is already {}",
                        task.id,
                        task.state()
                    )));
                }
                (task, false)
            }
            None => {
                let context_id = message
                    .context_id
                    .clone()
                    .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
                (Task::new(context_id), true)
            }
        };
        if params.metadata.is_some() {
            task.metadata = params.metadata;
        }

        message.task_id = Some(task.id.clone());
        message.context_id = Some(task.context_id.clone());
        let history = task.history.clone();
        task.add_message(message.clone());
        task.start();
        if is_new {
            self.store.save(&task).await?;
        } else {
            self.store.update(&task).await?;
        }

        let cancelled = Arc::new(Notify::new());
        self.running.lock().insert(task.id.clone(), Arc::clone(&cancelled));

        let context = RequestContext {
            task_id: task.id.clone(),
            context_id: task.context_id.clone(),
            message,
            history,
        };
        let outcome = tokio::select! {
            result = tokio::time::timeout(self.task_timeout, self.executor.execute(context)) => Some(result),
            _ = cancelled.notified() => None,
        };
        self.running.lock().remove(&task.id);

        match outcome {
            Some(Ok(Ok(reply))) => {
                let reply = reply.in_task(task.id.clone(), task.context_id.clone());
                task.complete(reply);
                info!(task_id = %task.id, "Task completed");
            }
            Some(Ok(Err(e))) => {
                warn!(task_id = %task.id, error = %e, "Task failed");
                task.fail(e.to_string());
            }
            Some(Err(_)) => {
                warn!(task_id = %task.id, timeout_secs = self.task_timeout.as_secs_f64(), "Task timed out");
                task.fail(format!(
                    "Task timed out after {:.1}s",
                    self.task_timeout.as_secs_f64()
                ));
            }
            None => debug!(task_id = %task.id, "Task cancelled while running"),
        }

        // A concurrent tasks/cancel wins over the execution result.
        if let Some(current) = self.store.get(&task.id).await? {
            if current.state() == TaskState::Canceled {
                return Ok(current);
            }
        }
        self.store.update(&task).await?;
        Ok(task)
    }

    /// Look up a task.
    pub async fn get_task(&self, params: TaskQueryParams) -> Result<Task, JsonRpcError> {
        let task = self
            .store
            .get(&params.id)
            .await?
            .ok_or_else(|| JsonRpcError::task_not_found(&params.id))?;
        Ok(task.with_history_length(params.history_length))
    }

    /// Cancel a task that has not finished yet.
    pub async fn cancel_task(&self, params: TaskIdParams) -> Result<Task, JsonRpcError> {
        let mut task = self
            .store
            .get(&params.id)
            .await?
            .ok_or_else(|| JsonRpcError::task_not_found(&params.id))?;
        if task.is_terminal() {
            return Err(JsonRpcError::new(
                error_codes::TASK_NOT_CANCELABLE,
                format!("Task cannot be canceled: {} is already {}", task.id, task.state()),
            ));
        }

        task.cancel();
        self.store.update(&task).await?;

        let running = self.running.lock().get(&task.id).cloned();
        if let Some(cancelled) = running {
            cancelled.notify_one();
        }
        if let Err(e) = self.executor.cancel(&task.id).await {
            warn!(task_id = %task.id, error = %e, "Executor failed to cancel task");
        }

        info!(task_id = %task.id, "Task cancelled");
        Ok(task)
    }
}

fn parse_params<T: serde::de::DeserializeOwned>(params: Value) -> Result<T, JsonRpcError> {
    serde_json::from_value(params).map_err(|e| JsonRpcError::invalid_params(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::{ExecutorError, MockAgentExecutor};
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tokio::sync::mpsc;

    fn echo_executor() -> Arc<dyn AgentExecutor> {
        let mut mock = MockAgentExecutor::new();
        mock.expect_execute()
            .returning(|ctx| Ok(Message::agent(format!("echo: {}", ctx.message.text_content()))));
        Arc::new(mock)
    }

    fn send_request(id: i64, message: Value) -> JsonRpcRequest {
        JsonRpcRequest::new(id, "message/send", json!({ "message": message }))
    }

    fn user_message(text: &str) -> Value {
        json!({"kind": "message", "messageId": "m-1", "role": "user", "parts": [{"kind": "text", "text": text}]})
    }

    struct BlockingExecutor {
        started: mpsc::UnboundedSender<TaskId>,
    }

    #[async_trait]
    impl AgentExecutor for BlockingExecutor {
        async fn execute(&self, context: RequestContext) -> Result<Message, ExecutorError> {
            let _ = self.started.send(context.task_id);
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(Message::agent("too late"))
        }
    }

    #[tokio::test]
    async fn test_message_send_completes_task() {
        let handler = RequestHandler::new(echo_executor());

        let response = handler.handle(send_request(1, user_message("hi"))).await;

        assert_eq!(response.id, json!(1));
        assert!(response.error.is_none());
        let task: Task = serde_json::from_value(response.result.unwrap()).unwrap();
        assert_eq!(task.state(), TaskState::Completed);
        assert_eq!(task.history.len(), 2);
        assert_eq!(task.history[1].text_content(), "echo: hi");
        assert_eq!(task.history[1].task_id.as_deref(), Some(task.id.as_str()));
        assert_eq!(task.history[0].context_id.as_deref(), Some(task.context_id.as_str()));

        let stored = handler.store().get(&task.id).await.unwrap().unwrap();
        assert_eq!(stored, task);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_messages_get_separate_tasks() {
        let handler = Arc::new(RequestHandler::new(echo_executor()));

        let responses = futures::future::join_all((0..8).map(|i| {
            let handler = Arc::clone(&handler);
            async move {
                handler
                    .handle(send_request(i, user_message(&format!("msg {}", i))))
                    .await
            }
        }))
        .await;

        let mut ids = Vec::new();
        for (i, response) in responses.into_iter().enumerate() {
            let task: Task = serde_json::from_value(response.result.unwrap()).unwrap();
            assert_eq!(task.state(), TaskState::Completed);
            assert_eq!(task.history[1].text_content(), format!("echo: msg {}", i));
            ids.push(task.id);
        }
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 8);
    }

    #[tokio::test]
    async fn test_executor_error_fails_task() {
        let mut mock = MockAgentExecutor::new();
        mock.expect_execute()
            .returning(|_| Err(ExecutorError::Failed("model unavailable".into())));
        let handler = RequestHandler::new(Arc::new(mock));

        let response = handler.handle(send_request(2, user_message("hi"))).await;

        let task: Task = serde_json::from_value(response.result.unwrap()).unwrap();
        assert_eq!(task.state(), TaskState::Failed);
        assert!(task
            .status
            .message
            .unwrap()
            .text_content()
            .contains("model unavailable"));
    }

    #[tokio::test]
    async fn test_task_timeout_fails_task() {
        let (started, _rx) = mpsc::unbounded_channel();
        let handler = RequestHandler::new(Arc::new(BlockingExecutor { started }))
            .with_task_timeout(Duration::from_millis(20));

        let task = handler
            .send_message(MessageSendParams {
                message: Message::user("hi"),
                configuration: None,
                metadata: None,
            })
            .await
            .unwrap();

        assert_eq!(task.state(), TaskState::Failed);
        assert!(task.status.message.unwrap().text_content().contains("timed out"));
    }

    #[tokio::test]
    async fn test_tasks_get_and_history_length() {
        let handler = RequestHandler::new(echo_executor());
        let response = handler.handle(send_request(1, user_message("hi"))).await;
        let task_id = response.result.unwrap()["id"].as_str().unwrap().to_string();

        let response = handler
            .handle(JsonRpcRequest::new(2, "tasks/get", json!({"id": task_id, "historyLength": 1})))
            .await;
        let task: Task = serde_json::from_value(response.result.unwrap()).unwrap();
        assert_eq!(task.history.len(), 1);
        assert_eq!(task.history[0].text_content(), "echo: hi");

        let response = handler
            .handle(JsonRpcRequest::new(3, "tasks/get", json!({"id": "missing"})))
            .await;
        assert_eq!(response.error.unwrap().code, error_codes::TASK_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_cancel_running_task() {
        let (started, mut rx) = mpsc::unbounded_channel();
        let handler = Arc::new(RequestHandler::new(Arc::new(BlockingExecutor { started })));

        let sender = Arc::clone(&handler);
        let send = tokio::spawn(async move {
            sender
                .send_message(MessageSendParams {
                    message: Message::user("long job"),
                    configuration: None,
                    metadata: None,
                })
                .await
        });

        let task_id = rx.recv().await.unwrap();
        let cancelled = handler.cancel_task(TaskIdParams { id: task_id.clone() }).await.unwrap();
        assert_eq!(cancelled.state(), TaskState::Canceled);

        let task = send.await.unwrap().unwrap();
        assert_eq!(task.id, task_id);
        assert_eq!(task.state(), TaskState::Canceled);
    }

    #[tokio::test]
    async fn test_cancel_finished_task_is_rejected() {
        let handler = RequestHandler::new(echo_executor());
        let response = handler.handle(send_request(1, user_message("hi"))).await;
        let task_id = response.result.unwrap()["id"].clone();

        let response = handler
            .handle(JsonRpcRequest::new(2, "tasks/cancel", json!({ "id": task_id })))
            .await;
        assert_eq!(response.error.unwrap().code, error_codes::TASK_NOT_CANCELABLE);
    }

    #[tokio::test]
    async fn test_follow_up_on_finished_task_is_rejected() {
        let handler = RequestHandler::new(echo_executor());
        let response = handler.handle(send_request(1, user_message("hi"))).await;
        let task_id = response.result.unwrap()["id"].clone();

        let mut follow_up = user_message("again");
        follow_up["taskId"] = task_id;
        let response = handler.handle(send_request(2, follow_up)).await;
        assert_eq!(response.error.unwrap().code, error_codes::INVALID_PARAMS);

        let mut unknown = user_message("again");
        unknown["taskId"] = json!("nope");
        let response = handler.handle(send_request(3, unknown)).await;
        assert_eq!(response.error.unwrap().code, error_codes::TASK_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_protocol_errors() {
        let handler = RequestHandler::new(echo_executor());

        let response = handler.handle_body("{not json").await;
        assert_eq!(response.error.unwrap().code, error_codes::PARSE_ERROR);

        let response = handler.handle_value(json!({"id": 7, "params": {}})).await;
        assert_eq!(response.id, json!(7));
        assert_eq!(response.error.unwrap().code, error_codes::INVALID_REQUEST);

        let response = handler
            .handle_value(json!({"jsonrpc": "1.0", "id": 8, "method": "tasks/get"}))
            .await;
        assert_eq!(response.error.unwrap().code, error_codes::INVALID_REQUEST);

        let response = handler
            .handle(JsonRpcRequest::new(9, "message/stream", json!({})))
            .await;
        assert_eq!(response.error.unwrap().code, error_codes::METHOD_NOT_FOUND);

        let response = handler
            .handle(JsonRpcRequest::new(10, "message/send", json!({"msg": 1})))
            .await;
        assert_eq!(response.error.unwrap().code, error_codes::INVALID_PARAMS);
    }
}
