//! WebSocket client for a `crewboard-store` server.
//!
//! One socket carries every call. Each request gets a fresh `u64` id; a
//! background reader task routes each response to the caller waiting on
//! that id, so several calls may be in flight and complete in any order.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use crewboard_proto::member::Member;
use crewboard_proto::task::{NewTask, Task, TaskId, TaskPatch};
use crewboard_proto::wire::{self, StoreOp, StoreReply, StoreRequest};

use super::{StoreError, TaskStore};

/// Type alias for the write half of a WebSocket connection.
type WsSender = futures_util::stream::SplitSink<
    WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>,
    Message,
>;

/// Type alias for the read half of a WebSocket connection.
type WsReader =
    futures_util::stream::SplitStream<WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>>;

/// Callers waiting for a response, keyed by request id.
type PendingReplies = Arc<Mutex<HashMap<u64, oneshot::Sender<StoreReply>>>>;

/// Default timeout for connecting to the store server.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// [`TaskStore`] backed by a `crewboard-store` WebSocket endpoint.
///
/// Created via [`RemoteStore::connect`], which establishes the connection
/// and spawns the background reader task.
pub struct RemoteStore {
    /// The store URL (ws:// or wss://).
    url: String,
    /// Write half of the WebSocket (shared for concurrent sends).
    ws_sender: tokio::sync::Mutex<WsSender>,
    /// In-flight calls.
    pending: PendingReplies,
    /// Next request id. Id 0 is reserved for replies to malformed frames.
    next_id: AtomicU64,
    /// Whether the connection is still open.
    connected: Arc<AtomicBool>,
    /// Handle to the background reader task.
    _reader_handle: tokio::task::JoinHandle<()>,
}

impl RemoteStore {
    /// Connects to the store at `url`.
    ///
    /// Only the connect itself is bounded by `connect_timeout`; individual
    /// calls wait as long as the store takes.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Transport`] if the connection cannot be
    /// established in time.
    pub async fn connect(url: &str, connect_timeout: Duration) -> Result<Self, StoreError> {
        let (ws_stream, _response) = tokio::time::timeout(connect_timeout, connect_async(url))
            .await
            .map_err(|_| {
                tracing::warn!(url, "store connect timed out");
                StoreError::Transport(format!("connect to {url} timed out"))
            })?
            .map_err(|e| {
                tracing::warn!(url, error = %e, "store connect failed");
                StoreError::Transport(e.to_string())
            })?;

        let (ws_sender, ws_reader) = ws_stream.split();
        let pending: PendingReplies = Arc::new(Mutex::new(HashMap::new()));
        let connected = Arc::new(AtomicBool::new(true));

        let reader_handle = tokio::spawn(reader_loop(
            ws_reader,
            Arc::clone(&pending),
            Arc::clone(&connected),
        ));

        tracing::info!(url, "connected to store");
        Ok(Self {
            url: url.to_string(),
            ws_sender: tokio::sync::Mutex::new(ws_sender),
            pending,
            next_id: AtomicU64::new(1),
            connected,
            _reader_handle: reader_handle,
        })
    }

    /// Return the store URL this client is connected to.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Whether the connection to the store is still open.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Sends one request and waits for its response.
    ///
    /// Store-side rejections come back as [`StoreError::Rejected`].
    async fn call(&self, op: StoreOp) -> Result<StoreReply, StoreError> {
        if !self.is_connected() {
            return Err(StoreError::ConnectionClosed);
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let op_name = op.name();
        let text = wire::encode_request(&StoreRequest { id, op })
            .map_err(|e| StoreError::Codec(e.to_string()))?;

        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(id, tx);
        // The reader clears `connected` before draining, so a registration
        // that raced with shutdown is caught here.
        if !self.is_connected() {
            self.pending.lock().remove(&id);
            return Err(StoreError::ConnectionClosed);
        }

        tracing::debug!(request_id = id, op = op_name, "sending store request");
        let sent = self
            .ws_sender
            .lock()
            .await
            .send(Message::Text(text.into()))
            .await;
        if let Err(e) = sent {
            tracing::warn!(request_id = id, error = %e, "store send failed");
            self.pending.lock().remove(&id);
            self.connected.store(false, Ordering::SeqCst);
            return Err(StoreError::ConnectionClosed);
        }

        match rx.await.map_err(|_| StoreError::ConnectionClosed)? {
            StoreReply::Error { code, message } => {
                tracing::debug!(request_id = id, %code, "store rejected request");
                Err(StoreError::Rejected { code, message })
            }
            reply => Ok(reply),
        }
    }
}

impl TaskStore for RemoteStore {
    async fn list_members(&self, limit: u32) -> Result<Vec<Member>, StoreError> {
        match self.call(StoreOp::ListMembers { limit }).await? {
            StoreReply::Members(members) => Ok(members),
            other => Err(unexpected("members", &other)),
        }
    }

    async fn list_tasks(&self, limit: u32) -> Result<Vec<Task>, StoreError> {
        match self.call(StoreOp::ListTasks { limit }).await? {
            StoreReply::Tasks(tasks) => Ok(tasks),
            other => Err(unexpected("tasks", &other)),
        }
    }

    async fn create_task(&self, task: NewTask) -> Result<Task, StoreError> {
        match self.call(StoreOp::CreateTask { task }).await? {
            StoreReply::Task(task) => Ok(task),
            other => Err(unexpected("task", &other)),
        }
    }

    async fn update_task(&self, id: &TaskId, patch: TaskPatch) -> Result<Task, StoreError> {
        let op = StoreOp::UpdateTask {
            id: id.clone(),
            patch,
        };
        match self.call(op).await? {
            StoreReply::Task(task) => Ok(task),
            other => Err(unexpected("task", &other)),
        }
    }

    async fn delete_task(&self, id: &TaskId) -> Result<(), StoreError> {
        match self.call(StoreOp::DeleteTask { id: id.clone() }).await? {
            StoreReply::Deleted { .. } => Ok(()),
            other => Err(unexpected("deleted", &other)),
        }
    }
}

fn unexpected(wanted: &str, got: &StoreReply) -> StoreError {
    let got = match got {
        StoreReply::Members(_) => "members",
        StoreReply::Tasks(_) => "tasks",
        StoreReply::Task(_) => "task",
        StoreReply::Deleted { .. } => "deleted",
        StoreReply::Error { .. } => "error",
    };
    StoreError::UnexpectedReply(format!("expected {wanted}, got {got}"))
}

/// Background task that reads responses and hands them to their callers.
///
/// Malformed frames are logged and skipped. When the socket closes or
/// errors out, `connected` is cleared and every waiting caller is released
/// with [`StoreError::ConnectionClosed`].
async fn reader_loop(mut ws_reader: WsReader, pending: PendingReplies, connected: Arc<AtomicBool>) {
    while let Some(msg_result) = ws_reader.next().await {
        match msg_result {
            Ok(Message::Text(text)) => match wire::decode_response(text.as_str()) {
                Ok(resp) => {
                    let waiter = pending.lock().remove(&resp.id);
                    match waiter {
                        Some(tx) => {
                            // Caller may have gone away; nothing to do then.
                            let _ = tx.send(resp.reply);
                        }
                        None if resp.id == 0 => {
                            tracing::warn!(reply = ?resp.reply, "store could not parse a request");
                        }
                        None => {
                            tracing::debug!(request_id = resp.id, "response for unknown request");
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "malformed store frame, skipping");
                }
            },
            Ok(Message::Close(_)) => {
                tracing::info!("store closed the connection");
                break;
            }
            Ok(_) => {
                // Ignore binary, ping, pong and raw frames.
            }
            Err(e) => {
                tracing::warn!(error = %e, "store read error");
                break;
            }
        }
    }

    connected.store(false, Ordering::SeqCst);
    let abandoned: Vec<_> = pending.lock().drain().collect();
    if !abandoned.is_empty() {
        tracing::warn!(count = abandoned.len(), "dropping in-flight store calls");
    }
    tracing::info!("store reader task exiting");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crewboard_proto::task::TaskStatus;
    use crewboard_proto::wire::{ErrorCode, StoreResponse};
    use crewboard_store::server::start_server;

    async fn connect_to(addr: std::net::SocketAddr) -> RemoteStore {
        RemoteStore::connect(&format!("ws://{addr}/ws"), DEFAULT_CONNECT_TIMEOUT)
            .await
            .unwrap()
    }

    fn new_task(title: &str) -> NewTask {
        NewTask {
            title: title.to_string(),
            ..NewTask::default()
        }
    }

    #[tokio::test]
    async fn create_update_list_delete() {
        let (addr, _handle) = start_server("127.0.0.1:0").await.unwrap();
        let store = connect_to(addr).await;

        let task = store.create_task(new_task("Order ice")).await.unwrap();
        assert_eq!(task.status, TaskStatus::Todo);

        let updated = store
            .update_task(&task.id, TaskPatch::status_only(TaskStatus::Done))
            .await
            .unwrap();
        assert_eq!(updated.status, TaskStatus::Done);

        let tasks = store.list_tasks(200).await.unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].status, TaskStatus::Done);

        store.delete_task(&task.id).await.unwrap();
        assert!(store.list_tasks(200).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn rejection_carries_code() {
        let (addr, _handle) = start_server("127.0.0.1:0").await.unwrap();
        let store = connect_to(addr).await;

        let err = store.delete_task(&TaskId::new()).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::Rejected {
                code: ErrorCode::NotFound,
                ..
            }
        ));

        let err = store.create_task(new_task("   ")).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::Rejected {
                code: ErrorCode::Invalid,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn concurrent_calls_share_one_socket() {
        let (addr, _handle) = start_server("127.0.0.1:0").await.unwrap();
        let store = Arc::new(connect_to(addr).await);

        let mut handles = Vec::new();
        for i in 0..10 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store.create_task(new_task(&format!("Task {i}"))).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        assert_eq!(store.list_tasks(200).await.unwrap().len(), 10);
    }

    #[tokio::test]
    async fn connect_to_closed_port_fails() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let result = RemoteStore::connect(&format!("ws://{addr}/ws"), Duration::from_secs(2)).await;
        assert!(matches!(result, Err(StoreError::Transport(_))));
    }

    #[tokio::test]
    async fn responses_are_routed_by_id_not_arrival_order() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        // Answers the first two requests in reverse order.
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            let mut ids = Vec::new();
            while ids.len() < 2 {
                if let Some(Ok(Message::Text(text))) = ws.next().await {
                    let req = wire::decode_request(text.as_str()).unwrap();
                    let StoreOp::ListMembers { limit } = req.op else {
                        panic!("expected list_members");
                    };
                    ids.push((req.id, limit));
                }
            }
            for (id, limit) in ids.into_iter().rev() {
                let member = Member {
                    id: crewboard_proto::member::MemberId::new(),
                    full_name: format!("limit {limit}"),
                    email: String::new(),
                    committee: "Food".to_string(),
                    role: String::new(),
                    status: crewboard_proto::member::PresenceStatus::Active,
                    is_leader: false,
                    avatar_url: None,
                };
                let resp = StoreResponse {
                    id,
                    reply: StoreReply::Members(vec![member]),
                };
                let text = wire::encode_response(&resp).unwrap();
                ws.send(Message::Text(text.into())).await.unwrap();
            }
            // Keep the socket open until the client is done.
            let _ = ws.next().await;
        });

        let store = connect_to(addr).await;
        let (first, second) = tokio::join!(store.list_members(1), store.list_members(2));
        assert_eq!(first.unwrap()[0].full_name, "limit 1");
        assert_eq!(second.unwrap()[0].full_name, "limit 2");
    }

    #[tokio::test]
    async fn in_flight_call_fails_when_server_drops_connection() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            // Read one request, then hang up without answering.
            let _ = ws.next().await;
            drop(ws);
        });

        let store = connect_to(addr).await;
        let err = store.list_tasks(200).await.unwrap_err();
        assert_eq!(err, StoreError::ConnectionClosed);

        // Later calls fail fast.
        let err = store.list_members(100).await.unwrap_err();
        assert_eq!(err, StoreError::ConnectionClosed);
    }
}
