//! WebSocket endpoint for the store.
//!
//! Each connection carries [`StoreRequest`] text frames. Requests are
//! dispatched concurrently against the shared [`Tables`]; responses are
//! funnelled through one writer task per connection and may leave in a
//! different order than their requests arrived.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use crewboard_proto::wire::{self, ErrorCode, StoreOp, StoreReply, StoreRequest, StoreResponse};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use crate::tables::{TableError, Tables};

/// Shared server state.
pub struct StoreState {
    /// The members and tasks tables.
    pub tables: Tables,
}

impl Default for StoreState {
    fn default() -> Self {
        Self::new()
    }
}

impl StoreState {
    /// Creates a state with empty tables and default page caps.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tables: Tables::new(),
        }
    }

    /// Creates a state around pre-configured tables.
    #[must_use]
    pub const fn with_tables(tables: Tables) -> Self {
        Self { tables }
    }
}

/// Executes one operation against the tables.
pub async fn dispatch(tables: &Tables, op: StoreOp) -> StoreReply {
    let result = match op {
        StoreOp::ListMembers { limit } => Ok(StoreReply::Members(tables.list_members(limit).await)),
        StoreOp::ListTasks { limit } => Ok(StoreReply::Tasks(tables.list_tasks(limit).await)),
        StoreOp::CreateTask { task } => tables.insert_task(task).await.map(StoreReply::Task),
        StoreOp::UpdateTask { id, patch } => {
            tables.update_task(&id, &patch).await.map(StoreReply::Task)
        }
        StoreOp::DeleteTask { id } => tables
            .delete_task(&id)
            .await
            .map(|id| StoreReply::Deleted { id }),
    };
    result.unwrap_or_else(|e: TableError| StoreReply::Error {
        code: e.code(),
        message: e.to_string(),
    })
}

/// Handles an upgraded WebSocket connection.
///
/// The connection lifecycle:
/// 1. Spawn a writer task draining the response channel into the socket.
/// 2. For each text frame, decode the request and spawn its dispatch.
/// 3. On close or read error, stop reading; the writer exits once every
///    in-flight dispatch has dropped its sender.
pub async fn handle_socket(socket: WebSocket, state: Arc<StoreState>) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<StoreResponse>();

    let writer = tokio::spawn(async move {
        while let Some(resp) = rx.recv().await {
            let text = match wire::encode_response(&resp) {
                Ok(t) => t,
                Err(e) => {
                    tracing::error!(request_id = resp.id, error = %e, "failed to encode response");
                    continue;
                }
            };
            if ws_sender.send(Message::Text(text.into())).await.is_err() {
                tracing::warn!("WebSocket write failed");
                break;
            }
        }
    });

    while let Some(Ok(msg)) = ws_receiver.next().await {
        match msg {
            Message::Text(text) => handle_text(text.as_str(), &state, &tx),
            Message::Close(_) => {
                tracing::debug!("received close frame");
                break;
            }
            _ => {
                // Ignore binary, ping, pong frames.
            }
        }
    }

    drop(tx);
    if let Err(e) = writer.await {
        tracing::warn!(error = %e, "writer task failed");
    }
    tracing::debug!("store connection closed");
}

fn handle_text(text: &str, state: &Arc<StoreState>, tx: &mpsc::UnboundedSender<StoreResponse>) {
    let StoreRequest { id, op } = match wire::decode_request(text) {
        Ok(req) => req,
        Err(e) => {
            tracing::warn!(error = %e, "malformed request frame");
            let _ = tx.send(StoreResponse {
                id: 0,
                reply: StoreReply::Error {
                    code: ErrorCode::Malformed,
                    message: e.to_string(),
                },
            });
            return;
        }
    };

    tracing::debug!(request_id = id, op = op.name(), "dispatching request");
    let state = Arc::clone(state);
    let tx = tx.clone();
    tokio::spawn(async move {
        let reply = dispatch(&state.tables, op).await;
        if let StoreReply::Error { code, message } = &reply {
            tracing::info!(request_id = id, %code, message = %message, "request rejected");
        }
        let _ = tx.send(StoreResponse { id, reply });
    });
}

/// Starts the store server on the given address and returns the bound
/// address and a join handle.
///
/// # Errors
///
/// Returns an error if the TCP listener cannot bind to the given address.
pub async fn start_server(
    addr: &str,
) -> Result<
    (std::net::SocketAddr, tokio::task::JoinHandle<()>),
    Box<dyn std::error::Error + Send + Sync>,
> {
    start_server_with_state(addr, Arc::new(StoreState::new())).await
}

/// Starts the store server with a pre-configured [`StoreState`].
///
/// # Errors
///
/// Returns an error if the TCP listener cannot bind to the given address.
pub async fn start_server_with_state(
    addr: &str,
    state: Arc<StoreState>,
) -> Result<
    (std::net::SocketAddr, tokio::task::JoinHandle<()>),
    Box<dyn std::error::Error + Send + Sync>,
> {
    let app = axum::Router::new()
        .route("/ws", axum::routing::get(ws_handler))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let bound_addr = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!(error = %e, "store server error");
        }
    });

    Ok((bound_addr, handle))
}

/// axum handler that upgrades an HTTP request to a WebSocket connection.
async fn ws_handler(
    ws: axum::extract::ws::WebSocketUpgrade,
    axum::extract::State(state): axum::extract::State<Arc<StoreState>>,
) -> impl axum::response::IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}
