//! Request/response protocol between the board client and the store.
//!
//! Every request carries a client-chosen `id`; the store answers with a
//! [`StoreResponse`] echoing that id, so several requests may be in flight on
//! one connection and complete in any order. Frames are JSON text.

use serde::{Deserialize, Serialize};

use crate::member::Member;
use crate::task::{NewTask, Task, TaskId, TaskPatch};

/// Error type for wire encode/decode operations.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Serialization failed.
    #[error("encode error: {0}")]
    Encode(String),
    /// The frame is not a valid message.
    #[error("decode error: {0}")]
    Decode(String),
}

/// A single operation against the `members` or `tasks` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreOp {
    /// Select members ordered by full name, at most `limit` rows.
    ListMembers {
        /// Requested page size (the store may cap it further).
        limit: u32,
    },
    /// Select tasks ordered by position then creation time, at most `limit` rows.
    ListTasks {
        /// Requested page size (the store may cap it further).
        limit: u32,
    },
    /// Insert a task.
    CreateTask {
        /// Insert payload.
        task: NewTask,
    },
    /// Update some columns of one task.
    UpdateTask {
        /// Row to update.
        id: TaskId,
        /// Columns to change.
        patch: TaskPatch,
    },
    /// Delete one task.
    DeleteTask {
        /// Row to delete.
        id: TaskId,
    },
}

impl StoreOp {
    /// Short operation name for logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::ListMembers { .. } => "list_members",
            Self::ListTasks { .. } => "list_tasks",
            Self::CreateTask { .. } => "create_task",
            Self::UpdateTask { .. } => "update_task",
            Self::DeleteTask { .. } => "delete_task",
        }
    }
}

/// Client → store frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreRequest {
    /// Correlation id, echoed in the response.
    pub id: u64,
    /// The operation to perform.
    pub op: StoreOp,
}

/// Why the store refused a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// The addressed row does not exist.
    NotFound,
    /// A check constraint failed (empty title, non-positive estimate).
    Invalid,
    /// A referenced member does not exist.
    ForeignKey,
    /// The request frame could not be understood.
    Malformed,
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound => write!(f, "not_found"),
            Self::Invalid => write!(f, "invalid"),
            Self::ForeignKey => write!(f, "foreign_key"),
            Self::Malformed => write!(f, "malformed"),
        }
    }
}

/// Result of a [`StoreOp`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreReply {
    /// Rows for `ListMembers`.
    Members(Vec<Member>),
    /// Rows for `ListTasks`.
    Tasks(Vec<Task>),
    /// The inserted or updated row.
    Task(Task),
    /// Confirmation for `DeleteTask`.
    Deleted {
        /// The deleted row.
        id: TaskId,
    },
    /// The operation was rejected.
    Error {
        /// Machine-readable reason.
        code: ErrorCode,
        /// Human-readable detail.
        message: String,
    },
}

/// Store → client frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreResponse {
    /// Correlation id of the request this answers (0 if it could not be read).
    pub id: u64,
    /// The outcome.
    pub reply: StoreReply,
}

/// Encodes a [`StoreRequest`] as a JSON text frame.
///
/// # Errors
///
/// Returns [`CodecError::Encode`] if serialization fails.
pub fn encode_request(req: &StoreRequest) -> Result<String, CodecError> {
    serde_json::to_string(req).map_err(|e| CodecError::Encode(e.to_string()))
}

/// Decodes a [`StoreRequest`] from a JSON text frame.
///
/// # Errors
///
/// Returns [`CodecError::Decode`] if the text is not a valid request.
pub fn decode_request(text: &str) -> Result<StoreRequest, CodecError> {
    serde_json::from_str(text).map_err(|e| CodecError::Decode(e.to_string()))
}

/// Encodes a [`StoreResponse`] as a JSON text frame.
///
/// # Errors
///
/// Returns [`CodecError::Encode`] if serialization fails.
pub fn encode_response(resp: &StoreResponse) -> Result<String, CodecError> {
    serde_json::to_string(resp).map_err(|e| CodecError::Encode(e.to_string()))
}

/// Decodes a [`StoreResponse`] from a JSON text frame.
///
/// # Errors
///
/// Returns [`CodecError::Decode`] if the text is not a valid response.
pub fn decode_response(text: &str) -> Result<StoreResponse, CodecError> {
    serde_json::from_str(text).map_err(|e| CodecError::Decode(e.to_string()))
}
