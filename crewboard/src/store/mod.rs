//! Task store client.
//!
//! Defines the [`TaskStore`] trait every backend must satisfy. Concrete
//! implementations:
//! - [`remote::RemoteStore`]: JSON request/response frames over a WebSocket
//!   to a `crewboard-store` server
//! - [`memory::MemoryStore`]: in-process tables for offline mode and tests
//!
//! Every call is exactly one round trip. There are no retries, no per-call
//! timeout, and no batching.

pub mod memory;
pub mod remote;

use crewboard_proto::member::Member;
use crewboard_proto::task::{NewTask, Task, TaskId, TaskPatch};
use crewboard_proto::wire::ErrorCode;

/// Default cap on the member listing.
pub const DEFAULT_MEMBER_PAGE: u32 = 100;

/// Default cap on the task listing.
pub const DEFAULT_TASK_PAGE: u32 = 200;

/// Errors that can occur during store operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The store refused the operation (constraint violation, missing row).
    #[error("store rejected request ({code}): {message}")]
    Rejected {
        /// Machine-readable reason.
        code: ErrorCode,
        /// Human-readable detail from the store.
        message: String,
    },

    /// The connection to the store has been closed.
    #[error("store connection closed")]
    ConnectionClosed,

    /// The underlying transport failed.
    #[error("store transport error: {0}")]
    Transport(String),

    /// A frame could not be encoded or decoded.
    #[error("store codec error: {0}")]
    Codec(String),

    /// The store answered with a reply of the wrong shape.
    #[error("unexpected store reply: {0}")]
    UnexpectedReply(String),
}

/// Async access to the `members` and `tasks` collections.
///
/// Listings return at most `limit` rows in the store's fixed order: members
/// by full name, tasks by position then creation time.
pub trait TaskStore: Send + Sync + 'static {
    /// Lists up to `limit` members.
    fn list_members(
        &self,
        limit: u32,
    ) -> impl std::future::Future<Output = Result<Vec<Member>, StoreError>> + Send;

    /// Lists up to `limit` tasks.
    fn list_tasks(
        &self,
        limit: u32,
    ) -> impl std::future::Future<Output = Result<Vec<Task>, StoreError>> + Send;

    /// Inserts a task and returns the stored record (id and status assigned).
    fn create_task(
        &self,
        task: NewTask,
    ) -> impl std::future::Future<Output = Result<Task, StoreError>> + Send;

    /// Applies a partial update to one task and returns the stored record.
    fn update_task(
        &self,
        id: &TaskId,
        patch: TaskPatch,
    ) -> impl std::future::Future<Output = Result<Task, StoreError>> + Send;

    /// Deletes one task.
    fn delete_task(
        &self,
        id: &TaskId,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;
}
