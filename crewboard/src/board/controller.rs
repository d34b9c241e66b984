//! Task mutations against the store, mirrored into the board cache.
//!
//! Create, update and delete are pessimistic: the cache changes only after
//! the store confirms. Status transitions are two-phase: a pending overlay
//! shows the card in its target column immediately, the confirmed status
//! is patched when the store succeeds, and the overlay is dropped either
//! way once the latest request for that task settles.
//!
//! The cache lock is never held across an `.await`.

use std::sync::Arc;

use chrono::NaiveDate;
use crewboard_proto::member::MemberId;
use crewboard_proto::task::{
    MAX_TASK_TITLE_LENGTH, NewTask, Priority, Task, TaskId, TaskPatch, TaskStatus,
};

use super::cache::{BoardCache, SharedBoard};
use super::drag::DropIntent;
use crate::store::{DEFAULT_MEMBER_PAGE, DEFAULT_TASK_PAGE, StoreError, TaskStore};

/// Errors returned by board operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TaskError {
    /// Task title is empty after trimming.
    #[error("task title cannot be empty")]
    TitleEmpty,
    /// Task title exceeds the maximum length.
    #[error("task title too long (max {max} characters)")]
    TitleTooLong {
        /// Configured limit.
        max: usize,
    },
    /// No loaded member belongs to the named committee.
    #[error("unknown committee: {0}")]
    UnknownCommittee(String),
    /// The assignee is not a loaded member.
    #[error("unknown assignee: {0}")]
    UnknownAssignee(String),
    /// Estimated hours must be a positive number.
    #[error("estimated hours must be positive")]
    InvalidEstimate,
    /// The task is not in the cache.
    #[error("task not found: {0}")]
    TaskNotFound(TaskId),
    /// The store call failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Tunables for the controller.
#[derive(Debug, Clone)]
pub struct BoardSettings {
    /// Member listing cap.
    pub member_page: u32,
    /// Task listing cap.
    pub task_page: u32,
    /// Maximum title length in characters.
    pub max_title_len: usize,
    /// Member recorded as `created_by` on new tasks.
    pub author: Option<MemberId>,
}

impl Default for BoardSettings {
    fn default() -> Self {
        Self {
            member_page: DEFAULT_MEMBER_PAGE,
            task_page: DEFAULT_TASK_PAGE,
            max_title_len: MAX_TASK_TITLE_LENGTH,
            author: None,
        }
    }
}

/// Form input for creating or editing a task.
///
/// `committee` and `assigned_to` are raw form values: an empty committee
/// or `"all"` means every committee, an empty assignee means
/// committee-wide. There is no status field; new tasks start in `todo` and
/// edits never move a task between columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskDraft {
    /// Title, trimmed before use.
    pub title: String,
    /// Free-text details.
    pub description: String,
    /// Urgency.
    pub priority: Priority,
    /// Committee label.
    pub committee: String,
    /// Assignee member id, or empty.
    pub assigned_to: String,
    /// Optional due date.
    pub due_date: Option<NaiveDate>,
    /// Optional effort estimate.
    pub estimated_hours: Option<f64>,
}

impl TaskDraft {
    /// Pre-fills a draft from an existing task.
    #[must_use]
    pub fn from_task(task: &Task) -> Self {
        Self {
            title: task.title.clone(),
            description: task.description.clone(),
            priority: task.priority,
            committee: task.committee.clone().unwrap_or_default(),
            assigned_to: task
                .assigned_to
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default(),
            due_date: task.due_date,
            estimated_hours: task.estimated_hours,
        }
    }
}

/// A draft after validation against the loaded members.
#[derive(Debug, Clone, PartialEq)]
struct CheckedDraft {
    title: String,
    description: String,
    priority: Priority,
    committee: Option<String>,
    assigned_to: Option<MemberId>,
    due_date: Option<NaiveDate>,
    estimated_hours: Option<f64>,
}

/// Validates `draft` against the loaded members.
///
/// When editing, `current` is the cached task: its own committee and
/// assignee stay acceptable even if no loaded member carries them.
fn check_draft(
    draft: TaskDraft,
    board: &BoardCache,
    max_title_len: usize,
    current: Option<&Task>,
) -> Result<CheckedDraft, TaskError> {
    let title = draft.title.trim().to_string();
    if title.is_empty() {
        return Err(TaskError::TitleEmpty);
    }
    if title.chars().count() > max_title_len {
        return Err(TaskError::TitleTooLong { max: max_title_len });
    }

    let kept_committee = current
        .and_then(|t| t.committee.as_deref())
        .filter(|c| *c == draft.committee.trim());
    let committee = match kept_committee {
        Some(c) => Some(c.to_string()),
        None => board
            .committees()
            .resolve(&draft.committee)
            .map_err(TaskError::UnknownCommittee)?,
    };

    let raw_assignee = draft.assigned_to.trim();
    let assigned_to = if raw_assignee.is_empty() {
        None
    } else {
        let id: MemberId = raw_assignee
            .parse()
            .map_err(|_| TaskError::UnknownAssignee(raw_assignee.to_string()))?;
        let kept = current.is_some_and(|t| t.assigned_to.as_ref() == Some(&id));
        if !kept && !board.members().iter().any(|m| m.id == id) {
            return Err(TaskError::UnknownAssignee(raw_assignee.to_string()));
        }
        Some(id)
    };

    if draft
        .estimated_hours
        .is_some_and(|h| h <= 0.0 || !h.is_finite())
    {
        return Err(TaskError::InvalidEstimate);
    }

    Ok(CheckedDraft {
        title,
        description: draft.description.trim().to_string(),
        priority: draft.priority,
        committee,
        assigned_to,
        due_date: draft.due_date,
        estimated_hours: draft.estimated_hours,
    })
}

/// The columns of `checked` that differ from `current`. Status is never
/// included.
fn changed_fields(current: &Task, checked: CheckedDraft) -> TaskPatch {
    TaskPatch {
        title: (checked.title != current.title).then_some(checked.title),
        description: (checked.description != current.description)
            .then_some(checked.description),
        status: None,
        priority: (checked.priority != current.priority).then_some(checked.priority),
        committee: (checked.committee != current.committee).then_some(checked.committee),
        assigned_to: (checked.assigned_to != current.assigned_to)
            .then_some(checked.assigned_to),
        due_date: (checked.due_date != current.due_date).then_some(checked.due_date),
        estimated_hours: (checked.estimated_hours != current.estimated_hours)
            .then_some(checked.estimated_hours),
    }
}

/// Runs board operations against a [`TaskStore`].
///
/// Cheap to clone; clones share the store and the cache.
pub struct TaskController<S> {
    store: Arc<S>,
    board: SharedBoard,
    settings: BoardSettings,
}

impl<S> Clone for TaskController<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            board: Arc::clone(&self.board),
            settings: self.settings.clone(),
        }
    }
}

impl<S: TaskStore> TaskController<S> {
    /// Creates a controller over `store` that mirrors results into `board`.
    #[must_use]
    pub const fn new(store: Arc<S>, board: SharedBoard, settings: BoardSettings) -> Self {
        Self {
            store,
            board,
            settings,
        }
    }

    /// The cache this controller writes to.
    #[must_use]
    pub const fn board(&self) -> &SharedBoard {
        &self.board
    }

    /// Loads members and tasks concurrently.
    ///
    /// Each collection is replaced if its listing succeeded. The loading
    /// flag is cleared once both listings have resolved, whatever the
    /// outcome.
    ///
    /// # Errors
    ///
    /// Returns the first listing error.
    pub async fn load(&self) -> Result<(), TaskError> {
        let generation = {
            let mut board = self.board.lock();
            board.begin_loading();
            board.generation()
        };
        tracing::debug!(
            member_page = self.settings.member_page,
            task_page = self.settings.task_page,
            "loading board"
        );

        let (members, tasks) = tokio::join!(
            self.store.list_members(self.settings.member_page),
            self.store.list_tasks(self.settings.task_page),
        );

        let mut board = self.board.lock();
        if board.generation() != generation {
            tracing::debug!("board reset during load, dropping results");
            return Ok(());
        }
        board.finish_loading();
        let mut first_error = None;
        match members {
            Ok(members) => board.replace_members(members),
            Err(e) => {
                tracing::warn!(error = %e, "failed to load members");
                first_error = Some(e);
            }
        }
        match tasks {
            Ok(tasks) => board.replace_tasks(tasks),
            Err(e) => {
                tracing::warn!(error = %e, "failed to load tasks");
                first_error.get_or_insert(e);
            }
        }
        tracing::info!(
            members = board.members().len(),
            tasks = board.tasks().len(),
            "board loaded"
        );
        drop(board);

        first_error.map_or(Ok(()), |e| Err(e.into()))
    }

    /// Creates a task from `draft` and appends the stored record.
    ///
    /// # Errors
    ///
    /// Returns a validation error without calling the store, or
    /// [`TaskError::Store`] if the store rejects the insert. The cache is
    /// unchanged on error.
    pub async fn create(&self, draft: TaskDraft) -> Result<Task, TaskError> {
        let (checked, created_by, generation) = {
            let board = self.board.lock();
            let checked = check_draft(draft, &board, self.settings.max_title_len, None)?;
            let created_by = self
                .settings
                .author
                .clone()
                .filter(|a| board.members().iter().any(|m| &m.id == a));
            (checked, created_by, board.generation())
        };

        let new = NewTask {
            title: checked.title,
            description: checked.description,
            priority: checked.priority,
            committee: checked.committee,
            assigned_to: checked.assigned_to,
            due_date: checked.due_date,
            estimated_hours: checked.estimated_hours,
            created_by,
        };

        match self.store.create_task(new).await {
            Ok(task) => {
                tracing::info!(task_id = %task.id, title = %task.title, "task created");
                let mut board = self.board.lock();
                if board.generation() == generation {
                    board.upsert_task(task.clone());
                }
                Ok(task)
            }
            Err(e) => {
                tracing::warn!(error = %e, "create task failed");
                Err(e.into())
            }
        }
    }

    /// Edits every field except status.
    ///
    /// Only fields that differ from the cached task are sent, so a committee
    /// or assignee the loaded members do not cover survives an edit of other
    /// fields. A draft that changes nothing makes no store call. On success
    /// the cached record is replaced by the cached task merged with the
    /// changed fields.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::TaskNotFound`] for an uncached id, a validation
    /// error, or [`TaskError::Store`]. The cache is unchanged on error.
    pub async fn update(&self, id: &TaskId, draft: TaskDraft) -> Result<Task, TaskError> {
        let (patch, current, generation) = {
            let board = self.board.lock();
            let Some(current) = board.task(id).cloned() else {
                return Err(TaskError::TaskNotFound(id.clone()));
            };
            let checked =
                check_draft(draft, &board, self.settings.max_title_len, Some(&current))?;
            (changed_fields(&current, checked), current, board.generation())
        };

        if patch.is_empty() {
            tracing::debug!(task_id = %id, "update changes nothing");
            return Ok(current);
        }

        match self.store.update_task(id, patch.clone()).await {
            Ok(stored) => {
                tracing::info!(task_id = %id, "task updated");
                let mut board = self.board.lock();
                if board.generation() != generation {
                    return Ok(stored);
                }
                let Some(mut merged) = board.task(id).cloned() else {
                    // Deleted while the update was in flight.
                    return Ok(stored);
                };
                patch.apply_to(&mut merged);
                board.upsert_task(merged.clone());
                Ok(merged)
            }
            Err(e) => {
                tracing::warn!(task_id = %id, error = %e, "update task failed");
                Err(e.into())
            }
        }
    }

    /// Deletes a task, removing it from the cache after the store confirms.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::Store`] if the store call fails; the cache is
    /// unchanged.
    pub async fn delete(&self, id: &TaskId) -> Result<(), TaskError> {
        let generation = self.board.lock().generation();
        match self.store.delete_task(id).await {
            Ok(()) => {
                tracing::info!(task_id = %id, "task deleted");
                let mut board = self.board.lock();
                if board.generation() == generation {
                    board.remove_task(id);
                }
                Ok(())
            }
            Err(e) => {
                tracing::warn!(task_id = %id, error = %e, "delete task failed");
                Err(e.into())
            }
        }
    }

    /// Moves a task to `status`.
    ///
    /// The card shows in the target column at once. The confirmed status
    /// changes only when the store succeeds; on failure the card falls back
    /// to its confirmed column unless a newer transition is pending. Moving
    /// to the current status still issues the store call.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::TaskNotFound`] for an uncached id (no store call
    /// is made), or [`TaskError::Store`].
    pub async fn transition(&self, id: &TaskId, status: TaskStatus) -> Result<(), TaskError> {
        let (seq, generation) = {
            let mut board = self.board.lock();
            let seq = board
                .set_pending(id, status)
                .ok_or_else(|| TaskError::TaskNotFound(id.clone()))?;
            (seq, board.generation())
        };
        tracing::debug!(task_id = %id, %status, seq, "transition requested");

        let result = self
            .store
            .update_task(id, TaskPatch::status_only(status))
            .await;

        let mut board = self.board.lock();
        let same_session = board.generation() == generation;
        let settled = same_session && board.settle_pending(id, seq);
        match result {
            Ok(_) => {
                if same_session {
                    board.set_status(id, status);
                }
                drop(board);
                tracing::info!(task_id = %id, %status, settled, "transition confirmed");
                Ok(())
            }
            Err(e) => {
                drop(board);
                tracing::warn!(task_id = %id, %status, error = %e, "transition failed");
                Err(e.into())
            }
        }
    }

    /// Applies a completed drag.
    ///
    /// # Errors
    ///
    /// Same as [`Self::transition`].
    pub async fn drop_task(&self, intent: DropIntent) -> Result<(), TaskError> {
        self.transition(&intent.task_id, intent.target).await
    }
}
