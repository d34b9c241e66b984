//! In-memory `members` and `tasks` tables.
//!
//! [`Tables`] plays the part of the hosted relational service: it owns row
//! identifiers, enforces the check and foreign-key constraints, orders list
//! results, and caps page sizes. Rows live only as long as the process.

use std::collections::HashMap;

use chrono::Utc;
use crewboard_proto::member::{Member, MemberId};
use crewboard_proto::task::{MAX_TASK_TITLE_LENGTH, NewTask, Task, TaskId, TaskPatch};
use crewboard_proto::wire::ErrorCode;
use tokio::sync::RwLock;

/// Default cap on rows returned by a member listing.
pub const DEFAULT_MAX_MEMBER_PAGE: usize = 100;

/// Default cap on rows returned by a task listing.
pub const DEFAULT_MAX_TASK_PAGE: usize = 200;

/// Constraint violations and missing rows.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TableError {
    /// No task with this id.
    #[error("task not found: {0}")]
    TaskNotFound(TaskId),
    /// Title is empty or whitespace.
    #[error("task title cannot be empty")]
    EmptyTitle,
    /// Title exceeds [`MAX_TASK_TITLE_LENGTH`] characters.
    #[error("task title too long (max {MAX_TASK_TITLE_LENGTH} characters)")]
    TitleTooLong,
    /// Estimate is zero, negative, or not a number.
    #[error("estimated hours must be a positive number")]
    InvalidEstimate,
    /// A member reference points nowhere.
    #[error("unknown member: {0}")]
    UnknownMember(MemberId),
}

impl TableError {
    /// Wire error code for this violation.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::TaskNotFound(_) => ErrorCode::NotFound,
            Self::EmptyTitle | Self::TitleTooLong | Self::InvalidEstimate => ErrorCode::Invalid,
            Self::UnknownMember(_) => ErrorCode::ForeignKey,
        }
    }
}

/// Thread-safe members and tasks tables.
///
/// Members are kept sorted by full name; tasks are listed by
/// `(position, created_at)`.
pub struct Tables {
    members: RwLock<Vec<Member>>,
    tasks: RwLock<HashMap<TaskId, Task>>,
    max_member_page: usize,
    max_task_page: usize,
}

impl Default for Tables {
    fn default() -> Self {
        Self::new()
    }
}

impl Tables {
    /// Creates empty tables with the default page caps.
    #[must_use]
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_MAX_MEMBER_PAGE, DEFAULT_MAX_TASK_PAGE)
    }

    /// Creates empty tables with custom page caps.
    #[must_use]
    pub fn with_limits(max_member_page: usize, max_task_page: usize) -> Self {
        Self {
            members: RwLock::new(Vec::new()),
            tasks: RwLock::new(HashMap::new()),
            max_member_page,
            max_task_page,
        }
    }

    /// Provisions members. Rows with an id already present are replaced.
    pub async fn seed_members(&self, incoming: Vec<Member>) {
        let mut members = self.members.write().await;
        for member in incoming {
            if let Some(existing) = members.iter_mut().find(|m| m.id == member.id) {
                *existing = member;
            } else {
                members.push(member);
            }
        }
        members.sort_by(|a, b| a.full_name.cmp(&b.full_name));
    }

    /// Returns the first `limit` members by full name, capped by the page size.
    pub async fn list_members(&self, limit: u32) -> Vec<Member> {
        let cap = page(limit, self.max_member_page);
        let members = self.members.read().await;
        members.iter().take(cap).cloned().collect()
    }

    /// Returns the first `limit` tasks by position, capped by the page size.
    pub async fn list_tasks(&self, limit: u32) -> Vec<Task> {
        let cap = page(limit, self.max_task_page);
        let tasks = self.tasks.read().await;
        let mut rows: Vec<&Task> = tasks.values().collect();
        rows.sort_by(|a, b| {
            a.position
                .cmp(&b.position)
                .then_with(|| a.created_at.cmp(&b.created_at))
        });
        rows.into_iter().take(cap).cloned().collect()
    }

    /// Inserts a task in the `todo` column after every existing row.
    ///
    /// # Errors
    ///
    /// Returns a [`TableError`] if a check or foreign-key constraint fails.
    pub async fn insert_task(&self, new: NewTask) -> Result<Task, TableError> {
        check_title(&new.title)?;
        check_estimate(new.estimated_hours)?;
        self.check_member(new.assigned_to.as_ref()).await?;
        self.check_member(new.created_by.as_ref()).await?;

        let mut tasks = self.tasks.write().await;
        let position = tasks.values().map(|t| t.position).max().unwrap_or(0) + 1;
        let task = new.into_task(TaskId::new(), position, Utc::now());
        tasks.insert(task.id.clone(), task.clone());
        drop(tasks);
        Ok(task)
    }

    /// Applies `patch` to one task and returns the stored row.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::TaskNotFound`] for an unknown id, or a
    /// constraint error if the patched row would be invalid.
    pub async fn update_task(&self, id: &TaskId, patch: &TaskPatch) -> Result<Task, TableError> {
        if let Some(title) = &patch.title {
            check_title(title)?;
        }
        if let Some(estimate) = patch.estimated_hours {
            check_estimate(estimate)?;
        }
        if let Some(assignee) = &patch.assigned_to {
            self.check_member(assignee.as_ref()).await?;
        }

        let mut tasks = self.tasks.write().await;
        let task = tasks
            .get_mut(id)
            .ok_or_else(|| TableError::TaskNotFound(id.clone()))?;
        patch.apply_to(task);
        Ok(task.clone())
    }

    /// Deletes one task.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::TaskNotFound`] if there is no such row.
    pub async fn delete_task(&self, id: &TaskId) -> Result<TaskId, TableError> {
        let mut tasks = self.tasks.write().await;
        tasks
            .remove(id)
            .map(|t| t.id)
            .ok_or_else(|| TableError::TaskNotFound(id.clone()))
    }

    /// Number of stored tasks.
    pub async fn task_count(&self) -> usize {
        self.tasks.read().await.len()
    }

    async fn check_member(&self, id: Option<&MemberId>) -> Result<(), TableError> {
        let Some(id) = id else {
            return Ok(());
        };
        let members = self.members.read().await;
        if members.iter().any(|m| &m.id == id) {
            Ok(())
        } else {
            Err(TableError::UnknownMember(id.clone()))
        }
    }
}

fn page(requested: u32, cap: usize) -> usize {
    usize::try_from(requested).unwrap_or(usize::MAX).min(cap)
}

fn check_title(title: &str) -> Result<(), TableError> {
    if title.trim().is_empty() {
        return Err(TableError::EmptyTitle);
    }
    if title.chars().count() > MAX_TASK_TITLE_LENGTH {
        return Err(TableError::TitleTooLong);
    }
    Ok(())
}

fn check_estimate(hours: Option<f64>) -> Result<(), TableError> {
    match hours {
        Some(h) if !h.is_finite() || h <= 0.0 => Err(TableError::InvalidEstimate),
        _ => Ok(()),
    }
}
