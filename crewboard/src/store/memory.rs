//! In-process [`TaskStore`] for offline mode and tests.
//!
//! Mirrors the server's ordering and constraints closely enough for the
//! board to behave the same. Every call is recorded, single calls can be
//! made to fail, and update responses can be held back so a test decides
//! the order in which they complete.

use std::collections::{HashSet, VecDeque};

use chrono::{NaiveDate, Utc};
use parking_lot::Mutex;
use tokio::sync::{Notify, oneshot};

use crewboard_proto::member::{Member, MemberId, PresenceStatus};
use crewboard_proto::task::{
    MAX_TASK_TITLE_LENGTH, NewTask, Priority, Task, TaskId, TaskPatch, TaskStatus,
};
use crewboard_proto::wire::ErrorCode;

use super::{StoreError, TaskStore};

/// One recorded store call.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreCall {
    /// `list_members(limit)`.
    ListMembers(u32),
    /// `list_tasks(limit)`.
    ListTasks(u32),
    /// `create_task(task)`.
    CreateTask(NewTask),
    /// `update_task(id, patch)`.
    UpdateTask(TaskId, TaskPatch),
    /// `delete_task(id)`.
    DeleteTask(TaskId),
}

/// Kind of call, used to target injected failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallKind {
    /// `list_members`.
    ListMembers,
    /// `list_tasks`.
    ListTasks,
    /// `create_task`.
    Create,
    /// `update_task`.
    Update,
    /// `delete_task`.
    Delete,
}

#[derive(Default)]
struct Tables {
    members: Vec<Member>,
    tasks: Vec<Task>,
    calls: Vec<StoreCall>,
    fail_next: HashSet<CallKind>,
    hold_updates: bool,
}

/// In-memory store.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    held: Mutex<VecDeque<oneshot::Sender<()>>>,
    held_changed: Notify,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store with the given rows.
    #[must_use]
    pub fn with_data(members: Vec<Member>, tasks: Vec<Task>) -> Self {
        let store = Self::default();
        {
            let mut tables = store.tables.lock();
            tables.members = members;
            tables.tasks = tasks;
        }
        store
    }

    /// A small seeded board for `--offline` runs.
    #[must_use]
    pub fn demo() -> Self {
        let member = |name: &str, email: &str, committee: &str, role: &str, leader: bool| Member {
            id: MemberId::new(),
            full_name: name.to_string(),
            email: email.to_string(),
            committee: committee.to_string(),
            role: role.to_string(),
            status: PresenceStatus::Active,
            is_leader: leader,
            avatar_url: None,
        };
        let members = vec![
            member("Ana Ruiz", "ana@example.org", "Food", "Kitchen lead", true),
            member("Ben Okafor", "ben@example.org", "Food", "Prep", false),
            member("Lin Park", "lin@example.org", "Drinks", "Bar lead", true),
            member("Sam Weiss", "sam@example.org", "Logistics", "Driver", false),
        ];

        let now = Utc::now();
        let task = |position: i64, title: &str, committee: Option<&str>, assignee: Option<&Member>| {
            NewTask {
                title: title.to_string(),
                committee: committee.map(str::to_string),
                assigned_to: assignee.map(|m| m.id.clone()),
                ..NewTask::default()
            }
            .into_task(TaskId::new(), position, now)
        };
        let mut tasks = vec![
            task(1, "Finalize menu", Some("Food"), Some(&members[0])),
            task(2, "Buy napkins", Some("Food"), None),
            task(3, "Stock the bar", Some("Drinks"), Some(&members[2])),
            task(4, "Rent a van", Some("Logistics"), Some(&members[3])),
            task(5, "Print schedules", None, None),
        ];
        tasks[0].status = TaskStatus::Done;
        tasks[2].status = TaskStatus::InProgress;
        tasks[2].priority = Priority::High;
        tasks[3].due_date = NaiveDate::from_ymd_opt(2026, 6, 1);
        tasks[3].estimated_hours = Some(3.0);

        Self::with_data(members, tasks)
    }

    /// Every call made so far, oldest first.
    #[must_use]
    pub fn calls(&self) -> Vec<StoreCall> {
        self.tables.lock().calls.clone()
    }

    /// Number of recorded calls of one kind.
    #[must_use]
    pub fn count(&self, kind: CallKind) -> usize {
        self.tables
            .lock()
            .calls
            .iter()
            .filter(|c| c.kind() == kind)
            .count()
    }

    /// Snapshot of the stored task rows.
    #[must_use]
    pub fn stored_tasks(&self) -> Vec<Task> {
        self.tables.lock().tasks.clone()
    }

    /// Makes the next call of `kind` fail with a transport error.
    pub fn fail_next(&self, kind: CallKind) {
        self.tables.lock().fail_next.insert(kind);
    }

    /// Holds every subsequent `update_task` until released.
    pub fn hold_updates(&self) {
        self.tables.lock().hold_updates = true;
    }

    /// Waits until at least `count` updates are being held.
    pub async fn wait_for_held(&self, count: usize) {
        loop {
            let changed = self.held_changed.notified();
            if self.held.lock().len() >= count {
                return;
            }
            changed.await;
        }
    }

    /// Lets the oldest held update proceed. Returns `false` if none is held.
    pub fn release_oldest(&self) -> bool {
        let gate = self.held.lock().pop_front();
        gate.is_some_and(|tx| tx.send(()).is_ok())
    }

    /// Lets the most recent held update proceed. Returns `false` if none is held.
    pub fn release_latest(&self) -> bool {
        let gate = self.held.lock().pop_back();
        gate.is_some_and(|tx| tx.send(()).is_ok())
    }

    /// Records `call` and consumes an injected failure for its kind.
    fn record(&self, call: StoreCall) -> Result<(), StoreError> {
        let kind = call.kind();
        self.tables.lock().calls.push(call);
        self.take_failure(kind)
    }

    fn take_failure(&self, kind: CallKind) -> Result<(), StoreError> {
        if self.tables.lock().fail_next.remove(&kind) {
            return Err(StoreError::Transport(format!("injected {kind:?} failure")));
        }
        Ok(())
    }

    fn check_member(tables: &Tables, id: Option<&MemberId>) -> Result<(), StoreError> {
        match id {
            Some(id) if !tables.members.iter().any(|m| &m.id == id) => Err(StoreError::Rejected {
                code: ErrorCode::ForeignKey,
                message: format!("no member with id {id}"),
            }),
            _ => Ok(()),
        }
    }
}

impl StoreCall {
    const fn kind(&self) -> CallKind {
        match self {
            Self::ListMembers(_) => CallKind::ListMembers,
            Self::ListTasks(_) => CallKind::ListTasks,
            Self::CreateTask(_) => CallKind::Create,
            Self::UpdateTask(..) => CallKind::Update,
            Self::DeleteTask(_) => CallKind::Delete,
        }
    }
}

fn invalid(message: &str) -> StoreError {
    StoreError::Rejected {
        code: ErrorCode::Invalid,
        message: message.to_string(),
    }
}

fn check_row(title: &str, estimated_hours: Option<f64>) -> Result<(), StoreError> {
    if title.trim().is_empty() {
        return Err(invalid("title must not be empty"));
    }
    if title.chars().count() > MAX_TASK_TITLE_LENGTH {
        return Err(invalid("title too long"));
    }
    if estimated_hours.is_some_and(|h| h <= 0.0 || !h.is_finite()) {
        return Err(invalid("estimated_hours must be positive"));
    }
    Ok(())
}

fn capped(limit: u32) -> usize {
    usize::try_from(limit).unwrap_or(usize::MAX)
}

impl TaskStore for MemoryStore {
    async fn list_members(&self, limit: u32) -> Result<Vec<Member>, StoreError> {
        self.record(StoreCall::ListMembers(limit))?;
        let mut members = self.tables.lock().members.clone();
        members.sort_by(|a, b| a.full_name.cmp(&b.full_name));
        members.truncate(capped(limit));
        Ok(members)
    }

    async fn list_tasks(&self, limit: u32) -> Result<Vec<Task>, StoreError> {
        self.record(StoreCall::ListTasks(limit))?;
        let mut tasks = self.tables.lock().tasks.clone();
        tasks.sort_by(|a, b| (a.position, a.created_at).cmp(&(b.position, b.created_at)));
        tasks.truncate(capped(limit));
        Ok(tasks)
    }

    async fn create_task(&self, task: NewTask) -> Result<Task, StoreError> {
        self.record(StoreCall::CreateTask(task.clone()))?;
        check_row(&task.title, task.estimated_hours)?;

        let mut tables = self.tables.lock();
        Self::check_member(&tables, task.assigned_to.as_ref())?;
        Self::check_member(&tables, task.created_by.as_ref())?;
        let position = tables.tasks.iter().map(|t| t.position).max().unwrap_or(0) + 1;
        let row = task.into_task(TaskId::new(), position, Utc::now());
        tables.tasks.push(row.clone());
        Ok(row)
    }

    async fn update_task(&self, id: &TaskId, patch: TaskPatch) -> Result<Task, StoreError> {
        let hold = {
            let mut tables = self.tables.lock();
            tables.calls.push(StoreCall::UpdateTask(id.clone(), patch.clone()));
            tables.hold_updates
        };
        if hold {
            let (tx, rx) = oneshot::channel();
            self.held.lock().push_back(tx);
            self.held_changed.notify_waiters();
            // A dropped gate releases the call as well.
            let _ = rx.await;
        }
        // Checked on completion so a held update can still be made to fail.
        self.take_failure(CallKind::Update)?;

        let mut tables = self.tables.lock();
        if let Some(assignee) = &patch.assigned_to {
            Self::check_member(&tables, assignee.as_ref())?;
        }
        let row = tables
            .tasks
            .iter_mut()
            .find(|t| &t.id == id)
            .ok_or_else(|| StoreError::Rejected {
                code: ErrorCode::NotFound,
                message: format!("no task with id {id}"),
            })?;
        let mut next = row.clone();
        patch.apply_to(&mut next);
        check_row(&next.title, next.estimated_hours)?;
        *row = next.clone();
        Ok(next)
    }

    async fn delete_task(&self, id: &TaskId) -> Result<(), StoreError> {
        self.record(StoreCall::DeleteTask(id.clone()))?;
        let mut tables = self.tables.lock();
        let before = tables.tasks.len();
        tables.tasks.retain(|t| &t.id != id);
        if tables.tasks.len() == before {
            return Err(StoreError::Rejected {
                code: ErrorCode::NotFound,
                message: format!("no task with id {id}"),
            });
        }
        Ok(())
    }
}
