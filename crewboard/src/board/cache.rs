//! Local copy of the members and tasks collections.
//!
//! The cache holds two layers of task state: the confirmed records as the
//! store last returned them, and a pending status overlay for transitions
//! that have been requested but not yet settled. Views read
//! [`BoardCache::displayed_tasks`], which applies the overlay.

use std::collections::HashMap;
use std::sync::Arc;

use crewboard_proto::member::Member;
use crewboard_proto::task::{Task, TaskId, TaskStatus};

use super::committee::CommitteeSet;

/// Cache shared by the UI loop and in-flight controller calls.
///
/// Never hold the lock across an `.await`.
pub type SharedBoard = Arc<parking_lot::Mutex<BoardCache>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingStatus {
    status: TaskStatus,
    seq: u64,
}

/// Cached members and tasks plus the pending-transition overlay.
#[derive(Debug, Default)]
pub struct BoardCache {
    members: Vec<Member>,
    tasks: Vec<Task>,
    pending: HashMap<TaskId, PendingStatus>,
    next_seq: u64,
    loading: bool,
    generation: u64,
}

impl BoardCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty cache behind a shared lock.
    #[must_use]
    pub fn shared() -> SharedBoard {
        Arc::new(parking_lot::Mutex::new(Self::new()))
    }

    /// Cached members in store order.
    #[must_use]
    pub fn members(&self) -> &[Member] {
        &self.members
    }

    /// Confirmed task records, without pending transitions.
    #[must_use]
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// One confirmed task record.
    #[must_use]
    pub fn task(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| &t.id == id)
    }

    /// Committees carried by the cached members.
    #[must_use]
    pub fn committees(&self) -> CommitteeSet {
        CommitteeSet::from_members(&self.members)
    }

    /// Bumped by every [`reset`](Self::reset). Calls that started under an
    /// older generation must not write their results back.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether a load is in progress.
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        self.loading
    }

    /// Marks a load as started.
    pub const fn begin_loading(&mut self) {
        self.loading = true;
    }

    /// Marks a load as finished, whatever its outcome.
    pub const fn finish_loading(&mut self) {
        self.loading = false;
    }

    /// Replaces the member collection.
    pub fn replace_members(&mut self, members: Vec<Member>) {
        self.members = members;
    }

    /// Replaces the task collection, keeping overlays for tasks that remain.
    pub fn replace_tasks(&mut self, tasks: Vec<Task>) {
        self.tasks = tasks;
        let tasks = &self.tasks;
        self.pending.retain(|id, _| tasks.iter().any(|t| &t.id == id));
    }

    /// Replaces the task with the same id, or appends it.
    pub fn upsert_task(&mut self, task: Task) {
        if let Some(existing) = self.tasks.iter_mut().find(|t| t.id == task.id) {
            *existing = task;
        } else {
            self.tasks.push(task);
        }
    }

    /// Removes a task. Returns `false` if it was not cached.
    pub fn remove_task(&mut self, id: &TaskId) -> bool {
        self.pending.remove(id);
        let before = self.tasks.len();
        self.tasks.retain(|t| &t.id != id);
        self.tasks.len() != before
    }

    /// Patches the confirmed status of one task. Returns `false` if it was
    /// not cached.
    pub fn set_status(&mut self, id: &TaskId, status: TaskStatus) -> bool {
        match self.tasks.iter_mut().find(|t| &t.id == id) {
            Some(task) => {
                task.status = status;
                true
            }
            None => false,
        }
    }

    /// Records a pending transition and returns its sequence number, or
    /// `None` if the task is not cached.
    ///
    /// A later call for the same task supersedes the earlier overlay.
    pub fn set_pending(&mut self, id: &TaskId, status: TaskStatus) -> Option<u64> {
        self.task(id)?;
        self.next_seq += 1;
        let seq = self.next_seq;
        self.pending.insert(id.clone(), PendingStatus { status, seq });
        Some(seq)
    }

    /// Clears the overlay for `id` if `seq` is still the latest one.
    ///
    /// Returns `true` if the overlay was cleared.
    pub fn settle_pending(&mut self, id: &TaskId, seq: u64) -> bool {
        if self.pending.get(id).is_some_and(|p| p.seq == seq) {
            self.pending.remove(id);
            true
        } else {
            false
        }
    }

    /// The status a pending transition will show, if any.
    #[must_use]
    pub fn pending_status(&self, id: &TaskId) -> Option<TaskStatus> {
        self.pending.get(id).map(|p| p.status)
    }

    /// Tasks as they should be rendered: confirmed records with pending
    /// transitions applied.
    #[must_use]
    pub fn displayed_tasks(&self) -> Vec<Task> {
        self.tasks
            .iter()
            .map(|task| {
                let mut shown = task.clone();
                if let Some(pending) = self.pending.get(&task.id) {
                    shown.status = pending.status;
                }
                shown
            })
            .collect()
    }

    /// Discards everything, e.g. when leaving the board.
    ///
    /// Sequence numbers keep counting so an overlay from before the reset
    /// can never be settled by a call from after it.
    pub fn reset(&mut self) {
        *self = Self {
            next_seq: self.next_seq,
            generation: self.generation + 1,
            ..Self::default()
        };
    }
}
