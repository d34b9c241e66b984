//! Derived views over the cached collections.
//!
//! Everything here is a pure function of `(members, tasks, selection)` and
//! is recomputed whenever the renderer asks for it.

use crewboard_proto::member::Member;
use crewboard_proto::task::{Task, TaskStatus};

use super::committee::{CommitteeFilter, CommitteeSet};
use super::selection::Selection;

/// Committee filter choices: [`CommitteeFilter::All`] followed by the
/// distinct member committees in first-seen order.
#[must_use]
pub fn committees(members: &[Member]) -> Vec<CommitteeFilter> {
    CommitteeSet::from_members(members).filters()
}

/// Members passing the committee filter whose name or email contains the
/// search text (case-insensitive).
#[must_use]
pub fn filter_members<'a>(members: &'a [Member], selection: &Selection) -> Vec<&'a Member> {
    let needle = selection.search_text.trim().to_lowercase();
    members
        .iter()
        .filter(|m| match &selection.committee_filter {
            CommitteeFilter::All => true,
            CommitteeFilter::Named(name) => &m.committee == name,
        })
        .filter(|m| {
            needle.is_empty()
                || m.full_name.to_lowercase().contains(&needle)
                || m.email.to_lowercase().contains(&needle)
        })
        .collect()
}

/// Tasks passing the committee filter and, if a member is selected, the
/// member filter.
///
/// A selected member sees tasks assigned to them plus committee-wide tasks
/// of their own committee. A selected id that is not among `members` only
/// matches tasks assigned to it.
#[must_use]
pub fn filter_tasks<'a>(
    tasks: &'a [Task],
    members: &[Member],
    selection: &Selection,
) -> Vec<&'a Task> {
    let selected = selection.selected_member.as_ref().map(|id| {
        let committee = members
            .iter()
            .find(|m| &m.id == id)
            .map(|m| m.committee.as_str());
        (id, committee)
    });

    tasks
        .iter()
        .filter(|t| selection.committee_filter.admits(t.committee.as_deref()))
        .filter(|t| match selected {
            None => true,
            Some((id, committee)) => {
                t.assigned_to.as_ref() == Some(id)
                    || committee.is_some_and(|c| t.is_committee_wide_for(c))
            }
        })
        .collect()
}

/// Task totals per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    /// Tasks in `todo`.
    pub todo: usize,
    /// Tasks in `in_progress`.
    pub in_progress: usize,
    /// Tasks in `done`.
    pub done: usize,
    /// All tasks.
    pub total: usize,
}

impl StatusCounts {
    /// Count for one status.
    #[must_use]
    pub const fn of(&self, status: TaskStatus) -> usize {
        match status {
            TaskStatus::Todo => self.todo,
            TaskStatus::InProgress => self.in_progress,
            TaskStatus::Done => self.done,
        }
    }
}

/// Counts tasks by status.
#[must_use]
pub fn status_counts<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> StatusCounts {
    let mut counts = StatusCounts::default();
    for task in tasks {
        match task.status {
            TaskStatus::Todo => counts.todo += 1,
            TaskStatus::InProgress => counts.in_progress += 1,
            TaskStatus::Done => counts.done += 1,
        }
        counts.total += 1;
    }
    counts
}

/// Completion of one committee.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitteeProgress {
    /// Committee name.
    pub committee: String,
    /// Tasks of the committee in `done`.
    pub done: usize,
    /// All tasks of the committee.
    pub total: usize,
    /// `done / total` rounded to a whole percent; `0` when there are no tasks.
    pub percent: u8,
}

/// Rounded completion percentage, always in `0..=100`.
#[must_use]
pub fn completion_percent(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let done = done.min(total);
    // Integer round-half-up of done * 100 / total.
    let percent = (done * 200 + total) / (total * 2);
    u8::try_from(percent).unwrap_or(100)
}

/// Completion per committee (the sentinel excluded), in committee order.
///
/// Only tasks whose committee equals the name count; committee-less tasks
/// belong to no single committee.
#[must_use]
pub fn committee_progress(tasks: &[Task], members: &[Member]) -> Vec<CommitteeProgress> {
    CommitteeSet::from_members(members)
        .names()
        .iter()
        .map(|name| {
            let mine = tasks
                .iter()
                .filter(|t| t.committee.as_deref() == Some(name.as_str()));
            let counts = status_counts(mine);
            CommitteeProgress {
                committee: name.clone(),
                done: counts.done,
                total: counts.total,
                percent: completion_percent(counts.done, counts.total),
            }
        })
        .collect()
}

/// Tasks of one status, ordered by position (creation time breaks ties).
#[must_use]
pub fn column<'a>(tasks: &[&'a Task], status: TaskStatus) -> Vec<&'a Task> {
    let mut out: Vec<&Task> = tasks.iter().copied().filter(|t| t.status == status).collect();
    out.sort_by(|a, b| (a.position, a.created_at).cmp(&(b.position, b.created_at)));
    out
}

/// Everything the renderer needs for one frame.
#[derive(Debug, Clone, Default)]
pub struct BoardView {
    /// Committee filter choices.
    pub committees: Vec<CommitteeFilter>,
    /// Members shown in the sidebar.
    pub members: Vec<Member>,
    /// Filtered tasks per column: `todo`, `in_progress`, `done`.
    pub columns: [Vec<Task>; 3],
    /// Totals over the filtered tasks.
    pub counts: StatusCounts,
    /// Completion per committee over all tasks.
    pub progress: Vec<CommitteeProgress>,
}

impl BoardView {
    /// Computes the view from displayed tasks (pending transitions applied).
    #[must_use]
    pub fn compute(members: &[Member], tasks: &[Task], selection: &Selection) -> Self {
        let filtered = filter_tasks(tasks, members, selection);
        let columns = TaskStatus::ALL
            .map(|status| column(&filtered, status).into_iter().cloned().collect());

        Self {
            committees: committees(members),
            members: filter_members(members, selection)
                .into_iter()
                .cloned()
                .collect(),
            counts: status_counts(filtered.iter().copied()),
            columns,
            progress: committee_progress(tasks, members),
        }
    }

    /// Tasks of one column.
    #[must_use]
    pub fn column(&self, status: TaskStatus) -> &[Task] {
        match status {
            TaskStatus::Todo => &self.columns[0],
            TaskStatus::InProgress => &self.columns[1],
            TaskStatus::Done => &self.columns[2],
        }
    }
}
