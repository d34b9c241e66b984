//! Filter and focus state owned by the board screen.

use crewboard_proto::member::MemberId;
use crewboard_proto::task::TaskStatus;

use super::committee::CommitteeFilter;

/// Which task view is shown. Display only; every tab is reachable from
/// every other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BoardTab {
    /// All three columns side by side.
    #[default]
    Kanban,
    /// Only `todo` tasks.
    Todo,
    /// Only `in_progress` tasks.
    InProgress,
    /// Only `done` tasks.
    Done,
}

impl BoardTab {
    /// Tabs in display order.
    pub const ALL: [Self; 4] = [Self::Kanban, Self::Todo, Self::InProgress, Self::Done];

    /// Tab caption.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Kanban => "Board",
            Self::Todo => "To do",
            Self::InProgress => "In progress",
            Self::Done => "Done",
        }
    }

    /// The single status shown by a list tab, `None` for the kanban.
    #[must_use]
    pub const fn status(self) -> Option<TaskStatus> {
        match self {
            Self::Kanban => None,
            Self::Todo => Some(TaskStatus::Todo),
            Self::InProgress => Some(TaskStatus::InProgress),
            Self::Done => Some(TaskStatus::Done),
        }
    }

    /// The tab after this one, wrapping around.
    #[must_use]
    pub const fn next(self) -> Self {
        match self {
            Self::Kanban => Self::Todo,
            Self::Todo => Self::InProgress,
            Self::InProgress => Self::Done,
            Self::Done => Self::Kanban,
        }
    }
}

/// Current filters. Filters compose with AND; an empty result is valid.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    /// Free-text member search (name or email, case-insensitive).
    pub search_text: String,
    /// Committee restriction.
    pub committee_filter: CommitteeFilter,
    /// Member whose tasks are shown, if any.
    pub selected_member: Option<MemberId>,
    /// Active task view.
    pub active_tab: BoardTab,
}

impl Selection {
    /// Selects `id`, or clears the selection if `id` is already selected.
    pub fn toggle_member(&mut self, id: &MemberId) {
        if self.selected_member.as_ref() == Some(id) {
            self.selected_member = None;
        } else {
            self.selected_member = Some(id.clone());
        }
    }

    /// Changes the committee filter. The member selection is kept.
    pub fn set_committee(&mut self, filter: CommitteeFilter) {
        self.committee_filter = filter;
    }
}
