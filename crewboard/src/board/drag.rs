//! Drag-and-drop between kanban columns.
//!
//! Only moves between columns are supported; cards are not reordered
//! within a column.

use crewboard_proto::task::{TaskId, TaskStatus};

/// A completed drop: move `task_id` to `target`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropIntent {
    /// Dragged task.
    pub task_id: TaskId,
    /// Column it was dropped on.
    pub target: TaskStatus,
}

/// The single in-progress drag, if any.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DragState {
    dragged: Option<TaskId>,
    hovered: Option<TaskStatus>,
}

impl DragState {
    /// Starts dragging `task_id`, replacing any earlier drag.
    pub fn drag_start(&mut self, task_id: TaskId) {
        tracing::debug!(task_id = %task_id, "drag started");
        self.dragged = Some(task_id);
        self.hovered = None;
    }

    /// Hovers over a column. Returns whether it is a valid drop target,
    /// which is the case whenever a drag is in progress.
    pub fn drag_over(&mut self, column: TaskStatus) -> bool {
        if self.dragged.is_some() {
            self.hovered = Some(column);
            true
        } else {
            false
        }
    }

    /// Drops on `column`, ending the drag.
    ///
    /// Returns `None` if nothing was being dragged.
    pub fn drop_on(&mut self, column: TaskStatus) -> Option<DropIntent> {
        self.hovered = None;
        let task_id = self.dragged.take()?;
        tracing::debug!(task_id = %task_id, target = %column, "dropped");
        Some(DropIntent {
            task_id,
            target: column,
        })
    }

    /// Abandons the drag without any effect.
    pub fn cancel(&mut self) {
        self.dragged = None;
        self.hovered = None;
    }

    /// The dragged task.
    #[must_use]
    pub const fn dragged(&self) -> Option<&TaskId> {
        self.dragged.as_ref()
    }

    /// The column under the dragged card.
    #[must_use]
    pub const fn hovered(&self) -> Option<TaskStatus> {
        self.hovered
    }

    /// Whether a drag is in progress.
    #[must_use]
    pub const fn is_dragging(&self) -> bool {
        self.dragged.is_some()
    }
}
