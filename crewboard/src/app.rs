//! Application state and event handling.
//!
//! [`App`] turns key presses into [`BoardCommand`]s. The binary runs each
//! command on the runtime with [`spawn_command`] and feeds the resulting
//! [`BoardEvent`]s back through [`App::apply_event`].

use chrono::NaiveDate;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tokio::sync::mpsc;

use crewboard_proto::member::{Member, MemberId};
use crewboard_proto::task::{Priority, Task, TaskId, TaskStatus};

use crate::board::committee::{CommitteeFilter, CommitteeSet};
use crate::board::drag::{DragState, DropIntent};
use crate::board::selection::Selection;
use crate::board::views::BoardView;
use crate::board::{SharedBoard, TaskController, TaskDraft, TaskError};
use crate::gate::{AdminSession, PasswordGate};
use crate::store::TaskStore;

/// Which screen is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    /// Admin password prompt.
    Login,
    /// The task board.
    Board,
}

/// Which board panel is currently focused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelFocus {
    /// Member sidebar.
    Members,
    /// Task columns.
    Tasks,
}

/// Work for the controller, produced by key handling.
#[derive(Debug, Clone, PartialEq)]
pub enum BoardCommand {
    /// Load members and tasks.
    Load,
    /// Create a task.
    Create(TaskDraft),
    /// Edit a task.
    Update(TaskId, TaskDraft),
    /// Delete a task.
    Delete(TaskId),
    /// Move a task to another column via the status picker.
    Transition(TaskId, TaskStatus),
    /// Move a task to another column via drag and drop.
    Drop(DropIntent),
}

impl BoardCommand {
    const fn describe(&self) -> &'static str {
        match self {
            Self::Load => "load board",
            Self::Create(_) => "create task",
            Self::Update(..) => "update task",
            Self::Delete(_) => "delete task",
            Self::Transition(..) | Self::Drop(_) => "move task",
        }
    }
}

/// Outcome of a finished [`BoardCommand`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardEvent {
    /// What was attempted, e.g. `"create task"`.
    pub action: &'static str,
    /// Whether it worked.
    pub outcome: Result<(), TaskError>,
}

/// Message shown in the status line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    /// Text to show.
    pub text: String,
    /// Whether it reports a failure.
    pub is_error: bool,
}

/// Field of the task form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    /// Title text.
    Title,
    /// Description text.
    Description,
    /// Committee choice.
    Committee,
    /// Assignee choice.
    Assignee,
    /// Priority choice.
    Priority,
    /// Due date text (`YYYY-MM-DD`).
    DueDate,
    /// Estimated hours text.
    Estimate,
}

impl FormField {
    /// Fields in display order.
    pub const ALL: [Self; 7] = [
        Self::Title,
        Self::Description,
        Self::Committee,
        Self::Assignee,
        Self::Priority,
        Self::DueDate,
        Self::Estimate,
    ];

    /// Field caption.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Title => "Title",
            Self::Description => "Description",
            Self::Committee => "Committee",
            Self::Assignee => "Assignee",
            Self::Priority => "Priority",
            Self::DueDate => "Due (YYYY-MM-DD)",
            Self::Estimate => "Estimate (h)",
        }
    }

    fn index(self) -> usize {
        Self::ALL.iter().position(|f| *f == self).unwrap_or(0)
    }

    fn next(self) -> Self {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    fn prev(self) -> Self {
        Self::ALL[(self.index() + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

/// New/edit task form.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskForm {
    /// Task being edited, `None` for a new task.
    pub editing: Option<TaskId>,
    /// Focused field.
    pub field: FormField,
    /// Title input.
    pub title: String,
    /// Description input.
    pub description: String,
    /// Index into the committee choices; 0 is "all".
    pub committee: usize,
    /// 0 for committee-wide, otherwise 1 + index into the members.
    pub assignee: usize,
    /// The edited task's committee when it is not among the choices.
    /// Cleared once the committee is cycled.
    pub kept_committee: Option<String>,
    /// The edited task's assignee when it is not among the loaded members.
    /// Cleared once the assignee is cycled.
    pub kept_assignee: Option<MemberId>,
    /// Chosen priority.
    pub priority: Priority,
    /// Due date input.
    pub due_date: String,
    /// Estimate input.
    pub estimate: String,
}

impl TaskForm {
    fn blank() -> Self {
        Self {
            editing: None,
            field: FormField::Title,
            title: String::new(),
            description: String::new(),
            committee: 0,
            assignee: 0,
            kept_committee: None,
            kept_assignee: None,
            priority: Priority::default(),
            due_date: String::new(),
            estimate: String::new(),
        }
    }

    fn for_task(task: &Task, committees: &[CommitteeFilter], members: &[Member]) -> Self {
        let committee = task
            .committee
            .as_ref()
            .and_then(|c| committees.iter().position(|f| f.name() == Some(c.as_str())));
        let assignee = task
            .assigned_to
            .as_ref()
            .and_then(|id| members.iter().position(|m| &m.id == id));
        Self {
            editing: Some(task.id.clone()),
            field: FormField::Title,
            title: task.title.clone(),
            description: task.description.clone(),
            committee: committee.unwrap_or(0),
            assignee: assignee.map_or(0, |i| i + 1),
            kept_committee: task.committee.clone().filter(|_| committee.is_none()),
            kept_assignee: task.assigned_to.clone().filter(|_| assignee.is_none()),
            priority: task.priority,
            due_date: task
                .due_date
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
            estimate: task.estimated_hours.map(|h| h.to_string()).unwrap_or_default(),
        }
    }

    /// Text input backing the focused field, if it is a text field.
    fn text_mut(&mut self) -> Option<&mut String> {
        match self.field {
            FormField::Title => Some(&mut self.title),
            FormField::Description => Some(&mut self.description),
            FormField::DueDate => Some(&mut self.due_date),
            FormField::Estimate => Some(&mut self.estimate),
            FormField::Committee | FormField::Assignee | FormField::Priority => None,
        }
    }

    /// Cycles the focused choice field forwards or backwards.
    fn cycle(&mut self, forward: bool, committees: usize, members: usize) {
        let rotate = |value: usize, len: usize| -> usize {
            match (len, forward) {
                (0, _) => 0,
                (_, true) => (value + 1) % len,
                (_, false) => (value + len - 1) % len,
            }
        };
        match self.field {
            FormField::Committee => {
                if self.kept_committee.take().is_none() {
                    self.committee = rotate(self.committee, committees);
                }
            }
            FormField::Assignee => {
                if self.kept_assignee.take().is_none() {
                    self.assignee = rotate(self.assignee, members + 1);
                }
            }
            FormField::Priority => {
                let idx = Priority::ALL
                    .iter()
                    .position(|p| *p == self.priority)
                    .unwrap_or(0);
                self.priority = Priority::ALL[rotate(idx, Priority::ALL.len())];
            }
            FormField::Title
            | FormField::Description
            | FormField::DueDate
            | FormField::Estimate => {}
        }
    }

    /// Display value of the committee choice.
    #[must_use]
    pub fn committee_label(&self, committees: &[CommitteeFilter]) -> String {
        if let Some(kept) = &self.kept_committee {
            return kept.clone();
        }
        committees
            .get(self.committee)
            .map_or_else(|| CommitteeFilter::All.to_string(), ToString::to_string)
    }

    /// Display value of the assignee choice.
    #[must_use]
    pub fn assignee_label(&self, members: &[Member]) -> String {
        if self.kept_assignee.is_some() {
            return "(unlisted member)".to_string();
        }
        match self.assignee.checked_sub(1).and_then(|i| members.get(i)) {
            Some(member) => member.full_name.clone(),
            None => "(committee-wide)".to_string(),
        }
    }

    /// Builds a draft from the form inputs.
    ///
    /// # Errors
    ///
    /// Returns a message if the due date or estimate cannot be parsed.
    pub fn to_draft(
        &self,
        committees: &[CommitteeFilter],
        members: &[Member],
    ) -> Result<TaskDraft, String> {
        let due_date = match self.due_date.trim() {
            "" => None,
            raw => Some(
                NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                    .map_err(|_| format!("invalid due date: {raw}"))?,
            ),
        };
        let estimated_hours = match self.estimate.trim() {
            "" => None,
            raw => Some(
                raw.parse::<f64>()
                    .map_err(|_| format!("invalid estimate: {raw}"))?,
            ),
        };
        let assigned_to = match &self.kept_assignee {
            Some(id) => id.to_string(),
            None => self
                .assignee
                .checked_sub(1)
                .and_then(|i| members.get(i))
                .map(|m| m.id.to_string())
                .unwrap_or_default(),
        };

        Ok(TaskDraft {
            title: self.title.clone(),
            description: self.description.clone(),
            priority: self.priority,
            committee: self.committee_label(committees),
            assigned_to,
            due_date,
            estimated_hours,
        })
    }
}

/// Main application state.
pub struct App {
    /// Shared board cache.
    board: SharedBoard,
    /// Admin password check.
    gate: PasswordGate,
    /// Current session.
    pub session: AdminSession,
    /// Current screen.
    pub screen: Screen,
    /// Password being typed on the login screen.
    pub password_input: String,
    /// Which board panel is focused.
    pub focus: PanelFocus,
    /// Filters and tab.
    pub selection: Selection,
    /// Whether keys go to the member search box.
    pub searching: bool,
    /// Cursor in the filtered member list.
    pub member_cursor: usize,
    /// Column the task cursor is in.
    pub focused_column: TaskStatus,
    /// Cursor within the focused column.
    pub card_cursor: usize,
    /// In-progress drag.
    pub drag: DragState,
    /// Open task form.
    pub form: Option<TaskForm>,
    /// Open status picker: task and highlighted status.
    pub status_picker: Option<(TaskId, TaskStatus)>,
    /// Task awaiting delete confirmation.
    pub confirm_delete: Option<TaskId>,
    /// Last status-line message.
    pub status: Option<StatusMessage>,
    /// Whether the app should quit.
    pub should_quit: bool,
}

impl App {
    /// Creates the app on the login screen.
    #[must_use]
    pub fn new(board: SharedBoard, gate: PasswordGate) -> Self {
        let status = (!gate.is_configured()).then(|| StatusMessage {
            text: "No admin password configured; the board is locked".to_string(),
            is_error: true,
        });
        Self {
            board,
            gate,
            session: AdminSession::anonymous(),
            screen: Screen::Login,
            password_input: String::new(),
            focus: PanelFocus::Tasks,
            selection: Selection::default(),
            searching: false,
            member_cursor: 0,
            focused_column: TaskStatus::Todo,
            card_cursor: 0,
            drag: DragState::default(),
            form: None,
            status_picker: None,
            confirm_delete: None,
            status,
            should_quit: false,
        }
    }

    /// Derived view for the current selection.
    #[must_use]
    pub fn view(&self) -> BoardView {
        let board = self.board.lock();
        BoardView::compute(board.members(), &board.displayed_tasks(), &self.selection)
    }

    /// Whether the board is still loading.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.board.lock().is_loading()
    }

    /// Whether a status change for `id` is still in flight.
    #[must_use]
    pub fn is_pending(&self, id: &TaskId) -> bool {
        self.board.lock().pending_status(id).is_some()
    }

    /// All cached members, unfiltered (for the form's assignee choice).
    #[must_use]
    pub fn members(&self) -> Vec<Member> {
        self.board.lock().members().to_vec()
    }

    /// Committee choices for the form and filter.
    #[must_use]
    pub fn committee_choices(&self) -> Vec<CommitteeFilter> {
        CommitteeSet::from_members(self.board.lock().members()).filters()
    }

    /// The task under the cursor.
    #[must_use]
    pub fn focused_task(&self, view: &BoardView) -> Option<Task> {
        view.column(self.focused_column)
            .get(self.card_cursor)
            .cloned()
    }

    /// Records the outcome of a finished command.
    pub fn apply_event(&mut self, event: BoardEvent) {
        self.status = Some(match event.outcome {
            Ok(()) => StatusMessage {
                text: format!("Done: {}", event.action),
                is_error: false,
            },
            Err(e) => StatusMessage {
                text: format!("Could not {}: {e}", event.action),
                is_error: true,
            },
        });
        self.clamp_cursors();
    }

    /// Handle a key event.
    ///
    /// Returns a command when the key asks for store work.
    pub fn handle_key_event(&mut self, key: KeyEvent) -> Option<BoardCommand> {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return None;
        }

        match self.screen {
            Screen::Login => self.handle_login_key(key),
            Screen::Board if self.is_loading() => None,
            Screen::Board => self.handle_board_key(key),
        }
    }

    fn set_error(&mut self, text: impl Into<String>) {
        self.status = Some(StatusMessage {
            text: text.into(),
            is_error: true,
        });
    }

    fn handle_login_key(&mut self, key: KeyEvent) -> Option<BoardCommand> {
        match key.code {
            KeyCode::Esc => self.should_quit = true,
            KeyCode::Char(c) => self.password_input.push(c),
            KeyCode::Backspace => {
                self.password_input.pop();
            }
            KeyCode::Enter => {
                self.session = self.gate.verify(&self.password_input);
                self.password_input.clear();
                if self.session.is_admin() {
                    self.screen = Screen::Board;
                    self.status = None;
                    return Some(BoardCommand::Load);
                }
                self.set_error("Access denied");
            }
            _ => {}
        }
        None
    }

    fn handle_board_key(&mut self, key: KeyEvent) -> Option<BoardCommand> {
        if self.form.is_some() {
            return self.handle_form_key(key);
        }
        if let Some((id, choice)) = self.status_picker.clone() {
            return self.handle_picker_key(key, id, choice);
        }
        if let Some(id) = self.confirm_delete.take() {
            if key.code == KeyCode::Char('y') {
                return Some(BoardCommand::Delete(id));
            }
            self.status = None;
            return None;
        }
        if self.searching {
            self.handle_search_key(key);
            return None;
        }

        match key.code {
            KeyCode::Char('q') => {
                self.should_quit = true;
                None
            }
            KeyCode::Char('L') => {
                self.logout();
                None
            }
            KeyCode::Char('r') => Some(BoardCommand::Load),
            KeyCode::Char('/') => {
                self.searching = true;
                None
            }
            KeyCode::Char('c') => {
                self.cycle_committee();
                None
            }
            KeyCode::Char('t') => {
                self.selection.active_tab = self.selection.active_tab.next();
                if let Some(status) = self.selection.active_tab.status() {
                    self.focused_column = status;
                }
                self.clamp_cursors();
                None
            }
            KeyCode::Tab | KeyCode::BackTab => {
                self.focus = match self.focus {
                    PanelFocus::Members => PanelFocus::Tasks,
                    PanelFocus::Tasks => PanelFocus::Members,
                };
                None
            }
            _ => match self.focus {
                PanelFocus::Members => {
                    self.handle_members_key(key);
                    None
                }
                PanelFocus::Tasks => self.handle_tasks_key(key),
            },
        }
    }

    /// Leaves the board: the cache is discarded and the gate closes again.
    fn logout(&mut self) {
        self.board.lock().reset();
        self.session = AdminSession::anonymous();
        self.screen = Screen::Login;
        self.selection = Selection::default();
        self.drag.cancel();
        self.member_cursor = 0;
        self.card_cursor = 0;
        tracing::info!("left the board");
    }

    fn cycle_committee(&mut self) {
        let choices = self.committee_choices();
        let idx = choices
            .iter()
            .position(|c| *c == self.selection.committee_filter)
            .map_or(0, |i| (i + 1) % choices.len().max(1));
        self.selection
            .set_committee(choices.get(idx).cloned().unwrap_or_default());
        self.clamp_cursors();
    }

    fn handle_search_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Enter | KeyCode::Esc => self.searching = false,
            KeyCode::Char(c) => self.selection.search_text.push(c),
            KeyCode::Backspace => {
                self.selection.search_text.pop();
            }
            _ => {}
        }
        self.member_cursor = 0;
    }

    fn handle_members_key(&mut self, key: KeyEvent) {
        let view = self.view();
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.member_cursor = self.member_cursor.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.member_cursor + 1 < view.members.len() {
                    self.member_cursor += 1;
                }
            }
            KeyCode::Enter | KeyCode::Char(' ') => {
                if let Some(member) = view.members.get(self.member_cursor) {
                    self.selection.toggle_member(&member.id);
                    self.card_cursor = 0;
                }
            }
            _ => {}
        }
    }

    fn handle_tasks_key(&mut self, key: KeyEvent) -> Option<BoardCommand> {
        let view = self.view();
        let focused = self.focused_task(&view);

        if self.drag.is_dragging() {
            return self.handle_drag_key(key);
        }

        match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.card_cursor = self.card_cursor.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.card_cursor + 1 < view.column(self.focused_column).len() {
                    self.card_cursor += 1;
                }
            }
            KeyCode::Left | KeyCode::Char('h') if self.selection.active_tab.status().is_none() => {
                if let Some(prev) = self.focused_column.prev() {
                    self.focused_column = prev;
                    self.clamp_cursors();
                }
            }
            KeyCode::Right | KeyCode::Char('l') if self.selection.active_tab.status().is_none() => {
                if let Some(next) = self.focused_column.next() {
                    self.focused_column = next;
                    self.clamp_cursors();
                }
            }
            KeyCode::Char('n') => self.form = Some(TaskForm::blank()),
            KeyCode::Char('e') => {
                if let Some(task) = focused {
                    self.form = Some(TaskForm::for_task(
                        &task,
                        &self.committee_choices(),
                        &self.members(),
                    ));
                }
            }
            KeyCode::Char('d') => {
                if let Some(task) = focused {
                    self.status = Some(StatusMessage {
                        text: format!("Delete \"{}\"? (y/n)", task.title),
                        is_error: false,
                    });
                    self.confirm_delete = Some(task.id);
                }
            }
            KeyCode::Char('s') => {
                if let Some(task) = focused {
                    self.status_picker = Some((task.id, task.status));
                }
            }
            KeyCode::Char(' ') => {
                if let Some(task) = focused {
                    self.drag.drag_start(task.id);
                    self.drag.drag_over(self.focused_column);
                }
            }
            _ => {}
        }
        None
    }

    fn handle_drag_key(&mut self, key: KeyEvent) -> Option<BoardCommand> {
        let hovered = self.drag.hovered().unwrap_or(self.focused_column);
        match key.code {
            KeyCode::Left | KeyCode::Char('h') => {
                if let Some(prev) = hovered.prev() {
                    self.drag.drag_over(prev);
                }
                None
            }
            KeyCode::Right | KeyCode::Char('l') => {
                if let Some(next) = hovered.next() {
                    self.drag.drag_over(next);
                }
                None
            }
            KeyCode::Char(' ') | KeyCode::Enter => {
                let intent = self.drag.drop_on(hovered)?;
                self.focused_column = hovered;
                self.card_cursor = 0;
                Some(BoardCommand::Drop(intent))
            }
            KeyCode::Esc => {
                self.drag.cancel();
                None
            }
            _ => None,
        }
    }

    fn handle_picker_key(
        &mut self,
        key: KeyEvent,
        id: TaskId,
        choice: TaskStatus,
    ) -> Option<BoardCommand> {
        match key.code {
            KeyCode::Left | KeyCode::Char('h') | KeyCode::Up => {
                let prev = choice.prev().unwrap_or(choice);
                self.status_picker = Some((id, prev));
                None
            }
            KeyCode::Right | KeyCode::Char('l') | KeyCode::Down => {
                let next = choice.next().unwrap_or(choice);
                self.status_picker = Some((id, next));
                None
            }
            KeyCode::Enter => {
                self.status_picker = None;
                Some(BoardCommand::Transition(id, choice))
            }
            KeyCode::Esc => {
                self.status_picker = None;
                None
            }
            _ => None,
        }
    }

    fn handle_form_key(&mut self, key: KeyEvent) -> Option<BoardCommand> {
        let committees = self.committee_choices();
        let members = self.members();
        let form = self.form.as_mut()?;

        match key.code {
            KeyCode::Esc => {
                self.form = None;
            }
            KeyCode::Tab | KeyCode::Down => form.field = form.field.next(),
            KeyCode::BackTab | KeyCode::Up => form.field = form.field.prev(),
            KeyCode::Left => form.cycle(false, committees.len(), members.len()),
            KeyCode::Right => form.cycle(true, committees.len(), members.len()),
            KeyCode::Backspace => {
                if let Some(text) = form.text_mut() {
                    text.pop();
                }
            }
            KeyCode::Char(c) => {
                if let Some(text) = form.text_mut() {
                    text.push(c);
                }
            }
            KeyCode::Enter => match form.to_draft(&committees, &members) {
                Ok(draft) => {
                    let command = match form.editing.clone() {
                        Some(id) => BoardCommand::Update(id, draft),
                        None => BoardCommand::Create(draft),
                    };
                    self.form = None;
                    return Some(command);
                }
                Err(message) => self.set_error(message),
            },
            _ => {}
        }
        None
    }

    fn clamp_cursors(&mut self) {
        let view = self.view();
        let cards = view.column(self.focused_column).len();
        self.card_cursor = self.card_cursor.min(cards.saturating_sub(1));
        self.member_cursor = self.member_cursor.min(view.members.len().saturating_sub(1));
    }
}

/// Runs `command` on the runtime and reports its outcome on `events`.
pub fn spawn_command<S: TaskStore>(
    controller: &TaskController<S>,
    command: BoardCommand,
    events: mpsc::UnboundedSender<BoardEvent>,
) -> tokio::task::JoinHandle<()> {
    let controller = controller.clone();
    tokio::spawn(async move {
        let action = command.describe();
        let outcome = match command {
            BoardCommand::Load => controller.load().await,
            BoardCommand::Create(draft) => controller.create(draft).await.map(|_| ()),
            BoardCommand::Update(id, draft) => controller.update(&id, draft).await.map(|_| ()),
            BoardCommand::Delete(id) => controller.delete(&id).await,
            BoardCommand::Transition(id, status) => controller.transition(&id, status).await,
            BoardCommand::Drop(intent) => controller.drop_task(intent).await,
        };
        // The UI may already be gone during shutdown.
        let _ = events.send(BoardEvent { action, outcome });
    })
}
