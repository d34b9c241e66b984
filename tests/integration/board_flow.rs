//! End-to-end board flows: key presses drive the app, commands run through
//! the controller against an in-memory store, and outcomes come back as
//! board events.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use chrono::Utc;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tokio::sync::mpsc;

use crewboard::app::{self, App, BoardCommand, BoardEvent, Screen};
use crewboard::board::{BoardCache, BoardSettings, TaskController};
use crewboard::gate::PasswordGate;
use crewboard::store::memory::{CallKind, MemoryStore, StoreCall};
use crewboard_proto::member::{Member, MemberId, PresenceStatus};
use crewboard_proto::task::{NewTask, Task, TaskId, TaskPatch, TaskStatus};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const PASSWORD: &str = "letmein";

struct Harness {
    app: App,
    controller: TaskController<MemoryStore>,
    store: Arc<MemoryStore>,
    tx: mpsc::UnboundedSender<BoardEvent>,
    rx: mpsc::UnboundedReceiver<BoardEvent>,
}

impl Harness {
    /// Logs in and loads the board from a store holding `members` and `tasks`.
    async fn start(members: Vec<Member>, tasks: Vec<Task>) -> Self {
        Self::start_with(members, tasks, BoardSettings::default()).await
    }

    async fn start_with(members: Vec<Member>, tasks: Vec<Task>, settings: BoardSettings) -> Self {
        let store = Arc::new(MemoryStore::with_data(members, tasks));
        let board = BoardCache::shared();
        let controller = TaskController::new(Arc::clone(&store), Arc::clone(&board), settings);
        let app = App::new(board, PasswordGate::new(Some(PASSWORD.to_string())));
        let (tx, rx) = mpsc::unbounded_channel();

        let mut harness = Self {
            app,
            controller,
            store,
            tx,
            rx,
        };
        for c in PASSWORD.chars() {
            harness.press(KeyCode::Char(c));
        }
        let load = harness.press(KeyCode::Enter).expect("login should load");
        assert_eq!(load, BoardCommand::Load);
        harness.run(load).await;
        harness
    }

    fn press(&mut self, code: KeyCode) -> Option<BoardCommand> {
        self.app
            .handle_key_event(KeyEvent::new(code, KeyModifiers::NONE))
    }

    /// Runs `command` to completion and applies its event.
    async fn run(&mut self, command: BoardCommand) {
        app::spawn_command(&self.controller, command, self.tx.clone())
            .await
            .unwrap();
        while let Ok(event) = self.rx.try_recv() {
            self.app.apply_event(event);
        }
    }

    async fn press_and_run(&mut self, code: KeyCode) {
        if let Some(command) = self.press(code) {
            self.run(command).await;
        }
    }

    fn cached(&self, id: &TaskId) -> Option<Task> {
        self.controller.board().lock().task(id).cloned()
    }

    fn status_is_error(&self) -> bool {
        self.app.status.as_ref().is_some_and(|s| s.is_error)
    }
}

fn member(name: &str, committee: &str) -> Member {
    Member {
        id: MemberId::new(),
        full_name: name.to_string(),
        email: format!("{}@example.org", name.to_lowercase()),
        committee: committee.to_string(),
        role: "Volunteer".to_string(),
        status: PresenceStatus::Active,
        is_leader: false,
        avatar_url: None,
    }
}

fn task(title: &str, committee: Option<&str>, position: i64) -> Task {
    NewTask {
        title: title.to_string(),
        committee: committee.map(str::to_string),
        ..NewTask::default()
    }
    .into_task(TaskId::new(), position, Utc::now())
}

// ---------------------------------------------------------------------------
// Filtering
// ---------------------------------------------------------------------------

#[tokio::test]
async fn committee_wide_task_follows_member_then_committee_filter() {
    let ana = member("Ana", "Food");
    let lin = member("Lin", "Drinks");
    let t1 = task("Buy napkins", Some("Food"), 1);
    let mut h = Harness::start(vec![ana.clone(), lin], vec![t1.clone()]).await;
    assert_eq!(h.app.screen, Screen::Board);

    // Select Ana from the sidebar.
    h.press(KeyCode::Tab);
    h.press(KeyCode::Enter);
    assert_eq!(h.app.selection.selected_member, Some(ana.id.clone()));

    let view = h.app.view();
    assert_eq!(view.column(TaskStatus::Todo), &[t1]);

    // all -> Food -> Drinks, Ana still selected.
    h.press(KeyCode::Char('c'));
    h.press(KeyCode::Char('c'));
    assert_eq!(h.app.selection.selected_member, Some(ana.id));
    let view = h.app.view();
    assert!(view.columns.iter().all(Vec::is_empty));
    assert_eq!(view.counts.total, 0);
}

#[tokio::test]
async fn committee_progress_on_the_board() {
    let mut done = task("Cook rice", Some("Food"), 1);
    done.status = TaskStatus::Done;
    let todo = task("Cook beans", Some("Food"), 2);
    let h = Harness::start(
        vec![member("Ana", "Food"), member("Lin", "Drinks")],
        vec![done, todo],
    )
    .await;

    let progress = h.app.view().progress;
    let food = progress.iter().find(|p| p.committee == "Food").unwrap();
    assert_eq!(food.percent, 50);
    let drinks = progress.iter().find(|p| p.committee == "Drinks").unwrap();
    assert_eq!((drinks.total, drinks.percent), (0, 0));
}

// ---------------------------------------------------------------------------
// Mutations
// ---------------------------------------------------------------------------

#[tokio::test]
async fn keyboard_drag_to_done_confirms_after_the_store_answers() {
    let t1 = task("Hang lights", None, 1);
    let mut h = Harness::start(vec![], vec![t1.clone()]).await;
    h.store.hold_updates();

    h.press(KeyCode::Char(' '));
    h.press(KeyCode::Right);
    h.press(KeyCode::Right);
    let drop = h.press(KeyCode::Enter).expect("drop command");

    let handle = app::spawn_command(&h.controller, drop, h.tx.clone());
    h.store.wait_for_held(1).await;

    // In flight: displayed in Done, confirmed status untouched.
    assert_eq!(h.cached(&t1.id).unwrap().status, TaskStatus::Todo);
    assert!(h.app.is_pending(&t1.id));
    assert_eq!(h.app.view().column(TaskStatus::Done).len(), 1);

    assert!(h.store.release_oldest());
    handle.await.unwrap();
    while let Ok(event) = h.rx.try_recv() {
        h.app.apply_event(event);
    }

    assert_eq!(h.cached(&t1.id).unwrap().status, TaskStatus::Done);
    assert!(!h.app.is_pending(&t1.id));
    assert_eq!(h.store.count(CallKind::Update), 1);
    assert_eq!(
        h.store.calls().last(),
        Some(&StoreCall::UpdateTask(
            t1.id.clone(),
            TaskPatch::status_only(TaskStatus::Done)
        ))
    );
    assert!(!h.status_is_error());
}

#[tokio::test]
async fn failed_drop_shows_error_and_reverts() {
    let t1 = task("Hang lights", None, 1);
    let mut h = Harness::start(vec![], vec![t1.clone()]).await;
    h.store.fail_next(CallKind::Update);

    h.press(KeyCode::Char(' '));
    h.press(KeyCode::Right);
    h.press_and_run(KeyCode::Enter).await;

    assert!(h.status_is_error());
    assert_eq!(h.cached(&t1.id).unwrap().status, TaskStatus::Todo);
    assert_eq!(h.app.view().column(TaskStatus::Todo).len(), 1);
}

#[tokio::test]
async fn new_task_form_with_no_assignee_caches_null() {
    let mut h = Harness::start(vec![member("Ana", "Food")], vec![]).await;

    h.press(KeyCode::Char('n'));
    for c in "Set up tables".chars() {
        h.press(KeyCode::Char(c));
    }
    h.press_and_run(KeyCode::Enter).await;

    assert!(!h.status_is_error());
    let tasks = h.controller.board().lock().tasks().to_vec();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].title, "Set up tables");
    assert_eq!(tasks[0].assigned_to, None);
    assert_eq!(tasks[0].committee, None);
    assert_eq!(tasks[0].status, TaskStatus::Todo);
    assert_eq!(h.store.stored_tasks().len(), 1);
}

#[tokio::test]
async fn edit_keeps_column_and_updates_title() {
    let mut t1 = task("Hang lights", None, 1);
    t1.status = TaskStatus::InProgress;
    let mut h = Harness::start(vec![], vec![t1.clone()]).await;

    h.press(KeyCode::Right);
    h.press(KeyCode::Char('e'));
    h.press(KeyCode::Backspace);
    h.press(KeyCode::Backspace);
    h.press(KeyCode::Backspace);
    h.press(KeyCode::Backspace);
    h.press(KeyCode::Backspace);
    h.press(KeyCode::Backspace);
    for c in "flags".chars() {
        h.press(KeyCode::Char(c));
    }
    h.press_and_run(KeyCode::Enter).await;

    let cached = h.cached(&t1.id).unwrap();
    assert_eq!(cached.title, "Hang flags");
    assert_eq!(cached.status, TaskStatus::InProgress);
    let Some(StoreCall::UpdateTask(_, patch)) = h.store.calls().last().cloned() else {
        panic!("expected an update call");
    };
    assert_eq!(patch.status, None);
}

#[tokio::test]
async fn title_edit_keeps_unlisted_committee_and_assignee() {
    let ana = member("Ana", "Food");
    let zed = member("Zed", "Stage");
    let mut t1 = task("Hang lights", Some("Stage"), 1);
    t1.assigned_to = Some(zed.id.clone());
    // Only the first member page is loaded, so Zed and "Stage" are unknown
    // to the board.
    let settings = BoardSettings {
        member_page: 1,
        ..BoardSettings::default()
    };
    let mut h = Harness::start_with(vec![ana, zed.clone()], vec![t1.clone()], settings).await;
    assert_eq!(h.app.members().len(), 1);

    h.press(KeyCode::Char('e'));
    h.press(KeyCode::Char('!'));
    h.press_and_run(KeyCode::Enter).await;

    assert!(!h.status_is_error());
    let cached = h.cached(&t1.id).unwrap();
    assert_eq!(cached.title, "Hang lights!");
    assert_eq!(cached.committee.as_deref(), Some("Stage"));
    assert_eq!(cached.assigned_to, Some(zed.id.clone()));

    let Some(StoreCall::UpdateTask(_, patch)) = h.store.calls().last().cloned() else {
        panic!("expected an update call");
    };
    assert_eq!(
        patch,
        TaskPatch {
            title: Some("Hang lights!".to_string()),
            ..TaskPatch::default()
        }
    );
    let stored = h.store.stored_tasks();
    assert_eq!(stored[0].committee.as_deref(), Some("Stage"));
    assert_eq!(stored[0].assigned_to, Some(zed.id));
}

#[tokio::test]
async fn logout_during_transition_leaves_login_cache_empty() {
    let t1 = task("Hang lights", None, 1);
    let mut h = Harness::start(vec![], vec![t1.clone()]).await;
    h.store.hold_updates();

    h.press(KeyCode::Char('s'));
    h.press(KeyCode::Right);
    let command = h.press(KeyCode::Enter).expect("picker should transition");
    let in_flight = app::spawn_command(&h.controller, command, h.tx.clone());
    h.store.wait_for_held(1).await;

    h.press(KeyCode::Char('L'));
    assert_eq!(h.app.screen, Screen::Login);

    assert!(h.store.release_oldest());
    in_flight.await.unwrap();
    assert!(h.cached(&t1.id).is_none());
    assert!(h.controller.board().lock().displayed_tasks().is_empty());
    assert_eq!(h.store.stored_tasks()[0].status, TaskStatus::InProgress);
}

#[tokio::test]
async fn failed_delete_keeps_task() {
    let t1 = task("Hang lights", None, 1);
    let mut h = Harness::start(vec![], vec![t1.clone()]).await;
    h.store.fail_next(CallKind::Delete);

    h.press(KeyCode::Char('d'));
    h.press_and_run(KeyCode::Char('y')).await;

    assert!(h.status_is_error());
    assert!(h.cached(&t1.id).is_some());

    h.press(KeyCode::Char('d'));
    h.press_and_run(KeyCode::Char('y')).await;
    assert!(!h.status_is_error());
    assert!(h.cached(&t1.id).is_none());
}

#[tokio::test]
async fn status_picker_twice_issues_two_calls() {
    let t1 = task("Hang lights", None, 1);
    let mut h = Harness::start(vec![], vec![t1.clone()]).await;

    h.press(KeyCode::Char('s'));
    h.press(KeyCode::Right);
    h.press_and_run(KeyCode::Enter).await;
    assert_eq!(h.cached(&t1.id).unwrap().status, TaskStatus::InProgress);

    // The card moved, so pick it from its new column.
    h.press(KeyCode::Right);
    h.press(KeyCode::Char('s'));
    h.press_and_run(KeyCode::Enter).await;

    assert_eq!(h.cached(&t1.id).unwrap().status, TaskStatus::InProgress);
    assert_eq!(h.store.count(CallKind::Update), 2);
}
