//! Board controller over a WebSocket connection to an in-process store
//! server.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use crewboard::board::{BoardCache, BoardSettings, TaskController, TaskDraft, TaskError};
use crewboard::store::remote::{DEFAULT_CONNECT_TIMEOUT, RemoteStore};
use crewboard::store::{StoreError, TaskStore};
use crewboard_proto::member::{Member, MemberId, PresenceStatus};
use crewboard_proto::task::{TaskId, TaskStatus};
use crewboard_proto::wire::ErrorCode;
use crewboard_store::server::{StoreState, start_server_with_state};
use crewboard_store::tables::Tables;

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

/// Starts a seeded server and returns its address.
async fn seeded_server(members: Vec<Member>) -> std::net::SocketAddr {
    let tables = Tables::new();
    tables.seed_members(members).await;
    let state = Arc::new(StoreState::with_tables(tables));
    let (addr, _handle) = start_server_with_state("127.0.0.1:0", state)
        .await
        .unwrap();
    addr
}

async fn controller_for(addr: std::net::SocketAddr) -> TaskController<RemoteStore> {
    let store = RemoteStore::connect(&format!("ws://{addr}/ws"), DEFAULT_CONNECT_TIMEOUT)
        .await
        .unwrap();
    TaskController::new(
        Arc::new(store),
        BoardCache::shared(),
        BoardSettings::default(),
    )
}

fn draft(title: &str, committee: &str, assigned_to: &str) -> TaskDraft {
    TaskDraft {
        title: title.to_string(),
        committee: committee.to_string(),
        assigned_to: assigned_to.to_string(),
        ..TaskDraft::default()
    }
}

#[tokio::test]
async fn full_task_lifecycle_over_the_wire() {
    let ana = member("Ana", "Food");
    let addr = seeded_server(vec![ana.clone(), member("Lin", "Drinks")]).await;
    let controller = controller_for(addr).await;

    controller.load().await.unwrap();
    assert_eq!(controller.board().lock().members().len(), 2);

    let created = controller
        .create(draft("Order ice", "Food", &ana.id.to_string()))
        .await
        .unwrap();
    assert_eq!(created.assigned_to, Some(ana.id.clone()));
    assert_eq!(created.committee.as_deref(), Some("Food"));
    assert_eq!(created.status, TaskStatus::Todo);

    controller
        .transition(&created.id, TaskStatus::InProgress)
        .await
        .unwrap();
    assert_eq!(
        controller.board().lock().task(&created.id).unwrap().status,
        TaskStatus::InProgress
    );

    let mut edit = TaskDraft::from_task(&created);
    edit.title = "Order more ice".to_string();
    edit.assigned_to = String::new();
    let updated = controller.update(&created.id, edit).await.unwrap();
    assert_eq!(updated.title, "Order more ice");
    assert_eq!(updated.assigned_to, None);
    assert_eq!(updated.status, TaskStatus::InProgress);

    controller.delete(&created.id).await.unwrap();
    assert!(controller.board().lock().tasks().is_empty());

    // A fresh load agrees with the cache.
    controller.load().await.unwrap();
    assert!(controller.board().lock().tasks().is_empty());
}

#[tokio::test]
async fn second_client_sees_changes_after_reload() {
    let addr = seeded_server(vec![member("Ana", "Food")]).await;
    let first = controller_for(addr).await;
    let second = controller_for(addr).await;
    first.load().await.unwrap();
    second.load().await.unwrap();

    let created = first.create(draft("Rent chairs", "", "")).await.unwrap();
    assert!(second.board().lock().tasks().is_empty());

    second.load().await.unwrap();
    let seen = second.board().lock().task(&created.id).cloned().unwrap();
    assert_eq!(seen.committee, None);
    assert_eq!(seen.assigned_to, None);
}

#[tokio::test]
async fn deleting_a_task_removed_elsewhere_is_not_found() {
    let addr = seeded_server(vec![member("Ana", "Food")]).await;
    let first = controller_for(addr).await;
    let second = controller_for(addr).await;
    first.load().await.unwrap();

    let created = first.create(draft("Sweep floor", "", "")).await.unwrap();
    second.load().await.unwrap();
    first.delete(&created.id).await.unwrap();

    let err = second.delete(&created.id).await.unwrap_err();
    assert!(matches!(
        err,
        TaskError::Store(StoreError::Rejected {
            code: ErrorCode::NotFound,
            ..
        })
    ));
    // Pessimistic: the stale row stays until the next load.
    assert!(second.board().lock().task(&created.id).is_some());
}

#[tokio::test]
async fn failed_transition_over_the_wire_reverts() {
    let addr = seeded_server(vec![member("Ana", "Food")]).await;
    let first = controller_for(addr).await;
    let second = controller_for(addr).await;
    first.load().await.unwrap();

    let created = first.create(draft("Sweep floor", "", "")).await.unwrap();
    second.load().await.unwrap();
    first.delete(&created.id).await.unwrap();

    let err = second
        .transition(&created.id, TaskStatus::Done)
        .await
        .unwrap_err();
    assert!(matches!(err, TaskError::Store(StoreError::Rejected { .. })));

    let board = second.board().lock();
    assert_eq!(board.task(&created.id).unwrap().status, TaskStatus::Todo);
    assert_eq!(board.pending_status(&created.id), None);
}

#[tokio::test]
async fn unknown_assignee_is_rejected_before_the_wire() {
    let addr = seeded_server(vec![member("Ana", "Food")]).await;
    let controller = controller_for(addr).await;
    controller.load().await.unwrap();

    let stranger = MemberId::new().to_string();
    let err = controller
        .create(draft("Carry boxes", "Food", &stranger))
        .await
        .unwrap_err();
    assert_eq!(err, TaskError::UnknownAssignee(stranger));

    let err = controller
        .create(draft("Carry boxes", "Fod", ""))
        .await
        .unwrap_err();
    assert_eq!(err, TaskError::UnknownCommittee("Fod".to_string()));
}

#[tokio::test]
async fn server_page_cap_bounds_the_listing() {
    let tables = Tables::with_limits(100, 3);
    tables.seed_members(vec![member("Ana", "Food")]).await;
    let state = Arc::new(StoreState::with_tables(tables));
    let (addr, _handle) = start_server_with_state("127.0.0.1:0", state)
        .await
        .unwrap();
    let controller = controller_for(addr).await;
    controller.load().await.unwrap();

    for i in 0..5 {
        controller
            .create(draft(&format!("Task {i}"), "", ""))
            .await
            .unwrap();
    }
    controller.load().await.unwrap();
    assert_eq!(controller.board().lock().tasks().len(), 3);

    let store = RemoteStore::connect(&format!("ws://{addr}/ws"), DEFAULT_CONNECT_TIMEOUT)
        .await
        .unwrap();
    assert_eq!(store.list_tasks(200).await.unwrap().len(), 3);
    assert!(store.delete_task(&TaskId::new()).await.is_err());
}
