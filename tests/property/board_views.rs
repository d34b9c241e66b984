//! Property tests for the derived board views.
//!
//! 1. A committee-wide task is visible to every member of its committee.
//! 2. An assigned task is visible to exactly its assignee.
//! 3. Committee completion stays within 0..=100 and is 0 for an empty committee.

use chrono::{TimeZone, Utc};
use crewboard::board::committee::CommitteeFilter;
use crewboard::board::selection::Selection;
use crewboard::board::views::{BoardView, committee_progress, completion_percent, filter_tasks};
use crewboard_proto::member::{Member, MemberId, PresenceStatus};
use crewboard_proto::task::{NewTask, Task, TaskId, TaskStatus};
use proptest::prelude::*;
use uuid::Uuid;

const COMMITTEES: [&str; 3] = ["Food", "Drinks", "Logistics"];

fn member_id(n: usize) -> MemberId {
    MemberId::from_uuid(Uuid::from_u128(n as u128 + 1))
}

fn make_members(committees: &[usize]) -> Vec<Member> {
    committees
        .iter()
        .enumerate()
        .map(|(i, c)| Member {
            id: member_id(i),
            full_name: format!("Member {i}"),
            email: format!("m{i}@example.org"),
            committee: COMMITTEES[*c].to_string(),
            role: String::new(),
            status: PresenceStatus::Active,
            is_leader: false,
            avatar_url: None,
        })
        .collect()
}

/// (committee index or none, assignee index or none, status).
type TaskRow = (Option<usize>, Option<usize>, TaskStatus);

fn make_tasks(rows: &[TaskRow], member_count: usize) -> Vec<Task> {
    let created = Utc.timestamp_opt(1_700_000_000, 0).single().unwrap_or_default();
    rows
        .iter()
        .enumerate()
        .map(|(i, (committee, assignee, status))| {
            let mut task = NewTask {
                title: format!("Task {i}"),
                committee: committee.map(|c| COMMITTEES[c].to_string()),
                assigned_to: assignee.map(|a| member_id(a % member_count)),
                ..NewTask::default()
            }
            .into_task(
                TaskId::from_uuid(Uuid::from_u128(1000 + i as u128)),
                i64::try_from(i).unwrap_or_default(),
                created,
            );
            task.status = *status;
            task
        })
        .collect()
}

fn arb_status() -> impl Strategy<Value = TaskStatus> {
    prop::sample::select(TaskStatus::ALL.to_vec())
}

fn arb_board() -> impl Strategy<Value = (Vec<usize>, Vec<TaskRow>)> {
    (
        prop::collection::vec(0usize..COMMITTEES.len(), 1..6),
        prop::collection::vec(
            (
                proptest::option::of(0usize..COMMITTEES.len()),
                proptest::option::of(0usize..6),
                arb_status(),
            ),
            0..12,
        ),
    )
}

fn visible_ids(tasks: &[Task], members: &[Member], selection: &Selection) -> Vec<TaskId> {
    filter_tasks(tasks, members, selection)
        .into_iter()
        .map(|t| t.id.clone())
        .collect()
}

proptest! {
    #[test]
    fn committee_wide_tasks_visible_to_whole_committee(
        (committees, rows) in arb_board(),
        pick in any::<prop::sample::Index>(),
    ) {
        let members = make_members(&committees);
        let tasks = make_tasks(&rows, members.len());
        let selected = pick.get(&members);

        let selection = Selection {
            selected_member: Some(selected.id.clone()),
            ..Selection::default()
        };
        let visible = visible_ids(&tasks, &members, &selection);

        for task in &tasks {
            if task.assigned_to.is_none()
                && task.committee.as_deref() == Some(selected.committee.as_str())
            {
                prop_assert!(visible.contains(&task.id));
            }
        }
    }

    #[test]
    fn assigned_tasks_visible_only_to_assignee(
        (committees, rows) in arb_board(),
        pick in any::<prop::sample::Index>(),
    ) {
        let members = make_members(&committees);
        let tasks = make_tasks(&rows, members.len());
        let selected = pick.get(&members);

        let selection = Selection {
            selected_member: Some(selected.id.clone()),
            ..Selection::default()
        };
        let visible = visible_ids(&tasks, &members, &selection);

        for task in tasks.iter().filter(|t| t.assigned_to.is_some()) {
            let is_mine = task.assigned_to.as_ref() == Some(&selected.id);
            prop_assert_eq!(visible.contains(&task.id), is_mine);
        }

        // With nobody selected, only the committee filter applies.
        let nobody = Selection {
            committee_filter: CommitteeFilter::Named(selected.committee.clone()),
            ..Selection::default()
        };
        let visible = visible_ids(&tasks, &members, &nobody);
        for task in &tasks {
            let passes = task
                .committee
                .as_deref()
                .is_none_or(|c| c == selected.committee);
            prop_assert_eq!(visible.contains(&task.id), passes);
        }
    }

    #[test]
    fn committee_completion_is_a_percentage(
        (committees, rows) in arb_board(),
    ) {
        let members = make_members(&committees);
        let tasks = make_tasks(&rows, members.len());

        for progress in committee_progress(&tasks, &members) {
            prop_assert!(progress.percent <= 100);
            if progress.total == 0 {
                prop_assert_eq!(progress.percent, 0);
            }
            prop_assert!(progress.done <= progress.total);
        }
    }

    #[test]
    fn completion_percent_bounds(done in 0usize..10_000, total in 0usize..10_000) {
        let percent = completion_percent(done, total);
        prop_assert!(percent <= 100);
        if total == 0 {
            prop_assert_eq!(percent, 0);
        }
        if done >= total && total > 0 {
            prop_assert_eq!(percent, 100);
        }
    }

    #[test]
    fn view_columns_partition_filtered_tasks(
        (committees, rows) in arb_board(),
    ) {
        let members = make_members(&committees);
        let tasks = make_tasks(&rows, members.len());
        let view = BoardView::compute(&members, &tasks, &Selection::default());

        prop_assert_eq!(view.counts.total, tasks.len());
        for status in TaskStatus::ALL {
            let column = view.column(status);
            prop_assert!(column.iter().all(|t| t.status == status));
            prop_assert_eq!(column.len(), view.counts.of(status));
        }
    }
}
