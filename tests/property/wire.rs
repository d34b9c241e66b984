//! Property tests for the store wire protocol.
//!
//! Uses proptest to verify:
//! 1. Arbitrary text never panics the decoders (returns `Err` gracefully).
//! 2. Any `TaskPatch` survives a request encode → decode unchanged.
//! 3. Applying a patch touches exactly the columns it names.

use chrono::{NaiveDate, Utc};
use crewboard_proto::member::MemberId;
use crewboard_proto::task::{NewTask, Priority, TaskId, TaskPatch, TaskStatus};
use crewboard_proto::wire::{self, StoreOp, StoreRequest};
use proptest::prelude::*;
use uuid::Uuid;

fn arb_status() -> impl Strategy<Value = TaskStatus> {
    prop_oneof![
        Just(TaskStatus::Todo),
        Just(TaskStatus::InProgress),
        Just(TaskStatus::Done),
    ]
}

fn arb_priority() -> impl Strategy<Value = Priority> {
    prop::sample::select(Priority::ALL.to_vec())
}

fn arb_member_id() -> impl Strategy<Value = MemberId> {
    any::<u128>().prop_map(|n| MemberId::from_uuid(Uuid::from_u128(n)))
}

fn arb_date() -> impl Strategy<Value = NaiveDate> {
    (2020i32..2030, 1u32..=12, 1u32..=28)
        .prop_map(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default())
}

/// Quarter hours are exactly representable, so JSON keeps them bit-identical.
fn arb_hours() -> impl Strategy<Value = f64> {
    (1u16..2000).prop_map(|q| f64::from(q) / 4.0)
}

fn arb_patch() -> impl Strategy<Value = TaskPatch> {
    (
        proptest::option::of("[a-zA-Z0-9 ]{1,40}"),
        proptest::option::of(".{0,80}"),
        proptest::option::of(arb_status()),
        proptest::option::of(arb_priority()),
        proptest::option::of(proptest::option::of("[A-Z][a-z]{2,10}")),
        proptest::option::of(proptest::option::of(arb_member_id())),
        proptest::option::of(proptest::option::of(arb_date())),
        proptest::option::of(proptest::option::of(arb_hours())),
    )
        .prop_map(
            |(
                title,
                description,
                status,
                priority,
                committee,
                assigned_to,
                due_date,
                estimated_hours,
            )| TaskPatch {
                title,
                description,
                status,
                priority,
                committee,
                assigned_to,
                due_date,
                estimated_hours,
            },
        )
}

proptest! {
    #[test]
    fn decoders_never_panic(text in ".*") {
        let _ = wire::decode_request(&text);
        let _ = wire::decode_response(&text);
    }

    #[test]
    fn update_request_preserves_patch(patch in arb_patch(), id in any::<u64>()) {
        let req = StoreRequest {
            id,
            op: StoreOp::UpdateTask { id: TaskId::new(), patch },
        };
        let text = wire::encode_request(&req).unwrap();
        let decoded = wire::decode_request(&text).unwrap();
        prop_assert_eq!(decoded, req);
    }

    #[test]
    fn patch_touches_only_named_columns(patch in arb_patch()) {
        let original = NewTask {
            title: "Set up bar".to_string(),
            committee: Some("Drinks".to_string()),
            estimated_hours: Some(2.0),
            ..NewTask::default()
        }
        .into_task(TaskId::new(), 4, Utc::now());

        let mut task = original.clone();
        patch.apply_to(&mut task);

        prop_assert_eq!(&task.id, &original.id);
        prop_assert_eq!(task.position, original.position);
        prop_assert_eq!(task.created_at, original.created_at);
        prop_assert_eq!(task.status, patch.status.unwrap_or(original.status));
        prop_assert_eq!(
            &task.committee,
            patch.committee.as_ref().unwrap_or(&original.committee)
        );
        prop_assert_eq!(
            &task.title,
            patch.title.as_ref().unwrap_or(&original.title)
        );
    }
}
