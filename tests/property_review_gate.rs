use caseflow::domain::models::{ReviewStatus, Task, TaskStatus};
use proptest::prelude::*;
use serde_json::json;
use uuid::Uuid;

#[derive(Debug, Clone, Copy)]
enum Op {
    BeginRun,
    RequestReview,
    Approve,
    Reject,
    Fail,
    Complete,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        Just(Op::BeginRun),
        Just(Op::RequestReview),
        Just(Op::Approve),
        Just(Op::Reject),
        Just(Op::Fail),
        Just(Op::Complete),
    ]
}

/// Apply an operation the way the engine would: the gate is consulted
/// before an automatic completion, manual completion is forced.
fn apply(task: &mut Task, op: Op, reviewer: Uuid) {
    let _ = match op {
        Op::BeginRun => task.begin_run(),
        Op::RequestReview => {
            task.automation_output = Some(json!({"draft": "text"}));
            task.request_review()
        }
        Op::Approve => task.approve(reviewer, None),
        Op::Reject => task.reject(reviewer, "Needs changes".to_string()),
        Op::Fail => task.reset_to_pending(Some(json!({"error": "provider down"}))),
        Op::Complete => {
            if task.ai_gate_satisfied() {
                task.mark_completed(None).map(|_| ())
            } else {
                Ok(())
            }
        }
    };
}

proptest! {
    /// Property: a review-required task never completes through the gate
    /// without an approval.
    #[test]
    fn prop_review_required_completion_needs_approval(
        ops in prop::collection::vec(op_strategy(), 0..30)
    ) {
        let reviewer = Uuid::new_v4();
        let mut task = Task::automated(Uuid::new_v4(), "Draft", "email-drafter", json!({"to": "x"}))
            .with_review_required(true);

        for op in ops {
            apply(&mut task, op, reviewer);
            if task.status == TaskStatus::Completed {
                prop_assert_eq!(task.review_status, Some(ReviewStatus::Approved));
                prop_assert_eq!(task.reviewed_by, Some(reviewer));
            }
        }
    }

    /// Property: a completed task stays completed whatever follows.
    #[test]
    fn prop_completion_is_terminal(
        ops in prop::collection::vec(op_strategy(), 0..30)
    ) {
        let reviewer = Uuid::new_v4();
        let mut task = Task::automated(Uuid::new_v4(), "Draft", "email-drafter", json!({"to": "x"}))
            .with_review_required(true);
        let mut seen_completed = false;

        for op in ops {
            apply(&mut task, op, reviewer);
            if seen_completed {
                prop_assert_eq!(task.status, TaskStatus::Completed);
            }
            seen_completed |= task.is_completed();
        }
    }

    /// Property: without review, the gate opens exactly when a non-error
    /// output is present.
    #[test]
    fn prop_gate_without_review_tracks_output(
        ops in prop::collection::vec(op_strategy(), 0..30)
    ) {
        let reviewer = Uuid::new_v4();
        let mut task =
            Task::automated(Uuid::new_v4(), "Extract", "document-extractor", json!({"doc": "a"}));

        for op in ops {
            apply(&mut task, op, reviewer);
            let has_good_output = task
                .automation_output
                .as_ref()
                .is_some_and(|v| v.get("error").is_none());
            prop_assert_eq!(task.ai_gate_satisfied(), has_good_output);
            prop_assert_eq!(task.review_status, None);
        }
    }
}
