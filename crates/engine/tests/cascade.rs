#![forbid(unsafe_code)]

use gp_core::model::{ChecklistOwner, RewardStatus, Status};
use gp_engine::{Engine, EngineError};
use gp_storage::{
    ChecklistItemCreateRequest, MilestoneCreateRequest, ProjectCreateRequest, RewardCreateRequest,
    TaskCreateRequest,
};
use std::path::PathBuf;

fn temp_dir(test_name: &str) -> PathBuf {
    let base = std::env::temp_dir();
    let pid = std::process::id();
    let nonce = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let dir = base.join(format!("gp_engine_{test_name}_{pid}_{nonce}"));
    std::fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

fn open_engine(test_name: &str) -> Engine {
    Engine::open(temp_dir(test_name)).expect("open engine")
}

struct Seeded {
    reward_id: String,
    project_id: String,
    milestone_id: String,
    task_id: String,
    items: Vec<String>,
}

/// One project, one milestone, one task with `required` required items.
fn seed(engine: &mut Engine, user: &str, required: usize) -> Seeded {
    let store = engine.store_mut();
    let reward = store
        .reward_create(RewardCreateRequest {
            title: "Medal".to_string(),
            points: 100,
        })
        .expect("reward");
    let project = store
        .project_create(ProjectCreateRequest {
            user_id: user.to_string(),
            title: "Read twelve books".to_string(),
            description: None,
            reward_id: reward.id.clone(),
        })
        .expect("project");
    let milestone = store
        .milestone_create(MilestoneCreateRequest {
            project_id: project.id.clone(),
            title: "First quarter".to_string(),
            reward_id: None,
        })
        .expect("milestone");
    let task = store
        .task_create(TaskCreateRequest {
            milestone_id: milestone.id.clone(),
            sprint_id: None,
            title: "Three books".to_string(),
            points: 25,
            starts_at_ms: None,
            ends_at_ms: None,
        })
        .expect("task");

    let mut items = Vec::new();
    for index in 0..required {
        let item = store
            .checklist_item_create(ChecklistItemCreateRequest {
                actor: user.to_string(),
                owner: ChecklistOwner::Task(task.id.clone()),
                description: format!("book {index}"),
                required: true,
            })
            .expect("item");
        items.push(item.id);
    }

    Seeded {
        reward_id: reward.id,
        project_id: project.id,
        milestone_id: milestone.id,
        task_id: task.id,
        items,
    }
}

#[test]
fn checking_items_walks_the_full_chain_to_settlement() {
    let mut engine = open_engine("full_chain");
    let seeded = seed(&mut engine, "reader", 2);

    // First required item: everything moves to in progress.
    let mutation = engine
        .checklist_set_checked("reader", &seeded.items[0], true)
        .expect("check first");
    let task = mutation.cascade.task.as_ref().expect("task change");
    assert_eq!(task.old, Status::Pending);
    assert_eq!(task.new, Status::InProgress);
    let milestone = mutation.cascade.milestone.as_ref().expect("milestone change");
    assert_eq!(milestone.milestone_id, seeded.milestone_id);
    assert_eq!(milestone.new, Status::InProgress);
    let project = mutation.cascade.project.as_ref().expect("project change");
    assert_eq!(project.new, Status::InProgress);
    assert!(mutation.cascade.settlement.is_none());

    // Second required item: completion ripples up and settles the
    // reward exactly once.
    let mutation = engine
        .checklist_set_checked("reader", &seeded.items[1], true)
        .expect("check second");
    assert_eq!(
        mutation.cascade.task.as_ref().expect("task change").new,
        Status::Completed
    );
    assert_eq!(
        mutation
            .cascade
            .milestone
            .as_ref()
            .expect("milestone change")
            .new,
        Status::Completed
    );
    assert_eq!(
        mutation
            .cascade
            .project
            .as_ref()
            .expect("project change")
            .new,
        Status::Completed
    );
    let settlement = mutation.cascade.settlement.as_ref().expect("settlement");
    assert!(settlement.newly_claimed);
    assert_eq!(settlement.user_id, "reader");
    assert_eq!(settlement.reward_id, seeded.reward_id);

    let row = engine
        .store()
        .user_reward_get("reader", &seeded.reward_id)
        .expect("get")
        .expect("user reward");
    assert_eq!(row.status, RewardStatus::Claimed);
}

#[test]
fn recomputation_without_changes_writes_nothing() {
    let mut engine = open_engine("idempotent_recompute");
    let seeded = seed(&mut engine, "reader", 2);

    for item in &seeded.items {
        engine
            .checklist_set_checked("reader", item, true)
            .expect("check");
    }

    let seq_before = engine.store().events_last_seq().expect("seq");

    let report = engine.recompute_task(&seeded.task_id).expect("recompute");
    assert!(report.task.is_none());
    assert!(report.settlement.is_none());

    let report = engine
        .recompute_project(&seeded.project_id)
        .expect("recompute");
    assert!(report.project.is_none());
    assert!(report.settlement.is_none());

    // No journal growth, no duplicate settlement.
    assert_eq!(engine.store().events_last_seq().expect("seq"), seq_before);
    assert_eq!(
        engine
            .store()
            .user_reward_list_by_user("reader")
            .expect("list")
            .len(),
        1
    );
}

#[test]
fn unchecking_reverts_the_chain_without_touching_the_reward() {
    let mut engine = open_engine("uncheck_reverts");
    let seeded = seed(&mut engine, "reader", 2);

    for item in &seeded.items {
        engine
            .checklist_set_checked("reader", item, true)
            .expect("check");
    }

    let mutation = engine
        .checklist_set_checked("reader", &seeded.items[0], false)
        .expect("uncheck");
    assert_eq!(
        mutation.cascade.task.as_ref().expect("task change").new,
        Status::InProgress
    );
    assert_eq!(
        mutation
            .cascade
            .project
            .as_ref()
            .expect("project change")
            .new,
        Status::InProgress
    );
    assert!(mutation.cascade.settlement.is_none());

    // The claim survives the project leaving completed.
    let row = engine
        .store()
        .user_reward_get("reader", &seeded.reward_id)
        .expect("get")
        .expect("user reward");
    assert_eq!(row.status, RewardStatus::Claimed);
}

#[test]
fn re_entering_completed_never_claims_twice() {
    let mut engine = open_engine("monotonic_settlement");
    let seeded = seed(&mut engine, "reader", 1);

    engine
        .checklist_set_checked("reader", &seeded.items[0], true)
        .expect("complete everything");

    let claimed_at = engine
        .store()
        .user_reward_get("reader", &seeded.reward_id)
        .expect("get")
        .expect("user reward")
        .claimed_at_ms;

    // A milestone added after completion drags the project back once
    // recomputed.
    let store = engine.store_mut();
    let milestone = store
        .milestone_create(MilestoneCreateRequest {
            project_id: seeded.project_id.clone(),
            title: "Second quarter".to_string(),
            reward_id: None,
        })
        .expect("milestone");
    let task = store
        .task_create(TaskCreateRequest {
            milestone_id: milestone.id.clone(),
            sprint_id: None,
            title: "Three more books".to_string(),
            points: 25,
            starts_at_ms: None,
            ends_at_ms: None,
        })
        .expect("task");
    let item = store
        .checklist_item_create(ChecklistItemCreateRequest {
            actor: "reader".to_string(),
            owner: ChecklistOwner::Task(task.id),
            description: "book".to_string(),
            required: true,
        })
        .expect("item");

    let report = engine
        .recompute_project(&seeded.project_id)
        .expect("recompute");
    assert_eq!(
        report.project.as_ref().expect("project change").new,
        Status::InProgress
    );

    // Completing the new milestone re-enters completed; settlement runs
    // again but the claim is already settled.
    let mutation = engine
        .checklist_set_checked("reader", &item.id, true)
        .expect("check");
    assert_eq!(
        mutation
            .cascade
            .project
            .as_ref()
            .expect("project change")
            .new,
        Status::Completed
    );
    let settlement = mutation.cascade.settlement.as_ref().expect("settlement");
    assert!(!settlement.newly_claimed);

    let rewards = engine
        .store()
        .user_reward_list_by_user("reader")
        .expect("list");
    assert_eq!(rewards.len(), 1);
    assert_eq!(rewards[0].claimed_at_ms, claimed_at);
}

#[test]
fn unknown_checklist_items_surface_as_not_found() {
    let mut engine = open_engine("unknown_item");
    let err = engine
        .checklist_set_checked("reader", "ITEM-404", true)
        .expect_err("expected not found");
    assert_eq!(err.code(), "NOT_FOUND");
    assert!(matches!(err, EngineError::Store(_)));
}
