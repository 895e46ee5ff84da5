#![forbid(unsafe_code)]

use gp_core::model::{ChecklistOwner, Status, Verification};
use gp_engine::Engine;
use gp_storage::{
    ChecklistItemCreateRequest, EnrollRequest, MilestoneCreateRequest, ProjectCreateRequest,
    RewardCreateRequest, SponsoredGoalCreateRequest, TaskCreateRequest,
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

/// Publish a sponsor goal whose template has one milestone and one task
/// with a single required checklist item.
fn publish_goal(
    engine: &mut Engine,
    sponsor: &str,
    verification: Verification,
    max_users: u32,
) -> String {
    let store = engine.store_mut();
    let reward = store
        .reward_create(RewardCreateRequest {
            title: "Race entry".to_string(),
            points: 300,
        })
        .expect("reward");
    let project = store
        .project_create(ProjectCreateRequest {
            user_id: sponsor.to_string(),
            title: "5k training plan".to_string(),
            description: None,
            reward_id: reward.id,
        })
        .expect("project");
    let milestone = store
        .milestone_create(MilestoneCreateRequest {
            project_id: project.id.clone(),
            title: "Week one".to_string(),
            reward_id: None,
        })
        .expect("milestone");
    let task = store
        .task_create(TaskCreateRequest {
            milestone_id: milestone.id,
            sprint_id: None,
            title: "First run".to_string(),
            points: 10,
            starts_at_ms: None,
            ends_at_ms: None,
        })
        .expect("task");
    store
        .checklist_item_create(ChecklistItemCreateRequest {
            actor: sponsor.to_string(),
            owner: ChecklistOwner::Task(task.id),
            description: "Run 2km".to_string(),
            required: true,
        })
        .expect("item");

    store
        .goal_create(SponsoredGoalCreateRequest {
            sponsor_id: sponsor.to_string(),
            project_id: project.id,
            title: "Community 5k".to_string(),
            max_users,
            verification,
            starts_at_ms: 0,
            ends_at_ms: i64::MAX,
        })
        .expect("goal")
        .id
}

/// Enroll and fully check the duplicated hierarchy's single item.
/// Returns (project_id, milestone_id) of the copy.
fn enroll_and_complete(engine: &mut Engine, goal_id: &str, user: &str) -> (String, String) {
    let outcome = engine
        .enroll(EnrollRequest {
            user_id: user.to_string(),
            goal_id: goal_id.to_string(),
        })
        .expect("enroll");

    let milestones = engine
        .store()
        .milestone_list_by_project(&outcome.project_id)
        .expect("milestones");
    let tasks = engine
        .store()
        .task_list_by_milestone(&milestones[0].id)
        .expect("tasks");
    let items = engine
        .store()
        .checklist_list_by_task(&tasks[0].id)
        .expect("items");

    let mutation = engine
        .checklist_set_checked(user, &items[0].id, true)
        .expect("check");
    assert_eq!(
        mutation.cascade.task.as_ref().expect("task change").new,
        Status::Completed
    );

    (outcome.project_id, milestones[0].id.clone())
}

#[test]
fn sponsored_milestones_hold_at_full_completion() {
    let mut engine = open_engine("sponsored_hold");
    let goal_id = publish_goal(&mut engine, "coach", Verification::Manual, 20);

    let (project_id, milestone_id) = enroll_and_complete(&mut engine, &goal_id, "runner-1");

    // 100% of tasks done, yet the milestone is held and the project
    // cannot complete.
    let milestone = engine
        .store()
        .milestone_get(&milestone_id)
        .expect("get")
        .expect("milestone");
    assert_eq!(milestone.status, Status::InProgress);

    let project = engine
        .store()
        .project_get(&project_id)
        .expect("get")
        .expect("project");
    assert_eq!(project.status, Status::InProgress);
}

#[test]
fn manual_verification_completes_and_settles() {
    let mut engine = open_engine("manual_verify_settles");
    let goal_id = publish_goal(&mut engine, "coach", Verification::Manual, 20);

    let (project_id, milestone_id) = enroll_and_complete(&mut engine, &goal_id, "runner-1");

    // The wrong sponsor is rejected with no effect.
    let err = engine
        .verify_milestone("other-sponsor", &milestone_id)
        .expect_err("expected forbidden");
    assert_eq!(err.code(), "FORBIDDEN");

    let report = engine
        .verify_milestone("coach", &milestone_id)
        .expect("verify");
    assert_eq!(
        report.milestone.as_ref().expect("milestone change").new,
        Status::Completed
    );
    assert_eq!(
        report.project.as_ref().expect("project change").new,
        Status::Completed
    );

    // The reward goes to the enrollee who completed the copy, not the
    // sponsor.
    let settlement = report.settlement.as_ref().expect("settlement");
    assert_eq!(settlement.user_id, "runner-1");
    assert!(settlement.newly_claimed);

    let project = engine
        .store()
        .project_get(&project_id)
        .expect("get")
        .expect("project");
    assert_eq!(project.status, Status::Completed);

    // Verifying again is a no-op.
    let report = engine
        .verify_milestone("coach", &milestone_id)
        .expect("verify again");
    assert!(report.milestone.is_none());
    assert!(report.settlement.is_none());
}

#[test]
fn verification_requires_the_manual_method() {
    let mut engine = open_engine("verify_needs_manual");
    let goal_id = publish_goal(&mut engine, "coach", Verification::Qr, 20);

    let (_, milestone_id) = enroll_and_complete(&mut engine, &goal_id, "runner-1");

    let err = engine
        .verify_milestone("coach", &milestone_id)
        .expect_err("expected forbidden");
    assert_eq!(err.code(), "FORBIDDEN");
}

#[test]
fn personal_milestones_cannot_be_verified() {
    let mut engine = open_engine("verify_personal");

    let store = engine.store_mut();
    let reward = store
        .reward_create(RewardCreateRequest {
            title: "Sticker".to_string(),
            points: 5,
        })
        .expect("reward");
    let project = store
        .project_create(ProjectCreateRequest {
            user_id: "solo".to_string(),
            title: "Personal goal".to_string(),
            description: None,
            reward_id: reward.id,
        })
        .expect("project");
    let milestone = store
        .milestone_create(MilestoneCreateRequest {
            project_id: project.id,
            title: "Only milestone".to_string(),
            reward_id: None,
        })
        .expect("milestone");

    let err = engine
        .verify_milestone("solo", &milestone.id)
        .expect_err("expected forbidden");
    assert_eq!(err.code(), "FORBIDDEN");
}

#[test]
fn template_owned_items_mutate_without_a_cascade() {
    let mut engine = open_engine("template_items_no_cascade");
    let goal_id = publish_goal(&mut engine, "coach", Verification::Checklist, 20);

    // A checklist item owned by the goal template itself, not by any
    // task.
    let mutation = engine
        .checklist_create(ChecklistItemCreateRequest {
            actor: "coach".to_string(),
            owner: ChecklistOwner::Template(goal_id.clone()),
            description: "Upload proof of registration".to_string(),
            required: true,
        })
        .expect("create");
    assert!(mutation.cascade.task.is_none());

    let mutation = engine
        .checklist_set_checked("coach", &mutation.item.id, true)
        .expect("check");
    assert!(mutation.cascade.task.is_none());
    assert!(mutation.cascade.project.is_none());

    // Non-sponsors cannot touch template items.
    let err = engine
        .checklist_set_checked("runner-1", &mutation.item.id, false)
        .expect_err("expected forbidden");
    assert_eq!(err.code(), "FORBIDDEN");

    let items = engine
        .store()
        .checklist_list_by_goal(&goal_id)
        .expect("list");
    assert_eq!(items.len(), 1);
    assert!(items[0].checked);
}

#[test]
fn enrollment_rejections_map_to_stable_codes() {
    let mut engine = open_engine("rejection_codes");
    let goal_id = publish_goal(&mut engine, "coach", Verification::Checklist, 1);

    engine
        .enroll(EnrollRequest {
            user_id: "runner-1".to_string(),
            goal_id: goal_id.clone(),
        })
        .expect("enroll");

    // The same user again: conflict.
    let err = engine
        .enroll(EnrollRequest {
            user_id: "runner-1".to_string(),
            goal_id: goal_id.clone(),
        })
        .expect_err("expected conflict");
    assert_eq!(err.code(), "CONFLICT");

    // A second user against the single slot: capacity.
    let err = engine
        .enroll(EnrollRequest {
            user_id: "runner-2".to_string(),
            goal_id,
        })
        .expect_err("expected capacity error");
    assert_eq!(err.code(), "CAPACITY_EXCEEDED");
}
