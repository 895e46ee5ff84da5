#![forbid(unsafe_code)]

use gp_core::model::ChecklistOwner;
use gp_storage::{
    ChecklistItemCreateRequest, DailyEntryCreateRequest, MilestoneCreateRequest,
    ProjectCreateRequest, RetrospectiveCreateRequest, ReviewCreateRequest, RewardCreateRequest,
    SprintCreateRequest, SqliteStore, StoreError, TaskCreateRequest,
};
use std::path::PathBuf;

fn temp_dir(test_name: &str) -> PathBuf {
    let base = std::env::temp_dir();
    let pid = std::process::id();
    let nonce = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let dir = base.join(format!("gp_storage_{test_name}_{pid}_{nonce}"));
    std::fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

fn open_store(test_name: &str) -> SqliteStore {
    SqliteStore::open(temp_dir(test_name)).expect("open store")
}

fn seed_project(store: &mut SqliteStore, user: &str) -> String {
    let reward = store
        .reward_create(RewardCreateRequest {
            title: "Medal".to_string(),
            points: 50,
        })
        .expect("reward");
    store
        .project_create(ProjectCreateRequest {
            user_id: user.to_string(),
            title: "Garden overhaul".to_string(),
            description: None,
            reward_id: reward.id,
        })
        .expect("project")
        .id
}

fn seed_milestone(store: &mut SqliteStore, project_id: &str) -> String {
    store
        .milestone_create(MilestoneCreateRequest {
            project_id: project_id.to_string(),
            title: "Clear the beds".to_string(),
            reward_id: None,
        })
        .expect("milestone")
        .id
}

#[test]
fn milestone_delete_removes_all_seven_dependents() {
    let mut store = open_store("milestone_seven_dependents");
    let project_id = seed_project(&mut store, "gardener");
    let milestone_id = seed_milestone(&mut store, &project_id);

    // One sprint with a review and two daily entries.
    let sprint = store
        .sprint_create(SprintCreateRequest {
            milestone_id: milestone_id.clone(),
            title: "Weekend one".to_string(),
            starts_at_ms: None,
            ends_at_ms: None,
        })
        .expect("sprint");
    store
        .review_create(ReviewCreateRequest {
            sprint_id: sprint.id.clone(),
            summary: "Went well".to_string(),
        })
        .expect("review");
    for note in ["dug", "weeded"] {
        store
            .daily_entry_create(DailyEntryCreateRequest {
                sprint_id: Some(sprint.id.clone()),
                task_id: None,
                note: note.to_string(),
            })
            .expect("daily entry");
    }

    // One directly-attached task with three checklist items.
    let task = store
        .task_create(TaskCreateRequest {
            milestone_id: milestone_id.clone(),
            sprint_id: None,
            title: "Remove old roots".to_string(),
            points: 5,
            starts_at_ms: None,
            ends_at_ms: None,
        })
        .expect("task");
    for description in ["north bed", "south bed", "compost"] {
        store
            .checklist_item_create(ChecklistItemCreateRequest {
                actor: "gardener".to_string(),
                owner: ChecklistOwner::Task(task.id.clone()),
                description: description.to_string(),
                required: true,
            })
            .expect("item");
    }

    // No retrospective exists; the delete must tolerate that.
    let report = store
        .milestone_delete("gardener", &milestone_id)
        .expect("delete milestone");
    assert_eq!(report.project_id, project_id);
    assert_eq!(report.counts.sprints, 1);
    assert_eq!(report.counts.tasks, 1);
    assert_eq!(report.counts.reviews, 1);
    assert_eq!(report.counts.retrospectives, 0);
    assert_eq!(report.counts.daily_entries, 2);
    assert_eq!(report.counts.checklist_items, 3);

    assert!(store.milestone_get(&milestone_id).expect("get").is_none());
    assert!(store.sprint_get(&sprint.id).expect("get").is_none());
    assert!(store.task_get(&task.id).expect("get").is_none());
    assert!(
        store
            .review_get_by_sprint(&sprint.id)
            .expect("get")
            .is_none()
    );
    assert!(
        store
            .daily_entry_list_by_sprint(&sprint.id)
            .expect("list")
            .is_empty()
    );
    assert!(
        store
            .checklist_list_by_task(&task.id)
            .expect("list")
            .is_empty()
    );
}

#[test]
fn sprint_delete_detaches_tasks_instead_of_deleting_them() {
    let mut store = open_store("sprint_detaches_tasks");
    let project_id = seed_project(&mut store, "gardener");
    let milestone_id = seed_milestone(&mut store, &project_id);

    let sprint = store
        .sprint_create(SprintCreateRequest {
            milestone_id: milestone_id.clone(),
            title: "Weekend one".to_string(),
            starts_at_ms: None,
            ends_at_ms: None,
        })
        .expect("sprint");
    let task = store
        .task_create(TaskCreateRequest {
            milestone_id: milestone_id.clone(),
            sprint_id: Some(sprint.id.clone()),
            title: "Build trellis".to_string(),
            points: 8,
            starts_at_ms: None,
            ends_at_ms: None,
        })
        .expect("task");
    store
        .retrospective_create(RetrospectiveCreateRequest {
            sprint_id: sprint.id.clone(),
            summary: "Slow start".to_string(),
        })
        .expect("retrospective");

    let report = store
        .sprint_delete("gardener", &sprint.id)
        .expect("delete sprint");
    assert_eq!(report.detached_tasks, 1);
    assert_eq!(report.retrospectives, 1);
    assert_eq!(report.reviews, 0);

    // The task survives, unassigned.
    let task = store.task_get(&task.id).expect("get").expect("task");
    assert_eq!(task.sprint_id, None);
    assert_eq!(task.milestone_id, milestone_id);
}

#[test]
fn task_delete_removes_checklist_items_and_task_entries() {
    let mut store = open_store("task_delete_children");
    let project_id = seed_project(&mut store, "gardener");
    let milestone_id = seed_milestone(&mut store, &project_id);

    let task = store
        .task_create(TaskCreateRequest {
            milestone_id,
            sprint_id: None,
            title: "Plant seedlings".to_string(),
            points: 3,
            starts_at_ms: None,
            ends_at_ms: None,
        })
        .expect("task");
    store
        .checklist_item_create(ChecklistItemCreateRequest {
            actor: "gardener".to_string(),
            owner: ChecklistOwner::Task(task.id.clone()),
            description: "tomatoes".to_string(),
            required: false,
        })
        .expect("item");
    store
        .daily_entry_create(DailyEntryCreateRequest {
            sprint_id: None,
            task_id: Some(task.id.clone()),
            note: "half done".to_string(),
        })
        .expect("daily entry");

    let report = store
        .task_delete("gardener", &task.id)
        .expect("delete task");
    assert_eq!(report.checklist_items, 1);
    assert_eq!(report.daily_entries, 1);
    assert!(store.task_get(&task.id).expect("get").is_none());
}

#[test]
fn deletes_verify_ownership_once_up_front() {
    let mut store = open_store("delete_ownership");
    let project_id = seed_project(&mut store, "gardener");
    let milestone_id = seed_milestone(&mut store, &project_id);

    let err = store
        .milestone_delete("intruder", &milestone_id)
        .expect_err("expected forbidden");
    assert!(matches!(err, StoreError::Forbidden(_)));
    // Nothing was deleted.
    assert!(store.milestone_get(&milestone_id).expect("get").is_some());

    let err = store
        .project_delete("intruder", &project_id)
        .expect_err("expected forbidden");
    assert!(matches!(err, StoreError::Forbidden(_)));
    assert!(store.project_get(&project_id).expect("get").is_some());
}

#[test]
fn project_delete_cascades_through_every_milestone() {
    let mut store = open_store("project_delete_cascade");
    let project_id = seed_project(&mut store, "gardener");
    let first = seed_milestone(&mut store, &project_id);
    let second = seed_milestone(&mut store, &project_id);

    for milestone_id in [&first, &second] {
        store
            .task_create(TaskCreateRequest {
                milestone_id: milestone_id.to_string(),
                sprint_id: None,
                title: "Work".to_string(),
                points: 1,
                starts_at_ms: None,
                ends_at_ms: None,
            })
            .expect("task");
    }

    let report = store
        .project_delete("gardener", &project_id)
        .expect("delete project");
    assert_eq!(report.milestones, 2);
    assert_eq!(report.counts.tasks, 2);
    assert!(report.released_enrollment_id.is_none());

    assert!(store.project_get(&project_id).expect("get").is_none());
    assert!(store.milestone_get(&first).expect("get").is_none());
    assert!(store.milestone_get(&second).expect("get").is_none());
}

#[test]
fn template_projects_cannot_be_deleted_while_a_goal_references_them() {
    let mut store = open_store("template_delete_guard");
    let project_id = seed_project(&mut store, "coach");
    store
        .goal_create(gp_storage::SponsoredGoalCreateRequest {
            sponsor_id: "coach".to_string(),
            project_id: project_id.clone(),
            title: "Garden course".to_string(),
            max_users: 3,
            verification: gp_core::model::Verification::Checklist,
            starts_at_ms: 0,
            ends_at_ms: i64::MAX,
        })
        .expect("goal");

    let err = store
        .project_delete("coach", &project_id)
        .expect_err("expected rejection");
    assert!(matches!(err, StoreError::InvalidInput(_)));
    assert!(store.project_get(&project_id).expect("get").is_some());
}
