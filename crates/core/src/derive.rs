#![forbid(unsafe_code)]

use crate::model::Status;

/// The leaf facts a task status is derived from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChecklistFact {
    pub required: bool,
    pub checked: bool,
}

/// Derive a task's status from its checklist items.
///
/// Required items dominate: when any item is required, optional items do
/// not move the status in either direction. A task with no items cannot
/// complete through this path and stays pending.
pub fn derive_task_status(items: &[ChecklistFact]) -> Status {
    if items.is_empty() {
        return Status::Pending;
    }

    let has_required = items.iter().any(|item| item.required);
    let counted = |item: &&ChecklistFact| !has_required || item.required;

    let all_checked = items.iter().filter(counted).all(|item| item.checked);
    let any_checked = items.iter().filter(counted).any(|item| item.checked);

    if all_checked {
        Status::Completed
    } else if any_checked {
        Status::InProgress
    } else {
        Status::Pending
    }
}

/// Derive a milestone's status from its task completion counts.
///
/// Sponsored milestones hold at `InProgress` on full completion; only
/// the sponsor's manual verification moves them to `Completed`.
pub fn derive_milestone_status(completed: u64, total: u64, sponsored: bool) -> Status {
    if completed == 0 {
        return Status::Pending;
    }
    if completed >= total && total > 0 {
        if sponsored {
            Status::InProgress
        } else {
            Status::Completed
        }
    } else {
        Status::InProgress
    }
}

/// Derive a project's status from its milestones' statuses.
///
/// A project with no milestones is pending, including one whose
/// milestones were all removed after it had progressed.
pub fn derive_project_status(milestones: &[Status]) -> Status {
    if milestones.is_empty() {
        return Status::Pending;
    }
    if milestones.iter().all(|status| *status == Status::Completed) {
        return Status::Completed;
    }
    if milestones
        .iter()
        .any(|status| matches!(status, Status::InProgress | Status::Completed))
    {
        Status::InProgress
    } else {
        Status::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(required: bool, checked: bool) -> ChecklistFact {
        ChecklistFact { required, checked }
    }

    #[test]
    fn task_with_no_items_stays_pending() {
        assert_eq!(derive_task_status(&[]), Status::Pending);
    }

    #[test]
    fn required_items_drive_the_status() {
        // Nothing checked.
        assert_eq!(
            derive_task_status(&[item(true, false), item(true, false)]),
            Status::Pending
        );
        // One of two required checked.
        assert_eq!(
            derive_task_status(&[item(true, true), item(true, false)]),
            Status::InProgress
        );
        // All required checked; an unchecked optional item does not hold it back.
        assert_eq!(
            derive_task_status(&[item(true, true), item(true, true), item(false, false)]),
            Status::Completed
        );
        // A checked optional item alone does not start progress.
        assert_eq!(
            derive_task_status(&[item(true, false), item(false, true)]),
            Status::Pending
        );
    }

    #[test]
    fn optional_only_items_all_count() {
        assert_eq!(
            derive_task_status(&[item(false, false), item(false, false)]),
            Status::Pending
        );
        assert_eq!(
            derive_task_status(&[item(false, true), item(false, false)]),
            Status::InProgress
        );
        assert_eq!(
            derive_task_status(&[item(false, true), item(false, true)]),
            Status::Completed
        );
    }

    #[test]
    fn milestone_counts_map_to_status() {
        assert_eq!(derive_milestone_status(0, 0, false), Status::Pending);
        assert_eq!(derive_milestone_status(0, 3, false), Status::Pending);
        assert_eq!(derive_milestone_status(1, 3, false), Status::InProgress);
        assert_eq!(derive_milestone_status(3, 3, false), Status::Completed);
    }

    #[test]
    fn sponsored_milestone_holds_at_full_completion() {
        assert_eq!(derive_milestone_status(3, 3, true), Status::InProgress);
        assert_eq!(derive_milestone_status(1, 3, true), Status::InProgress);
        assert_eq!(derive_milestone_status(0, 3, true), Status::Pending);
    }

    #[test]
    fn project_status_over_milestones() {
        assert_eq!(derive_project_status(&[]), Status::Pending);
        assert_eq!(
            derive_project_status(&[Status::Pending, Status::Pending]),
            Status::Pending
        );
        assert_eq!(
            derive_project_status(&[Status::Pending, Status::InProgress]),
            Status::InProgress
        );
        // A completed milestone among pending ones means in progress.
        assert_eq!(
            derive_project_status(&[Status::Completed, Status::Pending]),
            Status::InProgress
        );
        assert_eq!(
            derive_project_status(&[Status::Completed, Status::Completed]),
            Status::Completed
        );
    }
}
