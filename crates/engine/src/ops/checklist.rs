#![forbid(unsafe_code)]

use super::EngineError;
use super::pipeline::{CascadeReport, cascade_from_task};
use crate::Engine;
use gp_core::model::ChecklistOwner;
use gp_storage::{ChecklistItemCreateRequest, ChecklistItemRow, ChecklistItemUpdateRequest};

/// A checklist mutation together with the derived-status changes it
/// caused. Template-owned items never cascade, since no task sits
/// above them.
#[derive(Clone, Debug)]
pub struct ChecklistMutation {
    pub item: ChecklistItemRow,
    pub cascade: CascadeReport,
}

#[derive(Clone, Debug)]
pub struct ChecklistDeletion {
    pub owner: ChecklistOwner,
    pub cascade: CascadeReport,
}

impl Engine {
    pub fn checklist_create(
        &mut self,
        request: ChecklistItemCreateRequest,
    ) -> Result<ChecklistMutation, EngineError> {
        let item = self
            .store_mut()
            .checklist_item_create(request)
            .map_err(EngineError::Store)?;
        let cascade = self.cascade_for_owner(&item.owner)?;
        Ok(ChecklistMutation { item, cascade })
    }

    pub fn checklist_update(
        &mut self,
        request: ChecklistItemUpdateRequest,
    ) -> Result<ChecklistMutation, EngineError> {
        let item = self
            .store_mut()
            .checklist_item_update(request)
            .map_err(EngineError::Store)?;
        let cascade = self.cascade_for_owner(&item.owner)?;
        Ok(ChecklistMutation { item, cascade })
    }

    /// The common leaf mutation: check or uncheck one item.
    pub fn checklist_set_checked(
        &mut self,
        actor: &str,
        item_id: &str,
        checked: bool,
    ) -> Result<ChecklistMutation, EngineError> {
        self.checklist_update(ChecklistItemUpdateRequest {
            actor: actor.to_string(),
            id: item_id.to_string(),
            description: None,
            required: None,
            checked: Some(checked),
        })
    }

    pub fn checklist_delete(
        &mut self,
        actor: &str,
        item_id: &str,
    ) -> Result<ChecklistDeletion, EngineError> {
        let owner = self
            .store_mut()
            .checklist_item_delete(actor, item_id)
            .map_err(EngineError::Store)?;
        let cascade = self.cascade_for_owner(&owner)?;
        Ok(ChecklistDeletion { owner, cascade })
    }

    fn cascade_for_owner(&mut self, owner: &ChecklistOwner) -> Result<CascadeReport, EngineError> {
        match owner.task_id() {
            Some(task_id) => {
                let task_id = task_id.to_string();
                cascade_from_task(self.store_mut(), &task_id)
            }
            None => Ok(CascadeReport::default()),
        }
    }
}
