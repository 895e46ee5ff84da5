#![forbid(unsafe_code)]

use super::EngineError;
use super::pipeline::{CascadeReport, continue_from_project};
use crate::Engine;

impl Engine {
    /// Sponsor-only override completing a sponsored milestone held by
    /// the deriver. Propagates to the project deriver exactly as an
    /// automatic transition would, settlement included.
    pub fn verify_milestone(
        &mut self,
        sponsor_id: &str,
        milestone_id: &str,
    ) -> Result<CascadeReport, EngineError> {
        let mut report = CascadeReport::default();
        let change = self
            .store_mut()
            .milestone_verify(sponsor_id, milestone_id)
            .map_err(EngineError::Store)?;
        let Some(change) = change else {
            return Ok(report);
        };
        let project_id = change.project_id.clone();
        report.milestone = Some(change);
        continue_from_project(self.store_mut(), &project_id, &mut report)?;
        Ok(report)
    }
}
