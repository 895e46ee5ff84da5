#![forbid(unsafe_code)]

use super::EngineError;
use crate::Engine;
use gp_storage::{EnrollRequest, EnrollmentOutcome};

impl Engine {
    /// Enroll a user into a sponsored goal. Returns the created
    /// enrollment and the id of the duplicated project, or a
    /// capacity/conflict/availability rejection.
    pub fn enroll(&mut self, request: EnrollRequest) -> Result<EnrollmentOutcome, EngineError> {
        self.store_mut().enroll(request).map_err(EngineError::Store)
    }
}
