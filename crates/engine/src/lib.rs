#![forbid(unsafe_code)]

mod dto;
mod ops;
mod support;

pub use dto::*;
pub use ops::{
    CascadeReport, CascadeStage, ChecklistDeletion, ChecklistMutation, EngineError,
    MilestoneDeletion, TaskDeletion,
};

use gp_storage::SqliteStore;
use std::path::Path;

/// The use-case surface over the store: checklist mutation with status
/// cascade, enrollment, sponsor verification, cascade deletion, and
/// recomputation for operational recovery.
pub struct Engine {
    store: SqliteStore,
}

impl Engine {
    pub fn open(storage_dir: impl AsRef<Path>) -> Result<Self, EngineError> {
        let store = SqliteStore::open(storage_dir).map_err(EngineError::Store)?;
        Ok(Self { store })
    }

    pub fn from_store(store: SqliteStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &SqliteStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut SqliteStore {
        &mut self.store
    }
}
