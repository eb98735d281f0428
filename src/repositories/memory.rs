use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;

use crate::entities::{ItemId, ScanState};
use crate::repositories::{ScanStateStore, StoreError};

/// In-process store, used by tests and single-process deployments.
#[derive(Clone, Default)]
pub struct MemoryScanStore {
    states: Arc<DashMap<ItemId, ScanState>>,
}

impl MemoryScanStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

#[async_trait]
impl ScanStateStore for MemoryScanStore {
    async fn get(&self, id: &ItemId) -> Result<ScanState, StoreError> {
        Ok(self
            .states
            .get(id)
            .map(|state| state.value().clone())
            .unwrap_or_default())
    }

    async fn put(&self, id: &ItemId, state: &ScanState) -> Result<(), StoreError> {
        self.states.insert(id.clone(), state.clone());
        Ok(())
    }

    async fn clear(&self, id: &ItemId) -> Result<(), StoreError> {
        self.states.remove(id);
        Ok(())
    }
}
