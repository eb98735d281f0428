use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

use crate::config::SummarySettings;
use crate::entities::ContentType;
use crate::handlers::TypeHandler;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("content type {0} is already registered")]
    Duplicate(ContentType),

    #[error("content type {0} is enabled but has no registered handler")]
    MissingHandler(ContentType),
}

/// Collects handlers at startup. Registration order is render order.
#[derive(Default)]
pub struct RegistryBuilder {
    entries: Vec<(ContentType, Arc<dyn TypeHandler>)>,
    index: HashMap<ContentType, usize>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for a content type. Keys are case-insensitive.
    pub fn register(
        &mut self,
        content_type: &str,
        handler: Arc<dyn TypeHandler>,
    ) -> Result<&mut Self, RegistryError> {
        let key = content_type.trim().to_ascii_lowercase();
        if self.index.contains_key(&key) {
            return Err(RegistryError::Duplicate(key));
        }
        self.index.insert(key.clone(), self.entries.len());
        self.entries.push((key, handler));
        Ok(self)
    }

    pub fn build(self) -> Registry {
        Registry {
            entries: self.entries,
            index: self.index,
        }
    }
}

/// Immutable content-type -> handler map with stable iteration order.
pub struct Registry {
    entries: Vec<(ContentType, Arc<dyn TypeHandler>)>,
    index: HashMap<ContentType, usize>,
}

impl Registry {
    pub fn get(&self, content_type: &str) -> Option<&Arc<dyn TypeHandler>> {
        self.index
            .get(content_type)
            .map(|&position| &self.entries[position].1)
    }

    /// Handlers in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<dyn TypeHandler>)> {
        self.entries
            .iter()
            .map(|(content_type, handler)| (content_type.as_str(), handler))
    }

    pub fn content_types(&self) -> Vec<&str> {
        self.entries.iter().map(|(key, _)| key.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Every enabled content type must have a handler.
    pub fn validate(&self, settings: &SummarySettings) -> Result<(), RegistryError> {
        match settings
            .mime_types
            .iter()
            .find(|content_type| !self.index.contains_key(content_type.as_str()))
        {
            Some(missing) => Err(RegistryError::MissingHandler(missing.clone())),
            None => Ok(()),
        }
    }
}
