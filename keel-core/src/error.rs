use crate::truncate_long;
use std::fmt::Display;

/// The property is neither a declared column, a relation, nor a value set on the entity.
///
/// Returned (wrapped in [`crate::Error`]) by reads and writes, use `downcast_ref::<NotFound>()`
/// to tell it apart from other failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("No such column or relation `{property}` in entity `{entity}`")]
pub struct NotFound {
    /// Entity type name.
    pub entity: String,
    /// The property (or path segment) that could not be resolved.
    pub property: String,
}

impl NotFound {
    pub fn new(entity: impl Into<String>, property: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            property: property.into(),
        }
    }
}

/// A statement was rejected by the database.
#[derive(Debug, thiserror::Error)]
#[error("Error while executing the query:\n{query}")]
pub struct ExecutionError {
    /// The statement text (possibly truncated).
    pub query: String,
    #[source]
    pub source: Box<dyn std::error::Error + Send + Sync + 'static>,
}

impl ExecutionError {
    pub fn new(
        query: impl Display,
        source: impl Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
    ) -> Self {
        let query = query.to_string();
        Self {
            query: truncate_long!(query).to_string(),
            source: source.into(),
        }
    }
}

/// The SQL writer cannot express the requested configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unsupported: {0}")]
pub struct Unsupported(pub String);
