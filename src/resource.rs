//! The resource shape served by the API

use core::ops::{Deref, DerefMut};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Server maintained fields present on every resource
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Metadata {
    /// Stable identifier
    pub id: String,
    /// Changes whenever the content changes, served as the entity tag
    pub etag: String,
    /// Increases with every write
    pub generation: i64,
}

/// A resource: [`Metadata`] plus the application payload, flattened into one JSON object.
///
/// `T` defaults to a plain JSON object for callers without a typed schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource<T = Map<String, Value>> {
    #[serde(flatten)]
    pub metadata: Metadata,
    #[serde(flatten)]
    pub payload: T,
}

impl<T> Resource<T> {
    pub fn new(metadata: Metadata, payload: T) -> Self {
        Self { metadata, payload }
    }

    pub fn id(&self) -> &str {
        &self.metadata.id
    }

    pub fn etag(&self) -> &str {
        &self.metadata.etag
    }

    pub fn generation(&self) -> i64 {
        self.metadata.generation
    }

    pub fn into_payload(self) -> T {
        self.payload
    }
}

impl<T> Deref for Resource<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.payload
    }
}

impl<T> DerefMut for Resource<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.payload
    }
}
