//! Events read from a subscription stream

use core::fmt::{Display, Formatter};
use std::collections::HashMap;

use bytes_utils::Str;
use serde::de::DeserializeOwned;

use crate::{
    constants::{EMPTY_STR, SNAPSHOT_ID},
    errors::{Error, Result},
    tagged::RevisionTag,
};

/// The closed set of event types a subscription can carry.
///
/// `update` is shared by single resource and diff subscriptions, diff updates carry position params on top.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// First value of a single resource subscription
    Initial,
    /// A resource changed, in diff mode it may also have moved
    Update,
    /// The server won't resend what the caller already holds
    NotModified,
    /// Keep-alive
    Heartbeat,
    /// Full snapshot of a collection
    List,
    /// A resource entered the collection
    Add,
    /// A resource left the collection
    Remove,
    /// End of a batch of diff events
    Sync,
}

impl EventKind {
    /// Translates a wire event type. This is the only place event type strings are interpreted.
    pub fn from_wire(event_type: &str) -> Option<Self> {
        Some(match event_type {
            "initial" => Self::Initial,
            "update" => Self::Update,
            "notModified" => Self::NotModified,
            "heartbeat" => Self::Heartbeat,
            "list" => Self::List,
            "add" => Self::Add,
            "remove" => Self::Remove,
            "sync" => Self::Sync,
            _ => return None,
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initial => "initial",
            Self::Update => "update",
            Self::NotModified => "notModified",
            Self::Heartbeat => "heartbeat",
            Self::List => "list",
            Self::Add => "add",
            Self::Remove => "remove",
            Self::Sync => "sync",
        }
    }
}

impl Display for EventKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        self.as_str().fmt(f)
    }
}

/// One parsed event: its type, named params and the raw `data` payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub kind: EventKind,
    pub params: HashMap<String, String>,
    pub data: Str,
}

impl Event {
    pub fn new(kind: EventKind) -> Self {
        Self {
            kind,
            params: HashMap::new(),
            data: EMPTY_STR,
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn with_data(mut self, data: impl Into<Str>) -> Self {
        self.data = data.into();
        self
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Reads a position param as a collection index
    pub fn position(&self, key: &str) -> Result<usize> {
        let raw = self
            .param(key)
            .ok_or_else(|| Error::protocol(format!("{} event without {key}", self.kind)))?;
        raw.parse()
            .map_err(|_| Error::protocol(format!("{} event has invalid {key}: {raw:?}", self.kind)))
    }

    /// Decodes the payload as JSON, errors carry the path to the field that failed
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        let mut deserializer = serde_json::Deserializer::from_str(&self.data);
        Ok(serde_path_to_error::deserialize(&mut deserializer)?)
    }

    /// Revision tag of the collection snapshot this event completes, from its `id` param
    pub fn snapshot_tag(&self) -> Option<RevisionTag> {
        self.param(SNAPSHOT_ID).map(RevisionTag::quoted)
    }
}
