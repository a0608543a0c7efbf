//! Client configuration

use http::{HeaderMap, HeaderName, HeaderValue};

use crate::constants::{DEFAULT_EVENT_BUFFER, MAX_EVENT_BUFFER};

/// Settings shared by every request a [`Client`][crate::client::Client] makes
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// How many parsed events a subscription buffers ahead of its reader
    pub event_buffer: usize,
    /// Sent with every request, e.g. `Authorization`
    pub headers: HeaderMap,
}

impl ClientConfig {
    pub fn new() -> Self {
        Self {
            event_buffer: DEFAULT_EVENT_BUFFER,
            headers: HeaderMap::new(),
        }
    }

    /// Sets the subscription event buffer, clamped to `1..=65536`.
    pub fn with_event_buffer(mut self, event_buffer: usize) -> Self {
        self.event_buffer = event_buffer.clamp(1, MAX_EVENT_BUFFER);
        self
    }

    /// Adds a default header, replacing any earlier value for `name`.
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new()
    }
}
