//! Revision tags and the values they belong to.
//!
//! A fetched value never carries its entity tag inside itself, the client hands out [`Tagged`] wrappers instead
//! and reads the tag back when a [`Tagged`] is passed as the prior value of a later request.

use core::{
    fmt::{Display, Formatter},
    ops::Deref,
};

use http::{HeaderMap, HeaderValue, header::ETAG};

use crate::{
    errors::{Error, Result},
    resource::Resource,
};

/// Opaque entity tag, stored exactly as it goes on the wire (quotes included)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RevisionTag(String);

impl RevisionTag {
    /// Wraps an entity tag that is already in wire form, e.g. the value of an `ETag` header
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    /// Builds a strong entity tag from an opaque value by quoting it
    pub fn quoted(opaque: &str) -> Self {
        Self(format!("\"{opaque}\""))
    }

    /// Reads the `ETag` header of a response
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let value = headers.get(ETAG)?.to_str().ok()?;
        if value.is_empty() {
            return None;
        }
        Some(Self::new(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn to_header_value(&self) -> Result<HeaderValue> {
        HeaderValue::from_str(&self.0)
            .map_err(|_| Error::protocol(format!("revision tag {:?} is not a valid header value", self.0)))
    }
}

impl Display for RevisionTag {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        self.0.fmt(f)
    }
}

/// A value paired with the revision tag it was served under.
///
/// Only values with a tag can stand in as the prior value of a conditional request, see [`Tagged::require_revision`].
#[derive(Debug, Clone, PartialEq)]
pub struct Tagged<T> {
    value: T,
    revision: Option<RevisionTag>,
}

impl<T> Tagged<T> {
    pub fn new(value: T, revision: RevisionTag) -> Self {
        Self {
            value,
            revision: Some(revision),
        }
    }

    /// A value the server never gave a tag for. It can be read but not used as a prior value.
    pub fn untagged(value: T) -> Self {
        Self {
            value,
            revision: None,
        }
    }

    pub(crate) fn with_revision(value: T, revision: Option<RevisionTag>) -> Self {
        Self { value, revision }
    }

    /// Tags `value` with the `ETag` of the response it came from, if there was one
    pub fn from_response(value: T, headers: &HeaderMap) -> Self {
        Self::with_revision(value, RevisionTag::from_headers(headers))
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn into_inner(self) -> T {
        self.value
    }

    pub fn revision(&self) -> Option<&RevisionTag> {
        self.revision.as_ref()
    }

    /// The tag to send in a conditional header, failing with [`Error::MissingRevisionTag`] if there isn't one
    pub fn require_revision(&self) -> Result<&RevisionTag> {
        self.revision.as_ref().ok_or(Error::MissingRevisionTag)
    }
}

impl<T> Tagged<Resource<T>> {
    /// Tags a resource with its own `etag` field
    pub fn from_resource(resource: Resource<T>) -> Self {
        let revision = (!resource.etag().is_empty()).then(|| RevisionTag::quoted(resource.etag()));
        Self::with_revision(resource, revision)
    }

    /// Like [`Tagged::from_response`] but falls back to the resource's own `etag` when the response had no `ETag`
    pub fn from_resource_response(resource: Resource<T>, headers: &HeaderMap) -> Self {
        match RevisionTag::from_headers(headers) {
            Some(revision) => Self::new(resource, revision),
            None => Self::from_resource(resource),
        }
    }
}

impl<T> Deref for Tagged<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.value
    }
}

/// Header value for a conditional request against `prev`, [`None`] when there is no prior value
pub(crate) fn condition<T>(prev: Option<&Tagged<T>>) -> Result<Option<HeaderValue>> {
    prev.map(|prev| prev.require_revision()?.to_header_value())
        .transpose()
}
