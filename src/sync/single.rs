//! Subscription to one resource

use core::marker::PhantomData;

use serde::de::DeserializeOwned;

use super::{Materializer, SyncStream};
use crate::{
    errors::{Error, Result},
    event::{Event, EventKind},
    resource::Resource,
    tagged::Tagged,
};

/// A live view of one resource
pub type ResourceStream<T = serde_json::Map<String, serde_json::Value>> = SyncStream<SingleResource<T>>;

/// Emits the resource on every `initial` and `update`, or the prior value on `notModified`
#[derive(Debug)]
pub struct SingleResource<T> {
    prev: Option<Tagged<Resource<T>>>,
    _payload: PhantomData<fn() -> T>,
}

impl<T> SingleResource<T> {
    /// `prev` is what `notModified` resolves to, at most once
    pub fn new(prev: Option<Tagged<Resource<T>>>) -> Self {
        Self {
            prev,
            _payload: PhantomData,
        }
    }

    /// Whether a prior value is still waiting to be consumed by `notModified`
    pub fn holds_prior(&self) -> bool {
        self.prev.is_some()
    }
}

impl<T: DeserializeOwned> Materializer for SingleResource<T> {
    type Output = Tagged<Resource<T>>;

    fn apply(&mut self, event: Event) -> Result<Option<Self::Output>> {
        match event.kind {
            EventKind::Initial | EventKind::Update => {
                let resource: Resource<T> = event.decode()?;
                Ok(Some(Tagged::from_resource(resource)))
            }
            EventKind::NotModified => self
                .prev
                .take()
                .map(Some)
                .ok_or_else(|| Error::protocol("notModified without a prior value")),
            EventKind::Heartbeat => Ok(None),
            kind => Err(Error::protocol(format!(
                "unexpected {kind} event on a resource subscription"
            ))),
        }
    }
}
