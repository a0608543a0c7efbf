//! Collection subscription where every change resends the whole list

use core::marker::PhantomData;

use serde::de::DeserializeOwned;

use super::{Materializer, SyncStream};
use crate::{
    errors::{Error, Result},
    event::{Event, EventKind},
    resource::Resource,
    tagged::Tagged,
};

pub type FullListStream<T = serde_json::Map<String, serde_json::Value>> = SyncStream<FullList<T>>;

/// Emits each `list` snapshot as is
#[derive(Debug)]
pub struct FullList<T> {
    prev: Option<Tagged<Vec<Resource<T>>>>,
    _payload: PhantomData<fn() -> T>,
}

impl<T> FullList<T> {
    pub fn new(prev: Option<Tagged<Vec<Resource<T>>>>) -> Self {
        Self {
            prev,
            _payload: PhantomData,
        }
    }
}

impl<T: DeserializeOwned> Materializer for FullList<T> {
    type Output = Tagged<Vec<Resource<T>>>;

    fn apply(&mut self, event: Event) -> Result<Option<Self::Output>> {
        match event.kind {
            EventKind::List => {
                let items: Vec<Resource<T>> = event.decode()?;
                Ok(Some(Tagged::with_revision(items, event.snapshot_tag())))
            }
            EventKind::NotModified => self
                .prev
                .take()
                .map(Some)
                .ok_or_else(|| Error::protocol("notModified without a prior list")),
            EventKind::Heartbeat => Ok(None),
            kind => Err(Error::protocol(format!(
                "unexpected {kind} event on a full list subscription"
            ))),
        }
    }
}
