//! Collection subscriptions whose mode the server picks

use core::{
    fmt::{Display, Formatter},
    str::FromStr,
};
use std::time::Instant;

use futures_core::Stream;
use futures_util::future::Either;
use http::HeaderMap;
use serde::de::DeserializeOwned;

use super::{AbortHandle, DiffListStream, FullListStream, Termination};
use crate::{
    constants::STREAM_FORMAT,
    errors::{Error, Result},
    resource::Resource,
    tagged::Tagged,
};

/// Value of the `Stream-Format` response header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamFormat {
    /// Every change resends the list
    Full,
    /// Changes arrive as positional diffs
    Diff,
}

impl StreamFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Diff => "diff",
        }
    }

    /// Reads the format a streaming response announced. Missing or unknown formats are protocol violations.
    pub fn from_headers(headers: &HeaderMap) -> Result<Self> {
        let value = headers
            .get(STREAM_FORMAT)
            .ok_or_else(|| Error::protocol("streaming list response without Stream-Format"))?;
        value
            .to_str()
            .map_err(|_| Error::protocol("Stream-Format is not text"))?
            .parse()
    }
}

impl FromStr for StreamFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "full" => Ok(Self::Full),
            "diff" => Ok(Self::Diff),
            other => Err(Error::protocol(format!("unknown Stream-Format {other:?}"))),
        }
    }
}

impl Display for StreamFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        self.as_str().fmt(f)
    }
}

/// A collection subscription in whichever mode the server chose. Both modes emit the whole list.
#[derive(Debug)]
pub enum ListStream<T = serde_json::Map<String, serde_json::Value>> {
    Full(FullListStream<T>),
    Diff(DiffListStream<T>),
}

impl<T> ListStream<T> {
    pub fn format(&self) -> StreamFormat {
        match self {
            Self::Full(_) => StreamFormat::Full,
            Self::Diff(_) => StreamFormat::Diff,
        }
    }

    pub fn abort(&self) {
        match self {
            Self::Full(stream) => stream.abort(),
            Self::Diff(stream) => stream.abort(),
        }
    }

    pub fn abort_handle(&self) -> AbortHandle {
        match self {
            Self::Full(stream) => stream.abort_handle(),
            Self::Diff(stream) => stream.abort_handle(),
        }
    }

    pub fn is_aborted(&self) -> bool {
        match self {
            Self::Full(stream) => stream.is_aborted(),
            Self::Diff(stream) => stream.is_aborted(),
        }
    }

    pub fn last_event_received(&self) -> Instant {
        match self {
            Self::Full(stream) => stream.last_event_received(),
            Self::Diff(stream) => stream.last_event_received(),
        }
    }

    pub fn termination(&self) -> Option<Termination> {
        match self {
            Self::Full(stream) => stream.termination(),
            Self::Diff(stream) => stream.termination(),
        }
    }

    pub async fn close(&mut self) {
        match self {
            Self::Full(stream) => stream.close().await,
            Self::Diff(stream) => stream.close().await,
        }
    }
}

impl<T: DeserializeOwned + Clone> ListStream<T> {
    pub async fn read(&mut self) -> Result<Option<Tagged<Vec<Resource<T>>>>> {
        match self {
            Self::Full(stream) => stream.read().await,
            Self::Diff(stream) => stream.read().await,
        }
    }

    pub fn into_stream(self) -> impl Stream<Item = Result<Tagged<Vec<Resource<T>>>>> {
        match self {
            Self::Full(stream) => Either::Left(stream.into_stream()),
            Self::Diff(stream) => Either::Right(stream.into_stream()),
        }
    }
}
