//! The HTTP boundary the [`Client`][crate::client::Client] talks through.
//!
//! A [`Transport`] only moves bytes: conditional headers, status handling and decoding all happen in the client, so
//! an implementation is a thin adapter over whatever HTTP stack is at hand. The `reqwest` feature ships one.

use core::future::Future;

use bytes::Bytes;
use futures_util::stream::BoxStream;
use http::{HeaderMap, Method, StatusCode};

use crate::{errors::TransportError, query::encode_query};

/// A request relative to the transport's base URL
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    /// Already percent-encoded, without a leading `/`
    pub path: String,
    /// Unencoded query pairs, in order
    pub query: Vec<(String, String)>,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

impl Request {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    /// `path?query`, ready to be joined onto a base URL
    pub fn path_and_query(&self) -> String {
        if self.query.is_empty() {
            self.path.clone()
        } else {
            format!("{}?{}", self.path, encode_query(&self.query))
        }
    }
}

/// A fully read response
#[derive(Debug, Clone)]
pub struct Response {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// A response whose body is still arriving. Dropping `body` must close the connection.
pub struct StreamingResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: BoxStream<'static, Result<Bytes, TransportError>>,
}

impl core::fmt::Debug for StreamingResponse {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("StreamingResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

pub trait Transport: Send + Sync {
    /// Sends `request` and reads the whole response body
    fn send(&self, request: Request) -> impl Future<Output = Result<Response, TransportError>> + Send;

    /// Sends `request` and returns as soon as the response head arrives
    fn open(
        &self,
        request: Request,
    ) -> impl Future<Output = Result<StreamingResponse, TransportError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_and_query() {
        let mut request = Request::new(Method::GET, "notes");
        assert_eq!(request.path_and_query(), "notes");

        request.query.push(("_sort".into(), "-created at".into()));
        request.query.push(("_sort".into(), "name".into()));
        assert_eq!(
            request.path_and_query(),
            "notes?_sort=-created%20at&_sort=name"
        );
    }
}
