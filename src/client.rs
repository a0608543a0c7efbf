//! Resource operations and subscriptions over a [`Transport`]
//!
//! Every fetch that yields a value returns it [`Tagged`] with the revision the server served it under. Passing that
//! value back as `prev` turns the next request conditional: `If-None-Match` for reads, where a `304` hands `prev`
//! straight back, and `If-Match` for writes, where a mismatch surfaces as an [`Error::Remote`] with status `412`.

use bytes::{Bytes, BytesMut};
use futures_util::StreamExt;
use http::{
    HeaderMap, HeaderName, HeaderValue, Method, StatusCode,
    header::{ACCEPT, CONTENT_TYPE, IF_MATCH, IF_NONE_MATCH},
};
use serde::{Serialize, de::DeserializeOwned};

use crate::{
    config::ClientConfig,
    constants::{EVENT_STREAM_MIME, JSON_MIME},
    errors::{Error, RemoteError, Result},
    query::{Filter, ListOptions, encode_component},
    resource::Resource,
    sync::{DiffList, FullList, ListStream, ResourceStream, SingleResource, StreamFormat, SyncStream},
    tagged::{Tagged, condition},
    transport::{Request, Response, StreamingResponse, Transport},
};

/// Options for reading or subscribing to one resource
#[derive(Debug, Clone)]
pub struct GetOptions<T = serde_json::Map<String, serde_json::Value>> {
    /// The resource as fetched earlier, sent as `If-None-Match`
    pub prev: Option<Tagged<Resource<T>>>,
}

impl<T> GetOptions<T> {
    pub fn new() -> Self {
        Self { prev: None }
    }

    pub fn prev(mut self, prev: Tagged<Resource<T>>) -> Self {
        self.prev = Some(prev);
        self
    }
}

impl<T> Default for GetOptions<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Options for writes
#[derive(Debug, Clone)]
pub struct UpdateOptions<T = serde_json::Map<String, serde_json::Value>> {
    /// The revision the write is based on, sent as `If-Match`
    pub prev: Option<Tagged<Resource<T>>>,
}

impl<T> UpdateOptions<T> {
    pub fn new() -> Self {
        Self { prev: None }
    }

    pub fn prev(mut self, prev: Tagged<Resource<T>>) -> Self {
        self.prev = Some(prev);
        self
    }
}

impl<T> Default for UpdateOptions<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
pub struct Client<X> {
    transport: X,
    config: ClientConfig,
}

impl<X> Client<X> {
    pub fn new(transport: X) -> Self {
        Self::with_config(transport, ClientConfig::default())
    }

    pub fn with_config(transport: X, config: ClientConfig) -> Self {
        Self { transport, config }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn transport(&self) -> &X {
        &self.transport
    }

    /// Sets a header sent with every later request, e.g. `Authorization`
    pub fn set_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.config.headers.insert(name, value);
    }

    pub fn remove_header(&mut self, name: &HeaderName) {
        self.config.headers.remove(name);
    }

    fn request(&self, method: Method, path: String, accept: &'static str) -> Request {
        let mut request = Request::new(method, path);
        request.headers = self.config.headers.clone();
        request
            .headers
            .insert(ACCEPT, HeaderValue::from_static(accept));
        request
    }
}

impl<X: Transport> Client<X> {
    pub async fn create<T>(&self, name: &str, obj: &T) -> Result<Tagged<Resource<T>>>
    where
        T: Serialize + DeserializeOwned,
    {
        let mut request = self.request(Method::POST, collection_path(name), JSON_MIME);
        set_json_body(&mut request, obj)?;

        let response = self.execute(request).await?;
        let resource = decode_body(&response.body)?;
        Ok(Tagged::from_resource_response(resource, &response.headers))
    }

    /// Fetches one resource. With `prev` set, a `304` returns `prev` without reading a body.
    pub async fn get<T>(&self, name: &str, id: &str, opts: GetOptions<T>) -> Result<Tagged<Resource<T>>>
    where
        T: DeserializeOwned,
    {
        let mut request = self.request(Method::GET, resource_path(name, id), JSON_MIME);
        set_condition(&mut request.headers, IF_NONE_MATCH, condition(opts.prev.as_ref())?);

        let response = self.transport.send(request).await?;
        if let Some(prev) = not_modified(&response, opts.prev) {
            return Ok(prev);
        }
        let response = check_status(response)?;

        let resource = decode_body(&response.body)?;
        Ok(Tagged::from_resource_response(resource, &response.headers))
    }

    /// Fetches a collection. With `opts.prev` set, a `304` returns it without reading a body.
    pub async fn list<T>(&self, name: &str, opts: ListOptions<T>) -> Result<Tagged<Vec<Resource<T>>>>
    where
        T: DeserializeOwned,
    {
        let mut request = self.request(Method::GET, collection_path(name), JSON_MIME);
        set_condition(&mut request.headers, IF_NONE_MATCH, condition(opts.prev.as_ref())?);
        request.query = opts.query_pairs();

        let response = self.transport.send(request).await?;
        if let Some(prev) = not_modified(&response, opts.prev) {
            return Ok(prev);
        }
        let response = check_status(response)?;

        let list = decode_body(&response.body)?;
        Ok(Tagged::from_response(list, &response.headers))
    }

    /// Looks a resource up by a prefix of its id. Exactly one resource must match.
    pub async fn find<T>(&self, name: &str, short_id: &str) -> Result<Tagged<Resource<T>>>
    where
        T: DeserializeOwned,
    {
        let opts = ListOptions::new().filter(Filter::id_prefix(short_id));
        let mut list = self.list::<T>(name, opts).await?.into_inner();

        match list.len() {
            0 => Err(Error::NotFound(short_id.to_owned())),
            1 => Ok(Tagged::from_resource(list.remove(0))),
            _ => Err(Error::MultipleFound(short_id.to_owned())),
        }
    }

    /// Replaces the whole resource (`PUT`)
    pub async fn replace<T>(
        &self,
        name: &str,
        id: &str,
        obj: &T,
        opts: UpdateOptions<T>,
    ) -> Result<Tagged<Resource<T>>>
    where
        T: Serialize + DeserializeOwned,
    {
        self.write(Method::PUT, name, id, obj, opts).await
    }

    /// Merges `patch` into the resource (`PATCH`). The patch may be any partial shape of `T`.
    pub async fn update<T, P>(
        &self,
        name: &str,
        id: &str,
        patch: &P,
        opts: UpdateOptions<T>,
    ) -> Result<Tagged<Resource<T>>>
    where
        T: DeserializeOwned,
        P: Serialize + ?Sized,
    {
        self.write(Method::PATCH, name, id, patch, opts).await
    }

    pub async fn delete<T>(&self, name: &str, id: &str, opts: UpdateOptions<T>) -> Result<()> {
        let mut request = self.request(Method::DELETE, resource_path(name, id), JSON_MIME);
        set_condition(&mut request.headers, IF_MATCH, condition(opts.prev.as_ref())?);

        self.execute(request).await?;
        Ok(())
    }

    /// Subscribes to one resource. `opts.prev` is what a `notModified` event resolves to.
    pub async fn stream_get<T>(&self, name: &str, id: &str, opts: GetOptions<T>) -> Result<ResourceStream<T>>
    where
        T: DeserializeOwned,
    {
        let mut request = self.request(Method::GET, resource_path(name, id), EVENT_STREAM_MIME);
        set_condition(&mut request.headers, IF_NONE_MATCH, condition(opts.prev.as_ref())?);

        let response = self.open(request).await?;
        tracing::debug!(collection = name, id, "resource subscription open");
        Ok(SyncStream::spawn(
            response.body,
            SingleResource::new(opts.prev),
            self.config.event_buffer,
        ))
    }

    /// Subscribes to a collection in whichever mode the server announces in `Stream-Format`.
    ///
    /// Any other format aborts the connection and fails with [`Error::ProtocolViolation`].
    pub async fn stream_list<T>(&self, name: &str, opts: ListOptions<T>) -> Result<ListStream<T>>
    where
        T: DeserializeOwned + Clone,
    {
        let mut request = self.request(Method::GET, collection_path(name), EVENT_STREAM_MIME);
        set_condition(&mut request.headers, IF_NONE_MATCH, condition(opts.prev.as_ref())?);
        request.query = opts.query_pairs();

        let response = self.open(request).await?;
        let format = match StreamFormat::from_headers(&response.headers) {
            Ok(format) => format,
            Err(e) => {
                tracing::debug!(collection = name, error = %e, "aborting list subscription");
                drop(response);
                return Err(e);
            }
        };
        tracing::debug!(collection = name, %format, "list subscription open");

        let buffer = self.config.event_buffer;
        Ok(match format {
            StreamFormat::Full => {
                ListStream::Full(SyncStream::spawn(response.body, FullList::new(opts.prev), buffer))
            }
            StreamFormat::Diff => {
                ListStream::Diff(SyncStream::spawn(response.body, DiffList::new(opts.prev), buffer))
            }
        })
    }

    async fn write<T, B>(
        &self,
        method: Method,
        name: &str,
        id: &str,
        body: &B,
        opts: UpdateOptions<T>,
    ) -> Result<Tagged<Resource<T>>>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let mut request = self.request(method, resource_path(name, id), JSON_MIME);
        set_condition(&mut request.headers, IF_MATCH, condition(opts.prev.as_ref())?);
        set_json_body(&mut request, body)?;

        let response = self.execute(request).await?;
        let resource = decode_body(&response.body)?;
        Ok(Tagged::from_resource_response(resource, &response.headers))
    }

    async fn execute(&self, request: Request) -> Result<Response> {
        let response = self.transport.send(request).await?;
        check_status(response)
    }

    async fn open(&self, request: Request) -> Result<StreamingResponse> {
        let response = self.transport.open(request).await?;
        if response.status.is_success() {
            return Ok(response);
        }

        // error bodies are small, read it for the messages
        let mut body = BytesMut::new();
        let mut chunks = response.body;
        while let Some(Ok(chunk)) = chunks.next().await {
            body.extend_from_slice(&chunk);
        }
        Err(RemoteError::from_body(response.status, &body).into())
    }
}

fn collection_path(name: &str) -> String {
    encode_component(name)
}

fn resource_path(name: &str, id: &str) -> String {
    format!("{}/{}", encode_component(name), encode_component(id))
}

fn set_condition(headers: &mut HeaderMap, name: HeaderName, value: Option<HeaderValue>) {
    if let Some(value) = value {
        headers.insert(name, value);
    }
}

fn set_json_body<B: Serialize + ?Sized>(request: &mut Request, body: &B) -> Result<()> {
    let body = serde_json::to_vec(body).map_err(Error::Encode)?;
    request.body = Some(Bytes::from(body));
    request
        .headers
        .insert(CONTENT_TYPE, HeaderValue::from_static(JSON_MIME));
    Ok(())
}

/// `prev` if the server answered `304` to a conditional request
fn not_modified<T>(response: &Response, prev: Option<T>) -> Option<T> {
    (response.status == StatusCode::NOT_MODIFIED)
        .then_some(prev)
        .flatten()
}

fn check_status(response: Response) -> Result<Response> {
    if response.status.is_success() {
        Ok(response)
    } else {
        Err(RemoteError::from_body(response.status, &response.body).into())
    }
}

fn decode_body<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
    let mut deserializer = serde_json::Deserializer::from_slice(body);
    Ok(serde_path_to_error::deserialize(&mut deserializer)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: StatusCode) -> Response {
        Response {
            status,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    #[test]
    fn paths_are_escaped() {
        assert_eq!(collection_path("notes"), "notes");
        assert_eq!(resource_path("my notes", "a/b"), "my%20notes/a%2Fb");
    }

    #[test]
    fn not_modified_needs_prev_and_304() {
        assert_eq!(not_modified(&response(StatusCode::NOT_MODIFIED), Some(1)), Some(1));
        assert_eq!(not_modified(&response(StatusCode::NOT_MODIFIED), None::<i32>), None);
        assert_eq!(not_modified(&response(StatusCode::OK), Some(1)), None);
    }

    #[test]
    fn errors_decode_message_list() {
        let mut res = response(StatusCode::CONFLICT);
        res.body = Bytes::from_static(br#"{"messages":["already exists"]}"#);
        match check_status(res) {
            Err(Error::Remote(e)) => assert_eq!(e.messages, vec!["already exists"]),
            other => panic!("expected remote error, got {other:?}"),
        }
        assert!(check_status(response(StatusCode::NO_CONTENT)).is_ok());
    }

    #[test]
    fn decode_errors_carry_path() {
        #[derive(Debug, serde::Deserialize)]
        #[allow(dead_code)]
        struct Page {
            items: Vec<u32>,
        }

        let err = decode_body::<Page>(br#"{"items": [1, "two"]}"#).unwrap_err();
        match err {
            Error::Decode(e) => assert_eq!(e.path().to_string(), "items[1]"),
            other => panic!("expected decode error, got {other:?}"),
        }
    }
}
