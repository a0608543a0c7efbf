use futures_util::{StreamExt, TryStreamExt};
use http_body_util::BodyDataStream;
use reqwest::Body;

use crate::{
    errors::TransportError,
    transport::{Request, Response, StreamingResponse, Transport},
};

/// [`Transport`] backed by a [`reqwest::Client`]
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    base_url: String,
}

impl ReqwestTransport {
    /// Requests go to `base_url` joined with each request path, e.g. `https://example.com/api/`
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, request: &Request) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            request.path_and_query()
        )
    }

    async fn execute(&self, request: Request) -> Result<reqwest::Response, TransportError> {
        let url = self.url(&request);
        let mut builder = self
            .client
            .request(request.method, url)
            .headers(request.headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }
        builder.send().await.map_err(TransportError::new)
    }
}

impl Transport for ReqwestTransport {
    async fn send(&self, request: Request) -> Result<Response, TransportError> {
        let response = self.execute(request).await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(TransportError::new)?;
        Ok(Response {
            status,
            headers,
            body,
        })
    }

    async fn open(&self, request: Request) -> Result<StreamingResponse, TransportError> {
        let response = self.execute(request).await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = BodyDataStream::new(Body::from(response))
            .map_err(TransportError::new)
            .boxed();
        Ok(StreamingResponse {
            status,
            headers,
            body,
        })
    }
}
