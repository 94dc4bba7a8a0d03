//! Wire-level request/response types and the pluggable HTTP transport.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use reqwest::Method;
use serde_json::Value;
use thiserror::Error;

use crate::models::HttpMethod;

pub const STATUS_UNAUTHORIZED: u16 = 401;

/// A file attached to a multipart upload.
#[derive(Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: None,
            bytes,
        }
    }

    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

impl fmt::Debug for UploadFile {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("UploadFile")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    Json(Value),
    /// `file` part plus plain text fields
    Multipart {
        file: UploadFile,
        fields: Vec<(String, String)>,
    },
}

#[derive(Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub bearer_token: Option<String>,
    pub body: RequestBody,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            bearer_token: None,
            body: RequestBody::Empty,
        }
    }

    #[must_use]
    pub fn with_bearer_token(mut self, token: Option<String>) -> Self {
        self.bearer_token = token;
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: RequestBody) -> Self {
        self.body = body;
        self
    }

    /// JSON body, if any
    pub const fn json(&self) -> Option<&Value> {
        match &self.body {
            RequestBody::Json(value) => Some(value),
            _ => None,
        }
    }
}

impl fmt::Debug for HttpRequest {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("HttpRequest")
            .field("method", &self.method)
            .field("url", &self.url)
            .field(
                "bearer_token",
                &self.bearer_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("body", &self.body)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn json(status: u16, value: &Value) -> Self {
        Self::new(status, value.to_string())
    }

    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// No response was obtained (DNS, refused connection, timeout, dropped socket)
    #[error("Server unreachable: {0}")]
    Unreachable(String),
    /// The request could not be built or sent as described
    #[error("Invalid request: {0}")]
    Request(String),
}

/// Sends one HTTP exchange. Implementations must not retry.
pub trait Transport: Send + Sync + 'static {
    fn send(
        &self,
        request: HttpRequest,
    ) -> impl Future<Output = Result<HttpResponse, TransportError>> + Send;
}

/// `reqwest`-backed transport used outside of tests.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Option<Duration>) -> Result<Self, String> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|error| format!("Failed to construct HTTP client: {error}"))?;
        Ok(Self { client })
    }

    fn build(&self, request: HttpRequest) -> Result<reqwest::RequestBuilder, TransportError> {
        let mut builder = self
            .client
            .request(to_reqwest_method(request.method), &request.url);
        if let Some(token) = request.bearer_token {
            builder = builder.bearer_auth(token);
        }

        match request.body {
            RequestBody::Empty => Ok(builder),
            RequestBody::Json(value) => Ok(builder.json(&value)),
            RequestBody::Multipart { file, fields } => {
                let mut part =
                    reqwest::multipart::Part::bytes(file.bytes).file_name(file.file_name);
                if let Some(content_type) = file.content_type {
                    part = part
                        .mime_str(&content_type)
                        .map_err(|error| TransportError::Request(error.to_string()))?;
                }
                let form = fields
                    .into_iter()
                    .fold(reqwest::multipart::Form::new(), |form, (name, value)| {
                        form.text(name, value)
                    })
                    .part("file", part);
                Ok(builder.multipart(form))
            }
        }
    }
}

impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let response = self.build(request)?.send().await.map_err(classify)?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(classify)?;
        Ok(HttpResponse::new(status, body.to_vec()))
    }
}

fn classify(error: reqwest::Error) -> TransportError {
    if error.is_builder() {
        TransportError::Request(error.to_string())
    } else {
        TransportError::Unreachable(error.to_string())
    }
}

const fn to_reqwest_method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Patch => Method::PATCH,
        HttpMethod::Delete => Method::DELETE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn transport() -> ReqwestTransport {
        ReqwestTransport::new(Some(Duration::from_secs(5))).unwrap()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn sends_bearer_token_and_json_body() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/incidents")
                    .header("authorization", "Bearer access-1")
                    .json_body(json!({"title": "Fall"}));
                then.status(201).json_body(json!({"id": "inc-1", "title": "Fall"}));
            })
            .await;

        let request = HttpRequest::new(HttpMethod::Post, server.url("/api/incidents"))
            .with_bearer_token(Some("access-1".to_string()))
            .with_body(RequestBody::Json(json!({"title": "Fall"})));
        let response = transport().send(request).await.unwrap();

        mock.assert_async().await;
        assert_eq!(response.status, 201);
        assert_eq!(
            serde_json::from_slice::<Value>(&response.body).unwrap(),
            json!({"id": "inc-1", "title": "Fall"})
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn non_success_status_is_a_response_not_an_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/inspections");
                then.status(401).body("expired");
            })
            .await;

        let response = transport()
            .send(HttpRequest::new(HttpMethod::Get, server.url("/api/inspections")))
            .await
            .unwrap();

        assert_eq!(response.status, STATUS_UNAUTHORIZED);
        assert_eq!(response.text(), "expired");
        assert!(!response.is_success());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn multipart_upload_carries_file_and_fields() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/documents/upload")
                    .body_contains("filename=\"report.txt\"")
                    .body_contains("quarterly audit")
                    .body_contains("name=\"category\"");
                then.status(200).json_body(json!({"id": "doc-1"}));
            })
            .await;

        let file = UploadFile::new("report.txt", b"quarterly audit".to_vec())
            .with_content_type("text/plain");
        let request = HttpRequest::new(HttpMethod::Post, server.url("/api/documents/upload"))
            .with_body(RequestBody::Multipart {
                file,
                fields: vec![("category".to_string(), "audit".to_string())],
            });
        let response = transport().send(request).await.unwrap();

        mock.assert_async().await;
        assert!(response.is_success());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn refused_connection_is_unreachable() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let result = transport()
            .send(HttpRequest::new(
                HttpMethod::Get,
                format!("http://127.0.0.1:{port}/api/health"),
            ))
            .await;

        assert!(matches!(result, Err(TransportError::Unreachable(_))));
    }

    #[test]
    fn request_debug_redacts_bearer_token() {
        let request = HttpRequest::new(HttpMethod::Get, "http://x/api")
            .with_bearer_token(Some("super-secret".to_string()));
        let rendered = format!("{request:?}");
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("[REDACTED]"));
    }
}
