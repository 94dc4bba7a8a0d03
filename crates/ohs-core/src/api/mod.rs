//! HTTP client wrapper for the remote OHS API.

mod client;
mod error;
mod response;
mod transport;

pub use client::{ApiClient, HEALTH_ENDPOINT};
pub use error::ApiError;
pub use response::{ApiResponse, RequestOptions};
pub use transport::{
    HttpRequest, HttpResponse, RequestBody, ReqwestTransport, Transport, TransportError,
    UploadFile, STATUS_UNAUTHORIZED,
};
