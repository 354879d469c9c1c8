use axum::body::Body;
use hyper::{Request, Response};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use thiserror::Error;

/// Custom error type for HTTP client operations
#[derive(Error, Debug)]
#[non_exhaustive] // Signal that more variants may be added in the future
pub enum HttpClientError {
    /// Error when connection to backend fails or the exchange breaks off
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error when the backend does not answer within the deadline
    #[error("Timeout error after {}", humantime::format_duration(*.0))]
    TimeoutError(Duration),

    /// Error when request is invalid
    #[error("Invalid request: {0}")]
    InvalidRequestError(String),
}

impl HttpClientError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, HttpClientError::TimeoutError(_))
    }
}

/// Result type alias for HTTP client operations
pub type HttpClientResult<T> = Result<T, HttpClientError>;

/// Type alias for async HTTP request responses
pub type HttpResponseFuture<'a> =
    Pin<Box<dyn Future<Output = HttpClientResult<Response<Body>>> + Send + 'a>>;

/// HttpClient defines the port (interface) for making HTTP requests to backends
pub trait HttpClient: Send + Sync + 'static {
    /// Send an HTTP request to a backend server
    ///
    /// # Arguments
    /// * `req` - The HTTP request to send to the backend, with an absolute URI
    /// * `timeout` - Deadline for the whole exchange; once it elapses the call is
    ///   cancelled, including a response body still being streamed
    ///
    /// # Returns
    /// A future that resolves to the backend's response or an error
    fn send_request<'a>(&'a self, req: Request<Body>, timeout: Duration) -> HttpResponseFuture<'a>;
}
