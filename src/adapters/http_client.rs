use std::error::Error as StdError;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::body::Body as AxumBody;
use bytes::Bytes;
use futures_util::StreamExt;
use futures_util::stream::{self, Stream};
use http_body_util::BodyExt;
use hyper::body::Incoming;
use hyper::{Request, Response};
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::{Client, connect::HttpConnector};
use hyper_util::rt::TokioExecutor;
use rustls::RootCertStore;
use tokio::time::{Instant, timeout_at};

use crate::ports::http_client::{HttpClient, HttpClientError, HttpResponseFuture};

type HttpsClient = Client<HttpsConnector<HttpConnector>, AxumBody>;

/// Outbound client used to relay API requests to their backends.
pub struct HyperHttpClient {
    client: HttpsClient,
}

impl HyperHttpClient {
    pub fn new() -> Result<Self> {
        let tls = rustls::ClientConfig::builder_with_provider(Arc::new(
            rustls::crypto::aws_lc_rs::default_provider(),
        ))
        .with_safe_default_protocol_versions()
        .context("Failed to select TLS protocol versions")?
        .with_root_certificates(native_roots())
        .with_no_client_auth();

        let https = hyper_rustls::HttpsConnectorBuilder::new()
            .with_tls_config(tls)
            .https_or_http()
            .enable_http1()
            .build();
        let client = Client::builder(TokioExecutor::new()).build(https);

        tracing::info!("Created new HTTPS-capable HTTP client");
        Ok(Self { client })
    }
}

fn native_roots() -> RootCertStore {
    let mut roots = RootCertStore::empty();
    match rustls_native_certs::load_native_certs() {
        Ok(certs) => {
            let (added, ignored) = roots.add_parsable_certificates(certs);
            tracing::debug!(added, ignored, "Loaded native root certificates");
        }
        Err(err) => {
            tracing::error!("Could not load native root certificates: {}", err);
        }
    }
    roots
}

/// Flattens an error and its sources into one line.
fn describe(err: &(dyn StdError + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// Re-streams the backend body, failing the stream once `deadline` has passed.
fn bounded_body(
    body: Incoming,
    deadline: Instant,
    limit: Duration,
) -> impl Stream<Item = Result<Bytes, HttpClientError>> + Send + 'static {
    stream::unfold(Some(Box::pin(body.into_data_stream())), move |state| async move {
        let mut chunks = state?;
        match timeout_at(deadline, chunks.next()).await {
            Ok(Some(Ok(chunk))) => Some((Ok(chunk), Some(chunks))),
            Ok(Some(Err(err))) => Some((
                Err(HttpClientError::ConnectionError(describe(&err))),
                None,
            )),
            Ok(None) => None,
            Err(_) => {
                tracing::error!("Backend response body exceeded {}", humantime::format_duration(limit));
                Some((Err(HttpClientError::TimeoutError(limit)), None))
            }
        }
    })
}

impl HttpClient for HyperHttpClient {
    fn send_request<'a>(&'a self, req: Request<AxumBody>, timeout: Duration) -> HttpResponseFuture<'a> {
        let client = self.client.clone();
        let method = req.method().clone();
        let uri = req.uri().clone();

        Box::pin(async move {
            if uri.scheme().is_none() || uri.authority().is_none() {
                return Err(HttpClientError::InvalidRequestError(format!(
                    "target {uri} is not an absolute URL"
                )));
            }

            tracing::debug!("Sending request: {} {}", method, uri);
            let deadline = Instant::now() + timeout;

            match timeout_at(deadline, client.request(req)).await {
                Ok(Ok(response)) => {
                    tracing::debug!(
                        "Received response from {} {}: status={}",
                        method,
                        uri,
                        response.status()
                    );
                    let (parts, body) = response.into_parts();
                    let body = AxumBody::from_stream(bounded_body(body, deadline, timeout));
                    Ok(Response::from_parts(parts, body))
                }
                Ok(Err(err)) => {
                    let message = describe(&err);
                    tracing::debug!("Error making request to {} {}: {}", method, uri, message);
                    Err(HttpClientError::ConnectionError(message))
                }
                Err(_) => Err(HttpClientError::TimeoutError(timeout)),
            }
        })
    }
}
