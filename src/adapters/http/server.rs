use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::body::{Body as AxumBody, HttpBody};
use axum::{
    BoxError, Router,
    http::Request,
    response::{IntoResponse, Response as AxumResponse},
};
use futures_util::{StreamExt, stream};
use hyper::StatusCode;
use hyper::server::conn::http1;
use hyper_util::rt::{TokioIo, TokioTimer};
use hyper_util::server::graceful::GracefulShutdown as ConnectionDrain;
use hyper_util::service::TowerToHyperService;
use tokio::net::TcpListener;
use tokio::time::Instant;
use tower_http::timeout::RequestBodyTimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::adapters::http_handler::HyperHandler;
use crate::ports::http_server::{HandlerError, HttpHandler, HttpServer, ServerRunFuture};
use crate::utils::graceful_shutdown::GracefulShutdown;

/// Per-connection deadlines applied by the front door.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerTimeouts {
    /// Reading the request body.
    pub read: Duration,
    /// Streaming the response body once its head is ready.
    pub write: Duration,
    /// Waiting for the next request head on a kept-alive connection.
    pub idle: Duration,
}

impl Default for ServerTimeouts {
    fn default() -> Self {
        Self {
            read: Duration::from_secs(15),
            write: Duration::from_secs(10),
            idle: Duration::from_secs(60),
        }
    }
}

/// Build the axum application: every request goes to `handler`.
pub fn router(handler: HyperHandler, timeouts: ServerTimeouts) -> Router {
    let write_timeout = timeouts.write;
    Router::new()
        .fallback(move |req: Request<AxumBody>| {
            handle_request(handler.clone(), req, write_timeout)
        })
        .layer(RequestBodyTimeoutLayer::new(timeouts.read))
        .layer(TraceLayer::new_for_http())
}

pub struct HyperServer {
    listen_addr: SocketAddr,
    timeouts: ServerTimeouts,
    handler: HyperHandler,
    shutdown: Arc<GracefulShutdown>,
}

impl HyperServer {
    pub fn with_dependencies(
        listen_addr: SocketAddr,
        timeouts: ServerTimeouts,
        handler: HyperHandler,
        shutdown: Arc<GracefulShutdown>,
    ) -> Self {
        Self {
            listen_addr,
            timeouts,
            handler,
            shutdown,
        }
    }

    /// Serve on an already bound listener until shutdown is signalled and drained.
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        let app = router(self.handler.clone(), self.timeouts);
        let grace_period = self.shutdown.grace_period();
        let mut stop_accepting = self.shutdown.shutdown_token();
        let drain = ConnectionDrain::new();

        let mut builder = http1::Builder::new();
        builder
            .timer(TokioTimer::new())
            .keep_alive(true)
            .header_read_timeout(self.timeouts.idle);

        loop {
            let (stream, peer) = tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok(conn) => conn,
                    Err(e) => {
                        tracing::warn!("Failed to accept connection: {}", e);
                        continue;
                    }
                },
                reason = stop_accepting.cancelled() => {
                    tracing::info!("Stopping new connections ({:?})", reason);
                    break;
                }
            };

            let service = TowerToHyperService::new(app.clone());
            let conn = drain.watch(builder.serve_connection(TokioIo::new(stream), service));
            tokio::spawn(async move {
                if let Err(e) = conn.await {
                    tracing::debug!(%peer, "Connection closed: {}", e);
                }
            });
        }

        tokio::select! {
            _ = drain.shutdown() => {
                tracing::info!("All connections drained");
            }
            _ = tokio::time::sleep(grace_period) => {
                tracing::warn!(
                    "Grace period of {} elapsed with requests still in flight, forcing shutdown",
                    humantime::format_duration(grace_period)
                );
            }
        }

        Ok(())
    }
}

impl HttpServer for HyperServer {
    fn run(&self) -> ServerRunFuture<'_> {
        Box::pin(async move {
            let listener = TcpListener::bind(self.listen_addr)
                .await
                .with_context(|| format!("Failed to bind to address: {}", self.listen_addr))?;
            tracing::info!("Server binding to {}", self.listen_addr);
            self.serve(listener).await
        })
    }
}

/// Cut off a streamed response body that is not finished within `limit`.
/// Bodies whose length is already known are passed through untouched.
fn bound_write(response: AxumResponse, limit: Duration) -> AxumResponse {
    if response.body().size_hint().exact().is_some() {
        return response;
    }
    let deadline = Instant::now() + limit;
    response.map(|body| {
        let frames = stream::unfold(Some(body.into_data_stream()), move |state| async move {
            let mut data = state?;
            match tokio::time::timeout_at(deadline, data.next()).await {
                Ok(Some(chunk)) => Some((chunk.map_err(BoxError::from), Some(data))),
                Ok(None) => None,
                Err(_) => {
                    tracing::error!(
                        "Response not written within {}",
                        humantime::format_duration(limit)
                    );
                    Some((Err(BoxError::from("write deadline exceeded")), None))
                }
            }
        });
        AxumBody::from_stream(frames)
    })
}

async fn handle_request(
    handler: HyperHandler,
    req: Request<AxumBody>,
    write_timeout: Duration,
) -> Result<AxumResponse, Infallible> {
    match handler.handle_request(req).await {
        Ok(response) => Ok(bound_write(response.into_response(), write_timeout)),
        Err(e) => {
            let response = match e {
                HandlerError::ResponseError(err) => {
                    tracing::error!("Response error: {}", err);
                    (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
                }
            };
            Ok(response)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_system::EmbeddedAssets;
    use crate::config::models::{EndpointMapping, EndpointTable};
    use crate::core::{DispatchMode, EndpointStore, PrefixMatching, ProxyService};
    use crate::ports::http_client::{HttpClient, HttpClientError, HttpResponseFuture};
    use crate::utils::graceful_shutdown::ShutdownReason;
    use bytes::Bytes;
    use http_body_util::BodyExt;
    use hyper::Response;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;
    use tower::ServiceExt;

    struct Unreachable;

    impl HttpClient for Unreachable {
        fn send_request<'a>(
            &'a self,
            _req: Request<AxumBody>,
            _timeout: Duration,
        ) -> HttpResponseFuture<'a> {
            Box::pin(async {
                Err::<Response<AxumBody>, _>(HttpClientError::ConnectionError(
                    "no route to host".to_string(),
                ))
            })
        }
    }

    fn handler() -> HyperHandler {
        let store = Arc::new(EndpointStore::new(EndpointTable::new(vec![
            EndpointMapping::new("/api/yahoo", "https://www.yahoo.com", "/"),
        ])));
        let proxy = Arc::new(ProxyService::new(
            store,
            DispatchMode::FirstMatch,
            PrefixMatching::Strict,
        ));
        HyperHandler::new(
            proxy,
            Arc::new(Unreachable),
            Arc::new(EmbeddedAssets::new()),
            Duration::from_secs(5),
        )
    }

    #[tokio::test]
    async fn router_serves_index() {
        let app = router(handler(), ServerTimeouts::default());
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/index.html")
                    .body(AxumBody::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert!(!body.is_empty());
    }

    #[tokio::test]
    async fn router_redirects_root() {
        let app = router(handler(), ServerTimeouts::default());
        let response = app
            .oneshot(Request::builder().uri("/").body(AxumBody::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(response.headers()["location"], "/index.html");
    }

    #[tokio::test]
    async fn router_maps_connection_failures_to_502() {
        let app = router(handler(), ServerTimeouts::default());
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/yahoo/news")
                    .body(AxumBody::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn serve_returns_after_shutdown() {
        let shutdown = Arc::new(GracefulShutdown::with_grace_period(Duration::from_secs(1)));
        let server = Arc::new(HyperServer::with_dependencies(
            "127.0.0.1:0".parse().unwrap(),
            ServerTimeouts::default(),
            handler(),
            shutdown.clone(),
        ));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();

        let running = tokio::spawn({
            let server = server.clone();
            async move { server.serve(listener).await }
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        shutdown.trigger_shutdown(ShutdownReason::Graceful);

        let result = tokio::time::timeout(Duration::from_secs(5), running)
            .await
            .unwrap()
            .unwrap();
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn stalled_response_body_is_cut_at_write_deadline() {
        let stalled = AxumResponse::new(AxumBody::from_stream(
            stream::pending::<Result<Bytes, std::io::Error>>(),
        ));
        let bounded = bound_write(stalled, Duration::from_millis(100));

        let collected =
            tokio::time::timeout(Duration::from_secs(5), bounded.into_body().collect()).await;
        assert!(collected.expect("write deadline did not fire").is_err());
    }

    #[tokio::test]
    async fn buffered_response_keeps_its_length() {
        let bounded = bound_write(
            AxumResponse::new(AxumBody::from("done")),
            Duration::from_millis(1),
        );
        assert_eq!(bounded.body().size_hint().exact(), Some(4));
        tokio::time::sleep(Duration::from_millis(20)).await;
        let body = bounded.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"done");
    }

    #[tokio::test]
    async fn idle_connection_is_closed() {
        let shutdown = Arc::new(GracefulShutdown::with_grace_period(Duration::from_secs(1)));
        let server = Arc::new(HyperServer::with_dependencies(
            "127.0.0.1:0".parse().unwrap(),
            ServerTimeouts {
                idle: Duration::from_millis(200),
                ..ServerTimeouts::default()
            },
            handler(),
            shutdown.clone(),
        ));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let running = tokio::spawn({
            let server = server.clone();
            async move { server.serve(listener).await }
        });

        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET /index.html HTTP/1.1\r\nhost: localhost\r\n\r\n")
            .await
            .unwrap();

        // One response, then nothing more arrives and the server hangs up.
        let mut received = Vec::new();
        let read = tokio::time::timeout(Duration::from_secs(5), async {
            let mut buf = [0u8; 4096];
            loop {
                match stream.read(&mut buf).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => received.extend_from_slice(&buf[..n]),
                }
            }
        })
        .await;
        assert!(read.is_ok(), "idle connection was kept open");
        assert!(received.starts_with(b"HTTP/1.1 200 OK"));

        shutdown.trigger_shutdown(ShutdownReason::Graceful);
        let result = tokio::time::timeout(Duration::from_secs(5), running)
            .await
            .unwrap()
            .unwrap();
        assert!(result.is_ok());
    }
}
