use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Body as AxumBody;
use hyper::{
    Method, Request, Response, StatusCode, Uri, Version,
    header::{self, HeaderValue},
};

use crate::config::models::EndpointMapping;
use crate::core::router::{INDEX_REDIRECT, STATIC_ROOT, asset_path};
use crate::core::{ProxyService, Resolution, RouteKind, classify, detect_content_type};
use crate::metrics;
use crate::ports::file_system::AssetSource;
use crate::ports::http_client::HttpClient;
use crate::ports::http_server::{HandlerError, HandlerResponseFuture, HttpHandler};

const PLAIN: &str = "text/plain";
const HTML: &str = "text/html";

type HandlerResult = Result<Response<AxumBody>, HandlerError>;

fn respond(status: StatusCode, content_type: &'static str, body: impl Into<AxumBody>) -> HandlerResult {
    Ok(Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, content_type)
        .body(body.into())?)
}

/// Minimal escaping for text echoed into an HTML body.
fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn not_found_page(asset: &str) -> HandlerResult {
    respond(
        StatusCode::NOT_FOUND,
        HTML,
        format!(
            "<html><head><title>Not Found</title></head><body>{}</body></html>",
            escape_html(asset)
        ),
    )
}

fn not_found_endpoint(path: &str) -> HandlerResult {
    respond(StatusCode::NOT_FOUND, PLAIN, format!("notfound error \"{path}\""))
}

/// Whether `target` still points at the scheme and authority of `url_host`.
fn same_origin(target: &Uri, url_host: &str) -> bool {
    match url_host.parse::<Uri>() {
        Ok(host) => target.scheme() == host.scheme() && target.authority() == host.authority(),
        Err(_) => false,
    }
}

/// Entry point for every inbound request: redirect, API relay or static asset.
#[derive(Clone)]
pub struct HyperHandler {
    proxy: Arc<ProxyService>,
    http_client: Arc<dyn HttpClient>,
    assets: Arc<dyn AssetSource>,
    upstream_timeout: Duration,
}

impl HyperHandler {
    pub fn new(
        proxy: Arc<ProxyService>,
        http_client: Arc<dyn HttpClient>,
        assets: Arc<dyn AssetSource>,
        upstream_timeout: Duration,
    ) -> Self {
        Self {
            proxy,
            http_client,
            assets,
            upstream_timeout,
        }
    }

    async fn handle(&self, req: Request<AxumBody>) -> HandlerResult {
        let started = Instant::now();
        let method = req.method().clone();
        let kind = classify(req.uri().path());

        let response = match kind {
            RouteKind::Redirect => Self::handle_redirect(),
            RouteKind::Api => self.handle_api(req).await,
            RouteKind::Static => self.handle_static(req).await,
        }?;

        metrics::record_request(
            kind.as_str(),
            &method,
            response.status().as_u16(),
            started.elapsed(),
        );
        tracing::debug!(response_status = ?response.status(), kind = kind.as_str(), "Request handled");
        Ok(response)
    }

    fn handle_redirect() -> HandlerResult {
        tracing::warn!("Path redirect");
        Ok(Response::builder()
            .status(StatusCode::MOVED_PERMANENTLY)
            .header(header::LOCATION, HeaderValue::from_static(INDEX_REDIRECT))
            .body(AxumBody::empty())?)
    }

    async fn handle_api(&self, req: Request<AxumBody>) -> HandlerResult {
        let path = req.uri().path().to_string();
        let actual = req
            .uri()
            .path_and_query()
            .map_or_else(|| path.clone(), |pq| pq.as_str().to_string());

        match self.proxy.resolve(&actual) {
            Resolution::Forward { target, mapping } => self.forward(req, &target, &mapping).await,
            Resolution::NoMatch => {
                tracing::error!("not found, no endpoint prefix matches {}", path);
                not_found_endpoint(&path)
            }
            Resolution::EmptyTable => {
                tracing::error!("not found, {} vs empty range.", path);
                not_found_endpoint(&path)
            }
        }
    }

    async fn forward(
        &self,
        req: Request<AxumBody>,
        target: &str,
        mapping: &EndpointMapping,
    ) -> HandlerResult {
        let backend = mapping.url_host.as_str();
        let uri = match target.parse::<Uri>() {
            Ok(uri) => uri,
            Err(err) => {
                tracing::error!("gateway error. target {} is not a valid URL: {}", target, err);
                metrics::record_backend_request(backend, "error", Duration::ZERO);
                return respond(
                    StatusCode::BAD_GATEWAY,
                    PLAIN,
                    format!("bad gateway error \"{err}\""),
                );
            }
        };

        if !same_origin(&uri, backend) {
            tracing::error!("not found, {} leaves backend {}", target, backend);
            return not_found_endpoint(req.uri().path());
        }

        let (mut parts, body) = req.into_parts();
        tracing::debug!("{} {} -> {} via {}", parts.method, parts.uri, uri, mapping);
        parts.uri = uri;
        // The outbound connection speaks HTTP/1.1 and derives Host from the target.
        parts.version = Version::HTTP_11;
        parts.headers.remove(header::HOST);
        let outbound = Request::from_parts(parts, body);

        let started = Instant::now();
        match self
            .http_client
            .send_request(outbound, self.upstream_timeout)
            .await
        {
            Ok(response) => {
                metrics::record_backend_request(
                    backend,
                    response.status().as_str(),
                    started.elapsed(),
                );
                Ok(response)
            }
            Err(err) if err.is_timeout() => {
                tracing::error!("gateway error. got {}", err);
                metrics::record_backend_request(backend, "timeout", started.elapsed());
                respond(
                    StatusCode::GATEWAY_TIMEOUT,
                    PLAIN,
                    format!("gateway timeout error \"{err}\""),
                )
            }
            Err(err) => {
                tracing::error!("gateway error. got {}", err);
                metrics::record_backend_request(backend, "error", started.elapsed());
                respond(
                    StatusCode::BAD_GATEWAY,
                    PLAIN,
                    format!("bad gateway error \"{err}\""),
                )
            }
        }
    }

    async fn handle_static(&self, req: Request<AxumBody>) -> HandlerResult {
        let method = req.method();
        let path = req.uri().path();
        tracing::debug!("Path {}", path);

        if method != Method::GET {
            tracing::error!(
                "{} for {} : {}. only accept GET",
                method,
                path,
                StatusCode::METHOD_NOT_ALLOWED.as_u16()
            );
            return Ok(Response::builder()
                .status(StatusCode::METHOD_NOT_ALLOWED)
                .body(AxumBody::empty())?);
        }

        let Some(asset) = asset_path(path) else {
            tracing::error!(
                "{} {}: {} (not UTF-8 once decoded)",
                method,
                path,
                StatusCode::NOT_FOUND.as_u16()
            );
            return not_found_page(&format!("{STATIC_ROOT}{path}"));
        };

        let entry = match self.assets.open(&asset).await {
            Ok(entry) => entry,
            Err(err) => {
                tracing::error!("{} {}: {} ({})", method, asset, StatusCode::NOT_FOUND.as_u16(), err);
                return not_found_page(&asset);
            }
        };

        let meta = match entry.stat() {
            Ok(meta) => meta,
            Err(err) => {
                tracing::error!("{} {}: {} ({})", method, asset, StatusCode::NOT_FOUND.as_u16(), err);
                return not_found_page(&asset);
            }
        };

        if meta.is_dir {
            tracing::error!(
                "{} {} is an unhandled dir: {}",
                method,
                asset,
                StatusCode::NOT_FOUND.as_u16()
            );
            return respond(
                StatusCode::NOT_FOUND,
                HTML,
                format!(
                    "<html><head><title>Not Found</title></head><body>can not open dir : {}</body></html>",
                    escape_html(&asset)
                ),
            );
        }

        let content = match entry.read_all().await {
            Ok(content) => content,
            Err(err) => {
                tracing::error!(
                    "{} {}: {} ({})",
                    method,
                    asset,
                    StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
                    err
                );
                return respond(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    HTML,
                    format!(
                        "<html><head><title>Internal Server Error</title></head><body> {}</body></html>",
                        escape_html(&meta.name)
                    ),
                );
            }
        };

        let content_type = detect_content_type(&content);
        tracing::debug!(
            "{} {}: {} {} bytes",
            method,
            asset,
            StatusCode::OK.as_u16(),
            content.len()
        );
        respond(StatusCode::OK, content_type, content)
    }
}

impl HttpHandler for HyperHandler {
    fn handle_request(&self, req: Request<AxumBody>) -> HandlerResponseFuture<'_> {
        Box::pin(self.handle(req))
    }
}
