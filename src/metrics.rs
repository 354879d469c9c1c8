use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use http::Method;
use metrics::{Unit, counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use once_cell::sync::Lazy;

pub const FRONTDOOR_REQUESTS_TOTAL: &str = "frontdoor_requests_total";
pub const FRONTDOOR_REQUEST_DURATION_SECONDS: &str = "frontdoor_request_duration_seconds";
pub const FRONTDOOR_BACKEND_REQUESTS_TOTAL: &str = "frontdoor_backend_requests_total";
pub const FRONTDOOR_BACKEND_REQUEST_DURATION_SECONDS: &str =
    "frontdoor_backend_request_duration_seconds";

static DESCRIBED: Lazy<()> = Lazy::new(|| {
    describe_counter!(
        FRONTDOOR_REQUESTS_TOTAL,
        Unit::Count,
        "Total number of HTTP requests answered by the front door."
    );
    describe_histogram!(
        FRONTDOOR_REQUEST_DURATION_SECONDS,
        Unit::Seconds,
        "Latency of HTTP requests answered by the front door."
    );
    describe_counter!(
        FRONTDOOR_BACKEND_REQUESTS_TOTAL,
        Unit::Count,
        "Total number of API requests relayed to backends."
    );
    describe_histogram!(
        FRONTDOOR_BACKEND_REQUEST_DURATION_SECONDS,
        Unit::Seconds,
        "Time until a backend answered with a response head."
    );
});

/// Register metric descriptions with whatever recorder is installed.
pub fn describe() {
    Lazy::force(&DESCRIBED);
}

/// Install the Prometheus recorder and serve the scrape endpoint on `addr`.
pub fn install_exporter(addr: SocketAddr) -> Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .with_context(|| format!("Failed to start metrics exporter on {addr}"))?;
    describe();
    tracing::info!("Prometheus metrics exposed on http://{}/metrics", addr);
    Ok(())
}

/// Label value for a request method. Extension methods collapse into `OTHER`.
pub fn method_label(method: &Method) -> &'static str {
    match *method {
        Method::GET => "GET",
        Method::POST => "POST",
        Method::PUT => "PUT",
        Method::DELETE => "DELETE",
        Method::HEAD => "HEAD",
        Method::OPTIONS => "OPTIONS",
        Method::PATCH => "PATCH",
        Method::CONNECT => "CONNECT",
        Method::TRACE => "TRACE",
        _ => "OTHER",
    }
}

pub fn record_request(kind: &'static str, method: &Method, status: u16, duration: Duration) {
    counter!(
        FRONTDOOR_REQUESTS_TOTAL,
        "kind" => kind,
        "method" => method_label(method),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!(FRONTDOOR_REQUEST_DURATION_SECONDS, "kind" => kind).record(duration.as_secs_f64());
}

/// `outcome` is the status code, or `timeout`/`error` when no response arrived.
pub fn record_backend_request(backend: &str, outcome: &str, duration: Duration) {
    counter!(
        FRONTDOOR_BACKEND_REQUESTS_TOTAL,
        "backend" => backend.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
    histogram!(
        FRONTDOOR_BACKEND_REQUEST_DURATION_SECONDS,
        "backend" => backend.to_string()
    )
    .record(duration.as_secs_f64());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_methods_keep_their_name() {
        assert_eq!(method_label(&Method::GET), "GET");
        assert_eq!(method_label(&Method::PATCH), "PATCH");
        assert_eq!(method_label(&Method::TRACE), "TRACE");
    }

    #[test]
    fn extension_methods_share_one_label() {
        for name in ["PURGE", "PROPFIND", "X-RANDOM-1", "get"] {
            let method = Method::from_bytes(name.as_bytes()).unwrap();
            assert_eq!(method_label(&method), "OTHER", "{name}");
        }
    }
}
