use percent_encoding::percent_decode_str;

/// Paths starting with this marker are forwarded to backends.
pub const API_MARKER: &str = "/api";

/// Static asset paths are looked up under this directory of the asset collection.
pub const STATIC_ROOT: &str = "static";

/// Where unusable paths are sent.
pub const INDEX_REDIRECT: &str = "/index.html";

/// Top-level decision for one inbound request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteKind {
    /// Answer with a permanent redirect to [`INDEX_REDIRECT`].
    Redirect,
    /// Forward to a backend.
    Api,
    /// Serve from the asset collection.
    Static,
}

impl RouteKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteKind::Redirect => "redirect",
            RouteKind::Api => "api",
            RouteKind::Static => "static",
        }
    }
}

/// Classify an inbound request path.
pub fn classify(path: &str) -> RouteKind {
    if path.len() < API_MARKER.len() || !path.starts_with('/') {
        return RouteKind::Redirect;
    }
    match path.get(..API_MARKER.len()) {
        Some(head) if head == API_MARKER => RouteKind::Api,
        _ => RouteKind::Static,
    }
}

/// Location of the asset backing a static request path.
///
/// The path is percent-decoded first, so `/my%20page.html` names `static/my page.html`.
/// Returns `None` when the decoded bytes are not UTF-8.
pub fn asset_path(path: &str) -> Option<String> {
    let decoded = percent_decode_str(path).decode_utf8().ok()?;
    Some(format!("{STATIC_ROOT}{decoded}"))
}
