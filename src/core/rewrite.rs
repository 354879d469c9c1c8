use clap::ValueEnum;

use crate::config::models::EndpointMapping;

/// Backend path prefix meaning "append the remainder as-is".
pub const PASS_THROUGH_PREFIX: &str = "/";

/// How an inbound path is tested against a mapping's `path_prefix`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum PrefixMatching {
    /// The inbound path must literally start with the prefix, and the prefix must end at
    /// a segment boundary (`/` or `?` follows, or the prefix itself ends with `/`).
    #[default]
    Strict,
    /// Any path longer than the prefix matches, and the first `len(prefix)` bytes are
    /// cut off whatever they contain. Kept for deployments that depend on it.
    LengthOnly,
}

/// Compute the backend URL for `actual_path` under one forwarding rule.
///
/// `actual_path` is the request path including any query string. Returns `None` when
/// the rule does not apply.
pub fn rewrite(
    actual_path: &str,
    path_prefix: &str,
    url_host: &str,
    url_path_prefix: &str,
    matching: PrefixMatching,
) -> Option<String> {
    if actual_path == path_prefix {
        return Some(format!("{url_host}{url_path_prefix}"));
    }

    if actual_path.len() <= path_prefix.len() {
        return None;
    }

    let extension = match matching {
        PrefixMatching::Strict => {
            let rest = actual_path.strip_prefix(path_prefix)?;
            // "/api/svc" must not also claim "/api/svc.evil" or "/api/svc@host".
            let at_boundary = path_prefix.ends_with('/') || rest.starts_with(['/', '?']);
            if !at_boundary {
                return None;
            }
            rest
        }
        PrefixMatching::LengthOnly => actual_path.get(path_prefix.len()..)?,
    };

    if url_path_prefix == PASS_THROUGH_PREFIX {
        Some(format!("{url_host}{extension}"))
    } else {
        Some(format!("{url_host}{url_path_prefix}{extension}"))
    }
}

impl EndpointMapping {
    /// Backend URL for `actual_path` under this rule, if it applies.
    pub fn target_for(&self, actual_path: &str, matching: PrefixMatching) -> Option<String> {
        rewrite(
            actual_path,
            &self.path_prefix,
            &self.url_host,
            &self.url_path_prefix,
            matching,
        )
    }
}
