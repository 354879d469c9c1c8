use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// The only configuration file version this gateway accepts.
pub const SUPPORTED_VERSION: &str = "1.0";

/// On-disk endpoint configuration.
///
/// Field names follow the JSON document, e.g.
///
/// ```json
/// { "Version": "1.0",
///   "EncPoints": [ { "PathPrefix": "/api/yahoo", "URLHost": "https://www.yahoo.com", "URLPathPrefix": "/" } ] }
/// ```
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct ConfigurationFile {
    #[serde(rename = "Version", default)]
    pub version: String,
    #[serde(rename = "EncPoints", default)]
    pub endpoints: Vec<EndpointMapping>,
}

impl ConfigurationFile {
    /// Create a new configuration file builder
    pub fn builder() -> ConfigurationFileBuilder {
        ConfigurationFileBuilder::default()
    }

    pub fn into_table(self) -> EndpointTable {
        EndpointTable::new(self.endpoints)
    }
}

/// Builder for ConfigurationFile, mostly used by tests and the default table
#[derive(Default)]
pub struct ConfigurationFileBuilder {
    endpoints: Vec<EndpointMapping>,
}

impl ConfigurationFileBuilder {
    /// Append a forwarding rule; rules keep insertion order
    pub fn endpoint(
        mut self,
        path_prefix: impl Into<String>,
        url_host: impl Into<String>,
        url_path_prefix: impl Into<String>,
    ) -> Self {
        self.endpoints.push(EndpointMapping::new(path_prefix, url_host, url_path_prefix));
        self
    }

    pub fn build(self) -> ConfigurationFile {
        ConfigurationFile {
            version: SUPPORTED_VERSION.to_string(),
            endpoints: self.endpoints,
        }
    }
}

/// One forwarding rule: requests under `path_prefix` go to `url_host` + `url_path_prefix`.
///
/// A `url_path_prefix` of exactly `/` means the remainder of the inbound path is
/// appended to `url_host` without splicing any prefix.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct EndpointMapping {
    #[serde(rename = "PathPrefix", default)]
    pub path_prefix: String,
    #[serde(rename = "URLHost", default)]
    pub url_host: String,
    #[serde(rename = "URLPathPrefix", default)]
    pub url_path_prefix: String,
}

impl EndpointMapping {
    pub fn new(
        path_prefix: impl Into<String>,
        url_host: impl Into<String>,
        url_path_prefix: impl Into<String>,
    ) -> Self {
        Self {
            path_prefix: path_prefix.into(),
            url_host: url_host.into(),
            url_path_prefix: url_path_prefix.into(),
        }
    }
}

impl std::fmt::Display for EndpointMapping {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} -> {}{}",
            self.path_prefix, self.url_host, self.url_path_prefix
        )
    }
}

/// Ordered, immutable list of forwarding rules.
///
/// A table is never edited in place. Reloading builds a new table and publishes it
/// through [`crate::core::EndpointStore`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EndpointTable {
    mappings: Arc<[EndpointMapping]>,
}

impl EndpointTable {
    pub fn new(mappings: Vec<EndpointMapping>) -> Self {
        Self {
            mappings: mappings.into(),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, EndpointMapping> {
        self.mappings.iter()
    }

    pub fn first(&self) -> Option<&EndpointMapping> {
        self.mappings.first()
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }
}

impl<'a> IntoIterator for &'a EndpointTable {
    type Item = &'a EndpointMapping;
    type IntoIter = std::slice::Iter<'a, EndpointMapping>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_uses_document_field_names() {
        let json = r#"{
            "Version": "1.0",
            "EncPoints": [
                {"PathPrefix": "/api/yahoo", "URLHost": "https://www.yahoo.com", "URLPathPrefix": "/"}
            ]
        }"#;

        let file: ConfigurationFile = serde_json::from_str(json).unwrap();
        assert_eq!(file.version, "1.0");
        assert_eq!(
            file.endpoints,
            vec![EndpointMapping::new("/api/yahoo", "https://www.yahoo.com", "/")]
        );
    }

    #[test]
    fn test_missing_fields_default_to_empty() {
        let file: ConfigurationFile = serde_json::from_str(r#"{"EncPoints": [{}]}"#).unwrap();
        assert!(file.version.is_empty());
        assert_eq!(file.endpoints.len(), 1);
        assert!(file.endpoints[0].path_prefix.is_empty());
    }

    #[test]
    fn test_table_keeps_order() {
        let table = ConfigurationFile::builder()
            .endpoint("/api/b", "http://b", "/")
            .endpoint("/api/a", "http://a", "/")
            .build()
            .into_table();

        let prefixes: Vec<_> = table.iter().map(|m| m.path_prefix.as_str()).collect();
        assert_eq!(prefixes, vec!["/api/b", "/api/a"]);
        assert_eq!(table.first().map(|m| m.url_host.as_str()), Some("http://b"));
    }
}
