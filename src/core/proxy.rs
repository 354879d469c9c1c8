use std::sync::Arc;

use clap::ValueEnum;

use crate::config::models::{EndpointMapping, EndpointTable};
use crate::core::endpoints::EndpointStore;
use crate::core::rewrite::PrefixMatching;

/// How the endpoint table is walked for an API request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum DispatchMode {
    /// Try every mapping in order; the first one that produces a target wins.
    #[default]
    FirstMatch,
    /// Only the first mapping is consulted; if it does not match the request is
    /// answered with 404 without looking further.
    FirstEntryOnly,
}

/// Outcome of looking up an API path in the endpoint table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Forward to `target`, chosen by `mapping`.
    Forward {
        target: String,
        mapping: EndpointMapping,
    },
    /// The table has mappings but none applies.
    NoMatch,
    /// The table is empty.
    EmptyTable,
}

/// Chooses the backend for API requests from the current endpoint table.
pub struct ProxyService {
    endpoints: Arc<EndpointStore>,
    mode: DispatchMode,
    matching: PrefixMatching,
}

impl ProxyService {
    pub fn new(endpoints: Arc<EndpointStore>, mode: DispatchMode, matching: PrefixMatching) -> Self {
        Self {
            endpoints,
            mode,
            matching,
        }
    }

    pub fn endpoints(&self) -> &Arc<EndpointStore> {
        &self.endpoints
    }

    /// Resolve `actual_path` (path plus query) against a fresh snapshot of the table.
    pub fn resolve(&self, actual_path: &str) -> Resolution {
        let table = self.endpoints.snapshot();
        self.resolve_in(&table, actual_path)
    }

    pub fn resolve_in(&self, table: &EndpointTable, actual_path: &str) -> Resolution {
        if table.is_empty() {
            return Resolution::EmptyTable;
        }

        let candidates = match self.mode {
            DispatchMode::FirstMatch => table.len(),
            DispatchMode::FirstEntryOnly => 1,
        };

        table
            .iter()
            .take(candidates)
            .find_map(|mapping| {
                mapping
                    .target_for(actual_path, self.matching)
                    .map(|target| Resolution::Forward {
                        target,
                        mapping: mapping.clone(),
                    })
            })
            .unwrap_or(Resolution::NoMatch)
    }
}
