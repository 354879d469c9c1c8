use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::config::models::EndpointTable;

/// Holds the current endpoint table.
///
/// Readers take a snapshot without locking and keep it for the whole request; a reload
/// publishes a fresh table that only later snapshots observe.
#[derive(Debug)]
pub struct EndpointStore {
    current: ArcSwap<EndpointTable>,
}

impl EndpointStore {
    pub fn new(table: EndpointTable) -> Self {
        Self {
            current: ArcSwap::from_pointee(table),
        }
    }

    pub fn snapshot(&self) -> Arc<EndpointTable> {
        self.current.load_full()
    }

    pub fn replace(&self, table: EndpointTable) {
        self.current.store(Arc::new(table));
    }
}

impl Default for EndpointStore {
    fn default() -> Self {
        Self::new(EndpointTable::empty())
    }
}
