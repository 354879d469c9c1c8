pub mod loader;
pub mod models;
pub mod settings;
pub mod validation;
pub mod watcher;

pub use loader::{ConfigError, default_endpoints, load_endpoints, load_endpoints_or_default};
pub use models::{ConfigurationFile, EndpointMapping, EndpointTable};
pub use settings::{Args, LogFormat, Settings};
pub use watcher::ConfigWatcher;
