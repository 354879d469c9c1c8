pub mod endpoints;
pub mod proxy;
pub mod rewrite;
pub mod router;
pub mod sniff;

pub use endpoints::EndpointStore;
pub use proxy::{DispatchMode, ProxyService, Resolution};
pub use rewrite::{PrefixMatching, rewrite};
pub use router::{RouteKind, classify};
pub use sniff::detect_content_type;
