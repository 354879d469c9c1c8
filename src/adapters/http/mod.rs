pub mod server;

pub use server::{HyperServer, ServerTimeouts, router};
