//! Reverse proxy that sends Segment CDN paths to one origin and everything
//! else to the tracking API, adding permissive CORS headers to every response.

pub mod config;
pub mod cors;
pub mod error;
pub mod router;
pub mod server;
pub mod service;
pub mod upstream;

pub use config::Config;
pub use error::ProxyError;
pub use router::{classify, Backend, Router};
pub use server::serve;
pub use upstream::Upstream;
