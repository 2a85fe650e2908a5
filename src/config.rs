use std::net::{Ipv4Addr, SocketAddr};

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::service::ACCESS_LOG_TARGET;

pub const DEFAULT_CDN_URL: &str = "https://cdn.segment.com";
pub const DEFAULT_TRACKING_API_URL: &str = "https://api.segment.io";

#[derive(Parser, Debug, Clone)]
#[command(
    name = "segment-proxy",
    about = "Reverse proxy splitting traffic between the Segment CDN and tracking API",
    version = env!("CARGO_PKG_VERSION")
)]
pub struct Config {
    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    /// Log every request and response
    #[arg(short, long)]
    pub debug: bool,

    /// Origin serving settings, analytics.js and integration bundles
    #[arg(long, env = "CDN_URL", default_value = DEFAULT_CDN_URL)]
    pub cdn_url: String,

    /// Origin receiving tracking calls
    #[arg(long, env = "TRACKING_API_URL", default_value = DEFAULT_TRACKING_API_URL)]
    pub api_url: String,

    #[arg(short, long, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,
}

impl Config {
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.port))
    }

    /// Filter built from `--log-level`. In debug mode the access log target
    /// stays at `info` whatever level the rest of the crate runs at.
    pub fn log_filter(&self) -> EnvFilter {
        if self.debug {
            EnvFilter::new(format!("{},{}=info", self.log_level, ACCESS_LOG_TARGET))
        } else {
            EnvFilter::new(&self.log_level)
        }
    }
}
