use std::net::SocketAddr;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("invalid upstream URL {url:?}: {source}")]
    InvalidUpstream {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("upstream URL {0:?} has no host")]
    MissingHost(String),

    #[error("upstream URL {url:?} uses unsupported scheme {scheme:?}")]
    UnsupportedScheme { url: String, scheme: String },

    #[error("could not bind to {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: hyper::Error,
    },

    #[error("server error: {0}")]
    Serve(#[from] hyper::Error),
}
