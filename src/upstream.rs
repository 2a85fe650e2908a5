use std::fmt;

use hyper::http::uri::{Authority, Scheme};
use url::Url;

use crate::error::ProxyError;

/// One of the fixed origins requests are forwarded to.
///
/// Parsed once at startup and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct Upstream {
    url: String,
    scheme: Scheme,
    authority: Authority,
    path: String,
    query: String,
}

impl Upstream {
    pub fn parse(input: &str) -> Result<Self, ProxyError> {
        let url = Url::parse(input).map_err(|source| ProxyError::InvalidUpstream {
            url: input.to_string(),
            source,
        })?;

        let scheme = match url.scheme() {
            "http" => Scheme::HTTP,
            "https" => Scheme::HTTPS,
            other => {
                return Err(ProxyError::UnsupportedScheme {
                    url: input.to_string(),
                    scheme: other.to_string(),
                })
            }
        };

        let host = url
            .host_str()
            .filter(|host| !host.is_empty())
            .ok_or_else(|| ProxyError::MissingHost(input.to_string()))?;

        let authority = match url.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        };
        let authority = authority
            .parse::<Authority>()
            .map_err(|_| ProxyError::MissingHost(input.to_string()))?;

        Ok(Self {
            url: input.to_string(),
            scheme,
            authority,
            path: url.path().to_string(),
            query: url.query().unwrap_or_default().to_string(),
        })
    }

    pub fn scheme(&self) -> &Scheme {
        &self.scheme
    }

    /// Host with an explicit port, if the URL carried one.
    pub fn authority(&self) -> &Authority {
        &self.authority
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self) -> &str {
        &self.query
    }
}

impl fmt::Display for Upstream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url)
    }
}
