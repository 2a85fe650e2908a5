use hyper::client::HttpConnector;
use hyper::header::{HeaderMap, HeaderName, HeaderValue, CONNECTION};
use hyper::{Body, Client, Request, Response, StatusCode};
use hyper_rustls::HttpsConnector;
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::cors::apply_cors;
use crate::router::Router;

lazy_static::lazy_static! {
    static ref CLIENT: Client<HttpsConnector<HttpConnector>> = {
        let https = hyper_rustls::HttpsConnectorBuilder::new()
            .with_webpki_roots()
            .https_or_http()
            .enable_http1()
            .build();

        Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .build(https)
    };
}

const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Target of the debug access log, enabled independently of `--log-level`.
pub const ACCESS_LOG_TARGET: &str = "segment_proxy::access";

/// Headers that only describe the current connection and must not be relayed.
const HOP_BY_HOP: [&str; 9] = [
    "connection",
    "proxy-connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Forwards one request to the upstream the router picks for it.
///
/// Never fails towards hyper: a transport error becomes a `502 Bad Gateway`
/// without CORS headers, a successful upstream response always carries them.
pub async fn proxy(
    router: &Router,
    req: Request<Body>,
    remote_addr: SocketAddr,
) -> Result<Response<Body>, hyper::Error> {
    let mut req = match router.route(req) {
        Ok(req) => req,
        Err(e) => {
            warn!("Could not build proxy request: {}", e);
            return Ok(error_response(
                "Error building proxy request",
                StatusCode::INTERNAL_SERVER_ERROR,
            ));
        }
    };

    remove_hop_by_hop_headers(req.headers_mut());
    append_forwarded_for(req.headers_mut(), remote_addr);

    let uri = req.uri().clone();

    let mut response = match CLIENT.request(req).await {
        Ok(response) => response,
        Err(e) => {
            warn!("Proxy error for {}: {}", uri, e);
            return Ok(error_response("", StatusCode::BAD_GATEWAY));
        }
    };

    remove_hop_by_hop_headers(response.headers_mut());
    apply_cors(response.headers_mut());

    Ok(response)
}

/// Same as [`proxy`], plus one access log line per request.
pub async fn logged_proxy(
    router: &Router,
    req: Request<Body>,
    remote_addr: SocketAddr,
) -> Result<Response<Body>, hyper::Error> {
    let started = Instant::now();
    let method = req.method().clone();
    let uri = req.uri().clone();
    let version = req.version();

    let response = proxy(router, req, remote_addr).await?;

    let length = response
        .headers()
        .get(hyper::header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-");

    info!(
        target: ACCESS_LOG_TARGET,
        remote = %remote_addr,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "\"{} {} {:?}\" {} {}",
        method,
        uri,
        version,
        response.status().as_u16(),
        length
    );

    Ok(response)
}

fn remove_hop_by_hop_headers(headers: &mut HeaderMap) {
    // Headers listed in Connection are hop-by-hop as well.
    let listed: Vec<HeaderName> = headers
        .get_all(CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    for name in listed {
        headers.remove(name);
    }

    for name in HOP_BY_HOP {
        headers.remove(name);
    }
}

fn append_forwarded_for(headers: &mut HeaderMap, remote_addr: SocketAddr) {
    let client_ip = remote_addr.ip().to_string();

    let prior: Vec<&str> = headers
        .get_all(X_FORWARDED_FOR)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .collect();

    let value = if prior.is_empty() {
        client_ip
    } else {
        format!("{}, {}", prior.join(", "), client_ip)
    };

    if let Ok(value) = HeaderValue::from_str(&value) {
        headers.insert(X_FORWARDED_FOR, value);
    }
}

fn error_response(error: &'static str, code: StatusCode) -> Response<Body> {
    let mut res = Response::new(Body::from(error));

    *res.status_mut() = code;

    res
}
