use std::sync::Arc;

use hyper::server::conn::AddrStream;
use hyper::service::{make_service_fn, service_fn};
use hyper::Server;
use tracing::info;

use crate::config::Config;
use crate::error::ProxyError;
use crate::router::Router;
use crate::service;
use crate::upstream::Upstream;

/// Builds the router from `config` and serves until the listener fails.
pub async fn serve(config: Config) -> Result<(), ProxyError> {
    let static_assets = Upstream::parse(&config.cdn_url)?;
    let tracking_api = Upstream::parse(&config.api_url)?;

    info!(
        %static_assets,
        %tracking_api,
        debug = config.debug,
        "Upstreams configured"
    );

    let router = Arc::new(Router::new(static_assets, tracking_api));

    let addr = config.bind_addr();
    let builder = Server::try_bind(&addr).map_err(|source| ProxyError::Bind { addr, source })?;

    let debug_mode = config.debug;
    let make_service = make_service_fn(move |conn: &AddrStream| {
        let router = router.clone();
        let remote_addr = conn.remote_addr();

        async move {
            Ok::<_, hyper::Error>(service_fn(move |req| {
                let router = router.clone();
                async move {
                    if debug_mode {
                        service::logged_proxy(&router, req, remote_addr).await
                    } else {
                        service::proxy(&router, req, remote_addr).await
                    }
                }
            }))
        }
    });

    info!("Serving proxy on http://{}", addr);

    builder.serve(make_service).await?;

    Ok(())
}
