//! Chooses an upstream for each request and points the request at it.

use hyper::header::{HeaderValue, HOST};
use hyper::http;
use hyper::{Request, Uri};

use crate::upstream::Upstream;

/// Path prefixes served by the static-asset origin, checked in order.
pub const STATIC_ASSET_PREFIXES: [&str; 4] = [
    "/v1/projects",
    "/analytics.js/v1",
    "/next-integrations",
    "/analytics-next/bundles",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    StaticAssets,
    TrackingApi,
}

/// Picks the backend for a raw request path.
///
/// Matching is a plain case-sensitive string prefix test, so `/v1/projectsXYZ`
/// still goes to the static-asset origin. Everything else falls through to the
/// tracking API.
pub fn classify(path: &str) -> Backend {
    if STATIC_ASSET_PREFIXES
        .iter()
        .any(|prefix| path.starts_with(prefix))
    {
        Backend::StaticAssets
    } else {
        Backend::TrackingApi
    }
}

/// Holds the two upstream origins. Read-only once built.
#[derive(Debug, Clone)]
pub struct Router {
    static_assets: Upstream,
    tracking_api: Upstream,
}

impl Router {
    pub fn new(static_assets: Upstream, tracking_api: Upstream) -> Self {
        Self {
            static_assets,
            tracking_api,
        }
    }

    pub fn upstream(&self, backend: Backend) -> &Upstream {
        match backend {
            Backend::StaticAssets => &self.static_assets,
            Backend::TrackingApi => &self.tracking_api,
        }
    }

    pub fn target(&self, path: &str) -> &Upstream {
        self.upstream(classify(path))
    }

    /// Classifies the request and rewrites it towards the chosen upstream.
    pub fn route<B>(&self, req: Request<B>) -> Result<Request<B>, http::Error> {
        let target = self.target(req.uri().path());
        rewrite(req, target)
    }
}

/// Points `req` at `target`: scheme and authority are replaced, the target's
/// base path is prepended and both query strings are merged. The `Host` header
/// is overwritten with the upstream authority.
///
/// Method, body and all other headers are left untouched.
pub fn rewrite<B>(mut req: Request<B>, target: &Upstream) -> Result<Request<B>, http::Error> {
    let path = single_joining_slash(target.path(), req.uri().path());
    let query = merge_query(target.query(), req.uri().query().unwrap_or_default());

    let path_and_query = if query.is_empty() {
        path
    } else {
        format!("{}?{}", path, query)
    };

    let uri = Uri::builder()
        .scheme(target.scheme().clone())
        .authority(target.authority().clone())
        .path_and_query(path_and_query)
        .build()?;

    let host = HeaderValue::from_str(target.authority().as_str())?;

    *req.uri_mut() = uri;
    req.headers_mut().insert(HOST, host);

    Ok(req)
}

/// Joins two path fragments with exactly one `/` between them.
pub fn single_joining_slash(a: &str, b: &str) -> String {
    match (a.ends_with('/'), b.starts_with('/')) {
        (true, true) => format!("{}{}", a, &b[1..]),
        (false, false) => format!("{}/{}", a, b),
        _ => format!("{}{}", a, b),
    }
}

/// Concatenates two raw query strings, adding `&` only when both are non-empty.
pub fn merge_query(base: &str, extra: &str) -> String {
    if base.is_empty() || extra.is_empty() {
        format!("{}{}", base, extra)
    } else {
        format!("{}&{}", base, extra)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn router() -> Router {
        Router::new(
            Upstream::parse("https://cdn.example.com").unwrap(),
            Upstream::parse("https://api.example.com").unwrap(),
        )
    }

    #[test]
    fn static_asset_prefixes_go_to_cdn() {
        for path in [
            "/v1/projects",
            "/v1/projects/abc/settings",
            "/v1/projectsXYZ",
            "/analytics.js/v1/key/analytics.min.js",
            "/next-integrations/actions/foo.js",
            "/analytics-next/bundles/ajs-destination.bundle.js",
        ] {
            assert_eq!(classify(path), Backend::StaticAssets, "{}", path);
        }
    }

    #[test]
    fn everything_else_goes_to_tracking_api() {
        for path in [
            "/",
            "",
            "/custom/track",
            "/v1/track",
            "/V1/projects",
            "/analytics.js",
            "/prefix/v1/projects",
        ] {
            assert_eq!(classify(path), Backend::TrackingApi, "{}", path);
        }
    }

    #[test]
    fn target_resolves_upstream() {
        let router = router();
        assert_eq!(router.target("/v1/projects/x").authority().as_str(), "cdn.example.com");
        assert_eq!(router.target("/v1/batch").authority().as_str(), "api.example.com");
    }

    #[test]
    fn backends_are_distinct() {
        let router = router();
        assert_ne!(
            router.upstream(Backend::StaticAssets).authority(),
            router.upstream(Backend::TrackingApi).authority()
        );
    }

    #[test]
    fn joins_with_single_slash() {
        assert_eq!(single_joining_slash("/base/", "/path"), "/base/path");
        assert_eq!(single_joining_slash("/base", "path"), "/base/path");
        assert_eq!(single_joining_slash("/base", "/path"), "/base/path");
        assert_eq!(single_joining_slash("/base/", "path"), "/base/path");
        assert_eq!(single_joining_slash("", "/path"), "/path");
        assert_eq!(single_joining_slash("/", "/"), "/");
    }

    #[test]
    fn merges_queries() {
        assert_eq!(merge_query("", ""), "");
        assert_eq!(merge_query("a=1", ""), "a=1");
        assert_eq!(merge_query("", "b=2"), "b=2");
        assert_eq!(merge_query("a=1", "b=2"), "a=1&b=2");
    }

    #[test]
    fn rewrites_static_asset_request() {
        let req = Request::get("/v1/projects/abc/settings?x=1")
            .header(HOST, "proxy.example.org")
            .body(())
            .unwrap();

        let req = router().route(req).unwrap();

        assert_eq!(
            req.uri().to_string(),
            "https://cdn.example.com/v1/projects/abc/settings?x=1"
        );
        assert_eq!(req.headers()[HOST], "cdn.example.com");
    }

    #[test]
    fn rewrite_keeps_method_body_and_headers() {
        let req = Request::post("/custom/track")
            .header("content-type", "application/json")
            .body("{\"event\":\"x\"}")
            .unwrap();

        let req = router().route(req).unwrap();

        assert_eq!(req.method(), hyper::Method::POST);
        assert_eq!(req.uri().to_string(), "https://api.example.com/custom/track");
        assert_eq!(req.headers()["content-type"], "application/json");
        assert_eq!(req.headers()[HOST], "api.example.com");
        assert_eq!(*req.body(), "{\"event\":\"x\"}");
    }

    #[test]
    fn rewrite_merges_base_path_and_query() {
        let target = Upstream::parse("http://127.0.0.1:9000/base/?key=abc").unwrap();
        let req = Request::get("/v1/t?y=2").body(()).unwrap();

        let req = rewrite(req, &target).unwrap();

        assert_eq!(req.uri().to_string(), "http://127.0.0.1:9000/base/v1/t?key=abc&y=2");
        assert_eq!(req.headers()[HOST], "127.0.0.1:9000");
    }
}
