//! The external router behind [`Router`](crate::Router).
//!
//! [`Router`](crate::Router) only composes middleware. Matching a path to a
//! handler is the job of a [`Mux`]: something that can store a handler under a
//! pattern and later dispatch a request to it. [`MatchitMux`] is the default,
//! built on `matchit` radix trees; tests and embedders can inject their own.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use http::{Method, StatusCode};
use matchit::Router as MatchitRouter;

use crate::error::Error;
use crate::handler::{BoxFuture, BoxedHandler, ErasedHandler};
use crate::request::Request;
use crate::response::Response;

/// Pattern registration and request dispatch.
pub trait Mux: Send + Sync + 'static {
    /// Stores `handler` under `pattern`. The pattern syntax and the conflict
    /// rules are the implementation's own.
    fn insert(&mut self, pattern: &str, handler: BoxedHandler) -> Result<(), Error>;

    /// Finds the handler for `req` and runs it.
    fn dispatch(&self, req: Request) -> BoxFuture;
}

/// The default [`Mux`]: one radix tree per HTTP method plus one for routes
/// that accept any method.
///
/// # Patterns
///
/// `[METHOD ]PATH`, where `PATH` uses matchit syntax:
///
/// | Pattern | Matches |
/// |---|---|
/// | `/healthz` | any method on `/healthz` |
/// | `GET /users/{id}` | `GET` (and `HEAD`) on `/users/42` |
/// | `/static/{*file}` | any method on `/static/css/site.css` |
///
/// When routes in different trees match the same request, the more specific
/// path wins, compared segment by segment: literal over `{param}` over
/// `{*catch_all}`. `/files/index` therefore beats `GET /files/{name}` for
/// `GET /files/index`. Only on equally specific paths does the
/// method-specific route win over the method-less one.
///
/// A path that only matches under other methods answers `405` with an
/// `allow` header; a path that matches nothing answers `404`.
#[derive(Default)]
pub struct MatchitMux {
    any: MatchitRouter<Route>,
    methods: HashMap<Method, MatchitRouter<Route>>,
}

struct Route {
    handler: BoxedHandler,
    rank: Vec<Segment>,
}

/// Ordered least to most specific.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum Segment {
    CatchAll,
    Param,
    Literal,
}

fn rank(path: &str) -> Vec<Segment> {
    path.split('/')
        .map(|segment| {
            if segment.contains("{*") {
                Segment::CatchAll
            } else if segment.contains('{') {
                Segment::Param
            } else {
                Segment::Literal
            }
        })
        .collect()
}

enum Lookup {
    Found(BoxedHandler, HashMap<String, String>),
    MethodNotAllowed(String),
    NotFound,
}

impl MatchitMux {
    pub fn new() -> Self {
        Self::default()
    }

    fn lookup(&self, method: &Method, path: &str) -> Lookup {
        let own = self.methods.get(method);
        let fallback = (*method == Method::HEAD).then(|| self.methods.get(&Method::GET)).flatten();

        // Method trees come first, so a tie keeps the method-specific route.
        let mut best: Option<matchit::Match<'_, '_, &Route>> = None;
        for tree in [own, fallback, Some(&self.any)].into_iter().flatten() {
            if let Ok(matched) = tree.at(path) {
                if best.as_ref().is_none_or(|b| matched.value.rank > b.value.rank) {
                    best = Some(matched);
                }
            }
        }

        if let Some(matched) = best {
            let params = matched.params.iter()
                .map(|(k, v)| (k.to_owned(), v.to_owned()))
                .collect();
            return Lookup::Found(Arc::clone(&matched.value.handler), params);
        }

        let mut allowed: BTreeSet<&str> = self.methods.iter()
            .filter(|(_, tree)| tree.at(path).is_ok())
            .map(|(m, _)| m.as_str())
            .collect();
        if allowed.is_empty() {
            return Lookup::NotFound;
        }
        if allowed.contains("GET") {
            allowed.insert("HEAD");
        }
        Lookup::MethodNotAllowed(allowed.into_iter().collect::<Vec<_>>().join(", "))
    }
}

impl Mux for MatchitMux {
    fn insert(&mut self, pattern: &str, handler: BoxedHandler) -> Result<(), Error> {
        let (method, path) = parse_pattern(pattern)?;
        let tree = match method {
            Some(method) => self.methods.entry(method).or_default(),
            None => &mut self.any,
        };
        let route = Route { handler, rank: rank(path) };
        tree.insert(path, route).map_err(|source| Error::Route {
            pattern: pattern.to_owned(),
            source,
        })
    }

    fn dispatch(&self, mut req: Request) -> BoxFuture {
        match self.lookup(req.method(), req.path()) {
            Lookup::Found(handler, params) => {
                req.set_params(params);
                handler.call(req)
            }
            Lookup::MethodNotAllowed(allow) => Box::pin(async move {
                Response::builder()
                    .status(StatusCode::METHOD_NOT_ALLOWED)
                    .header("allow", &allow)
                    .no_body()
            }),
            Lookup::NotFound => Box::pin(async { Response::status(StatusCode::NOT_FOUND) }),
        }
    }
}

/// Splits `"GET /x"` into `(Some(GET), "/x")` and `"/x"` into `(None, "/x")`.
fn parse_pattern(pattern: &str) -> Result<(Option<Method>, &str), Error> {
    let malformed = |reason| Error::Pattern { pattern: pattern.to_owned(), reason };

    let (method, path) = match pattern.split_once(' ') {
        Some((method, path)) => {
            if method.is_empty() || !method.bytes().all(|b| b.is_ascii_uppercase()) {
                return Err(malformed("method must be an uppercase token"));
            }
            let method = Method::from_bytes(method.as_bytes())
                .map_err(|_| malformed("method must be an uppercase token"))?;
            (Some(method), path)
        }
        None => (None, pattern),
    };

    if !path.starts_with('/') {
        return Err(malformed("path must start with `/`"));
    }
    Ok((method, path))
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;
    use crate::handler::Handler;

    fn request(method: Method, path: &str) -> Request {
        http::Request::builder().method(method).uri(path).body(Bytes::new()).unwrap().into()
    }

    fn reply(body: &'static str) -> BoxedHandler {
        (move |_req: Request| async move { body }).into_boxed_handler()
    }

    fn echo_id() -> BoxedHandler {
        (|req: Request| async move { req.param("id").unwrap_or("none").to_owned() }).into_boxed_handler()
    }

    #[test]
    fn parses_method_prefix() {
        let (method, path) = parse_pattern("POST /users").unwrap();
        assert_eq!(method, Some(Method::POST));
        assert_eq!(path, "/users");

        let (method, path) = parse_pattern("/users/{id}").unwrap();
        assert_eq!(method, None);
        assert_eq!(path, "/users/{id}");
    }

    #[test]
    fn rejects_malformed_patterns() {
        assert!(matches!(parse_pattern("get /x"), Err(Error::Pattern { .. })));
        assert!(matches!(parse_pattern("GET x"), Err(Error::Pattern { .. })));
        assert!(matches!(parse_pattern(""), Err(Error::Pattern { .. })));
    }

    #[test]
    fn identical_pattern_conflicts() {
        let mut mux = MatchitMux::new();
        mux.insert("/x", reply("one")).unwrap();
        let err = mux.insert("/x", reply("two")).unwrap_err();
        assert!(matches!(err, Error::Route { ref pattern, .. } if pattern == "/x"));
    }

    #[test]
    fn method_and_methodless_patterns_coexist() {
        let mut mux = MatchitMux::new();
        mux.insert("/x", reply("any")).unwrap();
        mux.insert("GET /x", reply("get")).unwrap();
        mux.insert("POST /x", reply("post")).unwrap();
    }

    #[tokio::test]
    async fn method_specific_route_wins() {
        let mut mux = MatchitMux::new();
        mux.insert("/x", reply("any")).unwrap();
        mux.insert("GET /x", reply("get")).unwrap();

        let res = mux.dispatch(request(Method::GET, "/x")).await;
        assert_eq!(res.body().as_ref(), b"get");
        let res = mux.dispatch(request(Method::DELETE, "/x")).await;
        assert_eq!(res.body().as_ref(), b"any");
    }

    #[test]
    fn literal_segments_outrank_params_and_catch_alls() {
        assert!(rank("/files/index") > rank("/files/{name}"));
        assert!(rank("/files/{name}") > rank("/files/{*rest}"));
        assert!(rank("/files/a/b") > rank("/files/{*rest}"));
        assert_eq!(rank("/users/{id}"), rank("/users/{name}"));
    }

    #[tokio::test]
    async fn static_path_beats_method_wildcard() {
        let mut mux = MatchitMux::new();
        mux.insert("GET /files/{name}", reply("wildcard")).unwrap();
        mux.insert("/files/index", reply("static")).unwrap();

        let res = mux.dispatch(request(Method::GET, "/files/index")).await;
        assert_eq!(res.body().as_ref(), b"static");
        let res = mux.dispatch(request(Method::GET, "/files/report")).await;
        assert_eq!(res.body().as_ref(), b"wildcard");
        let res = mux.dispatch(request(Method::HEAD, "/files/index")).await;
        assert_eq!(res.status_code(), StatusCode::OK);
    }

    #[tokio::test]
    async fn param_beats_method_catch_all() {
        let mut mux = MatchitMux::new();
        mux.insert("GET /assets/{*rest}", reply("catch-all")).unwrap();
        mux.insert("/assets/{file}", reply("param")).unwrap();

        let res = mux.dispatch(request(Method::GET, "/assets/site.css")).await;
        assert_eq!(res.body().as_ref(), b"param");
        let res = mux.dispatch(request(Method::GET, "/assets/css/site.css")).await;
        assert_eq!(res.body().as_ref(), b"catch-all");
    }

    #[tokio::test]
    async fn params_reach_the_handler() {
        let mut mux = MatchitMux::new();
        mux.insert("GET /users/{id}", echo_id()).unwrap();

        let res = mux.dispatch(request(Method::GET, "/users/42?full=1")).await;
        assert_eq!(res.body().as_ref(), b"42");
    }

    #[tokio::test]
    async fn head_falls_back_to_get() {
        let mut mux = MatchitMux::new();
        mux.insert("GET /x", reply("get")).unwrap();

        let res = mux.dispatch(request(Method::HEAD, "/x")).await;
        assert_eq!(res.status_code(), StatusCode::OK);
    }

    #[tokio::test]
    async fn unknown_path_is_not_found() {
        let mut mux = MatchitMux::new();
        mux.insert("GET /x", reply("get")).unwrap();

        let res = mux.dispatch(request(Method::GET, "/y")).await;
        assert_eq!(res.status_code(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn wrong_method_lists_allowed_ones() {
        let mut mux = MatchitMux::new();
        mux.insert("GET /x", reply("get")).unwrap();
        mux.insert("POST /x", reply("post")).unwrap();

        let res = mux.dispatch(request(Method::PUT, "/x")).await;
        assert_eq!(res.status_code(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(res.header("allow"), Some("GET, HEAD, POST"));
    }
}
