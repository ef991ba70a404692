//! The application router: middleware composition in front of a [`Mux`].
//!
//! The router does not match paths itself. It keeps an ordered list of global
//! middlewares, wraps each handler with that list plus the route's own
//! middlewares, and hands the result to the mux. Build it once at startup;
//! pass it to [`Server::serve`](crate::Server::serve).

use std::iter;
use std::sync::Arc;

use tracing::debug;

use crate::error::Error;
use crate::handler::{private, BoxFuture, BoxedHandler, ErasedHandler, Handler};
use crate::middleware::{self, Middleware};
use crate::mux::{MatchitMux, Mux};
use crate::request::Request;

/// Middleware-aware router.
///
/// Every builder method returns `self` so registrations chain naturally:
///
/// ```rust
/// # use whttp::{Request, Response, Router, middleware};
/// # async fn list_users(_: Request) -> Response { Response::text("") }
/// # async fn create_user(_: Request) -> Response { Response::text("") }
/// # let require_token = middleware::from_fn(|req: Request, next: middleware::Next| next.run(req));
/// let app = Router::new()
///     .wrap([middleware::trace()])
///     .route("GET /users", list_users)
///     .handle("POST /users", create_user, [require_token]);
/// ```
///
/// Each route captures the global middlewares registered *before* it. A
/// later [`wrap`](Router::wrap) only affects routes registered after it.
pub struct Router<M = MatchitMux> {
    mux: M,
    middlewares: Vec<Middleware>,
}

impl Router {
    pub fn new() -> Self {
        Self::with_mux(MatchitMux::new())
    }
}

impl Default for Router {
    fn default() -> Self { Self::new() }
}

impl<M: Mux> Router<M> {
    /// A router that registers into and dispatches through `mux`.
    pub fn with_mux(mux: M) -> Self {
        Self { mux, middlewares: Vec::new() }
    }

    /// Appends global middlewares, in order. They apply to every route
    /// registered from now on.
    pub fn wrap(mut self, middlewares: impl IntoIterator<Item = Middleware>) -> Self {
        self.middlewares.extend(middlewares);
        self
    }

    /// Registers `handler` for `pattern` with no route-specific middleware.
    ///
    /// # Panics
    ///
    /// Panics if the mux rejects the pattern, see [`handle`](Router::handle).
    pub fn route(self, pattern: &str, handler: impl Handler) -> Self {
        self.handle(pattern, handler, iter::empty())
    }

    /// Registers `handler` for `pattern`, wrapped by the global middlewares
    /// followed by `middlewares`.
    ///
    /// # Panics
    ///
    /// Panics if the pattern is malformed or conflicts with one already
    /// registered. Route tables are fixed at startup, so a conflict is a
    /// programming error; use [`try_handle`](Router::try_handle) to get it as
    /// an [`Error`] instead.
    pub fn handle(
        mut self,
        pattern: &str,
        handler: impl Handler,
        middlewares: impl IntoIterator<Item = Middleware>,
    ) -> Self {
        if let Err(e) = self.try_handle(pattern, handler, middlewares) {
            panic!("{e}");
        }
        self
    }

    /// Fallible form of [`handle`](Router::handle). On error the router is
    /// left unchanged.
    pub fn try_handle(
        &mut self,
        pattern: &str,
        handler: impl Handler,
        middlewares: impl IntoIterator<Item = Middleware>,
    ) -> Result<(), Error> {
        let chain: Vec<Middleware> = self.middlewares.iter().cloned().chain(middlewares).collect();
        let handler = middleware::compose(&chain, handler.into_boxed_handler());

        self.mux.insert(pattern, handler)?;
        debug!(pattern, middlewares = chain.len(), "route registered");
        Ok(())
    }

    /// Dispatches `req` to the handler chain whose pattern matches it.
    pub fn dispatch(&self, req: Request) -> BoxFuture {
        self.mux.dispatch(req)
    }
}

// ── Router as a handler ───────────────────────────────────────────────────────

impl<M: Mux> ErasedHandler for Router<M> {
    fn call(&self, req: Request) -> BoxFuture {
        self.dispatch(req)
    }
}

impl<M: Mux> private::Sealed for Router<M> {}

/// A router is itself a handler: it can be served directly or mounted under a
/// pattern of another router.
impl<M: Mux> Handler for Router<M> {
    fn into_boxed_handler(self) -> BoxedHandler {
        Arc::new(self)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use bytes::Bytes;
    use http::{Method, StatusCode};

    use super::*;
    use crate::middleware::{Next, from_fn};
    use crate::response::Response;

    type Log = Arc<Mutex<Vec<String>>>;

    fn request(method: Method, path: &str) -> Request {
        http::Request::builder().method(method).uri(path).body(Bytes::new()).unwrap().into()
    }

    fn record(log: &Log, name: &'static str) -> Middleware {
        let log = Arc::clone(log);
        from_fn(move |req: Request, next: Next| {
            let log = Arc::clone(&log);
            async move {
                log.lock().unwrap().push(name.to_owned());
                let res = next.run(req).await;
                log.lock().unwrap().push(format!("{name}-after"));
                res
            }
        })
    }

    fn logging_handler(log: &Log) -> impl Handler + use<> {
        let log = Arc::clone(log);
        move |_req: Request| {
            log.lock().unwrap().push("H".to_owned());
            async { Response::text("ok") }
        }
    }

    #[tokio::test]
    async fn single_global_middleware() {
        let log = Log::default();
        let app = Router::new()
            .wrap([record(&log, "A")])
            .route("/x", logging_handler(&log));

        let res = app.dispatch(request(Method::GET, "/x")).await;

        assert_eq!(res.status_code(), StatusCode::OK);
        assert_eq!(*log.lock().unwrap(), ["A", "H", "A-after"]);
    }

    #[tokio::test]
    async fn global_then_route_middlewares_nest() {
        let log = Log::default();
        let app = Router::new()
            .wrap([record(&log, "g1")])
            .wrap([record(&log, "g2")])
            .handle("/x", logging_handler(&log), [record(&log, "e1"), record(&log, "e2")]);

        app.dispatch(request(Method::GET, "/x")).await;

        assert_eq!(
            *log.lock().unwrap(),
            ["g1", "g2", "e1", "e2", "H", "e2-after", "e1-after", "g2-after", "g1-after"],
        );
    }

    #[tokio::test]
    async fn later_globals_do_not_reach_earlier_routes() {
        let log = Log::default();
        let app = Router::new()
            .wrap([record(&log, "A")])
            .route("/early", logging_handler(&log))
            .wrap([record(&log, "B")])
            .route("/late", logging_handler(&log));

        app.dispatch(request(Method::GET, "/early")).await;
        assert_eq!(*log.lock().unwrap(), ["A", "H", "A-after"]);

        log.lock().unwrap().clear();
        app.dispatch(request(Method::GET, "/late")).await;
        assert_eq!(*log.lock().unwrap(), ["A", "B", "H", "B-after", "A-after"]);
    }

    #[tokio::test]
    async fn route_middlewares_stay_on_their_route() {
        let log = Log::default();
        let app = Router::new()
            .handle("/guarded", logging_handler(&log), [record(&log, "guard")])
            .route("/open", logging_handler(&log));

        app.dispatch(request(Method::GET, "/open")).await;
        assert_eq!(*log.lock().unwrap(), ["H"]);
    }

    #[tokio::test]
    async fn short_circuit_skips_handler() {
        let log = Log::default();
        let deny = from_fn(|req: Request, next: Next| async move {
            if req.header("authorization").is_none() {
                return Response::status(StatusCode::UNAUTHORIZED);
            }
            next.run(req).await
        });
        let app = Router::new()
            .wrap([record(&log, "A"), deny])
            .route("/x", logging_handler(&log));

        let res = app.dispatch(request(Method::GET, "/x")).await;

        assert_eq!(res.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(*log.lock().unwrap(), ["A", "A-after"]);
    }

    #[tokio::test]
    async fn handler_runs_exactly_once_per_dispatch() {
        let calls = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&calls);
        let app = Router::new()
            .wrap([middleware::trace()])
            .route("/x", move |_req: Request| {
                *counter.lock().unwrap() += 1;
                async { "ok" }
            })
            .route("/y", |_req: Request| async { "other" });

        app.dispatch(request(Method::GET, "/x")).await;
        assert_eq!(*calls.lock().unwrap(), 1);
        app.dispatch(request(Method::GET, "/y")).await;
        assert_eq!(*calls.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn middleware_passes_values_to_handler() {
        #[derive(Clone)]
        struct User(&'static str);

        let auth = from_fn(|mut req: Request, next: Next| {
            req.extensions_mut().insert(User("alice"));
            next.run(req)
        });
        let app = Router::new().handle(
            "GET /me",
            |req: Request| async move {
                req.extensions().get::<User>().map_or("anonymous", |u| u.0).to_owned()
            },
            [auth],
        );

        let res = app.dispatch(request(Method::GET, "/me")).await;
        assert_eq!(res.body().as_ref(), b"alice");
    }

    #[test]
    #[should_panic(expected = "invalid route `/x`")]
    fn duplicate_pattern_panics() {
        let _ = Router::new()
            .route("/x", |_req: Request| async { "one" })
            .route("/x", |_req: Request| async { "two" });
    }

    #[tokio::test]
    async fn try_handle_reports_conflict_and_keeps_first_route() {
        let mut app = Router::new().route("/x", |_req: Request| async { "one" });

        let err = app.try_handle("/x", |_req: Request| async { "two" }, iter::empty()).unwrap_err();
        assert!(matches!(err, Error::Route { .. }));

        let res = app.dispatch(request(Method::GET, "/x")).await;
        assert_eq!(res.body().as_ref(), b"one");
    }

    #[tokio::test]
    async fn router_mounts_as_handler() {
        let log = Log::default();
        let api = Router::new()
            .wrap([record(&log, "api")])
            .route("GET /api/users/{id}", |req: Request| async move {
                format!("user {}", req.param("id").unwrap_or("?"))
            });
        let app = Router::new()
            .wrap([record(&log, "root")])
            .route("/api/{*rest}", api);

        let res = app.dispatch(request(Method::GET, "/api/users/7")).await;

        assert_eq!(res.body().as_ref(), b"user 7");
        assert_eq!(*log.lock().unwrap(), ["root", "api", "api-after", "root-after"]);
    }

    // ── Injected mux ──────────────────────────────────────────────────────────

    #[derive(Default)]
    struct RecordingMux {
        routes: Vec<(String, BoxedHandler)>,
    }

    impl Mux for RecordingMux {
        fn insert(&mut self, pattern: &str, handler: BoxedHandler) -> Result<(), Error> {
            self.routes.push((pattern.to_owned(), handler));
            Ok(())
        }

        fn dispatch(&self, req: Request) -> BoxFuture {
            match self.routes.iter().find(|(p, _)| p == req.path()) {
                Some((_, handler)) => handler.call(req),
                None => Box::pin(async { Response::status(StatusCode::NOT_FOUND) }),
            }
        }
    }

    #[tokio::test]
    async fn injected_mux_receives_composed_handler() {
        let log = Log::default();
        let app = Router::with_mux(RecordingMux::default())
            .wrap([record(&log, "A")])
            .route("/verbatim pattern?", logging_handler(&log))
            .route("/x", logging_handler(&log));

        let patterns: Vec<&str> = app.mux.routes.iter().map(|(p, _)| p.as_str()).collect();
        assert_eq!(patterns, ["/verbatim pattern?", "/x"]);

        let res = app.dispatch(request(Method::GET, "/x")).await;
        assert_eq!(res.status_code(), StatusCode::OK);
        assert_eq!(*log.lock().unwrap(), ["A", "H", "A-after"]);
    }
}
