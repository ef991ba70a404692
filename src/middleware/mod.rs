//! Middleware layer.
//!
//! A [`Middleware`] turns a handler into another handler. It is the place for
//! cross-cutting concerns: structured tracing, request-id injection,
//! authentication-header inspection.
//!
//! # Ordering
//!
//! For a route registered with global middlewares `[g1, g2]` and per-route
//! middlewares `[e1]`, the effective chain is `[g1, g2, e1]`. It is applied in
//! reverse, so `g1` ends up outermost:
//!
//! ```text
//! g1 before → g2 before → e1 before → handler → e1 after → g2 after → g1 after
//! ```
//!
//! Any middleware may answer on its own instead of calling [`Next::run`];
//! nothing further inward runs in that case.
//!
//! # Writing one
//!
//! ```rust
//! use whttp::middleware::{self, Next};
//! use whttp::{Request, Response, StatusCode};
//!
//! let require_token = middleware::from_fn(|req: Request, next: Next| async move {
//!     if req.header("authorization").is_none() {
//!         return Response::status(StatusCode::UNAUTHORIZED);
//!     }
//!     next.run(req).await
//! });
//! ```

mod trace;

use std::future::Future;
use std::sync::Arc;

pub use trace::trace;

use crate::handler::{BoxFuture, BoxedHandler, ErasedHandler, Handler};
use crate::request::Request;
use crate::response::IntoResponse;

type WrapFn = dyn Fn(BoxedHandler) -> BoxedHandler + Send + Sync + 'static;

/// A handler-to-handler transformation.
///
/// Cloning is one atomic increment; the router copies the global chain into
/// every route it registers.
#[derive(Clone)]
pub struct Middleware(Arc<WrapFn>);

impl Middleware {
    /// Builds a middleware from a function that receives the inner chain and
    /// returns the handler that wraps it.
    ///
    /// `wrap` runs once per route, at registration time. Most middleware is
    /// easier to write with [`from_fn`].
    pub fn new<F, H>(wrap: F) -> Self
    where
        F: Fn(Next) -> H + Send + Sync + 'static,
        H: Handler,
    {
        Self(Arc::new(move |inner: BoxedHandler| wrap(Next { inner }).into_boxed_handler()))
    }

    pub(crate) fn apply(&self, handler: BoxedHandler) -> BoxedHandler {
        (self.0)(handler)
    }
}

/// Builds a middleware from an async function of the request and the rest of
/// the chain.
pub fn from_fn<F, Fut, R>(f: F) -> Middleware
where
    F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    let f = Arc::new(f);
    Middleware::new(move |next: Next| {
        let f = Arc::clone(&f);
        move |req: Request| (*f)(req, next.clone())
    })
}

/// The remainder of a middleware chain: every middleware further inward, then
/// the route handler.
#[derive(Clone)]
pub struct Next {
    inner: BoxedHandler,
}

impl Next {
    /// Runs the inner chain.
    pub fn run(&self, req: Request) -> BoxFuture {
        self.inner.call(req)
    }
}

/// Applies `chain` to `handler` so that `chain[0]` is outermost.
pub(crate) fn compose(chain: &[Middleware], handler: BoxedHandler) -> BoxedHandler {
    chain.iter().rev().fold(handler, |inner, middleware| middleware.apply(inner))
}
