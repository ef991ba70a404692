//! # whttp
//!
//! A path router with ordered middleware. Nothing more.
//!
//! ## The contract
//!
//! whttp does not parse HTTP, match paths, or manage connections. hyper owns
//! the wire, matchit owns the radix trees. What is left is one piece of
//! logic: wrapping every handler in the right middleware, in the right order.
//!
//! - **Global middleware**: [`Router::wrap`], applied to every route
//!   registered afterwards.
//! - **Per-route middleware**: the last argument of [`Router::handle`],
//!   applied inside the global chain.
//! - **First registered runs first**: `wrap([a, b])` then
//!   `handle(p, h, [c])` runs `a → b → c → h` and unwinds `c → b → a`.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use whttp::middleware::{self, Next};
//! use whttp::{Request, Response, Router, Server, StatusCode};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), whttp::Error> {
//!     let require_token = middleware::from_fn(|req: Request, next: Next| async move {
//!         if req.header("authorization").is_none() {
//!             return Response::status(StatusCode::UNAUTHORIZED);
//!         }
//!         next.run(req).await
//!     });
//!
//!     let app = Router::new()
//!         .wrap([middleware::trace()])
//!         .route("GET /users/{id}", get_user)
//!         .handle("POST /users", create_user, [require_token]);
//!
//!     Server::bind("0.0.0.0:3000")?.serve(app).await
//! }
//!
//! async fn get_user(req: Request) -> Response {
//!     let id = req.param("id").unwrap_or("unknown");
//!     Response::json(format!(r#"{{"id":"{id}"}}"#))
//! }
//!
//! async fn create_user(req: Request) -> Response {
//!     if req.body().is_empty() {
//!         return Response::status(StatusCode::BAD_REQUEST);
//!     }
//!     Response::builder()
//!         .status(StatusCode::CREATED)
//!         .header("location", "/users/99")
//!         .json(r#"{"id":"99"}"#)
//! }
//! ```

mod error;
mod handler;
mod mux;
mod request;
mod response;
mod router;
mod server;

pub mod middleware;

pub use error::Error;
pub use handler::{BoxFuture, BoxedHandler, ErasedHandler, Handler};
pub use http::{Method, StatusCode};
pub use middleware::{Middleware, Next};
pub use mux::{MatchitMux, Mux};
pub use request::Request;
pub use response::{ContentType, IntoResponse, Response, ResponseBuilder};
pub use router::Router;
pub use server::Server;
