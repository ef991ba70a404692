//! Minimal whttp example: global tracing, a per-route auth check, and
//! CRUD-style JSON endpoints.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example basic
//!
//! Try:
//!   curl http://localhost:3000/users/42
//!   curl -X POST http://localhost:3000/users -d '{"name":"alice"}'
//!   curl -X POST http://localhost:3000/users \
//!        -H 'authorization: Bearer demo' \
//!        -d '{"name":"alice"}'
//!   curl -X DELETE http://localhost:3000/users/42

use whttp::middleware::{self, Next};
use whttp::{Request, Response, Router, Server, StatusCode};

#[tokio::main]
async fn main() -> Result<(), whttp::Error> {
    tracing_subscriber::fmt::init();

    let require_token = middleware::from_fn(|req: Request, next: Next| async move {
        if req.header("authorization").is_none() {
            return Response::status(StatusCode::UNAUTHORIZED);
        }
        next.run(req).await
    });

    let app = Router::new()
        .wrap([middleware::trace(), middleware::from_fn(server_header)])
        .route("GET /users/{id}", get_user)
        .handle("POST /users", create_user, [require_token.clone()])
        .handle("DELETE /users/{id}", delete_user, [require_token]);

    Server::bind("0.0.0.0:3000")?.serve(app).await
}

// Stamps every response on the way out.
async fn server_header(req: Request, next: Next) -> Response {
    let mut res = next.run(req).await;
    res.set_header("server", "whttp-demo");
    res
}

// GET /users/{id}
async fn get_user(req: Request) -> Response {
    let id = req.param("id").unwrap_or("unknown");
    Response::json(format!(r#"{{"id":"{id}","name":"alice"}}"#))
}

// POST /users
async fn create_user(req: Request) -> Response {
    if req.body().is_empty() {
        return Response::status(StatusCode::BAD_REQUEST);
    }

    Response::builder()
        .status(StatusCode::CREATED)
        .header("location", "/users/99")
        .json(r#"{"id":"99","name":"new_user"}"#)
}

// DELETE /users/{id} → 204 No Content
async fn delete_user(_req: Request) -> StatusCode {
    StatusCode::NO_CONTENT
}
