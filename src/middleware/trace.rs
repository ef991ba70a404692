//! Per-request tracing.

use std::time::Instant;

use tracing::{Instrument, info, info_span};

use super::{Middleware, Next, from_fn};
use crate::request::Request;

/// Opens a span carrying the method and path for each request, and logs the
/// response status and latency when the inner chain returns.
///
/// Register it first so the span covers every other middleware:
///
/// ```rust
/// use whttp::{Router, middleware};
///
/// let app = Router::new().wrap([middleware::trace()]);
/// ```
pub fn trace() -> Middleware {
    from_fn(|req: Request, next: Next| async move {
        let span = info_span!("request", method = %req.method(), path = %req.path());
        let start = Instant::now();

        let res = next.run(req).instrument(span.clone()).await;

        span.in_scope(|| {
            info!(
                status = res.status_code().as_u16(),
                latency = ?start.elapsed(),
                "request completed"
            );
        });
        res
    })
}
