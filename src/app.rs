//! Router assembly.

use std::sync::Arc;

use axum::{Router, middleware, routing::get};
use tower_http::trace::TraceLayer;

use crate::{config::Config, gate, handlers};

/// Build the service router.
///
/// The identity gate wraps only `/api/middleware-ip` and the protected
/// prefix; the direct and edge lookups stay outside it and never see the
/// identity headers.
pub fn app(config: Config) -> Router {
    let config = Arc::new(config);

    let gated = Router::new()
        .route("/api/middleware-ip", get(handlers::middleware_ip))
        .route("/api/protected-by-middleware", get(handlers::protected))
        .route(
            "/api/protected-by-middleware/{*rest}",
            get(handlers::protected),
        )
        .route_layer(middleware::from_fn_with_state(config, gate::identity_gate));

    Router::new()
        .route("/", get(handlers::index))
        .route("/api/direct-ip", get(handlers::direct_ip))
        .route("/api/edge-ip", get(handlers::edge_ip))
        .merge(gated)
        .layer(TraceLayer::new_for_http())
}
