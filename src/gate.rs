//! The request interceptor: identity derivation plus the protected-route
//! gate.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, Request, State},
    http::{HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::{info, warn};

use crate::{
    access::{self, Denial},
    config::Config,
    identity::{ClientIdentity, X_ACCESS_ALLOWED_REASON},
};

/// Path prefix guarded by the allow-lists.
pub const PROTECTED_PREFIX: &str = "/api/protected-by-middleware";

#[derive(Debug, Default, Deserialize)]
struct GateQuery {
    #[serde(rename = "allowIp")]
    allow_ip: Option<String>,
}

/// Middleware deriving the caller identity for every request it wraps and
/// enforcing the allow-lists on [`PROTECTED_PREFIX`].
///
/// The identity is attached as a typed extension and as the `x-user-ip` /
/// `x-user-country` request headers; both are mirrored onto the response.
/// Denied requests short-circuit with the structured 403 body.
pub async fn identity_gate(
    State(config): State<Arc<Config>>,
    mut req: Request,
    next: Next,
) -> Response {
    let identity = ClientIdentity::derive(req.headers(), req.extensions());
    info!(ip = %identity.ip, country = %identity.country, "derived client identity");

    let mut reason = None;
    if req.uri().path().starts_with(PROTECTED_PREFIX) {
        let allow_ip = Query::<GateQuery>::try_from_uri(req.uri())
            .map(|Query(query)| query.allow_ip)
            .unwrap_or_default();

        let decision = access::evaluate(
            &config,
            &identity.ip,
            &identity.country,
            allow_ip.as_deref(),
        );
        if !decision.allowed {
            warn!(ip = %identity.ip, country = %identity.country, "access denied");
            let denial = Denial::new(&config, &identity.ip, &identity.country);
            return (StatusCode::FORBIDDEN, Json(denial)).into_response();
        }
        reason = Some(HeaderValue::from_static(decision.reason.as_str()));
    }

    identity.write_headers(req.headers_mut());
    if let Some(reason) = &reason {
        req.headers_mut()
            .insert(X_ACCESS_ALLOWED_REASON, reason.clone());
    }
    req.extensions_mut().insert(identity.clone());

    let mut response = next.run(req).await;
    identity.write_headers(response.headers_mut());
    if let Some(reason) = reason {
        response.headers_mut().insert(X_ACCESS_ALLOWED_REASON, reason);
    }
    response
}
