//! JSON handlers for the four lookup routes, plus the demo page.

use axum::{Json, http::HeaderMap, response::Html};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use tracing::debug;

use crate::{
    identity::{RelayedIdentity, X_ACCESS_ALLOWED_REASON},
    lookup::{IP_UNAVAILABLE, LookupIp, PeerIp},
};

fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Body returned by the two plain lookup routes.
#[derive(Debug, Serialize)]
pub struct LookupBody {
    /// Detected IP, or the sentinel.
    pub ip: String,
    /// Which lookup produced the IP.
    pub method: &'static str,
    /// ISO-8601 response time.
    pub timestamp: String,
}

/// `GET /api/direct-ip` - the platform-helper lookup chain.
pub async fn direct_ip(LookupIp(ip): LookupIp) -> Json<LookupBody> {
    let ip = ip
        .map(|ip| ip.to_string())
        .unwrap_or_else(|| IP_UNAVAILABLE.to_owned());
    debug!(%ip, "direct lookup");
    Json(LookupBody {
        ip,
        method: "Direct lookup via forwarding headers",
        timestamp: timestamp(),
    })
}

/// `GET /api/edge-ip` - the socket peer address, no header inspection.
pub async fn edge_ip(PeerIp(ip): PeerIp) -> Json<LookupBody> {
    let ip = ip
        .map(|ip| ip.to_string())
        .unwrap_or_else(|| IP_UNAVAILABLE.to_owned());
    debug!(%ip, "edge lookup");
    Json(LookupBody {
        ip,
        method: "Socket peer address",
        timestamp: timestamp(),
    })
}

/// Body returned by the header-relay route.
#[derive(Debug, Serialize)]
pub struct RelayBody {
    /// Relayed IP, or the sentinel.
    pub ip: String,
    /// Relayed country, or the sentinel.
    pub country: String,
    /// Which lookup produced the values.
    pub method: &'static str,
    /// ISO-8601 response time.
    pub timestamp: String,
}

/// `GET /api/middleware-ip` - reads the gate-attached headers verbatim.
pub async fn middleware_ip(identity: RelayedIdentity) -> Json<RelayBody> {
    debug!(ip = %identity.ip, country = %identity.country, "relay lookup");
    Json(RelayBody {
        ip: identity.ip,
        country: identity.country,
        method: "Middleware-attached headers",
        timestamp: timestamp(),
    })
}

/// Body returned by the protected route on admission.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtectedBody {
    /// Relayed IP, or the sentinel.
    pub ip: String,
    /// Relayed country, or the sentinel.
    pub country: String,
    /// Which lookup produced the values.
    pub method: &'static str,
    /// ISO-8601 response time.
    pub timestamp: String,
    /// Explanation of the admission.
    pub message: String,
    /// The admission reason recorded by the gate.
    pub access_reason: String,
}

/// `GET /api/protected-by-middleware` - only reachable through the gate.
pub async fn protected(identity: RelayedIdentity, headers: HeaderMap) -> Json<ProtectedBody> {
    let access_reason = headers
        .get(X_ACCESS_ALLOWED_REASON)
        .and_then(|hv| hv.to_str().ok())
        .unwrap_or("unknown")
        .to_owned();
    debug!(
        ip = %identity.ip,
        country = %identity.country,
        reason = %access_reason,
        "protected lookup"
    );
    Json(ProtectedBody {
        ip: identity.ip,
        country: identity.country,
        method: "Protected route behind the middleware gate",
        timestamp: timestamp(),
        message: format!(
            "This route is protected by IP and country allow-lists. Access granted via: {access_reason}"
        ),
        access_reason,
    })
}

/// `GET /` - the demo page driving the four endpoints.
pub async fn index() -> Html<&'static str> {
    Html(include_str!("../static/index.html"))
}

#[cfg(test)]
mod tests {
    use chrono::DateTime;

    #[test]
    fn timestamps_are_rfc3339_utc() {
        let ts = super::timestamp();
        let parsed = DateTime::parse_from_rfc3339(&ts).unwrap();
        assert_eq!(parsed.offset().local_minus_utc(), 0);
        assert!(ts.ends_with('Z'));
    }
}
