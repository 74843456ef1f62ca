//! The per-request client identity and its header serialization.
//!
//! The gate derives a [`ClientIdentity`] once, threads it through the
//! request as a typed extension, and serializes it to plain headers only at
//! the transport boundary. Relay handlers read it back through
//! [`RelayedIdentity`], which falls back to the raw headers (and then the
//! sentinels) so they keep working when the gate is not in front of them.

use std::convert::Infallible;

use axum::{
    extract::FromRequestParts,
    http::{Extensions, HeaderMap, HeaderValue, request::Parts},
};

use crate::lookup::{self, COUNTRY_UNKNOWN, IP_UNAVAILABLE};

/// Header carrying the detected client IP to downstream handlers.
pub const X_USER_IP: &str = "x-user-ip";

/// Header carrying the detected country to downstream handlers.
pub const X_USER_COUNTRY: &str = "x-user-country";

/// Header carrying the admission reason on the protected route.
pub const X_ACCESS_ALLOWED_REASON: &str = "x-access-allowed-reason";

/// What the gate knows about the caller, derived once per request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIdentity {
    /// Detected IP, or [`IP_UNAVAILABLE`].
    pub ip: String,
    /// Detected country code, or [`COUNTRY_UNKNOWN`].
    pub country: String,
}

impl ClientIdentity {
    /// Derive the identity from a request, substituting the sentinels.
    pub fn derive(headers: &HeaderMap, extensions: &Extensions) -> Self {
        let ip = lookup::client_ip(headers, extensions)
            .map(|ip| ip.to_string())
            .unwrap_or_else(|| IP_UNAVAILABLE.to_owned());
        let country = lookup::client_country(headers).unwrap_or_else(|| COUNTRY_UNKNOWN.to_owned());
        Self { ip, country }
    }

    /// Serialize the identity into `headers`.
    ///
    /// Values that are not valid header text are left out; the relay side
    /// then substitutes its sentinels.
    pub fn write_headers(&self, headers: &mut HeaderMap) {
        if let Ok(value) = HeaderValue::from_str(&self.ip) {
            headers.insert(X_USER_IP, value);
        }
        if let Ok(value) = HeaderValue::from_str(&self.country) {
            headers.insert(X_USER_COUNTRY, value);
        }
    }
}

/// Identity as relayed by the gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayedIdentity {
    /// `x-user-ip` value, or [`IP_UNAVAILABLE`].
    pub ip: String,
    /// `x-user-country` value, or [`COUNTRY_UNKNOWN`].
    pub country: String,
}

impl<S> FromRequestParts<S> for RelayedIdentity
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(identity) = parts.extensions.get::<ClientIdentity>() {
            return Ok(Self {
                ip: identity.ip.clone(),
                country: identity.country.clone(),
            });
        }
        Ok(Self {
            ip: header_string(&parts.headers, X_USER_IP)
                .unwrap_or_else(|| IP_UNAVAILABLE.to_owned()),
            country: header_string(&parts.headers, X_USER_COUNTRY)
                .unwrap_or_else(|| COUNTRY_UNKNOWN.to_owned()),
        })
    }
}

fn header_string(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|hv| hv.to_str().ok())
        .map(str::to_owned)
}
