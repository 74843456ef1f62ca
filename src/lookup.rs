//! IP and country lookup primitives.
//!
//! Nothing here ever rejects a request: every accessor returns an `Option`
//! and the response boundary substitutes the sentinel strings.

use std::{
    convert::Infallible,
    net::{IpAddr, SocketAddr},
};

use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::{Extensions, HeaderMap, request::Parts},
};

pub(crate) const X_REAL_IP: &str = "X-Real-Ip";
pub(crate) const X_FORWARDED_FOR: &str = "X-Forwarded-For";
pub(crate) const FORWARDED: &str = "Forwarded";
pub(crate) const CF_IPCOUNTRY: &str = "Cf-Ipcountry";
pub(crate) const X_GEO_COUNTRY: &str = "X-Geo-Country";

/// Substituted when no source yields a client IP.
pub const IP_UNAVAILABLE: &str = "IP not available";

/// Substituted when no geo header names a country.
pub const COUNTRY_UNKNOWN: &str = "Unknown";

trait SingleIpHeader {
    const HEADER: &'static str;

    fn maybe_ip_from_headers(headers: &HeaderMap) -> Option<IpAddr> {
        headers
            .get(Self::HEADER)
            .and_then(|hv| hv.to_str().ok())
            .and_then(|s| s.parse::<IpAddr>().ok())
    }
}

trait MultiIpHeader {
    const HEADER: &'static str;

    fn ips_from_header_value(header_value: &str) -> Vec<IpAddr>;

    fn maybe_leftmost_ip(headers: &HeaderMap) -> Option<IpAddr> {
        headers
            .get_all(Self::HEADER)
            .iter()
            .filter_map(|hv| hv.to_str().ok())
            .flat_map(Self::ips_from_header_value)
            .next()
    }
}

struct XRealIp;
struct XForwardedFor;
struct Forwarded;

impl SingleIpHeader for XRealIp {
    const HEADER: &'static str = X_REAL_IP;
}

impl MultiIpHeader for XForwardedFor {
    const HEADER: &'static str = X_FORWARDED_FOR;

    fn ips_from_header_value(header_value: &str) -> Vec<IpAddr> {
        header_value
            .split(',')
            .filter_map(|s| s.trim().parse::<IpAddr>().ok())
            .collect()
    }
}

impl MultiIpHeader for Forwarded {
    const HEADER: &'static str = FORWARDED;

    fn ips_from_header_value(header_value: &str) -> Vec<IpAddr> {
        use forwarded_header_value::{ForwardedHeaderValue, Identifier};

        let Ok(fv) = ForwardedHeaderValue::from_forwarded(header_value) else {
            return Vec::new();
        };
        fv.iter()
            .filter_map(|fs| fs.forwarded_for.as_ref())
            .filter_map(|ff| match ff {
                Identifier::SocketAddr(a) => Some(a.ip()),
                Identifier::IpAddr(ip) => Some(*ip),
                _ => None,
            })
            .collect()
    }
}

/// The "platform helper" lookup: leftmost forwarding-header IP first, then
/// the socket peer address.
pub fn client_ip(headers: &HeaderMap, extensions: &Extensions) -> Option<IpAddr> {
    XForwardedFor::maybe_leftmost_ip(headers)
        .or_else(|| Forwarded::maybe_leftmost_ip(headers))
        .or_else(|| XRealIp::maybe_ip_from_headers(headers))
        .or_else(|| peer_ip(extensions))
}

/// IP of the connected socket, ignoring forwarding headers entirely.
pub fn peer_ip(extensions: &Extensions) -> Option<IpAddr> {
    extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
}

/// Country code from the edge geo headers, verbatim.
pub fn client_country(headers: &HeaderMap) -> Option<String> {
    [CF_IPCOUNTRY, X_GEO_COUNTRY].iter().find_map(|name| {
        headers
            .get(*name)
            .and_then(|hv| hv.to_str().ok())
            .map(str::to_owned)
    })
}

/// Extractor for the platform-helper lookup chain.
#[derive(Debug, Clone, Copy)]
pub struct LookupIp(pub Option<IpAddr>);

impl<S> FromRequestParts<S> for LookupIp
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(client_ip(&parts.headers, &parts.extensions)))
    }
}

/// Extractor for the socket peer address.
#[derive(Debug, Clone, Copy)]
pub struct PeerIp(pub Option<IpAddr>);

impl<S> FromRequestParts<S> for PeerIp
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(peer_ip(&parts.extensions)))
    }
}

#[cfg(test)]
mod tests {
    use axum::{
        Router,
        body::Body,
        extract::ConnectInfo,
        http::Request,
        response::Response,
        routing::get,
    };
    use tower::ServiceExt;

    use super::{LookupIp, PeerIp};

    fn app() -> Router {
        Router::new()
            .route(
                "/lookup",
                get(|LookupIp(ip): LookupIp| async move { format!("{ip:?}") }),
            )
            .route(
                "/peer",
                get(|PeerIp(ip): PeerIp| async move { format!("{ip:?}") }),
            )
    }

    async fn body_string(res: Response) -> String {
        use http_body_util::BodyExt;

        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8_lossy(&bytes).into()
    }

    #[tokio::test]
    async fn x_forwarded_for_leftmost() {
        let req = Request::builder()
            .uri("/lookup")
            .header("X-Forwarded-For", "1.1.1.1, 2.2.2.2")
            .body(Body::empty())
            .unwrap();
        let res = app().oneshot(req).await.unwrap();
        assert_eq!(body_string(res).await, "Some(1.1.1.1)");
    }

    #[tokio::test]
    async fn x_forwarded_for_skips_garbage() {
        let req = Request::builder()
            .uri("/lookup")
            .header("X-Forwarded-For", "foo, 2001:db8:85a3:8d3:1319:8a2e:370:7348")
            .body(Body::empty())
            .unwrap();
        let res = app().oneshot(req).await.unwrap();
        assert_eq!(
            body_string(res).await,
            "Some(2001:db8:85a3:8d3:1319:8a2e:370:7348)"
        );
    }

    #[tokio::test]
    async fn forwarded_header() {
        let req = Request::builder()
            .uri("/lookup")
            .header("Forwarded", r#"For="[2001:db8:cafe::17]:4711""#)
            .body(Body::empty())
            .unwrap();
        let res = app().oneshot(req).await.unwrap();
        assert_eq!(body_string(res).await, "Some(2001:db8:cafe::17)");
    }

    #[tokio::test]
    async fn x_real_ip() {
        let req = Request::builder()
            .uri("/lookup")
            .header("X-Real-Ip", "1.2.3.4")
            .body(Body::empty())
            .unwrap();
        let res = app().oneshot(req).await.unwrap();
        assert_eq!(body_string(res).await, "Some(1.2.3.4)");
    }

    #[tokio::test]
    async fn no_source_yields_none() {
        let req = Request::builder()
            .uri("/lookup")
            .body(Body::empty())
            .unwrap();
        let res = app().oneshot(req).await.unwrap();
        assert_eq!(body_string(res).await, "None");
    }

    #[tokio::test]
    async fn peer_ignores_headers() {
        let mut req = Request::builder()
            .uri("/peer")
            .header("X-Forwarded-For", "1.1.1.1")
            .body(Body::empty())
            .unwrap();
        req.extensions_mut()
            .insert(ConnectInfo(std::net::SocketAddr::from(([9, 9, 9, 9], 80))));
        let res = app().oneshot(req).await.unwrap();
        assert_eq!(body_string(res).await, "Some(9.9.9.9)");
    }

    #[tokio::test]
    async fn country_prefers_cf_header() {
        use axum::http::HeaderMap;

        let mut headers = HeaderMap::new();
        headers.insert("Cf-Ipcountry", "DE".parse().unwrap());
        headers.insert("X-Geo-Country", "US".parse().unwrap());
        assert_eq!(super::client_country(&headers).as_deref(), Some("DE"));

        let mut headers = HeaderMap::new();
        headers.insert("X-Geo-Country", "AU".parse().unwrap());
        assert_eq!(super::client_country(&headers).as_deref(), Some("AU"));

        assert_eq!(super::client_country(&HeaderMap::new()), None);
    }
}
