//! The access-control predicate for the protected route.

use std::fmt;

use serde::Serialize;

use crate::config::Config;

/// Why a request to the protected route was admitted, or that it wasn't.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessReason {
    /// The detected IP is on the configured allow-list.
    IpAllowlist,
    /// The caller echoed its detected IP in the `allowIp` query parameter.
    TestingOverride,
    /// The detected country is on the configured allow-list.
    CountryAllowlist,
    /// Neither list matched.
    Denied,
}

impl AccessReason {
    /// The wire spelling used in headers and response bodies.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::IpAllowlist => "ip-allowlist",
            Self::TestingOverride => "testing-override",
            Self::CountryAllowlist => "country-allowlist",
            Self::Denied => "denied",
        }
    }
}

impl fmt::Display for AccessReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of evaluating the predicate for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessDecision {
    /// Whether the request may proceed.
    pub allowed: bool,
    /// The recorded justification.
    pub reason: AccessReason,
}

/// Decide whether a caller with the given identity may access the protected
/// route.
///
/// The `allow_ip` override admits any caller that echoes its own detected
/// IP back in the query string. It is a testing convenience the UI relies
/// on, not a security control.
pub fn evaluate(
    config: &Config,
    ip: &str,
    country: &str,
    allow_ip: Option<&str>,
) -> AccessDecision {
    let override_matches = allow_ip.is_some_and(|param| param == ip);
    let ip_allowed = override_matches || config.allowed_ips.iter().any(|allowed| allowed == ip);
    let country_allowed = config
        .allowed_countries
        .iter()
        .any(|allowed| allowed == country);

    if !ip_allowed && !country_allowed {
        return AccessDecision {
            allowed: false,
            reason: AccessReason::Denied,
        };
    }

    let reason = if override_matches {
        AccessReason::TestingOverride
    } else if ip_allowed {
        AccessReason::IpAllowlist
    } else {
        AccessReason::CountryAllowlist
    };
    AccessDecision {
        allowed: true,
        reason,
    }
}

/// The stable 403 body returned when the gate rejects a request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Denial {
    /// Always `"Access denied"`.
    pub error: &'static str,
    /// Human-readable explanation.
    pub message: &'static str,
    /// The detected IP the decision was made for.
    pub ip: String,
    /// The detected country the decision was made for.
    pub country: String,
    /// The configured IP allow-list, in order.
    pub allowed_ips: Vec<String>,
    /// The configured country allow-list, in order.
    pub allowed_countries: Vec<String>,
    /// How to use the testing override for this caller.
    pub note: String,
}

impl Denial {
    /// Build the denial body for an identity under `config`.
    pub fn new(config: &Config, ip: &str, country: &str) -> Self {
        Self {
            error: "Access denied",
            message: "Your IP or country is not allowed to access this resource",
            ip: ip.to_owned(),
            country: country.to_owned(),
            allowed_ips: config.allowed_ips.clone(),
            allowed_countries: config.allowed_countries.clone(),
            note: format!("For testing, add ?allowIp={ip} to the URL to allow your current IP"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{AccessReason, evaluate};
    use crate::config::Config;

    #[test]
    fn allow_listed_ip() {
        let decision = evaluate(&Config::default(), "127.0.0.1", "DE", None);
        assert!(decision.allowed);
        assert_eq!(decision.reason, AccessReason::IpAllowlist);
    }

    #[test]
    fn unavailable_ip_is_allow_listed_by_default() {
        let decision = evaluate(&Config::default(), "IP not available", "Unknown", None);
        assert!(decision.allowed);
        assert_eq!(decision.reason, AccessReason::IpAllowlist);
    }

    #[test]
    fn matching_override_wins_over_the_ip_list() {
        let decision = evaluate(&Config::default(), "127.0.0.1", "DE", Some("127.0.0.1"));
        assert!(decision.allowed);
        assert_eq!(decision.reason, AccessReason::TestingOverride);
    }

    #[test]
    fn override_admits_an_unlisted_ip() {
        let decision = evaluate(&Config::default(), "203.0.113.5", "DE", Some("203.0.113.5"));
        assert!(decision.allowed);
        assert_eq!(decision.reason, AccessReason::TestingOverride);
    }

    #[test]
    fn mismatched_override_does_not_admit() {
        let decision = evaluate(&Config::default(), "203.0.113.5", "DE", Some("198.51.100.1"));
        assert!(!decision.allowed);
        assert_eq!(decision.reason, AccessReason::Denied);
    }

    #[test]
    fn country_admits_past_ip_denial() {
        let decision = evaluate(&Config::default(), "198.51.100.1", "US", None);
        assert!(decision.allowed);
        assert_eq!(decision.reason, AccessReason::CountryAllowlist);
    }

    #[test]
    fn country_match_is_case_sensitive() {
        let decision = evaluate(&Config::default(), "198.51.100.1", "us", None);
        assert!(!decision.allowed);
    }

    #[test]
    fn nothing_matches() {
        let decision = evaluate(&Config::default(), "198.51.100.1", "DE", None);
        assert!(!decision.allowed);
        assert_eq!(decision.reason, AccessReason::Denied);
    }

    #[test]
    fn denial_echoes_configuration() {
        let config = Config::default();
        let denial = super::Denial::new(&config, "198.51.100.1", "DE");
        assert_eq!(denial.error, "Access denied");
        assert_eq!(denial.allowed_ips, config.allowed_ips);
        assert_eq!(denial.allowed_countries, config.allowed_countries);
        assert!(denial.note.contains("allowIp=198.51.100.1"));
    }
}
