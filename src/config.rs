//! Environment-sourced configuration, read once at startup.

use serde::{Deserialize, Deserializer};

use crate::lookup::IP_UNAVAILABLE;

/// Immutable service configuration.
///
/// Parsed from the environment once in `main` and passed explicitly to the
/// gate. The allow-lists keep their configured order and are matched as
/// exact, case-sensitive strings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Config {
    /// `PORT`: port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// `ALLOWED_IPS`: comma-separated IP literals admitted by the gate.
    #[serde(default = "default_allowed_ips", deserialize_with = "comma_list")]
    pub allowed_ips: Vec<String>,

    /// `ALLOWED_COUNTRIES`: comma-separated country codes admitted by the
    /// gate.
    #[serde(
        default = "default_allowed_countries",
        deserialize_with = "comma_list"
    )]
    pub allowed_countries: Vec<String>,
}

impl Config {
    /// Read the configuration from the process environment.
    pub fn from_env() -> Result<Self, envy::Error> {
        envy::from_env()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: default_port(),
            allowed_ips: default_allowed_ips(),
            allowed_countries: default_allowed_countries(),
        }
    }
}

fn default_port() -> u16 {
    3000
}

// "IP not available" is deliberately on the default list: an environment
// where detection fails is admitted. Deployments are expected to set
// ALLOWED_IPS explicitly.
fn default_allowed_ips() -> Vec<String> {
    vec![
        "127.0.0.1".to_owned(),
        "::1".to_owned(),
        IP_UNAVAILABLE.to_owned(),
    ]
}

fn default_allowed_countries() -> Vec<String> {
    vec!["US".to_owned(), "CA".to_owned(), "AU".to_owned()]
}

fn comma_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Ok(raw.split(',').map(|part| part.trim().to_owned()).collect())
}
