//! Four ways to obtain a client's IP address in an axum service, plus a
//! middleware gate that admits requests to a protected route by IP or
//! country allow-list.
//!
//! The four lookups, each echoed back as JSON:
//!
//! - `/api/direct-ip` - forwarding-header chain (`X-Forwarded-For`,
//!   `Forwarded`, `X-Real-Ip`), falling back to the socket peer address
//! - `/api/edge-ip` - the socket peer address only
//! - `/api/middleware-ip` - the `x-user-ip` / `x-user-country` headers the
//!   gate attached
//! - `/api/protected-by-middleware` - the same headers plus the recorded
//!   admission reason; unlisted callers get a structured 403
//!
//! Failed detection never errors: the lookups substitute the sentinel
//! strings [`IP_UNAVAILABLE`] and [`COUNTRY_UNKNOWN`] instead.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::net::SocketAddr;
//!
//! use ip_gate::{Config, app};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = Config::default();
//!     let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port))
//!         .await
//!         .unwrap();
//!
//!     axum::serve(
//!         listener,
//!         // `ConnectInfo` feeds the socket-peer lookup
//!         app(config).into_make_service_with_connect_info::<SocketAddr>(),
//!     )
//!     .await
//!     .unwrap()
//! }
//! ```

pub mod access;
pub mod app;
pub mod config;
pub mod gate;
pub mod handlers;
pub mod identity;
pub mod lookup;

pub use access::{AccessDecision, AccessReason, Denial, evaluate};
pub use app::app;
pub use config::Config;
pub use gate::{PROTECTED_PREFIX, identity_gate};
pub use identity::{ClientIdentity, RelayedIdentity};
pub use lookup::{COUNTRY_UNKNOWN, IP_UNAVAILABLE, LookupIp, PeerIp};
