// routekeeper-api: Async Rust client for the Caddy admin API and its config document

pub mod client;
pub mod error;
pub mod models;
pub mod transport;

pub use client::AdminClient;
pub use error::Error;
pub use models::{
    Apps, AutomaticHttps, AutomationPolicy, CaddyConfig, HttpApp, Route, RouteMatch, Server,
    TlsApp, TlsAutomation,
};
pub use transport::{TlsMode, TransportConfig};
