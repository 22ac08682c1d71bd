// frontity-api: Async Rust client for the WordPress REST API (self-hosted + WordPress.com)

pub mod client;
pub mod endpoints;
pub mod error;
pub mod transport;

pub use client::{RedirectHop, WpClient, WpResponse};
pub use endpoints::ListParams;
pub use error::Error;
pub use transport::{TlsMode, TransportConfig};

/// Host serving the WordPress.com REST API for hosted sites.
pub const WP_COM_API_HOST: &str = "public-api.wordpress.com";
