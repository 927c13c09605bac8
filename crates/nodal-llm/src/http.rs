//! Shared HTTP client construction for consistent timeout and TLS configuration.

use std::time::Duration;

/// Create the HTTP client used by every HTTP-backed provider.
///
/// Config: 30s connect timeout, 300s request timeout (long generations),
/// rustls TLS, `nodal/{version}` user-agent, redirect limit 10.
#[must_use]
pub fn default_client() -> reqwest::Client {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(30))
        .timeout(Duration::from_secs(300))
        .user_agent(concat!("nodal/", env!("CARGO_PKG_VERSION")))
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()
        .unwrap_or_else(|e| {
            tracing::warn!("falling back to default HTTP client: {e}");
            reqwest::Client::new()
        })
}
