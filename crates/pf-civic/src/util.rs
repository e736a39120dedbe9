use std::time::Duration;

/// Identifies this library to upstream services. Nominatim rejects requests without one.
pub const USER_AGENT: &str = concat!("pf-civic/", env!("CARGO_PKG_VERSION"));

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub fn default_http_client() -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .gzip(true)
        .brotli(true)
        .user_agent(USER_AGENT)
        .timeout(REQUEST_TIMEOUT)
        .build()
}
