//! Outbound HTTP Client
//!
//! One pooled `reqwest` client per collaborator. Every request made through
//! it is bounded by the configured timeout.

use std::time::Duration;

/// Connect phase never waits longer than this, even with a larger request budget
const MAX_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Build a client whose requests fail after `timeout`
pub fn build_client(timeout: Duration) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .timeout(timeout)
        .connect_timeout(timeout.min(MAX_CONNECT_TIMEOUT))
        .pool_idle_timeout(Duration::from_secs(90))
        .user_agent(concat!("board/", env!("CARGO_PKG_VERSION")))
        .build()
}
