//! Application Configuration
//!
//! Configuration for the board application layer.

use std::time::Duration;

pub use crate::domain::entity::account::UnlimitedPolicy;

/// Board application configuration
#[derive(Debug, Clone)]
pub struct BoardConfig {
    /// Connects granted at registration
    pub free_connects: u32,
    /// Lifetime of an emailed one-time code
    pub code_ttl: Duration,
    /// Digits per one-time code
    pub code_digits: usize,
    /// Unlimited window bought by one payment
    pub payment_validity: Duration,
    /// Connects added by one payment
    pub payment_connects_grant: u32,
    /// Package price in minor units when the caller names none
    pub payment_amount: i64,
    pub payment_currency: String,
    /// Where the gateway posts payment results
    pub payment_callback_url: String,
    /// HMAC key for the per-payment callback signature (32 bytes)
    pub callback_secret: [u8; 32],
    /// Phone country code, without `+`
    pub phone_country_code: String,
    /// Subscriber digits after the country code
    pub phone_subscriber_digits: usize,
    /// Upper bound for any email or gateway call
    pub outbound_timeout: Duration,
    /// Which grants lift the connects limit
    pub unlimited_policy: UnlimitedPolicy,
    /// Whether a successful password reset also proves email ownership
    pub reset_verifies_email: bool,
    /// Bearer token HMAC key (32 bytes)
    pub session_secret: [u8; 32],
    pub session_ttl: Duration,
    /// Password pepper (optional, application-wide secret)
    pub password_pepper: Option<Vec<u8>>,
    /// Smallest withdrawal in minor units
    pub min_withdrawal: i64,
    /// Product name used in outgoing email
    pub site_name: String,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            free_connects: 3,
            code_ttl: Duration::from_secs(10 * 60),
            code_digits: 6,
            payment_validity: Duration::from_secs(30 * 24 * 3600),
            payment_connects_grant: 8,
            payment_amount: 100,
            payment_currency: "KES".to_string(),
            payment_callback_url: "http://localhost:31113/api/payments/callback".to_string(),
            callback_secret: [0u8; 32],
            phone_country_code: "254".to_string(),
            phone_subscriber_digits: 9,
            outbound_timeout: Duration::from_secs(15),
            unlimited_policy: UnlimitedPolicy::AdminOrPayment,
            reset_verifies_email: true,
            session_secret: [0u8; 32],
            session_ttl: Duration::from_secs(7 * 24 * 3600),
            password_pepper: None,
            min_withdrawal: 1_200,
            site_name: "Remote Jobs".to_string(),
        }
    }
}

impl BoardConfig {
    /// Create config with random session and callback secrets (for development)
    pub fn with_random_secret() -> Self {
        use rand::RngCore;
        let mut session_secret = [0u8; 32];
        let mut callback_secret = [0u8; 32];
        rand::rng().fill_bytes(&mut session_secret);
        rand::rng().fill_bytes(&mut callback_secret);
        Self {
            session_secret,
            callback_secret,
            ..Default::default()
        }
    }

    pub fn code_ttl(&self) -> chrono::Duration {
        to_chrono(self.code_ttl)
    }

    pub fn payment_validity(&self) -> chrono::Duration {
        to_chrono(self.payment_validity)
    }

    pub fn session_ttl_ms(&self) -> i64 {
        to_chrono(self.session_ttl).num_milliseconds()
    }

    /// Get password pepper as slice
    pub fn pepper(&self) -> Option<&[u8]> {
        self.password_pepper.as_deref()
    }
}

fn to_chrono(d: Duration) -> chrono::Duration {
    chrono::Duration::from_std(d).unwrap_or_else(|_| chrono::Duration::days(365 * 100))
}
