//! Platform Crate - Technical Infrastructure
//!
//! Shared technical foundations for the board services:
//! - Cryptographic utilities (HMAC-SHA256, Base64, one-time codes)
//! - Password hashing (Argon2id, NIST SP 800-63B policy)
//! - Timeout-bounded outbound HTTP client

pub mod crypto;
pub mod http;
pub mod password;
