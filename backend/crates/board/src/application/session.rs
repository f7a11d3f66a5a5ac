//! Session Tokens
//!
//! Stateless bearer tokens: `<account_id>.<session_version>.<expires_at_ms>.<signature>`,
//! where the signature is HMAC-SHA256 over the first three parts, base64url
//! without padding. A token is only honoured while its version matches the
//! account's, so bumping the version revokes every earlier token.

use chrono::{DateTime, Utc};
use kernel::id::AccountId;
use platform::crypto::{from_base64_url, hmac_sha256, to_base64_url, verify_hmac_sha256};

use crate::application::config::BoardConfig;
use crate::error::{BoardError, BoardResult};

/// Freshly signed token
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at_ms: i64,
}

/// What a verified token asserts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionClaims {
    pub account_id: AccountId,
    pub session_version: u32,
}

pub fn issue_token(
    config: &BoardConfig,
    account_id: &AccountId,
    session_version: u32,
    now: DateTime<Utc>,
) -> IssuedToken {
    let expires_at_ms = now.timestamp_millis() + config.session_ttl_ms();
    let payload = format!("{}.{}.{}", account_id, session_version, expires_at_ms);
    let signature = hmac_sha256(&config.session_secret, payload.as_bytes());

    IssuedToken {
        token: format!("{}.{}", payload, to_base64_url(&signature)),
        expires_at_ms,
    }
}

/// Check signature and expiry. The caller still has to compare the
/// version with the stored account.
pub fn verify_token(
    config: &BoardConfig,
    token: &str,
    now: DateTime<Utc>,
) -> BoardResult<SessionClaims> {
    let (payload, signature_b64) = token.rsplit_once('.').ok_or(BoardError::Unauthenticated)?;
    let signature = from_base64_url(signature_b64).map_err(|_| BoardError::Unauthenticated)?;

    if !verify_hmac_sha256(&config.session_secret, payload.as_bytes(), &signature) {
        return Err(BoardError::Unauthenticated);
    }

    let mut parts = payload.splitn(3, '.');
    let (Some(account_id), Some(version), Some(expires_at_ms)) =
        (parts.next(), parts.next(), parts.next())
    else {
        return Err(BoardError::Unauthenticated);
    };

    let expires_at_ms: i64 = expires_at_ms
        .parse()
        .map_err(|_| BoardError::Unauthenticated)?;
    if now.timestamp_millis() >= expires_at_ms {
        return Err(BoardError::Unauthenticated);
    }

    Ok(SessionClaims {
        account_id: account_id.parse().map_err(|_| BoardError::Unauthenticated)?,
        session_version: version.parse().map_err(|_| BoardError::Unauthenticated)?,
    })
}
