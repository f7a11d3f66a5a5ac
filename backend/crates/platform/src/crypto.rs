//! Cryptographic Utilities

use base64::{Engine, engine::general_purpose};
use hmac::{Hmac, Mac};
use rand::{Rng, rngs::OsRng};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Generate a zero-padded numeric one-time code (e.g. "042917")
///
/// Every digit is drawn uniformly from the OS RNG, so leading zeros are as
/// likely as any other digit.
pub fn random_numeric_code(digits: usize) -> String {
    let mut rng = OsRng;
    (0..digits)
        .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
        .collect()
}

/// Encode bytes as URL-safe base64 without padding
pub fn to_base64_url(bytes: &[u8]) -> String {
    general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

/// Decode URL-safe base64 without padding
pub fn from_base64_url(s: &str) -> Result<Vec<u8>, base64::DecodeError> {
    general_purpose::URL_SAFE_NO_PAD.decode(s)
}

/// Decode standard base64 (used for secrets read from the environment)
pub fn from_base64(s: &str) -> Result<Vec<u8>, base64::DecodeError> {
    general_purpose::STANDARD.decode(s)
}

/// Compute HMAC-SHA256
pub fn hmac_sha256(key: &[u8], data: &[u8]) -> [u8; 32] {
    // HMAC accepts keys of any length
    let mut mac = <HmacSha256 as Mac>::new_from_slice(key).unwrap_or_else(|_| unreachable!());
    mac.update(data);
    mac.finalize().into_bytes().into()
}

/// Verify an HMAC-SHA256 tag in constant time
pub fn verify_hmac_sha256(key: &[u8], data: &[u8], tag: &[u8]) -> bool {
    let Ok(mut mac) = <HmacSha256 as Mac>::new_from_slice(key) else {
        return false;
    };
    mac.update(data);
    mac.verify_slice(tag).is_ok()
}

/// Constant-time comparison to prevent timing attacks
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_numeric_code_shape() {
        for _ in 0..100 {
            let code = random_numeric_code(6);
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_random_numeric_code_varies() {
        let codes: std::collections::HashSet<String> =
            (0..50).map(|_| random_numeric_code(6)).collect();
        // 50 draws from 10^6 values colliding down to one is not plausible
        assert!(codes.len() > 1);
    }

    #[test]
    fn test_from_base64_standard_alphabet() {
        assert_eq!(from_base64("+/8=").unwrap(), vec![0xfb, 0xff]);
        assert!(from_base64("-_8").is_err());
    }

    #[test]
    fn test_base64_url_roundtrip() {
        let data = b"\xfb\xff account";
        let encoded = to_base64_url(data);
        assert!(!encoded.contains('+') && !encoded.contains('/') && !encoded.contains('='));
        assert_eq!(from_base64_url(&encoded).unwrap(), data);
    }

    #[test]
    fn test_hmac_rfc4231_case_2() {
        let mac = hmac_sha256(b"Jefe", b"what do ya want for nothing?");
        let expected =
            hex::decode("5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843")
                .unwrap();
        assert_eq!(mac.to_vec(), expected);
    }

    #[test]
    fn test_verify_hmac() {
        let key = [7u8; 32];
        let tag = hmac_sha256(&key, b"account.1700000000000");
        assert!(verify_hmac_sha256(&key, b"account.1700000000000", &tag));
        assert!(!verify_hmac_sha256(&key, b"account.1700000000001", &tag));
        assert!(!verify_hmac_sha256(&[8u8; 32], b"account.1700000000000", &tag));
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"042917", b"042917"));
        assert!(!constant_time_eq(b"042917", b"042918"));
        assert!(!constant_time_eq(b"04291", b"042917"));
    }
}
