//! Hash related utils.

use hmac::Hmac;
use hmac::Mac;
use sha2::Digest;
use sha2::Sha256;

/// Hex encoded SHA256 digest of zero bytes.
///
/// Signing an empty payload must produce exactly this value.
pub const EMPTY_STRING_SHA256: &str =
    "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

/// Hex encoded SHA256 hash.
///
/// Use this function instead of `hex::encode(sha256(content))` can reduce
/// extra copy.
pub fn hex_sha256(content: &[u8]) -> String {
    hex::encode(Sha256::digest(content).as_slice())
}

/// Hex encoded SHA256 digest of a request payload.
///
/// Empty payloads short-circuit to [`EMPTY_STRING_SHA256`] without running
/// the hasher.
pub fn hex_sha256_payload(content: &[u8]) -> String {
    if content.is_empty() {
        return EMPTY_STRING_SHA256.to_string();
    }

    hex_sha256(content)
}

/// HMAC with SHA256 hash.
pub fn hmac_sha256(key: &[u8], content: &[u8]) -> Vec<u8> {
    // SAFETY: HMAC's new_from_slice always returns Ok - it handles any key length
    let mut h = Hmac::<Sha256>::new_from_slice(key).unwrap();
    h.update(content);

    h.finalize().into_bytes().to_vec()
}

/// Hex encoded HMAC with SHA256 hash.
///
/// Use this function instead of `hex::encode(hmac_sha256(key, content))` can
/// reduce extra copy.
pub fn hex_hmac_sha256(key: &[u8], content: &[u8]) -> String {
    // SAFETY: HMAC's new_from_slice always returns Ok - it handles any key length
    let mut h = Hmac::<Sha256>::new_from_slice(key).unwrap();
    h.update(content);

    hex::encode(h.finalize().into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_payload_matches_computed_digest() {
        assert_eq!(hex_sha256_payload(b""), EMPTY_STRING_SHA256);
        assert_eq!(hex_sha256(b""), EMPTY_STRING_SHA256);
    }

    #[test]
    fn test_one_byte_payload_differs_from_empty() {
        assert_ne!(hex_sha256_payload(b"a"), EMPTY_STRING_SHA256);
    }

    #[test]
    fn test_hex_sha256_is_lowercase() {
        let digest = hex_sha256(b"Hello,World!");
        assert_eq!(digest.len(), 64);
        assert!(digest
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
    }
}
