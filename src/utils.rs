// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

use crate::errors::{ProtocolError, Result};
use base64::{engine::general_purpose::STANDARD, Engine};
use rand::{distributions::Alphanumeric, CryptoRng, Rng, RngCore};
use tracing::error;

/// Generate a random string of `len` characters drawn from `[A-Za-z0-9]`
pub(crate) fn random_alphanumeric<R: RngCore + CryptoRng>(rng: &mut R, len: usize) -> String {
    rng.sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Generate `N` random bytes
pub(crate) fn random_bytes<R: RngCore + CryptoRng, const N: usize>(rng: &mut R) -> [u8; N] {
    let mut bytes = [0u8; N];
    rng.fill_bytes(&mut bytes);
    bytes
}

pub(crate) fn to_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

pub(crate) fn from_base64(s: &str) -> Option<Vec<u8>> {
    STANDARD.decode(s).ok()
}

/// Milliseconds since the unix epoch, as carried in `createdAt` fields
pub(crate) fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Decode a hex string into a fixed-size array, naming `what` in the error.
pub(crate) fn decode_hex_array<const N: usize>(s: &str, what: &str) -> Result<[u8; N]> {
    let bytes = hex::decode(s).map_err(|_| {
        error!("{} is not valid hex", what);
        ProtocolError::InvalidArgument(format!("{what} is not valid hex"))
    })?;
    bytes.try_into().map_err(|bytes: Vec<u8>| {
        error!("{} has length {}, expected {}", what, bytes.len(), N);
        ProtocolError::InvalidArgument(format!("{what} must be {N} bytes"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    #[test]
    fn test_random_alphanumeric() {
        let mut rng = OsRng;
        for _ in 0..100 {
            let s = random_alphanumeric(&mut rng, 19);
            assert_eq!(s.len(), 19);
            assert!(s.chars().all(|c| c.is_ascii_alphanumeric()));
        }
        // Statistical check: two draws colliding would mean a broken rng
        assert_ne!(
            random_alphanumeric(&mut rng, 19),
            random_alphanumeric(&mut rng, 19)
        );
    }

    #[test]
    fn test_decode_hex_array() {
        let ok: [u8; 2] = decode_hex_array("beef", "key").unwrap();
        assert_eq!(ok, [0xbe, 0xef]);
        assert!(matches!(
            decode_hex_array::<3>("beef", "key"),
            Err(ProtocolError::InvalidArgument(_))
        ));
        assert!(decode_hex_array::<2>("zz00", "key").is_err());
    }

    #[test]
    fn test_base64() {
        assert_eq!(from_base64(&to_base64(b"hello")).unwrap(), b"hello");
        assert!(from_base64("not base64!").is_none());
    }
}
