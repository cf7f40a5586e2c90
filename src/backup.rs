// Copyright (c) 2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

//! Decoding of key share backups held by the paired device.
//!
//! A backup blob is `base64(nonce || ciphertext)`, where the ciphertext is the
//! JSON encoded [`DistributedKeyShare`] sealed with XChaCha20-Poly1305 under
//! a 32-byte backup key that never leaves this party.

use crate::{
    errors::{ProtocolError, Result},
    keyshare::DistributedKeyShare,
    parameters::{BACKUP_KEY_BYTES, BOX_NONCE_BYTES},
    utils::{from_base64, random_bytes, to_base64},
};
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    Key, XChaCha20Poly1305, XNonce,
};
use rand::rngs::OsRng;
use tracing::{error, instrument};
use zeroize::Zeroizing;

/// Poly1305 tag size; anything shorter than nonce plus tag cannot be a backup.
const TAG_BYTES: usize = 16;

/// Encodes and decodes key share backups under one backup key.
pub struct BackupCodec {
    key: Zeroizing<[u8; BACKUP_KEY_BYTES]>,
}

impl BackupCodec {
    /// Creates a codec for the given backup key.
    pub fn new(key: [u8; BACKUP_KEY_BYTES]) -> Self {
        Self {
            key: Zeroizing::new(key),
        }
    }

    /// Creates a codec with a freshly drawn backup key.
    pub fn random() -> Self {
        Self::new(random_bytes::<_, BACKUP_KEY_BYTES>(&mut OsRng))
    }

    fn cipher(&self) -> XChaCha20Poly1305 {
        XChaCha20Poly1305::new(Key::from_slice(self.key.as_slice()))
    }

    /// Seals `share` into a backup blob.
    pub fn encode(&self, share: &DistributedKeyShare) -> Result<String> {
        let plaintext = Zeroizing::new(
            serde_json::to_vec(share).or(Err(ProtocolError::Serialization))?,
        );
        let nonce = random_bytes::<_, BOX_NONCE_BYTES>(&mut OsRng);
        let ciphertext = self
            .cipher()
            .encrypt(XNonce::from_slice(&nonce), plaintext.as_slice())
            .map_err(|_| ProtocolError::InternalLibError("backup encryption failed".into()))?;
        Ok(to_base64(&[nonce.as_slice(), &ciphertext].concat()))
    }

    /// Opens and parses a backup blob. Every failure is
    /// [`ProtocolError::InvalidBackupData`]; there is no partial result.
    #[instrument(skip_all, err(Debug))]
    pub fn decode(&self, backup_blob: &str) -> Result<DistributedKeyShare> {
        let raw = from_base64(backup_blob).ok_or_else(|| invalid("backup is not base64"))?;
        if raw.len() < BOX_NONCE_BYTES + TAG_BYTES {
            return Err(invalid("backup is too short"));
        }
        let (nonce, ciphertext) = raw.split_at(BOX_NONCE_BYTES);
        let plaintext = Zeroizing::new(
            self.cipher()
                .decrypt(XNonce::from_slice(nonce), ciphertext)
                .map_err(|_| invalid("backup failed authentication"))?,
        );
        let share: DistributedKeyShare = serde_json::from_slice(&plaintext)
            .map_err(|e| invalid(&format!("backup is not a key share: {e}")))?;
        if share.public_key.is_empty() || hex::decode(&share.public_key).is_err() {
            return Err(invalid("backup public key is not hex"));
        }
        Ok(share)
    }
}

fn invalid(reason: &str) -> ProtocolError {
    error!("Could not decode backup: {}", reason);
    ProtocolError::InvalidBackupData(reason.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn share() -> DistributedKeyShare {
        DistributedKeyShare {
            public_key: "04a1b2c3".into(),
            key_share_data: json!({"x_i": "11", "party_id": 1}),
        }
    }

    #[test]
    fn decode_recovers_encoded_share() -> Result<()> {
        let codec = BackupCodec::random();
        let blob = codec.encode(&share())?;
        assert_eq!(codec.decode(&blob)?, share());
        Ok(())
    }

    #[test]
    fn decode_rejects_other_keys_and_garbage() -> Result<()> {
        let blob = BackupCodec::random().encode(&share())?;
        let other = BackupCodec::random();
        assert!(matches!(
            other.decode(&blob),
            Err(ProtocolError::InvalidBackupData(_))
        ));
        assert!(matches!(
            other.decode("%%%"),
            Err(ProtocolError::InvalidBackupData(_))
        ));
        assert!(matches!(
            other.decode(&to_base64(b"short")),
            Err(ProtocolError::InvalidBackupData(_))
        ));
        Ok(())
    }

    #[test]
    fn decode_rejects_sealed_non_share() {
        let codec = BackupCodec::random();
        let nonce = [7u8; BOX_NONCE_BYTES];
        let ciphertext = codec
            .cipher()
            .encrypt(XNonce::from_slice(&nonce), b"{\"hello\":1}".as_slice())
            .unwrap();
        let blob = to_base64(&[nonce.as_slice(), &ciphertext].concat());
        assert!(matches!(
            codec.decode(&blob),
            Err(ProtocolError::InvalidBackupData(_))
        ));
    }
}
