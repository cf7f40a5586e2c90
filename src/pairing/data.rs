// Copyright (c) Facebook, Inc. and its affiliates.
// Modifications Copyright (c) 2022-2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

use crate::{
    errors::Result,
    key::{encryption_public_from_hex, EncryptionKeyPair, SigningKeyPair},
    messages::PairingDescriptor,
    protocol::PairingId,
    relay::{TokenGrant, TokenRefresh},
};
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use x25519_dalek::PublicKey;

/// The key material of a handshake that has not yet produced a token.
#[derive(Debug)]
pub(crate) struct PairingIdentity {
    pub(crate) pairing_id: PairingId,
    pub(crate) encryption: EncryptionKeyPair,
    pub(crate) signing: SigningKeyPair,
}

impl PairingIdentity {
    pub(crate) fn generate<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        Self {
            pairing_id: PairingId::random(rng),
            encryption: EncryptionKeyPair::generate(rng),
            signing: SigningKeyPair::generate(rng),
        }
    }

    pub(crate) fn descriptor(&self) -> PairingDescriptor {
        PairingDescriptor {
            pairing_id: self.pairing_id.clone(),
            web_enc_public_key: self.encryption.public_hex(),
            sign_public_key: self.signing.public_hex(),
        }
    }

    /// Combines our key material with the relay's token grant.
    pub(crate) fn into_pairing_data(self, grant: &TokenGrant) -> PairingData {
        PairingData {
            pairing_id: self.pairing_id,
            web_enc_public_key: self.encryption.public_hex(),
            web_enc_private_key: self.encryption.secret_hex(),
            web_sign_public_key: self.signing.public_hex(),
            web_sign_private_key: self.signing.secret_hex(),
            app_public_key: grant.app_public_key.clone(),
            token: grant.token.clone(),
            token_expiration: grant.token_expiration,
            device_name: grant.device_name.clone(),
        }
    }
}

/// Everything needed to talk to the paired device after pairing.
///
/// # 🔒 Storage requirements
/// This type holds private keys and must be stored securely by the calling
/// application.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PairingData {
    #[allow(missing_docs)]
    pub pairing_id: PairingId,
    /// Hex encoded X25519 public key of this party.
    pub web_enc_public_key: String,
    /// Hex encoded X25519 secret key of this party.
    pub web_enc_private_key: String,
    /// Hex encoded Ed25519 public key of this party.
    pub web_sign_public_key: String,
    /// Hex encoded Ed25519 seed of this party.
    pub web_sign_private_key: String,
    /// Hex encoded X25519 public key of the paired device.
    pub app_public_key: String,
    /// Current relay session token.
    pub token: String,
    /// Token expiry, milliseconds since the unix epoch.
    pub token_expiration: i64,
    /// Name of the paired device.
    pub device_name: String,
}

impl PairingData {
    pub(crate) fn encryption_keys(&self) -> Result<EncryptionKeyPair> {
        EncryptionKeyPair::from_secret_hex(&self.web_enc_private_key)
    }

    pub(crate) fn signing_keys(&self) -> Result<SigningKeyPair> {
        SigningKeyPair::from_secret_hex(&self.web_sign_private_key)
    }

    pub(crate) fn app_public(&self) -> Result<PublicKey> {
        encryption_public_from_hex(&self.app_public_key)
    }

    /// A copy of `self` with the refresh response merged in. Fields the
    /// relay did not send keep their current value.
    pub(crate) fn merged_with(&self, refresh: TokenRefresh) -> Self {
        let mut merged = self.clone();
        merged.token = refresh.token;
        merged.token_expiration = refresh.token_expiration;
        if let Some(device_name) = refresh.device_name {
            merged.device_name = device_name;
        }
        if let Some(app_public_key) = refresh.app_public_key {
            merged.app_public_key = app_public_key;
        }
        merged
    }
}

impl Debug for PairingData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PairingData")
            .field("pairing_id", &self.pairing_id)
            .field("web_enc_public_key", &self.web_enc_public_key)
            .field("web_enc_private_key", &"[redacted]")
            .field("web_sign_public_key", &self.web_sign_public_key)
            .field("web_sign_private_key", &"[redacted]")
            .field("app_public_key", &self.app_public_key)
            .field("token", &"[redacted]")
            .field("token_expiration", &self.token_expiration)
            .field("device_name", &self.device_name)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    fn grant() -> TokenGrant {
        TokenGrant {
            token: "t1".into(),
            token_expiration: 100,
            device_name: "Pixel".into(),
            app_public_key: hex::encode([9u8; 32]),
            backup_data: None,
        }
    }

    #[test]
    fn pairing_data_keeps_identity_keys() -> Result<()> {
        let mut rng = OsRng;
        let identity = PairingIdentity::generate(&mut rng);
        let descriptor = identity.descriptor();
        let data = identity.into_pairing_data(&grant());

        assert_eq!(data.pairing_id, descriptor.pairing_id);
        assert_eq!(data.web_enc_public_key, descriptor.web_enc_public_key);
        assert_eq!(data.web_sign_public_key, descriptor.sign_public_key);
        assert_eq!(data.encryption_keys()?.public_hex(), data.web_enc_public_key);
        assert_eq!(data.signing_keys()?.public_hex(), data.web_sign_public_key);
        assert_eq!(data.app_public()?.as_bytes(), &[9u8; 32]);
        Ok(())
    }

    #[test]
    fn merge_overwrites_only_what_was_sent() {
        let mut rng = OsRng;
        let data = PairingIdentity::generate(&mut rng).into_pairing_data(&grant());
        let merged = data.merged_with(TokenRefresh {
            token: "t2".into(),
            token_expiration: 200,
            ..Default::default()
        });
        assert_eq!(merged.token, "t2");
        assert_eq!(merged.token_expiration, 200);
        assert_eq!(merged.device_name, "Pixel");
        assert_eq!(merged.web_sign_private_key, data.web_sign_private_key);
        assert_eq!(data.token, "t1");

        let renamed = data.merged_with(TokenRefresh {
            token: "t3".into(),
            token_expiration: 300,
            device_name: Some("Pixel 9".into()),
            app_public_key: None,
        });
        assert_eq!(renamed.device_name, "Pixel 9");
        assert_eq!(renamed.app_public_key, data.app_public_key);
    }

    #[test]
    fn debug_redacts_private_keys() {
        let mut rng = OsRng;
        let data = PairingIdentity::generate(&mut rng).into_pairing_data(&grant());
        let printed = format!("{data:?}");
        assert!(!printed.contains(&data.web_enc_private_key));
        assert!(!printed.contains(&data.web_sign_private_key));
    }
}
