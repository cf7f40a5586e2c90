// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Key material held by the local party.
//!
//! Two key pairs are created per pairing: an X25519 pair that protects sign
//! messages exchanged with the peer, and an Ed25519 pair that authenticates
//! this party to the relay's token endpoints.

use crate::{
    errors::Result,
    parameters::BOX_KEY_BYTES,
    utils::decode_hex_array,
};
use ed25519_dalek::{Signer, SigningKey, VerifyingKey};
use rand::{CryptoRng, RngCore};
use std::fmt::Debug;
use x25519_dalek::{PublicKey, StaticSecret};

/// An X25519 key pair used for box encryption.
#[derive(Clone)]
pub struct EncryptionKeyPair {
    pub(crate) secret: StaticSecret,
    pub(crate) public: PublicKey,
}

impl EncryptionKeyPair {
    /// Draws a fresh key pair.
    pub fn generate<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        let secret = StaticSecret::random_from_rng(rng);
        let public = PublicKey::from(&secret);
        Self { secret, public }
    }

    /// Rebuilds the pair from a hex encoded secret key.
    pub fn from_secret_hex(secret_hex: &str) -> Result<Self> {
        let secret = StaticSecret::from(decode_hex_array::<BOX_KEY_BYTES>(
            secret_hex,
            "encryption private key",
        )?);
        let public = PublicKey::from(&secret);
        Ok(Self { secret, public })
    }

    /// Hex encoded public key.
    pub fn public_hex(&self) -> String {
        hex::encode(self.public.as_bytes())
    }

    /// Hex encoded secret key. Handle with care.
    pub fn secret_hex(&self) -> String {
        hex::encode(self.secret.to_bytes())
    }
}

impl Debug for EncryptionKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptionKeyPair")
            .field("public", &self.public_hex())
            .field("secret", &"[redacted]")
            .finish()
    }
}

/// Parses a peer's hex encoded X25519 public key.
pub(crate) fn encryption_public_from_hex(public_hex: &str) -> Result<PublicKey> {
    Ok(PublicKey::from(decode_hex_array::<BOX_KEY_BYTES>(
        public_hex,
        "encryption public key",
    )?))
}

/// An Ed25519 key pair used to sign the pairing id and tokens.
#[derive(Clone)]
pub struct SigningKeyPair {
    key: SigningKey,
}

impl SigningKeyPair {
    /// Draws a fresh key pair.
    pub fn generate<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        Self {
            key: SigningKey::generate(rng),
        }
    }

    /// Rebuilds the pair from a hex encoded 32-byte seed.
    pub fn from_secret_hex(secret_hex: &str) -> Result<Self> {
        let seed = decode_hex_array::<32>(secret_hex, "signing private key")?;
        Ok(Self {
            key: SigningKey::from_bytes(&seed),
        })
    }

    /// Public half, for verifying signatures.
    pub fn verifying_key(&self) -> VerifyingKey {
        self.key.verifying_key()
    }

    /// Hex encoded public key.
    pub fn public_hex(&self) -> String {
        hex::encode(self.key.verifying_key().as_bytes())
    }

    /// Hex encoded secret key. Handle with care.
    pub fn secret_hex(&self) -> String {
        hex::encode(self.key.to_bytes())
    }

    /// Detached signature over `message`, hex encoded.
    pub fn sign_hex(&self, message: &[u8]) -> String {
        hex::encode(self.key.sign(message).to_bytes())
    }
}

impl Debug for SigningKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningKeyPair")
            .field("public", &self.public_hex())
            .field("secret", &"[redacted]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signature, Verifier};
    use rand::rngs::OsRng;

    #[test]
    fn encryption_keys_survive_hex() {
        let mut rng = OsRng;
        let pair = EncryptionKeyPair::generate(&mut rng);
        let restored = EncryptionKeyPair::from_secret_hex(&pair.secret_hex()).unwrap();
        assert_eq!(pair.public_hex(), restored.public_hex());
        assert_eq!(
            encryption_public_from_hex(&pair.public_hex()).unwrap(),
            pair.public
        );
    }

    #[test]
    fn detached_signatures_verify() {
        let mut rng = OsRng;
        let pair = SigningKeyPair::generate(&mut rng);
        let sig_hex = pair.sign_hex(b"pairing-id");
        let sig_bytes: [u8; 64] = hex::decode(sig_hex).unwrap().try_into().unwrap();
        let sig = Signature::from_bytes(&sig_bytes);
        assert!(pair.verifying_key().verify(b"pairing-id", &sig).is_ok());
        assert!(pair.verifying_key().verify(b"other", &sig).is_err());

        let restored = SigningKeyPair::from_secret_hex(&pair.secret_hex()).unwrap();
        assert_eq!(restored.public_hex(), pair.public_hex());
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let mut rng = OsRng;
        let pair = SigningKeyPair::generate(&mut rng);
        let printed = format!("{pair:?}");
        assert!(!printed.contains(&pair.secret_hex()));
        assert!(printed.contains("[redacted]"));
    }
}
