// Copyright (c) 2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

//! Authenticated public-key encryption between the two parties.
//!
//! [`EncryptedChannel`] is a box construction: the X25519 shared secret of
//! our private key and the peer's public key is hashed into an
//! XChaCha20-Poly1305 key. Both parties derive the same key from their own
//! halves, so either side can open what the other sealed. Every call to
//! [`EncryptedChannel::encrypt`] draws a fresh random nonce.

use crate::{
    errors::{ProtocolError, Result},
    parameters::BOX_NONCE_BYTES,
    utils::random_bytes,
};
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    Key, XChaCha20Poly1305, XNonce,
};
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};
use tracing::{error, trace};
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::Zeroizing;

const KDF_DOMAIN: &[u8] = b"pairsign.box.v1";

/// Ciphertext together with the nonce it was sealed under.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sealed {
    /// Encrypted payload including the authentication tag.
    pub ciphertext: Vec<u8>,
    /// The random nonce; must accompany the ciphertext.
    pub nonce: [u8; BOX_NONCE_BYTES],
}

/// A box between our private key and one peer public key.
pub struct EncryptedChannel {
    cipher: XChaCha20Poly1305,
}

impl EncryptedChannel {
    /// Precomputes the shared key for `peer_public` and `own_secret`.
    pub fn new(peer_public: &PublicKey, own_secret: &StaticSecret) -> Self {
        let shared = own_secret.diffie_hellman(peer_public);
        let key: Zeroizing<[u8; 32]> = Zeroizing::new(
            Sha256::new()
                .chain_update(KDF_DOMAIN)
                .chain_update(shared.as_bytes())
                .finalize()
                .into(),
        );
        Self {
            cipher: XChaCha20Poly1305::new(Key::from_slice(key.as_slice())),
        }
    }

    /// Seals `plaintext` under a fresh random nonce.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Sealed> {
        let nonce = random_bytes::<_, BOX_NONCE_BYTES>(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(XNonce::from_slice(&nonce), plaintext)
            .map_err(|_| {
                error!("Box encryption failed");
                ProtocolError::InternalLibError("box encryption failed".into())
            })?;
        trace!("Sealed {} bytes.", plaintext.len());
        Ok(Sealed { ciphertext, nonce })
    }

    /// Opens a box. Any authentication failure is a
    /// [`ProtocolError::DecryptionError`].
    pub fn decrypt(&self, ciphertext: &[u8], nonce: &[u8]) -> Result<Vec<u8>> {
        if nonce.len() != BOX_NONCE_BYTES {
            error!(
                "Nonce has length {}, expected {}",
                nonce.len(),
                BOX_NONCE_BYTES
            );
            return Err(ProtocolError::DecryptionError);
        }
        self.cipher
            .decrypt(XNonce::from_slice(nonce), ciphertext)
            .map_err(|_| {
                error!("Box authentication failed");
                ProtocolError::DecryptionError
            })
    }
}

/// One-shot form of [`EncryptedChannel::encrypt`].
pub fn encrypt(
    plaintext: &[u8],
    peer_public: &PublicKey,
    own_secret: &StaticSecret,
) -> Result<Sealed> {
    EncryptedChannel::new(peer_public, own_secret).encrypt(plaintext)
}

/// One-shot form of [`EncryptedChannel::decrypt`].
pub fn decrypt(
    ciphertext: &[u8],
    nonce: &[u8],
    peer_public: &PublicKey,
    own_secret: &StaticSecret,
) -> Result<Vec<u8>> {
    EncryptedChannel::new(peer_public, own_secret).decrypt(ciphertext, nonce)
}
