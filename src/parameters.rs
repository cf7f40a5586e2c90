// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

//! Protocol parameter definitions.
//!
//! These values are shared with the paired device and must not change
//! without a matching change on the other side of the relay.

/// Length of the alphanumeric pairing identifier carried in the QR payload.
pub(crate) const PAIRING_ID_LENGTH: usize = 19;

/// Number of random bytes in a sign session identifier (hex-encoded on the
/// wire, so twice as many characters).
pub(crate) const SESSION_ID_BYTES: usize = 32;

/// Nonce size of the box construction (XChaCha20-Poly1305).
///
/// 192-bit nonces are large enough to be drawn at random for every message.
pub(crate) const BOX_NONCE_BYTES: usize = 24;

/// Size of an X25519 public or secret key.
pub(crate) const BOX_KEY_BYTES: usize = 32;

/// Size of the symmetric key protecting a key share backup.
pub(crate) const BACKUP_KEY_BYTES: usize = 32;

/// The party number used by this side of the protocol in sign envelopes.
pub(crate) const WEB_PARTY: u32 = 1;

/// Default lifetime of a sign session, in milliseconds.
pub(crate) const DEFAULT_SIGN_EXPIRY_MS: u64 = 30_000;

/// Size of a message digest accepted for signing.
pub(crate) const MESSAGE_HASH_BYTES: usize = 32;

/// Size of a compact `(r, s)` ECDSA signature.
pub(crate) const SIGNATURE_BYTES: usize = 64;
