// Copyright (c) Facebook, Inc. and its affiliates.
// Modifications Copyright (c) 2022-2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

//! Identifiers shared by both parties of the protocol.

use crate::{
    parameters::{PAIRING_ID_LENGTH, SESSION_ID_BYTES},
    utils::{random_alphanumeric, random_bytes},
};
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Display, Formatter};

/// Identifies one pairing handshake. Transferred out-of-band to the peer
/// inside the pairing descriptor.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PairingId(String);

impl PairingId {
    /// Produces a random pairing identifier of the fixed protocol length.
    pub fn random<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        Self(random_alphanumeric(rng, PAIRING_ID_LENGTH))
    }

    /// The identifier as it appears on the wire.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The bytes signed when requesting a token.
    pub(crate) fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl From<&str> for PairingId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Display for PairingId {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A globally unique sign session identifier, hex encoded.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Produces a session identifier from fresh random bytes.
    pub fn random<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        Self(hex::encode(random_bytes::<_, SESSION_ID_BYTES>(rng)))
    }

    /// The identifier as it appears on the wire.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for SessionId {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        // Log prefix only. Ids received from the peer may not be ASCII.
        let prefix: String = self.0.chars().take(8).collect();
        write!(f, "{}", prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    #[test]
    fn pairing_ids_have_fixed_length() {
        let mut rng = OsRng;
        let id = PairingId::random(&mut rng);
        assert_eq!(id.as_str().len(), 19);
        assert!(id.as_str().chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(id, PairingId::random(&mut rng));
    }

    #[test]
    fn session_ids_are_32_hex_bytes() {
        let mut rng = OsRng;
        let sid = SessionId::random(&mut rng);
        assert_eq!(sid.as_str().len(), 64);
        assert_eq!(hex::decode(sid.as_str()).unwrap().len(), 32);
        assert_eq!(sid.to_string().len(), 8);
    }

    #[test]
    fn display_truncates_on_char_boundaries() {
        let sid: SessionId = serde_json::from_str("\"aéééééééé\"").unwrap();
        assert_eq!(sid.to_string(), "aééééééé");
        let short: SessionId = serde_json::from_str("\"aé\"").unwrap();
        assert_eq!(short.to_string(), "aé");
    }

    #[test]
    fn identifiers_serialize_as_plain_strings() {
        let id = PairingId::from("abc");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"abc\"");
    }
}
