//! Types and methods for the messages exchanged with the paired device.

// Copyright (c) Facebook, Inc. and its affiliates.
// Modifications Copyright (c) 2022-2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

//! Contains the wire definitions for everything that crosses the relay or
//! the out-of-band QR transfer. Field names follow the camelCase JSON the
//! paired device speaks.

use crate::{
    channel::{EncryptedChannel, Sealed},
    errors::{ProtocolError, Result},
    parameters::{BOX_NONCE_BYTES, WEB_PARTY},
    protocol::{PairingId, SessionId},
    utils::{from_base64, to_base64},
};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use tracing::{error, instrument, trace};

/// What this party shows the peer (usually as a QR code) to start pairing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PairingDescriptor {
    /// Identifier of the pending handshake.
    pub pairing_id: PairingId,
    /// Hex encoded X25519 public key of this party.
    pub web_enc_public_key: String,
    /// Hex encoded Ed25519 public key of this party.
    pub sign_public_key: String,
}

impl PairingDescriptor {
    /// The JSON payload to render into the QR code.
    pub fn to_qr_payload(&self) -> Result<String> {
        serde_json::to_string(self).or(Err(ProtocolError::Serialization))
    }
}

/// Acknowledgement that tells the peer whether pairing succeeded on our side.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PairingAck {
    /// `false` if a backup was offered and could not be restored.
    pub is_paired: bool,
}

/// Hash function that produced the message digest being signed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[allow(missing_docs)]
pub enum HashAlg {
    Keccak256,
    Sha256,
}

/// Tells the peer what kind of request it is being asked to approve.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum SignMetadata {
    #[serde(rename = "eth_sign")]
    EthSign,
    #[serde(rename = "personal_sign")]
    PersonalSign,
    #[serde(rename = "eth_signTypedData")]
    EthSignTypedData,
    #[serde(rename = "eth_signTransaction")]
    EthSignTransaction,
}

/// One envelope of the sign protocol.
///
/// `message` is the base64 box ciphertext of the sender's protocol message
/// and `nonce` the hex nonce it was sealed under. Both are absent on the
/// opening envelope.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignMessage {
    /// Which party produced this envelope.
    pub party: u32,
    /// The protocol round this envelope belongs to.
    pub round: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[allow(missing_docs)]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[allow(missing_docs)]
    pub nonce: Option<String>,
}

impl SignMessage {
    /// The opening envelope of a session, which carries no payload.
    pub(crate) fn opening(round: u32) -> Self {
        Self {
            party: WEB_PARTY,
            round,
            message: None,
            nonce: None,
        }
    }

    /// Builds our envelope for `round` from a sealed payload.
    pub(crate) fn sealed(round: u32, sealed: &Sealed) -> Self {
        Self {
            party: WEB_PARTY,
            round,
            message: Some(to_base64(&sealed.ciphertext)),
            nonce: Some(hex::encode(sealed.nonce)),
        }
    }

    /// Whether this envelope carries a payload to open.
    pub fn has_payload(&self) -> bool {
        self.message.is_some() && self.nonce.is_some()
    }

    /// Opens the payload with `channel`. Returns `None` when the envelope
    /// carries no payload. Malformed encodings are treated the same as a
    /// failed authentication.
    #[instrument(skip_all, err(Debug))]
    pub(crate) fn open(&self, channel: &EncryptedChannel) -> Result<Option<Vec<u8>>> {
        let (message, nonce) = match (&self.message, &self.nonce) {
            (Some(message), Some(nonce)) => (message, nonce),
            _ => return Ok(None),
        };
        let ciphertext = from_base64(message).ok_or_else(|| {
            error!("Envelope ciphertext for round {} is not base64", self.round);
            ProtocolError::DecryptionError
        })?;
        let nonce = hex::decode(nonce).map_err(|_| {
            error!("Envelope nonce for round {} is not hex", self.round);
            ProtocolError::DecryptionError
        })?;
        if nonce.len() != BOX_NONCE_BYTES {
            error!("Envelope nonce for round {} has the wrong size", self.round);
            return Err(ProtocolError::DecryptionError);
        }
        trace!("Opening envelope from party {} round {}.", self.party, self.round);
        channel.decrypt(&ciphertext, &nonce).map(Some)
    }
}

/// The shared state of one sign attempt, passed back and forth through the
/// relay. The peer returns it with its own envelope in `message` and its
/// decision in `is_approved`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignConversation {
    /// Session this conversation belongs to.
    pub session_id: SessionId,
    /// Round of the most recent envelope.
    #[serde(default)]
    pub round: u32,
    /// The most recent envelope.
    pub message: SignMessage,
    /// `None` until the peer decides, then the peer's decision.
    pub is_approved: Option<bool>,
    /// Lifetime of the session in milliseconds.
    pub expiry: u64,
    /// Creation time, milliseconds since the unix epoch.
    pub created_at: i64,
    #[allow(missing_docs)]
    pub sign_metadata: SignMetadata,
    /// Account the signing key belongs to.
    pub account_id: u64,
    #[allow(missing_docs)]
    pub hash_alg: HashAlg,
    /// Public key of the distributed key being used.
    pub public_key: String,
    /// The message being signed, as the peer should display it.
    pub sign_message: String,
    /// Hex encoded digest being signed.
    pub message_hash: String,
}

impl SignConversation {
    /// Replaces the envelope, leaving the rest of the conversation untouched.
    pub(crate) fn with_message(self, message: SignMessage) -> Self {
        Self {
            round: message.round,
            message,
            ..self
        }
    }

    /// `true` only once the peer has explicitly said no.
    pub fn is_rejected(&self) -> bool {
        self.is_approved == Some(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::EncryptionKeyPair;
    use rand::rngs::OsRng;
    use serde_json::json;

    #[test]
    fn descriptor_uses_wire_field_names() {
        let descriptor = PairingDescriptor {
            pairing_id: PairingId::from("abc"),
            web_enc_public_key: "00".into(),
            sign_public_key: "11".into(),
        };
        let value: serde_json::Value =
            serde_json::from_str(&descriptor.to_qr_payload().unwrap()).unwrap();
        assert_eq!(
            value,
            json!({"pairingId": "abc", "webEncPublicKey": "00", "signPublicKey": "11"})
        );
    }

    #[test]
    fn opening_envelope_omits_payload() {
        let value = serde_json::to_value(SignMessage::opening(1)).unwrap();
        assert_eq!(value, json!({"party": 1, "round": 1}));
        assert!(!SignMessage::opening(1).has_payload());
    }

    #[test]
    fn sealed_envelope_opens_on_the_other_side() {
        let mut rng = OsRng;
        let web = EncryptionKeyPair::generate(&mut rng);
        let app = EncryptionKeyPair::generate(&mut rng);
        let sealed = EncryptedChannel::new(&app.public, &web.secret)
            .encrypt(b"hello")
            .unwrap();
        let envelope = SignMessage::sealed(3, &sealed);
        assert_eq!(envelope.round, 3);
        assert_eq!(envelope.party, 1);

        let app_side = EncryptedChannel::new(&web.public, &app.secret);
        assert_eq!(envelope.open(&app_side).unwrap(), Some(b"hello".to_vec()));
        assert_eq!(SignMessage::opening(1).open(&app_side).unwrap(), None);

        let mut garbled = envelope.clone();
        garbled.nonce = Some("zz".into());
        assert_eq!(garbled.open(&app_side), Err(ProtocolError::DecryptionError));
    }

    #[test]
    fn peer_decision_parses() {
        let value = json!({
            "sessionId": "ab",
            "message": {"party": 2, "round": 1, "message": "AA==", "nonce": "00"},
            "isApproved": false,
            "expiry": 30000,
            "createdAt": 1,
            "signMetadata": "eth_sign",
            "accountId": 1,
            "hashAlg": "keccak256",
            "publicKey": "04",
            "signMessage": "hi",
            "messageHash": "00"
        });
        let conversation: SignConversation = serde_json::from_value(value).unwrap();
        assert!(conversation.is_rejected());
        assert_eq!(conversation.round, 0);
        assert_eq!(conversation.message.party, 2);
        assert_eq!(conversation.hash_alg, HashAlg::Keccak256);
    }
}
