// Copyright (c) 2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

//! The contract this crate expects from the message relay.
//!
//! The relay is untrusted: it only moves opaque payloads between the two
//! parties and hands out session tokens. Implementations (HTTP, push, an
//! in-process queue for tests) live outside this crate and implement
//! [`RelayClient`].

use crate::{
    errors::Result,
    messages::{PairingAck, SignConversation},
    protocol::PairingId,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use thiserror::Error;
use tracing::error;

/// Transport-level failures reported by a [`RelayClient`].
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum RelayError {
    /// The request never reached the relay or the connection dropped.
    #[error("Network error: {0}")]
    Network(String),
    /// The relay answered with an error status.
    #[error("Relay rejected request with status {status}: {reason}")]
    Rejected {
        /// Status code reported by the relay.
        status: u16,
        /// Human readable reason.
        reason: String,
    },
    /// The relay answered with a body of the wrong shape.
    #[error("Malformed relay response: {0}")]
    Malformed(String),
}

/// The channel a message is delivered on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Topic {
    /// Pairing acknowledgements.
    Pairing,
    /// Sign conversation envelopes.
    Sign,
}

impl Display for Topic {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            Topic::Pairing => write!(f, "pairing"),
            Topic::Sign => write!(f, "sign"),
        }
    }
}

/// Response of the token endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenGrant {
    /// Session token for subsequent relay calls.
    pub token: String,
    /// Token expiry, milliseconds since the unix epoch.
    pub token_expiration: i64,
    /// Name of the paired device.
    pub device_name: String,
    /// Hex encoded X25519 public key of the paired device.
    pub app_public_key: String,
    /// Encrypted key share backup, if the device holds one for us.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_data: Option<String>,
}

/// Response of the token refresh endpoint. Absent fields keep their
/// previous value when merged into pairing data.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRefresh {
    /// The renewed token.
    pub token: String,
    /// Expiry of the renewed token.
    pub token_expiration: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[allow(missing_docs)]
    pub device_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[allow(missing_docs)]
    pub app_public_key: Option<String>,
}

/// Delivers opaque envelopes between the two parties.
#[async_trait]
pub trait RelayClient: Send + Sync {
    /// Delivers `payload` under `topic`. If `expect_response` is set, waits
    /// for the peer's reply of the same shape and returns it.
    async fn send_message(
        &self,
        token: &str,
        topic: Topic,
        payload: serde_json::Value,
        expect_response: bool,
        pairing_id: Option<&PairingId>,
    ) -> std::result::Result<Option<serde_json::Value>, RelayError>;

    /// Exchanges a signed pairing id for a session token.
    async fn get_token(
        &self,
        pairing_id: &PairingId,
        signature_hex: &str,
    ) -> std::result::Result<TokenGrant, RelayError>;

    /// Exchanges a signed token for a renewed one.
    async fn refresh_token(
        &self,
        token: &str,
        signature_hex: &str,
    ) -> std::result::Result<TokenRefresh, RelayError>;
}

/// Sends a pairing acknowledgement; no reply is expected.
pub(crate) async fn send_pairing_ack<R: RelayClient + ?Sized>(
    relay: &R,
    token: &str,
    ack: PairingAck,
    pairing_id: &PairingId,
) -> Result<()> {
    relay
        .send_message(token, Topic::Pairing, serialize!(&ack)?, false, Some(pairing_id))
        .await?;
    Ok(())
}

/// Sends one sign envelope and, if asked to, returns the peer's reply.
pub(crate) async fn send_sign_conversation<R: RelayClient + ?Sized>(
    relay: &R,
    token: &str,
    conversation: &SignConversation,
    expect_response: bool,
) -> Result<Option<SignConversation>> {
    let reply = relay
        .send_message(
            token,
            Topic::Sign,
            serialize!(conversation)?,
            expect_response,
            None,
        )
        .await?;
    match reply {
        Some(value) if expect_response => {
            let parsed: SignConversation = serde_json::from_value(value).map_err(|e| {
                error!("Peer replied with a malformed sign conversation: {}", e);
                RelayError::from(e)
            })?;
            Ok(Some(parsed))
        }
        _ => Ok(None),
    }
}

impl From<serde_json::Error> for RelayError {
    fn from(e: serde_json::Error) -> Self {
        RelayError::Malformed(e.to_string())
    }
}
