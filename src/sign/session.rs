// Copyright (c) 2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

use crate::{
    channel::EncryptedChannel,
    config::ProtocolConfig,
    errors::{ProtocolError, Result},
    keyshare::DistributedKeyShare,
    messages::{HashAlg, SignConversation, SignMessage, SignMetadata},
    pairing::{elapsed_ms, PairingData},
    parameters::{MESSAGE_HASH_BYTES, SIGNATURE_BYTES, WEB_PARTY},
    protocol::SessionId,
    relay::{send_sign_conversation, RelayClient, RelayError},
    sign::{
        cancel::CancelSignal,
        signer::{LocalSigner, SignerFactory},
        single_flight::{FlightGuard, SessionState, SingleFlight},
    },
    utils::{decode_hex_array, from_base64, now_millis, to_base64},
};
use k256::ecdsa::Signature;
use rand::rngs::OsRng;
use std::{
    fmt::Debug,
    future::Future,
    sync::Arc,
    time::{Duration, Instant},
};
use tracing::{debug, error, info, instrument, trace};

/// What to sign and how the peer should present it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignRequest {
    /// Hash function that produced `message_hash`.
    pub hash_alg: HashAlg,
    /// The message as the peer should display it.
    pub message: String,
    /// Hex encoded 32-byte digest to sign.
    pub message_hash: String,
    #[allow(missing_docs)]
    pub sign_metadata: SignMetadata,
    /// Account the key share belongs to.
    pub account_id: u64,
}

/// A finished ECDSA signature.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignResult {
    /// Hex encoded 64-byte `r || s`.
    pub signature: String,
    /// Recovery id, 0 or 1.
    pub rec_id: u8,
    /// Wall time spent in the session, in milliseconds.
    pub elapsed_time_ms: u64,
}

impl SignResult {
    /// Hex encoded `r`.
    pub fn r(&self) -> &str {
        &self.signature[..self.signature.len() / 2]
    }

    /// Hex encoded `s`.
    pub fn s(&self) -> &str {
        &self.signature[self.signature.len() / 2..]
    }
}

/// Runs sign sessions with the paired device.
pub struct SignatureSession<R: ?Sized> {
    relay: Arc<R>,
    signers: Arc<dyn SignerFactory>,
    flight: SingleFlight,
    config: ProtocolConfig,
}

impl<R: RelayClient + ?Sized> SignatureSession<R> {
    /// Sessions created this way share the process-wide single-flight lock.
    pub fn new(relay: Arc<R>, signers: Arc<dyn SignerFactory>) -> Self {
        Self {
            relay,
            signers,
            flight: SingleFlight::process_wide(),
            config: ProtocolConfig::default(),
        }
    }

    #[allow(missing_docs)]
    pub fn with_config(mut self, config: ProtocolConfig) -> Self {
        self.config = config;
        self
    }

    /// Uses `flight` instead of the process-wide lock.
    pub fn with_single_flight(mut self, flight: SingleFlight) -> Self {
        self.flight = flight;
        self
    }

    /// The lock this session runs under.
    pub fn single_flight(&self) -> &SingleFlight {
        &self.flight
    }

    /// Runs one sign session to completion.
    ///
    /// Fails immediately with [`ProtocolError::ResourceBusy`] if another
    /// session holds the same lock. The lock is released on every exit path.
    #[instrument(skip_all, err(Debug))]
    pub async fn sign(
        &self,
        pairing_data: &PairingData,
        key_share: &DistributedKeyShare,
        request: SignRequest,
        cancel: &CancelSignal,
    ) -> Result<SignResult> {
        let start = Instant::now();
        if key_share.public_key.is_empty() {
            error!("Key share carries no public key");
            return arg_err!("key share has no public key");
        }
        let message_hash =
            decode_hex_array::<MESSAGE_HASH_BYTES>(&request.message_hash, "message hash")?;
        let channel = EncryptedChannel::new(
            &pairing_data.app_public()?,
            &pairing_data.encryption_keys()?.secret,
        );

        let mut guard = self.flight.try_acquire()?;
        let outcome = self
            .run(
                &guard,
                &channel,
                pairing_data,
                key_share,
                &message_hash,
                request,
                cancel.clone(),
                start,
            )
            .await;
        guard.record(match &outcome {
            Ok(_) => SessionState::Completed,
            Err(ProtocolError::UserPhoneDenied) => SessionState::Rejected,
            Err(_) => SessionState::Failed,
        });
        drop(guard);

        let (signature, rec_id) = outcome?;
        let signature = validate_signature(&signature, rec_id)?;
        let result = SignResult {
            signature,
            rec_id,
            elapsed_time_ms: elapsed_ms(start),
        };
        info!("Sign session finished in {} ms", result.elapsed_time_ms);
        Ok(result)
    }

    #[allow(clippy::too_many_arguments)]
    async fn run(
        &self,
        guard: &FlightGuard,
        channel: &EncryptedChannel,
        pairing_data: &PairingData,
        key_share: &DistributedKeyShare,
        message_hash: &[u8],
        request: SignRequest,
        mut cancel: CancelSignal,
        start: Instant,
    ) -> Result<(String, u8)> {
        let session_id = SessionId::random(&mut OsRng);
        guard.begin(&session_id);
        info!("Starting sign session {}", session_id);

        let mut signer: Box<dyn LocalSigner> =
            self.signers.create(&session_id, message_hash, key_share)?;

        let mut round: u32 = 1;
        let mut conversation = SignConversation {
            session_id: session_id.clone(),
            round,
            message: SignMessage::opening(round),
            is_approved: None,
            expiry: self.config.sign_expiry_ms,
            created_at: now_millis(),
            sign_metadata: request.sign_metadata,
            account_id: request.account_id,
            hash_alg: request.hash_alg,
            public_key: key_share.public_key.clone(),
            sign_message: request.message,
            message_hash: hex::encode(message_hash),
        };

        loop {
            guard.set_round(round);
            let incoming = open_peer_message(&conversation.message, channel)?;
            let step = self
                .bounded(start, &mut cancel, &session_id, round, async {
                    signer
                        .process_message(incoming.as_deref())
                        .await
                        .map_err(ProtocolError::from)
                })
                .await?;
            let finished = step
                .signature_material()
                .map(|(signature, recid)| (signature.to_string(), recid));
            let expect_response = finished.is_none();

            let sealed = channel.encrypt(to_base64(&step.msg_to_send).as_bytes())?;
            conversation = conversation.with_message(SignMessage::sealed(round, &sealed));

            debug!(
                "Sending round {} of session {} (expect response: {})",
                round, session_id, expect_response
            );
            let reply = self
                .bounded(
                    start,
                    &mut cancel,
                    &session_id,
                    round,
                    send_sign_conversation(
                        self.relay.as_ref(),
                        &pairing_data.token,
                        &conversation,
                        expect_response,
                    ),
                )
                .await?;

            if expect_response {
                let reply = reply.ok_or_else(|| {
                    error!("Peer sent no reply to round {}", round);
                    RelayError::Malformed("missing reply".into())
                })?;
                if reply.session_id != session_id {
                    error!("Peer replied for session {:?}", reply.session_id.as_str());
                    return Err(RelayError::Malformed("reply for another session".into()).into());
                }
                conversation = reply;
            }
            if conversation.is_rejected() {
                info!("Peer rejected sign session {}", session_id);
                return Err(ProtocolError::UserPhoneDenied);
            }
            if let Some(finished) = finished {
                return Ok(finished);
            }
            round += 1;
        }
    }

    /// Drives `step` within what is left of the session expiry, giving up
    /// as soon as `cancel` fires.
    async fn bounded<T>(
        &self,
        start: Instant,
        cancel: &mut CancelSignal,
        session_id: &SessionId,
        round: u32,
        step: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        let remaining = self.remaining(start)?;
        if cancel.is_cancelled() {
            info!("Sign session {} cancelled before round {}", session_id, round);
            return Err(ProtocolError::Cancelled);
        }
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!("Sign session {} cancelled during round {}", session_id, round);
                Err(ProtocolError::Cancelled)
            }
            done = tokio::time::timeout(remaining, step) => match done {
                Ok(result) => result,
                Err(_) => {
                    error!("Sign session {} timed out in round {}", session_id, round);
                    Err(ProtocolError::Timeout(self.config.sign_expiry_ms))
                }
            },
        }
    }

    fn remaining(&self, start: Instant) -> Result<Duration> {
        let expiry = self.config.sign_expiry();
        match expiry.checked_sub(start.elapsed()) {
            Some(remaining) if !remaining.is_zero() => Ok(remaining),
            _ => {
                error!("Sign session exceeded its expiry");
                Err(ProtocolError::Timeout(self.config.sign_expiry_ms))
            }
        }
    }
}

impl<R: ?Sized> Debug for SignatureSession<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureSession")
            .field("flight", &self.flight.snapshot())
            .field("config", &self.config)
            .finish()
    }
}

/// Opens the peer's envelope and unwraps the base64 signer message inside.
/// Our own envelope, or one without payload, yields nothing.
fn open_peer_message(
    message: &SignMessage,
    channel: &EncryptedChannel,
) -> Result<Option<Vec<u8>>> {
    if message.party == WEB_PARTY {
        return Ok(None);
    }
    let plaintext = match message.open(channel)? {
        Some(plaintext) => plaintext,
        None => return Ok(None),
    };
    trace!("Opened {} byte message from the peer", plaintext.len());
    let text = std::str::from_utf8(&plaintext).map_err(|_| {
        error!("Peer message for round {} is not text", message.round);
        ProtocolError::DecryptionError
    })?;
    from_base64(text).map(Some).ok_or_else(|| {
        error!("Peer message for round {} is not base64", message.round);
        ProtocolError::DecryptionError
    })
}

/// Checks that `signature` is a well formed secp256k1 `(r, s)` pair and
/// normalizes its encoding.
fn validate_signature(signature: &str, rec_id: u8) -> Result<String> {
    let bytes = hex::decode(signature).map_err(|_| {
        error!("Signer produced a signature that is not hex");
        ProtocolError::InternalLibError("signature is not hex".into())
    })?;
    if bytes.len() != SIGNATURE_BYTES {
        error!("Signer produced a {} byte signature", bytes.len());
        return Err(ProtocolError::InternalLibError(
            "signature has the wrong length".into(),
        ));
    }
    Signature::from_slice(&bytes).map_err(|_| {
        error!("Signer produced a signature outside the curve order");
        ProtocolError::InternalLibError("signature is not a valid (r, s) pair".into())
    })?;
    if rec_id > 1 {
        error!("Signer produced recovery id {}", rec_id);
        return Err(ProtocolError::InternalLibError(
            "recovery id must be 0 or 1".into(),
        ));
    }
    Ok(hex::encode(bytes))
}
