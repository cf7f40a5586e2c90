// Copyright (c) 2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

//! The local half of the two-party signing computation.
//!
//! This crate only moves the signer's messages between the two parties. The
//! computation itself is supplied by the caller through [`SignerFactory`].

use crate::{errors::ProtocolError, keyshare::DistributedKeyShare, protocol::SessionId};
use async_trait::async_trait;
use thiserror::Error;

/// Failures reported by a [`LocalSigner`].
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum SignerFault {
    /// The key share could not be used by the signer.
    #[error("Unusable key share: {0}")]
    InvalidKeyShare(String),
    /// The peer's message did not fit the signer's current round.
    #[error("Unexpected message: {0}")]
    UnexpectedMessage(String),
    /// Any other failure inside the signer.
    #[error("Signer failure: {0}")]
    Internal(String),
}

impl From<SignerFault> for ProtocolError {
    fn from(fault: SignerFault) -> Self {
        ProtocolError::InternalLibError(fault.to_string())
    }
}

/// Output of one [`LocalSigner::process_message`] step.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SignerRound {
    /// Message to deliver to the peer's signer.
    pub msg_to_send: Vec<u8>,
    /// Hex encoded 64-byte `(r, s)` signature, once available.
    pub signature: Option<String>,
    /// Recovery id, once available.
    pub recid: Option<u8>,
}

impl SignerRound {
    /// The finished signature and recovery id, if this round produced both.
    pub fn signature_material(&self) -> Option<(&str, u8)> {
        match (&self.signature, self.recid) {
            (Some(signature), Some(recid)) => Some((signature.as_str(), recid)),
            _ => None,
        }
    }
}

/// One instance of the local signing computation, bound to one session.
#[async_trait]
pub trait LocalSigner: Send {
    /// Consumes the peer's latest message (none on the first round) and
    /// produces the next outgoing one.
    async fn process_message(
        &mut self,
        incoming: Option<&[u8]>,
    ) -> std::result::Result<SignerRound, SignerFault>;
}

/// Creates a [`LocalSigner`] for each sign session.
pub trait SignerFactory: Send + Sync {
    #[allow(missing_docs)]
    fn create(
        &self,
        session_id: &SessionId,
        message_hash: &[u8],
        key_share: &DistributedKeyShare,
    ) -> std::result::Result<Box<dyn LocalSigner>, SignerFault>;
}
