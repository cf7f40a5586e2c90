// Copyright (c) Facebook, Inc. and its affiliates.
// Modifications Copyright (c) 2022-2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

//! A list of error types which are produced during pairing and signing.
//!
//! Every failure that leaves this crate is a [`ProtocolError`]. Callers that
//! only care about the kind of failure should match on
//! [`ProtocolError::code`], which is stable across message changes.
use core::fmt::Debug;
use thiserror::Error;

use crate::relay::RelayError;

/// The default Result type used in this crate
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Represents a failure of a pairing or signing operation
#[derive(Clone, Eq, PartialEq, Error, Debug)]
pub enum ProtocolError {
    /// `get_token` was called before `init`.
    #[error("Pairing data not initialized")]
    PairingNotInitialized,
    /// The backup blob sent by the peer could not be decrypted or parsed.
    #[error("Invalid backup data: `{0}`")]
    InvalidBackupData(String),
    /// A message from the peer failed authentication or was malformed.
    #[error("Could not decrypt message from peer")]
    DecryptionError,
    /// The peer explicitly rejected the sign request.
    #[error("User(phone) rejected sign request")]
    UserPhoneDenied,
    /// Another sign session is already running.
    #[error("Sign already running")]
    ResourceBusy,
    /// The local signer capability reported a fault.
    #[error("Internal library error: `{0}`")]
    InternalLibError(String),
    /// The session exceeded its expiry, in milliseconds.
    #[error("Sign session exceeded its expiry of {0} ms")]
    Timeout(u64),
    /// The caller cancelled the session.
    #[error("Sign session was cancelled")]
    Cancelled,
    /// The relay failed to deliver a request or returned garbage.
    #[error("Relay error: `{0}`")]
    Relay(#[from] RelayError),
    /// A value could not be encoded for the wire.
    #[error("Serialization Error")]
    Serialization,
    /// The caller passed malformed input.
    #[error("Function call contained invalid arguments: `{0}`")]
    InvalidArgument(String),
    /// Anything not covered above.
    #[error("unknown-error: `{0}`")]
    UnknownError(String),
}

/// Flat classification of a [`ProtocolError`].
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
#[allow(missing_docs)]
pub enum ErrorCode {
    PairingNotInitialized,
    InvalidBackupData,
    DecryptionError,
    UserPhoneDenied,
    ResourceBusy,
    InternalLibError,
    Timeout,
    Cancelled,
    RelayFailure,
    Serialization,
    InvalidArgument,
    UnknownError,
}

impl ProtocolError {
    /// The kind of this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::PairingNotInitialized => ErrorCode::PairingNotInitialized,
            Self::InvalidBackupData(_) => ErrorCode::InvalidBackupData,
            Self::DecryptionError => ErrorCode::DecryptionError,
            Self::UserPhoneDenied => ErrorCode::UserPhoneDenied,
            Self::ResourceBusy => ErrorCode::ResourceBusy,
            Self::InternalLibError(_) => ErrorCode::InternalLibError,
            Self::Timeout(_) => ErrorCode::Timeout,
            Self::Cancelled => ErrorCode::Cancelled,
            Self::Relay(_) => ErrorCode::RelayFailure,
            Self::Serialization => ErrorCode::Serialization,
            Self::InvalidArgument(_) => ErrorCode::InvalidArgument,
            Self::UnknownError(_) => ErrorCode::UnknownError,
        }
    }

    /// The peer said no. Callers should prompt for re-authorization rather
    /// than report a fault.
    pub fn is_user_rejection(&self) -> bool {
        matches!(self, Self::UserPhoneDenied)
    }

    /// Single-flight contention.
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::ResourceBusy)
    }

    /// Failures where restarting the whole session from scratch may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::Relay(_) | Self::ResourceBusy)
    }
}

macro_rules! serialize {
    ($x:expr) => {{
        serde_json::to_value($x).or(Err(crate::errors::ProtocolError::Serialization))
    }};
}

macro_rules! arg_err {
    ($x:expr) => {{
        Err(crate::errors::ProtocolError::InvalidArgument(String::from(
            $x,
        )))
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_and_busy_are_distinguishable_from_faults() {
        assert!(ProtocolError::UserPhoneDenied.is_user_rejection());
        assert!(!ProtocolError::UserPhoneDenied.is_transient());
        assert!(ProtocolError::ResourceBusy.is_busy());
        assert!(!ProtocolError::DecryptionError.is_user_rejection());
        assert!(!ProtocolError::DecryptionError.is_transient());
        assert!(ProtocolError::Relay(RelayError::Network("down".into())).is_transient());
    }

    #[test]
    fn codes_are_stable() {
        assert_eq!(ProtocolError::Timeout(10).code(), ErrorCode::Timeout);
        assert_eq!(
            ProtocolError::InvalidBackupData("bad".into()).code(),
            ErrorCode::InvalidBackupData
        );
        assert_eq!(ProtocolError::Cancelled.code(), ErrorCode::Cancelled);
    }
}
