// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

//! Coordination core for two-party ECDSA signing with a paired device
//!
//! One key is split between two parties: this one (usually a browser or
//! desktop client) and a phone. Neither can sign alone. The two parties never
//! talk directly; every message goes through an untrusted relay, so all
//! protocol traffic is box-encrypted end to end.
//!
//! This crate provides:
//! - [`PairingCoordinator`], which runs the pairing handshake, obtains and
//!   refreshes relay tokens, and recovers a key share from the phone's
//!   backup.
//! - [`SignatureSession`], which drives a multi-round sign session with the
//!   phone under a single-flight lock, honoring rejection, expiry and
//!   cancellation.
//! - [`EncryptedChannel`] and [`BackupCodec`], the primitives both of the
//!   above are built on.
//!
//! The relay transport ([`RelayClient`]) and the signing computation itself
//! ([`SignerFactory`]) are supplied by the caller. Persistence of
//! [`StorageData`] is the caller's responsibility too.

#![warn(missing_docs)]

#[macro_use]
pub mod errors;

mod backup;
mod channel;
mod config;
mod key;
mod keyshare;
mod messages;
mod pairing;
mod parameters;
mod protocol;
mod relay;
mod sign;
mod storage;
mod utils;

pub use backup::BackupCodec;
pub use channel::{decrypt, encrypt, EncryptedChannel, Sealed};
pub use config::ProtocolConfig;
pub use key::{EncryptionKeyPair, SigningKeyPair};
pub use keyshare::DistributedKeyShare;
pub use messages::{
    HashAlg, PairingAck, PairingDescriptor, SignConversation, SignMessage, SignMetadata,
};
pub use pairing::{PairingCoordinator, PairingData, PairingState, RefreshOutcome, TokenOutcome};
pub use protocol::{PairingId, SessionId};
pub use relay::{RelayClient, RelayError, TokenGrant, TokenRefresh, Topic};
pub use sign::{
    cancel_pair, CancelHandle, CancelSignal, FlightSnapshot, LocalSigner, SessionState,
    SignRequest, SignResult, SignatureSession, SignerFactory, SignerFault, SignerRound,
    SingleFlight,
};
pub use storage::{StorageData, Wallet};
