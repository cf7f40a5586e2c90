// Copyright (c) 2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

//! Two-party signing with the paired device.
//!
//! A [`SignatureSession`] relays the messages of a caller supplied
//! [`LocalSigner`] to the peer, one round per relay round trip, until the
//! signer yields a signature. The peer may reject the request at any round.

mod cancel;
mod session;
mod signer;
mod single_flight;

pub use cancel::{cancel_pair, CancelHandle, CancelSignal};
pub use session::{SignRequest, SignResult, SignatureSession};
pub use signer::{LocalSigner, SignerFactory, SignerFault, SignerRound};
pub use single_flight::{FlightSnapshot, SessionState, SingleFlight};
