// Copyright (c) 2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

//! Pairing with the peer device.
//!
//! The handshake has two steps. [`PairingCoordinator::init`] draws fresh key
//! material and returns a [`PairingDescriptor`](crate::PairingDescriptor) to
//! be shown to the peer out of band. Once the peer has scanned it,
//! [`PairingCoordinator::get_token`] proves possession of the signing key to
//! the relay, obtains a session token and, if the peer offers one, restores a
//! key share from its backup.

mod coordinator;
mod data;

pub(crate) use coordinator::elapsed_ms;
pub use coordinator::{PairingCoordinator, PairingState, RefreshOutcome, TokenOutcome};
pub use data::PairingData;
