// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// This party's share of a distributed signing key.
///
/// The share data is opaque to this crate; it is handed unchanged to the
/// local signer capability.
///
/// # 🔒 Storage requirements
/// This type must be stored securely by the calling application and must
/// never be sent to the peer.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistributedKeyShare {
    /// Hex encoded public key of the full distributed key.
    pub public_key: String,
    /// The share itself, in the signer engine's own format.
    pub key_share_data: serde_json::Value,
}

impl Debug for DistributedKeyShare {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DistributedKeyShare")
            .field("public_key", &self.public_key)
            .field("key_share_data", &"[redacted]")
            .finish()
    }
}
