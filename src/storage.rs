// Copyright (c) Facebook, Inc. and its affiliates.
// Modifications Copyright (c) 2022-2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

//! The state bundle a caller persists after pairing.

use crate::{
    keyshare::DistributedKeyShare, messages::SignConversation, pairing::PairingData,
    protocol::SessionId,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::info;

/// A key share registered under an account.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Wallet {
    #[allow(missing_docs)]
    pub account_id: String,
    #[allow(missing_docs)]
    pub distributed_key: DistributedKeyShare,
}

/// Everything produced by a successful pairing, ready to be persisted by
/// the caller.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageData {
    /// Keys and token for talking to the paired device.
    pub pairing_data: PairingData,
    /// Wallets by account id.
    pub wallets: HashMap<String, Wallet>,
    /// Pending sign conversations by session id.
    pub requests: HashMap<SessionId, SignConversation>,
    /// A key share recovered from the peer's backup, not yet adopted.
    pub temp_distributed_key: Option<DistributedKeyShare>,
    /// Account id generated for a recovered key share.
    pub account_id: Option<String>,
}

impl StorageData {
    /// Fresh storage for a newly paired device with nothing recovered.
    pub(crate) fn new(pairing_data: PairingData) -> Self {
        Self {
            pairing_data,
            wallets: HashMap::new(),
            requests: HashMap::new(),
            temp_distributed_key: None,
            account_id: None,
        }
    }

    /// Moves a recovered key share into `wallets` under its account id.
    /// Returns the account id, or `None` if nothing was recovered.
    pub fn adopt_recovered_key(&mut self) -> Option<String> {
        let account_id = self.account_id.clone()?;
        let key = self.temp_distributed_key.take()?;
        info!("Adopting recovered key share into wallets.");
        let _ = self.wallets.insert(
            account_id.clone(),
            Wallet {
                account_id: account_id.clone(),
                distributed_key: key,
            },
        );
        Some(account_id)
    }

    /// Remembers a sign conversation until it terminates.
    pub fn track_request(&mut self, conversation: SignConversation) {
        let _ = self
            .requests
            .insert(conversation.session_id.clone(), conversation);
    }

    /// Forgets a terminated sign conversation.
    pub fn finish_request(&mut self, session_id: &SessionId) -> Option<SignConversation> {
        self.requests.remove(session_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::{HashAlg, SignMessage, SignMetadata};
    use rand::rngs::OsRng;
    use serde_json::json;

    fn pairing_data() -> PairingData {
        serde_json::from_value(json!({
            "pairingId": "abc",
            "webEncPublicKey": "00",
            "webEncPrivateKey": "01",
            "webSignPublicKey": "02",
            "webSignPrivateKey": "03",
            "appPublicKey": "04",
            "token": "t",
            "tokenExpiration": 1,
            "deviceName": "Pixel"
        }))
        .unwrap()
    }

    #[test]
    fn nothing_to_adopt_without_recovery() {
        let mut storage = StorageData::new(pairing_data());
        assert_eq!(storage.adopt_recovered_key(), None);

        storage.temp_distributed_key = Some(DistributedKeyShare {
            public_key: "02ab".into(),
            key_share_data: json!({}),
        });
        assert_eq!(storage.adopt_recovered_key(), None);
        assert!(storage.temp_distributed_key.is_some());
        assert!(storage.wallets.is_empty());
    }

    #[test]
    fn requests_are_tracked_until_finished() {
        let mut storage = StorageData::new(pairing_data());
        let session_id = SessionId::random(&mut OsRng);
        storage.track_request(SignConversation {
            session_id: session_id.clone(),
            round: 1,
            message: SignMessage::opening(1),
            is_approved: None,
            expiry: 30_000,
            created_at: 0,
            sign_metadata: SignMetadata::EthSign,
            account_id: 1,
            hash_alg: HashAlg::Keccak256,
            public_key: "02ab".into(),
            sign_message: "hi".into(),
            message_hash: "00".repeat(32),
        });
        let persisted = serde_json::to_value(&storage).unwrap();
        assert!(persisted["requests"][session_id.as_str()].is_object());

        assert!(storage.finish_request(&session_id).is_some());
        assert!(storage.requests.is_empty());
    }
}
