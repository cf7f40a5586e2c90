// Copyright (c) 2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

use crate::{
    backup::BackupCodec,
    errors::{ProtocolError, Result},
    keyshare::DistributedKeyShare,
    messages::{PairingAck, PairingDescriptor},
    pairing::data::{PairingData, PairingIdentity},
    protocol::PairingId,
    relay::{send_pairing_ack, RelayClient},
    storage::StorageData,
};
use rand::rngs::OsRng;
use std::{fmt::Debug, sync::Arc, time::Instant};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

/// Where a [`PairingCoordinator`] is in the handshake.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PairingState {
    /// `init` has not been called.
    Uninitialized,
    /// A descriptor has been handed out and no token obtained yet.
    Initialized,
    /// A token was obtained; the pending identity is gone.
    Paired,
}

/// Result of a successful [`PairingCoordinator::get_token`].
#[derive(Debug)]
pub struct TokenOutcome {
    /// State the caller should persist.
    pub storage: StorageData,
    /// Wall time spent in `get_token`, in milliseconds.
    pub elapsed_time_ms: u64,
    /// Name of the paired device.
    pub device_name: String,
    /// Whether a key share was recovered from the peer's backup.
    pub used_backup_data: bool,
}

/// Result of a successful [`PairingCoordinator::refresh_token`].
#[derive(Debug)]
pub struct RefreshOutcome {
    /// Copy of the input with the renewed token merged in.
    pub new_pairing_data: PairingData,
    /// Wall time spent in `refresh_token`, in milliseconds.
    pub elapsed_time_ms: u64,
}

/// Drives the pairing handshake with the peer device through the relay.
pub struct PairingCoordinator<R: ?Sized> {
    relay: Arc<R>,
    backup: Option<BackupCodec>,
    pending: Option<PairingIdentity>,
    state: PairingState,
}

impl<R: RelayClient + ?Sized> PairingCoordinator<R> {
    /// A coordinator without a backup key. Any backup offered by the peer is
    /// treated as undecodable.
    pub fn new(relay: Arc<R>) -> Self {
        Self {
            relay,
            backup: None,
            pending: None,
            state: PairingState::Uninitialized,
        }
    }

    /// Lets the coordinator recover key shares from the peer's backup.
    pub fn with_backup_codec(mut self, codec: BackupCodec) -> Self {
        self.backup = Some(codec);
        self
    }

    #[allow(missing_docs)]
    pub fn state(&self) -> PairingState {
        self.state
    }

    /// The pairing id of the pending handshake, if any.
    pub fn pending_pairing_id(&self) -> Option<&PairingId> {
        self.pending.as_ref().map(|identity| &identity.pairing_id)
    }

    /// Starts a new handshake and returns what to show the peer.
    #[instrument(skip_all)]
    pub fn init(&mut self) -> PairingDescriptor {
        let mut rng = OsRng;
        let identity = PairingIdentity::generate(&mut rng);
        if let Some(previous) = &self.pending {
            warn!(
                "Replacing pending pairing {} with {}",
                previous.pairing_id, identity.pairing_id
            );
        }
        let descriptor = identity.descriptor();
        info!("Initialized pairing {}", descriptor.pairing_id);
        self.pending = Some(identity);
        self.state = PairingState::Initialized;
        descriptor
    }

    /// Exchanges the pending identity for a relay token, recovering a key
    /// share from the peer's backup when one is offered.
    ///
    /// The pending identity is only dropped on success, so a failed call can
    /// be retried.
    #[instrument(skip_all, err(Debug))]
    pub async fn get_token(&mut self) -> Result<TokenOutcome> {
        let start = Instant::now();
        let identity = self.pending.as_ref().ok_or_else(|| {
            error!("get_token called before init");
            ProtocolError::PairingNotInitialized
        })?;
        let pairing_id = identity.pairing_id.clone();
        let signature = identity.signing.sign_hex(pairing_id.as_bytes());

        let grant = self.relay.get_token(&pairing_id, &signature).await?;
        info!("Obtained token for pairing {}", pairing_id);

        let recovered = match &grant.backup_data {
            Some(blob) => Some(self.recover_backup(&grant.token, &pairing_id, blob).await?),
            None => None,
        };
        if recovered.is_none() {
            send_pairing_ack(
                self.relay.as_ref(),
                &grant.token,
                PairingAck { is_paired: true },
                &pairing_id,
            )
            .await?;
        }

        let identity = self
            .pending
            .take()
            .ok_or(ProtocolError::PairingNotInitialized)?;
        self.state = PairingState::Paired;

        let used_backup_data = recovered.is_some();
        let mut storage = StorageData::new(identity.into_pairing_data(&grant));
        if let Some(share) = recovered {
            storage.temp_distributed_key = Some(share);
            storage.account_id = Some(Uuid::new_v4().to_string());
        }
        info!(
            "Paired with {} (backup used: {})",
            grant.device_name, used_backup_data
        );

        Ok(TokenOutcome {
            storage,
            elapsed_time_ms: elapsed_ms(start),
            device_name: grant.device_name,
            used_backup_data,
        })
    }

    /// Decodes the offered backup and acknowledges the outcome to the peer.
    /// The negative acknowledgement goes out before the error is returned.
    async fn recover_backup(
        &self,
        token: &str,
        pairing_id: &PairingId,
        blob: &str,
    ) -> Result<DistributedKeyShare> {
        let decoded = match &self.backup {
            Some(codec) => codec.decode(blob),
            None => Err(ProtocolError::InvalidBackupData(
                "no backup key configured".into(),
            )),
        };
        match decoded {
            Ok(share) => {
                send_pairing_ack(
                    self.relay.as_ref(),
                    token,
                    PairingAck { is_paired: true },
                    pairing_id,
                )
                .await?;
                Ok(share)
            }
            Err(e) => {
                if let Err(ack_err) = send_pairing_ack(
                    self.relay.as_ref(),
                    token,
                    PairingAck { is_paired: false },
                    pairing_id,
                )
                .await
                {
                    warn!("Could not send negative pairing ack: {:?}", ack_err);
                }
                Err(e)
            }
        }
    }

    /// Renews the token in `pairing_data`. The input is left untouched.
    #[instrument(skip_all, err(Debug))]
    pub async fn refresh_token(&self, pairing_data: &PairingData) -> Result<RefreshOutcome> {
        let start = Instant::now();
        let signing = pairing_data.signing_keys()?;
        let signature = signing.sign_hex(pairing_data.token.as_bytes());

        let refresh = self
            .relay
            .refresh_token(&pairing_data.token, &signature)
            .await?;
        info!("Refreshed token for pairing {}", pairing_data.pairing_id);

        Ok(RefreshOutcome {
            new_pairing_data: pairing_data.merged_with(refresh),
            elapsed_time_ms: elapsed_ms(start),
        })
    }
}

impl<R: ?Sized> Debug for PairingCoordinator<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PairingCoordinator")
            .field("state", &self.state)
            .field("has_backup_key", &self.backup.is_some())
            .field("pending", &self.pending)
            .finish()
    }
}

pub(crate) fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}
