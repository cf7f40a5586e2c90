// Copyright (c) 2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

use crate::parameters::DEFAULT_SIGN_EXPIRY_MS;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tunables for a [`SignatureSession`](crate::SignatureSession).
///
/// The caller owns persistence; this type only derives `Deserialize` so it
/// can be embedded in whatever configuration format the application uses.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProtocolConfig {
    /// Hard ceiling on the lifetime of one sign session, in milliseconds.
    /// Also sent to the peer as the conversation's `expiry`.
    pub sign_expiry_ms: u64,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            sign_expiry_ms: DEFAULT_SIGN_EXPIRY_MS,
        }
    }
}

impl ProtocolConfig {
    /// Overrides the sign session expiry.
    pub fn with_sign_expiry(mut self, expiry: Duration) -> Self {
        self.sign_expiry_ms = u64::try_from(expiry.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub(crate) fn sign_expiry(&self) -> Duration {
        Duration::from_millis(self.sign_expiry_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_thirty_seconds() {
        assert_eq!(ProtocolConfig::default().sign_expiry(), Duration::from_secs(30));
        let parsed: ProtocolConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(parsed, ProtocolConfig::default());
    }

    #[test]
    fn expiry_can_be_overridden() {
        let config = ProtocolConfig::default().with_sign_expiry(Duration::from_millis(250));
        assert_eq!(config.sign_expiry_ms, 250);
        let parsed: ProtocolConfig = serde_json::from_str(r#"{"signExpiryMs": 5}"#).unwrap();
        assert_eq!(parsed.sign_expiry_ms, 5);
    }
}
