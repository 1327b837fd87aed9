// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Bridge configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{BridgeError, Result};

/// Settings for one bridge instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// SKU whose durable receipt unlocks premium.
    pub premium_sku: String,
    /// Method channel name the host shell listens on.
    pub channel_name: String,
    /// Currency code attached to catalog entries (the vendor omits it).
    pub default_currency_code: String,
    /// Currency symbol attached to catalog entries.
    pub default_currency_symbol: String,
    /// Seconds a request may stay pending before it is timed out locally.
    pub request_timeout_secs: u64,
    /// Terminal request records kept for redelivery diagnostics.
    pub terminal_history: usize,
    /// `reset` flag for the first purchase-updates page of a restore.
    pub restore_reset: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            premium_sku: "ai_resume_premium".into(),
            channel_name: "com.visha.airesume/amazon_iap".into(),
            default_currency_code: "USD".into(),
            default_currency_symbol: "$".into(),
            request_timeout_secs: 120,
            terminal_history: 64,
            restore_reset: true,
        }
    }
}

impl BridgeConfig {
    /// Parse and validate a JSON config. Missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config file. Fails if the file is missing or invalid.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&data)
    }

    /// Load a config file, falling back to defaults if it cannot be used.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Self::load(path) {
            Ok(config) => {
                debug!(path = %path.display(), "bridge config loaded");
                config
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "using default bridge config");
                Self::default()
            }
        }
    }

    /// Persist the config as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), json)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.premium_sku.trim().is_empty() {
            return Err(BridgeError::Config("premium_sku must not be empty".into()));
        }
        if self.request_timeout_secs == 0 {
            return Err(BridgeError::Config(
                "request_timeout_secs must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
