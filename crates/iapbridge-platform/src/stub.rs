// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Stub capabilities for desktop/CI builds where the Appstore SDK is absent.
//
// Every billing request returns `PlatformUnavailable`, so the bridge's
// initialisation fails and purchase features degrade to unavailable.

use std::collections::BTreeSet;
use std::sync::Arc;

use iapbridge_core::error::{BridgeError, Result};
use iapbridge_core::types::RequestHandle;

use crate::traits::*;

/// No-op billing service returned on non-Android platforms.
pub struct StubBillingService;

impl BillingService for StubBillingService {
    fn register_listener(&self, _listener: Arc<dyn BillingListener>) -> Result<()> {
        tracing::warn!("BillingService::register_listener called on stub platform");
        Err(BridgeError::PlatformUnavailable)
    }

    fn get_product_data(&self, _skus: &BTreeSet<String>) -> Result<RequestHandle> {
        tracing::warn!("BillingService::get_product_data called on stub platform");
        Err(BridgeError::PlatformUnavailable)
    }

    fn purchase(&self, _sku: &str) -> Result<RequestHandle> {
        tracing::warn!("BillingService::purchase called on stub platform");
        Err(BridgeError::PlatformUnavailable)
    }

    fn get_purchase_updates(&self, _reset: bool) -> Result<RequestHandle> {
        Err(BridgeError::PlatformUnavailable)
    }

    fn get_user_data(&self) -> Result<RequestHandle> {
        Err(BridgeError::PlatformUnavailable)
    }
}

/// Host channel that only logs. Desktop builds have no shell to notify.
pub struct StubHostChannel {
    channel_name: String,
}

impl StubHostChannel {
    pub fn new(channel_name: &str) -> Self {
        Self {
            channel_name: channel_name.to_owned(),
        }
    }
}

impl HostChannel for StubHostChannel {
    fn invoke_method(&self, method: &str, arguments: serde_json::Value) -> Result<()> {
        tracing::debug!(
            channel = %self.channel_name,
            method,
            arguments = %arguments,
            "host event dropped on stub platform"
        );
        Ok(())
    }
}
