// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Service layer: builds the purchase bridge from platform capabilities and
// answers host method calls encoded as JSON.

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, error, info};

use iapbridge_billing::{MethodCall, MethodResponse, PurchaseBridge, handle_method_call};
use iapbridge_core::BridgeConfig;
use iapbridge_core::error::{BridgeError, Result};
use iapbridge_core::telemetry::init_tracing;
use iapbridge_platform::traits::{BillingService, HostChannel, MainThreadExecutor};
use iapbridge_platform::{platform_billing, platform_host_channel, platform_main_thread};

/// One bridge per host engine, shareable across JNI threads.
#[derive(Clone)]
pub struct BridgeServices {
    bridge: Arc<PurchaseBridge>,
}

impl BridgeServices {
    /// Initialise logging and build a bridge on this platform's capabilities.
    ///
    /// The vendor SDK is not contacted until the host calls `initialize`.
    pub fn init(config: BridgeConfig) -> Result<Self> {
        init_tracing();
        config.validate()?;

        let channel = platform_host_channel(&config.channel_name);
        info!(channel = %config.channel_name, "bridge services initialised");
        Ok(Self::with_capabilities(
            config,
            platform_billing(),
            channel,
            platform_main_thread(),
        ))
    }

    /// [`init`](Self::init) for process entry points: the failure is logged
    /// through `tracing` and returned as an I/O error.
    pub fn launch(config: BridgeConfig) -> std::io::Result<Self> {
        Self::init(config).map_err(|e| {
            error!(error = %e, "bridge services failed to start");
            std::io::Error::other(e)
        })
    }

    /// Build on explicitly supplied capabilities.
    pub fn with_capabilities(
        config: BridgeConfig,
        billing: Arc<dyn BillingService>,
        channel: Arc<dyn HostChannel>,
        main_thread: Arc<dyn MainThreadExecutor>,
    ) -> Self {
        Self {
            bridge: Arc::new(PurchaseBridge::new(config, billing, channel, main_thread)),
        }
    }

    pub fn bridge(&self) -> &Arc<PurchaseBridge> {
        &self.bridge
    }

    pub fn handle_call(&self, call: &MethodCall) -> MethodResponse {
        handle_method_call(&self.bridge, call)
    }

    /// Answer a call whose arguments arrive as a JSON document.
    ///
    /// Empty arguments mean "no arguments". The reply is always JSON.
    pub fn handle_json(&self, method: &str, arguments_json: &str) -> String {
        let response = match parse_arguments(arguments_json) {
            Ok(arguments) => self.handle_call(&MethodCall::new(method, arguments)),
            Err(e) => e.into(),
        };
        response.to_json()
    }

    /// Time out requests the vendor never answered.
    pub fn expire_stale(&self) -> usize {
        let expired = self.bridge.expire_stale(Utc::now());
        if expired > 0 {
            debug!(expired, "stale requests expired");
        }
        expired
    }
}

fn parse_arguments(json: &str) -> Result<Value> {
    if json.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(json)
        .map_err(|e| BridgeError::InvalidArgument(format!("arguments are not valid JSON: {e}")))
}

#[cfg(all(test, not(target_os = "android")))]
mod tests {
    use super::*;
    use serde_json::json;

    fn services() -> BridgeServices {
        BridgeServices::init(BridgeConfig::default()).expect("init")
    }

    fn decode(reply: &str) -> Value {
        serde_json::from_str(reply).expect("reply is JSON")
    }

    #[test]
    fn initialize_degrades_without_vendor_sdk() {
        let svc = services();
        let reply = decode(&svc.handle_json("initialize", ""));

        assert_eq!(reply, json!({ "status": "success", "result": false }));
        assert!(!svc.bridge().is_initialized());
    }

    #[test]
    fn purchase_is_unavailable_without_vendor_sdk() {
        let svc = services();
        svc.handle_json("initialize", "");

        let reply = decode(&svc.handle_json("buyProduct", r#"{"productId":"ai_resume_premium"}"#));
        assert_eq!(reply["status"], "error");
        assert_eq!(reply["code"], "UNAVAILABLE");
    }

    #[test]
    fn unknown_method_is_not_implemented() {
        let reply = decode(&services().handle_json("foo", "{}"));
        assert_eq!(reply, json!({ "status": "notImplemented" }));
    }

    #[test]
    fn malformed_arguments_are_invalid() {
        let reply = decode(&services().handle_json("getProducts", "{not json"));
        assert_eq!(reply["code"], "INVALID_ARGUMENT");
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = BridgeConfig {
            premium_sku: String::new(),
            ..BridgeConfig::default()
        };
        assert!(matches!(BridgeServices::init(config), Err(BridgeError::Config(_))));
    }

    #[test]
    fn launch_reports_invalid_config_as_io_error() {
        let config = BridgeConfig {
            request_timeout_secs: 0,
            ..BridgeConfig::default()
        };
        let err = BridgeServices::launch(config).err().expect("launch should fail");
        assert_eq!(err.kind(), std::io::ErrorKind::Other);
        assert!(err.to_string().contains("request_timeout_secs"));
    }

    #[test]
    fn nothing_to_expire_on_fresh_bridge() {
        assert_eq!(services().expire_stale(), 0);
    }
}
