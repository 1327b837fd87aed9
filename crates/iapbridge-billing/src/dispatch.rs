// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Inbound method dispatch: host method-channel calls to bridge operations.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use iapbridge_core::error::{BridgeError, Result};

use crate::bridge::PurchaseBridge;

/// One call from the host shell.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MethodCall {
    pub method: String,
    #[serde(default)]
    pub arguments: Value,
}

impl MethodCall {
    pub fn new(method: impl Into<String>, arguments: Value) -> Self {
        Self {
            method: method.into(),
            arguments,
        }
    }

    /// Optional string argument. A missing key or a non-string value is `None`.
    fn string_arg(&self, key: &str) -> Option<&str> {
        self.arguments.get(key).and_then(Value::as_str)
    }

    /// Optional list-of-strings argument.
    fn string_list_arg(&self, key: &str) -> Result<BTreeSet<String>> {
        match self.arguments.get(key) {
            None | Some(Value::Null) => Ok(BTreeSet::new()),
            Some(value) => serde_json::from_value(value.clone()).map_err(|e| {
                BridgeError::InvalidArgument(format!("{key} must be a list of strings: {e}"))
            }),
        }
    }
}

/// Reply to a [`MethodCall`], encoded as JSON at the host boundary.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum MethodResponse {
    Success { result: Value },
    Error { code: String, message: String },
    NotImplemented,
}

impl MethodResponse {
    pub fn success(result: impl Into<Value>) -> Self {
        Self::Success {
            result: result.into(),
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            warn!(error = %e, "failed to encode method response");
            r#"{"status":"error","code":"INTERNAL","message":"encoding failed"}"#.to_owned()
        })
    }
}

impl From<BridgeError> for MethodResponse {
    fn from(e: BridgeError) -> Self {
        match e {
            BridgeError::UnsupportedOperation(_) => Self::NotImplemented,
            e => Self::Error {
                code: e.method_error_code().to_owned(),
                message: e.to_string(),
            },
        }
    }
}

/// Route one host call to the bridge.
///
/// Request operations answer `true` once the vendor request has been issued;
/// the outcome arrives later as an outbound event.
pub fn handle_method_call(bridge: &Arc<PurchaseBridge>, call: &MethodCall) -> MethodResponse {
    debug!(method = %call.method, "host method call");
    let outcome = match call.method.as_str() {
        // Initialisation failure is reported as `false`, not as an error:
        // the host carries on with purchases disabled.
        "initialize" => return MethodResponse::success(bridge.initialize().is_ok()),
        "getProducts" => call
            .string_list_arg("productIds")
            .and_then(|ids| bridge.query_catalog(&ids)),
        "buyProduct" => bridge.purchase(call.string_arg("productId").unwrap_or_default()),
        "restorePurchases" => bridge.restore_purchases(),
        "isPurchased" => return MethodResponse::success(bridge.entitlement().is_premium()),
        other => Err(BridgeError::UnsupportedOperation(other.to_owned())),
    };

    match outcome {
        Ok(_) => MethodResponse::success(true),
        Err(e) => {
            warn!(method = %call.method, error = %e, "host method call failed");
            e.into()
        }
    }
}
