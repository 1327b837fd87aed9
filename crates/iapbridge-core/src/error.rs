// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for the IAP bridge.

use thiserror::Error;

/// Top-level error type for all bridge operations.
///
/// Vendor-reported request failures (a `FAILED` status in a callback) are not
/// errors in this sense: they travel to the host as error events. This enum
/// covers failures of the local call path only.
#[derive(Debug, Error)]
pub enum BridgeError {
    // -- Inbound calls --
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("method not implemented: {0}")]
    UnsupportedOperation(String),

    // -- Vendor SDK --
    #[error("billing initialisation failed: {0}")]
    Initialization(String),

    #[error("billing service is not initialised")]
    NotInitialized,

    #[error("vendor request failed: {0}")]
    Vendor(String),

    // -- Host delivery --
    #[error("notification delivery failed: {0}")]
    Delivery(String),

    // -- Configuration / persistence --
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // -- Platform bridge --
    #[error("platform bridge error: {0}")]
    Bridge(String),

    #[error("feature not available on this platform")]
    PlatformUnavailable,
}

impl BridgeError {
    /// Stable error code reported to the host shell for a failed method call.
    pub fn method_error_code(&self) -> &'static str {
        match self {
            Self::InvalidArgument(_) => "INVALID_ARGUMENT",
            Self::UnsupportedOperation(_) => "NOT_IMPLEMENTED",
            Self::Initialization(_) | Self::NotInitialized | Self::PlatformUnavailable => {
                "UNAVAILABLE"
            }
            Self::Vendor(_) | Self::Bridge(_) => "VENDOR_ERROR",
            Self::Delivery(_) => "DELIVERY_ERROR",
            Self::Config(_) | Self::Io(_) | Self::Serialization(_) => "INTERNAL",
        }
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, BridgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn degraded_billing_reports_unavailable() {
        assert_eq!(BridgeError::NotInitialized.method_error_code(), "UNAVAILABLE");
        assert_eq!(BridgeError::PlatformUnavailable.method_error_code(), "UNAVAILABLE");
        assert_eq!(
            BridgeError::Initialization("listener".into()).method_error_code(),
            "UNAVAILABLE"
        );
    }

    #[test]
    fn argument_errors_keep_their_message() {
        let err = BridgeError::InvalidArgument("productId must not be empty".into());
        assert_eq!(err.method_error_code(), "INVALID_ARGUMENT");
        assert_eq!(err.to_string(), "invalid argument: productId must not be empty");
    }
}
