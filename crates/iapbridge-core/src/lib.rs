// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// IAP bridge: core types, vendor response shapes and error definitions
// shared across all crates.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod types;
pub mod vendor;

pub use config::BridgeConfig;
pub use error::BridgeError;
pub use types::*;
