// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>

//! IAP bridge: host entry points.
//!
//! Wires the platform capabilities into a [`PurchaseBridge`] and exposes it
//! to the host shell. On Android the shell reaches it through the JNI
//! exports in `android`; elsewhere the `iapbridge-console` binary drives it
//! from stdin.
//!
//! [`PurchaseBridge`]: iapbridge_billing::PurchaseBridge

pub mod services;

#[cfg(target_os = "android")]
mod android;

pub use services::bridge_services::BridgeServices;
