// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>

//! IAP bridge: native platform capabilities.
//!
//! This crate defines the capability traits the purchase bridge depends on
//! (vendor billing SDK, host method channel, main-thread executor) and the
//! per-platform implementations behind them. The bridge never reaches for a
//! global SDK singleton; it is handed these capabilities at construction.

pub mod executor;
pub mod traits;

#[cfg(target_os = "android")]
pub mod android;

#[cfg(not(target_os = "android"))]
pub mod stub;

use std::sync::Arc;

/// Billing SDK implementation for the target operating system.
pub fn platform_billing() -> Arc<dyn traits::BillingService> {
    #[cfg(target_os = "android")]
    {
        // Android: Amazon `PurchasingService` through JNI.
        Arc::new(android::AndroidBillingService::new())
    }
    #[cfg(not(target_os = "android"))]
    {
        // DESKTOP/CI: no vendor SDK; every request reports unavailable.
        Arc::new(stub::StubBillingService)
    }
}

/// Outbound method channel for the target operating system.
pub fn platform_host_channel(channel_name: &str) -> Arc<dyn traits::HostChannel> {
    #[cfg(target_os = "android")]
    {
        Arc::new(android::AndroidHostChannel::new(channel_name))
    }
    #[cfg(not(target_os = "android"))]
    {
        Arc::new(stub::StubHostChannel::new(channel_name))
    }
}

/// Executor bound to the host application's main (UI) thread.
pub fn platform_main_thread() -> Arc<dyn traits::MainThreadExecutor> {
    #[cfg(target_os = "android")]
    {
        Arc::new(android::AndroidMainThread)
    }
    #[cfg(not(target_os = "android"))]
    {
        // Desktop hosts have no UI looper to hand off to.
        Arc::new(executor::InlineExecutor)
    }
}
