// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Platform-agnostic capability traits.
//
// The purchase bridge talks to three collaborators it does not own: the
// vendor billing SDK, the host shell's method channel, and the host's main
// thread. Each is a trait so tests can substitute fakes.

use std::collections::BTreeSet;
use std::sync::Arc;

use iapbridge_core::error::Result;
use iapbridge_core::types::RequestHandle;
use iapbridge_core::vendor::{
    ProductDataResponse, PurchaseResponse, PurchaseUpdatesResponse, UserDataResponse,
};

/// Vendor billing SDK (Amazon `PurchasingService`).
///
/// Request methods return the vendor's correlation id synchronously and never
/// wait for the result. Responses arrive later on the registered listener,
/// and must not be delivered from inside the request call that produced them.
pub trait BillingService: Send + Sync {
    /// Register the single listener that receives every response.
    fn register_listener(&self, listener: Arc<dyn BillingListener>) -> Result<()>;

    /// Request catalog data for the given SKUs.
    fn get_product_data(&self, skus: &BTreeSet<String>) -> Result<RequestHandle>;

    /// Start the vendor purchase flow for one SKU.
    fn purchase(&self, sku: &str) -> Result<RequestHandle>;

    /// Request one page of purchase history. `reset` restarts from the
    /// beginning of the history instead of the last-seen offset.
    fn get_purchase_updates(&self, reset: bool) -> Result<RequestHandle>;

    /// Request the current store account.
    fn get_user_data(&self) -> Result<RequestHandle>;
}

/// Receiver for vendor callbacks (`PurchasingListener`).
///
/// Called on whatever thread the vendor SDK chooses.
pub trait BillingListener: Send + Sync {
    fn on_product_data_response(&self, response: ProductDataResponse);

    fn on_purchase_response(&self, response: PurchaseResponse);

    fn on_purchase_updates_response(&self, response: PurchaseUpdatesResponse);

    fn on_user_data_response(&self, response: UserDataResponse);
}

/// Outbound half of the host method channel.
pub trait HostChannel: Send + Sync {
    /// Invoke a named method on the host side. Only call on the main thread.
    fn invoke_method(&self, method: &str, arguments: serde_json::Value) -> Result<()>;
}

/// Unit of work handed to the main thread.
pub type MainThreadTask = Box<dyn FnOnce() + Send + 'static>;

/// The host application's required execution context.
pub trait MainThreadExecutor: Send + Sync {
    /// Hand `task` to the main thread without waiting for it to run.
    fn post(&self, task: MainThreadTask) -> Result<()>;
}
