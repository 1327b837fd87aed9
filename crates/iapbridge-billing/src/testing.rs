// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Test doubles for the platform capabilities.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock, Weak};

use chrono::{TimeZone, Utc};
use serde_json::Value;

use iapbridge_core::BridgeConfig;
use iapbridge_core::error::{BridgeError, Result};
use iapbridge_core::types::{Entitlement, ProductType, PurchaseReceipt, RequestHandle};
use iapbridge_platform::executor::InlineExecutor;
use iapbridge_platform::traits::{BillingListener, BillingService, HostChannel};

use crate::bridge::PurchaseBridge;

/// A vendor SDK call seen by [`FakeBilling`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VendorCall {
    RegisterListener,
    GetProductData(BTreeSet<String>),
    Purchase(String),
    GetPurchaseUpdates(bool),
    GetUserData,
}

/// Records every request and hands out sequential handles `req-1`, `req-2`...
#[derive(Default)]
pub struct FakeBilling {
    calls: Mutex<Vec<VendorCall>>,
    next_id: AtomicU64,
    fail_register: AtomicBool,
    fail_requests: AtomicBool,
}

impl FakeBilling {
    pub fn calls(&self) -> Vec<VendorCall> {
        self.calls.lock().expect("calls lock").clone()
    }

    pub fn fail_register(&self, fail: bool) {
        self.fail_register.store(fail, Ordering::SeqCst);
    }

    pub fn fail_requests(&self, fail: bool) {
        self.fail_requests.store(fail, Ordering::SeqCst);
    }

    fn issue(&self, call: VendorCall) -> Result<RequestHandle> {
        if self.fail_requests.load(Ordering::SeqCst) {
            return Err(BridgeError::Vendor("sdk threw".into()));
        }
        self.calls.lock().expect("calls lock").push(call);
        let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(RequestHandle::new(format!("req-{n}")))
    }
}

impl BillingService for FakeBilling {
    fn register_listener(&self, _listener: Arc<dyn BillingListener>) -> Result<()> {
        if self.fail_register.load(Ordering::SeqCst) {
            return Err(BridgeError::Vendor("registerListener threw".into()));
        }
        self.calls.lock().expect("calls lock").push(VendorCall::RegisterListener);
        Ok(())
    }

    fn get_product_data(&self, skus: &BTreeSet<String>) -> Result<RequestHandle> {
        self.issue(VendorCall::GetProductData(skus.clone()))
    }

    fn purchase(&self, sku: &str) -> Result<RequestHandle> {
        self.issue(VendorCall::Purchase(sku.to_owned()))
    }

    fn get_purchase_updates(&self, reset: bool) -> Result<RequestHandle> {
        self.issue(VendorCall::GetPurchaseUpdates(reset))
    }

    fn get_user_data(&self) -> Result<RequestHandle> {
        self.issue(VendorCall::GetUserData)
    }
}

/// Host channel that remembers every event.
#[derive(Default)]
pub struct RecordingChannel {
    events: Mutex<Vec<(String, Value)>>,
}

impl RecordingChannel {
    pub fn events(&self) -> Vec<(String, Value)> {
        self.events.lock().expect("events lock").clone()
    }

    pub fn method_names(&self) -> Vec<String> {
        self.events().into_iter().map(|(m, _)| m).collect()
    }
}

impl HostChannel for RecordingChannel {
    fn invoke_method(&self, method: &str, arguments: Value) -> Result<()> {
        self.events
            .lock()
            .expect("events lock")
            .push((method.to_owned(), arguments));
        Ok(())
    }
}

/// Host channel whose every delivery fails.
pub struct FailingChannel;

impl HostChannel for FailingChannel {
    fn invoke_method(&self, _method: &str, _arguments: Value) -> Result<()> {
        Err(BridgeError::Delivery("engine detached".into()))
    }
}

/// Host channel that reads the bridge's entitlement on every event, the way a
/// host handler answering `isPurchased` from `onPurchaseUpdated` would.
#[derive(Default)]
pub struct ReentrantChannel {
    bridge: OnceLock<Weak<PurchaseBridge>>,
    seen: Mutex<Vec<Entitlement>>,
}

impl ReentrantChannel {
    pub fn attach(&self, bridge: &Arc<PurchaseBridge>) {
        let _ = self.bridge.set(Arc::downgrade(bridge));
    }

    pub fn seen(&self) -> Vec<Entitlement> {
        self.seen.lock().expect("seen lock").clone()
    }
}

impl HostChannel for ReentrantChannel {
    fn invoke_method(&self, _method: &str, _arguments: Value) -> Result<()> {
        if let Some(bridge) = self.bridge.get().and_then(Weak::upgrade) {
            let entitlement = bridge.entitlement();
            self.seen.lock().expect("seen lock").push(entitlement);
        }
        Ok(())
    }
}

/// A receipt bought on a fixed date.
pub fn receipt(id: &str, sku: &str, product_type: ProductType) -> PurchaseReceipt {
    PurchaseReceipt {
        receipt_id: id.into(),
        sku: sku.into(),
        product_type,
        purchase_date: Utc.with_ymd_and_hms(2026, 2, 1, 12, 0, 0).unwrap(),
        cancel_date: None,
    }
}

/// Bridge wired to fakes, delivering events inline.
pub struct Harness {
    pub bridge: Arc<PurchaseBridge>,
    pub billing: Arc<FakeBilling>,
    pub channel: Arc<RecordingChannel>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(BridgeConfig::default())
    }

    pub fn with_config(config: BridgeConfig) -> Self {
        let billing = Arc::new(FakeBilling::default());
        let channel = Arc::new(RecordingChannel::default());
        let bridge = Arc::new(PurchaseBridge::new(
            config,
            billing.clone(),
            channel.clone(),
            Arc::new(InlineExecutor),
        ));
        Self {
            bridge,
            billing,
            channel,
        }
    }

    /// A harness whose bridge has already been initialised.
    pub fn initialized() -> Self {
        let harness = Self::new();
        harness.bridge.initialize().expect("initialize");
        harness
    }
}
