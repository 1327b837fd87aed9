// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Purchase bridge: the stateful adapter between the host shell and the
// vendor billing SDK.
//
// All mutable state (pending requests, known receipts, the resolved
// entitlement, the signed-in account) lives behind one mutex. Request entry
// points hold it across the vendor call and the correlator registration;
// vendor callbacks take it before correlating. Host events are built under
// the lock and forwarded by the same call once the lock is released.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, instrument, warn};

use iapbridge_core::BridgeConfig;
use iapbridge_core::error::{BridgeError, Result};
use iapbridge_core::types::{
    Entitlement, ProductDescriptor, ProductType, PurchaseReceipt, RequestHandle, RequestKind,
    RequestStatus, UserData,
};
use iapbridge_core::vendor::{
    ProductDataResponse, PurchaseResponse, PurchaseUpdatesResponse, UserDataResponse,
    VendorProduct,
};
use iapbridge_platform::traits::{BillingListener, BillingService, HostChannel, MainThreadExecutor};

use crate::correlator::{Correlation, Correlator, RequestContext, RequestState};
use crate::entitlement::{EntitlementResolver, ReceiptSet};
use crate::forwarder::{ErrorEventKind, NotificationForwarder, OutboundEvent};
use crate::issuer::{RequestIssuer, validate_catalog_query, validate_product_id};

const TIMED_OUT_MESSAGE: &str = "Request timed out";

/// Mutable bridge state guarded by [`PurchaseBridge::state`].
struct BridgeState {
    initialized: bool,
    correlator: Correlator,
    receipts: ReceiptSet,
    entitlement: Entitlement,
    user: Option<UserData>,
}

/// Stateful purchase bridge for one host engine.
pub struct PurchaseBridge {
    config: BridgeConfig,
    billing: Arc<dyn BillingService>,
    issuer: RequestIssuer,
    resolver: EntitlementResolver,
    forwarder: NotificationForwarder,
    state: Mutex<BridgeState>,
}

impl PurchaseBridge {
    /// Build a bridge from its capabilities. Nothing is sent to the vendor
    /// until [`initialize`](Self::initialize).
    pub fn new(
        config: BridgeConfig,
        billing: Arc<dyn BillingService>,
        channel: Arc<dyn HostChannel>,
        main_thread: Arc<dyn MainThreadExecutor>,
    ) -> Self {
        let state = BridgeState {
            initialized: false,
            correlator: Correlator::new(config.terminal_history),
            receipts: ReceiptSet::new(),
            entitlement: Entitlement::Unknown,
            user: None,
        };
        Self {
            issuer: RequestIssuer::new(Arc::clone(&billing)),
            resolver: EntitlementResolver::new(config.premium_sku.clone()),
            forwarder: NotificationForwarder::new(channel, main_thread),
            billing,
            config,
            state: Mutex::new(state),
        }
    }

    /// Register with the vendor SDK and request the signed-in account.
    ///
    /// A registration failure leaves the bridge uninitialised: every later
    /// request fails with `NotInitialized` until a retry succeeds. Calling
    /// this again after success is a no-op.
    #[instrument(skip_all)]
    pub fn initialize(self: &Arc<Self>) -> Result<()> {
        let mut state = self.lock_state();
        if state.initialized {
            debug!("billing already initialised");
            return Ok(());
        }

        let listener: Arc<dyn BillingListener> = Arc::clone(self) as Arc<dyn BillingListener>;
        if let Err(e) = self.billing.register_listener(listener) {
            error!(error = %e, "billing listener registration failed; purchases unavailable");
            return Err(BridgeError::Initialization(e.to_string()));
        }
        state.initialized = true;
        info!(premium_sku = %self.config.premium_sku, "billing initialised");

        if let Err(e) = self.issuer.user_data(&mut state.correlator) {
            warn!(error = %e, "user data request failed");
        }
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.lock_state().initialized
    }

    /// Request catalog data. The result arrives as `onProductsReceived` or
    /// `onProductsError`.
    #[instrument(skip_all, fields(skus = product_ids.len()))]
    pub fn query_catalog(&self, product_ids: &BTreeSet<String>) -> Result<RequestHandle> {
        validate_catalog_query(product_ids)?;
        let mut state = self.ready_state()?;
        self.issuer.query_catalog(&mut state.correlator, product_ids)
    }

    /// Start a purchase. The result arrives as `onPurchaseUpdated` or
    /// `onPurchaseError`.
    #[instrument(skip(self))]
    pub fn purchase(&self, product_id: &str) -> Result<RequestHandle> {
        validate_product_id(product_id)?;
        let mut state = self.ready_state()?;
        self.issuer.purchase(&mut state.correlator, product_id)
    }

    /// Re-fetch the full purchase history. The result arrives as
    /// `onPurchaseUpdated` or `onRestoreError`.
    #[instrument(skip_all)]
    pub fn restore_purchases(&self) -> Result<RequestHandle> {
        let mut state = self.ready_state()?;
        self.issuer.restore(&mut state.correlator, self.config.restore_reset)
    }

    /// Last resolved entitlement. `Unknown` until a purchase or restore
    /// has resolved for the current account.
    pub fn entitlement(&self) -> Entitlement {
        self.lock_state().entitlement
    }

    pub fn user(&self) -> Option<UserData> {
        self.lock_state().user.clone()
    }

    pub fn pending_requests(&self) -> usize {
        self.lock_state().correlator.pending_count()
    }

    pub fn request_state(&self, handle: &RequestHandle) -> Option<RequestState> {
        self.lock_state().correlator.state(handle)
    }

    /// Time out requests that have been pending longer than the configured
    /// timeout, notifying the host once per request. Returns how many expired.
    #[instrument(skip(self))]
    pub fn expire_stale(&self, now: DateTime<Utc>) -> usize {
        let expired = self
            .lock_state()
            .correlator
            .expire(now, self.config.request_timeout());

        let count = expired.len();
        let events: Vec<OutboundEvent> = expired
            .into_iter()
            .filter_map(|(handle, context)| {
                let kind = match context.kind() {
                    RequestKind::CatalogQuery => ErrorEventKind::Products,
                    RequestKind::Purchase => ErrorEventKind::Purchase,
                    RequestKind::Restore => ErrorEventKind::Restore,
                    RequestKind::UserData => {
                        debug!(request_id = %handle, "user data request timed out");
                        return None;
                    }
                };
                Some(OutboundEvent::error(kind, TIMED_OUT_MESSAGE))
            })
            .collect();
        self.forward_all(events);
        count
    }

    // -- internals -----------------------------------------------------------

    /// Poisoning is ignored: every transition is a single assignment.
    fn lock_state(&self) -> MutexGuard<'_, BridgeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn ready_state(&self) -> Result<MutexGuard<'_, BridgeState>> {
        let state = self.lock_state();
        if !state.initialized {
            return Err(BridgeError::NotInitialized);
        }
        Ok(state)
    }

    /// Match a callback to its pending request, logging and dropping misses.
    fn correlate(
        state: &mut BridgeState,
        handle: &RequestHandle,
        kind: RequestKind,
        status: RequestStatus,
        outcome: RequestState,
    ) -> Option<RequestContext> {
        match state.correlator.settle(handle, kind, outcome) {
            Correlation::Matched(context) => {
                info!(request_id = %handle, %kind, %status, "vendor response");
                Some(context)
            }
            Correlation::Unknown => {
                warn!(request_id = %handle, %kind, %status, "response for unknown request dropped");
                None
            }
            Correlation::AlreadyTerminal(previous) => {
                debug!(request_id = %handle, %kind, ?previous, "redelivered response dropped");
                None
            }
            Correlation::KindMismatch { expected } => {
                warn!(request_id = %handle, %kind, %expected, "response kind mismatch dropped");
                None
            }
        }
    }

    /// Record the account a response belongs to. A different account
    /// invalidates everything known about the previous one.
    fn observe_user(state: &mut BridgeState, user: Option<UserData>) {
        let Some(user) = user else {
            return;
        };
        if let Some(previous) = &state.user {
            if previous.user_id != user.user_id {
                info!(marketplace = %user.marketplace, "store account changed; clearing receipts");
                state.receipts.clear();
                state.entitlement = Entitlement::Unknown;
            }
        }
        state.user = Some(user);
    }

    /// Re-derive the entitlement from the full receipt set.
    fn rederive(&self, state: &mut BridgeState) -> Entitlement {
        let entitlement = self.resolver.resolve(state.receipts.as_slice());
        if entitlement != state.entitlement {
            info!(from = ?state.entitlement, to = ?entitlement, "entitlement changed");
        }
        state.entitlement = entitlement;
        entitlement
    }

    /// Build the host-facing catalog: one entry per SKU, sorted by SKU.
    fn catalog(&self, products: Vec<VendorProduct>) -> Vec<ProductDescriptor> {
        let by_sku: BTreeMap<String, VendorProduct> =
            products.into_iter().map(|p| (p.sku.clone(), p)).collect();
        by_sku
            .into_values()
            .map(|p| ProductDescriptor {
                id: p.sku,
                title: p.title,
                description: p.description,
                price: p.price,
                currency_code: self.config.default_currency_code.clone(),
                currency_symbol: self.config.default_currency_symbol.clone(),
            })
            .collect()
    }
}

fn outcome_for(status: RequestStatus) -> RequestState {
    match status {
        RequestStatus::Successful | RequestStatus::AlreadyPurchased => RequestState::Resolved,
        _ => RequestState::Failed,
    }
}

impl PurchaseBridge {
    fn settle_product_data(&self, response: ProductDataResponse) -> Option<OutboundEvent> {
        let mut state = self.lock_state();
        let Some(RequestContext::CatalogQuery { skus }) = Self::correlate(
            &mut state,
            &response.request_id,
            RequestKind::CatalogQuery,
            response.status,
            outcome_for(response.status),
        ) else {
            return None;
        };

        let event = match response.status {
            RequestStatus::Successful => {
                if !response.unavailable_skus.is_empty() {
                    warn!(unavailable = ?response.unavailable_skus, "vendor reported unavailable SKUs");
                }
                let products = self.catalog(response.products);
                debug!(requested = skus.len(), received = products.len(), "catalog received");
                OutboundEvent::ProductsReceived(products)
            }
            RequestStatus::Failed => {
                OutboundEvent::error(ErrorEventKind::Products, "Failed to get products")
            }
            _ => OutboundEvent::error(ErrorEventKind::Products, "Unknown error getting products"),
        };
        Some(event)
    }

    fn settle_purchase(&self, response: PurchaseResponse) -> Option<OutboundEvent> {
        let mut state = self.lock_state();
        let Some(RequestContext::Purchase { sku }) = Self::correlate(
            &mut state,
            &response.request_id,
            RequestKind::Purchase,
            response.status,
            outcome_for(response.status),
        ) else {
            return None;
        };
        Self::observe_user(&mut state, response.user_data);

        let event = match response.status {
            RequestStatus::Successful => {
                match response.receipt {
                    Some(receipt) => {
                        if receipt.sku != sku {
                            warn!(requested = %sku, received = %receipt.sku, "receipt SKU differs from purchase");
                        }
                        state.receipts.upsert(receipt);
                    }
                    None => warn!(%sku, "successful purchase without a receipt"),
                }
                let entitlement = self.rederive(&mut state);
                OutboundEvent::PurchaseUpdated {
                    is_premium: entitlement.is_premium(),
                }
            }
            RequestStatus::AlreadyPurchased => {
                // Ownership is confirmed without a receipt; record it as one so
                // later rescans still see it. A restore replaces it.
                debug!(%sku, "vendor confirmed existing ownership");
                state.receipts.upsert(ownership_receipt(&sku, Utc::now()));
                let entitlement = self.rederive(&mut state);
                OutboundEvent::PurchaseUpdated {
                    is_premium: entitlement.is_premium(),
                }
            }
            status => OutboundEvent::error(
                ErrorEventKind::Purchase,
                format!("Purchase failed with status: {status}"),
            ),
        };
        Some(event)
    }

    fn settle_purchase_updates(&self, response: PurchaseUpdatesResponse) -> Option<OutboundEvent> {
        let mut state = self.lock_state();
        let Some(RequestContext::Restore { accumulated, page }) = Self::correlate(
            &mut state,
            &response.request_id,
            RequestKind::Restore,
            response.status,
            outcome_for(response.status),
        ) else {
            return None;
        };
        Self::observe_user(&mut state, response.user_data);

        if response.status != RequestStatus::Successful {
            return Some(OutboundEvent::error(
                ErrorEventKind::Restore,
                format!("Restore failed with status: {}", response.status),
            ));
        }

        let mut receipts = accumulated;
        receipts.extend(response.receipts);

        if response.has_more {
            return match self
                .issuer
                .restore_next_page(&mut state.correlator, receipts, page + 1)
            {
                Ok(next) => {
                    debug!(request_id = %next, page = page + 1, "awaiting next restore page");
                    None
                }
                Err(e) => {
                    error!(error = %e, "could not request next restore page");
                    Some(OutboundEvent::error(
                        ErrorEventKind::Restore,
                        format!("Restore failed: {e}"),
                    ))
                }
            };
        }

        debug!(receipts = receipts.len(), pages = page + 1, "restore complete");
        state.receipts.replace_all(receipts);
        let entitlement = self.rederive(&mut state);
        Some(OutboundEvent::PurchaseUpdated {
            is_premium: entitlement.is_premium(),
        })
    }

    fn forward_all(&self, events: impl IntoIterator<Item = OutboundEvent>) {
        for event in events {
            self.forwarder.forward(event);
        }
    }
}

/// Stand-in receipt for a vendor `ALREADY_PURCHASED` answer. Keyed by SKU, so
/// repeated answers replace each other.
fn ownership_receipt(sku: &str, confirmed_at: DateTime<Utc>) -> PurchaseReceipt {
    PurchaseReceipt {
        receipt_id: format!("owned:{sku}"),
        sku: sku.to_owned(),
        product_type: ProductType::Entitled,
        purchase_date: confirmed_at,
        cancel_date: None,
    }
}

// Events are built under the state lock and forwarded after it is released,
// so a host channel may call back into the bridge.
impl BillingListener for PurchaseBridge {
    fn on_product_data_response(&self, response: ProductDataResponse) {
        self.forward_all(self.settle_product_data(response));
    }

    fn on_purchase_response(&self, response: PurchaseResponse) {
        self.forward_all(self.settle_purchase(response));
    }

    fn on_purchase_updates_response(&self, response: PurchaseUpdatesResponse) {
        self.forward_all(self.settle_purchase_updates(response));
    }

    fn on_user_data_response(&self, response: UserDataResponse) {
        let mut state = self.lock_state();
        let Some(RequestContext::UserData) = Self::correlate(
            &mut state,
            &response.request_id,
            RequestKind::UserData,
            response.status,
            outcome_for(response.status),
        ) else {
            return;
        };

        match (response.status, response.user_data) {
            (RequestStatus::Successful, Some(user)) => Self::observe_user(&mut state, Some(user)),
            (status, _) => warn!(%status, "user data unavailable"),
        }
    }
}
