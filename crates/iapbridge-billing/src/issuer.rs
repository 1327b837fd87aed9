// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Request issuer: validates arguments, calls the vendor SDK and registers the
// returned handle with the correlator.
//
// Callers pass the correlator while holding the bridge's state lock, so the
// handle is trackable before any callback thread can look it up.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument};

use iapbridge_core::error::{BridgeError, Result};
use iapbridge_core::types::{PurchaseReceipt, RequestHandle};
use iapbridge_platform::traits::BillingService;

use crate::correlator::{Correlator, RequestContext};

/// Reject empty or blank product ids.
pub fn validate_product_id(product_id: &str) -> Result<()> {
    if product_id.trim().is_empty() {
        return Err(BridgeError::InvalidArgument(
            "productId must not be empty".into(),
        ));
    }
    Ok(())
}

/// Reject an empty catalog query or one containing an empty id.
pub fn validate_catalog_query(product_ids: &BTreeSet<String>) -> Result<()> {
    if product_ids.is_empty() {
        return Err(BridgeError::InvalidArgument(
            "productIds must not be empty".into(),
        ));
    }
    product_ids.iter().try_for_each(|id| validate_product_id(id))
}

/// Issues billing operations against the vendor SDK.
#[derive(Clone)]
pub struct RequestIssuer {
    billing: Arc<dyn BillingService>,
}

impl RequestIssuer {
    pub fn new(billing: Arc<dyn BillingService>) -> Self {
        Self { billing }
    }

    /// Ask the vendor for catalog data.
    #[instrument(skip_all, fields(skus = product_ids.len()))]
    pub fn query_catalog(
        &self,
        correlator: &mut Correlator,
        product_ids: &BTreeSet<String>,
    ) -> Result<RequestHandle> {
        validate_catalog_query(product_ids)?;
        let handle = self.billing.get_product_data(product_ids)?;
        correlator.register(
            handle.clone(),
            RequestContext::CatalogQuery {
                skus: product_ids.clone(),
            },
            Utc::now(),
        )?;
        info!(request_id = %handle, "catalog query issued");
        Ok(handle)
    }

    /// Start a purchase flow.
    #[instrument(skip(self, correlator))]
    pub fn purchase(&self, correlator: &mut Correlator, product_id: &str) -> Result<RequestHandle> {
        validate_product_id(product_id)?;
        let handle = self.billing.purchase(product_id)?;
        correlator.register(
            handle.clone(),
            RequestContext::Purchase {
                sku: product_id.to_owned(),
            },
            Utc::now(),
        )?;
        info!(request_id = %handle, "purchase issued");
        Ok(handle)
    }

    /// Fetch the first page of purchase history.
    #[instrument(skip(self, correlator))]
    pub fn restore(&self, correlator: &mut Correlator, reset: bool) -> Result<RequestHandle> {
        let handle = self.billing.get_purchase_updates(reset)?;
        correlator.register(
            handle.clone(),
            RequestContext::Restore {
                accumulated: Vec::new(),
                page: 0,
            },
            Utc::now(),
        )?;
        info!(request_id = %handle, "restore issued");
        Ok(handle)
    }

    /// Fetch the next page of an in-progress restore.
    #[instrument(skip(self, correlator, accumulated), fields(receipts = accumulated.len()))]
    pub fn restore_next_page(
        &self,
        correlator: &mut Correlator,
        accumulated: Vec<PurchaseReceipt>,
        page: u32,
    ) -> Result<RequestHandle> {
        let handle = self.billing.get_purchase_updates(false)?;
        correlator.register(
            handle.clone(),
            RequestContext::Restore { accumulated, page },
            Utc::now(),
        )?;
        info!(request_id = %handle, "restore page issued");
        Ok(handle)
    }

    /// Ask the vendor which store account is signed in.
    pub fn user_data(&self, correlator: &mut Correlator) -> Result<RequestHandle> {
        let handle = self.billing.get_user_data()?;
        correlator.register(handle.clone(), RequestContext::UserData, Utc::now())?;
        info!(request_id = %handle, "user data request issued");
        Ok(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::correlator::RequestState;
    use crate::testing::{FakeBilling, VendorCall};

    fn issuer() -> (RequestIssuer, Arc<FakeBilling>) {
        let billing = Arc::new(FakeBilling::default());
        (RequestIssuer::new(billing.clone()), billing)
    }

    #[test]
    fn empty_product_id_is_rejected_before_vendor_call() {
        let (issuer, billing) = issuer();
        let mut c = Correlator::new(8);

        let err = issuer.purchase(&mut c, "").unwrap_err();
        assert!(matches!(err, BridgeError::InvalidArgument(_)));
        assert!(billing.calls().is_empty());
        assert_eq!(c.pending_count(), 0);
    }

    #[test]
    fn catalog_query_rejects_empty_set_and_blank_ids() {
        let (issuer, billing) = issuer();
        let mut c = Correlator::new(8);

        assert!(issuer.query_catalog(&mut c, &BTreeSet::new()).is_err());
        let with_blank: BTreeSet<String> = ["p1".to_string(), " ".to_string()].into();
        assert!(issuer.query_catalog(&mut c, &with_blank).is_err());
        assert!(billing.calls().is_empty());
    }

    #[test]
    fn issued_handle_is_pending_on_return() {
        let (issuer, billing) = issuer();
        let mut c = Correlator::new(8);

        let handle = issuer.purchase(&mut c, "ai_resume_premium").expect("purchase");
        assert_eq!(c.state(&handle), Some(RequestState::Pending));
        assert_eq!(billing.calls(), vec![VendorCall::Purchase("ai_resume_premium".into())]);
    }

    #[test]
    fn vendor_failure_registers_nothing() {
        let (issuer, billing) = issuer();
        billing.fail_requests(true);
        let mut c = Correlator::new(8);

        let err = issuer.restore(&mut c, true).unwrap_err();
        assert!(matches!(err, BridgeError::Vendor(_)));
        assert_eq!(c.pending_count(), 0);
    }

    #[test]
    fn restore_pages_request_without_reset() {
        let (issuer, billing) = issuer();
        let mut c = Correlator::new(8);

        issuer.restore(&mut c, true).expect("first page");
        issuer
            .restore_next_page(&mut c, Vec::new(), 1)
            .expect("second page");

        assert_eq!(
            billing.calls(),
            vec![VendorCall::GetPurchaseUpdates(true), VendorCall::GetPurchaseUpdates(false)]
        );
        assert_eq!(c.pending_count(), 2);
    }
}
