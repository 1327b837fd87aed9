// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Entitlement resolver.
//
// Premium is always recomputed by scanning the whole known receipt set, never
// patched incrementally.

use iapbridge_core::types::{Entitlement, PurchaseReceipt};

/// Whether `receipt` is a live `ENTITLED` grant for `premium_sku`.
pub fn grants_premium(receipt: &PurchaseReceipt, premium_sku: &str) -> bool {
    receipt.sku == premium_sku
        && receipt.product_type.grants_entitlement()
        && !receipt.is_cancelled()
}

/// Premium flag for a full receipt set.
///
/// Any single qualifying receipt is enough. An empty set is `false`.
pub fn resolve_entitlement(receipts: &[PurchaseReceipt], premium_sku: &str) -> bool {
    receipts.iter().any(|r| grants_premium(r, premium_sku))
}

/// Receipts known to the bridge as of the latest vendor response.
#[derive(Debug, Clone, Default)]
pub struct ReceiptSet {
    receipts: Vec<PurchaseReceipt>,
}

impl ReceiptSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace everything with the result of a completed restore.
    pub fn replace_all(&mut self, receipts: Vec<PurchaseReceipt>) {
        self.receipts = receipts;
    }

    /// Add a receipt from a purchase, replacing any with the same receipt id.
    pub fn upsert(&mut self, receipt: PurchaseReceipt) {
        match self
            .receipts
            .iter_mut()
            .find(|r| r.receipt_id == receipt.receipt_id)
        {
            Some(existing) => *existing = receipt,
            None => self.receipts.push(receipt),
        }
    }

    pub fn clear(&mut self) {
        self.receipts.clear();
    }

    pub fn as_slice(&self) -> &[PurchaseReceipt] {
        &self.receipts
    }

    pub fn len(&self) -> usize {
        self.receipts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receipts.is_empty()
    }
}

/// Resolver bound to the configured premium SKU.
#[derive(Debug, Clone)]
pub struct EntitlementResolver {
    premium_sku: String,
}

impl EntitlementResolver {
    pub fn new(premium_sku: impl Into<String>) -> Self {
        Self {
            premium_sku: premium_sku.into(),
        }
    }

    pub fn premium_sku(&self) -> &str {
        &self.premium_sku
    }

    /// Derive the entitlement from a complete receipt set.
    pub fn resolve(&self, receipts: &[PurchaseReceipt]) -> Entitlement {
        Entitlement::from_premium(resolve_entitlement(receipts, &self.premium_sku))
    }
}
