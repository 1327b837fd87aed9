// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the purchase bridge.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Correlation id for one issued billing request.
///
/// The vendor SDK mints these (`RequestId` on Amazon). The bridge treats
/// them as opaque strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestHandle(pub String);

impl RequestHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RequestHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Vendor product classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProductType {
    /// Used up on fulfilment.
    Consumable,
    /// One-time durable unlock. The only type that grants premium.
    Entitled,
    /// Recurring plan.
    Subscription,
}

impl ProductType {
    /// Whether a receipt of this type grants the premium entitlement.
    pub fn grants_entitlement(self) -> bool {
        matches!(self, Self::Entitled)
    }
}

/// Status carried by every vendor callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestStatus {
    Successful,
    Failed,
    InvalidSku,
    AlreadyPurchased,
    NotSupported,
    Pending,
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Successful => "SUCCESSFUL",
            Self::Failed => "FAILED",
            Self::InvalidSku => "INVALID_SKU",
            Self::AlreadyPurchased => "ALREADY_PURCHASED",
            Self::NotSupported => "NOT_SUPPORTED",
            Self::Pending => "PENDING",
        };
        f.write_str(s)
    }
}

/// Which billing operation a request belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestKind {
    CatalogQuery,
    Purchase,
    Restore,
    UserData,
}

impl std::fmt::Display for RequestKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::CatalogQuery => "catalog-query",
            Self::Purchase => "purchase",
            Self::Restore => "restore",
            Self::UserData => "user-data",
        };
        f.write_str(s)
    }
}

/// Catalog entry forwarded to the host as part of `onProductsReceived`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDescriptor {
    pub id: String,
    pub title: String,
    pub description: String,
    pub price: String,
    pub currency_code: String,
    pub currency_symbol: String,
}

/// Proof of one purchase, as reported by the vendor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseReceipt {
    pub receipt_id: String,
    pub sku: String,
    pub product_type: ProductType,
    pub purchase_date: DateTime<Utc>,
    /// Set when the purchase was refunded or revoked.
    #[serde(default)]
    pub cancel_date: Option<DateTime<Utc>>,
}

impl PurchaseReceipt {
    pub fn is_cancelled(&self) -> bool {
        self.cancel_date.is_some()
    }
}

/// Store account the receipts belong to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserData {
    pub user_id: String,
    pub marketplace: String,
}

/// Derived premium state. Never stored as a source of truth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Entitlement {
    /// No receipt set has been resolved yet (or the account changed).
    #[default]
    Unknown,
    NotEntitled,
    Entitled,
}

impl Entitlement {
    pub fn from_premium(is_premium: bool) -> Self {
        if is_premium {
            Self::Entitled
        } else {
            Self::NotEntitled
        }
    }

    /// Premium flag as reported to the host; unknown reads as not premium.
    pub fn is_premium(self) -> bool {
        matches!(self, Self::Entitled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_entitled_type_grants_entitlement() {
        assert!(ProductType::Entitled.grants_entitlement());
        assert!(!ProductType::Subscription.grants_entitlement());
        assert!(!ProductType::Consumable.grants_entitlement());
    }

    #[test]
    fn status_displays_in_vendor_spelling() {
        assert_eq!(RequestStatus::AlreadyPurchased.to_string(), "ALREADY_PURCHASED");
        let parsed: RequestStatus = serde_json::from_str("\"NOT_SUPPORTED\"").expect("parse");
        assert_eq!(parsed, RequestStatus::NotSupported);
    }

    #[test]
    fn product_descriptor_serializes_camel_case() {
        let product = ProductDescriptor {
            id: "ai_resume_premium".into(),
            title: "Premium".into(),
            description: "Unlock all premium features".into(),
            price: "$4.99".into(),
            currency_code: "USD".into(),
            currency_symbol: "$".into(),
        };
        let json = serde_json::to_value(&product).expect("serialize");
        assert_eq!(json["currencyCode"], "USD");
        assert_eq!(json["currencySymbol"], "$");
    }

    #[test]
    fn receipt_without_cancel_date_is_active() {
        let json = r#"{
            "receiptId": "r-1",
            "sku": "ai_resume_premium",
            "productType": "ENTITLED",
            "purchaseDate": "2026-01-05T10:00:00Z"
        }"#;
        let receipt: PurchaseReceipt = serde_json::from_str(json).expect("parse");
        assert!(!receipt.is_cancelled());
        assert_eq!(receipt.product_type, ProductType::Entitled);
    }

    #[test]
    fn unknown_entitlement_reads_as_not_premium() {
        assert!(!Entitlement::Unknown.is_premium());
        assert!(Entitlement::from_premium(true).is_premium());
    }
}
