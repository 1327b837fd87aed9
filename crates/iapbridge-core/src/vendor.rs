// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Response payloads delivered by the vendor billing SDK.
//
// These mirror the Amazon Appstore `PurchasingListener` callbacks. On Android
// the Java listener shim serialises each response to JSON with these field
// names, so the serde layout is part of the JNI contract.

use serde::{Deserialize, Serialize};

use crate::types::{ProductType, PurchaseReceipt, RequestHandle, RequestStatus, UserData};

/// Catalog item as the vendor reports it. Currency is not included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VendorProduct {
    pub sku: String,
    pub product_type: ProductType,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub price: String,
}

/// `onProductDataResponse`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDataResponse {
    pub request_id: RequestHandle,
    pub status: RequestStatus,
    #[serde(default)]
    pub products: Vec<VendorProduct>,
    #[serde(default)]
    pub unavailable_skus: Vec<String>,
}

/// `onPurchaseResponse`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseResponse {
    pub request_id: RequestHandle,
    pub status: RequestStatus,
    #[serde(default)]
    pub receipt: Option<PurchaseReceipt>,
    #[serde(default)]
    pub user_data: Option<UserData>,
}

/// `onPurchaseUpdatesResponse`. One page of the purchase history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseUpdatesResponse {
    pub request_id: RequestHandle,
    pub status: RequestStatus,
    #[serde(default)]
    pub receipts: Vec<PurchaseReceipt>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub user_data: Option<UserData>,
}

/// `onUserDataResponse`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDataResponse {
    pub request_id: RequestHandle,
    pub status: RequestStatus,
    #[serde(default)]
    pub user_data: Option<UserData>,
}
