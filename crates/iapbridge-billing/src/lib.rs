// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// IAP bridge billing: issues vendor requests, correlates their callbacks,
// derives the premium entitlement from receipts and forwards the results to
// the host shell.  The vendor SDK, host channel and main thread are reached
// only through the capability traits in `iapbridge-platform`.

pub mod bridge;
pub mod correlator;
pub mod dispatch;
pub mod entitlement;
pub mod forwarder;
pub mod issuer;

#[cfg(test)]
pub(crate) mod testing;

pub use bridge::PurchaseBridge;
pub use correlator::{Correlation, Correlator, RequestContext, RequestState};
pub use dispatch::{MethodCall, MethodResponse, handle_method_call};
pub use entitlement::{EntitlementResolver, ReceiptSet, resolve_entitlement};
pub use forwarder::{ErrorEventKind, NotificationForwarder, OutboundEvent};
pub use issuer::RequestIssuer;
