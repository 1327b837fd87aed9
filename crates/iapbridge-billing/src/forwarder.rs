// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Notification forwarder: outbound events to the host shell.
//
// Events are handed to the main-thread executor and delivered there through
// the host channel. Nothing in this path returns an error to the caller: the
// caller is a vendor callback, and the vendor will not redeliver.

use std::sync::Arc;

use serde_json::{Value, json};
use tracing::{debug, error};

use iapbridge_core::error::Result;
use iapbridge_core::types::ProductDescriptor;
use iapbridge_platform::traits::{HostChannel, MainThreadExecutor};

/// Which host error callback an error event goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorEventKind {
    Products,
    Purchase,
    Restore,
}

/// Event sent to the host shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundEvent {
    ProductsReceived(Vec<ProductDescriptor>),
    PurchaseUpdated { is_premium: bool },
    Error { kind: ErrorEventKind, message: String },
}

impl OutboundEvent {
    pub fn error(kind: ErrorEventKind, message: impl Into<String>) -> Self {
        Self::Error {
            kind,
            message: message.into(),
        }
    }

    /// Host method this event invokes.
    pub fn method_name(&self) -> &'static str {
        match self {
            Self::ProductsReceived(_) => "onProductsReceived",
            Self::PurchaseUpdated { .. } => "onPurchaseUpdated",
            Self::Error { kind: ErrorEventKind::Products, .. } => "onProductsError",
            Self::Error { kind: ErrorEventKind::Purchase, .. } => "onPurchaseError",
            Self::Error { kind: ErrorEventKind::Restore, .. } => "onRestoreError",
        }
    }

    /// Arguments passed with the host method.
    ///
    /// The product list travels as a JSON array *string*, which is what the
    /// host's `onProductsReceived` handler decodes.
    pub fn arguments(&self) -> Result<Value> {
        Ok(match self {
            Self::ProductsReceived(products) => Value::String(serde_json::to_string(products)?),
            Self::PurchaseUpdated { is_premium } => json!({ "isPremium": is_premium }),
            Self::Error { message, .. } => Value::String(message.clone()),
        })
    }
}

/// Delivers events on the host's main thread.
#[derive(Clone)]
pub struct NotificationForwarder {
    channel: Arc<dyn HostChannel>,
    main_thread: Arc<dyn MainThreadExecutor>,
}

impl NotificationForwarder {
    pub fn new(channel: Arc<dyn HostChannel>, main_thread: Arc<dyn MainThreadExecutor>) -> Self {
        Self {
            channel,
            main_thread,
        }
    }

    /// Queue `event` for delivery. Failures are logged and not retried.
    pub fn forward(&self, event: OutboundEvent) {
        let method = event.method_name();
        let arguments = match event.arguments() {
            Ok(args) => args,
            Err(e) => {
                error!(method, error = %e, "failed to encode host event");
                return;
            }
        };

        let channel = Arc::clone(&self.channel);
        let posted = self.main_thread.post(Box::new(move || {
            match channel.invoke_method(method, arguments) {
                Ok(()) => debug!(method, "host event delivered"),
                Err(e) => error!(method, error = %e, "host event delivery failed"),
            }
        }));

        if let Err(e) = posted {
            error!(method, error = %e, "could not reach main thread; host event dropped");
        }
    }
}
