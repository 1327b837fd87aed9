// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Response correlator: per-request state machine keyed by vendor request id.
//
//     Pending ──► Resolved | Failed | TimedOut
//
// Every handle leaves `Pending` exactly once. Callbacks for handles that are
// unknown or already terminal are reported back to the caller, which logs
// and drops them; the vendor SDK is allowed to redeliver.

use std::collections::{BTreeSet, HashMap, VecDeque};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use iapbridge_core::error::{BridgeError, Result};
use iapbridge_core::types::{PurchaseReceipt, RequestHandle, RequestKind};

/// Lifecycle state of one issued request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    /// Issued, waiting for the vendor callback.
    Pending,
    /// Callback arrived with a success status.
    Resolved,
    /// Callback arrived with a failure status.
    Failed,
    /// No callback within the local timeout.
    TimedOut,
}

impl RequestState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// What the bridge needs to remember about a pending request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestContext {
    CatalogQuery { skus: BTreeSet<String> },
    Purchase { sku: String },
    /// One page of a restore. `accumulated` holds receipts from earlier pages.
    Restore { accumulated: Vec<PurchaseReceipt>, page: u32 },
    UserData,
}

impl RequestContext {
    pub fn kind(&self) -> RequestKind {
        match self {
            Self::CatalogQuery { .. } => RequestKind::CatalogQuery,
            Self::Purchase { .. } => RequestKind::Purchase,
            Self::Restore { .. } => RequestKind::Restore,
            Self::UserData => RequestKind::UserData,
        }
    }
}

/// Result of matching a callback against the pending table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Correlation {
    /// The handle was pending; it has now transitioned.
    Matched(RequestContext),
    /// No record of this handle.
    Unknown,
    /// The handle already reached a terminal state.
    AlreadyTerminal(RequestState),
    /// The handle is pending for a different operation. Left untouched.
    KindMismatch { expected: RequestKind },
}

#[derive(Debug)]
struct Entry {
    kind: RequestKind,
    state: RequestState,
    issued_at: DateTime<Utc>,
    /// Taken out on the terminal transition.
    context: Option<RequestContext>,
}

/// Pending-request table.
///
/// Not synchronised: the bridge owns it behind its single state mutex.
#[derive(Debug)]
pub struct Correlator {
    entries: HashMap<RequestHandle, Entry>,
    /// Terminal handles, oldest first, for bounded retention.
    settled: VecDeque<RequestHandle>,
    history: usize,
}

impl Correlator {
    /// Create a correlator that remembers up to `history` terminal requests.
    pub fn new(history: usize) -> Self {
        Self {
            entries: HashMap::new(),
            settled: VecDeque::new(),
            history,
        }
    }

    /// Start tracking a freshly issued request.
    ///
    /// Fails if the vendor handed out a handle that is still pending.
    pub fn register(
        &mut self,
        handle: RequestHandle,
        context: RequestContext,
        issued_at: DateTime<Utc>,
    ) -> Result<()> {
        if let Some(existing) = self.entries.get(&handle) {
            if !existing.state.is_terminal() {
                return Err(BridgeError::Vendor(format!(
                    "request id {handle} is already pending"
                )));
            }
            self.settled.retain(|h| h != &handle);
        }

        let kind = context.kind();
        debug!(request_id = %handle, %kind, "request registered");
        self.entries.insert(
            handle,
            Entry {
                kind,
                state: RequestState::Pending,
                issued_at,
                context: Some(context),
            },
        );
        Ok(())
    }

    /// Transition `handle` to `outcome` if it is pending for `kind`.
    pub fn settle(
        &mut self,
        handle: &RequestHandle,
        kind: RequestKind,
        outcome: RequestState,
    ) -> Correlation {
        let Some(entry) = self.entries.get_mut(handle) else {
            return Correlation::Unknown;
        };
        if entry.state.is_terminal() {
            return Correlation::AlreadyTerminal(entry.state);
        }
        if entry.kind != kind {
            warn!(request_id = %handle, expected = %entry.kind, got = %kind, "callback kind mismatch");
            return Correlation::KindMismatch { expected: entry.kind };
        }

        entry.state = outcome;
        let context = entry.context.take();
        self.mark_settled(handle.clone());

        match context {
            Some(ctx) => Correlation::Matched(ctx),
            // Pending entries always carry their context.
            None => Correlation::Unknown,
        }
    }

    /// Time out every request pending for longer than `timeout`.
    ///
    /// Returns the expired handles with their contexts, oldest first.
    pub fn expire(
        &mut self,
        now: DateTime<Utc>,
        timeout: Duration,
    ) -> Vec<(RequestHandle, RequestContext)> {
        let mut stale: Vec<(DateTime<Utc>, RequestHandle)> = self
            .entries
            .iter()
            .filter(|(_, e)| !e.state.is_terminal() && has_elapsed(e.issued_at, now, timeout))
            .map(|(h, e)| (e.issued_at, h.clone()))
            .collect();
        stale.sort();

        let mut expired = Vec::with_capacity(stale.len());
        for (_, handle) in stale {
            let context = self.entries.get_mut(&handle).and_then(|entry| {
                entry.state = RequestState::TimedOut;
                entry.context.take()
            });
            self.mark_settled(handle.clone());
            if let Some(context) = context {
                warn!(request_id = %handle, kind = %context.kind(), "request timed out");
                expired.push((handle, context));
            }
        }
        expired
    }

    /// Current state of `handle`, if it is still remembered.
    pub fn state(&self, handle: &RequestHandle) -> Option<RequestState> {
        self.entries.get(handle).map(|e| e.state)
    }

    pub fn pending_count(&self) -> usize {
        self.entries
            .values()
            .filter(|e| !e.state.is_terminal())
            .count()
    }

    fn mark_settled(&mut self, handle: RequestHandle) {
        self.settled.push_back(handle);
        while self.settled.len() > self.history {
            if let Some(oldest) = self.settled.pop_front() {
                self.entries.remove(&oldest);
            }
        }
    }
}

/// Whether `timeout` has passed between `since` and `now`. Clock skew that
/// puts `since` in the future counts as not elapsed.
fn has_elapsed(since: DateTime<Utc>, now: DateTime<Utc>, timeout: Duration) -> bool {
    (now - since)
        .to_std()
        .map(|elapsed| elapsed >= timeout)
        .unwrap_or(false)
}
