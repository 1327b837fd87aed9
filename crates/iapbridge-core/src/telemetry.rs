// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Logging bootstrap.

use tracing_subscriber::EnvFilter;

/// Install the global `tracing` subscriber.
///
/// Honours `RUST_LOG`, defaulting to `info`. Safe to call more than once:
/// the host may re-create its engine, and only the first call installs.
pub fn init_tracing() {
    let installed = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init()
        .is_ok();

    if installed {
        tracing::info!("tracing initialised");
    }
}
