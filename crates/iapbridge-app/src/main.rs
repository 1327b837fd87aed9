// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Desktop console for the purchase bridge.
//
// Reads one method call per line from stdin as JSON, for example
// `{"method":"getProducts","arguments":{"productIds":["ai_resume_premium"]}}`,
// and prints the JSON reply. Without the Appstore SDK every purchase
// operation reports unavailable; the console exists to exercise dispatch
// and configuration end to end.

use std::io::{self, BufRead, Write};

use iapbridge::BridgeServices;
use iapbridge::services::data_dir;
use iapbridge_billing::{MethodCall, MethodResponse};
use iapbridge_core::error::BridgeError;

fn main() -> io::Result<()> {
    let dir = data_dir::data_dir();
    let config = data_dir::load_config(&dir);

    let services = BridgeServices::launch(config)?;
    tracing::info!(config = %data_dir::config_path(&dir).display(), "console ready");

    let stdin = io::stdin();
    let mut stdout = io::stdout().lock();
    for line in stdin.lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<MethodCall>(&line) {
            Ok(call) => services.handle_call(&call),
            Err(e) => MethodResponse::from(BridgeError::InvalidArgument(format!(
                "expected {{\"method\": ..., \"arguments\": ...}}: {e}"
            ))),
        };
        writeln!(stdout, "{}", response.to_json())?;
        stdout.flush()?;

        services.expire_stale();
    }
    Ok(())
}
