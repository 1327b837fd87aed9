// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Platform-aware data directory and config file resolution (desktop).

use std::path::{Path, PathBuf};

use iapbridge_core::BridgeConfig;

const APP_DIR: &str = "iapbridge";
const CONFIG_FILE: &str = "bridge.json";

/// Return the application data directory, creating it if needed.
///
/// On Android the host passes its config as JSON instead.
pub fn data_dir() -> PathBuf {
    let dir = dirs_fallback().join(APP_DIR);
    std::fs::create_dir_all(&dir).ok();
    dir
}

/// Path of the bridge config inside `dir`.
pub fn config_path(dir: &Path) -> PathBuf {
    dir.join(CONFIG_FILE)
}

/// Load the bridge config from `dir`, or defaults if it is missing or invalid.
pub fn load_config(dir: &Path) -> BridgeConfig {
    BridgeConfig::load_or_default(config_path(dir))
}

fn dirs_fallback() -> PathBuf {
    // Try XDG data dir, then fallback to home
    if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
        return PathBuf::from(xdg);
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".local").join("share");
    }
    std::env::temp_dir()
}
