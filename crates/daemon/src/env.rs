// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon crate.

use std::net::SocketAddr;
use std::path::PathBuf;

/// Path of the optional TOML config file: `VET_CONFIG`, else `./vet.toml`.
pub fn config_path() -> PathBuf {
    std::env::var("VET_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("vet.toml"))
}

/// Resolve state directory: VET_STATE_DIR > XDG_STATE_HOME/vet > ~/.local/state/vet
pub fn state_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var("VET_STATE_DIR") {
        return Some(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Some(PathBuf::from(xdg).join("vet"));
    }
    let home = std::env::var("HOME").ok()?;
    Some(PathBuf::from(home).join(".local/state/vet"))
}

pub fn bind_addr() -> Option<SocketAddr> {
    std::env::var("VET_BIND").ok()?.parse().ok()
}

pub fn static_dirs() -> Option<Vec<PathBuf>> {
    let raw = std::env::var("VET_STATIC_DIRS").ok()?;
    Some(raw.split(':').map(PathBuf::from).collect())
}

pub fn engine_command() -> Option<String> {
    std::env::var("VET_ENGINE_CMD").ok()
}

pub fn remediation_command() -> Option<String> {
    std::env::var("VET_REMEDIATION_CMD").ok()
}

pub fn u64_var(name: &str) -> Option<u64> {
    std::env::var(name).ok()?.parse().ok()
}

pub fn usize_var(name: &str) -> Option<usize> {
    std::env::var(name).ok()?.parse().ok()
}

pub fn u32_var(name: &str) -> Option<u32> {
    std::env::var(name).ok()?.parse().ok()
}

pub fn bool_var(name: &str) -> Option<bool> {
    match std::env::var(name).ok()?.as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
