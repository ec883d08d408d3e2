// ABOUTME: Structured logging setup for embedders of the authorization server
// ABOUTME: Environment-driven filtering with a sensible default level
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

use tracing_subscriber::EnvFilter;

/// Initializes the global tracing subscriber at `info` unless `RUST_LOG`
/// says otherwise. Safe to call more than once; later calls are no-ops.
pub fn init() {
    init_with_filter("info");
}

/// Initializes the global tracing subscriber with `directives` as the
/// fallback filter when `RUST_LOG` is unset.
pub fn init_with_filter(directives: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directives));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
