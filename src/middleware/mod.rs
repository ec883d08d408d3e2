// ABOUTME: Request middleware for the protected-resource side of the protocol
// ABOUTME: Currently the RFC 6750 bearer-token resource gate
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

pub mod resource_gate;

pub use resource_gate::resource_gate;
