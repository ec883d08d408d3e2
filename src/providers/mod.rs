// ABOUTME: Bundled Provider implementations
// ABOUTME: The in-memory provider backs the test suite and embedding demos
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

pub mod memory;

pub use memory::MemoryProvider;
