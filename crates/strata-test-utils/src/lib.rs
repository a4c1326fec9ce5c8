//! Test utilities and instrumented allocators for Strata development.
//!
//! Provides allocator wrappers that count or inject failures
//! ([`CountingAllocator`], [`FailingAllocator`]) and a one-call tracing
//! setup ([`init_tracing`]) so test output includes crate log events.

#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod allocators;

pub use allocators::{CountingAllocator, FailingAllocator};

use std::sync::Once;

use tracing_subscriber::EnvFilter;

static TRACING: Once = Once::new();

/// Install a test-friendly tracing subscriber exactly once per process.
///
/// Honours `RUST_LOG`; defaults to `warn`. Output goes through the libtest
/// capture so it only shows for failing tests.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}
