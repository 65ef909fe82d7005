//! Cooperative cancellation.
//!
//! The driving engine polls the token between top-level requests. Nothing in
//! this crate checks it mid-batch.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

pub trait HostCancellationToken {
    fn is_cancellation_requested(&self) -> bool;
}

/// Token that never fires.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverCancelled;

impl HostCancellationToken for NeverCancelled {
    fn is_cancellation_requested(&self) -> bool {
        false
    }
}

/// Shared flag; clones observe the same state.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag {
    requested: Arc<AtomicBool>,
}

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.requested.store(true, Ordering::Release);
    }

    pub fn reset(&self) {
        self.requested.store(false, Ordering::Release);
    }
}

impl HostCancellationToken for CancellationFlag {
    fn is_cancellation_requested(&self) -> bool {
        self.requested.load(Ordering::Acquire)
    }
}
