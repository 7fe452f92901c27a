// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Recycling free-lists for per-frame value objects.
//!
//! Interactive scenes churn through short-lived records every frame (filter
//! states, scratch bounds, batch buffers). [`Pool`] keeps released instances
//! on a free list so steady-state frames allocate nothing:
//! [`acquire`](Pool::acquire) and [`release`](Pool::release) are the only
//! entry points, and [`Recycle::recycle`] resets an object before it
//! re-enters the free list.
//!
//! Ownership is "whoever last acquired it". Because `release` takes the
//! object by value, retaining a reference past release is unrepresentable;
//! the remaining caller obligation is not to release an object into a pool
//! it did not come from (pools are per-renderer-instance, never global).

use alloc::vec::Vec;

/// Resets an object to its pristine state before pool reuse.
pub trait Recycle {
    /// Clears all state while keeping owned allocations for reuse.
    fn recycle(&mut self);
}

/// A typed free-list with acquire/release discipline.
#[derive(Debug)]
pub struct Pool<T> {
    free: Vec<T>,
}

impl<T> Default for Pool<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Pool<T> {
    /// Creates an empty pool.
    #[must_use]
    pub fn new() -> Self {
        Self { free: Vec::new() }
    }

    /// The number of idle objects currently pooled.
    #[must_use]
    pub fn idle(&self) -> usize {
        self.free.len()
    }
}

impl<T: Recycle + Default> Pool<T> {
    /// Takes an object from the free list, or constructs one if empty.
    #[must_use]
    pub fn acquire(&mut self) -> T {
        self.free.pop().unwrap_or_default()
    }

    /// Returns an object to the free list, recycling it first.
    pub fn release(&mut self, mut value: T) {
        value.recycle();
        self.free.push(value);
    }
}
