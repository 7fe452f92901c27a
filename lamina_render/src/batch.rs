// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Draw-call batching.
//!
//! Leaf draws are queued rather than issued immediately, so runs of
//! compatible records reach the backend as one call. The queue must be
//! flushed whenever bound state is about to change (target binds, stencil
//! pushes and pops, filter boundaries) — records drawn after such a change
//! would land in the wrong target.

use alloc::vec::Vec;

use crate::raster::{DrawRecord, Rasterizer};

/// An ordered queue of pending draw records.
///
/// `flush` keeps the backing allocation, so steady-state frames reuse it.
#[derive(Debug, Default)]
pub struct Batch {
    records: Vec<DrawRecord>,
}

impl Batch {
    /// Creates an empty batch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues one record in paint order.
    pub fn queue(&mut self, record: DrawRecord) {
        self.records.push(record);
    }

    /// Number of queued records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Hands the queued records to the backend and clears the queue.
    /// Returns how many records were drawn.
    #[expect(
        clippy::cast_possible_truncation,
        reason = "per-frame draw counts are far smaller than u32::MAX"
    )]
    pub fn flush<R: Rasterizer + ?Sized>(&mut self, ras: &mut R) -> u32 {
        if self.records.is_empty() {
            return 0;
        }
        ras.draw(&self.records);
        let drawn = self.records.len() as u32;
        self.records.clear();
        drawn
    }
}

#[cfg(test)]
mod tests {
    use lamina_core::matrix::Matrix;
    use lamina_core::node::{Content, NodeStore, TextureId};

    use super::*;
    use crate::raster::DrawKind;
    use crate::testing::{RasterOp, RecordingRasterizer};

    fn record(store: &mut NodeStore) -> DrawRecord {
        let node = store.create_node(Content::Group);
        DrawRecord {
            node,
            texture: TextureId(0),
            world: Matrix::IDENTITY,
            alpha: 1.0,
            kind: DrawKind::Quad {
                width: 1.0,
                height: 1.0,
            },
        }
    }

    #[test]
    fn flush_sends_everything_in_order_and_clears() {
        let mut store = NodeStore::new();
        let mut ras = RecordingRasterizer::default();
        let mut batch = Batch::new();

        batch.queue(record(&mut store));
        batch.queue(record(&mut store));
        assert_eq!(batch.len(), 2);

        assert_eq!(batch.flush(&mut ras), 2);
        assert!(batch.is_empty());
        assert!(matches!(ras.ops.as_slice(), [RasterOp::Draw(2)]));
    }

    #[test]
    fn empty_flush_issues_no_call() {
        let mut ras = RecordingRasterizer::default();
        let mut batch = Batch::new();
        assert_eq!(batch.flush(&mut ras), 0);
        assert!(ras.ops.is_empty());
    }
}
