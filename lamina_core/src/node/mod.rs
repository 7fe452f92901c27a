// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The scene graph: nodes, storage, propagation, and queries.
//!
//! All nodes of one graph live in a [`NodeStore`] and are addressed through
//! generational [`NodeId`] handles. The store owns topology (a linked child
//! list per node), the per-node [`Transform`](crate::transform::Transform)
//! and display state, and the computed world-space results of the last
//! propagation pass.
//!
//! Allocation and topology live in `store`, the top-down transform/alpha
//! pass in `update`, bounds and hit-test queries in `query`, and node
//! content in `content`.

mod content;
mod id;
mod query;
mod store;
mod traverse;
mod update;

pub use content::Content;
pub use id::{NodeId, TextureId};
pub use store::NodeStore;
pub use traverse::Children;
