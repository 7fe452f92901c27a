// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scene-tree dumps.
//!
//! [`dump`] writes an indented one-line-per-node view of a subtree, for
//! logging and bug reports. Only deviations from the defaults are shown,
//! so a plain group prints as just its id and kind.

use std::io::{self, Write};

use lamina_core::node::{Content, NodeId, NodeStore};

/// Writes an indented dump of the subtree rooted at `id`.
///
/// # Errors
///
/// Propagates I/O errors from the writer.
///
/// # Panics
///
/// Panics if `id` is stale.
pub fn dump(store: &NodeStore, id: NodeId, writer: &mut dyn Write) -> io::Result<()> {
    dump_node(store, id, writer, 0)
}

fn dump_node(store: &NodeStore, id: NodeId, writer: &mut dyn Write, depth: usize) -> io::Result<()> {
    for _ in 0..depth {
        write!(writer, "  ")?;
    }
    write!(writer, "#{} {}", id.index(), content_label(store.content(id)))?;

    let pos = store.transform(id).position();
    if pos.x != 0.0 || pos.y != 0.0 {
        write!(writer, " at=({},{})", pos.x, pos.y)?;
    }
    let alpha = store.alpha(id);
    if alpha != 1.0 {
        write!(writer, " alpha={alpha:.2}")?;
    }
    if !store.visible(id) {
        write!(writer, " [hidden]")?;
    }
    if !store.renderable(id) {
        write!(writer, " [non-renderable]")?;
    }
    if store.is_mask_node(id) {
        write!(writer, " [mask]")?;
    }
    if let Some(mask) = store.mask(id) {
        write!(writer, " mask=#{}", mask.index())?;
    }
    let filters = store.filters(id).len();
    if filters > 0 {
        write!(writer, " filters={filters}")?;
    }
    writeln!(writer)?;

    for child in store.children(id) {
        dump_node(store, child, writer, depth + 1)?;
    }
    Ok(())
}

fn content_label(content: &Content) -> String {
    match content {
        Content::Group => "group".into(),
        Content::Quad { width, height, .. } => format!("quad {width}x{height}"),
        Content::Mesh { vertices, .. } => format!("mesh verts={}", vertices.len() / 2),
    }
}

#[cfg(test)]
mod tests {
    use lamina_core::node::TextureId;

    use super::*;

    #[test]
    fn dump_shows_topology_and_deviations() {
        let mut store = NodeStore::new();
        let root = store.create_node(Content::Group);
        let quad = store.create_node(Content::Quad {
            width: 10.0,
            height: 20.0,
            texture: TextureId(0),
        });
        let hidden = store.create_node(Content::Group);
        store.add_child(root, quad);
        store.add_child(root, hidden);
        store.set_visible(hidden, false);
        store.set_alpha(quad, 0.5);
        store.transform_mut(quad).set_position(3.0, 4.0);

        let mut out = Vec::new();
        dump(&store, root, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "#0 group");
        assert_eq!(lines[1], "  #1 quad 10x20 at=(3,4) alpha=0.50");
        assert_eq!(lines[2], "  #2 group [hidden]");
    }
}
