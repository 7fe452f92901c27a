// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Filter descriptors.
//!
//! A filter is a post-processing pass applied to a rendered subtree through
//! an offscreen texture. The shader body itself is an external collaborator
//! — core only carries an opaque program handle plus the flags the filter
//! pipeline needs to size and place the pass.

use core::fmt;

/// An opaque handle to a backend-compiled filter program.
///
/// Backends assign these; core passes them through without interpretation.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FilterProgramId(pub u32);

impl fmt::Debug for FilterProgramId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FilterProgramId({})", self.0)
    }
}

/// Describes one post-processing pass attached to a node.
///
/// When a node carries several filters, the pipeline combines their
/// requirements conservatively: the chain uses the `min` of the resolutions,
/// the `max` of the paddings, and the OR of `auto_fit` and `legacy`.
#[derive(Clone, Debug, PartialEq)]
pub struct Filter {
    /// The backend program that implements the pass.
    pub program: FilterProgramId,
    /// Extra source-frame padding in logical pixels (blur reach etc.).
    pub padding: f64,
    /// Working resolution; `0.0` means "match the current render target".
    pub resolution: f64,
    /// Whether the source frame may be clipped to the visible output frame.
    pub auto_fit: bool,
    /// Compatibility flag for filters sampling raw UV attributes.
    pub legacy: bool,
    /// Disabled filters are skipped without disturbing the rest of the chain.
    pub enabled: bool,
}

impl Filter {
    /// Creates an enabled filter with no padding at target resolution.
    #[must_use]
    pub fn new(program: FilterProgramId) -> Self {
        Self {
            program,
            padding: 0.0,
            resolution: 0.0,
            auto_fit: false,
            legacy: false,
            enabled: true,
        }
    }

    /// Sets the source-frame padding.
    #[must_use]
    pub fn with_padding(mut self, padding: f64) -> Self {
        self.padding = padding;
        self
    }

    /// Sets the working resolution.
    #[must_use]
    pub fn with_resolution(mut self, resolution: f64) -> Self {
        self.resolution = resolution;
        self
    }

    /// Requests output-frame auto-fitting.
    #[must_use]
    pub fn with_auto_fit(mut self) -> Self {
        self.auto_fit = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults() {
        let f = Filter::new(FilterProgramId(3));
        assert!(f.enabled);
        assert!(!f.auto_fit && !f.legacy);
        assert_eq!(f.padding, 0.0);
        assert_eq!(f.resolution, 0.0);
    }
}
