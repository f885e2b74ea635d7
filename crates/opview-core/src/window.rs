#![forbid(unsafe_code)]

//! Incremental materialization of a filtered view.
//!
//! A [`ViewportWindow`] decides how many rows of the current
//! [`FilteredView`](crate::FilteredView) are materialized. It starts with a few
//! screens' worth of rows and grows by a fixed batch whenever the scroll
//! position gets close to the bottom of what is already rendered.
//!
//! # Invariants
//!
//! 1. `rendered_count <= len` at all times.
//! 2. Within one window, `rendered_count` never decreases.
//! 3. Growth at `len` is a no-op and reports no new rows.
//!
//! A window is created per filter epoch. There is no reset method: installing
//! a new view means constructing a new window, so growth history cannot leak
//! across epochs.

use std::ops::Range;

use crate::config::WindowConfig;

/// Scroll state reported by the painter, in viewport units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScrollMetrics {
    /// Distance from the top of the content to the top of the viewport.
    pub scroll_top: u32,
    /// Total height of the rendered content.
    pub content_height: u32,
}

impl ScrollMetrics {
    #[must_use]
    pub const fn new(scroll_top: u32, content_height: u32) -> Self {
        Self {
            scroll_top,
            content_height,
        }
    }
}

/// How many rows of the current view are materialized.
#[derive(Debug, Clone)]
pub struct ViewportWindow {
    config: WindowConfig,
    len: usize,
    rendered: usize,
    viewport_height: u32,
    growths: u64,
}

impl ViewportWindow {
    /// Window over a view of `len` rows, pre-sized for `viewport_height`.
    #[must_use]
    pub fn new(config: WindowConfig, len: usize, viewport_height: u32) -> Self {
        Self {
            config,
            len,
            rendered: Self::initial_size(&config, len, viewport_height),
            viewport_height,
            growths: 0,
        }
    }

    /// Rows materialized when a view of `len` rows is installed.
    ///
    /// `ceil(viewport_height * initial_screens / row_height)`, at least one
    /// row, clamped to `len`.
    #[must_use]
    pub fn initial_size(config: &WindowConfig, len: usize, viewport_height: u32) -> usize {
        let row_height = u64::from(config.row_height.max(1));
        let wanted = (u64::from(viewport_height) * u64::from(config.initial_screens))
            .div_ceil(row_height)
            .max(1);
        usize::try_from(wanted).unwrap_or(usize::MAX).min(len)
    }

    #[must_use]
    pub fn rendered_count(&self) -> usize {
        self.rendered
    }

    /// Length of the view this window belongs to.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Positions currently materialized.
    #[must_use]
    pub fn rendered_range(&self) -> Range<usize> {
        0..self.rendered
    }

    #[must_use]
    pub fn contains(&self, position: usize) -> bool {
        position < self.rendered
    }

    /// True once every row of the view is materialized.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.rendered >= self.len
    }

    #[must_use]
    pub fn viewport_height(&self) -> u32 {
        self.viewport_height
    }

    #[must_use]
    pub fn config(&self) -> &WindowConfig {
        &self.config
    }

    /// Number of growth steps taken so far.
    #[must_use]
    pub fn growths(&self) -> u64 {
        self.growths
    }

    pub fn set_viewport_height(&mut self, viewport_height: u32) {
        self.viewport_height = viewport_height;
    }

    /// True when the viewport is within the lookahead distance of the bottom
    /// of the rendered content.
    #[must_use]
    pub fn near_bottom(&self, metrics: ScrollMetrics) -> bool {
        let lookahead =
            u64::from(self.config.lookahead_screens) * u64::from(self.viewport_height);
        u64::from(metrics.scroll_top) + lookahead > u64::from(metrics.content_height)
    }

    /// Grow by one batch if the viewport is near the bottom.
    ///
    /// Returns the newly materialized positions, or `None` when nothing was
    /// added (far from the bottom, or already exhausted).
    pub fn grow_if_needed(&mut self, metrics: ScrollMetrics) -> Option<Range<usize>> {
        if self.is_exhausted() || !self.near_bottom(metrics) {
            return None;
        }
        let start = self.rendered;
        self.rendered = start.saturating_add(self.config.batch_size).min(self.len);
        self.growths += 1;
        tracing::trace!(
            from = start,
            to = self.rendered,
            len = self.len,
            scroll_top = metrics.scroll_top,
            content_height = metrics.content_height,
            "window grew"
        );
        Some(start..self.rendered)
    }
}
