#![forbid(unsafe_code)]

//! Lazily built, per-position detail views.
//!
//! # State machine
//!
//! ```text
//!   Absent --build--> Hidden <--toggle--> Visible
//!     \_____toggle (builds, then shows)_____/
//! ```
//!
//! A position is built at most once per cache. The cache is tagged with the
//! filter epoch it belongs to and is replaced wholesale when the epoch ends,
//! because positions are reassigned by every new filter.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::Position;
use crate::detail::DetailView;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Hidden,
    Visible,
}

impl Visibility {
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Hidden => Self::Visible,
            Self::Visible => Self::Hidden,
        }
    }
}

/// Observable state of one position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetailState {
    Absent,
    Built(Visibility),
}

#[derive(Debug, Clone)]
struct Slot {
    view: DetailView,
    visibility: Visibility,
}

/// Detail views of one filter epoch, keyed by position.
#[derive(Debug, Clone, Default)]
pub struct DetailCache {
    epoch: u64,
    slots: BTreeMap<Position, Slot>,
    builds: u64,
}

impl DetailCache {
    #[must_use]
    pub fn new(epoch: u64) -> Self {
        Self {
            epoch,
            ..Self::default()
        }
    }

    /// Epoch this cache belongs to.
    #[must_use]
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Number of built positions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Total builds performed by this cache.
    #[must_use]
    pub fn builds(&self) -> u64 {
        self.builds
    }

    #[must_use]
    pub fn state(&self, position: Position) -> DetailState {
        self.slots
            .get(&position)
            .map_or(DetailState::Absent, |slot| DetailState::Built(slot.visibility))
    }

    /// Previously built view, without building.
    #[must_use]
    pub fn get(&self, position: Position) -> Option<&DetailView> {
        self.slots.get(&position).map(|slot| &slot.view)
    }

    /// Return the view at `position`, running `build` only if it is absent.
    /// A fresh entry starts hidden.
    pub fn get_or_build<F>(&mut self, position: Position, build: F) -> &DetailView
    where
        F: FnOnce() -> DetailView,
    {
        &self.slot(position, build).view
    }

    /// Flip visibility at `position`, building it first if needed.
    ///
    /// The first toggle of an absent position therefore shows it.
    pub fn toggle<F>(&mut self, position: Position, build: F) -> Visibility
    where
        F: FnOnce() -> DetailView,
    {
        let slot = self.slot(position, build);
        slot.visibility = slot.visibility.toggled();
        slot.visibility
    }

    /// Visible positions in ascending order.
    pub fn visible_positions(&self) -> impl Iterator<Item = Position> + '_ {
        self.slots
            .iter()
            .filter(|(_, slot)| slot.visibility == Visibility::Visible)
            .map(|(&position, _)| position)
    }

    fn slot<F>(&mut self, position: Position, build: F) -> &mut Slot
    where
        F: FnOnce() -> DetailView,
    {
        let epoch = self.epoch;
        let builds = &mut self.builds;
        self.slots.entry(position).or_insert_with(|| {
            *builds += 1;
            tracing::debug!(epoch, position, "detail view built");
            Slot {
                view: build(),
                visibility: Visibility::Hidden,
            }
        })
    }
}
