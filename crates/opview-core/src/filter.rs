#![forbid(unsafe_code)]

//! Query + facet filtering over a [`Dataset`].
//!
//! [`apply`] is a pure function of its three inputs. It is re-run wholesale on
//! every filter-relevant event instead of being patched incrementally: one pass
//! over lowercased keys is cheap next to the rendering it gates.
//!
//! # Invariants
//!
//! 1. **Subsequence**: the output lists dataset indices in strictly increasing
//!    order, so filtering never reorders.
//! 2. **Identity**: an empty query with no active facet keeps every record.
//! 3. **AND across facets, OR across fields**: each active facet must accept
//!    the record; the query only has to occur in one searchable field.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::Position;
use crate::record::{Dataset, Record};

/// Instruction classes considered baseline by [`Facet::BaselineOnly`].
pub const BASELINE_CLASSES: [&str; 4] = ["general", "advsimd", "float", "fpsimd"];

// ---------------------------------------------------------------------------
// Facets
// ---------------------------------------------------------------------------

/// A named boolean filter toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Facet {
    /// Keep only records exposing an intrinsic.
    IntrinsicsOnly,
    /// Keep only records of a baseline instruction class.
    BaselineOnly,
    /// Drop `armv8.N` extension records unless their level is included.
    NoExtensions,
    /// Keep `armv8.N` records even when [`Facet::NoExtensions`] is active.
    WithExtension(u8),
}

impl Facet {
    /// Facet-specific predicate, evaluated in the context of the whole selection.
    fn accepts(self, record: &Record, selection: &FacetSelection) -> bool {
        match self {
            Self::IntrinsicsOnly => !record.intrinsics().is_empty(),
            Self::BaselineOnly => {
                let class = record.class();
                BASELINE_CLASSES
                    .iter()
                    .any(|baseline| class.eq_ignore_ascii_case(baseline))
            }
            Self::NoExtensions => match record.extension_level() {
                Some(level) => selection.contains(Self::WithExtension(level)),
                None => true,
            },
            Self::WithExtension(_) => true,
        }
    }
}

impl fmt::Display for Facet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IntrinsicsOnly => f.write_str("intrinsics-only"),
            Self::BaselineOnly => f.write_str("baseline-only"),
            Self::NoExtensions => f.write_str("no-extensions"),
            Self::WithExtension(level) => write!(f, "with-armv8.{level}"),
        }
    }
}

/// Unknown facet name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseFacetError(pub String);

impl fmt::Display for ParseFacetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown facet: {}", self.0)
    }
}

impl std::error::Error for ParseFacetError {}

impl FromStr for Facet {
    type Err = ParseFacetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        match name.as_str() {
            "intrinsics-only" => Ok(Self::IntrinsicsOnly),
            "baseline-only" => Ok(Self::BaselineOnly),
            "no-extensions" => Ok(Self::NoExtensions),
            other => other
                .strip_prefix("with-armv8.")
                .and_then(|level| level.parse::<u8>().ok())
                .filter(|level| *level >= 1)
                .map(Self::WithExtension)
                .ok_or_else(|| ParseFacetError(s.to_string())),
        }
    }
}

/// The set of active facet toggles.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FacetSelection {
    active: BTreeSet<Facet>,
}

impl FacetSelection {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, facet: Facet) -> Self {
        self.active.insert(facet);
        self
    }

    pub fn insert(&mut self, facet: Facet) -> bool {
        self.active.insert(facet)
    }

    pub fn remove(&mut self, facet: Facet) -> bool {
        self.active.remove(&facet)
    }

    /// Flip `facet`; returns whether it is now active.
    pub fn toggle(&mut self, facet: Facet) -> bool {
        if self.active.remove(&facet) {
            false
        } else {
            self.active.insert(facet);
            true
        }
    }

    #[must_use]
    pub fn contains(&self, facet: Facet) -> bool {
        self.active.contains(&facet)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Facet> + '_ {
        self.active.iter().copied()
    }

    /// True when every active facet accepts `record`.
    #[must_use]
    pub fn accepts(&self, record: &Record) -> bool {
        self.active.iter().all(|facet| facet.accepts(record, self))
    }
}

impl FromIterator<Facet> for FacetSelection {
    fn from_iter<I: IntoIterator<Item = Facet>>(iter: I) -> Self {
        Self {
            active: iter.into_iter().collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Filtered view
// ---------------------------------------------------------------------------

/// Dataset indices of the records that passed the active filter, in dataset
/// order. A [`Position`] indexes into this list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilteredView {
    indices: Vec<usize>,
}

impl FilteredView {
    /// View containing every record of a dataset of `len` records.
    #[must_use]
    pub fn all(len: usize) -> Self {
        Self {
            indices: (0..len).collect(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Original dataset index of the record at `position`.
    #[must_use]
    pub fn dataset_index(&self, position: Position) -> Option<usize> {
        self.indices.get(position).copied()
    }

    #[must_use]
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// Record at `position`.
    #[must_use]
    pub fn record<'a>(&self, dataset: &'a Dataset, position: Position) -> Option<&'a Record> {
        self.dataset_index(position).and_then(|i| dataset.get(i))
    }

    /// `(position, record)` pairs in view order.
    pub fn records<'a>(
        &'a self,
        dataset: &'a Dataset,
    ) -> impl Iterator<Item = (Position, &'a Record)> + 'a {
        self.indices
            .iter()
            .enumerate()
            .filter_map(|(pos, &i)| dataset.get(i).map(|r| (pos, r)))
    }
}

// ---------------------------------------------------------------------------
// Filter
// ---------------------------------------------------------------------------

/// Narrow `dataset` to the records accepted by `facets` whose searchable
/// fields contain `query`, case-insensitively.
#[must_use]
pub fn apply(dataset: &Dataset, facets: &FacetSelection, query: &str) -> FilteredView {
    let needle = query.to_lowercase();
    let indices = dataset
        .records()
        .iter()
        .zip(dataset.search_keys())
        .enumerate()
        .filter(|(_, (record, keys))| {
            facets.accepts(record) && (needle.is_empty() || keys.contains(&needle))
        })
        .map(|(i, _)| i)
        .collect();
    FilteredView { indices }
}
