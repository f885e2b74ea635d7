#![forbid(unsafe_code)]

//! Core: faceted search, windowed rendering, and lazy detail views for
//! instruction catalogs.
//!
//! # Role in opview
//! `opview-core` owns everything between the loaded dataset and the painter.
//! It never touches a terminal; the `opview` binary feeds it events and paints
//! the structured data it hands back.
//!
//! # Primary responsibilities
//! - **Dataset**: normalized, immutable instruction records ([`record`]).
//! - **Filter**: query + facet predicate producing a [`FilteredView`].
//! - **Window**: how many filtered rows are materialized ([`ViewportWindow`]).
//! - **Detail cache**: per-position lazily built [`DetailView`]s ([`DetailCache`]).
//! - **Session**: the single owned state that routes events to the above.
//!
//! # Filter epochs
//! Every query or facet change installs a new [`FilteredView`]. The window and
//! the detail cache belong to the view they were created for and are replaced
//! together with it, because a [`Position`] only means something inside one
//! epoch.

pub mod cache;
pub mod config;
pub mod detail;
pub mod error;
pub mod filter;
pub mod links;
pub mod record;
pub mod session;
pub mod window;

pub use cache::{DetailCache, DetailState, Visibility};
pub use config::WindowConfig;
pub use detail::{DetailView, IntrinsicSignature, SynopsisBody, SynopsisLine, SynopsisStyle};
pub use error::LoadError;
pub use filter::{Facet, FacetSelection, FilteredView};
pub use links::{Link, LinkBuilder, NoLinks};
pub use record::{Category, Dataset, Description, Metadata, PerfTable, Record, VariantRow};
pub use session::{Event, ROW_HEADER, RenderPlan, RowView, Session};
pub use window::{ScrollMetrics, ViewportWindow};

/// Zero-based index into the current [`FilteredView`].
///
/// Only valid within the filter epoch that produced it.
pub type Position = usize;
