#![forbid(unsafe_code)]

//! Session state and event routing.
//!
//! A [`Session`] is the one owned value holding everything that changes while
//! the user browses: the query, the facet selection, the viewport height, and
//! the current filter epoch (view + window + detail cache). Painters feed it
//! [`Event`]s and act on the [`RenderPlan`] it returns.
//!
//! # Event contract
//!
//! | Event | Effect | Plan |
//! |-------|--------|------|
//! | query / facet change | new epoch: re-filter, new window, empty cache | `Rebuild` |
//! | scroll | growth check | `Append` or `Unchanged` |
//! | resize | new viewport height, growth check | `Append` or `Unchanged` |
//! | detail toggle | build once, flip visibility | `Detail` or `Unchanged` |
//!
//! Growth checks only use scroll metrics reported since the last growth: after
//! rows are appended the old content height is stale, so a resize waits for
//! the painter's next report.
//!
//! Events are handled to completion one at a time, so a filter change has
//! fully replaced the epoch before the next scroll is looked at.

use std::fmt;
use std::ops::Range;

use serde::Serialize;

use crate::Position;
use crate::cache::{DetailCache, Visibility};
use crate::config::WindowConfig;
use crate::detail::DetailView;
use crate::filter::{self, Facet, FacetSelection, FilteredView};
use crate::links::LinkBuilder;
use crate::record::{Dataset, Record};
use crate::window::{ScrollMetrics, ViewportWindow};

/// Input delivered by the front end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    QueryChanged(String),
    FacetsChanged(FacetSelection),
    FacetToggled(Facet),
    Scrolled(ScrollMetrics),
    Resized { viewport_height: u32 },
    DetailToggled(Position),
}

/// What the painter has to do after an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderPlan {
    /// Drop everything painted and paint `rows` of the new view.
    Rebuild { epoch: u64, rows: Range<usize> },
    /// Paint `rows` after the rows already on screen.
    Append { rows: Range<usize> },
    /// Show or hide the detail panel under `position`.
    Detail {
        position: Position,
        visibility: Visibility,
    },
    Unchanged,
}

/// Paint-ready data for one collapsed row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RowView<'a> {
    pub position: Position,
    pub dataset_index: usize,
    pub class: &'a str,
    pub feature: &'a str,
    pub opcode: &'a str,
    pub intrinsics: &'a str,
    pub summary: &'a str,
    #[serde(skip)]
    pub record: &'a Record,
}

/// Column labels of the row list.
pub const ROW_HEADER: [&str; 5] = ["Class", "Feature", "Opcode", "Intrinsics", "Description"];

/// View, window, and detail cache of one filter epoch.
#[derive(Debug)]
struct Epoch {
    id: u64,
    view: FilteredView,
    window: ViewportWindow,
    details: DetailCache,
}

impl Epoch {
    fn install(
        id: u64,
        dataset: &Dataset,
        facets: &FacetSelection,
        query: &str,
        config: WindowConfig,
        viewport_height: u32,
    ) -> Self {
        let view = filter::apply(dataset, facets, query);
        let window = ViewportWindow::new(config, view.len(), viewport_height);
        tracing::debug!(
            epoch = id,
            query,
            matched = view.len(),
            total = dataset.len(),
            rendered = window.rendered_count(),
            "filter epoch installed"
        );
        Self {
            id,
            view,
            window,
            details: DetailCache::new(id),
        }
    }
}

pub struct Session {
    dataset: Dataset,
    links: Box<dyn LinkBuilder>,
    config: WindowConfig,
    query: String,
    facets: FacetSelection,
    viewport_height: u32,
    /// Metrics of the content as last painted. Cleared once the window
    /// grows, since they then describe content that no longer exists.
    last_scroll: Option<ScrollMetrics>,
    epoch: Epoch,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("records", &self.dataset.len())
            .field("query", &self.query)
            .field("facets", &self.facets)
            .field("viewport_height", &self.viewport_height)
            .field("epoch", &self.epoch)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Start browsing `dataset` with an empty query and no facets.
    ///
    /// Citation links are built from the dataset's own metadata.
    #[must_use]
    pub fn new(dataset: Dataset, config: WindowConfig, viewport_height: u32) -> Self {
        let facets = FacetSelection::new();
        let epoch = Epoch::install(0, &dataset, &facets, "", config, viewport_height);
        Self {
            links: Box::new(dataset.metadata().clone()),
            dataset,
            config,
            query: String::new(),
            facets,
            viewport_height,
            last_scroll: None,
            epoch,
        }
    }

    #[must_use]
    pub fn with_links(mut self, links: impl LinkBuilder + 'static) -> Self {
        self.links = Box::new(links);
        self
    }

    pub fn handle(&mut self, event: Event) -> RenderPlan {
        match event {
            Event::QueryChanged(query) => self.set_query(query),
            Event::FacetsChanged(facets) => self.set_facets(facets),
            Event::FacetToggled(facet) => self.toggle_facet(facet),
            Event::Scrolled(metrics) => self.scroll(metrics),
            Event::Resized { viewport_height } => self.resize(viewport_height),
            Event::DetailToggled(position) => self.toggle_detail(position),
        }
    }

    pub fn set_query(&mut self, query: impl Into<String>) -> RenderPlan {
        self.query = query.into();
        self.refilter()
    }

    pub fn set_facets(&mut self, facets: FacetSelection) -> RenderPlan {
        self.facets = facets;
        self.refilter()
    }

    pub fn toggle_facet(&mut self, facet: Facet) -> RenderPlan {
        self.facets.toggle(facet);
        self.refilter()
    }

    pub fn scroll(&mut self, metrics: ScrollMetrics) -> RenderPlan {
        self.last_scroll = Some(metrics);
        self.grow()
    }

    /// Record the new viewport height and re-run the growth check against the
    /// last reported scroll position. Without a report since the last growth
    /// the plan is `Unchanged` until the painter reports again.
    pub fn resize(&mut self, viewport_height: u32) -> RenderPlan {
        self.viewport_height = viewport_height;
        self.epoch.window.set_viewport_height(viewport_height);
        self.grow()
    }

    /// Flip the detail panel of a rendered row. Positions outside the window
    /// are ignored.
    pub fn toggle_detail(&mut self, position: Position) -> RenderPlan {
        if !self.epoch.window.contains(position) {
            tracing::debug!(position, epoch = self.epoch.id, "detail toggle outside window");
            return RenderPlan::Unchanged;
        }
        let Some(record) = self.epoch.view.record(&self.dataset, position) else {
            return RenderPlan::Unchanged;
        };
        let links = self.links.as_ref();
        let visibility = self
            .epoch
            .details
            .toggle(position, || DetailView::build(record, links));
        RenderPlan::Detail {
            position,
            visibility,
        }
    }

    /// Detail view of a rendered row, built on first access.
    pub fn detail(&mut self, position: Position) -> Option<&DetailView> {
        if !self.epoch.window.contains(position) {
            return None;
        }
        let record = self.epoch.view.record(&self.dataset, position)?;
        let links = self.links.as_ref();
        Some(
            self.epoch
                .details
                .get_or_build(position, || DetailView::build(record, links)),
        )
    }

    fn grow(&mut self) -> RenderPlan {
        let Some(metrics) = self.last_scroll else {
            return RenderPlan::Unchanged;
        };
        match self.epoch.window.grow_if_needed(metrics) {
            Some(rows) => {
                self.last_scroll = None;
                RenderPlan::Append { rows }
            }
            None => RenderPlan::Unchanged,
        }
    }

    fn refilter(&mut self) -> RenderPlan {
        let id = self.epoch.id + 1;
        self.epoch = Epoch::install(
            id,
            &self.dataset,
            &self.facets,
            &self.query,
            self.config,
            self.viewport_height,
        );
        self.last_scroll = None;
        RenderPlan::Rebuild {
            epoch: id,
            rows: self.epoch.window.rendered_range(),
        }
    }

    // -- accessors ---------------------------------------------------------

    #[must_use]
    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    #[must_use]
    pub fn query(&self) -> &str {
        &self.query
    }

    #[must_use]
    pub fn facets(&self) -> &FacetSelection {
        &self.facets
    }

    #[must_use]
    pub fn viewport_height(&self) -> u32 {
        self.viewport_height
    }

    #[must_use]
    pub fn epoch_id(&self) -> u64 {
        self.epoch.id
    }

    #[must_use]
    pub fn view(&self) -> &FilteredView {
        &self.epoch.view
    }

    #[must_use]
    pub fn window(&self) -> &ViewportWindow {
        &self.epoch.window
    }

    #[must_use]
    pub fn details(&self) -> &DetailCache {
        &self.epoch.details
    }

    #[must_use]
    pub fn rendered_count(&self) -> usize {
        self.epoch.window.rendered_count()
    }

    /// Row data for a rendered position.
    #[must_use]
    pub fn row(&self, position: Position) -> Option<RowView<'_>> {
        if !self.epoch.window.contains(position) {
            return None;
        }
        let dataset_index = self.epoch.view.dataset_index(position)?;
        let record = self.dataset.get(dataset_index)?;
        Some(RowView {
            position,
            dataset_index,
            class: record.class(),
            feature: record.feature(),
            opcode: record.opcode(),
            intrinsics: record.intrinsics(),
            summary: &record.description().brief,
            record,
        })
    }

    /// Row data for every rendered position in `rows`.
    pub fn rows(&self, rows: Range<usize>) -> impl Iterator<Item = RowView<'_>> + '_ {
        rows.filter_map(move |position| self.row(position))
    }
}
