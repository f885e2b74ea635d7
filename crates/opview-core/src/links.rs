#![forbid(unsafe_code)]

//! Citation links for detail views.
//!
//! The core only decides *which* page of *which* document a section cites;
//! the href is the document's base path with a `#page=N` fragment.

use serde::Serialize;

use crate::record::Metadata;

/// A clickable external reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Link {
    pub label: String,
    pub href: String,
}

impl Link {
    fn to_page(base: &str, page: u32) -> Self {
        Self {
            label: format!("p. {page}"),
            href: format!("{base}#page={page}"),
        }
    }
}

/// Produces citation links. Returning `None` renders the citation as text.
pub trait LinkBuilder {
    /// Link to `page` of the optimization guide for microarchitecture `arch`.
    fn table_citation(&self, arch: &str, page: u32) -> Option<Link>;

    /// Link to `page` of the intrinsics reference.
    fn intrinsics_guide(&self, page: u32) -> Option<Link>;
}

/// Builds links from the dataset's metadata paths.
impl LinkBuilder for Metadata {
    fn table_citation(&self, arch: &str, page: u32) -> Option<Link> {
        self.table
            .get(arch)
            .filter(|base| !base.is_empty())
            .map(|base| Link::to_page(base, page))
    }

    fn intrinsics_guide(&self, page: u32) -> Option<Link> {
        if self.intrinsics.is_empty() {
            return None;
        }
        Some(Link::to_page(&self.intrinsics, page))
    }
}

/// Never produces links.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLinks;

impl LinkBuilder for NoLinks {
    fn table_citation(&self, _arch: &str, _page: u32) -> Option<Link> {
        None
    }

    fn intrinsics_guide(&self, _page: u32) -> Option<Link> {
        None
    }
}
