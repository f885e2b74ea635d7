#![forbid(unsafe_code)]

//! Detail views: the expanded, paint-ready form of one record.
//!
//! A [`DetailView`] is plain data. Building one walks the record's brief
//! fields, reshapes intrinsic signatures, resolves citation links, and groups
//! the timing table by microarchitecture; painting it is someone else's job.
//!
//! Every section is optional and is left out when its source is empty:
//!
//! | Section | Present when |
//! |---------|--------------|
//! | Synopsis | at least one brief field is non-empty |
//! | Description | detailed text is non-empty |
//! | Operation | pseudocode is non-empty |
//! | Table | some microarchitecture has a variant row |

use std::fmt;

use serde::Serialize;

use crate::links::{Link, LinkBuilder};
use crate::record::{INTRINSICS_KEY, Record};

/// Synopsis tags whose values are code (opcodes, signatures, assembly).
pub const CODE_TAGS: [&str; 4] = ["Opcode", "Intrinsics", "Assembly", "Equivalent to"];

/// Brief key holding an intrinsics-reference page number.
pub const REFERENCE_KEY: &str = "Reference";

/// Column labels of the timing table.
pub const TABLE_HEADER: [&str; 6] = [
    "uArch",
    "Variant / Form",
    "Latency",
    "Throughput",
    "Pipes",
    "Notes",
];

// ---------------------------------------------------------------------------
// Synopsis
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SynopsisStyle {
    Code,
    Text,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SynopsisBody {
    Plain { text: String },
    Signature(IntrinsicSignature),
    Link(Link),
}

/// One tagged line of the synopsis section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SynopsisLine {
    pub tag: String,
    pub style: SynopsisStyle,
    pub body: SynopsisBody,
}

impl SynopsisLine {
    fn build(tag: &str, value: &str, links: &dyn LinkBuilder) -> Self {
        let style = if CODE_TAGS.contains(&tag) {
            SynopsisStyle::Code
        } else {
            SynopsisStyle::Text
        };
        let body = match tag {
            INTRINSICS_KEY => IntrinsicSignature::parse(value).map(SynopsisBody::Signature),
            REFERENCE_KEY => value
                .trim()
                .parse::<u32>()
                .ok()
                .and_then(|page| links.intrinsics_guide(page))
                .map(SynopsisBody::Link),
            _ => None,
        }
        .unwrap_or_else(|| SynopsisBody::Plain {
            text: value.to_string(),
        });
        Self {
            tag: tag.to_string(),
            style,
            body,
        }
    }

    /// Body flattened to a single line of text.
    #[must_use]
    pub fn text(&self) -> String {
        match &self.body {
            SynopsisBody::Plain { text } => text.clone(),
            SynopsisBody::Signature(sig) => sig.to_string(),
            SynopsisBody::Link(link) => link.label.clone(),
        }
    }
}

/// An intrinsic prototype split into its head and `type name` parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IntrinsicSignature {
    /// Return type and function name.
    pub prototype: String,
    pub params: Vec<String>,
}

impl IntrinsicSignature {
    /// Split on `(`, `)` and `,`, dropping empty tokens. The first token is
    /// the prototype, the rest are parameters. `None` for blank input.
    #[must_use]
    pub fn parse(signature: &str) -> Option<Self> {
        let mut tokens = signature
            .split(['(', ')', ','])
            .map(|token| token.split_whitespace().collect::<Vec<_>>().join(" "))
            .filter(|token| !token.is_empty());
        let prototype = tokens.next()?;
        Some(Self {
            prototype,
            params: tokens.collect(),
        })
    }

    /// One entry per parameter; all but the last end in `,`, the last in `);`.
    #[must_use]
    pub fn param_lines(&self) -> Vec<String> {
        let last = self.params.len().saturating_sub(1);
        self.params
            .iter()
            .enumerate()
            .map(|(i, param)| {
                if i == last {
                    format!("{param});")
                } else {
                    format!("{param},")
                }
            })
            .collect()
    }
}

impl fmt::Display for IntrinsicSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({});", self.prototype, self.params.join(", "))
    }
}

// ---------------------------------------------------------------------------
// Timing table
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableRow {
    pub variant: String,
    pub latency: String,
    pub throughput: String,
    pub pipes: String,
    pub notes: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub citation: Option<Link>,
}

/// Rows of one microarchitecture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableGroup {
    /// Code as it appears in the dataset (`a76`).
    pub arch: String,
    /// Human-readable family name (`Cortex-A76`).
    pub family: String,
    pub rows: Vec<TableRow>,
}

/// Expand a microarchitecture code to its family name.
///
/// `a*` codes are Cortex cores, `n*` codes are Neoverse cores; anything else
/// is returned unchanged.
#[must_use]
pub fn arch_family_name(code: &str) -> String {
    match code.chars().next() {
        Some('a') => format!("Cortex-{}", code.to_uppercase()),
        Some('n') => format!("Neoverse-{}", code.to_uppercase()),
        _ => code.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Detail view
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetailView {
    pub synopsis: Vec<SynopsisLine>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<Vec<TableGroup>>,
}

impl DetailView {
    #[must_use]
    pub fn build(record: &Record, links: &dyn LinkBuilder) -> Self {
        let synopsis = record
            .brief()
            .iter()
            .filter(|(_, value)| !value.is_empty())
            .map(|(tag, value)| SynopsisLine::build(tag, value, links))
            .collect();

        let description = &record.description().detailed;
        let operation = &record.description().operation;

        Self {
            synopsis,
            description: (!description.is_empty()).then(|| description.clone()),
            operation: (!operation.is_empty()).then(|| operation.clone()),
            table: build_table(record, links),
        }
    }

    /// Number of sections that will be painted.
    #[must_use]
    pub fn section_count(&self) -> usize {
        usize::from(!self.synopsis.is_empty())
            + usize::from(self.description.is_some())
            + usize::from(self.operation.is_some())
            + usize::from(self.table.is_some())
    }
}

fn build_table(record: &Record, links: &dyn LinkBuilder) -> Option<Vec<TableGroup>> {
    if record.table().is_empty() {
        return None;
    }
    let groups = record
        .table()
        .iter()
        .filter(|(_, rows)| !rows.is_empty())
        .map(|(arch, rows)| TableGroup {
            arch: arch.to_string(),
            family: arch_family_name(arch),
            rows: rows
                .iter()
                .map(|row| TableRow {
                    variant: row.variant.clone(),
                    latency: row.latency.clone(),
                    throughput: row.throughput.clone(),
                    pipes: row.pipes.clone(),
                    notes: row.reference.clone(),
                    citation: row.page.and_then(|page| links.table_citation(arch, page)),
                })
                .collect(),
        })
        .collect();
    Some(groups)
}
