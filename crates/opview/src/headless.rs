#![forbid(unsafe_code)]

//! Non-interactive output: filtered rows as JSON lines, or one detail view.
//!
//! A headless session is an ordinary [`Session`] whose viewport is tall enough
//! for the initial window to cover every filtered row.

use std::fmt;
use std::io::{self, Write};

use opview_core::{Dataset, FacetSelection, Position, Session, WindowConfig};

#[derive(Debug)]
pub enum HeadlessError {
    Io(io::Error),
    Json(serde_json::Error),
    NoSuchPosition { position: Position, matches: usize },
}

impl fmt::Display for HeadlessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "write failed: {err}"),
            Self::Json(err) => write!(f, "serialization failed: {err}"),
            Self::NoSuchPosition { position, matches } => {
                write!(f, "no row at position {position} ({matches} matching rows)")
            }
        }
    }
}

impl std::error::Error for HeadlessError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Json(err) => Some(err),
            Self::NoSuchPosition { .. } => None,
        }
    }
}

impl From<io::Error> for HeadlessError {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<serde_json::Error> for HeadlessError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err)
    }
}

/// Session whose first window holds the whole filtered view.
#[must_use]
pub fn session(dataset: Dataset, query: &str, facets: FacetSelection) -> Session {
    let config = WindowConfig::default().with_row_height(1).with_initial_screens(1);
    let mut session = Session::new(dataset, config, u32::MAX);
    session.set_facets(facets);
    session.set_query(query);
    session
}

/// Write every filtered row as one JSON object per line.
pub fn print_rows(session: &Session, out: &mut impl Write) -> Result<usize, HeadlessError> {
    let mut written = 0;
    for row in session.rows(0..session.view().len()) {
        serde_json::to_writer(&mut *out, &row)?;
        out.write_all(b"\n")?;
        written += 1;
    }
    out.flush()?;
    Ok(written)
}

/// Write the detail view of `position` as pretty JSON.
pub fn print_detail(
    session: &mut Session,
    position: Position,
    out: &mut impl Write,
) -> Result<(), HeadlessError> {
    let matches = session.view().len();
    let detail = session
        .detail(position)
        .ok_or(HeadlessError::NoSuchPosition { position, matches })?;
    serde_json::to_writer_pretty(&mut *out, detail)?;
    out.write_all(b"\n")?;
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use opview_core::Facet;
    use opview_core::record::{INTRINSICS_KEY, OPCODE_KEY};
    use opview_core::{Description, Record};
    use pretty_assertions::assert_eq;
    use serde_json::Value;

    fn dataset(n: usize) -> Dataset {
        Dataset::from_records(
            (0..n)
                .map(|i| {
                    let intrinsics = if i % 2 == 0 { format!("int32x4_t vop{i}(int32x4_t a)") } else { String::new() };
                    Record::from_brief([(OPCODE_KEY, format!("OP{i}")), (INTRINSICS_KEY, intrinsics)])
                        .with_description(Description::new(format!("operation {i}"), "", ""))
                })
                .collect(),
        )
    }

    #[test]
    fn headless_window_covers_every_row() {
        let session = session(dataset(5_000), "", FacetSelection::new());
        assert_eq!(session.rendered_count(), 5_000);
    }

    #[test]
    fn rows_are_json_lines() {
        let session = session(dataset(6), "op", FacetSelection::new().with(Facet::IntrinsicsOnly));
        let mut out = Vec::new();
        assert_eq!(print_rows(&session, &mut out).expect("print"), 3);

        let text = String::from_utf8(out).expect("utf-8");
        let rows: Vec<Value> = text
            .lines()
            .map(|line| serde_json::from_str(line).expect("json line"))
            .collect();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1]["opcode"], "OP2");
        assert_eq!(rows[1]["position"], 1);
        assert_eq!(rows[1]["dataset_index"], 2);
        assert_eq!(rows[1]["summary"], "operation 2");
        assert!(rows[1].get("record").is_none());
    }

    #[test]
    fn detail_is_pretty_json() {
        let mut session = session(dataset(3), "", FacetSelection::new());
        let mut out = Vec::new();
        print_detail(&mut session, 2, &mut out).expect("detail");
        let value: Value = serde_json::from_slice(&out).expect("json");
        assert_eq!(value["synopsis"][0]["tag"], "Opcode");
        assert_eq!(value["synopsis"][0]["body"]["text"], "OP2");
        assert_eq!(value["synopsis"][1]["body"]["kind"], "signature");
    }

    #[test]
    fn detail_out_of_range_is_an_error() {
        let mut session = session(dataset(3), "", FacetSelection::new());
        let err = print_detail(&mut session, 7, &mut Vec::new()).unwrap_err();
        assert_eq!(err.to_string(), "no row at position 7 (3 matching rows)");
    }
}
