#![forbid(unsafe_code)]

//! Text layout for rows and detail panels.
//!
//! Everything here turns core data into [`Line`]s of styled [`Span`]s sized in
//! terminal cells. No terminal IO happens in this module; the app writes the
//! lines out.
//!
//! Widths are display widths (`unicode-width`), and truncation never splits a
//! grapheme cluster.

use crossterm::style::Color;
use opview_core::detail::{TABLE_HEADER, TableGroup};
use opview_core::{DetailView, ROW_HEADER, RowView, SynopsisBody, SynopsisLine, SynopsisStyle};
use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

use crate::theme;

const ELLIPSIS: &str = "…";
const DETAIL_INDENT: usize = 2;
const MAX_TAG_WIDTH: usize = 20;

// ---------------------------------------------------------------------------
// Spans and lines
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Span {
    pub text: String,
    pub fg: Option<Color>,
    pub bg: Option<Color>,
    pub bold: bool,
}

impl Span {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn fg(mut self, color: Color) -> Self {
        self.fg = Some(color);
        self
    }

    #[must_use]
    pub fn bg(mut self, color: Color) -> Self {
        self.bg = Some(color);
        self
    }

    #[must_use]
    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Line {
    pub spans: Vec<Span>,
}

impl Line {
    pub fn new(spans: Vec<Span>) -> Self {
        Self { spans }
    }

    pub fn blank() -> Self {
        Self::default()
    }

    /// Concatenated text without styling.
    #[must_use]
    pub fn text(&self) -> String {
        self.spans.iter().map(|span| span.text.as_str()).collect()
    }

    /// Clip to `width` cells, dropping or cutting spans past the edge.
    #[must_use]
    pub fn clipped(mut self, width: usize) -> Self {
        let mut used = 0;
        let mut keep = 0;
        for span in &mut self.spans {
            if used >= width {
                break;
            }
            let w = span.text.width();
            if used + w > width {
                span.text = truncate_to_width(&span.text, width - used);
                used = width;
            } else {
                used += w;
            }
            keep += 1;
        }
        self.spans.truncate(keep);
        self
    }
}

// ---------------------------------------------------------------------------
// Width helpers
// ---------------------------------------------------------------------------

/// Longest prefix of whole graphemes that fits in `max_width` cells.
#[must_use]
pub fn truncate_to_width(text: &str, max_width: usize) -> String {
    let mut out = String::new();
    let mut width = 0;
    for grapheme in text.graphemes(true) {
        let w = grapheme.width();
        if width + w > max_width {
            break;
        }
        out.push_str(grapheme);
        width += w;
    }
    out
}

/// Truncate with an ellipsis if needed, then pad with spaces to exactly
/// `width` cells.
#[must_use]
pub fn fit(text: &str, width: usize) -> String {
    let mut out = if text.width() <= width {
        text.to_string()
    } else if width <= ELLIPSIS.width() {
        truncate_to_width(text, width)
    } else {
        let mut cut = truncate_to_width(text, width - ELLIPSIS.width());
        cut.push_str(ELLIPSIS);
        cut
    };
    let pad = width.saturating_sub(out.width());
    out.extend(std::iter::repeat_n(' ', pad));
    out
}

/// Greedy word wrap. Explicit newlines start a new line; words longer than
/// `width` are split at grapheme boundaries.
#[must_use]
pub fn wrap(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();
    for paragraph in text.lines() {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            let mut word = word.to_string();
            loop {
                let needed = if current.is_empty() {
                    word.width()
                } else {
                    current.width() + 1 + word.width()
                };
                if needed <= width {
                    if !current.is_empty() {
                        current.push(' ');
                    }
                    current.push_str(&word);
                    break;
                }
                if !current.is_empty() {
                    lines.push(std::mem::take(&mut current));
                    continue;
                }
                // A single word wider than the line.
                let head = truncate_to_width(&word, width);
                let head = if head.is_empty() {
                    word.graphemes(true).next().unwrap_or_default().to_string()
                } else {
                    head
                };
                word = word[head.len()..].to_string();
                lines.push(head);
                if word.is_empty() {
                    break;
                }
            }
        }
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

// ---------------------------------------------------------------------------
// Row list
// ---------------------------------------------------------------------------

/// Column widths of the collapsed row list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowColumns {
    pub class: usize,
    pub feature: usize,
    pub opcode: usize,
    pub intrinsics: usize,
    pub summary: usize,
}

impl RowColumns {
    const CLASS: usize = 9;
    const FEATURE: usize = 14;
    const OPCODE: usize = 10;
    const GAPS: usize = 4;

    /// Split `width` cells; fixed columns first, the rest shared between
    /// intrinsics and summary.
    #[must_use]
    pub fn for_width(width: usize) -> Self {
        let fixed = Self::CLASS + Self::FEATURE + Self::OPCODE + Self::GAPS;
        let rest = width.saturating_sub(fixed);
        let intrinsics = rest * 45 / 100;
        Self {
            class: Self::CLASS,
            feature: Self::FEATURE,
            opcode: Self::OPCODE,
            intrinsics,
            summary: rest - intrinsics,
        }
    }
}

#[must_use]
pub fn header_line(columns: RowColumns, width: usize) -> Line {
    let widths = [
        columns.class,
        columns.feature,
        columns.opcode,
        columns.intrinsics,
        columns.summary,
    ];
    let text = ROW_HEADER
        .iter()
        .zip(widths)
        .map(|(label, w)| fit(label, w))
        .collect::<Vec<_>>()
        .join(" ");
    Line::new(vec![Span::plain(text).fg(theme::HEADER_FG).bold()]).clipped(width)
}

#[must_use]
pub fn row_line(row: &RowView<'_>, columns: RowColumns, selected: bool, width: usize) -> Line {
    let category = theme::category_background(row.record.category());
    let highlight = |span: Span| {
        if selected {
            span.bg(theme::SELECTED_BG)
        } else {
            span
        }
    };
    Line::new(vec![
        Span::plain(fit(row.class, columns.class))
            .fg(theme::CATEGORY_FG)
            .bg(category),
        Span::plain(" "),
        Span::plain(fit(row.feature, columns.feature))
            .fg(theme::CATEGORY_FG)
            .bg(category),
        highlight(Span::plain(" ")),
        highlight(Span::plain(fit(row.opcode, columns.opcode)).bold()),
        highlight(Span::plain(" ")),
        highlight(Span::plain(fit(row.intrinsics, columns.intrinsics)).fg(theme::CODE_FG)),
        highlight(Span::plain(" ")),
        highlight(Span::plain(fit(row.summary, columns.summary))),
    ])
    .clipped(width)
}

// ---------------------------------------------------------------------------
// Detail panel
// ---------------------------------------------------------------------------

/// Lines of an expanded detail panel, indented under its row.
#[must_use]
pub fn detail_lines(detail: &DetailView, width: usize) -> Vec<Line> {
    let inner = width.saturating_sub(DETAIL_INDENT).max(1);
    let mut lines = Vec::new();

    if !detail.synopsis.is_empty() {
        let tag_width = detail
            .synopsis
            .iter()
            .map(|line| line.tag.width())
            .max()
            .unwrap_or(0)
            .min(MAX_TAG_WIDTH);
        for synopsis in &detail.synopsis {
            lines.extend(synopsis_lines(synopsis, tag_width, inner));
        }
    }

    if let Some(description) = &detail.description {
        lines.push(Line::blank());
        lines.push(section_title("Description"));
        lines.extend(wrap(description, inner).into_iter().map(|l| Line::new(vec![Span::plain(l)])));
    }

    if let Some(operation) = &detail.operation {
        lines.push(Line::blank());
        lines.push(section_title("Operation"));
        lines.extend(
            operation
                .lines()
                .map(|l| Line::new(vec![Span::plain(l).fg(theme::CODE_FG)])),
        );
    }

    if let Some(table) = &detail.table {
        lines.push(Line::blank());
        lines.extend(table_lines(table, inner));
    }

    lines.push(Line::blank());
    lines
        .into_iter()
        .map(|line| indent(line, DETAIL_INDENT).clipped(width))
        .collect()
}

fn indent(mut line: Line, by: usize) -> Line {
    if !line.spans.is_empty() {
        line.spans.insert(0, Span::plain(" ".repeat(by)));
    }
    line
}

fn section_title(title: &str) -> Line {
    Line::new(vec![Span::plain(title).fg(theme::TAG_FG).bold()])
}

fn synopsis_lines(line: &SynopsisLine, tag_width: usize, width: usize) -> Vec<Line> {
    let tag = Span::plain(fit(&line.tag, tag_width)).fg(theme::TAG_FG);
    let blank_tag = || Span::plain(" ".repeat(tag_width));
    let value_width = width.saturating_sub(tag_width + 1).max(1);
    let value_span = |text: String| {
        let span = Span::plain(text);
        match line.style {
            SynopsisStyle::Code => span.fg(theme::CODE_FG),
            SynopsisStyle::Text => span,
        }
    };

    let values: Vec<Span> = match &line.body {
        SynopsisBody::Plain { text } => wrap(text, value_width).into_iter().map(value_span).collect(),
        SynopsisBody::Signature(sig) if sig.params.is_empty() => vec![value_span(sig.to_string())],
        SynopsisBody::Signature(sig) => std::iter::once(format!("{}(", sig.prototype))
            .chain(sig.param_lines().into_iter().map(|p| format!("    {p}")))
            .map(value_span)
            .collect(),
        SynopsisBody::Link(link) => vec![
            Span::plain(format!("{} <{}>", link.label, link.href)).fg(theme::LINK_FG),
        ],
    };

    values
        .into_iter()
        .enumerate()
        .map(|(i, value)| {
            let lead = if i == 0 { tag.clone() } else { blank_tag() };
            Line::new(vec![lead, Span::plain(" "), value])
        })
        .collect()
}

/// Column widths of the timing table.
const TABLE_WIDTHS: [usize; 5] = [14, 24, 8, 10, 8];

fn table_lines(groups: &[TableGroup], width: usize) -> Vec<Line> {
    let fixed: usize = TABLE_WIDTHS.iter().sum::<usize>() + TABLE_WIDTHS.len();
    let notes_width = width.saturating_sub(fixed).max(TABLE_HEADER[5].width());
    let row = |cells: [&str; 6]| {
        let mut text: Vec<String> = cells[..5]
            .iter()
            .zip(TABLE_WIDTHS)
            .map(|(cell, w)| fit(cell, w))
            .collect();
        text.push(fit(cells[5], notes_width));
        text.join(" ")
    };

    let mut lines = vec![Line::new(vec![
        Span::plain(row(TABLE_HEADER)).fg(theme::HEADER_FG).bold(),
    ])];
    for group in groups {
        for (i, r) in group.rows.iter().enumerate() {
            let arch = if i == 0 { group.family.as_str() } else { "" };
            let notes = match (&r.citation, r.notes.is_empty()) {
                (Some(link), true) => link.label.clone(),
                (Some(link), false) => format!("{} ({})", r.notes, link.label),
                (None, _) => r.notes.clone(),
            };
            lines.push(Line::new(vec![Span::plain(row([
                arch,
                &r.variant,
                &r.latency,
                &r.throughput,
                &r.pipes,
                &notes,
            ]))]));
        }
    }
    lines
}
