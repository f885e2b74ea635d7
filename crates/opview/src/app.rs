#![forbid(unsafe_code)]

//! Interactive terminal browser.
//!
//! [`App`] is the terminal-independent state: it maps crossterm events onto
//! [`Session`] events and lays out full frames as [`Line`]s. [`run`] owns the
//! terminal and does nothing but read events and write frames.
//!
//! # Screen layout
//!
//! | Row | Content |
//! |-----|---------|
//! | 0 | query line |
//! | 1 | facet bar |
//! | 2 | column header |
//! | 3 .. h-1 | rows and expanded detail panels |
//! | h-1 | status bar |
//!
//! Scroll positions are measured in lines of the list area, so a row is one
//! line and an expanded panel adds its own height to the content.

use std::collections::BTreeSet;
use std::io::{self, Write};

use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event as TermEvent, KeyCode, KeyEvent,
    KeyEventKind, KeyModifiers, MouseEvent, MouseEventKind,
};
use crossterm::style::{
    Attribute, Print, ResetColor, SetAttribute, SetBackgroundColor, SetForegroundColor,
};
use crossterm::{cursor, queue, terminal};
use opview_core::{
    Dataset, Facet, FacetSelection, Position, RenderPlan, ScrollMetrics, Session, WindowConfig,
};
use unicode_width::UnicodeWidthStr;

use crate::paint::{self, Line, RowColumns, Span};
use crate::theme;

const CHROME_TOP: u16 = 3;
const CHROME_BOTTOM: u16 = 1;
const WHEEL_STEP: u32 = 3;
const QUERY_PROMPT: &str = "> ";

/// Whether the event loop keeps going.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Line offsets of the rendered rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct ContentMap {
    /// First line of each rendered position.
    row_starts: Vec<u32>,
    /// Total lines of rows plus open panels.
    height: u32,
}

impl ContentMap {
    fn row_at_line(&self, line: u32) -> Option<Position> {
        match self.row_starts.binary_search(&line) {
            Ok(position) => Some(position),
            Err(0) => None,
            Err(next) => Some(next - 1),
        }
    }
}

pub struct App {
    session: Session,
    query: String,
    selected: Position,
    scroll_top: u32,
    width: u16,
    height: u16,
    /// Level kept by the F4 cycle, mirrored as a `with-armv8.N` facet.
    extension_level: Option<u8>,
}

impl App {
    #[must_use]
    pub fn new(
        dataset: Dataset,
        config: WindowConfig,
        query: String,
        facets: FacetSelection,
        (width, height): (u16, u16),
    ) -> Self {
        let extension_level = facets.iter().find_map(|facet| match facet {
            Facet::WithExtension(level) => Some(level),
            _ => None,
        });
        let mut session = Session::new(dataset, config, Self::viewport_height(height));
        if !facets.is_empty() {
            session.set_facets(facets);
        }
        if !query.is_empty() {
            session.set_query(query.clone());
        }
        Self {
            session,
            query,
            selected: 0,
            scroll_top: 0,
            width,
            height,
            extension_level,
        }
    }

    /// Lines available to the row list for a terminal `height` rows tall.
    #[must_use]
    pub fn viewport_height(height: u16) -> u32 {
        u32::from(height.saturating_sub(CHROME_TOP + CHROME_BOTTOM).max(1))
    }

    /// Terminal cursor position inside the query line.
    #[must_use]
    pub fn cursor(&self) -> (u16, u16) {
        let column = QUERY_PROMPT.width() + self.query.width();
        (u16::try_from(column).unwrap_or(u16::MAX).min(self.width.saturating_sub(1)), 0)
    }

    // -- input -------------------------------------------------------------

    pub fn handle_event(&mut self, event: TermEvent) -> Flow {
        match event {
            TermEvent::Key(key) if key.kind != KeyEventKind::Release => self.handle_key(key),
            TermEvent::Mouse(mouse) => {
                self.handle_mouse(mouse);
                Flow::Continue
            }
            TermEvent::Resize(width, height) => {
                self.resize(width, height);
                Flow::Continue
            }
            _ => Flow::Continue,
        }
    }

    fn handle_key(&mut self, key: KeyEvent) -> Flow {
        let page = self.session.viewport_height() as usize;
        match (key.code, key.modifiers) {
            (KeyCode::Char('c'), KeyModifiers::CONTROL) => return Flow::Quit,
            (KeyCode::Char(c), modifiers) if !modifiers.contains(KeyModifiers::CONTROL) => {
                self.query.push(c);
                self.query_changed();
            }
            (KeyCode::Backspace, _) => {
                if self.query.pop().is_some() {
                    self.query_changed();
                }
            }
            (KeyCode::Esc, _) => {
                if !self.query.is_empty() {
                    self.query.clear();
                    self.query_changed();
                }
            }
            (KeyCode::F(1), _) => self.toggle_facet(Facet::IntrinsicsOnly),
            (KeyCode::F(2), _) => self.toggle_facet(Facet::BaselineOnly),
            (KeyCode::F(3), _) => self.toggle_facet(Facet::NoExtensions),
            (KeyCode::F(4), _) => self.cycle_extension(),
            (KeyCode::Up, _) => self.move_selection(-1),
            (KeyCode::Down, _) => self.move_selection(1),
            (KeyCode::PageUp, _) => self.move_selection(-(page as isize)),
            (KeyCode::PageDown, _) => self.move_selection(page as isize),
            (KeyCode::Home, _) => self.move_selection(isize::MIN),
            (KeyCode::End, _) => self.move_selection(isize::MAX),
            (KeyCode::Enter, _) => {
                let plan = self.session.toggle_detail(self.selected);
                self.apply(plan);
                self.report_scroll();
            }
            _ => {}
        }
        Flow::Continue
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) {
        let content = self.content_map();
        let viewport = self.session.viewport_height();
        let max_top = content.height.saturating_sub(viewport);
        match mouse.kind {
            MouseEventKind::ScrollDown => {
                self.scroll_top = (self.scroll_top + WHEEL_STEP).min(max_top);
            }
            MouseEventKind::ScrollUp => {
                self.scroll_top = self.scroll_top.saturating_sub(WHEEL_STEP);
            }
            _ => return,
        }
        // Keep the selection on screen. A row whose panel is cut by the top
        // edge does not count as visible.
        let start = |p: Position| content.row_starts.get(p).copied().unwrap_or(0);
        let rows = content.row_starts.len();
        let first = content
            .row_at_line(self.scroll_top)
            .map_or(0, |p| if start(p) < self.scroll_top { p + 1 } else { p })
            .min(rows.saturating_sub(1));
        let last = content
            .row_at_line(self.scroll_top + viewport.saturating_sub(1))
            .unwrap_or(first);
        if start(self.selected) < self.scroll_top {
            self.selected = first;
        } else if self.selected > last {
            self.selected = last;
        }
        self.report_scroll();
    }

    fn resize(&mut self, width: u16, height: u16) {
        self.width = width;
        self.height = height;
        let plan = self.session.resize(Self::viewport_height(height));
        self.apply(plan);
        self.follow_selection();
        self.report_scroll();
    }

    fn query_changed(&mut self) {
        let plan = self.session.set_query(self.query.clone());
        self.apply(plan);
    }

    fn toggle_facet(&mut self, facet: Facet) {
        let plan = self.session.toggle_facet(facet);
        self.apply(plan);
    }

    /// None -> armv8.1 -> ... -> armv8.6 -> None.
    fn cycle_extension(&mut self) {
        let mut facets = self.session.facets().clone();
        if let Some(level) = self.extension_level {
            facets.remove(Facet::WithExtension(level));
        }
        self.extension_level = match self.extension_level {
            None => Some(1),
            Some(level) if level < opview_core::Category::MAX_EXTENSION => Some(level + 1),
            Some(_) => None,
        };
        if let Some(level) = self.extension_level {
            facets.insert(Facet::WithExtension(level));
        }
        let plan = self.session.set_facets(facets);
        self.apply(plan);
    }

    fn move_selection(&mut self, delta: isize) {
        let rendered = self.session.rendered_count();
        if rendered == 0 {
            return;
        }
        self.selected = self
            .selected
            .saturating_add_signed(delta)
            .min(rendered - 1);
        self.follow_selection();
        self.report_scroll();
    }

    fn apply(&mut self, plan: RenderPlan) {
        match plan {
            RenderPlan::Rebuild { epoch, rows } => {
                tracing::trace!(epoch, rows = rows.len(), "list rebuilt");
                self.selected = 0;
                self.scroll_top = 0;
            }
            RenderPlan::Append { rows } => {
                tracing::trace!(from = rows.start, to = rows.end, "rows appended");
            }
            RenderPlan::Detail { .. } | RenderPlan::Unchanged => {}
        }
    }

    /// Scroll just enough to keep the selected row in view.
    fn follow_selection(&mut self) {
        let content = self.content_map();
        let Some(&start) = content.row_starts.get(self.selected) else {
            return;
        };
        let viewport = self.session.viewport_height();
        if start < self.scroll_top {
            self.scroll_top = start;
        } else if start >= self.scroll_top + viewport {
            self.scroll_top = start + 1 - viewport;
        }
    }

    fn report_scroll(&mut self) {
        let content = self.content_map();
        let plan = self
            .session
            .scroll(ScrollMetrics::new(self.scroll_top, content.height));
        self.apply(plan);
    }

    // -- layout ------------------------------------------------------------

    fn open_panels(&self) -> BTreeSet<Position> {
        self.session.details().visible_positions().collect()
    }

    fn panel_lines(&self, position: Position) -> Vec<Line> {
        self.session
            .details()
            .get(position)
            .map(|detail| paint::detail_lines(detail, usize::from(self.width)))
            .unwrap_or_default()
    }

    fn content_map(&self) -> ContentMap {
        let open = self.open_panels();
        let mut map = ContentMap::default();
        for position in self.session.window().rendered_range() {
            map.row_starts.push(map.height);
            map.height += 1;
            if open.contains(&position) {
                let panel = u32::try_from(self.panel_lines(position).len()).unwrap_or(u32::MAX);
                map.height = map.height.saturating_add(panel);
            }
        }
        map
    }

    /// Lines of the list area, starting at the current scroll position.
    fn list_lines(&self) -> Vec<Line> {
        let width = usize::from(self.width);
        let viewport = self.session.viewport_height() as usize;
        let columns = RowColumns::for_width(width);
        let open = self.open_panels();
        let skip = self.scroll_top as usize;

        let mut lines = Vec::with_capacity(viewport);
        let mut index = 0usize;
        for row in self.session.rows(self.session.window().rendered_range()) {
            if lines.len() >= viewport {
                break;
            }
            if index >= skip {
                lines.push(paint::row_line(&row, columns, row.position == self.selected, width));
            }
            index += 1;
            if open.contains(&row.position) {
                for line in self.panel_lines(row.position) {
                    if lines.len() >= viewport {
                        break;
                    }
                    if index >= skip {
                        lines.push(line);
                    }
                    index += 1;
                }
            }
        }
        lines
    }

    fn facet_bar(&self) -> Line {
        let facets = self.session.facets();
        let toggle = |key: &str, facet: Facet| {
            let on = facets.contains(facet);
            let mark = if on { "[x]" } else { "[ ]" };
            Span::plain(format!("{key} {mark} {facet}  ")).fg(if on {
                theme::FACET_ON_FG
            } else {
                theme::FACET_OFF_FG
            })
        };
        let kept = match self.extension_level {
            Some(level) => Span::plain(format!("F4 keep armv8.{level}")).fg(theme::FACET_ON_FG),
            None => Span::plain("F4 keep armv8.N: none").fg(theme::FACET_OFF_FG),
        };
        Line::new(vec![
            toggle("F1", Facet::IntrinsicsOnly),
            toggle("F2", Facet::BaselineOnly),
            toggle("F3", Facet::NoExtensions),
            kept,
        ])
    }

    fn status_bar(&self) -> Line {
        let text = format!(
            " {} of {} instructions | {} shown | row {}",
            self.session.view().len(),
            self.session.dataset().len(),
            self.session.rendered_count(),
            if self.session.rendered_count() == 0 { 0 } else { self.selected + 1 },
        );
        Line::new(vec![
            Span::plain(paint::fit(&text, usize::from(self.width)))
                .fg(theme::STATUS_FG)
                .bg(theme::STATUS_BG),
        ])
    }

    /// The whole screen, exactly `height` lines.
    #[must_use]
    pub fn frame(&self) -> Vec<Line> {
        let width = usize::from(self.width);
        let height = usize::from(self.height);
        let mut lines = vec![
            Line::new(vec![
                Span::plain(QUERY_PROMPT).fg(theme::TAG_FG),
                Span::plain(self.query.clone()).bold(),
            ]),
            self.facet_bar(),
            paint::header_line(RowColumns::for_width(width), width),
        ];
        let list_height = height.saturating_sub(usize::from(CHROME_TOP + CHROME_BOTTOM));
        let mut list = self.list_lines();
        list.resize(list_height, Line::blank());
        lines.extend(list);
        lines.push(self.status_bar());
        lines.truncate(height);
        lines.into_iter().map(|line| line.clipped(width)).collect()
    }
}

#[cfg(test)]
impl App {
    fn session(&self) -> &Session {
        &self.session
    }

    fn selected(&self) -> Position {
        self.selected
    }

    fn scroll_top(&self) -> u32 {
        self.scroll_top
    }
}

// ---------------------------------------------------------------------------
// Terminal
// ---------------------------------------------------------------------------

/// Restores the terminal on drop, including on early returns.
struct TerminalGuard {
    restored: bool,
}

impl TerminalGuard {
    fn enter() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        let mut out = io::stdout();
        queue!(out, terminal::EnterAlternateScreen, EnableMouseCapture)?;
        out.flush()?;
        Ok(Self { restored: false })
    }

    fn restore(&mut self) {
        if self.restored {
            return;
        }
        self.restored = true;
        let mut out = io::stdout();
        let _ = queue!(
            out,
            DisableMouseCapture,
            cursor::Show,
            terminal::LeaveAlternateScreen
        );
        let _ = out.flush();
        let _ = terminal::disable_raw_mode();
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        self.restore();
    }
}

fn draw(out: &mut impl Write, app: &App) -> io::Result<()> {
    queue!(out, cursor::Hide)?;
    for (y, line) in app.frame().iter().enumerate() {
        let y = u16::try_from(y).unwrap_or(u16::MAX);
        queue!(out, cursor::MoveTo(0, y), terminal::Clear(terminal::ClearType::CurrentLine))?;
        for span in &line.spans {
            if let Some(fg) = span.fg {
                queue!(out, SetForegroundColor(fg))?;
            }
            if let Some(bg) = span.bg {
                queue!(out, SetBackgroundColor(bg))?;
            }
            if span.bold {
                queue!(out, SetAttribute(Attribute::Bold))?;
            }
            queue!(out, Print(&span.text), ResetColor, SetAttribute(Attribute::Reset))?;
        }
    }
    let (x, y) = app.cursor();
    queue!(out, cursor::MoveTo(x, y), cursor::Show)?;
    out.flush()
}

/// Run the browser until the user quits.
pub fn run(
    dataset: Dataset,
    config: WindowConfig,
    query: String,
    facets: FacetSelection,
) -> io::Result<()> {
    let size = terminal::size()?;
    let mut app = App::new(dataset, config, query, facets, size);
    let mut guard = TerminalGuard::enter()?;
    let mut out = io::stdout();

    loop {
        draw(&mut out, &app)?;
        if app.handle_event(event::read()?) == Flow::Quit {
            break;
        }
    }

    guard.restore();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use opview_core::record::{CLASS_KEY, FEATURE_KEY, INTRINSICS_KEY, OPCODE_KEY};
    use opview_core::{Description, Record};
    use pretty_assertions::assert_eq;

    fn dataset(n: usize) -> Dataset {
        Dataset::from_records(
            (0..n)
                .map(|i| {
                    let (class, feature) = match i % 3 {
                        0 => ("general", ""),
                        1 => ("advsimd", "armv8.2-fp16"),
                        _ => ("advsimd", ""),
                    };
                    let intrinsics = if i % 2 == 0 {
                        format!("int32x4_t vop{i}(int32x4_t a, int32x4_t b)")
                    } else {
                        String::new()
                    };
                    Record::from_brief([
                        (CLASS_KEY, class.to_string()),
                        (FEATURE_KEY, feature.to_string()),
                        (OPCODE_KEY, format!("OP{i}")),
                        (INTRINSICS_KEY, intrinsics),
                    ])
                    .with_description(Description::new(format!("operation {i}"), "", ""))
                })
                .collect(),
        )
    }

    fn app(n: usize) -> App {
        // 24 rows leave a 20-line list; 5 screens = 100 rows up front.
        App::new(
            dataset(n),
            WindowConfig::default().with_row_height(1),
            String::new(),
            FacetSelection::new(),
            (100, 24),
        )
    }

    fn key(code: KeyCode) -> TermEvent {
        TermEvent::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            app.handle_event(key(KeyCode::Char(c)));
        }
    }

    #[test]
    fn initial_frame_fills_screen() {
        let app = app(500);
        let frame = app.frame();
        assert_eq!(frame.len(), 24);
        assert_eq!(app.session().rendered_count(), 100);
        assert!(frame[2].text().contains("Opcode"));
        assert!(frame[3].text().contains("OP0"));
        assert!(frame[23].text().contains("500 of 500 instructions"));
    }

    #[test]
    fn typing_filters_and_resets_selection() {
        let mut app = app(500);
        app.handle_event(key(KeyCode::Down));
        assert_eq!(app.selected(), 1);
        type_text(&mut app, "op7");
        assert_eq!(app.session().query(), "op7");
        assert_eq!(app.selected(), 0);
        // OP7, OP70..OP79
        assert_eq!(app.session().view().len(), 11);
        app.handle_event(key(KeyCode::Backspace));
        assert_eq!(app.session().query(), "op");
        app.handle_event(key(KeyCode::Esc));
        assert_eq!(app.session().query(), "");
        assert_eq!(app.cursor(), (2, 0));
    }

    #[test]
    fn function_keys_toggle_facets() {
        let mut app = app(30);
        app.handle_event(key(KeyCode::F(1)));
        assert!(app.session().facets().contains(Facet::IntrinsicsOnly));
        assert_eq!(app.session().view().len(), 15);
        app.handle_event(key(KeyCode::F(1)));
        assert!(app.session().facets().is_empty());

        app.handle_event(key(KeyCode::F(3)));
        assert_eq!(app.session().view().len(), 20);
        app.handle_event(key(KeyCode::F(4)));
        app.handle_event(key(KeyCode::F(4)));
        assert!(app.session().facets().contains(Facet::WithExtension(2)));
        assert_eq!(app.session().view().len(), 30);
        assert!(app.frame()[1].text().contains("F4 keep armv8.2"));
    }

    #[test]
    fn extension_cycle_wraps_to_none() {
        let mut app = app(3);
        for _ in 0..7 {
            app.handle_event(key(KeyCode::F(4)));
        }
        assert!(app.session().facets().is_empty());
    }

    #[test]
    fn enter_expands_selected_row() {
        let frame_text = |app: &App| -> Vec<String> { app.frame().iter().map(Line::text).collect() };
        let mut app = app(10);
        app.handle_event(key(KeyCode::Down));
        app.handle_event(key(KeyCode::Down));

        // The collapsed row already shows the start of the signature, but
        // only the panel breaks it into parameter lines.
        let text = frame_text(&app);
        assert!(!text.iter().any(|l| l.contains("int32x4_t b);")));
        assert!(!text.iter().any(|l| l.contains("Instruction Class")));

        app.handle_event(key(KeyCode::Enter));
        let text = frame_text(&app);
        let row = text.iter().position(|l| l.contains("OP2")).expect("row line");
        assert!(text[row + 1].contains("Instruction Class"));
        assert!(text.iter().any(|l| l.contains("int32x4_t b);")));

        app.handle_event(key(KeyCode::Enter));
        let text = frame_text(&app);
        assert!(!text.iter().any(|l| l.contains("int32x4_t b);")));
        assert!(!text.iter().any(|l| l.contains("Instruction Class")));
        assert_eq!(app.session().details().builds(), 1);
    }

    #[test]
    fn paging_towards_the_end_grows_the_window() {
        let mut app = app(500);
        assert_eq!(app.session().rendered_count(), 100);
        for _ in 0..4 {
            app.handle_event(key(KeyCode::PageDown));
        }
        assert_eq!(app.selected(), 80);
        assert!(app.session().rendered_count() > 100);
        assert!(app.scroll_top() > 0);
        let frame = app.frame();
        assert!(frame.iter().any(|l| l.text().contains("OP80")));
    }

    #[test]
    fn wheel_scroll_keeps_selection_visible() {
        let mut app = app(500);
        for _ in 0..5 {
            app.handle_event(TermEvent::Mouse(MouseEvent {
                kind: MouseEventKind::ScrollDown,
                column: 0,
                row: 5,
                modifiers: KeyModifiers::NONE,
            }));
        }
        assert_eq!(app.scroll_top(), 15);
        assert_eq!(app.selected(), 15);
    }

    #[test]
    fn resize_updates_viewport() {
        let mut app = app(500);
        app.handle_event(TermEvent::Resize(80, 44));
        assert_eq!(app.session().viewport_height(), 40);
        assert_eq!(app.frame().len(), 44);
    }

    #[test]
    fn dragging_the_terminal_does_not_grow_the_list() {
        let mut app = app(500);
        for height in [30, 31, 30, 31, 30, 31, 30, 31] {
            app.handle_event(TermEvent::Resize(100, height));
        }
        assert_eq!(app.session().rendered_count(), 100);
    }

    #[test]
    fn ctrl_c_quits() {
        let mut app = app(1);
        let quit = TermEvent::Key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert_eq!(app.handle_event(quit), Flow::Quit);
        assert_eq!(app.handle_event(key(KeyCode::Char('c'))), Flow::Continue);
    }

    #[test]
    fn empty_results_render_blank_list() {
        let mut app = app(5);
        type_text(&mut app, "zzz");
        assert_eq!(app.session().rendered_count(), 0);
        app.handle_event(key(KeyCode::Down));
        app.handle_event(key(KeyCode::Enter));
        let frame = app.frame();
        assert!(frame[3].text().is_empty());
        assert!(frame[23].text().contains("0 of 5 instructions"));
    }
}
