use newsstand_application::LoadStatus;
use newsstand_core::{CatalogLayout, DocumentRecord, Panel, THUMBNAIL_SCALE, ViewMode};
use newsstand_engine::plan_page_requests;
use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{
    Block, Borders, Clear, HighlightSpacing, List, ListItem, ListState, Paragraph, Wrap,
};
use ratatui_image::Image as ImageWidget;
use unicode_width::UnicodeWidthChar;

use crate::pages::{Fit, Shown};
use crate::{Focus, Ui};

const ACCENT: Color = Color::Cyan;
const SIDEBAR_WIDTH: u16 = 40;
const TILE_WIDTH: u16 = 22;
const TILE_HEIGHT: u16 = 4;
const PANEL_WIDTH: u16 = 30;

fn key(label: &str) -> Span<'static> {
    Span::styled(label.to_string(), Style::default().add_modifier(Modifier::BOLD))
}

fn focus_style(focused: bool) -> Style {
    if focused {
        Style::default().fg(ACCENT)
    } else {
        Style::default()
    }
}

fn highlight_style() -> Style {
    Style::default()
        .fg(Color::Black)
        .bg(ACCENT)
        .add_modifier(Modifier::BOLD)
}

/// Cuts `text` to at most `width` terminal columns, marking the cut with `…`.
pub(crate) fn truncate(text: &str, width: usize) -> String {
    let total: usize = text.chars().filter_map(UnicodeWidthChar::width).sum();
    if total <= width {
        return text.to_string();
    }
    if width == 0 {
        return String::new();
    }
    let mut out = String::new();
    let mut used = 0;
    for ch in text.chars() {
        let w = ch.width().unwrap_or(0);
        if used + w + 1 > width {
            break;
        }
        out.push(ch);
        used += w;
    }
    out.push('…');
    out
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

/// Centers an image of `image` size inside `area`, clipping when larger.
fn centered_in(image: Rect, area: Rect) -> Rect {
    let width = image.width.min(area.width);
    let height = image.height.min(area.height);
    Rect::new(
        area.x + area.width.saturating_sub(width) / 2,
        area.y + area.height.saturating_sub(height) / 2,
        width,
        height,
    )
}

impl Ui<'_> {
    pub(crate) fn draw(&mut self, frame: &mut Frame) {
        let area = frame.area();
        frame.render_widget(Clear, area);

        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(0),
                Constraint::Length(3),
            ])
            .split(area);

        let header = Paragraph::new(Text::from(self.header_lines()))
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::BOTTOM));
        frame.render_widget(header, layout[0]);

        let body = layout[1];
        if self.shell.sidebar_visible() && self.shell.sidebar_docked() {
            let columns = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Length(SIDEBAR_WIDTH), Constraint::Min(0)])
                .split(body);
            self.draw_viewer(frame, columns[1]);
            self.draw_sidebar(frame, columns[0]);
        } else {
            self.draw_viewer(frame, body);
            if self.shell.sidebar_visible() {
                let overlay = Rect::new(
                    body.x,
                    body.y,
                    SIDEBAR_WIDTH.min(body.width),
                    body.height,
                );
                frame.render_widget(Clear, overlay);
                self.draw_sidebar(frame, overlay);
            }
        }

        let footer = Paragraph::new(Text::from(self.footer_lines()))
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::TOP));
        frame.render_widget(footer, layout[2]);

        if self.goto_input.is_some() {
            self.draw_goto(frame, area);
        }
    }

    fn header_lines(&self) -> Vec<Line<'static>> {
        let category = self
            .shell
            .selected_category_record()
            .map(|c| c.name.clone())
            .unwrap_or_else(|| self.shell.selected_category().to_string());
        let mut lines = vec![Line::from(vec![
            Span::styled("Newsstand", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(format!(" · {category}")),
        ])];

        let dim = Style::default().fg(Color::DarkGray);
        let prev_style = if self.shell.has_previous_document() {
            Style::default()
        } else {
            dim
        };
        let next_style = if self.shell.has_next_document() {
            Style::default()
        } else {
            dim
        };
        let title = match self.shell.selected_document() {
            Some(doc) => format!("{} ({})", doc.title, doc.date),
            None => "no magazine selected".to_string(),
        };
        lines.push(Line::from(vec![
            Span::styled("‹ prev", prev_style),
            Span::raw(format!("  {title}  ")),
            Span::styled("next ›", next_style),
            Span::styled(format!("   [{}]", self.shell.viewport().as_str()), dim),
        ]));
        lines
    }

    fn footer_lines(&self) -> Vec<Line<'static>> {
        if self.goto_input.is_some() {
            return vec![Line::from(vec![
                key("Esc"),
                Span::raw(" cancel  "),
                key("Enter"),
                Span::raw(" go"),
            ])];
        }
        if self.search_open {
            return vec![Line::from(vec![
                key("Esc"),
                Span::raw(" done  "),
                key("Backspace"),
                Span::raw(" delete  "),
                key("Ctrl+u"),
                Span::raw(" clear"),
            ])];
        }

        let mut hints = match self.focus {
            Focus::Categories => vec![
                key("↑/↓"),
                Span::raw(" move  "),
                key("Enter"),
                Span::raw(" open category  "),
            ],
            Focus::Documents => vec![
                key("↑/↓"),
                Span::raw(" move  "),
                key("Enter"),
                Span::raw(" read  "),
                key("/"),
                Span::raw(" search  "),
                key("v"),
                Span::raw(" grid/list  "),
            ],
            Focus::Viewer => vec![
                key("←/→"),
                Span::raw(" pages  "),
                key("+/-"),
                Span::raw(" zoom  "),
                key("d"),
                Span::raw(" single/double  "),
                key("b/B"),
                Span::raw(" bookmark  "),
                key("t"),
                Span::raw(" thumbnails  "),
                key("g"),
                Span::raw(" go to  "),
            ],
        };
        hints.extend([
            key("Tab"),
            Span::raw(" focus  "),
            key("[/]"),
            Span::raw(" prev/next  "),
            key("s"),
            Span::raw(" sidebar  "),
            key("q"),
            Span::raw(" quit"),
        ]);

        let mut lines = vec![Line::from(hints)];
        if let Some(notice) = &self.notice {
            lines.push(Line::from(Span::styled(
                notice.clone(),
                Style::default().fg(ACCENT),
            )));
        }
        lines
    }

    fn draw_sidebar(&self, frame: &mut Frame, area: Rect) {
        let categories = &self.shell.catalog().categories;
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(categories.len() as u16 + 2),
                Constraint::Min(0),
            ])
            .split(area);

        let items: Vec<ListItem> = categories
            .iter()
            .map(|c| {
                let marker = if c.id == self.shell.selected_category() {
                    "● "
                } else {
                    "  "
                };
                ListItem::new(format!("{marker}{}", c.name))
            })
            .collect();
        let list = List::new(items)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(focus_style(self.focus == Focus::Categories))
                    .title("Categories"),
            )
            .highlight_style(highlight_style())
            .highlight_symbol("> ")
            .highlight_spacing(HighlightSpacing::Always);
        let mut state = ListState::default();
        if self.focus == Focus::Categories {
            state.select(Some(self.category_cursor));
        }
        frame.render_stateful_widget(list, rows[0], &mut state);

        self.draw_library(frame, rows[1]);
    }

    fn draw_library(&self, frame: &mut Frame, area: Rect) {
        let documents = self.shell.visible_documents();
        let browser = self.shell.browser();
        let title = format!(
            "{} documents available · {}",
            documents.len(),
            browser.layout()
        );
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(focus_style(self.focus == Focus::Documents))
            .title(title);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let show_search = self.search_open || !browser.search_text().is_empty();
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(u16::from(show_search)),
                Constraint::Min(0),
            ])
            .split(inner);
        if show_search {
            let cursor = if self.search_open { "▏" } else { "" };
            let search = Paragraph::new(Line::from(vec![
                Span::styled("/ ", Style::default().fg(ACCENT)),
                Span::raw(format!("{}{cursor}", browser.search_text())),
            ]));
            frame.render_widget(search, rows[0]);
        }

        if documents.is_empty() {
            let empty = if browser.search_text().is_empty() {
                "No documents in this category"
            } else {
                "No documents match your search"
            };
            frame.render_widget(
                Paragraph::new(empty)
                    .alignment(Alignment::Center)
                    .style(Style::default().fg(Color::DarkGray)),
                rows[1],
            );
            return;
        }

        match browser.layout() {
            CatalogLayout::List => self.draw_document_list(frame, rows[1], &documents),
            CatalogLayout::Grid => self.draw_document_grid(frame, rows[1], &documents),
        }
    }

    fn is_open(&self, doc: &DocumentRecord) -> bool {
        self.shell
            .selected_document()
            .is_some_and(|selected| selected.id == doc.id)
    }

    fn draw_document_list(&self, frame: &mut Frame, area: Rect, documents: &[&DocumentRecord]) {
        let width = usize::from(area.width.saturating_sub(4));
        let items: Vec<ListItem> = documents
            .iter()
            .map(|doc| {
                let style = if self.is_open(doc) {
                    Style::default().add_modifier(Modifier::BOLD)
                } else {
                    Style::default()
                };
                ListItem::new(vec![
                    Line::from(Span::styled(truncate(&doc.title, width), style)),
                    Line::from(Span::styled(
                        truncate(&doc.date, width),
                        Style::default().fg(Color::DarkGray),
                    )),
                ])
            })
            .collect();
        let list = List::new(items)
            .highlight_style(highlight_style())
            .highlight_symbol("> ")
            .highlight_spacing(HighlightSpacing::Always);
        let mut state = ListState::default();
        state.select(Some(self.document_cursor.min(documents.len() - 1)));
        frame.render_stateful_widget(list, area, &mut state);
    }

    fn draw_document_grid(&self, frame: &mut Frame, area: Rect, documents: &[&DocumentRecord]) {
        let columns = usize::from((area.width / TILE_WIDTH).max(1));
        let visible_rows = usize::from((area.height / TILE_HEIGHT).max(1));
        let cursor = self.document_cursor.min(documents.len() - 1);
        let first_row = (cursor / columns).saturating_sub(visible_rows - 1);
        let tile_width = area.width / columns as u16;

        for (idx, doc) in documents
            .iter()
            .enumerate()
            .skip(first_row * columns)
            .take(visible_rows * columns)
        {
            let row = (idx / columns - first_row) as u16;
            let col = (idx % columns) as u16;
            let tile = Rect::new(
                area.x + col * tile_width,
                area.y + row * TILE_HEIGHT,
                tile_width,
                TILE_HEIGHT,
            )
            .intersection(area);

            let selected = idx == cursor && self.focus == Focus::Documents;
            let border = if selected {
                Style::default().fg(ACCENT).add_modifier(Modifier::BOLD)
            } else if self.is_open(doc) {
                Style::default().fg(Color::White)
            } else {
                Style::default().fg(Color::DarkGray)
            };
            let width = usize::from(tile.width.saturating_sub(2));
            let body = Paragraph::new(vec![
                Line::from(Span::styled(
                    truncate(&doc.title, width),
                    Style::default().add_modifier(Modifier::BOLD),
                )),
                Line::from(truncate(&doc.date, width)),
            ])
            .block(Block::default().borders(Borders::ALL).border_style(border));
            frame.render_widget(body, tile);
        }
    }

    fn viewer_title(&self) -> String {
        let viewer = self.shell.viewer();
        let state = viewer.state();
        let Some(doc) = viewer.document() else {
            return "Reader".to_string();
        };
        let count = state
            .page_count
            .map(|c| c.to_string())
            .unwrap_or_else(|| "?".to_string());
        let page = match (state.view_mode, state.page_count) {
            (ViewMode::Double, Some(count)) if state.current_page < count => {
                format!("p{}-{}/{count}", state.current_page, state.current_page + 1)
            }
            _ => format!("p{}/{count}", state.current_page),
        };
        let star = if viewer.is_current_page_bookmarked() {
            " ★"
        } else {
            ""
        };
        format!(
            " {} · {page} · {:.0}% · {}{star} ",
            doc.title,
            state.scale * 100.0,
            state.view_mode
        )
    }

    fn draw_viewer(&mut self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(focus_style(self.focus == Focus::Viewer))
            .title(self.viewer_title());
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let mut panel = self.shell.viewer().state().active_panel;
        if panel != Panel::None && inner.width <= PANEL_WIDTH + 10 {
            self.shell.viewer_mut().set_active_panel(Panel::None);
            self.notice = Some("panel closed: window too narrow".to_string());
            panel = Panel::None;
        }
        let content = if panel == Panel::None {
            inner
        } else {
            let columns = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Min(0), Constraint::Length(PANEL_WIDTH)])
                .split(inner);
            match panel {
                Panel::Thumbnails => self.draw_thumbnails(frame, columns[1]),
                Panel::Bookmarks => self.draw_bookmarks(frame, columns[1]),
                Panel::None => {}
            }
            columns[0]
        };

        let message = |text: String, style: Style| {
            Paragraph::new(text)
                .alignment(Alignment::Center)
                .wrap(Wrap { trim: true })
                .style(style)
        };

        match self.shell.viewer().status() {
            LoadStatus::Idle => {
                frame.render_widget(
                    message(
                        "Select a magazine to start reading".to_string(),
                        Style::default().fg(Color::DarkGray),
                    ),
                    centered_rect(80, 30, content),
                );
            }
            LoadStatus::Loading => {
                frame.render_widget(
                    message("Loading magazine...".to_string(), Style::default()),
                    centered_rect(80, 30, content),
                );
            }
            LoadStatus::Failed => {
                let reason = self
                    .shell
                    .viewer()
                    .error()
                    .map(|err| err.to_string())
                    .unwrap_or_default();
                frame.render_widget(
                    message(
                        format!("{reason}\n\npress r to retry"),
                        Style::default().fg(Color::Red),
                    ),
                    centered_rect(80, 40, content),
                );
            }
            LoadStatus::Ready => self.draw_pages(frame, content),
        }
    }

    fn draw_pages(&mut self, frame: &mut Frame, area: Rect) {
        let state = self.shell.viewer().state();
        let requests = plan_page_requests(
            state.current_page,
            state.page_count,
            state.view_mode,
            state.scale,
        );
        if requests.is_empty() {
            return;
        }
        let Some(source) = self.source.as_deref() else {
            return;
        };

        let constraints = vec![Constraint::Ratio(1, requests.len() as u32); requests.len()];
        let slots = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(constraints)
            .split(area);

        for (request, slot) in requests.iter().zip(slots.iter()) {
            match self.pages.show(
                &self.engine,
                &self.picker,
                source,
                request.page,
                request.scale,
                *slot,
                Fit::Crop,
            ) {
                Shown::Image(protocol) => {
                    frame.render_widget(ImageWidget::new(protocol), centered_in(protocol.area(), *slot));
                }
                Shown::Failed(reason) => {
                    frame.render_widget(
                        Paragraph::new(format!("page {}: {reason}", request.page))
                            .wrap(Wrap { trim: true })
                            .style(Style::default().fg(Color::Red)),
                        *slot,
                    );
                }
            }
        }
    }

    fn draw_thumbnails(&mut self, frame: &mut Frame, area: Rect) {
        let thumbnails = self.shell.viewer().thumbnails().to_vec();
        let current = self.shell.viewer().current_page();
        let block = Block::default().borders(Borders::LEFT).title("Thumbnails");
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
            .split(inner);

        let items: Vec<ListItem> = thumbnails
            .iter()
            .map(|page| {
                let marker = if *page == current { "•" } else { " " };
                ListItem::new(format!("{marker} Page {page}"))
            })
            .collect();
        let list = List::new(items)
            .highlight_style(highlight_style())
            .highlight_symbol("> ")
            .highlight_spacing(HighlightSpacing::Always);
        let mut state = ListState::default();
        if !thumbnails.is_empty() {
            state.select(Some(self.panel_cursor.min(thumbnails.len() - 1)));
        }
        frame.render_stateful_widget(list, rows[0], &mut state);

        let Some(page) = state.selected().and_then(|idx| thumbnails.get(idx).copied()) else {
            return;
        };
        let Some(source) = self.source.as_deref() else {
            return;
        };
        match self.pages.show(
            &self.engine,
            &self.picker,
            source,
            page,
            THUMBNAIL_SCALE,
            rows[1],
            Fit::Contain,
        ) {
            Shown::Image(protocol) => {
                frame.render_widget(ImageWidget::new(protocol), centered_in(protocol.area(), rows[1]));
            }
            Shown::Failed(_) => {
                frame.render_widget(
                    Paragraph::new("preview unavailable")
                        .alignment(Alignment::Center)
                        .style(Style::default().fg(Color::DarkGray)),
                    rows[1],
                );
            }
        }
    }

    fn draw_bookmarks(&self, frame: &mut Frame, area: Rect) {
        let bookmarks = self.shell.viewer().bookmarks();
        let block = Block::default().borders(Borders::LEFT).title("Bookmarks");
        if bookmarks.is_empty() {
            frame.render_widget(
                Paragraph::new("No bookmarks yet")
                    .alignment(Alignment::Center)
                    .style(Style::default().fg(Color::DarkGray))
                    .block(block),
                area,
            );
            return;
        }

        let current = self.shell.viewer().current_page();
        let items: Vec<ListItem> = bookmarks
            .iter()
            .map(|bookmark| {
                let marker = if bookmark.page == current { "★" } else { " " };
                ListItem::new(format!("{marker} {}", bookmark.label))
            })
            .collect();
        let list = List::new(items)
            .block(block)
            .highlight_style(highlight_style())
            .highlight_symbol("> ")
            .highlight_spacing(HighlightSpacing::Always);
        let mut state = ListState::default();
        state.select(Some(self.panel_cursor.min(bookmarks.len() - 1)));
        frame.render_stateful_widget(list, area, &mut state);
    }

    fn draw_goto(&self, frame: &mut Frame, area: Rect) {
        let popup = centered_rect(40, 20, area);
        frame.render_widget(Clear, popup);
        let count = self
            .shell
            .viewer()
            .page_count()
            .map(|c| c.to_string())
            .unwrap_or_else(|| "?".to_string());
        let input = self.goto_input.as_deref().unwrap_or_default();
        let body = Paragraph::new(Line::from(vec![
            Span::raw(format!("{input}▏")),
            Span::styled(format!("  of {count}"), Style::default().fg(Color::DarkGray)),
        ]))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL).title("Go to page"));
        frame.render_widget(body, popup);
    }
}
