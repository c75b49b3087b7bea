//! Terminal front end: category sidebar, catalog browser and page viewer.

use std::io::{self, Stdout};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context as _;
use crossterm::event::{
    DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers, MouseEventKind,
};
use crossterm::terminal::{EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{event, terminal};
use newsstand_application::Shell;
use newsstand_core::{
    KeyValueStore, LoadTicket, Panel, Settings, StepDirection, WHEEL_ZOOM_STEP,
};
use newsstand_engine::{Engine, Loader, resolve_locator};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui_image::picker::Picker;

mod draw;
mod graphics;
mod pages;

use pages::PageImages;

#[derive(Debug, Clone)]
pub struct UiOutcome {
    pub settings: Settings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Focus {
    Categories,
    Documents,
    Viewer,
}

impl Focus {
    fn next(self) -> Self {
        match self {
            Focus::Categories => Focus::Documents,
            Focus::Documents => Focus::Viewer,
            Focus::Viewer => Focus::Categories,
        }
    }
}

pub struct Ui<'s> {
    shell: Shell,
    settings: Settings,
    store: &'s dyn KeyValueStore,
    library_root: PathBuf,
    engine: Engine,
    loader: Loader,
    picker: Picker,
    focus: Focus,
    search_open: bool,
    category_cursor: usize,
    document_cursor: usize,
    panel_cursor: usize,
    goto_input: Option<String>,
    source: Option<PathBuf>,
    pages: PageImages,
    notice: Option<String>,
}

impl<'s> Ui<'s> {
    pub fn new(
        shell: Shell,
        settings: Settings,
        store: &'s dyn KeyValueStore,
        library_root: PathBuf,
    ) -> anyhow::Result<Self> {
        let loader = Loader::spawn(Engine::new)?;
        let category_cursor = shell
            .catalog()
            .categories
            .iter()
            .position(|c| c.id == shell.selected_category())
            .unwrap_or(0);
        Ok(Self {
            shell,
            settings,
            store,
            library_root,
            engine: Engine::new(),
            loader,
            picker: Picker::halfblocks(),
            focus: Focus::Documents,
            search_open: false,
            category_cursor,
            document_cursor: 0,
            panel_cursor: 0,
            goto_input: None,
            source: None,
            pages: PageImages::default(),
            notice: None,
        })
    }

    pub fn run(mut self) -> anyhow::Result<UiOutcome> {
        let mut terminal = setup_terminal()?;
        self.picker = graphics::detect_picker();
        terminal.clear().ok();

        let size = terminal.size().context("read terminal size")?;
        self.on_resize(size.width);
        let ticket = self.shell.open_selected(self.store);
        self.start_load(ticket);

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            self.event_loop(&mut terminal)
        }));
        let restore_result = restore_terminal(&mut terminal);

        match (result, restore_result) {
            (Ok(Ok(())), Ok(())) => {}
            (Ok(Err(err)), _) => return Err(err),
            (Ok(Ok(())), Err(err)) => return Err(err),
            (Err(panic), Ok(())) => return Err(anyhow::anyhow!(panic_to_string(panic))),
            (Err(panic), Err(err)) => {
                return Err(anyhow::anyhow!(
                    "{}\n(additionally failed to restore terminal: {err})",
                    panic_to_string(panic)
                ));
            }
        }

        let mut settings = self.settings.clone();
        settings.catalog_layout = self.shell.browser().preferred_layout();
        settings.default_category = self.shell.selected_category();
        Ok(UiOutcome { settings })
    }

    fn event_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    ) -> anyhow::Result<()> {
        let tick_rate = Duration::from_millis(100);
        let mut needs_redraw = true;

        loop {
            if self.drain_loads() {
                needs_redraw = true;
            }

            if needs_redraw {
                terminal.draw(|frame| self.draw(frame))?;
                needs_redraw = false;
            }

            if !event::poll(tick_rate)? {
                continue;
            }

            match event::read()? {
                Event::Resize(columns, _) => {
                    self.on_resize(columns);
                    needs_redraw = true;
                }
                Event::Key(key) => {
                    if key.kind == KeyEventKind::Release {
                        continue;
                    }
                    needs_redraw = true;
                    if self.handle_key(key) {
                        return Ok(());
                    }
                }
                Event::Mouse(mouse) => match mouse.kind {
                    MouseEventKind::ScrollUp => {
                        self.zoom(WHEEL_ZOOM_STEP);
                        needs_redraw = true;
                    }
                    MouseEventKind::ScrollDown => {
                        self.zoom(-WHEEL_ZOOM_STEP);
                        needs_redraw = true;
                    }
                    _ => {}
                },
                _ => {}
            }
        }
    }

    fn on_resize(&mut self, columns: u16) {
        let (cell_width, _) = self.picker.font_size();
        self.shell
            .set_viewport_width(graphics::width_px(columns, cell_width));
        self.pages.clear();
    }

    /// Applies finished loads; stale ones are dropped by the controller.
    fn drain_loads(&mut self) -> bool {
        let mut changed = false;
        for event in self.loader.poll() {
            let viewer = self.shell.viewer_mut();
            changed |= match event.outcome {
                Ok(count) => viewer.page_load_succeeded(&event.ticket, count),
                Err(reason) => viewer.page_load_failed(&event.ticket, reason),
            };
        }
        changed
    }

    fn start_load(&mut self, ticket: Option<LoadTicket>) {
        let Some(ticket) = ticket else {
            if self.shell.viewer().document().is_none() {
                self.source = None;
                self.pages.clear();
            }
            return;
        };
        self.pages.clear();
        self.panel_cursor = 0;
        self.goto_input = None;

        let Some(doc) = self.shell.selected_document() else {
            return;
        };
        let locator = doc.source_locator.clone();
        let selected_id = doc.id.clone();
        self.source = resolve_locator(&self.library_root, &locator).ok();
        self.loader.request(ticket, &self.library_root, &locator);

        if let Some(idx) = self
            .shell
            .visible_documents()
            .iter()
            .position(|d| d.id == selected_id)
        {
            self.document_cursor = idx;
        }
    }

    fn zoom(&mut self, delta: f32) {
        if self.shell.viewer().document().is_none() {
            return;
        }
        self.shell.viewer_mut().set_scale(delta);
        let percent = (self.shell.viewer().state().scale * 100.0).round();
        self.notice = Some(format!("zoom {percent}%"));
    }

    /// Returns `true` when the user asked to quit.
    fn handle_key(&mut self, key: KeyEvent) -> bool {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return true;
        }
        self.notice = None;

        if self.goto_input.is_some() {
            self.handle_goto_key(key);
            return false;
        }
        if self.search_open {
            self.handle_search_key(key);
            return false;
        }

        match key.code {
            KeyCode::Char('q') => return true,
            KeyCode::Left => {
                self.shell.viewer_mut().step_page(StepDirection::Backward);
                return false;
            }
            KeyCode::Right => {
                self.shell.viewer_mut().step_page(StepDirection::Forward);
                return false;
            }
            KeyCode::Tab => {
                self.focus = self.focus.next();
                return false;
            }
            KeyCode::Char('s') => {
                self.shell.toggle_sidebar();
                return false;
            }
            KeyCode::Char('[') => {
                let ticket = self.shell.previous_document(self.store);
                self.start_load(ticket);
                return false;
            }
            KeyCode::Char(']') => {
                let ticket = self.shell.next_document(self.store);
                self.start_load(ticket);
                return false;
            }
            _ => {}
        }

        match self.focus {
            Focus::Categories => self.handle_categories_key(key),
            Focus::Documents => self.handle_documents_key(key),
            Focus::Viewer => self.handle_viewer_key(key),
        }
        false
    }

    fn handle_categories_key(&mut self, key: KeyEvent) {
        let len = self.shell.catalog().categories.len();
        match key.code {
            KeyCode::Up => {
                self.category_cursor = self.category_cursor.saturating_sub(1);
            }
            KeyCode::Down => {
                if len > 0 {
                    self.category_cursor = (self.category_cursor + 1).min(len - 1);
                }
            }
            KeyCode::Enter => {
                let Some(category) = self
                    .shell
                    .catalog()
                    .categories
                    .get(self.category_cursor)
                    .map(|c| c.id)
                else {
                    return;
                };
                let ticket = self.shell.select_category(category, self.store);
                self.document_cursor = 0;
                self.start_load(ticket);
                self.focus = Focus::Documents;
            }
            _ => {}
        }
    }

    fn handle_documents_key(&mut self, key: KeyEvent) {
        let len = self.shell.visible_documents().len();
        match key.code {
            KeyCode::Up => {
                self.document_cursor = self.document_cursor.saturating_sub(1);
            }
            KeyCode::Down => {
                if len > 0 {
                    self.document_cursor = (self.document_cursor + 1).min(len - 1);
                }
            }
            KeyCode::Enter => {
                let Some(id) = self
                    .shell
                    .visible_documents()
                    .get(self.document_cursor)
                    .map(|d| d.id.clone())
                else {
                    return;
                };
                let ticket = self.shell.select_document(&id, self.store);
                self.start_load(ticket);
                if !self.shell.sidebar_docked() {
                    self.shell.set_sidebar_open(false);
                }
                self.focus = Focus::Viewer;
            }
            KeyCode::Char('/') => {
                self.search_open = true;
            }
            KeyCode::Char('v') => {
                let browser = self.shell.browser_mut();
                browser.toggle_layout();
                if !browser.list_available() {
                    self.notice = Some("list view needs a wider window".to_string());
                }
            }
            KeyCode::Esc => {
                self.shell.browser_mut().clear_search();
                self.document_cursor = 0;
            }
            _ => {}
        }
    }

    fn handle_search_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc | KeyCode::Enter => {
                self.search_open = false;
            }
            KeyCode::Backspace => {
                self.shell.browser_mut().pop_search_char();
            }
            KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.shell.browser_mut().clear_search();
            }
            KeyCode::Char(ch) => {
                self.shell.browser_mut().push_search_char(ch);
            }
            _ => {}
        }
        self.document_cursor = 0;
    }

    fn handle_goto_key(&mut self, key: KeyEvent) {
        let Some(input) = self.goto_input.as_mut() else {
            return;
        };
        match key.code {
            KeyCode::Esc => {
                self.goto_input = None;
            }
            KeyCode::Backspace => {
                input.pop();
            }
            KeyCode::Char(ch) if ch.is_ascii_digit() => {
                if input.len() < 6 {
                    input.push(ch);
                }
            }
            KeyCode::Enter => {
                let page = input.parse::<u32>().ok();
                self.goto_input = None;
                if let Some(page) = page {
                    self.shell.viewer_mut().go_to_page(page);
                }
            }
            _ => {}
        }
    }

    fn handle_viewer_key(&mut self, key: KeyEvent) {
        let panel = self.shell.viewer().state().active_panel;
        if panel != Panel::None {
            let len = self.panel_len(panel);
            match key.code {
                KeyCode::Up => {
                    self.panel_cursor = self.panel_cursor.saturating_sub(1);
                    return;
                }
                KeyCode::Down => {
                    if len > 0 {
                        self.panel_cursor = (self.panel_cursor + 1).min(len - 1);
                    }
                    return;
                }
                KeyCode::Enter => {
                    self.clamp_panel_cursor();
                    let viewer = self.shell.viewer_mut();
                    match panel {
                        Panel::Thumbnails => viewer.select_thumbnail(self.panel_cursor),
                        Panel::Bookmarks => viewer.select_bookmark(self.panel_cursor),
                        Panel::None => {}
                    }
                    return;
                }
                KeyCode::Esc => {
                    self.shell.viewer_mut().set_active_panel(Panel::None);
                    return;
                }
                _ => {}
            }
        }

        match key.code {
            KeyCode::Char('+') | KeyCode::Char('=') => self.zoom(self.settings.zoom_step),
            KeyCode::Char('-') => self.zoom(-self.settings.zoom_step),
            KeyCode::Char('0') => {
                let current = self.shell.viewer().state().scale;
                self.zoom(self.settings.default_scale - current);
            }
            KeyCode::Char('d') => {
                self.shell.viewer_mut().toggle_view_mode();
                let mode = self.shell.viewer().state().view_mode;
                self.notice = Some(format!("view: {mode}"));
            }
            KeyCode::Char('b') => {
                if self.shell.viewer().can_navigate() {
                    let page = self.shell.viewer().current_page();
                    let now = unix_now_millis();
                    let added = self.shell.viewer_mut().toggle_bookmark(self.store, now);
                    self.clamp_panel_cursor();
                    self.notice = Some(if added {
                        format!("bookmarked page {page}")
                    } else {
                        format!("removed bookmark on page {page}")
                    });
                }
            }
            KeyCode::Char('B') => {
                self.shell.viewer_mut().toggle_panel(Panel::Bookmarks);
                self.panel_cursor = 0;
            }
            KeyCode::Char('t') => {
                self.shell.viewer_mut().toggle_panel(Panel::Thumbnails);
                self.panel_cursor = 0;
            }
            KeyCode::Char('g') => {
                if self.shell.viewer().can_navigate() {
                    self.goto_input = Some(String::new());
                }
            }
            KeyCode::Char('p') | KeyCode::PageUp => {
                self.shell
                    .viewer_mut()
                    .step_single_page(StepDirection::Backward);
            }
            KeyCode::Char('n') | KeyCode::PageDown => {
                self.shell
                    .viewer_mut()
                    .step_single_page(StepDirection::Forward);
            }
            KeyCode::Home => self.shell.viewer_mut().go_to_page(1),
            KeyCode::End => self.shell.viewer_mut().go_to_page(u32::MAX),
            KeyCode::Char('r') => {
                if self.shell.viewer().error().is_some() {
                    let ticket = self.shell.open_selected(self.store);
                    self.start_load(ticket);
                }
            }
            _ => {}
        }
    }

    fn panel_len(&self, panel: Panel) -> usize {
        match panel {
            Panel::Thumbnails => self.shell.viewer().thumbnails().len(),
            Panel::Bookmarks => self.shell.viewer().bookmarks().len(),
            Panel::None => 0,
        }
    }

    /// Keeps the panel cursor on an existing row after the list shrinks.
    fn clamp_panel_cursor(&mut self) {
        let len = self.panel_len(self.shell.viewer().state().active_panel);
        self.panel_cursor = self.panel_cursor.min(len.saturating_sub(1));
    }
}

fn setup_terminal() -> anyhow::Result<Terminal<CrosstermBackend<Stdout>>> {
    terminal::enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    crossterm::execute!(stdout, EnterAlternateScreen, EnableMouseCapture)
        .context("enter alt screen")?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend).context("create terminal")
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> anyhow::Result<()> {
    terminal::disable_raw_mode().context("disable raw mode")?;
    crossterm::execute!(
        terminal.backend_mut(),
        DisableMouseCapture,
        LeaveAlternateScreen
    )
    .context("leave alt screen")?;
    Ok(())
}

fn panic_to_string(panic: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("panic: {s}")
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("panic: {s}")
    } else {
        "panic: (unknown payload)".to_string()
    }
}

fn unix_now_millis() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
