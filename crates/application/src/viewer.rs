//! Page, zoom, layout and bookmark state for the open document.

use newsstand_core::{
    Bookmark, DocumentRecord, KeyValueStore, LoadTicket, Panel, StepDirection, ViewMode,
    ViewportClass, clamp_scale, thumbnail_pages,
};

use crate::bookmarks::{load_bookmarks, save_bookmarks};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ViewerError {
    #[error("could not load \"{document_id}\": {reason}")]
    DocumentLoad { document_id: String, reason: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewerState {
    pub current_page: u32,
    pub scale: f32,
    /// `None` until the renderer reports a count.
    pub page_count: Option<u32>,
    pub view_mode: ViewMode,
    pub active_panel: Panel,
}

impl ViewerState {
    fn with_scale(scale: f32) -> Self {
        Self {
            current_page: 1,
            scale,
            page_count: None,
            view_mode: ViewMode::Single,
            active_panel: Panel::None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStatus {
    Idle,
    Loading,
    Ready,
    Failed,
}

#[derive(Debug, Clone)]
pub struct ViewerController {
    document: Option<DocumentRecord>,
    state: ViewerState,
    default_scale: f32,
    bookmarks: Vec<Bookmark>,
    thumbnails: Vec<u32>,
    error: Option<ViewerError>,
    pending: Option<LoadTicket>,
    generation: u64,
    viewport: ViewportClass,
}

impl ViewerController {
    pub fn new(default_scale: f32) -> Self {
        let default_scale = clamp_scale(default_scale);
        Self {
            document: None,
            state: ViewerState::with_scale(default_scale),
            default_scale,
            bookmarks: Vec::new(),
            thumbnails: Vec::new(),
            error: None,
            pending: None,
            generation: 0,
            viewport: ViewportClass::Desktop,
        }
    }

    /// Resets view state, loads persisted bookmarks and returns the ticket the
    /// renderer's load result must carry.
    pub fn open_document(&mut self, doc: &DocumentRecord, store: &dyn KeyValueStore) -> LoadTicket {
        self.generation += 1;
        let ticket = LoadTicket {
            document_id: doc.id.clone(),
            generation: self.generation,
        };
        self.document = Some(doc.clone());
        self.state = ViewerState::with_scale(self.default_scale);
        self.bookmarks = load_bookmarks(store, &doc.id);
        self.thumbnails.clear();
        self.error = None;
        self.pending = Some(ticket.clone());
        tracing::info!(
            document = %doc.id,
            generation = ticket.generation,
            bookmarks = self.bookmarks.len(),
            "opened document"
        );
        ticket
    }

    /// Drops the active document; any in-flight load becomes stale.
    pub fn close(&mut self) {
        self.document = None;
        self.state = ViewerState::with_scale(self.default_scale);
        self.bookmarks.clear();
        self.thumbnails.clear();
        self.error = None;
        self.pending = None;
    }

    fn accept(&mut self, ticket: &LoadTicket) -> bool {
        if self.pending.as_ref() == Some(ticket) {
            self.pending = None;
            true
        } else {
            tracing::warn!(
                document = %ticket.document_id,
                generation = ticket.generation,
                "discarding stale load result"
            );
            false
        }
    }

    /// Returns `false` when the result belongs to a load that is no longer current.
    pub fn page_load_succeeded(&mut self, ticket: &LoadTicket, count: u32) -> bool {
        if !self.accept(ticket) {
            return false;
        }
        if count == 0 {
            self.fail(ticket, "document has no pages".to_string());
            return true;
        }
        self.state.page_count = Some(count);
        self.state.current_page = self.state.current_page.clamp(1, count);
        self.thumbnails = thumbnail_pages(count);
        self.error = None;
        tracing::info!(document = %ticket.document_id, pages = count, "document loaded");
        true
    }

    pub fn page_load_failed(&mut self, ticket: &LoadTicket, reason: impl Into<String>) -> bool {
        if !self.accept(ticket) {
            return false;
        }
        self.fail(ticket, reason.into());
        true
    }

    fn fail(&mut self, ticket: &LoadTicket, reason: String) {
        tracing::warn!(document = %ticket.document_id, %reason, "document load failed");
        self.state.page_count = None;
        self.thumbnails.clear();
        self.error = Some(ViewerError::DocumentLoad {
            document_id: ticket.document_id.clone(),
            reason,
        });
    }

    /// No-op while the page count is unknown.
    pub fn go_to_page(&mut self, page: u32) {
        if let Some(count) = self.state.page_count {
            self.state.current_page = page.clamp(1, count);
        }
    }

    /// Moves by the view-mode stride (two pages in double mode).
    pub fn step_page(&mut self, direction: StepDirection) {
        self.step_by(direction, self.state.view_mode.page_stride());
    }

    /// Moves by exactly one page regardless of view mode.
    pub fn step_single_page(&mut self, direction: StepDirection) {
        self.step_by(direction, 1);
    }

    fn step_by(&mut self, direction: StepDirection, stride: u32) {
        let Some(count) = self.state.page_count else {
            return;
        };
        let page = self.state.current_page;
        self.state.current_page = match direction {
            StepDirection::Forward => page.saturating_add(stride).min(count),
            StepDirection::Backward => page.saturating_sub(stride).max(1),
        };
    }

    pub fn can_step(&self, direction: StepDirection) -> bool {
        let Some(count) = self.state.page_count else {
            return false;
        };
        match direction {
            StepDirection::Forward => self.state.current_page < count,
            StepDirection::Backward => self.state.current_page > 1,
        }
    }

    pub fn set_scale(&mut self, delta: f32) {
        if !delta.is_finite() {
            return;
        }
        self.state.scale = clamp_scale(self.state.scale + delta);
    }

    pub fn toggle_view_mode(&mut self) {
        self.state.view_mode = if self.viewport.is_narrow() {
            ViewMode::Single
        } else {
            self.state.view_mode.toggled()
        };
        tracing::debug!(mode = %self.state.view_mode, "view mode");
    }

    /// Narrow viewports force single mode. Widening does not restore double mode.
    pub fn apply_viewport(&mut self, viewport: ViewportClass) {
        self.viewport = viewport;
        if viewport.is_narrow() {
            self.state.view_mode = ViewMode::Single;
        }
    }

    /// Adds or removes the bookmark for the current page and persists the set.
    /// Returns whether the current page is bookmarked afterwards.
    pub fn toggle_bookmark(&mut self, store: &dyn KeyValueStore, now_ms: i64) -> bool {
        let Some(doc_id) = self.document.as_ref().map(|d| d.id.clone()) else {
            return false;
        };
        let page = self.state.current_page;
        let bookmarked = match self.bookmarks.iter().position(|b| b.page == page) {
            Some(idx) => {
                self.bookmarks.remove(idx);
                false
            }
            None => {
                let idx = self.bookmarks.partition_point(|b| b.page < page);
                self.bookmarks.insert(idx, Bookmark::for_page(page, now_ms));
                true
            }
        };
        save_bookmarks(store, &doc_id, &self.bookmarks);
        tracing::debug!(document = %doc_id, page, bookmarked, "toggled bookmark");
        bookmarked
    }

    pub fn select_bookmark(&mut self, index: usize) {
        if let Some(page) = self.bookmarks.get(index).map(|b| b.page) {
            self.go_to_page(page);
        }
    }

    pub fn select_thumbnail(&mut self, index: usize) {
        if let Some(page) = self.thumbnails.get(index).copied() {
            self.go_to_page(page);
        }
    }

    pub fn set_active_panel(&mut self, panel: Panel) {
        self.state.active_panel = panel;
    }

    /// Opens `panel`, or closes it when it is already the active one.
    pub fn toggle_panel(&mut self, panel: Panel) {
        self.state.active_panel = if self.state.active_panel == panel {
            Panel::None
        } else {
            panel
        };
    }

    pub fn document(&self) -> Option<&DocumentRecord> {
        self.document.as_ref()
    }

    pub fn state(&self) -> &ViewerState {
        &self.state
    }

    pub fn current_page(&self) -> u32 {
        self.state.current_page
    }

    pub fn page_count(&self) -> Option<u32> {
        self.state.page_count
    }

    /// Sorted ascending by page.
    pub fn bookmarks(&self) -> &[Bookmark] {
        &self.bookmarks
    }

    pub fn is_current_page_bookmarked(&self) -> bool {
        self.bookmarks
            .iter()
            .any(|b| b.page == self.state.current_page)
    }

    pub fn thumbnails(&self) -> &[u32] {
        &self.thumbnails
    }

    pub fn error(&self) -> Option<&ViewerError> {
        self.error.as_ref()
    }

    pub fn pending_ticket(&self) -> Option<&LoadTicket> {
        self.pending.as_ref()
    }

    pub fn status(&self) -> LoadStatus {
        if self.document.is_none() {
            LoadStatus::Idle
        } else if self.error.is_some() {
            LoadStatus::Failed
        } else if self.state.page_count.is_some() {
            LoadStatus::Ready
        } else {
            LoadStatus::Loading
        }
    }

    pub fn can_navigate(&self) -> bool {
        self.status() == LoadStatus::Ready
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use newsstand_core::{Category, DEFAULT_SCALE, MAX_SCALE, MIN_SCALE};
    use newsstand_storage::MemoryStore;

    fn doc(id: &str) -> DocumentRecord {
        DocumentRecord {
            id: id.to_string(),
            title: id.to_string(),
            date: "June 2023".to_string(),
            category: Category::Science,
            cover_image_ref: String::new(),
            source_locator: format!("/{id}.pdf"),
            total_pages: None,
        }
    }

    fn loaded(id: &str, pages: u32, store: &MemoryStore) -> ViewerController {
        let mut viewer = ViewerController::new(DEFAULT_SCALE);
        let ticket = viewer.open_document(&doc(id), store);
        assert!(viewer.page_load_succeeded(&ticket, pages));
        viewer
    }

    #[test]
    fn open_resets_to_defaults() {
        let store = MemoryStore::new();
        let mut viewer = loaded("A", 10, &store);
        viewer.go_to_page(6);
        viewer.set_scale(0.4);
        viewer.toggle_view_mode();
        viewer.set_active_panel(Panel::Bookmarks);

        viewer.open_document(&doc("B"), &store);
        let state = viewer.state();
        assert_eq!(state.current_page, 1);
        assert_eq!(state.scale, DEFAULT_SCALE);
        assert_eq!(state.page_count, None);
        assert_eq!(state.view_mode, ViewMode::Single);
        assert_eq!(state.active_panel, Panel::None);
        assert!(viewer.thumbnails().is_empty());
        assert_eq!(viewer.status(), LoadStatus::Loading);
    }

    #[test]
    fn go_to_page_waits_for_count() {
        let store = MemoryStore::new();
        let mut viewer = ViewerController::new(DEFAULT_SCALE);
        let ticket = viewer.open_document(&doc("A"), &store);
        viewer.go_to_page(5);
        assert_eq!(viewer.current_page(), 1);
        assert!(!viewer.can_navigate());

        viewer.page_load_succeeded(&ticket, 10);
        viewer.go_to_page(5);
        assert_eq!(viewer.current_page(), 5);
        viewer.go_to_page(5);
        assert_eq!(viewer.current_page(), 5);
    }

    #[test]
    fn go_to_page_clamps() {
        let store = MemoryStore::new();
        let mut viewer = loaded("A", 10, &store);
        viewer.go_to_page(0);
        assert_eq!(viewer.current_page(), 1);
        viewer.go_to_page(99);
        assert_eq!(viewer.current_page(), 10);
    }

    #[test]
    fn double_mode_steps_two_and_stops_at_last_page() {
        let store = MemoryStore::new();
        let mut viewer = loaded("A", 7, &store);
        viewer.toggle_view_mode();
        assert_eq!(viewer.state().view_mode, ViewMode::Double);
        viewer.step_page(StepDirection::Forward);
        assert_eq!(viewer.current_page(), 3);
        viewer.go_to_page(6);
        viewer.step_page(StepDirection::Forward);
        assert_eq!(viewer.current_page(), 7);
        viewer.step_page(StepDirection::Forward);
        assert_eq!(viewer.current_page(), 7);
        viewer.go_to_page(2);
        viewer.step_page(StepDirection::Backward);
        assert_eq!(viewer.current_page(), 1);
    }

    #[test]
    fn single_page_buttons_ignore_mode() {
        let store = MemoryStore::new();
        let mut viewer = loaded("A", 7, &store);
        viewer.toggle_view_mode();
        viewer.step_single_page(StepDirection::Forward);
        assert_eq!(viewer.current_page(), 2);
        assert!(viewer.can_step(StepDirection::Backward));
        viewer.step_single_page(StepDirection::Backward);
        assert!(!viewer.can_step(StepDirection::Backward));
    }

    #[test]
    fn page_stays_in_range_for_any_sequence() {
        let store = MemoryStore::new();
        let mut viewer = loaded("A", 5, &store);
        let ops: [fn(&mut ViewerController); 6] = [
            |v| v.step_page(StepDirection::Forward),
            |v| v.step_page(StepDirection::Backward),
            |v| v.go_to_page(u32::MAX),
            |v| v.go_to_page(0),
            |v| v.set_scale(0.7),
            |v| v.toggle_view_mode(),
        ];
        for round in 0..60usize {
            ops[(round * 7 + round / 3) % ops.len()](&mut viewer);
            let page = viewer.current_page();
            assert!((1..=5).contains(&page), "page {page} after round {round}");
        }
    }

    #[test]
    fn scale_is_clamped() {
        let store = MemoryStore::new();
        let mut viewer = loaded("A", 3, &store);
        viewer.set_scale(-0.9);
        assert_eq!(viewer.state().scale, MIN_SCALE);
        viewer.set_scale(-0.5);
        assert_eq!(viewer.state().scale, MIN_SCALE);
        viewer.set_scale(10.0);
        assert_eq!(viewer.state().scale, MAX_SCALE);
    }

    #[test]
    fn narrow_viewport_forces_single_and_stays_single() {
        let store = MemoryStore::new();
        let mut viewer = loaded("A", 8, &store);
        viewer.toggle_view_mode();
        viewer.apply_viewport(ViewportClass::Mobile);
        assert_eq!(viewer.state().view_mode, ViewMode::Single);
        viewer.toggle_view_mode();
        assert_eq!(viewer.state().view_mode, ViewMode::Single);

        viewer.apply_viewport(ViewportClass::Desktop);
        assert_eq!(viewer.state().view_mode, ViewMode::Single);
        viewer.toggle_view_mode();
        assert_eq!(viewer.state().view_mode, ViewMode::Double);
    }

    #[test]
    fn toggle_bookmark_twice_restores_set() {
        let store = MemoryStore::new();
        let mut viewer = loaded("A", 10, &store);
        viewer.go_to_page(2);
        viewer.toggle_bookmark(&store, 1);
        let before = viewer.bookmarks().to_vec();

        viewer.go_to_page(7);
        assert!(viewer.toggle_bookmark(&store, 2));
        assert!(viewer.is_current_page_bookmarked());
        assert!(!viewer.toggle_bookmark(&store, 3));
        assert_eq!(viewer.bookmarks(), before.as_slice());
        assert!(!viewer.is_current_page_bookmarked());
    }

    #[test]
    fn bookmarks_persist_and_reload_sorted() {
        let store = MemoryStore::new();
        let mut viewer = loaded("A", 10, &store);
        for page in [8, 3, 5] {
            viewer.go_to_page(page);
            viewer.toggle_bookmark(&store, i64::from(page));
        }
        let pages: Vec<u32> = viewer.bookmarks().iter().map(|b| b.page).collect();
        assert_eq!(pages, vec![3, 5, 8]);

        let reopened = loaded("A", 10, &store);
        assert_eq!(reopened.bookmarks(), viewer.bookmarks());
        let other = loaded("B", 10, &store);
        assert!(other.bookmarks().is_empty());
    }

    #[test]
    fn selecting_bookmark_and_thumbnail_jumps() {
        let store = MemoryStore::new();
        let mut viewer = loaded("A", 10, &store);
        assert_eq!(viewer.thumbnails(), &[1, 5, 9]);
        viewer.select_thumbnail(2);
        assert_eq!(viewer.current_page(), 9);
        viewer.toggle_bookmark(&store, 0);
        viewer.go_to_page(1);
        viewer.select_bookmark(0);
        assert_eq!(viewer.current_page(), 9);
        viewer.select_bookmark(5);
        assert_eq!(viewer.current_page(), 9);
    }

    #[test]
    fn panels_are_exclusive() {
        let store = MemoryStore::new();
        let mut viewer = loaded("A", 4, &store);
        viewer.set_active_panel(Panel::Thumbnails);
        viewer.set_active_panel(Panel::Bookmarks);
        assert_eq!(viewer.state().active_panel, Panel::Bookmarks);
        viewer.toggle_panel(Panel::Bookmarks);
        assert_eq!(viewer.state().active_panel, Panel::None);
        viewer.toggle_panel(Panel::Thumbnails);
        assert_eq!(viewer.state().active_panel, Panel::Thumbnails);
    }

    #[test]
    fn failure_disables_navigation_until_reopen() {
        let store = MemoryStore::new();
        let mut viewer = ViewerController::new(DEFAULT_SCALE);
        let ticket = viewer.open_document(&doc("A"), &store);
        assert!(viewer.page_load_failed(&ticket, "missing file"));
        assert_eq!(viewer.status(), LoadStatus::Failed);
        assert!(viewer.thumbnails().is_empty());
        viewer.go_to_page(3);
        assert_eq!(viewer.current_page(), 1);
        // a late success for the same attempt is ignored
        assert!(!viewer.page_load_succeeded(&ticket, 9));
        assert_eq!(viewer.page_count(), None);
        let message = viewer.error().map(|e| e.to_string()).unwrap_or_default();
        assert!(message.contains("missing file"));

        let retry = viewer.open_document(&doc("A"), &store);
        assert_ne!(retry, ticket);
        assert!(viewer.page_load_succeeded(&retry, 9));
        assert_eq!(viewer.status(), LoadStatus::Ready);
    }

    #[test]
    fn stale_results_are_discarded() {
        let store = MemoryStore::new();
        let mut viewer = ViewerController::new(DEFAULT_SCALE);
        let first = viewer.open_document(&doc("A"), &store);
        let second = viewer.open_document(&doc("B"), &store);
        assert!(!viewer.page_load_succeeded(&first, 40));
        assert!(!viewer.page_load_failed(&first, "late"));
        assert_eq!(viewer.status(), LoadStatus::Loading);
        assert!(viewer.page_load_succeeded(&second, 6));
        assert_eq!(viewer.page_count(), Some(6));
    }

    #[test]
    fn close_makes_pending_load_stale() {
        let store = MemoryStore::new();
        let mut viewer = ViewerController::new(DEFAULT_SCALE);
        let ticket = viewer.open_document(&doc("A"), &store);
        viewer.close();
        assert!(!viewer.page_load_succeeded(&ticket, 3));
        assert_eq!(viewer.status(), LoadStatus::Idle);
    }

    #[test]
    fn zero_pages_is_a_failure() {
        let store = MemoryStore::new();
        let mut viewer = ViewerController::new(DEFAULT_SCALE);
        let ticket = viewer.open_document(&doc("A"), &store);
        assert!(viewer.page_load_succeeded(&ticket, 0));
        assert_eq!(viewer.status(), LoadStatus::Failed);
    }
}
