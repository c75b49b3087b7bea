//! Top-level composition: category, selection, sidebar and viewport.

use newsstand_core::{
    Catalog, Category, CategoryRecord, DocumentRecord, KeyValueStore, LoadTicket, Settings,
    ViewportClass,
};

use crate::browser::CatalogBrowser;
use crate::viewer::ViewerController;

#[derive(Debug, Clone)]
pub struct Shell {
    catalog: Catalog,
    selected_category: Category,
    selected_document: Option<String>,
    sidebar_open: bool,
    viewport: ViewportClass,
    browser: CatalogBrowser,
    viewer: ViewerController,
}

impl Shell {
    pub fn new(catalog: Catalog, settings: &Settings) -> Self {
        let selected_category = settings.default_category;
        let selected_document = catalog
            .in_category(selected_category)
            .first()
            .map(|d| d.id.clone());
        Self {
            catalog,
            selected_category,
            selected_document,
            sidebar_open: true,
            viewport: ViewportClass::Desktop,
            browser: CatalogBrowser::new(settings.catalog_layout),
            viewer: ViewerController::new(settings.default_scale),
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn browser(&self) -> &CatalogBrowser {
        &self.browser
    }

    pub fn browser_mut(&mut self) -> &mut CatalogBrowser {
        &mut self.browser
    }

    pub fn viewer(&self) -> &ViewerController {
        &self.viewer
    }

    pub fn viewer_mut(&mut self) -> &mut ViewerController {
        &mut self.viewer
    }

    pub fn selected_category(&self) -> Category {
        self.selected_category
    }

    pub fn selected_category_record(&self) -> Option<&CategoryRecord> {
        self.catalog.category(self.selected_category)
    }

    pub fn selected_document(&self) -> Option<&DocumentRecord> {
        self.selected_document
            .as_deref()
            .and_then(|id| self.catalog.document(id))
    }

    /// Display name of the selected document's category.
    pub fn selected_document_category_name(&self) -> Option<&str> {
        let doc = self.selected_document()?;
        self.catalog.category(doc.category).map(|c| c.name.as_str())
    }

    pub fn category_documents(&self) -> Vec<&DocumentRecord> {
        self.catalog.in_category(self.selected_category)
    }

    /// Category documents narrowed by the browser's search text.
    pub fn visible_documents(&self) -> Vec<&DocumentRecord> {
        self.browser.filter(self.category_documents())
    }

    /// Opens the current selection in the viewer.
    pub fn open_selected(&mut self, store: &dyn KeyValueStore) -> Option<LoadTicket> {
        let doc = self.selected_document()?.clone();
        Some(self.viewer.open_document(&doc, store))
    }

    /// Switches category. The selection only moves when it falls outside the
    /// new category, in which case the category's first document is opened.
    pub fn select_category(
        &mut self,
        category: Category,
        store: &dyn KeyValueStore,
    ) -> Option<LoadTicket> {
        self.selected_category = category;
        let still_inside = self
            .selected_document()
            .is_some_and(|doc| doc.category == category);
        if still_inside {
            return None;
        }

        let first = self.category_documents().first().map(|d| d.id.clone());
        tracing::debug!(%category, document = ?first, "category changed selection");
        self.selected_document = first;
        if self.selected_document.is_none() {
            self.viewer.close();
        }
        self.open_selected(store)
    }

    /// Unknown ids are ignored.
    pub fn select_document(&mut self, id: &str, store: &dyn KeyValueStore) -> Option<LoadTicket> {
        self.catalog.document(id)?;
        self.selected_document = Some(id.to_string());
        self.open_selected(store)
    }

    fn selected_index(&self) -> Option<usize> {
        let id = self.selected_document.as_deref()?;
        self.category_documents().iter().position(|d| d.id == id)
    }

    pub fn has_previous_document(&self) -> bool {
        self.selected_index().is_some_and(|idx| idx > 0)
    }

    pub fn has_next_document(&self) -> bool {
        let len = self.category_documents().len();
        self.selected_index().is_some_and(|idx| idx + 1 < len)
    }

    /// Clamped at the first document, no wraparound.
    pub fn previous_document(&mut self, store: &dyn KeyValueStore) -> Option<LoadTicket> {
        let idx = self.selected_index()?.checked_sub(1)?;
        let id = self.category_documents().get(idx)?.id.clone();
        self.select_document(&id, store)
    }

    /// Clamped at the last document, no wraparound.
    pub fn next_document(&mut self, store: &dyn KeyValueStore) -> Option<LoadTicket> {
        let idx = self.selected_index()? + 1;
        let id = self.category_documents().get(idx)?.id.clone();
        self.select_document(&id, store)
    }

    pub fn viewport(&self) -> ViewportClass {
        self.viewport
    }

    /// Reclassifies the viewport and forwards it to the browser and viewer.
    pub fn set_viewport_width(&mut self, width_px: u32) -> ViewportClass {
        let viewport = ViewportClass::classify(width_px);
        if viewport != self.viewport {
            tracing::debug!(width_px, viewport = viewport.as_str(), "viewport changed");
        }
        self.viewport = viewport;
        self.browser.apply_viewport(viewport);
        self.viewer.apply_viewport(viewport);
        viewport
    }

    /// The sidebar is docked on wide viewports and an overlay otherwise.
    pub fn sidebar_visible(&self) -> bool {
        self.viewport.is_wide() || self.sidebar_open
    }

    pub fn sidebar_docked(&self) -> bool {
        self.viewport.is_wide()
    }

    pub fn toggle_sidebar(&mut self) {
        self.sidebar_open = !self.sidebar_open;
    }

    pub fn set_sidebar_open(&mut self, open: bool) {
        self.sidebar_open = open;
    }
}
