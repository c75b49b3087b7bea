//! Searchable catalog listing with grid/list presentation.

use newsstand_core::{CatalogLayout, DocumentRecord, ViewportClass};

/// Keeps catalog order. An empty query matches everything.
pub fn filter_documents<'a, I>(documents: I, search_text: &str) -> Vec<&'a DocumentRecord>
where
    I: IntoIterator<Item = &'a DocumentRecord>,
{
    documents
        .into_iter()
        .filter(|doc| doc.matches(search_text))
        .collect()
}

#[derive(Debug, Clone)]
pub struct CatalogBrowser {
    search_text: String,
    layout: CatalogLayout,
    viewport: ViewportClass,
}

impl CatalogBrowser {
    pub fn new(layout: CatalogLayout) -> Self {
        Self {
            search_text: String::new(),
            layout,
            viewport: ViewportClass::Desktop,
        }
    }

    pub fn search_text(&self) -> &str {
        &self.search_text
    }

    pub fn set_search_text(&mut self, text: impl Into<String>) {
        self.search_text = text.into();
    }

    pub fn push_search_char(&mut self, ch: char) {
        self.search_text.push(ch);
    }

    pub fn pop_search_char(&mut self) {
        self.search_text.pop();
    }

    pub fn clear_search(&mut self) {
        self.search_text.clear();
    }

    pub fn filter<'a, I>(&self, documents: I) -> Vec<&'a DocumentRecord>
    where
        I: IntoIterator<Item = &'a DocumentRecord>,
    {
        filter_documents(documents, &self.search_text)
    }

    /// The user's last manual choice.
    pub fn preferred_layout(&self) -> CatalogLayout {
        self.layout
    }

    /// What is actually shown: list view is unavailable on narrow viewports.
    pub fn layout(&self) -> CatalogLayout {
        if self.viewport.is_narrow() {
            CatalogLayout::Grid
        } else {
            self.layout
        }
    }

    pub fn list_available(&self) -> bool {
        !self.viewport.is_narrow()
    }

    pub fn toggle_layout(&mut self) {
        if !self.list_available() {
            return;
        }
        self.layout = match self.layout {
            CatalogLayout::Grid => CatalogLayout::List,
            CatalogLayout::List => CatalogLayout::Grid,
        };
    }

    pub fn apply_viewport(&mut self, viewport: ViewportClass) {
        self.viewport = viewport;
    }
}
