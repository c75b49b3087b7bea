//! Core domain types for Newsstand.

use std::collections::HashSet;

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

mod builtin;

pub const MIN_SCALE: f32 = 0.3;
pub const MAX_SCALE: f32 = 2.0;
pub const DEFAULT_SCALE: f32 = 1.0;
pub const THUMBNAIL_SCALE: f32 = 0.3;
pub const THUMBNAIL_STRIDE: u32 = 4;

/// Keyboard zoom increment.
pub const KEY_ZOOM_STEP: f32 = 0.2;
/// Mouse wheel zoom increment.
pub const WHEEL_ZOOM_STEP: f32 = 0.1;

/// Widths below this are `Mobile`.
pub const NARROW_BREAKPOINT_PX: u32 = 768;
/// Widths at or above this are `Desktop`.
pub const WIDE_BREAKPOINT_PX: u32 = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Science,
    Kannada,
    Newsletter,
    General,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Science => "science",
            Category::Kannada => "kannada",
            Category::Newsletter => "newsletter",
            Category::General => "general",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Category {
    type Err = &'static str;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "science" => Ok(Category::Science),
            "kannada" => Ok(Category::Kannada),
            "newsletter" => Ok(Category::Newsletter),
            "general" => Ok(Category::General),
            _ => Err("unknown category"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryRecord {
    pub id: Category,
    pub name: String,
    pub description: String,
    pub icon_ref: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRecord {
    pub id: String,
    pub title: String,
    /// Display label only, never parsed.
    pub date: String,
    pub category: Category,
    pub cover_image_ref: String,
    pub source_locator: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_pages: Option<u32>,
}

impl DocumentRecord {
    /// Case-insensitive substring match on title or date. An empty query matches.
    pub fn matches(&self, query: &str) -> bool {
        if query.is_empty() {
            return true;
        }
        let query = query.to_lowercase();
        self.title.to_lowercase().contains(&query) || self.date.to_lowercase().contains(&query)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bookmark {
    pub page: u32,
    pub label: String,
    /// Unix milliseconds.
    pub created_at: i64,
}

impl Bookmark {
    pub fn for_page(page: u32, created_at: i64) -> Self {
        Self {
            page,
            label: format!("Page {page}"),
            created_at,
        }
    }
}

/// Static catalog handed to the shell at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    pub categories: Vec<CategoryRecord>,
    pub documents: Vec<DocumentRecord>,
}

impl Catalog {
    pub fn new(categories: Vec<CategoryRecord>, documents: Vec<DocumentRecord>) -> anyhow::Result<Self> {
        let catalog = Self {
            categories,
            documents,
        };
        catalog.validate()?;
        Ok(catalog)
    }

    pub fn builtin() -> Self {
        Self {
            categories: builtin::categories(),
            documents: builtin::documents(),
        }
    }

    pub fn from_json(raw: &str) -> anyhow::Result<Self> {
        let catalog: Catalog = serde_json::from_str(raw).context("parse catalog json")?;
        catalog.validate()?;
        Ok(catalog)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let mut seen = HashSet::new();
        for doc in &self.documents {
            if doc.id.trim().is_empty() {
                anyhow::bail!("catalog document with empty id: {}", doc.title);
            }
            if !seen.insert(doc.id.as_str()) {
                anyhow::bail!("duplicate catalog document id: {}", doc.id);
            }
        }
        Ok(())
    }

    pub fn category(&self, id: Category) -> Option<&CategoryRecord> {
        self.categories.iter().find(|c| c.id == id)
    }

    pub fn document(&self, id: &str) -> Option<&DocumentRecord> {
        self.documents.iter().find(|d| d.id == id)
    }

    /// Documents of one category, catalog order preserved.
    pub fn in_category(&self, category: Category) -> Vec<&DocumentRecord> {
        self.documents
            .iter()
            .filter(|d| d.category == category)
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    Single,
    Double,
}

impl ViewMode {
    pub fn toggled(self) -> Self {
        match self {
            ViewMode::Single => ViewMode::Double,
            ViewMode::Double => ViewMode::Single,
        }
    }

    pub fn page_stride(self) -> u32 {
        match self {
            ViewMode::Single => 1,
            ViewMode::Double => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ViewMode::Single => "single",
            ViewMode::Double => "double",
        }
    }
}

impl std::fmt::Display for ViewMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Panel {
    #[default]
    None,
    Thumbnails,
    Bookmarks,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CatalogLayout {
    Grid,
    List,
}

impl CatalogLayout {
    pub fn as_str(&self) -> &'static str {
        match self {
            CatalogLayout::Grid => "grid",
            CatalogLayout::List => "list",
        }
    }
}

impl std::fmt::Display for CatalogLayout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CatalogLayout {
    type Err = &'static str;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "grid" => Ok(CatalogLayout::Grid),
            "list" => Ok(CatalogLayout::List),
            _ => Err("unknown catalog layout"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewportClass {
    Mobile,
    Tablet,
    Desktop,
}

impl ViewportClass {
    pub fn classify(width_px: u32) -> Self {
        if width_px < NARROW_BREAKPOINT_PX {
            ViewportClass::Mobile
        } else if width_px < WIDE_BREAKPOINT_PX {
            ViewportClass::Tablet
        } else {
            ViewportClass::Desktop
        }
    }

    pub fn is_narrow(self) -> bool {
        self == ViewportClass::Mobile
    }

    pub fn is_wide(self) -> bool {
        self == ViewportClass::Desktop
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ViewportClass::Mobile => "mobile",
            ViewportClass::Tablet => "tablet",
            ViewportClass::Desktop => "desktop",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepDirection {
    Forward,
    Backward,
}

/// Identifies one load attempt. Reopening the same document yields a new generation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LoadTicket {
    pub document_id: String,
    pub generation: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub library_root: String,
    pub default_scale: f32,
    pub zoom_step: f32,
    pub default_category: Category,
    pub catalog_layout: CatalogLayout,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            library_root: String::new(),
            default_scale: DEFAULT_SCALE,
            zoom_step: KEY_ZOOM_STEP,
            default_category: Category::Science,
            catalog_layout: CatalogLayout::Grid,
        }
    }
}

impl Settings {
    pub fn normalize(&mut self) {
        self.library_root = self.library_root.trim().to_string();
        self.default_scale = if self.default_scale.is_finite() {
            clamp_scale(self.default_scale)
        } else {
            DEFAULT_SCALE
        };
        self.zoom_step = if self.zoom_step.is_finite() {
            self.zoom_step.clamp(0.05, 0.5)
        } else {
            KEY_ZOOM_STEP
        };
    }
}

pub fn clamp_scale(scale: f32) -> f32 {
    scale.clamp(MIN_SCALE, MAX_SCALE)
}

/// Pages `1, 1+k, 1+2k, ...` up to `page_count` for the fixed stride `k`.
pub fn thumbnail_pages(page_count: u32) -> Vec<u32> {
    (1..=page_count).step_by(THUMBNAIL_STRIDE as usize).collect()
}

/// Synchronous string store addressed by key.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> anyhow::Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: &str, title: &str, date: &str) -> DocumentRecord {
        DocumentRecord {
            id: id.to_string(),
            title: title.to_string(),
            date: date.to_string(),
            category: Category::Science,
            cover_image_ref: String::new(),
            source_locator: format!("/{id}.pdf"),
            total_pages: None,
        }
    }

    #[test]
    fn category_parses_strings() {
        assert_eq!("science".parse::<Category>().unwrap(), Category::Science);
        assert_eq!(" Kannada ".parse::<Category>().unwrap(), Category::Kannada);
        assert!("sports".parse::<Category>().is_err());
    }

    #[test]
    fn matches_title_or_date_ignoring_case() {
        let d = doc("a", "June Newsletter", "June 2023");
        assert!(d.matches(""));
        assert!(d.matches("newsl"));
        assert!(d.matches("2023"));
        assert!(d.matches("JUNE"));
        assert!(!d.matches("july"));
    }

    #[test]
    fn classify_uses_fixed_breakpoints() {
        assert_eq!(ViewportClass::classify(0), ViewportClass::Mobile);
        assert_eq!(ViewportClass::classify(767), ViewportClass::Mobile);
        assert_eq!(ViewportClass::classify(768), ViewportClass::Tablet);
        assert_eq!(ViewportClass::classify(1023), ViewportClass::Tablet);
        assert_eq!(ViewportClass::classify(1024), ViewportClass::Desktop);
    }

    #[test]
    fn thumbnails_step_by_four() {
        assert!(thumbnail_pages(0).is_empty());
        assert_eq!(thumbnail_pages(1), vec![1]);
        assert_eq!(thumbnail_pages(9), vec![1, 5, 9]);
        assert_eq!(thumbnail_pages(12), vec![1, 5, 9]);
    }

    #[test]
    fn bookmark_label_names_page() {
        let b = Bookmark::for_page(4, 10);
        assert_eq!(b.label, "Page 4");
        let json = serde_json::to_string(&b).unwrap();
        assert!(json.contains("\"createdAt\":10"));
    }

    #[test]
    fn catalog_rejects_duplicate_ids() {
        let err = Catalog::new(Vec::new(), vec![doc("a", "x", "y"), doc("a", "z", "w")]);
        assert!(err.is_err());
    }

    #[test]
    fn builtin_catalog_is_valid() {
        let catalog = Catalog::builtin();
        catalog.validate().unwrap();
        assert_eq!(catalog.in_category(Category::Science).len(), 3);
        assert!(catalog.category(Category::General).is_none());
    }

    #[test]
    fn catalog_parses_json() {
        let raw = r#"{
            "categories": [{"id": "general", "name": "General", "description": "Other", "iconRef": "g.png"}],
            "documents": [{"id": "g1", "title": "Issue 1", "date": "Jan 2024", "category": "general",
                           "coverImageRef": "g1.png", "sourceLocator": "/g1.pdf", "totalPages": 12}]
        }"#;
        let catalog = Catalog::from_json(raw).unwrap();
        assert_eq!(catalog.documents[0].total_pages, Some(12));
        assert_eq!(catalog.in_category(Category::General).len(), 1);
    }

    #[test]
    fn settings_normalize_clamps_scale() {
        let mut settings = Settings {
            default_scale: 5.0,
            zoom_step: f32::NAN,
            library_root: "  /srv/mags ".to_string(),
            ..Settings::default()
        };
        settings.normalize();
        assert_eq!(settings.default_scale, MAX_SCALE);
        assert_eq!(settings.zoom_step, KEY_ZOOM_STEP);
        assert_eq!(settings.library_root, "/srv/mags");
    }
}
