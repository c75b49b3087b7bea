//! Test helpers and fixtures.

use std::collections::HashMap;
use std::path::Path;

use newsstand_core::{Catalog, Category, CategoryRecord, DocumentRecord, Settings};
use newsstand_engine::{DocumentRenderer, RgbaBitmap};

pub fn make_document(id: &str, title: &str, date: &str, category: Category) -> DocumentRecord {
    DocumentRecord {
        id: id.to_string(),
        title: title.to_string(),
        date: date.to_string(),
        category,
        cover_image_ref: format!("/covers/{id}.png"),
        source_locator: format!("/magazines/{id}.pdf"),
        total_pages: None,
    }
}

pub fn make_category(id: Category, name: &str) -> CategoryRecord {
    CategoryRecord {
        id,
        name: name.to_string(),
        description: format!("{name} issues"),
        icon_ref: format!("/icons/{id}.png"),
    }
}

/// Three science issues and two Kannada issues, interleaved.
pub fn make_catalog() -> Catalog {
    Catalog {
        categories: vec![
            make_category(Category::Science, "Science"),
            make_category(Category::Kannada, "Kannada"),
        ],
        documents: vec![
            make_document("s1", "Optics", "June 2023", Category::Science),
            make_document("k1", "Ugadi Special", "March 2023", Category::Kannada),
            make_document("s2", "Genetics", "May 2023", Category::Science),
            make_document("s3", "Orbits", "April 2023", Category::Science),
            make_document("k2", "Monsoon", "July 2023", Category::Kannada),
        ],
    }
}

pub fn make_settings(default_category: Category) -> Settings {
    Settings {
        default_category,
        ..Settings::default()
    }
}

/// Renderer with page counts keyed by file stem; unknown stems fail to load.
#[derive(Debug, Clone, Default)]
pub struct FakeRenderer {
    pages: HashMap<String, u32>,
}

impl FakeRenderer {
    pub fn with_pages(pages: &[(&str, u32)]) -> Self {
        Self {
            pages: pages
                .iter()
                .map(|(stem, count)| (stem.to_string(), *count))
                .collect(),
        }
    }

    fn count_for(&self, source: &Path) -> anyhow::Result<u32> {
        let stem = source
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default();
        self.pages
            .get(stem)
            .copied()
            .ok_or_else(|| anyhow::anyhow!("{} not found", source.display()))
    }
}

impl DocumentRenderer for FakeRenderer {
    fn page_count(&self, source: &Path) -> anyhow::Result<u32> {
        self.count_for(source)
    }

    fn render_page(&self, source: &Path, page: u32, scale: f32) -> anyhow::Result<RgbaBitmap> {
        let count = self.count_for(source)?;
        if page == 0 || page > count {
            anyhow::bail!("page {page} out of range");
        }
        let width = (100.0 * scale).round().max(1.0) as usize;
        let height = (140.0 * scale).round().max(1.0) as usize;
        Ok(RgbaBitmap {
            width,
            height,
            stride: width * 4,
            pixels: vec![255; width * height * 4],
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use newsstand_application::{LoadStatus, Shell, filter_documents, storage_key};
    use newsstand_core::{Bookmark, KeyValueStore, StepDirection, ViewMode};
    use newsstand_engine::{Loader, plan_page_requests};
    use newsstand_storage::{MemoryStore, Storage};

    #[test]
    fn kannada_category_lists_its_two_documents_in_order() {
        let store = MemoryStore::new();
        let mut shell = Shell::new(make_catalog(), &make_settings(Category::Science));
        shell.select_category(Category::Kannada, &store);
        let ids: Vec<&str> = shell.visible_documents().iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["k1", "k2"]);
    }

    #[test]
    fn search_filters_within_category() {
        let catalog = make_catalog();
        let science = catalog.in_category(Category::Science);
        let ids: Vec<&str> = filter_documents(science, "MAY")
            .iter()
            .map(|d| d.id.as_str())
            .collect();
        assert_eq!(ids, vec!["s2"]);
    }

    #[test]
    fn bookmark_survives_reopen_through_sqlite() -> anyhow::Result<()> {
        let store = Storage::open_in_memory()?;
        let mut catalog = make_catalog();
        catalog.documents[0].id = "A".to_string();
        let mut shell = Shell::new(catalog, &make_settings(Category::Science));

        let ticket = shell.open_selected(&store).unwrap();
        shell.viewer_mut().page_load_succeeded(&ticket, 10);
        shell.viewer_mut().go_to_page(4);
        shell.viewer_mut().toggle_bookmark(&store, 1_700_000_000_000);

        let raw = store.get(&storage_key("A"))?.unwrap_or_default();
        let stored: Vec<Bookmark> = serde_json::from_str(&raw)?;
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].page, 4);
        assert_eq!(stored[0].label, "Page 4");

        shell.next_document(&store);
        shell.previous_document(&store);
        let pages: Vec<u32> = shell.viewer().bookmarks().iter().map(|b| b.page).collect();
        assert_eq!(pages, vec![4]);
        Ok(())
    }

    #[test]
    fn goto_before_and_after_load() {
        let store = MemoryStore::new();
        let mut shell = Shell::new(make_catalog(), &make_settings(Category::Science));
        let ticket = shell.open_selected(&store).unwrap();
        shell.viewer_mut().go_to_page(5);
        assert_eq!(shell.viewer().current_page(), 1);
        shell.viewer_mut().page_load_succeeded(&ticket, 10);
        shell.viewer_mut().go_to_page(5);
        assert_eq!(shell.viewer().current_page(), 5);
    }

    #[test]
    fn double_mode_last_page_does_not_overflow() {
        let store = MemoryStore::new();
        let mut shell = Shell::new(make_catalog(), &make_settings(Category::Science));
        let ticket = shell.open_selected(&store).unwrap();
        let viewer = shell.viewer_mut();
        viewer.page_load_succeeded(&ticket, 7);
        viewer.toggle_view_mode();
        viewer.go_to_page(7);
        viewer.step_page(StepDirection::Forward);
        assert_eq!(viewer.current_page(), 7);

        let state = viewer.state();
        let pages: Vec<u32> = plan_page_requests(
            state.current_page,
            state.page_count,
            state.view_mode,
            state.scale,
        )
        .iter()
        .map(|r| r.page)
        .collect();
        assert_eq!(state.view_mode, ViewMode::Double);
        assert_eq!(pages, vec![7]);
    }

    #[test]
    fn rapid_switch_discards_stale_load() -> anyhow::Result<()> {
        let store = MemoryStore::new();
        let loader = Loader::spawn(|| FakeRenderer::with_pages(&[("s1", 30), ("s2", 8)]))?;
        let root = Path::new("/library");
        let mut shell = Shell::new(make_catalog(), &make_settings(Category::Science));

        let first = shell.open_selected(&store).unwrap();
        loader.request(first, root, "/magazines/s1.pdf");
        let second = shell.next_document(&store).unwrap();
        let locator = shell.selected_document().unwrap().source_locator.clone();
        loader.request(second, root, &locator);

        let mut accepted = 0;
        for _ in 0..2 {
            let event = loader.wait(Duration::from_secs(5)).expect("load event");
            let viewer = shell.viewer_mut();
            let applied = match event.outcome {
                Ok(count) => viewer.page_load_succeeded(&event.ticket, count),
                Err(reason) => viewer.page_load_failed(&event.ticket, reason),
            };
            if applied {
                accepted += 1;
            }
        }
        assert_eq!(accepted, 1);
        assert_eq!(shell.viewer().page_count(), Some(8));
        assert_eq!(shell.viewer().status(), LoadStatus::Ready);
        Ok(())
    }

    #[test]
    fn missing_source_is_terminal_until_reopened() -> anyhow::Result<()> {
        let store = MemoryStore::new();
        let loader = Loader::spawn(|| FakeRenderer::with_pages(&[]))?;
        let mut shell = Shell::new(make_catalog(), &make_settings(Category::Kannada));
        let ticket = shell.open_selected(&store).unwrap();
        loader.request(ticket, Path::new("/library"), "/magazines/k1.pdf");
        let event = loader.wait(Duration::from_secs(5)).expect("load event");
        let reason = event.outcome.clone().unwrap_err();
        assert!(shell.viewer_mut().page_load_failed(&event.ticket, reason));

        assert_eq!(shell.viewer().status(), LoadStatus::Failed);
        assert!(shell.viewer().thumbnails().is_empty());
        shell.viewer_mut().step_page(StepDirection::Forward);
        assert_eq!(shell.viewer().current_page(), 1);

        assert!(shell.select_document("k1", &store).is_some());
        assert_eq!(shell.viewer().status(), LoadStatus::Loading);
        Ok(())
    }

    #[test]
    fn fake_renderer_scales_output() -> anyhow::Result<()> {
        let renderer = FakeRenderer::with_pages(&[("s1", 2)]);
        let page = renderer.render_page(Path::new("/x/s1.pdf"), 2, 0.5)?;
        assert_eq!((page.width, page.height), (50, 70));
        assert!(renderer.render_page(Path::new("/x/s1.pdf"), 3, 1.0).is_err());
        Ok(())
    }
}
