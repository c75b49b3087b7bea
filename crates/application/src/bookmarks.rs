//! Per-document bookmark persistence over a [`KeyValueStore`].

use newsstand_core::{Bookmark, KeyValueStore};

pub fn storage_key(document_id: &str) -> String {
    format!("bookmarks-{document_id}")
}

/// Absent, unreadable or malformed data yields an empty set.
pub fn load_bookmarks(store: &dyn KeyValueStore, document_id: &str) -> Vec<Bookmark> {
    let key = storage_key(document_id);
    let raw = match store.get(&key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return Vec::new(),
        Err(err) => {
            tracing::warn!(%key, "bookmark read failed: {err:#}");
            return Vec::new();
        }
    };

    match serde_json::from_str::<Vec<Bookmark>>(&raw) {
        Ok(bookmarks) => normalize_bookmarks(bookmarks),
        Err(err) => {
            tracing::warn!(%key, "ignoring malformed bookmark data: {err}");
            Vec::new()
        }
    }
}

/// Rewrites the full set. Failures are logged, never raised.
pub fn save_bookmarks(store: &dyn KeyValueStore, document_id: &str, bookmarks: &[Bookmark]) {
    let key = storage_key(document_id);
    let raw = match serde_json::to_string(bookmarks) {
        Ok(raw) => raw,
        Err(err) => {
            tracing::warn!(%key, "bookmark serialization failed: {err}");
            return;
        }
    };
    if let Err(err) = store.set(&key, &raw) {
        tracing::warn!(%key, "bookmark write failed: {err:#}");
    }
}

/// Sorted by page, one entry per page, no page zero.
pub(crate) fn normalize_bookmarks(mut bookmarks: Vec<Bookmark>) -> Vec<Bookmark> {
    bookmarks.retain(|b| b.page >= 1);
    // stable: the first stored entry for a page wins
    bookmarks.sort_by_key(|b| b.page);
    bookmarks.dedup_by_key(|b| b.page);
    bookmarks
}

#[cfg(test)]
mod tests {
    use super::*;
    use newsstand_storage::MemoryStore;

    struct BrokenStore;

    impl KeyValueStore for BrokenStore {
        fn get(&self, _key: &str) -> anyhow::Result<Option<String>> {
            anyhow::bail!("disk I/O error")
        }

        fn set(&self, _key: &str, _value: &str) -> anyhow::Result<()> {
            anyhow::bail!("database is locked")
        }
    }

    #[test]
    fn unreadable_store_is_empty_and_writes_do_not_raise() {
        let store = BrokenStore;
        assert!(load_bookmarks(&store, "A").is_empty());
        save_bookmarks(&store, "A", &[Bookmark::for_page(3, 1)]);
        assert!(load_bookmarks(&store, "A").is_empty());
    }

    #[test]
    fn missing_key_is_empty() {
        let store = MemoryStore::new();
        assert!(load_bookmarks(&store, "A").is_empty());
    }

    #[test]
    fn malformed_data_is_empty() -> anyhow::Result<()> {
        let store = MemoryStore::new();
        store.set("bookmarks-A", "{not json")?;
        assert!(load_bookmarks(&store, "A").is_empty());
        store.set("bookmarks-A", r#"[{"page":"four"}]"#)?;
        assert!(load_bookmarks(&store, "A").is_empty());
        Ok(())
    }

    #[test]
    fn roundtrip_uses_document_key() -> anyhow::Result<()> {
        let store = MemoryStore::new();
        save_bookmarks(&store, "A", &[Bookmark::for_page(4, 1_000)]);
        let raw = store.get("bookmarks-A")?.unwrap_or_default();
        assert!(raw.contains("\"page\":4"));
        assert_eq!(load_bookmarks(&store, "A"), vec![Bookmark::for_page(4, 1_000)]);
        assert!(load_bookmarks(&store, "B").is_empty());
        Ok(())
    }

    #[test]
    fn load_sorts_and_dedups_pages() -> anyhow::Result<()> {
        let store = MemoryStore::new();
        store.set(
            "bookmarks-A",
            r#"[{"page":9,"label":"Page 9","createdAt":3},
                {"page":2,"label":"Page 2","createdAt":1},
                {"page":9,"label":"again","createdAt":4},
                {"page":0,"label":"zero","createdAt":5}]"#,
        )?;
        let pages: Vec<u32> = load_bookmarks(&store, "A").iter().map(|b| b.page).collect();
        assert_eq!(pages, vec![2, 9]);
        Ok(())
    }
}
