//! Sqlite-backed persistence.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::Path;

use anyhow::Context as _;
use newsstand_core::{CatalogLayout, Category, KeyValueStore, Settings};
use rusqlite::{Connection, OptionalExtension as _};

#[derive(Debug)]
pub struct Storage {
    conn: Connection,
}

impl Storage {
    pub fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let conn = Connection::open(path.as_ref())
            .with_context(|| format!("open sqlite db at {}", path.as_ref().display()))?;
        let storage = Self { conn };
        storage.migrate()?;
        tracing::debug!(path = %path.as_ref().display(), "opened storage");
        Ok(storage)
    }

    pub fn open_in_memory() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory sqlite db")?;
        let storage = Self { conn };
        storage.migrate()?;
        Ok(storage)
    }

    fn migrate(&self) -> anyhow::Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS settings (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                library_root TEXT NOT NULL,
                default_scale REAL NOT NULL,
                zoom_step REAL NOT NULL,
                default_category TEXT NOT NULL,
                catalog_layout TEXT NOT NULL
            );
            INSERT OR IGNORE INTO settings
                (id, library_root, default_scale, zoom_step, default_category, catalog_layout)
            VALUES (1, '', 1.0, 0.2, 'science', 'grid');

            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at INTEGER NOT NULL DEFAULT (unixepoch())
            );
            "#,
        )?;
        Ok(())
    }

    pub fn load_settings(&self) -> anyhow::Result<Settings> {
        let row = self
            .conn
            .query_row(
                "SELECT library_root, default_scale, zoom_step, default_category, catalog_layout FROM settings WHERE id = 1",
                [],
                |row| {
                    let library_root: String = row.get(0)?;
                    let default_scale: f64 = row.get(1)?;
                    let zoom_step: f64 = row.get(2)?;
                    let default_category: String = row.get(3)?;
                    let catalog_layout: String = row.get(4)?;
                    Ok((library_root, default_scale, zoom_step, default_category, catalog_layout))
                },
            )
            .optional()?;

        let defaults = Settings::default();
        let Some((library_root, default_scale, zoom_step, default_category, catalog_layout)) = row
        else {
            return Ok(defaults);
        };

        let mut settings = Settings {
            library_root,
            default_scale: default_scale as f32,
            zoom_step: zoom_step as f32,
            default_category: default_category
                .parse::<Category>()
                .unwrap_or(defaults.default_category),
            catalog_layout: catalog_layout
                .parse::<CatalogLayout>()
                .unwrap_or(defaults.catalog_layout),
        };
        settings.normalize();
        Ok(settings)
    }

    pub fn save_settings(&self, settings: &Settings) -> anyhow::Result<()> {
        let mut settings = settings.clone();
        settings.normalize();

        self.conn.execute(
            "UPDATE settings SET library_root = ?, default_scale = ?, zoom_step = ?, default_category = ?, catalog_layout = ? WHERE id = 1",
            (
                &settings.library_root,
                f64::from(settings.default_scale),
                f64::from(settings.zoom_step),
                settings.default_category.as_str(),
                settings.catalog_layout.as_str(),
            ),
        )?;
        Ok(())
    }
}

impl KeyValueStore for Storage {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        self.conn
            .query_row("SELECT value FROM kv WHERE key = ?", [key], |row| row.get(0))
            .optional()
            .with_context(|| format!("read key {key}"))
    }

    fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        self.conn
            .execute(
                r#"
                INSERT INTO kv (key, value, updated_at) VALUES (?, ?, unixepoch())
                ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
                "#,
                (key, value),
            )
            .with_context(|| format!("write key {key}"))?;
        Ok(())
    }
}

/// Process-local store, used when no database is available and in tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: RefCell<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.values.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.borrow().is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.values.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        self.values
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}
