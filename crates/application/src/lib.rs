//! Application orchestration layer for Newsstand.

pub mod bookmarks;
pub mod browser;
pub mod shell;
pub mod viewer;

pub use bookmarks::{load_bookmarks, save_bookmarks, storage_key};
pub use browser::{CatalogBrowser, filter_documents};
pub use shell::Shell;
pub use viewer::{LoadStatus, ViewerController, ViewerError, ViewerState};
