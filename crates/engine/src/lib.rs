//! Page rendering adapter over pdf/pdfium.

use std::cell::{Ref, RefCell};
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use pdf::file::FileOptions;
use pdfium_render::prelude::{PdfBitmapFormat, PdfRenderConfig, Pdfium};

mod loader;
mod plan;

pub use loader::{LoadEvent, Loader};
pub use plan::{PageRequest, plan_page_requests};

/// Pixels per PDF point at scale 1.0 (96 dpi over 72 pt/in).
pub const PIXELS_PER_POINT: f32 = 96.0 / 72.0;

/// The external rendering capability: count pages, rasterize one page.
pub trait DocumentRenderer {
    fn page_count(&self, source: &Path) -> anyhow::Result<u32>;

    /// `page` is 1-based.
    fn render_page(&self, source: &Path, page: u32, scale: f32) -> anyhow::Result<RgbaBitmap>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgbaBitmap {
    pub width: usize,
    pub height: usize,
    pub stride: usize,
    pub pixels: Vec<u8>,
}

/// Maps a catalog source locator onto a file below `library_root`.
pub fn resolve_locator(library_root: &Path, locator: &str) -> anyhow::Result<PathBuf> {
    let locator = locator.trim();
    if locator.is_empty() {
        anyhow::bail!("document has no source locator");
    }
    let lower = locator.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        anyhow::bail!("remote documents are not supported: {locator}");
    }
    if let Some(path) = locator.strip_prefix("file://") {
        return Ok(PathBuf::from(path));
    }
    Ok(library_root.join(locator.trim_start_matches('/')))
}

#[derive(Debug, Default)]
pub struct Engine {
    pdfium: RefCell<PdfiumState>,
}

#[derive(Debug, Default)]
enum PdfiumState {
    #[default]
    Uninitialized,
    Available(Pdfium),
    Unavailable(String),
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check_pdfium(&self) -> anyhow::Result<()> {
        let _ = self.pdfium()?;
        Ok(())
    }

    pub fn page_size_points(&self, source: &Path, page: u32) -> anyhow::Result<(f32, f32)> {
        ensure_source_exists(source)?;
        let file = FileOptions::cached()
            .open(source)
            .with_context(|| format!("open pdf for page size: {}", source.display()))?;
        let page_index = page.checked_sub(1).context("page numbers start at 1")?;
        let page = file
            .get_page(page_index)
            .with_context(|| format!("get pdf page {page} for page size"))?;

        let rect = page
            .crop_box()
            .map_err(|err| anyhow::anyhow!(err))
            .context("get page crop box")?;
        let width = (rect.right - rect.left).abs().max(1.0);
        let height = (rect.top - rect.bottom).abs().max(1.0);
        Ok((width, height))
    }

    fn pdfium(&self) -> anyhow::Result<Ref<'_, Pdfium>> {
        let init_error = {
            let mut state = self.pdfium.borrow_mut();
            match &*state {
                PdfiumState::Available(_) => None,
                PdfiumState::Unavailable(err) => Some(err.clone()),
                PdfiumState::Uninitialized => match bind_pdfium() {
                    Ok(pdfium) => {
                        tracing::info!("pdfium bound");
                        *state = PdfiumState::Available(pdfium);
                        None
                    }
                    Err(err) => {
                        let msg = err.to_string();
                        tracing::warn!("pdfium unavailable: {msg}");
                        *state = PdfiumState::Unavailable(msg.clone());
                        Some(msg)
                    }
                },
            }
        };

        if let Some(err) = init_error {
            return Err(anyhow::anyhow!(err));
        }

        let state = self.pdfium.borrow();
        match &*state {
            PdfiumState::Available(_) => Ok(Ref::map(state, |state| match state {
                PdfiumState::Available(pdfium) => pdfium,
                _ => unreachable!("pdfium state checked above"),
            })),
            PdfiumState::Unavailable(err) => Err(anyhow::anyhow!(err.clone())),
            PdfiumState::Uninitialized => unreachable!("pdfium state initialized above"),
        }
    }
}

impl DocumentRenderer for Engine {
    fn page_count(&self, source: &Path) -> anyhow::Result<u32> {
        ensure_source_exists(source)?;
        let file = FileOptions::cached()
            .open(source)
            .with_context(|| format!("open pdf {}", source.display()))?;
        Ok(file.num_pages())
    }

    fn render_page(&self, source: &Path, page: u32, scale: f32) -> anyhow::Result<RgbaBitmap> {
        ensure_source_exists(source)?;
        let pdfium = self.pdfium()?;
        let document = pdfium
            .load_pdf_from_file(source, None)
            .map_err(|err| anyhow::anyhow!(err))
            .with_context(|| format!("load {}", source.display()))?;

        let page_index = page
            .checked_sub(1)
            .and_then(|idx| u16::try_from(idx).ok())
            .context("page number out of range")?;
        let pdf_page = document
            .pages()
            .get(page_index)
            .map_err(|err| anyhow::anyhow!(err))
            .with_context(|| format!("get page {page}"))?;

        let target_width = (pdf_page.width().value * scale * PIXELS_PER_POINT)
            .round()
            .max(1.0) as i32;
        let render_config = PdfRenderConfig::new()
            .set_target_width(target_width)
            .render_form_data(false)
            .render_annotations(true)
            .use_grayscale_rendering(false)
            .set_reverse_byte_order(false)
            .set_format(PdfBitmapFormat::BGRA);

        let bitmap = pdf_page
            .render_with_config(&render_config)
            .map_err(|err| anyhow::anyhow!(err))
            .with_context(|| format!("render page {page}"))?;

        let width = bitmap.width().max(0) as usize;
        let height = bitmap.height().max(0) as usize;
        tracing::debug!(page, scale, width, height, "rendered page");
        Ok(bgra_to_rgba(&bitmap.as_raw_bytes(), width, height))
    }
}

fn ensure_source_exists(source: &Path) -> anyhow::Result<()> {
    if !source.is_file() {
        anyhow::bail!(
            "{} not found; place the magazine PDFs under the library folder",
            source.display()
        );
    }
    Ok(())
}

fn bgra_to_rgba(src_pixels: &[u8], width: usize, height: usize) -> RgbaBitmap {
    let src_stride = if height == 0 {
        0
    } else {
        src_pixels.len() / height
    };

    let mut pixels = Vec::with_capacity(width.saturating_mul(height).saturating_mul(4));
    for y in 0..height {
        let base = y.saturating_mul(src_stride);
        for x in 0..width {
            let idx = base.saturating_add(x.saturating_mul(4));
            let b = src_pixels.get(idx).copied().unwrap_or(255);
            let g = src_pixels.get(idx + 1).copied().unwrap_or(255);
            let r = src_pixels.get(idx + 2).copied().unwrap_or(255);
            let a = src_pixels.get(idx + 3).copied().unwrap_or(255);
            pixels.extend_from_slice(&[r, g, b, a]);
        }
    }

    RgbaBitmap {
        width,
        height,
        stride: width.saturating_mul(4),
        pixels,
    }
}

fn bind_pdfium() -> anyhow::Result<Pdfium> {
    let mut candidates: Vec<PathBuf> = Vec::new();

    if let Ok(path) = std::env::var("NEWSSTAND_PDFIUM_LIB_PATH") {
        let path = PathBuf::from(path);
        let bindings = Pdfium::bind_to_library(&path)
            .map_err(|err| anyhow::anyhow!(err))
            .with_context(|| {
                format!(
                    "failed to load pdfium from NEWSSTAND_PDFIUM_LIB_PATH={}",
                    path.display()
                )
            })?;
        return Ok(Pdfium::new(bindings));
    }

    if let Ok(dir) = std::env::var("NEWSSTAND_PDFIUM_DIR") {
        candidates.push(Pdfium::pdfium_platform_library_name_at_path(Path::new(&dir)));
    }

    if let Ok(exe) = std::env::current_exe()
        && let Some(dir) = exe.parent()
    {
        candidates.push(Pdfium::pdfium_platform_library_name_at_path(dir));
    }

    candidates.push(Pdfium::pdfium_platform_library_name_at_path(Path::new(
        ".pdfium",
    )));
    candidates.push(Pdfium::pdfium_platform_library_name_at_path(Path::new(".")));

    for path in candidates {
        if let Ok(bindings) = Pdfium::bind_to_library(&path) {
            return Ok(Pdfium::new(bindings));
        }
    }

    let bindings = Pdfium::bind_to_system_library()
        .map_err(|err| anyhow::anyhow!(err))
        .map_err(|err| {
            let lib_name = Pdfium::pdfium_platform_library_name();
            anyhow::anyhow!(
                "{err}\n\nPdfium library not found.\n- Install it system-wide, or\n- Place {} next to the executable.\n",
                lib_name.to_string_lossy()
            )
        })?;

    Ok(Pdfium::new(bindings))
}
