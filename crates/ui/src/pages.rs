//! Rasterized page cache and per-area image protocols.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::Arc;

use newsstand_engine::{DocumentRenderer, Engine};
use ratatui::layout::Rect;
use ratatui_image::picker::Picker;
use ratatui_image::protocol::Protocol;
use ratatui_image::Resize;

const PAGE_CACHE_LIMIT: usize = 12;
const PROTOCOL_CACHE_LIMIT: usize = 6;

/// Scale rounded to hundredths, used as a cache key.
fn scale_key(scale: f32) -> u16 {
    (scale * 100.0).round().clamp(0.0, f32::from(u16::MAX)) as u16
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Fit {
    /// Native size, cropped to the area. Zoom is visible.
    Crop,
    /// Scaled down to fit the area.
    Contain,
}

#[derive(Clone)]
struct CachedImage {
    page: u32,
    scale: u16,
    image: Arc<image::DynamicImage>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ProtocolKey {
    page: u32,
    scale: u16,
    width: u16,
    height: u16,
    fit: Fit,
}

/// Either a drawable protocol or the reason the page could not be shown.
pub(crate) enum Shown<'a> {
    Image(&'a Protocol),
    Failed(String),
}

#[derive(Default)]
pub(crate) struct PageImages {
    images: VecDeque<CachedImage>,
    protocols: VecDeque<(ProtocolKey, Result<Protocol, String>)>,
}

impl PageImages {
    pub(crate) fn clear(&mut self) {
        self.images.clear();
        self.protocols.clear();
    }

    fn image(
        &mut self,
        engine: &Engine,
        source: &Path,
        page: u32,
        scale: f32,
    ) -> anyhow::Result<Arc<image::DynamicImage>> {
        let key = scale_key(scale);
        if let Some(cached) = self
            .images
            .iter()
            .find(|c| c.page == page && c.scale == key)
        {
            return Ok(cached.image.clone());
        }

        let bitmap = engine.render_page(source, page, scale)?;
        let image =
            image::RgbaImage::from_raw(bitmap.width as u32, bitmap.height as u32, bitmap.pixels)
                .ok_or_else(|| anyhow::anyhow!("invalid RGBA pixel buffer from pdfium"))?;
        let image = Arc::new(image::DynamicImage::ImageRgba8(image));
        self.images.push_front(CachedImage {
            page,
            scale: key,
            image: image.clone(),
        });
        self.images.truncate(PAGE_CACHE_LIMIT);
        Ok(image)
    }

    /// Renders (or reuses) page `page` at `scale` for a `size` area.
    pub(crate) fn show(
        &mut self,
        engine: &Engine,
        picker: &Picker,
        source: &Path,
        page: u32,
        scale: f32,
        size: Rect,
        fit: Fit,
    ) -> Shown<'_> {
        let key = ProtocolKey {
            page,
            scale: scale_key(scale),
            width: size.width,
            height: size.height,
            fit,
        };

        let position = match self.protocols.iter().position(|(k, _)| *k == key) {
            Some(position) => position,
            None => {
                let built = self
                    .image(engine, source, page, scale)
                    .and_then(|image| {
                        let resize = match fit {
                            Fit::Crop => Resize::Crop(None),
                            Fit::Contain => Resize::Fit(None),
                        };
                        picker
                            .new_protocol((*image).clone(), size, resize)
                            .map_err(|err| anyhow::anyhow!("{err:?}"))
                    })
                    .map_err(|err| {
                        tracing::warn!(page, "page render failed: {err:#}");
                        format!("{err:#}")
                    });
                self.protocols.push_front((key, built));
                self.protocols.truncate(PROTOCOL_CACHE_LIMIT);
                0
            }
        };

        match &self.protocols[position].1 {
            Ok(protocol) => Shown::Image(protocol),
            Err(err) => Shown::Failed(err.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scale_key_rounds_to_hundredths() {
        assert_eq!(scale_key(1.0), 100);
        assert_eq!(scale_key(0.3), 30);
        assert_eq!(scale_key(1.2000001), 120);
    }

    #[test]
    fn missing_source_is_reported_not_cached_as_image() {
        let engine = Engine::new();
        let picker = Picker::halfblocks();
        let mut pages = PageImages::default();
        let shown = pages.show(
            &engine,
            &picker,
            Path::new("/missing/issue.pdf"),
            1,
            1.0,
            Rect::new(0, 0, 20, 10),
            Fit::Crop,
        );
        assert!(matches!(shown, Shown::Failed(msg) if msg.contains("issue.pdf")));
        assert!(pages.images.is_empty());
    }
}
