//! Image resource loading seam.

use std::collections::BTreeMap;

/// Result of fetching and decoding one image URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageLoad {
    Loaded { width: u32, height: u32 },
    Failed(String),
}

/// Resolves `src` values to decoded images. Implementations own fetching,
/// URL resolution and decoding; the page only consumes the outcome.
pub trait ImageLoader {
    fn load(&mut self, src: &str) -> ImageLoad;
}

/// In-memory loader keyed by the exact `src` string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticImageLoader {
    images: BTreeMap<String, (u32, u32)>,
    fallback: Option<(u32, u32)>,
}

impl StaticImageLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_image(mut self, src: &str, width: u32, height: u32) -> Self {
        self.images.insert(src.to_owned(), (width, height));
        self
    }

    /// Size reported for any `src` not registered explicitly.
    pub fn with_fallback(mut self, width: u32, height: u32) -> Self {
        self.fallback = Some((width, height));
        self
    }
}

impl ImageLoader for StaticImageLoader {
    fn load(&mut self, src: &str) -> ImageLoad {
        match self.images.get(src).copied().or(self.fallback) {
            Some((width, height)) => ImageLoad::Loaded { width, height },
            None => ImageLoad::Failed(format!("no image registered for `{src}`")),
        }
    }
}
