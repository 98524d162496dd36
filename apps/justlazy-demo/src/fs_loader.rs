use image::ImageReader;
use jl_core::LazyError;
use jl_core::LazyResult;
use jl_page::ImageLoad;
use jl_page::ImageLoader;
use std::fs;
use std::io::Cursor;
use std::path::Path;
use url::Url;

const MAX_IMAGE_PIXELS: u64 = 16 * 1024 * 1024;

/// Loads images from disk, resolving `src` against the page's location.
/// Non-`file` URLs always fail; the demo does no networking.
#[derive(Debug, Clone)]
pub(crate) struct FsImageLoader {
    base: Url,
}

impl FsImageLoader {
    pub(crate) fn new(base: Url) -> Self {
        Self { base }
    }
}

impl ImageLoader for FsImageLoader {
    fn load(&mut self, src: &str) -> ImageLoad {
        let url = match self.base.join(src.trim()) {
            Ok(url) => url,
            Err(error) => return ImageLoad::Failed(format!("invalid image url `{src}`: {error}")),
        };
        if url.scheme() != "file" {
            return ImageLoad::Failed(format!("{} images are not fetched", url.scheme()));
        }
        let Ok(path) = url.to_file_path() else {
            return ImageLoad::Failed(format!("`{url}` is not a local path"));
        };

        match fs::read(&path) {
            Ok(bytes) => decode_image(&bytes),
            Err(error) => {
                ImageLoad::Failed(format!("failed reading `{}`: {error}", path.display()))
            }
        }
    }
}

/// Reads dimensions from the image header; pixel data is never decoded.
pub(crate) fn decode_image(bytes: &[u8]) -> ImageLoad {
    let dimensions = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(image::ImageError::IoError)
        .and_then(ImageReader::into_dimensions);
    let (width, height) = match dimensions {
        Ok(dimensions) => dimensions,
        Err(error) => return ImageLoad::Failed(format!("undecodable image: {error}")),
    };
    if u64::from(width) * u64::from(height) > MAX_IMAGE_PIXELS {
        return ImageLoad::Failed(format!("image too large ({width}x{height})"));
    }
    ImageLoad::Loaded { width, height }
}

/// `file://` URL of the page, used as the base for relative `src` values.
pub(crate) fn base_url_for(page: &Path) -> LazyResult<Url> {
    let absolute = fs::canonicalize(page).map_err(|error| {
        LazyError::new(
            "demo.resolve_failed",
            format!("failed resolving `{}`: {error}", page.display()),
        )
    })?;
    Url::from_file_path(&absolute).map_err(|()| {
        LazyError::new(
            "demo.resolve_failed",
            format!("`{}` cannot be expressed as a file URL", absolute.display()),
        )
    })
}
