//! Building the image element and swapping it in.

use crate::attributes::ImageSource;
use crate::options::ElementCallback;
use jl_core::DocumentHost;
use jl_core::LazyResult;

pub const IMAGE_TAG: &str = "img";

/// What a load attempt did to the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome<N> {
    /// The placeholder was replaced by this image element.
    Replaced(N),
    /// An image was built but the placeholder had no parent, so nothing moved.
    Detached(N),
    /// Mandatory metadata was missing; only `on_error` ran.
    Rejected,
}

impl<N: Copy> LoadOutcome<N> {
    pub fn image(&self) -> Option<N> {
        match self {
            Self::Replaced(image) | Self::Detached(image) => Some(*image),
            Self::Rejected => None,
        }
    }
}

/// Creates the image, wires `on_load`, sets attributes and swaps it in for
/// `placeholder`. `src` is set last so the host starts loading with every
/// other attribute already in place.
pub fn create_image<H: DocumentHost + 'static>(
    host: &mut H,
    placeholder: H::Node,
    image: &ImageSource,
    on_load: Option<ElementCallback<H>>,
    on_replace: Option<&ElementCallback<H>>,
) -> LazyResult<LoadOutcome<H::Node>> {
    let img = host.create_element(IMAGE_TAG);

    host.set_load_handler(
        img,
        Box::new(move |host: &mut H, img: H::Node| {
            if let Some(callback) = &on_load {
                callback(host, img);
            }
        }),
    );

    if let Some(title) = &image.title {
        host.set_attribute(img, "title", title);
    }
    if let Some(handler) = &image.error_handler {
        host.set_attribute(img, "onerror", handler);
    }
    if let Some(srcset) = &image.srcset {
        host.set_attribute(img, "srcset", srcset);
    }

    host.set_attribute(img, "alt", &image.alt);
    host.set_attribute(img, "src", &image.src);

    replace_placeholder(host, placeholder, img, on_replace)
}

/// Swaps `img` in for `placeholder`. A placeholder without a parent is left
/// alone and `on_replace` is not called.
pub fn replace_placeholder<H: DocumentHost>(
    host: &mut H,
    placeholder: H::Node,
    img: H::Node,
    on_replace: Option<&ElementCallback<H>>,
) -> LazyResult<LoadOutcome<H::Node>> {
    let Some(parent) = host.parent_node(placeholder) else {
        log::debug!("placeholder {placeholder:?} is detached; nothing to replace");
        return Ok(LoadOutcome::Detached(img));
    };

    host.replace_child(parent, img, placeholder)?;
    if let Some(callback) = on_replace {
        callback(host, img);
    }
    Ok(LoadOutcome::Replaced(img))
}
