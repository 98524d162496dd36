//! Deferred image loading.
//!
//! A placeholder element declares an image through `data-src`, `data-alt`
//! and optional `data-title`, `data-error-handler` and `data-srcset`
//! attributes. [`lazy_load`] swaps it for a real `<img>` right away;
//! [`register_lazy_load`] does so once the placeholder comes within range of
//! the viewport. Everything runs against a host implementing
//! [`jl_core::WindowHost`], so the same logic drives a browser binding or the
//! headless `jl-page` model.

mod activation;
mod attributes;
mod materialize;
mod options;
mod visibility;

pub use activation::Activation;
pub use activation::register_lazy_load;
pub use activation::register_lazy_load_by_class;
pub use attributes::ALT_ATTRIBUTE;
pub use attributes::ERROR_HANDLER_ATTRIBUTE;
pub use attributes::ImageAttributes;
pub use attributes::ImageSource;
pub use attributes::SRC_ATTRIBUTE;
pub use attributes::SRCSET_ATTRIBUTE;
pub use attributes::TITLE_ATTRIBUTE;
pub use materialize::IMAGE_TAG;
pub use materialize::LoadOutcome;
pub use options::ElementCallback;
pub use options::LazyOptions;
pub use visibility::is_visible;
pub use visibility::is_within_threshold;
pub use visibility::viewport_height;

use jl_core::DocumentHost;
use jl_core::LazyResult;

/// Replaces `placeholder` with an image built from its metadata.
///
/// Missing `data-src` or `data-alt` is not an error: `on_error` is called with
/// the placeholder and [`LoadOutcome::Rejected`] is returned. `Err` is reserved
/// for hosts that fail a DOM operation.
pub fn lazy_load<H: DocumentHost + 'static>(
    host: &mut H,
    placeholder: H::Node,
    options: &LazyOptions<H>,
) -> LazyResult<LoadOutcome<H::Node>> {
    let attributes = ImageAttributes::resolve(&*host, placeholder);
    let Some(image) = attributes.into_image_source() else {
        log::debug!("placeholder {placeholder:?} lacks {SRC_ATTRIBUTE} or {ALT_ATTRIBUTE}");
        if let Some(callback) = &options.on_error {
            callback(host, placeholder);
        }
        return Ok(LoadOutcome::Rejected);
    };

    materialize::create_image(
        host,
        placeholder,
        &image,
        options.on_load.clone(),
        options.on_replace.as_ref(),
    )
}
