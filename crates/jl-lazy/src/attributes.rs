//! Reading declared image metadata off a placeholder.

use jl_core::DocumentHost;

pub const SRC_ATTRIBUTE: &str = "data-src";
pub const ALT_ATTRIBUTE: &str = "data-alt";
pub const TITLE_ATTRIBUTE: &str = "data-title";
pub const ERROR_HANDLER_ATTRIBUTE: &str = "data-error-handler";
pub const SRCSET_ATTRIBUTE: &str = "data-srcset";

/// Metadata declared on a placeholder. Absent attributes are `None`; an
/// attribute present with an empty value is `Some("")`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageAttributes {
    pub src: Option<String>,
    pub alt: Option<String>,
    pub title: Option<String>,
    pub error_handler: Option<String>,
    pub srcset: Option<String>,
}

impl ImageAttributes {
    pub fn resolve<D: DocumentHost>(document: &D, placeholder: D::Node) -> Self {
        Self {
            src: document.get_attribute(placeholder, SRC_ATTRIBUTE),
            alt: document.get_attribute(placeholder, ALT_ATTRIBUTE),
            title: document.get_attribute(placeholder, TITLE_ATTRIBUTE),
            error_handler: document.get_attribute(placeholder, ERROR_HANDLER_ATTRIBUTE),
            srcset: document.get_attribute(placeholder, SRCSET_ATTRIBUTE),
        }
    }

    /// Applies the mandatory-field policy: `src` must be non-empty, `alt`
    /// must merely be present. Empty optional fields count as absent.
    pub fn into_image_source(self) -> Option<ImageSource> {
        let src = self.src.filter(|src| !src.is_empty())?;
        let alt = self.alt?;
        Some(ImageSource {
            src,
            alt,
            title: self.title.filter(|title| !title.is_empty()),
            error_handler: self.error_handler.filter(|handler| !handler.is_empty()),
            srcset: self.srcset.filter(|srcset| !srcset.is_empty()),
        })
    }
}

/// Validated attributes ready to be put on an image element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSource {
    pub src: String,
    pub alt: String,
    pub title: Option<String>,
    pub error_handler: Option<String>,
    pub srcset: Option<String>,
}
