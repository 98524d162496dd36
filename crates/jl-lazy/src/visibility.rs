//! Viewport geometry checks.

use jl_core::WindowHost;

/// `window.innerHeight`, falling back to the document element's client
/// height when the window reports nothing usable.
pub fn viewport_height<W: WindowHost>(window: &W) -> f64 {
    match window.inner_height() {
        Some(height) if height != 0.0 && !height.is_nan() => height,
        _ => window.client_height(),
    }
}

/// Whether `placeholder`'s top edge is within `threshold` pixels of the
/// viewport's bottom edge (or already above it).
pub fn is_visible<W: WindowHost>(window: &W, placeholder: W::Node, threshold: f64) -> bool {
    is_within_threshold(
        window.bounding_client_top(placeholder),
        viewport_height(window),
        threshold,
    )
}

pub fn is_within_threshold(top: f64, viewport_height: f64, threshold: f64) -> bool {
    let threshold = if threshold.is_nan() { 0.0 } else { threshold };
    top - viewport_height <= threshold
}
