//! Caller-supplied configuration for one placeholder.

use jl_core::DocumentHost;
use std::fmt;
use std::rc::Rc;

/// Callback receiving the relevant element (the image, or the placeholder
/// for `on_error`) together with the host.
pub type ElementCallback<H> = Rc<dyn Fn(&mut H, <H as DocumentHost>::Node)>;

/// Every field is optional; `LazyOptions::default()` is the empty bag.
pub struct LazyOptions<H: DocumentHost> {
    /// Fired each time the materialized image finishes loading.
    pub on_load: Option<ElementCallback<H>>,
    /// Fired with the placeholder when `data-src`/`data-alt` are missing.
    pub on_error: Option<ElementCallback<H>>,
    /// Fired right after the placeholder was swapped for the image.
    pub on_replace: Option<ElementCallback<H>>,
    /// Pixels before (positive) or past (negative) the viewport edge at which
    /// loading starts.
    pub threshold: f64,
}

impl<H: DocumentHost> LazyOptions<H> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_on_load(mut self, callback: impl Fn(&mut H, H::Node) + 'static) -> Self {
        self.on_load = Some(Rc::new(callback));
        self
    }

    pub fn with_on_error(mut self, callback: impl Fn(&mut H, H::Node) + 'static) -> Self {
        self.on_error = Some(Rc::new(callback));
        self
    }

    pub fn with_on_replace(mut self, callback: impl Fn(&mut H, H::Node) + 'static) -> Self {
        self.on_replace = Some(Rc::new(callback));
        self
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// NaN behaves like an unset threshold.
    pub fn effective_threshold(&self) -> f64 {
        if self.threshold.is_nan() {
            0.0
        } else {
            self.threshold
        }
    }
}

impl<H: DocumentHost> Default for LazyOptions<H> {
    fn default() -> Self {
        Self {
            on_load: None,
            on_error: None,
            on_replace: None,
            threshold: 0.0,
        }
    }
}

impl<H: DocumentHost> Clone for LazyOptions<H> {
    fn clone(&self) -> Self {
        Self {
            on_load: self.on_load.clone(),
            on_error: self.on_error.clone(),
            on_replace: self.on_replace.clone(),
            threshold: self.threshold,
        }
    }
}

impl<H: DocumentHost> fmt::Debug for LazyOptions<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyOptions")
            .field("on_load", &self.on_load.is_some())
            .field("on_error", &self.on_error.is_some())
            .field("on_replace", &self.on_replace.is_some())
            .field("threshold", &self.threshold)
            .finish()
    }
}
