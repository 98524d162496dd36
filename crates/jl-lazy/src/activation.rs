//! Scroll-driven activation.
//!
//! A registration is either satisfied on the spot (the placeholder is already
//! within range) or parks a scroll listener that re-checks visibility on each
//! event, loads once, and unbinds itself. There is no timeout or polling:
//! a pending placeholder waits for as long as no qualifying scroll arrives.

use crate::lazy_load;
use crate::materialize::LoadOutcome;
use crate::options::LazyOptions;
use crate::visibility::is_visible;
use jl_core::EventKind;
use jl_core::EventListener;
use jl_core::LazyResult;
use jl_core::ListenerId;
use jl_core::WindowHost;

/// How a registration was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation<N> {
    /// Visible at registration; `lazy_load` already ran.
    Immediate(LoadOutcome<N>),
    /// A scroll listener is bound under this id.
    Pending(ListenerId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListenerState {
    Pending,
    Fired,
}

/// Loads `placeholder` now if it is within range, otherwise once a scroll
/// event finds it within range.
pub fn register_lazy_load<H: WindowHost + 'static>(
    host: &mut H,
    placeholder: H::Node,
    options: LazyOptions<H>,
) -> LazyResult<Activation<H::Node>> {
    if is_visible(&*host, placeholder, options.effective_threshold()) {
        log::debug!("placeholder {placeholder:?} is already in range; loading now");
        let outcome = lazy_load(host, placeholder, &options)?;
        return Ok(Activation::Immediate(outcome));
    }

    let id = host.add_event_listener(EventKind::Scroll, load_when_visible(placeholder, options));
    log::debug!("placeholder {placeholder:?} waits for scroll on listener {id}");
    Ok(Activation::Pending(id))
}

/// Registers every element carrying `class_name`, in document order, each
/// with its own copy of `options`.
pub fn register_lazy_load_by_class<H: WindowHost + 'static>(
    host: &mut H,
    class_name: &str,
    options: &LazyOptions<H>,
) -> LazyResult<Vec<Activation<H::Node>>> {
    let placeholders = host.elements_by_class_name(class_name);
    let mut activations = Vec::with_capacity(placeholders.len());
    for placeholder in placeholders {
        activations.push(register_lazy_load(host, placeholder, options.clone())?);
    }
    Ok(activations)
}

fn load_when_visible<H: WindowHost + 'static>(
    placeholder: H::Node,
    options: LazyOptions<H>,
) -> EventListener<H> {
    let mut state = ListenerState::Pending;

    Box::new(move |host: &mut H, listener: ListenerId| {
        if state == ListenerState::Fired {
            return;
        }
        if !is_visible(&*host, placeholder, options.effective_threshold()) {
            log::trace!("placeholder {placeholder:?} still out of range");
            return;
        }

        state = ListenerState::Fired;
        log::debug!("placeholder {placeholder:?} scrolled into range");
        if let Err(error) = lazy_load(host, placeholder, &options) {
            log::warn!("deferred load of placeholder {placeholder:?} failed: {error}");
        }
        host.remove_event_listener(EventKind::Scroll, listener);
    })
}
