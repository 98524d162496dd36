//! Host seams the deferred loader drives.
//!
//! The loader never touches global state: every lookup (viewport height,
//! element geometry, event registration) goes through a host value passed in
//! by the caller. A browser binding, a headless page model or a test double
//! can all sit behind these traits.

use crate::LazyResult;
use core::fmt;

/// Handle returned when a listener is bound; used to unbind it.
pub type ListenerId = u64;

/// Handler fired each time an image element finishes loading.
pub type LoadHandler<D> = Box<dyn FnMut(&mut D, <D as DocumentHost>::Node)>;

/// Window-level event listener. Receives its own id so it can unbind itself.
pub type EventListener<W> = Box<dyn FnMut(&mut W, ListenerId)>;

/// Events the loader binds to or that hosts dispatch to elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    Scroll,
    Load,
    Error,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Scroll => "scroll",
            Self::Load => "load",
            Self::Error => "error",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "scroll" => Some(Self::Scroll),
            "load" => Some(Self::Load),
            "error" => Some(Self::Error),
            _ => None,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Document tree operations.
pub trait DocumentHost {
    /// Node identity. Two handles are the same node iff they compare equal.
    type Node: Copy + Eq + fmt::Debug;

    /// Returns `None` when the attribute is absent; an empty value is `Some("")`.
    fn get_attribute(&self, node: Self::Node, name: &str) -> Option<String>;

    /// Creates a detached element.
    fn create_element(&mut self, tag_name: &str) -> Self::Node;

    fn set_attribute(&mut self, node: Self::Node, name: &str, value: &str);

    fn parent_node(&self, node: Self::Node) -> Option<Self::Node>;

    /// Puts `new_child` where `old_child` sits under `parent`; `old_child` ends up detached.
    fn replace_child(
        &mut self,
        parent: Self::Node,
        new_child: Self::Node,
        old_child: Self::Node,
    ) -> LazyResult<()>;

    /// Installs the handler fired when `image` finishes loading, replacing any previous one.
    fn set_load_handler(&mut self, image: Self::Node, handler: LoadHandler<Self>)
    where
        Self: Sized;

    /// Elements carrying `class_name` as one of their class tokens, in document order.
    fn elements_by_class_name(&self, class_name: &str) -> Vec<Self::Node>;

    /// Distance in pixels from the viewport top to the node's top edge.
    fn bounding_client_top(&self, node: Self::Node) -> f64;
}

/// Window-level lookups and event registration.
pub trait WindowHost: DocumentHost {
    /// `window.innerHeight`; `None` when the host cannot report it.
    fn inner_height(&self) -> Option<f64>;

    /// `document.documentElement.clientHeight`.
    fn client_height(&self) -> f64;

    fn add_event_listener(&mut self, kind: EventKind, listener: EventListener<Self>) -> ListenerId
    where
        Self: Sized;

    /// Unbinds a listener. Returns `false` if it was not bound; calling twice is harmless.
    fn remove_event_listener(&mut self, kind: EventKind, id: ListenerId) -> bool;
}
