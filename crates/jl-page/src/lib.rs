//! Headless page: document, layout, viewport, scrolling and event plumbing.
//!
//! `Page` is the host the deferred loader runs against outside a real
//! browser. It owns the document tree, recomputes layout after every
//! mutation that can move content, delivers window events to bound
//! listeners and drives image loads through an [`ImageLoader`].

mod loader;

pub use loader::ImageLoad;
pub use loader::ImageLoader;
pub use loader::StaticImageLoader;

use core::fmt;
use jl_core::DocumentHost;
use jl_core::EventKind;
use jl_core::EventListener;
use jl_core::LazyResult;
use jl_core::ListenerId;
use jl_core::LoadHandler;
use jl_core::WindowHost;
use jl_dom::Document;
use jl_dom::NodeId;
use jl_html::HtmlParser;
use jl_js::HandlerElement;
use jl_js::HandlerRuntime;
use jl_layout::LayoutEngine;
use jl_layout::LayoutTree;
use std::collections::BTreeMap;
use std::collections::VecDeque;

/// Upper bound on loads processed per [`Page::flush_image_loads`] call in the
/// convenience helpers. Stops `onerror` handlers that keep re-pointing `src`
/// at broken URLs from spinning forever.
pub const DEFAULT_LOAD_FLUSH_LIMIT: usize = 128;

/// Viewport and layout configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct PageConfig {
    /// Reported as `window.innerHeight`. `None` or zero makes hosts fall back
    /// to `client_height`.
    pub viewport_height: Option<f64>,
    /// Reported as `document.documentElement.clientHeight`.
    pub client_height: f64,
    pub viewport_width: f64,
    pub line_height: f64,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            viewport_height: Some(800.0),
            client_height: 800.0,
            viewport_width: 1280.0,
            line_height: 20.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadStatus {
    Loaded { width: u32, height: u32 },
    Failed { reason: String },
}

/// One processed image load, in processing order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageLoadRecord {
    pub image: NodeId,
    pub src: String,
    pub status: LoadStatus,
}

struct ListenerSlot {
    kind: EventKind,
    // Empty while the listener is being invoked.
    listener: Option<EventListener<Page>>,
}

pub struct Page {
    document: Document,
    config: PageConfig,
    layout_engine: LayoutEngine,
    layout: LayoutTree,
    intrinsic_heights: BTreeMap<NodeId, f64>,
    scroll_y: f64,
    listeners: BTreeMap<ListenerId, ListenerSlot>,
    next_listener_id: ListenerId,
    load_handlers: BTreeMap<NodeId, LoadHandler<Page>>,
    pending_loads: VecDeque<NodeId>,
    load_log: Vec<ImageLoadRecord>,
    loader: Box<dyn ImageLoader>,
    handlers: HandlerRuntime,
}

impl fmt::Debug for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Page")
            .field("title", &self.document.title)
            .field("config", &self.config)
            .field("scroll_y", &self.scroll_y)
            .field("listeners", &self.listeners.len())
            .field("pending_loads", &self.pending_loads.len())
            .finish_non_exhaustive()
    }
}

impl Page {
    pub fn new(document: Document, config: PageConfig, loader: impl ImageLoader + 'static) -> Self {
        let layout_engine = LayoutEngine {
            viewport_width: config.viewport_width,
            line_height: config.line_height,
        };
        let mut page = Self {
            document,
            config,
            layout_engine,
            layout: LayoutTree::default(),
            intrinsic_heights: BTreeMap::new(),
            scroll_y: 0.0,
            listeners: BTreeMap::new(),
            next_listener_id: 1,
            load_handlers: BTreeMap::new(),
            pending_loads: VecDeque::new(),
            load_log: Vec::new(),
            loader: Box::new(loader),
            handlers: HandlerRuntime::default(),
        };
        page.relayout();
        page
    }

    pub fn from_html(html: &str, config: PageConfig, loader: impl ImageLoader + 'static) -> Self {
        Self::new(HtmlParser.parse(html), config, loader)
    }

    pub fn with_handler_runtime(mut self, handlers: HandlerRuntime) -> Self {
        self.handlers = handlers;
        self
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn config(&self) -> &PageConfig {
        &self.config
    }

    pub fn layout(&self) -> &LayoutTree {
        &self.layout
    }

    pub fn to_html(&self) -> String {
        self.document.to_html()
    }

    pub fn element_by_id(&self, id: &str) -> Option<NodeId> {
        self.document.element_by_id(id)
    }

    pub fn is_connected(&self, node: NodeId) -> bool {
        self.document.is_connected(node)
    }

    /// Resizes the viewport. No event is dispatched.
    pub fn set_viewport_height(&mut self, viewport_height: Option<f64>) {
        self.config.viewport_height = viewport_height;
        self.scroll_y = self.scroll_y.min(self.max_scroll_y());
    }

    pub fn viewport_height(&self) -> f64 {
        match self.config.viewport_height {
            Some(height) if height != 0.0 && !height.is_nan() => height,
            _ => self.config.client_height,
        }
    }

    pub fn scroll_y(&self) -> f64 {
        self.scroll_y
    }

    pub fn max_scroll_y(&self) -> f64 {
        (self.layout.height - self.viewport_height()).max(0.0)
    }

    /// Moves the viewport and dispatches `scroll` if the position changed.
    /// Returns whether it moved.
    pub fn scroll_to(&mut self, y: f64) -> bool {
        let target = if y.is_nan() { 0.0 } else { y.clamp(0.0, self.max_scroll_y()) };
        if target == self.scroll_y {
            return false;
        }
        self.scroll_y = target;
        self.dispatch_event(EventKind::Scroll);
        true
    }

    pub fn scroll_by(&mut self, delta: f64) -> bool {
        self.scroll_to(self.scroll_y + delta)
    }

    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.listeners.values().filter(|slot| slot.kind == kind).count()
    }

    /// Delivers one event to every listener of `kind` bound before dispatch
    /// started, in binding order. Returns how many listeners ran.
    pub fn dispatch_event(&mut self, kind: EventKind) -> usize {
        let ids: Vec<ListenerId> = self
            .listeners
            .iter()
            .filter(|(_, slot)| slot.kind == kind)
            .map(|(id, _)| *id)
            .collect();

        let mut delivered = 0_usize;
        for id in ids {
            let Some(mut listener) = self
                .listeners
                .get_mut(&id)
                .and_then(|slot| slot.listener.take())
            else {
                continue;
            };

            listener(self, id);
            delivered = delivered.saturating_add(1);

            // A listener that unbound itself (or was unbound by someone else) stays gone.
            if let Some(slot) = self.listeners.get_mut(&id) {
                slot.listener = Some(listener);
            }
        }
        delivered
    }

    pub fn pending_load_count(&self) -> usize {
        self.pending_loads.len()
    }

    pub fn load_log(&self) -> &[ImageLoadRecord] {
        &self.load_log
    }

    /// Completes up to `limit` (at least one) queued image loads, firing
    /// load handlers and `onerror` attributes. Returns how many were processed.
    pub fn flush_image_loads(&mut self, limit: usize) -> usize {
        let max_runs = limit.max(1);
        let mut runs = 0_usize;
        while runs < max_runs {
            let Some(image) = self.pending_loads.pop_front() else {
                break;
            };
            self.complete_image_load(image);
            runs = runs.saturating_add(1);
        }
        runs
    }

    fn complete_image_load(&mut self, image: NodeId) {
        let Some(src) = self.document.get_attribute(image, "src").map(str::to_owned) else {
            return;
        };

        match self.loader.load(&src) {
            ImageLoad::Loaded { width, height } => {
                log::debug!("image {image} loaded `{src}` ({width}x{height})");
                self.intrinsic_heights.insert(image, f64::from(height));
                self.relayout();
                self.load_log.push(ImageLoadRecord {
                    image,
                    src,
                    status: LoadStatus::Loaded { width, height },
                });
                self.fire_load_handler(image);
            }
            ImageLoad::Failed(reason) => {
                log::debug!("image {image} failed to load `{src}`: {reason}");
                if self.intrinsic_heights.remove(&image).is_some() {
                    self.relayout();
                }
                self.load_log.push(ImageLoadRecord {
                    image,
                    src,
                    status: LoadStatus::Failed { reason },
                });
                self.run_error_attribute(image);
            }
        }
    }

    fn fire_load_handler(&mut self, image: NodeId) {
        let Some(mut handler) = self.load_handlers.remove(&image) else {
            return;
        };
        handler(self, image);
        // Keep a handler installed during the call if there is one.
        self.load_handlers.entry(image).or_insert(handler);
    }

    fn run_error_attribute(&mut self, image: NodeId) {
        let Some(node) = self.document.node(image) else {
            return;
        };
        let Some(source) = node.attribute("onerror").map(str::to_owned) else {
            return;
        };
        let element = HandlerElement {
            tag_name: node.tag_name().unwrap_or_default().to_owned(),
            attributes: node.attributes().to_vec(),
        };

        match self
            .handlers
            .run_inline_handler(&source, EventKind::Error.as_str(), &element)
        {
            Ok(outcome) => {
                self.apply_attribute_changes(image, &element.attributes, &outcome.attributes)
            }
            Err(error) => log::warn!(
                "{} handler on image {image} failed: {}",
                error.origin,
                error.message
            ),
        }
    }

    fn apply_attribute_changes(
        &mut self,
        node: NodeId,
        before: &[(String, String)],
        after: &[(String, String)],
    ) {
        for (name, _) in before {
            if !after.iter().any(|(candidate, _)| candidate == name) {
                if let Err(error) = self.document.remove_attribute(node, name) {
                    log::warn!("failed removing `{name}` from node {node}: {error}");
                }
            }
        }

        for (name, value) in after {
            let previous = before
                .iter()
                .find(|(candidate, _)| candidate == name)
                .map(|(_, value)| value);
            if previous != Some(value) {
                DocumentHost::set_attribute(self, node, name, value);
            }
        }
        self.relayout();
    }

    fn relayout(&mut self) {
        self.layout = self
            .layout_engine
            .compute(&self.document, &self.intrinsic_heights);
        self.scroll_y = self.scroll_y.min(self.max_scroll_y());
    }
}

impl DocumentHost for Page {
    type Node = NodeId;

    fn get_attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.document.get_attribute(node, name).map(str::to_owned)
    }

    fn create_element(&mut self, tag_name: &str) -> NodeId {
        self.document.create_element(tag_name)
    }

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) {
        if let Err(error) = self.document.set_attribute(node, name, value) {
            log::warn!("ignoring attribute `{name}` on node {node}: {error}");
            return;
        }

        let is_image = self
            .document
            .node(node)
            .and_then(|element| element.tag_name())
            .is_some_and(|tag| tag == "img");
        if is_image && name.eq_ignore_ascii_case("src") {
            self.pending_loads.push_back(node);
        }
        if name.eq_ignore_ascii_case("height") || name.eq_ignore_ascii_case("style") {
            self.relayout();
        }
    }

    fn parent_node(&self, node: NodeId) -> Option<NodeId> {
        self.document.parent_node(node)
    }

    fn replace_child(
        &mut self,
        parent: NodeId,
        new_child: NodeId,
        old_child: NodeId,
    ) -> LazyResult<()> {
        self.document.replace_child(parent, new_child, old_child)?;
        self.relayout();
        Ok(())
    }

    fn set_load_handler(&mut self, image: NodeId, handler: LoadHandler<Self>) {
        self.load_handlers.insert(image, handler);
    }

    fn elements_by_class_name(&self, class_name: &str) -> Vec<NodeId> {
        self.document.elements_by_class_name(class_name)
    }

    fn bounding_client_top(&self, node: NodeId) -> f64 {
        self.layout
            .box_for(node)
            .map(|rect| rect.top - self.scroll_y)
            .unwrap_or(0.0)
    }
}

impl WindowHost for Page {
    fn inner_height(&self) -> Option<f64> {
        self.config.viewport_height
    }

    fn client_height(&self) -> f64 {
        self.config.client_height
    }

    fn add_event_listener(&mut self, kind: EventKind, listener: EventListener<Self>) -> ListenerId {
        let id = self.next_listener_id;
        self.next_listener_id = self.next_listener_id.saturating_add(1);
        self.listeners.insert(
            id,
            ListenerSlot {
                kind,
                listener: Some(listener),
            },
        );
        id
    }

    fn remove_event_listener(&mut self, kind: EventKind, id: ListenerId) -> bool {
        match self.listeners.get(&id) {
            Some(slot) if slot.kind == kind => {
                self.listeners.remove(&id);
                true
            }
            _ => false,
        }
    }
}
