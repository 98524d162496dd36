//! Layout engine entry points (block flow only).

use jl_dom::Document;
use jl_dom::NodeId;
use jl_dom::NodeKind;
use std::collections::BTreeMap;

/// Elements that occupy no space.
const NON_RENDERED: &[&str] = &[
    "head", "link", "meta", "script", "style", "template", "title",
];

/// Vertical extent of one laid-out node, in document coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxRect {
    pub top: f64,
    pub height: f64,
}

impl BoxRect {
    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }
}

/// Boxes for every node reachable from the document root.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayoutTree {
    pub width: f64,
    pub height: f64,
    boxes: BTreeMap<NodeId, BoxRect>,
}

impl LayoutTree {
    /// `None` for nodes that are not connected to the document.
    pub fn box_for(&self, node: NodeId) -> Option<BoxRect> {
        self.boxes.get(&node).copied()
    }

    pub fn box_count(&self) -> usize {
        self.boxes.len()
    }
}

/// Computes vertical positions. Every element stacks below its previous
/// sibling; there is no inline formatting, floating or positioning.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutEngine {
    pub viewport_width: f64,
    pub line_height: f64,
}

impl Default for LayoutEngine {
    fn default() -> Self {
        Self {
            viewport_width: 1280.0,
            line_height: 20.0,
        }
    }
}

impl LayoutEngine {
    /// `intrinsic_heights` carries natural heights of loaded replaced elements.
    pub fn compute(
        &self,
        document: &Document,
        intrinsic_heights: &BTreeMap<NodeId, f64>,
    ) -> LayoutTree {
        let mut tree = LayoutTree {
            width: self.viewport_width,
            height: 0.0,
            boxes: BTreeMap::new(),
        };
        tree.height = self.layout_subtree(document, document.root, intrinsic_heights, &mut tree);
        tree
    }

    /// Post-order walk with an explicit stack. A frame stays on the stack
    /// while its children are laid out below `cursor`.
    fn layout_subtree(
        &self,
        document: &Document,
        root: NodeId,
        intrinsic_heights: &BTreeMap<NodeId, f64>,
        tree: &mut LayoutTree,
    ) -> f64 {
        let mut stack = vec![LayoutFrame::new(root, 0.0)];
        let mut root_height = 0.0;

        while let Some(frame) = stack.last_mut() {
            let Some(node) = document.node(frame.id) else {
                stack.pop();
                continue;
            };

            let height = match &node.kind {
                NodeKind::Comment(_) => 0.0,
                NodeKind::Text(text) if text.trim().is_empty() => 0.0,
                NodeKind::Text(_) => self.line_height,
                NodeKind::Element { tag_name, .. } if NON_RENDERED.contains(&tag_name.as_str()) => {
                    0.0
                }
                NodeKind::Document | NodeKind::Element { .. } => {
                    if let Some(child) = node.children().get(frame.next_child) {
                        frame.next_child += 1;
                        let child_frame = LayoutFrame::new(*child, frame.cursor);
                        stack.push(child_frame);
                        continue;
                    }
                    let content = frame.cursor - frame.top;
                    match node.kind {
                        NodeKind::Document => content,
                        _ => declared_height(node.attribute("height"), node.attribute("style"))
                            .or_else(|| intrinsic_heights.get(&frame.id).copied())
                            .unwrap_or(content),
                    }
                }
            };

            let (id, top) = (frame.id, frame.top);
            tree.boxes.insert(id, BoxRect { top, height });
            stack.pop();
            match stack.last_mut() {
                Some(parent) => parent.cursor += height,
                None => root_height = height,
            }
        }

        root_height
    }
}

struct LayoutFrame {
    id: NodeId,
    top: f64,
    cursor: f64,
    next_child: usize,
}

impl LayoutFrame {
    fn new(id: NodeId, top: f64) -> Self {
        Self {
            id,
            top,
            cursor: top,
            next_child: 0,
        }
    }
}

/// Height from the `height` attribute or an inline `height: Npx` declaration.
/// The inline style wins, as it would in a cascade.
fn declared_height(attribute: Option<&str>, style: Option<&str>) -> Option<f64> {
    style
        .and_then(inline_style_height)
        .or_else(|| attribute.and_then(parse_pixels))
}

fn inline_style_height(style: &str) -> Option<f64> {
    style
        .split(';')
        .filter_map(|declaration| declaration.split_once(':'))
        .filter(|(name, _)| name.trim().eq_ignore_ascii_case("height"))
        .filter_map(|(_, value)| parse_pixels(value))
        .last()
}

fn parse_pixels(value: &str) -> Option<f64> {
    let trimmed = value.trim();
    let number = trimmed
        .strip_suffix("px")
        .or_else(|| trimmed.strip_suffix("PX"))
        .unwrap_or(trimmed)
        .trim();
    number
        .parse::<f64>()
        .ok()
        .filter(|height| height.is_finite() && *height >= 0.0)
}

#[cfg(test)]
mod tests {
    use super::LayoutEngine;
    use super::declared_height;
    use jl_dom::Document;
    use jl_html::HtmlParser;
    use std::collections::BTreeMap;

    #[test]
    fn empty_document_has_no_height() {
        let tree = LayoutEngine::default().compute(&Document::empty(), &BTreeMap::new());
        assert_eq!(tree.height, 0.0);
        assert_eq!(tree.box_count(), 1);
    }

    #[test]
    fn stacks_siblings_vertically() {
        let doc = HtmlParser.parse(
            r#"<body><div id="a" style="height: 500px"></div><span id="b" height="300"></span><p id="c">text</p></body>"#,
        );
        let tree = LayoutEngine::default().compute(&doc, &BTreeMap::new());
        let top = |id: &str| {
            doc.element_by_id(id)
                .and_then(|node| tree.box_for(node))
                .map(|rect| rect.top)
        };

        assert_eq!(top("a"), Some(0.0));
        assert_eq!(top("b"), Some(500.0));
        assert_eq!(top("c"), Some(800.0));
        assert_eq!(tree.height, 820.0);
    }

    #[test]
    fn head_content_takes_no_space() {
        let doc = HtmlParser.parse(
            "<html><head><title>t</title><style>p{}</style></head><body><p id=p>x</p></body></html>",
        );
        let tree = LayoutEngine::default().compute(&doc, &BTreeMap::new());
        let p = doc.element_by_id("p").expect("p");
        assert_eq!(tree.box_for(p).map(|rect| rect.top), Some(0.0));
    }

    #[test]
    fn intrinsic_height_applies_without_declared_height() {
        let doc = HtmlParser.parse("<body><img id=i src=a.png><p id=p>x</p></body>");
        let img = doc.element_by_id("i").expect("img");
        let p = doc.element_by_id("p").expect("p");
        let tree = LayoutEngine::default().compute(&doc, &BTreeMap::from([(img, 240.0)]));
        assert_eq!(tree.box_for(p).map(|rect| rect.top), Some(240.0));
    }

    #[test]
    fn detached_nodes_have_no_box() {
        let mut doc = HtmlParser.parse("<body></body>");
        let stray = doc.create_element("span");
        let tree = LayoutEngine::default().compute(&doc, &BTreeMap::new());
        assert!(tree.box_for(stray).is_none());
    }

    #[test]
    fn inline_style_beats_attribute_and_bad_values_are_ignored() {
        assert_eq!(declared_height(Some("10"), Some("color: red; height: 42px")), Some(42.0));
        assert_eq!(declared_height(Some("10"), Some("height: auto")), Some(10.0));
        assert_eq!(declared_height(Some("-3"), None), None);
    }

    #[test]
    fn deeply_nested_page_lays_out_without_recursion() {
        let html = format!("<body>{}<p>x</p>", "<div>".repeat(100_000));
        let doc = HtmlParser.parse(&html);
        let tree = LayoutEngine::default().compute(&doc, &BTreeMap::new());
        assert_eq!(tree.height, 20.0);
        assert_eq!(tree.box_count(), doc.node_count());
    }
}
