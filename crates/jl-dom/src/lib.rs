//! DOM tree data structures.

use jl_core::LazyError;
use jl_core::LazyResult;

/// ID used to address nodes in the DOM arena. Never reused within a document.
pub type NodeId = u64;

/// Elements that never have children or an end tag.
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Elements whose text content is serialized verbatim.
pub const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Document,
    Element {
        tag_name: String,
        attributes: Vec<(String, String)>,
    },
    Text(String),
    Comment(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub id: NodeId,
    pub kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn tag_name(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Element { tag_name, .. } => Some(tag_name.as_str()),
            _ => None,
        }
    }

    pub fn attributes(&self) -> &[(String, String)] {
        match &self.kind {
            NodeKind::Element { attributes, .. } => attributes,
            _ => &[],
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes()
            .iter()
            .find(|(candidate, _)| candidate.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn has_class(&self, class_name: &str) -> bool {
        self.attribute("class")
            .is_some_and(|classes| classes.split_ascii_whitespace().any(|c| c == class_name))
    }
}

/// Arena-backed document. Node `1` is always the document node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub title: String,
    pub root: NodeId,
    nodes: Vec<Node>,
}

impl Default for Document {
    fn default() -> Self {
        Self::empty()
    }
}

impl Document {
    pub fn empty() -> Self {
        Self {
            title: String::new(),
            root: 1,
            nodes: vec![Node {
                id: 1,
                kind: NodeKind::Document,
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        let index = usize::try_from(id).ok()?.checked_sub(1)?;
        self.nodes.get(index)
    }

    fn node_mut(&mut self, id: NodeId) -> LazyResult<&mut Node> {
        let index = usize::try_from(id)
            .ok()
            .and_then(|raw| raw.checked_sub(1))
            .filter(|index| *index < self.nodes.len())
            .ok_or_else(|| {
                LazyError::new("dom.unknown_node", format!("node {id} does not exist"))
            })?;
        Ok(&mut self.nodes[index])
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// First element child of the document node (`<html>` for parsed pages).
    pub fn document_element(&self) -> Option<NodeId> {
        self.node(self.root)?
            .children
            .iter()
            .copied()
            .find(|child| self.is_element(*child))
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        self.node(id).is_some_and(|node| node.tag_name().is_some())
    }

    pub fn create_element(&mut self, tag_name: &str) -> NodeId {
        self.push_node(NodeKind::Element {
            tag_name: tag_name.to_ascii_lowercase(),
            attributes: Vec::new(),
        })
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push_node(NodeKind::Text(text.to_owned()))
    }

    pub fn create_comment(&mut self, text: &str) -> NodeId {
        self.push_node(NodeKind::Comment(text.to_owned()))
    }

    fn push_node(&mut self, kind: NodeKind) -> NodeId {
        let id = self.nodes.len() as NodeId + 1;
        self.nodes.push(Node {
            id,
            kind,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    pub fn get_attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        self.node(node)?.attribute(name)
    }

    /// Sets or overwrites an attribute. Non-element nodes reject attributes.
    pub fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) -> LazyResult<()> {
        let target = self.node_mut(node)?;
        let NodeKind::Element { attributes, .. } = &mut target.kind else {
            return Err(LazyError::new(
                "dom.not_an_element",
                format!("node {node} cannot carry attribute `{name}`"),
            ));
        };

        let name = name.to_ascii_lowercase();
        match attributes.iter_mut().find(|(candidate, _)| *candidate == name) {
            Some((_, existing)) => value.clone_into(existing),
            None => attributes.push((name, value.to_owned())),
        }
        Ok(())
    }

    /// Returns whether an attribute was actually removed.
    pub fn remove_attribute(&mut self, node: NodeId, name: &str) -> LazyResult<bool> {
        let target = self.node_mut(node)?;
        let NodeKind::Element { attributes, .. } = &mut target.kind else {
            return Ok(false);
        };
        let before = attributes.len();
        attributes.retain(|(candidate, _)| !candidate.eq_ignore_ascii_case(name));
        Ok(attributes.len() != before)
    }

    pub fn parent_node(&self, node: NodeId) -> Option<NodeId> {
        self.node(node)?.parent
    }

    /// Appends `child` to `parent`, detaching it from any previous parent first.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> LazyResult<()> {
        self.ensure_insertable(parent, child)?;
        self.detach(child)?;
        self.node_mut(parent)?.children.push(child);
        self.node_mut(child)?.parent = Some(parent);
        Ok(())
    }

    /// Swaps `old_child` for `new_child` in `parent`'s child list.
    pub fn replace_child(
        &mut self,
        parent: NodeId,
        new_child: NodeId,
        old_child: NodeId,
    ) -> LazyResult<()> {
        if self.parent_node(old_child) != Some(parent) {
            return Err(LazyError::new(
                "dom.not_a_child",
                format!("node {old_child} is not a child of node {parent}"),
            ));
        }
        if new_child == old_child {
            return Ok(());
        }
        self.ensure_insertable(parent, new_child)?;
        self.detach(new_child)?;

        let siblings = &mut self.node_mut(parent)?.children;
        let Some(position) = siblings.iter().position(|id| *id == old_child) else {
            return Err(LazyError::new(
                "dom.corrupt_tree",
                format!("node {old_child} names {parent} as parent but is not listed there"),
            ));
        };
        siblings[position] = new_child;

        self.node_mut(new_child)?.parent = Some(parent);
        self.node_mut(old_child)?.parent = None;
        Ok(())
    }

    /// Removes `node` from its parent. A detached node is left as is.
    pub fn detach(&mut self, node: NodeId) -> LazyResult<()> {
        let Some(parent) = self.node_mut(node)?.parent.take() else {
            return Ok(());
        };
        self.node_mut(parent)?.children.retain(|id| *id != node);
        Ok(())
    }

    fn ensure_insertable(&self, parent: NodeId, child: NodeId) -> LazyResult<()> {
        let Some(node) = self.node(child) else {
            return Err(LazyError::new(
                "dom.unknown_node",
                format!("node {child} does not exist"),
            ));
        };
        // A childless node can only be its own ancestor.
        let cycle = if node.children.is_empty() {
            child == parent
        } else {
            self.is_inclusive_ancestor(child, parent)
        };
        if cycle {
            return Err(LazyError::new(
                "dom.hierarchy_request",
                format!("node {child} is an ancestor of node {parent}"),
            ));
        }
        Ok(())
    }

    fn is_inclusive_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut cursor = Some(node);
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self.parent_node(current);
        }
        false
    }

    /// Whether `node` is reachable from the document node.
    pub fn is_connected(&self, node: NodeId) -> bool {
        self.node(node).is_some() && self.is_inclusive_ancestor(self.root, node)
    }

    /// All nodes under `from` (inclusive) in tree order.
    pub fn descendants(&self, from: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![from];
        while let Some(current) = stack.pop() {
            let Some(node) = self.node(current) else {
                continue;
            };
            out.push(current);
            stack.extend(node.children.iter().rev().copied());
        }
        out
    }

    pub fn elements_by_class_name(&self, class_name: &str) -> Vec<NodeId> {
        if class_name.is_empty() {
            return Vec::new();
        }
        self.descendants(self.root)
            .into_iter()
            .filter(|id| self.node(*id).is_some_and(|node| node.has_class(class_name)))
            .collect()
    }

    pub fn elements_by_tag_name(&self, tag_name: &str) -> Vec<NodeId> {
        self.descendants(self.root)
            .into_iter()
            .filter(|id| {
                self.node(*id)
                    .and_then(Node::tag_name)
                    .is_some_and(|tag| tag.eq_ignore_ascii_case(tag_name))
            })
            .collect()
    }

    pub fn element_by_id(&self, id: &str) -> Option<NodeId> {
        self.descendants(self.root)
            .into_iter()
            .find(|node| self.get_attribute(*node, "id") == Some(id))
    }

    /// Concatenated text of all text descendants.
    pub fn text_content(&self, node: NodeId) -> String {
        let mut out = String::new();
        for id in self.descendants(node) {
            if let Some(Node {
                kind: NodeKind::Text(text),
                ..
            }) = self.node(id)
            {
                out.push_str(text);
            }
        }
        out
    }

    /// Serializes `node` and its subtree.
    pub fn outer_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.write_html(node, &mut out);
        out
    }

    /// Serializes the whole document.
    pub fn to_html(&self) -> String {
        self.outer_html(self.root)
    }

    fn write_html(&self, from: NodeId, out: &mut String) {
        let mut stack = vec![HtmlStep::Open {
            id: from,
            raw_text: false,
        }];

        while let Some(step) = stack.pop() {
            let (id, raw_text) = match step {
                HtmlStep::Open { id, raw_text } => (id, raw_text),
                HtmlStep::Close(tag_name) => {
                    out.push_str("</");
                    out.push_str(tag_name);
                    out.push('>');
                    continue;
                }
            };
            let Some(node) = self.node(id) else {
                continue;
            };

            match &node.kind {
                NodeKind::Document => {
                    push_children(&mut stack, &node.children, false);
                }
                NodeKind::Text(text) => {
                    if raw_text {
                        out.push_str(text);
                    } else {
                        out.push_str(&escape_text(text));
                    }
                }
                NodeKind::Comment(text) => {
                    out.push_str("<!--");
                    out.push_str(text);
                    out.push_str("-->");
                }
                NodeKind::Element {
                    tag_name,
                    attributes,
                } => {
                    out.push('<');
                    out.push_str(tag_name);
                    for (name, value) in attributes {
                        out.push(' ');
                        out.push_str(name);
                        out.push_str("=\"");
                        out.push_str(&escape_attribute(value));
                        out.push('"');
                    }
                    out.push('>');

                    if VOID_ELEMENTS.contains(&tag_name.as_str()) {
                        continue;
                    }

                    stack.push(HtmlStep::Close(tag_name));
                    let raw = RAW_TEXT_ELEMENTS.contains(&tag_name.as_str());
                    push_children(&mut stack, &node.children, raw);
                }
            }
        }
    }
}

/// Pending serializer work; the stack is popped from the end.
enum HtmlStep<'a> {
    Open { id: NodeId, raw_text: bool },
    Close(&'a str),
}

fn push_children(stack: &mut Vec<HtmlStep<'_>>, children: &[NodeId], raw_text: bool) {
    stack.extend(
        children
            .iter()
            .rev()
            .map(|id| HtmlStep::Open { id: *id, raw_text }),
    );
}

fn escape_text(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
    out
}

fn escape_attribute(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}
