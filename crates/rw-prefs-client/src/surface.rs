//! Rendering surface abstraction.
//!
//! The reconciler never touches a document directly. It looks up regions,
//! reads attributes, replaces region HTML and flips the hidden marker class
//! through [`RenderSurface`]. [`MemorySurface`] is an in-memory element tree
//! implementing it.

use std::collections::BTreeMap;

use rw_prefs::markup::HIDDEN_CLASS;

/// Handle to an element on a surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// A heading eligible for the navigation index.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Heading {
    /// Element handle.
    pub node: NodeId,
    /// Heading level (2 or 3).
    pub level: u8,
    /// Anchor ID.
    pub id: String,
    /// Text content.
    pub text: String,
}

/// Operations the reconciler needs from a rendered page.
pub trait RenderSurface {
    /// Find an element by its `id` attribute.
    fn find_region(&self, id: &str) -> Option<NodeId>;

    /// Replace an element's content with HTML.
    fn set_html(&mut self, node: NodeId, html: &str);

    /// Add or remove the hidden marker class.
    fn set_visible(&mut self, node: NodeId, visible: bool);

    /// Check whether the element itself carries the hidden marker class.
    fn is_marked_hidden(&self, node: NodeId) -> bool;

    /// Parent element, `None` for a root.
    fn parent(&self, node: NodeId) -> Option<NodeId>;

    /// Attribute value.
    fn attribute(&self, node: NodeId, name: &str) -> Option<String>;

    /// Descendants of `within` carrying `class`, in document order.
    fn elements_with_class(&self, within: NodeId, class: &str) -> Vec<NodeId>;

    /// `h2`/`h3` descendants of `within`, in document order.
    fn headings(&self, within: NodeId) -> Vec<Heading>;

    /// Check whether the element or any ancestor is hidden.
    fn is_hidden(&self, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(node) = current {
            if self.is_marked_hidden(node) {
                return true;
            }
            current = self.parent(node);
        }
        false
    }
}

/// Element description used to build a [`MemorySurface`].
#[derive(Clone, Debug, Default)]
pub struct Element {
    tag: String,
    classes: Vec<String>,
    attributes: BTreeMap<String, String>,
    text: String,
}

impl Element {
    /// Create an element with a tag name.
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Self::default()
        }
    }

    /// Set the `id` attribute.
    #[must_use]
    pub fn with_id(self, id: impl Into<String>) -> Self {
        self.with_attr("id", id)
    }

    /// Add a class.
    #[must_use]
    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.classes.push(class.into());
        self
    }

    /// Set an attribute.
    #[must_use]
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Set the text content.
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }
}

#[derive(Debug)]
struct Node {
    element: Element,
    html: Option<String>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// In-memory element tree.
///
/// # Example
///
/// ```
/// use rw_prefs_client::{Element, MemorySurface, RenderSurface};
///
/// let mut surface = MemorySurface::new();
/// let content = surface.add_root(Element::new("div").with_id("rw-content"));
/// let block = surface.add_child(content, Element::new("div").with_class("rw-hidden"));
/// let heading = surface.add_child(block, Element::new("h2").with_id("setup").with_text("Setup"));
///
/// assert_eq!(surface.find_region("rw-content"), Some(content));
/// assert!(surface.is_hidden(heading));
/// ```
#[derive(Debug, Default)]
pub struct MemorySurface {
    nodes: Vec<Node>,
    roots: Vec<NodeId>,
}

impl MemorySurface {
    /// Create an empty surface.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a top-level element.
    pub fn add_root(&mut self, element: Element) -> NodeId {
        let id = self.push(element, None);
        self.roots.push(id);
        id
    }

    /// Add an element as the last child of `parent`.
    pub fn add_child(&mut self, parent: NodeId, element: Element) -> NodeId {
        let id = self.push(element, Some(parent));
        self.nodes[parent.0].children.push(id);
        id
    }

    /// HTML last written to an element with [`RenderSurface::set_html`].
    #[must_use]
    pub fn html(&self, node: NodeId) -> Option<&str> {
        self.nodes[node.0].html.as_deref()
    }

    /// Check whether an element carries a class.
    #[must_use]
    pub fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.nodes[node.0].element.classes.iter().any(|c| c == class)
    }

    fn push(&mut self, element: Element, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            element,
            html: None,
            parent,
            children: Vec::new(),
        });
        id
    }

    /// Descendants of `node` in document order (excluding `node`).
    fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut stack: Vec<NodeId> = self.nodes[node.0].children.iter().rev().copied().collect();
        while let Some(current) = stack.pop() {
            result.push(current);
            stack.extend(self.nodes[current.0].children.iter().rev().copied());
        }
        result
    }

    fn attached(&self) -> Vec<NodeId> {
        let mut result = Vec::new();
        for &root in &self.roots {
            result.push(root);
            result.extend(self.descendants(root));
        }
        result
    }
}

impl RenderSurface for MemorySurface {
    fn find_region(&self, id: &str) -> Option<NodeId> {
        self.attached()
            .into_iter()
            .find(|node| self.nodes[node.0].element.attributes.get("id").is_some_and(|v| v == id))
    }

    fn set_html(&mut self, node: NodeId, html: &str) {
        let children = std::mem::take(&mut self.nodes[node.0].children);
        for child in children {
            self.nodes[child.0].parent = None;
        }
        self.nodes[node.0].html = Some(html.to_owned());
    }

    fn set_visible(&mut self, node: NodeId, visible: bool) {
        let classes = &mut self.nodes[node.0].element.classes;
        classes.retain(|c| c != HIDDEN_CLASS);
        if !visible {
            classes.push(HIDDEN_CLASS.to_owned());
        }
    }

    fn is_marked_hidden(&self, node: NodeId) -> bool {
        self.has_class(node, HIDDEN_CLASS)
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes[node.0].parent
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.nodes[node.0].element.attributes.get(name).cloned()
    }

    fn elements_with_class(&self, within: NodeId, class: &str) -> Vec<NodeId> {
        self.descendants(within)
            .into_iter()
            .filter(|&node| self.has_class(node, class))
            .collect()
    }

    fn headings(&self, within: NodeId) -> Vec<Heading> {
        self.descendants(within)
            .into_iter()
            .filter_map(|node| {
                let element = &self.nodes[node.0].element;
                let level = match element.tag.as_str() {
                    "h2" => 2,
                    "h3" => 3,
                    _ => return None,
                };
                Some(Heading {
                    node,
                    level,
                    id: element.attributes.get("id").cloned().unwrap_or_default(),
                    text: element.text.clone(),
                })
            })
            .collect()
    }
}
