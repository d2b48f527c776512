//! # Petrel DOM
//!
//! Arena-backed DOM tree and the incremental builder that constructs it
//! from tokenizer events while resolving each element's cascaded style.
//!
//! Nodes are addressed by [`NodeId`] into a flat arena owned by
//! [`Document`]; the builder can therefore hand a completed subtree to the
//! layout collaborator while the rest of the tree is still growing.

pub mod builder;

pub use builder::{build_document, DocumentBuilder};

use petrel_css::ComputedStyle;
use petrel_html::Attribute;
use thiserror::Error;

/// Errors that can occur during tree construction.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomError {
    /// An end tag did not name the element on top of the open stack.
    /// Fatal: parsing stops, the stack is left untouched.
    #[error("end tag </{found}> does not match open element <{expected}>")]
    TagMismatch { expected: String, found: String },
}

/// Unique identifier for a DOM node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

impl NodeId {
    pub fn new(id: usize) -> Self {
        Self(id)
    }

    pub fn raw(&self) -> usize {
        self.0
    }
}

/// Kind of DOM node.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Synthetic root; created at parser start, never popped.
    Document,
    Element {
        tag_name: String,
        attributes: Vec<Attribute>,
        computed_style: ComputedStyle,
    },
    Text(String),
}

/// A DOM node.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub kind: NodeKind,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

impl Node {
    /// Tag name for element nodes.
    pub fn tag_name(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Element { tag_name, .. } => Some(tag_name),
            _ => None,
        }
    }

    /// Attribute value by exact name.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        match &self.kind {
            NodeKind::Element { attributes, .. } => attributes
                .iter()
                .find(|a| a.name == name)
                .map(|a| a.value.as_str()),
            _ => None,
        }
    }

    /// Computed style for element nodes.
    pub fn computed_style(&self) -> Option<&ComputedStyle> {
        match &self.kind {
            NodeKind::Element { computed_style, .. } => Some(computed_style),
            _ => None,
        }
    }

    /// Character data for text nodes.
    pub fn text(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Text(content) => Some(content),
            _ => None,
        }
    }

    pub fn is_element(&self) -> bool {
        matches!(self.kind, NodeKind::Element { .. })
    }

    pub fn is_text(&self) -> bool {
        matches!(self.kind, NodeKind::Text(_))
    }
}

/// A DOM document: a node arena rooted at a synthetic document node.
#[derive(Debug)]
pub struct Document {
    nodes: Vec<Node>,
}

impl Document {
    /// Create a document holding only the root node.
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                id: NodeId::new(0),
                kind: NodeKind::Document,
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    /// The synthetic root node.
    pub fn root(&self) -> NodeId {
        NodeId::new(0)
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.raw()]
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Child ids of a node, in document order.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    /// Append a new node under `parent` and return its id.
    pub fn append_child(&mut self, parent: NodeId, kind: NodeKind) -> NodeId {
        let id = NodeId::new(self.nodes.len());
        self.nodes.push(Node {
            id,
            kind,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent.raw()].children.push(id);
        id
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.raw()]
    }

    /// Concatenated text of a subtree, depth-first.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        match &self.node(id).kind {
            NodeKind::Text(content) => out.push_str(content),
            _ => {
                for &child in self.children(id) {
                    self.collect_text(child, out);
                }
            }
        }
    }

    /// First element whose `id` attribute equals `id`.
    pub fn get_element_by_id(&self, id: &str) -> Option<NodeId> {
        self.nodes
            .iter()
            .find(|n| n.attribute("id") == Some(id))
            .map(|n| n.id)
    }

    /// All elements with the given tag name, in document order.
    pub fn get_elements_by_tag_name(&self, tag_name: &str) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|n| n.tag_name() == Some(tag_name))
            .map(|n| n.id)
            .collect()
    }

    /// Visit every node depth-first, root first.
    pub fn traverse<F>(&self, mut callback: F)
    where
        F: FnMut(&Node),
    {
        self.traverse_node(self.root(), &mut callback);
    }

    fn traverse_node<F>(&self, id: NodeId, callback: &mut F)
    where
        F: FnMut(&Node),
    {
        callback(self.node(id));
        for &child in self.children(id) {
            self.traverse_node(child, callback);
        }
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

/// Layout collaborator: called once per closing element, after its subtree
/// is fully built and before it leaves the open stack. Opaque to this
/// crate; no return value is consumed.
pub trait Layout {
    fn layout(&mut self, document: &Document, element: NodeId);
}

/// Layout implementation that does nothing.
#[derive(Debug, Default)]
pub struct NoLayout;

impl Layout for NoLayout {
    fn layout(&mut self, _document: &Document, _element: NodeId) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_and_query() {
        let mut doc = Document::new();
        let root = doc.root();
        let div = doc.append_child(
            root,
            NodeKind::Element {
                tag_name: "div".to_string(),
                attributes: vec![Attribute {
                    name: "id".to_string(),
                    value: "main".to_string(),
                }],
                computed_style: ComputedStyle::new(),
            },
        );
        let text = doc.append_child(div, NodeKind::Text("hello".to_string()));

        assert_eq!(doc.get_element_by_id("main"), Some(div));
        assert_eq!(doc.get_elements_by_tag_name("div"), vec![div]);
        assert_eq!(doc.text_content(root), "hello");
        assert_eq!(doc.node(text).parent, Some(div));
        assert_eq!(doc.children(div), &[text]);
    }

    #[test]
    fn traverse_is_depth_first() {
        let mut doc = Document::new();
        let root = doc.root();
        let a = doc.append_child(
            root,
            NodeKind::Element {
                tag_name: "a".to_string(),
                attributes: vec![],
                computed_style: ComputedStyle::new(),
            },
        );
        doc.append_child(
            a,
            NodeKind::Element {
                tag_name: "b".to_string(),
                attributes: vec![],
                computed_style: ComputedStyle::new(),
            },
        );
        doc.append_child(
            root,
            NodeKind::Element {
                tag_name: "c".to_string(),
                attributes: vec![],
                computed_style: ComputedStyle::new(),
            },
        );

        let mut seen = Vec::new();
        doc.traverse(|node| {
            if let Some(tag) = node.tag_name() {
                seen.push(tag.to_string());
            }
        });
        assert_eq!(seen, vec!["a", "b", "c"]);
    }
}
