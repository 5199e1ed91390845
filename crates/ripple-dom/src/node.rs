#![forbid(unsafe_code)]

//! Render nodes: the immutable tree snapshot a render pass produces.
//!
//! Attribute maps are `BTreeMap` so the attribute diff walks both sides in
//! one deterministic sorted merge. Trees are never mutated after a render
//! pass; the reconciler only compares two snapshots.

use std::collections::BTreeMap;
use std::fmt;

use ripple_reactive::ComponentId;

/// One node of a rendered tree.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Node {
    /// Text leaf.
    Text(String),
    /// Element with tag, attributes, and ordered children.
    Element(Element),
    /// Reference to a mounted child component; its subtree is reconciled
    /// under that component's own root.
    Component(ComponentId),
}

/// An element node.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Element {
    pub tag: String,
    /// Stable identity for list reconciliation; optional.
    #[cfg_attr(feature = "serde", serde(default))]
    pub key: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub attrs: BTreeMap<String, String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub children: Vec<Node>,
}

impl Element {
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            key: None,
            attrs: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    #[must_use]
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_child(mut self, child: impl Into<Node>) -> Self {
        self.children.push(child.into());
        self
    }

    #[must_use]
    pub fn with_children(mut self, children: impl IntoIterator<Item = Node>) -> Self {
        self.children.extend(children);
        self
    }
}

impl From<Element> for Node {
    fn from(element: Element) -> Self {
        Node::Element(element)
    }
}

impl Node {
    #[must_use]
    pub fn text(payload: impl Into<String>) -> Self {
        Node::Text(payload.into())
    }

    #[must_use]
    pub fn element(tag: impl Into<String>) -> Element {
        Element::new(tag)
    }

    #[must_use]
    pub fn component(id: ComponentId) -> Self {
        Node::Component(id)
    }

    /// Reconciliation key, if this is a keyed element.
    #[must_use]
    pub fn key(&self) -> Option<&str> {
        match self {
            Node::Element(el) => el.key.as_deref(),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_text(&self) -> bool {
        matches!(self, Node::Text(_))
    }

    /// Children of this node (empty for leaves).
    #[must_use]
    pub fn children(&self) -> &[Node] {
        match self {
            Node::Element(el) => &el.children,
            _ => &[],
        }
    }

    /// Total node count of this subtree, including `self`.
    #[must_use]
    pub fn node_count(&self) -> usize {
        match self {
            Node::Text(_) | Node::Component(_) => 1,
            Node::Element(el) => 1 + el.children.iter().map(Node::node_count).sum::<usize>(),
        }
    }

    /// Estimated heap footprint in bytes, including the subtree.
    #[must_use]
    pub fn size_bytes(&self) -> usize {
        let base = std::mem::size_of::<Node>();
        match self {
            Node::Text(s) => base + s.capacity(),
            Node::Component(_) => base,
            Node::Element(el) => {
                base + el.tag.capacity()
                    + el.key.as_ref().map_or(0, String::capacity)
                    + el.attrs
                        .iter()
                        .map(|(k, v)| k.capacity() + v.capacity())
                        .sum::<usize>()
                    + el.children.iter().map(Node::size_bytes).sum::<usize>()
            }
        }
    }
}

impl fmt::Display for Node {
    /// Compact single-line rendering, for logs and test failure output.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Text(s) => write!(f, "{s:?}"),
            Node::Component(id) => write!(f, "<{id}/>"),
            Node::Element(el) => {
                write!(f, "<{}", el.tag)?;
                if let Some(key) = &el.key {
                    write!(f, " key={key:?}")?;
                }
                for (name, value) in &el.attrs {
                    write!(f, " {name}={value:?}")?;
                }
                if el.children.is_empty() {
                    return f.write_str("/>");
                }
                f.write_str(">")?;
                for child in &el.children {
                    write!(f, "{child}")?;
                }
                write!(f, "</{}>", el.tag)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_chain() {
        let node: Node = Element::new("ul")
            .with_attr("class", "menu")
            .with_child(Element::new("li").with_key("a").with_child(Node::text("A")))
            .into();

        assert_eq!(node.node_count(), 3);
        assert_eq!(node.key(), None);
        assert_eq!(node.children()[0].key(), Some("a"));
    }

    #[test]
    fn display_round_trips_structure() {
        let node: Node = Element::new("p")
            .with_attr("id", "x")
            .with_child(Node::text("hi"))
            .into();
        assert_eq!(node.to_string(), r#"<p id="x">"hi"</p>"#);
    }

    #[test]
    fn component_reference_is_a_leaf() {
        let node = Node::component(ComponentId::new(5));
        assert_eq!(node.node_count(), 1);
        assert!(node.children().is_empty());
    }

    #[test]
    fn size_bytes_counts_subtree() {
        let leaf = Node::text("abc");
        let tree: Node = Element::new("div").with_child(leaf.clone()).into();
        assert!(tree.size_bytes() > leaf.size_bytes());
    }
}
