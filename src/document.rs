//! Arena element tree. Nodes are addressed by [`NodeId`], which is also
//! the identity used for geometry and paint caching.

use std::collections::HashMap;

use crate::path_data::PathSegment;
use crate::style::StyleSnapshot;
use crate::types::Matrix;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ElementKind {
    Svg,
    Group,
    Defs,
    Use { instance_root: Option<NodeId> },
    Path { segments: Vec<PathSegment> },
    Rect,
    Circle,
    Ellipse,
    Line,
    Polyline,
    Polygon,
    LinearGradient,
    RadialGradient,
    Stop,
    ClipPath,
    Unknown(String),
}

impl ElementKind {
    pub fn from_tag(name: &str) -> Self {
        match name {
            "svg" => ElementKind::Svg,
            "g" => ElementKind::Group,
            "defs" => ElementKind::Defs,
            "use" => ElementKind::Use {
                instance_root: None,
            },
            "path" => ElementKind::Path {
                segments: Vec::new(),
            },
            "rect" => ElementKind::Rect,
            "circle" => ElementKind::Circle,
            "ellipse" => ElementKind::Ellipse,
            "line" => ElementKind::Line,
            "polyline" => ElementKind::Polyline,
            "polygon" => ElementKind::Polygon,
            "linearGradient" => ElementKind::LinearGradient,
            "radialGradient" => ElementKind::RadialGradient,
            "stop" => ElementKind::Stop,
            "clipPath" => ElementKind::ClipPath,
            other => ElementKind::Unknown(other.to_string()),
        }
    }

    pub fn tag_name(&self) -> &str {
        match self {
            ElementKind::Svg => "svg",
            ElementKind::Group => "g",
            ElementKind::Defs => "defs",
            ElementKind::Use { .. } => "use",
            ElementKind::Path { .. } => "path",
            ElementKind::Rect => "rect",
            ElementKind::Circle => "circle",
            ElementKind::Ellipse => "ellipse",
            ElementKind::Line => "line",
            ElementKind::Polyline => "polyline",
            ElementKind::Polygon => "polygon",
            ElementKind::LinearGradient => "linearGradient",
            ElementKind::RadialGradient => "radialGradient",
            ElementKind::Stop => "stop",
            ElementKind::ClipPath => "clipPath",
            ElementKind::Unknown(name) => name,
        }
    }

    pub fn is_gradient(&self) -> bool {
        matches!(
            self,
            ElementKind::LinearGradient | ElementKind::RadialGradient
        )
    }
}

#[derive(Debug, Clone)]
pub struct Node {
    pub kind: ElementKind,
    pub id: Option<String>,
    pub attributes: Vec<(String, String)>,
    pub style: StyleSnapshot,
    /// `transform` (or `gradientTransform` on gradients).
    pub transform: Matrix,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    pub fn new(kind: ElementKind) -> Self {
        Self {
            kind,
            id: None,
            attributes: Vec::new(),
            style: StyleSnapshot::default(),
            transform: Matrix::identity(),
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    pub fn with_style(mut self, style: StyleSnapshot) -> Self {
        self.style = style;
        self
    }

    pub fn with_transform(mut self, transform: Matrix) -> Self {
        self.transform = transform;
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn tag_name(&self) -> &str {
        self.kind.tag_name()
    }
}

#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    ids: HashMap<String, NodeId>,
}

impl Document {
    pub fn new(root: Node) -> Self {
        let mut doc = Self {
            nodes: Vec::new(),
            ids: HashMap::new(),
        };
        doc.insert(None, root);
        doc
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// First element in document order carrying `id`.
    pub fn get_element_by_id(&self, id: &str) -> Option<NodeId> {
        self.ids.get(id).copied()
    }

    pub fn append(&mut self, parent: NodeId, node: Node) -> NodeId {
        let child = self.insert(Some(parent), node);
        self.nodes[parent.0].children.push(child);
        child
    }

    /// Points a `use` element at its instance root. No-op for other kinds.
    pub fn set_instance_root(&mut self, use_node: NodeId, target: NodeId) {
        if let ElementKind::Use { instance_root } = &mut self.nodes[use_node.0].kind {
            *instance_root = Some(target);
        }
    }

    /// Local-reference lookup for `#id` strings.
    pub fn resolve_local_ref(&self, reference: &str) -> Option<NodeId> {
        let id = reference.trim().strip_prefix('#')?;
        self.get_element_by_id(id)
    }

    /// Pre-order walk of `id` and everything below it.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev().copied());
        }
        out
    }

    fn insert(&mut self, parent: Option<NodeId>, mut node: Node) -> NodeId {
        let id = NodeId(self.nodes.len());
        node.parent = parent;
        node.children.clear();
        if let Some(key) = node.id.clone() {
            self.ids.entry(key).or_insert(id);
        }
        self.nodes.push(node);
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_links_parent_and_children() {
        let mut doc = Document::new(Node::new(ElementKind::Svg));
        let g = doc.append(doc.root(), Node::new(ElementKind::Group).with_id("g"));
        let r = doc.append(g, Node::new(ElementKind::Rect).with_attribute("width", "10"));
        assert_eq!(doc.children(doc.root()), &[g]);
        assert_eq!(doc.parent(r), Some(g));
        assert_eq!(doc.node(r).attribute("width"), Some("10"));
        assert_eq!(doc.get_element_by_id("g"), Some(g));
        assert_eq!(doc.resolve_local_ref("#g"), Some(g));
        assert_eq!(doc.resolve_local_ref("g"), None);
        assert_eq!(doc.descendants(doc.root()), vec![doc.root(), g, r]);
    }

    #[test]
    fn first_duplicate_id_wins() {
        let mut doc = Document::new(Node::new(ElementKind::Svg));
        let a = doc.append(doc.root(), Node::new(ElementKind::Rect).with_id("dup"));
        doc.append(doc.root(), Node::new(ElementKind::Circle).with_id("dup"));
        assert_eq!(doc.get_element_by_id("dup"), Some(a));
    }

    #[test]
    fn tag_round_trip() {
        for tag in ["svg", "g", "use", "path", "linearGradient", "clipPath", "foo"] {
            assert_eq!(ElementKind::from_tag(tag).tag_name(), tag);
        }
    }
}
