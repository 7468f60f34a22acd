use serde::{Deserialize, Serialize};

pub type NodeId = u64;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Scalar {
    Null,
    Bool(bool),
    Int(i64),
    /// Integers above `i64::MAX`.
    UInt(u64),
    Float(f64),
    Str(String),
}

impl Scalar {
    /// Only `Null` is empty. Empty strings, zero and `false` are data.
    pub fn is_empty(&self) -> bool {
        matches!(self, Scalar::Null)
    }

    /// NaN and infinities have no encoding; every other scalar does.
    pub fn is_encodable(&self) -> bool {
        match self {
            Scalar::Float(f) => f.is_finite(),
            _ => true,
        }
    }
}

/// Capability of object-like nodes to opt out of collapsing when empty.
///
/// The flag is metadata steering the collapser; it is never part of the
/// encoded document.
pub trait PreserveAware {
    fn preserve(&self) -> Option<bool>;

    fn set_preserve(&mut self, preserve: bool);

    fn is_preserved(&self) -> bool {
        self.preserve() == Some(true)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ObjectNode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    pub fields: Vec<(String, NodeId)>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preserve: Option<bool>,
}

impl ObjectNode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_kind(kind: &str) -> Self {
        Self {
            kind: Some(kind.to_string()),
            ..Self::default()
        }
    }

    pub fn field(mut self, name: &str, child: NodeId) -> Self {
        self.fields.push((name.to_string(), child));
        self
    }

    pub fn get(&self, name: &str) -> Option<NodeId> {
        self.fields
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, id)| *id)
    }
}

impl PreserveAware for ObjectNode {
    fn preserve(&self) -> Option<bool> {
        self.preserve
    }

    fn set_preserve(&mut self, preserve: bool) {
        self.preserve = Some(preserve);
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Node {
    Scalar(Scalar),
    Object(ObjectNode),
    Collection(Vec<NodeId>),
}

/// Borrowed view of a node's shape, as seen by the evaluator and collapser.
#[derive(Debug, Clone, Copy)]
pub enum Shape<'a> {
    Scalar(&'a Scalar),
    Object(&'a ObjectNode),
    Collection(&'a [NodeId]),
}

impl<'a> From<&'a Node> for Shape<'a> {
    fn from(node: &'a Node) -> Self {
        match node {
            Node::Scalar(s) => Shape::Scalar(s),
            Node::Object(o) => Shape::Object(o),
            Node::Collection(items) => Shape::Collection(items),
        }
    }
}

/// A configuration model that can report the shape of each of its nodes.
pub trait NodeSource {
    /// `None` when `id` does not name a node of this source.
    fn shape(&self, id: NodeId) -> Option<Shape<'_>>;
}
