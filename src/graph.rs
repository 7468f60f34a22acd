use crate::collapse::{CollapseOptions, collapse};
use crate::error::CollapseError;
use crate::evaluate::is_empty;
use crate::node::{Node, NodeId, NodeSource, ObjectNode, PreserveAware, Scalar, Shape};
use crate::output::Output;
use crate::path::NodePath;
use crate::policy::{PRESERVE_FIELD, SerializationPolicy};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct IngestOptions {
    /// Object key whose boolean value becomes the preserve flag.
    pub preserve_key: String,
}

impl IngestOptions {
    /// Encoding table that keeps this options' preserve key out of the output.
    pub fn policy(&self) -> SerializationPolicy {
        SerializationPolicy::for_preserve_key(&self.preserve_key)
    }
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            preserve_key: PRESERVE_FIELD.to_string(),
        }
    }
}

/// Arena of configuration nodes addressed by id.
///
/// A node may be referenced from several parents, and back-references can be
/// created with [`Graph::set_field`]; the evaluator rejects the latter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Graph {
    pub nodes: HashMap<NodeId, Node>,
    pub next_node_id: NodeId,
}

impl Graph {
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            next_node_id: 1,
        }
    }

    pub fn insert(&mut self, node: Node) -> NodeId {
        let id = self.next_node_id;
        self.next_node_id += 1;
        self.nodes.insert(id, node);
        id
    }

    pub fn scalar(&mut self, value: Scalar) -> NodeId {
        self.insert(Node::Scalar(value))
    }

    pub fn null(&mut self) -> NodeId {
        self.scalar(Scalar::Null)
    }

    pub fn str(&mut self, value: &str) -> NodeId {
        self.scalar(Scalar::Str(value.to_string()))
    }

    pub fn object(&mut self, object: ObjectNode) -> NodeId {
        self.insert(Node::Object(object))
    }

    pub fn collection(&mut self, items: Vec<NodeId>) -> NodeId {
        self.insert(Node::Collection(items))
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn object_mut(&mut self, id: NodeId) -> Result<&mut ObjectNode, CollapseError> {
        match self.nodes.get_mut(&id) {
            Some(Node::Object(object)) => Ok(object),
            Some(_) => Err(CollapseError::InvalidInput(format!(
                "node {} is not an object",
                id
            ))),
            None => Err(CollapseError::NodeNotFound(id)),
        }
    }

    pub fn set_preserve(&mut self, id: NodeId, preserve: bool) -> Result<(), CollapseError> {
        self.object_mut(id)?.set_preserve(preserve);
        Ok(())
    }

    /// Point field `name` of object `id` at `child`, replacing an existing
    /// field of that name in place.
    pub fn set_field(&mut self, id: NodeId, name: &str, child: NodeId) -> Result<(), CollapseError> {
        let object = self.object_mut(id)?;
        match object.fields.iter_mut().find(|(key, _)| key == name) {
            Some(field) => field.1 = child,
            None => object.fields.push((name.to_string(), child)),
        }
        Ok(())
    }

    /// Build nodes for a JSON document and return the id of its root.
    pub fn import_json(
        &mut self,
        value: &serde_json::Value,
        options: &IngestOptions,
    ) -> Result<NodeId, CollapseError> {
        self.import_json_at(value, options, &NodePath::root())
    }

    fn import_json_at(
        &mut self,
        value: &serde_json::Value,
        options: &IngestOptions,
        path: &NodePath,
    ) -> Result<NodeId, CollapseError> {
        let node = match value {
            serde_json::Value::Null => Node::Scalar(Scalar::Null),
            serde_json::Value::Bool(b) => Node::Scalar(Scalar::Bool(*b)),
            serde_json::Value::Number(n) => Node::Scalar(number(n, path)?),
            serde_json::Value::String(s) => Node::Scalar(Scalar::Str(s.clone())),
            serde_json::Value::Array(items) => {
                let mut children = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    children.push(self.import_json_at(item, options, &path.index(i))?);
                }
                Node::Collection(children)
            }
            serde_json::Value::Object(map) => {
                let mut object = ObjectNode::new();
                for (key, item) in map {
                    if *key == options.preserve_key {
                        match item {
                            serde_json::Value::Bool(flag) => object.set_preserve(*flag),
                            serde_json::Value::Null => {}
                            _ => {
                                return Err(CollapseError::InvalidInput(format!(
                                    "'{}' at {} must be a boolean",
                                    key, path
                                )));
                            }
                        }
                        continue;
                    }
                    let child = self.import_json_at(item, options, &path.field(key))?;
                    object.fields.push((key.clone(), child));
                }
                Node::Object(object)
            }
        };
        Ok(self.insert(node))
    }

    /// Build nodes for a collapsed document, keeping kinds and preserve flags.
    pub fn import_output(&mut self, output: &Output) -> NodeId {
        let node = match output {
            Output::Scalar(value) => Node::Scalar(value.clone()),
            Output::Collection(items) => {
                Node::Collection(items.iter().map(|i| self.import_output(i)).collect())
            }
            Output::Object {
                kind,
                fields,
                preserve,
            } => {
                let mut object = ObjectNode {
                    kind: kind.clone(),
                    ..ObjectNode::default()
                };
                if *preserve {
                    object.set_preserve(true);
                }
                for (name, value) in fields {
                    let child = self.import_output(value);
                    object.fields.push((name.clone(), child));
                }
                Node::Object(object)
            }
        };
        self.insert(node)
    }
}

fn number(n: &serde_json::Number, path: &NodePath) -> Result<Scalar, CollapseError> {
    if let Some(i) = n.as_i64() {
        return Ok(Scalar::Int(i));
    }
    if let Some(u) = n.as_u64() {
        return Ok(Scalar::UInt(u));
    }
    match n.as_f64() {
        Some(f) if f.is_finite() => Ok(Scalar::Float(f)),
        _ => Err(CollapseError::InvalidInput(format!(
            "number {} at {} is not representable",
            n, path
        ))),
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeSource for Graph {
    fn shape(&self, id: NodeId) -> Option<Shape<'_>> {
        self.nodes.get(&id).map(Shape::from)
    }
}

/// A graph together with the root of the document it describes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Manifest {
    pub root: NodeId,
    pub graph: Graph,
}

impl Manifest {
    pub fn from_json(
        value: &serde_json::Value,
        options: &IngestOptions,
    ) -> Result<Self, CollapseError> {
        let mut graph = Graph::new();
        let root = graph.import_json(value, options)?;
        Ok(Self { root, graph })
    }

    pub fn from_output(output: &Output) -> Self {
        let mut graph = Graph::new();
        let root = graph.import_output(output);
        Self { root, graph }
    }

    pub fn is_empty(&self) -> Result<bool, CollapseError> {
        is_empty(&self.graph, self.root)
    }

    pub fn collapse(&self, options: &CollapseOptions) -> Result<Option<Output>, CollapseError> {
        collapse(&self.graph, self.root, options)
    }

    /// Referential integrity of the whole arena, reachable or not.
    pub fn validate(&self) -> Result<(), CollapseError> {
        if !self.graph.nodes.contains_key(&self.root) {
            return Err(CollapseError::NodeNotFound(self.root));
        }

        let mut ids: Vec<NodeId> = self.graph.nodes.keys().copied().collect();
        ids.sort_unstable();
        for id in &ids {
            let children: Vec<NodeId> = match &self.graph.nodes[id] {
                Node::Scalar(_) => Vec::new(),
                Node::Collection(items) => items.clone(),
                Node::Object(object) => object.fields.iter().map(|(_, c)| *c).collect(),
            };
            for child in children {
                if !self.graph.nodes.contains_key(&child) {
                    return Err(CollapseError::InvalidInput(format!(
                        "node {} references missing node {}",
                        id, child
                    )));
                }
            }
        }

        let max_id = ids.last().copied().unwrap_or(0);
        if self.graph.next_node_id <= max_id {
            return Err(CollapseError::InvalidInput(format!(
                "next_node_id {} <= max node id {}",
                self.graph.next_node_id, max_id
            )));
        }
        Ok(())
    }
}
