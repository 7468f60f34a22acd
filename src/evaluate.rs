use crate::error::CollapseError;
use crate::node::{NodeId, NodeSource, Shape};
use crate::path::NodePath;
use crate::policy::SerializationPolicy;
use std::collections::{HashMap, HashSet};
use tracing::{trace, warn};

/// Deepest nesting accepted below a root, counted in fields and elements.
pub const MAX_DEPTH: usize = 256;

/// Bottom-up emptiness verdicts for one invocation.
///
/// Verdicts are memoized by node id so shared subtrees are classified once.
/// Every child is visited even after a non-empty sibling was found, which
/// keeps the cycle guard complete for everything reachable from the root.
///
/// Each verdict is stored with the height of its subtree, so a memoized node
/// reached along a longer path is still held to [`MAX_DEPTH`]. Once a root
/// has been evaluated, every path below it is known to be within the limit.
///
/// Fields excluded by the [`SerializationPolicy`] are not visited and do not
/// count toward their object's emptiness.
pub struct Evaluator<'s, S: NodeSource + ?Sized> {
    source: &'s S,
    policy: SerializationPolicy,
    memo: HashMap<NodeId, bool>,
    heights: HashMap<NodeId, usize>,
    visiting: HashSet<NodeId>,
}

impl<'s, S: NodeSource + ?Sized> Evaluator<'s, S> {
    /// Evaluator that sees every field.
    pub fn new(source: &'s S) -> Self {
        Self::with_policy(source, SerializationPolicy::empty())
    }

    pub fn with_policy(source: &'s S, policy: SerializationPolicy) -> Self {
        Self {
            source,
            policy,
            memo: HashMap::new(),
            heights: HashMap::new(),
            visiting: HashSet::new(),
        }
    }

    pub fn source(&self) -> &'s S {
        self.source
    }

    pub fn policy(&self) -> &SerializationPolicy {
        &self.policy
    }

    pub fn is_empty(&mut self, id: NodeId) -> Result<bool, CollapseError> {
        self.is_empty_at(id, &NodePath::root())
    }

    /// Verdict for `id` reached through `path`. A failed call leaves the memo
    /// intact but forgets the partially visited chain.
    pub fn is_empty_at(&mut self, id: NodeId, path: &NodePath) -> Result<bool, CollapseError> {
        let verdict = self.visit(id, path);
        if verdict.is_err() {
            self.visiting.clear();
        }
        verdict
    }

    fn visit(&mut self, id: NodeId, path: &NodePath) -> Result<bool, CollapseError> {
        let depth = path.segments().len();
        if let Some(verdict) = self.memo.get(&id) {
            if depth + self.height(id) > MAX_DEPTH {
                return Err(too_deep(path));
            }
            return Ok(*verdict);
        }
        if depth > MAX_DEPTH {
            return Err(too_deep(path));
        }
        if !self.visiting.insert(id) {
            warn!(node = id, path = %path, "cycle in configuration graph");
            return Err(CollapseError::CyclicGraph {
                id,
                path: path.clone(),
            });
        }

        let source = self.source;
        let mut height = 0;
        let verdict = match source.shape(id) {
            None => Err(malformed(path, format!("node {} does not exist", id))),
            Some(Shape::Scalar(value)) if !value.is_encodable() => {
                Err(malformed(path, format!("{:?} cannot be encoded", value)))
            }
            Some(Shape::Scalar(value)) => Ok(value.is_empty()),
            Some(Shape::Collection(items)) => {
                let mut empty = true;
                for (i, child) in items.iter().enumerate() {
                    empty &= self.visit(*child, &path.index(i))?;
                    height = height.max(1 + self.height(*child));
                }
                Ok(empty)
            }
            Some(Shape::Object(object)) => {
                let mut seen = HashSet::new();
                let mut empty = true;
                for (name, child) in &object.fields {
                    if !seen.insert(name.as_str()) {
                        return Err(malformed(path, format!("duplicate field '{}'", name)));
                    }
                    if !self.policy.is_included(name) {
                        continue;
                    }
                    empty &= self.visit(*child, &path.field(name))?;
                    height = height.max(1 + self.height(*child));
                }
                Ok(empty)
            }
        }?;

        self.visiting.remove(&id);
        self.memo.insert(id, verdict);
        self.heights.insert(id, height);
        trace!(node = id, path = %path, empty = verdict, "emptiness verdict");
        Ok(verdict)
    }

    fn height(&self, id: NodeId) -> usize {
        self.heights.get(&id).copied().unwrap_or(0)
    }

    /// Verdicts computed so far, keyed by node id.
    pub fn verdicts(&self) -> &HashMap<NodeId, bool> {
        &self.memo
    }
}

fn too_deep(path: &NodePath) -> CollapseError {
    malformed(path, format!("nesting exceeds {} levels", MAX_DEPTH))
}

pub(crate) fn malformed(path: &NodePath, reason: String) -> CollapseError {
    warn!(path = %path, reason = %reason, "malformed configuration node");
    CollapseError::MalformedNode {
        path: path.clone(),
        reason,
    }
}

/// Structural emptiness of `root`, with a fresh memo for this call.
pub fn is_empty<S: NodeSource + ?Sized>(source: &S, root: NodeId) -> Result<bool, CollapseError> {
    Evaluator::new(source).is_empty(root)
}
