use crate::error::CollapseError;
use crate::evaluate::{Evaluator, malformed};
use crate::node::{NodeId, NodeSource, PreserveAware, Shape};
use crate::output::Output;
use crate::path::NodePath;
use crate::policy::SerializationPolicy;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// What to do with a root that collapses away.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RootPolicy {
    /// An empty, non-preserved root yields no document at all.
    #[default]
    Omit,
    /// The root is always emitted with whatever survives beneath it.
    Keep,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CollapseOptions {
    pub root: RootPolicy,
    /// Fields this table excludes are dropped before emptiness is judged.
    /// Settings files carry the table separately, next to the ingest key it
    /// is derived from.
    #[serde(skip)]
    pub policy: SerializationPolicy,
}

impl CollapseOptions {
    pub fn keep_root() -> Self {
        Self {
            root: RootPolicy::Keep,
            ..Self::default()
        }
    }

    pub fn with_policy(mut self, policy: SerializationPolicy) -> Self {
        self.policy = policy;
        self
    }
}

pub struct Collapser<'s, S: NodeSource + ?Sized> {
    evaluator: Evaluator<'s, S>,
    options: CollapseOptions,
}

impl<'s, S: NodeSource + ?Sized> Collapser<'s, S> {
    pub fn new(source: &'s S, options: CollapseOptions) -> Self {
        Self {
            evaluator: Evaluator::with_policy(source, options.policy.clone()),
            options,
        }
    }

    pub fn collapse(&mut self, root: NodeId) -> Result<Option<Output>, CollapseError> {
        let path = NodePath::root();
        // Classifies everything reachable and rejects cycles and over-deep
        // nesting before any output is built.
        let empty = self.evaluator.is_empty_at(root, &path)?;
        debug!(root, empty, policy = ?self.options.root, "collapsing document");

        let keep = self.options.root == RootPolicy::Keep;
        let output = self.node(root, &path, keep)?;
        if output.is_none() {
            debug!(root, "document collapsed away entirely");
        }
        Ok(output)
    }

    fn node(
        &mut self,
        id: NodeId,
        path: &NodePath,
        force: bool,
    ) -> Result<Option<Output>, CollapseError> {
        let empty = self.evaluator.is_empty_at(id, path)?;
        let shape = self
            .evaluator
            .source()
            .shape(id)
            .ok_or_else(|| malformed(path, format!("node {} does not exist", id)))?;

        match shape {
            Shape::Scalar(value) => {
                if empty && !force {
                    return Ok(None);
                }
                Ok(Some(Output::Scalar(value.clone())))
            }
            Shape::Collection(items) => {
                if empty && !force {
                    return Ok(None);
                }
                let mut out = Vec::with_capacity(items.len());
                for (i, child) in items.iter().enumerate() {
                    if let Some(item) = self.node(*child, &path.index(i), false)? {
                        out.push(item);
                    }
                }
                Ok(Some(Output::Collection(out)))
            }
            Shape::Object(object) => {
                let preserve = object.is_preserved();
                if empty && !preserve && !force {
                    return Ok(None);
                }
                let mut fields = Vec::with_capacity(object.fields.len());
                for (name, child) in &object.fields {
                    if !self.options.policy.is_included(name) {
                        continue;
                    }
                    if let Some(value) = self.node(*child, &path.field(name), false)? {
                        fields.push((name.clone(), value));
                    }
                }
                Ok(Some(Output::Object {
                    kind: object.kind.clone(),
                    fields,
                    preserve,
                }))
            }
        }
    }
}

/// Collapse the document rooted at `root`. `None` means nothing is left to
/// encode.
pub fn collapse<S: NodeSource + ?Sized>(
    source: &S,
    root: NodeId,
    options: &CollapseOptions,
) -> Result<Option<Output>, CollapseError> {
    Collapser::new(source, options.clone()).collapse(root)
}
