use crate::node::NodeId;
use crate::path::NodePath;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CollapseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Format error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Malformed node at {path}: {reason}")]
    MalformedNode { path: NodePath, reason: String },

    #[error("Cycle detected at {path}: node {id} is its own ancestor")]
    CyclicGraph { id: NodeId, path: NodePath },

    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid file magic")]
    InvalidFileMagic,

    #[error("Unsupported format version: {0}")]
    UnsupportedFormatVersion(u32),

    #[error("Missing format version")]
    MissingFormatVersion,
}

impl CollapseError {
    /// Field path of the offending node, when the error concerns one.
    pub fn path(&self) -> Option<&NodePath> {
        match self {
            CollapseError::MalformedNode { path, .. } | CollapseError::CyclicGraph { path, .. } => {
                Some(path)
            }
            _ => None,
        }
    }
}
