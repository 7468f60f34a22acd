use crate::error::CollapseError;
use crate::graph::{Graph, IngestOptions, Manifest};
use crate::node::{Node, NodeId};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const FILE_MAGIC: &str = "MCOLLAPSE";
pub const FORMAT_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct StorageFormat {
    #[serde(default)]
    magic: Option<String>,
    #[serde(default)]
    format_version: Option<u32>,
    root: NodeId,
    graph: Graph,
}

pub fn save(path: &str, manifest: &Manifest) -> Result<()> {
    // JSON has no spelling for NaN or infinity; such a node would come back as null.
    let unencodable = manifest
        .graph
        .nodes
        .iter()
        .filter(|(_, node)| matches!(node, Node::Scalar(value) if !value.is_encodable()))
        .map(|(id, _)| *id)
        .min();
    if let Some(id) = unencodable {
        return Err(CollapseError::InvalidInput(format!(
            "node {} holds a non-finite number",
            id
        ))
        .into());
    }

    let sf = StorageFormat {
        magic: Some(FILE_MAGIC.to_string()),
        format_version: Some(FORMAT_VERSION),
        root: manifest.root,
        graph: manifest.graph.clone(),
    };

    let data = serde_json::to_string_pretty(&sf)?;
    fs::write(path, data).with_context(|| format!("Failed to write to file: {}", path))?;
    Ok(())
}

pub fn load(path: &str) -> Result<Manifest> {
    let data =
        fs::read_to_string(path).with_context(|| format!("Failed to read file: {}", path))?;
    let sf: StorageFormat = serde_json::from_str(&data)
        .map_err(CollapseError::from)
        .with_context(|| format!("Failed to parse graph document: {}", path))?;

    match sf.magic.as_deref() {
        Some(FILE_MAGIC) => {}
        _ => return Err(CollapseError::InvalidFileMagic.into()),
    }
    match sf.format_version {
        None => return Err(CollapseError::MissingFormatVersion.into()),
        Some(FORMAT_VERSION) => {}
        Some(other) => return Err(CollapseError::UnsupportedFormatVersion(other).into()),
    }

    let manifest = Manifest {
        root: sf.root,
        graph: sf.graph,
    };
    manifest.validate()?;
    Ok(manifest)
}

/// Read a plain JSON manifest (not a stored graph document).
pub fn load_json(path: &str, options: &IngestOptions) -> Result<Manifest> {
    let data =
        fs::read_to_string(path).with_context(|| format!("Failed to read file: {}", path))?;
    let value: serde_json::Value = serde_json::from_str(&data)
        .map_err(CollapseError::from)
        .with_context(|| format!("Failed to parse JSON manifest: {}", path))?;
    let manifest = Manifest::from_json(&value, options)?;
    Ok(manifest)
}

pub fn exists(path: &str) -> bool {
    Path::new(path).exists()
}
