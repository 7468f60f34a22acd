use manifest_collapse::storage::{self, FILE_MAGIC, FORMAT_VERSION};
use manifest_collapse::{
    CollapseError, CollapseOptions, Graph, IngestOptions, Manifest, ObjectNode, PreserveAware,
    Scalar,
};
use serde_json::json;
use std::fs;

fn cleanup(path: &str) {
    let _ = fs::remove_file(path);
}

fn sample() -> Manifest {
    let mut graph = Graph::new();
    let name = graph.str("web");
    let empty = graph.null();
    let mut labels = ObjectNode::with_kind("Labels");
    labels.set_preserve(true);
    let labels = graph.object(labels);
    let meta = graph.object(
        ObjectNode::with_kind("ObjectMeta")
            .field("name", name)
            .field("namespace", empty)
            .field("labels", labels),
    );
    let root = graph.object(ObjectNode::with_kind("Deployment").field("metadata", meta));
    Manifest { root, graph }
}

#[test]
fn graph_document_round_trip() -> Result<(), Box<dyn std::error::Error>> {
    let path = "test_graph_round_trip.mcg";
    cleanup(path);

    let manifest = sample();
    storage::save(path, &manifest)?;
    let loaded = storage::load(path)?;

    assert_eq!(manifest, loaded);
    let options = CollapseOptions::default();
    assert_eq!(manifest.collapse(&options)?, loaded.collapse(&options)?);

    cleanup(path);
    Ok(())
}

#[test]
fn stored_document_carries_header() -> Result<(), Box<dyn std::error::Error>> {
    let path = "test_graph_header.mcg";
    cleanup(path);

    storage::save(path, &sample())?;
    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(path)?)?;
    assert_eq!(json["magic"], json!(FILE_MAGIC));
    assert_eq!(json["format_version"], json!(FORMAT_VERSION));

    cleanup(path);
    Ok(())
}

#[test]
fn header_validation() -> Result<(), Box<dyn std::error::Error>> {
    let path = "test_graph_header_validation.mcg";
    cleanup(path);

    storage::save(path, &sample())?;
    let original: serde_json::Value = serde_json::from_str(&fs::read_to_string(path)?)?;

    let mut no_magic = original.clone();
    if let Some(obj) = no_magic.as_object_mut() {
        obj.remove("magic");
    }
    fs::write(path, serde_json::to_string_pretty(&no_magic)?)?;
    let err = storage::load(path).expect_err("missing magic must fail");
    assert!(matches!(
        err.downcast_ref::<CollapseError>(),
        Some(CollapseError::InvalidFileMagic)
    ));

    let mut no_version = original.clone();
    if let Some(obj) = no_version.as_object_mut() {
        obj.remove("format_version");
    }
    fs::write(path, serde_json::to_string_pretty(&no_version)?)?;
    let err = storage::load(path).expect_err("missing version must fail");
    assert!(matches!(
        err.downcast_ref::<CollapseError>(),
        Some(CollapseError::MissingFormatVersion)
    ));

    let mut future = original;
    if let Some(obj) = future.as_object_mut() {
        obj.insert("format_version".to_string(), json!(FORMAT_VERSION + 1));
    }
    fs::write(path, serde_json::to_string_pretty(&future)?)?;
    let err = storage::load(path).expect_err("future version must fail");
    assert!(matches!(
        err.downcast_ref::<CollapseError>(),
        Some(CollapseError::UnsupportedFormatVersion(v)) if *v == FORMAT_VERSION + 1
    ));

    cleanup(path);
    Ok(())
}

#[test]
fn dangling_reference_rejected_on_load() -> Result<(), Box<dyn std::error::Error>> {
    let path = "test_graph_dangling.mcg";
    cleanup(path);

    let mut manifest = sample();
    let root = manifest.root;
    manifest.graph.set_field(root, "spec", 500)?;
    storage::save(path, &manifest)?;

    let err = storage::load(path).expect_err("dangling child must fail");
    assert!(matches!(
        err.downcast_ref::<CollapseError>(),
        Some(CollapseError::InvalidInput(_))
    ));

    cleanup(path);
    Ok(())
}

#[test]
fn missing_root_rejected_on_load() -> Result<(), Box<dyn std::error::Error>> {
    let path = "test_graph_missing_root.mcg";
    cleanup(path);

    let mut manifest = sample();
    manifest.root = 1000;
    storage::save(path, &manifest)?;

    let err = storage::load(path).expect_err("missing root must fail");
    assert!(matches!(
        err.downcast_ref::<CollapseError>(),
        Some(CollapseError::NodeNotFound(1000))
    ));

    cleanup(path);
    Ok(())
}

#[test]
fn cyclic_document_loads_but_fails_to_collapse() -> Result<(), Box<dyn std::error::Error>> {
    let path = "test_graph_cyclic.mcg";
    cleanup(path);

    let mut manifest = sample();
    let root = manifest.root;
    manifest.graph.set_field(root, "self", root)?;
    storage::save(path, &manifest)?;

    let loaded = storage::load(path)?;
    let err = loaded
        .collapse(&CollapseOptions::default())
        .expect_err("cycle must be reported");
    assert!(matches!(err, CollapseError::CyclicGraph { .. }));

    cleanup(path);
    Ok(())
}

#[test]
fn plain_json_manifest_import() -> Result<(), Box<dyn std::error::Error>> {
    let path = "test_plain_manifest.json";
    cleanup(path);

    let doc = json!({
        "apiVersion": "v1",
        "kind": "Service",
        "metadata": {"name": "web", "labels": {"preserve": true}},
        "spec": {"ports": [], "clusterIP": null}
    });
    fs::write(path, serde_json::to_string_pretty(&doc)?)?;

    let manifest = storage::load_json(path, &IngestOptions::default())?;
    let out = manifest
        .collapse(&CollapseOptions::default())?
        .ok_or("document survives")?;
    assert_eq!(out.field_names(), vec!["apiVersion", "kind", "metadata"]);

    cleanup(path);
    Ok(())
}

#[test]
fn unreadable_file_reports_error() {
    assert!(!storage::exists("test_graph_does_not_exist.mcg"));
    assert!(storage::load("test_graph_does_not_exist.mcg").is_err());
}

#[test]
fn non_finite_number_is_not_saved() -> Result<(), Box<dyn std::error::Error>> {
    let path = "test_graph_nan.mcg";
    cleanup(path);

    let mut manifest = sample();
    let root = manifest.root;
    let ratio = manifest.graph.scalar(Scalar::Float(f64::NAN));
    manifest.graph.set_field(root, "ratio", ratio)?;

    let err = storage::save(path, &manifest).expect_err("NaN has no JSON encoding");
    assert!(matches!(
        err.downcast_ref::<CollapseError>(),
        Some(CollapseError::InvalidInput(_))
    ));
    assert!(!storage::exists(path));

    cleanup(path);
    Ok(())
}
