use manifest_collapse::policy::PRESERVE_FIELD;
use manifest_collapse::{
    CollapseOptions, Graph, IngestOptions, Manifest, ObjectNode, Output, Scalar,
    SerializationPolicy,
};
use serde_json::json;

fn collapsed(doc: serde_json::Value) -> Result<Output, Box<dyn std::error::Error>> {
    let manifest = Manifest::from_json(&doc, &IngestOptions::default())?;
    let out = manifest
        .collapse(&CollapseOptions::default())?
        .ok_or("document survives")?;
    Ok(out)
}

#[test]
fn preserve_attribute_is_never_encoded() -> Result<(), Box<dyn std::error::Error>> {
    let out = collapsed(json!({"name": "x", "meta": {"preserve": true}}))?;
    let encoded = out.to_json(&SerializationPolicy::default());
    assert_eq!(encoded, json!({"name": "x", "meta": {}}));
    assert!(!encoded.to_string().contains(PRESERVE_FIELD));
    Ok(())
}

#[test]
fn default_policy_drops_fields_named_preserve() -> Result<(), Box<dyn std::error::Error>> {
    let mut graph = Graph::new();
    let flag = graph.scalar(Scalar::Bool(true));
    let name = graph.str("x");
    let root = graph.object(
        ObjectNode::new()
            .field("name", name)
            .field(PRESERVE_FIELD, flag),
    );

    let collapsed = manifest_collapse::collapse(&graph, root, &CollapseOptions::default())?
        .ok_or("root survives")?;
    assert_eq!(collapsed.field_names(), vec!["name"]);

    let unfiltered = CollapseOptions::default().with_policy(SerializationPolicy::empty());
    let out = manifest_collapse::collapse(&graph, root, &unfiltered)?.ok_or("root survives")?;
    assert_eq!(
        out.to_json(&SerializationPolicy::default()),
        json!({"name": "x"})
    );
    assert_eq!(
        out.to_json(&SerializationPolicy::empty()),
        json!({"name": "x", "preserve": true})
    );
    Ok(())
}

#[test]
fn policy_follows_preserve_key() {
    let policy = IngestOptions {
        preserve_key: "x-keep".to_string(),
    }
    .policy();
    assert!(policy.is_included(PRESERVE_FIELD));
    assert!(!policy.is_included("x-keep"));
    assert_eq!(IngestOptions::default().policy(), SerializationPolicy::default());
}

#[test]
fn policy_table_excludes_and_overrides() -> Result<(), Box<dyn std::error::Error>> {
    let out = collapsed(json!({"name": "x", "status": {"phase": "Running"}, "spec": {"a": 1}}))?;

    let policy = SerializationPolicy::default().exclude("status");
    assert_eq!(
        out.to_json(&policy),
        json!({"name": "x", "spec": {"a": 1}})
    );

    let merged = policy.merge(&SerializationPolicy::empty().include("status"));
    assert!(merged.is_included("status"));
    assert!(!merged.is_included(PRESERVE_FIELD));
    assert!(merged.is_included("anything"));
    Ok(())
}

#[test]
fn policy_deserialises_from_table() -> Result<(), Box<dyn std::error::Error>> {
    let policy: SerializationPolicy =
        serde_json::from_value(json!({"status": {"included": false}}))?;
    assert!(!policy.is_included("status"));
    assert!(policy.is_included(PRESERVE_FIELD));
    Ok(())
}

#[test]
fn digest_is_stable_and_content_sensitive() -> Result<(), Box<dyn std::error::Error>> {
    let a = collapsed(json!({"name": "x", "tags": ["a", "b"], "empty": {}}))?;
    let b = collapsed(json!({"name": "x", "tags": ["a", "b"]}))?;
    let c = collapsed(json!({"name": "x", "tags": ["b", "a"]}))?;

    assert_eq!(a.digest(), b.digest());
    assert_ne!(a.digest(), c.digest());
    assert_eq!(a.digest_hex().len(), 64);
    assert_eq!(a.digest_hex(), b.digest_hex());
    Ok(())
}

#[test]
fn digest_ignores_kind_and_preserve_metadata() {
    let plain = Output::Object {
        kind: None,
        fields: vec![],
        preserve: false,
    };
    let labelled = Output::Object {
        kind: Some("Labels".to_string()),
        fields: vec![],
        preserve: true,
    };
    assert_eq!(plain.digest(), labelled.digest());
}

#[test]
fn numbers_and_strings_keep_their_types() -> Result<(), Box<dyn std::error::Error>> {
    let doc = json!({
        "replicas": 3,
        "uid": u64::MAX,
        "ratio": 0.5,
        "image": "nginx",
        "debug": true
    });
    let out = collapsed(doc.clone())?;
    assert_eq!(out.get("replicas"), Some(&Output::Scalar(Scalar::Int(3))));
    assert_eq!(out.get("uid"), Some(&Output::Scalar(Scalar::UInt(u64::MAX))));
    assert_eq!(out.get("ratio"), Some(&Output::Scalar(Scalar::Float(0.5))));
    assert_eq!(out.to_json(&SerializationPolicy::default()), doc);
    assert_eq!(
        out.to_json(&SerializationPolicy::default())["uid"].as_u64(),
        Some(u64::MAX)
    );
    Ok(())
}
