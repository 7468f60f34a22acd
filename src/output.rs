use crate::node::Scalar;
use crate::policy::SerializationPolicy;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Collapsed document handed to the text encoder.
///
/// Owns all of its data; nothing aliases the input graph.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Output {
    Scalar(Scalar),
    Object {
        kind: Option<String>,
        fields: Vec<(String, Output)>,
        /// Carried so that collapsing a re-ingested output is a fixed point.
        /// Never encoded.
        preserve: bool,
    },
    Collection(Vec<Output>),
}

impl Output {
    pub fn get(&self, name: &str) -> Option<&Output> {
        match self {
            Output::Object { fields, .. } => fields
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value),
            _ => None,
        }
    }

    pub fn field_names(&self) -> Vec<&str> {
        match self {
            Output::Object { fields, .. } => fields.iter().map(|(k, _)| k.as_str()).collect(),
            _ => Vec::new(),
        }
    }

    /// Encoder view of the document. Collapsing with the same `policy`
    /// guarantees no empty, non-preserved branch is left once its excluded
    /// fields are filtered here.
    pub fn to_json(&self, policy: &SerializationPolicy) -> serde_json::Value {
        match self {
            Output::Scalar(value) => scalar_to_json(value),
            Output::Object { fields, .. } => {
                let mut map = serde_json::Map::new();
                for (key, value) in fields {
                    if policy.is_included(key) {
                        map.insert(key.clone(), value.to_json(policy));
                    }
                }
                serde_json::Value::Object(map)
            }
            Output::Collection(items) => {
                serde_json::Value::Array(items.iter().map(|i| i.to_json(policy)).collect())
            }
        }
    }

    fn write_canonical(&self, buf: &mut Vec<u8>) {
        match self {
            Output::Scalar(Scalar::Null) => buf.push(0x00),
            Output::Scalar(Scalar::Int(v)) => {
                buf.push(0x01);
                buf.extend_from_slice(&v.to_be_bytes());
            }
            Output::Scalar(Scalar::UInt(v)) => {
                buf.push(0x08);
                buf.extend_from_slice(&v.to_be_bytes());
            }
            Output::Scalar(Scalar::Float(v)) => {
                buf.push(0x02);
                buf.extend_from_slice(&v.to_bits().to_be_bytes());
            }
            Output::Scalar(Scalar::Bool(v)) => {
                buf.push(0x03);
                buf.push(if *v { 0x01 } else { 0x00 });
            }
            Output::Scalar(Scalar::Str(v)) => {
                buf.push(0x04);
                write_str(buf, v);
            }
            Output::Collection(items) => {
                buf.push(0x06);
                let len = items.len() as u64;
                buf.extend_from_slice(&len.to_be_bytes());
                for item in items {
                    item.write_canonical(buf);
                }
            }
            // Field order is significant in a collapsed document, so it is
            // hashed as-is rather than sorted.
            Output::Object { fields, .. } => {
                buf.push(0x07);
                let len = fields.len() as u64;
                buf.extend_from_slice(&len.to_be_bytes());
                for (key, value) in fields {
                    write_str(buf, key);
                    value.write_canonical(buf);
                }
            }
        }
    }

    /// SHA-256 over the encoded content. Kind labels and preserve flags do
    /// not contribute.
    pub fn digest(&self) -> [u8; 32] {
        let mut bytes = Vec::new();
        self.write_canonical(&mut bytes);
        let digest = Sha256::digest(bytes);
        let mut out = [0u8; 32];
        out.copy_from_slice(&digest);
        out
    }

    pub fn digest_hex(&self) -> String {
        self.digest().iter().map(|b| format!("{:02x}", b)).collect()
    }
}

fn write_str(buf: &mut Vec<u8>, value: &str) {
    let len = value.len() as u64;
    buf.extend_from_slice(&len.to_be_bytes());
    buf.extend_from_slice(value.as_bytes());
}

fn scalar_to_json(value: &Scalar) -> serde_json::Value {
    match value {
        Scalar::Null => serde_json::Value::Null,
        Scalar::Bool(b) => serde_json::Value::Bool(*b),
        Scalar::Int(i) => serde_json::Value::from(*i),
        Scalar::UInt(u) => serde_json::Value::from(*u),
        Scalar::Float(f) => serde_json::Number::from_f64(*f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Scalar::Str(s) => serde_json::Value::String(s.clone()),
    }
}
