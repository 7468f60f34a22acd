pub mod collapse;
pub mod error;
pub mod evaluate;
pub mod graph;
pub mod node;
pub mod output;
pub mod path;
pub mod policy;
pub mod storage;

pub use collapse::{CollapseOptions, Collapser, RootPolicy, collapse};
pub use error::CollapseError;
pub use evaluate::{Evaluator, is_empty};
pub use graph::{Graph, IngestOptions, Manifest};
pub use node::{Node, NodeId, NodeSource, ObjectNode, PreserveAware, Scalar, Shape};
pub use output::Output;
pub use policy::SerializationPolicy;
