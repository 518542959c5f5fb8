//! Core property graph implementation
//!
//! This module implements the property graph data model with:
//! - Nodes with labels and properties, identified by a unique key per label
//! - Directed, typed edges with properties
//! - In-memory storage with label, edge-type and unique-key indices

pub mod edge;
pub mod node;
pub mod property;
pub mod store;
pub mod types;

// Re-export main types
pub use edge::Edge;
pub use node::Node;
pub use property::{PropertyMap, PropertyValue};
pub use store::{GraphError, GraphResult, GraphStore};
pub use types::{EdgeId, EdgeType, Label, NodeId, NodeKey};
