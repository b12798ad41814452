//! Names for graph vertices.
//!
//! `Graph` hands out `VertexId`s and knows nothing about build units. The
//! planner registers each unit through `UnitTable::register`, which creates the
//! vertex and records its identifier at the same index.

use rustc_hash::FxHashMap;

use crate::graph::{Graph, VertexId};

/// Unit identifiers of the vertices in one `Graph`, indexed by handle.
#[derive(Debug, Clone, Default)]
pub struct UnitTable {
    names: Vec<String>,
    by_name: FxHashMap<String, VertexId>,
}

impl UnitTable {
    /// Add `unit_id` to `graph` unless it is already registered, returning
    /// the vertex that stands for it.
    pub fn register(&mut self, graph: &mut Graph, unit_id: &str) -> VertexId {
        if let Some(&vertex) = self.by_name.get(unit_id) {
            return vertex;
        }
        let vertex = graph.add_vertex();
        debug_assert_eq!(vertex.index(), self.names.len(), "graph shared between tables");
        self.names.push(unit_id.to_string());
        self.by_name.insert(unit_id.to_string(), vertex);
        vertex
    }

    pub fn vertex(&self, unit_id: &str) -> Option<VertexId> {
        self.by_name.get(unit_id).copied()
    }

    pub fn name(&self, vertex: VertexId) -> Option<&str> {
        self.names.get(vertex.index()).map(String::as_str)
    }

    /// Name of `vertex` for messages, with a placeholder for handles this
    /// table never registered.
    pub fn label(&self, vertex: VertexId) -> String {
        match self.name(vertex) {
            Some(name) => name.to_string(),
            None => format!("<vertex {}>", vertex.index()),
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
