//! Dependency graph over opaque vertex handles.
//!
//! A vertex holds its declared (possibly redundant) dependencies. `reduce`
//! derives the covering relation (`direct_dependencies`) and rebuilds the
//! inverse index (`direct_dependants`) from it. The inverse is never stored on
//! the vertices themselves; it is always recomputed from the forward edges.

mod coffman_graham;
mod vertex;

use thiserror::Error;

pub use coffman_graham::{coffman_graham, LevelingResult};
pub use vertex::{reduce_dependencies, Vertex, VertexId};

/// Errors raised by graph construction and leveling.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("Unknown vertex handle: {0:?}")]
    UnknownVertex(VertexId),
    #[error("Some dependencies could not be resolved: {} vertices unplaced", .unplaced.len())]
    UnresolvedDependency { unplaced: Vec<VertexId> },
    #[error(
        "internal scheduler defect: dependant {dependant:?} of {vertex:?} has no level yet \
         (topological order placed a dependant before its dependency)"
    )]
    InternalOrderingInconsistency {
        vertex: VertexId,
        dependant: VertexId,
    },
    #[error("Level width must be at least 1")]
    InvalidWidth,
}

/// A directed graph where each vertex lists the vertices it depends on.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    vertices: Vec<Vertex>,
    /// Inverse of `direct_dependencies`, indexed by vertex. Rebuilt by `reduce`.
    direct_dependants: Vec<Vec<VertexId>>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(capacity),
            direct_dependants: Vec::with_capacity(capacity),
        }
    }

    /// Add a vertex with no dependencies and return its handle.
    pub fn add_vertex(&mut self) -> VertexId {
        let id = VertexId::new(self.vertices.len());
        self.vertices.push(Vertex::default());
        self.direct_dependants.push(Vec::new());
        id
    }

    /// Declare that `vertex` depends on `dependency`. Repeated edges are ignored.
    ///
    /// Invalidates any previous reduction of `vertex`; call `reduce` again
    /// before reading direct edges.
    pub fn add_dependency(
        &mut self,
        vertex: VertexId,
        dependency: VertexId,
    ) -> Result<(), GraphError> {
        if dependency.index() >= self.vertices.len() {
            return Err(GraphError::UnknownVertex(dependency));
        }
        let v = self
            .vertices
            .get_mut(vertex.index())
            .ok_or(GraphError::UnknownVertex(vertex))?;
        if !v.dependencies.contains(&dependency) {
            v.dependencies.push(dependency);
        }
        v.direct_dependencies.clear();
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// All vertex handles in insertion order.
    pub fn vertex_ids(&self) -> impl Iterator<Item = VertexId> + '_ {
        (0..self.vertices.len()).map(VertexId::new)
    }

    pub fn vertex(&self, id: VertexId) -> Option<&Vertex> {
        self.vertices.get(id.index())
    }

    pub fn dependencies(&self, id: VertexId) -> &[VertexId] {
        self.vertex(id).map(Vertex::dependencies).unwrap_or(&[])
    }

    pub fn direct_dependencies(&self, id: VertexId) -> &[VertexId] {
        self.vertex(id).map(Vertex::direct_dependencies).unwrap_or(&[])
    }

    pub fn direct_dependants(&self, id: VertexId) -> &[VertexId] {
        self.direct_dependants
            .get(id.index())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Compute the covering relation for every vertex, then rebuild the
    /// dependants index from it.
    pub fn reduce(&mut self) {
        let reduced: Vec<Vec<VertexId>> = self
            .vertices
            .iter()
            .map(|v| reduce_dependencies(&v.dependencies, &self.vertices))
            .collect();
        for (vertex, direct) in self.vertices.iter_mut().zip(reduced) {
            vertex.direct_dependencies = direct;
        }

        for dependants in &mut self.direct_dependants {
            dependants.clear();
        }
        for (index, vertex) in self.vertices.iter().enumerate() {
            let id = VertexId::new(index);
            for dependency in &vertex.direct_dependencies {
                if *dependency == id {
                    continue;
                }
                if let Some(dependants) = self.direct_dependants.get_mut(dependency.index()) {
                    dependants.push(id);
                }
            }
        }
    }
}
