//! Vertex handles and per-vertex transitive reduction.

use rustc_hash::FxHashSet;

/// Opaque handle to a vertex in a `Graph`.
///
/// Handles are dense indices; the payload they stand for lives in a side table
/// owned by the caller (see `UnitTable`).
/// A graph holds at most `u32::MAX` vertices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VertexId(u32);

impl VertexId {
    #[inline]
    pub fn new(index: usize) -> Self {
        debug_assert!(u32::try_from(index).is_ok(), "vertex index {index} exceeds u32");
        Self(u32::try_from(index).unwrap_or(u32::MAX))
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A vertex and the dependencies declared for it.
#[derive(Debug, Clone, Default)]
pub struct Vertex {
    /// Declared dependencies in declaration order. May be redundant.
    pub(crate) dependencies: Vec<VertexId>,
    /// Covering edges only, filled in by `Graph::reduce`.
    pub(crate) direct_dependencies: Vec<VertexId>,
}

impl Vertex {
    pub fn dependencies(&self) -> &[VertexId] {
        &self.dependencies
    }

    pub fn direct_dependencies(&self) -> &[VertexId] {
        &self.direct_dependencies
    }

    #[inline]
    pub fn depends_on(&self, other: VertexId) -> bool {
        self.dependencies.contains(&other)
    }
}

/// Strip declared dependencies that are implied by another declared dependency.
///
/// Walks the declaration list once. A dependency `di` that is not already known
/// to be indirect is compared with every later `dj`:
/// - if `di` declares `dj`, then `dj` is indirect;
/// - otherwise, if `dj` declares `di`, then `di` is indirect and the scan stops.
///
/// Reachability is tested against each vertex's own declared list, not a full
/// closure, so the result is only as minimal as the declarations allow. It is
/// always reachability-preserving for acyclic input.
pub fn reduce_dependencies(dependencies: &[VertexId], vertices: &[Vertex]) -> Vec<VertexId> {
    let declares = |from: VertexId, to: VertexId| {
        vertices
            .get(from.index())
            .is_some_and(|vertex| vertex.depends_on(to))
    };

    let mut indirect: FxHashSet<VertexId> = FxHashSet::default();
    let mut direct = Vec::with_capacity(dependencies.len());

    for (i, &di) in dependencies.iter().enumerate() {
        if indirect.contains(&di) {
            continue;
        }

        let mut is_direct = true;
        for &dj in &dependencies[i + 1..] {
            if declares(di, dj) {
                indirect.insert(dj);
            } else if declares(dj, di) {
                is_direct = false;
                break;
            }
        }

        if is_direct {
            direct.push(di);
        }
    }

    direct
}
