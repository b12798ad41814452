//! Coffman–Graham level scheduling.
//!
//! Three phases over a `Graph`:
//! 1. Reduce every vertex to its covering edges and rebuild the dependants index.
//! 2. Build a topological order. With `TieBreak::Canonical`, among the vertices
//!    whose direct dependencies are all placed, pick the one whose placed
//!    dependency positions, sorted most recent first, compare smallest.
//! 3. Walk that order backwards, putting each vertex on the lowest level that is
//!    strictly above every level holding one of its dependants and that still
//!    has room for another vertex. Reversing the level list at the end turns
//!    "above" into "executes earlier".

use crate::config::TieBreak;
use crate::{log_changes, log_checks, log_debug};

use super::{Graph, GraphError, VertexId};

/// Output of `coffman_graham`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelingResult {
    /// Levels in execution order. Within a level, vertices keep their
    /// topological order.
    pub levels: Vec<Vec<VertexId>>,
    /// The Phase 2 order the levels were built from.
    pub topological_order: Vec<VertexId>,
}

impl LevelingResult {
    /// Level index of each vertex, indexed by `VertexId::index`.
    pub fn level_by_vertex(&self, vertex_count: usize) -> Vec<Option<usize>> {
        let mut out = vec![None; vertex_count];
        for (level, vertices) in self.levels.iter().enumerate() {
            for v in vertices {
                if let Some(slot) = out.get_mut(v.index()) {
                    *slot = Some(level);
                }
            }
        }
        out
    }
}

/// Run all three phases and return levels of at most `width` vertices.
pub fn coffman_graham(
    graph: &mut Graph,
    width: usize,
    tie_break: TieBreak,
    verbosity: u8,
) -> Result<LevelingResult, GraphError> {
    if width == 0 {
        return Err(GraphError::InvalidWidth);
    }

    // Phase 1
    graph.reduce();

    // Phase 2
    let order = match tie_break {
        TieBreak::Canonical => canonical_order(graph, verbosity),
        TieBreak::FirstFound => first_found_order(graph),
    };
    if order.len() != graph.len() {
        let mut placed = vec![false; graph.len()];
        for v in &order {
            placed[v.index()] = true;
        }
        let unplaced: Vec<VertexId> = graph.vertex_ids().filter(|v| !placed[v.index()]).collect();
        log_checks!(
            verbosity,
            "topological order stalled with {} of {} vertices placed",
            order.len(),
            graph.len()
        );
        return Err(GraphError::UnresolvedDependency { unplaced });
    }

    // Phase 3
    let levels = assign_levels(graph, &order, width, verbosity)?;
    log_changes!(
        verbosity,
        "leveled {} vertices into {} levels (width {})",
        order.len(),
        levels.len(),
        width
    );

    Ok(LevelingResult {
        levels,
        topological_order: order,
    })
}

/// Phase 2 with the lexicographic Coffman–Graham tie-break.
///
/// Ties on the full key go to the vertex added to the graph first.
fn canonical_order(graph: &Graph, verbosity: u8) -> Vec<VertexId> {
    let n = graph.len();
    let mut position: Vec<Option<usize>> = vec![None; n];
    let mut order: Vec<VertexId> = Vec::with_capacity(n);

    loop {
        let mut best: Option<(Vec<usize>, VertexId)> = None;

        for v in graph.vertex_ids() {
            if position[v.index()].is_some() {
                continue;
            }
            let Some(mut key) = placed_positions(graph.direct_dependencies(v), &position) else {
                continue;
            };
            key.sort_unstable_by(|a, b| b.cmp(a));

            if best.as_ref().map_or(true, |(best_key, _)| key < *best_key) {
                best = Some((key, v));
            }
        }

        let Some((key, v)) = best else {
            break;
        };
        log_debug!(
            verbosity,
            "position {}: vertex {} (dependency positions {:?})",
            order.len(),
            v.index(),
            key
        );
        position[v.index()] = Some(order.len());
        order.push(v);
    }

    order
}

/// Positions of `dependencies` in the order so far, or `None` if any of them
/// has not been placed yet.
fn placed_positions(dependencies: &[VertexId], position: &[Option<usize>]) -> Option<Vec<usize>> {
    dependencies
        .iter()
        .map(|d| position.get(d.index()).copied().flatten())
        .collect()
}

/// Phase 2 as the earlier build tooling did it: scan all vertices in insertion
/// order and append every one whose direct dependencies are placed, repeating
/// the scan once per vertex.
fn first_found_order(graph: &Graph) -> Vec<VertexId> {
    let n = graph.len();
    let mut placed = vec![false; n];
    let mut order: Vec<VertexId> = Vec::with_capacity(n);

    for _ in 0..n {
        if order.len() == n {
            break;
        }
        for v in graph.vertex_ids() {
            if placed[v.index()] {
                continue;
            }
            let ready = graph
                .direct_dependencies(v)
                .iter()
                .all(|d| placed.get(d.index()).copied().unwrap_or(false));
            if ready {
                placed[v.index()] = true;
                order.push(v);
            }
        }
    }

    order
}

/// Phase 3. `order` must be a complete topological order of `graph`.
fn assign_levels(
    graph: &Graph,
    order: &[VertexId],
    width: usize,
    verbosity: u8,
) -> Result<Vec<Vec<VertexId>>, GraphError> {
    let mut levels: Vec<Vec<VertexId>> = Vec::new();
    let mut level_of: Vec<Option<usize>> = vec![None; graph.len()];

    for &v in order.iter().rev() {
        let mut max_dependant_level: Option<usize> = None;
        for &dependant in graph.direct_dependants(v) {
            let Some(level) = level_of.get(dependant.index()).copied().flatten() else {
                return Err(GraphError::InternalOrderingInconsistency {
                    vertex: v,
                    dependant,
                });
            };
            max_dependant_level = Some(max_dependant_level.map_or(level, |m| m.max(level)));
        }

        let lowest = max_dependant_level.map_or(0, |m| m + 1);
        let index = match (lowest..levels.len()).find(|&i| levels[i].len() < width) {
            Some(i) => i,
            None => {
                levels.push(Vec::new());
                levels.len() - 1
            }
        };
        log_debug!(
            verbosity,
            "vertex {} -> raw level {} (lowest allowed {})",
            v.index(),
            index,
            lowest
        );

        levels[index].push(v);
        level_of[v.index()] = Some(index);
    }

    levels.reverse();

    let mut position = vec![0usize; graph.len()];
    for (i, v) in order.iter().enumerate() {
        position[v.index()] = i;
    }
    for level in &mut levels {
        level.sort_by_key(|v| position[v.index()]);
    }

    Ok(levels)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_graph(deps: &[&[usize]]) -> (Graph, Vec<VertexId>) {
        let mut graph = Graph::with_capacity(deps.len());
        let ids: Vec<VertexId> = deps.iter().map(|_| graph.add_vertex()).collect();
        for (v, ds) in deps.iter().enumerate() {
            for &d in *ds {
                graph.add_dependency(ids[v], ids[d]).unwrap();
            }
        }
        (graph, ids)
    }

    fn raw(levels: &[Vec<VertexId>]) -> Vec<Vec<usize>> {
        levels
            .iter()
            .map(|l| l.iter().map(|v| v.index()).collect())
            .collect()
    }

    #[test]
    fn test_diamond_width_two() {
        // 0 = A, 1 = B -> A, 2 = C -> A, 3 = D -> {B, C}
        let (mut graph, _) = make_graph(&[&[], &[0], &[0], &[1, 2]]);
        let result = coffman_graham(&mut graph, 2, TieBreak::Canonical, 0).unwrap();
        assert_eq!(raw(&result.levels), vec![vec![0], vec![1, 2], vec![3]]);
    }

    #[test]
    fn test_diamond_width_one() {
        let (mut graph, _) = make_graph(&[&[], &[0], &[0], &[1, 2]]);
        let result = coffman_graham(&mut graph, 1, TieBreak::Canonical, 0).unwrap();
        assert_eq!(raw(&result.levels), vec![vec![0], vec![1], vec![2], vec![3]]);
    }

    #[test]
    fn test_independent_vertices_fill_levels_to_width() {
        let (mut graph, _) = make_graph(&[&[], &[], &[], &[], &[]]);
        let result = coffman_graham(&mut graph, 2, TieBreak::Canonical, 0).unwrap();
        assert_eq!(result.levels.len(), 3);
        assert!(result.levels.iter().all(|l| l.len() <= 2));
    }

    #[test]
    fn test_canonical_prefers_older_dependencies() {
        // 0 and 1 are sources; 2 -> 1, 3 -> 0. Vertex 3 depends on the earlier
        // placed source, so it must come before 2 even though 2 was added first.
        let (mut graph, _) = make_graph(&[&[], &[], &[1], &[0]]);
        let result = coffman_graham(&mut graph, 2, TieBreak::Canonical, 0).unwrap();
        let order: Vec<usize> = result.topological_order.iter().map(|v| v.index()).collect();
        assert_eq!(order, vec![0, 1, 3, 2]);
    }

    #[test]
    fn test_canonical_compares_second_most_recent_on_tie() {
        // Sources 0, 1, 2 take positions 0..3. 3 -> {2, 1} and 4 -> {2, 0}
        // share their most recent dependency; 4's next one was placed earlier.
        let (mut graph, _) = make_graph(&[&[], &[], &[], &[2, 1], &[2, 0]]);
        let result = coffman_graham(&mut graph, 2, TieBreak::Canonical, 0).unwrap();
        let order: Vec<usize> = result.topological_order.iter().map(|v| v.index()).collect();
        assert_eq!(order, vec![0, 1, 2, 4, 3]);
    }

    #[test]
    fn test_canonical_shorter_key_wins_over_its_extension() {
        // 3 -> {2, 0} has key [2, 0]; 4 -> {2} has key [2], a prefix of it.
        let (mut graph, _) = make_graph(&[&[], &[], &[], &[2, 0], &[2]]);
        let result = coffman_graham(&mut graph, 2, TieBreak::Canonical, 0).unwrap();
        let order: Vec<usize> = result.topological_order.iter().map(|v| v.index()).collect();
        assert_eq!(order, vec![0, 1, 2, 4, 3]);
    }

    #[test]
    fn test_first_found_scans_in_insertion_order() {
        let (mut graph, _) = make_graph(&[&[], &[], &[1], &[0]]);
        let result = coffman_graham(&mut graph, 2, TieBreak::FirstFound, 0).unwrap();
        let order: Vec<usize> = result.topological_order.iter().map(|v| v.index()).collect();
        assert_eq!(order, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_first_found_with_late_source() {
        // 0 -> 2, 1 -> 0, 2 is a source. Needs several scans.
        let (mut graph, _) = make_graph(&[&[2], &[0], &[]]);
        let result = coffman_graham(&mut graph, 3, TieBreak::FirstFound, 0).unwrap();
        let order: Vec<usize> = result.topological_order.iter().map(|v| v.index()).collect();
        assert_eq!(order, vec![2, 0, 1]);
        assert_eq!(raw(&result.levels), vec![vec![2], vec![0], vec![1]]);
    }

    #[test]
    fn test_cycle_is_unresolved() {
        // 0 -> 1 -> 0, 2 is free.
        let (mut graph, ids) = make_graph(&[&[1], &[0], &[]]);
        let err = coffman_graham(&mut graph, 2, TieBreak::Canonical, 0).unwrap_err();
        assert_eq!(
            err,
            GraphError::UnresolvedDependency {
                unplaced: vec![ids[0], ids[1]],
            }
        );
    }

    #[test]
    fn test_self_loop_is_unresolved() {
        let (mut graph, _) = make_graph(&[&[0]]);
        assert!(matches!(
            coffman_graham(&mut graph, 1, TieBreak::FirstFound, 0),
            Err(GraphError::UnresolvedDependency { .. })
        ));
    }

    #[test]
    fn test_zero_width_rejected() {
        let (mut graph, _) = make_graph(&[&[]]);
        assert_eq!(
            coffman_graham(&mut graph, 0, TieBreak::Canonical, 0),
            Err(GraphError::InvalidWidth)
        );
    }

    #[test]
    fn test_empty_graph() {
        let mut graph = Graph::new();
        let result = coffman_graham(&mut graph, 4, TieBreak::Canonical, 0).unwrap();
        assert!(result.levels.is_empty());
        assert!(result.topological_order.is_empty());
    }

    #[test]
    fn test_dependant_placed_first_is_internal_error() {
        let (mut graph, ids) = make_graph(&[&[], &[0]]);
        graph.reduce();
        // Dependency after its dependant: walking backwards reaches 0 before 1.
        let bad_order = vec![ids[1], ids[0]];
        let err = assign_levels(&graph, &bad_order, 1, 0).unwrap_err();
        assert_eq!(
            err,
            GraphError::InternalOrderingInconsistency {
                vertex: ids[0],
                dependant: ids[1],
            }
        );
    }

    #[test]
    fn test_level_by_vertex() {
        let (mut graph, _) = make_graph(&[&[], &[0], &[0], &[1, 2]]);
        let result = coffman_graham(&mut graph, 2, TieBreak::Canonical, 0).unwrap();
        assert_eq!(
            result.level_by_vertex(graph.len()),
            vec![Some(0), Some(1), Some(1), Some(2)]
        );
    }

    #[test]
    fn test_redundant_edge_does_not_add_levels() {
        // D declares A as well as B and C; the reduction drops D -> A.
        let (mut graph, _) = make_graph(&[&[], &[0], &[0], &[1, 2, 0]]);
        let result = coffman_graham(&mut graph, 2, TieBreak::Canonical, 0).unwrap();
        assert_eq!(raw(&result.levels), vec![vec![0], vec![1, 2], vec![3]]);
    }
}
