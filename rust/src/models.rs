//! Core data types for the level scheduler.

use pyo3::prelude::*;
use rustc_hash::FxHashMap;

/// A buildable unit (typically a project) and the identifiers it depends on.
///
/// Declared dependencies may be redundant, and may name units that are not
/// part of the graph being scheduled (external packages). Those are treated
/// as leaves.
#[pyclass]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BuildUnit {
    #[pyo3(get, set)]
    pub id: String,
    #[pyo3(get, set)]
    pub dependencies: Vec<String>,
}

impl BuildUnit {
    /// Convenience constructor used by callers that already own string slices.
    pub fn with_dependencies<I, S>(id: impl Into<String>, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: id.into(),
            dependencies: dependencies.into_iter().map(Into::into).collect(),
        }
    }
}

#[pymethods]
impl BuildUnit {
    #[new]
    #[pyo3(signature = (id, dependencies=None))]
    fn new(id: String, dependencies: Option<Vec<String>>) -> Self {
        Self {
            id,
            dependencies: dependencies.unwrap_or_default(),
        }
    }

    fn __repr__(&self) -> String {
        format!(
            "BuildUnit(id={:?}, dependencies={:?})",
            self.id, self.dependencies
        )
    }
}

/// A unit annotated with the level it was assigned to.
#[pyclass]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScheduledUnit {
    #[pyo3(get, set)]
    pub unit_id: String,
    #[pyo3(get, set)]
    pub level: usize,
}

#[pymethods]
impl ScheduledUnit {
    #[new]
    fn new(unit_id: String, level: usize) -> Self {
        Self { unit_id, level }
    }

    fn __repr__(&self) -> String {
        format!(
            "ScheduledUnit(unit_id={:?}, level={})",
            self.unit_id, self.level
        )
    }
}

/// Receives the level assigned to each scheduled unit.
///
/// Implemented by whatever records plan metadata for the downstream executor.
pub trait LevelSink {
    fn record(&mut self, unit_id: &str, level: usize);
}

impl LevelSink for Vec<ScheduledUnit> {
    fn record(&mut self, unit_id: &str, level: usize) {
        self.push(ScheduledUnit {
            unit_id: unit_id.to_string(),
            level,
        });
    }
}

impl LevelSink for FxHashMap<String, usize> {
    fn record(&mut self, unit_id: &str, level: usize) {
        self.insert(unit_id.to_string(), level);
    }
}

/// Levels of unit identifiers in execution order.
///
/// Level 0 holds units with no scheduled dependencies; every unit sits on a
/// strictly later level than everything it depends on.
#[pyclass]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BuildSchedule {
    #[pyo3(get)]
    pub levels: Vec<Vec<String>>,
    #[pyo3(get)]
    pub width: usize,
}

impl BuildSchedule {
    pub fn new(levels: Vec<Vec<String>>, width: usize) -> Self {
        Self { levels, width }
    }

    pub fn unit_count(&self) -> usize {
        self.levels.iter().map(Vec::len).sum()
    }

    /// Feed every unit and its level to `sink`, in execution order.
    pub fn annotate<S: LevelSink + ?Sized>(&self, sink: &mut S) {
        for (level, units) in self.levels.iter().enumerate() {
            for unit_id in units {
                sink.record(unit_id, level);
            }
        }
    }

    /// Flat list of units in execution order, each tagged with its level.
    pub fn assignments(&self) -> Vec<ScheduledUnit> {
        let mut out = Vec::with_capacity(self.unit_count());
        self.annotate(&mut out);
        out
    }
}

#[pymethods]
impl BuildSchedule {
    /// Level index of a unit, if it was scheduled.
    pub fn level_of(&self, unit_id: &str) -> Option<usize> {
        self.levels
            .iter()
            .position(|level| level.iter().any(|u| u == unit_id))
    }

    fn __len__(&self) -> usize {
        self.levels.len()
    }

    fn __repr__(&self) -> String {
        format!(
            "BuildSchedule(levels={}, units={}, width={})",
            self.levels.len(),
            self.unit_count(),
            self.width
        )
    }
}
