//! Coffman–Graham level scheduling for build-unit dependency graphs.
//!
//! Given build units and the units they depend on, this crate produces an
//! ordered list of levels: every unit sits on a later level than everything it
//! depends on, and no level holds more units than the configured width.
//!
//! The crate is usable as a plain Rust library and as the `rust` Python module.

// Allow clippy warning triggered by PyO3 macro expansion
#![allow(clippy::useless_conversion)]

use pyo3::prelude::*;

pub mod build_set;
mod config;
pub mod dependency_index;
pub mod graph;
pub mod logging;
mod models;
pub mod planner;
mod unit_table;

pub use build_set::{select_build_set, select_build_set_cancellable, CancellationFlag, SelectionError};
pub use config::{default_width, ConfigError, SchedulerConfig, TieBreak};
pub use dependency_index::{resolve_recursive_dependencies, DependencyError, DependencyIndex};
pub use graph::{coffman_graham, Graph, GraphError, LevelingResult, VertexId};
pub use models::{BuildSchedule, BuildUnit, LevelSink, ScheduledUnit};
pub use planner::{schedule_build, schedule_index, BuildPlan, BuildPlanner, PlanError, ScheduleError};
pub use unit_table::UnitTable;

/// Schedule build units into levels.
///
/// # Arguments
/// * `units` - Build units with their declared dependency identifiers
/// * `config` - Scheduler configuration (width defaults to host parallelism)
///
/// # Returns
/// * BuildSchedule whose `levels` are in execution order
///
/// # Raises
/// * ValueError on a dependency cycle, unresolvable order, or bad configuration
#[pyfunction]
#[pyo3(name = "schedule_build", signature = (units, config=None))]
fn py_schedule_build(
    units: Vec<BuildUnit>,
    config: Option<SchedulerConfig>,
) -> PyResult<BuildSchedule> {
    let config = config.unwrap_or_default();
    schedule_build(&units, &config)
        .map_err(|e| pyo3::exceptions::PyValueError::new_err(e.to_string()))
}

/// Schedule build units and return each unit tagged with its level.
///
/// Units are returned in execution order, ready for a parallel executor.
#[pyfunction]
#[pyo3(name = "assign_levels", signature = (units, config=None))]
fn py_assign_levels(
    units: Vec<BuildUnit>,
    config: Option<SchedulerConfig>,
) -> PyResult<Vec<ScheduledUnit>> {
    let config = config.unwrap_or_default();
    match schedule_build(&units, &config) {
        Ok(schedule) => Ok(schedule.assignments()),
        Err(e) => Err(pyo3::exceptions::PyValueError::new_err(e.to_string())),
    }
}

/// Compute the transitive dependency identifiers of `unit`.
///
/// # Raises
/// * ValueError if a cyclic dependency is found
#[pyfunction]
#[pyo3(name = "resolve_recursive_dependencies")]
fn py_resolve_recursive_dependencies(
    unit: BuildUnit,
    all_units: Vec<BuildUnit>,
) -> PyResult<Vec<String>> {
    match resolve_recursive_dependencies(&unit, &all_units) {
        Ok(closure) => Ok(closure.into_iter().collect()),
        Err(e) => Err(pyo3::exceptions::PyValueError::new_err(e.to_string())),
    }
}

/// Select the units to rebuild for `targets`: each target plus everything
/// that transitively depends on it. With no targets, every unit is returned.
#[pyfunction]
#[pyo3(name = "select_build_set", signature = (targets, units, verbosity=0))]
fn py_select_build_set(
    targets: Vec<String>,
    units: Vec<BuildUnit>,
    verbosity: u8,
) -> PyResult<Vec<BuildUnit>> {
    let mut index = DependencyIndex::from_units(&units).with_verbosity(verbosity);
    select_build_set(&mut index, &targets, verbosity)
        .map_err(|e| pyo3::exceptions::PyValueError::new_err(e.to_string()))
}

/// The levelbuild.rust Python module.
#[pymodule]
fn rust(m: &Bound<'_, PyModule>) -> PyResult<()> {
    // Core data types
    m.add_class::<BuildUnit>()?;
    m.add_class::<ScheduledUnit>()?;
    m.add_class::<BuildSchedule>()?;

    // Config types
    m.add_class::<SchedulerConfig>()?;

    // Algorithms
    m.add_function(wrap_pyfunction!(py_schedule_build, m)?)?;
    m.add_function(wrap_pyfunction!(py_assign_levels, m)?)?;
    m.add_function(wrap_pyfunction!(py_resolve_recursive_dependencies, m)?)?;
    m.add_function(wrap_pyfunction!(py_select_build_set, m)?)?;

    Ok(())
}
