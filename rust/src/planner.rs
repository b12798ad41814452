//! End-to-end build scheduling: unit records in, leveled build schedule out.

use thiserror::Error;

use crate::build_set::{select_build_set_cancellable, CancellationFlag, SelectionError};
use crate::config::{ConfigError, SchedulerConfig};
use crate::dependency_index::{DependencyError, DependencyIndex};
use crate::graph::{coffman_graham, Graph, GraphError};
use crate::models::{BuildSchedule, BuildUnit};
use crate::unit_table::UnitTable;
use crate::{log_changes, log_checks};

/// Errors that can occur while scheduling a build.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    #[error(transparent)]
    Dependency(#[from] DependencyError),
    #[error("Some dependencies could not be resolved: {unplaced:?}")]
    UnresolvedDependency { unplaced: Vec<String> },
    #[error(
        "internal scheduler defect: {dependant} depends on {unit} but was not leveled before it"
    )]
    InternalOrderingInconsistency { unit: String, dependant: String },
    #[error("Level width must be at least 1")]
    InvalidWidth,
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

impl ScheduleError {
    fn from_graph(err: GraphError, table: &UnitTable) -> Self {
        match err {
            GraphError::UnresolvedDependency { unplaced } => Self::UnresolvedDependency {
                unplaced: unplaced.into_iter().map(|v| table.label(v)).collect(),
            },
            GraphError::InternalOrderingInconsistency { vertex, dependant } => {
                Self::InternalOrderingInconsistency {
                    unit: table.label(vertex),
                    dependant: table.label(dependant),
                }
            }
            GraphError::InvalidWidth => Self::InvalidWidth,
            GraphError::UnknownVertex(v) => {
                Self::Dependency(DependencyError::UnknownUnit(table.label(v)))
            }
        }
    }

    /// True for errors caused by a defect in the scheduler rather than by input.
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::InternalOrderingInconsistency { .. })
    }
}

/// Schedule `units` into levels of at most `config.width` units.
///
/// Dependencies naming units outside `units` are ignored for ordering.
pub fn schedule_build(
    units: &[BuildUnit],
    config: &SchedulerConfig,
) -> Result<BuildSchedule, ScheduleError> {
    let mut index = DependencyIndex::from_units(units).with_verbosity(config.verbosity);
    schedule_index(&mut index, config)
}

/// Schedule every unit known to `index`.
pub fn schedule_index(
    index: &mut DependencyIndex,
    config: &SchedulerConfig,
) -> Result<BuildSchedule, ScheduleError> {
    // Validate config upfront
    let tie_break = config.tie_break_rule()?;
    if config.width == 0 {
        return Err(ScheduleError::InvalidWidth);
    }

    index.validate()?;

    let mut table = UnitTable::default();
    let mut graph = Graph::with_capacity(index.len());
    for unit_id in index.unit_ids() {
        table.register(&mut graph, unit_id);
    }
    for unit_id in index.unit_ids() {
        let Some(vertex) = table.vertex(unit_id) else {
            continue;
        };
        for dependency in index.dependencies_of(unit_id).unwrap_or(&[]) {
            match table.vertex(dependency) {
                Some(dep_vertex) => graph
                    .add_dependency(vertex, dep_vertex)
                    .map_err(|e| ScheduleError::from_graph(e, &table))?,
                None => log_checks!(
                    config.verbosity,
                    "{} -> {} is external; not ordered",
                    unit_id,
                    dependency
                ),
            }
        }
    }

    let result = coffman_graham(&mut graph, config.width, tie_break, config.verbosity)
        .map_err(|e| ScheduleError::from_graph(e, &table))?;

    let levels: Vec<Vec<String>> = result
        .levels
        .iter()
        .map(|level| level.iter().map(|&v| table.label(v)).collect())
        .collect();

    for (i, level) in levels.iter().enumerate() {
        log_changes!(config.verbosity, "level {}: {}", i, level.join(", "));
    }

    Ok(BuildSchedule::new(levels, config.width))
}

/// Errors from multi-target planning.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    #[error(transparent)]
    Schedule(#[from] ScheduleError),
    #[error("Build planning cancelled")]
    Cancelled,
}

impl From<SelectionError> for PlanError {
    fn from(err: SelectionError) -> Self {
        match err {
            SelectionError::Dependency(e) => PlanError::Schedule(ScheduleError::Dependency(e)),
            SelectionError::Cancelled => PlanError::Cancelled,
        }
    }
}

/// Schedule for one set of targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildPlan {
    pub targets: Vec<String>,
    pub schedule: BuildSchedule,
}

/// Plans builds for target sets against one dependency index.
///
/// Cancellation is polled between unit resolutions and between target sets,
/// never inside a single scheduling computation.
pub struct BuildPlanner {
    index: DependencyIndex,
    config: SchedulerConfig,
    cancel: CancellationFlag,
}

impl BuildPlanner {
    pub fn new(units: &[BuildUnit], config: SchedulerConfig) -> Self {
        Self {
            index: DependencyIndex::from_units(units).with_verbosity(config.verbosity),
            config,
            cancel: CancellationFlag::new(),
        }
    }

    /// Use a caller-owned cancellation flag.
    pub fn with_cancellation(mut self, cancel: CancellationFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancellation(&self) -> CancellationFlag {
        self.cancel.clone()
    }

    pub fn index(&self) -> &DependencyIndex {
        &self.index
    }

    /// Declare an extra dependency before planning.
    pub fn add_dependency(&mut self, unit_id: &str, dependency: &str) -> bool {
        self.index.add_dependency(unit_id, dependency)
    }

    /// Select the build set for `targets` and schedule it.
    pub fn plan(&mut self, targets: &[String]) -> Result<BuildPlan, PlanError> {
        if self.cancel.is_cancelled() {
            return Err(PlanError::Cancelled);
        }
        let units = select_build_set_cancellable(
            &mut self.index,
            targets,
            Some(&self.cancel),
            self.config.verbosity,
        )?;
        if self.cancel.is_cancelled() {
            return Err(PlanError::Cancelled);
        }
        let schedule = schedule_build(&units, &self.config)?;
        log_changes!(
            self.config.verbosity,
            "planned {} units in {} levels for {:?}",
            schedule.unit_count(),
            schedule.levels.len(),
            targets
        );
        Ok(BuildPlan {
            targets: targets.to_vec(),
            schedule,
        })
    }

    /// Plan each target set in turn, stopping at the first error.
    pub fn plan_all(&mut self, target_sets: &[Vec<String>]) -> Result<Vec<BuildPlan>, PlanError> {
        target_sets.iter().map(|targets| self.plan(targets)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_unit(id: &str, deps: &[&str]) -> BuildUnit {
        BuildUnit::with_dependencies(id, deps.iter().copied())
    }

    fn diamond() -> Vec<BuildUnit> {
        vec![
            make_unit("A", &[]),
            make_unit("B", &["A"]),
            make_unit("C", &["A"]),
            make_unit("D", &["B", "C"]),
        ]
    }

    fn names(levels: &[Vec<String>]) -> Vec<Vec<&str>> {
        levels
            .iter()
            .map(|l| l.iter().map(String::as_str).collect())
            .collect()
    }

    #[test]
    fn test_schedule_diamond() {
        let schedule = schedule_build(&diamond(), &SchedulerConfig::with_width(2)).unwrap();
        assert_eq!(names(&schedule.levels), vec![vec!["A"], vec!["B", "C"], vec!["D"]]);
        assert_eq!(schedule.width, 2);
    }

    #[test]
    fn test_external_dependencies_do_not_block() {
        let units = vec![
            make_unit("Core", &["Newtonsoft.Json"]),
            make_unit("App", &["Core", "Serilog"]),
        ];
        let schedule = schedule_build(&units, &SchedulerConfig::with_width(4)).unwrap();
        assert_eq!(names(&schedule.levels), vec![vec!["Core"], vec!["App"]]);
    }

    #[test]
    fn test_ids_differing_only_in_case_are_both_ordered() {
        let units = vec![
            make_unit("Core", &[]),
            make_unit("core", &[]),
            make_unit("App", &["Core", "core"]),
        ];
        let schedule = schedule_build(&units, &SchedulerConfig::with_width(4)).unwrap();
        assert_eq!(names(&schedule.levels), vec![vec!["Core", "core"], vec!["App"]]);

        let app = schedule.level_of("App").unwrap();
        assert!(schedule.level_of("Core").unwrap() < app);
        assert!(schedule.level_of("core").unwrap() < app);
    }

    #[test]
    fn test_cycle_reported_as_cyclic_dependency() {
        let units = vec![make_unit("X", &["Y"]), make_unit("Y", &["X"])];
        let err = schedule_build(&units, &SchedulerConfig::with_width(2)).unwrap_err();
        assert!(matches!(
            err,
            ScheduleError::Dependency(DependencyError::CyclicDependency { .. })
        ));
        assert!(!err.is_internal());
    }

    #[test]
    fn test_zero_width_rejected() {
        let err = schedule_build(&diamond(), &SchedulerConfig::with_width(0)).unwrap_err();
        assert_eq!(err, ScheduleError::InvalidWidth);
    }

    #[test]
    fn test_unknown_tie_break_rejected() {
        let config = SchedulerConfig {
            tie_break: "random".to_string(),
            ..SchedulerConfig::with_width(2)
        };
        let err = schedule_build(&diamond(), &config).unwrap_err();
        assert_eq!(
            err,
            ScheduleError::Config(ConfigError::UnknownTieBreak("random".to_string()))
        );
    }

    #[test]
    fn test_graph_errors_are_named() {
        let mut graph = Graph::new();
        let mut table = UnitTable::default();
        let x = table.register(&mut graph, "X");
        let y = table.register(&mut graph, "Y");

        let unresolved = ScheduleError::from_graph(
            GraphError::UnresolvedDependency { unplaced: vec![x, y] },
            &table,
        );
        assert_eq!(
            unresolved,
            ScheduleError::UnresolvedDependency {
                unplaced: vec!["X".to_string(), "Y".to_string()],
            }
        );

        let internal = ScheduleError::from_graph(
            GraphError::InternalOrderingInconsistency {
                vertex: x,
                dependant: y,
            },
            &table,
        );
        assert!(internal.is_internal());
        assert!(internal.to_string().starts_with("internal scheduler defect"));
    }

    #[test]
    fn test_planner_for_target() {
        let mut planner = BuildPlanner::new(&diamond(), SchedulerConfig::with_width(2));
        let plan = planner.plan(&["B".to_string()]).unwrap();
        assert_eq!(plan.targets, vec!["B".to_string()]);
        assert_eq!(names(&plan.schedule.levels), vec![vec!["B"], vec!["D"]]);
    }

    #[test]
    fn test_planner_all_targets_when_empty() {
        let mut planner = BuildPlanner::new(&diamond(), SchedulerConfig::with_width(2));
        let plan = planner.plan(&[]).unwrap();
        assert_eq!(plan.schedule.unit_count(), 4);
    }

    #[test]
    fn test_planner_add_dependency_changes_plan() {
        let mut planner = BuildPlanner::new(&diamond(), SchedulerConfig::with_width(2));
        assert!(planner.add_dependency("C", "B"));

        let plan = planner.plan(&["B".to_string()]).unwrap();
        assert_eq!(names(&plan.schedule.levels), vec![vec!["B"], vec!["C"], vec!["D"]]);
    }

    #[test]
    fn test_planner_cancellation() {
        let flag = CancellationFlag::new();
        let mut planner =
            BuildPlanner::new(&diamond(), SchedulerConfig::with_width(2)).with_cancellation(flag.clone());

        let plans = planner
            .plan_all(&[vec!["A".to_string()], vec!["C".to_string()]])
            .unwrap();
        assert_eq!(plans.len(), 2);

        flag.cancel();
        assert!(planner.cancellation().is_cancelled());
        assert_eq!(planner.plan(&["A".to_string()]), Err(PlanError::Cancelled));
    }
}
