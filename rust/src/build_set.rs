//! Selection of the units that must be rebuilt for a set of targets.
//!
//! A target is validated by rebuilding everything that consumes it, so the
//! build set for a target is the target plus all of its transitive dependants.

use indexmap::IndexMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;

use crate::dependency_index::{DependencyError, DependencyIndex};
use crate::models::BuildUnit;
use crate::{log_changes, log_checks};

/// Errors raised while selecting a build set.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectionError {
    #[error(transparent)]
    Dependency(#[from] DependencyError),
    #[error("Build set selection cancelled")]
    Cancelled,
}

/// Shared flag used to stop selection and planning between unit resolutions.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Select the units to schedule for `targets`.
///
/// With no targets, every known unit is selected unchanged. Otherwise each
/// target comes first, followed by its transitive dependants in index order.
/// Every selected dependant also gains a declared dependency on the target
/// that pulled it in, so the target always lands on the earliest level.
pub fn select_build_set(
    index: &mut DependencyIndex,
    targets: &[String],
    verbosity: u8,
) -> Result<Vec<BuildUnit>, SelectionError> {
    select_build_set_cancellable(index, targets, None, verbosity)
}

/// `select_build_set`, polling `cancel` before each unit is resolved.
pub fn select_build_set_cancellable(
    index: &mut DependencyIndex,
    targets: &[String],
    cancel: Option<&CancellationFlag>,
    verbosity: u8,
) -> Result<Vec<BuildUnit>, SelectionError> {
    if targets.is_empty() {
        return Ok(index.units());
    }

    let unit_ids: Vec<String> = index.unit_ids().map(str::to_string).collect();
    let mut selected: IndexMap<String, Vec<String>> = IndexMap::new();

    for target in targets {
        if !index.contains(target) {
            log_checks!(
                verbosity,
                "target {} declares no dependencies; scheduling it as a leaf",
                target
            );
        }
        selected.entry(target.clone()).or_insert_with(|| {
            index
                .dependencies_of(target)
                .map(<[String]>::to_vec)
                .unwrap_or_default()
        });

        for unit_id in &unit_ids {
            if cancel.is_some_and(CancellationFlag::is_cancelled) {
                return Err(SelectionError::Cancelled);
            }
            if unit_id == target {
                continue;
            }

            let closure = index.resolve_recursive(unit_id)?;
            if !closure.contains(target.as_str()) {
                continue;
            }

            let declared = selected.entry(unit_id.clone()).or_insert_with(|| {
                index
                    .dependencies_of(unit_id)
                    .map(<[String]>::to_vec)
                    .unwrap_or_default()
            });
            if !declared.iter().any(|d| d == target) {
                declared.push(target.clone());
            }
        }
    }

    log_changes!(
        verbosity,
        "build set for {:?}: {:?}",
        targets,
        selected.keys().collect::<Vec<_>>()
    );

    Ok(selected
        .into_iter()
        .map(|(id, dependencies)| BuildUnit { id, dependencies })
        .collect())
}
