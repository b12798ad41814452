//! Declared dependencies of build units and their recursive closures.

use indexmap::{IndexMap, IndexSet};
use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::models::BuildUnit;
use crate::{log_checks, log_debug};

/// Errors raised while resolving recursive dependencies.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DependencyError {
    #[error("Cyclic dependency discovered {unit} <--> {dependency}")]
    CyclicDependency { unit: String, dependency: String },
    #[error("Unknown build unit: {0}")]
    UnknownUnit(String),
}

/// Maps each known unit to its declared dependencies, in declaration order.
///
/// Recursive closures are memoized per unit. Any change to a declaration
/// clears the memo, since other units' closures may pass through the
/// changed unit.
#[derive(Debug, Clone, Default)]
pub struct DependencyIndex {
    units: IndexMap<String, Vec<String>>,
    closures: FxHashMap<String, IndexSet<String>>,
    verbosity: u8,
}

impl DependencyIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index from unit records. A unit listed twice keeps the
    /// declarations of its first record merged with the later ones.
    ///
    /// Declarations are kept as written; only exact repeats are dropped.
    pub fn from_units<'a, I>(units: I) -> Self
    where
        I: IntoIterator<Item = &'a BuildUnit>,
    {
        let mut index = Self::new();
        for unit in units {
            index.insert_unit(&unit.id, unit.dependencies.iter().cloned());
        }
        index
    }

    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Register a unit (if new) and append the given declarations.
    ///
    /// Identifiers are case-sensitive here: `Core` and `core` are distinct
    /// units and both edges are kept.
    pub fn insert_unit<I>(&mut self, unit_id: &str, dependencies: I)
    where
        I: IntoIterator<Item = String>,
    {
        let declared = self.units.entry(unit_id.to_string()).or_default();
        for dependency in dependencies {
            if !declared.contains(&dependency) {
                declared.push(dependency);
            }
        }
        self.closures.clear();
    }

    /// Declare an extra dependency of `unit_id` after the units were read.
    ///
    /// An existing declaration that matches case-insensitively counts as a
    /// duplicate and is left alone. Returns `true` if the declaration was added.
    pub fn add_dependency(&mut self, unit_id: &str, dependency: &str) -> bool {
        let declared = self.units.entry(unit_id.to_string()).or_default();
        if declared
            .iter()
            .any(|d| d.eq_ignore_ascii_case(dependency))
        {
            return false;
        }
        declared.push(dependency.to_string());
        self.closures.clear();
        true
    }

    /// Declared (direct, possibly redundant) dependencies of a unit.
    pub fn dependencies_of(&self, unit_id: &str) -> Option<&[String]> {
        self.units.get(unit_id).map(Vec::as_slice)
    }

    pub fn contains(&self, unit_id: &str) -> bool {
        self.units.contains_key(unit_id)
    }

    /// Known unit identifiers in insertion order.
    pub fn unit_ids(&self) -> impl Iterator<Item = &str> {
        self.units.keys().map(String::as_str)
    }

    /// Known units as records, in insertion order.
    pub fn units(&self) -> Vec<BuildUnit> {
        self.units
            .iter()
            .map(|(id, deps)| BuildUnit {
                id: id.clone(),
                dependencies: deps.clone(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Transitive closure of a unit's declared dependencies.
    ///
    /// Dependencies that are not known units are included but not expanded.
    /// Fails with `CyclicDependency` naming the first pair found to close a
    /// cycle during the descent.
    pub fn resolve_recursive(&mut self, unit_id: &str) -> Result<&IndexSet<String>, DependencyError> {
        if !self.units.contains_key(unit_id) {
            return Err(DependencyError::UnknownUnit(unit_id.to_string()));
        }
        let mut in_progress: Vec<String> = Vec::new();
        self.resolve_into(unit_id, &mut in_progress)?;
        self.closures
            .get(unit_id)
            .ok_or_else(|| DependencyError::UnknownUnit(unit_id.to_string()))
    }

    /// Resolve every known unit, surfacing the first cycle found.
    pub fn validate(&mut self) -> Result<(), DependencyError> {
        let ids: Vec<String> = self.units.keys().cloned().collect();
        for unit_id in &ids {
            self.resolve_recursive(unit_id)?;
        }
        Ok(())
    }

    fn resolve_into(
        &mut self,
        unit_id: &str,
        in_progress: &mut Vec<String>,
    ) -> Result<(), DependencyError> {
        if self.closures.contains_key(unit_id) {
            return Ok(());
        }
        let Some(declared) = self.units.get(unit_id).cloned() else {
            return Ok(());
        };

        in_progress.push(unit_id.to_string());
        let mut closure: IndexSet<String> = declared.iter().cloned().collect();

        for dependency in &declared {
            if !self.units.contains_key(dependency.as_str()) {
                continue;
            }
            if in_progress.iter().any(|p| p == dependency) {
                log_checks!(
                    self.verbosity,
                    "cycle closed by {} -> {}",
                    unit_id,
                    dependency
                );
                return Err(DependencyError::CyclicDependency {
                    unit: unit_id.to_string(),
                    dependency: dependency.clone(),
                });
            }

            self.resolve_into(dependency, in_progress)?;

            if let Some(dependency_closure) = self.closures.get(dependency.as_str()) {
                if dependency_closure.contains(unit_id) {
                    return Err(DependencyError::CyclicDependency {
                        unit: unit_id.to_string(),
                        dependency: dependency.clone(),
                    });
                }
                closure.extend(dependency_closure.iter().cloned());
            }
        }

        in_progress.pop();
        log_debug!(
            self.verbosity,
            "closure of {} has {} entries",
            unit_id,
            closure.len()
        );
        self.closures.insert(unit_id.to_string(), closure);
        Ok(())
    }
}

/// Resolve the recursive dependencies of `unit` against `all_units`.
///
/// `unit` need not appear in `all_units`. Its own declarations are merged with
/// any record of the same id in `all_units` before resolving.
pub fn resolve_recursive_dependencies(
    unit: &BuildUnit,
    all_units: &[BuildUnit],
) -> Result<IndexSet<String>, DependencyError> {
    let mut index = DependencyIndex::from_units(all_units);
    index.insert_unit(&unit.id, unit.dependencies.iter().cloned());
    index.resolve_recursive(&unit.id).cloned()
}
