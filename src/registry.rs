//! Name-keyed store of computation units.
//!
//! Built once by a composition root (see [`crate::engine::EngineBuilder`]),
//! then frozen inside an [`crate::engine::Engine`] and shared read-only.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::plan::Plan;
use crate::unit::{Category, ComputationUnit};
use crate::{EngineError, Result};

#[derive(Clone, Default)]
pub struct Registry {
    units: BTreeMap<String, Arc<dyn ComputationUnit>>,
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("units", &self.units.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a unit under its metadata name. Last write wins; the
    /// replaced unit is returned.
    pub fn register(&mut self, unit: Arc<dyn ComputationUnit>) -> Option<Arc<dyn ComputationUnit>> {
        let name = unit.metadata().name;
        let previous = self.units.insert(name.to_string(), unit);
        if previous.is_some() {
            tracing::warn!(unit = name, "unit registered twice, previous entry replaced");
        }
        previous
    }

    /// Register a unit, rejecting a name that is already taken
    pub fn register_unique(&mut self, unit: Arc<dyn ComputationUnit>) -> Result<()> {
        let name = unit.metadata().name;
        if self.units.contains_key(name) {
            return Err(EngineError::DuplicateUnit(name.to_string()));
        }
        self.units.insert(name.to_string(), unit);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn ComputationUnit>> {
        self.units.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.units.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Registered names in order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.units.keys().map(String::as_str)
    }

    pub fn by_category(&self, category: Category) -> Vec<&Arc<dyn ComputationUnit>> {
        self.units
            .values()
            .filter(|u| u.metadata().category == category)
            .collect()
    }

    /// Units selected by `plan`, ordered by name.
    ///
    /// A plan naming an unregistered unit, or carrying overrides for one,
    /// is a configuration error.
    pub fn select(&self, plan: &Plan) -> Result<Vec<&Arc<dyn ComputationUnit>>> {
        for name in plan.units.iter().chain(plan.overrides.keys()) {
            if !self.units.contains_key(name) {
                return Err(EngineError::UnknownUnit(name.clone()));
            }
        }
        Ok(self
            .units
            .values()
            .filter(|u| plan.selects(u.metadata()))
            .collect())
    }
}
