//! Per-invocation selection of units plus parameter overrides.
//!
//! A unit runs when its category, its name or its priority tier is
//! selected. Overrides are keyed `unit name → parameter name → value`.
//!
//! ```rust
//! use yafe::prelude::*;
//!
//! let plan = Plan::none()
//!     .with_category(Category::Momentum)
//!     .with_unit("bollinger")
//!     .with_override("rsi", "period", 9.0);
//! assert!(plan.overrides_for("rsi").is_some());
//! ```

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::unit::{Category, Priority, UnitMetadata};
use crate::{EngineError, Result};

/// Parameter overrides of one unit
pub type Overrides = BTreeMap<String, f64>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Plan {
    /// Whole categories switched on
    pub categories: BTreeSet<Category>,
    /// Explicit unit names
    pub units: BTreeSet<String>,
    /// Priority tiers switched on
    pub tiers: BTreeSet<Priority>,
    pub overrides: BTreeMap<String, Overrides>,
}

impl Plan {
    /// Selects nothing
    pub fn none() -> Self {
        Self::default()
    }

    /// Every category
    pub fn all() -> Self {
        Self {
            categories: Category::ALL.into_iter().collect(),
            ..Self::default()
        }
    }

    /// The required daily batch (P0 tier)
    pub fn daily() -> Self {
        Self::none().with_tier(Priority::P0)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| EngineError::InvalidConfig(e.to_string()))
    }

    pub fn with_category(mut self, category: Category) -> Self {
        self.categories.insert(category);
        self
    }

    pub fn with_unit(mut self, name: impl Into<String>) -> Self {
        self.units.insert(name.into());
        self
    }

    pub fn with_tier(mut self, tier: Priority) -> Self {
        self.tiers.insert(tier);
        self
    }

    pub fn with_override(
        mut self,
        unit: impl Into<String>,
        param: impl Into<String>,
        value: f64,
    ) -> Self {
        self.overrides
            .entry(unit.into())
            .or_default()
            .insert(param.into(), value);
        self
    }

    pub fn overrides_for(&self, unit: &str) -> Option<&Overrides> {
        self.overrides.get(unit)
    }

    /// Whether the plan selects a unit with this metadata
    pub fn selects(&self, meta: &UnitMetadata) -> bool {
        self.categories.contains(&meta.category)
            || self.tiers.contains(&meta.priority)
            || self.units.contains(meta.name)
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty() && self.units.is_empty() && self.tiers.is_empty()
    }
}
