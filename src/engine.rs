//! Orchestration: select units from the registry, run each one in
//! isolation, merge outputs and record diagnostics.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::params::Params;
use crate::pattern::ChartPatternUnit;
use crate::plan::Plan;
use crate::registry::Registry;
use crate::result::{AnalysisResult, Diagnostics, Severity, UnitResult};
use crate::series::TimeSeries;
use crate::unit::{ComputationUnit, UnitMetadata, UnitOutput};
use crate::units::*;
use crate::{EngineError, Result};

// ============================================================
// CONFIG
// ============================================================

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Fan units out on a worker pool
    pub parallel: bool,
    /// Pool size; defaults to twice the available cores
    pub worker_threads: Option<usize>,
    /// Drop detected patterns weaker than this
    pub min_pattern_strength: Option<u8>,
    /// Reject NaN, infinite and high < low observations
    pub validate_data: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            parallel: true,
            worker_threads: None,
            min_pattern_strength: None,
            validate_data: false,
        }
    }
}

impl EngineConfig {
    fn validate(&self) -> Result<()> {
        if self.worker_threads == Some(0) {
            return Err(EngineError::InvalidConfig(
                "worker_threads must be > 0".to_string(),
            ));
        }
        if let Some(min) = self.min_pattern_strength {
            if min > 100 {
                return Err(EngineError::OutOfRange {
                    field: "min_pattern_strength",
                    value: f64::from(min),
                    min: 0.0,
                    max: 100.0,
                });
            }
        }
        Ok(())
    }

    fn threads(&self) -> usize {
        self.worker_threads.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
                * 2
        })
    }
}

// ============================================================
// ENGINE
// ============================================================

/// Outcome of one unit
enum Outcome {
    Succeeded(UnitOutput),
    Skipped(String),
    Failed(String),
}

/// Main computation engine. Holds no per-call state; one instance can
/// serve many concurrent callers.
#[derive(Debug)]
pub struct Engine {
    registry: Registry,
    config: EngineConfig,
    pool: Option<rayon::ThreadPool>,
}

impl Engine {
    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run the units selected by `plan` over `series`.
    ///
    /// Errors are configuration errors only (empty series, unknown unit
    /// names, invalid bars when validation is on). Unit failures land in
    /// the returned [`Diagnostics`].
    pub fn run(&self, series: &TimeSeries, plan: &Plan) -> Result<(AnalysisResult, Diagnostics)> {
        let started = Instant::now();

        if series.is_empty() {
            return Err(EngineError::EmptySeries {
                symbol: series.symbol().to_string(),
            });
        }
        if self.config.validate_data {
            series.validate()?;
        }

        let selected = self.registry.select(plan)?;
        let outcomes: Vec<(&UnitMetadata, Outcome)> = match &self.pool {
            Some(pool) if selected.len() > 1 => pool.install(|| {
                selected
                    .par_iter()
                    .map(|unit| (unit.metadata(), execute(unit, series, plan)))
                    .collect()
            }),
            _ => selected
                .iter()
                .map(|unit| (unit.metadata(), execute(unit, series, plan)))
                .collect(),
        };

        let symbol = series.symbol();
        let mut result = AnalysisResult::new(symbol, series.as_of());
        let mut diagnostics = Diagnostics::default();

        for (meta, outcome) in outcomes {
            let name = meta.name;
            match outcome {
                Outcome::Succeeded(mut output) => {
                    diagnostics.total += 1;
                    diagnostics.succeeded += 1;
                    self.filter_patterns(&mut output);
                    for warning in &output.warnings {
                        tracing::warn!(symbol, unit = name, warning = %warning, "unit warning");
                        diagnostics.push(name, Severity::Warning, warning.as_str());
                    }
                    tracing::debug!(
                        symbol,
                        unit = name,
                        keys = output.values.len(),
                        patterns = output.patterns.len(),
                        "unit succeeded"
                    );
                    result.patterns.extend(output.patterns);
                    result.units.insert(
                        name.to_string(),
                        UnitResult {
                            category: meta.category,
                            values: output.values,
                        },
                    );
                }
                Outcome::Skipped(reason) => {
                    diagnostics.skipped += 1;
                    tracing::debug!(symbol, unit = name, reason = %reason, "unit skipped");
                    diagnostics.push(name, Severity::Note, reason);
                }
                Outcome::Failed(reason) => {
                    diagnostics.total += 1;
                    diagnostics.failed += 1;
                    tracing::warn!(symbol, unit = name, error = %reason, "unit failed");
                    diagnostics.push(name, Severity::Error, reason);
                }
            }
        }

        diagnostics.elapsed = started.elapsed();
        tracing::info!(
            symbol,
            total = diagnostics.total,
            succeeded = diagnostics.succeeded,
            failed = diagnostics.failed,
            skipped = diagnostics.skipped,
            elapsed_ms = diagnostics.elapsed.as_millis() as u64,
            "run complete"
        );

        Ok((result, diagnostics))
    }

    /// Run many symbols. A configuration error for one symbol is reported
    /// in the error list and does not stop the others.
    pub fn run_batch(&self, batch: &[TimeSeries], plan: &Plan) -> (Vec<BatchItem>, Vec<BatchError>) {
        let run_one = |series: &TimeSeries| {
            self.run(series, plan)
                .map(|(result, diagnostics)| BatchItem {
                    symbol: series.symbol().to_string(),
                    result,
                    diagnostics,
                })
                .map_err(|error| BatchError {
                    symbol: series.symbol().to_string(),
                    error,
                })
        };

        let results: Vec<_> = match &self.pool {
            Some(pool) => pool.install(|| batch.par_iter().map(run_one).collect()),
            None => batch.iter().map(run_one).collect(),
        };

        let mut successes = Vec::new();
        let mut errors = Vec::new();

        for result in results {
            match result {
                Ok(item) => successes.push(item),
                Err(e) => errors.push(e),
            }
        }

        (successes, errors)
    }

    /// Apply `min_pattern_strength`: drop weak patterns, their keys and
    /// their warnings.
    fn filter_patterns(&self, output: &mut UnitOutput) {
        let Some(min) = self.config.min_pattern_strength else {
            return;
        };
        let (kept, dropped): (Vec<_>, Vec<_>) =
            output.patterns.drain(..).partition(|p| p.strength >= min);

        for pattern in &dropped {
            let id = pattern.pattern_id;
            if kept.iter().any(|k| k.pattern_id == id) {
                continue;
            }
            output.values.remove(id.as_str());
            let prefix = format!("{}: ", id.as_str());
            output.warnings.retain(|w| !w.starts_with(&prefix));
        }
        output.patterns = kept;
    }
}

fn execute(unit: &Arc<dyn ComputationUnit>, series: &TimeSeries, plan: &Plan) -> Outcome {
    let meta = unit.metadata();
    if series.size() < meta.min_observations {
        return Outcome::Skipped(format!(
            "insufficient data: need {} observations, got {}",
            meta.min_observations,
            series.size()
        ));
    }

    let params = match Params::resolve(meta.params, plan.overrides_for(meta.name)) {
        Ok(params) => params,
        Err(e) => return Outcome::Failed(e.to_string()),
    };

    match panic::catch_unwind(AssertUnwindSafe(|| unit.compute(series, &params))) {
        Ok(Ok(output)) => Outcome::Succeeded(output),
        Ok(Err(e)) if e.is_skip() => Outcome::Skipped(e.to_string()),
        Ok(Err(e)) => Outcome::Failed(e.to_string()),
        Err(payload) => Outcome::Failed(format!("panicked: {}", panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

// ============================================================
// BUILDER
// ============================================================

/// Builder for creating Engine instances
pub struct EngineBuilder {
    registry: Registry,
    config: EngineConfig,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Generate an array of shared units using `Default::default()` for each type.
macro_rules! builtin_units {
  ($($unit:ty),* $(,)?) => {
    [$(Arc::new(<$unit>::default()) as Arc<dyn ComputationUnit>),*]
  };
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self {
            registry: Registry::new(),
            config: EngineConfig::default(),
        }
    }

    /// Add every builtin unit
    pub fn with_all_defaults(self) -> Self {
        self.with_trend_defaults()
            .with_momentum_defaults()
            .with_volatility_defaults()
            .with_volume_defaults()
            .with_support_defaults()
            .with_chip_defaults()
            .with_candlestick_defaults()
            .with_pattern_defaults()
    }

    pub fn with_trend_defaults(self) -> Self {
        self.extend(builtin_units![MovingAverage, ExponentialAverage, LinearRegression])
    }

    pub fn with_momentum_defaults(self) -> Self {
        self.extend(builtin_units![Rsi, Macd, Qstick, BalanceOfPower, ElderRay])
    }

    pub fn with_volatility_defaults(self) -> Self {
        self.extend(builtin_units![Bollinger, Donchian])
    }

    pub fn with_volume_defaults(self) -> Self {
        self.extend(builtin_units![ChaikinMoneyFlow])
    }

    pub fn with_support_defaults(self) -> Self {
        self.extend(builtin_units![PivotPoints])
    }

    pub fn with_chip_defaults(self) -> Self {
        self.extend(builtin_units![InstitutionalFlow])
    }

    pub fn with_candlestick_defaults(self) -> Self {
        self.extend(builtin_units![SingleCandle, DoubleCandle, TripleCandle])
    }

    pub fn with_pattern_defaults(self) -> Self {
        self.extend(builtin_units![ChartPatternUnit])
    }

    fn extend(mut self, units: impl IntoIterator<Item = Arc<dyn ComputationUnit>>) -> Self {
        for unit in units {
            self.registry.register(unit);
        }
        self
    }

    /// Add a unit, replacing any unit registered under the same name
    #[allow(clippy::should_implement_trait)]
    pub fn add<U: ComputationUnit + 'static>(self, unit: U) -> Self {
        self.add_shared(Arc::new(unit))
    }

    pub fn add_shared(mut self, unit: Arc<dyn ComputationUnit>) -> Self {
        self.registry.register(unit);
        self
    }

    /// Add a unit, failing if its name is already registered
    pub fn add_checked<U: ComputationUnit + 'static>(mut self, unit: U) -> Result<Self> {
        self.registry.register_unique(Arc::new(unit))?;
        Ok(self)
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Enable/disable the worker pool
    pub fn parallel(mut self, enable: bool) -> Self {
        self.config.parallel = enable;
        self
    }

    pub fn worker_threads(mut self, threads: usize) -> Self {
        self.config.worker_threads = Some(threads);
        self
    }

    /// Set minimum pattern strength filter
    pub fn min_pattern_strength(mut self, strength: u8) -> Self {
        self.config.min_pattern_strength = Some(strength);
        self
    }

    /// Enable/disable data validation
    pub fn validate_data(mut self, enable: bool) -> Self {
        self.config.validate_data = enable;
        self
    }

    /// Build the engine. Fails on invalid config or a unit whose declared
    /// parameter defaults fall outside their own ranges.
    pub fn build(self) -> Result<Engine> {
        self.config.validate()?;
        for name in self.registry.names() {
            let Some(unit) = self.registry.get(name) else {
                continue;
            };
            for param in unit.metadata().params {
                param.validate(param.default).map_err(|e| {
                    EngineError::InvalidConfig(format!(
                        "unit '{}' parameter '{}': {}",
                        name, param.name, e
                    ))
                })?;
            }
        }

        let pool = if self.config.parallel {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(self.config.threads())
                .thread_name(|i| format!("yafe-worker-{i}"))
                .build()
                .map_err(|e| EngineError::InvalidConfig(e.to_string()))?;
            Some(pool)
        } else {
            None
        };

        Ok(Engine {
            registry: self.registry,
            config: self.config,
            pool,
        })
    }
}

// ============================================================
// BATCH RESULTS
// ============================================================

/// Result of running a single symbol
#[derive(Debug)]
pub struct BatchItem {
    pub symbol: String,
    pub result: AnalysisResult,
    pub diagnostics: Diagnostics,
}

/// Error from running a single symbol
#[derive(Debug)]
pub struct BatchError {
    pub symbol: String,
    pub error: EngineError,
}

// ============================================================
// TESTS
// ============================================================
