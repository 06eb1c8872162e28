//! The per-run problem context.

use crate::config::Config;
use crate::error::Result;
use crate::eval::Evaluator;
use crate::perf::{AnalyticColdStart, ColdStartPredictor, PerformanceIndex};
use crate::system::SystemData;
use std::sync::Arc;

/// Everything a search worker needs, constructed once per driver run and
/// shared by immutable reference.
///
/// Bundling the system and the performance index in one value keeps the hot
/// path free of global state; reproducibility comes from per-trial seeding,
/// not from anything stored here.
#[derive(Debug)]
pub struct ProblemContext {
    /// The resolved problem instance.
    pub system: SystemData,
    /// Performance models and the Edge/VM demand cache.
    pub perf: PerformanceIndex,
}

impl ProblemContext {
    /// Build a context with the in-process analytic cold-start predictor.
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::with_predictor(config, Arc::new(AnalyticColdStart))
    }

    /// Build a context with a caller-provided cold-start predictor.
    pub fn with_predictor(
        config: &Config,
        predictor: Arc<dyn ColdStartPredictor>,
    ) -> Result<Self> {
        let system = SystemData::from_config(config)?;
        let perf = PerformanceIndex::from_config(config, &system, predictor)?;
        Ok(Self { system, perf })
    }

    /// An evaluator borrowing this context.
    #[must_use]
    pub fn evaluator(&self) -> Evaluator<'_> {
        Evaluator::new(&self.system, &self.perf)
    }
}
