//! Data model for coaching sessions.
//!
//! Wire-facing types mirror the inference server's JSON schema exactly;
//! everything else is recomputed per iteration and never persisted.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::distribution::{Distribution, Family};

/// Variables tracked by the skill-progress model, with their parametric
/// family. The server expresses `learning_rate` as a rate-bounded
/// non-negative quantity; `skill` and `difficulty` are real-valued.
pub const TRACKED_VARIABLES: [(&str, Family); 3] = [
    ("skill", Family::Gaussian),
    ("learning_rate", Family::Gamma),
    ("difficulty", Family::Gaussian),
];

/// Outbound payload: one self-assessment rating, constructed fresh per
/// session iteration and discarded after send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurveyResponse {
    pub performance: i64,
}

/// Raw `[param_a, param_b]` pairs keyed by variable name, exactly as the
/// server sends them. Interpretation depends on the variable's family.
pub type RawStats = BTreeMap<String, Vec<f64>>;

/// Prior/posterior statistics returned by the server for one session.
///
/// A variable missing from either mapping disables that variable's plot but
/// does not invalidate the report.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionReport {
    #[serde(default)]
    pub prior_stats: RawStats,
    #[serde(default)]
    pub posterior_stats: RawStats,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

impl SessionReport {
    /// Raw `(param_a, param_b)` pair for one variable, if present and
    /// well-formed.
    pub fn raw_pair(stats: &RawStats, variable: &str) -> Option<(f64, f64)> {
        let params = stats.get(variable)?;
        if params.len() != 2 {
            return None;
        }
        Some((params[0], params[1]))
    }
}

/// Validated statistics for one variable, immutable once parsed from the
/// wire response.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableStats {
    pub name: String,
    pub distribution: Distribution,
}

impl VariableStats {
    /// Parse and validate raw wire parameters for a variable.
    pub fn from_raw(
        name: &str,
        family: Family,
        param_a: f64,
        param_b: f64,
    ) -> Result<Self, crate::distribution::DistributionError> {
        Ok(Self {
            name: name.to_string(),
            distribution: Distribution::from_raw(family, param_a, param_b)?,
        })
    }
}

/// Plot-ready density curves for one variable.
///
/// Recomputed every session iteration; consumed only for rendering and for
/// grounding the recommendation prompt.
#[derive(Debug, Clone)]
pub struct PlotSeries {
    pub variable_name: String,
    pub x: Vec<f64>,
    pub prior_density: Vec<f64>,
    pub posterior_density: Vec<f64>,
    pub prior_mean: f64,
    pub posterior_mean: f64,
}

impl PlotSeries {
    /// Shift of the distribution mean from prior to posterior.
    pub fn mean_shift(&self) -> f64 {
        self.posterior_mean - self.prior_mean
    }
}
