//! Distribution curves for the latent skill-progress model.
//!
//! Two parametric families cover everything the server reports: Gaussian for
//! real-valued variables and Gamma for rate-bounded ones. Downstream code
//! dispatches on the family tag instead of assuming one shape.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use thiserror::Error;

use crate::types::PlotSeries;

/// Default sample count for density curves.
pub const DEFAULT_CURVE_POINTS: usize = 1000;

/// Half-width substituted when a plot range collapses to a single point.
const EPSILON_RANGE: f64 = 1e-6;

/// Errors from distribution validation and curve computation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DistributionError {
    #[error("{family} parameter {name} must be positive and finite, got {value}")]
    InvalidParam {
        family: Family,
        name: &'static str,
        value: f64,
    },

    #[error("curve needs at least 2 points, got {0}")]
    InvalidRange(usize),

    #[error("prior family {prior} does not match posterior family {posterior}")]
    FamilyMismatch { prior: Family, posterior: Family },
}

/// Parametric family tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Family {
    Gaussian,
    Gamma,
}

impl std::fmt::Display for Family {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Family::Gaussian => write!(f, "gaussian"),
            Family::Gamma => write!(f, "gamma"),
        }
    }
}

/// A validated distribution: family tag plus its two parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "lowercase")]
pub enum Distribution {
    Gaussian { mean: f64, std: f64 },
    Gamma { shape: f64, rate: f64 },
}

impl Distribution {
    /// Build a distribution from raw wire parameters, rejecting invalid
    /// values before they reach any curve math.
    pub fn from_raw(family: Family, param_a: f64, param_b: f64) -> Result<Self, DistributionError> {
        let dist = match family {
            Family::Gaussian => Distribution::Gaussian {
                mean: param_a,
                std: param_b,
            },
            Family::Gamma => Distribution::Gamma {
                shape: param_a,
                rate: param_b,
            },
        };
        dist.validate()?;
        Ok(dist)
    }

    pub fn family(&self) -> Family {
        match self {
            Distribution::Gaussian { .. } => Family::Gaussian,
            Distribution::Gamma { .. } => Family::Gamma,
        }
    }

    /// Invariants: std > 0, shape > 0, rate > 0, all parameters finite.
    pub fn validate(&self) -> Result<(), DistributionError> {
        let check = |family: Family, name: &'static str, value: f64, positive: bool| {
            if !value.is_finite() || (positive && value <= 0.0) {
                Err(DistributionError::InvalidParam {
                    family,
                    name,
                    value,
                })
            } else {
                Ok(())
            }
        };

        match *self {
            Distribution::Gaussian { mean, std } => {
                check(Family::Gaussian, "mean", mean, false)?;
                check(Family::Gaussian, "std", std, true)
            }
            Distribution::Gamma { shape, rate } => {
                check(Family::Gamma, "shape", shape, true)?;
                check(Family::Gamma, "rate", rate, true)
            }
        }
    }

    pub fn mean(&self) -> f64 {
        match *self {
            Distribution::Gaussian { mean, .. } => mean,
            Distribution::Gamma { shape, rate } => shape / rate,
        }
    }

    /// Probability density at `x`.
    ///
    /// The Gamma density at x = 0 follows the usual convention: 0 for
    /// shape > 1, `rate` at shape = 1, +inf for shape < 1. Renderers clamp
    /// non-finite samples.
    pub fn density(&self, x: f64) -> f64 {
        match *self {
            Distribution::Gaussian { mean, std } => {
                let z = (x - mean) / std;
                (-0.5 * z * z).exp() / (std * (2.0 * PI).sqrt())
            }
            Distribution::Gamma { shape, rate } => gamma_pdf(x, shape, rate),
        }
    }
}

/// Gamma pdf with scale = 1/rate, evaluated in log space for stability.
fn gamma_pdf(x: f64, shape: f64, rate: f64) -> f64 {
    if x < 0.0 {
        return 0.0;
    }
    if x == 0.0 {
        return if shape > 1.0 {
            0.0
        } else if shape == 1.0 {
            rate
        } else {
            f64::INFINITY
        };
    }
    (shape * rate.ln() + (shape - 1.0) * x.ln() - rate * x - ln_gamma(shape)).exp()
}

/// Approximation of ln(Γ(x)) using Stirling's asymptotic expansion, with a
/// shift recurrence so small arguments land where the expansion is accurate.
fn ln_gamma(x: f64) -> f64 {
    if x <= 0.0 {
        return f64::INFINITY;
    }

    let mut x = x;
    let mut result = 0.0;
    while x < 10.0 {
        result -= x.ln();
        x += 1.0;
    }

    let inv_x = 1.0 / x;
    let inv_x2 = inv_x * inv_x;
    let correction = inv_x * (1.0 / 12.0 - inv_x2 * (1.0 / 360.0 - inv_x2 / 1260.0));

    result + (x - 0.5) * x.ln() - x + 0.5 * (2.0 * PI).ln() + correction
}

/// Shared x-range covering both the prior and posterior curves of one
/// variable.
///
/// Gaussian pairs span `[min(means) - 3*max(stds), max(means) + 3*max(stds)]`;
/// Gamma pairs span `[0, 3 * max(means)]`. A range that collapses to a single
/// point (extreme magnitudes can swallow the spread in floating point) is
/// widened by a minimal epsilon instead of producing a zero-width grid.
pub fn shared_range(
    prior: &Distribution,
    posterior: &Distribution,
) -> Result<(f64, f64), DistributionError> {
    prior.validate()?;
    posterior.validate()?;

    let (lo, mut hi) = match (prior, posterior) {
        (
            Distribution::Gaussian {
                mean: m0,
                std: s0,
            },
            Distribution::Gaussian {
                mean: m1,
                std: s1,
            },
        ) => {
            let spread = 3.0 * s0.max(*s1);
            (m0.min(*m1) - spread, m0.max(*m1) + spread)
        }
        (Distribution::Gamma { .. }, Distribution::Gamma { .. }) => {
            (0.0, 3.0 * prior.mean().max(posterior.mean()))
        }
        _ => {
            return Err(DistributionError::FamilyMismatch {
                prior: prior.family(),
                posterior: posterior.family(),
            })
        }
    };

    if !(hi > lo) {
        // The epsilon must outgrow the ulp at this magnitude or the widened
        // bound rounds straight back onto lo.
        hi = lo + EPSILON_RANGE.max(lo.abs() * 1e-9);
    }
    Ok((lo, hi))
}

/// Evaluate the density over `num_points` evenly spaced samples in
/// `[lo, hi]` inclusive.
pub fn compute_curve(
    dist: &Distribution,
    lo: f64,
    hi: f64,
    num_points: usize,
) -> Result<(Vec<f64>, Vec<f64>), DistributionError> {
    if num_points < 2 {
        return Err(DistributionError::InvalidRange(num_points));
    }
    dist.validate()?;

    let step = (hi - lo) / (num_points - 1) as f64;
    let x: Vec<f64> = (0..num_points).map(|i| lo + step * i as f64).collect();
    let density = x.iter().map(|&v| dist.density(v)).collect();
    Ok((x, density))
}

/// Build the full plot series for one variable over the shared range.
pub fn compute_series(
    name: &str,
    prior: &Distribution,
    posterior: &Distribution,
    num_points: usize,
) -> Result<PlotSeries, DistributionError> {
    let (lo, hi) = shared_range(prior, posterior)?;
    let (x, prior_density) = compute_curve(prior, lo, hi, num_points)?;
    let (_, posterior_density) = compute_curve(posterior, lo, hi, num_points)?;

    Ok(PlotSeries {
        variable_name: name.to_string(),
        x,
        prior_density,
        posterior_density,
        prior_mean: prior.mean(),
        posterior_mean: posterior.mean(),
    })
}
