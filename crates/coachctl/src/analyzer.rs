//! Progress analysis: distribution curves plus a grounded recommendation.

use std::collections::BTreeMap;

use coach_common::distribution::{self, Distribution, Family, DEFAULT_CURVE_POINTS};
use coach_common::types::{PlotSeries, SessionReport, TRACKED_VARIABLES};
use coach_common::SessionError;
use tracing::warn;

use crate::completion::CompletionService;

pub struct ProgressAnalyzer<'a> {
    completion: &'a dyn CompletionService,
}

impl<'a> ProgressAnalyzer<'a> {
    pub fn new(completion: &'a dyn CompletionService) -> Self {
        Self { completion }
    }

    /// Build plot series for every tracked variable, then ask the
    /// completion service for a narrative recommendation grounded in them.
    ///
    /// A variable with missing or malformed stats is skipped with a warning;
    /// partial results are expected. Only a report with no usable variable
    /// at all fails.
    pub async fn analyze(
        &self,
        report: &SessionReport,
    ) -> Result<(BTreeMap<String, PlotSeries>, String), SessionError> {
        let mut plot_series = BTreeMap::new();

        for (name, family) in TRACKED_VARIABLES {
            match series_for(report, name, family) {
                Ok(series) => {
                    plot_series.insert(name.to_string(), series);
                }
                Err(e) => warn!(variable = name, error = %e, "skipping variable"),
            }
        }

        if plot_series.is_empty() {
            return Err(SessionError::Analysis(
                "no usable variable statistics in report".to_string(),
            ));
        }

        let prompt = recommendation_prompt(report, &plot_series);
        let recommendation = self
            .completion
            .complete(&prompt)
            .await
            .map_err(|e| SessionError::Analysis(format!("recommendation request failed: {e}")))?;

        Ok((plot_series, recommendation))
    }
}

fn series_for(
    report: &SessionReport,
    name: &str,
    family: Family,
) -> Result<PlotSeries, SessionError> {
    let (prior_a, prior_b) = SessionReport::raw_pair(&report.prior_stats, name)
        .ok_or_else(|| SessionError::Analysis(format!("missing prior stats for {name}")))?;
    let (post_a, post_b) = SessionReport::raw_pair(&report.posterior_stats, name)
        .ok_or_else(|| SessionError::Analysis(format!("missing posterior stats for {name}")))?;

    let prior = Distribution::from_raw(family, prior_a, prior_b)?;
    let posterior = Distribution::from_raw(family, post_a, post_b)?;

    Ok(distribution::compute_series(
        name,
        &prior,
        &posterior,
        DEFAULT_CURVE_POINTS,
    )?)
}

/// One grounding context carrying every variable's numeric parameters in
/// original units, followed by the four-part narrative instruction.
fn recommendation_prompt(
    report: &SessionReport,
    plot_series: &BTreeMap<String, PlotSeries>,
) -> String {
    let mut prompt = String::from(
        "Using the following statistics on the user's skill progress, provide a \
         critical analysis and recommendation:\n\nPrior Beliefs:\n",
    );
    for (name, family) in TRACKED_VARIABLES {
        if let Some(line) = stat_line(&report.prior_stats, name, family) {
            prompt.push_str(&line);
        }
    }

    prompt.push_str("\nUpdated Estimates:\n");
    for (name, family) in TRACKED_VARIABLES {
        if let Some(line) = stat_line(&report.posterior_stats, name, family) {
            prompt.push_str(&line);
        }
    }

    prompt.push_str("\nPlot Data:\n");
    for series in plot_series.values() {
        prompt.push_str(&format!(
            "- {}: prior mean = {:.2}, posterior mean = {:.2}, mean shift = {:.2}, \
             x range = [{:.2}, {:.2}]\n",
            series.variable_name,
            series.prior_mean,
            series.posterior_mean,
            series.mean_shift(),
            series.x.first().copied().unwrap_or(0.0),
            series.x.last().copied().unwrap_or(0.0),
        ));
    }

    prompt.push_str(
        "\nA plot illustrating the shifts from prior to posterior distributions has \
         been shown.\n\n\
         Briefly summarize the following:\n\
         1. Summarize the changes in skill, learning rate, and difficulty, referencing the plot.\n\
         2. Evaluate whether these changes signify meaningful improvement.\n\
         3. Describe what insights you have gained from the new data from the user.\n\
         4. Offer a suggestion for improvement, mentioning any areas where progress is \
         limited or skills may be overestimated.\n\n\
         Address the user directly as \"you\" in your response. Be very concise.\n",
    );

    prompt
}

fn stat_line(
    stats: &coach_common::types::RawStats,
    name: &str,
    family: Family,
) -> Option<String> {
    let (a, b) = SessionReport::raw_pair(stats, name)?;
    let line = match family {
        Family::Gaussian => format!("- {name}: mean = {a:.2}, std = {b:.2}\n"),
        Family::Gamma => format!("- {name}: shape = {a:.2}, rate = {b:.2}\n"),
    };
    Some(line)
}
