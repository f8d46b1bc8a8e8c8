//! Terminal rendering of distribution curves.
//!
//! Draws prior and posterior densities for one variable as a character-grid
//! line plot with mean markers, in the prior-cyan / posterior-magenta
//! palette.

use coach_common::types::PlotSeries;
use coach_common::SessionError;
use owo_colors::OwoColorize;

/// Plot surface consumed by the session controller. Nothing beyond
/// success/failure flows back into the core logic.
pub trait Renderer: Send + Sync {
    fn render(&self, series: &PlotSeries) -> Result<(), SessionError>;
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Cell {
    Empty,
    Prior,
    Posterior,
    PriorMean,
    PosteriorMean,
}

/// Character-grid plot on stdout.
pub struct TerminalRenderer {
    width: usize,
    height: usize,
}

impl TerminalRenderer {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width: width.max(16),
            height: height.max(4),
        }
    }

    /// Rasterize both curves onto a `height` x `width` grid. Returns the
    /// grid and the density value mapped to the top row.
    fn grid(&self, series: &PlotSeries) -> Result<(Vec<Vec<Cell>>, f64), SessionError> {
        let len = series.x.len();
        if len < 2 || series.prior_density.len() != len || series.posterior_density.len() != len {
            return Err(SessionError::Analysis(format!(
                "plot series for {} is not renderable",
                series.variable_name
            )));
        }

        let y_max = series
            .prior_density
            .iter()
            .chain(series.posterior_density.iter())
            .copied()
            .filter(|v| v.is_finite())
            .fold(0.0_f64, f64::max);
        let y_max = if y_max > 0.0 { y_max } else { 1.0 };

        let mut grid = vec![vec![Cell::Empty; self.width]; self.height];

        let mut plot_curve = |density: &[f64], mark: Cell| {
            for col in 0..self.width {
                let idx = col * (len - 1) / (self.width - 1);
                // Non-finite samples (Gamma spike at the origin) clamp to the top
                let value = if density[idx].is_finite() {
                    density[idx]
                } else {
                    y_max
                };
                let level = ((value / y_max) * (self.height - 1) as f64).round() as usize;
                let row = self.height - 1 - level.min(self.height - 1);
                grid[row][col] = mark;
            }
        };
        plot_curve(&series.prior_density, Cell::Prior);
        plot_curve(&series.posterior_density, Cell::Posterior);

        let lo = series.x[0];
        let hi = series.x[len - 1];
        let mut mark_mean = |mean: f64, mark: Cell| {
            let frac = (mean - lo) / (hi - lo);
            if !(0.0..=1.0).contains(&frac) {
                return;
            }
            let col = (frac * (self.width - 1) as f64).round() as usize;
            for row in grid.iter_mut() {
                if row[col] == Cell::Empty {
                    row[col] = mark;
                }
            }
        };
        mark_mean(series.prior_mean, Cell::PriorMean);
        mark_mean(series.posterior_mean, Cell::PosteriorMean);

        Ok((grid, y_max))
    }
}

impl Default for TerminalRenderer {
    fn default() -> Self {
        Self::new(80, 20)
    }
}

impl Renderer for TerminalRenderer {
    fn render(&self, series: &PlotSeries) -> Result<(), SessionError> {
        let (grid, y_max) = self.grid(series)?;

        println!();
        println!("  {}", title_for(&series.variable_name).bold());

        for (row_idx, row) in grid.iter().enumerate() {
            let label = if row_idx == 0 {
                format!("{y_max:>8.3}")
            } else if row_idx == grid.len() - 1 {
                format!("{:>8.3}", 0.0)
            } else {
                " ".repeat(8)
            };

            let mut line = String::new();
            for cell in row {
                match cell {
                    Cell::Empty => line.push(' '),
                    Cell::Prior => line.push_str(&"*".cyan().to_string()),
                    Cell::Posterior => line.push_str(&"+".magenta().to_string()),
                    Cell::PriorMean => line.push_str(&"|".cyan().dimmed().to_string()),
                    Cell::PosteriorMean => line.push_str(&"|".magenta().dimmed().to_string()),
                }
            }
            println!("  {label} |{line}");
        }

        let lo = series.x[0];
        let hi = series.x[series.x.len() - 1];
        println!("  {} +{}", " ".repeat(8), "-".repeat(self.width));
        println!(
            "  {} {:<12.2}{:^w$}{:>12.2}",
            " ".repeat(8),
            lo,
            "Value",
            hi,
            w = self.width.saturating_sub(24)
        );
        println!(
            "  {} {} prior   {} posterior   {} mean",
            " ".repeat(8),
            "*".cyan(),
            "+".magenta(),
            "|".dimmed()
        );
        println!(
            "  Prior mean: {:.2}   Posterior mean: {:.2}   Mean shift: {:+.2}",
            series.prior_mean,
            series.posterior_mean,
            series.mean_shift()
        );
        println!();

        Ok(())
    }
}

/// "learning_rate" becomes "Learning rate distribution".
fn title_for(variable_name: &str) -> String {
    let mut name = variable_name.replace('_', " ");
    if let Some(first) = name.get_mut(0..1) {
        first.make_ascii_uppercase();
    }
    format!("{name} distribution")
}

#[cfg(test)]
mod tests {
    use super::*;
    use coach_common::distribution::{compute_series, Distribution};

    fn sample_series() -> PlotSeries {
        let prior = Distribution::Gaussian { mean: 5.0, std: 1.0 };
        let posterior = Distribution::Gaussian {
            mean: 6.0,
            std: 0.8,
        };
        compute_series("skill", &prior, &posterior, 200).unwrap()
    }

    #[test]
    fn test_grid_dimensions() {
        let renderer = TerminalRenderer::new(40, 10);
        let (grid, y_max) = renderer.grid(&sample_series()).unwrap();
        assert_eq!(grid.len(), 10);
        assert!(grid.iter().all(|row| row.len() == 40));
        assert!(y_max > 0.0);
    }

    #[test]
    fn test_grid_contains_both_curves_and_means() {
        let renderer = TerminalRenderer::new(40, 10);
        let (grid, _) = renderer.grid(&sample_series()).unwrap();

        let count = |mark: Cell| {
            grid.iter()
                .flat_map(|row| row.iter())
                .filter(|&&c| c == mark)
                .count()
        };
        assert!(count(Cell::Prior) > 0);
        assert!(count(Cell::Posterior) > 0);
        assert!(count(Cell::PriorMean) > 0);
        assert!(count(Cell::PosteriorMean) > 0);
    }

    #[test]
    fn test_nonfinite_samples_are_clamped() {
        // shape < 1 diverges at the origin; the plot must still rasterize
        let prior = Distribution::Gamma {
            shape: 0.5,
            rate: 1.0,
        };
        let posterior = Distribution::Gamma {
            shape: 2.0,
            rate: 1.0,
        };
        let series = compute_series("learning_rate", &prior, &posterior, 200).unwrap();

        let renderer = TerminalRenderer::new(40, 10);
        assert!(renderer.grid(&series).is_ok());
    }

    #[test]
    fn test_unrenderable_series_rejected() {
        let series = PlotSeries {
            variable_name: "skill".to_string(),
            x: vec![0.0],
            prior_density: vec![1.0],
            posterior_density: vec![1.0],
            prior_mean: 0.0,
            posterior_mean: 0.0,
        };
        let renderer = TerminalRenderer::default();
        assert!(renderer.grid(&series).is_err());
    }

    #[test]
    fn test_title_formatting() {
        assert_eq!(title_for("skill"), "Skill distribution");
        assert_eq!(title_for("learning_rate"), "Learning rate distribution");
    }

    #[test]
    fn test_render_smoke() {
        let renderer = TerminalRenderer::new(40, 8);
        renderer.render(&sample_series()).unwrap();
    }
}
