//! Analysis Configuration
//!
//! Paths and parameters of the post-hoc analysis pipeline. Path defaults follow
//! the layout the experiment runner writes into.
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration of one analysis run.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct AnalysisConfig {
    /// CSV file with the raw allometry measurements.
    pub data_path: PathBuf,
    /// Directory holding the per-split result artifacts.
    pub results_dir: PathBuf,
    /// Directory the figures are written to.
    pub output_dir: PathBuf,
    /// Run name embedded in the artifact file names.
    pub runname: String,
    /// Lower and upper quantile levels of the fitted intervals.
    pub quantiles: [f64; 2],
    /// Rolling window length, in observations.
    pub window_len: usize,
    /// Explicit rng seed for reproducible runs; `None` seeds from the OS.
    pub seed: Option<u64>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            data_path: PathBuf::from("experiments/prediction_intervals/biomass_data/leafs.csv"),
            results_dir: PathBuf::from("experiments/results/biomass_analysis"),
            output_dir: PathBuf::from("experiments/results"),
            runname: "base".to_string(),
            quantiles: [0.1, 0.9],
            window_len: 100,
            seed: None,
        }
    }
}

impl AnalysisConfig {
    /// Nominal coverage level of the two-sided intervals.
    pub fn level(&self) -> f64 {
        self.quantiles[1] - self.quantiles[0]
    }

    /// The rng every randomized step of the pipeline draws from.
    pub fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        }
    }

    /// Full path of an output figure.
    pub fn figure_path<P: AsRef<Path>>(&self, name: P) -> PathBuf {
        self.output_dir.join(name)
    }
}
