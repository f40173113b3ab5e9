//! Biomass Prediction-Interval Analysis
//! ====================================
//! Post-hoc analysis of the prediction-interval experiments on the biomass
//! allometry dataset: randomized train/test coverage per split, assembled
//! interval bands, and rolling-window coverage over the extrapolation score.
//!
//! ```bash
//! RUNNAME=base cargo run --release --bin analyze_biomass
//! ```

use log::info;
use picover::config::AnalysisConfig;
use picover::coverage::{split_coverage, SplitCoverage};
use picover::errors::CoverageError;
use picover::plots;
use picover::rolling::{rolling_coverage, MethodBounds};
use picover::splits::{assemble_predictions, load_split_records};
use picover::AllometryData;
use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let mut config = AnalysisConfig::default();
    if let Ok(runname) = std::env::var("RUNNAME") {
        config.runname = runname;
    }
    if let Ok(seed) = std::env::var("PICOVER_SEED") {
        config.seed = Some(seed.parse()?);
    }
    std::fs::create_dir_all(&config.output_dir)?;

    // ------------------------------------------------------------------
    // 1. Load the data
    // ------------------------------------------------------------------
    let data = AllometryData::from_csv(&config.data_path)?;
    let y = &data.log_foliage_mass;
    plots::plot_data_scatter(&data, config.figure_path("biomass_data.svg"))?;

    // ------------------------------------------------------------------
    // 2. Load the split result artifacts
    // ------------------------------------------------------------------
    let records = load_split_records(&config.results_dir, &config.runname)?;
    if records[0].train_ind.len() != y.len() {
        return Err(Box::new(CoverageError::LengthMismatch(
            "split records against dataset".to_string(),
            records[0].train_ind.len(),
            y.len(),
        )));
    }

    // ------------------------------------------------------------------
    // 3. Randomized train/test coverage per split
    // ------------------------------------------------------------------
    let mut rng = config.rng();
    let level = config.level();
    let coverages: Vec<SplitCoverage> = records
        .iter()
        .map(|record| split_coverage(record, y, level, &mut rng))
        .collect::<Result<_, _>>()?;
    plots::plot_split_coverage(&coverages, level, config.figure_path("biomass_inter_vs_extra.svg"))?;
    info!("Computed randomized coverage for {} splits at level {}.", coverages.len(), level);

    // ------------------------------------------------------------------
    // 4. Assemble per-observation predictions from the extrapolating splits
    // ------------------------------------------------------------------
    let half = records.len() / 2;
    let assembled = assemble_predictions(&records[..half], y.len())?;
    plots::plot_quantile_bands(&data, &assembled, config.figure_path("biomass_quantile_scatterplot.svg"))?;

    // ------------------------------------------------------------------
    // 5. Rolling-window coverage over the extrapolation score
    // ------------------------------------------------------------------
    let methods = [
        MethodBounds {
            test: &assembled.qrf,
            train: &assembled.qrf_train,
        },
        MethodBounds {
            test: &assembled.xtra,
            train: &assembled.xtra_train,
        },
    ];
    let curves = rolling_coverage(&methods, y, &assembled.score, level, config.window_len, &mut rng)?;
    plots::plot_rolling_coverage(
        &curves[0],
        &curves[1],
        level,
        config.figure_path("biomass_extrapolation_score.svg"),
    )?;

    info!("Analysis complete; figures written to {}.", config.output_dir.display());
    Ok(())
}
