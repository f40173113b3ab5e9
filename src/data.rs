//! Data containers
//!
//! Owned containers for two-sided interval predictions and for the biomass
//! allometry dataset the experiments were run on.
use crate::errors::CoverageError;
use log::info;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// A matrix of two-sided interval predictions, one (lower, upper) pair per
/// observation.
///
/// Rows are validated once at construction: both bounds finite and
/// `lower <= upper`. Subsetting operations reuse already-validated rows and
/// therefore skip revalidation.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct BoundMatrix {
    lower: Vec<f64>,
    upper: Vec<f64>,
}

impl BoundMatrix {
    /// Create a new BoundMatrix from parallel lower and upper bound vectors.
    pub fn new(lower: Vec<f64>, upper: Vec<f64>) -> Result<Self, CoverageError> {
        if lower.len() != upper.len() {
            return Err(CoverageError::LengthMismatch(
                "bound matrix".to_string(),
                lower.len(),
                upper.len(),
            ));
        }
        for (i, (lo, up)) in lower.iter().zip(upper.iter()).enumerate() {
            if !lo.is_finite() || !up.is_finite() || lo > up {
                return Err(CoverageError::InvalidInterval(i, *lo, *up));
            }
        }
        Ok(BoundMatrix { lower, upper })
    }

    /// Create a new BoundMatrix from (lower, upper) rows.
    pub fn from_rows(rows: &[[f64; 2]]) -> Result<Self, CoverageError> {
        let lower: Vec<f64> = rows.iter().map(|r| r[0]).collect();
        let upper: Vec<f64> = rows.iter().map(|r| r[1]).collect();
        BoundMatrix::new(lower, upper)
    }

    /// Number of observations.
    pub fn len(&self) -> usize {
        self.lower.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lower.is_empty()
    }

    /// The lower bounds, one per observation.
    pub fn lower(&self) -> &[f64] {
        &self.lower
    }

    /// The upper bounds, one per observation.
    pub fn upper(&self) -> &[f64] {
        &self.upper
    }

    /// Get the (lower, upper) pair of a single row.
    pub fn row(&self, i: usize) -> (f64, f64) {
        (self.lower[i], self.upper[i])
    }

    /// Subset the rows flagged `true` in `mask`.
    pub fn filter(&self, mask: &[bool]) -> Result<Self, CoverageError> {
        if mask.len() != self.len() {
            return Err(CoverageError::LengthMismatch(
                "bound matrix mask".to_string(),
                self.len(),
                mask.len(),
            ));
        }
        let lower = self
            .lower
            .iter()
            .zip(mask)
            .filter(|(_, m)| **m)
            .map(|(v, _)| *v)
            .collect();
        let upper = self
            .upper
            .iter()
            .zip(mask)
            .filter(|(_, m)| **m)
            .map(|(v, _)| *v)
            .collect();
        Ok(BoundMatrix { lower, upper })
    }

    /// Gather the rows at `index`, in order. Indices must be in bounds.
    pub fn select(&self, index: &[usize]) -> Self {
        BoundMatrix {
            lower: index.iter().map(|&i| self.lower[i]).collect(),
            upper: index.iter().map(|&i| self.upper[i]).collect(),
        }
    }
}

/// Paired predictor/response measurements of a biomass allometry relationship,
/// on the raw and the natural-log scale.
///
/// Rows with a zero in either column are discarded before the log transform,
/// matching how the experiment data was prepared upstream.
#[derive(Clone, Debug)]
pub struct AllometryData {
    /// Crown area per plant (m^2), raw scale.
    pub crown_area: Vec<f64>,
    /// Foliage dry mass per plant (kg), raw scale.
    pub foliage_mass: Vec<f64>,
    /// log crown area.
    pub log_crown_area: Vec<f64>,
    /// log foliage dry mass. This is the outcome vector of the analysis.
    pub log_foliage_mass: Vec<f64>,
}

const PREDICTOR_COLUMN: &str = "Sc";
const RESPONSE_COLUMN: &str = "Bfkg";

impl AllometryData {
    /// Load the dataset from a headered CSV file with `Sc` and `Bfkg` columns.
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<Self, CoverageError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| CoverageError::UnableToRead(format!("{}: {}", path.display(), e)))?;
        Self::from_reader(BufReader::new(file))
    }

    /// Load the dataset from any CSV source with `Sc` and `Bfkg` columns.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, CoverageError> {
        let mut rdr = csv::ReaderBuilder::new().has_headers(true).from_reader(reader);
        let headers = rdr
            .headers()
            .map_err(|e| CoverageError::UnableToRead(e.to_string()))?
            .clone();
        let sc_idx = headers
            .iter()
            .position(|h| h == PREDICTOR_COLUMN)
            .ok_or_else(|| CoverageError::UnableToRead(format!("column {} not found", PREDICTOR_COLUMN)))?;
        let bfkg_idx = headers
            .iter()
            .position(|h| h == RESPONSE_COLUMN)
            .ok_or_else(|| CoverageError::UnableToRead(format!("column {} not found", RESPONSE_COLUMN)))?;

        let mut crown_area = Vec::new();
        let mut foliage_mass = Vec::new();
        let mut dropped = 0usize;
        for (row, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| CoverageError::UnableToRead(format!("row {}: {}", row, e)))?;
            let sc: f64 = record[sc_idx]
                .parse()
                .map_err(|_| CoverageError::UnableToRead(format!("row {}: bad {} value {:?}", row, PREDICTOR_COLUMN, &record[sc_idx])))?;
            let bfkg: f64 = record[bfkg_idx]
                .parse()
                .map_err(|_| CoverageError::UnableToRead(format!("row {}: bad {} value {:?}", row, RESPONSE_COLUMN, &record[bfkg_idx])))?;
            if sc < 0.0 || bfkg < 0.0 {
                return Err(CoverageError::InvalidParameter(
                    format!("row {}", row),
                    "non-negative measurements".to_string(),
                    format!("({}, {})", sc, bfkg),
                ));
            }
            // Zero in either column means the measurement is unusable on the log scale.
            if sc == 0.0 || bfkg == 0.0 {
                dropped += 1;
                continue;
            }
            crown_area.push(sc);
            foliage_mass.push(bfkg);
        }
        if crown_area.is_empty() {
            return Err(CoverageError::EmptyData("allometry dataset".to_string()));
        }
        info!("Loaded {} allometry rows ({} zero rows dropped).", crown_area.len(), dropped);

        let log_crown_area = crown_area.iter().map(|v| v.ln()).collect();
        let log_foliage_mass = foliage_mass.iter().map(|v| v.ln()).collect();
        Ok(AllometryData {
            crown_area,
            foliage_mass,
            log_crown_area,
            log_foliage_mass,
        })
    }

    /// Number of usable observations.
    pub fn len(&self) -> usize {
        self.crown_area.len()
    }

    pub fn is_empty(&self) -> bool {
        self.crown_area.is_empty()
    }
}
