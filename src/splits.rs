//! Split result artifacts
//!
//! Per-split result records produced by the upstream experiment runner, plus the
//! aggregation that turns the per-quantile bound tensors into extrapolation-robust
//! interval bounds and merges all splits into observation-aligned arrays.
use crate::data::BoundMatrix;
use crate::errors::CoverageError;
use log::info;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Bound estimates for one quantile level: observations x repeats x {lower, upper}.
pub type BoundsTensor = Vec<Vec<[f64; 2]>>;

/// Result record of a single experiment split, as serialized by the experiment
/// runner. One JSON file per split index.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct SplitRecord {
    /// Train/test membership per observation; `false` marks the test set.
    pub train_ind: Vec<bool>,
    /// Quantile-regression interval per observation: (lower, upper).
    pub qmat: Vec<[f64; 2]>,
    /// One bound tensor per fitted quantile level, lower level first.
    pub bounds_list: Vec<BoundsTensor>,
}

impl SplitRecord {
    /// Check the record against the artifact shape contract for `n` observations.
    pub fn validate(&self, n: usize, index: usize) -> Result<(), CoverageError> {
        if self.train_ind.len() != n {
            return Err(CoverageError::MalformedRecord(
                index,
                format!("train_ind has {} entries, expected {}", self.train_ind.len(), n),
            ));
        }
        if self.qmat.len() != n {
            return Err(CoverageError::MalformedRecord(
                index,
                format!("qmat has {} rows, expected {}", self.qmat.len(), n),
            ));
        }
        if self.bounds_list.len() < 2 {
            return Err(CoverageError::MalformedRecord(
                index,
                format!("bounds_list has {} tensors, expected at least 2", self.bounds_list.len()),
            ));
        }
        let repeats = self.bounds_list[0].first().map_or(0, |r| r.len());
        if repeats == 0 {
            return Err(CoverageError::MalformedRecord(index, "empty repeats axis".to_string()));
        }
        for (t, tensor) in self.bounds_list.iter().enumerate() {
            if tensor.len() != n {
                return Err(CoverageError::MalformedRecord(
                    index,
                    format!("bounds tensor {} has {} rows, expected {}", t, tensor.len(), n),
                ));
            }
            if tensor.iter().any(|row| row.len() != repeats) {
                return Err(CoverageError::MalformedRecord(
                    index,
                    format!("bounds tensor {} has a ragged repeats axis", t),
                ));
            }
        }
        let trains = self.train_ind.iter().filter(|m| **m).count();
        if trains == 0 || trains == n {
            return Err(CoverageError::MalformedRecord(
                index,
                "train/test membership must contain both classes".to_string(),
            ));
        }
        Ok(())
    }

    /// Envelope of one bound tensor across the repeats axis: per observation the
    /// max of the lower estimates and the min of the upper estimates.
    pub fn bound_envelope(&self, tensor: usize) -> (Vec<f64>, Vec<f64>) {
        self.bounds_list[tensor]
            .par_iter()
            .map(|repeats| {
                let lo = repeats.iter().map(|b| b[0]).fold(f64::NEG_INFINITY, f64::max);
                let up = repeats.iter().map(|b| b[1]).fold(f64::INFINITY, f64::min);
                (lo, up)
            })
            .unzip()
    }

    /// Extrapolation-robust intervals: lower envelope of the lower-quantile
    /// tensor, upper envelope of the upper-quantile tensor.
    pub fn xtra_bounds(&self) -> Result<BoundMatrix, CoverageError> {
        let (lower, _) = self.bound_envelope(0);
        let (_, upper) = self.bound_envelope(1);
        BoundMatrix::new(lower, upper)
    }

    /// Per-observation extrapolation score: the summed envelope spreads of the
    /// lower- and upper-quantile tensors. Wide envelopes mean the repeated bound
    /// estimates disagree, i.e. the observation lies far from the training
    /// support.
    pub fn extrapolation_score(&self) -> Vec<f64> {
        let (lo1, up1) = self.bound_envelope(0);
        let (lo2, up2) = self.bound_envelope(1);
        (0..lo1.len()).map(|i| (up1[i] - lo1[i]) + (up2[i] - lo2[i])).collect()
    }
}

/// File name of the split artifact with the given run name and index.
pub fn artifact_file_name(runname: &str, index: usize) -> String {
    format!("biomass_{}_{}.json", runname, index)
}

/// Load all split records of a run from `dir`, in split-index order.
///
/// The records are validated against a common observation count taken from the
/// first record. A gap in the index sequence fails fast.
pub fn load_split_records<P: AsRef<Path>>(dir: P, runname: &str) -> Result<Vec<SplitRecord>, CoverageError> {
    let dir = dir.as_ref();
    let prefix = format!("biomass_{}_", runname);
    let entries = std::fs::read_dir(dir).map_err(|e| CoverageError::UnableToRead(format!("{}: {}", dir.display(), e)))?;
    let mut count = 0usize;
    for entry in entries {
        let entry = entry.map_err(|e| CoverageError::UnableToRead(e.to_string()))?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if entry.path().is_file() && name.starts_with(&prefix) && name.ends_with(".json") {
            count += 1;
        }
    }
    if count == 0 {
        return Err(CoverageError::EmptyData(format!(
            "split records for run {} in {}",
            runname,
            dir.display()
        )));
    }

    let mut records = Vec::with_capacity(count);
    let mut n = 0usize;
    for i in 0..count {
        let path = dir.join(artifact_file_name(runname, i));
        let file = File::open(&path).map_err(|e| CoverageError::UnableToRead(format!("{}: {}", path.display(), e)))?;
        let record: SplitRecord = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| CoverageError::MalformedRecord(i, e.to_string()))?;
        if i == 0 {
            n = record.train_ind.len();
        }
        record.validate(n, i)?;
        records.push(record);
    }
    info!("Loaded {} split records ({} observations each) for run {}.", count, n, runname);
    Ok(records)
}

/// Observation-aligned predictions merged from a set of split records.
///
/// `qrf` and `xtra` hold, per observation, the interval predicted by the split in
/// which the observation was a test point; `qrf_train` and `xtra_train` hold the
/// interval from a split in which it was a training point. `score` and `split_id`
/// are aligned with the test-side matrices.
#[derive(Clone, Debug)]
pub struct AssembledPredictions {
    pub qrf: BoundMatrix,
    pub xtra: BoundMatrix,
    pub qrf_train: BoundMatrix,
    pub xtra_train: BoundMatrix,
    pub score: Vec<f64>,
    pub split_id: Vec<usize>,
}

struct Accumulator {
    qrf_lo: Vec<f64>,
    qrf_up: Vec<f64>,
    xtra_lo: Vec<f64>,
    xtra_up: Vec<f64>,
    qrf_train_lo: Vec<f64>,
    qrf_train_up: Vec<f64>,
    xtra_train_lo: Vec<f64>,
    xtra_train_up: Vec<f64>,
    score: Vec<f64>,
    split_id: Vec<usize>,
}

impl Accumulator {
    fn zeroed(n: usize) -> Self {
        Accumulator {
            qrf_lo: vec![0.0; n],
            qrf_up: vec![0.0; n],
            xtra_lo: vec![0.0; n],
            xtra_up: vec![0.0; n],
            qrf_train_lo: vec![0.0; n],
            qrf_train_up: vec![0.0; n],
            xtra_train_lo: vec![0.0; n],
            xtra_train_up: vec![0.0; n],
            score: vec![0.0; n],
            split_id: vec![0; n],
        }
    }
}

/// Merge split records into observation-aligned prediction arrays by a fold.
///
/// Each record writes the test-side arrays at its test positions and the
/// train-side arrays at its train positions; a later record overwrites an earlier
/// one wherever both claim a position. Callers analyzing extrapolating splits
/// pass the first half of a run's records, whose test sets partition the
/// observations.
pub fn assemble_predictions(records: &[SplitRecord], n: usize) -> Result<AssembledPredictions, CoverageError> {
    if records.is_empty() {
        return Err(CoverageError::EmptyData("split records to assemble".to_string()));
    }
    let acc = records
        .iter()
        .enumerate()
        .try_fold(Accumulator::zeroed(n), |mut acc, (split, record)| {
            record.validate(n, split)?;
            let (lo1, up1) = record.bound_envelope(0);
            let (lo2, up2) = record.bound_envelope(1);
            let mut test_scores = Vec::new();
            for i in 0..n {
                if record.train_ind[i] {
                    acc.qrf_train_lo[i] = record.qmat[i][0];
                    acc.qrf_train_up[i] = record.qmat[i][1];
                    acc.xtra_train_lo[i] = lo1[i];
                    acc.xtra_train_up[i] = up2[i];
                } else {
                    acc.qrf_lo[i] = record.qmat[i][0];
                    acc.qrf_up[i] = record.qmat[i][1];
                    acc.xtra_lo[i] = lo1[i];
                    acc.xtra_up[i] = up2[i];
                    acc.score[i] = (up1[i] - lo1[i]) + (up2[i] - lo2[i]);
                    acc.split_id[i] = split;
                    test_scores.push(acc.score[i]);
                }
            }
            info!("Split {}: median test extrapolation score {:.4}", split, median(&mut test_scores));
            Ok(acc)
        })?;

    Ok(AssembledPredictions {
        qrf: BoundMatrix::new(acc.qrf_lo, acc.qrf_up)?,
        xtra: BoundMatrix::new(acc.xtra_lo, acc.xtra_up)?,
        qrf_train: BoundMatrix::new(acc.qrf_train_lo, acc.qrf_train_up)?,
        xtra_train: BoundMatrix::new(acc.xtra_train_lo, acc.xtra_train_up)?,
        score: acc.score,
        split_id: acc.split_id,
    })
}

fn median(values: &mut [f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}
