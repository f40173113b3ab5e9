//! Randomized prediction-interval coverage
//!
//! The empirical coverage of a two-sided prediction interval is ambiguous when an
//! outcome lands exactly on an interval endpoint. The functions here resolve such
//! boundary ties at random, with the tie-break probability calibrated so that the
//! expected empirical coverage equals a requested nominal level whenever that
//! level is achievable.
use crate::data::BoundMatrix;
use crate::errors::CoverageError;
use crate::splits::SplitRecord;
use rand::rngs::StdRng;
use rand::Rng;

/// Fractions of outcomes falling in the closed and in the open interval.
///
/// Returns `(alpha_included, alpha_excluded)` where `alpha_included` counts
/// `lower <= y <= upper` and `alpha_excluded` counts the strictly interior
/// `lower < y < upper`. By construction `alpha_excluded <= alpha_included`.
pub fn interval_hit_rates(bounds: &BoundMatrix, y: &[f64]) -> Result<(f64, f64), CoverageError> {
    if bounds.len() != y.len() {
        return Err(CoverageError::LengthMismatch(
            "interval hit rates".to_string(),
            bounds.len(),
            y.len(),
        ));
    }
    if y.is_empty() {
        return Err(CoverageError::EmptyData("interval hit rates".to_string()));
    }
    let mut included = 0usize;
    let mut excluded = 0usize;
    for (i, y_) in y.iter().enumerate() {
        let (lo, up) = bounds.row(i);
        if lo <= *y_ && *y_ <= up {
            included += 1;
        }
        if lo < *y_ && *y_ < up {
            excluded += 1;
        }
    }
    let n = y.len() as f64;
    Ok((included as f64 / n, excluded as f64 / n))
}

/// Compute the calibration probability for randomized interval coverage.
///
/// The returned `prob_si` is the probability with which a boundary-tied outcome is
/// *excluded* from its interval: at `prob_si = 1` every tie is excluded and the
/// expected coverage is `alpha_excluded`, at `prob_si = 0` every tie is included
/// and the expected coverage is `alpha_included`. When the requested `coverage`
/// lies between the two rates, linear interpolation makes the expected coverage
/// match it exactly; outside that range the result saturates at the nearest
/// achievable coverage.
pub fn calibration_probability(bounds: &BoundMatrix, y: &[f64], coverage: f64) -> Result<f64, CoverageError> {
    if !coverage.is_finite() || coverage <= 0.0 || coverage >= 1.0 {
        return Err(CoverageError::InvalidParameter(
            "coverage".to_string(),
            "level strictly between 0 and 1".to_string(),
            coverage.to_string(),
        ));
    }
    let (alpha_included, alpha_excluded) = interval_hit_rates(bounds, y)?;
    let prob_si = if coverage <= alpha_excluded {
        1.0
    } else if coverage >= alpha_included {
        0.0
    } else {
        // alpha_excluded < coverage < alpha_included, so the denominator is nonzero
        // and the ratio lies in (0, 1).
        (coverage - alpha_included) / (alpha_excluded - alpha_included)
    };
    Ok(prob_si)
}

/// Randomized inclusion verdict per observation.
///
/// Strictly interior outcomes are always included; boundary-tied outcomes are
/// included with probability `1 - prob_si`, drawn independently per observation
/// from `rng`. One draw is consumed per observation regardless of whether the
/// observation is tied, so the rng stream position depends only on the input
/// length.
pub fn randomized_inclusion(
    bounds: &BoundMatrix,
    prob_si: f64,
    y: &[f64],
    rng: &mut StdRng,
) -> Result<Vec<bool>, CoverageError> {
    if bounds.len() != y.len() {
        return Err(CoverageError::LengthMismatch(
            "randomized inclusion".to_string(),
            bounds.len(),
            y.len(),
        ));
    }
    if !prob_si.is_finite() || !(0.0..=1.0).contains(&prob_si) {
        return Err(CoverageError::InvalidParameter(
            "prob_si".to_string(),
            "probability in [0, 1]".to_string(),
            prob_si.to_string(),
        ));
    }
    let mut verdicts = Vec::with_capacity(y.len());
    for (i, y_) in y.iter().enumerate() {
        let (lo, up) = bounds.row(i);
        // True with probability 1 - prob_si; u < 1 always, so prob_si = 1 never fires.
        let tie_break = rng.random::<f64>() >= prob_si;
        let included = lo < *y_ && *y_ < up;
        let boundary = lo == *y_ || up == *y_;
        verdicts.push(included || (boundary && tie_break));
    }
    Ok(verdicts)
}

/// Train/test coverage of one method on one experiment split.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MethodCoverage {
    pub train: f64,
    pub test: f64,
}

/// Coverage of both interval methods on one experiment split.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SplitCoverage {
    /// Plain quantile-regression intervals.
    pub qrf: MethodCoverage,
    /// Extrapolation-robust intervals from the bound envelopes.
    pub xtra: MethodCoverage,
}

/// Evaluate randomized coverage of both methods on one split.
///
/// The calibration probability is computed on the training-flagged observations
/// only and then applied to every observation, so train and test coverage come
/// from the same randomized verdict vector.
pub fn split_coverage(
    record: &SplitRecord,
    y: &[f64],
    level: f64,
    rng: &mut StdRng,
) -> Result<SplitCoverage, CoverageError> {
    record.validate(y.len(), 0)?;
    let train = &record.train_ind;
    let y_train: Vec<f64> = y.iter().zip(train).filter(|(_, m)| **m).map(|(v, _)| *v).collect();

    let qrf_bounds = BoundMatrix::from_rows(&record.qmat)?;
    let qrf = method_coverage(&qrf_bounds, train, y, &y_train, level, rng)?;

    let xtra_bounds = record.xtra_bounds()?;
    let xtra = method_coverage(&xtra_bounds, train, y, &y_train, level, rng)?;

    Ok(SplitCoverage { qrf, xtra })
}

fn method_coverage(
    bounds: &BoundMatrix,
    train: &[bool],
    y: &[f64],
    y_train: &[f64],
    level: f64,
    rng: &mut StdRng,
) -> Result<MethodCoverage, CoverageError> {
    let prob_si = calibration_probability(&bounds.filter(train)?, y_train, level)?;
    let verdicts = randomized_inclusion(bounds, prob_si, y, rng)?;
    Ok(MethodCoverage {
        train: masked_mean(&verdicts, train, true),
        test: masked_mean(&verdicts, train, false),
    })
}

/// Mean of `values` over the positions where `mask == flag`.
fn masked_mean(values: &[bool], mask: &[bool], flag: bool) -> f64 {
    let mut hits = 0usize;
    let mut total = 0usize;
    for (v, m) in values.iter().zip(mask) {
        if *m == flag {
            total += 1;
            if *v {
                hits += 1;
            }
        }
    }
    hits as f64 / total as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn boundary_fixture() -> (BoundMatrix, Vec<f64>) {
        // Four observations, two strictly interior, one boundary tie, one outside.
        let bounds = BoundMatrix::from_rows(&[[0.0, 2.0], [0.0, 2.0], [0.0, 2.0], [0.0, 2.0]]).unwrap();
        let y = vec![1.0, 1.0, 2.0, 3.0];
        (bounds, y)
    }

    #[test]
    fn test_hit_rate_ordering() {
        let (bounds, y) = boundary_fixture();
        let (included, excluded) = interval_hit_rates(&bounds, &y).unwrap();
        assert!(excluded <= included);
        assert_eq!(included, 0.75);
        assert_eq!(excluded, 0.5);
    }

    #[test]
    fn test_calibration_probability_in_unit_interval() {
        let (bounds, y) = boundary_fixture();
        for coverage in [0.05, 0.3, 0.55, 0.625, 0.7, 0.95] {
            let p = calibration_probability(&bounds, &y, coverage).unwrap();
            assert!((0.0..=1.0).contains(&p), "prob_si {} out of range at {}", p, coverage);
        }
    }

    #[test]
    fn test_calibration_probability_saturates() {
        let (bounds, y) = boundary_fixture();
        // At or below alpha_excluded = 0.5 every tie is excluded.
        assert_eq!(calibration_probability(&bounds, &y, 0.5).unwrap(), 1.0);
        assert_eq!(calibration_probability(&bounds, &y, 0.2).unwrap(), 1.0);
        // At or above alpha_included = 0.75 every tie is included.
        assert_eq!(calibration_probability(&bounds, &y, 0.75).unwrap(), 0.0);
        assert_eq!(calibration_probability(&bounds, &y, 0.9).unwrap(), 0.0);
    }

    #[test]
    fn test_calibration_probability_interpolates() {
        let (bounds, y) = boundary_fixture();
        // Halfway between the achievable extremes 0.5 and 0.75.
        let p = calibration_probability(&bounds, &y, 0.625).unwrap();
        assert!((p - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_known_scenario_saturates_to_one() {
        let bounds = BoundMatrix::from_rows(&[[0.0, 2.0], [1.0, 3.0], [2.0, 4.0]]).unwrap();
        let y = vec![1.0, 1.0, 2.0];
        let (included, excluded) = interval_hit_rates(&bounds, &y).unwrap();
        assert_eq!(included, 1.0);
        assert!((excluded - 2.0 / 3.0).abs() < 1e-12);
        // 0.5 <= alpha_excluded, so the saturating branch applies.
        assert_eq!(calibration_probability(&bounds, &y, 0.5).unwrap(), 1.0);
    }

    #[test]
    fn test_calibration_probability_rejects_bad_level() {
        let (bounds, y) = boundary_fixture();
        for coverage in [0.0, 1.0, -0.1, 1.5, f64::NAN] {
            assert!(calibration_probability(&bounds, &y, coverage).is_err());
        }
    }

    #[test]
    fn test_inclusion_deterministic_at_extremes() {
        let (bounds, y) = boundary_fixture();
        let mut rng = StdRng::seed_from_u64(3);
        // prob_si = 1: boundary ties always excluded.
        let v = randomized_inclusion(&bounds, 1.0, &y, &mut rng).unwrap();
        assert_eq!(v, vec![true, true, false, false]);
        // prob_si = 0: boundary ties always included.
        let v = randomized_inclusion(&bounds, 0.0, &y, &mut rng).unwrap();
        assert_eq!(v, vec![true, true, true, false]);
    }

    #[test]
    fn test_inclusion_reproducible_with_seed() {
        let (bounds, y) = boundary_fixture();
        let mut rng_a = StdRng::seed_from_u64(17);
        let mut rng_b = StdRng::seed_from_u64(17);
        let a = randomized_inclusion(&bounds, 0.5, &y, &mut rng_a).unwrap();
        let b = randomized_inclusion(&bounds, 0.5, &y, &mut rng_b).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_inclusion_validates_inputs() {
        let (bounds, y) = boundary_fixture();
        let mut rng = StdRng::seed_from_u64(1);
        assert!(randomized_inclusion(&bounds, 1.5, &y, &mut rng).is_err());
        assert!(randomized_inclusion(&bounds, f64::NAN, &y, &mut rng).is_err());
        assert!(randomized_inclusion(&bounds, 0.5, &y[..3], &mut rng).is_err());
    }

    #[test]
    fn test_expected_coverage_matches_target() {
        let (bounds, y) = boundary_fixture();
        let coverage = 0.625;
        let prob_si = calibration_probability(&bounds, &y, coverage).unwrap();
        let mut rng = StdRng::seed_from_u64(42);
        let repeats = 10_000;
        let mut total = 0.0;
        for _ in 0..repeats {
            let verdicts = randomized_inclusion(&bounds, prob_si, &y, &mut rng).unwrap();
            total += verdicts.iter().filter(|v| **v).count() as f64 / y.len() as f64;
        }
        let mean = total / repeats as f64;
        assert!((mean - coverage).abs() < 0.01, "empirical {} vs target {}", mean, coverage);
    }

    #[test]
    fn test_split_coverage_without_ties_is_deterministic() {
        let record = SplitRecord {
            train_ind: vec![true, true, false, false],
            qmat: vec![[0.0, 1.0], [1.0, 2.0], [2.0, 3.0], [0.0, 1.0]],
            bounds_list: vec![
                vec![vec![[0.0, 9.9], [-1.0, 9.9]]; 4],
                vec![vec![[0.0, 4.0], [0.0, 5.0]]; 4],
            ],
        };
        let y = vec![0.5, 1.5, 2.5, 10.0];
        let mut rng = StdRng::seed_from_u64(9);
        let cov = split_coverage(&record, &y, 0.8, &mut rng).unwrap();
        // No boundary ties anywhere, so the verdicts are fully determined.
        assert_eq!(cov.qrf.train, 1.0);
        assert_eq!(cov.qrf.test, 0.5);
        assert_eq!(cov.xtra.train, 1.0);
        assert_eq!(cov.xtra.test, 0.5);
    }
}
