//! Rolling-window coverage
//!
//! Smooths randomized coverage over observations sorted by extrapolation score.
//! Within each window the calibration probability is computed from the
//! training-side intervals and applied to the test-side intervals, so the curve
//! reflects out-of-sample coverage at every score rank.
use crate::coverage::{calibration_probability, randomized_inclusion};
use crate::data::BoundMatrix;
use crate::errors::CoverageError;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

/// Test-side and train-side interval predictions of one method, aligned by
/// observation.
pub struct MethodBounds<'a> {
    pub test: &'a BoundMatrix,
    pub train: &'a BoundMatrix,
}

/// Smoothed coverage per method over a rolling window in score order.
///
/// All observation-aligned inputs are permuted at random first (one shared
/// permutation, so the methods see identical windows), then sorted by `score`
/// ascending; ties keep the permuted order, decoupling the window contents from
/// upstream index artifacts. Windows are centered and clamped at the array ends.
/// Returns one curve of length `n` per method, indexed by score rank.
pub fn rolling_coverage(
    methods: &[MethodBounds],
    y: &[f64],
    score: &[f64],
    level: f64,
    window_len: usize,
    rng: &mut StdRng,
) -> Result<Vec<Vec<f64>>, CoverageError> {
    let n = y.len();
    if n == 0 {
        return Err(CoverageError::EmptyData("rolling coverage outcomes".to_string()));
    }
    if score.len() != n {
        return Err(CoverageError::LengthMismatch("extrapolation score".to_string(), score.len(), n));
    }
    for method in methods {
        if method.test.len() != n {
            return Err(CoverageError::LengthMismatch("method test bounds".to_string(), method.test.len(), n));
        }
        if method.train.len() != n {
            return Err(CoverageError::LengthMismatch("method train bounds".to_string(), method.train.len(), n));
        }
    }
    if window_len < 2 || window_len > n {
        return Err(CoverageError::InvalidParameter(
            "window_len".to_string(),
            format!("window length within 2 and {}", n),
            window_len.to_string(),
        ));
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.shuffle(rng);
    order.sort_by(|&a, &b| score[a].partial_cmp(&score[b]).unwrap_or(std::cmp::Ordering::Equal));

    let half = window_len / 2;
    let mut curves = vec![vec![0.0; n]; methods.len()];
    for k in 0..n {
        let lo = k.saturating_sub(half);
        let up = (k + half).min(n);
        let window = &order[lo..up];
        let y_w: Vec<f64> = window.iter().map(|&i| y[i]).collect();
        for (m, method) in methods.iter().enumerate() {
            let train_w = method.train.select(window);
            let test_w = method.test.select(window);
            let prob_si = calibration_probability(&train_w, &y_w, level)?;
            let verdicts = randomized_inclusion(&test_w, prob_si, &y_w, rng)?;
            curves[m][k] = verdicts.iter().filter(|v| **v).count() as f64 / y_w.len() as f64;
        }
    }
    Ok(curves)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn constant_bounds(n: usize, lo: f64, up: f64) -> BoundMatrix {
        BoundMatrix::new(vec![lo; n], vec![up; n]).unwrap()
    }

    #[test]
    fn test_output_length_for_all_window_lengths() {
        let n = 20;
        let bounds = constant_bounds(n, -10.0, 10.0);
        let y: Vec<f64> = (0..n).map(|i| (i as f64) / (n as f64)).collect();
        let score: Vec<f64> = (0..n).map(|i| i as f64).collect();
        for window_len in 2..=n {
            let mut rng = StdRng::seed_from_u64(5);
            let methods = [MethodBounds {
                test: &bounds,
                train: &bounds,
            }];
            let curves = rolling_coverage(&methods, &y, &score, 0.8, window_len, &mut rng).unwrap();
            assert_eq!(curves.len(), 1);
            assert_eq!(curves[0].len(), n, "window_len {}", window_len);
        }
    }

    #[test]
    fn test_full_coverage_curve_is_one() {
        let n = 30;
        let bounds = constant_bounds(n, -100.0, 100.0);
        let y: Vec<f64> = (0..n).map(|i| i as f64 - 15.0).collect();
        let score: Vec<f64> = (0..n).map(|i| (i * 7 % n) as f64).collect();
        let mut rng = StdRng::seed_from_u64(11);
        let methods = [MethodBounds {
            test: &bounds,
            train: &bounds,
        }];
        let curves = rolling_coverage(&methods, &y, &score, 0.8, 10, &mut rng).unwrap();
        assert!(curves[0].iter().all(|c| *c == 1.0));
    }

    #[test]
    fn test_calibration_comes_from_train_side() {
        let n = 16;
        // Train intervals cover everything, test intervals cover nothing.
        let train = constant_bounds(n, -100.0, 100.0);
        let test = constant_bounds(n, 0.0, 0.1);
        let y: Vec<f64> = vec![5.0; n];
        let score: Vec<f64> = (0..n).map(|i| i as f64).collect();
        let mut rng = StdRng::seed_from_u64(2);
        let methods = [MethodBounds {
            test: &test,
            train: &train,
        }];
        let curves = rolling_coverage(&methods, &y, &score, 0.8, 6, &mut rng).unwrap();
        assert!(curves[0].iter().all(|c| *c == 0.0));
    }

    #[test]
    fn test_reproducible_with_seed() {
        let n = 25;
        let bounds = BoundMatrix::new(
            (0..n).map(|i| i as f64 - 1.0).collect(),
            (0..n).map(|i| i as f64 + 1.0).collect(),
        )
        .unwrap();
        let y: Vec<f64> = (0..n).map(|i| i as f64).collect();
        let score: Vec<f64> = (0..n).map(|i| ((i * 13) % n) as f64).collect();
        let run = |seed: u64| {
            let mut rng = StdRng::seed_from_u64(seed);
            let methods = [MethodBounds {
                test: &bounds,
                train: &bounds,
            }];
            rolling_coverage(&methods, &y, &score, 0.8, 8, &mut rng).unwrap()
        };
        assert_eq!(run(21), run(21));
    }

    #[test]
    fn test_rejects_bad_window_lengths() {
        let n = 10;
        let bounds = constant_bounds(n, 0.0, 1.0);
        let y = vec![0.5; n];
        let score: Vec<f64> = (0..n).map(|i| i as f64).collect();
        for window_len in [0, 1, n + 1] {
            let mut rng = StdRng::seed_from_u64(1);
            let methods = [MethodBounds {
                test: &bounds,
                train: &bounds,
            }];
            assert!(rolling_coverage(&methods, &y, &score, 0.8, window_len, &mut rng).is_err());
        }
    }

    #[test]
    fn test_rejects_misaligned_score() {
        let n = 10;
        let bounds = constant_bounds(n, 0.0, 1.0);
        let y = vec![0.5; n];
        let score = vec![0.0; n - 1];
        let mut rng = StdRng::seed_from_u64(1);
        let methods = [MethodBounds {
            test: &bounds,
            train: &bounds,
        }];
        assert!(rolling_coverage(&methods, &y, &score, 0.8, 4, &mut rng).is_err());
    }
}
