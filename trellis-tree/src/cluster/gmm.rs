//! Diagonal-covariance Gaussian mixture fitted with EM.
//!
//! Soft clustering: the fit exposes the full responsibility matrix so a node
//! spanning several topics can contribute to more than one summary. All math
//! is in log space with log-sum-exp; tiny clusters are kept non-singular by a
//! covariance floor.

use ndarray::{Array1, Array2, ArrayView1};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const DEFAULT_MAX_ITER: usize = 100;
const DEFAULT_TOL: f64 = 1e-4;
const REG_COVAR: f64 = 1e-6;

/// A fitted mixture: responsibilities plus what BIC needs.
#[derive(Debug, Clone)]
pub struct GmmFit {
    pub n_components: usize,
    /// `responsibilities[[i, c]]` = posterior probability that point `i`
    /// belongs to component `c`. Rows sum to 1.
    pub responsibilities: Array2<f64>,
    pub log_likelihood: f64,
    /// Free parameters of the model (means + diagonal variances + weights).
    pub n_parameters: usize,
}

/// Gaussian mixture model with diagonal covariance.
#[derive(Debug, Clone)]
pub struct Gmm {
    n_components: usize,
    max_iter: usize,
    tol: f64,
    seed: u64,
}

impl Gmm {
    pub fn new(n_components: usize, seed: u64) -> Self {
        Self {
            n_components,
            max_iter: DEFAULT_MAX_ITER,
            tol: DEFAULT_TOL,
            seed,
        }
    }

    /// Fit by EM. Returns `None` for degenerate input (no points, or a
    /// component count the data cannot support).
    pub fn fit(&self, data: &Array2<f64>) -> Option<GmmFit> {
        let (n, d) = data.dim();
        let k = self.n_components;
        if n == 0 || k == 0 || k > n {
            return None;
        }

        let mut rng = StdRng::seed_from_u64(self.seed);

        // Farthest-first means: deterministic given the seed, and on
        // well-separated data it lands one seed per true cluster, which EM
        // then only has to refine.
        let mut means = init_means_farthest_first(data, k, &mut rng);

        // Variances start at the global per-dimension variance.
        let global_var = column_variances(data);
        let mut variances = Array2::<f64>::zeros((k, d));
        for c in 0..k {
            for j in 0..d {
                variances[[c, j]] = global_var[j].max(REG_COVAR);
            }
        }

        let mut weights = Array1::<f64>::from_elem(k, 1.0 / k as f64);
        let mut resp = Array2::<f64>::zeros((n, k));
        let mut log_likelihood = f64::NEG_INFINITY;

        for _ in 0..self.max_iter {
            // E-step.
            let mut new_ll = 0.0;
            for i in 0..n {
                let point = data.row(i);
                let mut log_probs = vec![0.0; k];
                for c in 0..k {
                    log_probs[c] = weights[c].max(f64::MIN_POSITIVE).ln()
                        + log_gaussian(&point, &means.row(c), &variances.row(c));
                }
                let log_sum = logsumexp(&log_probs);
                new_ll += log_sum;
                for c in 0..k {
                    resp[[i, c]] = (log_probs[c] - log_sum).exp();
                }
            }

            // M-step.
            let resp_sums: Vec<f64> = (0..k).map(|c| resp.column(c).sum()).collect();
            let total: f64 = resp_sums.iter().sum();
            for c in 0..k {
                weights[c] = resp_sums[c] / total;
            }

            for c in 0..k {
                if resp_sums[c] <= 1e-10 {
                    // Starved component: keep its previous parameters.
                    continue;
                }
                for j in 0..d {
                    let mut m = 0.0;
                    for i in 0..n {
                        m += resp[[i, c]] * data[[i, j]];
                    }
                    means[[c, j]] = m / resp_sums[c];
                }
                for j in 0..d {
                    let mut v = 0.0;
                    for i in 0..n {
                        let diff = data[[i, j]] - means[[c, j]];
                        v += resp[[i, c]] * diff * diff;
                    }
                    variances[[c, j]] = (v / resp_sums[c]).max(REG_COVAR);
                }
            }

            if (new_ll - log_likelihood).abs() < self.tol {
                log_likelihood = new_ll;
                break;
            }
            log_likelihood = new_ll;
        }

        if !log_likelihood.is_finite() {
            return None;
        }

        Some(GmmFit {
            n_components: k,
            responsibilities: resp,
            log_likelihood,
            n_parameters: k * d * 2 + (k - 1),
        })
    }
}

/// First mean is a random point; each subsequent mean is the point farthest
/// from all means chosen so far.
fn init_means_farthest_first(data: &Array2<f64>, k: usize, rng: &mut StdRng) -> Array2<f64> {
    let (n, d) = data.dim();
    let mut chosen: Vec<usize> = vec![rng.gen_range(0..n)];

    while chosen.len() < k {
        let mut best_idx = 0;
        let mut best_dist = f64::NEG_INFINITY;
        for i in 0..n {
            let min_dist = chosen
                .iter()
                .map(|&c| squared_distance(&data.row(i), &data.row(c)))
                .fold(f64::INFINITY, f64::min);
            if min_dist > best_dist {
                best_dist = min_dist;
                best_idx = i;
            }
        }
        chosen.push(best_idx);
    }

    let mut means = Array2::<f64>::zeros((k, d));
    for (c, &idx) in chosen.iter().enumerate() {
        means.row_mut(c).assign(&data.row(idx));
    }
    means
}

fn squared_distance(a: &ArrayView1<'_, f64>, b: &ArrayView1<'_, f64>) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
}

fn column_variances(data: &Array2<f64>) -> Vec<f64> {
    let (n, d) = data.dim();
    let mut vars = vec![0.0; d];
    for j in 0..d {
        let mean: f64 = data.column(j).sum() / n as f64;
        let var: f64 = data.column(j).iter().map(|v| (v - mean) * (v - mean)).sum::<f64>()
            / n as f64;
        vars[j] = var;
    }
    vars
}

fn log_gaussian(
    point: &ArrayView1<'_, f64>,
    mean: &ArrayView1<'_, f64>,
    var: &ArrayView1<'_, f64>,
) -> f64 {
    let d = point.len() as f64;
    let mut log_prob = -0.5 * d * (2.0 * std::f64::consts::PI).ln();
    for i in 0..point.len() {
        let diff = point[i] - mean[i];
        log_prob -= 0.5 * var[i].ln();
        log_prob -= 0.5 * diff * diff / var[i];
    }
    log_prob
}

fn logsumexp(values: &[f64]) -> f64 {
    let max_val = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    if !max_val.is_finite() {
        return max_val;
    }
    max_val
        + values
            .iter()
            .map(|&v| (v - max_val).exp())
            .sum::<f64>()
            .ln()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn two_blob_data() -> Array2<f64> {
        array![
            [0.0, 0.0],
            [0.1, 0.1],
            [0.0, 0.2],
            [10.0, 10.0],
            [10.1, 10.1],
            [10.0, 10.2],
        ]
    }

    #[test]
    fn separates_two_blobs() {
        let fit = Gmm::new(2, 3).fit(&two_blob_data()).unwrap();
        let label = |i: usize| {
            if fit.responsibilities[[i, 0]] > fit.responsibilities[[i, 1]] {
                0
            } else {
                1
            }
        };
        assert_eq!(label(0), label(1));
        assert_eq!(label(1), label(2));
        assert_eq!(label(3), label(4));
        assert_ne!(label(0), label(3));
    }

    #[test]
    fn responsibilities_are_a_distribution() {
        let fit = Gmm::new(2, 3).fit(&two_blob_data()).unwrap();
        for i in 0..fit.responsibilities.nrows() {
            let sum: f64 = fit.responsibilities.row(i).sum();
            assert!((sum - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn rejects_more_components_than_points() {
        let data = array![[0.0, 0.0], [1.0, 1.0]];
        assert!(Gmm::new(3, 0).fit(&data).is_none());
    }

    #[test]
    fn single_component_covers_everything() {
        let fit = Gmm::new(1, 0).fit(&two_blob_data()).unwrap();
        for i in 0..6 {
            assert!((fit.responsibilities[[i, 0]] - 1.0).abs() < 1e-12);
        }
    }
}
