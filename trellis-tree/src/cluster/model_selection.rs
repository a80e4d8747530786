//! Automatic cluster-count selection by Bayesian Information Criterion.
//!
//! BIC = p·ln(n) − 2·LL. The parameter penalty keeps the sweep from chasing
//! the always-better likelihood of more components.

use ndarray::Array2;
use tracing::trace;

use super::gmm::{Gmm, GmmFit};

/// Sweep component counts `1..=max_k` and return the fit with the lowest
/// BIC. `None` when no count produced a usable fit.
pub fn select_components(data: &Array2<f64>, max_k: usize, seed: u64) -> Option<GmmFit> {
    let n = data.nrows();
    if n == 0 {
        return None;
    }

    let mut best: Option<(f64, GmmFit)> = None;

    for k in 1..=max_k.min(n) {
        // Offset the seed per candidate so sweeps don't share initializations.
        let Some(fit) = Gmm::new(k, seed.wrapping_add(k as u64)).fit(data) else {
            continue;
        };
        let bic = fit.n_parameters as f64 * (n as f64).ln() - 2.0 * fit.log_likelihood;
        trace!(k, bic, log_likelihood = fit.log_likelihood, "bic sweep");

        match &best {
            Some((best_bic, _)) if *best_bic <= bic => {}
            _ => best = Some((bic, fit)),
        }
    }

    best.map(|(_, fit)| fit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn blobs(centers: &[(f64, f64)], per_blob: usize) -> Array2<f64> {
        let n = centers.len() * per_blob;
        let mut data = Array2::<f64>::zeros((n, 2));
        let mut row = 0;
        for &(cx, cy) in centers {
            for i in 0..per_blob {
                data[[row, 0]] = cx + 0.05 * i as f64;
                data[[row, 1]] = cy + 0.03 * ((i % 3) as f64);
                row += 1;
            }
        }
        data
    }

    #[test]
    fn finds_two_well_separated_blobs() {
        let data = blobs(&[(0.0, 0.0), (100.0, 100.0)], 8);
        let fit = select_components(&data, 5, 11).unwrap();
        assert_eq!(fit.n_components, 2);
    }

    #[test]
    fn collapses_single_blob_to_one_component() {
        let data = blobs(&[(0.0, 0.0)], 10);
        let fit = select_components(&data, 4, 11).unwrap();
        assert_eq!(fit.n_components, 1);
    }

    #[test]
    fn empty_data_yields_none() {
        let data = Array2::<f64>::zeros((0, 2));
        assert!(select_components(&data, 3, 0).is_none());
    }
}
