//! Lossy dimensionality reduction for clustering.
//!
//! Principal components via power iteration with deflation — no external
//! linear-algebra backend needed for the handful of components the cluster
//! engine asks for. The covariance matrix is never materialized; each
//! iteration applies `Xᵀ(Xv)` directly.

use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const POWER_ITERATIONS: usize = 80;
const CONVERGENCE_TOL: f64 = 1e-7;

/// Project a layer's embeddings onto their top principal components.
///
/// The usable component count is `min(target_dim, d, n - 2)`; when that
/// leaves fewer than two components the layer cannot support the requested
/// subspace and the caller skips it. Errors here are recoverable by design.
pub fn reduce(
    embeddings: &[Vec<f32>],
    target_dim: usize,
    seed: u64,
) -> Result<Array2<f64>, &'static str> {
    let n = embeddings.len();
    if n == 0 {
        return Err("empty layer");
    }
    let d = embeddings[0].len();

    let usable = target_dim.min(d).min(n.saturating_sub(2));
    if usable < 2 {
        return Err("insufficient samples for the reduction subspace");
    }

    // Mean-centered data matrix.
    let mut centered = Array2::<f64>::zeros((n, d));
    for (i, row) in embeddings.iter().enumerate() {
        for (j, &v) in row.iter().enumerate() {
            centered[[i, j]] = v as f64;
        }
    }
    let mean = centered.mean_axis(ndarray::Axis(0)).expect("n > 0");
    for mut row in centered.rows_mut() {
        row -= &mean;
    }

    let total_variance: f64 = centered.iter().map(|v| v * v).sum();
    if total_variance < f64::EPSILON {
        return Err("degenerate layer: all embeddings identical");
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut components: Vec<Array1<f64>> = Vec::with_capacity(usable);

    for _ in 0..usable {
        let Some(component) = power_iterate(&centered, &components, &mut rng) else {
            break;
        };
        components.push(component);
    }

    if components.len() < 2 {
        return Err("insufficient variance for the reduction subspace");
    }

    // Project: Y[i][c] = centered_row_i · component_c
    let k = components.len();
    let mut projected = Array2::<f64>::zeros((n, k));
    for (c, comp) in components.iter().enumerate() {
        let scores = centered.dot(comp);
        for i in 0..n {
            projected[[i, c]] = scores[i];
        }
    }

    Ok(projected)
}

/// One principal component by power iteration, deflated against those
/// already found via Gram-Schmidt at every step.
fn power_iterate(
    centered: &Array2<f64>,
    previous: &[Array1<f64>],
    rng: &mut StdRng,
) -> Option<Array1<f64>> {
    let d = centered.ncols();
    let scale = 1.0 / (centered.nrows().saturating_sub(1).max(1)) as f64;

    let mut v = Array1::from_shape_fn(d, |_| rng.gen_range(-1.0..1.0));
    orthogonalize(&mut v, previous);
    if normalize(&mut v).is_none() {
        return None;
    }

    for _ in 0..POWER_ITERATIONS {
        // w = (XᵀX / (n-1)) v without forming the covariance.
        let xv = centered.dot(&v);
        let mut w = centered.t().dot(&xv);
        w.mapv_inplace(|x| x * scale);

        orthogonalize(&mut w, previous);
        let Some(norm) = normalize(&mut w) else {
            return None;
        };
        // Eigenvalue effectively zero: no variance left in this direction.
        if norm < f64::EPSILON {
            return None;
        }

        let delta: f64 = (&w - &v).iter().map(|x| x * x).sum();
        v = w;
        if delta < CONVERGENCE_TOL {
            break;
        }
    }

    Some(v)
}

fn orthogonalize(v: &mut Array1<f64>, previous: &[Array1<f64>]) {
    for p in previous {
        let proj = v.dot(p);
        *v -= &(p * proj);
    }
}

fn normalize(v: &mut Array1<f64>) -> Option<f64> {
    let norm = v.dot(&*v).sqrt();
    if norm < 1e-12 {
        return None;
    }
    v.mapv_inplace(|x| x / norm);
    Some(norm)
}
