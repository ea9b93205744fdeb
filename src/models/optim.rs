//! Deterministic Nelder-Mead simplex minimizer for model estimation
//!
//! The initial simplex is built from fixed perturbations of the starting
//! point, so repeated runs over identical data walk exactly the same path.

/// Configuration for the simplex search
#[derive(Debug, Clone)]
pub struct NelderMeadConfig {
    /// Maximum number of iterations
    pub max_iter: usize,
    /// Convergence tolerance on the objective spread across the simplex
    pub tolerance: f64,
    /// Relative perturbation used to build the initial simplex
    pub step: f64,
}

impl Default for NelderMeadConfig {
    fn default() -> Self {
        Self {
            max_iter: 1000,
            tolerance: 1e-8,
            step: 0.1,
        }
    }
}

/// Outcome of a simplex search
#[derive(Debug, Clone)]
pub struct NelderMeadResult {
    /// Best point found
    pub optimal_point: Vec<f64>,
    /// Objective value at the best point
    pub optimal_value: f64,
    /// Number of iterations performed
    pub iterations: usize,
    /// Whether the objective spread fell below the tolerance
    pub converged: bool,
}

// Standard reflection/expansion/contraction/shrink coefficients.
const ALPHA: f64 = 1.0;
const GAMMA: f64 = 2.0;
const RHO: f64 = 0.5;
const SIGMA: f64 = 0.5;

/// Minimize `f` starting from `initial`, optionally clamping every candidate
/// point to per-coordinate bounds.
pub fn nelder_mead<F>(
    f: F,
    initial: &[f64],
    bounds: Option<&[(f64, f64)]>,
    config: &NelderMeadConfig,
) -> NelderMeadResult
where
    F: Fn(&[f64]) -> f64,
{
    let n = initial.len();
    let clamp = |point: &mut Vec<f64>| {
        if let Some(bounds) = bounds {
            for (value, &(lo, hi)) in point.iter_mut().zip(bounds.iter()) {
                *value = value.clamp(lo, hi);
            }
        }
    };

    // Initial simplex: the starting point plus one perturbed vertex per
    // coordinate.
    let mut simplex: Vec<(Vec<f64>, f64)> = Vec::with_capacity(n + 1);
    let mut base = initial.to_vec();
    clamp(&mut base);
    simplex.push((base.clone(), f(&base)));

    for i in 0..n {
        let mut vertex = base.clone();
        if vertex[i].abs() > f64::EPSILON {
            vertex[i] += config.step * vertex[i].abs();
        } else {
            vertex[i] = config.step;
        }
        clamp(&mut vertex);
        let value = f(&vertex);
        simplex.push((vertex, value));
    }

    let order = |simplex: &mut Vec<(Vec<f64>, f64)>| {
        simplex.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
    };

    let mut iterations = 0;
    let mut converged = false;

    for _ in 0..config.max_iter {
        iterations += 1;
        order(&mut simplex);

        let best_value = simplex[0].1;
        let worst_value = simplex[n].1;
        if (worst_value - best_value).abs() < config.tolerance {
            converged = true;
            break;
        }

        // Centroid of all vertices except the worst.
        let mut centroid = vec![0.0; n];
        for (vertex, _) in simplex.iter().take(n) {
            for (c, v) in centroid.iter_mut().zip(vertex.iter()) {
                *c += v / n as f64;
            }
        }

        let worst = simplex[n].0.clone();

        let mut reflected: Vec<f64> = centroid
            .iter()
            .zip(worst.iter())
            .map(|(c, w)| c + ALPHA * (c - w))
            .collect();
        clamp(&mut reflected);
        let reflected_value = f(&reflected);

        if reflected_value < simplex[0].1 {
            // Try to expand past the reflected point.
            let mut expanded: Vec<f64> = centroid
                .iter()
                .zip(reflected.iter())
                .map(|(c, r)| c + GAMMA * (r - c))
                .collect();
            clamp(&mut expanded);
            let expanded_value = f(&expanded);

            simplex[n] = if expanded_value < reflected_value {
                (expanded, expanded_value)
            } else {
                (reflected, reflected_value)
            };
            continue;
        }

        if reflected_value < simplex[n - 1].1 {
            simplex[n] = (reflected, reflected_value);
            continue;
        }

        // Contract toward the better of the worst and reflected points.
        let (toward, toward_value) = if reflected_value < simplex[n].1 {
            (&reflected, reflected_value)
        } else {
            (&worst, simplex[n].1)
        };
        let mut contracted: Vec<f64> = centroid
            .iter()
            .zip(toward.iter())
            .map(|(c, t)| c + RHO * (t - c))
            .collect();
        clamp(&mut contracted);
        let contracted_value = f(&contracted);

        if contracted_value < toward_value {
            simplex[n] = (contracted, contracted_value);
            continue;
        }

        // Shrink everything toward the best vertex.
        let best = simplex[0].0.clone();
        for entry in simplex.iter_mut().skip(1) {
            let mut shrunk: Vec<f64> = best
                .iter()
                .zip(entry.0.iter())
                .map(|(b, v)| b + SIGMA * (v - b))
                .collect();
            clamp(&mut shrunk);
            let value = f(&shrunk);
            *entry = (shrunk, value);
        }
    }

    order(&mut simplex);
    let (optimal_point, optimal_value) = simplex.swap_remove(0);

    NelderMeadResult {
        optimal_point,
        optimal_value,
        iterations,
        converged,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn minimizes_quadratic() {
        let result = nelder_mead(
            |x| (x[0] - 3.0).powi(2) + (x[1] + 1.0).powi(2),
            &[0.0, 0.0],
            None,
            &NelderMeadConfig::default(),
        );

        assert!(result.converged);
        assert_approx_eq!(result.optimal_point[0], 3.0, 1e-3);
        assert_approx_eq!(result.optimal_point[1], -1.0, 1e-3);
    }

    #[test]
    fn respects_bounds() {
        let result = nelder_mead(
            |x| (x[0] - 5.0).powi(2),
            &[0.0],
            Some(&[(-1.0, 1.0)]),
            &NelderMeadConfig::default(),
        );

        assert!(result.optimal_point[0] <= 1.0);
        assert_approx_eq!(result.optimal_point[0], 1.0, 1e-6);
    }

    #[test]
    fn deterministic_across_runs() {
        let run = || {
            nelder_mead(
                |x| x[0].powi(2) + (x[1] - 2.0).powi(2) + x[0] * x[1] * 0.1,
                &[1.0, 1.0],
                None,
                &NelderMeadConfig::default(),
            )
        };

        let a = run();
        let b = run();
        assert_eq!(a.optimal_point, b.optimal_point);
        assert_eq!(a.iterations, b.iterations);
    }
}
