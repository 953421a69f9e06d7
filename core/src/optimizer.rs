//! Derivative-free likelihood maximization.
//!
//! A plain Nelder–Mead simplex minimizer, expressed as a pure function from
//! (objective, starting point, stopping criteria) to an outcome. It never
//! touches shared state, so the two model fits can run it concurrently.
//! The iteration ceiling is a hard bound — the loop cannot run past it.

/// Stopping criteria for one minimization.
#[derive(Debug, Clone, Copy)]
pub struct FitOptions {
    pub max_iterations: usize,
    /// Converged when the spread of objective values across the simplex
    /// drops below this.
    pub tolerance: f64,
}

/// Result of one minimization. `converged` is reported honestly — callers
/// decide whether a non-converged outcome is fatal.
#[derive(Debug, Clone)]
pub struct FitOutcome {
    pub position: Vec<f64>,
    pub value: f64,
    pub converged: bool,
    pub iterations: usize,
}

// Standard Nelder–Mead coefficients.
const REFLECT: f64 = 1.0;
const EXPAND: f64 = 2.0;
const CONTRACT: f64 = 0.5;
const SHRINK: f64 = 0.5;

/// Minimize `objective` starting from `start`.
///
/// Non-finite objective values are treated as +∞, which steers the simplex
/// away from invalid regions instead of poisoning the comparison order.
pub fn minimize<F>(objective: F, start: &[f64], options: &FitOptions) -> FitOutcome
where
    F: Fn(&[f64]) -> f64,
{
    let n = start.len();
    assert!(n > 0, "cannot minimize over zero dimensions");

    let eval = |x: &[f64]| -> f64 {
        let v = objective(x);
        if v.is_finite() {
            v
        } else {
            f64::INFINITY
        }
    };

    // Initial simplex: the start plus one perturbed vertex per axis.
    let mut simplex: Vec<Vec<f64>> = Vec::with_capacity(n + 1);
    simplex.push(start.to_vec());
    for i in 0..n {
        let mut vertex = start.to_vec();
        vertex[i] += if vertex[i].abs() > 1e-8 {
            0.05 * vertex[i]
        } else {
            0.1
        };
        simplex.push(vertex);
    }
    let mut values: Vec<f64> = simplex.iter().map(|v| eval(v)).collect();

    let mut iterations = 0;
    let mut converged = false;

    while iterations < options.max_iterations {
        iterations += 1;

        // Order vertices best → worst.
        let mut order: Vec<usize> = (0..=n).collect();
        order.sort_by(|&i, &j| values[i].total_cmp(&values[j]));
        let best = order[0];
        let worst = order[n];
        let second_worst = order[n - 1];

        if values[worst] - values[best] <= options.tolerance {
            converged = true;
            break;
        }

        // Centroid of all vertices except the worst.
        let mut centroid = vec![0.0; n];
        for (idx, vertex) in simplex.iter().enumerate() {
            if idx == worst {
                continue;
            }
            for (c, &x) in centroid.iter_mut().zip(vertex) {
                *c += x / n as f64;
            }
        }

        let worst_vertex = simplex[worst].clone();
        let blend = |coef: f64| -> Vec<f64> {
            centroid
                .iter()
                .zip(&worst_vertex)
                .map(|(&c, &w)| c + coef * (c - w))
                .collect()
        };

        let reflected = blend(REFLECT);
        let f_reflected = eval(&reflected);

        if f_reflected < values[best] {
            // Try to go further in the same direction.
            let expanded = blend(EXPAND);
            let f_expanded = eval(&expanded);
            if f_expanded < f_reflected {
                simplex[worst] = expanded;
                values[worst] = f_expanded;
            } else {
                simplex[worst] = reflected;
                values[worst] = f_reflected;
            }
            continue;
        }

        if f_reflected < values[second_worst] {
            simplex[worst] = reflected;
            values[worst] = f_reflected;
            continue;
        }

        // Contract toward the centroid.
        let contracted = blend(-CONTRACT);
        let f_contracted = eval(&contracted);
        if f_contracted < values[worst] {
            simplex[worst] = contracted;
            values[worst] = f_contracted;
            continue;
        }

        // Shrink everything toward the best vertex.
        let best_vertex = simplex[best].clone();
        for (idx, vertex) in simplex.iter_mut().enumerate() {
            if idx == best {
                continue;
            }
            for (x, &b) in vertex.iter_mut().zip(&best_vertex) {
                *x = b + SHRINK * (*x - b);
            }
            values[idx] = eval(vertex);
        }
    }

    let best = values
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| a.total_cmp(b))
        .map(|(i, _)| i)
        .unwrap_or(0);

    FitOutcome {
        position: simplex[best].clone(),
        value: values[best],
        converged,
        iterations,
    }
}
