//! Generalized minimal residual method
use super::{ColumnReport, KrylovWorkspace, SolverState};
use crate::linalg::inner;
use crate::traits::PotentialOperator;
use log::{debug, warn};

/// Solve `A q = r` by GMRES without restarts
///
/// The Hessenberg matrix is reduced with Givens rotations as it grows, so the residual norm is
/// available after every step; the iteration stops once it is no larger than `tolerance`.
pub fn gmres<A: PotentialOperator>(
    operator: &mut A,
    r: &mut [f64],
    q: &mut [f64],
    max_iterations: usize,
    tolerance: f64,
    workspace: &mut KrylovWorkspace,
) -> ColumnReport {
    let size = operator.size();
    workspace.prepare(size, max_iterations);
    let KrylovWorkspace {
        p,
        ap,
        directions: basis,
        images: hessenberg,
        c,
        s,
        g,
        y,
    } = workspace;

    let mut rnorm = inner(r, r).sqrt();
    if rnorm > 0.0 {
        for (pi, ri) in p.iter_mut().zip(r.iter()) {
            *pi = ri / rnorm;
        }
    }
    g[0] = rnorm;

    let mut residuals = vec![];
    let mut state = if rnorm > tolerance {
        SolverState::NotStarted
    } else {
        SolverState::Converged(0)
    };

    while let SolverState::NotStarted | SolverState::Iterating(_) = state {
        let j = state.iterations();
        if j == max_iterations {
            state = SolverState::MaxIterExceeded(j);
            break;
        }
        while basis.len() <= j {
            basis.push(vec![]);
            hessenberg.push(vec![]);
        }
        basis[j].clear();
        basis[j].extend_from_slice(p);
        hessenberg[j].clear();
        hessenberg[j].resize(j + 2, 0.0);

        operator.apply(p, ap);

        // Arnoldi step
        p.copy_from_slice(ap);
        for i in 0..=j {
            let hi = inner(ap, &basis[i]);
            for (pk, vk) in p.iter_mut().zip(&basis[i]) {
                *pk -= hi * vk;
            }
            hessenberg[j][i] = hi;
        }
        let norm = p.iter().map(|x| x * x).sum::<f64>().sqrt();
        if norm > 0.0 {
            for pk in p.iter_mut() {
                *pk /= norm;
            }
        }
        let h = &mut hessenberg[j];
        h[j + 1] = norm;

        for i in 0..j {
            let (hi, hip1) = (h[i], h[i + 1]);
            h[i] = c[i] * hi - s[i] * hip1;
            h[i + 1] = c[i] * hip1 + s[i] * hi;
        }

        let (hi, hip1) = (h[j], h[j + 1]);
        let length = (hi * hi + hip1 * hip1).sqrt();
        if length == 0.0 {
            warn!("GMRES breakdown after {} iterations", j);
            state = SolverState::MaxIterExceeded(j);
            break;
        }
        c[j] = hi / length;
        s[j] = -hip1 / length;
        h[j] = c[j] * hi - s[j] * hip1;
        h[j + 1] = c[j] * hip1 + s[j] * hi;

        let gj = g[j];
        g[j] = c[j] * gj;
        g[j + 1] = s[j] * gj;
        rnorm = g[j + 1].abs();

        residuals.push(rnorm);
        debug!("GMRES iteration {}: residual norm {:e}", j + 1, rnorm);
        state = if rnorm > tolerance {
            SolverState::Iterating(j + 1)
        } else {
            SolverState::Converged(j + 1)
        };
    }

    // Back substitution on the triangular factor, stored by columns
    let k = state.iterations();
    y[..k].copy_from_slice(&g[..k]);
    for i in (0..k).rev() {
        y[i] /= hessenberg[i][i];
        for l in 0..i {
            y[l] -= hessenberg[i][l] * y[i];
        }
    }
    q.fill(0.0);
    for (yj, v) in y[..k].iter().zip(basis.iter()) {
        for (qi, vi) in q.iter_mut().zip(v) {
            *qi += yj * vi;
        }
    }

    operator.recover_charges(q);
    if !state.converged() {
        warn!("GMRES exiting without converging");
    }
    ColumnReport { state, residuals }
}
