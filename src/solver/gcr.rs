//! Generalized conjugate residuals
use super::{ColumnReport, KrylovWorkspace, SolverState};
use crate::linalg::{inner, max_abs};
use crate::traits::PotentialOperator;
use log::{debug, warn};

/// Solve `A q = r` by generalized conjugate residuals
///
/// Each new direction is the current residual, made `A`-orthogonal to all previous directions
/// and normalised so that its image has unit length. The iteration stops once the largest
/// residual entry drops below `tolerance`.
pub fn gcr<A: PotentialOperator>(
    operator: &mut A,
    r: &mut [f64],
    q: &mut [f64],
    max_iterations: usize,
    tolerance: f64,
    workspace: &mut KrylovWorkspace,
) -> ColumnReport {
    let size = operator.size();
    workspace.prepare(size, max_iterations);
    q.fill(0.0);

    let mut residuals = vec![];
    let mut state = SolverState::NotStarted;
    if max_abs(r) < tolerance {
        state = SolverState::Converged(0);
    }

    while let SolverState::NotStarted | SolverState::Iterating(_) = state {
        let iter = state.iterations();
        if iter == max_iterations {
            state = SolverState::MaxIterExceeded(iter);
            break;
        }
        workspace.reserve_basis(iter, size, size);

        workspace.p.copy_from_slice(r);
        operator.apply(&workspace.p, &mut workspace.ap);

        let (previous, current) = workspace.directions.split_at_mut(iter);
        let (previous_images, current_images) = workspace.images.split_at_mut(iter);
        let direction = &mut current[0];
        let image = &mut current_images[0];
        direction.copy_from_slice(&workspace.p);
        image.copy_from_slice(&workspace.ap);

        for (bp, bap) in previous.iter().zip(previous_images.iter()) {
            let beta = inner(&workspace.ap, bap);
            for (d, b) in direction.iter_mut().zip(bp) {
                *d -= beta * b;
            }
            for (d, b) in image.iter_mut().zip(bap) {
                *d -= beta * b;
            }
        }

        let norm = inner(image, image).sqrt();
        if norm == 0.0 || !norm.is_finite() {
            warn!("GCR breakdown after {} iterations", iter);
            state = SolverState::MaxIterExceeded(iter);
            break;
        }
        for x in direction.iter_mut().chain(image.iter_mut()) {
            *x /= norm;
        }

        let alpha = inner(r, image);
        for (qi, d) in q.iter_mut().zip(direction.iter()) {
            *qi += alpha * *d;
        }
        for (ri, d) in r.iter_mut().zip(image.iter()) {
            *ri -= alpha * *d;
        }

        let maxnorm = max_abs(r);
        residuals.push(maxnorm);
        debug!("GCR iteration {}: max residual {:e}", iter + 1, maxnorm);
        state = if maxnorm < tolerance {
            SolverState::Converged(iter + 1)
        } else {
            SolverState::Iterating(iter + 1)
        };
    }

    operator.recover_charges(q);
    if !state.converged() {
        warn!("GCR exiting without converging");
    }
    ColumnReport { state, residuals }
}
