//! Solvers for one column of the capacitance problem
//!
//! The Krylov methods work on any [PotentialOperator]. They start from a zero guess, overwrite
//! the right hand side with working data and finish by mapping the unknowns back to charges with
//! [PotentialOperator::recover_charges].
mod direct;
mod gcr;
mod gmres;

pub use direct::DirectSolver;
pub use gcr::gcr;
pub use gmres::gmres;

use crate::error::Result;
use crate::options::KrylovMethod;
use crate::traits::{ColumnSolver, PotentialOperator};

/// Progress of an iterative solve
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverState {
    /// No iteration has run
    NotStarted,
    /// Running, with the number of completed iterations
    Iterating(usize),
    /// Converged after the given number of iterations
    Converged(usize),
    /// Stopped without converging after the given number of iterations
    MaxIterExceeded(usize),
}

impl SolverState {
    /// Number of iterations done
    pub fn iterations(&self) -> usize {
        match self {
            SolverState::NotStarted => 0,
            SolverState::Iterating(k)
            | SolverState::Converged(k)
            | SolverState::MaxIterExceeded(k) => *k,
        }
    }

    /// Whether the solve converged
    pub fn converged(&self) -> bool {
        matches!(self, SolverState::Converged(_))
    }
}

/// Outcome of solving one column
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnReport {
    /// Final state
    pub state: SolverState,
    /// Residual measure after each iteration
    pub residuals: Vec<f64>,
}

/// Vectors kept between columns so that later solves do not allocate
#[derive(Debug, Default)]
pub struct KrylovWorkspace {
    pub(crate) p: Vec<f64>,
    pub(crate) ap: Vec<f64>,
    pub(crate) directions: Vec<Vec<f64>>,
    pub(crate) images: Vec<Vec<f64>>,
    pub(crate) c: Vec<f64>,
    pub(crate) s: Vec<f64>,
    pub(crate) g: Vec<f64>,
    pub(crate) y: Vec<f64>,
}

impl KrylovWorkspace {
    /// Create an empty workspace
    pub fn new() -> Self {
        Self::default()
    }

    /// Zero the scratch vectors for systems of `size` unknowns and `max_iterations` steps
    pub(crate) fn prepare(&mut self, size: usize, max_iterations: usize) {
        for v in [&mut self.p, &mut self.ap] {
            v.clear();
            v.resize(size, 0.0);
        }
        for v in [&mut self.c, &mut self.s, &mut self.g, &mut self.y] {
            v.clear();
            v.resize(max_iterations + 2, 0.0);
        }
    }

    /// Make sure basis vector `k` exists
    pub(crate) fn reserve_basis(&mut self, k: usize, size: usize, image_size: usize) {
        while self.directions.len() <= k {
            self.directions.push(vec![0.0; size]);
            self.images.push(vec![0.0; image_size]);
        }
        self.directions[k].resize(size, 0.0);
        self.images[k].resize(image_size, 0.0);
    }
}

/// Iterative solver for the columns of one system
pub struct KrylovSolver<A: PotentialOperator> {
    operator: A,
    method: KrylovMethod,
    tolerance: f64,
    max_iterations: usize,
    workspace: KrylovWorkspace,
}

impl<A: PotentialOperator> KrylovSolver<A> {
    /// Create a solver
    pub fn new(operator: A, method: KrylovMethod, tolerance: f64, max_iterations: usize) -> Self {
        Self {
            operator,
            method,
            tolerance,
            max_iterations,
            workspace: KrylovWorkspace::new(),
        }
    }

    /// The operator
    pub fn operator(&self) -> &A {
        &self.operator
    }
}

impl<A: PotentialOperator> ColumnSolver for KrylovSolver<A> {
    fn size(&self) -> usize {
        self.operator.size()
    }

    fn solve_column(&mut self, rhs: &mut [f64], q: &mut [f64]) -> Result<ColumnReport> {
        let operator = &mut self.operator;
        let workspace = &mut self.workspace;
        Ok(match self.method {
            KrylovMethod::Gcr => gcr(
                operator,
                rhs,
                q,
                self.max_iterations,
                self.tolerance,
                workspace,
            ),
            KrylovMethod::Gmres => gmres(
                operator,
                rhs,
                q,
                self.max_iterations,
                self.tolerance,
                workspace,
            ),
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::operator::DenseOperator;
    use approx::assert_relative_eq;
    use paste::paste;
    use rand::{Rng, SeedableRng};

    /// A well conditioned symmetric positive definite matrix
    pub(crate) fn spd_matrix(n: usize, seed: u64) -> Vec<f64> {
        let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
        let b = (0..n * n).map(|_| rng.gen_range(-1.0..1.0)).collect::<Vec<_>>();
        let mut a = vec![0.0; n * n];
        for i in 0..n {
            for j in 0..n {
                a[i * n + j] = (0..n).map(|k| b[k * n + i] * b[k * n + j]).sum::<f64>() / n as f64;
            }
            a[i * n + i] += 1.0;
        }
        a
    }

    macro_rules! test_against_direct {
        ($method:ident) => {
            paste! {
                #[test]
                fn [<test_ $method:lower _against_direct>]() {
                    let n = 30;
                    let a = spd_matrix(n, 3);
                    let rhs = (0..n).map(|i| if i % 3 == 0 { 1.0 } else { 0.0 }).collect::<Vec<_>>();

                    let mut inverse = a.clone();
                    crate::linalg::invert(&mut inverse, n).unwrap();
                    let mut expected = vec![0.0; n];
                    crate::linalg::gemv(&inverse, &rhs, &mut expected);

                    let mut solver = KrylovSolver::new(
                        DenseOperator::from_values(n, a),
                        KrylovMethod::$method,
                        1e-10,
                        n + 5,
                    );
                    assert_eq!(solver.size(), n);
                    // Solving twice reuses the workspace
                    for _ in 0..2 {
                        let mut r = rhs.clone();
                        let mut q = vec![0.0; n];
                        let report = solver.solve_column(&mut r, &mut q).unwrap();
                        assert!(report.state.converged());
                        assert!(report.state.iterations() <= n);
                        assert_eq!(report.residuals.len(), report.state.iterations());
                        for (a, b) in q.iter().zip(&expected) {
                            assert_relative_eq!(*a, *b, epsilon = 1e-8);
                        }
                    }
                }

                #[test]
                fn [<test_ $method:lower _non_convergence>]() {
                    // Widely spread eigenvalues need more than five steps
                    let n = 12;
                    let mut a = vec![0.0; n * n];
                    for i in 0..n {
                        a[i * n + i] = 10f64.powf(0.5 * i as f64);
                    }
                    let mut solver = KrylovSolver::new(
                        DenseOperator::from_values(n, a),
                        KrylovMethod::$method,
                        1e-8,
                        5,
                    );
                    let mut r = vec![1.0; n];
                    let mut q = vec![0.0; n];
                    let report = solver.solve_column(&mut r, &mut q).unwrap();
                    assert_eq!(report.state, SolverState::MaxIterExceeded(5));
                    assert_eq!(report.residuals.len(), 5);
                }

                #[test]
                fn [<test_ $method:lower _zero_rhs>]() {
                    let n = 4;
                    let mut solver = KrylovSolver::new(
                        DenseOperator::from_values(n, spd_matrix(n, 1)),
                        KrylovMethod::$method,
                        1e-8,
                        10,
                    );
                    let mut r = vec![0.0; n];
                    let mut q = vec![1.0; n];
                    let report = solver.solve_column(&mut r, &mut q).unwrap();
                    assert_eq!(report.state, SolverState::Converged(0));
                    assert!(q.iter().all(|x| *x == 0.0));
                }
            }
        };
    }

    test_against_direct!(Gcr);
    test_against_direct!(Gmres);

    #[test]
    fn test_states() {
        assert_eq!(SolverState::NotStarted.iterations(), 0);
        assert_eq!(SolverState::Iterating(3).iterations(), 3);
        assert!(SolverState::Converged(2).converged());
        assert!(!SolverState::MaxIterExceeded(2).converged());
    }
}
