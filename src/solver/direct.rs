//! Dense direct solution over the real panels
use super::{ColumnReport, SolverState};
use crate::error::Result;
use crate::linalg::{gemv, invert};
use crate::potential::PanelSystem;
use crate::traits::ColumnSolver;
use log::debug;
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};

/// Solves columns with the inverse of the exact system matrix
///
/// Dummy points carry no unknown, so the matrix is assembled and inverted over the real panels
/// only. Right hand sides are compressed to the real panels and solutions are expanded back with
/// zeros at the dummy points.
pub struct DirectSolver {
    size: usize,
    real: Vec<usize>,
    inverse: Vec<f64>,
    compressed: Vec<f64>,
    solution: Vec<f64>,
}

impl DirectSolver {
    /// Assemble and invert the system matrix
    pub fn new(system: &PanelSystem) -> Result<Self> {
        let real = system.real_panels();
        let n = real.len();
        let mut inverse = real
            .par_iter()
            .map(|row| {
                real.iter()
                    .map(|col| system.coefficient(*row, *col))
                    .collect::<Vec<_>>()
            })
            .collect::<Vec<_>>()
            .concat();
        invert(&mut inverse, n)?;
        debug!("Inverted the {}x{} direct system", n, n);
        Ok(Self {
            size: system.size(),
            real,
            inverse,
            compressed: vec![0.0; n],
            solution: vec![0.0; n],
        })
    }
}

impl ColumnSolver for DirectSolver {
    fn size(&self) -> usize {
        self.size
    }

    fn solve_column(&mut self, rhs: &mut [f64], q: &mut [f64]) -> Result<ColumnReport> {
        for (c, i) in self.compressed.iter_mut().zip(&self.real) {
            *c = rhs[*i];
        }
        self.solution.fill(0.0);
        gemv(&self.inverse, &self.compressed, &mut self.solution);
        q.fill(0.0);
        for (x, i) in self.solution.iter().zip(&self.real) {
            q[*i] = *x;
        }
        rhs.fill(0.0);
        Ok(ColumnReport {
            state: SolverState::Converged(0),
            residuals: vec![],
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::operator::DenseOperator;
    use crate::shapes::regular_sphere;
    use crate::surface::{PlacedSurface, SurfaceKind};
    use crate::traits::PotentialOperator;
    use approx::assert_relative_eq;

    #[test]
    fn test_direct_with_dummies() {
        let surfaces = [
            (SurfaceKind::Conductor, 1, 1.0),
            (SurfaceKind::Dielectric, 0, 1.5),
        ]
        .into_iter()
        .map(|(kind, conductor, radius)| PlacedSurface {
            name: None,
            title: None,
            kind,
            group: "GROUP1".to_string(),
            conductor,
            outer_perm: 1.0,
            inner_perm: 2.0,
            reference: Some(([0.0; 3], true)),
            polygons: regular_sphere(1, radius, [0.0; 3]).polygons().to_vec(),
        })
        .collect::<Vec<_>>();
        let system = PanelSystem::new(&surfaces).unwrap();
        let mut solver = DirectSolver::new(&system).unwrap();
        assert_eq!(solver.size(), system.size());

        let mut rhs = (0..system.size())
            .map(|i| if system.conductor(i) == 1 { 1.0 } else { 0.0 })
            .collect::<Vec<_>>();
        let expected = rhs.clone();
        let mut q = vec![0.0; system.size()];
        let report = solver.solve_column(&mut rhs, &mut q).unwrap();
        assert!(report.state.converged());
        assert!((0..system.size()).filter(|i| system.is_dummy(*i)).all(|i| q[i] == 0.0));

        let mut dense = DenseOperator::from_system(&system);
        let mut p = vec![0.0; system.size()];
        dense.apply(&q, &mut p);
        for (a, b) in p.iter().zip(&expected) {
            assert_relative_eq!(*a, *b, epsilon = 1e-9);
        }
    }
}
