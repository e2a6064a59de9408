//! Per-conductor solves
use crate::error::Result;
use crate::solver::ColumnReport;

/// Something that solves `P q = rhs` for one right-hand side at a time
pub trait ColumnSolver {
    /// Number of unknowns
    fn size(&self) -> usize;

    /// Solve for `q`; `rhs` is overwritten with the final residual (or scratch data)
    fn solve_column(&mut self, rhs: &mut [f64], q: &mut [f64]) -> Result<ColumnReport>;
}
