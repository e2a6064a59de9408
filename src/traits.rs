//! Trait definitions

mod operator;
mod solver;

pub use operator::PotentialOperator;
pub use solver::ColumnSolver;
