//! Capfmm
//!
//! Capacitance extraction with a multipole accelerated boundary element method. Conductor
//! surfaces and dielectric interfaces are split into flat panels carrying a constant charge
//! density; one linear system per conductor is solved with GMRES or GCR, using a fast multipole
//! approximation of the dense potential coefficient matrix.
#![cfg_attr(feature = "strict", deny(warnings))]
#![warn(missing_docs)]

#[macro_use]
extern crate lazy_static;

pub mod capacitance;
pub mod conductor;
pub mod constants;
pub mod error;
pub mod geometry;
pub mod heap;
pub mod linalg;
pub mod multipole;
pub mod operator;
pub mod options;
pub mod potential;
pub mod preconditioner;
pub mod problem;
pub mod session;
pub mod shapes;
pub mod solver;
pub mod surface;
pub mod traits;
pub mod tree;

pub use capacitance::CapacitanceMatrix;
pub use error::{Error, Result};
pub use options::{KrylovMethod, PreconditionerType, SolverOptions};
pub use problem::Problem;
pub use surface::{Surface, SurfaceKind, SurfacePlacement};
