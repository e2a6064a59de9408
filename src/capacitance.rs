//! Assembly of the capacitance matrix, one conductor column at a time
use crate::constants::FPIEPS;
use crate::error::{Error, Result};
use crate::potential::PanelSystem;
use crate::solver::{ColumnReport, SolverState};
use crate::surface::SurfaceKind;
use crate::traits::ColumnSolver;
use log::{debug, info};
use std::collections::BTreeSet;

/// Capacitance matrix of the conductors that were solved for
#[derive(Debug, Clone, PartialEq)]
pub struct CapacitanceMatrix {
    conductors: Vec<usize>,
    names: Vec<String>,
    values: Vec<f64>,
}

impl CapacitanceMatrix {
    /// Number of rows and columns
    pub fn dim(&self) -> usize {
        self.conductors.len()
    }

    /// Conductor numbers of the rows and columns
    pub fn conductors(&self) -> &[usize] {
        &self.conductors
    }

    /// Display names of the rows and columns
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Entry by position, in farads
    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        if row < self.dim() && col < self.dim() {
            Some(self.values[row * self.dim() + col])
        } else {
            None
        }
    }

    /// Entry by conductor numbers, in farads
    pub fn capacitance(&self, row_conductor: usize, col_conductor: usize) -> Option<f64> {
        let row = self.conductors.iter().position(|c| *c == row_conductor)?;
        let col = self.conductors.iter().position(|c| *c == col_conductor)?;
        self.get(row, col)
    }

    /// All entries, row-major
    pub fn values(&self) -> &[f64] {
        &self.values
    }
}

/// Result of a full assembly
#[derive(Debug, Clone)]
pub struct Assembly {
    /// The matrix
    pub matrix: CapacitanceMatrix,
    /// One report per solved column, in column order
    pub reports: Vec<ColumnReport>,
}

/// Solve for every conductor that is not excluded and collect the induced charges
///
/// `names` holds the display names of conductors `1..=names.len()`. Columns of conductors in
/// `excluded` are not solved and neither they nor their rows appear in the result.
pub fn assemble<S: ColumnSolver>(
    solver: &mut S,
    system: &PanelSystem,
    names: &[String],
    excluded: &BTreeSet<usize>,
    perm_factor: f64,
) -> Result<Assembly> {
    let conductors = (1..=names.len())
        .filter(|c| !excluded.contains(c))
        .collect::<Vec<_>>();
    if conductors.is_empty() {
        return Err(Error::Configuration(
            "Every conductor is excluded from the solve".to_string(),
        ));
    }

    let size = solver.size();
    let mut rhs = vec![0.0; size];
    let mut q = vec![0.0; size];
    let mut full = vec![0.0; names.len() * conductors.len()];
    let mut reports = Vec::with_capacity(conductors.len());

    for (column, conductor) in conductors.iter().enumerate() {
        let name = &names[conductor - 1];
        info!("Starting on column {} ({})", conductor, name);

        for (i, r) in rhs.iter_mut().enumerate() {
            *r = if !system.is_dummy(i)
                && system.conductor(i) == *conductor
                && system.kind(i).is_conductor()
            {
                1.0
            } else {
                0.0
            };
        }
        q.fill(0.0);

        let report = solver.solve_column(&mut rhs, &mut q)?;
        if let SolverState::MaxIterExceeded(iterations) = report.state {
            return Err(Error::NonConvergence {
                column: *conductor,
                name: name.clone(),
                iterations,
            });
        }
        debug!(
            "Column {} done after {} iterations",
            conductor,
            report.state.iterations()
        );

        for (i, charge) in q.iter().enumerate() {
            if system.is_dummy(i) || system.kind(i) != SurfaceKind::Conductor {
                continue;
            }
            let row = system.conductor(i) - 1;
            full[row * conductors.len() + column] += system.outer_perm(i) * charge;
        }
        reports.push(report);
    }

    let scale = FPIEPS * perm_factor;
    let mut values = Vec::with_capacity(conductors.len() * conductors.len());
    for row in &conductors {
        for column in 0..conductors.len() {
            values.push(scale * full[(row - 1) * conductors.len() + column]);
        }
    }

    Ok(Assembly {
        matrix: CapacitanceMatrix {
            names: conductors.iter().map(|c| names[c - 1].clone()).collect(),
            conductors,
            values,
        },
        reports,
    })
}
