//! Solver options
use crate::conductor::validate_name;
use crate::error::{Error, Result};
use crate::multipole::MAX_EXPANSION_ORDER;

/// Krylov method used for the iterative solves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KrylovMethod {
    /// Generalised minimal residual
    Gmres,
    /// Generalised conjugate residual
    Gcr,
}

/// Preconditioner composed with the multipole operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreconditionerType {
    /// No preconditioning
    None,
    /// Inverse of each leaf cube's self-interaction block
    BlockDiagonal,
    /// Inverse of each leaf cube's block including its adjacent cubes, restricted to the leaf
    Overlap,
}

/// Options for a capacitance solve
#[derive(Debug, Clone)]
pub struct SolverOptions {
    /// Multipole expansion order
    expansion_order: usize,
    /// Depth of the cube hierarchy, `None` to choose it from the panel count
    partitioning_depth: Option<usize>,
    /// Absolute residual tolerance of the iterative solves
    tolerance: f64,
    /// Maximum number of Krylov iterations per conductor
    max_iterations: usize,
    /// Relative permittivity applied to the whole result
    perm_factor: f64,
    /// Krylov method
    krylov: KrylovMethod,
    /// Preconditioner
    preconditioner: PreconditionerType,
    /// Always solve with a dense factorisation
    direct: bool,
    /// Problems with at most this many real panels are solved directly
    direct_size_limit: usize,
    /// Conductors that are not solved for
    skip_conductors: Option<Vec<String>>,
    /// Conductors removed from the input entirely
    remove_conductors: Option<Vec<String>>,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            expansion_order: 2,
            partitioning_depth: None,
            tolerance: 0.01,
            max_iterations: 200,
            perm_factor: 1.0,
            krylov: KrylovMethod::Gmres,
            preconditioner: PreconditionerType::Overlap,
            direct: false,
            direct_size_limit: 0,
            skip_conductors: None,
            remove_conductors: None,
        }
    }
}

impl SolverOptions {
    /// Multipole expansion order
    pub fn expansion_order(&self) -> usize {
        self.expansion_order
    }
    /// Set the multipole expansion order, at most [MAX_EXPANSION_ORDER]
    pub fn set_expansion_order(&mut self, order: usize) -> Result<()> {
        if order > MAX_EXPANSION_ORDER {
            return Err(Error::Configuration(format!(
                "Expansion order {order} exceeds the maximum of {MAX_EXPANSION_ORDER}"
            )));
        }
        self.expansion_order = order;
        Ok(())
    }

    /// Depth of the cube hierarchy
    pub fn partitioning_depth(&self) -> Option<usize> {
        self.partitioning_depth
    }
    /// Set the depth of the cube hierarchy; `None` selects it automatically
    pub fn set_partitioning_depth(&mut self, depth: Option<usize>) {
        self.partitioning_depth = depth;
    }

    /// Residual tolerance
    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }
    /// Set the residual tolerance, which must be positive
    pub fn set_tolerance(&mut self, tolerance: f64) -> Result<()> {
        self.tolerance = positive("tolerance", tolerance)?;
        Ok(())
    }

    /// Maximum number of iterations
    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }
    /// Set the maximum number of iterations
    pub fn set_max_iterations(&mut self, max_iterations: usize) {
        self.max_iterations = max_iterations;
    }

    /// Permittivity factor
    pub fn perm_factor(&self) -> f64 {
        self.perm_factor
    }
    /// Set the permittivity factor, which must be positive
    pub fn set_perm_factor(&mut self, perm_factor: f64) -> Result<()> {
        self.perm_factor = positive("permittivity factor", perm_factor)?;
        Ok(())
    }

    /// Krylov method
    pub fn krylov(&self) -> KrylovMethod {
        self.krylov
    }
    /// Set the Krylov method
    pub fn set_krylov(&mut self, krylov: KrylovMethod) {
        self.krylov = krylov;
    }

    /// Preconditioner
    pub fn preconditioner(&self) -> PreconditionerType {
        self.preconditioner
    }
    /// Set the preconditioner
    pub fn set_preconditioner(&mut self, preconditioner: PreconditionerType) {
        self.preconditioner = preconditioner;
    }

    /// Whether the direct solver is forced
    pub fn direct(&self) -> bool {
        self.direct
    }
    /// Force (or stop forcing) the direct solver
    pub fn set_direct(&mut self, direct: bool) {
        self.direct = direct;
    }

    /// Largest real panel count solved directly
    pub fn direct_size_limit(&self) -> usize {
        self.direct_size_limit
    }
    /// Set the largest real panel count solved directly
    pub fn set_direct_size_limit(&mut self, limit: usize) {
        self.direct_size_limit = limit;
    }

    /// Conductors that are not solved for
    pub fn skip_conductors(&self) -> Option<&[String]> {
        self.skip_conductors.as_deref()
    }
    /// Set the conductors that are not solved for
    ///
    /// Each entry is a comma separated list of name prefixes.
    pub fn set_skip_conductors(&mut self, names: Option<Vec<String>>) -> Result<()> {
        if let Some(names) = &names {
            validate_list(names)?;
        }
        self.skip_conductors = names;
        Ok(())
    }

    /// Conductors removed from the input
    pub fn remove_conductors(&self) -> Option<&[String]> {
        self.remove_conductors.as_deref()
    }
    /// Set the conductors removed from the input
    pub fn set_remove_conductors(&mut self, names: Option<Vec<String>>) -> Result<()> {
        if let Some(names) = &names {
            validate_list(names)?;
        }
        self.remove_conductors = names;
        Ok(())
    }

    /// Whether a problem with `real_panels` panels is solved with a dense factorisation
    pub fn solves_directly(&self, real_panels: usize) -> bool {
        self.direct || real_panels <= self.direct_size_limit
    }
}

fn positive(what: &str, value: f64) -> Result<f64> {
    if value > 0.0 && value.is_finite() {
        Ok(value)
    } else {
        Err(Error::Configuration(format!(
            "The {what} must be a positive number, got {value}"
        )))
    }
}

fn validate_list(names: &[String]) -> Result<()> {
    for entry in names {
        for name in entry.split(',') {
            validate_name(name)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = SolverOptions::default();
        assert_eq!(options.expansion_order(), 2);
        assert_eq!(options.partitioning_depth(), None);
        assert_eq!(options.tolerance(), 0.01);
        assert_eq!(options.perm_factor(), 1.0);
        assert_eq!(options.krylov(), KrylovMethod::Gmres);
        assert!(options.skip_conductors().is_none());
        assert!(!options.solves_directly(1));
    }

    #[test]
    fn test_conductor_lists() {
        let mut options = SolverOptions::default();
        options
            .set_skip_conductors(Some(vec!["a".to_string(), "b,c".to_string()]))
            .unwrap();
        assert_eq!(options.skip_conductors().unwrap().len(), 2);

        assert_eq!(
            options.set_remove_conductors(Some(vec!["a%1".to_string()])),
            Err(Error::InvalidConductorName("a%1".to_string()))
        );
        assert_eq!(
            options.set_remove_conductors(Some(vec!["a,".to_string()])),
            Err(Error::EmptyConductorName)
        );
        assert!(options.remove_conductors().is_none());
    }

    #[test]
    fn test_numeric_validation() {
        let mut options = SolverOptions::default();
        options.set_expansion_order(MAX_EXPANSION_ORDER).unwrap();
        assert_eq!(options.expansion_order(), MAX_EXPANSION_ORDER);
        assert!(matches!(
            options.set_expansion_order(MAX_EXPANSION_ORDER + 1),
            Err(Error::Configuration(_))
        ));
        assert_eq!(options.expansion_order(), MAX_EXPANSION_ORDER);

        options.set_tolerance(1e-3).unwrap();
        for bad in [0.0, -1e-3, f64::NAN, f64::INFINITY] {
            assert!(matches!(options.set_tolerance(bad), Err(Error::Configuration(_))));
            assert!(matches!(options.set_perm_factor(bad), Err(Error::Configuration(_))));
        }
        assert_eq!(options.tolerance(), 1e-3);
        assert_eq!(options.perm_factor(), 1.0);
    }
}
