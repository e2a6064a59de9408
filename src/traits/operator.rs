//! Matrix-free potential operators

/// A linear operator mapping panel charges to system rows
///
/// Entries are indexed over all panels, real and dummy. Entries belonging to dummy points are
/// zero on output and are ignored on input.
pub trait PotentialOperator {
    /// Number of entries of the charge and potential vectors
    fn size(&self) -> usize;

    /// Compute `p = P q`
    fn apply(&mut self, q: &[f64], p: &mut [f64]);

    /// Map the unknowns of a right preconditioned solve back to panel charges
    ///
    /// Operators that are not preconditioned leave `q` untouched.
    fn recover_charges(&mut self, _q: &mut [f64]) {}
}
