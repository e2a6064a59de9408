//! Everything built for one solve of a problem
use crate::error::Result;
use crate::heap::Heap;
use crate::operator::MultipoleOperator;
use crate::options::SolverOptions;
use crate::potential::PanelSystem;
use crate::preconditioner::BlockPreconditioner;
use crate::traits::PotentialOperator;
use crate::tree::auto_depth;
use log::info;

/// The right preconditioned multipole operator `P M` of a panel system
///
/// Owns the heap holding every block of the operator and the preconditioner.
pub struct Session {
    heap: Heap,
    system: PanelSystem,
    operator: MultipoleOperator,
    preconditioner: Option<BlockPreconditioner>,
    scratch: Vec<f64>,
}

impl Session {
    /// Build the operator and the preconditioner for a panel system
    pub fn new(system: PanelSystem, options: &SolverOptions) -> Result<Self> {
        let mut heap = Heap::new();
        let depth = options
            .partitioning_depth()
            .unwrap_or_else(|| auto_depth(system.panels()));
        info!(
            "Building multipole operator of order {} and depth {} for {} panels",
            options.expansion_order(),
            depth,
            system.size()
        );
        let operator =
            MultipoleOperator::build(&mut heap, &system, options.expansion_order(), depth)?;
        let preconditioner = BlockPreconditioner::build(
            &mut heap,
            &system,
            operator.tree(),
            options.preconditioner(),
        )?;
        Ok(Self {
            scratch: vec![0.0; system.size()],
            heap,
            system,
            operator,
            preconditioner,
        })
    }

    /// The panel system
    pub fn system(&self) -> &PanelSystem {
        &self.system
    }

    /// The heap holding the operator blocks
    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    /// The unpreconditioned system product, `p = P q` with system rows
    pub fn apply_unpreconditioned(&mut self, q: &[f64], p: &mut [f64]) {
        self.operator.apply(&self.heap, q, p);
        self.system.convert_rows(p);
    }
}

impl PotentialOperator for Session {
    fn size(&self) -> usize {
        self.system.size()
    }

    fn apply(&mut self, q: &[f64], p: &mut [f64]) {
        match &self.preconditioner {
            Some(preconditioner) => {
                preconditioner.apply(&self.heap, q, &mut self.scratch);
                self.operator.apply(&self.heap, &self.scratch, p);
            }
            None => self.operator.apply(&self.heap, q, p),
        }
        self.system.convert_rows(p);
    }

    fn recover_charges(&mut self, q: &mut [f64]) {
        if let Some(preconditioner) = &self.preconditioner {
            preconditioner.apply(&self.heap, q, &mut self.scratch);
            q.copy_from_slice(&self.scratch);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::heap::MemoryKind;
    use crate::operator::DenseOperator;
    use crate::options::PreconditionerType;
    use crate::shapes::regular_sphere;
    use crate::surface::{PlacedSurface, SurfaceKind};
    use approx::assert_relative_eq;

    fn shell_system() -> PanelSystem {
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
            inner_perm: 4.0,
            reference: Some(([0.0; 3], true)),
            polygons: regular_sphere(2, radius, [0.0; 3]).polygons().to_vec(),
        })
        .collect::<Vec<_>>();
        PanelSystem::new(&surfaces).unwrap()
    }

    #[test]
    fn test_unpreconditioned_rows() {
        let system = shell_system();
        let mut dense = DenseOperator::from_system(&system);
        let mut options = SolverOptions::default();
        options.set_partitioning_depth(Some(1));
        options.set_preconditioner(PreconditionerType::None);
        let mut session = Session::new(system, &options).unwrap();
        assert_eq!(session.heap().memory(MemoryKind::DiagonalCorrection), 0);

        let size = session.size();
        let q = (0..size)
            .map(|i| if session.system().is_dummy(i) { 0.0 } else { 1.0 })
            .collect::<Vec<_>>();
        let mut p = vec![0.0; size];
        let mut expected = vec![0.0; size];
        session.apply(&q, &mut p);
        dense.apply(&q, &mut expected);
        for (a, b) in p.iter().zip(&expected) {
            assert_relative_eq!(*a, *b, max_relative = 1e-6, epsilon = 1e-3);
        }
    }

    #[test]
    fn test_preconditioned_product() {
        let system = shell_system();
        let mut options = SolverOptions::default();
        options.set_partitioning_depth(Some(2));
        let mut session = Session::new(system, &options).unwrap();
        assert!(session.heap().memory(MemoryKind::DiagonalCorrection) > 0);

        let size = session.size();
        let x = (0..size).map(|i| (i % 3) as f64).collect::<Vec<_>>();
        let mut p = vec![0.0; size];
        session.apply(&x, &mut p);

        let mut charges = x.clone();
        session.recover_charges(&mut charges);
        let mut expected = vec![0.0; size];
        session.apply_unpreconditioned(&charges, &mut expected);
        for (a, b) in p.iter().zip(&expected) {
            assert_relative_eq!(*a, *b, epsilon = 1e-12);
        }
    }
}
