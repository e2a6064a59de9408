//! Capacitance problems: conductors, surfaces and options
use crate::capacitance::{assemble, Assembly, CapacitanceMatrix};
use crate::conductor::{conductor_key, ConductorList, GroupIdGenerator};
use crate::error::{Error, Result};
use crate::options::SolverOptions;
use crate::potential::PanelSystem;
use crate::session::Session;
use crate::solver::{DirectSolver, KrylovSolver};
use crate::surface::{PlacedSurface, Surface, SurfacePlacement};
use log::info;
use std::collections::BTreeSet;

/// A set of surfaces whose capacitance matrix is wanted
///
/// Surfaces are added one at a time. Conductors are numbered in the order their names first
/// appear; surfaces in different groups never share a conductor, even when their names agree.
#[derive(Debug, Default)]
pub struct Problem {
    title: Option<String>,
    options: SolverOptions,
    conductors: ConductorList,
    surfaces: Vec<PlacedSurface>,
    groups: GroupIdGenerator,
    chained_group: Option<String>,
}

impl Problem {
    /// Create an empty problem with default options
    pub fn new() -> Self {
        Self::default()
    }

    /// Title
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// Set the title
    pub fn set_title(&mut self, title: &str) {
        self.title = Some(title.to_string());
    }

    /// Solver options
    pub fn options(&self) -> &SolverOptions {
        &self.options
    }

    /// Solver options, mutably
    pub fn options_mut(&mut self) -> &mut SolverOptions {
        &mut self.options
    }

    /// Surfaces added so far
    pub fn surfaces(&self) -> &[PlacedSurface] {
        &self.surfaces
    }

    /// Add a surface
    ///
    /// Conductor surfaces must be named. The group is the one named by the placement, or the
    /// group of the previous surface if that one was chained, or a new group.
    pub fn add(&mut self, surface: &Surface, placement: &SurfacePlacement) -> Result<()> {
        let kind = placement.kind();
        let group = match (placement.group(), self.chained_group.take()) {
            (Some(group), _) => group.to_string(),
            (None, Some(group)) => group,
            (None, None) => self.groups.next_id().to_string(),
        };

        let conductor = if kind.is_conductor() {
            let name = surface.name().ok_or_else(|| {
                Error::Configuration(format!(
                    "Conductor surface '{}' has no conductor name",
                    surface.title().unwrap_or("")
                ))
            })?;
            self.conductors.get_or_create(&conductor_key(name, &group))?
        } else {
            0
        };

        if placement.chained() {
            self.chained_group = Some(group.clone());
        }

        self.surfaces.push(PlacedSurface {
            name: surface.name().map(str::to_string),
            title: surface.title().map(str::to_string),
            kind,
            group,
            conductor,
            outer_perm: placement.outer_perm(),
            inner_perm: placement.inner_perm(),
            reference: placement.reference(),
            polygons: surface
                .polygons()
                .iter()
                .map(|polygon| polygon.iter().map(|p| placement.transform(p)).collect())
                .collect(),
        });
        Ok(())
    }

    /// Give a conductor a new display name
    pub fn rename_conductor(&mut self, old_name: &str, new_name: &str) -> Result<()> {
        self.conductors.rename(old_name, new_name)
    }

    /// Number of a conductor by primary name or alias
    pub fn conductor_number(&self, name: &str) -> Option<usize> {
        self.conductors.number_of(name)
    }

    /// Display names of all conductors, in numbering order
    pub fn conductor_names(&self) -> Vec<String> {
        self.conductors.display_names()
    }

    /// Number of conductors
    pub fn conductor_count(&self) -> usize {
        self.conductors.len()
    }

    /// Compute the capacitance matrix
    pub fn solve(&self) -> Result<CapacitanceMatrix> {
        Ok(self.solve_with_reports()?.matrix)
    }

    /// Compute the capacitance matrix, keeping the per column solver reports
    pub fn solve_with_reports(&self) -> Result<Assembly> {
        if self.conductors.is_empty() {
            return Err(Error::Configuration(
                "The problem has no conductors".to_string(),
            ));
        }
        let removed = self.resolve(self.options.remove_conductors())?;
        let skipped = self.resolve(self.options.skip_conductors())?;
        let excluded = removed.union(&skipped).copied().collect::<BTreeSet<_>>();
        if excluded.len() == self.conductors.len() {
            return Err(Error::Configuration(
                "Every conductor is excluded from the solve".to_string(),
            ));
        }

        let kept = self
            .surfaces
            .iter()
            .filter(|s| !removed.contains(&s.conductor()))
            .cloned()
            .collect::<Vec<_>>();
        let system = PanelSystem::new(&kept)?;
        info!(
            "Solving {} with {} real panels and {} conductors",
            self.title().unwrap_or("problem"),
            system.real_count(),
            self.conductors.len() - excluded.len()
        );

        let names = self.conductors.display_names();
        let perm_factor = self.options.perm_factor();
        if self.options.solves_directly(system.real_count()) {
            let mut solver = DirectSolver::new(&system)?;
            assemble(&mut solver, &system, &names, &excluded, perm_factor)
        } else {
            let session = Session::new(system.clone(), &self.options)?;
            let mut solver = KrylovSolver::new(
                session,
                self.options.krylov(),
                self.options.tolerance(),
                self.options.max_iterations(),
            );
            let assembly = assemble(&mut solver, &system, &names, &excluded, perm_factor)?;
            info!("Memory usage:");
            solver.operator().heap().log_usage();
            Ok(assembly)
        }
    }

    fn resolve(&self, lists: Option<&[String]>) -> Result<BTreeSet<usize>> {
        let mut numbers = BTreeSet::new();
        for list in lists.unwrap_or(&[]) {
            numbers.extend(self.conductors.resolve_name_set(list)?);
        }
        Ok(numbers)
    }
}
