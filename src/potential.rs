//! Panels of a problem and the rows of the collocation system
use crate::error::Result;
use crate::geometry::{DummySide, Panel, PanelRole};
use crate::surface::{PlacedSurface, SurfaceKind};
use log::debug;

#[derive(Debug, Clone, Copy)]
struct SurfaceData {
    kind: SurfaceKind,
    outer_perm: f64,
    inner_perm: f64,
}

/// Field condition on a real dielectric interface panel
#[derive(Debug, Clone, Copy)]
struct InterfaceRow {
    panel: usize,
    positive: usize,
    negative: usize,
    h_positive: f64,
    h_negative: f64,
    outer_perm: f64,
    inner_perm: f64,
}

impl InterfaceRow {
    /// `eps_out (phi+ - phi) / h+ - eps_in (phi - phi-) / h-`
    fn combine(&self, centre: f64, positive: f64, negative: f64) -> f64 {
        self.outer_perm * (positive - centre) / self.h_positive
            - self.inner_perm * (centre - negative) / self.h_negative
    }
}

/// All panels of a problem, real and dummy, with the information needed to form system rows
///
/// Rows of real conductor panels state the potential at the collocation point; rows of real
/// dielectric panels state continuity of the normal displacement, evaluated by finite
/// differences between the panel's dummy points. Rows and columns of dummy points are zero.
#[derive(Debug, Clone)]
pub struct PanelSystem {
    panels: Vec<Panel>,
    surfaces: Vec<SurfaceData>,
    interfaces: Vec<InterfaceRow>,
    interface_of: Vec<Option<usize>>,
    dummies: Vec<usize>,
    real_count: usize,
}

impl PanelSystem {
    /// Discretise placed surfaces
    ///
    /// The dummy points of a dielectric surface follow all real panels of that surface.
    pub fn new(surfaces: &[PlacedSurface]) -> Result<Self> {
        let mut panels = vec![];
        let mut data = Vec::with_capacity(surfaces.len());
        for (index, surface) in surfaces.iter().enumerate() {
            data.push(SurfaceData {
                kind: surface.kind(),
                outer_perm: surface.outer_perm(),
                inner_perm: surface.inner_perm(),
            });
            let start = panels.len();
            for polygon in surface.polygons() {
                let mut panel = Panel::new(polygon, surface.conductor(), index)?;
                if let Some((point, inside)) = surface.reference {
                    panel.orient(&point, inside);
                }
                panels.push(panel);
            }
            let end = panels.len();
            if surface.kind().is_dielectric() {
                for owner in start..end {
                    let positive = Panel::dummy(owner, &panels[owner], DummySide::Positive);
                    let negative = Panel::dummy(owner, &panels[owner], DummySide::Negative);
                    panels.push(positive);
                    panels.push(negative);
                    let n = panels.len();
                    panels[owner].set_dummies(n - 2, n - 1);
                }
            }
        }

        let mut interfaces = vec![];
        let mut interface_of = vec![None; panels.len()];
        let mut dummies = vec![];
        for (i, panel) in panels.iter().enumerate() {
            match panel.role() {
                PanelRole::Dummy { .. } => dummies.push(i),
                PanelRole::Real {
                    dummies: Some([positive, negative]),
                } => {
                    let surface = data[panel.surface()];
                    if surface.kind.is_conductor() {
                        continue;
                    }
                    interface_of[i] = Some(interfaces.len());
                    interfaces.push(InterfaceRow {
                        panel: i,
                        positive,
                        negative,
                        h_positive: dummy_distance(&panels[positive]),
                        h_negative: dummy_distance(&panels[negative]),
                        outer_perm: surface.outer_perm,
                        inner_perm: surface.inner_perm,
                    });
                }
                PanelRole::Real { dummies: None } => {}
            }
        }
        let real_count = panels.len() - dummies.len();
        debug!(
            "Discretised {} surfaces into {} real panels and {} dummy points",
            surfaces.len(),
            real_count,
            dummies.len()
        );

        Ok(Self {
            panels,
            surfaces: data,
            interfaces,
            interface_of,
            dummies,
            real_count,
        })
    }

    /// All panels
    pub fn panels(&self) -> &[Panel] {
        &self.panels
    }

    /// Number of panels, including dummy points
    pub fn size(&self) -> usize {
        self.panels.len()
    }

    /// Number of real panels
    pub fn real_count(&self) -> usize {
        self.real_count
    }

    /// Indices of the real panels, in order
    pub fn real_panels(&self) -> Vec<usize> {
        (0..self.panels.len())
            .filter(|i| !self.panels[*i].is_dummy())
            .collect()
    }

    /// Whether a panel is a dummy point
    pub fn is_dummy(&self, panel: usize) -> bool {
        self.panels[panel].is_dummy()
    }

    /// Kind of the surface a panel belongs to
    pub fn kind(&self, panel: usize) -> SurfaceKind {
        self.surfaces[self.panels[panel].surface()].kind
    }

    /// Outer permittivity of the surface a panel belongs to
    pub fn outer_perm(&self, panel: usize) -> f64 {
        self.surfaces[self.panels[panel].surface()].outer_perm
    }

    /// Conductor number of a panel
    pub fn conductor(&self, panel: usize) -> usize {
        self.panels[panel].conductor()
    }

    /// Potential at the evaluation point of `target` due to a unit charge spread over `source`
    pub fn potential(&self, target: usize, source: usize) -> f64 {
        self.panels[source].potential(self.panels[target].centroid())
    }

    /// Entry `(row, col)` of the system matrix
    pub fn coefficient(&self, row: usize, col: usize) -> f64 {
        if self.is_dummy(row) || self.is_dummy(col) {
            return 0.0;
        }
        match self.interface_of[row] {
            None => self.potential(row, col),
            Some(k) => {
                let interface = &self.interfaces[k];
                interface.combine(
                    self.potential(row, col),
                    self.potential(interface.positive, col),
                    self.potential(interface.negative, col),
                )
            }
        }
    }

    /// Turn potentials at all evaluation points into system rows
    ///
    /// Interface rows become field differences and dummy entries are zeroed.
    pub fn convert_rows(&self, p: &mut [f64]) {
        for interface in &self.interfaces {
            p[interface.panel] = interface.combine(
                p[interface.panel],
                p[interface.positive],
                p[interface.negative],
            );
        }
        for i in &self.dummies {
            p[*i] = 0.0;
        }
    }
}

fn dummy_distance(panel: &Panel) -> f64 {
    match panel.role() {
        PanelRole::Dummy { distance, .. } => distance,
        PanelRole::Real { .. } => 0.0,
    }
}
