//! Surfaces: named sets of panels and their placement in a problem
use crate::conductor::validate_name;
use crate::error::{Error, Result};
use crate::geometry::{axpy, norm, sub};

/// What a surface represents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceKind {
    /// Surface of a conductor
    Conductor,
    /// Interface between two dielectrics
    Dielectric,
    /// Infinitely thin conductor on a dielectric interface
    ConductorOnDielectric,
}

impl SurfaceKind {
    /// Whether panels of this kind belong to a conductor
    pub fn is_conductor(&self) -> bool {
        matches!(
            self,
            SurfaceKind::Conductor | SurfaceKind::ConductorOnDielectric
        )
    }

    /// Whether panels of this kind need dummy points for the field condition
    pub fn is_dielectric(&self) -> bool {
        matches!(
            self,
            SurfaceKind::Dielectric | SurfaceKind::ConductorOnDielectric
        )
    }
}

/// A named collection of triangles and quadrilaterals
#[derive(Debug, Clone, Default)]
pub struct Surface {
    name: Option<String>,
    title: Option<String>,
    polygons: Vec<Vec<[f64; 3]>>,
}

impl Surface {
    /// Create a surface belonging to the conductor `name`
    pub fn new(name: &str) -> Result<Self> {
        validate_name(name)?;
        Ok(Self {
            name: Some(name.to_string()),
            ..Default::default()
        })
    }

    /// Create a surface without a conductor name, for dielectric interfaces
    pub fn unnamed() -> Self {
        Self::default()
    }

    /// Conductor name
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Set the conductor name
    pub fn set_name(&mut self, name: &str) -> Result<()> {
        validate_name(name)?;
        self.name = Some(name.to_string());
        Ok(())
    }

    /// Title
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// Set the title
    pub fn set_title(&mut self, title: &str) {
        self.title = Some(title.to_string());
    }

    /// Panel corners
    pub fn polygons(&self) -> &[Vec<[f64; 3]>] {
        &self.polygons
    }

    /// Number of panels
    pub fn panel_count(&self) -> usize {
        self.polygons.len()
    }

    /// Add a triangle
    pub fn add_triangle(&mut self, p0: [f64; 3], p1: [f64; 3], p2: [f64; 3]) {
        self.polygons.push(vec![p0, p1, p2]);
    }

    /// Add a quadrilateral
    pub fn add_quadrilateral(&mut self, p0: [f64; 3], p1: [f64; 3], p2: [f64; 3], p3: [f64; 3]) {
        self.polygons.push(vec![p0, p1, p2, p3]);
    }

    /// Add the parallelogram with corner `p0` and edges `p0 -> p1`, `p0 -> p2`, split into
    /// quadrilaterals whose sides are at most `max_dim` long
    pub fn add_meshed_quadrilateral(
        &mut self,
        p0: [f64; 3],
        p1: [f64; 3],
        p2: [f64; 3],
        max_dim: f64,
    ) -> Result<()> {
        if max_dim <= 0.0 {
            return Err(Error::Configuration(format!(
                "Mesh size must be positive, got {max_dim}"
            )));
        }
        let e1 = sub(&p1, &p0);
        let e2 = sub(&p2, &p0);
        let n1 = ((norm(&e1) / max_dim).ceil() as usize).max(1);
        let n2 = ((norm(&e2) / max_dim).ceil() as usize).max(1);
        let point = |i: usize, j: usize| {
            axpy(
                &axpy(&p0, i as f64 / n1 as f64, &e1),
                j as f64 / n2 as f64,
                &e2,
            )
        };
        for i in 0..n1 {
            for j in 0..n2 {
                self.add_quadrilateral(
                    point(i, j),
                    point(i + 1, j),
                    point(i + 1, j + 1),
                    point(i, j + 1),
                );
            }
        }
        Ok(())
    }
}

/// How a surface is placed into a problem
#[derive(Debug, Clone)]
pub struct SurfacePlacement {
    /// Kind of the surface
    kind: SurfaceKind,
    /// Group name; surfaces in different groups never share conductors
    group: Option<String>,
    /// Rotation around the z axis in degrees, applied before the translation
    rotation_z: f64,
    /// Translation
    translation: [f64; 3],
    /// Relative permittivity on the normal side
    outer_perm: f64,
    /// Relative permittivity on the other side
    inner_perm: f64,
    /// Reference point used to orient the normals
    reference_point: Option<[f64; 3]>,
    /// Whether the reference point is inside the surface
    reference_inside: bool,
    /// Whether the next surface shares this surface's group
    chained: bool,
}

impl Default for SurfacePlacement {
    fn default() -> Self {
        Self {
            kind: SurfaceKind::Conductor,
            group: None,
            rotation_z: 0.0,
            translation: [0.0; 3],
            outer_perm: 1.0,
            inner_perm: 1.0,
            reference_point: None,
            reference_inside: true,
            chained: false,
        }
    }
}

impl SurfacePlacement {
    /// Kind of the surface
    pub fn kind(&self) -> SurfaceKind {
        self.kind
    }
    /// Set the kind of the surface
    pub fn set_kind(&mut self, kind: SurfaceKind) {
        self.kind = kind;
    }

    /// Group name
    pub fn group(&self) -> Option<&str> {
        self.group.as_deref()
    }
    /// Set the group name
    pub fn set_group(&mut self, group: &str) {
        self.group = Some(group.to_string());
    }

    /// Set the rotation around the z axis, in degrees
    pub fn set_rotation_z(&mut self, degrees: f64) {
        self.rotation_z = degrees;
    }

    /// Translation
    pub fn translation(&self) -> [f64; 3] {
        self.translation
    }
    /// Set the translation
    pub fn set_translation(&mut self, translation: [f64; 3]) {
        self.translation = translation;
    }

    /// Outer permittivity
    pub fn outer_perm(&self) -> f64 {
        self.outer_perm
    }
    /// Set the outer permittivity
    pub fn set_outer_perm(&mut self, perm: f64) {
        self.outer_perm = perm;
    }

    /// Inner permittivity
    pub fn inner_perm(&self) -> f64 {
        self.inner_perm
    }
    /// Set the inner permittivity
    pub fn set_inner_perm(&mut self, perm: f64) {
        self.inner_perm = perm;
    }

    /// Set a reference point and whether it lies inside the surface
    pub fn set_reference_point(&mut self, point: [f64; 3], inside: bool) {
        self.reference_point = Some(point);
        self.reference_inside = inside;
    }

    /// Whether the next surface shares this surface's group
    pub fn chained(&self) -> bool {
        self.chained
    }
    /// Make the next surface share this surface's group
    pub fn set_chained(&mut self, chained: bool) {
        self.chained = chained;
    }

    /// Map a point of the surface to problem coordinates
    pub fn transform(&self, point: &[f64; 3]) -> [f64; 3] {
        let (s, c) = self.rotation_z.to_radians().sin_cos();
        [
            c * point[0] - s * point[1] + self.translation[0],
            s * point[0] + c * point[1] + self.translation[1],
            point[2] + self.translation[2],
        ]
    }

    /// Reference point in problem coordinates
    pub fn reference(&self) -> Option<([f64; 3], bool)> {
        self.reference_point
            .map(|p| (self.transform(&p), self.reference_inside))
    }
}

/// A surface placed in a problem
#[derive(Debug, Clone)]
pub struct PlacedSurface {
    pub(crate) name: Option<String>,
    pub(crate) title: Option<String>,
    pub(crate) kind: SurfaceKind,
    pub(crate) group: String,
    pub(crate) conductor: usize,
    pub(crate) outer_perm: f64,
    pub(crate) inner_perm: f64,
    pub(crate) reference: Option<([f64; 3], bool)>,
    pub(crate) polygons: Vec<Vec<[f64; 3]>>,
}

impl PlacedSurface {
    /// Conductor name
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
    /// Title
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }
    /// Kind
    pub fn kind(&self) -> SurfaceKind {
        self.kind
    }
    /// Group name
    pub fn group(&self) -> &str {
        &self.group
    }
    /// Conductor number, 0 for dielectric interfaces
    pub fn conductor(&self) -> usize {
        self.conductor
    }
    /// Outer permittivity
    pub fn outer_perm(&self) -> f64 {
        self.outer_perm
    }
    /// Inner permittivity
    pub fn inner_perm(&self) -> f64 {
        self.inner_perm
    }
    /// Panel corners in problem coordinates
    pub fn polygons(&self) -> &[Vec<[f64; 3]>] {
        &self.polygons
    }
}
