//! Panel geometry and the analytic potential of a uniformly charged flat panel
use crate::error::{Error, Result};
use itertools::Itertools;
use num::Float;

/// Distance of the dummy evaluation points from their panel, relative to the panel diagonal
pub const DUMMY_OFFSET: f64 = 1e-6;

/// Dot product
pub fn dot<T: Float>(a: &[T; 3], b: &[T; 3]) -> T {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

/// Cross product
pub fn cross<T: Float>(a: &[T; 3], b: &[T; 3]) -> [T; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

/// `a - b`
pub fn sub<T: Float>(a: &[T; 3], b: &[T; 3]) -> [T; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

/// Euclidean norm
pub fn norm<T: Float>(a: &[T; 3]) -> T {
    dot(a, a).sqrt()
}

/// `a + s b`
pub fn axpy<T: Float>(a: &[T; 3], s: T, b: &[T; 3]) -> [T; 3] {
    [a[0] + s * b[0], a[1] + s * b[1], a[2] + s * b[2]]
}

/// Which side of its panel a dummy evaluation point lies on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DummySide {
    /// Along the normal, in the outer medium
    Positive,
    /// Against the normal, in the inner medium
    Negative,
}

/// Role of a panel in the system
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PanelRole {
    /// A charge carrying panel; dielectric interface panels link to their two dummies
    Real {
        /// Indices of the positive and negative dummy points
        dummies: Option<[usize; 2]>,
    },
    /// An evaluation point next to a dielectric interface panel
    Dummy {
        /// Index of the panel the point belongs to
        owner: usize,
        /// Side of the owner
        side: DummySide,
        /// Distance from the owner's centroid
        distance: f64,
    },
}

/// A flat triangular or quadrilateral boundary element
#[derive(Debug, Clone)]
pub struct Panel {
    vertices: Vec<[f64; 3]>,
    centroid: [f64; 3],
    normal: [f64; 3],
    area: f64,
    max_diagonal: f64,
    conductor: usize,
    surface: usize,
    role: PanelRole,
}

impl Panel {
    /// Create a real panel from 3 or 4 corners
    ///
    /// Quadrilaterals are projected onto their mean plane. The normal follows the right hand
    /// rule on the corner order.
    pub fn new(corners: &[[f64; 3]], conductor: usize, surface: usize) -> Result<Self> {
        let normal = match corners.len() {
            3 => cross(
                &sub(&corners[1], &corners[0]),
                &sub(&corners[2], &corners[0]),
            ),
            4 => cross(
                &sub(&corners[2], &corners[0]),
                &sub(&corners[3], &corners[1]),
            ),
            n => {
                return Err(Error::Configuration(format!(
                    "Panels must have 3 or 4 corners, got {n}"
                )))
            }
        };
        let length = norm(&normal);
        if length <= 0.0 || !length.is_finite() {
            return Err(Error::Configuration(format!(
                "Degenerate panel with corners {corners:?}"
            )));
        }
        let normal = normal.map(|x| x / length);

        let mean = corners.iter().fold([0.0; 3], |acc, c| axpy(&acc, 1.0, c));
        let mean = mean.map(|x| x / corners.len() as f64);
        let vertices = corners
            .iter()
            .map(|c| axpy(c, -dot(&sub(c, &mean), &normal), &normal))
            .collect::<Vec<_>>();

        let mut area = 0.0;
        let mut centroid = [0.0; 3];
        for (b, c) in vertices[1..].iter().tuple_windows() {
            let a = &vertices[0];
            let t = 0.5 * dot(&cross(&sub(b, a), &sub(c, a)), &normal);
            area += t;
            for (j, x) in centroid.iter_mut().enumerate() {
                *x += t * (a[j] + b[j] + c[j]) / 3.0;
            }
        }
        if area <= 0.0 {
            return Err(Error::Configuration(format!(
                "Degenerate panel with corners {corners:?}"
            )));
        }
        let centroid = centroid.map(|x| x / area);

        let max_diagonal = if vertices.len() == 4 {
            Float::max(
                norm(&sub(&vertices[2], &vertices[0])),
                norm(&sub(&vertices[3], &vertices[1])),
            )
        } else {
            vertices
                .iter()
                .tuple_combinations()
                .map(|(a, b)| norm(&sub(a, b)))
                .fold(0.0, Float::max)
        };

        Ok(Self {
            vertices,
            centroid,
            normal,
            area,
            max_diagonal,
            conductor,
            surface,
            role: PanelRole::Real { dummies: None },
        })
    }

    /// Create the dummy evaluation point on one side of a real panel
    pub fn dummy(owner_index: usize, owner: &Panel, side: DummySide) -> Self {
        let distance = DUMMY_OFFSET * owner.max_diagonal;
        let sign = match side {
            DummySide::Positive => 1.0,
            DummySide::Negative => -1.0,
        };
        Self {
            vertices: vec![],
            centroid: axpy(&owner.centroid, sign * distance, &owner.normal),
            normal: owner.normal,
            area: 0.0,
            max_diagonal: 0.0,
            conductor: owner.conductor,
            surface: owner.surface,
            role: PanelRole::Dummy {
                owner: owner_index,
                side,
                distance,
            },
        }
    }

    /// Flip the normal so that it points away from `point` (or towards it if `inside` is false)
    pub fn orient(&mut self, point: &[f64; 3], inside: bool) {
        let towards = dot(&sub(point, &self.centroid), &self.normal) > 0.0;
        if towards == inside {
            self.normal = self.normal.map(|x| -x);
            self.vertices.reverse();
        }
    }

    /// Link a real panel to its dummy points
    pub fn set_dummies(&mut self, positive: usize, negative: usize) {
        self.role = PanelRole::Real {
            dummies: Some([positive, negative]),
        };
    }

    /// Corners (projected onto the panel plane)
    pub fn vertices(&self) -> &[[f64; 3]] {
        &self.vertices
    }
    /// Collocation point
    pub fn centroid(&self) -> &[f64; 3] {
        &self.centroid
    }
    /// Unit normal
    pub fn normal(&self) -> &[f64; 3] {
        &self.normal
    }
    /// Area
    pub fn area(&self) -> f64 {
        self.area
    }
    /// Longest diagonal (longest edge for triangles)
    pub fn max_diagonal(&self) -> f64 {
        self.max_diagonal
    }
    /// Conductor number, 0 for dielectric panels
    pub fn conductor(&self) -> usize {
        self.conductor
    }
    /// Index of the owning surface
    pub fn surface(&self) -> usize {
        self.surface
    }
    /// Role of the panel
    pub fn role(&self) -> PanelRole {
        self.role
    }
    /// Whether this is a dummy evaluation point
    pub fn is_dummy(&self) -> bool {
        matches!(self.role, PanelRole::Dummy { .. })
    }
    /// The owning panel of a dummy point, or the panel itself
    pub fn owner(&self, index: usize) -> usize {
        match self.role {
            PanelRole::Dummy { owner, .. } => owner,
            PanelRole::Real { .. } => index,
        }
    }

    /// Mean potential coefficient `(1/area) * integral of 1/|x - y|` over the panel, at `point`
    pub fn potential(&self, point: &[f64; 3]) -> f64 {
        let z = dot(&sub(point, &self.vertices[0]), &self.normal);
        let distances = self
            .vertices
            .iter()
            .map(|v| norm(&sub(v, point)))
            .collect::<Vec<_>>();

        let mut edges = 0.0;
        let nvertices = self.vertices.len();
        for i in 0..nvertices {
            let j = (i + 1) % nvertices;
            let edge = sub(&self.vertices[j], &self.vertices[i]);
            let length = norm(&edge);
            let outward = cross(&edge, &self.normal).map(|x| x / length);
            let d = dot(&sub(&self.vertices[i], point), &outward);
            let r = distances[i] + distances[j];
            let denominator = r - length;
            if denominator > f64::MIN_POSITIVE && d != 0.0 {
                edges += d * ((r + length) / denominator).ln();
            }
        }

        let mut solid_angle = 0.0;
        if z != 0.0 {
            let a = sub(&self.vertices[0], point);
            for (b, c) in self.vertices[1..].iter().tuple_windows() {
                let b = sub(b, point);
                let c = sub(c, point);
                let (la, lb, lc) = (norm(&a), norm(&b), norm(&c));
                let numerator = dot(&a, &cross(&b, &c));
                let denominator =
                    la * lb * lc + dot(&a, &b) * lc + dot(&a, &c) * lb + dot(&b, &c) * la;
                solid_angle += 2.0 * numerator.atan2(denominator);
            }
        }

        (edges - z.abs() * solid_angle.abs()) / self.area
    }
}

/// Potential of a point charge, `1/r`
pub fn point_potential(source: &[f64; 3], target: &[f64; 3]) -> f64 {
    1.0 / norm(&sub(source, target))
}
