//! Uniform octree of cubes partitioning the panels
use crate::geometry::Panel;
use itertools::{iproduct, izip};
use std::collections::{BTreeMap, BTreeSet};

/// Deepest level chosen by the automatic depth selection
pub const MAX_AUTO_DEPTH: usize = 6;

/// Target average number of real panels per occupied leaf for the automatic depth selection
pub const PANELS_PER_LEAF: usize = 8;

lazy_static! {
    static ref DIRECTIONS: Vec<[i64; 3]> = iproduct!(-1i64..=1, -1i64..=1, -1i64..=1)
        .filter(|d| *d != (0, 0, 0))
        .map(|(x, y, z)| [x, y, z])
        .collect();
}

/// A cubic box containing all panels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Domain {
    /// The lower corner
    pub origin: [f64; 3],
    /// The side length
    pub diameter: f64,
}

impl Domain {
    /// Smallest cube (slightly enlarged) containing all points
    pub fn from_points(points: &[[f64; 3]]) -> Self {
        let mut min = [f64::INFINITY; 3];
        let mut max = [f64::NEG_INFINITY; 3];
        for p in points {
            for (lo, hi, x) in izip!(&mut min, &mut max, p) {
                *lo = lo.min(*x);
                *hi = hi.max(*x);
            }
        }
        let diameter = izip!(&min, &max)
            .map(|(lo, hi)| hi - lo)
            .fold(0.0, f64::max);
        // Keep points away from the faces of the domain
        let err = if diameter > 0.0 { 1e-5 * diameter } else { 1e-5 };
        Domain {
            origin: min.map(|x| x - err),
            diameter: diameter + 2.0 * err,
        }
    }
}

/// A cube of the hierarchy, identified by its level and its integer position on that level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CubeKey {
    level: usize,
    anchor: [u64; 3],
}

impl CubeKey {
    /// The cube covering the whole domain
    pub fn root() -> Self {
        Self {
            level: 0,
            anchor: [0; 3],
        }
    }

    /// Create a key from its level and anchor
    pub fn from_anchor(anchor: [u64; 3], level: usize) -> Self {
        Self { level, anchor }
    }

    /// The cube on `level` that contains `point`
    pub fn from_point(point: &[f64; 3], domain: &Domain, level: usize) -> Self {
        let boxes = 1u64 << level;
        let side = domain.diameter / boxes as f64;
        let mut anchor = [0; 3];
        for (a, p, o) in izip!(&mut anchor, point, &domain.origin) {
            let i = ((p - o) / side).floor();
            *a = if i < 0.0 { 0 } else { (i as u64).min(boxes - 1) };
        }
        Self { level, anchor }
    }

    /// Level
    pub fn level(&self) -> usize {
        self.level
    }

    /// Integer position on the level
    pub fn anchor(&self) -> &[u64; 3] {
        &self.anchor
    }

    /// Side length
    pub fn diameter(&self, domain: &Domain) -> f64 {
        domain.diameter / (1u64 << self.level) as f64
    }

    /// Centre
    pub fn centre(&self, domain: &Domain) -> [f64; 3] {
        let d = self.diameter(domain);
        let mut centre = [0.0; 3];
        for (c, a, o) in izip!(&mut centre, &self.anchor, &domain.origin) {
            *c = o + (*a as f64 + 0.5) * d;
        }
        centre
    }

    /// Parent; the root is its own parent
    pub fn parent(&self) -> Self {
        if self.level == 0 {
            *self
        } else {
            Self {
                level: self.level - 1,
                anchor: self.anchor.map(|a| a >> 1),
            }
        }
    }

    /// All eight children
    pub fn children(&self) -> Vec<CubeKey> {
        iproduct!(0..2u64, 0..2u64, 0..2u64)
            .map(|(x, y, z)| Self {
                level: self.level + 1,
                anchor: [
                    2 * self.anchor[0] + x,
                    2 * self.anchor[1] + y,
                    2 * self.anchor[2] + z,
                ],
            })
            .collect()
    }

    /// The cube reached by moving `direction` cubes along each axis, if it is inside the domain
    pub fn find_key_in_direction(&self, direction: &[i64; 3]) -> Option<CubeKey> {
        let boxes = 1i64 << self.level;
        let mut anchor = [0; 3];
        for (new, a, d) in izip!(&mut anchor, &self.anchor, direction) {
            let x = *a as i64 + d;
            if x < 0 || x >= boxes {
                return None;
            }
            *new = x as u64;
        }
        Some(Self {
            level: self.level,
            anchor,
        })
    }

    /// All cubes on the same level that share a face, edge or corner with this one
    pub fn neighbors(&self) -> Vec<CubeKey> {
        DIRECTIONS
            .iter()
            .filter_map(|d| self.find_key_in_direction(d))
            .collect()
    }

    /// Whether two distinct cubes on the same level touch
    pub fn is_adjacent(&self, other: &CubeKey) -> bool {
        self.level == other.level
            && self != other
            && self
                .anchor
                .iter()
                .zip(&other.anchor)
                .all(|(a, b)| a.abs_diff(*b) <= 1)
    }

    /// Cubes on the same level that are well separated from this one but whose parents are not
    pub fn interaction_list(&self) -> Vec<CubeKey> {
        if self.level < 2 {
            return vec![];
        }
        self.parent()
            .neighbors()
            .iter()
            .flat_map(|pn| pn.children())
            .filter(|pnc| !self.is_adjacent(pnc))
            .collect()
    }
}

/// Choose a depth such that occupied leaves hold few real panels on average
pub fn auto_depth(panels: &[Panel]) -> usize {
    let centroids = panels
        .iter()
        .filter(|p| !p.is_dummy())
        .map(|p| *p.centroid())
        .collect::<Vec<_>>();
    if centroids.is_empty() {
        return 0;
    }
    let domain = Domain::from_points(&centroids);
    (0..=MAX_AUTO_DEPTH)
        .find(|&depth| {
            let occupied = centroids
                .iter()
                .map(|c| CubeKey::from_point(c, &domain, depth))
                .collect::<BTreeSet<_>>();
            centroids.len() <= PANELS_PER_LEAF * occupied.len()
        })
        .unwrap_or(MAX_AUTO_DEPTH)
}

/// Uniform depth partition of the panels
///
/// Every real panel is placed in the leaf containing its centroid; dummy evaluation points
/// are placed in the leaf of the panel they belong to.
#[derive(Debug, Clone)]
pub struct CubeTree {
    domain: Domain,
    depth: usize,
    leaves: BTreeMap<CubeKey, Vec<usize>>,
    leaf_of: Vec<CubeKey>,
}

impl CubeTree {
    /// Partition `panels` into cubes of level `depth`
    pub fn new(panels: &[Panel], depth: usize) -> Self {
        let centroids = panels
            .iter()
            .filter(|p| !p.is_dummy())
            .map(|p| *p.centroid())
            .collect::<Vec<_>>();
        let domain = Domain::from_points(&centroids);

        let mut leaf_of = panels
            .iter()
            .map(|p| CubeKey::from_point(p.centroid(), &domain, depth))
            .collect::<Vec<_>>();
        for (i, p) in panels.iter().enumerate() {
            leaf_of[i] = leaf_of[p.owner(i)];
        }

        let mut leaves = BTreeMap::<CubeKey, Vec<usize>>::new();
        for (i, key) in leaf_of.iter().enumerate() {
            leaves.entry(*key).or_default().push(i);
        }

        Self {
            domain,
            depth,
            leaves,
            leaf_of,
        }
    }

    /// Bounding cube
    pub fn domain(&self) -> &Domain {
        &self.domain
    }

    /// Depth of the leaves
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Occupied leaves with the panels they contain, in key order
    pub fn leaves(&self) -> &BTreeMap<CubeKey, Vec<usize>> {
        &self.leaves
    }

    /// Leaf containing a panel
    pub fn leaf_of(&self, panel: usize) -> CubeKey {
        self.leaf_of[panel]
    }

    /// Panels of a leaf
    pub fn panels(&self, key: &CubeKey) -> &[usize] {
        self.leaves.get(key).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Occupied leaves adjacent to `key`
    pub fn adjacent_leaves(&self, key: &CubeKey) -> Vec<CubeKey> {
        key.neighbors()
            .into_iter()
            .filter(|n| self.leaves.contains_key(n))
            .collect()
    }

    /// Cubes on `level` containing at least one panel
    pub fn occupied(&self, level: usize) -> BTreeSet<CubeKey> {
        self.leaves
            .keys()
            .map(|k| {
                let mut k = *k;
                while k.level() > level {
                    k = k.parent();
                }
                k
            })
            .collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_parent_children() {
        let key = CubeKey::from_anchor([3, 0, 5], 3);
        assert_eq!(key.parent(), CubeKey::from_anchor([1, 0, 2], 2));
        let children = key.children();
        assert_eq!(children.len(), 8);
        assert!(children.iter().all(|c| c.parent() == key));
        assert_eq!(CubeKey::root().parent(), CubeKey::root());
    }

    #[test]
    fn test_neighbors() {
        let corner = CubeKey::from_anchor([0, 0, 0], 2);
        assert_eq!(corner.neighbors().len(), 7);
        let inner = CubeKey::from_anchor([1, 2, 1], 2);
        assert_eq!(inner.neighbors().len(), 26);
        assert!(inner.neighbors().iter().all(|n| inner.is_adjacent(n)));
        assert!(!inner.is_adjacent(&inner));
        assert!(!inner.is_adjacent(&CubeKey::from_anchor([3, 2, 1], 2)));
        assert_eq!(corner.find_key_in_direction(&[-1, 0, 0]), None);
        assert_eq!(
            corner.find_key_in_direction(&[1, 0, 1]),
            Some(CubeKey::from_anchor([1, 0, 1], 2))
        );
    }

    #[test]
    fn test_interaction_list() {
        assert!(CubeKey::from_anchor([0, 1, 0], 1).interaction_list().is_empty());

        // An interior cube has 6^3 - 3^3 cubes in its interaction list
        let key = CubeKey::from_anchor([5, 6, 5], 4);
        let list = key.interaction_list();
        assert_eq!(list.len(), 189);
        assert!(list.iter().all(|k| !key.is_adjacent(k) && *k != key));
        assert!(list.iter().all(|k| key.parent().is_adjacent(&k.parent())));
    }

    #[test]
    fn test_domain_and_centres() {
        let domain = Domain::from_points(&[[0.0, 0.0, 0.0], [2.0, 1.0, 0.5]]);
        assert!(domain.diameter > 2.0);
        let key = CubeKey::from_point(&[1.9, 0.9, 0.4], &domain, 1);
        assert_eq!(key.anchor(), &[1, 0, 0]);
        let centre = key.centre(&domain);
        assert_relative_eq!(centre[0], domain.origin[0] + 0.75 * domain.diameter);
        assert_relative_eq!(key.diameter(&domain), 0.5 * domain.diameter);
    }
}
