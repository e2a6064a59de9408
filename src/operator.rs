//! Fast multipole approximation of the potential coefficient matrix
use crate::error::{Error, Result};
use crate::heap::{Heap, HeapMatrix, HeapSlice, MemoryKind};
use crate::linalg::{gather, gather_gemv, gemv, scatter_gemv};
use crate::multipole::{MultipoleBuilder, MAX_EXPANSION_ORDER};
use crate::potential::PanelSystem;
use crate::traits::PotentialOperator;
use crate::tree::{CubeKey, CubeTree};
use log::debug;
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use std::collections::BTreeMap;

/// How the expansion of a cube is formed
#[derive(Debug)]
enum Upward {
    /// From the charges of the panels in a leaf
    Leaf {
        panels: HeapSlice<usize>,
        q2m: HeapMatrix<f64>,
    },
    /// From the expansions of the occupied children
    Parent { children: Vec<(usize, HeapMatrix<f64>)> },
}

#[derive(Debug)]
struct Cube {
    upward: Upward,
}

/// Everything a leaf needs to evaluate the potential at its panels
#[derive(Debug)]
struct LeafBlock {
    targets: HeapSlice<usize>,
    sources: HeapSlice<usize>,
    near: HeapMatrix<f64>,
    far: Vec<(usize, HeapMatrix<f64>)>,
}

/// Multipole accelerated `P q` over all panels of a [PanelSystem]
///
/// Interactions between a leaf and itself or an adjacent leaf are computed with dense blocks of
/// exact coefficients. Everything else goes through multipole expansions of the cubes in the
/// interaction lists of the leaf and its ancestors, down to level 2.
pub struct MultipoleOperator {
    tree: CubeTree,
    terms: usize,
    cubes: Vec<Cube>,
    leaves: Vec<LeafBlock>,
    multipoles: Vec<f64>,
}

impl MultipoleOperator {
    /// Build all matrices of the operator into `heap`
    pub fn build(
        heap: &mut Heap,
        system: &PanelSystem,
        order: usize,
        depth: usize,
    ) -> Result<Self> {
        if order > MAX_EXPANSION_ORDER {
            return Err(Error::Configuration(format!(
                "Expansion order {order} exceeds the maximum of {MAX_EXPANSION_ORDER}"
            )));
        }
        let tree = CubeTree::new(system.panels(), depth);
        let mut builder = MultipoleBuilder::new(order);
        let terms = builder.terms();
        let domain = *tree.domain();
        let panels = system.panels();

        // Cubes that carry an expansion, deepest level first so that children precede parents
        let mut index = BTreeMap::<CubeKey, usize>::new();
        let mut cubes = vec![];
        if depth >= 2 {
            for (key, members) in tree.leaves() {
                let points = members
                    .iter()
                    .map(|i| *panels[*i].centroid())
                    .collect::<Vec<_>>();
                let is_dummy = members
                    .iter()
                    .map(|i| panels[*i].is_dummy())
                    .collect::<Vec<_>>();
                let q2m = builder.q2m(heap, &points, &is_dummy, &key.centre(&domain));
                let slice = copy_indices(heap, members, MemoryKind::UpPass);
                index.insert(*key, cubes.len());
                cubes.push(Cube {
                    upward: Upward::Leaf { panels: slice, q2m },
                });
            }
            for level in (2..depth).rev() {
                for key in tree.occupied(level) {
                    let parent_centre = key.centre(&domain);
                    let children = key
                        .children()
                        .iter()
                        .filter_map(|child| index.get(child).map(|c| (*c, child.centre(&domain))))
                        .collect::<Vec<_>>();
                    let children = children
                        .into_iter()
                        .map(|(c, centre)| (c, builder.m2m(heap, &centre, &parent_centre)))
                        .collect();
                    index.insert(key, cubes.len());
                    cubes.push(Cube {
                        upward: Upward::Parent { children },
                    });
                }
            }
        }

        let mut leaves = vec![];
        let near_lists = tree
            .leaves()
            .iter()
            .map(|(key, members)| {
                let mut sources = vec![];
                for k in std::iter::once(*key).chain(tree.adjacent_leaves(key)) {
                    sources.extend(tree.panels(&k).iter().filter(|i| !panels[**i].is_dummy()));
                }
                (*key, members.clone(), sources)
            })
            .collect::<Vec<_>>();
        let near_values = near_lists
            .par_iter()
            .map(|(_, targets, sources)| {
                let mut values = Vec::with_capacity(targets.len() * sources.len());
                for t in targets {
                    for s in sources {
                        values.push(system.potential(*t, *s));
                    }
                }
                values
            })
            .collect::<Vec<_>>();

        for ((key, targets, sources), values) in near_lists.iter().zip(near_values) {
            let near = heap.mat::<f64>(targets.len(), sources.len(), MemoryKind::NearField);
            heap.matrix_mut(near).copy_from_slice(&values);
            let target_slice = copy_indices(heap, targets, MemoryKind::DownPass);
            let source_slice = copy_indices(heap, sources, MemoryKind::DownPass);

            let points = targets
                .iter()
                .map(|i| *panels[*i].centroid())
                .collect::<Vec<_>>();
            let mut far = vec![];
            let mut cube = *key;
            while cube.level() >= 2 {
                for other in cube.interaction_list() {
                    if let Some(c) = index.get(&other) {
                        far.push((*c, builder.m2p(heap, &other.centre(&domain), &points)));
                    }
                }
                cube = cube.parent();
            }

            leaves.push(LeafBlock {
                targets: target_slice,
                sources: source_slice,
                near,
                far,
            });
        }

        debug!(
            "Multipole operator: depth {}, {} leaves, {} expansions of {} terms",
            depth,
            leaves.len(),
            cubes.len(),
            terms
        );

        Ok(Self {
            multipoles: vec![0.0; cubes.len() * terms],
            tree,
            terms,
            cubes,
            leaves,
        })
    }

    /// The cube hierarchy
    pub fn tree(&self) -> &CubeTree {
        &self.tree
    }

    /// Compute the potentials `p` at all evaluation points due to the charges `q`
    ///
    /// Charges at dummy points are ignored.
    pub fn apply(&mut self, heap: &Heap, q: &[f64], p: &mut [f64]) {
        p.fill(0.0);
        for leaf in &self.leaves {
            gather_gemv(
                heap.matrix(leaf.near),
                heap.slice(leaf.targets),
                heap.slice(leaf.sources),
                q,
                p,
            );
        }

        let terms = self.terms;
        for (c, cube) in self.cubes.iter().enumerate() {
            let (done, rest) = self.multipoles.split_at_mut(c * terms);
            let multipole = &mut rest[..terms];
            multipole.fill(0.0);
            match &cube.upward {
                Upward::Leaf { panels, q2m } => {
                    let charges = gather(q, heap.slice(*panels));
                    gemv(heap.matrix(*q2m), &charges, multipole);
                }
                Upward::Parent { children } => {
                    for (child, m2m) in children {
                        let source = &done[child * terms..(child + 1) * terms];
                        gemv(heap.matrix(*m2m), source, multipole);
                    }
                }
            }
        }

        for leaf in &self.leaves {
            let targets = heap.slice(leaf.targets);
            for (cube, m2p) in &leaf.far {
                let source = &self.multipoles[cube * terms..(cube + 1) * terms];
                scatter_gemv(heap.matrix(*m2p), targets, source, p);
            }
        }
    }
}

fn copy_indices(heap: &mut Heap, values: &[usize], kind: MemoryKind) -> HeapSlice<usize> {
    let slice = heap.alloc::<usize>(values.len(), kind);
    heap.slice_mut(slice).copy_from_slice(values);
    slice
}

/// Exact dense system matrix, for small problems and for testing
pub struct DenseOperator {
    size: usize,
    values: Vec<f64>,
}

impl DenseOperator {
    /// Assemble all coefficients of a panel system
    pub fn from_system(system: &PanelSystem) -> Self {
        let size = system.size();
        let values = (0..size)
            .collect::<Vec<_>>()
            .par_iter()
            .map(|row| {
                (0..size)
                    .map(|col| system.coefficient(*row, col))
                    .collect::<Vec<_>>()
            })
            .collect::<Vec<_>>()
            .concat();
        Self { size, values }
    }

    /// Wrap a row-major square matrix
    pub fn from_values(size: usize, values: Vec<f64>) -> Self {
        assert_eq!(values.len(), size * size);
        Self { size, values }
    }

    /// Entry `(row, col)`
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.values[row * self.size + col]
    }
}

impl PotentialOperator for DenseOperator {
    fn size(&self) -> usize {
        self.size
    }

    fn apply(&mut self, q: &[f64], p: &mut [f64]) {
        p.fill(0.0);
        gemv(&self.values, q, p);
    }
}
