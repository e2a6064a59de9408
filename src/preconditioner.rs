//! Block preconditioners built from the cube partition
use crate::error::Result;
use crate::heap::{Heap, HeapMatrix, HeapSlice, MemoryKind};
use crate::linalg::{gather_gemv, invert};
use crate::options::PreconditionerType;
use crate::potential::PanelSystem;
use crate::tree::CubeTree;
use log::debug;
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};

#[derive(Debug)]
struct Block {
    rows: HeapSlice<usize>,
    cols: HeapSlice<usize>,
    matrix: HeapMatrix<f64>,
}

/// Approximate inverse of the system matrix made of independent dense blocks
///
/// Every real panel is a row of exactly one block. Dummy entries map to zero.
#[derive(Debug)]
pub struct BlockPreconditioner {
    blocks: Vec<Block>,
}

impl BlockPreconditioner {
    /// Build the blocks of a preconditioner; `None` for [PreconditionerType::None]
    ///
    /// Block diagonal blocks invert the system restricted to one leaf. Overlapped blocks
    /// invert the system restricted to a leaf and its adjacent leaves and keep the rows of
    /// the leaf.
    pub fn build(
        heap: &mut Heap,
        system: &PanelSystem,
        tree: &CubeTree,
        kind: PreconditionerType,
    ) -> Result<Option<Self>> {
        let overlap = match kind {
            PreconditionerType::None => return Ok(None),
            PreconditionerType::BlockDiagonal => false,
            PreconditionerType::Overlap => true,
        };

        let is_real = |i: &&usize| !system.is_dummy(**i);
        let lists = tree
            .leaves()
            .keys()
            .map(|key| {
                let rows = tree.panels(key).iter().filter(is_real).copied().collect::<Vec<_>>();
                let mut cols = rows.clone();
                if overlap {
                    for other in tree.adjacent_leaves(key) {
                        cols.extend(tree.panels(&other).iter().filter(is_real));
                    }
                }
                (rows, cols)
            })
            .filter(|(rows, _)| !rows.is_empty())
            .collect::<Vec<_>>();

        let inverses = lists
            .par_iter()
            .map(|(rows, cols)| {
                let n = cols.len();
                let mut values = Vec::with_capacity(n * n);
                for r in cols {
                    for c in cols {
                        values.push(system.coefficient(*r, *c));
                    }
                }
                invert(&mut values, n)?;
                values.truncate(rows.len() * n);
                Ok(values)
            })
            .collect::<Result<Vec<_>>>()?;

        let mut blocks = Vec::with_capacity(lists.len());
        for ((rows, cols), values) in lists.iter().zip(inverses) {
            let matrix = heap.mat::<f64>(rows.len(), cols.len(), MemoryKind::DiagonalCorrection);
            heap.matrix_mut(matrix).copy_from_slice(&values);
            let row_slice = heap.alloc::<usize>(rows.len(), MemoryKind::DiagonalCorrection);
            heap.slice_mut(row_slice).copy_from_slice(rows);
            let col_slice = heap.alloc::<usize>(cols.len(), MemoryKind::DiagonalCorrection);
            heap.slice_mut(col_slice).copy_from_slice(cols);
            blocks.push(Block {
                rows: row_slice,
                cols: col_slice,
                matrix,
            });
        }
        debug!("Built {} preconditioner blocks", blocks.len());
        Ok(Some(Self { blocks }))
    }

    /// Number of blocks
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Whether there are no blocks
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// `y = M x`
    pub fn apply(&self, heap: &Heap, x: &[f64], y: &mut [f64]) {
        y.fill(0.0);
        for block in &self.blocks {
            gather_gemv(
                heap.matrix(block.matrix),
                heap.slice(block.rows),
                heap.slice(block.cols),
                x,
                y,
            );
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::operator::DenseOperator;
    use crate::shapes::regular_sphere;
    use crate::surface::{PlacedSurface, SurfaceKind};
    use crate::traits::PotentialOperator;
    use approx::assert_relative_eq;

    fn sphere() -> PanelSystem {
        PanelSystem::new(&[PlacedSurface {
            name: None,
            title: None,
            kind: SurfaceKind::Conductor,
            group: "GROUP1".to_string(),
            conductor: 1,
            outer_perm: 1.0,
            inner_perm: 1.0,
            reference: None,
            polygons: regular_sphere(2, 1.0, [0.0; 3]).polygons().to_vec(),
        }])
        .unwrap()
    }

    #[test]
    fn test_none() {
        let system = sphere();
        let tree = CubeTree::new(system.panels(), 2);
        let mut heap = Heap::new();
        assert!(
            BlockPreconditioner::build(&mut heap, &system, &tree, PreconditionerType::None)
                .unwrap()
                .is_none()
        );
        assert_eq!(heap.total_memory(), 0);
    }

    #[test]
    fn test_single_leaf_is_exact_inverse() {
        // With one leaf both preconditioners are the inverse of the whole system
        let system = sphere();
        let tree = CubeTree::new(system.panels(), 0);
        let mut dense = DenseOperator::from_system(&system);
        for kind in [PreconditionerType::BlockDiagonal, PreconditionerType::Overlap] {
            let mut heap = Heap::new();
            let precond = BlockPreconditioner::build(&mut heap, &system, &tree, kind)
                .unwrap()
                .unwrap();
            assert_eq!(precond.len(), 1);
            assert!(heap.memory(MemoryKind::DiagonalCorrection) > 0);

            let x = (0..system.size()).map(|i| (i % 7) as f64 - 3.0).collect::<Vec<_>>();
            let mut y = vec![0.0; system.size()];
            let mut z = vec![0.0; system.size()];
            precond.apply(&heap, &x, &mut y);
            dense.apply(&y, &mut z);
            for (a, b) in z.iter().zip(&x) {
                assert_relative_eq!(*a, *b, epsilon = 1e-8);
            }
        }
    }

    #[test]
    fn test_block_rows() {
        // Every row of M P restricted to a leaf is a unit vector on that leaf
        let system = sphere();
        let tree = CubeTree::new(system.panels(), 2);
        let dense = DenseOperator::from_system(&system);
        let mut heap = Heap::new();
        let precond =
            BlockPreconditioner::build(&mut heap, &system, &tree, PreconditionerType::BlockDiagonal)
                .unwrap()
                .unwrap();
        assert_eq!(precond.len(), tree.leaves().len());

        let (key, members) = tree.leaves().iter().next().unwrap();
        let j = members[0];
        let mut column = vec![0.0; system.size()];
        for i in tree.panels(key) {
            column[*i] = dense.get(*i, j);
        }
        let mut y = vec![0.0; system.size()];
        precond.apply(&heap, &column, &mut y);
        for (i, value) in y.iter().enumerate() {
            let expected = if i == j { 1.0 } else { 0.0 };
            assert_relative_eq!(*value, expected, epsilon = 1e-8);
        }
    }
}
