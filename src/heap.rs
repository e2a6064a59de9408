//! Allocate-only arena for the dense blocks of the multipole operator
//!
//! Every allocation is tagged with a [MemoryKind] and is zero-initialised. Nothing is released
//! until the [Heap] itself is dropped. Allocations are addressed through small `Copy` handles
//! that stay valid for the lifetime of the heap that produced them.
use log::info;
use std::marker::PhantomData;

/// Category of a heap allocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemoryKind {
    /// Direct near-field interaction blocks
    NearField,
    /// Charge-to-multipole and multipole-to-multipole matrices
    UpPass,
    /// Panel index lists of the near-field and evaluation blocks
    DownPass,
    /// Multipole-to-point evaluation matrices
    Evaluation,
    /// Preconditioner blocks
    DiagonalCorrection,
    /// Everything else
    Miscellaneous,
}

impl MemoryKind {
    /// All memory kinds, in reporting order
    pub const ALL: [MemoryKind; 6] = [
        MemoryKind::NearField,
        MemoryKind::UpPass,
        MemoryKind::DownPass,
        MemoryKind::Evaluation,
        MemoryKind::DiagonalCorrection,
        MemoryKind::Miscellaneous,
    ];

    fn index(self) -> usize {
        match self {
            MemoryKind::NearField => 0,
            MemoryKind::UpPass => 1,
            MemoryKind::DownPass => 2,
            MemoryKind::Evaluation => 3,
            MemoryKind::DiagonalCorrection => 4,
            MemoryKind::Miscellaneous => 5,
        }
    }

    /// Short label used in memory reports
    pub fn label(self) -> &'static str {
        match self {
            MemoryKind::NearField => "Q2P",
            MemoryKind::UpPass => "Q2M/M2M",
            MemoryKind::DownPass => "indices",
            MemoryKind::Evaluation => "M2P",
            MemoryKind::DiagonalCorrection => "precond",
            MemoryKind::Miscellaneous => "misc",
        }
    }
}

/// Element types that can be stored on a [Heap]
pub trait HeapElement: Copy + Default + 'static {
    #[doc(hidden)]
    fn pool(heap: &Heap) -> &Vec<Self>;
    #[doc(hidden)]
    fn pool_mut(heap: &mut Heap) -> &mut Vec<Self>;
}

macro_rules! heap_element {
    ($t:ty, $pool:ident) => {
        impl HeapElement for $t {
            fn pool(heap: &Heap) -> &Vec<Self> {
                &heap.$pool
            }
            fn pool_mut(heap: &mut Heap) -> &mut Vec<Self> {
                &mut heap.$pool
            }
        }
    };
}

heap_element!(f64, reals);
heap_element!(usize, indices);

/// Handle to a contiguous block of `T` on a [Heap]
#[derive(Debug)]
pub struct HeapSlice<T> {
    offset: usize,
    len: usize,
    _marker: PhantomData<T>,
}

impl<T> Clone for HeapSlice<T> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<T> Copy for HeapSlice<T> {}

impl<T> HeapSlice<T> {
    /// Number of entries
    pub fn len(&self) -> usize {
        self.len
    }
    /// Whether the block is empty
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Handle to a row-major dense matrix of `T` on a [Heap]
#[derive(Debug)]
pub struct HeapMatrix<T> {
    offset: usize,
    rows: usize,
    cols: usize,
    _marker: PhantomData<T>,
}

impl<T> Clone for HeapMatrix<T> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<T> Copy for HeapMatrix<T> {}

impl<T> HeapMatrix<T> {
    /// Number of rows
    pub fn rows(&self) -> usize {
        self.rows
    }
    /// Number of columns
    pub fn cols(&self) -> usize {
        self.cols
    }
}

/// Handle to a string copied onto a [Heap]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeapStr {
    offset: usize,
    len: usize,
}

/// Allocate-only arena
#[derive(Debug, Default)]
pub struct Heap {
    reals: Vec<f64>,
    indices: Vec<usize>,
    text: String,
    usage: [usize; 6],
}

impl Heap {
    /// Create an empty heap
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate `n` zeroed entries
    pub fn alloc<T: HeapElement>(&mut self, n: usize, kind: MemoryKind) -> HeapSlice<T> {
        let pool = T::pool_mut(self);
        let offset = pool.len();
        pool.resize(offset + n, T::default());
        self.usage[kind.index()] += n * std::mem::size_of::<T>();
        HeapSlice {
            offset,
            len: n,
            _marker: PhantomData,
        }
    }

    /// Allocate a zeroed `rows` x `cols` matrix
    pub fn mat<T: HeapElement>(
        &mut self,
        rows: usize,
        cols: usize,
        kind: MemoryKind,
    ) -> HeapMatrix<T> {
        let block = self.alloc::<T>(rows * cols, kind);
        HeapMatrix {
            offset: block.offset,
            rows,
            cols,
            _marker: PhantomData,
        }
    }

    /// Copy a string onto the heap
    pub fn strdup(&mut self, s: &str, kind: MemoryKind) -> HeapStr {
        let offset = self.text.len();
        self.text.push_str(s);
        self.usage[kind.index()] += s.len();
        HeapStr {
            offset,
            len: s.len(),
        }
    }

    /// Resolve a string handle
    pub fn str(&self, s: HeapStr) -> &str {
        &self.text[s.offset..s.offset + s.len]
    }

    /// Resolve a slice handle
    pub fn slice<T: HeapElement>(&self, s: HeapSlice<T>) -> &[T] {
        &T::pool(self)[s.offset..s.offset + s.len]
    }

    /// Resolve a slice handle mutably
    pub fn slice_mut<T: HeapElement>(&mut self, s: HeapSlice<T>) -> &mut [T] {
        &mut T::pool_mut(self)[s.offset..s.offset + s.len]
    }

    /// All entries of a matrix, row-major
    pub fn matrix<T: HeapElement>(&self, m: HeapMatrix<T>) -> &[T] {
        &T::pool(self)[m.offset..m.offset + m.rows * m.cols]
    }

    /// All entries of a matrix, row-major, mutably
    pub fn matrix_mut<T: HeapElement>(&mut self, m: HeapMatrix<T>) -> &mut [T] {
        &mut T::pool_mut(self)[m.offset..m.offset + m.rows * m.cols]
    }

    /// One row of a matrix
    pub fn row<T: HeapElement>(&self, m: HeapMatrix<T>, i: usize) -> &[T] {
        assert!(i < m.rows);
        let start = m.offset + i * m.cols;
        &T::pool(self)[start..start + m.cols]
    }

    /// One row of a matrix, mutably
    pub fn row_mut<T: HeapElement>(&mut self, m: HeapMatrix<T>, i: usize) -> &mut [T] {
        assert!(i < m.rows);
        let start = m.offset + i * m.cols;
        &mut T::pool_mut(self)[start..start + m.cols]
    }

    /// Bytes allocated for a kind
    pub fn memory(&self, kind: MemoryKind) -> usize {
        self.usage[kind.index()]
    }

    /// Bytes allocated in total
    pub fn total_memory(&self) -> usize {
        self.usage.iter().sum()
    }

    /// Log a per-kind synopsis of the allocated memory
    pub fn log_usage(&self) {
        for kind in MemoryKind::ALL {
            info!("  {:<8} {:>12} bytes", kind.label(), self.memory(kind));
        }
        info!("  {:<8} {:>12} bytes", "total", self.total_memory());
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_zero_initialised() {
        let mut heap = Heap::new();
        let a = heap.alloc::<f64>(5, MemoryKind::Miscellaneous);
        heap.slice_mut(a)[2] = 3.0;
        let b = heap.alloc::<f64>(7, MemoryKind::Miscellaneous);
        assert_eq!(heap.slice(a), &[0.0, 0.0, 3.0, 0.0, 0.0]);
        assert!(heap.slice(b).iter().all(|x| *x == 0.0));

        let idx = heap.alloc::<usize>(4, MemoryKind::NearField);
        assert_eq!(heap.slice(idx), &[0, 0, 0, 0]);
    }

    #[test]
    fn test_matrix_rows() {
        let mut heap = Heap::new();
        let m = heap.mat::<f64>(3, 2, MemoryKind::UpPass);
        heap.row_mut(m, 1)[0] = 1.5;
        heap.row_mut(m, 2)[1] = -2.0;
        assert_eq!(m.rows(), 3);
        assert_eq!(m.cols(), 2);
        assert_eq!(heap.row(m, 0), &[0.0, 0.0]);
        assert_eq!(heap.matrix(m), &[0.0, 0.0, 1.5, 0.0, 0.0, -2.0]);
    }

    #[test]
    fn test_handles_survive_growth() {
        let mut heap = Heap::new();
        let a = heap.alloc::<f64>(2, MemoryKind::Miscellaneous);
        heap.slice_mut(a).copy_from_slice(&[4.0, 5.0]);
        for _ in 0..100 {
            heap.alloc::<f64>(1000, MemoryKind::Evaluation);
        }
        assert_eq!(heap.slice(a), &[4.0, 5.0]);
    }

    #[test]
    fn test_memory_accounting() {
        let mut heap = Heap::new();
        heap.alloc::<f64>(10, MemoryKind::NearField);
        heap.mat::<f64>(3, 4, MemoryKind::NearField);
        heap.alloc::<usize>(6, MemoryKind::UpPass);
        heap.strdup("conductor", MemoryKind::Miscellaneous);

        assert_eq!(heap.memory(MemoryKind::NearField), 22 * 8);
        assert_eq!(
            heap.memory(MemoryKind::UpPass),
            6 * std::mem::size_of::<usize>()
        );
        assert_eq!(heap.memory(MemoryKind::Miscellaneous), 9);
        assert_eq!(heap.memory(MemoryKind::Evaluation), 0);
        assert_eq!(
            heap.total_memory(),
            22 * 8 + 6 * std::mem::size_of::<usize>() + 9
        );
    }

    #[test]
    fn test_labels() {
        let labels = MemoryKind::ALL.map(MemoryKind::label);
        assert_eq!(
            labels,
            ["Q2P", "Q2M/M2M", "indices", "M2P", "precond", "misc"]
        );
    }

    #[test]
    fn test_strdup() {
        let mut heap = Heap::new();
        let a = heap.strdup("alpha", MemoryKind::Miscellaneous);
        let b = heap.strdup("", MemoryKind::Miscellaneous);
        let c = heap.strdup("beta", MemoryKind::Miscellaneous);
        assert_eq!(heap.str(a), "alpha");
        assert_eq!(heap.str(b), "");
        assert_eq!(heap.str(c), "beta");
    }
}
