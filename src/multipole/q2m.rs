//! Charge-to-multipole matrices
use super::{
    cindex, costerms, evaluate_legendre, multerms, sindex, xyz2sphere, MultipoleBuilder,
};
use crate::heap::{Heap, HeapMatrix, MemoryKind};

impl MultipoleBuilder {
    /// Build the `terms x points` matrix mapping point charges to the multipole expansion
    /// about `center`
    ///
    /// Columns of dummy points are zero.
    pub fn q2m(
        &mut self,
        heap: &mut Heap,
        points: &[[f64; 3]],
        is_dummy: &[bool],
        center: &[f64; 3],
    ) -> HeapMatrix<f64> {
        let order = self.order;
        let cterms = costerms(order);
        let npoints = points.len();
        let mat = heap.mat::<f64>(multerms(order), npoints, MemoryKind::UpPass);
        self.reset_scratch(npoints);
        let values = heap.matrix_mut(mat);

        for (j, point) in points.iter().enumerate() {
            let (rho, cos_a, beta) = xyz2sphere(point, center);
            self.rho[j] = rho;
            self.rho_n[j] = rho;
            self.beta[j] = beta;
            self.beta_m[j] = beta;
            evaluate_legendre(cos_a, order, &mut self.legendre);
            for (i, v) in self.legendre.iter().enumerate() {
                values[i * npoints + j] = *v;
            }
        }

        // rho^n, with n stepping every n + 1 rows
        let mut k = 2;
        let mut kold = 2;
        for i in 1..cterms {
            for j in 0..npoints {
                values[i * npoints + j] *= self.rho_n[j];
            }
            k -= 1;
            if k == 0 {
                kold += 1;
                k = kold;
                for (r, rho) in self.rho_n.iter_mut().zip(&self.rho) {
                    *r *= rho;
                }
            }
        }

        for n in 1..=order {
            for m in 1..=n {
                let (c, s) = (cindex(n, m), sindex(n, m, cterms));
                values.copy_within(c * npoints..(c + 1) * npoints, s * npoints);
            }
        }

        for m in 1..=order {
            for n in m..=order {
                let (c, s) = (cindex(n, m), sindex(n, m, cterms));
                for j in 0..npoints {
                    values[c * npoints + j] *= 2.0 * self.beta_m[j].cos();
                    values[s * npoints + j] *= 2.0 * self.beta_m[j].sin();
                }
            }
            for (b, beta) in self.beta_m.iter_mut().zip(&self.beta) {
                *b += beta;
            }
        }

        let terms = multerms(order);
        for (j, _) in is_dummy.iter().enumerate().filter(|(_, d)| **d) {
            for i in 0..terms {
                values[i * npoints + j] = 0.0;
            }
        }

        mat
    }
}
