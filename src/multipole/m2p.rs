//! Multipole-to-point evaluation matrices
use super::{
    cindex, costerms, evaluate_legendre, multerms, sindex, xyz2sphere, MultipoleBuilder,
};
use crate::heap::{Heap, HeapMatrix, MemoryKind};

impl MultipoleBuilder {
    /// Build the `points x terms` matrix evaluating the expansion about `center` at `points`
    pub fn m2p(
        &mut self,
        heap: &mut Heap,
        center: &[f64; 3],
        points: &[[f64; 3]],
    ) -> HeapMatrix<f64> {
        let order = self.order;
        let cterms = costerms(order);
        let terms = multerms(order);
        let npoints = points.len();
        let mat = heap.mat::<f64>(npoints, terms, MemoryKind::Evaluation);
        self.reset_scratch(npoints);
        let values = heap.matrix_mut(mat);

        // rho holds r, rho_n holds r^(n+1), beta and beta_m hold phi and m phi
        for (i, point) in points.iter().enumerate() {
            let (r, cos_t, phi) = xyz2sphere(point, center);
            self.rho[i] = r;
            self.rho_n[i] = r;
            self.beta[i] = phi;
            self.beta_m[i] = phi;
            evaluate_legendre(cos_t, order, &mut values[i * terms..i * terms + cterms]);
        }

        let mut k = 1;
        let mut kold = 1;
        for j in 0..cterms {
            for i in 0..npoints {
                values[i * terms + j] /= self.rho_n[i];
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
                let f = self.fact_fac(n, m);
                for i in 0..npoints {
                    values[i * terms + cindex(n, m)] /= f;
                }
            }
        }

        for row in values.chunks_mut(terms) {
            for n in 1..=order {
                for m in 1..=n {
                    row[sindex(n, m, cterms)] = row[cindex(n, m)];
                }
            }
        }

        for m in 1..=order {
            for n in m..=order {
                let (c, s) = (cindex(n, m), sindex(n, m, cterms));
                for i in 0..npoints {
                    values[i * terms + c] *= self.beta_m[i].cos();
                    values[i * terms + s] *= self.beta_m[i].sin();
                }
            }
            for (b, phi) in self.beta_m.iter_mut().zip(&self.beta) {
                *b += phi;
            }
        }

        mat
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_monopole_column() {
        let mut heap = Heap::new();
        let mut builder = MultipoleBuilder::new(2);
        let points = [[3.0, 0.0, 0.0], [0.0, -2.0, 0.0], [1.0, 1.0, 1.0]];
        let mat = builder.m2p(&mut heap, &[0.0, 0.0, 0.0], &points);
        assert_eq!(mat.rows(), 3);
        assert_eq!(mat.cols(), multerms(2));
        assert_relative_eq!(heap.row(mat, 0)[0], 1.0 / 3.0, epsilon = 1e-15);
        assert_relative_eq!(heap.row(mat, 1)[0], 0.5, epsilon = 1e-15);
        assert_relative_eq!(heap.row(mat, 2)[0], 1.0 / 3.0f64.sqrt(), epsilon = 1e-15);
    }

    #[test]
    fn test_point_charge_expansion() {
        // A unit charge at z = a on the axis has M_n^0 = a^n, giving 1/(r - a) on the axis
        let mut heap = Heap::new();
        let mut builder = MultipoleBuilder::new(6);
        let a = 0.2;
        let q2m = builder.q2m(&mut heap, &[[0.0, 0.0, a]], &[false], &[0.0, 0.0, 0.0]);
        let m2p = builder.m2p(&mut heap, &[0.0, 0.0, 0.0], &[[0.0, 0.0, 2.0]]);
        let moments = heap.matrix(q2m).to_vec();
        let potential = heap
            .row(m2p, 0)
            .iter()
            .zip(&moments)
            .map(|(x, y)| x * y)
            .sum::<f64>();
        assert_relative_eq!(potential, 1.0 / (2.0 - a), max_relative = 1e-6);
    }
}
