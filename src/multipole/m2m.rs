//! Multipole-to-multipole translation matrices
use super::{
    cindex, costerms, evaluate_legendre, factorial, i_pwr, multerms, sindex, xyz2sphere,
    MultipoleBuilder,
};
use crate::heap::{Heap, HeapMatrix, MemoryKind};

impl MultipoleBuilder {
    /// Build the `terms x terms` matrix translating an expansion about `child` to one about
    /// `parent`
    pub fn m2m(
        &mut self,
        heap: &mut Heap,
        child: &[f64; 3],
        parent: &[f64; 3],
    ) -> HeapMatrix<f64> {
        let order = self.order;
        let cterms = costerms(order);
        let terms = multerms(order);
        let mat = heap.mat::<f64>(terms, terms, MemoryKind::UpPass);
        let values = heap.matrix_mut(mat);

        let (rho, cos_a, beta) = xyz2sphere(child, parent);
        evaluate_legendre(cos_a, order, &mut self.legendre);
        let leg = &self.legendre;

        let mut add = |row: usize, col: usize, v: f64| values[row * terms + col] += v;

        for j in 0..=order {
            for k in 0..=j {
                let mut rho_pwr = 1.0;
                for n in 0..=j {
                    let mut m_beta = 0.0;
                    for m in 0..=n {
                        let (cos_mb, sin_mb) = (f64::cos(m_beta), f64::sin(m_beta));
                        if k == 0 {
                            if m <= j - n {
                                let t = factorial(j) * rho_pwr * i_pwr(2 * m as i64)
                                    * leg[cindex(n, m)]
                                    / (factorial(j - n + m) * factorial(n + m));
                                add(cindex(j, k), cindex(j - n, m), t * cos_mb);
                                if m != 0 {
                                    add(cindex(j, k), sindex(j - n, m, cterms), t * sin_mb);
                                }
                            }
                        } else {
                            let diff = k as i64 - m as i64;
                            let adiff = diff.unsigned_abs() as usize;
                            let base = factorial(j + k) * rho_pwr * leg[cindex(n, m)]
                                / factorial(n + m);
                            let t2 = base * i_pwr(2 * m as i64) / factorial(j - n + k + m);
                            let t1 = if adiff <= j - n {
                                base * i_pwr(diff - diff.abs()) / factorial(j - n + adiff)
                            } else {
                                0.0
                            };

                            let (ck, sk) = (cindex(j, k), sindex(j, k, cterms));
                            if m != 0 {
                                if diff < 0 && adiff <= j - n {
                                    // conjugate terms
                                    add(ck, cindex(j - n, adiff), t1 * cos_mb);
                                    add(ck, sindex(j - n, adiff, cterms), t1 * sin_mb);
                                    add(sk, cindex(j - n, adiff), t1 * sin_mb);
                                    add(sk, sindex(j - n, adiff, cterms), -t1 * cos_mb);
                                } else if diff == 0 {
                                    add(ck, cindex(j - n, 0), 2.0 * t1 * cos_mb);
                                    add(sk, cindex(j - n, 0), 2.0 * t1 * sin_mb);
                                } else if diff > 0 && adiff <= j - n {
                                    add(ck, cindex(j - n, adiff), t1 * cos_mb);
                                    add(ck, sindex(j - n, adiff, cterms), -t1 * sin_mb);
                                    add(sk, cindex(j - n, adiff), t1 * sin_mb);
                                    add(sk, sindex(j - n, adiff, cterms), t1 * cos_mb);
                                }
                                if k + m <= j - n {
                                    add(ck, cindex(j - n, k + m), t2 * cos_mb);
                                    add(ck, sindex(j - n, k + m, cterms), t2 * sin_mb);
                                    add(sk, cindex(j - n, k + m), -t2 * sin_mb);
                                    add(sk, sindex(j - n, k + m, cterms), t2 * cos_mb);
                                }
                            } else if k <= j - n {
                                add(ck, cindex(j - n, k), t2);
                                add(sk, sindex(j - n, k, cterms), t2);
                            }
                        }
                        m_beta += beta;
                    }
                    rho_pwr *= rho;
                }
            }
        }

        mat
    }
}
