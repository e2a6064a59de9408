//! Multipole expansion matrices
//!
//! Expansions use real solid harmonics. For an expansion of order `p` the coefficient vector
//! holds the cosine terms `(n, m)`, `0 <= m <= n <= p`, followed by the sine terms with `m > 0`.
mod legendre;
mod m2m;
mod m2p;
mod q2m;

pub use legendre::evaluate_legendre;

/// Largest `n` whose factorial is a finite `f64`
const MAX_FACTORIAL: usize = 170;

/// Highest supported expansion order; translations need factorials up to twice the order
pub const MAX_EXPANSION_ORDER: usize = MAX_FACTORIAL / 2;

lazy_static! {
    static ref FACTORIALS: Vec<f64> = {
        let mut table = vec![1.0; MAX_FACTORIAL + 1];
        for n in 1..table.len() {
            table[n] = table[n - 1] * n as f64;
        }
        table
    };
}

/// `n!`
pub fn factorial(n: usize) -> f64 {
    FACTORIALS[n]
}

/// `i^e` for even `e`
fn i_pwr(e: i64) -> f64 {
    debug_assert!(e % 2 == 0);
    if (e / 2) % 2 == 0 {
        1.0
    } else {
        -1.0
    }
}

/// Number of cosine terms of an expansion of the given order
pub fn costerms(order: usize) -> usize {
    (order + 1) * (order + 2) / 2
}

/// Number of sine terms of an expansion of the given order
pub fn sinterms(order: usize) -> usize {
    costerms(order) - (order + 1)
}

/// Number of coefficients of an expansion of the given order
pub fn multerms(order: usize) -> usize {
    costerms(order) + sinterms(order)
}

/// Position of the cosine term `(n, m)`
pub fn cindex(n: usize, m: usize) -> usize {
    m + n * (n + 1) / 2
}

/// Position of the sine term `(n, m)`, `m > 0`, in an expansion with `cterms` cosine terms
pub fn sindex(n: usize, m: usize, cterms: usize) -> usize {
    cterms + m + n * (n + 1) / 2 - (n + 1)
}

/// Spherical coordinates `(rho, cos(alpha), beta)` of `point` relative to `origin`
pub fn xyz2sphere(point: &[f64; 3], origin: &[f64; 3]) -> (f64, f64, f64) {
    let x = point[0] - origin[0];
    let y = point[1] - origin[1];
    let z = point[2] - origin[2];
    let rho = (x * x + y * y + z * z).sqrt();
    let cos_a = if rho == 0.0 { 1.0 } else { z / rho };
    let beta = if x == 0.0 && y == 0.0 {
        0.0
    } else {
        y.atan2(x)
    };
    (rho, cos_a, beta)
}

/// Builder for expansion matrices of a fixed order
///
/// Holds the scratch space shared by all builds and the `(n + m)! / (n - m)!` table used by
/// the evaluation matrices.
pub struct MultipoleBuilder {
    order: usize,
    legendre: Vec<f64>,
    fact_fac: Vec<f64>,
    rho: Vec<f64>,
    rho_n: Vec<f64>,
    beta: Vec<f64>,
    beta_m: Vec<f64>,
}

impl MultipoleBuilder {
    /// Create a builder for expansions of order `order`
    pub fn new(order: usize) -> Self {
        let mut fact_fac = vec![0.0; (order + 1) * (order + 1)];
        for n in 0..=order {
            fact_fac[n * (order + 1)] = 1.0;
        }
        for n in 1..=order {
            for m in 1..=n {
                fact_fac[n * (order + 1) + m] =
                    (n - (m - 1)) as f64 * fact_fac[n * (order + 1) + m - 1] * (n + m) as f64;
            }
        }
        Self {
            order,
            legendre: vec![0.0; costerms(order)],
            fact_fac,
            rho: vec![],
            rho_n: vec![],
            beta: vec![],
            beta_m: vec![],
        }
    }

    /// Expansion order
    pub fn order(&self) -> usize {
        self.order
    }

    /// Number of coefficients per expansion
    pub fn terms(&self) -> usize {
        multerms(self.order)
    }

    /// `(n + m)! / (n - m)!`
    pub fn fact_fac(&self, n: usize, m: usize) -> f64 {
        self.fact_fac[n * (self.order + 1) + m]
    }

    fn reset_scratch(&mut self, n: usize) {
        for v in [
            &mut self.rho,
            &mut self.rho_n,
            &mut self.beta,
            &mut self.beta_m,
        ] {
            v.clear();
            v.resize(n, 0.0);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::heap::{Heap, HeapMatrix};
    use approx::assert_relative_eq;
    use rand::{Rng, SeedableRng};

    pub(crate) fn matvec(heap: &Heap, m: HeapMatrix<f64>, x: &[f64]) -> Vec<f64> {
        (0..m.rows())
            .map(|i| heap.row(m, i).iter().zip(x).map(|(a, b)| a * b).sum())
            .collect()
    }

    #[test]
    fn test_term_counts() {
        assert_eq!(costerms(0), 1);
        assert_eq!(sinterms(0), 0);
        assert_eq!(costerms(2), 6);
        assert_eq!(sinterms(2), 3);
        assert_eq!(multerms(4), 15 + 10);

        let cterms = costerms(3);
        let mut seen = vec![false; multerms(3)];
        for n in 0..=3 {
            for m in 0..=n {
                seen[cindex(n, m)] = true;
                if m > 0 {
                    seen[sindex(n, m, cterms)] = true;
                }
            }
        }
        assert!(seen.iter().all(|s| *s));
    }

    #[test]
    fn test_factorials() {
        assert_eq!(factorial(0), 1.0);
        assert_eq!(factorial(5), 120.0);
        assert_eq!(i_pwr(0), 1.0);
        assert_eq!(i_pwr(2), -1.0);
        assert_eq!(i_pwr(-2), -1.0);
        assert_eq!(i_pwr(4), 1.0);

        let builder = MultipoleBuilder::new(4);
        for n in 0..=4 {
            for m in 0..=n {
                assert_relative_eq!(
                    builder.fact_fac(n, m),
                    factorial(n + m) / factorial(n - m),
                    max_relative = 1e-14
                );
            }
        }
    }

    #[test]
    fn test_xyz2sphere() {
        let (rho, cos_a, beta) = xyz2sphere(&[1.0, 1.0, 1.0], &[1.0, 1.0, 1.0]);
        assert_eq!((rho, cos_a, beta), (0.0, 1.0, 0.0));
        let (rho, cos_a, beta) = xyz2sphere(&[0.0, 0.0, -2.0], &[0.0, 0.0, 0.0]);
        assert_eq!((rho, cos_a, beta), (2.0, -1.0, 0.0));
        let (rho, cos_a, beta) = xyz2sphere(&[0.0, 3.0, 0.0], &[0.0, 0.0, 0.0]);
        assert_relative_eq!(rho, 3.0);
        assert_relative_eq!(cos_a, 0.0);
        assert_relative_eq!(beta, 0.5 * std::f64::consts::PI);
    }

    #[test]
    fn test_far_field_potential() {
        // Q2M followed by M2P approximates the sum of 1/r over a cluster
        let mut rng = rand::rngs::StdRng::seed_from_u64(1);
        let center = [0.5, 0.5, 0.5];
        let sources = (0..20)
            .map(|_| {
                [
                    rng.gen_range(0.0..1.0),
                    rng.gen_range(0.0..1.0),
                    rng.gen_range(0.0..1.0),
                ]
            })
            .collect::<Vec<_>>();
        let charges = (0..20).map(|_| rng.gen_range(0.0..1.0)).collect::<Vec<_>>();
        let targets = vec![[6.0, 0.5, 0.5], [-3.0, 4.0, 2.0], [0.5, 0.5, -7.0]];

        let mut heap = Heap::new();
        for (order, tolerance) in [(2, 1e-2), (6, 1e-4)] {
            let mut builder = MultipoleBuilder::new(order);
            let q2m = builder.q2m(&mut heap, &sources, &vec![false; 20], &center);
            let m2p = builder.m2p(&mut heap, &center, &targets);
            let moments = matvec(&heap, q2m, &charges);
            let potentials = matvec(&heap, m2p, &moments);
            for (t, p) in targets.iter().zip(&potentials) {
                let direct = sources
                    .iter()
                    .zip(&charges)
                    .map(|(s, q)| q / crate::geometry::norm(&crate::geometry::sub(s, t)))
                    .sum::<f64>();
                assert_relative_eq!(*p, direct, max_relative = tolerance);
            }
        }
    }
}
