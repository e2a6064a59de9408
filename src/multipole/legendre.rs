//! Associated Legendre functions
use super::cindex;

/// Evaluate `P_n^m(cos_a)` for `0 <= m <= n <= order` into `values`, indexed by [cindex]
///
/// The Condon-Shortley phase is included, so `P_1^1 = -sin(a)`.
pub fn evaluate_legendre(cos_a: f64, order: usize, values: &mut [f64]) {
    values[cindex(0, 0)] = 1.0;
    let mut sin_ma = 0.0;
    if order > 0 {
        values[cindex(1, 0)] = cos_a;
        sin_ma = -(1.0 - cos_a * cos_a).max(0.0).sqrt();
        values[cindex(1, 1)] = sin_ma;
    }
    if order > 1 {
        values[cindex(2, 1)] = 3.0 * sin_ma * cos_a;
    }

    // (2m - 1)!!
    let mut fact = 1.0;
    for m in 0..=order {
        if m > 1 {
            fact *= (2 * m - 1) as f64;
            if values[cindex(1, 1)] == 0.0 {
                // On the polar axis
                values[cindex(m, m)] = 0.0;
                if m != order {
                    values[cindex(m + 1, m)] = 0.0;
                }
            } else {
                sin_ma *= values[cindex(1, 1)];
                values[cindex(m, m)] = fact * sin_ma;
                if m != order {
                    values[cindex(m + 1, m)] =
                        values[cindex(1, 0)] * (2 * m + 1) as f64 * values[cindex(m, m)];
                }
            }
        }
        for x in 2..(order + 1 - m) {
            values[cindex(x + m, m)] = ((2 * (x + m) - 1) as f64
                * values[cindex(1, 0)]
                * values[cindex(x + m - 1, m)]
                - (x + 2 * m - 1) as f64 * values[cindex(x + m - 2, m)])
                / x as f64;
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::multipole::costerms;
    use approx::assert_relative_eq;
    use paste::paste;
    use std::f64::consts::PI;

    fn closed_form(n: usize, m: usize, theta: f64) -> f64 {
        let (s, c) = theta.sin_cos();
        match (n, m) {
            (0, 0) => 1.0,
            (1, 0) => c,
            (1, 1) => -s,
            (2, 0) => 0.5 * (3.0 * c * c - 1.0),
            (2, 1) => -3.0 * c * s,
            (2, 2) => 3.0 * s * s,
            (3, 0) => 0.5 * (5.0 * c * c * c - 3.0 * c),
            (3, 1) => -1.5 * (5.0 * c * c - 1.0) * s,
            (3, 2) => 15.0 * c * s * s,
            (3, 3) => -15.0 * s * s * s,
            (4, 0) => 0.125 * (35.0 * c.powi(4) - 30.0 * c * c + 3.0),
            (4, 4) => 105.0 * s.powi(4),
            _ => panic!("No closed form for ({n}, {m})"),
        }
    }

    macro_rules! test_closed_form {
        ($name:ident, $theta:expr) => {
            paste! {
                #[test]
                fn [<test_legendre_ $name>]() {
                    let order = 4;
                    let mut values = vec![0.0; costerms(order)];
                    evaluate_legendre(f64::cos($theta), order, &mut values);
                    for (n, m) in [(0, 0), (1, 0), (1, 1), (2, 0), (2, 1), (2, 2), (3, 0), (3, 1), (3, 2), (3, 3), (4, 0), (4, 4)] {
                        assert_relative_eq!(
                            values[cindex(n, m)],
                            closed_form(n, m, $theta),
                            epsilon = 1e-10
                        );
                    }
                }
            }
        };
    }

    test_closed_form!(zero, 0.0);
    test_closed_form!(half_pi, 0.5 * PI);
    test_closed_form!(pi, PI);
    test_closed_form!(general, 0.7);
    test_closed_form!(obtuse, 2.3);

    #[test]
    fn test_low_orders() {
        let mut values = vec![0.0; costerms(1)];
        evaluate_legendre(0.3, 0, &mut values);
        assert_eq!(values[0], 1.0);
        evaluate_legendre(0.3, 1, &mut values);
        assert_relative_eq!(values[cindex(1, 0)], 0.3, epsilon = 1e-15);
        assert_relative_eq!(
            values[cindex(1, 1)],
            -(1.0f64 - 0.09).sqrt(),
            epsilon = 1e-15
        );
    }
}
