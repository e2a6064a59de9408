//! Physical constants

/// Permittivity of free space in F/m
pub const EPS0: f64 = 8.854187818e-12;

/// `4 pi eps0`, the conversion from potential coefficients with a `1/r` kernel to farads
pub const FPIEPS: f64 = 4.0 * std::f64::consts::PI * EPS0;
