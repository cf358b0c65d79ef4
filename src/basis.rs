//! Lagrange shape functions over per-axis knot vectors.
//!
//! Elements interpolate with tensor products of 1D Lagrange polynomials.
//! The knot placement controls interpolation quality: order 2 and 3 use
//! the standard equally-spaced knots, while higher orders fall back to a
//! cosine (Chebyshev-like) spacing to control the interpolation error of
//! super-parametric elements.
//!
//! Basis evaluation is a pure function of the parametric point and has no
//! side effects; nothing is cached across quadrature points.

/// Fill `knots` with the knot locations for an element of order
/// `knots.len()`.
///
/// - order 2: {-1, 1}
/// - order 3: {-1, 0, 1}
/// - otherwise: cosine spacing `-cos(π k / (order - 1))`
///
/// # Panics
///
/// Panics if fewer than two knots are requested.
pub fn knot_vector(knots: &mut [f64]) {
    let order = knots.len();
    assert!(order >= 2, "knot_vector: order must be at least 2");
    match order {
        2 => {
            knots[0] = -1.0;
            knots[1] = 1.0;
        }
        3 => {
            knots[0] = -1.0;
            knots[1] = 0.0;
            knots[2] = 1.0;
        }
        _ => {
            for (k, knot) in knots.iter_mut().enumerate() {
                *knot = -(std::f64::consts::PI * k as f64 / (order - 1) as f64).cos();
            }
        }
    }
}

/// Evaluate the Lagrange interpolation values at `x` for the given knot
/// vector, writing one value per knot into `n`.
///
/// `n[j]` is the polynomial that is 1 at `knots[j]` and 0 at every other
/// knot; the values sum to 1 at any `x` (partition of unity).
///
/// # Panics
///
/// Panics if `n.len() != knots.len()`.
pub fn lagrange(knots: &[f64], x: f64, n: &mut [f64]) {
    assert_eq!(n.len(), knots.len(), "lagrange: output length mismatch");
    for (j, nj) in n.iter_mut().enumerate() {
        let mut val = 1.0;
        for (m, &km) in knots.iter().enumerate() {
            if m != j {
                val *= (x - km) / (knots[j] - km);
            }
        }
        *nj = val;
    }
}

/// Evaluate the Lagrange interpolation values and first derivatives at `x`.
///
/// Writes values into `n` and derivatives with respect to the parametric
/// coordinate into `dn`.
///
/// # Panics
///
/// Panics if `n.len()` or `dn.len()` differ from `knots.len()`.
pub fn lagrange_with_deriv(knots: &[f64], x: f64, n: &mut [f64], dn: &mut [f64]) {
    lagrange(knots, x, n);
    assert_eq!(dn.len(), knots.len(), "lagrange: derivative length mismatch");
    for (j, dnj) in dn.iter_mut().enumerate() {
        let mut deriv = 0.0;
        for (i, &ki) in knots.iter().enumerate() {
            if i == j {
                continue;
            }
            let mut term = 1.0 / (knots[j] - ki);
            for (m, &km) in knots.iter().enumerate() {
                if m != i && m != j {
                    term *= (x - km) / (knots[j] - km);
                }
            }
            deriv += term;
        }
        *dnj = deriv;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn knots_for(order: usize) -> Vec<f64> {
        let mut knots = vec![0.0; order];
        knot_vector(&mut knots);
        knots
    }

    #[test]
    fn test_knot_placement() {
        assert_eq!(knots_for(2), vec![-1.0, 1.0]);
        assert_eq!(knots_for(3), vec![-1.0, 0.0, 1.0]);

        // Cosine spacing: endpoints at ±1, interior clustered toward the ends.
        let knots = knots_for(5);
        assert_relative_eq!(knots[0], -1.0, epsilon = 1e-15);
        assert_relative_eq!(knots[4], 1.0, epsilon = 1e-15);
        assert_relative_eq!(knots[2], 0.0, epsilon = 1e-15);
        assert!(knots[1] < -0.5 && knots[3] > 0.5);
    }

    #[test]
    fn test_partition_of_unity() {
        for order in 2..=6 {
            let knots = knots_for(order);
            let mut n = vec![0.0; order];
            let mut dn = vec![0.0; order];
            for i in 0..=20 {
                let x = -1.0 + 0.1 * i as f64;
                lagrange_with_deriv(&knots, x, &mut n, &mut dn);
                let sum: f64 = n.iter().sum();
                let dsum: f64 = dn.iter().sum();
                assert_relative_eq!(sum, 1.0, epsilon = 1e-12);
                assert_relative_eq!(dsum, 0.0, epsilon = 1e-11);
            }
        }
    }

    #[test]
    fn test_kronecker_property_at_knots() {
        for order in 2..=5 {
            let knots = knots_for(order);
            let mut n = vec![0.0; order];
            for (i, &ki) in knots.iter().enumerate() {
                lagrange(&knots, ki, &mut n);
                for (j, &nj) in n.iter().enumerate() {
                    let expected = if i == j { 1.0 } else { 0.0 };
                    assert_relative_eq!(nj, expected, epsilon = 1e-13);
                }
            }
        }
    }

    #[test]
    fn test_derivative_against_finite_difference() {
        let knots = knots_for(4);
        let mut n = vec![0.0; 4];
        let mut dn = vec![0.0; 4];
        let mut np = vec![0.0; 4];
        let mut nm = vec![0.0; 4];

        let h = 1e-6;
        for &x in &[-0.7, -0.2, 0.3, 0.9] {
            lagrange_with_deriv(&knots, x, &mut n, &mut dn);
            lagrange(&knots, x + h, &mut np);
            lagrange(&knots, x - h, &mut nm);
            for j in 0..4 {
                let fd = (np[j] - nm[j]) / (2.0 * h);
                assert_relative_eq!(dn[j], fd, epsilon = 1e-8);
            }
        }
    }
}
