//! Gauss quadrature rules for numerical integration.
//!
//! This module provides standard Gauss-Legendre quadrature rules for:
//! - 1D line integration (beam elements, tying-point placement)
//! - Tensor-product quadrilateral integration (scalar-field elements)
//!
//! Rules are deterministic and stateless: the same index always yields the
//! same point, and points can be re-enumerated in any order.
//!
//! # Usage
//!
//! ```
//! use modo::quadrature::{gauss_1d, GaussQuadrature2D};
//!
//! // 2-point 1D rule
//! for (xi, w) in gauss_1d(2) {
//!     // integrate at point xi with weight w
//! }
//!
//! // 2x2 tensor-product rule
//! let quad = GaussQuadrature2D::new(2);
//! for i in 0..quad.num_points() {
//!     let (pt, w) = quad.point(i);
//!     // integrate at (pt[0], pt[1]) with weight w
//! }
//! ```

/// 1D Gauss-Legendre quadrature points and weights.
///
/// Returns (point, weight) pairs for integration on [-1, 1]. An n-point
/// rule is exact for polynomials up to degree 2n - 1.
///
/// # Arguments
///
/// * `n` - Number of integration points (1 through 8)
///
/// # Panics
///
/// Panics if `n` is not in 1..=8. An out-of-range rule request is a
/// programming error, not a recoverable condition.
pub fn gauss_1d(n: usize) -> Vec<(f64, f64)> {
    match n {
        1 => vec![(0.0, 2.0)],
        2 => {
            let p = 1.0 / 3.0_f64.sqrt();
            vec![(-p, 1.0), (p, 1.0)]
        }
        3 => {
            let p = (3.0 / 5.0_f64).sqrt();
            vec![(-p, 5.0 / 9.0), (0.0, 8.0 / 9.0), (p, 5.0 / 9.0)]
        }
        4 => {
            // Points: ±√((3 ∓ 2√(6/5))/7)
            let sqrt_6_5 = (6.0 / 5.0_f64).sqrt();
            let p1 = ((3.0 - 2.0 * sqrt_6_5) / 7.0).sqrt();
            let p2 = ((3.0 + 2.0 * sqrt_6_5) / 7.0).sqrt();
            // Weights: (18 ± √30) / 36
            let sqrt_30 = 30.0_f64.sqrt();
            let w1 = (18.0 + sqrt_30) / 36.0;
            let w2 = (18.0 - sqrt_30) / 36.0;
            vec![(-p2, w2), (-p1, w1), (p1, w1), (p2, w2)]
        }
        5 => vec![
            (-0.906179845938664, 0.23692688505618908),
            (-0.5384693101056831, 0.47862867049936647),
            (0.0, 0.5688888888888889),
            (0.5384693101056831, 0.47862867049936647),
            (0.906179845938664, 0.23692688505618908),
        ],
        6 => vec![
            (-0.9324695142031521, 0.1713244923791704),
            (-0.6612093864662645, 0.3607615730481386),
            (-0.2386191860831969, 0.4679139345726910),
            (0.2386191860831969, 0.4679139345726910),
            (0.6612093864662645, 0.3607615730481386),
            (0.9324695142031521, 0.1713244923791704),
        ],
        7 => vec![
            (-0.9491079123427585, 0.1294849661688697),
            (-0.7415311855993945, 0.2797053914892766),
            (-0.4058451513773972, 0.3818300505051189),
            (0.0, 0.4179591836734694),
            (0.4058451513773972, 0.3818300505051189),
            (0.7415311855993945, 0.2797053914892766),
            (0.9491079123427585, 0.1294849661688697),
        ],
        8 => vec![
            (-0.9602898564975363, 0.1012285362903763),
            (-0.7966664774136267, 0.2223810344533745),
            (-0.5255324099163290, 0.3137066458778873),
            (-0.1834346424956498, 0.3626837833783620),
            (0.1834346424956498, 0.3626837833783620),
            (0.5255324099163290, 0.3137066458778873),
            (0.7966664774136267, 0.2223810344533745),
            (0.9602898564975363, 0.1012285362903763),
        ],
        _ => panic!("gauss_1d: n must be in 1..=8, got {}", n),
    }
}

/// Tensor-product Gauss-Legendre rule on the biunit square [-1, 1]².
///
/// Point `i` maps to the pair `(pts[i % order], pts[i / order])` of the
/// underlying 1D rule, so the enumeration is row-major over the (ξ, η)
/// grid and restartable by index.
#[derive(Debug, Clone, Copy)]
pub struct GaussQuadrature2D {
    order: usize,
}

impl GaussQuadrature2D {
    /// Create a tensor-product rule with `order` points per axis.
    ///
    /// # Panics
    ///
    /// Panics if `order` is not in 1..=8.
    pub fn new(order: usize) -> Self {
        assert!(
            (1..=8).contains(&order),
            "GaussQuadrature2D: order must be in 1..=8, got {}",
            order
        );
        Self { order }
    }

    /// Number of quadrature points (order²).
    pub fn num_points(&self) -> usize {
        self.order * self.order
    }

    /// Parametric coordinates and weight of point `i`.
    ///
    /// # Panics
    ///
    /// Panics if `i >= num_points()`.
    pub fn point(&self, i: usize) -> ([f64; 2], f64) {
        assert!(
            i < self.num_points(),
            "GaussQuadrature2D: point index {} out of range for {} points",
            i,
            self.num_points()
        );
        let rule = gauss_1d(self.order);
        let (xi, wx) = rule[i % self.order];
        let (eta, wy) = rule[i / self.order];
        ([xi, eta], wx * wy)
    }
}
