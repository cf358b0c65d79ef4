//! Director parametrization for beam and shell kinematics.
//!
//! A director is a unit vector field attached to each node, representing a
//! rotated local axis (a section normal or fiber direction). Rather than
//! carrying the rotated vector itself, each node stores a small set of
//! rotation-like parameters from which the director is recovered.
//!
//! The linearized-rotation parametrization used here is exact for
//! infinitesimal rotations: with rotation parameters q and reference
//! normal n, the rotated director perturbation is d = q × n. Velocities
//! and accelerations follow by replacing q with its time derivatives.

use nalgebra::{Matrix3, Vector3};

/// Linearized rotation director: d = q × n.
pub struct LinearizedRotation;

impl LinearizedRotation {
    /// Number of rotation parameters per node.
    pub const NUM_PARAMETERS: usize = 3;

    /// Director perturbation for rotation parameters `q` about the
    /// reference normal `n`.
    pub fn director(q: &Vector3<f64>, n: &Vector3<f64>) -> Vector3<f64> {
        q.cross(n)
    }

    /// The linear operator S(n) with d = S(n) q, i.e. S = -[n]ₓ.
    ///
    /// Residual and Jacobian assembly use S directly so the director
    /// contribution enters as an ordinary B-matrix block.
    pub fn director_matrix(n: &Vector3<f64>) -> Matrix3<f64> {
        -skew(n)
    }

    /// Director value and rate from rotation parameters and their time
    /// derivative.
    pub fn director_rates(
        q: &Vector3<f64>,
        qdot: &Vector3<f64>,
        n: &Vector3<f64>,
    ) -> (Vector3<f64>, Vector3<f64>) {
        (q.cross(n), qdot.cross(n))
    }
}

/// Skew-symmetric cross-product matrix [v]ₓ with [v]ₓ w = v × w.
pub fn skew(v: &Vector3<f64>) -> Matrix3<f64> {
    Matrix3::new(0.0, -v[2], v[1], v[2], 0.0, -v[0], -v[1], v[0], 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_skew_matches_cross_product() {
        let v = Vector3::new(0.3, -1.2, 0.8);
        let w = Vector3::new(1.1, 0.4, -0.6);
        let lhs = skew(&v) * w;
        let rhs = v.cross(&w);
        for i in 0..3 {
            assert_relative_eq!(lhs[i], rhs[i], epsilon = 1e-15);
        }
    }

    #[test]
    fn test_director_matrix_consistency() {
        let q = Vector3::new(0.1, -0.3, 0.2);
        let n = Vector3::new(0.0, 1.0, 0.0);
        let d = LinearizedRotation::director(&q, &n);
        let ds = LinearizedRotation::director_matrix(&n) * q;
        for i in 0..3 {
            assert_relative_eq!(d[i], ds[i], epsilon = 1e-15);
        }
    }

    #[test]
    fn test_director_orthogonal_to_rotation_about_normal() {
        // Rotation about the normal itself produces no director change.
        let n = Vector3::new(0.0, 0.0, 1.0);
        let d = LinearizedRotation::director(&(2.5 * n), &n);
        assert_relative_eq!(d.norm(), 0.0, epsilon = 1e-15);
    }

    #[test]
    fn test_director_rates_linear_in_qdot() {
        let q = Vector3::new(0.05, 0.1, -0.02);
        let qdot = Vector3::new(1.0, -2.0, 0.5);
        let n = Vector3::new(0.0, 1.0, 0.0);
        let (d, ddot) = LinearizedRotation::director_rates(&q, &qdot, &n);
        assert_relative_eq!(d[0], -q[2] * n[1], epsilon = 1e-15);
        assert_relative_eq!(ddot[0], -qdot[2] * n[1], epsilon = 1e-15);
        assert_relative_eq!(ddot[2], qdot[0] * n[1], epsilon = 1e-15);
    }
}
