//! Geometric transforms between parametric and physical coordinates.
//!
//! Two flavors are needed:
//!
//! - Planar elements use a 2x2 Jacobian of the physical-to-parametric map,
//!   inverted explicitly ([`invert_2d`]).
//! - Beam elements embedded in 3D carry a local orthonormal frame aligned
//!   with the element tangent and a user-supplied reference axis
//!   ([`RefAxisTransform`]), built by a normalize → project-out-component →
//!   cross-product sequence over the [`crate::ad`] operator set so that the
//!   frame's geometric sensitivity falls out of a reverse replay.
//!
//! Degenerate geometry (a near-zero determinant, or a reference axis
//! parallel to the tangent) is a correctness precondition on the caller's
//! mesh. It is not guarded here and propagates as silently non-finite
//! values.

use nalgebra::{Matrix2, Matrix3, Vector3};

use crate::ad::{Axpy, Cross, Dot, MatFromThreeVecs, Normalize};
use crate::error::{Error, Result};
use crate::types::Point3;

/// Assemble the 2x2 Jacobian Xd = [∂x/∂ξ ∂x/∂η; ∂y/∂ξ ∂y/∂η] from shape
/// function parametric derivatives and nodal coordinates.
///
/// # Panics
///
/// Panics if the slice lengths disagree.
pub fn jacobian_2d(na: &[f64], nb: &[f64], xpts: &[Point3]) -> Matrix2<f64> {
    assert_eq!(na.len(), xpts.len(), "jacobian_2d: length mismatch");
    assert_eq!(nb.len(), xpts.len(), "jacobian_2d: length mismatch");
    let mut xd = Matrix2::zeros();
    for i in 0..xpts.len() {
        xd[(0, 0)] += na[i] * xpts[i][0];
        xd[(0, 1)] += nb[i] * xpts[i][0];
        xd[(1, 0)] += na[i] * xpts[i][1];
        xd[(1, 1)] += nb[i] * xpts[i][1];
    }
    xd
}

/// Explicit 2x2 inverse and determinant.
///
/// Returns `(J, det)` with `J = Xd⁻¹`. A non-positive determinant signals
/// a degenerate or inverted element; no check is performed.
pub fn invert_2d(xd: &Matrix2<f64>) -> (Matrix2<f64>, f64) {
    let det = xd[(0, 0)] * xd[(1, 1)] - xd[(0, 1)] * xd[(1, 0)];
    let inv_det = 1.0 / det;
    let j = Matrix2::new(
        inv_det * xd[(1, 1)],
        -inv_det * xd[(0, 1)],
        -inv_det * xd[(1, 0)],
        inv_det * xd[(0, 0)],
    );
    (j, det)
}

/// Local beam frame from the element tangent and a fixed reference axis.
///
/// The frame T = [t1 | t2 | t3] is built as:
/// - t1: the normalized tangent X0ξ,
/// - t2: the reference axis with its t1 component projected out, normalized,
/// - t3 = t1 × t2.
///
/// The same operator chain, replayed in reverse, yields the sensitivity of
/// the frame with respect to the tangent ([`Self::transform_sens`]).
#[derive(Debug, Clone)]
pub struct RefAxisTransform {
    axis: Vector3<f64>,
}

impl RefAxisTransform {
    /// Create a transform from a (not necessarily unit) reference axis.
    ///
    /// # Errors
    ///
    /// Returns an error if the axis has zero length.
    pub fn new(axis: Vector3<f64>) -> Result<Self> {
        let norm = axis.norm();
        if norm <= 0.0 || !norm.is_finite() {
            return Err(Error::InvalidSection(
                "reference axis must have nonzero length".into(),
            ));
        }
        Ok(Self { axis: axis / norm })
    }

    /// The normalized reference axis.
    pub fn axis(&self) -> &Vector3<f64> {
        &self.axis
    }

    /// Compute the local frame T = [t1 | t2 | t3] for the tangent `x0xi`.
    pub fn compute_transform(&self, x0xi: &Vector3<f64>) -> Matrix3<f64> {
        let (t1, _) = Normalize::forward(x0xi);

        // t2_dir = axis - (t1 . axis) t1
        let (dot, _) = Dot::forward(&t1, &self.axis);
        let (t2_dir, _) = Axpy::forward(-1.0, dot, &t1, &self.axis);
        let (t2, _) = Normalize::forward(&t2_dir);

        let (t3, _) = Cross::forward(&t1, &t2);
        MatFromThreeVecs::forward(&t1, &t2, &t3).0
    }

    /// Sensitivity of the frame with respect to the tangent: returns
    /// `dX0ξ` such that `dX0ξ[i] = Σ_jk seed_t[(j,k)] ∂T[(j,k)]/∂x0xi[i]`.
    ///
    /// Runs the forward chain, then replays the operator records in
    /// reverse, accumulating output seeds into input seeds.
    pub fn transform_sens(&self, x0xi: &Vector3<f64>, seed_t: &Matrix3<f64>) -> Vector3<f64> {
        // Forward pass, keeping each operator record.
        let (t1, op_norm1) = Normalize::forward(x0xi);
        let (dot, op_dot) = Dot::forward(&t1, &self.axis);
        let (t2_dir, op_axpy) = Axpy::forward(-1.0, dot, &t1, &self.axis);
        let (t2, op_norm2) = Normalize::forward(&t2_dir);
        let (_t3, op_cross) = Cross::forward(&t1, &t2);
        let (_t, op_assemble) = MatFromThreeVecs::forward(&t1, &t2, &_t3);

        // Reverse replay. The axis is a fixed parameter; its seed is
        // accumulated and discarded.
        let mut s_t1 = Vector3::zeros();
        let mut s_t2 = Vector3::zeros();
        let mut s_t3 = Vector3::zeros();
        let mut s_t2_dir = Vector3::zeros();
        let mut s_dot = 0.0;
        let mut s_axis = Vector3::zeros();
        let mut s_x0xi = Vector3::zeros();

        op_assemble.reverse(seed_t, &mut s_t1, &mut s_t2, &mut s_t3);
        op_cross.reverse(&s_t3, &mut s_t1, &mut s_t2);
        op_norm2.reverse(&s_t2, &mut s_t2_dir);
        op_axpy.reverse(&s_t2_dir, &mut s_dot, &mut s_t1, &mut s_axis);
        op_dot.reverse(s_dot, &mut s_t1, &mut s_axis);
        op_norm1.reverse(&s_t1, &mut s_x0xi);

        s_x0xi
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_invert_2d_known_matrix() {
        let xd = Matrix2::new(2.0, 0.0, 0.0, 0.5);
        let (j, det) = invert_2d(&xd);
        assert_relative_eq!(det, 1.0, epsilon = 1e-15);
        assert_relative_eq!(j[(0, 0)], 0.5, epsilon = 1e-15);
        assert_relative_eq!(j[(1, 1)], 2.0, epsilon = 1e-15);

        let xd = Matrix2::new(1.0, 0.3, -0.2, 0.8);
        let (j, det) = invert_2d(&xd);
        assert_relative_eq!(det, 0.86, epsilon = 1e-15);
        let ident = xd * j;
        assert_relative_eq!(ident[(0, 0)], 1.0, epsilon = 1e-14);
        assert_relative_eq!(ident[(0, 1)], 0.0, epsilon = 1e-14);
        assert_relative_eq!(ident[(1, 0)], 0.0, epsilon = 1e-14);
        assert_relative_eq!(ident[(1, 1)], 1.0, epsilon = 1e-14);
    }

    #[test]
    fn test_jacobian_2d_unit_square() {
        // Bilinear unit square: Xd = diag(0.5, 0.5).
        let xpts = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
        ];
        // Bilinear shape derivatives at the element center.
        let na = [-0.25, 0.25, -0.25, 0.25];
        let nb = [-0.25, -0.25, 0.25, 0.25];
        let xd = jacobian_2d(&na, &nb, &xpts);
        assert_relative_eq!(xd[(0, 0)], 0.5, epsilon = 1e-15);
        assert_relative_eq!(xd[(1, 1)], 0.5, epsilon = 1e-15);
        assert_relative_eq!(xd[(0, 1)], 0.0, epsilon = 1e-15);
        assert_relative_eq!(xd[(1, 0)], 0.0, epsilon = 1e-15);
    }

    #[test]
    fn test_frame_is_orthonormal() {
        let transform = RefAxisTransform::new(Vector3::new(0.0, 1.0, 0.0)).unwrap();
        let x0xi = Vector3::new(1.3, 0.4, -0.2);
        let t = transform.compute_transform(&x0xi);

        let ident = t.transpose() * t;
        for r in 0..3 {
            for c in 0..3 {
                let expected = if r == c { 1.0 } else { 0.0 };
                assert_relative_eq!(ident[(r, c)], expected, epsilon = 1e-13);
            }
        }

        // t1 aligned with the tangent, det = +1 (right-handed).
        let t1 = t.column(0);
        let unit = x0xi / x0xi.norm();
        for i in 0..3 {
            assert_relative_eq!(t1[i], unit[i], epsilon = 1e-14);
        }
        assert_relative_eq!(t.determinant(), 1.0, epsilon = 1e-13);
    }

    #[test]
    fn test_axis_aligned_frame() {
        let transform = RefAxisTransform::new(Vector3::new(0.0, 2.0, 0.0)).unwrap();
        let t = transform.compute_transform(&Vector3::new(3.0, 0.0, 0.0));
        // Straight x-aligned tangent with y reference axis gives the
        // global frame.
        for r in 0..3 {
            for c in 0..3 {
                let expected = if r == c { 1.0 } else { 0.0 };
                assert_relative_eq!(t[(r, c)], expected, epsilon = 1e-14);
            }
        }
    }

    #[test]
    fn test_zero_axis_rejected() {
        assert!(RefAxisTransform::new(Vector3::zeros()).is_err());
    }

    #[test]
    fn test_transform_sens_against_finite_difference() {
        let transform = RefAxisTransform::new(Vector3::new(0.2, 1.0, 0.3)).unwrap();
        let x0xi = Vector3::new(0.9, -0.3, 0.5);
        let seed_t = Matrix3::new(0.3, -0.2, 0.5, 0.1, 0.7, -0.4, 0.6, 0.2, -0.1);

        let sens = transform.transform_sens(&x0xi, &seed_t);

        let h = 1e-6;
        for i in 0..3 {
            let mut xp = x0xi;
            let mut xm = x0xi;
            xp[i] += h;
            xm[i] -= h;
            let dt = (transform.compute_transform(&xp) - transform.compute_transform(&xm))
                / (2.0 * h);
            let fd = dt.component_mul(&seed_t).sum();
            assert_relative_eq!(sens[i], fd, epsilon = 1e-6);
        }
    }
}
