//! Reverse-mode differentiation over a small fixed operator set.
//!
//! The director-aligned frame assembly (and the geometric sensitivities
//! that design optimization needs from it) are built from a short chain of
//! vector and matrix operations. Each operator here evaluates its forward
//! value and captures exactly the intermediates its adjoint needs; a
//! sensitivity pass runs the forward chain once, then replays the operator
//! records in reverse, with each `reverse` step accumulating output seeds
//! into input seeds.
//!
//! The operator vocabulary is fixed: normalize, dot, axpy, cross product,
//! matrix-from-vectors, matrix multiply, 3x3 inverse and 3x3 determinant.
//! New geometric derivatives should be composed from these rather than
//! differentiated ad hoc.
//!
//! Seeds always accumulate (`+=`): an intermediate consumed by several
//! downstream operators receives contributions from each of them.

use nalgebra::{Matrix3, Vector3};

/// t = x / |x|.
///
/// The forward value is undefined for a zero vector; degenerate geometry
/// is a precondition of the caller, not checked here.
#[derive(Debug, Clone, Copy)]
pub struct Normalize {
    t: Vector3<f64>,
    inv_norm: f64,
}

impl Normalize {
    pub fn forward(x: &Vector3<f64>) -> (Vector3<f64>, Self) {
        let inv_norm = 1.0 / x.norm();
        let t = x * inv_norm;
        (t, Self { t, inv_norm })
    }

    /// seed_x += (I - t tᵀ) seed_t / |x|
    pub fn reverse(&self, seed_t: &Vector3<f64>, seed_x: &mut Vector3<f64>) {
        *seed_x += self.inv_norm * (seed_t - self.t * self.t.dot(seed_t));
    }
}

/// a = x · y.
#[derive(Debug, Clone, Copy)]
pub struct Dot {
    x: Vector3<f64>,
    y: Vector3<f64>,
}

impl Dot {
    pub fn forward(x: &Vector3<f64>, y: &Vector3<f64>) -> (f64, Self) {
        (x.dot(y), Self { x: *x, y: *y })
    }

    pub fn reverse(&self, seed_a: f64, seed_x: &mut Vector3<f64>, seed_y: &mut Vector3<f64>) {
        *seed_x += seed_a * self.y;
        *seed_y += seed_a * self.x;
    }
}

/// v = alpha * s * x + y, with `s` an active scalar.
#[derive(Debug, Clone, Copy)]
pub struct Axpy {
    alpha: f64,
    s: f64,
    x: Vector3<f64>,
}

impl Axpy {
    pub fn forward(alpha: f64, s: f64, x: &Vector3<f64>, y: &Vector3<f64>) -> (Vector3<f64>, Self) {
        (alpha * s * x + y, Self { alpha, s, x: *x })
    }

    pub fn reverse(
        &self,
        seed_v: &Vector3<f64>,
        seed_s: &mut f64,
        seed_x: &mut Vector3<f64>,
        seed_y: &mut Vector3<f64>,
    ) {
        *seed_s += self.alpha * self.x.dot(seed_v);
        *seed_x += self.alpha * self.s * seed_v;
        *seed_y += seed_v;
    }
}

/// z = x × y.
#[derive(Debug, Clone, Copy)]
pub struct Cross {
    x: Vector3<f64>,
    y: Vector3<f64>,
}

impl Cross {
    pub fn forward(x: &Vector3<f64>, y: &Vector3<f64>) -> (Vector3<f64>, Self) {
        (x.cross(y), Self { x: *x, y: *y })
    }

    pub fn reverse(&self, seed_z: &Vector3<f64>, seed_x: &mut Vector3<f64>, seed_y: &mut Vector3<f64>) {
        *seed_x += self.y.cross(seed_z);
        *seed_y += seed_z.cross(&self.x);
    }
}

/// M = [a | b | c] (columns).
#[derive(Debug, Clone, Copy)]
pub struct MatFromThreeVecs;

impl MatFromThreeVecs {
    pub fn forward(a: &Vector3<f64>, b: &Vector3<f64>, c: &Vector3<f64>) -> (Matrix3<f64>, Self) {
        (Matrix3::from_columns(&[*a, *b, *c]), Self)
    }

    pub fn reverse(
        &self,
        seed_m: &Matrix3<f64>,
        seed_a: &mut Vector3<f64>,
        seed_b: &mut Vector3<f64>,
        seed_c: &mut Vector3<f64>,
    ) {
        *seed_a += seed_m.column(0);
        *seed_b += seed_m.column(1);
        *seed_c += seed_m.column(2);
    }
}

/// M = [a | 0 | 0] (vector into the first column).
#[derive(Debug, Clone, Copy)]
pub struct MatFromVec;

impl MatFromVec {
    pub fn forward(a: &Vector3<f64>) -> (Matrix3<f64>, Self) {
        (
            Matrix3::from_columns(&[*a, Vector3::zeros(), Vector3::zeros()]),
            Self,
        )
    }

    pub fn reverse(&self, seed_m: &Matrix3<f64>, seed_a: &mut Vector3<f64>) {
        *seed_a += seed_m.column(0);
    }
}

/// C = scale * A * B.
#[derive(Debug, Clone, Copy)]
pub struct MatMul {
    scale: f64,
    a: Matrix3<f64>,
    b: Matrix3<f64>,
}

impl MatMul {
    pub fn forward(scale: f64, a: &Matrix3<f64>, b: &Matrix3<f64>) -> (Matrix3<f64>, Self) {
        (
            scale * a * b,
            Self {
                scale,
                a: *a,
                b: *b,
            },
        )
    }

    pub fn reverse(&self, seed_c: &Matrix3<f64>, seed_a: &mut Matrix3<f64>, seed_b: &mut Matrix3<f64>) {
        *seed_a += self.scale * seed_c * self.b.transpose();
        *seed_b += self.scale * self.a.transpose() * seed_c;
    }
}

/// B = A⁻¹, by explicit cofactor expansion.
///
/// No singularity check: a degenerate matrix propagates as non-finite
/// values, matching the element kernels' treatment of degenerate geometry.
#[derive(Debug, Clone, Copy)]
pub struct Inverse {
    binv: Matrix3<f64>,
}

impl Inverse {
    pub fn forward(a: &Matrix3<f64>) -> (Matrix3<f64>, Self) {
        let inv_det = 1.0 / det3(a);
        let adj = cofactor3(a).transpose();
        let binv = inv_det * adj;
        (binv, Self { binv })
    }

    /// seed_a += -Bᵀ seed_b Bᵀ
    pub fn reverse(&self, seed_b: &Matrix3<f64>, seed_a: &mut Matrix3<f64>) {
        let bt = self.binv.transpose();
        *seed_a -= bt * seed_b * bt;
    }
}

/// d = det(A).
#[derive(Debug, Clone, Copy)]
pub struct Det {
    a: Matrix3<f64>,
}

impl Det {
    pub fn forward(a: &Matrix3<f64>) -> (f64, Self) {
        (det3(a), Self { a: *a })
    }

    /// seed_a += seed_d * cof(A), since ∂det/∂A_ij is the (i,j) cofactor.
    pub fn reverse(&self, seed_d: f64, seed_a: &mut Matrix3<f64>) {
        *seed_a += seed_d * cofactor3(&self.a);
    }
}

fn det3(a: &Matrix3<f64>) -> f64 {
    a[(0, 0)] * (a[(1, 1)] * a[(2, 2)] - a[(1, 2)] * a[(2, 1)])
        - a[(0, 1)] * (a[(1, 0)] * a[(2, 2)] - a[(1, 2)] * a[(2, 0)])
        + a[(0, 2)] * (a[(1, 0)] * a[(2, 1)] - a[(1, 1)] * a[(2, 0)])
}

fn cofactor3(a: &Matrix3<f64>) -> Matrix3<f64> {
    Matrix3::new(
        a[(1, 1)] * a[(2, 2)] - a[(1, 2)] * a[(2, 1)],
        a[(1, 2)] * a[(2, 0)] - a[(1, 0)] * a[(2, 2)],
        a[(1, 0)] * a[(2, 1)] - a[(1, 1)] * a[(2, 0)],
        a[(0, 2)] * a[(2, 1)] - a[(0, 1)] * a[(2, 2)],
        a[(0, 0)] * a[(2, 2)] - a[(0, 2)] * a[(2, 0)],
        a[(0, 1)] * a[(2, 0)] - a[(0, 0)] * a[(2, 1)],
        a[(0, 1)] * a[(1, 2)] - a[(0, 2)] * a[(1, 1)],
        a[(0, 2)] * a[(1, 0)] - a[(0, 0)] * a[(1, 2)],
        a[(0, 0)] * a[(1, 1)] - a[(0, 1)] * a[(1, 0)],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const H: f64 = 1e-6;
    const TOL: f64 = 1e-6;

    fn v(a: f64, b: f64, c: f64) -> Vector3<f64> {
        Vector3::new(a, b, c)
    }

    // Contract a full FD Jacobian against a seed: seed_in[i] should equal
    // d(seed_out . f(x)) / dx_i.
    fn fd_vec<F: Fn(&Vector3<f64>) -> Vector3<f64>>(
        f: F,
        x: &Vector3<f64>,
        seed_out: &Vector3<f64>,
    ) -> Vector3<f64> {
        let mut g = Vector3::zeros();
        for i in 0..3 {
            let mut xp = *x;
            let mut xm = *x;
            xp[i] += H;
            xm[i] -= H;
            g[i] = seed_out.dot(&((f(&xp) - f(&xm)) / (2.0 * H)));
        }
        g
    }

    #[test]
    fn test_normalize_reverse() {
        let x = v(1.2, -0.4, 2.1);
        let seed_t = v(0.3, 0.8, -0.5);
        let (_, op) = Normalize::forward(&x);
        let mut seed_x = Vector3::zeros();
        op.reverse(&seed_t, &mut seed_x);

        let fd = fd_vec(|x| Normalize::forward(x).0, &x, &seed_t);
        for i in 0..3 {
            assert_relative_eq!(seed_x[i], fd[i], epsilon = TOL);
        }
    }

    #[test]
    fn test_dot_reverse() {
        let x = v(0.7, -1.1, 0.3);
        let y = v(-0.2, 0.5, 1.4);
        let (_, op) = Dot::forward(&x, &y);
        let mut seed_x = Vector3::zeros();
        let mut seed_y = Vector3::zeros();
        op.reverse(2.0, &mut seed_x, &mut seed_y);
        for i in 0..3 {
            assert_relative_eq!(seed_x[i], 2.0 * y[i], epsilon = 1e-14);
            assert_relative_eq!(seed_y[i], 2.0 * x[i], epsilon = 1e-14);
        }
    }

    #[test]
    fn test_axpy_reverse() {
        let x = v(0.9, 0.2, -0.6);
        let y = v(1.0, -0.3, 0.4);
        let s = 0.8;
        let alpha = -1.0;
        let seed_v = v(0.5, -0.7, 0.2);

        let (_, op) = Axpy::forward(alpha, s, &x, &y);
        let mut seed_s = 0.0;
        let mut seed_x = Vector3::zeros();
        let mut seed_y = Vector3::zeros();
        op.reverse(&seed_v, &mut seed_s, &mut seed_x, &mut seed_y);

        let fd_s = seed_v.dot(
            &((Axpy::forward(alpha, s + H, &x, &y).0 - Axpy::forward(alpha, s - H, &x, &y).0)
                / (2.0 * H)),
        );
        assert_relative_eq!(seed_s, fd_s, epsilon = TOL);

        let fd_x = fd_vec(|x| Axpy::forward(alpha, s, x, &y).0, &x, &seed_v);
        let fd_y = fd_vec(|y| Axpy::forward(alpha, s, &x, y).0, &y, &seed_v);
        for i in 0..3 {
            assert_relative_eq!(seed_x[i], fd_x[i], epsilon = TOL);
            assert_relative_eq!(seed_y[i], fd_y[i], epsilon = TOL);
        }
    }

    #[test]
    fn test_cross_reverse() {
        let x = v(0.4, 1.3, -0.8);
        let y = v(-0.9, 0.1, 0.7);
        let seed_z = v(0.6, -0.2, 1.1);

        let (_, op) = Cross::forward(&x, &y);
        let mut seed_x = Vector3::zeros();
        let mut seed_y = Vector3::zeros();
        op.reverse(&seed_z, &mut seed_x, &mut seed_y);

        let fd_x = fd_vec(|x| Cross::forward(x, &y).0, &x, &seed_z);
        let fd_y = fd_vec(|y| Cross::forward(&x, y).0, &y, &seed_z);
        for i in 0..3 {
            assert_relative_eq!(seed_x[i], fd_x[i], epsilon = TOL);
            assert_relative_eq!(seed_y[i], fd_y[i], epsilon = TOL);
        }
    }

    #[test]
    fn test_mat_from_vecs_reverse() {
        let a = v(1.0, 2.0, 3.0);
        let b = v(4.0, 5.0, 6.0);
        let c = v(7.0, 8.0, 9.0);
        let (m, op) = MatFromThreeVecs::forward(&a, &b, &c);
        assert_eq!(m[(0, 0)], 1.0);
        assert_eq!(m[(2, 1)], 6.0);

        let seed_m = Matrix3::identity();
        let mut sa = Vector3::zeros();
        let mut sb = Vector3::zeros();
        let mut sc = Vector3::zeros();
        op.reverse(&seed_m, &mut sa, &mut sb, &mut sc);
        assert_eq!(sa, v(1.0, 0.0, 0.0));
        assert_eq!(sb, v(0.0, 1.0, 0.0));
        assert_eq!(sc, v(0.0, 0.0, 1.0));

        let (m1, op1) = MatFromVec::forward(&a);
        assert_eq!(m1.column(0), m.column(0));
        assert_eq!(m1[(1, 1)], 0.0);
        let mut sa1 = Vector3::zeros();
        op1.reverse(&seed_m, &mut sa1);
        assert_eq!(sa1, v(1.0, 0.0, 0.0));
    }

    #[test]
    fn test_matmul_reverse() {
        let a = Matrix3::new(1.0, 0.5, -0.2, 0.3, 2.0, 0.1, -0.4, 0.6, 1.5);
        let b = Matrix3::new(0.9, -0.1, 0.4, 0.2, 1.1, -0.3, 0.5, 0.0, 0.8);
        let seed_c = Matrix3::new(0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8, 0.9);

        let (_, op) = MatMul::forward(2.0, &a, &b);
        let mut seed_a = Matrix3::zeros();
        let mut seed_b = Matrix3::zeros();
        op.reverse(&seed_c, &mut seed_a, &mut seed_b);

        for r in 0..3 {
            for c in 0..3 {
                let mut ap = a;
                let mut am = a;
                ap[(r, c)] += H;
                am[(r, c)] -= H;
                let fd = ((2.0 * ap * b - 2.0 * am * b) / (2.0 * H))
                    .component_mul(&seed_c)
                    .sum();
                assert_relative_eq!(seed_a[(r, c)], fd, epsilon = TOL);

                let mut bp = b;
                let mut bm = b;
                bp[(r, c)] += H;
                bm[(r, c)] -= H;
                let fd = ((2.0 * a * bp - 2.0 * a * bm) / (2.0 * H))
                    .component_mul(&seed_c)
                    .sum();
                assert_relative_eq!(seed_b[(r, c)], fd, epsilon = TOL);
            }
        }
    }

    #[test]
    fn test_inverse_forward_and_reverse() {
        let a = Matrix3::new(2.0, 0.4, -0.1, 0.3, 1.5, 0.2, -0.2, 0.1, 1.8);
        let (binv, op) = Inverse::forward(&a);
        let ident = a * binv;
        for r in 0..3 {
            for c in 0..3 {
                let expected = if r == c { 1.0 } else { 0.0 };
                assert_relative_eq!(ident[(r, c)], expected, epsilon = 1e-13);
            }
        }

        let seed_b = Matrix3::new(0.3, -0.1, 0.2, 0.5, 0.4, -0.3, 0.1, 0.2, 0.6);
        let mut seed_a = Matrix3::zeros();
        op.reverse(&seed_b, &mut seed_a);

        for r in 0..3 {
            for c in 0..3 {
                let mut ap = a;
                let mut am = a;
                ap[(r, c)] += H;
                am[(r, c)] -= H;
                let fd = ((Inverse::forward(&ap).0 - Inverse::forward(&am).0) / (2.0 * H))
                    .component_mul(&seed_b)
                    .sum();
                assert_relative_eq!(seed_a[(r, c)], fd, epsilon = TOL);
            }
        }
    }

    #[test]
    fn test_det_forward_and_reverse() {
        let a = Matrix3::new(1.2, 0.3, -0.5, 0.7, 2.1, 0.2, -0.3, 0.4, 1.6);
        let (d, op) = Det::forward(&a);
        assert_relative_eq!(d, a.determinant(), epsilon = 1e-13);

        let mut seed_a = Matrix3::zeros();
        op.reverse(1.0, &mut seed_a);
        for r in 0..3 {
            for c in 0..3 {
                let mut ap = a;
                let mut am = a;
                ap[(r, c)] += H;
                am[(r, c)] -= H;
                let fd = (Det::forward(&ap).0 - Det::forward(&am).0) / (2.0 * H);
                assert_relative_eq!(seed_a[(r, c)], fd, epsilon = TOL);
            }
        }
    }
}
