//! Scalar-field (Poisson) quadrilateral element.
//!
//! Tensor-product Lagrange element of compile-time order with:
//! - ORDER² nodes on the knot grid
//! - 1 DOF per node (the scalar unknown φ)
//! - 2 strain components (the physical gradient of φ)
//! - ORDER×ORDER Gauss quadrature
//!
//! The element solves the weak form of -∇²φ = f with the source term f
//! interpolated from nodal values that the element owns. The residual is
//!
//! ```text
//! res_i = ∫ (∇N_i · ∇φ - f N_i) dΩ
//! ```
//!
//! and the tangent stiffness is the usual ∫ ∇N_i · ∇N_j dΩ, independent
//! of the state.
//!
//! # Node Numbering
//!
//! Nodes are row-major over the (ξ, η) knot grid: node `p = i + ORDER*j`
//! sits at `(knots[i], knots[j])`.

use nalgebra::DMatrix;

use crate::basis;
use crate::constitutive::{Constitutive, PoissonConstitutive};
use crate::element::Element;
use crate::error::{Error, Result};
use crate::quadrature::gauss_1d;
use crate::transform::{invert_2d, jacobian_2d};
use crate::types::{
    Point3, OUTPUT_DISPLACEMENTS, OUTPUT_NODES, OUTPUT_STRAINS, OUTPUT_STRESSES,
};

/// Scalar-field quadrilateral element of compile-time order.
#[derive(Debug, Clone)]
pub struct PoissonQuad<const ORDER: usize> {
    /// Nodal source-term values, `f[j][i]` for node `i + ORDER*j`.
    f: [[f64; ORDER]; ORDER],
    /// Per-axis knot locations.
    knots: [f64; ORDER],
    con: PoissonConstitutive,
}

impl<const ORDER: usize> PoissonQuad<ORDER> {
    /// Create an element with the given nodal source values.
    ///
    /// # Errors
    ///
    /// Returns an error if ORDER is outside 2..=8 (the supported
    /// quadrature range).
    pub fn new(f: [[f64; ORDER]; ORDER]) -> Result<Self> {
        if !(2..=8).contains(&ORDER) {
            return Err(Error::Element(format!(
                "PoissonQuad order must be in 2..=8, got {}",
                ORDER
            )));
        }
        let mut knots = [0.0; ORDER];
        basis::knot_vector(&mut knots);
        Ok(Self {
            f,
            knots,
            con: PoissonConstitutive,
        })
    }

    /// Shape functions and parametric derivatives at `pt`, row-major over
    /// the node grid.
    #[allow(clippy::type_complexity)]
    fn shape_with_grad(
        &self,
        pt: [f64; 2],
    ) -> (
        [[f64; ORDER]; ORDER],
        [[f64; ORDER]; ORDER],
        [[f64; ORDER]; ORDER],
    ) {
        let mut nxi = [0.0; ORDER];
        let mut dxi = [0.0; ORDER];
        let mut neta = [0.0; ORDER];
        let mut deta = [0.0; ORDER];
        basis::lagrange_with_deriv(&self.knots, pt[0], &mut nxi, &mut dxi);
        basis::lagrange_with_deriv(&self.knots, pt[1], &mut neta, &mut deta);

        let mut n = [[0.0; ORDER]; ORDER];
        let mut na = [[0.0; ORDER]; ORDER];
        let mut nb = [[0.0; ORDER]; ORDER];
        for j in 0..ORDER {
            for i in 0..ORDER {
                n[j][i] = nxi[i] * neta[j];
                na[j][i] = dxi[i] * neta[j];
                nb[j][i] = nxi[i] * deta[j];
            }
        }
        (n, na, nb)
    }

    /// Jacobian determinant of the parametric map at `pt`.
    pub fn det_jacobian(&self, pt: [f64; 2], xpts: &[Point3]) -> f64 {
        let (_, na, nb) = self.shape_with_grad(pt);
        let xd = jacobian_2d(na.as_flattened(), nb.as_flattened(), xpts);
        xd[(0, 0)] * xd[(1, 1)] - xd[(0, 1)] * xd[(1, 0)]
    }

    fn check_input_lengths(&self, xpts: &[Point3], vars: &[f64]) {
        assert_eq!(
            xpts.len(),
            ORDER * ORDER,
            "PoissonQuad requires {} nodal coordinates",
            ORDER * ORDER
        );
        assert_eq!(
            vars.len(),
            ORDER * ORDER,
            "PoissonQuad requires {} state variables",
            ORDER * ORDER
        );
    }
}

impl<const ORDER: usize> Element for PoissonQuad<ORDER> {
    fn num_nodes(&self) -> usize {
        ORDER * ORDER
    }

    fn vars_per_node(&self) -> usize {
        1
    }

    fn num_stresses(&self) -> usize {
        self.con.num_stresses()
    }

    fn num_quadrature_points(&self) -> usize {
        ORDER * ORDER
    }

    fn quadrature_point(&self, n: usize) -> ([f64; 3], f64) {
        assert!(
            n < ORDER * ORDER,
            "PoissonQuad: quadrature index {} out of range",
            n
        );
        let rule = gauss_1d(ORDER);
        let (xi, wx) = rule[n % ORDER];
        let (eta, wy) = rule[n / ORDER];
        ([xi, eta, 0.0], wx * wy)
    }

    fn var_name(&self, i: usize) -> Option<&'static str> {
        (i == 0).then_some("phi")
    }

    fn stress_name(&self, i: usize) -> Option<&'static str> {
        match i {
            0 => Some("px"),
            1 => Some("py"),
            _ => None,
        }
    }

    fn add_residual(
        &self,
        _time: f64,
        xpts: &[Point3],
        vars: &[f64],
        _dvars: &[f64],
        _ddvars: &[f64],
        res: &mut [f64],
    ) {
        self.check_input_lengths(xpts, vars);
        assert_eq!(res.len(), ORDER * ORDER, "residual buffer length mismatch");

        let rule = gauss_1d(ORDER);
        let f = self.f.as_flattened();

        for &(eta, wm) in &rule {
            for &(xi, wn) in &rule {
                let (n, na, nb) = self.shape_with_grad([xi, eta]);
                let (n, na, nb) = (n.as_flattened(), na.as_flattened(), nb.as_flattened());

                let xd = jacobian_2d(na, nb, xpts);
                let (j, det) = invert_2d(&xd);
                let h = det * wn * wm;

                // Source value and physical gradient of the state.
                let mut fval = 0.0;
                let mut px = 0.0;
                let mut py = 0.0;
                for i in 0..ORDER * ORDER {
                    fval += n[i] * f[i];
                    px += (na[i] * j[(0, 0)] + nb[i] * j[(1, 0)]) * vars[i];
                    py += (na[i] * j[(0, 1)] + nb[i] * j[(1, 1)]) * vars[i];
                }

                for i in 0..ORDER * ORDER {
                    let nx = na[i] * j[(0, 0)] + nb[i] * j[(1, 0)];
                    let ny = na[i] * j[(0, 1)] + nb[i] * j[(1, 1)];
                    res[i] += h * (nx * px + ny * py - fval * n[i]);
                }
            }
        }
    }

    fn add_jacobian(
        &self,
        _time: f64,
        alpha: f64,
        _beta: f64,
        _gamma: f64,
        xpts: &[Point3],
        vars: &[f64],
        _dvars: &[f64],
        _ddvars: &[f64],
        mat: &mut DMatrix<f64>,
    ) {
        self.check_input_lengths(xpts, vars);
        let nvars = ORDER * ORDER;
        assert_eq!(mat.nrows(), nvars, "Jacobian buffer row count mismatch");
        assert_eq!(mat.ncols(), nvars, "Jacobian buffer column count mismatch");

        let rule = gauss_1d(ORDER);

        for &(eta, wm) in &rule {
            for &(xi, wn) in &rule {
                let (_, na, nb) = self.shape_with_grad([xi, eta]);
                let (na, nb) = (na.as_flattened(), nb.as_flattened());

                let xd = jacobian_2d(na, nb, xpts);
                let (j, det) = invert_2d(&xd);
                let h = alpha * det * wn * wm;

                for jj in 0..nvars {
                    let nxj = na[jj] * j[(0, 0)] + nb[jj] * j[(1, 0)];
                    let nyj = na[jj] * j[(0, 1)] + nb[jj] * j[(1, 1)];
                    for ii in 0..nvars {
                        let nxi = na[ii] * j[(0, 0)] + nb[ii] * j[(1, 0)];
                        let nyi = na[ii] * j[(0, 1)] + nb[ii] * j[(1, 1)];
                        mat[(ii, jj)] += h * (nxi * nxj + nyi * nyj);
                    }
                }
            }
        }
    }

    fn compute_energies(
        &self,
        _time: f64,
        xpts: &[Point3],
        vars: &[f64],
        _dvars: &[f64],
    ) -> (f64, f64) {
        self.check_input_lengths(xpts, vars);

        let rule = gauss_1d(ORDER);
        let f = self.f.as_flattened();
        let mut ue = 0.0;

        for &(eta, wm) in &rule {
            for &(xi, wn) in &rule {
                let (n, na, nb) = self.shape_with_grad([xi, eta]);
                let (n, na, nb) = (n.as_flattened(), na.as_flattened(), nb.as_flattened());

                let xd = jacobian_2d(na, nb, xpts);
                let (j, det) = invert_2d(&xd);
                let h = det * wn * wm;

                let mut fval = 0.0;
                let mut uval = 0.0;
                let mut e = [0.0; 2];
                for i in 0..ORDER * ORDER {
                    fval += n[i] * f[i];
                    uval += n[i] * vars[i];
                    e[0] += (na[i] * j[(0, 0)] + nb[i] * j[(1, 0)]) * vars[i];
                    e[1] += (na[i] * j[(0, 1)] + nb[i] * j[(1, 1)]) * vars[i];
                }
                let mut s = [0.0; 2];
                self.con.stress(&e, &mut s);

                ue += h * (0.5 * (s[0] * e[0] + s[1] * e[1]) - fval * uval);
            }
        }

        // No velocity-dependent terms for the static scalar field.
        (0.0, ue)
    }

    fn add_localized_error(
        &self,
        _time: f64,
        adjoint: &[f64],
        xpts: &[Point3],
        vars: &[f64],
        err: &mut [f64],
    ) {
        self.check_input_lengths(xpts, vars);
        assert_eq!(adjoint.len(), ORDER * ORDER, "adjoint buffer length mismatch");
        assert_eq!(err.len(), ORDER * ORDER, "error buffer length mismatch");

        let rule = gauss_1d(ORDER);
        let f = self.f.as_flattened();

        for &(eta, wm) in &rule {
            for &(xi, wn) in &rule {
                let (n, na, nb) = self.shape_with_grad([xi, eta]);
                let (n, na, nb) = (n.as_flattened(), na.as_flattened(), nb.as_flattened());

                let xd = jacobian_2d(na, nb, xpts);
                let (j, det) = invert_2d(&xd);
                let h = det * wn * wm;

                // Adjoint-weighted strain-energy mismatch at this point.
                let mut fval = 0.0;
                let mut adj = 0.0;
                let (mut px, mut py) = (0.0, 0.0);
                let (mut ax, mut ay) = (0.0, 0.0);
                for i in 0..ORDER * ORDER {
                    let nx = na[i] * j[(0, 0)] + nb[i] * j[(1, 0)];
                    let ny = na[i] * j[(0, 1)] + nb[i] * j[(1, 1)];
                    fval += n[i] * f[i];
                    adj += n[i] * adjoint[i];
                    px += nx * vars[i];
                    py += ny * vars[i];
                    ax += nx * adjoint[i];
                    ay += ny * adjoint[i];
                }
                let product = h * (ax * px + ay * py - adj * fval);

                // Bilinear partition-of-unity weights at the reference
                // corners, independent of the element order.
                let nerr = [
                    0.25 * (1.0 - xi) * (1.0 - eta),
                    0.25 * (1.0 + xi) * (1.0 - eta),
                    0.25 * (1.0 - xi) * (1.0 + eta),
                    0.25 * (1.0 + xi) * (1.0 + eta),
                ];
                err[0] += nerr[0] * product;
                err[ORDER - 1] += nerr[1] * product;
                err[ORDER * (ORDER - 1)] += nerr[2] * product;
                err[ORDER * ORDER - 1] += nerr[3] * product;
            }
        }
    }

    fn output_data(&self, mask: u32, xpts: &[Point3], vars: &[f64]) -> Vec<f64> {
        self.check_input_lengths(xpts, vars);

        let mut data = Vec::new();
        for m in 0..ORDER {
            for n_idx in 0..ORDER {
                let p = n_idx + ORDER * m;
                if mask & OUTPUT_NODES != 0 {
                    data.extend_from_slice(&[xpts[p][0], xpts[p][1], xpts[p][2]]);
                }
                if mask & OUTPUT_DISPLACEMENTS != 0 {
                    data.push(vars[p]);
                }

                if mask & (OUTPUT_STRAINS | OUTPUT_STRESSES) != 0 {
                    // Sample at the node's own knot location.
                    let pt = [self.knots[n_idx], self.knots[m]];
                    let (_, na, nb) = self.shape_with_grad(pt);
                    let (na, nb) = (na.as_flattened(), nb.as_flattened());

                    let xd = jacobian_2d(na, nb, xpts);
                    let (j, _) = invert_2d(&xd);

                    let mut e = [0.0; 2];
                    for i in 0..ORDER * ORDER {
                        e[0] += (na[i] * j[(0, 0)] + nb[i] * j[(1, 0)]) * vars[i];
                        e[1] += (na[i] * j[(0, 1)] + nb[i] * j[(1, 1)]) * vars[i];
                    }
                    if mask & OUTPUT_STRAINS != 0 {
                        data.extend_from_slice(&e);
                    }
                    if mask & OUTPUT_STRESSES != 0 {
                        let mut s = [0.0; 2];
                        self.con.stress(&e, &mut s);
                        data.extend_from_slice(&s);
                    }
                }
            }
        }
        data
    }

    fn nodes_per_output_cell(&self) -> usize {
        4
    }

    fn output_connectivity(&self, node_offset: usize, con: &mut Vec<usize>) {
        for m in 0..ORDER - 1 {
            for n in 0..ORDER - 1 {
                con.push(node_offset + n + m * ORDER);
                con.push(node_offset + n + 1 + m * ORDER);
                con.push(node_offset + n + 1 + (m + 1) * ORDER);
                con.push(node_offset + n + (m + 1) * ORDER);
            }
        }
    }
}
