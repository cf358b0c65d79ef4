//! Director-based Timoshenko beam element.
//!
//! A beam of compile-time node count embedded in 3D, with six degrees of
//! freedom per node: three displacements and three rotation parameters.
//! Each node carries two section normals taken from the reference-axis
//! frame ([`RefAxisTransform`]) evaluated at the node; the rotation
//! parameters perturb those normals through the linearized director
//! parametrization d = q × n.
//!
//! The six strain components are ordered to match
//! [`TimoshenkoConstitutive`]: axial, twist, the two bending curvatures,
//! and the two transverse shears. Transverse shear is interpolated from
//! strains evaluated at a reduced set of tying points (the Gauss points of
//! the next-lower order), which removes the shear locking a fully
//! integrated low-order beam would exhibit.
//!
//! The strain is linear in the nodal state, so residual, Jacobian and
//! strain energy all derive from the same strain-displacement columns and
//! are consistent by construction.

use std::sync::{Arc, RwLock, RwLockReadGuard};

use nalgebra::{DMatrix, Matrix3, Vector3, Vector6};

use crate::ad::{Det, Inverse, MatFromThreeVecs, MatMul};
use crate::basis;
use crate::constitutive::{Constitutive, TimoshenkoConstitutive};
use crate::director::LinearizedRotation;
use crate::element::Element;
use crate::error::{Error, Result};
use crate::quadrature::gauss_1d;
use crate::transform::RefAxisTransform;
use crate::types::{
    Point3, OUTPUT_DISPLACEMENTS, OUTPUT_NODES, OUTPUT_STRAINS, OUTPUT_STRESSES,
};

const VAR_NAMES: [&str; 6] = ["ux", "uy", "uz", "rx", "ry", "rz"];
const STRESS_NAMES: [&str; 6] = ["N", "Mt", "M2", "M3", "V2", "V3"];

/// Timoshenko beam element with NODES nodes along a single parametric axis.
///
/// The section operator is shared across elements through an
/// `Arc<RwLock<_>>` so that a design-variable update on one section is
/// seen by every element referencing it.
#[derive(Debug, Clone)]
pub struct BeamElement<const NODES: usize> {
    transform: RefAxisTransform,
    con: Arc<RwLock<TimoshenkoConstitutive>>,
    knots: [f64; NODES],
}

/// Geometry shared by every evaluation point of one element: the node
/// normals and the tying-point data, all functions of the nodal
/// coordinates only.
#[derive(Debug, Clone, Copy)]
struct ElementGeometry<const NODES: usize> {
    n1: [Vector3<f64>; NODES],
    n2: [Vector3<f64>; NODES],
    /// Entries `0..NODES - 1` are in use.
    tying: [TyingPoint<NODES>; NODES],
    tying_knots: [f64; NODES],
}

#[derive(Debug, Clone, Copy)]
struct TyingPoint<const NODES: usize> {
    sh: [f64; NODES],
    dsh: [f64; NODES],
    x0xi: Vector3<f64>,
    n1: Vector3<f64>,
    n2: Vector3<f64>,
}

/// Frame data at a single evaluation point.
struct PointFrame<const NODES: usize> {
    sh: [f64; NODES],
    dsh: [f64; NODES],
    t: Matrix3<f64>,
    xdinv_t: Matrix3<f64>,
    det: f64,
    /// Tying interpolation values, entries `0..NODES - 1` in use.
    tying_basis: [f64; NODES],
}

fn nodal(vals: &[f64], j: usize) -> (Vector3<f64>, Vector3<f64>) {
    (
        Vector3::new(vals[6 * j], vals[6 * j + 1], vals[6 * j + 2]),
        Vector3::new(vals[6 * j + 3], vals[6 * j + 4], vals[6 * j + 5]),
    )
}

impl<const NODES: usize> BeamElement<NODES> {
    /// Create a beam element over a shared section.
    ///
    /// The local frame is built around the section's reference axis.
    ///
    /// # Errors
    ///
    /// Returns an error if NODES is outside 2..=8 or the shared section
    /// lock is poisoned.
    pub fn new(con: Arc<RwLock<TimoshenkoConstitutive>>) -> Result<Self> {
        if !(2..=8).contains(&NODES) {
            return Err(Error::Element(format!(
                "BeamElement node count must be in 2..=8, got {}",
                NODES
            )));
        }
        let axis = *con
            .read()
            .map_err(|_| Error::Element("section lock poisoned".into()))?
            .axis();
        let transform = RefAxisTransform::new(axis)?;
        let mut knots = [0.0; NODES];
        basis::knot_vector(&mut knots);
        Ok(Self {
            transform,
            con,
            knots,
        })
    }

    /// The reference-axis transform used for the local frame.
    pub fn transform(&self) -> &RefAxisTransform {
        &self.transform
    }

    fn section(&self) -> RwLockReadGuard<'_, TimoshenkoConstitutive> {
        self.con.read().expect("section lock poisoned")
    }

    /// Node normals and tying-point data for the given nodal coordinates.
    fn setup_geometry(&self, xpts: &[Point3]) -> ElementGeometry<NODES> {
        assert_eq!(
            xpts.len(),
            NODES,
            "BeamElement requires {} nodal coordinates",
            NODES
        );

        let mut n1 = [Vector3::zeros(); NODES];
        let mut n2 = [Vector3::zeros(); NODES];
        let mut sh = [0.0; NODES];
        let mut dsh = [0.0; NODES];
        for a in 0..NODES {
            basis::lagrange_with_deriv(&self.knots, self.knots[a], &mut sh, &mut dsh);
            let mut x0xi = Vector3::zeros();
            for j in 0..NODES {
                x0xi += dsh[j] * xpts[j];
            }
            let t = self.transform.compute_transform(&x0xi);
            n1[a] = t.column(1).into();
            n2[a] = t.column(2).into();
        }

        let zero = TyingPoint {
            sh: [0.0; NODES],
            dsh: [0.0; NODES],
            x0xi: Vector3::zeros(),
            n1: Vector3::zeros(),
            n2: Vector3::zeros(),
        };
        let mut tying = [zero; NODES];
        let mut tying_knots = [0.0; NODES];
        for (t, &(xi, _)) in gauss_1d(NODES - 1).iter().enumerate() {
            basis::lagrange_with_deriv(&self.knots, xi, &mut sh, &mut dsh);
            let mut x0xi = Vector3::zeros();
            let mut n1t = Vector3::zeros();
            let mut n2t = Vector3::zeros();
            for j in 0..NODES {
                x0xi += dsh[j] * xpts[j];
                n1t += sh[j] * n1[j];
                n2t += sh[j] * n2[j];
            }
            tying[t] = TyingPoint {
                sh,
                dsh,
                x0xi,
                n1: n1t,
                n2: n2t,
            };
            tying_knots[t] = xi;
        }

        ElementGeometry {
            n1,
            n2,
            tying,
            tying_knots,
        }
    }

    /// Frame, inverse Jacobian and tying basis at parametric point `xi`.
    fn point_frame(
        &self,
        xi: f64,
        xpts: &[Point3],
        geo: &ElementGeometry<NODES>,
    ) -> PointFrame<NODES> {
        let mut sh = [0.0; NODES];
        let mut dsh = [0.0; NODES];
        basis::lagrange_with_deriv(&self.knots, xi, &mut sh, &mut dsh);

        let mut x0xi = Vector3::zeros();
        let mut n1 = Vector3::zeros();
        let mut n2 = Vector3::zeros();
        for j in 0..NODES {
            x0xi += dsh[j] * xpts[j];
            n1 += sh[j] * geo.n1[j];
            n2 += sh[j] * geo.n2[j];
        }

        let t = self.transform.compute_transform(&x0xi);
        let (xd, _) = MatFromThreeVecs::forward(&x0xi, &n1, &n2);
        let (det, _) = Det::forward(&xd);
        let (xdinv, _) = Inverse::forward(&xd);
        let (xdinv_t, _) = MatMul::forward(1.0, &xdinv, &t);

        let mut tying_basis = [0.0; NODES];
        basis::lagrange(
            &geo.tying_knots[..NODES - 1],
            xi,
            &mut tying_basis[..NODES - 1],
        );

        PointFrame {
            sh,
            dsh,
            t,
            xdinv_t,
            det,
            tying_basis,
        }
    }

    /// Strain at a point for the nodal state produced by `get`, which
    /// returns the (displacement, rotation) pair of each node.
    ///
    /// Direct components come from the local displacement gradient; the
    /// transverse shears are interpolated from the tying points.
    fn strain_from_nodal<F>(
        &self,
        frame: &PointFrame<NODES>,
        geo: &ElementGeometry<NODES>,
        get: F,
    ) -> Vector6<f64>
    where
        F: Fn(usize) -> (Vector3<f64>, Vector3<f64>),
    {
        let mut u0xi = Vector3::zeros();
        let mut d1 = Vector3::zeros();
        let mut d2 = Vector3::zeros();
        let mut d1xi = Vector3::zeros();
        let mut d2xi = Vector3::zeros();
        for j in 0..NODES {
            let (u, q) = get(j);
            u0xi += frame.dsh[j] * u;
            let d1j = LinearizedRotation::director(&q, &geo.n1[j]);
            let d2j = LinearizedRotation::director(&q, &geo.n2[j]);
            d1 += frame.sh[j] * d1j;
            d2 += frame.sh[j] * d2j;
            d1xi += frame.dsh[j] * d1j;
            d2xi += frame.dsh[j] * d2j;
        }

        let u0d = Matrix3::from_columns(&[u0xi, d1, d2]);
        let u0x = frame.t.transpose() * u0d * frame.xdinv_t;
        // Only the first column of the director gradients survives the
        // parametric-to-local map: the directors vary along the axis only.
        let s00 = frame.xdinv_t[(0, 0)];
        let d1x = (frame.t.transpose() * d1xi) * s00;
        let d2x = (frame.t.transpose() * d2xi) * s00;

        let mut g2 = 0.0;
        let mut g3 = 0.0;
        for t in 0..NODES - 1 {
            let tp = &geo.tying[t];
            let mut u0xi_t = Vector3::zeros();
            let mut d1_t = Vector3::zeros();
            let mut d2_t = Vector3::zeros();
            for j in 0..NODES {
                let (u, q) = get(j);
                u0xi_t += tp.dsh[j] * u;
                d1_t += tp.sh[j] * LinearizedRotation::director(&q, &geo.n1[j]);
                d2_t += tp.sh[j] * LinearizedRotation::director(&q, &geo.n2[j]);
            }
            g2 += frame.tying_basis[t] * 0.5 * (tp.x0xi.dot(&d1_t) + u0xi_t.dot(&tp.n1));
            g3 += frame.tying_basis[t] * 0.5 * (tp.x0xi.dot(&d2_t) + u0xi_t.dot(&tp.n2));
        }

        Vector6::new(
            u0x[(0, 0)],
            0.5 * (d1x[2] - d2x[1]),
            d2x[0],
            -d1x[0],
            2.0 * g2 * s00,
            2.0 * g3 * s00,
        )
    }

    fn strain(
        &self,
        frame: &PointFrame<NODES>,
        geo: &ElementGeometry<NODES>,
        vars: &[f64],
    ) -> Vector6<f64> {
        self.strain_from_nodal(frame, geo, |j| nodal(vars, j))
    }

    /// Strain-displacement columns: `b[i][k]` is the strain produced by a
    /// unit value of DOF `k` at node `i`. Exact, since the strain is
    /// linear in the state.
    fn strain_columns(
        &self,
        frame: &PointFrame<NODES>,
        geo: &ElementGeometry<NODES>,
    ) -> [[Vector6<f64>; 6]; NODES] {
        let mut b = [[Vector6::zeros(); 6]; NODES];
        for (i, bi) in b.iter_mut().enumerate() {
            for (k, bik) in bi.iter_mut().enumerate() {
                *bik = self.strain_from_nodal(frame, geo, |j| {
                    let mut u = Vector3::zeros();
                    let mut q = Vector3::zeros();
                    if j == i {
                        if k < 3 {
                            u[k] = 1.0;
                        } else {
                            q[k - 3] = 1.0;
                        }
                    }
                    (u, q)
                });
            }
        }
        b
    }

    /// Interpolated displacement and director rates from a nodal rate
    /// vector (velocities or accelerations).
    fn rates(
        &self,
        frame: &PointFrame<NODES>,
        geo: &ElementGeometry<NODES>,
        dvals: &[f64],
    ) -> (Vector3<f64>, Vector3<f64>, Vector3<f64>) {
        let mut u0 = Vector3::zeros();
        let mut d1 = Vector3::zeros();
        let mut d2 = Vector3::zeros();
        for j in 0..NODES {
            let (du, dq) = nodal(dvals, j);
            u0 += frame.sh[j] * du;
            d1 += frame.sh[j] * LinearizedRotation::director(&dq, &geo.n1[j]);
            d2 += frame.sh[j] * LinearizedRotation::director(&dq, &geo.n2[j]);
        }
        (u0, d1, d2)
    }

    fn check_input_lengths(&self, xpts: &[Point3], vars: &[f64], dvars: &[f64], ddvars: &[f64]) {
        assert_eq!(
            xpts.len(),
            NODES,
            "BeamElement requires {} nodal coordinates",
            NODES
        );
        let nvars = 6 * NODES;
        assert_eq!(vars.len(), nvars, "state vector length mismatch");
        assert_eq!(dvars.len(), nvars, "velocity vector length mismatch");
        assert_eq!(ddvars.len(), nvars, "acceleration vector length mismatch");
    }
}

impl<const NODES: usize> Element for BeamElement<NODES> {
    fn num_nodes(&self) -> usize {
        NODES
    }

    fn vars_per_node(&self) -> usize {
        6
    }

    fn num_stresses(&self) -> usize {
        6
    }

    fn num_quadrature_points(&self) -> usize {
        NODES
    }

    fn quadrature_point(&self, n: usize) -> ([f64; 3], f64) {
        assert!(n < NODES, "BeamElement: quadrature index {} out of range", n);
        let (xi, w) = gauss_1d(NODES)[n];
        ([xi, 0.0, 0.0], w)
    }

    fn var_name(&self, i: usize) -> Option<&'static str> {
        VAR_NAMES.get(i).copied()
    }

    fn stress_name(&self, i: usize) -> Option<&'static str> {
        STRESS_NAMES.get(i).copied()
    }

    fn add_residual(
        &self,
        _time: f64,
        xpts: &[Point3],
        vars: &[f64],
        dvars: &[f64],
        ddvars: &[f64],
        res: &mut [f64],
    ) {
        self.check_input_lengths(xpts, vars, dvars, ddvars);
        assert_eq!(res.len(), 6 * NODES, "residual buffer length mismatch");

        let con = self.section();
        let rho = con.mass_moments();
        let geo = self.setup_geometry(xpts);

        for &(xi, w) in &gauss_1d(NODES) {
            let frame = self.point_frame(xi, xpts, &geo);
            let h = w * frame.det;

            let e = self.strain(&frame, &geo, vars);
            let s = con.stress_vector(&e);
            let b = self.strain_columns(&frame, &geo);
            for i in 0..NODES {
                for k in 0..6 {
                    res[6 * i + k] += h * b[i][k].dot(&s);
                }
            }

            // Inertial terms from the nodal accelerations.
            let (ddu0, dd1, dd2) = self.rates(&frame, &geo, ddvars);
            let m1 = rho[1] * dd1 + rho[3] * dd2;
            let m2 = rho[2] * dd2 + rho[3] * dd1;
            for i in 0..NODES {
                let fu = (h * rho[0] * frame.sh[i]) * ddu0;
                let s1 = LinearizedRotation::director_matrix(&geo.n1[i]);
                let s2 = LinearizedRotation::director_matrix(&geo.n2[i]);
                let fq = (h * frame.sh[i]) * (s1.transpose() * m1 + s2.transpose() * m2);
                for c in 0..3 {
                    res[6 * i + c] += fu[c];
                    res[6 * i + 3 + c] += fq[c];
                }
            }
        }
    }

    fn add_jacobian(
        &self,
        _time: f64,
        alpha: f64,
        _beta: f64,
        gamma: f64,
        xpts: &[Point3],
        vars: &[f64],
        dvars: &[f64],
        ddvars: &[f64],
        mat: &mut DMatrix<f64>,
    ) {
        self.check_input_lengths(xpts, vars, dvars, ddvars);
        let nvars = 6 * NODES;
        assert_eq!(mat.nrows(), nvars, "Jacobian buffer row count mismatch");
        assert_eq!(mat.ncols(), nvars, "Jacobian buffer column count mismatch");

        let con = self.section();
        let c = *con.stiffness_matrix();
        let rho = con.mass_moments();
        let geo = self.setup_geometry(xpts);

        for &(xi, w) in &gauss_1d(NODES) {
            let frame = self.point_frame(xi, xpts, &geo);
            let h = w * frame.det;

            let b = self.strain_columns(&frame, &geo);
            let mut cb = [[Vector6::zeros(); 6]; NODES];
            for j in 0..NODES {
                for l in 0..6 {
                    cb[j][l] = c * b[j][l];
                }
            }
            for i in 0..NODES {
                for k in 0..6 {
                    for j in 0..NODES {
                        for l in 0..6 {
                            mat[(6 * i + k, 6 * j + l)] += alpha * h * b[i][k].dot(&cb[j][l]);
                        }
                    }
                }
            }

            // Consistent mass: displacement block is diagonal, rotation
            // block couples through the node director operators.
            for i in 0..NODES {
                let s1i = LinearizedRotation::director_matrix(&geo.n1[i]);
                let s2i = LinearizedRotation::director_matrix(&geo.n2[i]);
                for j in 0..NODES {
                    let muu = gamma * h * rho[0] * frame.sh[i] * frame.sh[j];
                    for cc in 0..3 {
                        mat[(6 * i + cc, 6 * j + cc)] += muu;
                    }

                    let s1j = LinearizedRotation::director_matrix(&geo.n1[j]);
                    let s2j = LinearizedRotation::director_matrix(&geo.n2[j]);
                    let mqq = s1i.transpose() * (rho[1] * s1j + rho[3] * s2j)
                        + s2i.transpose() * (rho[2] * s2j + rho[3] * s1j);
                    let scale = gamma * h * frame.sh[i] * frame.sh[j];
                    for r in 0..3 {
                        for cc in 0..3 {
                            mat[(6 * i + 3 + r, 6 * j + 3 + cc)] += scale * mqq[(r, cc)];
                        }
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
        dvars: &[f64],
    ) -> (f64, f64) {
        assert_eq!(xpts.len(), NODES, "BeamElement requires {} nodal coordinates", NODES);
        assert_eq!(vars.len(), 6 * NODES, "state vector length mismatch");
        assert_eq!(dvars.len(), 6 * NODES, "velocity vector length mismatch");

        let con = self.section();
        let rho = con.mass_moments();
        let geo = self.setup_geometry(xpts);

        let mut te = 0.0;
        let mut ue = 0.0;
        for &(xi, w) in &gauss_1d(NODES) {
            let frame = self.point_frame(xi, xpts, &geo);
            let h = w * frame.det;

            let e = self.strain(&frame, &geo, vars);
            let s = con.stress_vector(&e);
            ue += 0.5 * h * e.dot(&s);

            let (du0, d1dot, d2dot) = self.rates(&frame, &geo, dvars);
            te += 0.5
                * h
                * (rho[0] * du0.norm_squared()
                    + rho[1] * d1dot.norm_squared()
                    + rho[2] * d2dot.norm_squared()
                    + 2.0 * rho[3] * d1dot.dot(&d2dot));
        }
        (te, ue)
    }

    fn add_localized_error(
        &self,
        _time: f64,
        adjoint: &[f64],
        xpts: &[Point3],
        vars: &[f64],
        err: &mut [f64],
    ) {
        assert_eq!(xpts.len(), NODES, "BeamElement requires {} nodal coordinates", NODES);
        assert_eq!(vars.len(), 6 * NODES, "state vector length mismatch");
        assert_eq!(adjoint.len(), 6 * NODES, "adjoint vector length mismatch");
        assert_eq!(err.len(), NODES, "error buffer length mismatch");

        let con = self.section();
        let geo = self.setup_geometry(xpts);

        for &(xi, w) in &gauss_1d(NODES) {
            let frame = self.point_frame(xi, xpts, &geo);
            let h = w * frame.det;

            let e = self.strain(&frame, &geo, vars);
            let s = con.stress_vector(&e);
            let ea = self.strain(&frame, &geo, adjoint);
            let product = h * ea.dot(&s);

            // Hat-function partition of unity over the two end nodes.
            err[0] += 0.5 * (1.0 - xi) * product;
            err[NODES - 1] += 0.5 * (1.0 + xi) * product;
        }
    }

    fn output_data(&self, mask: u32, xpts: &[Point3], vars: &[f64]) -> Vec<f64> {
        assert_eq!(xpts.len(), NODES, "BeamElement requires {} nodal coordinates", NODES);
        assert_eq!(vars.len(), 6 * NODES, "state vector length mismatch");

        let con = self.section();
        let geo = self.setup_geometry(xpts);

        let mut data = Vec::new();
        for a in 0..NODES {
            if mask & OUTPUT_NODES != 0 {
                data.extend_from_slice(&[xpts[a][0], xpts[a][1], xpts[a][2]]);
            }
            if mask & OUTPUT_DISPLACEMENTS != 0 {
                data.extend_from_slice(&vars[6 * a..6 * a + 6]);
            }
            if mask & (OUTPUT_STRAINS | OUTPUT_STRESSES) != 0 {
                let frame = self.point_frame(self.knots[a], xpts, &geo);
                let e = self.strain(&frame, &geo, vars);
                if mask & OUTPUT_STRAINS != 0 {
                    data.extend_from_slice(e.as_slice());
                }
                if mask & OUTPUT_STRESSES != 0 {
                    let s = con.stress_vector(&e);
                    data.extend_from_slice(s.as_slice());
                }
            }
        }
        data
    }

    fn nodes_per_output_cell(&self) -> usize {
        2
    }

    fn output_connectivity(&self, node_offset: usize, con: &mut Vec<usize>) {
        for n in 0..NODES - 1 {
            con.push(node_offset + n);
            con.push(node_offset + n + 1);
        }
    }

    fn design_var_nums(&self) -> Vec<usize> {
        self.section().design_var_nums()
    }

    fn set_design_vars(&self, dvs: &[f64]) -> Result<()> {
        self.con
            .write()
            .map_err(|_| Error::DesignVariable("section lock poisoned".into()))?
            .set_design_vars(dvs)
    }

    fn get_design_vars(&self, dvs: &mut [f64]) {
        self.section().get_design_vars(dvs);
    }

    fn design_var_range(&self, lb: &mut [f64], ub: &mut [f64]) {
        self.section().design_var_range(lb, ub);
    }
}
