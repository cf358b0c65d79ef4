//! Constitutive relations: strain → stress via a symmetric section operator.
//!
//! A constitutive object owns a dense symmetric tangent stiffness C (and
//! mass/inertia terms) assembled once from section or material properties,
//! plus the design variables that parametrize them. The operator is shared
//! by reference across every element that uses the same section, so
//! design-variable setters mutate state visible to all of them: callers
//! must only mutate between analysis passes, never concurrently with
//! element evaluation.

use nalgebra::{DMatrix, Matrix6, Vector3, Vector6};

use crate::error::{Error, Result};

/// Shared constitutive contract consumed by the element kernels.
pub trait Constitutive: Send + Sync {
    /// Number of stress/strain components.
    fn num_stresses(&self) -> usize;

    /// Evaluate s = C e.
    ///
    /// # Panics
    ///
    /// Panics if the slice lengths differ from [`Self::num_stresses`].
    fn stress(&self, e: &[f64], s: &mut [f64]);

    /// The tangent stiffness C used for Jacobian assembly.
    fn tangent_stiffness(&self) -> DMatrix<f64>;

    /// Mass per unit measure (zero for massless field problems).
    fn density(&self) -> f64;

    /// Global design-variable numbers owned by this object.
    fn design_var_nums(&self) -> Vec<usize> {
        Vec::new()
    }

    /// Update the design-variable values.
    ///
    /// Must only be called during a globally-synchronized design-update
    /// phase between analyses.
    fn set_design_vars(&mut self, _dvs: &[f64]) -> Result<()> {
        Ok(())
    }

    /// Read the current design-variable values into `dvs`.
    fn get_design_vars(&self, _dvs: &mut [f64]) {}

    /// Lower/upper bounds for each design variable.
    fn design_var_range(&self, _lb: &mut [f64], _ub: &mut [f64]) {}
}

/// Identity flux law for the scalar-field (Poisson) element: s = e.
///
/// The Poisson weak form uses the field gradient directly as both strain
/// and stress, so the tangent operator is the 2x2 identity and there are
/// no design variables.
#[derive(Debug, Clone, Copy, Default)]
pub struct PoissonConstitutive;

impl Constitutive for PoissonConstitutive {
    fn num_stresses(&self) -> usize {
        2
    }

    fn stress(&self, e: &[f64], s: &mut [f64]) {
        assert_eq!(e.len(), 2, "PoissonConstitutive expects 2 strain components");
        assert_eq!(s.len(), 2, "PoissonConstitutive expects 2 stress components");
        s.copy_from_slice(e);
    }

    fn tangent_stiffness(&self) -> DMatrix<f64> {
        DMatrix::identity(2, 2)
    }

    fn density(&self) -> f64 {
        0.0
    }
}

/// Timoshenko beam section operator.
///
/// Maps the six beam strain components [axial, twist, bending-2,
/// bending-3, shear-2, shear-3] to the conjugate section resultants
/// through a symmetric 6x6 stiffness, and carries the section mass row
/// [m00, m11, m22, m33] = [rhoA, rhoIy, rhoIz, rhoIyz] for inertia terms.
///
/// Optionally exposes a single sizing design variable: a cross-section
/// scale that multiplies both the stiffness and the mass terms.
#[derive(Debug, Clone)]
pub struct TimoshenkoConstitutive {
    c: Matrix6<f64>,
    rho: [f64; 4],
    axis: Vector3<f64>,
    design: Option<SectionScaleVar>,
}

#[derive(Debug, Clone)]
struct SectionScaleVar {
    num: usize,
    value: f64,
    lb: f64,
    ub: f64,
    /// Stiffness and mass at unit scale.
    c0: Matrix6<f64>,
    rho0: [f64; 4],
}

impl TimoshenkoConstitutive {
    /// Section with diagonal stiffness: EA (axial), GJ (torsion),
    /// EIy/EIz (bending), kGAy/kGAz (transverse shear), and mass row
    /// [rhoA, rhoIy, rhoIz, rhoIyz].
    ///
    /// # Errors
    ///
    /// Returns an error if any primary stiffness is non-positive or the
    /// reference axis is degenerate.
    #[allow(clippy::too_many_arguments)]
    pub fn diagonal(
        rho_a: f64,
        rho_iy: f64,
        rho_iz: f64,
        rho_iyz: f64,
        ea: f64,
        gj: f64,
        eiy: f64,
        eiz: f64,
        kg_ay: f64,
        kg_az: f64,
        axis: Vector3<f64>,
    ) -> Result<Self> {
        let mut c = Matrix6::zeros();
        c[(0, 0)] = ea;
        c[(1, 1)] = gj;
        c[(2, 2)] = eiy;
        c[(3, 3)] = eiz;
        c[(4, 4)] = kg_ay;
        c[(5, 5)] = kg_az;
        Self::from_matrix(c, [rho_a, rho_iy, rho_iz, rho_iyz], axis)
    }

    /// Full Timoshenko section with cross-sectional offsets:
    /// bending stiffnesses EI22/EI33/EI23, shear stiffnesses
    /// kG22/kG33/kG23, centroid (xc2, xc3), shear center (xk2, xk3), mass
    /// center (xm2, xm3) and mass moments m00/m11/m22/m33. The offset
    /// terms produce the axial-bending and twist-shear coupling entries.
    #[allow(clippy::too_many_arguments)]
    pub fn with_offsets(
        ea: f64,
        ei22: f64,
        ei33: f64,
        ei23: f64,
        gj: f64,
        kg22: f64,
        kg33: f64,
        kg23: f64,
        m00: f64,
        m11: f64,
        m22: f64,
        m33: f64,
        xm2: f64,
        xm3: f64,
        xc2: f64,
        xc3: f64,
        xk2: f64,
        xk3: f64,
        axis: Vector3<f64>,
    ) -> Result<Self> {
        let _ = m33;
        let mut c = Matrix6::zeros();

        // Axial force row, with centroid offsets coupling into bending.
        c[(0, 0)] = ea;
        c[(0, 2)] = xc3 * ea;
        c[(0, 3)] = -xc2 * ea;

        // Twisting moment row, with shear-center offsets.
        c[(1, 1)] = gj + xk2 * xk2 * kg33 + xk3 * xk3 * kg22 + 2.0 * xk2 * xk3 * kg23;
        c[(1, 4)] = -xk2 * kg23 - xk3 * kg22;
        c[(1, 5)] = xk2 * kg33 + xk3 * kg23;

        // Bending moments about axes 2 and 3.
        c[(2, 2)] = ei22 + xc3 * xc3 * ea;
        c[(2, 3)] = -(ei23 + xc2 * xc3 * ea);
        c[(3, 3)] = ei33 + xc2 * xc2 * ea;

        // Transverse shear.
        c[(4, 4)] = kg22;
        c[(4, 5)] = -kg23;
        c[(5, 5)] = kg33;

        // Mirror the upper triangle.
        for r in 0..6 {
            for col in 0..r {
                c[(r, col)] = c[(col, r)];
            }
        }

        Self::from_matrix(c, [m00, m11, m22, m00 * xm2 * xm3], axis)
    }

    /// Section from a full symmetric stiffness matrix and mass row.
    pub fn from_matrix(c: Matrix6<f64>, rho: [f64; 4], axis: Vector3<f64>) -> Result<Self> {
        for i in 0..6 {
            if c[(i, i)] <= 0.0 {
                return Err(Error::InvalidSection(format!(
                    "tangent stiffness diagonal entry {} must be positive",
                    i
                )));
            }
        }
        if rho[0] < 0.0 {
            return Err(Error::InvalidSection("mass per unit span must be non-negative".into()));
        }
        let norm = axis.norm();
        if norm <= 0.0 || !norm.is_finite() {
            return Err(Error::InvalidSection("reference axis must have nonzero length".into()));
        }
        Ok(Self {
            c,
            rho,
            axis: axis / norm,
            design: None,
        })
    }

    /// Attach a sizing design variable: a cross-section scale applied to
    /// the stiffness and mass terms, registered under the global design
    /// variable number `num` with bounds [lb, ub].
    pub fn with_design_variable(mut self, num: usize, lb: f64, ub: f64) -> Result<Self> {
        if !(lb > 0.0 && lb <= ub) {
            return Err(Error::DesignVariable(
                "design variable bounds must satisfy 0 < lb <= ub".into(),
            ));
        }
        self.design = Some(SectionScaleVar {
            num,
            value: 1.0,
            lb,
            ub,
            c0: self.c,
            rho0: self.rho,
        });
        Ok(self)
    }

    /// The normalized reference axis used for the local frame.
    pub fn axis(&self) -> &Vector3<f64> {
        &self.axis
    }

    /// Mass row [rhoA, rhoIy, rhoIz, rhoIyz].
    pub fn mass_moments(&self) -> [f64; 4] {
        self.rho
    }

    /// The 6x6 section stiffness.
    pub fn stiffness_matrix(&self) -> &Matrix6<f64> {
        &self.c
    }

    /// Evaluate the section resultants s = C e as fixed-size vectors.
    pub fn stress_vector(&self, e: &Vector6<f64>) -> Vector6<f64> {
        self.c * e
    }

    /// Replace the stiffness/mass properties in place.
    pub fn set_properties(&mut self, c: Matrix6<f64>, rho: [f64; 4]) {
        self.c = c;
        self.rho = rho;
        if let Some(design) = &mut self.design {
            design.c0 = c / design.value;
            design.rho0 = rho.map(|r| r / design.value);
        }
    }
}

impl Constitutive for TimoshenkoConstitutive {
    fn num_stresses(&self) -> usize {
        6
    }

    fn stress(&self, e: &[f64], s: &mut [f64]) {
        assert_eq!(e.len(), 6, "TimoshenkoConstitutive expects 6 strain components");
        assert_eq!(s.len(), 6, "TimoshenkoConstitutive expects 6 stress components");
        let ev = Vector6::from_row_slice(e);
        let sv = self.c * ev;
        s.copy_from_slice(sv.as_slice());
    }

    fn tangent_stiffness(&self) -> DMatrix<f64> {
        DMatrix::from_fn(6, 6, |r, c| self.c[(r, c)])
    }

    fn density(&self) -> f64 {
        self.rho[0]
    }

    fn design_var_nums(&self) -> Vec<usize> {
        self.design.iter().map(|d| d.num).collect()
    }

    fn set_design_vars(&mut self, dvs: &[f64]) -> Result<()> {
        let Some(design) = &mut self.design else {
            return Ok(());
        };
        let &[value] = dvs else {
            return Err(Error::DesignVariable(format!(
                "expected 1 design variable value, got {}",
                dvs.len()
            )));
        };
        if value < design.lb || value > design.ub {
            return Err(Error::DesignVariable(format!(
                "design variable {} out of range [{}, {}]",
                value, design.lb, design.ub
            )));
        }
        design.value = value;
        self.c = design.c0 * value;
        self.rho = design.rho0.map(|r| r * value);
        Ok(())
    }

    fn get_design_vars(&self, dvs: &mut [f64]) {
        if let Some(design) = &self.design {
            dvs[0] = design.value;
        }
    }

    fn design_var_range(&self, lb: &mut [f64], ub: &mut [f64]) {
        if let Some(design) = &self.design {
            lb[0] = design.lb;
            ub[0] = design.ub;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn section() -> TimoshenkoConstitutive {
        TimoshenkoConstitutive::diagonal(
            2.7,
            0.4,
            0.3,
            0.05,
            7.0e7,
            2.6e6,
            5.8e5,
            5.8e5,
            2.7e7,
            2.7e7,
            Vector3::new(0.0, 1.0, 0.0),
        )
        .unwrap()
    }

    #[test]
    fn test_diagonal_stress() {
        let con = section();
        let e = [1e-3, 2e-4, -1e-4, 3e-4, 5e-5, -2e-5];
        let mut s = [0.0; 6];
        con.stress(&e, &mut s);
        assert_relative_eq!(s[0], 7.0e7 * 1e-3, epsilon = 1e-6);
        assert_relative_eq!(s[1], 2.6e6 * 2e-4, epsilon = 1e-9);
        assert_relative_eq!(s[4], 2.7e7 * 5e-5, epsilon = 1e-9);
    }

    #[test]
    fn test_tangent_stiffness_symmetric() {
        let con = TimoshenkoConstitutive::with_offsets(
            7.0e7, 5.8e5, 6.4e5, 1.2e4, 2.6e6, 2.7e7, 2.7e7, 3.0e5, 2.7, 0.7, 0.4, 0.3, 0.01,
            -0.02, 0.015, 0.01, 0.005, -0.01, Vector3::new(0.0, 0.0, 1.0),
        )
        .unwrap();
        let c = con.tangent_stiffness();
        for r in 0..6 {
            for col in 0..6 {
                assert_relative_eq!(c[(r, col)], c[(col, r)], epsilon = 1e-9);
            }
        }
        // Centroid offset couples axial force into bending.
        assert_relative_eq!(c[(0, 2)], 0.01 * 7.0e7, epsilon = 1e-6);
        assert_relative_eq!(c[(0, 3)], -0.015 * 7.0e7, epsilon = 1e-6);
    }

    #[test]
    fn test_invalid_section_rejected() {
        assert!(TimoshenkoConstitutive::diagonal(
            2.7,
            0.4,
            0.3,
            0.0,
            -1.0,
            2.6e6,
            5.8e5,
            5.8e5,
            2.7e7,
            2.7e7,
            Vector3::new(0.0, 1.0, 0.0),
        )
        .is_err());

        assert!(TimoshenkoConstitutive::diagonal(
            2.7,
            0.4,
            0.3,
            0.0,
            7.0e7,
            2.6e6,
            5.8e5,
            5.8e5,
            2.7e7,
            2.7e7,
            Vector3::zeros(),
        )
        .is_err());
    }

    #[test]
    fn test_design_variable_scaling() {
        let mut con = section().with_design_variable(12, 0.1, 4.0).unwrap();
        assert_eq!(con.design_var_nums(), vec![12]);

        let mut dvs = [0.0];
        con.get_design_vars(&mut dvs);
        assert_relative_eq!(dvs[0], 1.0, epsilon = 1e-15);

        let rho_a0 = con.density();
        con.set_design_vars(&[2.0]).unwrap();
        assert_relative_eq!(con.density(), 2.0 * rho_a0, epsilon = 1e-12);

        let e = [1e-3, 0.0, 0.0, 0.0, 0.0, 0.0];
        let mut s = [0.0; 6];
        con.stress(&e, &mut s);
        assert_relative_eq!(s[0], 2.0 * 7.0e7 * 1e-3, epsilon = 1e-6);

        let (mut lb, mut ub) = ([0.0], [0.0]);
        con.design_var_range(&mut lb, &mut ub);
        assert_eq!((lb[0], ub[0]), (0.1, 4.0));

        // Out-of-bounds updates are rejected and leave the state intact.
        assert!(con.set_design_vars(&[5.0]).is_err());
        con.get_design_vars(&mut dvs);
        assert_relative_eq!(dvs[0], 2.0, epsilon = 1e-15);
    }

    #[test]
    fn test_poisson_constitutive_identity() {
        let con = PoissonConstitutive;
        let e = [0.3, -0.7];
        let mut s = [0.0; 2];
        con.stress(&e, &mut s);
        assert_eq!(s, e);
        assert_eq!(con.tangent_stiffness(), DMatrix::identity(2, 2));
    }
}
