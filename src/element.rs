//! Element trait and implementations.
//!
//! The Element trait is the per-element contract consumed by an external
//! assembly driver: it exposes the element sizes, the quadrature rule, and
//! the residual/Jacobian/energy/error kernels that accumulate into
//! caller-owned buffers.
//!
//! Every kernel call is a pure function of its explicit inputs (nodal
//! coordinates, nodal state, time); elements own no mutable per-call
//! state. This statelessness is a core invariant: an external driver may
//! evaluate distinct elements concurrently, provided the shared output
//! buffers are combined by additive reduction and the constitutive
//! design-variable store is only mutated between analysis passes.
//!
//! # Submodules
//!
//! - [`poisson`] - scalar-field (Poisson) quadrilateral elements
//! - [`beam`] - director-based Timoshenko beam elements

use nalgebra::DMatrix;

use crate::error::Result;
use crate::types::Point3;

pub mod beam;
pub mod poisson;

pub use beam::BeamElement;
pub use poisson::PoissonQuad;

/// Per-element finite element contract.
///
/// All buffers are flat with fixed strides: coordinates are one [`Point3`]
/// per node, state vectors hold `vars_per_node` entries per node, and the
/// element matrix is dense of size `num_vars() x num_vars()` with
/// `mat[(i, j)] = ∂res[i]/∂var[j]`.
///
/// The accumulation kernels (`add_*`) add into their output buffers and
/// never overwrite: calling a kernel twice with the same inputs yields
/// exactly twice the single-call contribution, which global assembly
/// relies on.
pub trait Element: Send + Sync {
    /// Number of nodes in this element.
    fn num_nodes(&self) -> usize;

    /// Degrees of freedom per node.
    fn vars_per_node(&self) -> usize;

    /// Number of stress/strain components.
    fn num_stresses(&self) -> usize;

    /// Total degrees of freedom for this element.
    fn num_vars(&self) -> usize {
        self.num_nodes() * self.vars_per_node()
    }

    /// Number of quadrature points.
    fn num_quadrature_points(&self) -> usize;

    /// Parametric coordinates (padded to three components) and weight of
    /// quadrature point `n`.
    ///
    /// # Panics
    ///
    /// Panics if `n` is out of range; an invalid index is a programming
    /// error.
    fn quadrature_point(&self, n: usize) -> ([f64; 3], f64);

    /// Name of state variable `i`, or `None` past the end.
    fn var_name(&self, i: usize) -> Option<&'static str>;

    /// Name of stress/strain component `i`, or `None` past the end.
    fn stress_name(&self, i: usize) -> Option<&'static str>;

    /// Accumulate the element residual into `res`.
    fn add_residual(
        &self,
        time: f64,
        xpts: &[Point3],
        vars: &[f64],
        dvars: &[f64],
        ddvars: &[f64],
        res: &mut [f64],
    );

    /// Accumulate the element Jacobian into `mat`.
    ///
    /// `alpha` scales the stiffness contribution, `gamma` the
    /// acceleration-dependent (mass) contribution; `beta` is reserved for
    /// velocity-dependent terms and is ignored by the static elements.
    #[allow(clippy::too_many_arguments)]
    fn add_jacobian(
        &self,
        time: f64,
        alpha: f64,
        beta: f64,
        gamma: f64,
        xpts: &[Point3],
        vars: &[f64],
        dvars: &[f64],
        ddvars: &[f64],
        mat: &mut DMatrix<f64>,
    );

    /// Kinetic and potential energy `(Te, Ue)` of the element.
    fn compute_energies(
        &self,
        time: f64,
        xpts: &[Point3],
        vars: &[f64],
        dvars: &[f64],
    ) -> (f64, f64);

    /// Accumulate the adjoint-weighted error indicator into the per-node
    /// buffer `err`.
    ///
    /// The indicator is distributed to the corner nodes of the reference
    /// domain with partition-of-unity weights evaluated at the corners,
    /// regardless of the element order; interior node entries are left
    /// untouched.
    fn add_localized_error(
        &self,
        time: f64,
        adjoint: &[f64],
        xpts: &[Point3],
        vars: &[f64],
        err: &mut [f64],
    );

    /// Sample output fields at the element's own node locations.
    ///
    /// Returns a row-major buffer with one row per node; the row layout
    /// follows the field order of the mask bits in [`crate::types`]
    /// (nodes, displacements, strains, stresses), with only the requested
    /// fields present.
    fn output_data(&self, mask: u32, xpts: &[Point3], vars: &[f64]) -> Vec<f64>;

    /// Number of nodes per visualization sub-cell (4 for quadrilateral
    /// decompositions, 2 for line segments).
    fn nodes_per_output_cell(&self) -> usize;

    /// Append the visualization sub-cell connectivity, with node indices
    /// offset by `node_offset`. Pure topology, no numerics.
    fn output_connectivity(&self, node_offset: usize, con: &mut Vec<usize>);

    /// Visualization bookkeeping `(num_cells, num_nodes, connectivity
    /// length)` for buffer sizing.
    fn output_counts(&self) -> (usize, usize, usize) {
        let cells = {
            let mut con = Vec::new();
            self.output_connectivity(0, &mut con);
            con.len() / self.nodes_per_output_cell()
        };
        (
            cells,
            self.num_nodes(),
            cells * self.nodes_per_output_cell(),
        )
    }

    /// Global design-variable numbers, delegated to the constitutive
    /// relation.
    fn design_var_nums(&self) -> Vec<usize> {
        Vec::new()
    }

    /// Update design-variable values on the shared constitutive relation.
    fn set_design_vars(&self, _dvs: &[f64]) -> Result<()> {
        Ok(())
    }

    /// Read design-variable values from the shared constitutive relation.
    fn get_design_vars(&self, _dvs: &mut [f64]) {}

    /// Design-variable bounds from the shared constitutive relation.
    fn design_var_range(&self, _lb: &mut [f64], _ub: &mut [f64]) {}
}
