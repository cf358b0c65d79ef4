//! Finite element kernels for residual, Jacobian and energy assembly.
//!
//! This crate provides the per-element building blocks of a finite element
//! analysis: quadrature rules, Lagrange shape functions, geometric
//! transforms with reverse-mode sensitivities, director kinematics,
//! constitutive relations, and the element kernels themselves. Global
//! assembly, linear solves and mesh management are left to the caller; the
//! [`element::Element`] trait is the boundary, and every kernel
//! accumulates additively into caller-owned buffers so that an external
//! driver can parallelize over elements.
//!
//! Two element families are included:
//!
//! - [`element::PoissonQuad`]: a scalar-field quadrilateral of
//!   compile-time order solving the Poisson weak form, with adjoint-based
//!   error localization.
//! - [`element::BeamElement`]: a director-based Timoshenko beam in 3D
//!   with tying-point shear interpolation and a shared
//!   [`constitutive::TimoshenkoConstitutive`] section.
//!
//! # Example
//!
//! ```
//! use modo::element::{Element, PoissonQuad};
//! use modo::types::Point3;
//!
//! // Bilinear element on the unit square with a uniform unit source.
//! let element = PoissonQuad::<2>::new([[1.0, 1.0], [1.0, 1.0]])?;
//! let xpts = [
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(0.0, 1.0, 0.0),
//!     Point3::new(1.0, 1.0, 0.0),
//! ];
//! let vars = [0.0; 4];
//! let mut res = [0.0; 4];
//! element.add_residual(0.0, &xpts, &vars, &vars, &vars, &mut res);
//! assert!((res[0] + 0.25).abs() < 1e-12);
//! # Ok::<(), modo::error::Error>(())
//! ```

pub mod ad;
pub mod basis;
pub mod constitutive;
pub mod director;
pub mod element;
pub mod error;
pub mod quadrature;
pub mod transform;
pub mod types;

pub use constitutive::{Constitutive, PoissonConstitutive, TimoshenkoConstitutive};
pub use element::{BeamElement, Element, PoissonQuad};
pub use error::{Error, Result};
