//! Core data types for element kernel operations.
//!
//! This module defines fundamental types used throughout MODO:
//! - Geometric primitives (points, vectors)
//! - Output field selection masks for visualization sampling

use nalgebra::Vector3;

/// A point in 3D space.
pub type Point3 = Vector3<f64>;

/// A 3D vector (displacement, director, tangent, etc.).
pub type Vec3 = Vector3<f64>;

/// Output field mask: sample node coordinates.
pub const OUTPUT_NODES: u32 = 1 << 0;

/// Output field mask: sample nodal displacements/state.
pub const OUTPUT_DISPLACEMENTS: u32 = 1 << 1;

/// Output field mask: sample recovered strain components.
pub const OUTPUT_STRAINS: u32 = 1 << 2;

/// Output field mask: sample recovered stress components.
pub const OUTPUT_STRESSES: u32 = 1 << 3;

/// All output fields.
pub const OUTPUT_ALL: u32 = OUTPUT_NODES | OUTPUT_DISPLACEMENTS | OUTPUT_STRAINS | OUTPUT_STRESSES;
