//! The `tissuefield` crate provides voxelized fields of chemical species
//! concentrations and gradients for multicellular tissue simulations.
pub mod error;
pub mod field;
pub mod geometry;
pub mod grid;
pub mod interpolation;
pub mod io;
pub mod num;
pub mod species;

#[cfg(feature = "serialization")]
pub mod manifest;
