//! Molecular data model: atoms, residues, bonds, and the system graph.
//!
//! All types here are plain data. The system is built once per structure
//! (by a collaborator such as [`crate::core::io::structure`]) and is only
//! mutated afterward by the typing engine, which fills in per-atom type
//! assignments.

pub mod atom;
pub mod ids;
pub mod residue;
pub mod system;
pub mod topology;
