//! # Crucible Core Library
//!
//! A library for rule-based atom typing and bonded-parameter assignment in
//! molecular force fields: structures are matched against substructure
//! patterns from declarative rule files, and every bond, angle, and torsion
//! of the topology is resolved to its parameter set.
//!
//! ## Architectural Philosophy
//!
//! The library is designed with a strict three-layer architecture to ensure a
//! clear separation of concerns, making it modular, testable, and extensible.
//!
//! - **[`core`]: The Foundation.** Contains stateless data models
//!   (`MolecularSystem`), the substructure pattern language (`smarts`), the
//!   rule-file registry (`forcefield`), and I/O utilities.
//!
//! - **[`engine`]: The Logic Core.** Resolves each atom to exactly one type
//!   definition (honoring the override relation and residue-template
//!   memoization) and each bonded motif to its best-matching parameter set.
//!
//! - **[`workflows`]: The Public API.** This is the highest-level,
//!   user-facing layer. It ties the `engine` and `core` together into the
//!   `apply` entry point that produces a fully typed structure.

pub mod core;
pub mod engine;
pub mod workflows;
