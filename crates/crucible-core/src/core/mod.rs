//! Foundational data structures and rule handling.
//!
//! This layer has no knowledge of the typing engine: it defines the molecular
//! topology model, the periodic-element table, the substructure pattern
//! language, forcefield rule files, and structure input.

pub mod elements;
pub mod forcefield;
pub mod io;
pub mod models;
pub mod smarts;
