//! High-level orchestration: the `apply` entry point combining typing,
//! bonded-term resolution, and side outputs.

pub mod apply;
