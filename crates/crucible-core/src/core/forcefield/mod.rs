//! Rule-file loading, the merged type registry, and rule-file emission.
//!
//! A forcefield is assembled from one or more XML rule-file sources. Sources
//! are parsed individually ([`xml`]), then merged into a single immutable
//! registry ([`registry`]) that compiles type patterns, resolves the override
//! relation, and assigns the global definition order used for tie-breaks.
//! The registry can be serialized back out for a typed structure ([`writer`])
//! together with a citation bibliography ([`references`]).

pub mod params;
pub mod references;
pub mod registry;
pub mod writer;
pub mod xml;
