//! The typing engine: atom-type resolution and bonded-term parameter
//! assignment over a topology graph.

pub mod error;
pub mod terms;
pub mod typer;
