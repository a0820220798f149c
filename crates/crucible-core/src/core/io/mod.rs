//! Structure input: converting external structure descriptions into the
//! topology graph the typing engine operates on.

pub mod structure;
