//! Grab bag of small utilities shared across `knit` crates.

pub mod assert;
pub mod env;
pub mod id_gen;
