//! Shared library half of the `bog-bins` crate: CLI plumbing and the
//! dual-account controller, both consumed by `src/bin/dual_grid.rs`.

pub mod common;
pub mod controller;
