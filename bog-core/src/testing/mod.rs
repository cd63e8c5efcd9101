//! Test fixture builders shared across unit and integration tests.

pub mod helpers;

pub use helpers::*;
