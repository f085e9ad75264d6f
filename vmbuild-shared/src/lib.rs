//! Types shared between vmbuild crates.

pub mod errors;

pub use errors::{BuildError, BuildResult};
