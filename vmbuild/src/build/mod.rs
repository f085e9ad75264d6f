//! Build configuration and the shared state steps operate on.

mod config;
mod state;

pub use config::{BuildConfig, DEFAULT_FORMAT};
pub use state::{BuildCtx, BuildState};
