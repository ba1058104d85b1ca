//! Repository implementations module.
//!
//! - `local`: In-memory implementation of every repository trait, used by the
//!   batch binary for local runs and by the tests
pub mod local;

pub use local::LocalRepository;
