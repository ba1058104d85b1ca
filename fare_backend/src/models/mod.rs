//! Domain records shared by the analytics engine and the storage layer.

pub mod macros;
pub mod observation;
pub mod package;

pub use observation::*;
pub use package::*;
