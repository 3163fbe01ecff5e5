//! Convenient re-exports for downstream crates.

pub use crate::config::EngineConfig;
pub use crate::error::{Error, Result};
pub use crate::hash::Hash256;
pub use crate::path::{Accessor, FieldPath, IntoAccessor, PathStep};
pub use crate::predicate::Predicate;
pub use crate::value::{Value, ValueKey};
