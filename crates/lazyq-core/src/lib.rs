#![forbid(unsafe_code)]
//! lazyq-core: records, field accessors, predicates, config, and hashing.
//!
//! Design intent:
//! - Everything here is pure data plus pure functions; no IO and no threads.
//! - `Value` is the record model the expression layer works over. The chunk
//!   engine in `lazyq-stream` stays generic and never looks inside records.
//! - Accessors and predicates never fail on missing data; an absent field is
//!   an ordinary input, not an error.

pub mod config;
pub mod error;
pub mod hash;
pub mod path;
pub mod predicate;
pub mod prelude;
pub mod value;

pub use error::{Error, Result};
pub use value::Value;

/// Crate version, recorded in run reports for provenance.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
