use thiserror::Error;

/// Canonical result for the lazyq crates.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Programmer error caught while a query is being assembled.
    #[error("misuse: {0}")]
    Misuse(String),

    #[error("invalid field path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    /// A caller-supplied predicate, mapper, or key function failed.
    #[error("user function failed: {0}")]
    Lambda(String),

    #[error("store error: {0}")]
    Store(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("hashing error: {0}")]
    Hash(String),
}

impl Error {
    /// Convenience for closures that want to fail with a message.
    pub fn lambda(msg: impl Into<String>) -> Self {
        Error::Lambda(msg.into())
    }
}
