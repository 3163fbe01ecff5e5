//! Engine configuration that downstream crates can serialize/deserialize.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Maximum records per chunk emitted by in-memory sources.
    pub chunk_size: usize,

    /// Run the plan optimizer (hop fusion, id pushdown) before execution.
    /// Output is identical either way; only the work performed differs.
    pub optimize: bool,

    /// Field holding each record's identity in the backing store.
    pub id_field: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            chunk_size: 256,
            optimize: true,
            id_field: "id".to_string(),
        }
    }
}

impl EngineConfig {
    /// Create a config from environment variables, falling back to defaults.
    ///
    /// Environment variables:
    /// - `LAZYQ_CHUNK_SIZE`: records per source chunk
    /// - `LAZYQ_OPTIMIZE`: `true`/`false`, toggles the plan optimizer
    /// - `LAZYQ_ID_FIELD`: identity field name used by the store
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(s) = std::env::var("LAZYQ_CHUNK_SIZE") {
            if let Ok(v) = s.parse::<usize>() {
                cfg.chunk_size = v;
            }
        }

        if let Ok(s) = std::env::var("LAZYQ_OPTIMIZE") {
            if let Ok(v) = s.parse::<bool>() {
                cfg.optimize = v;
            }
        }

        if let Ok(s) = std::env::var("LAZYQ_ID_FIELD") {
            cfg.id_field = s;
        }

        cfg
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_optimize(mut self, optimize: bool) -> Self {
        self.optimize = optimize;
        self
    }

    pub fn with_id_field(mut self, id_field: impl Into<String>) -> Self {
        self.id_field = id_field.into();
        self
    }

    /// Reject settings the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::Config("chunk_size must be at least 1".into()));
        }
        if self.id_field.trim().is_empty() {
            return Err(Error::Config("id_field must not be empty".into()));
        }
        Ok(())
    }
}
