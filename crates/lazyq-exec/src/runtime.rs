//! Runtime: plan a query, optimize it, pull it to completion, and report.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use lazyq_core::config::EngineConfig;
use lazyq_core::hash::{hash_serde, Hash256};
use lazyq_core::Value;
use lazyq_planner::{optimize, Plan};
use lazyq_stream::{BoxStream, ChunkStream, ChunkStreamExt, Guarded};

use crate::metrics::{emit_span, run_metrics};
use crate::query::Query;

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("invalid engine config: {0}")]
    Config(String),
    #[error("hashing error: {0}")]
    Hash(String),
    /// The pull failed: a store read or a caller-supplied function.
    #[error("query failed: {0}")]
    Query(#[from] lazyq_core::Error),
}

/// What a run did, for logs and provenance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    /// Hash of the executed (post-optimization) plan's explain text.
    pub plan_hash: Hash256,

    /// Hash of the engine config the run used.
    pub config_hash: Hash256,

    /// Engine version string for provenance.
    pub engine_version: String,

    pub optimized: bool,

    /// Store collections the plan reads.
    pub datasets: Vec<String>,

    /// Chunks pulled from the final stream, empty ones included.
    pub chunks: u64,
    pub records: u64,

    /// Milliseconds since Unix epoch (UTC).
    pub started_ms: u64,
    pub finished_ms: u64,
}

impl RunReport {
    pub fn new(
        plan_hash: Hash256,
        config_hash: Hash256,
        optimized: bool,
        datasets: Vec<String>,
        started_ms: u64,
    ) -> Self {
        Self {
            plan_hash,
            config_hash,
            engine_version: lazyq_core::VERSION.to_string(),
            optimized,
            datasets,
            chunks: 0,
            records: 0,
            started_ms,
            finished_ms: started_ms,
        }
    }

    pub fn record_chunk(&mut self, len: usize) {
        self.chunks += 1;
        self.records += len as u64;
    }

    pub fn finish(mut self, finished_ms: u64) -> Self {
        self.finished_ms = finished_ms;
        self
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.finished_ms.saturating_sub(self.started_ms)
    }
}

/// Engine owns the execution settings; queries carry everything else.
#[derive(Debug, Clone, Default)]
pub struct Engine {
    cfg: EngineConfig,
}

impl Engine {
    pub fn new(cfg: EngineConfig) -> Result<Self, ExecError> {
        cfg.validate()
            .map_err(|e| ExecError::Config(e.to_string()))?;
        Ok(Self { cfg })
    }

    /// Engine configured from `LAZYQ_*` environment variables.
    pub fn from_env() -> Result<Self, ExecError> {
        Self::new(EngineConfig::from_env())
    }

    pub fn config(&self) -> &EngineConfig {
        &self.cfg
    }

    /// The plan `run` would execute for `query`.
    ///
    /// Every store the query reads must key its records by the configured
    /// `id_field`; id pushdown relies on it.
    pub fn prepare(&self, query: &Query) -> Result<Plan, ExecError> {
        let plan = query.plan();
        if let Some(other) = plan
            .store_id_fields()
            .into_iter()
            .find(|field| *field != self.cfg.id_field)
        {
            return Err(ExecError::Config(format!(
                "query reads a store keyed by '{}' but the engine expects '{}'",
                other, self.cfg.id_field
            )));
        }
        Ok(if self.cfg.optimize { optimize(plan) } else { plan })
    }

    fn start(&self, query: &Query) -> Result<(Guarded<BoxStream<Value>>, RunReport), ExecError> {
        let started_ms = now_millis();
        let config_hash = hash_serde(&self.cfg).map_err(|e| ExecError::Hash(e.to_string()))?;
        let plan = self.prepare(query)?;
        let datasets = plan.implicated_datasets().into_iter().collect();
        let report = RunReport::new(
            plan.fingerprint(),
            config_hash,
            self.cfg.optimize,
            datasets,
            started_ms,
        );

        #[cfg(feature = "tracing")]
        tracing::debug!(
            plan = %report.plan_hash.short(),
            explain = %plan.explain(),
            chunk_size = self.cfg.chunk_size,
            "starting query"
        );

        Ok((plan.into_stream(self.cfg.chunk_size).guarded(), report))
    }

    fn finish(&self, report: RunReport) -> RunReport {
        let report = report.finish(now_millis());

        #[cfg(feature = "tracing")]
        tracing::debug!(
            plan = %report.plan_hash.short(),
            chunks = report.chunks,
            records = report.records,
            elapsed_ms = report.elapsed_ms(),
            "query finished"
        );

        emit_span("materialize", &run_metrics(&report));
        report
    }

    /// Pull `query` to completion. Chunks are concatenated in the order they
    /// were produced; the first error ends the run and closes the stream.
    pub fn run(&self, query: &Query) -> Result<(Vec<Value>, RunReport), ExecError> {
        let (mut stream, mut report) = self.start(query)?;
        let mut out = Vec::new();
        while let Some(chunk) = stream.next_chunk()? {
            #[cfg(feature = "tracing")]
            tracing::trace!(chunk = report.chunks, len = chunk.len(), "pulled chunk");

            report.record_chunk(chunk.len());
            out.extend(chunk);
        }
        drop(stream);
        Ok((out, self.finish(report)))
    }

    pub fn materialize(&self, query: &Query) -> Result<Vec<Value>, ExecError> {
        self.run(query).map(|(records, _)| records)
    }

    /// Same output as `run`, yielding to the runtime after every chunk.
    #[cfg(feature = "async")]
    pub async fn run_async(&self, query: &Query) -> Result<(Vec<Value>, RunReport), ExecError> {
        let (mut stream, mut report) = self.start(query)?;
        let mut out = Vec::new();
        while let Some(chunk) = stream.next_chunk()? {
            report.record_chunk(chunk.len());
            out.extend(chunk);
            tokio::task::yield_now().await;
        }
        drop(stream);
        Ok((out, self.finish(report)))
    }

    #[cfg(feature = "async")]
    pub async fn materialize_async(&self, query: &Query) -> Result<Vec<Value>, ExecError> {
        self.run_async(query).await.map(|(records, _)| records)
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::from_collection;
    use lazyq_core::predicate::Predicate;
    use lazyq_core::Error;
    use lazyq_store::MemoryStore;
    use serde_json::json;

    fn numbers(n: i64) -> Query {
        from_collection((0..n).map(Value::from))
    }

    #[test]
    fn test_invalid_config_rejected() {
        let err = Engine::new(EngineConfig::default().with_chunk_size(0)).unwrap_err();
        assert!(matches!(err, ExecError::Config(_)));
    }

    #[test]
    fn test_report_counts_chunks_and_records() {
        let engine = Engine::new(EngineConfig::default().with_chunk_size(4)).unwrap();
        let (out, report) = engine.run(&numbers(10)).unwrap();
        assert_eq!(out.len(), 10);
        assert_eq!(report.chunks, 3);
        assert_eq!(report.records, 10);
        assert!(report.finished_ms >= report.started_ms);
        assert_eq!(report.engine_version, lazyq_core::VERSION);
    }

    #[test]
    fn test_fingerprint_reflects_optimization() {
        let store = MemoryStore::new();
        store
            .upsert("farmers", vec![Value::from(json!({"id": 1, "name": "Brown"}))])
            .unwrap();
        let q = Query::all(&store, "farmers")
            .unwrap()
            .where_("id", Predicate::equals(1))
            .unwrap();
        let on = Engine::default();
        let off = Engine::new(EngineConfig::default().with_optimize(false)).unwrap();
        let (a, ra) = on.run(&q).unwrap();
        let (b, rb) = off.run(&q).unwrap();
        assert_eq!(a, b);
        assert_ne!(ra.plan_hash, rb.plan_hash);
        assert_ne!(ra.config_hash, rb.config_hash);
        assert_eq!(ra.datasets, vec!["farmers".to_string()]);
        assert_eq!(on.prepare(&q).unwrap().explain(), "scan(farmers ids=[1])");
    }

    #[test]
    fn test_id_field_must_match_store() {
        let store = MemoryStore::with_id_field("key");
        store
            .upsert("farmers", vec![Value::from(json!({"key": "b", "name": "Brown"}))])
            .unwrap();
        let q = Query::all(&store, "farmers")
            .unwrap()
            .where_("key", Predicate::equals("b"))
            .unwrap();

        let err = Engine::default().run(&q).unwrap_err();
        assert!(matches!(err, ExecError::Config(_)));

        let keyed = Engine::new(EngineConfig::default().with_id_field("key")).unwrap();
        assert_eq!(keyed.prepare(&q).unwrap().explain(), "scan(farmers ids=[\"b\"])");
        assert_eq!(keyed.materialize(&q).unwrap().len(), 1);

        // value-only queries read no store
        assert!(keyed.materialize(&numbers(2)).is_ok());
    }

    #[test]
    fn test_lambda_error_surfaces_as_query_error() {
        let q = numbers(5).try_map(|v| {
            if v == Value::from(3) {
                Err(Error::lambda("three"))
            } else {
                Ok(v)
            }
        });
        let err = Engine::default().materialize(&q).unwrap_err();
        assert!(matches!(err, ExecError::Query(Error::Lambda(_))));
    }

    #[test]
    fn test_comparator_error_surfaces_as_query_error() {
        let q = numbers(10).try_order_by_comparator(|a, b| {
            if *a == Value::from(7) || *b == Value::from(7) {
                Err(Error::lambda("cannot order 7"))
            } else {
                Ok(b.total_cmp(a))
            }
        });
        let err = Engine::default().materialize(&q).unwrap_err();
        assert!(matches!(err, ExecError::Query(Error::Lambda(_))));

        let ok = numbers(3).try_order_by_comparator(|a, b| Ok(b.total_cmp(a)));
        assert_eq!(
            Engine::default().materialize(&ok).unwrap(),
            vec![Value::from(2), Value::from(1), Value::from(0)]
        );
    }

    #[test]
    fn test_report_serializes() {
        let (_, report) = Engine::default().run(&numbers(1)).unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["records"], json!(1));
        let back: RunReport = serde_json::from_value(json).unwrap();
        assert_eq!(back, report);
    }

    #[cfg(feature = "async")]
    #[tokio::test]
    async fn test_async_matches_sync() {
        let q = numbers(7).take(5);
        let engine = Engine::new(EngineConfig::default().with_chunk_size(2)).unwrap();
        let sync = engine.materialize(&q).unwrap();
        let asynced = engine.materialize_async(&q).await.unwrap();
        assert_eq!(sync, asynced);
    }
}
