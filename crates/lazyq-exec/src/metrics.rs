//! Metrics/tracing hooks.
//!
//! Key/value events only; exporting them is left to whatever subscriber the
//! embedding process installs.

#[cfg(feature = "tracing")]
pub fn emit_span(event: &str, key_values: &[(&str, String)]) {
    let span = tracing::span!(tracing::Level::TRACE, "lazyq", event);
    let _entered = span.enter();
    for (k, v) in key_values {
        tracing::trace!(%event, %k, %v, "metric");
    }
}

#[cfg(not(feature = "tracing"))]
pub fn emit_span(_event: &str, _key_values: &[(&str, String)]) { /* no-op */
}

/// Key/values describing a finished run, in a fixed order.
pub fn run_metrics(report: &crate::runtime::RunReport) -> Vec<(&'static str, String)> {
    vec![
        ("plan", report.plan_hash.short()),
        ("optimized", report.optimized.to_string()),
        ("chunks", report.chunks.to_string()),
        ("records", report.records.to_string()),
        ("elapsed_ms", report.elapsed_ms().to_string()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::RunReport;
    use lazyq_core::hash::hash_str;

    #[test]
    fn test_run_metrics_order() {
        let mut report = RunReport::new(hash_str("values(0)"), hash_str("cfg"), true, Vec::new(), 10);
        report.record_chunk(3);
        let report = report.finish(15);
        let keys: Vec<&str> = run_metrics(&report).iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, vec!["plan", "optimized", "chunks", "records", "elapsed_ms"]);
        assert_eq!(run_metrics(&report)[4].1, "5");
        emit_span("materialize", &run_metrics(&report));
    }
}
