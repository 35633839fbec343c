//! Collector facade: version gate followed by one runner cycle.

use std::sync::Arc;

use tracing::{info, instrument};

use super::aggregator::{OutputMode, ResultSet};
use super::runner::{RunnerConfig, SmartRunner};
use super::version::VersionGate;
use crate::domain::ports::DiagnosticExecutor;
use crate::error::Result;

/// Entry point for one telemetry collection
pub struct SmartCollector {
    executor: Arc<dyn DiagnosticExecutor>,
    gate: Option<Arc<VersionGate>>,
    runner: SmartRunner,
}

impl SmartCollector {
    /// Create a collector using the process-wide version gate.
    pub fn new(executor: Arc<dyn DiagnosticExecutor>, config: RunnerConfig) -> Result<Self> {
        let runner = SmartRunner::new(Arc::clone(&executor), config)?;
        Ok(Self {
            executor,
            gate: Some(VersionGate::global()),
            runner,
        })
    }

    /// Use `gate` instead of the process-wide gate.
    pub fn with_version_gate(mut self, gate: Arc<VersionGate>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Skip the smartctl version check entirely.
    pub fn without_version_check(mut self) -> Self {
        self.gate = None;
        self
    }

    pub fn runner(&self) -> &SmartRunner {
        &self.runner
    }

    /// Check the smartctl version if due, then run a full collection.
    #[instrument(skip(self))]
    pub async fn collect(&self, mode: OutputMode) -> Result<ResultSet> {
        if let Some(gate) = &self.gate {
            gate.ensure_version(self.executor.as_ref()).await?;
        }

        let results = self.runner.execute(mode).await?;
        info!("collection finished with {} entries", results.len());
        Ok(results)
    }
}

impl std::fmt::Debug for SmartCollector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmartCollector")
            .field("gate", &self.gate)
            .field("runner", &self.runner)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{DeviceFixture, ScriptedExecutor};
    use crate::domain::ports::Clock;
    use crate::error::Error;
    use assert_matches::assert_matches;
    use chrono::{DateTime, Utc};

    struct FixedClock(DateTime<Utc>);

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    fn gate() -> Arc<VersionGate> {
        Arc::new(VersionGate::new(Arc::new(FixedClock(Utc::now()))))
    }

    fn config() -> RunnerConfig {
        RunnerConfig { pool_size: 2 }
    }

    #[test]
    fn test_collect_checks_version_first() {
        let executor = Arc::new(ScriptedExecutor::new());
        executor
            .version(&[7, 3])
            .scan(&["/dev/sda"], &[])
            .device(&DeviceFixture::new("/dev/sda", "X1"));

        let collector = SmartCollector::new(executor.clone(), config())
            .unwrap()
            .with_version_gate(gate());

        let results = tokio_test::block_on(collector.collect(OutputMode::Records)).unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(executor.calls()[0], "-j -V");
    }

    #[tokio::test]
    async fn test_unsupported_version_skips_collection() {
        let executor = Arc::new(ScriptedExecutor::new());
        executor.version(&[6, 6]).scan(&["/dev/sda"], &[]);

        let collector = SmartCollector::new(executor.clone(), config())
            .unwrap()
            .with_version_gate(gate());

        assert_matches!(
            collector.collect(OutputMode::Records).await,
            Err(Error::UnsupportedVersion { .. })
        );
        assert_eq!(executor.calls(), vec!["-j -V"]);
    }

    #[tokio::test]
    async fn test_version_checked_once_per_window() {
        let executor = Arc::new(ScriptedExecutor::new());
        executor.version(&[7, 1]).scan(&[], &[]);

        let collector = SmartCollector::new(executor.clone(), config())
            .unwrap()
            .with_version_gate(gate());

        collector.collect(OutputMode::Raw).await.unwrap();
        collector.collect(OutputMode::Raw).await.unwrap();

        assert_eq!(executor.call_count("-j -V"), 1);
        assert_eq!(executor.call_count("--scan -j"), 2);
    }

    #[tokio::test]
    async fn test_without_version_check() {
        let executor = Arc::new(ScriptedExecutor::new());
        executor.scan(&[], &[]);

        let collector = SmartCollector::new(executor.clone(), config())
            .unwrap()
            .without_version_check();
        assert_eq!(collector.runner().config().pool_size, 2);

        let results = collector.collect(OutputMode::Records).await.unwrap();
        assert!(results.is_empty());
        assert_eq!(executor.call_count("-j -V"), 0);
    }
}
