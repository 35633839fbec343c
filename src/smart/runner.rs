//! Query Runner
//!
//! Two fixed-size worker pools that query smartctl for every enumerated
//! device, then probe suspected RAID controllers for member disks.
//!
//! # Passes
//!
//! ```text
//! names ──▶ [basic workers] ──▶ results
//!                 │
//!                 └── incomplete ──┐
//! raid candidates ─────────────────┴──▶ tasks ──▶ [raid workers] ──▶ results
//! ```
//!
//! The basic pass aborts on the first fatal error. The RAID pass never fails:
//! each RAID worker carries one member index across the tasks it dequeues,
//! issues a single query per task, and retires on its first failed probe.

use std::sync::Arc;

use tokio::sync::{mpsc, Mutex as AsyncMutex};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, trace};

use super::aggregator::{Aggregator, ResultSet};
use super::enumerator::DeviceEnumerator;
use super::raid::RaidProbeTask;
use super::types::DeviceRecord;
use super::OutputMode;
use crate::domain::ports::{DeviceHandle, DiagnosticExecutor};
use crate::error::{Error, Result};

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for the query runner
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Workers per pool
    pub pool_size: usize,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            pool_size: default_pool_size(),
        }
    }
}

impl RunnerConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.pool_size == 0 {
            return Err(Error::Config("pool_size must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// Available CPU parallelism, at least 1.
pub fn default_pool_size() -> usize {
    std::thread::available_parallelism()
        .map_or(1, usize::from)
        .max(1)
}

type SharedQueue<T> = Arc<AsyncMutex<mpsc::Receiver<T>>>;

/// Load `items` into a closed queue shared by all workers.
fn closed_queue<T>(items: Vec<T>) -> SharedQueue<T> {
    let (tx, rx) = mpsc::channel(items.len().max(1));
    for item in items {
        // Capacity covers every item and the receiver is alive
        let _ = tx.try_send(item);
    }
    Arc::new(AsyncMutex::new(rx))
}

async fn dequeue<T>(queue: &SharedQueue<T>) -> Option<T> {
    queue.lock().await.recv().await
}

/// Query one device target and decode the response.
async fn query_device(
    executor: &dyn DiagnosticExecutor,
    target: &str,
) -> Result<(DeviceRecord, Vec<u8>)> {
    let raw = executor.execute(&format!("-a {} -j", target), false).await?;
    let record = DeviceRecord::from_slice(&raw)?;
    record.check_tool_error()?;
    Ok((record, raw))
}

// =============================================================================
// Runner
// =============================================================================

/// Runs the enumeration, basic and RAID passes against one executor
pub struct SmartRunner {
    executor: Arc<dyn DiagnosticExecutor>,
    config: RunnerConfig,
}

impl SmartRunner {
    /// Create a new runner
    pub fn new(executor: Arc<dyn DiagnosticExecutor>, config: RunnerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { executor, config })
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Run one full collection cycle.
    ///
    /// Returns the aggregated result set, or the first fatal error from
    /// enumeration or the basic pass.
    #[instrument(skip(self))]
    pub async fn execute(&self, mode: OutputMode) -> Result<ResultSet> {
        let enumeration = DeviceEnumerator::new(Arc::clone(&self.executor))
            .enumerate()
            .await?;

        let aggregator = Arc::new(Aggregator::new(mode));

        let incomplete = self
            .run_basic_pass(enumeration.basic, Arc::clone(&aggregator))
            .await?;

        let mut candidates = enumeration.raid_candidates;
        candidates.extend(incomplete);

        self.run_raid_pass(candidates, Arc::clone(&aggregator)).await;

        let results = match Arc::try_unwrap(aggregator) {
            Ok(aggregator) => aggregator.into_results(),
            Err(shared) => shared.snapshot(),
        };

        info!("collected {} device entries", results.len());
        Ok(results)
    }

    /// Query every device in `names`, filing results into `aggregator`.
    ///
    /// Returns the devices flagged incomplete. The first fatal error stops
    /// the pass; workers still in flight are told to stop pulling names and
    /// are not awaited.
    #[instrument(skip(self, names, aggregator), fields(devices = names.len()))]
    pub async fn run_basic_pass(
        &self,
        names: Vec<DeviceHandle>,
        aggregator: Arc<Aggregator>,
    ) -> Result<Vec<DeviceHandle>> {
        let queue = closed_queue(names);
        let cancel = CancellationToken::new();
        let (err_tx, mut err_rx) = mpsc::channel::<Error>(self.config.pool_size);

        let mut workers = JoinSet::new();
        for worker_id in 0..self.config.pool_size {
            workers.spawn(basic_worker(
                worker_id,
                Arc::clone(&self.executor),
                Arc::clone(&queue),
                Arc::clone(&aggregator),
                err_tx.clone(),
                cancel.clone(),
            ));
        }
        drop(err_tx);

        let outcome = tokio::select! {
            biased;
            Some(err) = err_rx.recv() => Err(err),
            drained = drain(&mut workers) => drained,
        };

        if let Err(e) = outcome {
            debug!("basic pass aborted: {}", e);
            cancel.cancel();
            workers.detach_all();
            return Err(e);
        }

        // A worker may have latched an error just before the pool drained
        if let Ok(err) = err_rx.try_recv() {
            return Err(err);
        }

        Ok(aggregator.take_incomplete())
    }

    /// Probe every candidate with every RAID dialect, filing member disks
    /// into `aggregator`. Best effort; never fails.
    #[instrument(skip(self, candidates, aggregator), fields(candidates = candidates.len()))]
    pub async fn run_raid_pass(&self, candidates: Vec<DeviceHandle>, aggregator: Arc<Aggregator>) {
        let tasks = RaidProbeTask::expand(&candidates);
        if tasks.is_empty() {
            return;
        }

        let queue = closed_queue(tasks);

        let mut workers = JoinSet::new();
        for worker_id in 0..self.config.pool_size {
            workers.spawn(raid_worker(
                worker_id,
                Arc::clone(&self.executor),
                Arc::clone(&queue),
                Arc::clone(&aggregator),
            ));
        }

        if let Err(e) = drain(&mut workers).await {
            debug!("RAID pass worker did not finish cleanly: {}", e);
        }
    }
}

impl std::fmt::Debug for SmartRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmartRunner")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Wait for every worker to exit.
async fn drain(workers: &mut JoinSet<()>) -> Result<()> {
    while let Some(joined) = workers.join_next().await {
        joined.map_err(|e| Error::Internal(format!("worker task failed: {}", e)))?;
    }
    Ok(())
}

// =============================================================================
// Workers
// =============================================================================

async fn basic_worker(
    worker_id: usize,
    executor: Arc<dyn DiagnosticExecutor>,
    queue: SharedQueue<DeviceHandle>,
    aggregator: Arc<Aggregator>,
    errors: mpsc::Sender<Error>,
    cancel: CancellationToken,
) {
    loop {
        let device = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            device = dequeue(&queue) => device,
        };
        let Some(device) = device else { break };

        let (record, raw) = match query_device(executor.as_ref(), device.as_str()).await {
            Ok(response) => response,
            Err(e) => {
                debug!(worker = worker_id, "{}: fatal query error: {}", device, e);
                // First error wins; later ones are dropped
                let _ = errors.try_send(e);
                return;
            }
        };

        let outcome = aggregator.record_basic(&device, record, &raw);
        trace!(worker = worker_id, "{}: {:?}", device, outcome);
    }
}

/// Drain RAID tasks with one member index shared by every task this worker
/// dequeues. The first failed probe, or a recorded `sat` member, retires the
/// worker.
async fn raid_worker(
    worker_id: usize,
    executor: Arc<dyn DiagnosticExecutor>,
    queue: SharedQueue<RaidProbeTask>,
    aggregator: Arc<Aggregator>,
) {
    let mut index: u32 = 0;

    while let Some(task) = dequeue(&queue).await {
        let policy = task.dialect.policy();
        if index == 0 {
            index = policy.start_index;
        }

        let target = task.dialect.target(task.base.as_str(), index);
        let (record, raw) = match query_device(executor.as_ref(), &target).await {
            Ok(response) => response,
            Err(e) => {
                trace!(
                    worker = worker_id,
                    "stopped looking for RAID devices of {} type behind {}: {}",
                    task.dialect,
                    task.base,
                    e
                );
                return;
            }
        };

        let member = task.dialect.member_name(task.base.as_str(), index);
        if aggregator.record_raid(member, record, &raw) && policy.single_shot {
            trace!(worker = worker_id, "{}: {} member recorded", task.base, task.dialect);
            return;
        }

        index += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{DeviceFixture, ScriptedExecutor};
    use assert_matches::assert_matches;
    use std::time::Duration;

    fn runner(executor: &Arc<ScriptedExecutor>, pool_size: usize) -> SmartRunner {
        SmartRunner::new(executor.clone(), RunnerConfig { pool_size }).unwrap()
    }

    fn handles(names: &[&str]) -> Vec<DeviceHandle> {
        names.iter().map(|n| DeviceHandle::new(*n)).collect()
    }

    #[test]
    fn test_config_validation() {
        assert!(RunnerConfig::default().validate().is_ok());
        assert_eq!(runner(&Arc::new(ScriptedExecutor::new()), 3).config().pool_size, 3);
        assert!(RunnerConfig::default().pool_size >= 1);
        assert_matches!(
            RunnerConfig { pool_size: 0 }.validate(),
            Err(Error::Config(_))
        );
    }

    #[tokio::test]
    async fn test_basic_pass_files_devices() {
        let executor = Arc::new(ScriptedExecutor::new());
        executor
            .device(&DeviceFixture::new("/dev/sda", "X1"))
            .device(&DeviceFixture::new("/dev/sdb", "V1").exit_status(4))
            .device(&DeviceFixture::new("/dev/sdc", "U1").without_health())
            .device(&DeviceFixture::new("/dev/sdd", "X1"));

        let aggregator = Arc::new(Aggregator::new(OutputMode::Records));
        let incomplete = runner(&executor, 3)
            .run_basic_pass(
                handles(&["/dev/sda", "/dev/sdb", "/dev/sdc", "/dev/sdd"]),
                Arc::clone(&aggregator),
            )
            .await
            .unwrap();

        assert_eq!(incomplete, handles(&["/dev/sdb"]));
        let results = aggregator.snapshot();
        let records = results.records().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].serial_number, "X1");
    }

    #[tokio::test]
    async fn test_basic_pass_tool_error_is_fatal() {
        let executor = Arc::new(ScriptedExecutor::new());
        executor
            .device(&DeviceFixture::new("/dev/sda", "X1"))
            .device(
                &DeviceFixture::new("/dev/sdq", "")
                    .exit_status(2)
                    .message("Smartctl open device: /dev/sdq failed")
                    .message("No such device"),
            );

        let aggregator = Arc::new(Aggregator::new(OutputMode::Records));
        let err = runner(&executor, 1)
            .run_basic_pass(handles(&["/dev/sda", "/dev/sdq"]), aggregator)
            .await
            .unwrap_err();

        assert_matches!(
            err,
            Error::ToolReported(msg)
                if msg == "Smartctl open device: /dev/sdq failed, No such device"
        );
    }

    #[tokio::test]
    async fn test_basic_pass_execution_error_stops_pulling() {
        let executor = Arc::new(ScriptedExecutor::new());
        executor.fail("-a /dev/sda -j", "permission denied");
        for name in ["/dev/sdb", "/dev/sdc", "/dev/sdd"] {
            executor.device(&DeviceFixture::new(name, name));
        }

        let aggregator = Arc::new(Aggregator::new(OutputMode::Records));
        let err = runner(&executor, 1)
            .run_basic_pass(
                handles(&["/dev/sda", "/dev/sdb", "/dev/sdc", "/dev/sdd"]),
                aggregator,
            )
            .await
            .unwrap_err();

        assert_matches!(err, Error::Execution(_));
        // Single worker: nothing after the failing device is queried
        assert_eq!(executor.calls(), vec!["-a /dev/sda -j"]);
    }

    #[tokio::test]
    async fn test_basic_pass_decode_error_is_fatal() {
        let executor = Arc::new(ScriptedExecutor::new());
        executor.respond("-a /dev/sda -j", "Segmentation fault");

        let aggregator = Arc::new(Aggregator::new(OutputMode::Records));
        let err = runner(&executor, 2)
            .run_basic_pass(handles(&["/dev/sda"]), aggregator)
            .await
            .unwrap_err();

        assert_matches!(err, Error::Decode(_));
    }

    #[tokio::test]
    async fn test_basic_pass_does_not_wait_for_slow_workers() {
        let executor = Arc::new(ScriptedExecutor::new());
        executor.fail("-a /dev/sda -j", "boom");
        executor.respond_after(
            "-a /dev/sdb -j",
            DeviceFixture::new("/dev/sdb", "S").to_json(),
            Duration::from_secs(30),
        );

        let aggregator = Arc::new(Aggregator::new(OutputMode::Records));
        let started = std::time::Instant::now();
        let result = runner(&executor, 2)
            .run_basic_pass(handles(&["/dev/sda", "/dev/sdb"]), aggregator)
            .await;

        assert!(result.is_err());
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_basic_pass_empty_queue() {
        let executor = Arc::new(ScriptedExecutor::new());
        let aggregator = Arc::new(Aggregator::new(OutputMode::Records));

        let incomplete = runner(&executor, 4)
            .run_basic_pass(Vec::new(), Arc::clone(&aggregator))
            .await
            .unwrap();

        assert!(incomplete.is_empty());
        assert!(aggregator.is_empty());
        assert!(executor.calls().is_empty());
    }

    #[tokio::test]
    async fn test_basic_pass_abandons_queue_after_abort() {
        let executor = Arc::new(ScriptedExecutor::new());
        executor.fail("-a /dev/sda -j", "permission denied");
        executor.respond_after(
            "-a /dev/sdb -j",
            DeviceFixture::new("/dev/sdb", "B").to_json(),
            Duration::from_millis(20),
        );
        let mut names = vec!["/dev/sda".to_string(), "/dev/sdb".to_string()];
        for i in 0..20 {
            let name = format!("/dev/queued{}", i);
            executor.device(&DeviceFixture::new(&name, &name));
            names.push(name);
        }

        let devices = names.iter().map(|n| DeviceHandle::new(n.as_str())).collect();
        let aggregator = Arc::new(Aggregator::new(OutputMode::Records));
        let result = runner(&executor, 2).run_basic_pass(devices, aggregator).await;
        assert_matches!(result, Err(Error::Execution(_)));

        // Let the in-flight query finish
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(executor.calls_containing("queued").is_empty());
    }

    #[tokio::test]
    async fn test_raid_worker_stops_at_first_failure() {
        let executor = Arc::new(ScriptedExecutor::new());
        executor
            .raid_member("/dev/sda", "3ware,0", &DeviceFixture::new("/dev/sda", "T0"))
            .raid_member("/dev/sda", "areca,1", &DeviceFixture::new("/dev/sda", "A1"))
            .raid_member("/dev/sda", "megaraid,3", &DeviceFixture::new("/dev/sda", "M3"));

        let aggregator = Arc::new(Aggregator::new(OutputMode::Records));
        runner(&executor, 1)
            .run_raid_pass(handles(&["/dev/sda"]), Arc::clone(&aggregator))
            .await;

        let results = aggregator.snapshot();
        let names: Vec<_> = results
            .records()
            .unwrap()
            .iter()
            .map(|r| r.info.name.clone())
            .collect();
        assert_eq!(names, vec!["/dev/sda 3ware,0", "/dev/sda areca,1"]);

        // cciss,2 fails and retires the only worker
        assert_eq!(
            executor.calls(),
            vec![
                "-a /dev/sda -d 3ware,0 -j",
                "-a /dev/sda -d areca,1 -j",
                "-a /dev/sda -d cciss,2 -j",
            ]
        );
    }

    #[tokio::test]
    async fn test_raid_pass_is_bounded_by_task_count() {
        let executor = Arc::new(ScriptedExecutor::new());
        for index in 0..64 {
            executor.raid_member(
                "/dev/sda",
                &format!("megaraid,{}", index),
                &DeviceFixture::new("/dev/sda", &format!("M{}", index)),
            );
        }

        let aggregator = Arc::new(Aggregator::new(OutputMode::Records));
        let pool = runner(&executor, 5);
        let pass = pool.run_raid_pass(handles(&["/dev/sda"]), Arc::clone(&aggregator));
        tokio::time::timeout(Duration::from_secs(5), pass)
            .await
            .expect("RAID pass must terminate");

        assert_eq!(
            executor.calls_containing("megaraid"),
            vec!["-a /dev/sda -d megaraid,0 -j"]
        );
        assert_eq!(aggregator.len(), 1);
        assert!(executor.calls().len() <= 5);
    }

    #[tokio::test]
    async fn test_worker_index_carries_across_tasks() {
        let executor = Arc::new(ScriptedExecutor::new());
        executor
            .raid_member("/dev/sda", "3ware,0", &DeviceFixture::new("/dev/sda", "T0"))
            .raid_member("/dev/sda", "areca,1", &DeviceFixture::new("/dev/sda", "A1"))
            .raid_member("/dev/sda", "cciss,2", &DeviceFixture::new("/dev/sda", "C2"))
            .raid_member("/dev/sda", "megaraid,3", &DeviceFixture::new("/dev/sda", "M3"))
            .raid_member("/dev/sda", "sat", &DeviceFixture::new("/dev/sda", "S").without_health())
            .raid_member("/dev/sdb", "3ware,5", &DeviceFixture::new("/dev/sdb", "T5"));

        let aggregator = Arc::new(Aggregator::new(OutputMode::Records));
        runner(&executor, 1)
            .run_raid_pass(handles(&["/dev/sda", "/dev/sdb"]), Arc::clone(&aggregator))
            .await;

        assert_eq!(aggregator.len(), 5);
        // Areca only starts at 1 for a fresh worker
        assert_eq!(
            executor.calls_containing("/dev/sdb -d areca"),
            vec!["-a /dev/sdb -d areca,6 -j"]
        );
        assert!(executor.calls_containing("/dev/sdb -d cciss").is_empty());
    }

    #[tokio::test]
    async fn test_raid_pass_areca_starts_at_one() {
        let executor = Arc::new(ScriptedExecutor::new());
        executor.raid_member("/dev/sg1", "areca,1", &DeviceFixture::new("/dev/sg1", "A1"));

        // One task per worker, so every worker starts fresh
        let aggregator = Arc::new(Aggregator::new(OutputMode::Records));
        runner(&executor, 5)
            .run_raid_pass(handles(&["/dev/sg1"]), Arc::clone(&aggregator))
            .await;

        assert_eq!(
            executor.calls_containing("areca"),
            vec!["-a /dev/sg1 -d areca,1 -j"]
        );
        for dialect in ["3ware", "cciss", "megaraid"] {
            assert!(executor.calls_containing(&format!("{},0", dialect)).len() <= 1);
        }
        assert_eq!(aggregator.len(), 1);
    }

    #[tokio::test]
    async fn test_raid_pass_sat_retires_worker() {
        let executor = Arc::new(ScriptedExecutor::new());
        executor
            .raid_member("/dev/sda", "3ware,0", &DeviceFixture::new("/dev/sda", "T0"))
            .raid_member("/dev/sda", "areca,1", &DeviceFixture::new("/dev/sda", "A1"))
            .raid_member("/dev/sda", "cciss,2", &DeviceFixture::new("/dev/sda", "C2"))
            .raid_member("/dev/sda", "megaraid,3", &DeviceFixture::new("/dev/sda", "M3"))
            .raid_member("/dev/sda", "sat", &DeviceFixture::new("/dev/sda", "S1"))
            .raid_member("/dev/sdb", "3ware,0", &DeviceFixture::new("/dev/sdb", "T0"));

        let aggregator = Arc::new(Aggregator::new(OutputMode::Raw));
        runner(&executor, 1)
            .run_raid_pass(handles(&["/dev/sda", "/dev/sdb"]), Arc::clone(&aggregator))
            .await;

        assert_eq!(executor.call_count("-a /dev/sda -d sat -j"), 1);
        assert!(executor.calls_containing("/dev/sdb").is_empty());

        let results = aggregator.snapshot();
        let raw = results.raw().unwrap();
        assert_eq!(raw.len(), 5);
        assert!(raw.contains_key("/dev/sda sat,4"));
    }

    #[tokio::test]
    async fn test_raid_pass_without_verdict_keeps_probing() {
        let executor = Arc::new(ScriptedExecutor::new());
        executor
            .raid_member(
                "/dev/sda",
                "3ware,0",
                &DeviceFixture::new("/dev/sda", "T0").without_health(),
            )
            .raid_member("/dev/sda", "areca,1", &DeviceFixture::new("/dev/sda", "A1"));

        let aggregator = Arc::new(Aggregator::new(OutputMode::Records));
        runner(&executor, 1)
            .run_raid_pass(handles(&["/dev/sda"]), Arc::clone(&aggregator))
            .await;

        let results = aggregator.snapshot();
        let records = results.records().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].info.name, "/dev/sda areca,1");
        assert_eq!(executor.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_execute_end_to_end() {
        let executor = Arc::new(ScriptedExecutor::new());
        executor
            .scan(&["/dev/sda", "/dev/sdb"], &["/dev/sda"])
            .device(&DeviceFixture::new("/dev/sda", "X1"))
            .device(&DeviceFixture::new("/dev/sdb", "V1").exit_status(4))
            .raid_member("/dev/sdb", "3ware,0", &DeviceFixture::new("/dev/bus/0", "M0"));

        let results = runner(&executor, 2)
            .execute(OutputMode::Records)
            .await
            .unwrap();

        let mut serials: Vec<_> = results
            .records()
            .unwrap()
            .iter()
            .map(|r| r.serial_number.clone())
            .collect();
        serials.sort();
        assert_eq!(serials, vec!["M0", "X1"]);
        assert!(executor.calls_containing("/dev/sda -d").is_empty());
    }
}
