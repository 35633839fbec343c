//! Property-Based Tests for Collection
//!
//! # Test Properties
//!
//! 1. **Candidate Exclusion**: RAID candidates never overlap the basic scan
//! 2. **Version Ordering**: the gate accepts exactly the versions >= 7.1
//! 3. **Serial Dedup**: each serial appears once, whatever the scheduling
//! 4. **Bounded Probing**: the RAID pass queries each task at most once

#![cfg(test)]

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use proptest::prelude::*;

use super::aggregator::{Aggregator, OutputMode};
use super::enumerator::exclude_known;
use super::raid::RaidDialect;
use super::runner::{RunnerConfig, SmartRunner};
use super::version::{evaluate_version, MINIMUM_VERSION};
use crate::adapters::{DeviceFixture, ScriptedExecutor};
use crate::domain::ports::DeviceHandle;

// =============================================================================
// Property Strategies
// =============================================================================

/// Device names drawn from a small pool so lists overlap.
fn names_strategy() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec((0u8..12).prop_map(|i| format!("/dev/sd{}", (b'a' + i) as char)), 0..12)
}

/// (device index, serial index, delay ms) filings.
fn filings_strategy() -> impl Strategy<Value = Vec<(usize, usize, u64)>> {
    prop::collection::vec((0usize..16, 0usize..6, 0u64..4), 1..16)
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(4)
        .enable_all()
        .build()
        .unwrap()
}

fn handles(names: &[String]) -> Vec<DeviceHandle> {
    names.iter().map(|n| DeviceHandle::new(n.as_str())).collect()
}

// =============================================================================
// Enumeration & Version Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_candidates_disjoint_from_basic(basic in names_strategy(), hinted in names_strategy()) {
        let basic = handles(&basic);
        let candidates = exclude_known(&basic, handles(&hinted));

        let known: HashSet<_> = basic.iter().collect();
        for candidate in &candidates {
            prop_assert!(!known.contains(candidate));
            prop_assert!(hinted.contains(&candidate.name));
        }

        let expected = hinted.iter().filter(|h| !basic.iter().any(|b| &b.name == *h)).count();
        prop_assert_eq!(candidates.len(), expected);
    }

    #[test]
    fn prop_version_ordering(major in 0u32..12, minor in 0u32..12) {
        let accepted = evaluate_version(&[major, minor]).is_ok();
        prop_assert_eq!(accepted, (major, minor) >= MINIMUM_VERSION);
    }
}

// =============================================================================
// Concurrency Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_serial_dedup_under_any_schedule(
        filings in filings_strategy(),
        pool_size in 1usize..6,
    ) {
        let executor = Arc::new(ScriptedExecutor::new());

        let mut names = Vec::new();
        let mut serials = HashSet::new();
        for (device, serial, delay) in &filings {
            let name = format!("/dev/disk{}", device);
            if names.contains(&name) {
                continue;
            }
            let fixture = DeviceFixture::new(&name, &format!("SN{}", serial));
            executor.respond_after(
                &format!("-a {} -j", name),
                fixture.to_json(),
                Duration::from_millis(*delay),
            );
            serials.insert(format!("SN{}", serial));
            names.push(name);
        }

        let runner = SmartRunner::new(executor, RunnerConfig { pool_size }).unwrap();
        let aggregator = Arc::new(Aggregator::new(OutputMode::Records));

        let incomplete = runtime()
            .block_on(runner.run_basic_pass(handles(&names), Arc::clone(&aggregator)))
            .unwrap();
        prop_assert!(incomplete.is_empty());

        let results = aggregator.snapshot();
        let records = results.records().unwrap();
        let recorded: HashSet<_> = records.iter().map(|r| r.serial_number.clone()).collect();

        prop_assert_eq!(records.len(), serials.len());
        prop_assert_eq!(recorded, serials);
    }

    #[test]
    fn prop_raid_pass_queries_each_task_at_most_once(candidates in 1usize..4, pool_size in 1usize..5) {
        let executor = Arc::new(ScriptedExecutor::new());
        let bases: Vec<String> = (0..candidates).map(|i| format!("/dev/bus/{}", i)).collect();
        let task_count = candidates * RaidDialect::ALL.len();

        // Every probe answers with a healthy member disk
        for base in &bases {
            for dialect in RaidDialect::ALL {
                for index in 0..=task_count as u32 {
                    let target = dialect.target(base, index);
                    let fixture = DeviceFixture::new(base, &format!("{} {}", dialect, index));
                    executor.respond(&format!("-a {} -j", target), fixture.to_json());
                }
            }
        }

        let runner = SmartRunner::new(executor.clone(), RunnerConfig { pool_size }).unwrap();
        let aggregator = Arc::new(Aggregator::new(OutputMode::Raw));

        runtime().block_on(runner.run_raid_pass(handles(&bases), Arc::clone(&aggregator)));

        let queries = executor.calls().len();
        prop_assert!(queries >= 1);
        prop_assert!(queries <= task_count);
        prop_assert_eq!(aggregator.len(), queries);
    }
}
