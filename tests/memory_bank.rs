//! Integration tests for the confidence-scored memory bank.
//!
//! Runs through the service container so memories, feedback and consolidation share one
//! store the way a host process wires them.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use contextfold::config::MemoryGranularity;
use contextfold::models::{ConsolidationOptions, EntryKind};
use contextfold::services::RecordMemory;
use contextfold::{CoreConfig, MemoryStatus, Outcome, ServiceContainer};

const KAFKA_A: &str = "restart the ingest worker after upgrading the kafka client library";
const KAFKA_B: &str = "restart the ingest worker after upgrading the kafka client library today";
const LONE: &str = "a lone memory about formatting markdown tables";

fn services() -> ServiceContainer {
    ServiceContainer::from_config(&CoreConfig::default()).unwrap()
}

fn seed(services: &ServiceContainer) -> Vec<contextfold::MemoryId> {
    [KAFKA_A, KAFKA_B, LONE]
        .into_iter()
        .map(|content| {
            services
                .memory()
                .record(RecordMemory::new("repo", "ingest", content, Outcome::Success))
                .unwrap()
                .id
        })
        .collect()
}

#[test]
fn test_confidence_follows_feedback_and_outcomes() {
    let services = services();
    let memory = services.memory();
    let entry = memory
        .record(RecordMemory::new(
            "repo",
            "read replica",
            "route analytics queries to the read replica",
            Outcome::Success,
        ))
        .unwrap();
    assert!((entry.confidence - 0.5).abs() < 1e-6);

    let helpful = memory.feedback(&entry.id, true).unwrap();
    assert!((helpful.confidence - 0.6).abs() < 1e-6);

    let failed = memory.outcome(&entry.id, false, Some("session-9")).unwrap();
    assert!((failed.previous - 0.6).abs() < 1e-6);
    assert!((failed.confidence - 0.45).abs() < 1e-6);
}

#[test]
fn test_confidence_stays_in_unit_interval() {
    let services = services();
    let memory = services.memory();
    let entry = memory
        .record(RecordMemory::new("repo", "t", "pin the toolchain", Outcome::Success))
        .unwrap();
    for _ in 0..12 {
        memory.feedback(&entry.id, true).unwrap();
    }
    assert!((memory.get(&entry.id).unwrap().confidence - 1.0).abs() < 1e-6);
    for _ in 0..12 {
        memory.feedback(&entry.id, false).unwrap();
    }
    assert!(memory.get(&entry.id).unwrap().confidence.abs() < 1e-6);
}

#[test]
fn test_consolidation_replaces_duplicates() {
    let services = services();
    let memory = services.memory();
    let ids = seed(&services);

    let report = memory
        .consolidate("repo", ConsolidationOptions::default())
        .unwrap();
    assert_eq!(report.created.len(), 1);
    assert_eq!(report.archived, 2);
    assert_eq!(report.skipped_count, 1);
    assert_eq!(report.total_processed, 3);
    let consolidated = report.created[0].clone();

    for id in &ids[..2] {
        let original = memory.get(id).unwrap();
        assert_eq!(original.status, MemoryStatus::Archived);
        assert_eq!(original.archived_into.as_ref(), Some(&consolidated));
    }
    let summary = memory.get(&consolidated).unwrap();
    assert_eq!(summary.kind, EntryKind::Consolidated);
    assert!(summary.tags.contains("consolidated"));
    assert_eq!(summary.source_ids, ids[..2].to_vec());

    let hits = memory.search("repo", "restart ingest worker kafka", 10).unwrap();
    assert_eq!(hits[0].entry.id, consolidated);
    assert!(hits.iter().all(|hit| !ids[..2].contains(&hit.entry.id)));
}

#[test]
fn test_second_consolidation_is_a_no_op() {
    let services = services();
    let memory = services.memory();
    seed(&services);

    memory
        .consolidate("repo", ConsolidationOptions::default())
        .unwrap();
    let again = memory
        .consolidate("repo", ConsolidationOptions::default())
        .unwrap();

    assert!(again.created.is_empty());
    assert_eq!(again.archived, 0);
    assert_eq!(again.total_processed, 2);
}

#[test]
fn test_dry_run_reports_without_mutating() {
    let services = services();
    let memory = services.memory();
    let ids = seed(&services);

    let report = memory
        .consolidate("repo", ConsolidationOptions::default().dry_run())
        .unwrap();

    assert!(report.dry_run);
    assert!(report.created.is_empty());
    assert_eq!(report.archived, 0);
    assert_eq!(report.clusters, vec![ids[..2].to_vec()]);
    for id in &ids {
        assert_eq!(memory.get(id).unwrap().status, MemoryStatus::Active);
    }
}

#[test]
fn test_consolidation_stays_in_project() {
    let services = services();
    let memory = services.memory();
    seed(&services);
    let other = memory
        .record(RecordMemory::new("other", "ingest", KAFKA_A, Outcome::Success))
        .unwrap();

    memory
        .consolidate("repo", ConsolidationOptions::default())
        .unwrap();

    assert_eq!(memory.get(&other.id).unwrap().status, MemoryStatus::Active);
}

#[test]
fn test_session_granularity_flushes_on_consolidate() {
    let config = CoreConfig::default().with_granularity(MemoryGranularity::Session);
    let services = ServiceContainer::from_config(&config).unwrap();
    let memory = services.memory();
    for content in ["bisected to the allocator change", "reverted the allocator change"] {
        memory
            .record(
                RecordMemory::new("repo", "regression", content, Outcome::Success)
                    .with_session("s1"),
            )
            .unwrap();
    }
    assert!(
        memory
            .search("repo", "allocator change", 5)
            .unwrap()
            .is_empty()
    );

    let flushed = memory.consolidate_session("repo", "s1").unwrap();
    assert_eq!(flushed.created.len(), 1);
    assert_eq!(flushed.archived, 2);

    let hits = memory.search("repo", "allocator change", 5).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].entry.id, flushed.created[0]);
    assert_eq!(hits[0].entry.kind, EntryKind::SessionSummary);
}
