//! Persistence tests for the `SQLite` backend.
//!
//! Each test opens a container over a temporary database, writes through the services,
//! drops it and reopens the same file.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use contextfold::models::ScopedQuery;
use contextfold::services::{RecordMemory, RecordRemediation, ResumeRequest};
use contextfold::{CoreConfig, MemoryId, Outcome, ServiceContainer, TenantContext, Tier};
use std::path::Path;
use tempfile::TempDir;

fn open(path: &Path) -> ServiceContainer {
    ServiceContainer::from_config(&CoreConfig::default().with_sqlite(path)).unwrap()
}

#[test]
fn test_memories_survive_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("contextfold.db");

    let id: MemoryId = {
        let services = open(&path);
        let entry = services
            .memory()
            .record(RecordMemory::new(
                "repo",
                "flaky snapshot test",
                "normalize timestamps before comparing snapshots",
                Outcome::Success,
            ))
            .unwrap();
        services.memory().feedback(&entry.id, true).unwrap();
        entry.id
    };

    let services = open(&path);
    let entry = services.memory().get(&id).unwrap();
    assert!((entry.confidence - 0.6).abs() < 1e-6);
    let hits = services
        .memory()
        .search("repo", "snapshot test timestamps", 5)
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].entry.id, id);
}

#[test]
fn test_remediation_tiers_survive_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("contextfold.db");
    let tenant = TenantContext::for_project("repo").with_team("core");

    {
        let services = open(&path);
        services
            .remediation()
            .record(RecordRemediation::new(
                tenant.clone(),
                "linker oom",
                "switch to lld",
            ))
            .unwrap();
        services
            .remediation()
            .record(
                RecordRemediation::new(tenant.clone(), "linker oom", "reduce codegen units")
                    .in_tier(Tier::Team),
            )
            .unwrap();
    }

    let services = open(&path);
    let response = services
        .remediation()
        .search(&ScopedQuery::new("linker out of memory", tenant))
        .unwrap();
    assert_eq!(response.results.len(), 2);
    assert_eq!(response.tiers_searched[..2], [Tier::Project, Tier::Team]);
}

#[test]
fn test_checkpoint_resume_after_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("contextfold.db");
    let tenant = TenantContext::for_project("repo");

    let saved = {
        let services = open(&path);
        services
            .checkpoints()
            .save(
                &tenant,
                "session-1",
                "migration plan",
                "step 1 done: schema v2 applied; next: backfill the audit table",
            )
            .unwrap()
    };

    let services = open(&path);
    let resumed = services
        .checkpoints()
        .resume(&ResumeRequest::new(tenant, 1_000).by_id(saved.id.clone()))
        .unwrap();
    assert_eq!(resumed.checkpoints.len(), 1);
    assert_eq!(resumed.checkpoints[0].id, saved.id);
    assert!(!resumed.truncated);
}
