//! Tenant isolation properties.
//!
//! Entries are visible only to callers whose resolved scope list contains the entry's
//! scope, whatever the ids involved.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use contextfold::models::ScopedQuery;
use contextfold::services::{RecordMemory, RecordRemediation};
use contextfold::{CoreConfig, Outcome, ServiceContainer, TenantContext, Tier};
use proptest::prelude::*;

const TITLE: &str = "connection pool exhausted";
const FIX: &str = "raise the pool size and close idle connections";

fn services() -> ServiceContainer {
    ServiceContainer::from_config(&CoreConfig::default()).unwrap()
}

fn ids() -> impl Strategy<Value = (String, String)> {
    ("[a-z][a-z0-9]{2,10}", "[a-z][a-z0-9]{2,10}").prop_filter("distinct ids", |(a, b)| a != b)
}

fn visible(services: &ServiceContainer, tenant: TenantContext, id: &str) -> bool {
    services
        .remediation()
        .search(&ScopedQuery::new(TITLE, tenant).with_limit(20))
        .unwrap()
        .results
        .iter()
        .any(|hit| hit.id == id)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_project_entries_never_leak((owner, other) in ids()) {
        let services = services();
        let entry = services
            .remediation()
            .record(RecordRemediation::new(
                TenantContext::for_project(owner.as_str()).with_team("core"),
                TITLE,
                FIX,
            ))
            .unwrap();

        prop_assert!(visible(&services, TenantContext::for_project(owner.as_str()), &entry.id));
        prop_assert!(!visible(
            &services,
            TenantContext::for_project(other.as_str()).with_team("core"),
            &entry.id
        ));
    }

    #[test]
    fn prop_team_entries_visible_only_to_team((team, other_team) in ids()) {
        let services = services();
        let entry = services
            .remediation()
            .record(
                RecordRemediation::new(
                    TenantContext::for_project("origin").with_team(team.as_str()),
                    TITLE,
                    FIX,
                )
                .in_tier(Tier::Team),
            )
            .unwrap();

        prop_assert!(visible(
            &services,
            TenantContext::for_project("teammate").with_team(team.as_str()),
            &entry.id
        ));
        prop_assert!(!visible(
            &services,
            TenantContext::for_project("outsider").with_team(other_team.as_str()),
            &entry.id
        ));
        prop_assert!(!visible(&services, TenantContext::for_project("solo"), &entry.id));
    }

    #[test]
    fn prop_memories_stay_in_project((owner, other) in ids()) {
        let services = services();
        services
            .memory()
            .record(RecordMemory::new(owner.as_str(), TITLE, FIX, Outcome::Success))
            .unwrap();

        prop_assert_eq!(services.memory().search(owner.as_str(), TITLE, 10).unwrap().len(), 1);
        prop_assert!(services.memory().search(other.as_str(), TITLE, 10).unwrap().is_empty());
    }
}

#[test]
fn test_public_entries_visible_to_everyone() {
    let services = services();
    let entry = services
        .remediation()
        .record(
            RecordRemediation::new(TenantContext::for_project("origin"), TITLE, FIX)
                .in_tier(Tier::Public),
        )
        .unwrap();

    for tenant in [
        TenantContext::for_project("a"),
        TenantContext::for_project("b").with_team("t"),
        TenantContext::for_project("c").with_team("t").with_org("o"),
    ] {
        assert!(visible(&services, tenant, &entry.id));
    }
}

#[test]
fn test_publishing_needs_membership() {
    let services = services();
    let err = services
        .remediation()
        .record(
            RecordRemediation::new(TenantContext::for_project("origin"), TITLE, FIX)
                .in_tier(Tier::Org),
        )
        .unwrap_err();
    assert_eq!(err.code(), "validation_error");
}
