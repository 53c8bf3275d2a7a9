//! Visibility tiers and tenant scopes.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A nested visibility boundary for scoped search.
///
/// Ordering follows proximity to the caller: `Project < Team < Org < Public`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// Visible only inside one project.
    #[default]
    Project,
    /// Shared by a team.
    Team,
    /// Shared across an organization.
    Org,
    /// Visible to everyone.
    Public,
}

impl Tier {
    /// All tiers, narrowest first. Scoped search walks this list in order.
    pub const ORDER: [Self; 4] = [Self::Project, Self::Team, Self::Org, Self::Public];

    /// Returns the tier as a string slice.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Project => "project",
            Self::Team => "team",
            Self::Org => "org",
            Self::Public => "public",
        }
    }

    /// Distance from the caller; lower is closer.
    #[must_use]
    pub const fn proximity(&self) -> u8 {
        match self {
            Self::Project => 0,
            Self::Team => 1,
            Self::Org => 2,
            Self::Public => 3,
        }
    }

    /// Parses a tier from a string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "project" => Some(Self::Project),
            "team" => Some(Self::Team),
            "org" | "organization" => Some(Self::Org),
            "public" => Some(Self::Public),
            _ => None,
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One concrete storage partition.
///
/// Every record lives in exactly one scope; stores never read across partitions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "tier", content = "id", rename_all = "lowercase")]
pub enum TenantScope {
    /// A single project (normalized project path or id).
    Project(String),
    /// A team.
    Team(String),
    /// An organization.
    Org(String),
    /// The shared public partition.
    Public,
}

impl TenantScope {
    /// Returns the tier this scope belongs to.
    #[must_use]
    pub const fn tier(&self) -> Tier {
        match self {
            Self::Project(_) => Tier::Project,
            Self::Team(_) => Tier::Team,
            Self::Org(_) => Tier::Org,
            Self::Public => Tier::Public,
        }
    }

    /// Partition key used by store implementations (`project:<id>`, `public`).
    #[must_use]
    pub fn key(&self) -> String {
        match self {
            Self::Project(id) => format!("project:{id}"),
            Self::Team(id) => format!("team:{id}"),
            Self::Org(id) => format!("org:{id}"),
            Self::Public => "public".to_string(),
        }
    }

    /// Parses a partition key produced by [`TenantScope::key`].
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        if key == "public" {
            return Some(Self::Public);
        }
        let (tier, id) = key.split_once(':')?;
        if id.is_empty() {
            return None;
        }
        match tier {
            "project" => Some(Self::Project(id.to_string())),
            "team" => Some(Self::Team(id.to_string())),
            "org" => Some(Self::Org(id.to_string())),
            _ => None,
        }
    }

    /// Builds a validated project scope.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if the project id is blank.
    pub fn project(project_id: &str) -> Result<Self> {
        non_blank(project_id, "project_id").map(Self::Project)
    }
}

impl fmt::Display for TenantScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// The caller's position in the tenant hierarchy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantContext {
    /// Project path or id. Required.
    pub project_id: Option<String>,
    /// Team id, if the caller belongs to one.
    pub team_id: Option<String>,
    /// Organization id, if the caller belongs to one.
    pub org_id: Option<String>,
}

impl TenantContext {
    /// Creates a context for a project with no team or org.
    #[must_use]
    pub fn for_project(project_id: impl Into<String>) -> Self {
        Self {
            project_id: Some(project_id.into()),
            team_id: None,
            org_id: None,
        }
    }

    /// Sets the team id.
    #[must_use]
    pub fn with_team(mut self, team_id: impl Into<String>) -> Self {
        self.team_id = Some(team_id.into());
        self
    }

    /// Sets the org id.
    #[must_use]
    pub fn with_org(mut self, org_id: impl Into<String>) -> Self {
        self.org_id = Some(org_id.into());
        self
    }

    /// Resolves the ordered list of scopes to search, narrowest first.
    ///
    /// Team and org tiers are omitted when the caller has no such membership; the public
    /// tier is always present.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if the project id is missing or any id is blank.
    pub fn resolve(&self) -> Result<Vec<TenantScope>> {
        let project = self
            .project_id
            .as_deref()
            .ok_or_else(|| Error::Validation("tenant context requires a project_id".to_string()))?;

        let mut scopes = Vec::with_capacity(Tier::ORDER.len());
        scopes.push(TenantScope::project(project)?);
        if let Some(team) = self.team_id.as_deref() {
            scopes.push(TenantScope::Team(non_blank(team, "team_id")?));
        }
        if let Some(org) = self.org_id.as_deref() {
            scopes.push(TenantScope::Org(non_blank(org, "org_id")?));
        }
        scopes.push(TenantScope::Public);
        Ok(scopes)
    }

    /// Resolves the single scope for one tier of this context.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if the context has no membership at that tier.
    pub fn scope_for(&self, tier: Tier) -> Result<TenantScope> {
        self.resolve()?
            .into_iter()
            .find(|scope| scope.tier() == tier)
            .ok_or_else(|| {
                Error::Validation(format!("tenant context has no {tier} membership"))
            })
    }
}

fn non_blank(value: &str, field: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::Validation(format!("{field} must not be empty")));
    }
    if trimmed.contains(':') {
        return Err(Error::Validation(format!("{field} must not contain ':'")));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_orders_narrowest_first() {
        let ctx = TenantContext::for_project("repo-a")
            .with_team("core")
            .with_org("acme");
        let scopes = ctx.resolve().unwrap();
        let tiers: Vec<Tier> = scopes.iter().map(TenantScope::tier).collect();
        assert_eq!(tiers, Tier::ORDER.to_vec());
    }

    #[test]
    fn test_resolve_skips_missing_memberships() {
        let scopes = TenantContext::for_project("repo-a").resolve().unwrap();
        assert_eq!(
            scopes,
            vec![TenantScope::Project("repo-a".into()), TenantScope::Public]
        );
    }

    #[test]
    fn test_resolve_requires_project() {
        let ctx = TenantContext::default();
        assert!(matches!(ctx.resolve(), Err(Error::Validation(_))));

        let blank = TenantContext::for_project("   ");
        assert!(matches!(blank.resolve(), Err(Error::Validation(_))));
    }

    #[test]
    fn test_scope_key_roundtrip() {
        for scope in [
            TenantScope::Project("p".into()),
            TenantScope::Team("t".into()),
            TenantScope::Org("o".into()),
            TenantScope::Public,
        ] {
            assert_eq!(TenantScope::from_key(&scope.key()), Some(scope));
        }
        assert_eq!(TenantScope::from_key("project:"), None);
        assert_eq!(TenantScope::from_key("galaxy:x"), None);
    }

    #[test]
    fn test_scope_for_missing_tier() {
        let ctx = TenantContext::for_project("p");
        assert!(ctx.scope_for(Tier::Team).is_err());
        assert_eq!(ctx.scope_for(Tier::Public).unwrap(), TenantScope::Public);
    }

    #[test]
    fn test_tier_parse() {
        assert_eq!(Tier::parse("ORG"), Some(Tier::Org));
        assert_eq!(Tier::parse("organization"), Some(Tier::Org));
        assert_eq!(Tier::parse("galaxy"), None);
        assert!(Tier::Project < Tier::Public);
    }
}
