//! Tier-scoped entries (remediations and checkpoints).

use super::TenantScope;
use super::confidence::{INITIAL_CONFIDENCE, clamp_confidence};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Kind of record held in a store partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    /// ReasoningBank memory.
    Memory,
    /// Remediation instance.
    Remediation,
    /// Session checkpoint.
    Checkpoint,
}

impl RecordKind {
    /// Returns the kind as a string slice.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Remediation => "remediation",
            Self::Checkpoint => "checkpoint",
        }
    }

    /// Parses a record kind from a string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "memory" => Some(Self::Memory),
            "remediation" => Some(Self::Remediation),
            "checkpoint" => Some(Self::Checkpoint),
            _ => None,
        }
    }
}

/// An entry that lives in exactly one tenant scope.
///
/// Immutable once written except for `confidence` and `last_used_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScopedEntry {
    /// Unique identifier.
    pub id: String,
    /// Record kind.
    pub kind: RecordKind,
    /// Owning scope.
    pub scope: TenantScope,
    /// Short title.
    pub title: String,
    /// Scrubbed content.
    pub content: String,
    /// Observed usefulness in `[0, 1]`.
    pub confidence: f32,
    /// Tags for filtering.
    #[serde(default)]
    pub tags: BTreeSet<String>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last time the entry was returned or rated.
    pub last_used_at: DateTime<Utc>,
    /// Session that produced the entry (checkpoints).
    #[serde(default)]
    pub session_id: Option<String>,
    /// Estimated token cost of `content` (checkpoints).
    #[serde(default)]
    pub token_estimate: u64,
}

impl ScopedEntry {
    /// Creates an entry with a fresh id and the initial confidence.
    #[must_use]
    pub fn new(
        kind: RecordKind,
        scope: TenantScope,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        let prefix = match kind {
            RecordKind::Memory => "mem",
            RecordKind::Remediation => "rem",
            RecordKind::Checkpoint => "chk",
        };
        Self {
            id: format!("{prefix}_{}", uuid::Uuid::new_v4().simple()),
            kind,
            scope,
            title: title.into(),
            content: content.into(),
            confidence: INITIAL_CONFIDENCE,
            tags: BTreeSet::new(),
            created_at: now,
            last_used_at: now,
            session_id: None,
            token_estimate: 0,
        }
    }

    /// Text used to embed this entry.
    #[must_use]
    pub fn embedding_text(&self) -> String {
        format!("{}\n{}", self.title, self.content)
    }

    /// Sets confidence, clamped to `[0, 1]`.
    pub fn set_confidence(&mut self, value: f32) {
        self.confidence = clamp_confidence(value);
    }
}
