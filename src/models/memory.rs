//! ReasoningBank memory entries.

use super::confidence::{INITIAL_CONFIDENCE, clamp_confidence};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Unique identifier for a memory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemoryId(String);

impl MemoryId {
    /// Creates a memory ID from an existing string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a fresh random ID.
    #[must_use]
    pub fn generate() -> Self {
        Self(format!("mem_{}", uuid::Uuid::new_v4().simple()))
    }

    /// Returns the ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MemoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for MemoryId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for MemoryId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Whether the strategy a memory describes worked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    /// The strategy succeeded.
    #[default]
    Success,
    /// The strategy failed.
    Failure,
}

impl Outcome {
    /// Returns the outcome as a string slice.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
        }
    }

    /// Parses an outcome from a string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "success" | "succeeded" => Some(Self::Success),
            "failure" | "failed" => Some(Self::Failure),
            _ => None,
        }
    }
}

/// Lifecycle status of a memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryStatus {
    /// Searchable and adjustable.
    #[default]
    Active,
    /// Folded into a consolidated entry; excluded from default search, kept for audit.
    Archived,
}

impl MemoryStatus {
    /// Returns the status as a string slice.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Archived => "archived",
        }
    }
}

/// How a memory came to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    /// Recorded directly.
    #[default]
    Standard,
    /// A turn-level entry buffered for session consolidation.
    SessionTurn,
    /// A session-level entry produced by flushing buffered turns.
    SessionSummary,
    /// A summary produced by similarity consolidation.
    Consolidated,
}

impl EntryKind {
    /// Returns the kind as its serialized string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::SessionTurn => "session_turn",
            Self::SessionSummary => "session_summary",
            Self::Consolidated => "consolidated",
        }
    }
}

/// A confidence-scored memory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryEntry {
    /// Unique identifier.
    pub id: MemoryId,
    /// Owning project; memories never leave their project partition.
    pub project_id: String,
    /// Short title.
    pub title: String,
    /// Scrubbed content.
    pub content: String,
    /// Whether the described strategy worked.
    pub outcome: Outcome,
    /// Observed usefulness in `[0, 1]`.
    pub confidence: f32,
    /// Tags for filtering.
    #[serde(default)]
    pub tags: BTreeSet<String>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last time the entry was returned by search or received a signal.
    pub last_used_at: DateTime<Utc>,
    /// Session the entry was recorded in.
    #[serde(default)]
    pub session_id: Option<String>,
    /// Lifecycle status.
    #[serde(default)]
    pub status: MemoryStatus,
    /// Replacement entry when archived.
    #[serde(default)]
    pub archived_into: Option<MemoryId>,
    /// Provenance.
    #[serde(default)]
    pub kind: EntryKind,
    /// Entries folded into this one (summaries only).
    #[serde(default)]
    pub source_ids: Vec<MemoryId>,
}

impl MemoryEntry {
    /// Creates an active entry with the initial confidence.
    #[must_use]
    pub fn new(
        project_id: impl Into<String>,
        title: impl Into<String>,
        content: impl Into<String>,
        outcome: Outcome,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: MemoryId::generate(),
            project_id: project_id.into(),
            title: title.into(),
            content: content.into(),
            outcome,
            confidence: INITIAL_CONFIDENCE,
            tags: BTreeSet::new(),
            created_at: now,
            last_used_at: now,
            session_id: None,
            status: MemoryStatus::Active,
            archived_into: None,
            kind: EntryKind::Standard,
            source_ids: Vec::new(),
        }
    }

    /// Sets the tags.
    #[must_use]
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Returns true if the entry participates in default search.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == MemoryStatus::Active
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

/// A memory returned by search.
#[derive(Debug, Clone, Serialize)]
pub struct MemoryHit {
    /// The matched entry.
    pub entry: MemoryEntry,
    /// Raw similarity score.
    pub score: f32,
    /// Combined similarity/confidence ranking key.
    pub rank: f32,
    /// True when the entry sits below the low-confidence floor.
    pub deprioritized: bool,
}
