//! Similarity consolidation and session flushing.
//!
//! Both operations hold the project's exclusive lock for their whole run, read one
//! snapshot of active entries, write every replacement entry, and only then archive the
//! originals. A crash between the two phases leaves duplicates, never lost content.

use super::{MemoryStore, decode};
use crate::embedding::cosine_similarity;
use crate::models::{
    ConsolidationOptions, ConsolidationReport, EntryKind, MemoryEntry, MemoryId, MemoryStatus,
    Outcome, RecordKind, SessionConsolidation, TenantScope,
};
use crate::observability::record_request_id;
use crate::services::content_hash::ContentHasher;
use crate::storage::StoreFilter;
use crate::sync::acquire_lock;
use crate::{Error, Result};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::{Mutex, MutexGuard, TryLockError};
use std::time::Instant;
use tracing::{info_span, instrument};

/// Tag added to every similarity-consolidated entry.
const CONSOLIDATED_TAG: &str = "consolidated";

/// Tag added to every session summary.
const SESSION_TAG: &str = "session";

/// An active entry with its stored vector.
struct Snapshot {
    entry: MemoryEntry,
    vector: Vec<f32>,
}

impl MemoryStore {
    /// Merges near-duplicate active memories of one project.
    ///
    /// Active entries are grouped by single-linkage on cosine similarity at or above the
    /// threshold. Each group of two or more becomes one summary entry; the originals are
    /// archived with `archived_into` pointing at it. Larger groups are processed first
    /// when `max_clusters` caps the run.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for a blank project or a threshold outside `[0, 1]`,
    /// [`Error::Concurrency`] if another consolidation holds the project, and
    /// [`Error::Backend`] on store or embedding failure.
    #[instrument(
        name = "contextfold.memory.consolidate",
        skip(self, options),
        fields(
            threshold = options.similarity_threshold,
            dry_run = options.dry_run,
            request_id = tracing::field::Empty,
            component = "memory",
            operation = "consolidate"
        )
    )]
    pub fn consolidate(
        &self,
        project_id: &str,
        options: ConsolidationOptions,
    ) -> Result<ConsolidationReport> {
        record_request_id();
        let start = Instant::now();
        if !(0.0..=1.0).contains(&options.similarity_threshold) {
            return Err(Error::Validation(
                "similarity_threshold must be within [0, 1]".to_string(),
            ));
        }
        let scope = TenantScope::project(project_id)?;
        let lock = self.project_locks.get(&scope.key());
        let _exclusive = try_exclusive(&lock, &scope)?;

        let result = (|| {
            let snapshot = {
                let _span = info_span!("contextfold.memory.consolidate.snapshot").entered();
                self.active_snapshot(&scope, |entry| entry.kind != EntryKind::SessionTurn)?
            };
            let mut report = ConsolidationReport {
                total_processed: snapshot.len(),
                dry_run: options.dry_run,
                ..ConsolidationReport::default()
            };

            let groups = {
                let _span = info_span!("contextfold.memory.consolidate.cluster").entered();
                cluster(&snapshot, options.similarity_threshold)
            };
            let (mut clusters, singletons): (Vec<Vec<usize>>, Vec<Vec<usize>>) =
                groups.into_iter().partition(|group| group.len() >= 2);
            report.skipped_count = singletons.len();
            if options.max_clusters > 0 && clusters.len() > options.max_clusters {
                report.skipped_count += clusters.len() - options.max_clusters;
                clusters.truncate(options.max_clusters);
            }
            report.clusters = clusters
                .iter()
                .map(|group| group.iter().map(|&i| snapshot[i].entry.id.clone()).collect())
                .collect();

            if options.dry_run {
                return Ok(report);
            }

            let _span = info_span!("contextfold.memory.consolidate.merge").entered();
            for group in &clusters {
                let members: Vec<&MemoryEntry> = group.iter().map(|&i| &snapshot[i].entry).collect();
                let mut summary = synthesize(&scope, &members, EntryKind::Consolidated);
                summary.tags.insert(CONSOLIDATED_TAG.to_string());
                let created = self.write_summary(&scope, summary)?;
                report.archived += self.archive(&scope, group.iter().map(|&i| &snapshot[i]), &created)?;
                report.created.push(created);
            }
            Ok(report)
        })();

        let status = if result.is_ok() { "success" } else { "error" };
        metrics::counter!(
            "memory_operations_total",
            "operation" => "consolidate",
            "status" => status
        )
        .increment(1);
        metrics::histogram!("memory_operation_duration_ms", "operation" => "consolidate")
            .record(start.elapsed().as_secs_f64() * 1000.0);

        result.map(|mut report| {
            report.duration_seconds = start.elapsed().as_secs_f64();
            tracing::info!(
                created = report.created.len(),
                archived = report.archived,
                skipped = report.skipped_count,
                processed = report.total_processed,
                "consolidation finished"
            );
            report
        })
    }

    /// Flushes a session's buffered turn entries into session-level memories.
    ///
    /// Turns are grouped by outcome; each group becomes one summary. Running it again,
    /// or for a session with no buffered turns, returns an empty result.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for a blank project or session, [`Error::Concurrency`]
    /// if a consolidation holds the project, and [`Error::Backend`] on store failure.
    #[instrument(
        name = "contextfold.memory.consolidate_session",
        skip(self),
        fields(request_id = tracing::field::Empty)
    )]
    pub fn consolidate_session(
        &self,
        project_id: &str,
        session_id: &str,
    ) -> Result<SessionConsolidation> {
        record_request_id();
        if session_id.trim().is_empty() {
            return Err(Error::Validation("session_id must not be empty".to_string()));
        }
        let scope = TenantScope::project(project_id)?;
        let lock = self.project_locks.get(&scope.key());
        let _exclusive = try_exclusive(&lock, &scope)?;

        let turns = self.active_snapshot(&scope, |entry| {
            entry.kind == EntryKind::SessionTurn && entry.session_id.as_deref() == Some(session_id)
        })?;
        let mut result = SessionConsolidation::default();
        if turns.is_empty() {
            return Ok(result);
        }

        let mut by_outcome: BTreeMap<&'static str, Vec<&Snapshot>> = BTreeMap::new();
        for turn in &turns {
            by_outcome.entry(turn.entry.outcome.as_str()).or_default().push(turn);
        }
        for group in by_outcome.values() {
            let members: Vec<&MemoryEntry> = group.iter().map(|s| &s.entry).collect();
            let mut summary = synthesize(&scope, &members, EntryKind::SessionSummary);
            summary.session_id = Some(session_id.to_string());
            summary.tags.insert(SESSION_TAG.to_string());
            let created = self.write_summary(&scope, summary)?;
            result.archived += self.archive(&scope, group.iter().copied(), &created)?;
            result.created.push(created);
        }

        metrics::counter!("memory_operations_total", "operation" => "consolidate_session")
            .increment(1);
        Ok(result)
    }

    fn active_snapshot(
        &self,
        scope: &TenantScope,
        keep: impl Fn(&MemoryEntry) -> bool,
    ) -> Result<Vec<Snapshot>> {
        let filter = StoreFilter::new()
            .with_kind(RecordKind::Memory)
            .with_status(MemoryStatus::Active.as_str());
        let mut snapshot = Vec::new();
        for record in self.store.list(scope, &filter)? {
            let entry = decode(&record)?;
            if keep(&entry) {
                snapshot.push(Snapshot {
                    entry,
                    vector: record.vector,
                });
            }
        }
        Ok(snapshot)
    }

    fn write_summary(&self, scope: &TenantScope, summary: MemoryEntry) -> Result<MemoryId> {
        let vector = self.embed(&summary.embedding_text())?;
        self.persist(scope, &summary, vector)?;
        Ok(summary.id)
    }

    /// Archives snapshot entries into `replacement`, re-reading each under its lock so
    /// concurrent confidence updates are kept.
    fn archive<'a>(
        &self,
        scope: &TenantScope,
        members: impl Iterator<Item = &'a Snapshot>,
        replacement: &MemoryId,
    ) -> Result<usize> {
        let mut archived = 0;
        for member in members {
            let lock = self.entry_locks.get(member.entry.id.as_str());
            let _held = acquire_lock(&lock);
            let (mut entry, record) = match self.load(&member.entry.id) {
                Ok(found) => found,
                Err(Error::NotFound { .. }) => continue,
                Err(e) => return Err(e),
            };
            entry.status = MemoryStatus::Archived;
            entry.archived_into = Some(replacement.clone());
            self.persist(scope, &entry, record.vector)?;
            archived += 1;
        }
        Ok(archived)
    }
}

fn try_exclusive<'a>(lock: &'a Mutex<()>, scope: &TenantScope) -> Result<MutexGuard<'a, ()>> {
    match lock.try_lock() {
        Ok(guard) => Ok(guard),
        Err(TryLockError::Poisoned(poisoned)) => {
            tracing::warn!(scope = %scope, "consolidation lock was poisoned, recovering");
            Ok(poisoned.into_inner())
        },
        Err(TryLockError::WouldBlock) => {
            metrics::counter!("memory_consolidation_conflicts_total").increment(1);
            Err(Error::Concurrency(format!(
                "consolidation already running for {scope}"
            )))
        },
    }
}

/// Single-linkage grouping over pairwise cosine similarity.
///
/// Returns groups of snapshot indices, each sorted ascending, ordered by size descending
/// and then by earliest member.
fn cluster(snapshot: &[Snapshot], threshold: f32) -> Vec<Vec<usize>> {
    fn find(parent: &mut [usize], mut i: usize) -> usize {
        while parent[i] != i {
            parent[i] = parent[parent[i]];
            i = parent[i];
        }
        i
    }

    let mut parent: Vec<usize> = (0..snapshot.len()).collect();
    for i in 0..snapshot.len() {
        for j in (i + 1)..snapshot.len() {
            if cosine_similarity(&snapshot[i].vector, &snapshot[j].vector) >= threshold {
                let (a, b) = (find(&mut parent, i), find(&mut parent, j));
                if a != b {
                    parent[b.max(a)] = a.min(b);
                }
            }
        }
    }

    let mut groups: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for i in 0..snapshot.len() {
        let root = find(&mut parent, i);
        groups.entry(root).or_default().push(i);
    }
    let mut groups: Vec<Vec<usize>> = groups.into_values().collect();
    groups.sort_by(|a, b| b.len().cmp(&a.len()).then(a[0].cmp(&b[0])));
    groups
}

/// Builds the replacement entry for a group of members.
///
/// Content keeps each distinct (normalized) member content once. Outcome is the majority,
/// with ties going to success; confidence is the mean.
#[allow(clippy::cast_precision_loss)]
fn synthesize(scope: &TenantScope, members: &[&MemoryEntry], kind: EntryKind) -> MemoryEntry {
    let project_id = match scope {
        TenantScope::Project(id) => id.clone(),
        other => other.key(),
    };

    let lead = members
        .iter()
        .max_by(|a, b| a.confidence.total_cmp(&b.confidence))
        .map_or_else(String::new, |m| m.title.clone());

    let mut seen = HashSet::new();
    let unique: Vec<&str> = members
        .iter()
        .filter(|m| seen.insert(ContentHasher::hash(&m.content)))
        .map(|m| m.content.trim())
        .collect();
    let content = if unique.len() == 1 {
        unique[0].to_string()
    } else {
        unique
            .iter()
            .map(|c| format!("- {c}"))
            .collect::<Vec<_>>()
            .join("\n")
    };

    let failures = members.iter().filter(|m| m.outcome == Outcome::Failure).count();
    let outcome = if failures * 2 > members.len() {
        Outcome::Failure
    } else {
        Outcome::Success
    };

    let tags: BTreeSet<String> = members.iter().flat_map(|m| m.tags.iter().cloned()).collect();
    let mean = members.iter().map(|m| m.confidence).sum::<f32>() / members.len().max(1) as f32;

    let mut summary = MemoryEntry::new(project_id, lead, content, outcome);
    summary.tags = tags;
    summary.set_confidence(mean);
    summary.kind = kind;
    summary.source_ids = members.iter().map(|m| m.id.clone()).collect();
    summary
}
