//! Store-vs-index consistency checking
//!
//! Compares the fingerprints of a live store against an index snapshot to
//! detect drift: parents the index is missing, parents it still answers for
//! after they left the store, and parents whose content changed since the
//! last sync.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Instant;

use crate::adapter::DocumentAdapter;
use crate::document::ParentId;
use crate::error::SearchResult;
use crate::index::SearchIndex;

/// Ids listed in a finding message before eliding the rest
const SAMPLE_IDS: usize = 5;

// ── Consistency check types ──────────────────────────────────────────────────

/// Severity level for a consistency finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Informational, no action needed
    Info,
    /// A sync will fix it
    Warning,
    /// The index cannot be patched; rebuild recommended
    Error,
}

/// A single consistency finding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsistencyFinding {
    /// Short machine-readable category (e.g. `missing_parents`, `stale_parents`)
    pub category: String,
    pub severity: Severity,
    /// Human-readable description
    pub message: String,
    /// Suggested remediation action (if any)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

/// Result of a consistency check run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsistencyReport {
    /// Individual findings, sorted by severity (errors first)
    pub findings: Vec<ConsistencyFinding>,
    /// Whether the index is considered healthy overall
    pub healthy: bool,
    /// Whether a reset is recommended
    pub rebuild_recommended: bool,
    /// Wall-clock time for the check
    pub elapsed_ms: u64,
}

impl ConsistencyReport {
    /// Returns the number of findings at `Error` severity
    #[must_use]
    pub fn error_count(&self) -> usize {
        self.findings
            .iter()
            .filter(|f| f.severity == Severity::Error)
            .count()
    }

    /// Returns the number of findings at `Warning` severity
    #[must_use]
    pub fn warning_count(&self) -> usize {
        self.findings
            .iter()
            .filter(|f| f.severity == Severity::Warning)
            .count()
    }

    /// Findings of one category
    pub fn findings_in<'a>(
        &'a self,
        category: &'a str,
    ) -> impl Iterator<Item = &'a ConsistencyFinding> + 'a {
        self.findings.iter().filter(move |f| f.category == category)
    }
}

// ── Consistency checker ──────────────────────────────────────────────────────

/// Check `index` against the current state of `store`.
pub fn check_consistency<A>(
    adapter: &A,
    store: &A::Store,
    index: &SearchIndex,
) -> SearchResult<ConsistencyReport>
where
    A: DocumentAdapter + ?Sized,
{
    let start = Instant::now();
    let store_fps = adapter.fingerprints(store)?;
    let store_hash_value = adapter.content_hash(store)?;
    let mut findings = Vec::new();
    let mut rebuild_recommended = false;

    check_parents(&store_fps, index, &mut findings, &mut rebuild_recommended);
    check_hash(
        &store_fps,
        &store_hash_value,
        index,
        findings.iter().all(|f| f.severity == Severity::Info),
        &mut findings,
    );

    findings.sort_by_key(|f| match f.severity {
        Severity::Error => 0,
        Severity::Warning => 1,
        Severity::Info => 2,
    });
    for finding in findings.iter().filter(|f| f.severity != Severity::Info) {
        tracing::warn!(
            resource = adapter.resource(),
            category = %finding.category,
            message = %finding.message,
            "index consistency finding"
        );
    }

    let healthy = !rebuild_recommended && findings.iter().all(|f| f.severity != Severity::Error);

    Ok(ConsistencyReport {
        findings,
        healthy,
        rebuild_recommended,
        elapsed_ms: elapsed_ms_saturating(start),
    })
}

/// Convert elapsed time to u64 milliseconds (saturating at `u64::MAX`)
fn elapsed_ms_saturating(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}

fn sample(ids: &[&ParentId]) -> String {
    let mut shown: Vec<&str> = ids.iter().take(SAMPLE_IDS).map(|id| id.as_str()).collect();
    if ids.len() > SAMPLE_IDS {
        shown.push("...");
    }
    shown.join(", ")
}

fn check_parents(
    store_fps: &BTreeMap<ParentId, String>,
    index: &SearchIndex,
    findings: &mut Vec<ConsistencyFinding>,
    rebuild_recommended: &mut bool,
) {
    let indexed = index.fingerprints();

    let missing: Vec<&ParentId> = store_fps.keys().filter(|p| !indexed.contains_key(*p)).collect();
    if !missing.is_empty() {
        findings.push(ConsistencyFinding {
            category: "missing_parents".to_owned(),
            severity: Severity::Warning,
            message: format!(
                "{} parent(s) in the store are not indexed: {}",
                missing.len(),
                sample(&missing)
            ),
            suggestion: Some("Run a sync to index them.".to_owned()),
        });
    }

    let orphaned: Vec<&ParentId> = indexed.keys().filter(|p| !store_fps.contains_key(*p)).collect();
    if !orphaned.is_empty() {
        findings.push(ConsistencyFinding {
            category: "orphaned_parents".to_owned(),
            severity: Severity::Warning,
            message: format!(
                "{} indexed parent(s) are no longer in the store: {}",
                orphaned.len(),
                sample(&orphaned)
            ),
            suggestion: Some("Run a sync to drop them.".to_owned()),
        });
    }

    let stale: Vec<&ParentId> = store_fps
        .iter()
        .filter(|(p, fp)| indexed.get(*p).is_some_and(|old| old != *fp))
        .map(|(p, _)| p)
        .collect();
    if !stale.is_empty() {
        findings.push(ConsistencyFinding {
            category: "stale_parents".to_owned(),
            severity: Severity::Warning,
            message: format!(
                "{} parent(s) changed since the last sync: {}",
                stale.len(),
                sample(&stale)
            ),
            suggestion: Some("Run a sync to re-chunk them.".to_owned()),
        });
    }

    let chunkless: Vec<&ParentId> = indexed
        .keys()
        .filter(|p| index.documents(p).is_none_or(<[_]>::is_empty))
        .collect();
    if !chunkless.is_empty() {
        findings.push(ConsistencyFinding {
            category: "chunkless_parents".to_owned(),
            severity: Severity::Info,
            message: format!(
                "{} parent(s) have no chunks and only match negations: {}",
                chunkless.len(),
                sample(&chunkless)
            ),
            suggestion: None,
        });
    }

    if indexed.is_empty() && !store_fps.is_empty() {
        findings.push(ConsistencyFinding {
            category: "index_empty".to_owned(),
            severity: Severity::Error,
            message: format!(
                "Index holds no parents but the store has {}",
                store_fps.len()
            ),
            suggestion: Some("Run a reset to build the index.".to_owned()),
        });
        *rebuild_recommended = true;
    }
}

fn check_hash(
    store_fps: &BTreeMap<ParentId, String>,
    store_hash_value: &str,
    index: &SearchIndex,
    parents_agree: bool,
    findings: &mut Vec<ConsistencyFinding>,
) {
    if store_hash_value == index.content_hash() {
        findings.push(ConsistencyFinding {
            category: "in_sync".to_owned(),
            severity: Severity::Info,
            message: format!("Index is in sync with {} parent(s)", store_fps.len()),
            suggestion: None,
        });
    } else if parents_agree {
        findings.push(ConsistencyFinding {
            category: "hash_mismatch".to_owned(),
            severity: Severity::Warning,
            message: "Store hash differs from the index hash although every parent matches"
                .to_owned(),
            suggestion: Some("Run a sync to refresh the index hash.".to_owned()),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::DocumentAdapter;
    use crate::mail::{MailAdapter, MailMessage, MailStore};

    fn store(ids: &[&str]) -> MailStore {
        let mut store = MailStore::default();
        for id in ids {
            store.upsert_message(MailMessage {
                id: (*id).to_owned(),
                subject: format!("subject {id}"),
                ..MailMessage::default()
            });
        }
        store
    }

    fn index_of(store: &MailStore) -> SearchIndex {
        let adapter = MailAdapter::messages();
        SearchIndex::rebuild(
            adapter.all_documents(store).unwrap(),
            adapter.fingerprints(store).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn in_sync_store_is_healthy() {
        let store = store(&["a", "b"]);
        let report = check_consistency(&MailAdapter::messages(), &store, &index_of(&store)).unwrap();
        assert!(report.healthy);
        assert!(!report.rebuild_recommended);
        assert_eq!(report.error_count(), 0);
        assert_eq!(report.warning_count(), 0);
        assert_eq!(report.findings_in("in_sync").count(), 1);
    }

    #[test]
    fn detects_missing_orphaned_and_stale() {
        let indexed = store(&["a", "b", "c"]);
        let index = index_of(&indexed);
        let mut live = store(&["a", "b", "d"]);
        live.messages.get_mut("b").unwrap().subject = "edited".into();

        let report = check_consistency(&MailAdapter::messages(), &live, &index).unwrap();
        assert_eq!(report.warning_count(), 3);
        let missing = report.findings_in("missing_parents").next().unwrap();
        assert!(missing.message.ends_with(": d"));
        let orphaned = report.findings_in("orphaned_parents").next().unwrap();
        assert!(orphaned.message.ends_with(": c"));
        let stale = report.findings_in("stale_parents").next().unwrap();
        assert!(stale.message.ends_with(": b"));
        assert_eq!(report.findings_in("in_sync").count(), 0);
        assert_eq!(report.findings_in("hash_mismatch").count(), 0);
        assert!(report.healthy);
    }

    #[test]
    fn custom_hash_mismatch_is_flagged() {
        let store = store(&["a"]);
        let index = index_of(&store).with_content_hash("elsewhere");
        let report = check_consistency(&MailAdapter::messages(), &store, &index).unwrap();
        assert_eq!(report.findings_in("hash_mismatch").count(), 1);
        assert_eq!(report.warning_count(), 1);
    }

    #[test]
    fn findings_sorted_by_severity() {
        let index = index_of(&store(&["a"]));
        let report = check_consistency(&MailAdapter::messages(), &store(&["b"]), &index).unwrap();
        let severities: Vec<Severity> = report.findings.iter().map(|f| f.severity).collect();
        let mut sorted = severities.clone();
        sorted.sort_by_key(|s| match s {
            Severity::Error => 0,
            Severity::Warning => 1,
            Severity::Info => 2,
        });
        assert_eq!(severities, sorted);
    }

    #[test]
    fn empty_index_recommends_rebuild() {
        let live = store(&["a", "b"]);
        let report = check_consistency(&MailAdapter::messages(), &live, &SearchIndex::empty()).unwrap();
        assert!(report.rebuild_recommended);
        assert!(!report.healthy);
        assert_eq!(report.error_count(), 1);
        assert_eq!(report.findings[0].category, "index_empty");
    }

    #[test]
    fn long_id_lists_are_elided() {
        let ids: Vec<String> = (0..8).map(|i| format!("m{i}")).collect();
        let refs: Vec<&ParentId> = ids.iter().collect();
        assert_eq!(sample(&refs), "m0, m1, m2, m3, m4, ...");
    }

    #[test]
    fn report_serializes_snake_case() {
        let store = store(&["a"]);
        let report = check_consistency(&MailAdapter::messages(), &store, &index_of(&store)).unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["findings"][0]["severity"], "info");
        assert!(json["findings"][0].get("suggestion").is_none());
    }
}
