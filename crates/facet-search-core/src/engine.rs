//! Core search engine traits
//!
//! [`SearchEngine`] answers raw queries; [`IndexLifecycle`] keeps the index in
//! step with a store. [`EngineManager`](crate::manager::EngineManager)
//! implements both for any [`DocumentAdapter`](crate::adapter::DocumentAdapter).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::document::ParentId;
use crate::error::SearchResult;

/// Health status of a search index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexHealth {
    /// Whether the index has been built from a store at least once
    pub ready: bool,
    /// Adapter resource the index serves (e.g. `message`)
    pub resource: String,
    /// Number of chunks currently indexed
    pub doc_count: usize,
    /// Number of parents in the indexed store
    pub parent_count: usize,
    /// Hash of the store the index was built from
    pub content_hash: String,
    /// Timestamp of the last successful index update (micros since epoch)
    pub last_updated_ts: Option<i64>,
    /// Human-readable status message
    pub status_message: String,
}

/// Statistics returned after a sync or reset
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStats {
    /// Number of chunks (re)indexed
    pub docs_indexed: usize,
    /// Number of chunks dropped
    pub docs_removed: usize,
    /// Parents added or changed
    pub parents_indexed: usize,
    /// Parents no longer in the store
    pub parents_removed: usize,
    /// The store hash matched and nothing was done
    pub unchanged: bool,
    /// The index was rebuilt from scratch rather than patched
    pub full_rebuild: bool,
    /// Wall-clock time for the operation
    pub elapsed_ms: u64,
    /// Any warnings generated during indexing
    pub warnings: Vec<String>,
}

/// Query side of an engine.
///
/// Malformed queries never fail: they degrade to whatever the parser could
/// recover, and unknown fields match nothing.
pub trait SearchEngine: Send + Sync {
    /// Evaluate a raw query against the current index.
    fn search(&self, raw: &str) -> BTreeSet<ParentId>;

    /// Same as [`search`](Self::search) with a pinned clock.
    fn search_at(&self, raw: &str, now: DateTime<Utc>) -> BTreeSet<ParentId>;
}

/// Keeps an index in step with a store.
pub trait IndexLifecycle: Send + Sync {
    type Store: ?Sized;

    /// Bring the index up to date. A no-op when the store hash is unchanged.
    ///
    /// On error the previous index stays in place.
    fn sync(&self, store: &Self::Store) -> SearchResult<IndexStats>;

    /// Rebuild the index from scratch, whatever the store hash.
    fn reset(&self, store: &Self::Store) -> SearchResult<IndexStats>;

    /// Check the current health of the index.
    fn health(&self) -> IndexHealth;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SearchError;

    /// Stub implementation to verify traits compile
    struct StubEngine;

    impl SearchEngine for StubEngine {
        fn search(&self, raw: &str) -> BTreeSet<ParentId> {
            self.search_at(raw, Utc::now())
        }

        fn search_at(&self, raw: &str, _now: DateTime<Utc>) -> BTreeSet<ParentId> {
            raw.split_whitespace().map(str::to_owned).collect()
        }
    }

    struct StubLifecycle;

    impl IndexLifecycle for StubLifecycle {
        type Store = [&'static str];

        fn sync(&self, store: &[&'static str]) -> SearchResult<IndexStats> {
            if store.is_empty() {
                return Ok(IndexStats {
                    unchanged: true,
                    ..IndexStats::default()
                });
            }
            self.reset(store)
        }

        fn reset(&self, store: &[&'static str]) -> SearchResult<IndexStats> {
            if store.iter().any(|id| id.is_empty()) {
                return Err(SearchError::invalid_record("empty id"));
            }
            Ok(IndexStats {
                docs_indexed: store.len(),
                parents_indexed: store.len(),
                full_rebuild: true,
                ..IndexStats::default()
            })
        }

        fn health(&self) -> IndexHealth {
            IndexHealth {
                ready: true,
                resource: "stub".to_owned(),
                doc_count: 0,
                parent_count: 0,
                content_hash: String::new(),
                last_updated_ts: None,
                status_message: "stub".to_owned(),
            }
        }
    }

    #[test]
    fn stub_engine_search() {
        let hits = StubEngine.search("b a b");
        assert_eq!(hits.into_iter().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn stub_lifecycle_sync_noop() {
        let stats = StubLifecycle.sync(&[]).unwrap();
        assert!(stats.unchanged);
        assert_eq!(stats.docs_indexed, 0);
        assert!(stats.warnings.is_empty());
    }

    #[test]
    fn stub_lifecycle_reset() {
        let stats = StubLifecycle.reset(&["a", "b"]).unwrap();
        assert!(stats.full_rebuild);
        assert_eq!(stats.parents_indexed, 2);
        assert!(StubLifecycle.reset(&[""]).is_err());
    }

    #[test]
    fn stub_lifecycle_health() {
        let health = StubLifecycle.health();
        assert!(health.ready);
        assert_eq!(health.doc_count, 0);
    }

    #[test]
    fn stats_serde() {
        let stats = IndexStats {
            docs_indexed: 3,
            elapsed_ms: 7,
            warnings: vec!["w".to_owned()],
            ..IndexStats::default()
        };
        let json = serde_json::to_string(&stats).unwrap();
        let back: IndexStats = serde_json::from_str(&json).unwrap();
        assert_eq!(back, stats);
    }
}
