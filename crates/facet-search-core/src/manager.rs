//! Engine manager: one live index per domain adapter
//!
//! Writers (`sync`, `reset`) are serialized by a mutex and publish a fresh
//! `Arc<SearchIndex>` under an `RwLock`. Readers clone the `Arc` and evaluate
//! without holding any lock, so an in-flight query keeps the snapshot it
//! started with.

use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Instant;

use crate::adapter::DocumentAdapter;
use crate::config::SearchConfig;
use crate::consistency::{ConsistencyReport, check_consistency};
use crate::document::ParentId;
use crate::engine::{IndexHealth, IndexLifecycle, IndexStats, SearchEngine};
use crate::error::SearchResult;
use crate::evaluator::Evaluator;
use crate::index::SearchIndex;
use crate::parser::{ParseOutcome, QueryParser};

/// Owns the live index for one adapter
#[derive(Debug)]
pub struct EngineManager<A: DocumentAdapter> {
    adapter: A,
    config: SearchConfig,
    parser: QueryParser,
    evaluator: Evaluator,
    writer: Mutex<()>,
    current: RwLock<Arc<SearchIndex>>,
    ready: AtomicBool,
}

impl<A: DocumentAdapter> EngineManager<A> {
    /// Manager with configuration read from the environment.
    #[must_use]
    pub fn new(adapter: A) -> Self {
        Self::with_config(adapter, SearchConfig::from_env())
    }

    #[must_use]
    pub fn with_config(adapter: A, config: SearchConfig) -> Self {
        Self {
            adapter,
            parser: QueryParser::new(&config),
            evaluator: Evaluator::new(config),
            config,
            writer: Mutex::new(()),
            current: RwLock::new(Arc::new(SearchIndex::empty())),
            ready: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub const fn adapter(&self) -> &A {
        &self.adapter
    }

    #[must_use]
    pub const fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// The index queries currently run against.
    #[must_use]
    pub fn snapshot(&self) -> Arc<SearchIndex> {
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    fn publish(&self, index: SearchIndex) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(index);
        self.ready.store(true, Ordering::Release);
    }

    // ── Writers ─────────────────────────────────────────────────────────

    /// Bring the index up to date with `store`.
    ///
    /// Unchanged store hash: no-op. Otherwise the changed parents are
    /// re-chunked and patched in (or the whole index rebuilt when incremental
    /// sync is off or nothing has been built yet).
    pub fn sync(&self, store: &A::Store) -> SearchResult<IndexStats> {
        let _guard = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let start = Instant::now();
        let current = self.snapshot();
        let ready = self.ready.load(Ordering::Acquire);

        let hash = self.adapter.content_hash(store)?;
        if ready && hash == current.content_hash() {
            tracing::debug!(
                resource = self.adapter.resource(),
                hash = %hash,
                "store unchanged, sync skipped"
            );
            return Ok(IndexStats {
                unchanged: true,
                elapsed_ms: elapsed_ms(start),
                ..IndexStats::default()
            });
        }

        let fingerprints = self.adapter.fingerprints(store)?;
        if !ready || !self.config.incremental_sync {
            return self.rebuild_locked(store, fingerprints, hash, start);
        }
        self.apply_delta_locked(store, &current, fingerprints, hash, start)
    }

    /// Rebuild the index from scratch, whatever the store hash.
    pub fn reset(&self, store: &A::Store) -> SearchResult<IndexStats> {
        let _guard = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let start = Instant::now();
        let hash = self.adapter.content_hash(store)?;
        let fingerprints = self.adapter.fingerprints(store)?;
        self.rebuild_locked(store, fingerprints, hash, start)
    }

    fn rebuild_locked(
        &self,
        store: &A::Store,
        fingerprints: BTreeMap<ParentId, String>,
        hash: String,
        start: Instant,
    ) -> SearchResult<IndexStats> {
        let parents: BTreeSet<ParentId> = fingerprints.keys().cloned().collect();
        let documents = self.adapter.documents_for(store, &parents)?;
        let previous = self.snapshot();
        let index = SearchIndex::rebuild(documents, fingerprints)?.with_content_hash(hash);

        let stats = IndexStats {
            docs_indexed: index.doc_count(),
            docs_removed: previous.doc_count(),
            parents_indexed: index.parent_count(),
            parents_removed: previous.parent_count(),
            full_rebuild: true,
            elapsed_ms: elapsed_ms(start),
            warnings: chunkless_warnings(&index),
            ..IndexStats::default()
        };
        tracing::info!(
            resource = self.adapter.resource(),
            docs = stats.docs_indexed,
            parents = stats.parents_indexed,
            elapsed_ms = stats.elapsed_ms,
            "index rebuilt"
        );
        self.publish(index);
        Ok(stats)
    }

    fn apply_delta_locked(
        &self,
        store: &A::Store,
        current: &SearchIndex,
        fingerprints: BTreeMap<ParentId, String>,
        hash: String,
        start: Instant,
    ) -> SearchResult<IndexStats> {
        let old = current.fingerprints();
        let changed: BTreeSet<ParentId> = fingerprints
            .iter()
            .filter(|(parent, fp)| old.get(*parent) != Some(*fp))
            .map(|(parent, _)| parent.clone())
            .collect();
        let gone: BTreeSet<ParentId> = old
            .keys()
            .filter(|parent| !fingerprints.contains_key(*parent))
            .cloned()
            .collect();

        let added = self.adapter.documents_for(store, &changed)?;
        let docs_indexed = added.values().map(Vec::len).sum();
        let dropped: BTreeSet<ParentId> = gone.union(&changed).cloned().collect();
        let docs_removed = dropped
            .iter()
            .filter_map(|parent| current.documents(parent))
            .map(<[_]>::len)
            .sum();

        let index = current
            .apply_delta(added, &dropped, fingerprints)?
            .with_content_hash(hash);
        let stats = IndexStats {
            docs_indexed,
            docs_removed,
            parents_indexed: changed.len(),
            parents_removed: gone.len(),
            elapsed_ms: elapsed_ms(start),
            warnings: chunkless_warnings(&index),
            ..IndexStats::default()
        };
        tracing::info!(
            resource = self.adapter.resource(),
            changed = stats.parents_indexed,
            removed = stats.parents_removed,
            docs = index.doc_count(),
            elapsed_ms = stats.elapsed_ms,
            "index delta applied"
        );
        self.publish(index);
        Ok(stats)
    }

    // ── Readers ─────────────────────────────────────────────────────────

    /// Parse and evaluate `raw` against the current index. Never syncs.
    #[must_use]
    pub fn query(&self, raw: &str) -> BTreeSet<ParentId> {
        self.query_at(raw, Utc::now())
    }

    /// Same as [`query`](Self::query) with a pinned clock.
    #[must_use]
    pub fn query_at(&self, raw: &str, now: DateTime<Utc>) -> BTreeSet<ParentId> {
        let index = self.snapshot();
        let ast = self.parser.parse(raw);
        self.evaluator.evaluate_at(&ast, &index, now)
    }

    /// Parse only; exposes the canonical AST and parser warnings.
    #[must_use]
    pub fn parse(&self, raw: &str) -> ParseOutcome {
        self.parser.parse_with_warnings(raw)
    }

    #[must_use]
    pub fn health(&self) -> IndexHealth {
        let index = self.snapshot();
        let ready = self.ready.load(Ordering::Acquire);
        IndexHealth {
            ready,
            resource: self.adapter.resource().to_owned(),
            doc_count: index.doc_count(),
            parent_count: index.parent_count(),
            content_hash: index.content_hash().to_owned(),
            last_updated_ts: ready.then(|| index.updated_at_us()),
            status_message: if ready {
                format!(
                    "{} parents, {} chunks indexed",
                    index.parent_count(),
                    index.doc_count()
                )
            } else {
                "not yet synced".to_owned()
            },
        }
    }

    /// Compare the live index against `store`.
    pub fn check_consistency(&self, store: &A::Store) -> SearchResult<ConsistencyReport> {
        let index = self.snapshot();
        check_consistency(&self.adapter, store, &index)
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}

fn chunkless_warnings(index: &SearchIndex) -> Vec<String> {
    index
        .universe()
        .iter()
        .filter(|parent| index.documents(parent).is_none_or(<[_]>::is_empty))
        .map(|parent| format!("parent '{parent}' produced no chunks"))
        .collect()
}

impl<A: DocumentAdapter> SearchEngine for EngineManager<A> {
    fn search(&self, raw: &str) -> BTreeSet<ParentId> {
        self.query(raw)
    }

    fn search_at(&self, raw: &str, now: DateTime<Utc>) -> BTreeSet<ParentId> {
        self.query_at(raw, now)
    }
}

impl<A: DocumentAdapter> IndexLifecycle for EngineManager<A> {
    type Store = A::Store;

    fn sync(&self, store: &A::Store) -> SearchResult<IndexStats> {
        Self::sync(self, store)
    }

    fn reset(&self, store: &A::Store) -> SearchResult<IndexStats> {
        Self::reset(self, store)
    }

    fn health(&self) -> IndexHealth {
        Self::health(self)
    }
}
