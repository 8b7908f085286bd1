//! Immutable index snapshot
//!
//! A [`SearchIndex`] owns every chunk of every record in one store, grouped by
//! parent, plus acceleration structures derived from them:
//!
//! - label postings (upper-cased label → parents)
//! - timestamp and size columns sorted by value, for range predicates
//! - per-field chunk lists, so text predicates scan one field only
//!
//! Snapshots are never mutated. [`SearchIndex::apply_delta`] returns a new
//! snapshot that shares unchanged chunk slices with the old one.

use std::collections::{BTreeMap, BTreeSet};
use std::ops::Bound;
use std::sync::Arc;

use crate::adapter::ChunkMap;
use crate::canonical::store_hash;
use crate::document::{Field, ParentId, SearchableDocument};
use crate::error::{SearchError, SearchResult};

/// A chunk inside a shared per-parent slice
#[derive(Debug, Clone)]
struct ChunkRef {
    docs: Arc<[SearchableDocument]>,
    slot: usize,
}

impl ChunkRef {
    fn doc(&self) -> &SearchableDocument {
        &self.docs[self.slot]
    }
}

/// Point-in-time index over one store
#[derive(Debug, Clone)]
pub struct SearchIndex {
    content_hash: String,
    fingerprints: BTreeMap<ParentId, String>,
    chunks: BTreeMap<ParentId, Arc<[SearchableDocument]>>,
    universe: BTreeSet<ParentId>,
    label_postings: BTreeMap<String, BTreeSet<ParentId>>,
    timestamps: Vec<(i64, ParentId)>,
    sizes: Vec<(u64, ParentId)>,
    by_field: BTreeMap<Field, Vec<ChunkRef>>,
    doc_count: usize,
    text_bytes: u64,
    updated_at_us: i64,
}

impl Default for SearchIndex {
    fn default() -> Self {
        Self::empty()
    }
}

impl SearchIndex {
    /// Index of an empty store.
    #[must_use]
    pub fn empty() -> Self {
        let fingerprints = BTreeMap::new();
        Self {
            content_hash: store_hash(&fingerprints),
            fingerprints,
            chunks: BTreeMap::new(),
            universe: BTreeSet::new(),
            label_postings: BTreeMap::new(),
            timestamps: Vec::new(),
            sizes: Vec::new(),
            by_field: BTreeMap::new(),
            doc_count: 0,
            text_bytes: 0,
            updated_at_us: chrono::Utc::now().timestamp_micros(),
        }
    }

    /// Build from the complete chunk set of a store.
    ///
    /// `fingerprints` names every parent in the store; a parent may have no
    /// chunks, but every chunk must belong to a fingerprinted parent.
    pub fn rebuild(
        documents: ChunkMap,
        fingerprints: BTreeMap<ParentId, String>,
    ) -> SearchResult<Self> {
        let mut chunks = BTreeMap::new();
        for (parent, docs) in documents {
            validate_chunks(&parent, &docs, &fingerprints)?;
            chunks.insert(parent, Arc::from(docs));
        }
        Ok(Self::derive(chunks, fingerprints))
    }

    /// Build the next snapshot from this one.
    ///
    /// Chunks of `removed` parents are dropped, then `added` chunks are
    /// inserted (replacing any left for the same parent). `fingerprints` is the
    /// complete fingerprint map of the new store state; chunks of parents
    /// missing from it do not survive.
    pub fn apply_delta(
        &self,
        added: ChunkMap,
        removed: &BTreeSet<ParentId>,
        fingerprints: BTreeMap<ParentId, String>,
    ) -> SearchResult<Self> {
        let mut chunks = self.chunks.clone();
        for parent in removed {
            chunks.remove(parent);
        }
        for (parent, docs) in added {
            validate_chunks(&parent, &docs, &fingerprints)?;
            chunks.insert(parent, Arc::from(docs));
        }
        chunks.retain(|parent, _| fingerprints.contains_key(parent));
        Ok(Self::derive(chunks, fingerprints))
    }

    /// Replace the store hash (for adapters that hash the store themselves).
    #[must_use]
    pub fn with_content_hash(mut self, hash: impl Into<String>) -> Self {
        self.content_hash = hash.into();
        self
    }

    fn derive(
        chunks: BTreeMap<ParentId, Arc<[SearchableDocument]>>,
        fingerprints: BTreeMap<ParentId, String>,
    ) -> Self {
        let mut label_postings: BTreeMap<String, BTreeSet<ParentId>> = BTreeMap::new();
        let mut timestamps = Vec::new();
        let mut sizes = Vec::new();
        let mut by_field: BTreeMap<Field, Vec<ChunkRef>> = BTreeMap::new();
        let mut doc_count = 0;
        let mut text_bytes = 0u64;

        for (parent, docs) in &chunks {
            for (slot, doc) in docs.iter().enumerate() {
                doc_count += 1;
                text_bytes += doc.text_content.len() as u64;
                if let Some(labels) = doc.labels() {
                    for label in labels {
                        let key = label.trim().to_uppercase();
                        if key.is_empty() {
                            continue;
                        }
                        label_postings.entry(key).or_default().insert(parent.clone());
                    }
                }
                if let Some(ms) = doc.timestamp_ms() {
                    timestamps.push((ms, parent.clone()));
                }
                if let Some(bytes) = doc.size_bytes() {
                    sizes.push((bytes, parent.clone()));
                }
                by_field.entry(doc.field).or_default().push(ChunkRef {
                    docs: Arc::clone(docs),
                    slot,
                });
            }
        }
        timestamps.sort_unstable();
        sizes.sort_unstable();

        Self {
            content_hash: store_hash(&fingerprints),
            universe: fingerprints.keys().cloned().collect(),
            fingerprints,
            chunks,
            label_postings,
            timestamps,
            sizes,
            by_field,
            doc_count,
            text_bytes,
            updated_at_us: chrono::Utc::now().timestamp_micros(),
        }
    }

    // ── Accessors ───────────────────────────────────────────────────────

    #[must_use]
    pub fn content_hash(&self) -> &str {
        &self.content_hash
    }

    #[must_use]
    pub const fn fingerprints(&self) -> &BTreeMap<ParentId, String> {
        &self.fingerprints
    }

    /// Every parent in the indexed store
    #[must_use]
    pub const fn universe(&self) -> &BTreeSet<ParentId> {
        &self.universe
    }

    #[must_use]
    pub fn parent_count(&self) -> usize {
        self.universe.len()
    }

    /// Total number of chunks
    #[must_use]
    pub const fn doc_count(&self) -> usize {
        self.doc_count
    }

    /// Approximate in-memory text volume
    #[must_use]
    pub const fn text_bytes(&self) -> u64 {
        self.text_bytes
    }

    /// When this snapshot was built (micros since epoch)
    #[must_use]
    pub const fn updated_at_us(&self) -> i64 {
        self.updated_at_us
    }

    /// Chunks of one parent
    #[must_use]
    pub fn documents(&self, parent: &str) -> Option<&[SearchableDocument]> {
        self.chunks.get(parent).map(|docs| &**docs)
    }

    /// Every chunk of one field, grouped by parent in id order.
    pub fn field_documents(&self, field: Field) -> impl Iterator<Item = &SearchableDocument> + '_ {
        self.by_field
            .get(&field)
            .into_iter()
            .flatten()
            .map(ChunkRef::doc)
    }

    /// Parents carrying `label` (compared upper-cased).
    #[must_use]
    pub fn parents_with_label(&self, label: &str) -> BTreeSet<ParentId> {
        self.label_postings
            .get(&label.to_uppercase())
            .cloned()
            .unwrap_or_default()
    }

    /// Every distinct label in the index
    pub fn labels(&self) -> impl Iterator<Item = &str> + '_ {
        self.label_postings.keys().map(String::as_str)
    }

    /// Parents whose timestamp falls within the bounds (ms since epoch).
    #[must_use]
    pub fn timestamp_range(&self, lower: Bound<i64>, upper: Bound<i64>) -> BTreeSet<ParentId> {
        range_of(&self.timestamps, lower, upper)
    }

    /// Parents whose computed size falls within the bounds (bytes).
    #[must_use]
    pub fn size_range(&self, lower: Bound<u64>, upper: Bound<u64>) -> BTreeSet<ParentId> {
        range_of(&self.sizes, lower, upper)
    }
}

fn validate_chunks(
    parent: &str,
    docs: &[SearchableDocument],
    fingerprints: &BTreeMap<ParentId, String>,
) -> SearchResult<()> {
    if !fingerprints.contains_key(parent) {
        return Err(SearchError::invalid_record(format!(
            "chunks for '{parent}' have no fingerprint"
        )));
    }
    if let Some(stray) = docs.iter().find(|d| d.parent_doc_id != parent) {
        return Err(SearchError::invalid_record(format!(
            "chunk for '{}' filed under '{parent}'",
            stray.parent_doc_id
        )));
    }
    Ok(())
}

fn range_of<T: Ord + Copy>(
    column: &[(T, ParentId)],
    lower: Bound<T>,
    upper: Bound<T>,
) -> BTreeSet<ParentId> {
    let start = match lower {
        Bound::Included(v) => column.partition_point(|(x, _)| *x < v),
        Bound::Excluded(v) => column.partition_point(|(x, _)| *x <= v),
        Bound::Unbounded => 0,
    };
    let end = match upper {
        Bound::Included(v) => column.partition_point(|(x, _)| *x <= v),
        Bound::Excluded(v) => column.partition_point(|(x, _)| *x < v),
        Bound::Unbounded => column.len(),
    };
    if start >= end {
        return BTreeSet::new();
    }
    column[start..end].iter().map(|(_, p)| p.clone()).collect()
}
