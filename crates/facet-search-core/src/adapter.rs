//! Domain adapter traits
//!
//! A domain plugs into the engine by describing how its records split into
//! [`SearchableDocument`]s. [`RecordAdapter`] works on one record type;
//! [`DocumentAdapter`] works on a whole store and is what the
//! [`EngineManager`](crate::manager::EngineManager) is generic over.

use std::collections::{BTreeMap, BTreeSet};

use crate::canonical::store_hash;
use crate::document::{ParentId, SearchableDocument};
use crate::error::{SearchError, SearchResult};

/// Chunks grouped by the record they came from
pub type ChunkMap = BTreeMap<ParentId, Vec<SearchableDocument>>;

/// Per-record-type chunking
pub trait RecordAdapter<R: ?Sized> {
    /// Deterministic id answered by queries. Composite records (a draft
    /// wrapping a message) resolve to the id of the record they wrap.
    fn parent_id(&self, record: &R) -> SearchResult<ParentId>;

    /// One chunk per populated searchable field. Must be pure.
    fn to_documents(&self, record: &R) -> SearchResult<Vec<SearchableDocument>>;

    /// Content fingerprint; changes whenever any indexed field changes.
    fn fingerprint(&self, record: &R) -> SearchResult<String>;
}

/// Per-store view used by the engine manager
pub trait DocumentAdapter: Send + Sync {
    /// The domain store this adapter reads
    type Store: ?Sized;

    /// Short name used in logs and metadata (e.g. `message`, `draft`)
    fn resource(&self) -> &'static str;

    /// Fingerprint of every record, keyed by parent id.
    ///
    /// Fails with [`SearchError::InvalidRecord`] when a record has no
    /// resolvable parent id or two records resolve to the same one.
    fn fingerprints(&self, store: &Self::Store) -> SearchResult<BTreeMap<ParentId, String>>;

    /// Chunks for the records whose parent id is in `parents`.
    fn documents_for(
        &self,
        store: &Self::Store,
        parents: &BTreeSet<ParentId>,
    ) -> SearchResult<ChunkMap>;

    /// Chunks for every record in the store.
    fn all_documents(&self, store: &Self::Store) -> SearchResult<ChunkMap> {
        let parents: BTreeSet<ParentId> = self.fingerprints(store)?.into_keys().collect();
        self.documents_for(store, &parents)
    }

    /// Deterministic, insertion-order independent hash of the whole store.
    fn content_hash(&self, store: &Self::Store) -> SearchResult<String> {
        Ok(store_hash(&self.fingerprints(store)?))
    }
}

/// Fingerprint a sequence of records, rejecting duplicate parent ids.
pub fn collect_fingerprints<'a, R, A, I>(
    adapter: &A,
    records: I,
) -> SearchResult<BTreeMap<ParentId, String>>
where
    R: ?Sized + 'a,
    A: RecordAdapter<R> + ?Sized,
    I: IntoIterator<Item = &'a R>,
{
    let mut out = BTreeMap::new();
    for record in records {
        let parent = adapter.parent_id(record)?;
        let fp = adapter.fingerprint(record)?;
        if out.contains_key(&parent) {
            tracing::warn!(parent = %parent, "duplicate parent id rejected");
            return Err(SearchError::invalid_record(format!(
                "duplicate parent id '{parent}'"
            )));
        }
        out.insert(parent, fp);
    }
    Ok(out)
}

/// Chunk the records of a sequence whose parent id is in `parents`.
pub fn collect_documents<'a, R, A, I>(
    adapter: &A,
    records: I,
    parents: &BTreeSet<ParentId>,
) -> SearchResult<ChunkMap>
where
    R: ?Sized + 'a,
    A: RecordAdapter<R> + ?Sized,
    I: IntoIterator<Item = &'a R>,
{
    let mut out = ChunkMap::new();
    for record in records {
        let parent = adapter.parent_id(record)?;
        if !parents.contains(&parent) {
            continue;
        }
        let docs = adapter.to_documents(record)?;
        if out.insert(parent.clone(), docs).is_some() {
            return Err(SearchError::invalid_record(format!(
                "duplicate parent id '{parent}'"
            )));
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canonical::fingerprint;
    use crate::document::Field;

    // ── Stub domain: notes keyed by slug ────────────────────────────

    struct Note {
        slug: &'static str,
        text: &'static str,
    }

    struct NoteAdapter;

    impl RecordAdapter<Note> for NoteAdapter {
        fn parent_id(&self, record: &Note) -> SearchResult<ParentId> {
            if record.slug.is_empty() {
                return Err(SearchError::invalid_record("note without slug"));
            }
            Ok(record.slug.to_owned())
        }

        fn to_documents(&self, record: &Note) -> SearchResult<Vec<SearchableDocument>> {
            let parent = self.parent_id(record)?;
            Ok(vec![SearchableDocument::text(parent, Field::Body, record.text)])
        }

        fn fingerprint(&self, record: &Note) -> SearchResult<String> {
            fingerprint(&(record.slug, record.text))
        }
    }

    impl DocumentAdapter for NoteAdapter {
        type Store = [Note];

        fn resource(&self) -> &'static str {
            "note"
        }

        fn fingerprints(&self, store: &[Note]) -> SearchResult<BTreeMap<ParentId, String>> {
            collect_fingerprints(self, store)
        }

        fn documents_for(
            &self,
            store: &[Note],
            parents: &BTreeSet<ParentId>,
        ) -> SearchResult<ChunkMap> {
            collect_documents(self, store, parents)
        }
    }

    fn notes() -> Vec<Note> {
        vec![
            Note {
                slug: "a",
                text: "Alpha",
            },
            Note {
                slug: "b",
                text: "Beta",
            },
        ]
    }

    #[test]
    fn all_documents_covers_store() {
        let store = notes();
        let docs = NoteAdapter.all_documents(&store).unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs["a"][0].text_content, "alpha");
    }

    #[test]
    fn documents_for_filters_parents() {
        let store = notes();
        let wanted: BTreeSet<ParentId> = ["b".to_owned()].into_iter().collect();
        let docs = NoteAdapter.documents_for(&store, &wanted).unwrap();
        assert_eq!(docs.keys().collect::<Vec<_>>(), vec!["b"]);
    }

    #[test]
    fn content_hash_ignores_order() {
        let forward = notes();
        let mut reversed = notes();
        reversed.reverse();
        assert_eq!(
            NoteAdapter.content_hash(&forward).unwrap(),
            NoteAdapter.content_hash(&reversed).unwrap()
        );
    }

    #[test]
    fn content_hash_tracks_edits() {
        let before = notes();
        let mut after = notes();
        after[1].text = "Gamma";
        assert_ne!(
            NoteAdapter.content_hash(&before).unwrap(),
            NoteAdapter.content_hash(&after).unwrap()
        );
    }

    #[test]
    fn duplicate_parent_rejected() {
        let store = vec![
            Note {
                slug: "a",
                text: "one",
            },
            Note {
                slug: "a",
                text: "two",
            },
        ];
        let err = NoteAdapter.fingerprints(&store).unwrap_err();
        assert_eq!(err.error_type(), "INVALID_RECORD");
        assert!(err.to_string().contains("duplicate parent id 'a'"));
    }

    #[test]
    fn unresolvable_parent_rejected() {
        let store = vec![Note { slug: "", text: "x" }];
        assert!(matches!(
            NoteAdapter.all_documents(&store),
            Err(SearchError::InvalidRecord(_))
        ));
    }
}
