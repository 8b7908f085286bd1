//! Mail domain adapter
//!
//! Gmail-shaped messages and drafts (camelCase JSON) and the
//! [`MailAdapter`] that chunks them. Two resources share one adapter type:
//! [`MailAdapter::messages`] answers message ids, [`MailAdapter::drafts`]
//! answers the ids of the messages the drafts wrap.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use crate::adapter::{
    ChunkMap, DocumentAdapter, RecordAdapter, collect_documents, collect_fingerprints,
};
use crate::canonical::fingerprint;
use crate::document::{
    AttachmentDescriptor, Field, ParentId, SearchableDocument, StructuredValue,
};
use crate::error::{SearchError, SearchResult};

pub const RESOURCE_TYPE_KEY: &str = "resource_type";
pub const THREAD_ID_KEY: &str = "thread_id";
pub const DRAFT_ID_KEY: &str = "draft_id";

// ── Records ─────────────────────────────────────────────────────────────────

/// `internalDate` as stored: Gmail writes a millisecond string, fixtures
/// sometimes write a number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InternalDate {
    Millis(i64),
    Text(String),
}

impl InternalDate {
    #[must_use]
    pub fn as_millis(&self) -> Option<i64> {
        match self {
            Self::Millis(ms) => Some(*ms),
            Self::Text(text) => text.trim().parse().ok(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PartBody {
    pub size: Option<u64>,
    /// Base64 payload
    pub data: Option<String>,
    pub attachment_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MessagePart {
    pub mime_type: String,
    pub filename: String,
    pub body: PartBody,
}

impl MessagePart {
    /// Declared size, else the decoded length of the base64 payload.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.body.size.unwrap_or_else(|| {
            self.body
                .data
                .as_ref()
                .map_or(0, |data| data.len() as u64 * 3 / 4)
        })
    }

    fn descriptor(&self) -> AttachmentDescriptor {
        AttachmentDescriptor {
            filename: self.filename.clone(),
            mime_type: self.mime_type.clone(),
            size: self.size(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Payload {
    pub mime_type: String,
    pub parts: Vec<MessagePart>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MailMessage {
    pub id: String,
    pub thread_id: String,
    pub sender: String,
    pub recipient: String,
    pub cc: String,
    pub bcc: String,
    pub subject: String,
    pub body: String,
    pub label_ids: Vec<String>,
    pub internal_date: Option<InternalDate>,
    pub payload: Option<Payload>,
}

impl MailMessage {
    #[must_use]
    pub fn parts(&self) -> &[MessagePart] {
        self.payload
            .as_ref()
            .map(|p| p.parts.as_slice())
            .unwrap_or_default()
    }

    /// Approximate size in bytes: header-ish text plus every part.
    #[must_use]
    pub fn computed_size(&self) -> u64 {
        let text: usize = [&self.subject, &self.body, &self.sender, &self.recipient]
            .iter()
            .map(|s| s.chars().count())
            .sum();
        text as u64 + self.parts().iter().map(MessagePart::size).sum::<u64>()
    }

    #[must_use]
    pub fn timestamp_ms(&self) -> Option<i64> {
        self.internal_date.as_ref().and_then(InternalDate::as_millis)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Draft {
    pub id: String,
    pub message: MailMessage,
}

/// One user's mailbox
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MailStore {
    pub messages: BTreeMap<String, MailMessage>,
    pub drafts: BTreeMap<String, Draft>,
}

impl MailStore {
    /// Insert or replace a message under its own id.
    pub fn upsert_message(&mut self, message: MailMessage) {
        self.messages.insert(message.id.clone(), message);
    }

    /// Insert or replace a draft under its own id.
    pub fn upsert_draft(&mut self, draft: Draft) {
        self.drafts.insert(draft.id.clone(), draft);
    }

    pub fn from_json(json: &str) -> SearchResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read and decode a JSON mailbox file.
    pub fn from_path(path: impl AsRef<Path>) -> SearchResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }
}

// ── Adapter ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Resource {
    Messages,
    Drafts,
}

/// Chunks mail records into searchable documents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MailAdapter {
    resource: Resource,
}

impl MailAdapter {
    /// Adapter over `store.messages`; parent id = message id
    #[must_use]
    pub const fn messages() -> Self {
        Self {
            resource: Resource::Messages,
        }
    }

    /// Adapter over `store.drafts`; parent id = wrapped message id
    #[must_use]
    pub const fn drafts() -> Self {
        Self {
            resource: Resource::Drafts,
        }
    }
}

fn message_documents(
    parent: &str,
    message: &MailMessage,
    tags: &[(&str, &str)],
) -> Vec<SearchableDocument> {
    let mut docs = Vec::with_capacity(Field::ALL.len());
    let text_fields = [
        (Field::Sender, &message.sender),
        (Field::Recipient, &message.recipient),
        (Field::Cc, &message.cc),
        (Field::Bcc, &message.bcc),
        (Field::Subject, &message.subject),
        (Field::Body, &message.body),
    ];
    for (field, text) in text_fields {
        if !text.trim().is_empty() {
            docs.push(SearchableDocument::text(parent, field, text));
        }
    }

    let labels: BTreeSet<String> = message
        .label_ids
        .iter()
        .map(|l| l.trim().to_uppercase())
        .filter(|l| !l.is_empty())
        .collect();
    if !labels.is_empty() {
        docs.push(SearchableDocument::structured(
            parent,
            Field::Labels,
            StructuredValue::Labels(labels),
        ));
    }

    let parts: Vec<AttachmentDescriptor> =
        message.parts().iter().map(MessagePart::descriptor).collect();
    if !parts.is_empty() {
        docs.push(SearchableDocument::structured(
            parent,
            Field::Attachments,
            StructuredValue::Attachments(parts),
        ));
    }

    if let Some(ms) = message.timestamp_ms() {
        docs.push(SearchableDocument::structured(
            parent,
            Field::Timestamp,
            StructuredValue::Timestamp(ms),
        ));
    }

    docs.push(SearchableDocument::structured(
        parent,
        Field::Size,
        StructuredValue::Size(message.computed_size()),
    ));
    docs.push(SearchableDocument::text(parent, Field::MessageId, parent));

    let thread = message.thread_id.trim();
    for doc in &mut docs {
        for (key, value) in tags {
            doc.metadata.insert((*key).to_owned(), (*value).to_owned());
        }
        if !thread.is_empty() {
            doc.metadata.insert(THREAD_ID_KEY.to_owned(), thread.to_owned());
        }
    }
    docs
}

impl RecordAdapter<MailMessage> for MailAdapter {
    fn parent_id(&self, record: &MailMessage) -> SearchResult<ParentId> {
        let id = record.id.trim();
        if id.is_empty() {
            return Err(SearchError::invalid_record("message has no id"));
        }
        Ok(id.to_owned())
    }

    fn to_documents(&self, record: &MailMessage) -> SearchResult<Vec<SearchableDocument>> {
        let parent = RecordAdapter::<MailMessage>::parent_id(self, record)?;
        Ok(message_documents(
            &parent,
            record,
            &[(RESOURCE_TYPE_KEY, "message")],
        ))
    }

    fn fingerprint(&self, record: &MailMessage) -> SearchResult<String> {
        fingerprint(record)
    }
}

impl RecordAdapter<Draft> for MailAdapter {
    fn parent_id(&self, record: &Draft) -> SearchResult<ParentId> {
        let id = record.message.id.trim();
        if id.is_empty() {
            return Err(SearchError::invalid_record(format!(
                "draft {} has no message id",
                record.id
            )));
        }
        Ok(id.to_owned())
    }

    fn to_documents(&self, record: &Draft) -> SearchResult<Vec<SearchableDocument>> {
        let parent = RecordAdapter::<Draft>::parent_id(self, record)?;
        Ok(message_documents(
            &parent,
            &record.message,
            &[(RESOURCE_TYPE_KEY, "draft"), (DRAFT_ID_KEY, record.id.as_str())],
        ))
    }

    fn fingerprint(&self, record: &Draft) -> SearchResult<String> {
        fingerprint(record)
    }
}

impl DocumentAdapter for MailAdapter {
    type Store = MailStore;

    fn resource(&self) -> &'static str {
        match self.resource {
            Resource::Messages => "message",
            Resource::Drafts => "draft",
        }
    }

    fn fingerprints(&self, store: &MailStore) -> SearchResult<BTreeMap<ParentId, String>> {
        match self.resource {
            Resource::Messages => collect_fingerprints(self, store.messages.values()),
            Resource::Drafts => collect_fingerprints(self, store.drafts.values()),
        }
    }

    fn documents_for(
        &self,
        store: &MailStore,
        parents: &BTreeSet<ParentId>,
    ) -> SearchResult<ChunkMap> {
        match self.resource {
            Resource::Messages => collect_documents(self, store.messages.values(), parents),
            Resource::Drafts => collect_documents(self, store.drafts.values(), parents),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_message() -> MailMessage {
        MailMessage {
            id: "m1".into(),
            thread_id: "t1".into(),
            sender: "Alice <alice@example.com>".into(),
            recipient: "bob@example.com".into(),
            subject: "Meeting".into(),
            body: "Agenda attached".into(),
            label_ids: vec!["inbox".into(), "UNREAD".into()],
            internal_date: Some(InternalDate::Text("1700000000000".into())),
            payload: Some(Payload {
                mime_type: "multipart/mixed".into(),
                parts: vec![MessagePart {
                    mime_type: "application/pdf".into(),
                    filename: "agenda.pdf".into(),
                    body: PartBody {
                        size: Some(2048),
                        ..PartBody::default()
                    },
                }],
            }),
            ..MailMessage::default()
        }
    }

    fn fields(docs: &[SearchableDocument]) -> Vec<Field> {
        docs.iter().map(|d| d.field).collect()
    }

    #[test]
    fn message_chunks_skip_empty_fields() {
        let docs = RecordAdapter::<MailMessage>::to_documents(&MailAdapter::messages(), &sample_message())
            .unwrap();
        assert_eq!(
            fields(&docs),
            vec![
                Field::Sender,
                Field::Recipient,
                Field::Subject,
                Field::Body,
                Field::Labels,
                Field::Attachments,
                Field::Timestamp,
                Field::Size,
                Field::MessageId,
            ]
        );
        assert!(docs.iter().all(|d| d.parent_doc_id == "m1"));
        assert!(docs.iter().all(|d| d.metadata[THREAD_ID_KEY] == "t1"));
        assert!(docs.iter().all(|d| d.metadata[RESOURCE_TYPE_KEY] == "message"));
    }

    #[test]
    fn labels_upper_cased() {
        let docs = RecordAdapter::<MailMessage>::to_documents(&MailAdapter::messages(), &sample_message())
            .unwrap();
        let labels = docs.iter().find_map(SearchableDocument::labels).unwrap();
        assert!(labels.contains("INBOX"));
        assert!(labels.contains("UNREAD"));
    }

    #[test]
    fn bare_message_still_has_size_and_id() {
        let msg = MailMessage {
            id: "m2".into(),
            ..MailMessage::default()
        };
        let docs = RecordAdapter::<MailMessage>::to_documents(&MailAdapter::messages(), &msg).unwrap();
        assert_eq!(fields(&docs), vec![Field::Size, Field::MessageId]);
        assert_eq!(docs[0].size_bytes(), Some(0));
    }

    #[test]
    fn computed_size_counts_text_and_parts() {
        let mut msg = sample_message();
        // subject 7 + body 15 + sender 25 + recipient 15 + part 2048
        assert_eq!(msg.computed_size(), 7 + 15 + 25 + 15 + 2048);
        msg.payload = Some(Payload {
            parts: vec![MessagePart {
                body: PartBody {
                    data: Some("QUJDRA==".into()),
                    ..PartBody::default()
                },
                ..MessagePart::default()
            }],
            ..Payload::default()
        });
        assert_eq!(msg.computed_size(), 62 + 6);
    }

    #[test]
    fn internal_date_accepts_number_or_string() {
        let text: MailMessage =
            serde_json::from_str(r#"{"id":"a","internalDate":"1700000000000"}"#).unwrap();
        let number: MailMessage =
            serde_json::from_str(r#"{"id":"a","internalDate":1700000000000}"#).unwrap();
        assert_eq!(text.timestamp_ms(), Some(1_700_000_000_000));
        assert_eq!(number.timestamp_ms(), Some(1_700_000_000_000));
        let junk: MailMessage =
            serde_json::from_str(r#"{"id":"a","internalDate":"yesterday"}"#).unwrap();
        assert_eq!(junk.timestamp_ms(), None);
    }

    #[test]
    fn camel_case_store_round_trip() {
        let json = r#"{
            "messages": {
                "m1": {
                    "id": "m1",
                    "threadId": "t1",
                    "labelIds": ["INBOX"],
                    "payload": {"parts": [{"mimeType": "image/png", "filename": "a.png", "body": {"size": 10}}]},
                    "unknownField": true
                }
            }
        }"#;
        let store = MailStore::from_json(json).unwrap();
        let msg = &store.messages["m1"];
        assert_eq!(msg.thread_id, "t1");
        assert_eq!(msg.parts()[0].mime_type, "image/png");
        assert!(store.drafts.is_empty());
    }

    #[test]
    fn from_path_reads_file_and_reports_io() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(br#"{"messages": {"m1": {"id": "m1"}}}"#).unwrap();
        let store = MailStore::from_path(file.path()).unwrap();
        assert!(store.messages.contains_key("m1"));

        let dir = tempfile::tempdir().unwrap();
        let err = MailStore::from_path(dir.path().join("missing.json")).unwrap_err();
        assert_eq!(err.error_type(), "IO_ERROR");
    }

    #[test]
    fn draft_resolves_to_wrapped_message() {
        let draft = Draft {
            id: "d1".into(),
            message: sample_message(),
        };
        let adapter = MailAdapter::drafts();
        assert_eq!(RecordAdapter::<Draft>::parent_id(&adapter, &draft).unwrap(), "m1");
        let docs = RecordAdapter::<Draft>::to_documents(&adapter, &draft).unwrap();
        assert!(docs.iter().all(|d| d.parent_doc_id == "m1"));
        assert!(docs.iter().all(|d| d.metadata[DRAFT_ID_KEY] == "d1"));
        assert!(docs.iter().all(|d| d.metadata[RESOURCE_TYPE_KEY] == "draft"));
    }

    #[test]
    fn draft_without_message_id_rejected() {
        let mut store = MailStore::default();
        store.upsert_draft(Draft {
            id: "d1".into(),
            message: MailMessage::default(),
        });
        let err = MailAdapter::drafts().fingerprints(&store).unwrap_err();
        assert_eq!(err.to_string(), "Invalid record: draft d1 has no message id");
    }

    #[test]
    fn two_drafts_wrapping_one_message_rejected() {
        let mut store = MailStore::default();
        for id in ["d1", "d2"] {
            store.upsert_draft(Draft {
                id: id.into(),
                message: sample_message(),
            });
        }
        assert!(matches!(
            MailAdapter::drafts().fingerprints(&store),
            Err(SearchError::InvalidRecord(_))
        ));
    }

    #[test]
    fn resources_read_their_own_collection() {
        let mut store = MailStore::default();
        store.upsert_message(sample_message());
        assert_eq!(MailAdapter::messages().fingerprints(&store).unwrap().len(), 1);
        assert!(MailAdapter::drafts().fingerprints(&store).unwrap().is_empty());
        assert_eq!(MailAdapter::messages().resource(), "message");
        assert_eq!(MailAdapter::drafts().resource(), "draft");
    }

    #[test]
    fn fingerprint_changes_with_labels() {
        let adapter = MailAdapter::messages();
        let msg = sample_message();
        let mut relabeled = msg.clone();
        relabeled.label_ids.push("STARRED".into());
        assert_ne!(
            RecordAdapter::<MailMessage>::fingerprint(&adapter, &msg).unwrap(),
            RecordAdapter::<MailMessage>::fingerprint(&adapter, &relabeled).unwrap()
        );
    }
}
