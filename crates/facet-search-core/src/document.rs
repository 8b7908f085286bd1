//! Searchable document model
//!
//! A domain record is split into one [`SearchableDocument`] per populated
//! field. Every chunk carries the id of the record it came from; queries match
//! chunks and answer with deduplicated parent ids.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Identifier of the domain record a chunk belongs to
pub type ParentId = String;

/// Which part of a record a chunk carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Sender,
    Recipient,
    Cc,
    Bcc,
    Subject,
    Body,
    Labels,
    Attachments,
    Timestamp,
    Size,
    MessageId,
}

impl Field {
    /// Every field, in declaration order
    pub const ALL: [Self; 11] = [
        Self::Sender,
        Self::Recipient,
        Self::Cc,
        Self::Bcc,
        Self::Subject,
        Self::Body,
        Self::Labels,
        Self::Attachments,
        Self::Timestamp,
        Self::Size,
        Self::MessageId,
    ];

    /// Fields whose chunks carry `text_content` rather than a structured value
    #[must_use]
    pub const fn is_text(self) -> bool {
        matches!(
            self,
            Self::Sender
                | Self::Recipient
                | Self::Cc
                | Self::Bcc
                | Self::Subject
                | Self::Body
                | Self::MessageId
        )
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sender => "sender",
            Self::Recipient => "recipient",
            Self::Cc => "cc",
            Self::Bcc => "bcc",
            Self::Subject => "subject",
            Self::Body => "body",
            Self::Labels => "labels",
            Self::Attachments => "attachments",
            Self::Timestamp => "timestamp",
            Self::Size => "size",
            Self::MessageId => "message_id",
        }
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One attachment part as seen by the index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentDescriptor {
    /// File name as declared by the part (may be empty for inline bodies)
    pub filename: String,
    /// MIME type as declared by the part
    pub mime_type: String,
    /// Size in bytes (declared, or estimated from the encoded payload)
    pub size: u64,
}

impl AttachmentDescriptor {
    /// A part counts as an attachment only when it carries a filename.
    #[must_use]
    pub fn is_named(&self) -> bool {
        !self.filename.trim().is_empty()
    }
}

/// Non-text payload of a chunk
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum StructuredValue {
    #[default]
    None,
    /// Upper-cased label set
    Labels(BTreeSet<String>),
    Attachments(Vec<AttachmentDescriptor>),
    /// Milliseconds since the Unix epoch
    Timestamp(i64),
    /// Bytes
    Size(u64),
}

/// A single field chunk of a domain record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchableDocument {
    pub parent_doc_id: ParentId,
    pub field: Field,
    /// Lower-cased text for text fields, empty otherwise
    pub text_content: String,
    pub structured_value: StructuredValue,
    /// Opaque tags (resource type, thread id, draft id)
    pub metadata: BTreeMap<String, String>,
}

impl SearchableDocument {
    /// Build a text chunk. The text is case-folded on the way in.
    #[must_use]
    pub fn text(parent: impl Into<ParentId>, field: Field, raw: &str) -> Self {
        Self {
            parent_doc_id: parent.into(),
            field,
            text_content: raw.to_lowercase(),
            structured_value: StructuredValue::None,
            metadata: BTreeMap::new(),
        }
    }

    /// Build a structured chunk with empty text content.
    #[must_use]
    pub fn structured(parent: impl Into<ParentId>, field: Field, value: StructuredValue) -> Self {
        Self {
            parent_doc_id: parent.into(),
            field,
            text_content: String::new(),
            structured_value: value,
            metadata: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Label set, when this is a labels chunk
    #[must_use]
    pub const fn labels(&self) -> Option<&BTreeSet<String>> {
        match &self.structured_value {
            StructuredValue::Labels(labels) => Some(labels),
            _ => None,
        }
    }

    /// Attachment parts, when this is an attachments chunk
    #[must_use]
    pub fn attachments(&self) -> Option<&[AttachmentDescriptor]> {
        match &self.structured_value {
            StructuredValue::Attachments(parts) => Some(parts),
            _ => None,
        }
    }

    #[must_use]
    pub const fn timestamp_ms(&self) -> Option<i64> {
        match self.structured_value {
            StructuredValue::Timestamp(ms) => Some(ms),
            _ => None,
        }
    }

    #[must_use]
    pub const fn size_bytes(&self) -> Option<u64> {
        match self.structured_value {
            StructuredValue::Size(bytes) => Some(bytes),
            _ => None,
        }
    }
}
