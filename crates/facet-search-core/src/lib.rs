//! Faceted boolean search over simulated mail-like domains
//!
//! This crate provides:
//! - a forgiving query language (`from:a@x (subject:meeting OR {urgent asap}) -is:read`)
//!   parsed into a canonical AST by [`QueryParser`]; malformed input is repaired,
//!   never rejected
//! - [`DocumentAdapter`] / [`RecordAdapter`], the seam where a domain splits its
//!   records into per-field [`SearchableDocument`] chunks
//! - [`SearchIndex`], an immutable snapshot with label postings and sorted
//!   timestamp/size columns
//! - [`Evaluator`], set algebra over parent ids driven by a closed
//!   `(FieldKind, Op)` dispatch table
//! - [`EngineManager`], which keeps one index per adapter in step with a store
//!   and swaps snapshots atomically
//!
//! The [`mail`] module is the reference adapter for Gmail-shaped messages and
//! drafts.

#![forbid(unsafe_code)]

pub mod adapter;
pub mod canonical;
pub mod classify;
pub mod config;
pub mod consistency;
pub mod document;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod index;
pub mod mail;
pub mod manager;
pub mod parser;
pub mod predicates;
pub mod query;
pub mod units;

mod lexer;

// Re-export key types
pub use adapter::{ChunkMap, DocumentAdapter, RecordAdapter};
pub use canonical::{fingerprint, normalize_text, store_hash};
pub use config::SearchConfig;
pub use consistency::{ConsistencyFinding, ConsistencyReport, Severity, check_consistency};
pub use document::{AttachmentDescriptor, Field, ParentId, SearchableDocument, StructuredValue};
pub use engine::{IndexHealth, IndexLifecycle, IndexStats, SearchEngine};
pub use error::{SearchError, SearchResult};
pub use evaluator::{Evaluator, evaluate, evaluate_at};
pub use index::SearchIndex;
pub use mail::{Draft, MailAdapter, MailMessage, MailStore};
pub use manager::EngineManager;
pub use parser::{ParseOutcome, ParseWarning, QueryParser, parse, parse_with_warnings};
pub use query::{FieldKind, Node, Op, Token};
