//! Predicate dispatch
//!
//! Every leaf of the AST resolves through [`resolve`], a closed match over
//! `(FieldKind, Op)`. Pairs with no row (an unknown field, or an op the parser
//! never pairs with that field) resolve to the empty set.

use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::ops::Bound;

use crate::canonical::normalize_text;
use crate::classify::{
    AttachmentCategory, HasValue, IMPORTANT_LABEL, IsValue, Location, STARRED_LABELS,
    UNREAD_LABEL, category_label, is_system_label,
};
use crate::config::SearchConfig;
use crate::document::{AttachmentDescriptor, Field, ParentId};
use crate::index::SearchIndex;
use crate::query::{FieldKind, Op, Token};
use crate::units::{parse_date_ms, parse_period_ms, parse_size_bytes};

/// Fields a bare keyword searches
pub const KEYWORD_FIELDS: &[Field] = &[Field::Sender, Field::Recipient, Field::Subject, Field::Body];

/// Everything a predicate needs besides its own operands
#[derive(Debug, Clone, Copy)]
pub struct EvalContext<'a> {
    pub index: &'a SearchIndex,
    pub config: &'a SearchConfig,
    /// Clock for `older_than:`, `newer_than:` and relative dates
    pub now: DateTime<Utc>,
}

/// Resolve one predicate to the set of matching parents.
#[must_use]
pub fn resolve(ctx: &EvalContext<'_>, field: &FieldKind, op: Op, value: &Token) -> BTreeSet<ParentId> {
    if value.is_empty() {
        return BTreeSet::new();
    }
    let text = value.text.trim();
    let index = ctx.index;

    match (field, op) {
        // ── Text ────────────────────────────────────────────────────
        (FieldKind::Keyword, Op::Contains | Op::Phrase | Op::Exact) => {
            text_match(index, KEYWORD_FIELDS, op, &value.text)
        }
        (FieldKind::Subject, Op::Contains | Op::Phrase | Op::Exact) => {
            text_match(index, &[Field::Subject], op, &value.text)
        }
        (FieldKind::Body, Op::Contains | Op::Phrase | Op::Exact) => {
            text_match(index, &[Field::Body], op, &value.text)
        }
        (FieldKind::Cc, Op::Contains | Op::Phrase | Op::Exact) => {
            text_match(index, &[Field::Cc], op, &value.text)
        }
        (FieldKind::Bcc, Op::Contains | Op::Phrase | Op::Exact) => {
            text_match(index, &[Field::Bcc], op, &value.text)
        }
        (FieldKind::List, Op::Contains | Op::Phrase | Op::Exact) => {
            text_match(index, &[Field::Sender], op, &value.text)
        }
        (FieldKind::DeliveredTo, Op::Contains | Op::Phrase | Op::Exact) => {
            text_match(index, &[Field::Recipient], op, &value.text)
        }
        (FieldKind::Rfc822MsgId, Op::Contains | Op::Phrase | Op::Exact) => {
            text_match(index, &[Field::MessageId], op, &value.text)
        }
        (FieldKind::Filename, Op::Contains | Op::Phrase | Op::Exact) => {
            filename_match(index, op, &value.text)
        }

        // ── Addresses ───────────────────────────────────────────────
        (FieldKind::From, Op::Equals) => address_match(index, Field::Sender, text),
        (FieldKind::To, Op::Equals) => address_match(index, Field::Recipient, text),

        // ── Labels ──────────────────────────────────────────────────
        (FieldKind::Label, Op::Member) => index.parents_with_label(text),
        (FieldKind::Is, Op::Member) => IsValue::parse(text).map_or_else(BTreeSet::new, |v| is_match(index, v)),
        (FieldKind::Has, Op::Member) => {
            HasValue::parse(text).map_or_else(BTreeSet::new, |v| has_match(index, v))
        }
        (FieldKind::Category, Op::Member) => {
            category_label(text).map_or_else(BTreeSet::new, |label| index.parents_with_label(label))
        }
        (FieldKind::In, Op::Member) => match Location::parse(text) {
            Some(Location::Anywhere) => index.universe().clone(),
            Some(Location::Label(label)) => index.parents_with_label(label),
            Some(Location::Snoozed) | None => BTreeSet::new(),
        },

        // ── Time ────────────────────────────────────────────────────
        (FieldKind::After, Op::Greater) => parse_date_ms(text, ctx.now, ctx.config)
            .map_or_else(BTreeSet::new, |t| {
                index.timestamp_range(Bound::Included(t), Bound::Unbounded)
            }),
        (FieldKind::Before, Op::Less) => parse_date_ms(text, ctx.now, ctx.config)
            .map_or_else(BTreeSet::new, |t| {
                index.timestamp_range(Bound::Unbounded, Bound::Excluded(t))
            }),
        (FieldKind::OlderThan, Op::Less) => cutoff_ms(ctx, text).map_or_else(BTreeSet::new, |c| {
            index.timestamp_range(Bound::Unbounded, Bound::Excluded(c))
        }),
        (FieldKind::NewerThan, Op::Greater) => cutoff_ms(ctx, text).map_or_else(BTreeSet::new, |c| {
            index.timestamp_range(Bound::Excluded(c), Bound::Unbounded)
        }),

        // ── Size ────────────────────────────────────────────────────
        (FieldKind::Larger, Op::Greater) => parse_size_bytes(text).map_or_else(BTreeSet::new, |n| {
            index.size_range(Bound::Excluded(n), Bound::Unbounded)
        }),
        (FieldKind::Smaller, Op::Less) => parse_size_bytes(text).map_or_else(BTreeSet::new, |n| {
            index.size_range(Bound::Unbounded, Bound::Excluded(n))
        }),
        (FieldKind::Size, Op::Equals) => parse_size_bytes(text).map_or_else(BTreeSet::new, |n| {
            index.size_range(Bound::Included(n), Bound::Included(n))
        }),

        _ => BTreeSet::new(),
    }
}

fn cutoff_ms(ctx: &EvalContext<'_>, period: &str) -> Option<i64> {
    let span = parse_period_ms(period, ctx.config)?;
    ctx.now.timestamp_millis().checked_sub(span)
}

fn text_match(index: &SearchIndex, fields: &[Field], op: Op, needle: &str) -> BTreeSet<ParentId> {
    let needle = match op {
        Op::Contains => normalize_text(needle),
        _ => needle.to_lowercase(),
    };
    let mut out = BTreeSet::new();
    for field in fields {
        for doc in index.field_documents(*field) {
            if out.contains(&doc.parent_doc_id) {
                continue;
            }
            let hit = match op {
                Op::Contains => normalize_text(&doc.text_content).contains(&needle),
                _ => doc.text_content.contains(&needle),
            };
            if hit {
                out.insert(doc.parent_doc_id.clone());
            }
        }
    }
    out
}

fn filename_match(index: &SearchIndex, op: Op, needle: &str) -> BTreeSet<ParentId> {
    let needle = match op {
        Op::Contains => normalize_text(needle),
        _ => needle.to_lowercase(),
    };
    index
        .field_documents(Field::Attachments)
        .filter(|doc| {
            doc.attachments().is_some_and(|parts| {
                parts.iter().any(|p| {
                    let name = match op {
                        Op::Contains => normalize_text(&p.filename),
                        _ => p.filename.to_lowercase(),
                    };
                    !name.is_empty() && name.contains(&needle)
                })
            })
        })
        .map(|doc| doc.parent_doc_id.clone())
        .collect()
}

/// The forms an address-list entry answers to: the whole entry, the bare
/// address inside `<...>`, and the display name in front of it.
fn address_forms(entry: &str) -> Vec<&str> {
    let entry = entry.trim();
    let mut forms = vec![entry];
    if let (Some(open), Some(close)) = (entry.find('<'), entry.rfind('>')) {
        if open < close {
            forms.push(entry[open + 1..close].trim());
            let name = entry[..open].trim().trim_matches('"').trim();
            if !name.is_empty() {
                forms.push(name);
            }
        }
    }
    forms
}

fn address_match(index: &SearchIndex, field: Field, needle: &str) -> BTreeSet<ParentId> {
    let needle = needle.to_lowercase();
    index
        .field_documents(field)
        .filter(|doc| {
            doc.text_content
                .split([',', ';'])
                .any(|entry| address_forms(entry).contains(&needle.as_str()))
        })
        .map(|doc| doc.parent_doc_id.clone())
        .collect()
}

fn union_of_labels(index: &SearchIndex, labels: &[&str]) -> BTreeSet<ParentId> {
    labels
        .iter()
        .flat_map(|label| index.parents_with_label(label))
        .collect()
}

fn is_match(index: &SearchIndex, value: IsValue) -> BTreeSet<ParentId> {
    match value {
        IsValue::Unread => index.parents_with_label(UNREAD_LABEL),
        IsValue::Read => {
            let unread = index.parents_with_label(UNREAD_LABEL);
            index.universe().difference(&unread).cloned().collect()
        }
        IsValue::Starred => union_of_labels(index, STARRED_LABELS),
        IsValue::Important => index.parents_with_label(IMPORTANT_LABEL),
        IsValue::Muted | IsValue::Snoozed => BTreeSet::new(),
    }
}

fn user_labelled(index: &SearchIndex) -> BTreeSet<ParentId> {
    index
        .field_documents(Field::Labels)
        .filter(|doc| {
            doc.labels()
                .is_some_and(|labels| labels.iter().any(|l| !is_system_label(l)))
        })
        .map(|doc| doc.parent_doc_id.clone())
        .collect()
}

fn attachment_match<F>(index: &SearchIndex, predicate: F) -> BTreeSet<ParentId>
where
    F: Fn(&AttachmentDescriptor) -> bool,
{
    index
        .field_documents(Field::Attachments)
        .filter(|doc| doc.attachments().is_some_and(|parts| parts.iter().any(&predicate)))
        .map(|doc| doc.parent_doc_id.clone())
        .collect()
}

fn has_match(index: &SearchIndex, value: HasValue) -> BTreeSet<ParentId> {
    match value {
        HasValue::Attachment => attachment_match(index, AttachmentDescriptor::is_named),
        HasValue::UserLabels => user_labelled(index),
        HasValue::NoUserLabels => {
            let labelled = user_labelled(index);
            index.universe().difference(&labelled).cloned().collect()
        }
        HasValue::Category(category) => attachment_match(index, |p| {
            AttachmentCategory::classify(&p.mime_type, &p.filename) == Some(category)
        }),
        HasValue::Star(kind) => index.parents_with_label(kind.label()),
    }
}
