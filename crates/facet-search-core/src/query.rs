//! Query AST
//!
//! [`Node`] is the parser's output and the evaluator's input. Leaves are
//! [`Node::Predicate`]s naming a [`FieldKind`], an [`Op`] and a raw [`Token`];
//! interior nodes are variadic `And`/`Or` and unary `Not`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The query field a predicate targets
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Bare term, searched over sender, recipient, subject and body
    Keyword,
    From,
    To,
    Cc,
    Bcc,
    Subject,
    Body,
    Label,
    Is,
    Has,
    Category,
    Filename,
    After,
    Before,
    OlderThan,
    NewerThan,
    Larger,
    Smaller,
    Size,
    List,
    DeliveredTo,
    Rfc822MsgId,
    In,
    /// A `key:value` whose key names no known field
    Unknown(String),
}

/// Canonical field keys, in the order they are offered as suggestions.
pub const FIELD_KEYS: &[&str] = &[
    "from",
    "to",
    "cc",
    "bcc",
    "subject",
    "body",
    "label",
    "is",
    "has",
    "category",
    "filename",
    "after",
    "before",
    "older_than",
    "newer_than",
    "larger",
    "smaller",
    "size",
    "list",
    "deliveredto",
    "rfc822msgid",
    "in",
];

/// Accepted spellings that map onto a canonical key.
const FIELD_ALIASES: &[(&str, &str)] = &[
    ("older", "before"),
    ("newer", "after"),
    ("labels", "label"),
    ("attachment", "filename"),
];

impl FieldKind {
    /// Resolve a `key:` prefix (case-insensitive). Unrecognised keys become
    /// [`FieldKind::Unknown`] carrying the lower-cased key.
    #[must_use]
    pub fn from_key(key: &str) -> Self {
        let lower = key.to_ascii_lowercase();
        let canonical = FIELD_ALIASES
            .iter()
            .find(|(alias, _)| *alias == lower)
            .map_or(lower.as_str(), |(_, canonical)| *canonical);
        match canonical {
            "from" => Self::From,
            "to" => Self::To,
            "cc" => Self::Cc,
            "bcc" => Self::Bcc,
            "subject" => Self::Subject,
            "body" => Self::Body,
            "label" => Self::Label,
            "is" => Self::Is,
            "has" => Self::Has,
            "category" => Self::Category,
            "filename" => Self::Filename,
            "after" => Self::After,
            "before" => Self::Before,
            "older_than" => Self::OlderThan,
            "newer_than" => Self::NewerThan,
            "larger" => Self::Larger,
            "smaller" => Self::Smaller,
            "size" => Self::Size,
            "list" => Self::List,
            "deliveredto" => Self::DeliveredTo,
            "rfc822msgid" => Self::Rfc822MsgId,
            "in" => Self::In,
            _ => Self::Unknown(lower),
        }
    }

    /// The `key` this field is written as, or `None` for bare keywords.
    #[must_use]
    pub fn key(&self) -> Option<&str> {
        let key = match self {
            Self::Keyword => return None,
            Self::From => "from",
            Self::To => "to",
            Self::Cc => "cc",
            Self::Bcc => "bcc",
            Self::Subject => "subject",
            Self::Body => "body",
            Self::Label => "label",
            Self::Is => "is",
            Self::Has => "has",
            Self::Category => "category",
            Self::Filename => "filename",
            Self::After => "after",
            Self::Before => "before",
            Self::OlderThan => "older_than",
            Self::NewerThan => "newer_than",
            Self::Larger => "larger",
            Self::Smaller => "smaller",
            Self::Size => "size",
            Self::List => "list",
            Self::DeliveredTo => "deliveredto",
            Self::Rfc822MsgId => "rfc822msgid",
            Self::In => "in",
            Self::Unknown(key) => key,
        };
        Some(key)
    }

    /// The comparison a `key:value` term on this field requests.
    #[must_use]
    pub const fn default_op(&self, quoted: bool) -> Op {
        match self {
            Self::From | Self::To | Self::Size => Op::Equals,
            Self::Label | Self::Is | Self::Has | Self::Category | Self::In => Op::Member,
            Self::After | Self::NewerThan | Self::Larger => Op::Greater,
            Self::Before | Self::OlderThan | Self::Smaller => Op::Less,
            Self::Keyword
            | Self::Cc
            | Self::Bcc
            | Self::Subject
            | Self::Body
            | Self::Filename
            | Self::List
            | Self::DeliveredTo
            | Self::Rfc822MsgId
            | Self::Unknown(_) => {
                if quoted {
                    Op::Phrase
                } else {
                    Op::Contains
                }
            }
        }
    }
}

/// The comparison a predicate requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Op {
    /// Normalized, case-insensitive substring
    Contains,
    /// Quoted literal substring, spaces included
    Phrase,
    /// `+word`: case-folded substring without further normalization
    Exact,
    Equals,
    Member,
    Greater,
    Less,
}

/// A predicate's value as written, quotes stripped
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Token {
    pub text: String,
    pub quoted: bool,
}

impl Token {
    #[must_use]
    pub fn bare(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            quoted: false,
        }
    }

    #[must_use]
    pub fn quoted(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            quoted: true,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.quoted || self.text.chars().any(char::is_whitespace) || self.text.is_empty() {
            write!(f, "\"{}\"", self.text.replace('"', ""))
        } else {
            f.write_str(&self.text)
        }
    }
}

/// A parsed query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum Node {
    Predicate {
        field: FieldKind,
        op: Op,
        value: Token,
    },
    And {
        children: Vec<Node>,
    },
    Or {
        children: Vec<Node>,
    },
    Not {
        child: Box<Node>,
    },
}

impl Node {
    /// The empty conjunction. Matches every document.
    #[must_use]
    pub const fn match_all() -> Self {
        Self::And {
            children: Vec::new(),
        }
    }

    #[must_use]
    pub const fn predicate(field: FieldKind, op: Op, value: Token) -> Self {
        Self::Predicate { field, op, value }
    }

    /// Conjunction, with nested `And`s flattened and single children unwrapped.
    #[must_use]
    pub fn and(children: Vec<Self>) -> Self {
        let mut flat = Vec::with_capacity(children.len());
        for child in children {
            match child {
                Self::And { children } => flat.extend(children),
                other => flat.push(other),
            }
        }
        if flat.len() == 1 {
            return flat.remove(0);
        }
        Self::And { children: flat }
    }

    /// Disjunction, with nested `Or`s flattened and single children unwrapped.
    ///
    /// An empty disjunction is returned as-is and matches nothing.
    #[must_use]
    pub fn or(children: Vec<Self>) -> Self {
        let mut flat = Vec::with_capacity(children.len());
        for child in children {
            match child {
                Self::Or { children } => flat.extend(children),
                other => flat.push(other),
            }
        }
        if flat.len() == 1 {
            return flat.remove(0);
        }
        Self::Or { children: flat }
    }

    /// Negation. A doubly negated node collapses to itself.
    #[must_use]
    pub fn not(child: Self) -> Self {
        match child {
            Self::Not { child } => *child,
            other => Self::Not {
                child: Box::new(other),
            },
        }
    }

    #[must_use]
    pub fn is_match_all(&self) -> bool {
        matches!(self, Self::And { children } if children.is_empty())
    }

    /// Number of predicate leaves.
    #[must_use]
    pub fn predicate_count(&self) -> usize {
        match self {
            Self::Predicate { .. } => 1,
            Self::And { children } | Self::Or { children } => {
                children.iter().map(Self::predicate_count).sum()
            }
            Self::Not { child } => child.predicate_count(),
        }
    }

    /// Height of the tree; a lone predicate has depth 1.
    #[must_use]
    pub fn depth(&self) -> usize {
        match self {
            Self::Predicate { .. } => 1,
            Self::And { children } | Self::Or { children } => {
                1 + children.iter().map(Self::depth).max().unwrap_or(0)
            }
            Self::Not { child } => 1 + child.depth(),
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Predicate { field, op, value } => match field.key() {
                None if *op == Op::Exact => write!(f, "+{value}"),
                None => write!(f, "{value}"),
                Some(key) => write!(f, "{key}:{value}"),
            },
            Self::And { children } if children.is_empty() => f.write_str("*"),
            Self::Or { children } if children.is_empty() => f.write_str("(OR)"),
            Self::And { children } => write_joined(f, children, " AND "),
            Self::Or { children } => write_joined(f, children, " OR "),
            Self::Not { child } => write!(f, "-{child}"),
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, children: &[Node], sep: &str) -> fmt::Result {
    f.write_str("(")?;
    for (i, child) in children.iter().enumerate() {
        if i > 0 {
            f.write_str(sep)?;
        }
        write!(f, "{child}")?;
    }
    f.write_str(")")
}
