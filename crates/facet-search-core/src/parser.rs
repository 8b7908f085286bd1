//! Query parser
//!
//! Recursive descent over the lexer's output:
//!
//! ```text
//! query   := or_expr
//! or_expr := and_expr ("OR" and_expr)*
//! and_expr:= unary (["AND"] unary)*          whitespace is AND
//! unary   := "-"* primary
//! primary := "(" or_expr ")" | "{" unary* "}" | term
//! ```
//!
//! Inside `{ }` whitespace means OR. Parsing is total: malformed input is
//! repaired (and reported through [`ParseWarning`]) rather than rejected.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::SearchConfig;
use crate::lexer::{self, Bracket, Lexeme};
use crate::query::{FIELD_KEYS, FieldKind, Node, Op, Token};

/// A non-fatal problem found while parsing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParseWarning {
    /// `key:value` with an unrecognised key; matches nothing
    UnknownField {
        field: String,
        suggestion: Option<String>,
    },
    /// `OR`, `AND`, `-` or `+` with nothing to apply to; dropped
    DanglingOperator { operator: String },
    /// Stray closer (dropped) or group left open at end of input (closed)
    UnbalancedGroup { bracket: char },
    /// `key:` with nothing after it
    EmptyValue { field: String },
    /// Input longer than the configured bound; the tail was ignored
    Truncated { max_chars: usize },
    /// Brackets nested past the configured bound were flattened
    DepthLimited { max_depth: usize },
}

impl fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownField {
                field,
                suggestion: Some(s),
            } => write!(f, "unknown field '{field}' (did you mean '{s}'?)"),
            Self::UnknownField { field, .. } => write!(f, "unknown field '{field}'"),
            Self::DanglingOperator { operator } => {
                write!(f, "dangling operator '{operator}' ignored")
            }
            Self::UnbalancedGroup { bracket } => write!(f, "unbalanced '{bracket}'"),
            Self::EmptyValue { field } => write!(f, "empty value for '{field}'"),
            Self::Truncated { max_chars } => {
                write!(f, "query truncated to {max_chars} characters")
            }
            Self::DepthLimited { max_depth } => {
                write!(f, "groups nested deeper than {max_depth} were flattened")
            }
        }
    }
}

/// AST plus everything the parser had to repair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseOutcome {
    pub ast: Node,
    pub warnings: Vec<ParseWarning>,
}

/// Bounded query parser
#[derive(Debug, Clone, Copy)]
pub struct QueryParser {
    max_query_chars: usize,
    max_group_depth: usize,
}

impl Default for QueryParser {
    fn default() -> Self {
        Self::new(&SearchConfig::default())
    }
}

impl QueryParser {
    #[must_use]
    pub const fn new(config: &SearchConfig) -> Self {
        Self {
            max_query_chars: config.max_query_chars,
            max_group_depth: config.max_group_depth,
        }
    }

    /// Parse `raw` into an AST. Never fails.
    #[must_use]
    pub fn parse(&self, raw: &str) -> Node {
        self.parse_with_warnings(raw).ast
    }

    /// Parse `raw`, also returning the repairs that were made.
    #[must_use]
    pub fn parse_with_warnings(&self, raw: &str) -> ParseOutcome {
        let mut warnings = Vec::new();
        let bounded: String;
        let input = if raw.chars().nth(self.max_query_chars).is_some() {
            warnings.push(ParseWarning::Truncated {
                max_chars: self.max_query_chars,
            });
            bounded = raw.chars().take(self.max_query_chars).collect();
            bounded.as_str()
        } else {
            raw
        };

        let lexemes = lexer::lex(input, self.max_group_depth, &mut warnings);
        let mut parser = Parser {
            lexemes,
            pos: 0,
            warnings: &mut warnings,
        };
        let ast = parser.parse_query();

        tracing::debug!(
            query = raw,
            ast = %ast,
            warnings = warnings.len(),
            "parsed query"
        );
        ParseOutcome { ast, warnings }
    }
}

/// Parse with default bounds.
#[must_use]
pub fn parse(raw: &str) -> Node {
    QueryParser::default().parse(raw)
}

/// Parse with default bounds, keeping warnings.
#[must_use]
pub fn parse_with_warnings(raw: &str) -> ParseOutcome {
    QueryParser::default().parse_with_warnings(raw)
}

struct Parser<'w> {
    lexemes: Vec<Lexeme>,
    pos: usize,
    warnings: &'w mut Vec<ParseWarning>,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Lexeme> {
        self.lexemes.get(self.pos)
    }

    fn peek_is_or(&self) -> bool {
        matches!(self.peek(), Some(Lexeme::Or))
    }

    fn dangling(&mut self, operator: &str) {
        self.warnings.push(ParseWarning::DanglingOperator {
            operator: operator.to_owned(),
        });
    }

    fn parse_query(&mut self) -> Node {
        let mut parts = Vec::new();
        loop {
            if let Some(node) = self.parse_or() {
                parts.push(node);
            }
            if self.pos >= self.lexemes.len() {
                break;
            }
            // A closer with no opener at this level; the lexer normally drops these.
            self.pos += 1;
        }
        Node::and(parts)
    }

    fn parse_or(&mut self) -> Option<Node> {
        let mut branches = Vec::new();
        let mut seen_or = false;
        loop {
            let branch = self.parse_and();
            let empty = branch.is_none();
            branches.extend(branch);
            if empty && (seen_or || self.peek_is_or()) {
                self.dangling("OR");
            }
            if !self.peek_is_or() {
                break;
            }
            self.pos += 1;
            seen_or = true;
        }
        if branches.is_empty() {
            None
        } else {
            Some(Node::or(branches))
        }
    }

    fn parse_and(&mut self) -> Option<Node> {
        let mut children = Vec::new();
        loop {
            match self.peek() {
                None | Some(Lexeme::Or | Lexeme::Close(_)) => break,
                Some(Lexeme::And) => {
                    self.pos += 1;
                    let nothing_follows = matches!(
                        self.peek(),
                        None | Some(Lexeme::Or | Lexeme::And | Lexeme::Close(_))
                    );
                    if children.is_empty() || nothing_follows {
                        self.dangling("AND");
                    }
                }
                Some(_) => children.extend(self.parse_unary()),
            }
        }
        if children.is_empty() {
            None
        } else {
            Some(Node::and(children))
        }
    }

    fn parse_unary(&mut self) -> Option<Node> {
        let mut negated = false;
        let mut saw_minus = false;
        while matches!(self.peek(), Some(Lexeme::Minus)) {
            self.pos += 1;
            negated = !negated;
            saw_minus = true;
        }
        match self.parse_primary() {
            Some(node) if negated => Some(Node::not(node)),
            Some(node) => Some(node),
            None => {
                if saw_minus {
                    self.dangling("-");
                }
                None
            }
        }
    }

    fn parse_primary(&mut self) -> Option<Node> {
        let node = match self.peek()? {
            Lexeme::Open(bracket) => {
                let bracket = *bracket;
                self.pos += 1;
                let inner = match bracket {
                    Bracket::Paren => self.parse_or(),
                    Bracket::Curly => self.parse_curly(),
                };
                if self.peek() == Some(&Lexeme::Close(bracket)) {
                    self.pos += 1;
                }
                return inner;
            }
            Lexeme::Minus | Lexeme::Or | Lexeme::And | Lexeme::Close(_) => return None,
            Lexeme::Phrase(text) => keyword(Op::Phrase, Token::quoted(text.clone())),
            Lexeme::Plus(word) => keyword(Op::Exact, Token::bare(word.clone())),
            Lexeme::Word(word) => keyword(Op::Contains, Token::bare(word.clone())),
            Lexeme::Field { key, value, quoted } => {
                let field = FieldKind::from_key(key);
                let token = Token {
                    text: value.clone(),
                    quoted: *quoted,
                };
                let op = field.default_op(token.quoted);
                Node::predicate(field, op, token)
            }
        };
        self.pos += 1;
        self.check_predicate(&node);
        Some(node)
    }

    fn parse_curly(&mut self) -> Option<Node> {
        let mut branches = Vec::new();
        loop {
            match self.peek() {
                None | Some(Lexeme::Close(_)) => break,
                Some(Lexeme::Or | Lexeme::And) => self.pos += 1,
                Some(_) => branches.extend(self.parse_unary()),
            }
        }
        if branches.is_empty() {
            None
        } else {
            Some(Node::or(branches))
        }
    }

    fn check_predicate(&mut self, node: &Node) {
        let Node::Predicate { field, value, .. } = node else {
            return;
        };
        if let FieldKind::Unknown(key) = field {
            self.warnings.push(ParseWarning::UnknownField {
                field: key.clone(),
                suggestion: suggest_field(key).map(str::to_owned),
            });
        }
        if value.is_empty() {
            self.warnings.push(ParseWarning::EmptyValue {
                field: field.key().unwrap_or("keyword").to_owned(),
            });
        }
    }
}

const fn keyword(op: Op, value: Token) -> Node {
    Node::predicate(FieldKind::Keyword, op, value)
}

fn levenshtein_distance(a: &str, b: &str) -> usize {
    if a == b {
        return 0;
    }
    if a.is_empty() {
        return b.chars().count();
    }
    if b.is_empty() {
        return a.chars().count();
    }

    let b_chars: Vec<char> = b.chars().collect();
    let mut prev_row: Vec<usize> = (0..=b_chars.len()).collect();
    let mut cur_row = vec![0; b_chars.len() + 1];

    for (i, a_ch) in a.chars().enumerate() {
        cur_row[0] = i + 1;
        for (j, b_ch) in b_chars.iter().enumerate() {
            let cost = usize::from(a_ch != *b_ch);
            cur_row[j + 1] = (prev_row[j + 1] + 1)
                .min(cur_row[j] + 1)
                .min(prev_row[j] + cost);
        }
        prev_row.copy_from_slice(&cur_row);
    }
    prev_row[b_chars.len()]
}

/// Closest known field key within edit distance 2; ties go to the
/// lexicographically smaller key.
fn suggest_field(key: &str) -> Option<&'static str> {
    let lower = key.to_ascii_lowercase();
    FIELD_KEYS
        .iter()
        .map(|candidate| (*candidate, levenshtein_distance(&lower, candidate)))
        .filter(|(_, distance)| *distance <= 2)
        .min_by(|(a, da), (b, db)| da.cmp(db).then_with(|| a.cmp(b)))
        .map(|(candidate, _)| candidate)
}
