//! Query lexer
//!
//! Splits raw query text into [`Lexeme`]s. The output is bracket-balanced
//! except for groups left open at end of input: stray closers are dropped here,
//! and so is any bracket nested deeper than the configured limit (together
//! with its matching closer).

use crate::parser::ParseWarning;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bracket {
    Paren,
    Curly,
}

impl Bracket {
    const fn open_char(self) -> char {
        match self {
            Self::Paren => '(',
            Self::Curly => '{',
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lexeme {
    /// `"..."` at term position
    Phrase(String),
    Open(Bracket),
    Close(Bracket),
    /// `-` immediately followed by a term or group
    Minus,
    Or,
    And,
    /// `+word`
    Plus(String),
    Word(String),
    Field {
        key: String,
        value: String,
        quoted: bool,
    },
}

#[derive(Debug, Clone, Copy)]
enum OpenSlot {
    Kept(Bracket),
    Flattened(Bracket),
}

const fn is_bracket(ch: char) -> bool {
    matches!(ch, '(' | ')' | '{' | '}')
}

fn ends_word(ch: char) -> bool {
    ch.is_whitespace() || is_bracket(ch) || ch == '"'
}

fn is_field_key(key: &str) -> bool {
    !key.is_empty() && key.chars().all(|c| c.is_alphanumeric() || c == '_')
}

struct Cursor<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
}

impl Cursor<'_> {
    fn take_until_quote(&mut self) -> String {
        let mut out = String::new();
        for ch in self.chars.by_ref() {
            if ch == '"' {
                break;
            }
            out.push(ch);
        }
        out
    }

    fn take_word(&mut self) -> String {
        let mut out = String::new();
        while let Some(&ch) = self.chars.peek() {
            if ends_word(ch) {
                break;
            }
            out.push(ch);
            self.chars.next();
        }
        out
    }
}

/// Tokenize `input`, which the caller has already length-bounded.
pub fn lex(input: &str, max_depth: usize, warnings: &mut Vec<ParseWarning>) -> Vec<Lexeme> {
    let mut out = Vec::new();
    let mut stack: Vec<OpenSlot> = Vec::new();
    let mut depth_warned = false;
    let mut cursor = Cursor {
        chars: input.chars().peekable(),
    };

    while let Some(&ch) = cursor.chars.peek() {
        if ch.is_whitespace() {
            cursor.chars.next();
            continue;
        }
        match ch {
            '"' => {
                cursor.chars.next();
                out.push(Lexeme::Phrase(cursor.take_until_quote()));
            }
            '(' | '{' => {
                cursor.chars.next();
                let bracket = if ch == '(' {
                    Bracket::Paren
                } else {
                    Bracket::Curly
                };
                let kept = stack
                    .iter()
                    .filter(|slot| matches!(slot, OpenSlot::Kept(_)))
                    .count();
                if kept >= max_depth {
                    if !depth_warned {
                        warnings.push(ParseWarning::DepthLimited { max_depth });
                        depth_warned = true;
                    }
                    stack.push(OpenSlot::Flattened(bracket));
                } else {
                    stack.push(OpenSlot::Kept(bracket));
                    out.push(Lexeme::Open(bracket));
                }
            }
            ')' | '}' => {
                cursor.chars.next();
                let bracket = if ch == ')' {
                    Bracket::Paren
                } else {
                    Bracket::Curly
                };
                match stack.last() {
                    Some(OpenSlot::Kept(open)) if *open == bracket => {
                        stack.pop();
                        out.push(Lexeme::Close(bracket));
                    }
                    Some(OpenSlot::Flattened(open)) if *open == bracket => {
                        stack.pop();
                    }
                    _ => warnings.push(ParseWarning::UnbalancedGroup { bracket: ch }),
                }
            }
            '-' => {
                cursor.chars.next();
                match cursor.chars.peek() {
                    Some(&next) if !next.is_whitespace() && next != ')' && next != '}' => {
                        out.push(Lexeme::Minus);
                    }
                    _ => warnings.push(ParseWarning::DanglingOperator {
                        operator: "-".to_owned(),
                    }),
                }
            }
            '+' => {
                cursor.chars.next();
                let word = cursor.take_word();
                if word.is_empty() {
                    warnings.push(ParseWarning::DanglingOperator {
                        operator: "+".to_owned(),
                    });
                } else {
                    out.push(Lexeme::Plus(word));
                }
            }
            _ => {
                let word = cursor.take_word();
                out.push(classify_word(word, &mut cursor));
            }
        }
    }

    for slot in stack.iter().rev() {
        if let OpenSlot::Kept(open) = slot {
            warnings.push(ParseWarning::UnbalancedGroup {
                bracket: open.open_char(),
            });
        }
    }
    out
}

fn classify_word(word: String, cursor: &mut Cursor<'_>) -> Lexeme {
    if word.eq_ignore_ascii_case("or") {
        return Lexeme::Or;
    }
    if word.eq_ignore_ascii_case("and") {
        return Lexeme::And;
    }
    let Some((key, value)) = word.split_once(':') else {
        return Lexeme::Word(word);
    };
    if !is_field_key(key) {
        return Lexeme::Word(word);
    }
    if value.is_empty() && cursor.chars.peek() == Some(&'"') {
        cursor.chars.next();
        return Lexeme::Field {
            key: key.to_owned(),
            value: cursor.take_until_quote(),
            quoted: true,
        };
    }
    Lexeme::Field {
        key: key.to_owned(),
        value: value.to_owned(),
        quoted: false,
    }
}
