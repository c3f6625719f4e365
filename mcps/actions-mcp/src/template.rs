//! Command templates
//!
//! A command string is tokenized exactly once, at load time, into words; each
//! word is parsed into literal and `$NAME` placeholder segments. Rendering
//! substitutes resolved values into that fixed structure. A raw command line
//! is never re-split at call time, so a value containing spaces, semicolons,
//! backticks or `$(...)` lands inside exactly one argument-vector element and
//! no shell ever gets a chance to interpret it.

use std::collections::BTreeSet;
use std::collections::HashMap;

/// One piece of a word: literal text or a named placeholder
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Placeholder(String),
}

/// One argument-vector slot, as a sequence of segments
///
/// Most words are a single literal or a single placeholder; a mixed word like
/// `--file=$TARGET` has both and still renders into one slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Word {
    segments: Vec<Segment>,
}

/// A pre-tokenized command template
#[derive(Debug, Clone)]
pub struct CommandTemplate {
    raw: String,
    words: Vec<Word>,
}

impl CommandTemplate {
    /// Tokenize a raw command string
    ///
    /// Word splitting understands single quotes, double quotes and backslash
    /// escapes, the usual POSIX-ish subset. Placeholders are recognized in
    /// every word regardless of quoting; quoting only affects word
    /// boundaries.
    pub fn parse(raw: &str) -> Result<Self, String> {
        let parts = split_words(raw)?;
        if parts.is_empty() {
            return Err("command is empty".to_string());
        }
        let words = parts.iter().map(|w| parse_segments(w)).collect();
        Ok(Self {
            raw: raw.to_string(),
            words,
        })
    }

    /// The original command string, for display only
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Names of every placeholder referenced by this template
    pub fn placeholder_names(&self) -> BTreeSet<&str> {
        self.words
            .iter()
            .flat_map(|w| w.segments.iter())
            .filter_map(|s| match s {
                Segment::Placeholder(name) => Some(name.as_str()),
                Segment::Literal(_) => None,
            })
            .collect()
    }

    /// Render the final argument vector
    ///
    /// Each word yields exactly one element. Placeholders are looked up in
    /// `values`; the loader guarantees every placeholder names a declared
    /// parameter and the resolver supplies a value for every parameter.
    pub fn render(&self, values: &HashMap<String, String>) -> Vec<String> {
        self.words
            .iter()
            .map(|word| {
                let mut out = String::new();
                for segment in &word.segments {
                    match segment {
                        Segment::Literal(text) => out.push_str(text),
                        Segment::Placeholder(name) => {
                            if let Some(value) = values.get(name) {
                                out.push_str(value);
                            }
                        }
                    }
                }
                out
            })
            .collect()
    }
}

/// Quote-aware word splitting
fn split_words(raw: &str) -> Result<Vec<String>, String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut chars = raw.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            ' ' | '\t' | '\n' => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            '\'' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some('\'') => break,
                        Some(inner) => current.push(inner),
                        None => return Err("unclosed single quote in command".to_string()),
                    }
                }
            }
            '"' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some('\\') => match chars.next() {
                            Some(escaped) => current.push(escaped),
                            None => return Err("unclosed double quote in command".to_string()),
                        },
                        Some(inner) => current.push(inner),
                        None => return Err("unclosed double quote in command".to_string()),
                    }
                }
            }
            '\\' => {
                in_word = true;
                match chars.next() {
                    Some(escaped) => current.push(escaped),
                    None => return Err("trailing backslash in command".to_string()),
                }
            }
            other => {
                in_word = true;
                current.push(other);
            }
        }
    }

    if in_word {
        words.push(current);
    }

    Ok(words)
}

/// Split a word into literal and `$NAME` placeholder segments
///
/// An identifier is `[A-Za-z_][A-Za-z0-9_]*`. A `$` not followed by an
/// identifier stays literal. Identifier parsing makes `$TARGET_FILE` and
/// `$TARGET` unambiguous without any substitution-order tricks.
fn parse_segments(word: &str) -> Word {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut chars = word.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '$' {
            let mut name = String::new();
            if let Some(&first) = chars.peek() {
                if first.is_ascii_alphabetic() || first == '_' {
                    name.push(first);
                    chars.next();
                    while let Some(&next) = chars.peek() {
                        if next.is_ascii_alphanumeric() || next == '_' {
                            name.push(next);
                            chars.next();
                        } else {
                            break;
                        }
                    }
                }
            }
            if name.is_empty() {
                literal.push('$');
            } else {
                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                segments.push(Segment::Placeholder(name));
            }
        } else {
            literal.push(c);
        }
    }

    if !literal.is_empty() || segments.is_empty() {
        segments.push(Segment::Literal(literal));
    }

    Word { segments }
}
