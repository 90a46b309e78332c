//! Token substitution for `COPY ... REPLACING` and `REPLACE`.
//!
//! Patterns match sequences of significant tokens, so a multi-word pattern
//! matches regardless of the spacing or line breaks between the words in
//! the source. Every token a replacement produces takes the provenance of
//! the text it replaced.

use std::sync::Arc;

use cobol_lsp_core::Locality;

use crate::lexer::{scan, SourceFormat, Token, TokenKind};

/// Which part of a word a pattern matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchMode {
    /// The pattern matches whole tokens.
    #[default]
    Full,
    /// The pattern matches the start of a word (`LEADING`).
    Leading,
    /// The pattern matches the end of a word (`TRAILING`).
    Trailing,
}

/// One `pattern BY replacement` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replacement {
    pattern: Vec<Token>,
    replacement: Vec<Token>,
    mode: MatchMode,
}

impl Replacement {
    /// Build a pair from directive tokens. Trivia is dropped from the
    /// pattern and trimmed from both ends of the replacement.
    pub fn from_tokens(pattern: Vec<Token>, replacement: Vec<Token>, mode: MatchMode) -> Self {
        let pattern = pattern.into_iter().filter(Token::is_significant).collect();
        let first = replacement.iter().position(Token::is_significant);
        let last = replacement.iter().rposition(Token::is_significant);
        let replacement = match (first, last) {
            (Some(first), Some(last)) => replacement[first..=last].to_vec(),
            _ => Vec::new(),
        };
        Self {
            pattern,
            replacement,
            mode,
        }
    }

    /// Build a whole-token pair from source text, e.g.
    /// `Replacement::new(":TAG:", "WS")`.
    pub fn new(pattern: &str, replacement: &str) -> Self {
        Self::with_mode(pattern, replacement, MatchMode::Full)
    }

    /// Build a `LEADING` pair from source text.
    pub fn leading(pattern: &str, replacement: &str) -> Self {
        Self::with_mode(pattern, replacement, MatchMode::Leading)
    }

    /// Build a `TRAILING` pair from source text.
    pub fn trailing(pattern: &str, replacement: &str) -> Self {
        Self::with_mode(pattern, replacement, MatchMode::Trailing)
    }

    fn with_mode(pattern: &str, replacement: &str, mode: MatchMode) -> Self {
        let uri: Arc<str> = Arc::from("<replacing>");
        let pattern = scan(pattern, Arc::clone(&uri), SourceFormat::Free).result;
        let replacement = scan(replacement, uri, SourceFormat::Free).result;
        Self::from_tokens(pattern, replacement, mode)
    }

    /// Match mode.
    pub fn mode(&self) -> MatchMode {
        self.mode
    }

    /// Pattern tokens.
    pub fn pattern(&self) -> &[Token] {
        &self.pattern
    }

    /// Replacement tokens.
    pub fn replacement(&self) -> &[Token] {
        &self.replacement
    }

    /// Text of the pattern, words separated by single spaces.
    pub fn pattern_text(&self) -> String {
        join_text(&self.pattern)
    }

    /// A single `:TAG:` word, which also matches inside larger words.
    fn tag(&self) -> Option<String> {
        match self.pattern.as_slice() {
            [only] if only.kind == TokenKind::Word
                && only.text.len() > 2
                && only.text.starts_with(':')
                && only.text.ends_with(':') =>
            {
                Some(only.text.to_ascii_uppercase())
            }
            _ => None,
        }
    }

    fn replacement_text(&self) -> String {
        self.replacement
            .iter()
            .filter(|t| t.is_significant())
            .map(|t| t.text.as_str())
            .collect()
    }
}

/// Applies replacement pairs to token streams.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReplacingService;

impl ReplacingService {
    /// Create the service.
    pub fn new() -> Self {
        Self
    }

    /// Apply `replacements` to `tokens` in one left-to-right pass.
    ///
    /// At each significant token the pairs are tried in declared order and
    /// the first that matches wins. Replacement output is not rescanned.
    /// Markers are never matched and a match never spans one. With no pairs,
    /// or no match, the output equals the input.
    pub fn apply(&self, tokens: &[Token], replacements: &[Replacement]) -> Vec<Token> {
        if replacements.is_empty() {
            return tokens.to_vec();
        }

        let mut output = Vec::with_capacity(tokens.len());
        let mut i = 0;
        while i < tokens.len() {
            if !tokens[i].is_significant() {
                output.push(tokens[i].clone());
                i += 1;
                continue;
            }
            match replacements
                .iter()
                .find_map(|r| match_at(tokens, i, r))
            {
                Some((next, produced)) => {
                    output.extend(produced);
                    i = next;
                }
                None => {
                    output.push(tokens[i].clone());
                    i += 1;
                }
            }
        }
        output
    }
}

/// Try `replacement` at `start`. On a match, return the index after the
/// matched tokens and the tokens to emit instead.
fn match_at(tokens: &[Token], start: usize, replacement: &Replacement) -> Option<(usize, Vec<Token>)> {
    if replacement.pattern.is_empty() {
        return None;
    }
    if let Some(tag) = replacement.tag() {
        return match_tag(&tokens[start], &tag, replacement).map(|produced| (start + 1, produced));
    }
    match replacement.mode {
        MatchMode::Full => match_full(tokens, start, replacement),
        MatchMode::Leading | MatchMode::Trailing => {
            match_partial(&tokens[start], replacement).map(|produced| (start + 1, produced))
        }
    }
}

fn match_full(tokens: &[Token], start: usize, replacement: &Replacement) -> Option<(usize, Vec<Token>)> {
    let mut last = start;
    for (k, expected) in replacement.pattern.iter().enumerate() {
        let at = if k == 0 {
            start
        } else {
            next_significant(tokens, last + 1)?
        };
        let actual = &tokens[at];
        if actual.kind != expected.kind || actual.match_text() != expected.match_text() {
            return None;
        }
        last = at;
    }

    let locality = tokens[start].locality.to(&tokens[last].locality);
    Some((last + 1, relocate(&replacement.replacement, &locality)))
}

fn match_partial(token: &Token, replacement: &Replacement) -> Option<Vec<Token>> {
    if token.kind != TokenKind::Word {
        return None;
    }
    let pattern = replacement.pattern.first()?.text.to_ascii_uppercase();
    let upper = token.text.to_ascii_uppercase();
    let with = replacement.replacement_text();
    let text = match replacement.mode {
        MatchMode::Leading if upper.starts_with(&pattern) => {
            format!("{}{}", with, &token.text[pattern.len()..])
        }
        MatchMode::Trailing if upper.ends_with(&pattern) => {
            format!("{}{}", &token.text[..token.text.len() - pattern.len()], with)
        }
        _ => return None,
    };
    Some(word_or_nothing(text, &token.locality))
}

fn match_tag(token: &Token, tag: &str, replacement: &Replacement) -> Option<Vec<Token>> {
    if token.kind != TokenKind::Word {
        return None;
    }
    let upper = token.text.to_ascii_uppercase();
    if upper == tag {
        return Some(relocate(&replacement.replacement, &token.locality));
    }
    if !upper.contains(tag) {
        return None;
    }

    let with = replacement.replacement_text();
    let mut text = String::with_capacity(token.text.len());
    let mut rest = 0;
    for (at, _) in upper.match_indices(tag) {
        text.push_str(&token.text[rest..at]);
        text.push_str(&with);
        rest = at + tag.len();
    }
    text.push_str(&token.text[rest..]);
    Some(word_or_nothing(text, &token.locality))
}

fn next_significant(tokens: &[Token], from: usize) -> Option<usize> {
    let mut j = from;
    while j < tokens.len() {
        let kind = tokens[j].kind;
        if kind.is_marker() {
            return None;
        }
        if !kind.is_trivia() {
            return Some(j);
        }
        j += 1;
    }
    None
}

fn relocate(tokens: &[Token], locality: &Locality) -> Vec<Token> {
    tokens
        .iter()
        .map(|t| Token::new(t.kind, t.text.clone(), locality.clone()))
        .collect()
}

fn word_or_nothing(text: String, locality: &Locality) -> Vec<Token> {
    if text.is_empty() {
        Vec::new()
    } else {
        vec![Token::new(TokenKind::Word, text, locality.clone())]
    }
}

fn join_text(tokens: &[Token]) -> String {
    tokens
        .iter()
        .map(|t| t.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}
