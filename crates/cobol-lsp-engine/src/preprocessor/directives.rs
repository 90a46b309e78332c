//! Parsing of compiler-directing statements: `COPY`, `EXEC SQL INCLUDE` and
//! `REPLACE`.

use cobol_lsp_core::{Diagnostic, ErrorKind, Locality};

use crate::lexer::{Token, TokenKind};
use crate::preprocessor::replacing::{MatchMode, Replacement};

/// Which directive starts at a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectiveKind {
    /// `COPY name ...`
    Copy,
    /// `EXEC SQL INCLUDE name END-EXEC`
    SqlInclude,
    /// `REPLACE ...`
    Replace,
}

/// A parsed inclusion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyDirective {
    /// Upper-cased copybook name.
    pub name: String,
    /// Locality of the name token.
    pub name_locality: Locality,
    /// `REPLACING` pairs, in declared order.
    pub replacing: Vec<Replacement>,
}

/// A parsed `REPLACE`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplaceDirective {
    /// `REPLACE [ALSO] pairs.`
    Set {
        also: bool,
        replacements: Vec<Replacement>,
    },
    /// `REPLACE [LAST] OFF.`
    Off { last: bool },
}

/// A parsed directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    Copy(CopyDirective),
    Replace(ReplaceDirective),
}

/// Result of parsing the directive that starts at some token.
#[derive(Debug, Clone)]
pub struct ParsedDirective {
    /// The directive, or `None` if it was malformed.
    pub directive: Option<Directive>,
    /// Index of the first token after the directive.
    pub end: usize,
    /// Span of the whole directive.
    pub locality: Locality,
    /// Problems found.
    pub errors: Vec<Diagnostic>,
}

/// The directive starting at `tokens[i]`, if any.
pub fn directive_at(tokens: &[Token], i: usize) -> Option<DirectiveKind> {
    let token = tokens.get(i)?;
    if token.is_word("COPY") {
        return Some(DirectiveKind::Copy);
    }
    if token.is_word("REPLACE") {
        return Some(DirectiveKind::Replace);
    }
    if token.is_word("EXEC") {
        let mut cursor = Cursor::new(tokens, i + 1);
        let is_include = cursor.bump_word("SQL") && cursor.bump_word("INCLUDE");
        if is_include {
            return Some(DirectiveKind::SqlInclude);
        }
    }
    None
}

/// Parse the directive starting at `tokens[start]`, or `None` if no
/// directive starts there.
///
/// Malformed directives are skipped up to their terminating period (or to
/// the end of the stream) and reported.
pub fn parse_directive(tokens: &[Token], start: usize) -> Option<ParsedDirective> {
    let kind = directive_at(tokens, start)?;
    let mut cursor = Cursor::new(tokens, start);
    let outcome = match kind {
        DirectiveKind::Copy => parse_copy(&mut cursor).map(Directive::Copy),
        DirectiveKind::SqlInclude => parse_sql_include(&mut cursor).map(Directive::Copy),
        DirectiveKind::Replace => parse_replace(&mut cursor).map(Directive::Replace),
    };

    let (directive, failure) = match outcome {
        Ok(directive) => (Some(directive), None),
        Err(failure) => {
            if !failure.at_end {
                cursor.skip_past_period();
            }
            (None, Some(failure))
        }
    };

    let first = &tokens[start].locality;
    let locality = match cursor.last {
        Some(last) => first.to(&tokens[last].locality),
        None => first.clone(),
    };
    let errors = failure
        .map(|f| vec![Diagnostic::error(f.kind, f.message, locality.clone())])
        .unwrap_or_default();

    Some(ParsedDirective {
        directive,
        end: cursor.pos,
        locality,
        errors,
    })
}

struct Failure {
    kind: ErrorKind,
    message: String,
    /// The stream ended inside the directive.
    at_end: bool,
}

impl Failure {
    fn syntax(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::SyntaxError,
            message: message.into(),
            at_end: false,
        }
    }

    fn clause(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::ReplaceClauseError,
            message: message.into(),
            at_end: false,
        }
    }

    fn missing_period(directive: &str) -> Self {
        Self {
            kind: ErrorKind::SyntaxError,
            message: format!("Missing period after {directive} statement"),
            at_end: true,
        }
    }
}

type Parsed<T> = Result<T, Failure>;

/// Walks significant tokens, remembering the last one consumed.
struct Cursor<'a> {
    tokens: &'a [Token],
    pos: usize,
    last: Option<usize>,
}

impl<'a> Cursor<'a> {
    fn new(tokens: &'a [Token], pos: usize) -> Self {
        Self {
            tokens,
            pos,
            last: None,
        }
    }

    fn peek_index(&self) -> Option<usize> {
        (self.pos..self.tokens.len()).find(|&i| self.tokens[i].is_significant())
    }

    fn peek(&self) -> Option<&'a Token> {
        self.peek_index().map(|i| &self.tokens[i])
    }

    fn peek_second(&self) -> Option<&'a Token> {
        let first = self.peek_index()?;
        (first + 1..self.tokens.len())
            .find(|&i| self.tokens[i].is_significant())
            .map(|i| &self.tokens[i])
    }

    fn bump(&mut self) -> Option<&'a Token> {
        let i = self.peek_index()?;
        self.pos = i + 1;
        self.last = Some(i);
        Some(&self.tokens[i])
    }

    fn at_word(&self, word: &str) -> bool {
        self.peek().is_some_and(|t| t.is_word(word))
    }

    fn bump_word(&mut self, word: &str) -> bool {
        if self.at_word(word) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn at_period(&self) -> bool {
        self.peek().is_some_and(|t| t.kind == TokenKind::Period)
    }

    fn expect_period(&mut self, directive: &str) -> Parsed<()> {
        match self.peek() {
            Some(t) if t.kind == TokenKind::Period => {
                self.bump();
                Ok(())
            }
            Some(t) => Err(Failure::syntax(format!(
                "Unexpected '{}' in {directive} statement",
                t.text
            ))),
            None => Err(Failure::missing_period(directive)),
        }
    }

    fn skip_past_period(&mut self) {
        while let Some(token) = self.bump() {
            if token.kind == TokenKind::Period {
                break;
            }
        }
    }

    /// Raw tokens (trivia included) up to the closing `==`, which is consumed.
    fn pseudo_text(&mut self) -> Parsed<Vec<Token>> {
        let mut body = Vec::new();
        while self.pos < self.tokens.len() {
            let i = self.pos;
            self.pos += 1;
            if self.tokens[i].kind == TokenKind::PseudoTextDelimiter {
                self.last = Some(i);
                return Ok(body);
            }
            if self.tokens[i].is_significant() {
                self.last = Some(i);
            }
            body.push(self.tokens[i].clone());
        }
        Err(Failure {
            kind: ErrorKind::ReplaceClauseError,
            message: "Unterminated pseudo-text".to_string(),
            at_end: true,
        })
    }
}

const COPY_KEYWORDS: &[&str] = &["OF", "IN", "SUPPRESS", "REPLACING"];

fn is_name(token: &Token) -> bool {
    match token.kind {
        TokenKind::StringLiteral => true,
        TokenKind::Word => !COPY_KEYWORDS.iter().any(|k| token.is_word(k)),
        _ => false,
    }
}

fn parse_copy(cursor: &mut Cursor<'_>) -> Parsed<CopyDirective> {
    cursor.bump();
    let name_token = match cursor.peek() {
        Some(t) if is_name(t) => {
            cursor.bump();
            t
        }
        _ => return Err(Failure::syntax("Missing copybook name in COPY statement")),
    };

    // Copybooks are looked up by name alone; the library qualifier only
    // has to be well formed.
    if cursor.bump_word("OF") || cursor.bump_word("IN") {
        match cursor.peek() {
            Some(t) if is_name(t) => {
                cursor.bump();
            }
            _ => return Err(Failure::syntax("Missing library name in COPY statement")),
        }
    }

    cursor.bump_word("SUPPRESS");
    let replacing = if cursor.bump_word("REPLACING") {
        parse_pairs(cursor, "REPLACING")?
    } else {
        Vec::new()
    };
    cursor.expect_period("COPY")?;

    Ok(CopyDirective {
        name: name_token.name_value().to_ascii_uppercase(),
        name_locality: name_token.locality.clone(),
        replacing,
    })
}

fn parse_sql_include(cursor: &mut Cursor<'_>) -> Parsed<CopyDirective> {
    cursor.bump(); // EXEC
    cursor.bump(); // SQL
    cursor.bump(); // INCLUDE
    let name_token = match cursor.peek() {
        Some(t) if matches!(t.kind, TokenKind::Word | TokenKind::StringLiteral)
            && !t.is_word("END-EXEC") =>
        {
            cursor.bump();
            t
        }
        _ => return Err(Failure::syntax("Missing member name in EXEC SQL INCLUDE")),
    };

    match cursor.peek() {
        Some(t) if t.is_word("END-EXEC") => {
            cursor.bump();
        }
        Some(t) => {
            return Err(Failure::syntax(format!(
                "Unexpected '{}' in EXEC SQL INCLUDE, expected END-EXEC",
                t.text
            )))
        }
        None => {
            return Err(Failure {
                kind: ErrorKind::SyntaxError,
                message: "Missing END-EXEC after EXEC SQL INCLUDE".to_string(),
                at_end: true,
            })
        }
    }
    if cursor.at_period() {
        cursor.bump();
    }

    Ok(CopyDirective {
        name: name_token.name_value().to_ascii_uppercase(),
        name_locality: name_token.locality.clone(),
        replacing: Vec::new(),
    })
}

fn parse_replace(cursor: &mut Cursor<'_>) -> Parsed<ReplaceDirective> {
    cursor.bump();

    if cursor.bump_word("OFF") {
        cursor.expect_period("REPLACE")?;
        return Ok(ReplaceDirective::Off { last: false });
    }
    if cursor.at_word("LAST") && cursor.peek_second().is_some_and(|t| t.is_word("OFF")) {
        cursor.bump();
        cursor.bump();
        cursor.expect_period("REPLACE")?;
        return Ok(ReplaceDirective::Off { last: true });
    }

    let also = cursor.bump_word("ALSO");
    let replacements = parse_pairs(cursor, "REPLACE")?;
    cursor.expect_period("REPLACE")?;
    Ok(ReplaceDirective::Set { also, replacements })
}

fn parse_pairs(cursor: &mut Cursor<'_>, clause: &str) -> Parsed<Vec<Replacement>> {
    let mut pairs = Vec::new();
    while cursor.peek().is_some() && !cursor.at_period() {
        let mode = if cursor.bump_word("LEADING") {
            MatchMode::Leading
        } else if cursor.bump_word("TRAILING") {
            MatchMode::Trailing
        } else {
            MatchMode::Full
        };

        let pattern = parse_operand(cursor, true)?;
        if mode != MatchMode::Full
            && pattern.iter().filter(|t| t.is_significant()).count() != 1
        {
            return Err(Failure::clause(
                "LEADING and TRAILING operands must be a single word",
            ));
        }
        if !cursor.bump_word("BY") {
            return Err(Failure::clause(format!("Expected BY in {clause} clause")));
        }
        let replacement = parse_operand(cursor, false)?;
        pairs.push(Replacement::from_tokens(pattern, replacement, mode));
    }

    if pairs.is_empty() {
        return Err(Failure::clause(format!("{clause} clause has no operands")));
    }
    Ok(pairs)
}

fn parse_operand(cursor: &mut Cursor<'_>, is_pattern: bool) -> Parsed<Vec<Token>> {
    match cursor.peek() {
        Some(t) if t.kind == TokenKind::PseudoTextDelimiter => {
            cursor.bump();
            let body = cursor.pseudo_text()?;
            if is_pattern && !body.iter().any(Token::is_significant) {
                return Err(Failure::clause("Empty pseudo-text pattern"));
            }
            Ok(body)
        }
        Some(t)
            if matches!(t.kind, TokenKind::Word | TokenKind::StringLiteral) && !t.is_word("BY") =>
        {
            cursor.bump();
            Ok(vec![t.clone()])
        }
        Some(t) => Err(Failure::clause(format!("Unexpected '{}' in replacing operand", t.text))),
        None => Err(Failure {
            kind: ErrorKind::ReplaceClauseError,
            message: "Missing replacing operand".to_string(),
            at_end: true,
        }),
    }
}
