//! COBOL token scanner.
//!
//! Converts source text into a lossless token stream. Fixed-format sequence
//! and identification areas, comments, whitespace and line terminators all
//! become tokens of their own so the stream can be reassembled verbatim.

use std::sync::Arc;

use cobol_lsp_core::{
    Diagnostic, ErrorKind, InclusionChain, Lexer, Locality, Position, Range, ResultWithErrors,
};

use crate::lexer::source::{split_lines, Indicator, SourceFormat, SourceLine};
use crate::lexer::token::{Token, TokenKind};

/// Last column of the fixed-format program text area.
const FIXED_CODE_END: usize = 72;
/// Column of the fixed-format indicator (0-indexed).
const FIXED_INDICATOR: usize = 6;

/// The COBOL token scanner.
///
/// Every token is stamped with the scanner's document identifier and
/// inclusion chain, so copybook text scanned for expansion already carries
/// its full provenance.
#[derive(Debug, Clone)]
pub struct Scanner {
    uri: Arc<str>,
    chain: InclusionChain,
    format: SourceFormat,
    tokens: Vec<Token>,
    errors: Vec<Diagnostic>,
    /// The next code line carries a continuation indicator.
    continued: bool,
}

impl Scanner {
    /// Create a scanner for a top-level document.
    pub fn new(uri: Arc<str>, format: SourceFormat) -> Self {
        Self {
            uri,
            chain: Arc::from(Vec::new()),
            format,
            tokens: Vec::new(),
            errors: Vec::new(),
            continued: false,
        }
    }

    /// Stamp every produced token with the given inclusion chain.
    pub fn with_chain(mut self, chain: InclusionChain) -> Self {
        self.chain = chain;
        self
    }

    /// Scan a whole text.
    pub fn scan_all(mut self, text: &str) -> ResultWithErrors<Vec<Token>> {
        let lines = split_lines(text);
        for (i, line) in lines.iter().enumerate() {
            self.continued = self.format == SourceFormat::Fixed
                && lines[i + 1..]
                    .iter()
                    .map(fixed_indicator)
                    .find(|indicator| !matches!(indicator, Some(ind) if ind.is_ignored()))
                    .flatten()
                    == Some(Indicator::Continuation);
            self.scan_line(line);
        }
        ResultWithErrors::new(self.tokens, self.errors)
    }

    fn scan_line(&mut self, line: &SourceLine<'_>) {
        let chars: Vec<char> = line.content.chars().collect();

        match self.format {
            SourceFormat::Free => self.scan_code(line.number, &chars, 0),
            SourceFormat::Fixed => self.scan_fixed_line(line.number, &chars),
        }

        if !line.terminator.is_empty() {
            let col = chars.len() as u32 + 1;
            let range = Range::new(
                Position::new(line.number, col),
                Position::new(line.number + 1, 1),
            );
            let locality = Locality::new(Arc::clone(&self.uri), range).with_chain(Arc::clone(&self.chain));
            self.tokens
                .push(Token::new(TokenKind::Newline, line.terminator, locality));
        }
    }

    fn scan_fixed_line(&mut self, line: u32, chars: &[char]) {
        let seq_end = chars.len().min(FIXED_INDICATOR);
        if seq_end > 0 {
            self.push(TokenKind::SequenceArea, &chars[..seq_end], line, 0);
        }
        let Some(&indicator) = chars.get(FIXED_INDICATOR) else {
            return;
        };

        if Indicator::from_char(indicator).is_ignored() {
            self.push(TokenKind::Comment, &chars[FIXED_INDICATOR..], line, FIXED_INDICATOR);
            return;
        }
        self.push(
            TokenKind::SequenceArea,
            &chars[FIXED_INDICATOR..=FIXED_INDICATOR],
            line,
            FIXED_INDICATOR,
        );

        let code_end = chars.len().min(FIXED_CODE_END);
        if code_end > FIXED_INDICATOR + 1 {
            self.scan_code(line, &chars[FIXED_INDICATOR + 1..code_end], FIXED_INDICATOR + 1);
        }
        if chars.len() > FIXED_CODE_END {
            self.push(TokenKind::SequenceArea, &chars[FIXED_CODE_END..], line, FIXED_CODE_END);
        }
    }

    /// Scan a program text area. `base` is the 0-indexed column of `chars[0]`.
    fn scan_code(&mut self, line: u32, chars: &[char], base: usize) {
        let mut i = 0;
        while i < chars.len() {
            let ch = chars[i];
            let start = i;

            let kind = if is_blank(ch) {
                while i < chars.len() && is_blank(chars[i]) {
                    i += 1;
                }
                TokenKind::Whitespace
            } else if ch == '*' && chars.get(i + 1) == Some(&'>') {
                i = chars.len();
                TokenKind::Comment
            } else if ch == '=' && chars.get(i + 1) == Some(&'=') {
                i += 2;
                TokenKind::PseudoTextDelimiter
            } else if let Some(quote_at) = literal_start(chars, i) {
                i = self.scan_literal(line, chars, base, start, quote_at);
                TokenKind::StringLiteral
            } else {
                match ch {
                    '(' => {
                        i += 1;
                        TokenKind::LeftParen
                    }
                    ')' => {
                        i += 1;
                        TokenKind::RightParen
                    }
                    '.' if ends_separator(chars, i) => {
                        i += 1;
                        TokenKind::Period
                    }
                    ',' if ends_separator(chars, i) => {
                        i += 1;
                        TokenKind::Comma
                    }
                    ';' if ends_separator(chars, i) => {
                        i += 1;
                        TokenKind::Semicolon
                    }
                    _ => {
                        i += 1;
                        while i < chars.len() && !is_word_break(chars, i) {
                            i += 1;
                        }
                        TokenKind::Word
                    }
                }
            };

            self.push(kind, &chars[start..i], line, base + start);
        }
    }

    /// Scan a literal whose opening quote is at `quote_at`. Returns the index
    /// just past the literal.
    fn scan_literal(
        &mut self,
        line: u32,
        chars: &[char],
        base: usize,
        start: usize,
        quote_at: usize,
    ) -> usize {
        let quote = chars[quote_at];
        let mut j = quote_at + 1;
        while j < chars.len() {
            if chars[j] == quote {
                if chars.get(j + 1) == Some(&quote) {
                    j += 2;
                    continue;
                }
                return j + 1;
            }
            j += 1;
        }

        // The rest of the literal follows on a '-' indicator line.
        if !self.continued {
            let range = Range::new(
                Position::new(line, (base + start) as u32 + 1),
                Position::new(line, (base + chars.len()) as u32 + 1),
            );
            let locality = Locality::new(Arc::clone(&self.uri), range).with_chain(Arc::clone(&self.chain));
            self.errors.push(Diagnostic::error(
                ErrorKind::SyntaxError,
                "Unterminated literal",
                locality,
            ));
        }
        chars.len()
    }

    fn push(&mut self, kind: TokenKind, chars: &[char], line: u32, col0: usize) {
        let range = Range::new(
            Position::new(line, col0 as u32 + 1),
            Position::new(line, (col0 + chars.len()) as u32 + 1),
        );
        let locality = Locality::new(Arc::clone(&self.uri), range).with_chain(Arc::clone(&self.chain));
        let text: String = chars.iter().collect();
        self.tokens.push(Token::new(kind, text, locality));
    }
}

impl Lexer for Scanner {
    type Token = Token;
    type Error = Diagnostic;

    fn tokenize(&mut self, source: &str) -> (Vec<Token>, Vec<Diagnostic>) {
        let scanner = Scanner {
            uri: Arc::clone(&self.uri),
            chain: Arc::clone(&self.chain),
            format: self.format,
            tokens: Vec::new(),
            errors: Vec::new(),
            continued: false,
        };
        scanner.scan_all(source).into_parts()
    }
}

fn fixed_indicator(line: &SourceLine<'_>) -> Option<Indicator> {
    line.content.chars().nth(FIXED_INDICATOR).map(Indicator::from_char)
}

/// Scan a top-level document.
pub fn scan(text: &str, uri: Arc<str>, format: SourceFormat) -> ResultWithErrors<Vec<Token>> {
    Scanner::new(uri, format).scan_all(text)
}

/// Scan text that is reached through the given inclusion chain.
pub fn scan_with_chain(
    text: &str,
    uri: Arc<str>,
    chain: InclusionChain,
    format: SourceFormat,
) -> ResultWithErrors<Vec<Token>> {
    Scanner::new(uri, format).with_chain(chain).scan_all(text)
}

fn is_blank(ch: char) -> bool {
    ch.is_whitespace()
}

/// Whether the punctuation at `i` is followed by a blank or the end of the area.
fn ends_separator(chars: &[char], i: usize) -> bool {
    chars.get(i + 1).map_or(true, |&c| is_blank(c))
}

fn is_word_break(chars: &[char], i: usize) -> bool {
    match chars[i] {
        c if is_blank(c) => true,
        '(' | ')' | '"' | '\'' => true,
        '.' | ',' | ';' => ends_separator(chars, i),
        '=' => chars.get(i + 1) == Some(&'='),
        _ => false,
    }
}

/// If a literal starts at `i` (optionally with an X/N/Z/G/B/NX prefix),
/// return the index of its opening quote.
fn literal_start(chars: &[char], i: usize) -> Option<usize> {
    let is_quote = |at: usize| matches!(chars.get(at), Some('"') | Some('\''));
    if is_quote(i) {
        return Some(i);
    }
    let first = chars[i].to_ascii_uppercase();
    if matches!(first, 'X' | 'N' | 'Z' | 'G' | 'B') && is_quote(i + 1) {
        return Some(i + 1);
    }
    if first == 'N'
        && chars.get(i + 1).map(|c| c.to_ascii_uppercase()) == Some('X')
        && is_quote(i + 2)
    {
        return Some(i + 2);
    }
    None
}
