//! Source reference formats and line splitting.

use serde::{Deserialize, Serialize};

/// COBOL reference format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    /// Free format (no column restrictions, `*>` comments).
    #[default]
    Free,
    /// Fixed format (columns 1-6: sequence, 7: indicator, 8-72: code,
    /// 73+: identification area).
    Fixed,
}

/// Column indicator values in fixed format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Indicator {
    /// Normal code line (space or no indicator).
    Normal,
    /// Comment line ('*' or '/').
    Comment,
    /// Continuation line ('-').
    Continuation,
    /// Debug line ('D' or 'd').
    Debug,
}

impl Indicator {
    /// Parse an indicator character.
    pub fn from_char(ch: char) -> Self {
        match ch {
            '*' | '/' => Indicator::Comment,
            '-' => Indicator::Continuation,
            'D' | 'd' => Indicator::Debug,
            _ => Indicator::Normal,
        }
    }

    /// Whether the whole line is ignored by the compiler.
    pub fn is_ignored(&self) -> bool {
        matches!(self, Indicator::Comment | Indicator::Debug)
    }
}

/// One physical line of source with its terminator kept separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLine<'a> {
    /// Line number (1-indexed).
    pub number: u32,
    /// Line content without the terminator.
    pub content: &'a str,
    /// The terminator as written (`"\n"`, `"\r\n"`, `"\r"`), empty on the
    /// last line if the text does not end with one.
    pub terminator: &'a str,
}

/// Split text into lines, keeping each terminator verbatim.
///
/// Unlike [`str::lines`], a trailing terminator does not lose information:
/// joining `content + terminator` over all lines reproduces `text` exactly.
pub fn split_lines(text: &str) -> Vec<SourceLine<'_>> {
    let mut lines = Vec::new();
    let bytes = text.as_bytes();
    let mut start = 0;
    let mut i = 0;
    let mut number = 1;

    while i < bytes.len() {
        let terminator_len = match bytes[i] {
            b'\n' => 1,
            b'\r' if bytes.get(i + 1) == Some(&b'\n') => 2,
            b'\r' => 1,
            _ => 0,
        };
        if terminator_len > 0 {
            lines.push(SourceLine {
                number,
                content: &text[start..i],
                terminator: &text[i..i + terminator_len],
            });
            number += 1;
            i += terminator_len;
            start = i;
        } else {
            i += 1;
        }
    }

    if start < text.len() {
        lines.push(SourceLine {
            number,
            content: &text[start..],
            terminator: "",
        });
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indicator_from_char() {
        assert_eq!(Indicator::from_char('*'), Indicator::Comment);
        assert_eq!(Indicator::from_char('/'), Indicator::Comment);
        assert_eq!(Indicator::from_char('-'), Indicator::Continuation);
        assert_eq!(Indicator::from_char('d'), Indicator::Debug);
        assert_eq!(Indicator::from_char(' '), Indicator::Normal);
        assert!(Indicator::Debug.is_ignored());
        assert!(!Indicator::Continuation.is_ignored());
    }

    #[test]
    fn test_split_lines_keeps_terminators() {
        let text = "a\r\nb\nc\rd";
        let lines = split_lines(text);
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0].content, "a");
        assert_eq!(lines[0].terminator, "\r\n");
        assert_eq!(lines[1].terminator, "\n");
        assert_eq!(lines[2].terminator, "\r");
        assert_eq!(lines[3].content, "d");
        assert_eq!(lines[3].terminator, "");
        assert_eq!(lines[3].number, 4);

        let joined: String = lines
            .iter()
            .map(|l| format!("{}{}", l.content, l.terminator))
            .collect();
        assert_eq!(joined, text);
    }

    #[test]
    fn test_split_lines_trailing_newline() {
        let lines = split_lines("01 X.\n");
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].terminator, "\n");
    }

    #[test]
    fn test_split_lines_empty() {
        assert!(split_lines("").is_empty());
    }

    #[test]
    fn test_blank_lines_preserved() {
        let lines = split_lines("\n\n");
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].number, 2);
        assert_eq!(lines[1].content, "");
    }
}
