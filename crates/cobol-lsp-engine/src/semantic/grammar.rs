//! Program grammar.
//!
//! A hand-written recursive descent parser over the significant tokens of an
//! expanded document. It produces a concrete parse tree of [`ParseNode`]s:
//! divisions, sections and paragraphs are nested, data description entries
//! are left flat in source order for the tree builder to nest by level.
//!
//! The parser recovers at sentence boundaries, so a malformed sentence costs
//! one diagnostic and parsing continues with the next one.

use std::sync::Arc;

use cobol_lsp_core::{Diagnostic, ErrorKind, Locality, Position, Range, ResultWithErrors};

use crate::lexer::{Token, TokenKind};

/// Grammar production of a [`ParseNode`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rule {
    Program { name: Option<String> },
    EndProgram { name: Option<String> },
    Division { name: String },
    Section { name: String },
    Paragraph { name: String },
    DataEntry {
        level: u8,
        name: Option<String>,
        picture: Option<String>,
    },
    Statement { verb: String },
    FunctionDeclaration { name: Option<String>, intrinsic: bool },
    FunctionCall { name: String, args: usize },
    ProcedureReference {
        name: String,
        section: Option<String>,
    },
}

/// A node of the concrete parse tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseNode {
    pub rule: Rule,
    pub locality: Locality,
    pub children: Vec<ParseNode>,
}

impl ParseNode {
    fn new(rule: Rule, locality: Locality, children: Vec<ParseNode>) -> Self {
        Self {
            rule,
            locality,
            children,
        }
    }
}

const DIVISIONS: &[&str] = &["IDENTIFICATION", "ID", "ENVIRONMENT", "DATA", "PROCEDURE"];

const ENVIRONMENT_PARAGRAPHS: &[&str] = &[
    "SOURCE-COMPUTER",
    "OBJECT-COMPUTER",
    "SPECIAL-NAMES",
    "REPOSITORY",
    "FILE-CONTROL",
    "I-O-CONTROL",
];

const REPOSITORY_KEYWORDS: &[&str] = &[
    "FUNCTION",
    "INTRINSIC",
    "AS",
    "CLASS",
    "INTERFACE",
    "PROGRAM",
    "PROPERTY",
];

const FILE_DESCRIPTIONS: &[&str] = &["FD", "SD", "RD", "CD"];

const DATA_CLAUSES: &[&str] = &[
    "PIC",
    "PICTURE",
    "REDEFINES",
    "RENAMES",
    "USAGE",
    "VALUE",
    "VALUES",
    "OCCURS",
    "BLANK",
    "JUST",
    "JUSTIFIED",
    "SIGN",
    "SYNC",
    "SYNCHRONIZED",
    "GLOBAL",
    "EXTERNAL",
    "BINARY",
    "COMP",
    "COMP-1",
    "COMP-2",
    "COMP-3",
    "COMP-4",
    "COMP-5",
    "COMPUTATIONAL",
    "COMPUTATIONAL-1",
    "COMPUTATIONAL-2",
    "COMPUTATIONAL-3",
    "COMPUTATIONAL-4",
    "COMPUTATIONAL-5",
    "DISPLAY",
    "NATIONAL",
    "PACKED-DECIMAL",
    "POINTER",
    "INDEX",
];

const VERBS: &[&str] = &[
    "ACCEPT",
    "ADD",
    "ALLOCATE",
    "ALTER",
    "CALL",
    "CANCEL",
    "CLOSE",
    "COMMIT",
    "COMPUTE",
    "CONTINUE",
    "DELETE",
    "DISPLAY",
    "DIVIDE",
    "ENTRY",
    "EVALUATE",
    "EXEC",
    "EXIT",
    "FREE",
    "GO",
    "GOBACK",
    "IF",
    "INITIALIZE",
    "INSPECT",
    "INVOKE",
    "JSON",
    "MERGE",
    "MOVE",
    "MULTIPLY",
    "OPEN",
    "PERFORM",
    "READ",
    "RELEASE",
    "RETURN",
    "REWRITE",
    "ROLLBACK",
    "SEARCH",
    "SET",
    "SORT",
    "START",
    "STOP",
    "STRING",
    "SUBTRACT",
    "UNLOCK",
    "UNSTRING",
    "USE",
    "WRITE",
    "XML",
];

/// Words after PERFORM that start an inline or out-of-line phrase rather
/// than name a procedure.
const PERFORM_PHRASES: &[&str] = &["UNTIL", "VARYING", "WITH", "TEST", "FOREVER", "FUNCTION"];

/// Words that continue an argument expression instead of starting a new
/// argument.
const OPERATORS: &[&str] = &["+", "-", "*", "/", "**", "OF", "IN"];

/// Deepest `FUNCTION` call nesting parsed; deeper calls are skipped.
pub const MAX_CALL_NESTING: usize = 32;

/// Deepest program nesting kept; a deeper program becomes top-level.
pub const MAX_PROGRAM_NESTING: usize = 64;

fn is_one_of(token: &Token, words: &[&str]) -> bool {
    words.iter().any(|w| token.is_word(w))
}

fn is_verb(token: &Token) -> bool {
    is_one_of(token, VERBS)
}

fn is_procedure_name(token: &Token) -> bool {
    token.kind == TokenKind::Word
        && !is_verb(token)
        && !is_one_of(token, PERFORM_PHRASES)
        && !token.is_word("DEPENDING")
}

fn level_number(token: &Token) -> Option<u32> {
    if token.kind != TokenKind::Word
        || token.text.len() > 2
        || !token.text.bytes().all(|b| b.is_ascii_digit())
    {
        return None;
    }
    token.text.parse().ok()
}

fn adjacent(left: &Token, right: &Token) -> bool {
    left.locality.uri() == right.locality.uri() && left.locality.end() == right.locality.start()
}

/// State of an argument list while counting arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArgState {
    /// Before the first argument or after a separator comma.
    Start,
    /// After an operand; another operand starts a new argument.
    Operand,
    /// After an operator; the current argument continues.
    Operator,
}

/// A program whose END PROGRAM has not been seen yet.
#[derive(Debug)]
struct OpenProgram {
    start: usize,
    end: usize,
    name: Option<String>,
    children: Vec<ParseNode>,
}

/// Recursive descent parser over significant tokens.
///
/// Programs are tracked on an explicit stack: a program header opens a
/// program, END PROGRAM closes it into the enclosing one. A program never
/// closed by END PROGRAM is a sibling of the programs around it.
pub struct GrammarParser<'a> {
    uri: Arc<str>,
    tokens: Vec<&'a Token>,
    current: usize,
    call_depth: usize,
    errors: Vec<Diagnostic>,
}

impl<'a> GrammarParser<'a> {
    /// Create a parser. `tokens` must hold significant tokens only.
    pub fn new(uri: Arc<str>, tokens: Vec<&'a Token>) -> Self {
        Self {
            uri,
            tokens,
            current: 0,
            call_depth: 0,
            errors: Vec::new(),
        }
    }

    /// Parse every top-level program of the document.
    pub fn parse(mut self) -> ResultWithErrors<Vec<ParseNode>> {
        // Top-level programs with the index of their first token.
        let mut programs: Vec<(usize, ParseNode)> = Vec::new();
        let mut open: Vec<OpenProgram> = Vec::new();

        while let Some(token) = self.current() {
            if self.at_program_header() {
                let program = self.open_program();
                open.push(program);
                continue;
            }

            if open.is_empty() {
                let here = self.here();
                self.syntax_error("Missing IDENTIFICATION DIVISION", here);
                open.push(OpenProgram {
                    start: self.current,
                    end: self.current,
                    name: None,
                    children: Vec::new(),
                });
            }

            if self.at_end_program() {
                let end = self.parse_end_program();
                self.close_program(&mut open, &mut programs, end);
                continue;
            }

            let node = if self.at_division() {
                Some(self.parse_division())
            } else {
                self.syntax_error(
                    format!("Unexpected '{}' outside of a division", token.text),
                    token.locality.clone(),
                );
                self.skip_sentence();
                None
            };
            if let Some(top) = open.last_mut() {
                top.children.extend(node);
                top.end = self.current;
            }
        }

        for program in open {
            let start = program.start;
            programs.push((start, self.finish_program(program)));
        }
        programs.sort_by_key(|(start, _)| *start);
        let programs = programs.into_iter().map(|(_, program)| program).collect();
        ResultWithErrors::new(programs, self.errors)
    }

    fn open_program(&mut self) -> OpenProgram {
        let start = self.current;
        let (division, name) = self.parse_identification_division();
        OpenProgram {
            start,
            end: self.current,
            name,
            children: vec![division],
        }
    }

    /// Close the program END PROGRAM names, or the innermost one when no
    /// open program has that name. Programs opened after it and still open
    /// are left unclosed inside it.
    fn close_program(
        &mut self,
        open: &mut Vec<OpenProgram>,
        programs: &mut Vec<(usize, ParseNode)>,
        end: ParseNode,
    ) {
        let target = match &end.rule {
            Rule::EndProgram { name: Some(name) } => open
                .iter()
                .rposition(|p| p.name.as_deref() == Some(name.as_str())),
            _ => None,
        };
        let target = target.unwrap_or(open.len().saturating_sub(1));

        let unclosed: Vec<OpenProgram> = open.drain(target + 1..).collect();
        let Some(mut program) = open.pop() else {
            return;
        };
        for inner in unclosed {
            let node = self.finish_program(inner);
            program.children.push(node);
        }
        program.children.push(end);
        program.end = self.current;

        let start = program.start;
        let node = self.finish_program(program);
        let depth = open.len();
        match open.last_mut() {
            Some(parent) if depth < MAX_PROGRAM_NESTING => {
                parent.children.push(node);
                parent.end = self.current;
            }
            Some(_) => {
                self.syntax_error(
                    format!("Programs nested deeper than {MAX_PROGRAM_NESTING} levels"),
                    node.locality.clone(),
                );
                programs.push((start, node));
            }
            None => programs.push((start, node)),
        }
    }

    fn finish_program(&self, program: OpenProgram) -> ParseNode {
        ParseNode::new(
            Rule::Program { name: program.name },
            self.span_between(program.start, program.end),
            program.children,
        )
    }

    fn parse_identification_division(&mut self) -> (ParseNode, Option<String>) {
        let start = self.current;
        self.advance();
        self.advance();
        self.expect_period("IDENTIFICATION DIVISION");

        let mut program_id = None;
        if self.check_word("PROGRAM-ID") {
            self.advance();
            self.skip_kind(TokenKind::Period);
            match self.current() {
                Some(t) if matches!(t.kind, TokenKind::Word | TokenKind::StringLiteral) => {
                    program_id = Some(t.name_value().to_ascii_uppercase());
                    self.advance();
                }
                _ => {
                    let here = self.here();
                    self.syntax_error("Missing program name in PROGRAM-ID paragraph", here);
                }
            }
            self.skip_sentence();
        } else {
            let here = self.here();
            self.syntax_error("Missing PROGRAM-ID paragraph", here);
        }

        // AUTHOR, DATE-WRITTEN and friends carry free text only.
        while !self.at_boundary() {
            self.skip_sentence();
        }

        let division = ParseNode::new(
            Rule::Division {
                name: "IDENTIFICATION".to_string(),
            },
            self.span_from(start),
            Vec::new(),
        );
        (division, program_id)
    }

    fn parse_end_program(&mut self) -> ParseNode {
        let start = self.current;
        self.advance();
        self.advance();
        let name = match self.current() {
            Some(t) if matches!(t.kind, TokenKind::Word | TokenKind::StringLiteral) => {
                self.advance();
                Some(t.name_value().to_ascii_uppercase())
            }
            _ => None,
        };
        self.expect_period("END PROGRAM");
        ParseNode::new(Rule::EndProgram { name }, self.span_from(start), Vec::new())
    }

    fn parse_division(&mut self) -> ParseNode {
        let start = self.current;
        let name = self.advance().map(Token::match_text).unwrap_or_default();
        self.advance();

        let children = match name.as_str() {
            "ENVIRONMENT" => {
                self.expect_period("ENVIRONMENT DIVISION");
                self.parse_environment_body()
            }
            "DATA" => {
                self.expect_period("DATA DIVISION");
                self.parse_data_body()
            }
            _ => {
                // USING and RETURNING phrases.
                self.skip_sentence();
                self.parse_procedure_body()
            }
        };

        ParseNode::new(Rule::Division { name }, self.span_from(start), children)
    }

    // ====================================================================
    // ENVIRONMENT DIVISION
    // ====================================================================

    fn parse_environment_body(&mut self) -> Vec<ParseNode> {
        let mut nodes = Vec::new();
        while !self.at_boundary() {
            if self.at_section_header() {
                let start = self.current;
                let name = self.parse_section_header();
                let mut paragraphs = Vec::new();
                while !self.at_boundary() && !self.at_section_header() {
                    if self.at_environment_paragraph() {
                        paragraphs.push(self.parse_environment_paragraph());
                    } else {
                        self.skip_sentence();
                    }
                }
                nodes.push(ParseNode::new(
                    Rule::Section { name },
                    self.span_from(start),
                    paragraphs,
                ));
            } else if self.at_environment_paragraph() {
                nodes.push(self.parse_environment_paragraph());
            } else {
                self.skip_sentence();
            }
        }
        nodes
    }

    fn parse_environment_paragraph(&mut self) -> ParseNode {
        let start = self.current;
        let name = self.advance().map(Token::match_text).unwrap_or_default();
        self.advance();

        let children = if name == "REPOSITORY" {
            self.parse_repository()
        } else {
            while !self.at_boundary()
                && !self.at_section_header()
                && !self.at_environment_paragraph()
            {
                self.skip_sentence();
            }
            Vec::new()
        };

        ParseNode::new(Rule::Paragraph { name }, self.span_from(start), children)
    }

    fn parse_repository(&mut self) -> Vec<ParseNode> {
        let mut declarations = Vec::new();
        while !self.at_boundary() && !self.at_section_header() && !self.at_environment_paragraph()
        {
            if self.check_word("FUNCTION") {
                self.advance();
                self.parse_function_specifier(&mut declarations);
            } else {
                // CLASS, INTERFACE and PROGRAM specifiers
                self.advance();
            }
        }
        declarations
    }

    fn parse_function_specifier(&mut self, out: &mut Vec<ParseNode>) {
        if self.check_word("ALL") && self.peek_word(1, "INTRINSIC") {
            let start = self.current;
            self.advance();
            self.advance();
            out.push(ParseNode::new(
                Rule::FunctionDeclaration {
                    name: None,
                    intrinsic: true,
                },
                self.span_from(start),
                Vec::new(),
            ));
            return;
        }

        let mut names = Vec::new();
        while let Some(token) = self.current() {
            if token.kind != TokenKind::Word
                || is_one_of(token, REPOSITORY_KEYWORDS)
                || self.at_environment_paragraph()
                || self.at_boundary()
            {
                break;
            }
            names.push(token);
            self.advance();
        }

        let intrinsic = self.skip_word("INTRINSIC");
        if !intrinsic && self.skip_word("AS") {
            self.skip_kind(TokenKind::StringLiteral);
        }

        if names.is_empty() {
            let here = self.here();
            self.syntax_error("Missing function name in REPOSITORY paragraph", here);
        }
        for token in names {
            out.push(ParseNode::new(
                Rule::FunctionDeclaration {
                    name: Some(token.match_text()),
                    intrinsic,
                },
                token.locality.clone(),
                Vec::new(),
            ));
        }
    }

    // ====================================================================
    // DATA DIVISION
    // ====================================================================

    fn parse_data_body(&mut self) -> Vec<ParseNode> {
        let mut nodes = Vec::new();
        while !self.at_boundary() {
            if self.at_section_header() {
                let start = self.current;
                let name = self.parse_section_header();
                let mut entries = Vec::new();
                while !self.at_boundary() && !self.at_section_header() {
                    entries.extend(self.parse_data_sentence());
                }
                nodes.push(ParseNode::new(
                    Rule::Section { name },
                    self.span_from(start),
                    entries,
                ));
            } else {
                nodes.extend(self.parse_data_sentence());
            }
        }
        nodes
    }

    fn parse_data_sentence(&mut self) -> Option<ParseNode> {
        let token = self.current()?;
        if let Some(level) = level_number(token) {
            return self.parse_data_entry(level);
        }
        if token.is_word("EXEC") {
            self.advance();
            self.skip_exec_body();
            self.skip_kind(TokenKind::Period);
            return None;
        }
        if !is_one_of(token, FILE_DESCRIPTIONS) {
            self.syntax_error(
                format!("Expected level number, found '{}'", token.text),
                token.locality.clone(),
            );
        }
        self.skip_sentence();
        None
    }

    fn parse_data_entry(&mut self, level: u32) -> Option<ParseNode> {
        let start = self.current;
        let level_token = self.advance()?;
        if !matches!(level, 1..=49 | 66 | 77 | 88) {
            self.syntax_error(
                format!("Invalid level number '{}'", level_token.text),
                level_token.locality.clone(),
            );
            self.skip_sentence();
            return None;
        }

        let mut name = None;
        if let Some(token) = self.current() {
            if token.kind == TokenKind::Word && !is_one_of(token, DATA_CLAUSES) {
                if !token.is_word("FILLER") {
                    name = Some(token.match_text());
                }
                self.advance();
            }
        }

        let mut picture = None;
        while let Some(token) = self.current() {
            if token.kind == TokenKind::Period {
                self.advance();
                break;
            }
            if self.at_boundary() {
                let here = self.here();
                self.syntax_error("Missing period after data description entry", here);
                break;
            }
            self.advance();
            if token.is_word("PIC") || token.is_word("PICTURE") {
                self.skip_word("IS");
                picture = self.picture_string();
            }
        }

        let rule = Rule::DataEntry {
            level: level as u8,
            name,
            picture,
        };
        Some(ParseNode::new(rule, self.span_from(start), Vec::new()))
    }

    /// A PICTURE character-string is split at parentheses by the scanner;
    /// glue back the pieces that touch.
    fn picture_string(&mut self) -> Option<String> {
        let first = self.current().filter(|t| t.kind != TokenKind::Period)?;
        self.advance();
        let mut text = first.text.clone();
        let mut previous = first;
        while let Some(token) = self.current() {
            if token.kind == TokenKind::Period || !adjacent(previous, token) {
                break;
            }
            text.push_str(&token.text);
            previous = token;
            self.advance();
        }
        Some(text)
    }

    // ====================================================================
    // PROCEDURE DIVISION
    // ====================================================================

    fn parse_procedure_body(&mut self) -> Vec<ParseNode> {
        let mut nodes = Vec::new();
        while !self.at_boundary() {
            if self.skip_declaratives() {
                continue;
            }
            if self.at_section_header() {
                nodes.push(self.parse_procedure_section());
            } else if self.at_paragraph_header() {
                nodes.push(self.parse_paragraph());
            } else {
                self.parse_sentence(&mut nodes);
            }
        }
        nodes
    }

    fn parse_procedure_section(&mut self) -> ParseNode {
        let start = self.current;
        let name = self.parse_section_header();
        let mut children = Vec::new();
        while !self.at_boundary() && !self.at_section_header() && !self.at_declaratives() {
            if self.at_paragraph_header() {
                children.push(self.parse_paragraph());
            } else {
                self.parse_sentence(&mut children);
            }
        }
        ParseNode::new(Rule::Section { name }, self.span_from(start), children)
    }

    fn parse_paragraph(&mut self) -> ParseNode {
        let start = self.current;
        let name = self.advance().map(Token::match_text).unwrap_or_default();
        self.advance();
        let mut statements = Vec::new();
        while !self.at_boundary()
            && !self.at_section_header()
            && !self.at_paragraph_header()
            && !self.at_declaratives()
        {
            self.parse_sentence(&mut statements);
        }
        ParseNode::new(Rule::Paragraph { name }, self.span_from(start), statements)
    }

    fn parse_sentence(&mut self, out: &mut Vec<ParseNode>) {
        while let Some(token) = self.current() {
            if token.kind == TokenKind::Period {
                self.advance();
                return;
            }
            if self.at_boundary() || self.at_section_header() || self.at_declaratives() {
                return;
            }
            if is_verb(token) {
                out.push(self.parse_statement());
            } else {
                self.advance();
            }
        }
    }

    fn parse_statement(&mut self) -> ParseNode {
        let start = self.current;
        let verb = self.advance().map(Token::match_text).unwrap_or_default();
        let mut children = Vec::new();
        match verb.as_str() {
            "PERFORM" => self.parse_perform_target(&mut children),
            "GO" => self.parse_go_to_targets(&mut children),
            "EXEC" => self.skip_exec_body(),
            _ => {}
        }

        while let Some(token) = self.current() {
            if token.kind == TokenKind::Period || is_verb(token) || self.at_boundary() {
                break;
            }
            if token.is_word("FUNCTION") {
                children.extend(self.parse_function_call());
            } else {
                self.advance();
            }
        }

        ParseNode::new(Rule::Statement { verb }, self.span_from(start), children)
    }

    fn parse_perform_target(&mut self, out: &mut Vec<ParseNode>) {
        match self.current() {
            Some(t) if is_procedure_name(t) && !self.peek_word(1, "TIMES") => {}
            _ => return,
        }
        out.push(self.parse_procedure_reference());
        if self.skip_word("THRU") || self.skip_word("THROUGH") {
            if self.current().is_some_and(is_procedure_name) {
                out.push(self.parse_procedure_reference());
            } else {
                let here = self.here();
                self.syntax_error("Missing procedure name after THRU", here);
            }
        }
    }

    fn parse_go_to_targets(&mut self, out: &mut Vec<ParseNode>) {
        self.skip_word("TO");
        while self.current().is_some_and(is_procedure_name) {
            out.push(self.parse_procedure_reference());
        }
    }

    fn parse_procedure_reference(&mut self) -> ParseNode {
        let start = self.current;
        let name = self.advance().map(Token::match_text).unwrap_or_default();
        let mut section = None;
        if (self.check_word("OF") || self.check_word("IN"))
            && self.peek_at(1).is_some_and(|t| t.kind == TokenKind::Word)
        {
            self.advance();
            section = self.advance().map(Token::match_text);
        }
        ParseNode::new(
            Rule::ProcedureReference { name, section },
            self.span_from(start),
            Vec::new(),
        )
    }

    fn parse_function_call(&mut self) -> Option<ParseNode> {
        if self.call_depth >= MAX_CALL_NESTING {
            let here = self.here();
            self.syntax_error(
                format!("FUNCTION calls nested deeper than {MAX_CALL_NESTING} levels"),
                here,
            );
            self.advance();
            self.skip_kind(TokenKind::Word);
            if self.check(TokenKind::LeftParen) {
                self.skip_balanced();
            }
            return None;
        }
        self.call_depth += 1;
        let call = self.parse_function_call_at_depth();
        self.call_depth -= 1;
        call
    }

    fn parse_function_call_at_depth(&mut self) -> Option<ParseNode> {
        let start = self.current;
        self.advance();
        let name = match self.current() {
            Some(t) if t.kind == TokenKind::Word => {
                self.advance();
                t.match_text()
            }
            _ => {
                let here = self.here();
                self.syntax_error("Missing function name after FUNCTION", here);
                return None;
            }
        };

        let mut children = Vec::new();
        let mut args = 0;
        if self.check(TokenKind::LeftParen) && !self.at_reference_modification() {
            args = self.parse_arguments(&name, &mut children);
        }
        if self.check(TokenKind::LeftParen) && self.at_reference_modification() {
            self.skip_parenthesized(&mut children);
        }

        Some(ParseNode::new(
            Rule::FunctionCall { name, args },
            self.span_from(start),
            children,
        ))
    }

    /// Count the arguments of a call. Operands separated only by spaces or
    /// commas are distinct arguments; an operator joins its operands into
    /// one argument.
    fn parse_arguments(&mut self, name: &str, calls: &mut Vec<ParseNode>) -> usize {
        self.advance();
        let mut count = 0;
        let mut state = ArgState::Start;
        loop {
            let Some(token) = self.current() else {
                let here = self.here();
                self.syntax_error(format!("Missing ')' in FUNCTION {name} call"), here);
                return count;
            };
            match token.kind {
                TokenKind::RightParen => {
                    self.advance();
                    return count;
                }
                TokenKind::Period => {
                    self.syntax_error(
                        format!("Missing ')' in FUNCTION {name} call"),
                        token.locality.clone(),
                    );
                    return count;
                }
                TokenKind::Comma | TokenKind::Semicolon => {
                    self.advance();
                    state = ArgState::Start;
                }
                TokenKind::LeftParen => {
                    if state == ArgState::Start {
                        count += 1;
                    }
                    self.skip_parenthesized(calls);
                    state = ArgState::Operand;
                }
                TokenKind::Word if is_one_of(token, OPERATORS) => {
                    if state == ArgState::Start {
                        count += 1;
                    }
                    self.advance();
                    state = ArgState::Operator;
                }
                _ => {
                    if state != ArgState::Operator {
                        count += 1;
                    }
                    if token.is_word("FUNCTION") {
                        calls.extend(self.parse_function_call());
                    } else {
                        self.advance();
                    }
                    state = ArgState::Operand;
                }
            }
        }
    }

    /// Skip a balanced parenthesized group, collecting nested calls.
    fn skip_parenthesized(&mut self, calls: &mut Vec<ParseNode>) {
        self.advance();
        let mut depth = 1usize;
        while let Some(token) = self.current() {
            match token.kind {
                TokenKind::Period => return,
                TokenKind::LeftParen => depth += 1,
                TokenKind::RightParen => {
                    depth -= 1;
                    if depth == 0 {
                        self.advance();
                        return;
                    }
                }
                TokenKind::Word if token.is_word("FUNCTION") => {
                    calls.extend(self.parse_function_call());
                    continue;
                }
                _ => {}
            }
            self.advance();
        }
    }

    /// Skip a balanced parenthesized group without looking inside.
    fn skip_balanced(&mut self) {
        let mut depth = 0usize;
        while let Some(token) = self.current() {
            match token.kind {
                TokenKind::Period => return,
                TokenKind::LeftParen => depth += 1,
                TokenKind::RightParen => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        self.advance();
                        return;
                    }
                }
                _ => {}
            }
            self.advance();
        }
    }

    /// Whether the parenthesized group at the cursor is a reference
    /// modification such as `(1:8)`.
    fn at_reference_modification(&self) -> bool {
        let mut depth = 0usize;
        for token in &self.tokens[self.current.min(self.tokens.len())..] {
            match token.kind {
                TokenKind::LeftParen => depth += 1,
                TokenKind::RightParen => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        return false;
                    }
                }
                TokenKind::Period => return false,
                _ if depth == 1 && token.text.contains(':') => return true,
                _ => {}
            }
        }
        false
    }

    fn skip_exec_body(&mut self) {
        while let Some(token) = self.advance() {
            if token.is_word("END-EXEC") {
                return;
            }
        }
        let here = self.here();
        self.syntax_error("Missing END-EXEC", here);
    }

    // ====================================================================
    // UTILITY FUNCTIONS
    // ====================================================================

    fn current(&self) -> Option<&'a Token> {
        self.tokens.get(self.current).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<&'a Token> {
        self.tokens.get(self.current + offset).copied()
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.tokens.len()
    }

    fn advance(&mut self) -> Option<&'a Token> {
        let token = self.current();
        if token.is_some() {
            self.current += 1;
        }
        token
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.current().is_some_and(|t| t.kind == kind)
    }

    fn check_word(&self, word: &str) -> bool {
        self.current().is_some_and(|t| t.is_word(word))
    }

    fn peek_word(&self, offset: usize, word: &str) -> bool {
        self.peek_at(offset).is_some_and(|t| t.is_word(word))
    }

    fn skip_word(&mut self, word: &str) -> bool {
        let found = self.check_word(word);
        if found {
            self.advance();
        }
        found
    }

    fn skip_kind(&mut self, kind: TokenKind) -> bool {
        let found = self.check(kind);
        if found {
            self.advance();
        }
        found
    }

    fn at_program_header(&self) -> bool {
        (self.check_word("IDENTIFICATION") || self.check_word("ID")) && self.peek_word(1, "DIVISION")
    }

    fn at_division(&self) -> bool {
        self.current().is_some_and(|t| is_one_of(t, DIVISIONS)) && self.peek_word(1, "DIVISION")
    }

    fn at_end_program(&self) -> bool {
        self.check_word("END") && self.peek_word(1, "PROGRAM")
    }

    /// End of input or the start of the next division or program.
    fn at_boundary(&self) -> bool {
        self.is_at_end() || self.at_division() || self.at_end_program()
    }

    fn at_section_header(&self) -> bool {
        self.check(TokenKind::Word) && self.peek_word(1, "SECTION")
    }

    fn at_paragraph_header(&self) -> bool {
        self.current()
            .is_some_and(|t| t.kind == TokenKind::Word && !is_verb(t) && !t.is_word("DECLARATIVES"))
            && self.peek_at(1).is_some_and(|t| t.kind == TokenKind::Period)
    }

    fn at_environment_paragraph(&self) -> bool {
        self.current().is_some_and(|t| is_one_of(t, ENVIRONMENT_PARAGRAPHS))
            && self.peek_at(1).is_some_and(|t| t.kind == TokenKind::Period)
    }

    fn at_declaratives(&self) -> bool {
        self.check_word("DECLARATIVES")
            || (self.check_word("END") && self.peek_word(1, "DECLARATIVES"))
    }

    fn skip_declaratives(&mut self) -> bool {
        if !self.at_declaratives() {
            return false;
        }
        self.skip_word("END");
        self.advance();
        self.skip_kind(TokenKind::Period);
        true
    }

    /// Consume `name SECTION [priority] .` and return the upper-cased name.
    fn parse_section_header(&mut self) -> String {
        let name = self.advance().map(Token::match_text).unwrap_or_default();
        self.advance();
        if self.current().is_some_and(|t| level_number(t).is_some()) {
            self.advance();
        }
        self.expect_period(&format!("{name} SECTION"));
        name
    }

    /// Skip to just past the next period, stopping early at a division or
    /// program boundary.
    fn skip_sentence(&mut self) {
        while !self.at_boundary() {
            if self.advance().is_some_and(|t| t.kind == TokenKind::Period) {
                break;
            }
        }
    }

    fn expect_period(&mut self, after: &str) {
        if !self.skip_kind(TokenKind::Period) {
            let here = self.here();
            self.syntax_error(format!("Missing period after {after}"), here);
        }
    }

    fn here(&self) -> Locality {
        match self.current() {
            Some(token) => token.locality.clone(),
            None => self.end_of_input(),
        }
    }

    fn end_of_input(&self) -> Locality {
        match self.tokens.last() {
            Some(token) => Locality::new(
                token.locality.shared_uri(),
                Range::point(token.locality.end()),
            )
            .with_chain(token.locality.chain().clone()),
            None => Locality::point(Arc::clone(&self.uri), Position::new(1, 1)),
        }
    }

    /// Locality from the token at `start` to the last consumed token.
    fn span_from(&self, start: usize) -> Locality {
        self.span_between(start, self.current)
    }

    /// Locality of the tokens in `start..end`.
    fn span_between(&self, start: usize, end: usize) -> Locality {
        let last = end.saturating_sub(1).max(start);
        match (self.tokens.get(start), self.tokens.get(last)) {
            (Some(first), Some(last)) => first.locality.to(&last.locality),
            _ => self.end_of_input(),
        }
    }

    fn syntax_error(&mut self, message: impl Into<String>, locality: Locality) {
        self.errors
            .push(Diagnostic::error(ErrorKind::SyntaxError, message, locality));
    }
}
