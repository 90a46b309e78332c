//! End-to-end tests of copybook expansion and text substitution.

use std::sync::Arc;
use std::thread;

use cobol_lsp_core::{ErrorKind, Position, Severity};
use cobol_lsp_engine::{
    AnalysisEngine, AnalysisError, AnalysisResult, AnalysisSettings, CancellationToken,
    CopybookConfig, CopybookProcessingMode, InMemoryRegistry, SourceFormat, Token, TokenKind,
};

fn engine_with(registry: InMemoryRegistry, settings: AnalysisSettings) -> AnalysisEngine {
    AnalysisEngine::new(settings, Arc::new(registry))
}

fn analyze(registry: InMemoryRegistry, text: &str) -> AnalysisResult {
    engine_with(registry, AnalysisSettings::default())
        .analyze("main", text, &CopybookConfig::default(), &CancellationToken::new())
        .unwrap()
}

fn word<'a>(result: &'a AnalysisResult, text: &str) -> &'a Token {
    result
        .document
        .tokens()
        .iter()
        .find(|t| t.kind == TokenKind::Word && t.text == text)
        .unwrap_or_else(|| panic!("no word {text}"))
}

fn preprocessing_kinds(result: &AnalysisResult) -> Vec<ErrorKind> {
    result.document.diagnostics().iter().map(|d| d.kind).collect()
}

#[test]
fn document_without_directives_is_unchanged() {
    let text = "IDENTIFICATION DIVISION.\r\nPROGRAM-ID. PLAIN.\r\n*> comment\r\nPROCEDURE DIVISION.\r\n    DISPLAY 'HI'.\r\n";
    let result = analyze(InMemoryRegistry::new(), text);

    assert_eq!(result.document.text(), text);
    assert!(result.document.diagnostics().is_empty());
    assert!(result.document.copybooks().is_empty());
    for token in result.document.tokens() {
        assert_eq!(token.locality.uri(), "main");
        assert!(!token.locality.is_from_copybook());
    }
    let display = word(&result, "DISPLAY");
    assert_eq!(display.locality.start(), Position::new(5, 5));
    assert_eq!(display.locality.end(), Position::new(5, 12));
}

#[test]
fn copy_is_spliced_at_the_call_site() {
    let registry = InMemoryRegistry::new().with("ABC", "05 Y PIC X.");
    let result = analyze(registry, "01 X.\n    COPY ABC.\n");

    assert_eq!(result.document.text(), "01 X.\n05 Y PIC X.\n");
    assert!(result.document.diagnostics().is_empty());

    let y = word(&result, "Y");
    assert_eq!(y.locality.uri(), "ABC");
    assert_eq!(y.locality.start(), Position::new(1, 4));
    assert_eq!(y.locality.copybook_names(), vec!["ABC"]);
    let call_site = y.locality.root_locality();
    assert_eq!(call_site.uri(), "main");
    assert_eq!(call_site.start().line, 2);

    let x = word(&result, "X");
    assert_eq!(x.locality.start(), Position::new(1, 4));
    assert!(!x.locality.is_from_copybook());
}

#[test]
fn locality_lookup_by_offset() {
    let registry = InMemoryRegistry::new().with("ABC", "05 Y PIC X.");
    let result = analyze(registry, "01 X.\n    COPY ABC.\n");
    let doc = &result.document;

    let offset = doc.text().find('Y').unwrap();
    let locality = doc.locality_at(offset).unwrap();
    assert_eq!(locality.uri(), "ABC");

    let by_position = doc.locality_at_position(Position::new(2, 4)).unwrap();
    assert_eq!(by_position, locality);
}

#[test]
fn copybook_usage_is_recorded() {
    let registry = InMemoryRegistry::new().with("ABC", "05 Y PIC X.");
    let result = analyze(registry, "01 X.\n    COPY ABC.\n    COPY NOPE.\n");

    let usages = result.document.copybooks();
    assert_eq!(usages.len(), 2);
    assert_eq!(usages[0].name, "ABC");
    assert_eq!(usages[0].uri.as_deref(), Some("ABC"));
    assert_eq!(usages[1].name, "NOPE");
    assert_eq!(usages[1].uri, None);

    let found = result
        .document
        .copybook_at("main", Position::new(2, 11))
        .unwrap();
    assert_eq!(found.name, "ABC");
}

#[test]
fn nested_copybooks_carry_the_full_chain() {
    let registry = InMemoryRegistry::new()
        .with("OUTER", "01 O.\nCOPY INNER.\n")
        .with("INNER", "05 I PIC X.\n");
    let result = analyze(registry, "COPY OUTER.\n01 AFTER.\n");

    assert_eq!(result.document.text(), "01 O.\n05 I PIC X.\n01 AFTER.\n");
    let i = word(&result, "I");
    assert_eq!(i.locality.uri(), "INNER");
    assert_eq!(i.locality.copybook_names(), vec!["OUTER", "INNER"]);
    assert_eq!(i.locality.root_locality().start(), Position::new(1, 1));
    assert_eq!(i.locality.chain()[1].call_site.uri(), "OUTER");
    assert_eq!(i.locality.chain()[1].call_site.start().line, 2);

    let after = word(&result, "AFTER");
    assert_eq!(after.locality.start(), Position::new(2, 4));
}

#[test]
fn self_inclusion_reports_once_and_continues() {
    let registry = InMemoryRegistry::new().with("SELF", "01 S.\nCOPY SELF.\n");
    let result = analyze(registry, "01 A.\nCOPY SELF.\n01 B.\n");

    assert_eq!(preprocessing_kinds(&result), vec![ErrorKind::CircularDependency]);
    assert_eq!(result.document.text(), "01 A.\n01 S.\n\n01 B.\n");
    assert_eq!(word(&result, "B").locality.start(), Position::new(3, 4));
}

#[test]
fn missing_copybook_leaves_a_placeholder() {
    let result = analyze(InMemoryRegistry::new(), "01 A.\n    COPY MISSING.\n01 B.\n");

    let diagnostics = result.document.diagnostics();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].kind, ErrorKind::CopybookNotFound);
    assert_eq!(diagnostics[0].severity, Severity::Error);
    assert_eq!(diagnostics[0].message, "MISSING: Copybook not found");
    assert_eq!(diagnostics[0].locality.start().line, 2);

    assert_eq!(result.document.text(), "01 A.\n\n01 B.\n");
    let placeholder = result
        .document
        .tokens()
        .iter()
        .find(|t| t.kind == TokenKind::Placeholder)
        .unwrap();
    assert!(placeholder.text.is_empty());
    assert_eq!(placeholder.locality.start().line, 2);
    assert_eq!(word(&result, "B").locality.start(), Position::new(3, 4));
}

#[test]
fn compile_only_mode_downgrades_missing_copybooks() {
    let engine = engine_with(InMemoryRegistry::new(), AnalysisSettings::default());
    let config = CopybookConfig::new(CopybookProcessingMode::CompileOnly);
    let result = engine
        .analyze("main", "COPY MISSING.\n", &config, &CancellationToken::new())
        .unwrap();
    assert_eq!(result.document.diagnostics()[0].severity, Severity::Warning);
}

#[test]
fn disabled_mode_skips_inclusion_silently() {
    let registry = InMemoryRegistry::new().with("ABC", "05 Y PIC X.");
    let engine = engine_with(registry, AnalysisSettings::default());
    let config = CopybookConfig::new(CopybookProcessingMode::Disabled);
    let result = engine
        .analyze("main", "01 X.\nCOPY ABC.\n", &config, &CancellationToken::new())
        .unwrap();
    assert!(result.document.diagnostics().is_empty());
    assert_eq!(result.document.text(), "01 X.\n\n");
    assert!(engine.cache().is_empty());
}

#[test]
fn nesting_past_the_limit_is_cut_off() {
    let registry = InMemoryRegistry::new()
        .with("L1", "COPY L2.")
        .with("L2", "COPY L3.")
        .with("L3", "01 DEEP.");
    let settings = AnalysisSettings {
        max_copybook_depth: 2,
        ..AnalysisSettings::default()
    };
    let result = engine_with(registry, settings)
        .analyze("main", "COPY L1.\n01 NEXT.\n", &CopybookConfig::default(), &CancellationToken::new())
        .unwrap();

    assert_eq!(preprocessing_kinds(&result), vec![ErrorKind::MaxDepthExceeded]);
    assert!(!result.document.text().contains("DEEP"));
    assert!(result.document.text().contains("01 NEXT."));
}

#[test]
fn copy_replacing_runs_before_replace() {
    let registry = InMemoryRegistry::new().with("A", "01 P.\n");
    let text = "REPLACE ==X== BY ==Y==.\nCOPY A REPLACING ==P== BY ==X==.\n";
    let result = analyze(registry, text);

    assert!(result.document.diagnostics().is_empty());
    assert_eq!(result.document.text(), "\n01 Y.\n");
    let y = word(&result, "Y");
    assert_eq!(y.locality.uri(), "A");
    assert_eq!(y.locality.start(), Position::new(1, 4));
}

#[test]
fn malformed_replace_is_reported_and_skipped() {
    let result = analyze(InMemoryRegistry::new(), "REPLACE ==A== ==B==.\n01 A.\n");
    assert_eq!(preprocessing_kinds(&result), vec![ErrorKind::ReplaceClauseError]);
    assert!(result.document.text().contains("01 A."));
}

#[test]
fn sql_include_uses_predefined_copybooks() {
    let result = analyze(InMemoryRegistry::new(), "EXEC SQL INCLUDE SQLCA END-EXEC.\n");
    assert!(result.document.diagnostics().is_empty());
    assert_eq!(
        result.document.copybooks()[0].uri.as_deref(),
        Some("predefined:db2/SQLCA")
    );
    assert!(result.document.text().contains("SQLCODE"));
}

#[test]
fn fixed_format_copy() {
    let registry = InMemoryRegistry::new().with("ABC", format!("{:<72}\n", "       05 Y PIC X."));
    let settings = AnalysisSettings {
        source_format: SourceFormat::Fixed,
        ..AnalysisSettings::default()
    };
    let text = format!(
        "{:<72}00000100\n{:<72}00000200\n",
        "000100 01 X.", "000200     COPY ABC."
    );
    let result = engine_with(registry, settings)
        .analyze("main", &text, &CopybookConfig::default(), &CancellationToken::new())
        .unwrap();

    assert!(result.document.diagnostics().is_empty());
    assert_eq!(result.document.copybooks()[0].name, "ABC");
    let y = word(&result, "Y");
    assert_eq!(y.locality.uri(), "ABC");
    assert_eq!(y.locality.start(), Position::new(1, 11));
}

#[test]
fn cancelled_analysis_fails() {
    let registry = InMemoryRegistry::new().with("ABC", "05 Y PIC X.");
    let cancel = CancellationToken::new();
    cancel.cancel();
    let result = engine_with(registry, AnalysisSettings::default()).analyze(
        "main",
        "COPY ABC.\n",
        &CopybookConfig::default(),
        &cancel,
    );
    assert!(matches!(result, Err(AnalysisError::Cancelled { .. })));
}

#[test]
fn concurrent_analyses_share_the_cache() {
    let registry = InMemoryRegistry::new().with("ABC", "05 Y PIC X.");
    let engine = engine_with(registry, AnalysisSettings::default());

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let engine = engine.clone();
            thread::spawn(move || {
                engine
                    .analyze(
                        &format!("doc{i}"),
                        "01 X.\n    COPY ABC.\n",
                        &CopybookConfig::default(),
                        &CancellationToken::new(),
                    )
                    .unwrap()
                    .document
                    .text()
                    .to_string()
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), "01 X.\n05 Y PIC X.\n");
    }
    assert_eq!(engine.cache().len(), 1);
}

#[test]
fn disabled_mode_ignores_the_depth_limit() {
    let registry = InMemoryRegistry::new().with("A", "01 A.");
    let settings = AnalysisSettings {
        max_copybook_depth: 0,
        ..AnalysisSettings::default()
    };
    let config = CopybookConfig::new(CopybookProcessingMode::Disabled);
    let result = engine_with(registry, settings)
        .analyze("main", "COPY A.\n", &config, &CancellationToken::new())
        .unwrap();
    assert!(result.document.diagnostics().is_empty());
    assert!(result
        .document
        .tokens()
        .iter()
        .any(|t| t.kind == TokenKind::Placeholder));
}

#[test]
fn empty_document_identifier_is_analyzed() {
    let result = engine_with(InMemoryRegistry::new(), AnalysisSettings::default())
        .analyze("", "ID DIVISION.\nPROGRAM-ID. P.\n", &CopybookConfig::default(), &CancellationToken::new())
        .unwrap();
    assert_eq!(result.document.uri(), "");
    assert_eq!(result.tree.result.name(), Some("P"));
}
