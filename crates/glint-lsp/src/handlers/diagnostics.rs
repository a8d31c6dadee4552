//! Diagnostics handler for publishing build problems.
//!
//! After every completed build cycle each open document receives the full
//! list of problems attributed to it, possibly empty, replacing whatever was
//! published before.

use glint_core::{Severity, UnusedSymbol};
use lsp_types::{Diagnostic, DiagnosticSeverity, DiagnosticTag, PublishDiagnosticsParams};
use std::collections::HashMap;

use super::utils::{parse_uri, to_lsp_range};
use crate::vfs::DocumentSet;

/// The `source` field of every published diagnostic.
pub const DIAGNOSTIC_SOURCE: &str = "glint";

/// Map a compiler severity to a protocol severity.
pub const fn to_lsp_severity(severity: Severity) -> DiagnosticSeverity {
    match severity {
        Severity::Error => DiagnosticSeverity::ERROR,
        Severity::Warning => DiagnosticSeverity::WARNING,
        Severity::Hint => DiagnosticSeverity::HINT,
    }
}

/// Convert a compiler diagnostic, keyed by the document it belongs to.
///
/// Returns `None` for a diagnostic without a range, since it cannot be
/// attributed to any document.
pub fn compiler_diagnostic_to_lsp(
    diagnostic: &glint_core::Diagnostic,
) -> Option<(String, Diagnostic)> {
    let Some(range) = &diagnostic.range else {
        tracing::warn!("Dropping diagnostic without a range: {}", diagnostic.message);
        return None;
    };
    let converted = Diagnostic {
        range: to_lsp_range(range),
        severity: Some(to_lsp_severity(diagnostic.severity)),
        source: Some(DIAGNOSTIC_SOURCE.to_string()),
        message: diagnostic.message.clone(),
        ..Default::default()
    };
    Some((range.source.clone(), converted))
}

/// Convert an unused-symbol finding into a faded hint.
pub fn unused_symbol_to_lsp(symbol: &UnusedSymbol) -> (String, Diagnostic) {
    let name = serde_json::Value::String(symbol.name.clone());
    let converted = Diagnostic {
        range: to_lsp_range(&symbol.range),
        severity: Some(DiagnosticSeverity::HINT),
        source: Some(DIAGNOSTIC_SOURCE.to_string()),
        message: format!("{name} is never used in this file"),
        tags: Some(vec![DiagnosticTag::UNNECESSARY]),
        ..Default::default()
    };
    (symbol.range.source.clone(), converted)
}

/// Group pooled build output by document URI.
pub fn group_by_document(
    diagnostics: &[glint_core::Diagnostic],
    unused_symbols: &[UnusedSymbol],
) -> HashMap<String, Vec<Diagnostic>> {
    let mut grouped: HashMap<String, Vec<Diagnostic>> = HashMap::new();
    let converted = diagnostics
        .iter()
        .filter_map(compiler_diagnostic_to_lsp)
        .chain(unused_symbols.iter().map(unused_symbol_to_lsp));
    for (source, diagnostic) in converted {
        grouped.entry(source).or_default().push(diagnostic);
    }
    grouped
}

/// One replace-all publication for every document in `documents`.
pub fn publish_params(
    documents: &DocumentSet,
    mut grouped: HashMap<String, Vec<Diagnostic>>,
) -> Vec<PublishDiagnosticsParams> {
    documents
        .iter()
        .filter_map(|document| {
            let uri = parse_uri(&document.id)?;
            Some(PublishDiagnosticsParams {
                uri,
                diagnostics: grouped.remove(&document.id).unwrap_or_default(),
                version: Some(document.version),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vfs::DocumentEntry;
    use glint_core::{Position, SourceRange};

    fn range(source: &str, line: u32) -> SourceRange {
        SourceRange::new(source, Position::new(line, 0), Position::new(line, 3))
    }

    #[test]
    fn test_unused_symbol_hint() {
        let (source, diagnostic) = unused_symbol_to_lsp(&UnusedSymbol {
            name: "tint".to_string(),
            range: range("file:///a.glsl", 2),
        });
        assert_eq!(source, "file:///a.glsl");
        assert_eq!(diagnostic.message, "\"tint\" is never used in this file");
        assert_eq!(diagnostic.severity, Some(DiagnosticSeverity::HINT));
        assert_eq!(diagnostic.tags, Some(vec![DiagnosticTag::UNNECESSARY]));
        assert_eq!(diagnostic.source.as_deref(), Some("glint"));
    }

    #[test]
    fn test_rangeless_diagnostic_dropped() {
        let diagnostic = glint_core::Diagnostic {
            severity: Severity::Error,
            message: "lost".to_string(),
            range: None,
        };
        assert!(compiler_diagnostic_to_lsp(&diagnostic).is_none());
    }

    #[test]
    fn test_every_open_document_gets_a_list() {
        let documents: DocumentSet = [
            DocumentEntry {
                id: "file:///a.glsl".to_string(),
                text: String::new(),
                version: 3,
            },
            DocumentEntry {
                id: "file:///b.glsl".to_string(),
                text: String::new(),
                version: 1,
            },
        ]
        .into_iter()
        .collect();
        let diagnostics = vec![
            glint_core::Diagnostic::error("bad", range("file:///b.glsl", 0)),
            glint_core::Diagnostic::warning("odd", range("file:///b.glsl", 1)),
            glint_core::Diagnostic::error("elsewhere", range("file:///closed.glsl", 0)),
        ];

        let params = publish_params(&documents, group_by_document(&diagnostics, &[]));
        assert_eq!(params.len(), 2);
        assert_eq!(params[0].uri.as_str(), "file:///a.glsl");
        assert!(params[0].diagnostics.is_empty());
        assert_eq!(params[0].version, Some(3));
        assert_eq!(params[1].diagnostics.len(), 2);
        assert_eq!(
            params[1].diagnostics[1].severity,
            Some(DiagnosticSeverity::WARNING)
        );
    }
}
