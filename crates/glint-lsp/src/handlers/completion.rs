//! Completion handler.

use glint_core::SymbolKind;
use lsp_types::{
    CompletionItem, CompletionItemKind, CompletionParams, CompletionResponse, Documentation,
};

use super::utils::{code_markdown, source_position};
use crate::snapshot::Snapshot;

/// Map a compiler symbol kind to a completion item kind.
const fn to_completion_kind(kind: SymbolKind) -> CompletionItemKind {
    match kind {
        SymbolKind::Struct => CompletionItemKind::CLASS,
        SymbolKind::Function => CompletionItemKind::FUNCTION,
        SymbolKind::Variable => CompletionItemKind::VARIABLE,
        SymbolKind::Keyword | SymbolKind::Other => CompletionItemKind::KEYWORD,
    }
}

/// Handle a completion request.
pub fn handle_completion(
    params: &CompletionParams,
    snapshot: &Snapshot,
) -> Option<CompletionResponse> {
    let uri = &params.text_document_position.text_document.uri;
    let program = snapshot.program(uri.as_str())?;

    let completions = program.completions(&source_position(
        uri,
        params.text_document_position.position,
    ));
    tracing::debug!("{} completions for {}", completions.len(), uri.as_str());

    let items = completions
        .into_iter()
        .map(|completion| CompletionItem {
            kind: Some(to_completion_kind(completion.kind)),
            documentation: (!completion.detail.is_empty()).then(|| {
                Documentation::MarkupContent(code_markdown(
                    &completion.detail,
                    &completion.documentation,
                ))
            }),
            label: completion.name,
            ..Default::default()
        })
        .collect();

    Some(CompletionResponse::Array(items))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_support::{at, snapshot};
    use lsp_types::{PartialResultParams, WorkDoneProgressParams};

    fn complete(snapshot: &Snapshot, line: u32, character: u32) -> Vec<CompletionItem> {
        let params = CompletionParams {
            text_document_position: at("file:///a.glsl", line, character),
            work_done_progress_params: WorkDoneProgressParams::default(),
            partial_result_params: PartialResultParams::default(),
            context: None,
        };
        match handle_completion(&params, snapshot) {
            Some(CompletionResponse::Array(items)) => items,
            other => panic!("unexpected response {other:?}"),
        }
    }

    #[test]
    fn test_member_completion_items() {
        let snapshot = snapshot(&[(
            "file:///a.glsl",
            "struct Light { vec3 color; float power; };\nvoid main() { Light l; l. }",
        )]);
        let items = complete(&snapshot, 1, 25);
        let labels: Vec<&str> = items.iter().map(|item| item.label.as_str()).collect();
        assert_eq!(labels, vec!["color", "power"]);
    }

    #[test]
    fn test_completion_kinds_and_documentation() {
        let snapshot = snapshot(&[(
            "file:///a.glsl",
            "float g;\nvoid main() { float local; }",
        )]);
        let items = complete(&snapshot, 1, 27);
        let find = |label: &str| items.iter().find(|item| item.label == label).unwrap();

        assert_eq!(find("g").kind, Some(CompletionItemKind::VARIABLE));
        assert_eq!(find("main").kind, Some(CompletionItemKind::FUNCTION));
        assert_eq!(find("vec3").kind, Some(CompletionItemKind::KEYWORD));
        match &find("local").documentation {
            Some(Documentation::MarkupContent(markup)) => {
                assert!(markup.value.starts_with("```glsl\nfloat local\n```"));
            }
            other => panic!("unexpected documentation {other:?}"),
        }
    }

    #[test]
    fn test_completion_kind_table() {
        assert_eq!(to_completion_kind(SymbolKind::Struct), CompletionItemKind::CLASS);
        assert_eq!(to_completion_kind(SymbolKind::Other), CompletionItemKind::KEYWORD);
    }
}
