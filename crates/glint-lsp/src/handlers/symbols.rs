//! Document symbols handler for outline view.

use glint_core::SymbolKind as CompilerSymbolKind;
use lsp_types::{
    DocumentSymbolParams, DocumentSymbolResponse, Location, SymbolInformation, SymbolKind,
};

use super::utils::{parse_uri, to_lsp_range};
use crate::snapshot::Snapshot;

/// Map a compiler symbol kind to a protocol symbol kind.
const fn to_lsp_symbol_kind(kind: CompilerSymbolKind) -> SymbolKind {
    match kind {
        CompilerSymbolKind::Struct => SymbolKind::CLASS,
        CompilerSymbolKind::Function => SymbolKind::FUNCTION,
        _ => SymbolKind::VARIABLE,
    }
}

/// Handle a document symbols request.
#[allow(deprecated)] // SymbolInformation::deprecated field is deprecated but required
pub fn handle_document_symbols(
    params: &DocumentSymbolParams,
    snapshot: &Snapshot,
) -> Option<DocumentSymbolResponse> {
    let uri = &params.text_document.uri;
    let program = snapshot.program(uri.as_str())?;
    let symbols = program.symbols(uri.as_str())?;

    let information = symbols
        .into_iter()
        .filter_map(|symbol| {
            Some(SymbolInformation {
                location: Location {
                    uri: parse_uri(&symbol.range.source)?,
                    range: to_lsp_range(&symbol.range),
                },
                name: symbol.name,
                kind: to_lsp_symbol_kind(symbol.kind),
                tags: None,
                deprecated: None,
                container_name: None,
            })
        })
        .collect();

    Some(DocumentSymbolResponse::Flat(information))
}
