//! Go-to-definition handler.
//!
//! The target may live in another document, such as an included file.

use lsp_types::{GotoDefinitionParams, GotoDefinitionResponse, Location};

use super::utils::{parse_uri, source_position, to_lsp_range};
use crate::snapshot::Snapshot;

/// Handle a go-to-definition request.
pub fn handle_goto_definition(
    params: &GotoDefinitionParams,
    snapshot: &Snapshot,
) -> Option<GotoDefinitionResponse> {
    let uri = &params.text_document_position_params.text_document.uri;
    let program = snapshot.program(uri.as_str())?;

    let target =
        program.definition(&source_position(uri, params.text_document_position_params.position))?;

    Some(GotoDefinitionResponse::Scalar(Location {
        uri: parse_uri(&target.source)?,
        range: to_lsp_range(&target),
    }))
}
