//! Hover handler for displaying information about symbols.

use glint_core::TooltipQuery;
use lsp_types::{Hover, HoverContents, HoverParams};

use super::utils::{code_markdown, source_position, to_lsp_range};
use crate::snapshot::Snapshot;

/// Handle a hover request.
pub fn handle_hover(params: &HoverParams, snapshot: &Snapshot) -> Option<Hover> {
    let uri = &params.text_document_position_params.text_document.uri;
    let program = snapshot.program(uri.as_str())?;

    let tooltip = program.tooltip(&TooltipQuery {
        at: source_position(uri, params.text_document_position_params.position),
        // Published diagnostics are already shown on hover by editors.
        ignore_diagnostics: true,
    })?;

    tracing::debug!("Hover for {}: {}", uri.as_str(), tooltip.text);

    Some(Hover {
        contents: HoverContents::Markup(code_markdown(&tooltip.text, &tooltip.documentation)),
        range: Some(to_lsp_range(&tooltip.range)),
    })
}
