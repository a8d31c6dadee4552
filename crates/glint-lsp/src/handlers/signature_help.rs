//! Signature help handler for function calls.

use lsp_types::{
    Documentation, MarkupContent, MarkupKind, ParameterInformation, ParameterLabel,
    SignatureHelp, SignatureHelpParams, SignatureInformation,
};

use super::utils::source_position;
use crate::snapshot::Snapshot;

/// Handle a signature help request.
pub fn handle_signature_help(
    params: &SignatureHelpParams,
    snapshot: &Snapshot,
) -> Option<SignatureHelp> {
    let uri = &params.text_document_position_params.text_document.uri;
    let program = snapshot.program(uri.as_str())?;

    let result =
        program.signature(&source_position(uri, params.text_document_position_params.position));
    if result.signatures.is_empty() {
        return None;
    }

    let signatures = result
        .signatures
        .into_iter()
        .map(|signature| SignatureInformation {
            label: signature.text,
            documentation: (!signature.documentation.is_empty()).then(|| {
                Documentation::MarkupContent(MarkupContent {
                    kind: MarkupKind::Markdown,
                    value: signature.documentation,
                })
            }),
            parameters: Some(
                signature
                    .arguments
                    .into_iter()
                    .map(|argument| ParameterInformation {
                        label: ParameterLabel::Simple(argument),
                        documentation: None,
                    })
                    .collect(),
            ),
            active_parameter: None,
        })
        .collect();

    Some(SignatureHelp {
        signatures,
        active_signature: result.active_signature.map(|i| i as u32),
        active_parameter: result.active_argument.map(|i| i as u32),
    })
}
