//! Rename handler.
//!
//! The compiler reports every range to retext, possibly across several
//! documents. They are grouped into one versioned edit batch per document so
//! the editor can reject a batch whose document changed in the meantime.

use glint_core::SourceRange;
use lsp_types::{
    DocumentChanges, OneOf, OptionalVersionedTextDocumentIdentifier, RenameParams,
    TextDocumentEdit, TextEdit, WorkspaceEdit,
};

use super::utils::{parse_uri, source_position, to_lsp_range};
use crate::snapshot::Snapshot;
use crate::vfs::Vfs;

/// Group ranges by source, keeping the order in which sources first appear.
/// Ranges within a group come out sorted and without duplicates.
fn group_by_source(ranges: Vec<SourceRange>) -> Vec<(String, Vec<SourceRange>)> {
    let mut groups: Vec<(String, Vec<SourceRange>)> = Vec::new();
    for range in ranges {
        match groups.iter_mut().find(|(source, _)| *source == range.source) {
            Some((_, group)) => group.push(range),
            None => groups.push((range.source.clone(), vec![range])),
        }
    }
    for (_, group) in &mut groups {
        group.sort();
        group.dedup();
    }
    groups
}

/// Handle a rename request.
pub fn handle_rename(params: &RenameParams, snapshot: &Snapshot, vfs: &Vfs) -> Option<WorkspaceEdit> {
    let uri = &params.text_document_position.text_document.uri;
    if !vfs.is_open(uri.as_str()) {
        tracing::debug!("Rename on unopened document {}", uri.as_str());
        return None;
    }
    let program = snapshot.program(uri.as_str())?;

    let ranges = program.rename(&source_position(uri, params.text_document_position.position))?;
    if ranges.is_empty() {
        return None;
    }

    let edits: Vec<TextDocumentEdit> = group_by_source(ranges)
        .into_iter()
        .filter_map(|(source, group)| {
            Some(TextDocumentEdit {
                text_document: OptionalVersionedTextDocumentIdentifier {
                    uri: parse_uri(&source)?,
                    version: vfs.version(&source),
                },
                edits: group
                    .iter()
                    .map(|range| {
                        OneOf::Left(TextEdit {
                            range: to_lsp_range(range),
                            new_text: params.new_name.clone(),
                        })
                    })
                    .collect(),
            })
        })
        .collect();

    tracing::debug!("Rename to {:?} touches {} documents", params.new_name, edits.len());

    Some(WorkspaceEdit {
        document_changes: Some(DocumentChanges::Edits(edits)),
        ..Default::default()
    })
}
