//! Document formatting handler.
//!
//! Works on the live text in the document store, never on a build result.

use glint_core::{Compiler, FormatOptions, TrailingNewline};
use lsp_types::{DocumentFormattingParams, FormattingOptions, Position, Range, TextEdit};

use super::utils::end_position;
use crate::vfs::Vfs;

/// Indent width used when the editor sends a tab size of zero.
const DEFAULT_TAB_SIZE: u32 = 2;

/// Derive compiler format options from the editor's request.
pub fn format_options(options: &FormattingOptions, default_trailing: TrailingNewline) -> FormatOptions {
    let indent = if options.insert_spaces {
        let width = if options.tab_size == 0 {
            DEFAULT_TAB_SIZE
        } else {
            options.tab_size
        };
        " ".repeat(width as usize)
    } else {
        "\t".to_string()
    };

    let trailing_newline = if options.insert_final_newline == Some(true) {
        TrailingNewline::Insert
    } else if options.trim_final_newlines == Some(true) {
        TrailingNewline::Remove
    } else {
        default_trailing
    };

    FormatOptions {
        indent,
        newline: "\n".to_string(),
        trailing_newline,
    }
}

/// Handle a formatting request.
pub fn handle_formatting(
    params: &DocumentFormattingParams,
    vfs: &Vfs,
    compiler: &dyn Compiler,
    default_trailing: TrailingNewline,
) -> Result<Vec<TextEdit>, String> {
    let uri = params.text_document.uri.as_str();
    let Some(text) = vfs.get_content(uri) else {
        tracing::debug!("Formatting unopened document {}", uri);
        return Ok(Vec::new());
    };

    let options = format_options(&params.options, default_trailing);
    let formatted = compiler.format(&text, &options).map_err(|e| e.to_string())?;

    if formatted == text {
        return Ok(Vec::new());
    }

    Ok(vec![TextEdit {
        range: Range::new(Position::new(0, 0), end_position(&text)),
        new_text: formatted,
    }])
}
