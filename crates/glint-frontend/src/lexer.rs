//! Tokenizer using Logos.
//!
//! Comments are produced as tokens rather than skipped so the formatter and
//! doc-comment lookup can see them; the analyzer filters them out.

use glint_core::Position;
use logos::Logos;
use std::ops::Range;

/// Token types produced by the lexer.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"[ \t\r\n\f]+")]
pub enum Token {
    /// A preprocessor line such as `#include "common.glsl"` or `#version 100`.
    #[regex(r"#[^\r\n]*")]
    Directive,

    /// A `// ...` comment.
    #[regex(r"//[^\r\n]*")]
    LineComment,

    /// A `/* ... */` comment.
    #[regex(r"/\*([^*]|\*+[^*/])*\*+/")]
    BlockComment,

    /// An identifier or keyword.
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Ident,

    /// A numeric literal.
    #[regex(r"[0-9]+(\.[0-9]*)?([eE][+-]?[0-9]+)?[fFuU]?")]
    #[regex(r"\.[0-9]+([eE][+-]?[0-9]+)?[fF]?")]
    Number,

    /// A double-quoted string.
    #[regex(r#""([^"\\\r\n]|\\.)*""#)]
    String,

    /// `{`
    #[token("{")]
    LBrace,
    /// `}`
    #[token("}")]
    RBrace,
    /// `(`
    #[token("(")]
    LParen,
    /// `)`
    #[token(")")]
    RParen,
    /// `[`
    #[token("[")]
    LBracket,
    /// `]`
    #[token("]")]
    RBracket,
    /// `;`
    #[token(";")]
    Semi,
    /// `,`
    #[token(",")]
    Comma,
    /// `.`
    #[token(".")]
    Dot,
    /// `=`
    #[token("=")]
    Assign,

    /// Any other operator.
    #[regex(r"[-+*/%<>!&|^~?:]=?|&&|\|\||<<=?|>>=?|\+\+|--|==")]
    Operator,
}

impl Token {
    /// Comments carry no meaning for analysis.
    pub const fn is_trivia(self) -> bool {
        matches!(self, Self::LineComment | Self::BlockComment)
    }
}

/// A token with its byte span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lexeme {
    /// The token kind, or `None` for a character the lexer does not recognise.
    pub token: Option<Token>,
    /// Byte span in the source.
    pub span: Range<usize>,
}

/// Tokenize a source text.
pub fn tokenize(source: &str) -> Vec<Lexeme> {
    let mut lexer = Token::lexer(source);
    let mut lexemes = Vec::new();
    while let Some(result) = lexer.next() {
        lexemes.push(Lexeme {
            token: result.ok(),
            span: lexer.span(),
        });
    }
    lexemes
}

/// Extract the quoted path of an `#include` directive.
///
/// Returns `None` if the directive is not an include, and `Some(Err(()))` if
/// it is an include without a well-formed quoted path.
pub fn include_path(directive: &str) -> Option<Result<&str, ()>> {
    let rest = directive.strip_prefix('#')?.trim_start();
    let rest = rest.strip_prefix("include")?;
    if rest.starts_with(|c: char| c.is_alphanumeric() || c == '_') {
        return None;
    }
    let rest = rest.trim();
    let path = rest
        .strip_prefix('"')
        .and_then(|r| r.strip_suffix('"'))
        .filter(|p| !p.is_empty() && !p.contains('"'));
    Some(path.ok_or(()))
}

/// Maps byte offsets to editor positions and back.
///
/// Columns are counted in UTF-16 code units.
#[derive(Debug, Clone)]
pub struct LineIndex {
    /// Byte offset of the start of each line (including line 0 at offset 0).
    line_starts: Vec<usize>,
}

impl LineIndex {
    /// Build a line index from source text.
    ///
    /// Lines end at `\n`, `\r\n` or a lone `\r`.
    pub fn new(source: &str) -> Self {
        let bytes = source.as_bytes();
        let mut line_starts = vec![0];
        for (i, &byte) in bytes.iter().enumerate() {
            let breaks = match byte {
                b'\n' => true,
                b'\r' => bytes.get(i + 1) != Some(&b'\n'),
                _ => false,
            };
            if breaks {
                line_starts.push(i + 1);
            }
        }
        Self { line_starts }
    }

    /// Convert a byte offset to a position.
    pub fn position(&self, source: &str, offset: usize) -> Position {
        let offset = offset.min(source.len());
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(line) => line.saturating_sub(1),
        };
        let start = self.line_starts[line];
        let column = source
            .get(start..offset)
            .map_or(0, |text| text.encode_utf16().count());
        Position::new(line as u32, column as u32)
    }

    /// Convert a position to a byte offset, clamping to the end of the line.
    pub fn offset(&self, source: &str, position: Position) -> Option<usize> {
        let start = *self.line_starts.get(position.line as usize)?;
        let end = self
            .line_starts
            .get(position.line as usize + 1)
            .map_or(source.len(), |&next| next);
        let end = start + source[start..end].trim_end_matches(['\n', '\r']).len();
        let mut units = 0u32;
        for (i, ch) in source[start..end].char_indices() {
            if units >= position.column {
                return Some(start + i);
            }
            units += ch.len_utf16() as u32;
        }
        Some(end)
    }
}
