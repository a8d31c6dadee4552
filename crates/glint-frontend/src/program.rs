//! A compiled program and the IDE queries it answers.

use crate::builtins;
use crate::lexer::{LineIndex, Lexeme, Token};
use glint_core::{
    CompiledProgram, Completion, Diagnostic, Signature, SignatureQueryResult, SourcePosition,
    SourceRange, Symbol, SymbolKind, Tooltip, TooltipQuery, UnusedSymbol,
};
use std::ops::Range;

/// One source text taking part in a program.
#[derive(Debug)]
pub(crate) struct SourceFile {
    pub name: String,
    pub text: String,
    pub index: LineIndex,
    pub lexemes: Vec<Lexeme>,
}

impl SourceFile {
    pub fn new(name: String, text: String) -> Self {
        let index = LineIndex::new(&text);
        let lexemes = crate::lexer::tokenize(&text);
        Self {
            name,
            text,
            index,
            lexemes,
        }
    }

    pub fn slice(&self, span: &Range<usize>) -> &str {
        &self.text[span.clone()]
    }

    pub fn range(&self, span: &Range<usize>) -> SourceRange {
        SourceRange::new(
            self.name.clone(),
            self.index.position(&self.text, span.start),
            self.index.position(&self.text, span.end),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DeclKind {
    Struct,
    Function,
    Variable,
    Parameter,
    Field,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Scope {
    Global,
    /// Local to the function declaration with this id.
    Local(usize),
    /// A field of the struct declaration with this id.
    Member(usize),
}

#[derive(Debug, Clone)]
pub(crate) struct Decl {
    pub name: String,
    pub kind: DeclKind,
    pub scope: Scope,
    pub file: usize,
    /// Span of the declared name.
    pub span: Range<usize>,
    pub text: String,
    pub doc: String,
    /// Declared type, for variables, parameters, and fields.
    pub type_name: Option<String>,
    /// Parameter labels, for functions.
    pub params: Vec<String>,
    /// First declaration of the same function, for overloads and definitions
    /// following a prototype.
    pub canonical: Option<usize>,
}

/// A place where a declaration's name appears.
#[derive(Debug, Clone)]
pub(crate) struct Occurrence {
    pub file: usize,
    pub span: Range<usize>,
    pub decl: usize,
    pub is_declaration: bool,
}

/// The `{ ... }` body of a function.
#[derive(Debug, Clone)]
pub(crate) struct Body {
    pub file: usize,
    pub span: Range<usize>,
    pub function: usize,
}

/// Byte offset where the identifier ending at `end` starts.
fn ident_start(text: &str, end: usize) -> usize {
    text[..end]
        .char_indices()
        .rev()
        .find(|(_, c)| !(c.is_alphanumeric() || *c == '_'))
        .map_or(0, |(i, c)| i + c.len_utf8())
}

/// A compiled program: the primary source plus everything it includes.
#[derive(Debug)]
pub struct Program {
    pub(crate) files: Vec<SourceFile>,
    pub(crate) decls: Vec<Decl>,
    pub(crate) occurrences: Vec<Occurrence>,
    pub(crate) bodies: Vec<Body>,
    pub(crate) diagnostics: Vec<Diagnostic>,
    pub(crate) unused: Vec<UnusedSymbol>,
}

impl Program {
    /// Identifiers of every source in the program, primary first.
    pub fn sources(&self) -> impl Iterator<Item = &str> {
        self.files.iter().map(|f| f.name.as_str())
    }

    fn locate(&self, at: &SourcePosition) -> Option<(usize, usize)> {
        let file = self.files.iter().position(|f| f.name == at.source)?;
        let source = &self.files[file];
        let offset = source.index.offset(&source.text, at.position)?;
        Some((file, offset))
    }

    fn root(&self, decl: usize) -> usize {
        self.decls[decl].canonical.unwrap_or(decl)
    }

    fn decl_range(&self, decl: usize) -> SourceRange {
        let d = &self.decls[decl];
        self.files[d.file].range(&d.span)
    }

    /// The occurrence under `offset`, preferring one that strictly contains it
    /// over one that merely ends there.
    fn occurrence_at(&self, file: usize, offset: usize) -> Option<&Occurrence> {
        let mut touching = None;
        for occurrence in self.occurrences.iter().filter(|o| o.file == file) {
            if occurrence.span.start <= offset && offset < occurrence.span.end {
                return Some(occurrence);
            }
            if occurrence.span.end == offset {
                touching = Some(occurrence);
            }
        }
        touching
    }

    /// The identifier token under `offset`, if any.
    fn word_at(&self, file: usize, offset: usize) -> Option<&Range<usize>> {
        let source = &self.files[file];
        source
            .lexemes
            .iter()
            .filter(|l| l.token == Some(Token::Ident))
            .map(|l| &l.span)
            .find(|span| span.start <= offset && offset <= span.end)
    }

    fn enclosing_function(&self, file: usize, offset: usize) -> Option<usize> {
        self.bodies
            .iter()
            .filter(|b| b.file == file && b.span.start < offset && offset < b.span.end)
            .map(|b| b.function)
            .last()
    }

    /// Resolve `name` as seen from `offset`: locals of the enclosing function
    /// first, then globals.
    fn lookup(&self, name: &str, file: usize, offset: usize) -> Option<usize> {
        if let Some(function) = self.enclosing_function(file, offset) {
            let local = self
                .decls
                .iter()
                .rposition(|d| d.name == name && d.scope == Scope::Local(function));
            if local.is_some() {
                return local;
            }
        }
        self.decls
            .iter()
            .position(|d| d.name == name && d.scope == Scope::Global && d.canonical.is_none())
    }

    fn struct_named(&self, name: &str) -> Option<usize> {
        self.decls
            .iter()
            .position(|d| d.kind == DeclKind::Struct && d.name == name)
    }

    fn fields_of(&self, struct_id: usize) -> impl Iterator<Item = &Decl> {
        self.decls
            .iter()
            .filter(move |d| d.scope == Scope::Member(struct_id))
    }

    fn completion_for(decl: &Decl) -> Completion {
        let kind = match decl.kind {
            DeclKind::Struct => SymbolKind::Struct,
            DeclKind::Function => SymbolKind::Function,
            DeclKind::Variable | DeclKind::Parameter | DeclKind::Field => SymbolKind::Variable,
        };
        Completion {
            name: decl.name.clone(),
            kind,
            detail: decl.text.clone(),
            documentation: decl.doc.clone(),
        }
    }

    fn member_completions(&self, file: usize, dot: usize) -> Vec<Completion> {
        let text = &self.files[file].text;
        let end = text[..dot].trim_end().len();
        let start = ident_start(text, end);
        let object = &text[start..end];
        let struct_id = self
            .lookup(object, file, start)
            .and_then(|d| self.decls[d].type_name.as_deref())
            .and_then(|type_name| self.struct_named(type_name));
        match struct_id {
            Some(id) => self.fields_of(id).map(Self::completion_for).collect(),
            None => Vec::new(),
        }
    }

    fn signatures_for(&self, name: &str) -> Vec<Signature> {
        let user: Vec<Signature> = self
            .decls
            .iter()
            .filter(|d| d.kind == DeclKind::Function && d.name == name)
            .map(|d| Signature {
                text: d.text.clone(),
                documentation: d.doc.clone(),
                arguments: d.params.clone(),
            })
            .collect();
        if !user.is_empty() {
            return user;
        }
        builtins::functions_named(name)
            .into_iter()
            .map(|f| Signature {
                text: f.text(),
                documentation: f.documentation.to_string(),
                arguments: f.params.iter().map(ToString::to_string).collect(),
            })
            .collect()
    }
}

impl CompiledProgram for Program {
    fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    fn unused_symbols(&self) -> &[UnusedSymbol] {
        &self.unused
    }

    fn tooltip(&self, query: &TooltipQuery) -> Option<Tooltip> {
        let (file, offset) = self.locate(&query.at)?;
        let (text, mut documentation, span) =
            if let Some(occurrence) = self.occurrence_at(file, offset) {
                let decl = &self.decls[occurrence.decl];
                (decl.text.clone(), decl.doc.clone(), occurrence.span.clone())
            } else {
                let span = self.word_at(file, offset)?;
                let builtin = *builtins::functions_named(self.files[file].slice(span)).first()?;
                (
                    builtin.text(),
                    builtin.documentation.to_string(),
                    span.clone(),
                )
            };
        let range = self.files[file].range(&span);

        if !query.ignore_diagnostics {
            for diagnostic in &self.diagnostics {
                if diagnostic.range.as_ref().is_some_and(|r| r.overlaps(&range)) {
                    if !documentation.is_empty() {
                        documentation.push_str("\n\n");
                    }
                    documentation.push_str(&format!("{}: {}", diagnostic.severity, diagnostic.message));
                }
            }
        }

        Some(Tooltip {
            text,
            documentation,
            range,
        })
    }

    fn definition(&self, at: &SourcePosition) -> Option<SourceRange> {
        let (file, offset) = self.locate(at)?;
        let occurrence = self.occurrence_at(file, offset)?;
        Some(self.decl_range(self.root(occurrence.decl)))
    }

    fn symbols(&self, source: &str) -> Option<Vec<Symbol>> {
        let file = self.files.iter().position(|f| f.name == source)?;
        let symbols = self
            .decls
            .iter()
            .enumerate()
            .filter(|(_, d)| d.file == file && d.scope == Scope::Global)
            .filter_map(|(id, d)| {
                let kind = match d.kind {
                    DeclKind::Struct => SymbolKind::Struct,
                    DeclKind::Function => SymbolKind::Function,
                    DeclKind::Variable => SymbolKind::Variable,
                    DeclKind::Parameter | DeclKind::Field => return None,
                };
                Some(Symbol {
                    name: d.name.clone(),
                    kind,
                    range: self.decl_range(id),
                })
            })
            .collect();
        Some(symbols)
    }

    fn rename(&self, at: &SourcePosition) -> Option<Vec<SourceRange>> {
        let (file, offset) = self.locate(at)?;
        let root = self.root(self.occurrence_at(file, offset)?.decl);
        let mut ranges: Vec<SourceRange> = self
            .occurrences
            .iter()
            .filter(|o| self.root(o.decl) == root)
            .map(|o| self.files[o.file].range(&o.span))
            .collect();
        ranges.sort();
        ranges.dedup();
        Some(ranges)
    }

    fn completions(&self, at: &SourcePosition) -> Vec<Completion> {
        let Some((file, offset)) = self.locate(at) else {
            return Vec::new();
        };
        let text = &self.files[file].text;
        let prefix_start = ident_start(text, offset);
        if text[..prefix_start].ends_with('.') {
            return self.member_completions(file, prefix_start - 1);
        }

        let function = self.enclosing_function(file, offset);
        let mut completions: Vec<Completion> = self
            .decls
            .iter()
            .filter(|d| match d.scope {
                Scope::Global => d.canonical.is_none(),
                Scope::Local(f) => Some(f) == function,
                Scope::Member(_) => false,
            })
            .map(Self::completion_for)
            .collect();

        let mut seen = std::collections::HashSet::new();
        for builtin in builtins::FUNCTIONS {
            if seen.insert(builtin.name) {
                completions.push(Completion {
                    name: builtin.name.to_string(),
                    kind: SymbolKind::Function,
                    detail: builtin.text(),
                    documentation: builtin.documentation.to_string(),
                });
            }
        }
        for name in builtins::TYPES
            .iter()
            .chain(builtins::QUALIFIERS)
            .chain(builtins::KEYWORDS)
        {
            completions.push(Completion {
                name: (*name).to_string(),
                kind: SymbolKind::Keyword,
                detail: String::new(),
                documentation: String::new(),
            });
        }
        for name in builtins::VARIABLES {
            completions.push(Completion {
                name: (*name).to_string(),
                kind: SymbolKind::Variable,
                detail: String::new(),
                documentation: String::new(),
            });
        }
        completions
    }

    fn signature(&self, at: &SourcePosition) -> SignatureQueryResult {
        let Some((file, offset)) = self.locate(at) else {
            return SignatureQueryResult::default();
        };
        let source = &self.files[file];
        let before: Vec<&Lexeme> = source
            .lexemes
            .iter()
            .filter(|l| l.span.end <= offset && !l.token.is_some_and(Token::is_trivia))
            .collect();

        let mut depth = 0usize;
        let mut commas = 0usize;
        for (i, lexeme) in before.iter().enumerate().rev() {
            match lexeme.token {
                Some(Token::RParen | Token::RBracket) => depth += 1,
                Some(Token::LBracket) => depth = depth.saturating_sub(1),
                Some(Token::LParen) if depth > 0 => depth -= 1,
                Some(Token::LParen) => {
                    let callee = i
                        .checked_sub(1)
                        .map(|j| before[j])
                        .filter(|l| l.token == Some(Token::Ident));
                    let Some(callee) = callee else {
                        return SignatureQueryResult::default();
                    };
                    let signatures = self.signatures_for(source.slice(&callee.span));
                    if signatures.is_empty() {
                        return SignatureQueryResult::default();
                    }
                    let active = signatures
                        .iter()
                        .position(|s| s.arguments.len() > commas)
                        .unwrap_or(0);
                    return SignatureQueryResult {
                        signatures,
                        active_signature: Some(active),
                        active_argument: Some(commas),
                    };
                }
                Some(Token::Comma) if depth == 0 => commas += 1,
                Some(Token::Semi | Token::LBrace | Token::RBrace) if depth == 0 => break,
                _ => {}
            }
        }
        SignatureQueryResult::default()
    }
}
