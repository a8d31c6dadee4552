//! Declaration and reference analysis.
//!
//! A single pass over the token stream of each source. Includes are expanded
//! in place, so declarations from an included file are visible to everything
//! after the `#include` line. Each source enters a program at most once, which
//! also terminates include cycles.

use crate::builtins;
use crate::lexer::{include_path, Lexeme, Token};
use crate::program::{Body, Decl, DeclKind, Occurrence, Program, Scope, SourceFile};
use glint_core::{Diagnostic, IncludeResolver, Source, UnusedSymbol};
use std::collections::HashMap;
use std::ops::Range;

/// Compile `primary` into a [`Program`].
pub fn analyze(primary: Source, resolver: &dyn IncludeResolver) -> Program {
    let mut analyzer = Analyzer::default();
    let root = analyzer.add_file(primary);
    analyzer.walk(root, resolver);
    analyzer.finish()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Frame {
    Plain,
    Function(usize),
    Struct(usize),
}

#[derive(Debug)]
struct Open {
    token: Token,
    span: Range<usize>,
    frame: Frame,
}

/// A declaration list that may continue after a comma (`float a, b;`).
#[derive(Debug)]
struct Declarator {
    type_name: String,
    depth: usize,
}

#[derive(Default)]
struct Analyzer {
    files: Vec<SourceFile>,
    decls: Vec<Decl>,
    occurrences: Vec<Occurrence>,
    bodies: Vec<Body>,
    diagnostics: Vec<Diagnostic>,
    globals: HashMap<String, usize>,
    locals: HashMap<(usize, String), usize>,
    fields: HashMap<(usize, String), usize>,
}

/// Per-source walking state.
struct Walk {
    file: usize,
    lexemes: Vec<Lexeme>,
    stack: Vec<Open>,
    declarator: Option<Declarator>,
}

impl Walk {
    fn token(&self, i: usize) -> Option<Token> {
        self.lexemes.get(i).and_then(|l| l.token)
    }

    fn span(&self, i: usize) -> Range<usize> {
        self.lexemes[i].span.clone()
    }

    fn function(&self) -> Option<usize> {
        self.stack.iter().rev().find_map(|open| match open.frame {
            Frame::Function(id) => Some(id),
            _ => None,
        })
    }

    fn struct_body(&self) -> Option<usize> {
        match self.stack.last().map(|open| open.frame) {
            Some(Frame::Struct(id)) => Some(id),
            _ => None,
        }
    }

    fn ends_declarator(&self, i: usize) -> bool {
        matches!(
            self.token(i),
            Some(Token::Semi | Token::Assign | Token::Comma | Token::LBracket)
        )
    }
}

fn closer_for(open: Token) -> Token {
    match open {
        Token::LParen => Token::RParen,
        Token::LBracket => Token::RBracket,
        _ => Token::RBrace,
    }
}

fn quoted(text: &str) -> String {
    format!("\"{text}\"")
}

impl Analyzer {
    fn add_file(&mut self, source: Source) -> usize {
        self.files.push(SourceFile::new(source.name, source.contents));
        self.files.len() - 1
    }

    fn text(&self, file: usize, span: &Range<usize>) -> &str {
        self.files[file].slice(span)
    }

    fn error(&mut self, file: usize, span: &Range<usize>, message: String) {
        let range = self.files[file].range(span);
        self.diagnostics.push(Diagnostic::error(message, range));
    }

    fn warning(&mut self, file: usize, span: &Range<usize>, message: String) {
        let range = self.files[file].range(span);
        self.diagnostics.push(Diagnostic::warning(message, range));
    }

    /// Render tokens `first..=last` with normalised spacing.
    fn render(&self, walk: &Walk, first: usize, last: usize) -> String {
        let mut out = String::new();
        let mut previous: Option<Token> = None;
        for i in first..=last {
            let token = walk.token(i);
            let word = |t: Option<Token>| matches!(t, Some(Token::Ident | Token::Number));
            if (word(previous) && word(token)) || previous == Some(Token::Comma) {
                out.push(' ');
            }
            out.push_str(self.text(walk.file, &walk.span(i)));
            previous = token;
        }
        out
    }

    /// The `//` comment lines directly above the line containing `offset`.
    fn doc_comment(&self, file: usize, offset: usize) -> String {
        let text = &self.files[file].text;
        let line_start = text[..offset].rfind(['\n', '\r']).map_or(0, |i| i + 1);
        let above = text[..line_start].replace("\r\n", "\n");
        let mut lines: Vec<&str> = above
            .split(['\n', '\r'])
            .rev()
            .skip(1)
            .map(str::trim)
            .take_while(|line| line.starts_with("//"))
            .map(|line| {
                let body = line.trim_start_matches('/');
                body.strip_prefix(' ').unwrap_or(body)
            })
            .collect();
        lines.reverse();
        lines.join("\n")
    }

    fn is_type_name(&self, name: &str) -> bool {
        builtins::is_type(name)
            || self
                .globals
                .get(name)
                .is_some_and(|&id| self.decls[id].kind == DeclKind::Struct)
    }

    fn struct_named(&self, name: &str) -> Option<usize> {
        self.globals
            .get(name)
            .copied()
            .filter(|&id| self.decls[id].kind == DeclKind::Struct)
    }

    fn lookup(&self, name: &str, function: Option<usize>) -> Option<usize> {
        function
            .and_then(|f| self.locals.get(&(f, name.to_string())).copied())
            .or_else(|| self.globals.get(name).copied())
    }

    fn reference(&mut self, file: usize, span: Range<usize>, decl: usize) {
        self.occurrences.push(Occurrence {
            file,
            span,
            decl,
            is_declaration: false,
        });
    }

    fn push_decl(&mut self, decl: Decl) -> usize {
        let id = self.decls.len();
        self.occurrences.push(Occurrence {
            file: decl.file,
            span: decl.span.clone(),
            decl: id,
            is_declaration: true,
        });
        self.decls.push(decl);
        id
    }

    /// Register a variable, field, or parameter declaration, reporting
    /// redeclarations and shadowing.
    fn declare(&mut self, decl: Decl) -> usize {
        let name = decl.name.clone();
        let (file, span) = (decl.file, decl.span.clone());
        let scope = decl.scope;
        let existing = match scope {
            Scope::Global => self.globals.get(&name).copied(),
            Scope::Local(f) => self.locals.get(&(f, name.clone())).copied(),
            Scope::Member(s) => self.fields.get(&(s, name.clone())).copied(),
        };
        let id = self.push_decl(decl);
        if existing.is_some() {
            self.error(file, &span, format!("redeclaration of {}", quoted(&name)));
            return id;
        }
        match scope {
            Scope::Global => {
                self.globals.insert(name, id);
            }
            Scope::Local(f) => {
                if self.globals.contains_key(&name) {
                    self.warning(
                        file,
                        &span,
                        format!("{} shadows a global declaration", quoted(&name)),
                    );
                }
                self.locals.insert((f, name), id);
            }
            Scope::Member(s) => {
                self.fields.insert((s, name), id);
            }
        }
        id
    }

    fn walk(&mut self, file: usize, resolver: &dyn IncludeResolver) {
        let lexemes: Vec<Lexeme> = self.files[file]
            .lexemes
            .iter()
            .filter(|l| !l.token.is_some_and(Token::is_trivia))
            .cloned()
            .collect();
        let mut walk = Walk {
            file,
            lexemes,
            stack: Vec::new(),
            declarator: None,
        };

        let mut i = 0;
        while i < walk.lexemes.len() {
            i = match walk.token(i) {
                None => {
                    let span = walk.span(i);
                    let message = format!("unexpected character {}", quoted(self.text(file, &span)));
                    self.error(file, &span, message);
                    i + 1
                }
                Some(Token::Directive) => {
                    self.include(&walk, i, resolver);
                    i + 1
                }
                Some(token @ (Token::LBrace | Token::LParen | Token::LBracket)) => {
                    walk.stack.push(Open {
                        token,
                        span: walk.span(i),
                        frame: Frame::Plain,
                    });
                    i + 1
                }
                Some(token @ (Token::RBrace | Token::RParen | Token::RBracket)) => {
                    self.close(&mut walk, i, token);
                    i + 1
                }
                Some(Token::Semi) => {
                    if walk
                        .declarator
                        .as_ref()
                        .is_some_and(|d| d.depth == walk.stack.len())
                    {
                        walk.declarator = None;
                    }
                    i + 1
                }
                Some(Token::Comma) => self.continue_declarator(&mut walk, i),
                Some(Token::Ident) => self.ident(&mut walk, i),
                _ => i + 1,
            };
        }

        for open in std::mem::take(&mut walk.stack) {
            let message = format!("unclosed {}", quoted(self.text(file, &open.span)));
            self.error(file, &open.span, message);
        }
    }

    fn include(&mut self, walk: &Walk, i: usize, resolver: &dyn IncludeResolver) {
        let file = walk.file;
        let span = walk.span(i);
        let directive = self.text(file, &span).to_string();
        match include_path(&directive) {
            None => {}
            Some(Err(())) => {
                self.error(file, &span, "expected a quoted path after #include".to_string());
            }
            Some(Ok(path)) => {
                let requester = self.files[file].name.clone();
                match resolver.resolve(path, &requester) {
                    None => {
                        self.error(
                            file,
                            &span,
                            format!("could not find include file {}", quoted(path)),
                        );
                    }
                    Some(source) if self.files.iter().any(|f| f.name == source.name) => {
                        tracing::trace!(include = %source.name, "source already in program");
                    }
                    Some(source) => {
                        let included = self.add_file(source);
                        self.walk(included, resolver);
                    }
                }
            }
        }
    }

    fn close(&mut self, walk: &mut Walk, i: usize, token: Token) {
        let span = walk.span(i);
        let balanced = walk
            .stack
            .last()
            .is_some_and(|open| closer_for(open.token) == token);
        if !balanced {
            let message = format!("unexpected {}", quoted(self.text(walk.file, &span)));
            self.error(walk.file, &span, message);
            return;
        }
        if let Some(open) = walk.stack.pop() {
            if let Frame::Function(function) = open.frame {
                self.bodies.push(Body {
                    file: walk.file,
                    span: open.span.start..span.end,
                    function,
                });
            }
        }
        if walk
            .declarator
            .as_ref()
            .is_some_and(|d| d.depth > walk.stack.len())
        {
            walk.declarator = None;
        }
    }

    fn continue_declarator(&mut self, walk: &mut Walk, i: usize) -> usize {
        let Some(type_name) = walk
            .declarator
            .as_ref()
            .filter(|d| d.depth == walk.stack.len())
            .map(|d| d.type_name.clone())
        else {
            return i + 1;
        };
        if walk.token(i + 1) != Some(Token::Ident) || !walk.ends_declarator(i + 2) {
            return i + 1;
        }
        let span = walk.span(i + 1);
        let name = self.text(walk.file, &span).to_string();
        let text = format!("{type_name} {name}");
        self.declare_variable(walk, name, span, text, type_name);
        i + 2
    }

    fn declare_variable(
        &mut self,
        walk: &Walk,
        name: String,
        span: Range<usize>,
        text: String,
        type_name: String,
    ) -> usize {
        let (kind, scope) = if let Some(s) = walk.struct_body() {
            (DeclKind::Field, Scope::Member(s))
        } else if let Some(f) = walk.function() {
            (DeclKind::Variable, Scope::Local(f))
        } else {
            (DeclKind::Variable, Scope::Global)
        };
        let doc = self.doc_comment(walk.file, span.start);
        self.declare(Decl {
            name,
            kind,
            scope,
            file: walk.file,
            span,
            text,
            doc,
            type_name: Some(type_name),
            params: Vec::new(),
            canonical: None,
        })
    }

    fn ident(&mut self, walk: &mut Walk, i: usize) -> usize {
        let file = walk.file;
        let word = self.text(file, &walk.span(i)).to_string();

        if word == "struct"
            && walk.token(i + 1) == Some(Token::Ident)
            && walk.token(i + 2) == Some(Token::LBrace)
        {
            return self.struct_decl(walk, i);
        }

        let mut j = i;
        while walk.token(j) == Some(Token::Ident)
            && builtins::is_qualifier(self.text(file, &walk.span(j)))
        {
            j += 1;
        }

        let type_name = (walk.token(j) == Some(Token::Ident))
            .then(|| self.text(file, &walk.span(j)).to_string())
            .filter(|t| self.is_type_name(t));
        let name = (walk.token(j + 1) == Some(Token::Ident))
            .then(|| self.text(file, &walk.span(j + 1)).to_string())
            .filter(|n| !builtins::is_reserved(n));

        if let (Some(type_name), Some(name)) = (type_name, name) {
            if walk.token(j + 2) == Some(Token::LParen)
                && walk.function().is_none()
                && walk.struct_body().is_none()
            {
                return self.function_decl(walk, i, j);
            }
            if walk.ends_declarator(j + 2) {
                if let Some(id) = self.struct_named(&type_name) {
                    self.reference(file, walk.span(j), id);
                }
                let text = self.render(walk, i, j + 1);
                self.declare_variable(walk, name, walk.span(j + 1), text, type_name.clone());
                walk.declarator = Some(Declarator {
                    type_name,
                    depth: walk.stack.len(),
                });
                return j + 2;
            }
        }

        if j > i {
            // Qualifiers that did not start a declaration.
            return j;
        }
        self.use_site(walk, i, &word);
        i + 1
    }

    fn struct_decl(&mut self, walk: &mut Walk, i: usize) -> usize {
        let span = walk.span(i + 1);
        let name = self.text(walk.file, &span).to_string();
        let doc = self.doc_comment(walk.file, walk.span(i).start);
        let id = self.declare(Decl {
            text: format!("struct {name}"),
            name,
            kind: DeclKind::Struct,
            scope: Scope::Global,
            file: walk.file,
            span,
            doc,
            type_name: None,
            params: Vec::new(),
            canonical: None,
        });
        walk.stack.push(Open {
            token: Token::LBrace,
            span: walk.span(i + 2),
            frame: Frame::Struct(id),
        });
        i + 3
    }

    fn function_decl(&mut self, walk: &mut Walk, start: usize, type_index: usize) -> usize {
        let file = walk.file;
        let name_index = type_index + 1;
        let open = name_index + 1;

        let mut depth = 0usize;
        let mut close = None;
        for k in open..walk.lexemes.len() {
            match walk.token(k) {
                Some(Token::LParen) => depth += 1,
                Some(Token::RParen) => {
                    depth -= 1;
                    if depth == 0 {
                        close = Some(k);
                        break;
                    }
                }
                Some(Token::LBrace | Token::RBrace | Token::Semi) => break,
                _ => {}
            }
        }
        let Some(close) = close else {
            // Let the bracket checker report the unclosed parenthesis.
            return open;
        };

        let return_type = self.text(file, &walk.span(type_index)).to_string();
        if let Some(id) = self.struct_named(&return_type) {
            self.reference(file, walk.span(type_index), id);
        }

        let mut segments: Vec<(usize, usize)> = Vec::new();
        let mut segment_start = open + 1;
        let mut nested = 0usize;
        for k in open + 1..=close {
            match walk.token(k) {
                Some(Token::LParen | Token::LBracket) => nested += 1,
                Some(Token::RBracket) => nested = nested.saturating_sub(1),
                Some(Token::RParen) if nested > 0 => nested -= 1,
                Some(Token::Comma) if nested == 0 => {
                    if k > segment_start {
                        segments.push((segment_start, k - 1));
                    }
                    segment_start = k + 1;
                }
                _ => {}
            }
            if k == close && k > segment_start {
                segments.push((segment_start, k - 1));
            }
        }
        segments.retain(|&(first, last)| {
            !(first == last && self.text(file, &walk.span(first)) == "void")
        });
        let params: Vec<String> = segments
            .iter()
            .map(|&(first, last)| self.render(walk, first, last))
            .collect();

        let name_span = walk.span(name_index);
        let name = self.text(file, &name_span).to_string();
        let doc = self.doc_comment(file, walk.span(start).start);
        let text = self.render(walk, start, close);
        let previous = self.globals.get(&name).copied();
        let canonical = previous.filter(|&id| self.decls[id].kind == DeclKind::Function);
        let function = self.push_decl(Decl {
            name: name.clone(),
            kind: DeclKind::Function,
            scope: Scope::Global,
            file,
            span: name_span.clone(),
            text,
            doc,
            type_name: None,
            params: params.clone(),
            canonical,
        });
        match previous {
            None => {
                self.globals.insert(name, function);
            }
            Some(_) if canonical.is_some() => {}
            Some(_) => {
                self.error(file, &name_span, format!("redeclaration of {}", quoted(&name)));
            }
        }

        for (&(first, last), label) in segments.iter().zip(params) {
            let mut t = first;
            while t <= last && builtins::is_qualifier(self.text(file, &walk.span(t))) {
                t += 1;
            }
            if t + 1 > last || walk.token(t + 1) != Some(Token::Ident) {
                continue;
            }
            let param_type = self.text(file, &walk.span(t)).to_string();
            if let Some(id) = self.struct_named(&param_type) {
                self.reference(file, walk.span(t), id);
            }
            let span = walk.span(t + 1);
            let name = self.text(file, &span).to_string();
            self.declare(Decl {
                name,
                kind: DeclKind::Parameter,
                scope: Scope::Local(function),
                file,
                span,
                text: label,
                doc: String::new(),
                type_name: Some(param_type),
                params: Vec::new(),
                canonical: None,
            });
        }

        if walk.token(close + 1) == Some(Token::LBrace) {
            walk.stack.push(Open {
                token: Token::LBrace,
                span: walk.span(close + 1),
                frame: Frame::Function(function),
            });
            return close + 2;
        }
        close + 1
    }

    fn use_site(&mut self, walk: &Walk, i: usize, word: &str) {
        let file = walk.file;
        let span = walk.span(i);

        if i > 0 && walk.token(i - 1) == Some(Token::Dot) {
            // Member access: only `object.field` with a struct-typed object resolves.
            let object = (i >= 2 && walk.token(i - 2) == Some(Token::Ident))
                .then(|| self.text(file, &walk.span(i - 2)).to_string());
            let field = object
                .and_then(|o| self.lookup(&o, walk.function()))
                .and_then(|d| self.decls[d].type_name.clone())
                .and_then(|t| self.struct_named(&t))
                .and_then(|s| self.fields.get(&(s, word.to_string())).copied());
            if let Some(field) = field {
                self.reference(file, span, field);
            }
            return;
        }

        if builtins::is_reserved(word) || !builtins::functions_named(word).is_empty() {
            return;
        }
        match self.lookup(word, walk.function()) {
            Some(decl) => self.reference(file, span, decl),
            None => self.error(file, &span, format!("undefined symbol {}", quoted(word))),
        }
    }

    fn finish(self) -> Program {
        let mut referenced = vec![false; self.decls.len()];
        for occurrence in self.occurrences.iter().filter(|o| !o.is_declaration) {
            let decl = &self.decls[occurrence.decl];
            referenced[decl.canonical.unwrap_or(occurrence.decl)] = true;
        }

        let unused = self
            .decls
            .iter()
            .enumerate()
            .filter(|(id, d)| {
                d.file == 0
                    && d.canonical.is_none()
                    && !referenced[*id]
                    && d.name != "main"
                    && matches!(
                        d.kind,
                        DeclKind::Struct | DeclKind::Function | DeclKind::Variable
                    )
            })
            .map(|(_, d)| UnusedSymbol {
                name: d.name.clone(),
                range: self.files[d.file].range(&d.span),
            })
            .collect();

        Program {
            files: self.files,
            decls: self.decls,
            occurrences: self.occurrences,
            bodies: self.bodies,
            diagnostics: self.diagnostics,
            unused,
        }
    }
}
