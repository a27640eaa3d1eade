//! The declaration parser.
//!
//! A recursive-descent parser over the scanner's token stream. Errors are
//! fatal for the compilation unit: the parser makes no recovery attempt and
//! returns the first problem it hits, with its source span.
//!
//! Method bodies, constructor bodies, initialiser blocks, enum-constant
//! argument lists and bodies are all skipped by brace/paren balancing.
//! Field initialisers are collected token-by-token and handed to the
//! constant-expression sub-parser; pieces that do not parse as constants are
//! quietly dropped (they are ordinary run-time initialisers, which headers
//! do not carry).

use crate::ast::*;
use crate::expr;
use javelin_common::{DiagnosticKind, Span};
use javelin_scanner::{Preprocessed, ScanError, Scanner, Tok, TokenKind, TokenValue};
use tracing::trace;

#[derive(Clone, Debug, PartialEq)]
pub struct ParseError {
    pub span: Span,
    pub kind: DiagnosticKind,
}

impl ParseError {
    pub fn new(span: Span, kind: DiagnosticKind) -> Self {
        ParseError { span, kind }
    }
}

impl From<ScanError> for ParseError {
    fn from(err: ScanError) -> Self {
        ParseError {
            span: err.span,
            kind: err.kind,
        }
    }
}

/// Parse one compilation unit.
pub fn parse_compilation_unit(file: &str, source: &str) -> Result<CompilationUnit, ParseError> {
    let pre = Preprocessed::new(source);
    let mut parser = Parser::new(file, &pre);
    parser.compilation_unit()
}

pub struct Parser<'src> {
    scanner: Scanner<'src>,
    file: String,
    tokens: Vec<Tok>,
    /// Javadoc captured immediately before the token at the same index.
    docs: Vec<Option<String>>,
    idx: usize,
    eof_seen: bool,
}

impl<'src> Parser<'src> {
    pub fn new(file: &str, pre: &'src Preprocessed) -> Self {
        Parser {
            scanner: Scanner::new(pre),
            file: file.to_string(),
            tokens: Vec::new(),
            docs: Vec::new(),
            idx: 0,
            eof_seen: false,
        }
    }

    // -----------------------------------------------------------------
    // Token plumbing
    // -----------------------------------------------------------------

    fn fill(&mut self, upto: usize) -> Result<(), ParseError> {
        while self.tokens.len() <= upto && !self.eof_seen {
            let tok = self.scanner.next()?;
            if tok.kind == TokenKind::Eof {
                self.eof_seen = true;
            }
            self.docs.push(self.scanner.take_javadoc());
            self.tokens.push(tok);
        }
        Ok(())
    }

    fn cur(&mut self) -> Result<&Tok, ParseError> {
        self.fill(self.idx)?;
        let idx = self.idx.min(self.tokens.len() - 1);
        Ok(&self.tokens[idx])
    }

    fn kind(&mut self) -> Result<TokenKind, ParseError> {
        Ok(self.cur()?.kind)
    }

    fn peek_kind(&mut self, ahead: usize) -> Result<TokenKind, ParseError> {
        self.fill(self.idx + ahead)?;
        let idx = (self.idx + ahead).min(self.tokens.len() - 1);
        Ok(self.tokens[idx].kind)
    }

    fn span(&mut self) -> Result<Span, ParseError> {
        Ok(self.cur()?.span)
    }

    fn advance(&mut self) -> Result<Tok, ParseError> {
        let tok = self.cur()?.clone();
        if tok.kind != TokenKind::Eof {
            self.idx += 1;
        }
        Ok(tok)
    }

    fn eat(&mut self, kind: TokenKind) -> Result<bool, ParseError> {
        if self.kind()? == kind {
            self.advance()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Tok, ParseError> {
        if self.kind()? == kind {
            self.advance()
        } else {
            let span = self.span()?;
            Err(ParseError::new(
                span,
                DiagnosticKind::ExpectedToken(kind.describe().to_string()),
            ))
        }
    }

    fn ident(&mut self) -> Result<Ident, ParseError> {
        let tok = self.cur()?.clone();
        match (&tok.kind, &tok.value) {
            (TokenKind::Ident, TokenValue::Ident(name)) => {
                let name = name.clone();
                self.advance()?;
                Ok(Ident::new(name, tok.span))
            }
            _ => Err(ParseError::new(
                tok.span,
                DiagnosticKind::ExpectedToken("identifier".to_string()),
            )),
        }
    }

    /// Does the current token equal the contextual keyword `text`?
    fn at_ident(&mut self, text: &str) -> Result<bool, ParseError> {
        let tok = self.cur()?;
        Ok(tok.kind == TokenKind::Ident && tok.value.ident() == Some(text))
    }

    /// `non-sealed`, lexed as `non` `-` `sealed` with no space in between.
    fn at_non_sealed(&mut self) -> Result<bool, ParseError> {
        if !self.at_ident("non")? {
            return Ok(false);
        }
        let non_end = self.cur()?.span.end;
        self.fill(self.idx + 2)?;
        let Some(minus) = self.tokens.get(self.idx + 1) else {
            return Ok(false);
        };
        if minus.kind != TokenKind::Minus || minus.span.start != non_end {
            return Ok(false);
        }
        let Some(sealed) = self.tokens.get(self.idx + 2) else {
            return Ok(false);
        };
        Ok(sealed.kind == TokenKind::Ident
            && sealed.value.ident() == Some("sealed")
            && sealed.span.start == minus.span.end)
    }

    /// The javadoc attached to the current token, if any.
    fn take_doc(&mut self) -> Result<Option<String>, ParseError> {
        self.fill(self.idx)?;
        let idx = self.idx.min(self.docs.len() - 1);
        Ok(self.docs[idx].take())
    }

    /// Consume a `>` even when it is the first character of a composite
    /// operator token, by rewriting the current token in place.
    fn eat_gt(&mut self) -> Result<(), ParseError> {
        self.fill(self.idx)?;
        let idx = self.idx.min(self.tokens.len() - 1);
        let rest = match self.tokens[idx].kind {
            TokenKind::Gt => {
                self.advance()?;
                return Ok(());
            }
            TokenKind::Shr => TokenKind::Gt,
            TokenKind::Ushr => TokenKind::Shr,
            TokenKind::Ge => TokenKind::Assign,
            TokenKind::ShrEq => TokenKind::Ge,
            TokenKind::UshrEq => TokenKind::ShrEq,
            _ => {
                let span = self.tokens[idx].span;
                return Err(ParseError::new(
                    span,
                    DiagnosticKind::ExpectedToken("'>'".to_string()),
                ));
            }
        };
        let tok = &mut self.tokens[idx];
        tok.kind = rest;
        tok.span.start += 1;
        Ok(())
    }

    // -----------------------------------------------------------------
    // Compilation unit
    // -----------------------------------------------------------------

    pub fn compilation_unit(&mut self) -> Result<CompilationUnit, ParseError> {
        let mut unit = CompilationUnit {
            file: self.file.clone(),
            package: None,
            imports: Vec::new(),
            types: Vec::new(),
            module: None,
        };
        // Leading annotations may belong to the package declaration, a
        // module declaration, or the first type declaration.
        let mut pending_doc = self.take_doc()?;
        let mut leading_annos = self.annotations()?;
        if self.kind()? == TokenKind::Package {
            let start = self.span()?;
            self.advance()?;
            let name = self.qualified_name()?;
            let end = self.expect(TokenKind::Semi)?.span;
            unit.package = Some(PackageDecl {
                annotations: std::mem::take(&mut leading_annos),
                name,
                span: start.merge(end),
            });
            pending_doc = None;
        }
        while self.kind()? == TokenKind::Import {
            unit.imports.push(self.import_decl()?);
        }
        loop {
            match self.kind()? {
                TokenKind::Eof => break,
                TokenKind::Semi => {
                    self.advance()?;
                }
                _ => {
                    if leading_annos.is_empty() {
                        if pending_doc.is_none() {
                            pending_doc = self.take_doc()?;
                        }
                        leading_annos = self.annotations()?;
                    }
                    if (self.at_ident("module")? || self.at_ident("open")?)
                        && unit.types.is_empty()
                        && unit.module.is_none()
                    {
                        unit.module =
                            Some(self.module_decl(std::mem::take(&mut leading_annos))?);
                        continue;
                    }
                    let (annos, mods) =
                        self.modifiers_and_annotations(std::mem::take(&mut leading_annos))?;
                    let decl = self.type_decl(pending_doc.take(), annos, mods)?;
                    trace!(name = %decl.name.name, "parsed top-level declaration");
                    unit.types.push(decl);
                }
            }
        }
        Ok(unit)
    }

    fn import_decl(&mut self) -> Result<ImportDecl, ParseError> {
        let start = self.expect(TokenKind::Import)?.span;
        let is_static = self.eat(TokenKind::Static)?;
        let mut name = vec![self.ident()?];
        let mut on_demand = false;
        while self.eat(TokenKind::Dot)? {
            if self.eat(TokenKind::Star)? {
                on_demand = true;
                break;
            }
            name.push(self.ident()?);
        }
        let end = self.expect(TokenKind::Semi)?.span;
        Ok(ImportDecl {
            is_static,
            on_demand,
            name,
            span: start.merge(end),
        })
    }

    fn qualified_name(&mut self) -> Result<QualIdent, ParseError> {
        let mut name = vec![self.ident()?];
        while self.kind()? == TokenKind::Dot && self.peek_kind(1)? == TokenKind::Ident {
            self.advance()?;
            name.push(self.ident()?);
        }
        Ok(name)
    }

    // -----------------------------------------------------------------
    // Modules
    // -----------------------------------------------------------------

    fn module_decl(&mut self, annotations: Vec<Anno>) -> Result<ModuleDecl, ParseError> {
        let start = self.span()?;
        let open = if self.at_ident("open")? {
            self.advance()?;
            true
        } else {
            false
        };
        if !self.at_ident("module")? {
            let span = self.span()?;
            return Err(ParseError::new(
                span,
                DiagnosticKind::ExpectedToken("'module'".to_string()),
            ));
        }
        self.advance()?;
        let name = self.qualified_name()?;
        self.expect(TokenKind::LBrace)?;
        let mut directives = Vec::new();
        while self.kind()? != TokenKind::RBrace {
            directives.push(self.module_directive()?);
        }
        let end = self.expect(TokenKind::RBrace)?.span;
        Ok(ModuleDecl {
            open,
            name,
            directives,
            annotations,
            span: start.merge(end),
        })
    }

    fn module_directive(&mut self) -> Result<ModuleDirective, ParseError> {
        if self.at_ident("requires")? {
            self.advance()?;
            let mut transitive = false;
            let mut is_static = false;
            loop {
                if self.at_ident("transitive")? && self.peek_kind(1)? != TokenKind::Semi {
                    self.advance()?;
                    transitive = true;
                } else if self.kind()? == TokenKind::Static {
                    self.advance()?;
                    is_static = true;
                } else {
                    break;
                }
            }
            let module = self.qualified_name()?;
            self.expect(TokenKind::Semi)?;
            return Ok(ModuleDirective::Requires {
                transitive,
                is_static,
                module,
            });
        }
        if self.at_ident("exports")? || self.at_ident("opens")? {
            let is_exports = self.at_ident("exports")?;
            self.advance()?;
            let package = self.qualified_name()?;
            let mut to = Vec::new();
            if self.at_ident("to")? {
                self.advance()?;
                to.push(self.qualified_name()?);
                while self.eat(TokenKind::Comma)? {
                    to.push(self.qualified_name()?);
                }
            }
            self.expect(TokenKind::Semi)?;
            return Ok(if is_exports {
                ModuleDirective::Exports { package, to }
            } else {
                ModuleDirective::Opens { package, to }
            });
        }
        if self.at_ident("uses")? {
            self.advance()?;
            let service = self.qualified_name()?;
            self.expect(TokenKind::Semi)?;
            return Ok(ModuleDirective::Uses { service });
        }
        if self.at_ident("provides")? {
            self.advance()?;
            let service = self.qualified_name()?;
            if !self.at_ident("with")? {
                let span = self.span()?;
                return Err(ParseError::new(
                    span,
                    DiagnosticKind::ExpectedToken("'with'".to_string()),
                ));
            }
            self.advance()?;
            let mut with = vec![self.qualified_name()?];
            while self.eat(TokenKind::Comma)? {
                with.push(self.qualified_name()?);
            }
            self.expect(TokenKind::Semi)?;
            return Ok(ModuleDirective::Provides { service, with });
        }
        let tok = self.cur()?.clone();
        let name = tok.value.ident().unwrap_or("").to_string();
        Err(ParseError::new(
            tok.span,
            DiagnosticKind::UnexpectedIdentifier(name),
        ))
    }

    // -----------------------------------------------------------------
    // Annotations and modifiers
    // -----------------------------------------------------------------

    /// Zero or more annotation uses. Stops before `@interface`.
    fn annotations(&mut self) -> Result<Vec<Anno>, ParseError> {
        let mut annos = Vec::new();
        while self.kind()? == TokenKind::At && self.peek_kind(1)? != TokenKind::Interface {
            annos.push(self.annotation()?);
        }
        Ok(annos)
    }

    fn annotation(&mut self) -> Result<Anno, ParseError> {
        let start = self.expect(TokenKind::At)?.span;
        let name = self.qualified_name()?;
        let mut args = Vec::new();
        let mut end = name.last().map(|id| id.span).unwrap_or(start);
        if self.kind()? == TokenKind::LParen {
            self.advance()?;
            if self.kind()? != TokenKind::RParen {
                // Named pairs (`k = v, ...`) or the single-`value` shorthand.
                let named = self.kind()? == TokenKind::Ident
                    && self.peek_kind(1)? == TokenKind::Assign;
                if named {
                    loop {
                        let key = self.ident()?;
                        self.expect(TokenKind::Assign)?;
                        let value = self.element_value()?;
                        args.push((Some(key), value));
                        if !self.eat(TokenKind::Comma)? {
                            break;
                        }
                    }
                } else {
                    let value = self.element_value()?;
                    args.push((None, value));
                }
            }
            end = self.expect(TokenKind::RParen)?.span;
        }
        Ok(Anno {
            name,
            args,
            span: start.merge(end),
        })
    }

    /// One annotation element value: a constant expression, a nested
    /// annotation, or an array initialiser. Collected by balancing and fed
    /// to the constant-expression sub-parser; failures are real errors here,
    /// unlike field initialisers.
    fn element_value(&mut self) -> Result<Expr, ParseError> {
        if self.kind()? == TokenKind::At {
            return Ok(Expr::Annotation(self.annotation()?));
        }
        let toks = self.collect_balanced_until(&[TokenKind::Comma, TokenKind::RParen])?;
        let span = toks
            .first()
            .map(|t| t.span)
            .unwrap_or(Span::synthetic());
        expr::parse_const_expr(&toks)
            .map_err(|_| ParseError::new(span, DiagnosticKind::InvalidAnnotationArgument))
    }

    /// Collect tokens up to (not including) any of `stops` at bracket depth
    /// zero. Consumes the collected tokens but not the stop token.
    fn collect_balanced_until(&mut self, stops: &[TokenKind]) -> Result<Vec<Tok>, ParseError> {
        let mut out = Vec::new();
        let mut depth = 0usize;
        loop {
            let kind = self.kind()?;
            if kind == TokenKind::Eof {
                let span = self.span()?;
                return Err(ParseError::new(span, DiagnosticKind::UnterminatedExpression));
            }
            if depth == 0 && stops.contains(&kind) {
                return Ok(out);
            }
            match kind {
                TokenKind::LParen | TokenKind::LBracket | TokenKind::LBrace => depth += 1,
                TokenKind::RParen | TokenKind::RBracket | TokenKind::RBrace => {
                    if depth == 0 {
                        let span = self.span()?;
                        return Err(ParseError::new(
                            span,
                            DiagnosticKind::UnterminatedExpression,
                        ));
                    }
                    depth -= 1;
                }
                _ => {}
            }
            out.push(self.advance()?);
        }
    }

    /// Parse declaration modifiers and interleaved annotations
    /// (`public @A static int x` is legal). Contextual keywords (`sealed`,
    /// `non-sealed`) are recognised only when another modifier or a type
    /// declaration keyword follows, so they stay usable as type names.
    ///
    /// The returned annotations are position-ambiguous: whether each is a
    /// declaration annotation, a type annotation, or both is decided by its
    /// `@Target` during binding.
    fn modifiers_and_annotations(
        &mut self,
        mut annos: Vec<Anno>,
    ) -> Result<(Vec<Anno>, Mods), ParseError> {
        let mut mods = Mods::empty();
        loop {
            if self.kind()? == TokenKind::At && self.peek_kind(1)? != TokenKind::Interface {
                annos.push(self.annotation()?);
                continue;
            }
            let flag = match self.kind()? {
                TokenKind::Public => Mods::PUBLIC,
                TokenKind::Protected => Mods::PROTECTED,
                TokenKind::Private => Mods::PRIVATE,
                TokenKind::Static => Mods::STATIC,
                TokenKind::Abstract => Mods::ABSTRACT,
                TokenKind::Final => Mods::FINAL,
                TokenKind::Native => Mods::NATIVE,
                TokenKind::Synchronized => Mods::SYNCHRONIZED,
                TokenKind::Transient => Mods::TRANSIENT,
                TokenKind::Volatile => Mods::VOLATILE,
                TokenKind::Strictfp => Mods::STRICTFP,
                TokenKind::Default => Mods::DEFAULT,
                TokenKind::Ident => {
                    if self.at_ident("sealed")? && self.sealed_context(1)? {
                        self.advance()?;
                        mods |= Mods::SEALED;
                        continue;
                    }
                    if self.at_non_sealed()? && self.sealed_context(3)? {
                        self.advance()?;
                        self.advance()?;
                        self.advance()?;
                        mods |= Mods::NON_SEALED;
                        continue;
                    }
                    return Ok((annos, mods));
                }
                _ => return Ok((annos, mods)),
            };
            self.advance()?;
            mods |= flag;
        }
    }

    /// Is the token `ahead` positions away something that can follow a
    /// `sealed`/`non-sealed` modifier?
    fn sealed_context(&mut self, ahead: usize) -> Result<bool, ParseError> {
        Ok(match self.peek_kind(ahead)? {
            TokenKind::Class
            | TokenKind::Interface
            | TokenKind::Enum
            | TokenKind::At
            | TokenKind::Public
            | TokenKind::Protected
            | TokenKind::Private
            | TokenKind::Static
            | TokenKind::Abstract
            | TokenKind::Final
            | TokenKind::Strictfp => true,
            TokenKind::Ident => {
                // Only `record` here: treating a following `sealed` as
                // confirmation would misparse a field of type `sealed`.
                self.fill(self.idx + ahead)?;
                let tok = &self.tokens[(self.idx + ahead).min(self.tokens.len() - 1)];
                tok.value.ident() == Some("record")
            }
            _ => false,
        })
    }

    /// A formal parameter or record component.
    fn param(&mut self) -> Result<Param, ParseError> {
        let (annotations, mods) = self.modifiers_and_annotations(Vec::new())?;
        let ty = self.ty()?;
        let varargs = self.eat(TokenKind::Ellipsis)?;
        let name = self.ident()?;
        let extra = self.extra_dims()?;
        let ty = apply_extra_dims(ty, extra);
        let span = name.span;
        Ok(Param {
            annotations,
            mods,
            ty,
            name,
            varargs,
            span,
        })
    }

    // -----------------------------------------------------------------
    // Type declarations
    // -----------------------------------------------------------------

    fn type_decl(
        &mut self,
        javadoc: Option<String>,
        annotations: Vec<Anno>,
        mods: Mods,
    ) -> Result<TypeDecl, ParseError> {
        match self.kind()? {
            TokenKind::Class => {
                self.advance()?;
                self.class_rest(javadoc, annotations, mods, TypeKind::Class)
            }
            TokenKind::Interface => {
                self.advance()?;
                self.class_rest(javadoc, annotations, mods, TypeKind::Interface)
            }
            TokenKind::Enum => {
                self.advance()?;
                self.class_rest(javadoc, annotations, mods, TypeKind::Enum)
            }
            TokenKind::At => {
                self.advance()?;
                self.expect(TokenKind::Interface)?;
                self.class_rest(javadoc, annotations, mods, TypeKind::Annotation)
            }
            TokenKind::Ident if self.at_ident("record")? => {
                self.advance()?;
                self.class_rest(javadoc, annotations, mods, TypeKind::Record)
            }
            _ => {
                let tok = self.cur()?.clone();
                Err(ParseError::new(
                    tok.span,
                    DiagnosticKind::UnexpectedToken(tok.kind.describe().to_string()),
                ))
            }
        }
    }

    fn class_rest(
        &mut self,
        javadoc: Option<String>,
        annotations: Vec<Anno>,
        mods: Mods,
        kind: TypeKind,
    ) -> Result<TypeDecl, ParseError> {
        let name = self.ident()?;
        let start = name.span;
        let type_params = if self.kind()? == TokenKind::Lt {
            self.type_params()?
        } else {
            Vec::new()
        };
        let components = if kind == TypeKind::Record {
            self.record_header()?
        } else {
            Vec::new()
        };

        let mut superclass = None;
        let mut interfaces = Vec::new();
        let mut permits = Vec::new();
        let mut seen_implements = false;
        loop {
            if self.eat(TokenKind::Extends)? {
                if seen_implements {
                    let span = self.span()?;
                    return Err(ParseError::new(span, DiagnosticKind::ExtendsAfterImplements));
                }
                if kind == TypeKind::Interface {
                    interfaces.push(self.ty()?);
                    while self.eat(TokenKind::Comma)? {
                        interfaces.push(self.ty()?);
                    }
                } else {
                    superclass = Some(self.ty()?);
                }
            } else if self.eat(TokenKind::Implements)? {
                seen_implements = true;
                interfaces.push(self.ty()?);
                while self.eat(TokenKind::Comma)? {
                    interfaces.push(self.ty()?);
                }
            } else if self.at_ident("permits")? {
                self.advance()?;
                permits.push(self.ty()?);
                while self.eat(TokenKind::Comma)? {
                    permits.push(self.ty()?);
                }
            } else {
                break;
            }
        }

        self.expect(TokenKind::LBrace)?;
        let mut constants = Vec::new();
        if kind == TypeKind::Enum {
            constants = self.enum_constants()?;
        }
        let mut members = Vec::new();
        while self.kind()? != TokenKind::RBrace {
            if self.eat(TokenKind::Semi)? {
                continue;
            }
            self.member(&name.name, &mut members)?;
        }
        let end = self.expect(TokenKind::RBrace)?.span;
        Ok(TypeDecl {
            javadoc,
            annotations,
            mods,
            kind,
            name,
            type_params,
            superclass,
            interfaces,
            permits,
            components,
            constants,
            members,
            span: start.merge(end),
        })
    }

    fn type_params(&mut self) -> Result<Vec<TypeParam>, ParseError> {
        self.expect(TokenKind::Lt)?;
        let mut params = Vec::new();
        loop {
            let annotations = self.annotations()?;
            let name = self.ident()?;
            let mut bounds = Vec::new();
            if self.eat(TokenKind::Extends)? {
                bounds.push(self.ty()?);
                while self.eat(TokenKind::Amp)? {
                    bounds.push(self.ty()?);
                }
            }
            params.push(TypeParam {
                annotations,
                name,
                bounds,
            });
            if !self.eat(TokenKind::Comma)? {
                break;
            }
        }
        self.eat_gt()?;
        Ok(params)
    }

    fn record_header(&mut self) -> Result<Vec<Param>, ParseError> {
        self.expect(TokenKind::LParen)?;
        let mut components = Vec::new();
        if self.kind()? != TokenKind::RParen {
            loop {
                components.push(self.param()?);
                if !self.eat(TokenKind::Comma)? {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen)?;
        Ok(components)
    }

    fn enum_constants(&mut self) -> Result<Vec<EnumConstant>, ParseError> {
        let mut constants = Vec::new();
        loop {
            match self.kind()? {
                TokenKind::Semi => {
                    self.advance()?;
                    break;
                }
                TokenKind::RBrace => break,
                _ => {}
            }
            let javadoc = self.take_doc()?;
            let annotations = self.annotations()?;
            let name = self.ident()?;
            let mut has_args = false;
            let mut has_body = false;
            if self.kind()? == TokenKind::LParen {
                has_args = true;
                self.skip_balanced(TokenKind::LParen, TokenKind::RParen)?;
            }
            if self.kind()? == TokenKind::LBrace {
                has_body = true;
                self.skip_balanced(TokenKind::LBrace, TokenKind::RBrace)?;
            }
            constants.push(EnumConstant {
                javadoc,
                annotations,
                name,
                has_args,
                has_body,
            });
            if !self.eat(TokenKind::Comma)? {
                if self.eat(TokenKind::Semi)? {
                    break;
                }
                // `}` ends the constant list without a trailing separator.
                if self.kind()? == TokenKind::RBrace {
                    break;
                }
                let span = self.span()?;
                return Err(ParseError::new(
                    span,
                    DiagnosticKind::ExpectedToken("',' or ';'".to_string()),
                ));
            }
        }
        Ok(constants)
    }

    /// Consume a balanced `open ... close` region, including the brackets.
    fn skip_balanced(&mut self, open: TokenKind, close: TokenKind) -> Result<(), ParseError> {
        self.expect(open)?;
        let mut depth = 1usize;
        loop {
            let kind = self.kind()?;
            if kind == TokenKind::Eof {
                let span = self.span()?;
                return Err(ParseError::new(span, DiagnosticKind::UnexpectedEof));
            }
            if kind == open {
                depth += 1;
            } else if kind == close {
                depth -= 1;
                if depth == 0 {
                    self.advance()?;
                    return Ok(());
                }
            }
            self.advance()?;
        }
    }

    // -----------------------------------------------------------------
    // Members
    // -----------------------------------------------------------------

    fn member(&mut self, class_name: &str, out: &mut Vec<Member>) -> Result<(), ParseError> {
        let javadoc = self.take_doc()?;
        let (annotations, mods) = self.modifiers_and_annotations(Vec::new())?;

        match self.kind()? {
            // Initialiser blocks carry no header information.
            TokenKind::LBrace => {
                self.skip_balanced(TokenKind::LBrace, TokenKind::RBrace)?;
                return Ok(());
            }
            TokenKind::Class | TokenKind::Interface | TokenKind::Enum => {
                out.push(Member::Type(self.type_decl(javadoc, annotations, mods)?));
                return Ok(());
            }
            TokenKind::At if self.peek_kind(1)? == TokenKind::Interface => {
                out.push(Member::Type(self.type_decl(javadoc, annotations, mods)?));
                return Ok(());
            }
            TokenKind::Ident
                if self.at_ident("record")?
                    && self.peek_kind(1)? == TokenKind::Ident
                    && matches!(self.peek_kind(2)?, TokenKind::LParen | TokenKind::Lt) =>
            {
                out.push(Member::Type(self.type_decl(javadoc, annotations, mods)?));
                return Ok(());
            }
            _ => {}
        }

        // Generic method.
        let type_params = if self.kind()? == TokenKind::Lt {
            self.type_params()?
        } else {
            Vec::new()
        };

        // Constructor (including a record compact constructor).
        if self.kind()? == TokenKind::Ident && self.at_ident(class_name)? {
            match self.peek_kind(1)? {
                TokenKind::LParen => {
                    let name = self.ident()?;
                    out.push(self.method_rest(javadoc, annotations, mods, type_params, None, name)?);
                    return Ok(());
                }
                TokenKind::LBrace => {
                    // Compact constructor: the canonical signature comes from
                    // the record header, the body is dropped.
                    self.advance()?;
                    self.skip_balanced(TokenKind::LBrace, TokenKind::RBrace)?;
                    return Ok(());
                }
                _ => {}
            }
        }

        let ty = self.ty_or_void()?;
        if !type_params.is_empty() && self.kind()? != TokenKind::Ident {
            let span = self.span()?;
            return Err(ParseError::new(span, DiagnosticKind::UnexpectedTypeParameter));
        }
        let name = self.ident()?;
        if self.kind()? == TokenKind::LParen {
            out.push(self.method_rest(javadoc, annotations, mods, type_params, Some(ty), name)?);
        } else {
            self.field_rest(javadoc, annotations, mods, ty, name, out)?;
        }
        Ok(())
    }

    fn method_rest(
        &mut self,
        javadoc: Option<String>,
        annotations: Vec<Anno>,
        mods: Mods,
        type_params: Vec<TypeParam>,
        return_ty: Option<Ty>,
        name: Ident,
    ) -> Result<Member, ParseError> {
        let start = name.span;
        self.expect(TokenKind::LParen)?;
        let mut receiver = None;
        let mut params = Vec::new();
        if self.kind()? != TokenKind::RParen {
            loop {
                let (p_annos, p_mods) = self.modifiers_and_annotations(Vec::new())?;
                let p_ty = self.ty()?;
                if self.kind()? == TokenKind::This
                    || (self.kind()? == TokenKind::Dot && self.peek_kind(1)? == TokenKind::This)
                {
                    // Receiver parameter (`Foo this` or `Outer.this`); only
                    // its type annotations matter.
                    if self.kind()? == TokenKind::Dot {
                        self.advance()?;
                    }
                    self.advance()?;
                    receiver = Some(with_annotations(p_ty, p_annos));
                } else {
                    let varargs = self.eat(TokenKind::Ellipsis)?;
                    let p_name = self.ident()?;
                    let extra = self.extra_dims()?;
                    let p_ty = apply_extra_dims(p_ty, extra);
                    let span = p_name.span;
                    params.push(Param {
                        annotations: p_annos,
                        mods: p_mods,
                        ty: p_ty,
                        name: p_name,
                        varargs,
                        span,
                    });
                }
                if !self.eat(TokenKind::Comma)? {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen)?;
        let extra_dims = self.extra_dims()?;
        let mut throws = Vec::new();
        if self.eat(TokenKind::Throws)? {
            throws.push(self.ty()?);
            while self.eat(TokenKind::Comma)? {
                throws.push(self.ty()?);
            }
        }
        let mut default_value = None;
        let end;
        match self.kind()? {
            TokenKind::LBrace => {
                end = self.span()?;
                self.skip_balanced(TokenKind::LBrace, TokenKind::RBrace)?;
            }
            TokenKind::Default => {
                self.advance()?;
                default_value = Some(self.element_value_for_default()?);
                end = self.expect(TokenKind::Semi)?.span;
            }
            _ => {
                end = self.expect(TokenKind::Semi)?.span;
            }
        }
        Ok(Member::Method(MethodDecl {
            javadoc,
            annotations,
            mods,
            type_params,
            return_ty,
            name,
            receiver,
            params,
            extra_dims,
            throws,
            default_value,
            span: start.merge(end),
        }))
    }

    /// An annotation-element default value, terminated by `;`.
    fn element_value_for_default(&mut self) -> Result<Expr, ParseError> {
        if self.kind()? == TokenKind::At {
            return Ok(Expr::Annotation(self.annotation()?));
        }
        let toks = self.collect_balanced_until(&[TokenKind::Semi])?;
        let span = toks.first().map(|t| t.span).unwrap_or(Span::synthetic());
        expr::parse_const_expr(&toks)
            .map_err(|_| ParseError::new(span, DiagnosticKind::InvalidAnnotationArgument))
    }

    /// Parse the declarator list of a field declaration. Multi-variable
    /// declarations produce one `FieldDecl` per declarator; every
    /// declarator's initialiser region is split off at top-level commas and
    /// fed to the constant-expression sub-parser.
    fn field_rest(
        &mut self,
        javadoc: Option<String>,
        annotations: Vec<Anno>,
        mods: Mods,
        ty: Ty,
        first_name: Ident,
        out: &mut Vec<Member>,
    ) -> Result<(), ParseError> {
        let extra = self.extra_dims()?;
        let init = self.field_initializer()?;
        let span = first_name.span;
        out.push(Member::Field(FieldDecl {
            javadoc,
            annotations: annotations.clone(),
            mods,
            ty: ty.clone(),
            name: first_name,
            extra_dims: extra,
            init,
            span,
        }));
        while self.eat(TokenKind::Comma)? {
            let name = self.ident()?;
            let extra = self.extra_dims()?;
            let init = self.field_initializer()?;
            let span = name.span;
            out.push(Member::Field(FieldDecl {
                javadoc: None,
                annotations: annotations.clone(),
                mods,
                ty: ty.clone(),
                name,
                extra_dims: extra,
                init,
                span,
            }));
        }
        self.expect(TokenKind::Semi)?;
        Ok(())
    }

    /// `= <tokens>` up to a top-level `,` or `;`. Pieces that fail the
    /// constant-expression sub-parser are dropped: they are run-time
    /// initialisers.
    fn field_initializer(&mut self) -> Result<Option<Expr>, ParseError> {
        if !self.eat(TokenKind::Assign)? {
            return Ok(None);
        }
        let toks = self.collect_balanced_until(&[TokenKind::Comma, TokenKind::Semi])?;
        Ok(expr::parse_const_expr(&toks).ok())
    }

    /// C-style declarator dimensions with their type annotations.
    fn extra_dims(&mut self) -> Result<Vec<Vec<Anno>>, ParseError> {
        let mut dims = Vec::new();
        loop {
            let mark = self.idx;
            let annos = self.annotations()?;
            if self.kind()? == TokenKind::LBracket && self.peek_kind(1)? == TokenKind::RBracket {
                self.advance()?;
                self.advance()?;
                dims.push(annos);
            } else {
                self.idx = mark;
                break;
            }
        }
        Ok(dims)
    }

    // -----------------------------------------------------------------
    // Types
    // -----------------------------------------------------------------

    fn ty_or_void(&mut self) -> Result<Ty, ParseError> {
        if self.kind()? == TokenKind::Void {
            let span = self.advance()?.span;
            return Ok(Ty::Void { span });
        }
        self.ty()
    }

    /// A type as written: annotations, base, optional array dimensions.
    pub fn ty(&mut self) -> Result<Ty, ParseError> {
        let annotations = self.annotations()?;
        let base = match self.kind()? {
            TokenKind::Question => {
                let start = self.advance()?.span;
                let bound = if self.eat(TokenKind::Extends)? {
                    WildBound::Extends(Box::new(self.ty()?))
                } else if self.eat(TokenKind::Super)? {
                    WildBound::Super(Box::new(self.ty()?))
                } else {
                    WildBound::None
                };
                return Ok(Ty::Wildcard {
                    bound,
                    annotations,
                    span: start,
                });
            }
            kind if kind.is_primitive() => {
                let tok = self.advance()?;
                let prim = prim_kind(kind);
                let base = Ty::Primitive {
                    kind: prim,
                    annotations,
                    span: tok.span,
                };
                return self.array_dims(base);
            }
            _ => {
                let mut segments = Vec::new();
                let first = self.ident()?;
                let start = first.span;
                let mut end = first.span;
                segments.push(TySeg {
                    name: first,
                    args: self.opt_type_args()?,
                    annotations,
                });
                while self.kind()? == TokenKind::Dot
                    && matches!(self.peek_kind(1)?, TokenKind::Ident | TokenKind::At)
                {
                    self.advance()?;
                    let seg_annos = self.annotations()?;
                    let name = self.ident()?;
                    end = name.span;
                    segments.push(TySeg {
                        name,
                        args: self.opt_type_args()?,
                        annotations: seg_annos,
                    });
                }
                Ty::Named {
                    segments,
                    span: start.merge(end),
                }
            }
        };
        self.array_dims(base)
    }

    fn opt_type_args(&mut self) -> Result<Vec<Ty>, ParseError> {
        if self.kind()? != TokenKind::Lt {
            return Ok(Vec::new());
        }
        self.advance()?;
        let mut args = Vec::new();
        if self.kind()? != TokenKind::Gt {
            loop {
                args.push(self.ty()?);
                if !self.eat(TokenKind::Comma)? {
                    break;
                }
            }
        }
        self.eat_gt()?;
        Ok(args)
    }

    fn array_dims(&mut self, base: Ty) -> Result<Ty, ParseError> {
        let mut dims: Vec<Vec<Anno>> = Vec::new();
        loop {
            let mark = self.idx;
            let annos = self.annotations()?;
            if self.kind()? == TokenKind::LBracket && self.peek_kind(1)? == TokenKind::RBracket {
                self.advance()?;
                self.advance()?;
                dims.push(annos);
            } else {
                self.idx = mark;
                break;
            }
        }
        Ok(apply_extra_dims(base, dims))
    }
}

/// Wrap `base` in array types, one per written dimension, outermost first.
pub(crate) fn apply_extra_dims(base: Ty, dims: Vec<Vec<Anno>>) -> Ty {
    let span = base.span();
    let mut ty = base;
    for annos in dims.into_iter().rev() {
        ty = Ty::Array {
            element: Box::new(ty),
            annotations: annos,
            span,
        };
    }
    ty
}

fn with_annotations(ty: Ty, mut annos: Vec<Anno>) -> Ty {
    match ty {
        Ty::Named { mut segments, span } => {
            if let Some(first) = segments.first_mut() {
                annos.append(&mut first.annotations);
                first.annotations = annos;
            }
            Ty::Named { segments, span }
        }
        other => other,
    }
}

fn prim_kind(kind: TokenKind) -> PrimKind {
    match kind {
        TokenKind::Boolean => PrimKind::Boolean,
        TokenKind::Byte => PrimKind::Byte,
        TokenKind::Short => PrimKind::Short,
        TokenKind::Int => PrimKind::Int,
        TokenKind::Long => PrimKind::Long,
        TokenKind::Char => PrimKind::Char,
        TokenKind::Float => PrimKind::Float,
        TokenKind::Double => PrimKind::Double,
        _ => unreachable!("not a primitive token"),
    }
}
