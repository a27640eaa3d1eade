//! The constant-expression sub-parser.
//!
//! An operator-precedence parser over a detached token slice. The main
//! parser collects the tokens of a field initialiser, annotation argument or
//! annotation-element default by bracket balancing and hands them here.
//! The whole slice must be consumed; trailing tokens mean the piece was not
//! a constant expression.

use crate::ast::*;
use crate::parser::ParseError;
use javelin_common::{DiagnosticKind, Span};
use javelin_scanner::{Tok, TokenKind, TokenValue};

/// Parse a complete constant expression from `toks`.
pub fn parse_const_expr(toks: &[Tok]) -> Result<Expr, ParseError> {
    let mut parser = ExprParser { toks, idx: 0 };
    let expr = parser.ternary()?;
    if parser.idx != toks.len() {
        return Err(ParseError::new(
            parser.span(),
            DiagnosticKind::UnterminatedExpression,
        ));
    }
    Ok(expr)
}

struct ExprParser<'t> {
    toks: &'t [Tok],
    idx: usize,
}

impl<'t> ExprParser<'t> {
    fn kind(&self) -> TokenKind {
        self.toks.get(self.idx).map_or(TokenKind::Eof, |t| t.kind)
    }

    fn peek_kind(&self, ahead: usize) -> TokenKind {
        self.toks
            .get(self.idx + ahead)
            .map_or(TokenKind::Eof, |t| t.kind)
    }

    fn span(&self) -> Span {
        self.toks
            .get(self.idx)
            .or(self.toks.last())
            .map_or(Span::synthetic(), |t| t.span)
    }

    fn cur(&self) -> Option<&'t Tok> {
        self.toks.get(self.idx)
    }

    fn advance(&mut self) -> Result<&'t Tok, ParseError> {
        let tok = self.toks.get(self.idx).ok_or_else(|| {
            ParseError::new(self.span(), DiagnosticKind::UnexpectedEof)
        })?;
        self.idx += 1;
        Ok(tok)
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.kind() == kind {
            self.idx += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind) -> Result<&'t Tok, ParseError> {
        if self.kind() == kind {
            self.advance()
        } else {
            Err(ParseError::new(
                self.span(),
                DiagnosticKind::ExpectedToken(kind.describe().to_string()),
            ))
        }
    }

    fn ident(&mut self) -> Result<Ident, ParseError> {
        let tok = self.advance()?;
        match (&tok.kind, &tok.value) {
            (TokenKind::Ident, TokenValue::Ident(name)) => Ok(Ident::new(name.clone(), tok.span)),
            _ => Err(ParseError::new(
                tok.span,
                DiagnosticKind::ExpectedToken("identifier".to_string()),
            )),
        }
    }

    // -----------------------------------------------------------------
    // Precedence levels
    // -----------------------------------------------------------------

    fn ternary(&mut self) -> Result<Expr, ParseError> {
        let cond = self.binary(0)?;
        if !self.eat(TokenKind::Question) {
            return Ok(cond);
        }
        let then = self.ternary()?;
        self.expect(TokenKind::Colon)?;
        let otherwise = self.ternary()?;
        let span = cond.span().merge(otherwise.span());
        Ok(Expr::Ternary {
            cond: Box::new(cond),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
            span,
        })
    }

    /// Left-associative binary operators, precedence-climbing from `level`.
    fn binary(&mut self, level: usize) -> Result<Expr, ParseError> {
        if level >= PRECEDENCE.len() {
            return self.unary();
        }
        let mut lhs = self.binary(level + 1)?;
        loop {
            let Some(op) = binop_at(self.kind(), level) else {
                return Ok(lhs);
            };
            self.idx += 1;
            let rhs = self.binary(level + 1)?;
            let span = lhs.span().merge(rhs.span());
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                span,
            };
        }
    }

    fn unary(&mut self) -> Result<Expr, ParseError> {
        let op = match self.kind() {
            TokenKind::Plus => Some(UnaryOp::Plus),
            TokenKind::Minus => Some(UnaryOp::Neg),
            TokenKind::Bang => Some(UnaryOp::Not),
            TokenKind::Tilde => Some(UnaryOp::BitNot),
            _ => None,
        };
        if let Some(op) = op {
            let start = self.span();
            self.idx += 1;
            let operand = self.unary()?;
            let span = start.merge(operand.span());
            return Ok(Expr::Unary {
                op,
                operand: Box::new(operand),
                span,
            });
        }
        if self.kind() == TokenKind::LParen {
            if let Some(cast) = self.try_cast()? {
                return Ok(cast);
            }
        }
        self.primary()
    }

    /// Casts: `(int) x`, `(java.lang.String) y`. Primitive casts are
    /// unambiguous; name casts are taken only when the closing paren is
    /// followed by something that can begin an operand.
    fn try_cast(&mut self) -> Result<Option<Expr>, ParseError> {
        let mark = self.idx;
        let start = self.span();
        self.idx += 1; // '('
        if self.kind().is_primitive() {
            let ty = self.type_in_expr()?;
            if self.eat(TokenKind::RParen) {
                let operand = self.unary()?;
                let span = start.merge(operand.span());
                return Ok(Some(Expr::Cast {
                    ty,
                    operand: Box::new(operand),
                    span,
                }));
            }
            self.idx = mark;
            return Ok(None);
        }
        if self.kind() == TokenKind::Ident {
            if let Ok(ty) = self.type_in_expr() {
                if self.kind() == TokenKind::RParen && starts_operand(self.peek_kind(1)) {
                    self.idx += 1;
                    let operand = self.unary()?;
                    let span = start.merge(operand.span());
                    return Ok(Some(Expr::Cast {
                        ty,
                        operand: Box::new(operand),
                        span,
                    }));
                }
            }
        }
        self.idx = mark;
        Ok(None)
    }

    /// A type usable in casts and class literals: a primitive or a dotted
    /// name, optionally with array dimensions. No generics: a parameterized
    /// cast can never be part of a compile-time constant.
    fn type_in_expr(&mut self) -> Result<Ty, ParseError> {
        let base = if self.kind().is_primitive() {
            let tok = self.advance()?;
            Ty::Primitive {
                kind: prim_of(tok.kind),
                annotations: Vec::new(),
                span: tok.span,
            }
        } else {
            let first = self.ident()?;
            let start = first.span;
            let mut end = first.span;
            let mut segments = vec![TySeg {
                name: first,
                args: Vec::new(),
                annotations: Vec::new(),
            }];
            while self.kind() == TokenKind::Dot && self.peek_kind(1) == TokenKind::Ident {
                self.idx += 1;
                let name = self.ident()?;
                end = name.span;
                segments.push(TySeg {
                    name,
                    args: Vec::new(),
                    annotations: Vec::new(),
                });
            }
            Ty::Named {
                segments,
                span: start.merge(end),
            }
        };
        let mut dims = 0usize;
        while self.kind() == TokenKind::LBracket && self.peek_kind(1) == TokenKind::RBracket {
            self.idx += 2;
            dims += 1;
        }
        let mut ty = base;
        let span = ty.span();
        for _ in 0..dims {
            ty = Ty::Array {
                element: Box::new(ty),
                annotations: Vec::new(),
                span,
            };
        }
        Ok(ty)
    }

    fn primary(&mut self) -> Result<Expr, ParseError> {
        let tok = self
            .cur()
            .ok_or_else(|| ParseError::new(self.span(), DiagnosticKind::UnexpectedEof))?;
        match tok.kind {
            TokenKind::IntLiteral
            | TokenKind::LongLiteral
            | TokenKind::FloatLiteral
            | TokenKind::DoubleLiteral
            | TokenKind::CharLiteral
            | TokenKind::StringLiteral => {
                let tok = self.advance()?;
                let value = match &tok.value {
                    TokenValue::Int(v) => Lit::Int(*v),
                    TokenValue::Long(v) => Lit::Long(*v),
                    TokenValue::Float(v) => Lit::Float(*v),
                    TokenValue::Double(v) => Lit::Double(*v),
                    TokenValue::Char(v) => Lit::Char(*v),
                    TokenValue::Str(v) => Lit::Str(v.clone()),
                    _ => {
                        return Err(ParseError::new(
                            tok.span,
                            DiagnosticKind::InvalidLiteral(String::new()),
                        ));
                    }
                };
                Ok(Expr::Literal {
                    value,
                    span: tok.span,
                })
            }
            TokenKind::True | TokenKind::False => {
                let tok = self.advance()?;
                Ok(Expr::Literal {
                    value: Lit::Bool(tok.kind == TokenKind::True),
                    span: tok.span,
                })
            }
            TokenKind::Null => {
                let tok = self.advance()?;
                Ok(Expr::Literal {
                    value: Lit::Null,
                    span: tok.span,
                })
            }
            TokenKind::LParen => {
                self.idx += 1;
                let inner = self.ternary()?;
                self.expect(TokenKind::RParen)?;
                Ok(inner)
            }
            TokenKind::LBrace => self.array_init(),
            TokenKind::At => self.annotation().map(Expr::Annotation),
            kind if kind.is_primitive() || kind == TokenKind::Void => {
                let start = tok.span;
                let ty = if kind == TokenKind::Void {
                    let tok = self.advance()?;
                    Ty::Void { span: tok.span }
                } else {
                    self.type_in_expr()?
                };
                self.expect(TokenKind::Dot)?;
                let end = self.expect(TokenKind::Class)?.span;
                Ok(Expr::ClassLit {
                    ty,
                    span: start.merge(end),
                })
            }
            TokenKind::Ident => self.name_or_class_literal(),
            _ => Err(ParseError::new(
                tok.span,
                DiagnosticKind::UnexpectedToken(tok.kind.describe().to_string()),
            )),
        }
    }

    /// A dotted name, `Name.class`, or `Name[].class`.
    fn name_or_class_literal(&mut self) -> Result<Expr, ParseError> {
        let first = self.ident()?;
        let start = first.span;
        let mut end = first.span;
        let mut segments = vec![first];
        while self.kind() == TokenKind::Dot && self.peek_kind(1) == TokenKind::Ident {
            self.idx += 1;
            let id = self.ident()?;
            end = id.span;
            segments.push(id);
        }
        // Array class literal.
        if self.kind() == TokenKind::LBracket && self.peek_kind(1) == TokenKind::RBracket {
            let mut dims = 0usize;
            while self.kind() == TokenKind::LBracket && self.peek_kind(1) == TokenKind::RBracket {
                self.idx += 2;
                dims += 1;
            }
            self.expect(TokenKind::Dot)?;
            let close = self.expect(TokenKind::Class)?.span;
            let mut ty = Ty::Named {
                segments: segments
                    .iter()
                    .map(|id| TySeg {
                        name: id.clone(),
                        args: Vec::new(),
                        annotations: Vec::new(),
                    })
                    .collect(),
                span: start.merge(end),
            };
            for _ in 0..dims {
                ty = Ty::Array {
                    element: Box::new(ty),
                    annotations: Vec::new(),
                    span: start.merge(end),
                };
            }
            return Ok(Expr::ClassLit {
                ty,
                span: start.merge(close),
            });
        }
        if self.kind() == TokenKind::Dot && self.peek_kind(1) == TokenKind::Class {
            self.idx += 1;
            let close = self.expect(TokenKind::Class)?.span;
            let ty = Ty::Named {
                segments: segments
                    .iter()
                    .map(|id| TySeg {
                        name: id.clone(),
                        args: Vec::new(),
                        annotations: Vec::new(),
                    })
                    .collect(),
                span: start.merge(end),
            };
            return Ok(Expr::ClassLit {
                ty,
                span: start.merge(close),
            });
        }
        Ok(Expr::Name {
            segments,
            span: start.merge(end),
        })
    }

    fn array_init(&mut self) -> Result<Expr, ParseError> {
        let start = self.expect(TokenKind::LBrace)?.span;
        let mut elements = Vec::new();
        loop {
            if self.kind() == TokenKind::RBrace {
                break;
            }
            elements.push(self.ternary()?);
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        let end = self.expect(TokenKind::RBrace)?.span;
        Ok(Expr::ArrayInit {
            elements,
            span: start.merge(end),
        })
    }

    /// `@Name` or `@Name(...)` inside an element value.
    fn annotation(&mut self) -> Result<Anno, ParseError> {
        let start = self.expect(TokenKind::At)?.span;
        let first = self.ident()?;
        let mut end = first.span;
        let mut name = vec![first];
        while self.kind() == TokenKind::Dot && self.peek_kind(1) == TokenKind::Ident {
            self.idx += 1;
            let id = self.ident()?;
            end = id.span;
            name.push(id);
        }
        let mut args = Vec::new();
        if self.eat(TokenKind::LParen) {
            if self.kind() != TokenKind::RParen {
                let named =
                    self.kind() == TokenKind::Ident && self.peek_kind(1) == TokenKind::Assign;
                if named {
                    loop {
                        let key = self.ident()?;
                        self.expect(TokenKind::Assign)?;
                        let value = self.element_value()?;
                        args.push((Some(key), value));
                        if !self.eat(TokenKind::Comma) {
                            break;
                        }
                    }
                } else {
                    args.push((None, self.element_value()?));
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

    fn element_value(&mut self) -> Result<Expr, ParseError> {
        match self.kind() {
            TokenKind::At => self.annotation().map(Expr::Annotation),
            TokenKind::LBrace => self.array_init(),
            _ => self.ternary(),
        }
    }
}

/// Binary operators by precedence level, loosest first.
const PRECEDENCE: &[&[(TokenKind, BinOp)]] = &[
    &[(TokenKind::OrOr, BinOp::Or)],
    &[(TokenKind::AndAnd, BinOp::And)],
    &[(TokenKind::Bar, BinOp::BitOr)],
    &[(TokenKind::Caret, BinOp::BitXor)],
    &[(TokenKind::Amp, BinOp::BitAnd)],
    &[(TokenKind::Eq, BinOp::Eq), (TokenKind::Ne, BinOp::Ne)],
    &[
        (TokenKind::Lt, BinOp::Lt),
        (TokenKind::Gt, BinOp::Gt),
        (TokenKind::Le, BinOp::Le),
        (TokenKind::Ge, BinOp::Ge),
    ],
    &[
        (TokenKind::Shl, BinOp::Shl),
        (TokenKind::Shr, BinOp::Shr),
        (TokenKind::Ushr, BinOp::Ushr),
    ],
    &[(TokenKind::Plus, BinOp::Add), (TokenKind::Minus, BinOp::Sub)],
    &[
        (TokenKind::Star, BinOp::Mul),
        (TokenKind::Slash, BinOp::Div),
        (TokenKind::Percent, BinOp::Rem),
    ],
];

fn binop_at(kind: TokenKind, level: usize) -> Option<BinOp> {
    PRECEDENCE[level]
        .iter()
        .find(|(k, _)| *k == kind)
        .map(|(_, op)| *op)
}

fn starts_operand(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::IntLiteral
            | TokenKind::LongLiteral
            | TokenKind::FloatLiteral
            | TokenKind::DoubleLiteral
            | TokenKind::CharLiteral
            | TokenKind::StringLiteral
            | TokenKind::True
            | TokenKind::False
            | TokenKind::Null
            | TokenKind::Ident
            | TokenKind::LParen
            | TokenKind::Bang
            | TokenKind::Tilde
    )
}

fn prim_of(kind: TokenKind) -> PrimKind {
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
