//! Diagnostics.
//!
//! User-facing problems are data, not Rust errors: each is a `Diagnostic`
//! with a file, a span and a `DiagnosticKind`, accumulated into a
//! `Diagnostics` sink. Binding continues past most reported errors with
//! sentinel results; the driver fails the compilation at the end if any
//! error-severity diagnostic was reported.

use crate::span::Span;
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Severity {
    Warning,
    Error,
}

/// Every kind of problem javelin reports.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum DiagnosticKind {
    // Scanner
    UnexpectedInput,
    UnexpectedEof,
    UnclosedComment,
    UnterminatedString,
    UnterminatedCharacterLiteral,
    EmptyCharacterLiteral,
    InvalidLiteral(String),
    // Parser
    UnexpectedToken(String),
    UnexpectedIdentifier(String),
    ExpectedToken(String),
    InvalidAnnotationArgument,
    UnterminatedExpression,
    ExtendsAfterImplements,
    UnexpectedModifier(String),
    UnexpectedTypeParameter,
    // Binder
    CannotResolve(String),
    ClassFileNotFound(String),
    CyclicInheritance(String),
    CyclicConstant(String),
    SymbolNotAccessible(String),
    AmbiguousReference(String),
    BadSealedPermits(String),
    NonSealedRequiresSealed(String),
    UntargetedAnnotation(String),
    // Annotation processing
    ProcError(String),
    ProcWarning(String),
}

impl DiagnosticKind {
    pub fn severity(&self) -> Severity {
        match self {
            DiagnosticKind::ProcWarning(_) | DiagnosticKind::UntargetedAnnotation(_) => {
                Severity::Warning
            }
            _ => Severity::Error,
        }
    }
}

impl std::fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiagnosticKind::UnexpectedInput => write!(f, "unexpected input"),
            DiagnosticKind::UnexpectedEof => write!(f, "unexpected end of file"),
            DiagnosticKind::UnclosedComment => write!(f, "unclosed comment"),
            DiagnosticKind::UnterminatedString => write!(f, "unterminated string literal"),
            DiagnosticKind::UnterminatedCharacterLiteral => {
                write!(f, "unterminated character literal")
            }
            DiagnosticKind::EmptyCharacterLiteral => write!(f, "empty character literal"),
            DiagnosticKind::InvalidLiteral(text) => write!(f, "invalid literal: {text}"),
            DiagnosticKind::UnexpectedToken(tok) => write!(f, "unexpected token {tok}"),
            DiagnosticKind::UnexpectedIdentifier(name) => {
                write!(f, "unexpected identifier '{name}'")
            }
            DiagnosticKind::ExpectedToken(tok) => write!(f, "expected {tok}"),
            DiagnosticKind::InvalidAnnotationArgument => write!(f, "invalid annotation argument"),
            DiagnosticKind::UnterminatedExpression => write!(f, "unterminated expression"),
            DiagnosticKind::ExtendsAfterImplements => {
                write!(f, "'extends' must come before 'implements'")
            }
            DiagnosticKind::UnexpectedModifier(m) => write!(f, "modifier '{m}' not allowed here"),
            DiagnosticKind::UnexpectedTypeParameter => write!(f, "unexpected type parameter"),
            DiagnosticKind::CannotResolve(name) => write!(f, "cannot resolve symbol '{name}'"),
            DiagnosticKind::ClassFileNotFound(sym) => {
                write!(f, "class file for '{sym}' not found")
            }
            DiagnosticKind::CyclicInheritance(name) => {
                write!(f, "cyclic inheritance involving '{name}'")
            }
            DiagnosticKind::CyclicConstant(name) => {
                write!(f, "self-referential constant '{name}'")
            }
            DiagnosticKind::SymbolNotAccessible(name) => {
                write!(f, "'{name}' is not accessible here")
            }
            DiagnosticKind::AmbiguousReference(name) => {
                write!(f, "reference to '{name}' is ambiguous")
            }
            DiagnosticKind::BadSealedPermits(name) => {
                write!(f, "'{name}' is not permitted to extend its sealed supertype")
            }
            DiagnosticKind::NonSealedRequiresSealed(name) => {
                write!(f, "'{name}' is non-sealed but has no sealed supertype")
            }
            DiagnosticKind::UntargetedAnnotation(name) => {
                write!(f, "annotation '@{name}' is applicable to neither declarations nor types and was dropped")
            }
            DiagnosticKind::ProcError(msg) => write!(f, "{msg}"),
            DiagnosticKind::ProcWarning(msg) => write!(f, "{msg}"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub file: String,
    pub span: Span,
    pub kind: DiagnosticKind,
}

impl Diagnostic {
    pub fn new(file: impl Into<String>, span: Span, kind: DiagnosticKind) -> Self {
        Diagnostic {
            file: file.into(),
            span,
            kind,
        }
    }

    pub fn severity(&self) -> Severity {
        self.kind.severity()
    }
}

/// Accumulates diagnostics across a whole compilation.
#[derive(Debug, Default)]
pub struct Diagnostics {
    list: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Diagnostics { list: Vec::new() }
    }

    pub fn report(&mut self, file: impl Into<String>, span: Span, kind: DiagnosticKind) {
        self.list.push(Diagnostic::new(file, span, kind));
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.list.push(diagnostic);
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.list.extend(other.list);
    }

    pub fn has_errors(&self) -> bool {
        self.list.iter().any(|d| d.severity() == Severity::Error)
    }

    pub fn error_count(&self) -> usize {
        self.list
            .iter()
            .filter(|d| d.severity() == Severity::Error)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.list.iter()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.list
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_partition() {
        let mut diags = Diagnostics::new();
        diags.report(
            "A.java",
            Span::at(0),
            DiagnosticKind::ProcWarning("heads up".into()),
        );
        assert!(!diags.has_errors());
        diags.report(
            "A.java",
            Span::at(4),
            DiagnosticKind::CannotResolve("Missing".into()),
        );
        assert!(diags.has_errors());
        assert_eq!(diags.error_count(), 1);
    }
}
