//! Common types and utilities for the javelin header compiler.
//!
//! This crate provides foundational types used across all javelin crates:
//! - String interning (`Atom`, `Interner`)
//! - Source spans (`Span`, `Spanned`)
//! - Line maps for offset-to-position translation (`LineMap`, `Position`)
//! - Diagnostics (`Diagnostic`, `DiagnosticKind`, `Diagnostics`)
//! - Binary-name helpers (`names`)

pub mod diagnostics;
pub mod interner;
pub mod names;
pub mod position;
pub mod span;

pub use diagnostics::{Diagnostic, DiagnosticKind, Diagnostics, Severity};
pub use interner::{Atom, Interner};
pub use position::{LineMap, Position};
pub use span::{Span, Spanned};
