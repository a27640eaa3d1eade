//! Lexer for the javelin header compiler.
//!
//! Scanning happens in two logical stages:
//! 1. the unicode-escape preprocessor rewrites `\uXXXX` sequences while
//!    keeping a map back to the original byte offsets, and
//! 2. the scanner proper produces a token stream over the rewritten text,
//!    reporting all positions in pre-rewrite offsets so diagnostics point at
//!    what the user actually typed.
//!
//! The scanner is declaration-oriented: it has no notion of statements, but
//! it captures `/** ... */` javadoc for the parser to attach to the next
//! declaration.

pub mod scanner;
pub mod token;
pub mod unicode;

pub use scanner::{ScanError, Scanner};
pub use token::{Tok, TokenKind, TokenValue};
pub use unicode::Preprocessed;
