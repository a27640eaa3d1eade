//! Command-line driver for javelin.
//!
//! Reads sources, assembles the classpath, runs binding (with annotation
//! processing rounds when processors are configured), lowers the bound
//! classes in parallel, and writes a jar or class directory. Diagnostics
//! are sorted by `(file, line, column)` and rendered as text or JSON; the
//! process exits non-zero when any diagnostic has error severity.

#![allow(clippy::print_stderr)]

pub mod args;
pub mod driver;
pub mod output;
pub mod render;

pub use args::CliArgs;
pub use driver::compile;
