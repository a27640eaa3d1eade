//! Diagnostic rendering.
//!
//! Internally diagnostics carry byte offsets; rendering translates them to
//! 1-based line/column through per-file line maps and sorts the final list
//! by `(file, line, column)` before presentation.

use javelin_common::{Diagnostic, Diagnostics, LineMap, Position, Severity};
use rustc_hash::FxHashMap;
use serde::Serialize;

#[derive(Clone, Debug, Serialize)]
pub struct RenderedDiagnostic {
    pub file: String,
    pub line: u32,
    pub column: u32,
    pub severity: Severity,
    pub message: String,
}

/// Sort and resolve positions. `texts` maps file name to contents; files
/// without text (processor messages) render at 0:0 and sort first within
/// their file.
pub fn render(diagnostics: &Diagnostics, texts: &FxHashMap<String, String>) -> Vec<RenderedDiagnostic> {
    let mut line_maps: FxHashMap<&str, LineMap> = FxHashMap::default();
    let mut rendered: Vec<RenderedDiagnostic> = diagnostics
        .iter()
        .map(|diagnostic| to_rendered(diagnostic, texts, &mut line_maps))
        .collect();
    rendered.sort_by(|a, b| {
        (a.file.as_str(), a.line, a.column).cmp(&(b.file.as_str(), b.line, b.column))
    });
    rendered
}

fn to_rendered<'a>(
    diagnostic: &'a Diagnostic,
    texts: &'a FxHashMap<String, String>,
    line_maps: &mut FxHashMap<&'a str, LineMap>,
) -> RenderedDiagnostic {
    let position = if diagnostic.span.is_synthetic() {
        Position { line: 0, column: 0 }
    } else {
        match texts.get(&diagnostic.file) {
            Some(text) => line_maps
                .entry(diagnostic.file.as_str())
                .or_insert_with(|| LineMap::new(text))
                .position(diagnostic.span.start),
            None => Position { line: 0, column: 0 },
        }
    };
    RenderedDiagnostic {
        file: diagnostic.file.clone(),
        line: position.line,
        column: position.column,
        severity: diagnostic.severity(),
        message: diagnostic.kind.to_string(),
    }
}

pub fn to_text(rendered: &[RenderedDiagnostic]) -> String {
    let mut out = String::new();
    for diagnostic in rendered {
        let severity = match diagnostic.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        out.push_str(&format!(
            "{}:{}:{}: {}: {}\n",
            diagnostic.file, diagnostic.line, diagnostic.column, severity, diagnostic.message
        ));
    }
    out
}

pub fn to_json(rendered: &[RenderedDiagnostic]) -> String {
    serde_json::to_string_pretty(rendered).unwrap_or_else(|_| "[]".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use javelin_common::{DiagnosticKind, Span};

    #[test]
    fn sorted_by_file_line_column() {
        let mut diags = Diagnostics::new();
        diags.report("b.java", Span::at(10), DiagnosticKind::UnexpectedEof);
        diags.report("a.java", Span::at(6), DiagnosticKind::UnexpectedInput);
        diags.report("a.java", Span::at(0), DiagnosticKind::UnexpectedInput);
        let mut texts = FxHashMap::default();
        texts.insert("a.java".to_string(), "abc\ndef\n".to_string());
        texts.insert("b.java".to_string(), "0123456789ab".to_string());
        let rendered = render(&diags, &texts);
        assert_eq!(rendered[0].file, "a.java");
        assert_eq!((rendered[0].line, rendered[0].column), (1, 1));
        assert_eq!((rendered[1].line, rendered[1].column), (2, 3));
        assert_eq!(rendered[2].file, "b.java");
    }
}
