use javelin_common::DiagnosticKind;
use javelin_scanner::{Preprocessed, Scanner, Tok, TokenKind, TokenValue};

fn scan_all(source: &str) -> Vec<Tok> {
    let pre = Preprocessed::new(source);
    let mut scanner = Scanner::new(&pre);
    let mut toks = Vec::new();
    loop {
        let tok = scanner.next().expect("scan failure");
        let done = tok.kind == TokenKind::Eof;
        toks.push(tok);
        if done {
            break;
        }
    }
    toks
}

fn kinds(source: &str) -> Vec<TokenKind> {
    scan_all(source).into_iter().map(|t| t.kind).collect()
}

fn first_value(source: &str) -> TokenValue {
    scan_all(source).remove(0).value
}

fn scan_err(source: &str) -> DiagnosticKind {
    let pre = Preprocessed::new(source);
    let mut scanner = Scanner::new(&pre);
    loop {
        match scanner.next() {
            Ok(tok) if tok.kind == TokenKind::Eof => panic!("expected a scan error"),
            Ok(_) => {}
            Err(err) => return err.kind,
        }
    }
}

#[test]
fn keywords_and_idents() {
    assert_eq!(
        kinds("class Foo extends Bar"),
        vec![
            TokenKind::Class,
            TokenKind::Ident,
            TokenKind::Extends,
            TokenKind::Ident,
            TokenKind::Eof
        ]
    );
    // Pseudo-keywords stay identifiers.
    assert_eq!(
        kinds("sealed record module"),
        vec![TokenKind::Ident, TokenKind::Ident, TokenKind::Ident, TokenKind::Eof]
    );
}

#[test]
fn spans_are_original_offsets() {
    let toks = scan_all("cl\\u0061ss Foo");
    assert_eq!(toks[0].kind, TokenKind::Class);
    assert_eq!(toks[0].span.start, 0);
    // 'Foo' starts after the 8-byte escaped keyword and the space.
    assert_eq!(toks[1].span.start, 11);
}

#[test]
fn int_literals() {
    assert_eq!(first_value("42"), TokenValue::Int(42));
    assert_eq!(first_value("0x10"), TokenValue::Int(16));
    assert_eq!(first_value("0b101"), TokenValue::Int(5));
    assert_eq!(first_value("017"), TokenValue::Int(15));
    assert_eq!(first_value("0_777"), TokenValue::Int(511));
    assert_eq!(first_value("1_000_000"), TokenValue::Int(1_000_000));
    // All 32 value bits are usable in hex.
    assert_eq!(first_value("0xFFFFFFFF"), TokenValue::Int(-1));
    assert_eq!(first_value("0x7FFF_FFFF"), TokenValue::Int(i32::MAX));
}

#[test]
fn long_literals() {
    assert_eq!(first_value("42L"), TokenValue::Long(42));
    assert_eq!(first_value("0xFFFF_FFFF_FFFF_FFFFL"), TokenValue::Long(-1));
    assert_eq!(
        first_value("9223372036854775807l"),
        TokenValue::Long(i64::MAX)
    );
}

#[test]
fn decimal_overflow_is_invalid() {
    assert!(matches!(
        scan_err("2147483648"),
        DiagnosticKind::InvalidLiteral(_)
    ));
    assert!(matches!(
        scan_err("9223372036854775808L"),
        DiagnosticKind::InvalidLiteral(_)
    ));
    assert!(matches!(
        scan_err("0x1_0000_0000"),
        DiagnosticKind::InvalidLiteral(_)
    ));
}

#[test]
fn float_literals() {
    assert_eq!(first_value("1.5"), TokenValue::Double(1.5));
    assert_eq!(first_value("1.5f"), TokenValue::Float(1.5));
    assert_eq!(first_value("1e3"), TokenValue::Double(1000.0));
    assert_eq!(first_value("2d"), TokenValue::Double(2.0));
    assert_eq!(first_value(".5"), TokenValue::Double(0.5));
    // Hex float: 0x1.8p1 = 1.5 * 2 = 3.0
    assert_eq!(first_value("0x1.8p1"), TokenValue::Double(3.0));
    assert_eq!(first_value("0x10p-1"), TokenValue::Double(8.0));
}

#[test]
fn suffix_sets_kind() {
    assert_eq!(kinds("1 1L 1f 1d 1.0")[..5].to_vec(), vec![
        TokenKind::IntLiteral,
        TokenKind::LongLiteral,
        TokenKind::FloatLiteral,
        TokenKind::DoubleLiteral,
        TokenKind::DoubleLiteral,
    ]);
}

#[test]
fn char_literals() {
    assert_eq!(first_value("'a'"), TokenValue::Char('a' as u16));
    assert_eq!(first_value("'\\n'"), TokenValue::Char(0x0a));
    assert_eq!(first_value("'\\s'"), TokenValue::Char(0x20));
    assert_eq!(first_value("'\\''"), TokenValue::Char('\'' as u16));
    // Octal escapes: 3 digits only when the first is 0-3.
    assert_eq!(first_value("'\\377'"), TokenValue::Char(0xff));
    assert_eq!(first_value("'\\0'"), TokenValue::Char(0));
    assert_eq!(scan_err("''"), DiagnosticKind::EmptyCharacterLiteral);
    assert_eq!(scan_err("'a"), DiagnosticKind::UnterminatedCharacterLiteral);
    assert_eq!(scan_err("'ab'"), DiagnosticKind::UnterminatedCharacterLiteral);
}

#[test]
fn string_literals() {
    assert_eq!(
        first_value("\"hi\\tthere\""),
        TokenValue::Str("hi\tthere".to_string())
    );
    assert_eq!(scan_err("\"abc\ndef\""), DiagnosticKind::UnterminatedString);
    assert_eq!(scan_err("\"abc"), DiagnosticKind::UnterminatedString);
}

#[test]
fn text_blocks() {
    let src = "\"\"\"\n    hello\n    world\n    \"\"\"";
    assert_eq!(
        first_value(src),
        TokenValue::Str("hello\nworld\n".to_string())
    );
    // Closer column deeper than content: content keeps zero indent.
    let src = "\"\"\"\n  a\n   b\n \"\"\"";
    assert_eq!(first_value(src), TokenValue::Str(" a\n  b\n".to_string()));
    // Escapes are processed after stripping; \s protects trailing space.
    let src = "\"\"\"\n  a \\s\n  \"\"\"";
    assert_eq!(first_value(src), TokenValue::Str("a  \n".to_string()));
    // An embedded escaped quote does not close the block.
    let src = "\"\"\"\n  say \\\"\"\"hi\n  \"\"\"";
    assert_eq!(
        first_value(src),
        TokenValue::Str("say \"\"\"hi\n".to_string())
    );
}

#[test]
fn comments_and_javadoc() {
    let pre = Preprocessed::new("// line\n/* block */ /** the doc */ class");
    let mut scanner = Scanner::new(&pre);
    let tok = scanner.next().unwrap();
    assert_eq!(tok.kind, TokenKind::Class);
    assert_eq!(scanner.take_javadoc().as_deref(), Some(" the doc "));
    // Consumed on retrieval.
    assert_eq!(scanner.take_javadoc(), None);
}

#[test]
fn unclosed_comment() {
    assert_eq!(scan_err("/* never ends"), DiagnosticKind::UnclosedComment);
}

#[test]
fn composite_operators() {
    assert_eq!(
        kinds(">> >>> >= <= == != && || >>= >>>= ->")[..11].to_vec(),
        vec![
            TokenKind::Shr,
            TokenKind::Ushr,
            TokenKind::Ge,
            TokenKind::Le,
            TokenKind::Eq,
            TokenKind::Ne,
            TokenKind::AndAnd,
            TokenKind::OrOr,
            TokenKind::ShrEq,
            TokenKind::UshrEq,
            TokenKind::Arrow,
        ]
    );
    assert_eq!(
        kinds("... :: @")[..3].to_vec(),
        vec![TokenKind::Ellipsis, TokenKind::ColonColon, TokenKind::At]
    );
}

#[test]
fn unexpected_input() {
    assert_eq!(scan_err("#"), DiagnosticKind::UnexpectedInput);
}
