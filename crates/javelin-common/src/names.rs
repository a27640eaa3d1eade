//! Binary-name helpers.
//!
//! A binary name uses `/` between package segments and `$` between an
//! enclosing class and its nested classes (`java/util/Map$Entry`). The `$`
//! never separates packages.

pub const OBJECT: &str = "java/lang/Object";
pub const STRING: &str = "java/lang/String";
pub const CLASS: &str = "java/lang/Class";
pub const ENUM: &str = "java/lang/Enum";
pub const RECORD: &str = "java/lang/Record";
pub const DEPRECATED: &str = "java/lang/Deprecated";
pub const ANNOTATION: &str = "java/lang/annotation/Annotation";
pub const RETENTION: &str = "java/lang/annotation/Retention";
pub const TARGET: &str = "java/lang/annotation/Target";
pub const INHERITED: &str = "java/lang/annotation/Inherited";
pub const REPEATABLE: &str = "java/lang/annotation/Repeatable";
pub const MODULE_INFO: &str = "module-info";

/// `com.example.Foo` -> `com/example/Foo`.
pub fn binary_from_dotted(dotted: &str) -> String {
    dotted.replace('.', "/")
}

/// `com/example/Foo$Bar` -> `com.example.Foo.Bar` (for display only; the
/// mapping is not reversible).
pub fn display_name(binary: &str) -> String {
    binary.replace(['/', '$'], ".")
}

/// The package part of a binary name, or `""` for the default package.
pub fn package_of(binary: &str) -> &str {
    match binary.rfind('/') {
        Some(idx) => &binary[..idx],
        None => "",
    }
}

/// The simple (innermost) name of a binary name.
pub fn simple_name_of(binary: &str) -> &str {
    let after_pkg = match binary.rfind('/') {
        Some(idx) => &binary[idx + 1..],
        None => binary,
    };
    match after_pkg.rfind('$') {
        Some(idx) => &after_pkg[idx + 1..],
        None => after_pkg,
    }
}

/// The binary name of a class nested inside `outer`.
pub fn nested(outer: &str, simple: &str) -> String {
    format!("{outer}${simple}")
}

/// The binary name of a top-level class in `package` (may be empty).
pub fn top_level(package: &str, simple: &str) -> String {
    if package.is_empty() {
        simple.to_string()
    } else {
        format!("{package}/{simple}")
    }
}

/// The binary name of the immediately enclosing class, if `binary` names a
/// nested class.
pub fn enclosing_of(binary: &str) -> Option<&str> {
    let pkg_end = binary.rfind('/').map_or(0, |i| i + 1);
    binary[pkg_end..]
        .rfind('$')
        .map(|idx| &binary[..pkg_end + idx])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_surgery() {
        assert_eq!(binary_from_dotted("com.example.Foo"), "com/example/Foo");
        assert_eq!(package_of("com/example/Foo$Bar"), "com/example");
        assert_eq!(package_of("Foo"), "");
        assert_eq!(simple_name_of("com/example/Foo$Bar"), "Bar");
        assert_eq!(simple_name_of("Foo"), "Foo");
        assert_eq!(nested("com/example/Foo", "Bar"), "com/example/Foo$Bar");
        assert_eq!(top_level("", "Foo"), "Foo");
        assert_eq!(top_level("com/example", "Foo"), "com/example/Foo");
        assert_eq!(enclosing_of("com/example/Foo$Bar"), Some("com/example/Foo"));
        assert_eq!(enclosing_of("com/example/Foo"), None);
        assert_eq!(display_name("com/example/Foo$Bar"), "com.example.Foo.Bar");
    }

    #[test]
    fn dollar_in_package_is_not_nesting() {
        // A `$` before the last `/` belongs to a package segment.
        assert_eq!(enclosing_of("we$ird/Foo"), None);
        assert_eq!(simple_name_of("we$ird/Foo"), "Foo");
    }
}
