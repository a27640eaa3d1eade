//! Field and method descriptors.

use crate::error::ClassFileError;

/// An erased field type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldType {
    /// One of `B C D F I J S Z`.
    Base(char),
    /// Binary class name.
    Object(String),
    Array(Box<FieldType>),
}

impl FieldType {
    pub fn descriptor(&self) -> String {
        let mut out = String::new();
        self.write_descriptor(&mut out);
        out
    }

    fn write_descriptor(&self, out: &mut String) {
        match self {
            FieldType::Base(c) => out.push(*c),
            FieldType::Object(name) => {
                out.push('L');
                out.push_str(name);
                out.push(';');
            }
            FieldType::Array(element) => {
                out.push('[');
                element.write_descriptor(out);
            }
        }
    }
}

/// An erased method shape; `ret` is `None` for `void`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MethodDescriptor {
    pub params: Vec<FieldType>,
    pub ret: Option<FieldType>,
}

impl MethodDescriptor {
    pub fn descriptor(&self) -> String {
        let mut out = String::from("(");
        for param in &self.params {
            param.write_descriptor(&mut out);
        }
        out.push(')');
        match &self.ret {
            Some(ty) => ty.write_descriptor(&mut out),
            None => out.push('V'),
        }
        out
    }
}

pub fn parse_field_descriptor(text: &str) -> Result<FieldType, ClassFileError> {
    let mut chars = text.char_indices().peekable();
    let ty = parse_one(text, &mut chars)?;
    if chars.next().is_some() {
        return Err(ClassFileError::BadDescriptor(text.to_string()));
    }
    Ok(ty)
}

pub fn parse_method_descriptor(text: &str) -> Result<MethodDescriptor, ClassFileError> {
    let mut chars = text.char_indices().peekable();
    if chars.next().map(|(_, c)| c) != Some('(') {
        return Err(ClassFileError::BadDescriptor(text.to_string()));
    }
    let mut params = Vec::new();
    loop {
        match chars.peek() {
            Some((_, ')')) => {
                chars.next();
                break;
            }
            Some(_) => params.push(parse_one(text, &mut chars)?),
            None => return Err(ClassFileError::BadDescriptor(text.to_string())),
        }
    }
    let ret = match chars.peek() {
        Some((_, 'V')) => {
            chars.next();
            None
        }
        Some(_) => Some(parse_one(text, &mut chars)?),
        None => return Err(ClassFileError::BadDescriptor(text.to_string())),
    };
    if chars.next().is_some() {
        return Err(ClassFileError::BadDescriptor(text.to_string()));
    }
    Ok(MethodDescriptor { params, ret })
}

fn parse_one(
    text: &str,
    chars: &mut std::iter::Peekable<std::str::CharIndices<'_>>,
) -> Result<FieldType, ClassFileError> {
    let Some((_, c)) = chars.next() else {
        return Err(ClassFileError::BadDescriptor(text.to_string()));
    };
    match c {
        'B' | 'C' | 'D' | 'F' | 'I' | 'J' | 'S' | 'Z' => Ok(FieldType::Base(c)),
        '[' => Ok(FieldType::Array(Box::new(parse_one(text, chars)?))),
        'L' => {
            let mut name = String::new();
            for (_, c) in chars.by_ref() {
                if c == ';' {
                    return Ok(FieldType::Object(name));
                }
                name.push(c);
            }
            Err(ClassFileError::BadDescriptor(text.to_string()))
        }
        _ => Err(ClassFileError::BadDescriptor(text.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips() {
        for text in ["I", "[[J", "Ljava/lang/String;", "[Ljava/util/Map$Entry;"] {
            assert_eq!(parse_field_descriptor(text).unwrap().descriptor(), text);
        }
        for text in ["()V", "(IJ)Ljava/lang/String;", "([BLjava/lang/Object;)[I"] {
            assert_eq!(parse_method_descriptor(text).unwrap().descriptor(), text);
        }
    }

    #[test]
    fn rejects_malformed() {
        assert!(parse_field_descriptor("Q").is_err());
        assert!(parse_field_descriptor("Ljava/lang/String").is_err());
        assert!(parse_field_descriptor("II").is_err());
        assert!(parse_method_descriptor("(I").is_err());
    }
}
