//! The generic-signature grammar.
//!
//! Parsing only: the lowerer renders signature strings directly from bound
//! types, but the classpath reader needs the ASTs to rebuild generic types
//! from compiled class files.
//!
//! Grammar (class-file form): type variables as `TFoo;`, class types as
//! `Lpkg/Outer<Args>.Inner;`, wildcards as `*`, `+T`, `-T`, arrays as `[T`.

use crate::error::ClassFileError;

#[derive(Clone, Debug, PartialEq)]
pub enum TypeSig {
    /// One of `B C D F I J S Z`.
    Base(char),
    Class(ClassSig),
    TyVar(String),
    Array(Box<TypeSig>),
    /// Only as a method return.
    Void,
}

/// `Lpkg/Outer<...>.Inner<...>;` — the package and outermost simple name are
/// fused in `binary`; nested links follow with their own arguments.
#[derive(Clone, Debug, PartialEq)]
pub struct ClassSig {
    /// Binary name of the outermost named class (`java/util/Map`).
    pub binary: String,
    pub args: Vec<TypeArgSig>,
    /// `.Inner<...>` links, outermost first.
    pub nested: Vec<(String, Vec<TypeArgSig>)>,
}

impl ClassSig {
    /// The binary name of the innermost class (`java/util/Map$Entry`).
    pub fn full_binary_name(&self) -> String {
        let mut name = self.binary.clone();
        for (simple, _) in &self.nested {
            name.push('$');
            name.push_str(simple);
        }
        name
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum TypeArgSig {
    /// `*`
    Unbounded,
    Exact(TypeSig),
    /// `+T`
    Extends(TypeSig),
    /// `-T`
    Super(TypeSig),
}

#[derive(Clone, Debug, PartialEq)]
pub struct SigTypeParam {
    pub name: String,
    /// The (possibly absent) class bound; absent is rendered `:` and means
    /// the bound list starts with an interface.
    pub class_bound: Option<TypeSig>,
    pub iface_bounds: Vec<TypeSig>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ClassSignature {
    pub type_params: Vec<SigTypeParam>,
    pub superclass: TypeSig,
    pub interfaces: Vec<TypeSig>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MethodSignature {
    pub type_params: Vec<SigTypeParam>,
    pub params: Vec<TypeSig>,
    pub ret: TypeSig,
    pub throws: Vec<TypeSig>,
}

pub fn parse_type_signature(text: &str) -> Result<TypeSig, ClassFileError> {
    let mut cursor = Cursor::new(text);
    let sig = cursor.type_sig()?;
    cursor.expect_end()?;
    Ok(sig)
}

pub fn parse_class_signature(text: &str) -> Result<ClassSignature, ClassFileError> {
    let mut cursor = Cursor::new(text);
    let type_params = cursor.opt_type_params()?;
    let superclass = cursor.type_sig()?;
    let mut interfaces = Vec::new();
    while !cursor.at_end() {
        interfaces.push(cursor.type_sig()?);
    }
    Ok(ClassSignature {
        type_params,
        superclass,
        interfaces,
    })
}

pub fn parse_method_signature(text: &str) -> Result<MethodSignature, ClassFileError> {
    let mut cursor = Cursor::new(text);
    let type_params = cursor.opt_type_params()?;
    cursor.expect('(')?;
    let mut params = Vec::new();
    while cursor.peek() != Some(')') {
        params.push(cursor.type_sig()?);
    }
    cursor.expect(')')?;
    let ret = if cursor.peek() == Some('V') {
        cursor.bump();
        TypeSig::Void
    } else {
        cursor.type_sig()?
    };
    let mut throws = Vec::new();
    while cursor.peek() == Some('^') {
        cursor.bump();
        throws.push(cursor.type_sig()?);
    }
    cursor.expect_end()?;
    Ok(MethodSignature {
        type_params,
        params,
        ret,
        throws,
    })
}

struct Cursor<'s> {
    text: &'s str,
    pos: usize,
}

impl<'s> Cursor<'s> {
    fn new(text: &'s str) -> Self {
        Cursor { text, pos: 0 }
    }

    fn peek(&self) -> Option<char> {
        self.text[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn fail(&self) -> ClassFileError {
        ClassFileError::BadSignature(self.text.to_string())
    }

    fn expect(&mut self, ch: char) -> Result<(), ClassFileError> {
        if self.bump() == Some(ch) {
            Ok(())
        } else {
            Err(self.fail())
        }
    }

    fn expect_end(&self) -> Result<(), ClassFileError> {
        if self.at_end() { Ok(()) } else { Err(self.fail()) }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.text.len()
    }

    /// An identifier: everything up to a signature metacharacter.
    fn identifier(&mut self) -> Result<String, ClassFileError> {
        let start = self.pos;
        while let Some(ch) = self.peek() {
            if matches!(ch, '.' | ';' | '[' | '/' | '<' | '>' | ':') {
                break;
            }
            self.bump();
        }
        if self.pos == start {
            return Err(self.fail());
        }
        Ok(self.text[start..self.pos].to_string())
    }

    fn opt_type_params(&mut self) -> Result<Vec<SigTypeParam>, ClassFileError> {
        if self.peek() != Some('<') {
            return Ok(Vec::new());
        }
        self.bump();
        let mut params = Vec::new();
        while self.peek() != Some('>') {
            let name = self.identifier()?;
            self.expect(':')?;
            let class_bound = match self.peek() {
                Some(':') | Some('>') => None,
                _ => Some(self.type_sig()?),
            };
            let mut iface_bounds = Vec::new();
            while self.peek() == Some(':') {
                self.bump();
                iface_bounds.push(self.type_sig()?);
            }
            params.push(SigTypeParam {
                name,
                class_bound,
                iface_bounds,
            });
        }
        self.expect('>')?;
        Ok(params)
    }

    fn type_sig(&mut self) -> Result<TypeSig, ClassFileError> {
        match self.peek().ok_or_else(|| self.fail())? {
            'B' | 'C' | 'D' | 'F' | 'I' | 'J' | 'S' | 'Z' => {
                let c = self.bump().expect("peeked");
                Ok(TypeSig::Base(c))
            }
            '[' => {
                self.bump();
                Ok(TypeSig::Array(Box::new(self.type_sig()?)))
            }
            'T' => {
                self.bump();
                let name = self.identifier()?;
                self.expect(';')?;
                Ok(TypeSig::TyVar(name))
            }
            'L' => self.class_sig().map(TypeSig::Class),
            _ => Err(self.fail()),
        }
    }

    fn class_sig(&mut self) -> Result<ClassSig, ClassFileError> {
        self.expect('L')?;
        let mut binary = self.identifier()?;
        while self.peek() == Some('/') {
            self.bump();
            binary.push('/');
            binary.push_str(&self.identifier()?);
        }
        let args = self.opt_type_args()?;
        let mut nested = Vec::new();
        while self.peek() == Some('.') {
            self.bump();
            let simple = self.identifier()?;
            let args = self.opt_type_args()?;
            nested.push((simple, args));
        }
        self.expect(';')?;
        Ok(ClassSig {
            binary,
            args,
            nested,
        })
    }

    fn opt_type_args(&mut self) -> Result<Vec<TypeArgSig>, ClassFileError> {
        if self.peek() != Some('<') {
            return Ok(Vec::new());
        }
        self.bump();
        let mut args = Vec::new();
        while self.peek() != Some('>') {
            let arg = match self.peek().ok_or_else(|| self.fail())? {
                '*' => {
                    self.bump();
                    TypeArgSig::Unbounded
                }
                '+' => {
                    self.bump();
                    TypeArgSig::Extends(self.type_sig()?)
                }
                '-' => {
                    self.bump();
                    TypeArgSig::Super(self.type_sig()?)
                }
                _ => TypeArgSig::Exact(self.type_sig()?),
            };
            args.push(arg);
        }
        self.expect('>')?;
        Ok(args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_signature() {
        let sig = parse_class_signature(
            "<K:Ljava/lang/Object;V:Ljava/lang/Object;>Ljava/lang/Object;Ljava/util/Map<TK;TV;>;",
        )
        .unwrap();
        assert_eq!(sig.type_params.len(), 2);
        assert_eq!(sig.type_params[0].name, "K");
        assert_eq!(sig.interfaces.len(), 1);
        let TypeSig::Class(iface) = &sig.interfaces[0] else {
            panic!("expected class");
        };
        assert_eq!(iface.binary, "java/util/Map");
        assert_eq!(iface.args.len(), 2);
    }

    #[test]
    fn interface_first_bound_is_absent() {
        let sig = parse_class_signature(
            "<T::Ljava/lang/Comparable<TT;>;>Ljava/lang/Object;",
        )
        .unwrap();
        assert!(sig.type_params[0].class_bound.is_none());
        assert_eq!(sig.type_params[0].iface_bounds.len(), 1);
    }

    #[test]
    fn method_signature_with_throws() {
        let sig = parse_method_signature("<X:Ljava/lang/Throwable;>(TX;[I)V^TX;").unwrap();
        assert_eq!(sig.type_params.len(), 1);
        assert_eq!(sig.params.len(), 2);
        assert_eq!(sig.ret, TypeSig::Void);
        assert_eq!(sig.throws, vec![TypeSig::TyVar("X".to_string())]);
    }

    #[test]
    fn nested_generic_class() {
        let sig = parse_type_signature("Ljava/util/Map<TK;TV;>.Entry<TK;>;").unwrap();
        let TypeSig::Class(class) = sig else {
            panic!("expected class");
        };
        assert_eq!(class.binary, "java/util/Map");
        assert_eq!(class.nested.len(), 1);
        assert_eq!(class.full_binary_name(), "java/util/Map$Entry");
    }

    #[test]
    fn wildcards() {
        let sig = parse_type_signature("Ljava/util/List<+Ljava/lang/Number;>;").unwrap();
        let TypeSig::Class(class) = sig else {
            panic!("expected class");
        };
        assert!(matches!(class.args[0], TypeArgSig::Extends(_)));
        let sig = parse_type_signature("Ljava/util/List<*>;").unwrap();
        let TypeSig::Class(class) = sig else {
            panic!("expected class");
        };
        assert_eq!(class.args, vec![TypeArgSig::Unbounded]);
    }
}
