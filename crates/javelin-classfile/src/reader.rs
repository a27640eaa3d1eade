//! Class-file header parsing.
//!
//! Reads the attributes the header compiler cares about and skips the rest
//! (`Code`, stack maps, debug tables). The result is the same [`ClassFile`]
//! shape the writer consumes, so reading back a written class is a
//! round-trip.

use crate::class::*;
use crate::error::ClassFileError;
use crate::pool::decode_modified_utf8;
use crate::MAGIC;

type Result<T> = std::result::Result<T, ClassFileError>;

pub fn read_class(bytes: &[u8]) -> Result<ClassFile> {
    let mut r = Reader { bytes, pos: 0 };
    let magic = r.u32()?;
    if magic != MAGIC {
        return Err(ClassFileError::BadMagic(magic));
    }
    let minor = r.u16()?;
    let major = r.u16()?;
    let pool = Pool::parse(&mut r)?;

    let access = r.u16()?;
    let this_idx = r.u16()?;
    let name = pool.class_name(this_idx)?;
    let super_idx = r.u16()?;
    let super_name = if super_idx == 0 {
        None
    } else {
        Some(pool.class_name(super_idx)?)
    };
    let mut interfaces = Vec::new();
    for _ in 0..r.u16()? {
        let idx = r.u16()?;
        interfaces.push(pool.class_name(idx)?);
    }

    let mut cf = ClassFile {
        minor,
        major,
        access,
        name,
        super_name,
        interfaces,
        ..ClassFile::default()
    };

    for _ in 0..r.u16()? {
        cf.fields.push(read_field(&mut r, &pool)?);
    }
    for _ in 0..r.u16()? {
        cf.methods.push(read_method(&mut r, &pool)?);
    }

    for _ in 0..r.u16()? {
        let attr_name_idx = r.u16()?;
        let attr_name = pool.utf8(attr_name_idx)?;
        let len = r.u32()? as usize;
        let mut attr = r.sub(len)?;
        match attr_name.as_str() {
            "Signature" => {
                let idx = attr.u16()?;
                cf.signature = Some(pool.utf8(idx)?);
            }
            "Deprecated" => cf.deprecated = true,
            "InnerClasses" => {
                for _ in 0..attr.u16()? {
                    let inner_idx = attr.u16()?;
                    let outer_idx = attr.u16()?;
                    let name_idx = attr.u16()?;
                    let entry_access = attr.u16()?;
                    cf.inner_classes.push(InnerClassItem {
                        inner: pool.class_name(inner_idx)?,
                        outer: if outer_idx == 0 {
                            None
                        } else {
                            Some(pool.class_name(outer_idx)?)
                        },
                        inner_name: if name_idx == 0 {
                            None
                        } else {
                            Some(pool.utf8(name_idx)?)
                        },
                        access: entry_access,
                    });
                }
            }
            "PermittedSubclasses" => {
                for _ in 0..attr.u16()? {
                    let idx = attr.u16()?;
                    cf.permitted_subclasses.push(pool.class_name(idx)?);
                }
            }
            "NestHost" => {
                let idx = attr.u16()?;
                cf.nest_host = Some(pool.class_name(idx)?);
            }
            "NestMembers" => {
                for _ in 0..attr.u16()? {
                    let idx = attr.u16()?;
                    cf.nest_members.push(pool.class_name(idx)?);
                }
            }
            "Record" => {
                for _ in 0..attr.u16()? {
                    cf.record_components.push(read_record_component(&mut attr, &pool)?);
                }
            }
            "Module" => {
                cf.module = Some(read_module(&mut attr, &pool)?);
            }
            "RuntimeVisibleAnnotations" => {
                read_annotations(&mut attr, &pool, true, &mut cf.annotations)?;
            }
            "RuntimeInvisibleAnnotations" => {
                read_annotations(&mut attr, &pool, false, &mut cf.annotations)?;
            }
            "RuntimeVisibleTypeAnnotations" => {
                read_type_annotations(&mut attr, &pool, true, &mut cf.type_annotations)?;
            }
            "RuntimeInvisibleTypeAnnotations" => {
                read_type_annotations(&mut attr, &pool, false, &mut cf.type_annotations)?;
            }
            _ => {}
        }
    }
    Ok(cf)
}

fn read_field(r: &mut Reader<'_>, pool: &Pool) -> Result<FieldItem> {
    let access = r.u16()?;
    let name = pool.utf8(r.u16()?)?;
    let descriptor = pool.utf8(r.u16()?)?;
    let mut field = FieldItem {
        access,
        name,
        descriptor,
        signature: None,
        constant: None,
        annotations: Vec::new(),
        type_annotations: Vec::new(),
        deprecated: false,
    };
    for _ in 0..r.u16()? {
        let attr_name = pool.utf8(r.u16()?)?;
        let len = r.u32()? as usize;
        let mut attr = r.sub(len)?;
        match attr_name.as_str() {
            "ConstantValue" => {
                let idx = attr.u16()?;
                field.constant = Some(pool.constant(idx, &field.descriptor)?);
            }
            "Signature" => {
                let idx = attr.u16()?;
                field.signature = Some(pool.utf8(idx)?);
            }
            "Deprecated" => field.deprecated = true,
            "RuntimeVisibleAnnotations" => {
                read_annotations(&mut attr, pool, true, &mut field.annotations)?;
            }
            "RuntimeInvisibleAnnotations" => {
                read_annotations(&mut attr, pool, false, &mut field.annotations)?;
            }
            "RuntimeVisibleTypeAnnotations" => {
                read_type_annotations(&mut attr, pool, true, &mut field.type_annotations)?;
            }
            "RuntimeInvisibleTypeAnnotations" => {
                read_type_annotations(&mut attr, pool, false, &mut field.type_annotations)?;
            }
            _ => {}
        }
    }
    Ok(field)
}

fn read_method(r: &mut Reader<'_>, pool: &Pool) -> Result<MethodItem> {
    let access = r.u16()?;
    let name = pool.utf8(r.u16()?)?;
    let descriptor = pool.utf8(r.u16()?)?;
    let mut method = MethodItem {
        access,
        name,
        descriptor,
        signature: None,
        exceptions: Vec::new(),
        annotations: Vec::new(),
        parameter_annotations: None,
        type_annotations: Vec::new(),
        method_parameters: Vec::new(),
        annotation_default: None,
        deprecated: false,
    };
    for _ in 0..r.u16()? {
        let attr_name = pool.utf8(r.u16()?)?;
        let len = r.u32()? as usize;
        let mut attr = r.sub(len)?;
        match attr_name.as_str() {
            "Signature" => {
                let idx = attr.u16()?;
                method.signature = Some(pool.utf8(idx)?);
            }
            "Exceptions" => {
                for _ in 0..attr.u16()? {
                    let idx = attr.u16()?;
                    method.exceptions.push(pool.class_name(idx)?);
                }
            }
            "MethodParameters" => {
                for _ in 0..attr.u8()? {
                    let name_idx = attr.u16()?;
                    let flags = attr.u16()?;
                    let name = if name_idx == 0 {
                        None
                    } else {
                        Some(pool.utf8(name_idx)?)
                    };
                    method.method_parameters.push((name, flags));
                }
            }
            "AnnotationDefault" => {
                method.annotation_default = Some(read_element_value(&mut attr, pool, true)?);
            }
            "Deprecated" => method.deprecated = true,
            "RuntimeVisibleAnnotations" => {
                read_annotations(&mut attr, pool, true, &mut method.annotations)?;
            }
            "RuntimeInvisibleAnnotations" => {
                read_annotations(&mut attr, pool, false, &mut method.annotations)?;
            }
            "RuntimeVisibleParameterAnnotations" => {
                read_parameter_annotations(&mut attr, pool, true, &mut method.parameter_annotations)?;
            }
            "RuntimeInvisibleParameterAnnotations" => {
                read_parameter_annotations(&mut attr, pool, false, &mut method.parameter_annotations)?;
            }
            "RuntimeVisibleTypeAnnotations" => {
                read_type_annotations(&mut attr, pool, true, &mut method.type_annotations)?;
            }
            "RuntimeInvisibleTypeAnnotations" => {
                read_type_annotations(&mut attr, pool, false, &mut method.type_annotations)?;
            }
            _ => {}
        }
    }
    Ok(method)
}

fn read_record_component(r: &mut Reader<'_>, pool: &Pool) -> Result<RecordComponentItem> {
    let name = pool.utf8(r.u16()?)?;
    let descriptor = pool.utf8(r.u16()?)?;
    let mut component = RecordComponentItem {
        name,
        descriptor,
        signature: None,
        annotations: Vec::new(),
        type_annotations: Vec::new(),
    };
    for _ in 0..r.u16()? {
        let attr_name = pool.utf8(r.u16()?)?;
        let len = r.u32()? as usize;
        let mut attr = r.sub(len)?;
        match attr_name.as_str() {
            "Signature" => {
                let idx = attr.u16()?;
                component.signature = Some(pool.utf8(idx)?);
            }
            "RuntimeVisibleAnnotations" => {
                read_annotations(&mut attr, pool, true, &mut component.annotations)?;
            }
            "RuntimeInvisibleAnnotations" => {
                read_annotations(&mut attr, pool, false, &mut component.annotations)?;
            }
            "RuntimeVisibleTypeAnnotations" => {
                read_type_annotations(&mut attr, pool, true, &mut component.type_annotations)?;
            }
            "RuntimeInvisibleTypeAnnotations" => {
                read_type_annotations(&mut attr, pool, false, &mut component.type_annotations)?;
            }
            _ => {}
        }
    }
    Ok(component)
}

fn read_module(r: &mut Reader<'_>, pool: &Pool) -> Result<ModuleItem> {
    let name = pool.module_name(r.u16()?)?;
    let flags = r.u16()?;
    let _version = r.u16()?;
    let mut module = ModuleItem {
        name,
        flags,
        requires: Vec::new(),
        exports: Vec::new(),
        opens: Vec::new(),
        uses: Vec::new(),
        provides: Vec::new(),
    };
    for _ in 0..r.u16()? {
        let required = pool.module_name(r.u16()?)?;
        let flags = r.u16()?;
        let _version = r.u16()?;
        module.requires.push((required, flags));
    }
    for table in 0..2 {
        for _ in 0..r.u16()? {
            let package = pool.package_name(r.u16()?)?;
            let flags = r.u16()?;
            let mut to = Vec::new();
            for _ in 0..r.u16()? {
                to.push(pool.module_name(r.u16()?)?);
            }
            if table == 0 {
                module.exports.push((package, flags, to));
            } else {
                module.opens.push((package, flags, to));
            }
        }
    }
    for _ in 0..r.u16()? {
        module.uses.push(pool.class_name(r.u16()?)?);
    }
    for _ in 0..r.u16()? {
        let service = pool.class_name(r.u16()?)?;
        let mut with = Vec::new();
        for _ in 0..r.u16()? {
            with.push(pool.class_name(r.u16()?)?);
        }
        module.provides.push((service, with));
    }
    Ok(module)
}

fn read_annotations(
    r: &mut Reader<'_>,
    pool: &Pool,
    visible: bool,
    out: &mut Vec<AnnotationItem>,
) -> Result<()> {
    for _ in 0..r.u16()? {
        out.push(read_annotation(r, pool, visible)?);
    }
    Ok(())
}

fn read_parameter_annotations(
    r: &mut Reader<'_>,
    pool: &Pool,
    visible: bool,
    out: &mut Option<Vec<Vec<AnnotationItem>>>,
) -> Result<()> {
    let num_params = r.u8()? as usize;
    let table = out.get_or_insert_with(|| vec![Vec::new(); num_params]);
    while table.len() < num_params {
        table.push(Vec::new());
    }
    for param in table.iter_mut().take(num_params) {
        for _ in 0..r.u16()? {
            param.push(read_annotation(r, pool, visible)?);
        }
    }
    Ok(())
}

fn read_annotation(r: &mut Reader<'_>, pool: &Pool, visible: bool) -> Result<AnnotationItem> {
    let type_descriptor = pool.utf8(r.u16()?)?;
    let mut values = Vec::new();
    for _ in 0..r.u16()? {
        let name = pool.utf8(r.u16()?)?;
        let value = read_element_value(r, pool, visible)?;
        values.push((name, value));
    }
    Ok(AnnotationItem {
        type_descriptor,
        values,
        visible,
    })
}

fn read_element_value(r: &mut Reader<'_>, pool: &Pool, visible: bool) -> Result<ElementValue> {
    let tag = r.u8()?;
    Ok(match tag {
        b'B' => ElementValue::Const(ElemConst::Byte(pool.integer(r.u16()?)? as i8)),
        b'C' => ElementValue::Const(ElemConst::Char(pool.integer(r.u16()?)? as u16)),
        b'S' => ElementValue::Const(ElemConst::Short(pool.integer(r.u16()?)? as i16)),
        b'Z' => ElementValue::Const(ElemConst::Bool(pool.integer(r.u16()?)? != 0)),
        b'I' => ElementValue::Const(ElemConst::Int(pool.integer(r.u16()?)?)),
        b'J' => ElementValue::Const(ElemConst::Long(pool.long(r.u16()?)?)),
        b'F' => ElementValue::Const(ElemConst::Float(pool.float(r.u16()?)?)),
        b'D' => ElementValue::Const(ElemConst::Double(pool.double(r.u16()?)?)),
        b's' => ElementValue::Const(ElemConst::Str(pool.utf8(r.u16()?)?)),
        b'e' => ElementValue::EnumConst {
            type_descriptor: pool.utf8(r.u16()?)?,
            const_name: pool.utf8(r.u16()?)?,
        },
        b'c' => ElementValue::ClassInfo(pool.utf8(r.u16()?)?),
        b'@' => ElementValue::Annotation(Box::new(read_annotation(r, pool, visible)?)),
        b'[' => {
            let mut values = Vec::new();
            for _ in 0..r.u16()? {
                values.push(read_element_value(r, pool, visible)?);
            }
            ElementValue::Array(values)
        }
        _ => return Err(ClassFileError::BadAttribute("element_value")),
    })
}

fn read_type_annotations(
    r: &mut Reader<'_>,
    pool: &Pool,
    visible: bool,
    out: &mut Vec<TypeAnnotationItem>,
) -> Result<()> {
    for _ in 0..r.u16()? {
        let tag = r.u8()?;
        let target = match tag {
            0x00 => TargetInfo::ClassTypeParameter(r.u8()?),
            0x01 => TargetInfo::MethodTypeParameter(r.u8()?),
            0x10 => TargetInfo::Supertype(r.u16()?),
            0x11 => {
                let i = r.u8()?;
                let j = r.u8()?;
                TargetInfo::ClassTypeParameterBound(i, j)
            }
            0x12 => {
                let i = r.u8()?;
                let j = r.u8()?;
                TargetInfo::MethodTypeParameterBound(i, j)
            }
            0x13 => TargetInfo::Field,
            0x14 => TargetInfo::MethodReturn,
            0x15 => TargetInfo::MethodReceiver,
            0x16 => TargetInfo::MethodFormalParameter(r.u8()?),
            0x17 => TargetInfo::Throws(r.u16()?),
            _ => return Err(ClassFileError::BadAttribute("type annotation target")),
        };
        let mut path = Vec::new();
        for _ in 0..r.u8()? {
            let kind = r.u8()?;
            let arg = r.u8()?;
            path.push(match kind {
                0 => TypePathStep::Array,
                1 => TypePathStep::Nested,
                2 => TypePathStep::Wildcard,
                3 => TypePathStep::TypeArgument(arg),
                _ => return Err(ClassFileError::BadAttribute("type path")),
            });
        }
        let annotation = read_annotation(r, pool, visible)?;
        out.push(TypeAnnotationItem {
            target,
            path,
            annotation,
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Raw constant pool
// ---------------------------------------------------------------------------

#[derive(Clone, Debug)]
enum RawEntry {
    Utf8(String),
    Integer(i32),
    Float(f32),
    Long(i64),
    Double(f64),
    Class(u16),
    Str(u16),
    Module(u16),
    Package(u16),
    /// A slot we do not model (method refs etc.) or the phantom second slot
    /// of a wide entry.
    Opaque,
}

struct Pool {
    entries: Vec<RawEntry>,
}

impl Pool {
    fn parse(r: &mut Reader<'_>) -> Result<Pool> {
        let count = r.u16()?;
        let mut entries = vec![RawEntry::Opaque]; // index 0 is unused
        while entries.len() < count as usize {
            let tag = r.u8()?;
            let entry = match tag {
                1 => {
                    let len = r.u16()? as usize;
                    let bytes = r.bytes(len)?;
                    RawEntry::Utf8(decode_modified_utf8(bytes))
                }
                3 => RawEntry::Integer(r.u32()? as i32),
                4 => RawEntry::Float(f32::from_bits(r.u32()?)),
                5 => RawEntry::Long(r.u64()? as i64),
                6 => RawEntry::Double(f64::from_bits(r.u64()?)),
                7 => RawEntry::Class(r.u16()?),
                8 => RawEntry::Str(r.u16()?),
                9 | 10 | 11 | 12 | 17 | 18 => {
                    r.bytes(4)?;
                    RawEntry::Opaque
                }
                15 => {
                    r.bytes(3)?;
                    RawEntry::Opaque
                }
                16 => {
                    r.bytes(2)?;
                    RawEntry::Opaque
                }
                19 => RawEntry::Module(r.u16()?),
                20 => RawEntry::Package(r.u16()?),
                _ => return Err(ClassFileError::BadPoolEntry(tag, entries.len() as u16)),
            };
            let wide = matches!(entry, RawEntry::Long(_) | RawEntry::Double(_));
            entries.push(entry);
            if wide {
                entries.push(RawEntry::Opaque);
            }
        }
        Ok(Pool { entries })
    }

    fn get(&self, idx: u16) -> Result<&RawEntry> {
        self.entries
            .get(idx as usize)
            .ok_or(ClassFileError::BadPoolIndex(idx))
    }

    fn utf8(&self, idx: u16) -> Result<String> {
        match self.get(idx)? {
            RawEntry::Utf8(text) => Ok(text.clone()),
            _ => Err(ClassFileError::BadPoolIndex(idx)),
        }
    }

    fn class_name(&self, idx: u16) -> Result<String> {
        match self.get(idx)? {
            RawEntry::Class(utf8) => self.utf8(*utf8),
            _ => Err(ClassFileError::BadPoolIndex(idx)),
        }
    }

    fn module_name(&self, idx: u16) -> Result<String> {
        match self.get(idx)? {
            RawEntry::Module(utf8) => self.utf8(*utf8),
            _ => Err(ClassFileError::BadPoolIndex(idx)),
        }
    }

    fn package_name(&self, idx: u16) -> Result<String> {
        match self.get(idx)? {
            RawEntry::Package(utf8) => self.utf8(*utf8),
            _ => Err(ClassFileError::BadPoolIndex(idx)),
        }
    }

    fn integer(&self, idx: u16) -> Result<i32> {
        match self.get(idx)? {
            RawEntry::Integer(v) => Ok(*v),
            _ => Err(ClassFileError::BadPoolIndex(idx)),
        }
    }

    fn long(&self, idx: u16) -> Result<i64> {
        match self.get(idx)? {
            RawEntry::Long(v) => Ok(*v),
            _ => Err(ClassFileError::BadPoolIndex(idx)),
        }
    }

    fn float(&self, idx: u16) -> Result<f32> {
        match self.get(idx)? {
            RawEntry::Float(v) => Ok(*v),
            _ => Err(ClassFileError::BadPoolIndex(idx)),
        }
    }

    fn double(&self, idx: u16) -> Result<f64> {
        match self.get(idx)? {
            RawEntry::Double(v) => Ok(*v),
            _ => Err(ClassFileError::BadPoolIndex(idx)),
        }
    }

    /// A `ConstantValue` payload, interpreted through the field descriptor.
    fn constant(&self, idx: u16, descriptor: &str) -> Result<ElemConst> {
        Ok(match (self.get(idx)?, descriptor) {
            (RawEntry::Integer(v), "Z") => ElemConst::Bool(*v != 0),
            (RawEntry::Integer(v), "B") => ElemConst::Byte(*v as i8),
            (RawEntry::Integer(v), "C") => ElemConst::Char(*v as u16),
            (RawEntry::Integer(v), "S") => ElemConst::Short(*v as i16),
            (RawEntry::Integer(v), _) => ElemConst::Int(*v),
            (RawEntry::Long(v), _) => ElemConst::Long(*v),
            (RawEntry::Float(v), _) => ElemConst::Float(*v),
            (RawEntry::Double(v), _) => ElemConst::Double(*v),
            (RawEntry::Str(utf8), _) => ElemConst::Str(self.utf8(*utf8)?),
            _ => return Err(ClassFileError::BadPoolIndex(idx)),
        })
    }
}

// ---------------------------------------------------------------------------
// Byte cursor
// ---------------------------------------------------------------------------

struct Reader<'b> {
    bytes: &'b [u8],
    pos: usize,
}

impl<'b> Reader<'b> {
    fn u8(&mut self) -> Result<u8> {
        let b = *self
            .bytes
            .get(self.pos)
            .ok_or(ClassFileError::Truncated(self.pos))?;
        self.pos += 1;
        Ok(b)
    }

    fn u16(&mut self) -> Result<u16> {
        let bytes = self.bytes(2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    fn u32(&mut self) -> Result<u32> {
        let bytes = self.bytes(4)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn u64(&mut self) -> Result<u64> {
        let hi = self.u32()? as u64;
        let lo = self.u32()? as u64;
        Ok((hi << 32) | lo)
    }

    fn bytes(&mut self, len: usize) -> Result<&'b [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .ok_or(ClassFileError::Truncated(self.pos))?;
        if end > self.bytes.len() {
            return Err(ClassFileError::Truncated(self.pos));
        }
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    /// A sub-reader over the next `len` bytes (one attribute's payload).
    fn sub(&mut self, len: usize) -> Result<Reader<'b>> {
        let bytes = self.bytes(len)?;
        Ok(Reader { bytes, pos: 0 })
    }
}
