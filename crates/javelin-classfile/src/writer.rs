//! Class-file serialisation.
//!
//! The body (everything after the constant pool) is serialised first into a
//! scratch buffer while the pool fills up; the final image is then header,
//! pool, body. Attribute order within a table follows the order attributes
//! are listed in `ClassFile`, which is stable across runs.

use crate::class::*;
use crate::error::ClassFileError;
use crate::pool::ConstPool;
use crate::MAGIC;

type Result<T> = std::result::Result<T, ClassFileError>;

pub fn write_class(cf: &ClassFile) -> Result<Vec<u8>> {
    let mut pool = ConstPool::new();
    let mut body = Vec::with_capacity(1024);

    push_u16(&mut body, cf.access);
    let this_idx = pool.class(&cf.name)?;
    push_u16(&mut body, this_idx);
    let super_idx = match &cf.super_name {
        Some(name) => pool.class(name)?,
        None => 0,
    };
    push_u16(&mut body, super_idx);
    push_u16(&mut body, cf.interfaces.len() as u16);
    for iface in &cf.interfaces {
        let idx = pool.class(iface)?;
        push_u16(&mut body, idx);
    }

    push_u16(&mut body, cf.fields.len() as u16);
    for field in &cf.fields {
        write_field(&mut pool, field, &mut body)?;
    }
    push_u16(&mut body, cf.methods.len() as u16);
    for method in &cf.methods {
        write_method(&mut pool, method, &mut body)?;
    }

    let mut attrs = Attrs::new();
    if let Some(sig) = &cf.signature {
        attrs.signature(&mut pool, sig)?;
    }
    if !cf.inner_classes.is_empty() {
        let mut content = Vec::new();
        push_u16(&mut content, cf.inner_classes.len() as u16);
        for entry in &cf.inner_classes {
            let inner = pool.class(&entry.inner)?;
            push_u16(&mut content, inner);
            let outer = match &entry.outer {
                Some(name) => pool.class(name)?,
                None => 0,
            };
            push_u16(&mut content, outer);
            let name = match &entry.inner_name {
                Some(simple) => pool.utf8(simple)?,
                None => 0,
            };
            push_u16(&mut content, name);
            push_u16(&mut content, entry.access);
        }
        attrs.push(&mut pool, "InnerClasses", content)?;
    }
    if !cf.permitted_subclasses.is_empty() {
        let mut content = Vec::new();
        push_u16(&mut content, cf.permitted_subclasses.len() as u16);
        for name in &cf.permitted_subclasses {
            let idx = pool.class(name)?;
            push_u16(&mut content, idx);
        }
        attrs.push(&mut pool, "PermittedSubclasses", content)?;
    }
    if let Some(host) = &cf.nest_host {
        let mut content = Vec::new();
        let idx = pool.class(host)?;
        push_u16(&mut content, idx);
        attrs.push(&mut pool, "NestHost", content)?;
    }
    if !cf.nest_members.is_empty() {
        let mut content = Vec::new();
        push_u16(&mut content, cf.nest_members.len() as u16);
        for name in &cf.nest_members {
            let idx = pool.class(name)?;
            push_u16(&mut content, idx);
        }
        attrs.push(&mut pool, "NestMembers", content)?;
    }
    if !cf.record_components.is_empty() {
        let mut content = Vec::new();
        push_u16(&mut content, cf.record_components.len() as u16);
        for component in &cf.record_components {
            let name = pool.utf8(&component.name)?;
            push_u16(&mut content, name);
            let desc = pool.utf8(&component.descriptor)?;
            push_u16(&mut content, desc);
            let mut comp_attrs = Attrs::new();
            if let Some(sig) = &component.signature {
                comp_attrs.signature(&mut pool, sig)?;
            }
            comp_attrs.annotations(&mut pool, &component.annotations)?;
            comp_attrs.type_annotations(&mut pool, &component.type_annotations)?;
            comp_attrs.serialize(&mut content);
        }
        attrs.push(&mut pool, "Record", content)?;
    }
    if let Some(module) = &cf.module {
        let content = write_module(&mut pool, module)?;
        attrs.push(&mut pool, "Module", content)?;
    }
    if cf.deprecated {
        attrs.push(&mut pool, "Deprecated", Vec::new())?;
    }
    attrs.annotations(&mut pool, &cf.annotations)?;
    attrs.type_annotations(&mut pool, &cf.type_annotations)?;
    attrs.serialize(&mut body);

    let mut out = Vec::with_capacity(body.len() + 512);
    out.extend_from_slice(&MAGIC.to_be_bytes());
    push_u16(&mut out, cf.minor);
    push_u16(&mut out, cf.major);
    push_u16(&mut out, pool.count());
    pool.serialize(&mut out);
    out.extend_from_slice(&body);
    Ok(out)
}

fn write_field(pool: &mut ConstPool, field: &FieldItem, out: &mut Vec<u8>) -> Result<()> {
    push_u16(out, field.access);
    let name = pool.utf8(&field.name)?;
    push_u16(out, name);
    let desc = pool.utf8(&field.descriptor)?;
    push_u16(out, desc);
    let mut attrs = Attrs::new();
    if let Some(constant) = &field.constant {
        let mut content = Vec::new();
        let idx = const_pool_index(pool, constant)?;
        push_u16(&mut content, idx);
        attrs.push(pool, "ConstantValue", content)?;
    }
    if let Some(sig) = &field.signature {
        attrs.signature(pool, sig)?;
    }
    if field.deprecated {
        attrs.push(pool, "Deprecated", Vec::new())?;
    }
    attrs.annotations(pool, &field.annotations)?;
    attrs.type_annotations(pool, &field.type_annotations)?;
    attrs.serialize(out);
    Ok(())
}

fn write_method(pool: &mut ConstPool, method: &MethodItem, out: &mut Vec<u8>) -> Result<()> {
    push_u16(out, method.access);
    let name = pool.utf8(&method.name)?;
    push_u16(out, name);
    let desc = pool.utf8(&method.descriptor)?;
    push_u16(out, desc);
    let mut attrs = Attrs::new();
    if !method.exceptions.is_empty() {
        let mut content = Vec::new();
        push_u16(&mut content, method.exceptions.len() as u16);
        for exception in &method.exceptions {
            let idx = pool.class(exception)?;
            push_u16(&mut content, idx);
        }
        attrs.push(pool, "Exceptions", content)?;
    }
    if let Some(sig) = &method.signature {
        attrs.signature(pool, sig)?;
    }
    if !method.method_parameters.is_empty() {
        let mut content = Vec::new();
        content.push(method.method_parameters.len() as u8);
        for (name, flags) in &method.method_parameters {
            let idx = match name {
                Some(name) => pool.utf8(name)?,
                None => 0,
            };
            push_u16(&mut content, idx);
            push_u16(&mut content, *flags);
        }
        attrs.push(pool, "MethodParameters", content)?;
    }
    if let Some(default) = &method.annotation_default {
        let mut content = Vec::new();
        write_element_value(pool, default, &mut content)?;
        attrs.push(pool, "AnnotationDefault", content)?;
    }
    if method.deprecated {
        attrs.push(pool, "Deprecated", Vec::new())?;
    }
    attrs.annotations(pool, &method.annotations)?;
    if let Some(param_annos) = &method.parameter_annotations {
        for visible in [true, false] {
            if !param_annos.iter().flatten().any(|a| a.visible == visible) {
                continue;
            }
            let mut content = Vec::new();
            content.push(param_annos.len() as u8);
            for per_param in param_annos {
                let matching: Vec<_> =
                    per_param.iter().filter(|a| a.visible == visible).collect();
                push_u16(&mut content, matching.len() as u16);
                for anno in matching {
                    write_annotation(pool, anno, &mut content)?;
                }
            }
            let name = if visible {
                "RuntimeVisibleParameterAnnotations"
            } else {
                "RuntimeInvisibleParameterAnnotations"
            };
            attrs.push(pool, name, content)?;
        }
    }
    attrs.type_annotations(pool, &method.type_annotations)?;
    attrs.serialize(out);
    Ok(())
}

fn write_module(pool: &mut ConstPool, module: &ModuleItem) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let name = pool.module(&module.name)?;
    push_u16(&mut out, name);
    push_u16(&mut out, module.flags);
    push_u16(&mut out, 0); // module_version_index
    push_u16(&mut out, module.requires.len() as u16);
    for (required, flags) in &module.requires {
        let idx = pool.module(required)?;
        push_u16(&mut out, idx);
        push_u16(&mut out, *flags);
        push_u16(&mut out, 0); // requires_version_index
    }
    for table in [&module.exports, &module.opens] {
        push_u16(&mut out, table.len() as u16);
        for (package, flags, to) in table.iter() {
            let idx = pool.package(package)?;
            push_u16(&mut out, idx);
            push_u16(&mut out, *flags);
            push_u16(&mut out, to.len() as u16);
            for target in to {
                let idx = pool.module(target)?;
                push_u16(&mut out, idx);
            }
        }
    }
    push_u16(&mut out, module.uses.len() as u16);
    for service in &module.uses {
        let idx = pool.class(service)?;
        push_u16(&mut out, idx);
    }
    push_u16(&mut out, module.provides.len() as u16);
    for (service, impls) in &module.provides {
        let idx = pool.class(service)?;
        push_u16(&mut out, idx);
        push_u16(&mut out, impls.len() as u16);
        for implementation in impls {
            let idx = pool.class(implementation)?;
            push_u16(&mut out, idx);
        }
    }
    Ok(out)
}

/// An attribute table under construction: `(name_index, content)` pairs.
struct Attrs {
    list: Vec<(u16, Vec<u8>)>,
}

impl Attrs {
    fn new() -> Self {
        Attrs { list: Vec::new() }
    }

    fn push(&mut self, pool: &mut ConstPool, name: &str, content: Vec<u8>) -> Result<()> {
        let name_idx = pool.utf8(name)?;
        self.list.push((name_idx, content));
        Ok(())
    }

    fn signature(&mut self, pool: &mut ConstPool, sig: &str) -> Result<()> {
        let mut content = Vec::new();
        let idx = pool.utf8(sig)?;
        push_u16(&mut content, idx);
        self.push(pool, "Signature", content)
    }

    /// The visible and invisible annotation tables, either omitted if empty.
    fn annotations(&mut self, pool: &mut ConstPool, annos: &[AnnotationItem]) -> Result<()> {
        for visible in [true, false] {
            let matching: Vec<_> = annos.iter().filter(|a| a.visible == visible).collect();
            if matching.is_empty() {
                continue;
            }
            let mut content = Vec::new();
            push_u16(&mut content, matching.len() as u16);
            for anno in matching {
                write_annotation(pool, anno, &mut content)?;
            }
            let name = if visible {
                "RuntimeVisibleAnnotations"
            } else {
                "RuntimeInvisibleAnnotations"
            };
            self.push(pool, name, content)?;
        }
        Ok(())
    }

    fn type_annotations(
        &mut self,
        pool: &mut ConstPool,
        annos: &[TypeAnnotationItem],
    ) -> Result<()> {
        for visible in [true, false] {
            let matching: Vec<_> = annos
                .iter()
                .filter(|a| a.annotation.visible == visible)
                .collect();
            if matching.is_empty() {
                continue;
            }
            let mut content = Vec::new();
            push_u16(&mut content, matching.len() as u16);
            for ta in matching {
                write_type_annotation(pool, ta, &mut content)?;
            }
            let name = if visible {
                "RuntimeVisibleTypeAnnotations"
            } else {
                "RuntimeInvisibleTypeAnnotations"
            };
            self.push(pool, name, content)?;
        }
        Ok(())
    }

    fn serialize(self, out: &mut Vec<u8>) {
        push_u16(out, self.list.len() as u16);
        for (name_idx, content) in self.list {
            push_u16(out, name_idx);
            out.extend_from_slice(&(content.len() as u32).to_be_bytes());
            out.extend_from_slice(&content);
        }
    }
}

fn write_annotation(pool: &mut ConstPool, anno: &AnnotationItem, out: &mut Vec<u8>) -> Result<()> {
    let type_idx = pool.utf8(&anno.type_descriptor)?;
    push_u16(out, type_idx);
    push_u16(out, anno.values.len() as u16);
    for (name, value) in &anno.values {
        let name_idx = pool.utf8(name)?;
        push_u16(out, name_idx);
        write_element_value(pool, value, out)?;
    }
    Ok(())
}

fn write_element_value(pool: &mut ConstPool, value: &ElementValue, out: &mut Vec<u8>) -> Result<()> {
    match value {
        ElementValue::Const(c) => {
            let (tag, idx) = match c {
                ElemConst::Byte(v) => (b'B', pool.integer(*v as i32)?),
                ElemConst::Char(v) => (b'C', pool.integer(*v as i32)?),
                ElemConst::Double(v) => (b'D', pool.double(*v)?),
                ElemConst::Float(v) => (b'F', pool.float(*v)?),
                ElemConst::Int(v) => (b'I', pool.integer(*v)?),
                ElemConst::Long(v) => (b'J', pool.long(*v)?),
                ElemConst::Short(v) => (b'S', pool.integer(*v as i32)?),
                ElemConst::Bool(v) => (b'Z', pool.integer(*v as i32)?),
                ElemConst::Str(v) => (b's', pool.utf8(v)?),
            };
            out.push(tag);
            push_u16(out, idx);
        }
        ElementValue::EnumConst {
            type_descriptor,
            const_name,
        } => {
            out.push(b'e');
            let ty = pool.utf8(type_descriptor)?;
            push_u16(out, ty);
            let name = pool.utf8(const_name)?;
            push_u16(out, name);
        }
        ElementValue::ClassInfo(descriptor) => {
            out.push(b'c');
            let idx = pool.utf8(descriptor)?;
            push_u16(out, idx);
        }
        ElementValue::Annotation(anno) => {
            out.push(b'@');
            write_annotation(pool, anno, out)?;
        }
        ElementValue::Array(values) => {
            out.push(b'[');
            push_u16(out, values.len() as u16);
            for v in values {
                write_element_value(pool, v, out)?;
            }
        }
    }
    Ok(())
}

fn write_type_annotation(
    pool: &mut ConstPool,
    ta: &TypeAnnotationItem,
    out: &mut Vec<u8>,
) -> Result<()> {
    out.push(ta.target.tag());
    match ta.target {
        TargetInfo::ClassTypeParameter(i) | TargetInfo::MethodTypeParameter(i) => out.push(i),
        TargetInfo::Supertype(i) | TargetInfo::Throws(i) => push_u16(out, i),
        TargetInfo::ClassTypeParameterBound(i, j) | TargetInfo::MethodTypeParameterBound(i, j) => {
            out.push(i);
            out.push(j);
        }
        TargetInfo::Field | TargetInfo::MethodReturn | TargetInfo::MethodReceiver => {}
        TargetInfo::MethodFormalParameter(i) => out.push(i),
    }
    out.push(ta.path.len() as u8);
    for step in &ta.path {
        let (kind, arg) = step.encode();
        out.push(kind);
        out.push(arg);
    }
    write_annotation(pool, &ta.annotation, out)
}

/// The constant-pool entry for a `ConstantValue` attribute.
fn const_pool_index(pool: &mut ConstPool, c: &ElemConst) -> Result<u16> {
    match c {
        ElemConst::Byte(v) => pool.integer(*v as i32),
        ElemConst::Char(v) => pool.integer(*v as i32),
        ElemConst::Short(v) => pool.integer(*v as i32),
        ElemConst::Bool(v) => pool.integer(*v as i32),
        ElemConst::Int(v) => pool.integer(*v),
        ElemConst::Long(v) => pool.long(*v),
        ElemConst::Float(v) => pool.float(*v),
        ElemConst::Double(v) => pool.double(*v),
        ElemConst::Str(v) => pool.string(v),
    }
}

fn push_u16(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_be_bytes());
}
