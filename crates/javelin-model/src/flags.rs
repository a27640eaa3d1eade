//! Access flags.
//!
//! The low 16 bits mirror the class-file encoding exactly and are what the
//! writer emits. Bits 16 and up are source-only: `sealed` and `non-sealed`
//! have no class-file bit, and `default` methods are recognised by the
//! absence of other bits, but binding wants them explicit.

use bitflags::bitflags;

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct AccessFlags: u32 {
        const PUBLIC = 0x0001;
        const PRIVATE = 0x0002;
        const PROTECTED = 0x0004;
        const STATIC = 0x0008;
        const FINAL = 0x0010;
        /// `ACC_SUPER` on classes, `ACC_SYNCHRONIZED` on methods.
        const SUPER = 0x0020;
        const SYNCHRONIZED = 0x0020;
        /// `ACC_VOLATILE` on fields, `ACC_BRIDGE` on methods.
        const VOLATILE = 0x0040;
        const BRIDGE = 0x0040;
        /// `ACC_TRANSIENT` on fields, `ACC_VARARGS` on methods.
        const TRANSIENT = 0x0080;
        const VARARGS = 0x0080;
        const NATIVE = 0x0100;
        const INTERFACE = 0x0200;
        const ABSTRACT = 0x0400;
        const STRICT = 0x0800;
        const SYNTHETIC = 0x1000;
        const ANNOTATION = 0x2000;
        const ENUM = 0x4000;
        /// `ACC_MODULE` on classes, `ACC_MANDATED` on parameters.
        const MODULE = 0x8000;
        const MANDATED = 0x8000;

        // Source-only bits, masked off by the class-file writer.
        const SEALED = 0x1_0000;
        const NON_SEALED = 0x2_0000;
        const DEFAULT_METHOD = 0x4_0000;
        const COMPACT_RECORD_CTOR = 0x8_0000;
    }
}

impl AccessFlags {
    /// The 16 bits that exist in the class-file format.
    pub fn classfile_bits(self) -> u16 {
        (self.bits() & 0xFFFF) as u16
    }

    pub fn from_classfile_bits(bits: u16) -> Self {
        AccessFlags::from_bits_retain(bits as u32)
    }

    pub fn is_private(self) -> bool {
        self.contains(AccessFlags::PRIVATE)
    }

    pub fn is_static(self) -> bool {
        self.contains(AccessFlags::STATIC)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_only_bits_do_not_leak() {
        let flags = AccessFlags::PUBLIC | AccessFlags::SEALED | AccessFlags::NON_SEALED;
        assert_eq!(flags.classfile_bits(), 0x0001);
        assert!(flags.contains(AccessFlags::SEALED));
    }
}
