//! Class-file errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClassFileError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("not a class file (bad magic {0:#010x})")]
    BadMagic(u32),
    #[error("truncated class file at offset {0}")]
    Truncated(usize),
    #[error("bad constant pool entry: tag {0} at index {1}")]
    BadPoolEntry(u8, u16),
    #[error("constant pool index {0} out of range or wrong kind")]
    BadPoolIndex(u16),
    #[error("malformed descriptor: {0}")]
    BadDescriptor(String),
    #[error("malformed signature: {0}")]
    BadSignature(String),
    #[error("malformed attribute {0}")]
    BadAttribute(&'static str),
    #[error("constant pool limit exceeded (more than 65534 entries)")]
    PoolOverflow,
}
