//! Output writing: class directories and deterministic jars.

use anyhow::{Context, Result};
use javelin_classfile::ClassFile;
use std::io::Write;
use std::path::Path;

/// A class ready to be written, with its archive-relative path.
pub struct OutputClass {
    pub path: String,
    pub bytes: Vec<u8>,
}

/// The archive-relative path for a lowered class. Module descriptors go
/// into a directory named after their module when the compilation declares
/// more than one module.
pub fn class_path(cf: &ClassFile, module_count: usize) -> String {
    match &cf.module {
        Some(module) if module_count > 1 => format!("{}/module-info.class", module.name),
        Some(_) => "module-info.class".to_string(),
        None => format!("{}.class", cf.name),
    }
}

pub fn write_directory(root: &Path, classes: &[OutputClass]) -> Result<()> {
    for class in classes {
        let path = root.join(&class.path);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        std::fs::write(&path, &class.bytes)
            .with_context(|| format!("writing {}", path.display()))?;
    }
    Ok(())
}

/// Write a deterministic jar: fixed timestamps, manifest first, then the
/// classes in registration order.
pub fn write_jar(path: &Path, classes: &[OutputClass]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
    }
    let file = std::fs::File::create(path)
        .with_context(|| format!("creating {}", path.display()))?;
    let mut jar = zip::ZipWriter::new(file);
    let options = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated)
        .last_modified_time(zip::DateTime::default());

    jar.start_file("META-INF/MANIFEST.MF", options)?;
    jar.write_all(b"Manifest-Version: 1.0\n\n")?;
    for class in classes {
        jar.start_file(class.path.as_str(), options)?;
        jar.write_all(&class.bytes)?;
    }
    jar.finish()?;
    Ok(())
}
