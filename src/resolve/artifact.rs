use crate::jvm::class_file::ClassFile;
use crate::Error;
use std::io::{Cursor, Read};
use zip::ZipArchive;

/// Entry prefix of classes that only apply to newer runtimes in a multi-release jar
const MULTI_RELEASE_PREFIX: &str = "META-INF/versions/";

/// Classes packed inside one artifact, in the order in which they were found
///
/// The format is detected from the magic bytes: `PK` is a jar (zip archive), and `0xCAFEBABE` is
/// a single class file. Jar entries that aren't class files are ignored, as are multi-release
/// overrides and `module-info.class`.
pub fn read_classes(bytes: &[u8]) -> Result<Vec<ClassFile>, Error> {
    match bytes {
        [0x50, 0x4B, ..] => read_jar(bytes),
        [0xCA, 0xFE, 0xBA, 0xBE, ..] => ClassFile::parse(bytes)
            .map(|class_file| vec![class_file])
            .map_err(|err| Error::MalformedArtifact(format!("class file: {}", err))),
        _ => Err(Error::MalformedArtifact(String::from(
            "neither a jar nor a class file",
        ))),
    }
}

fn read_jar(bytes: &[u8]) -> Result<Vec<ClassFile>, Error> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    let mut classes = vec![];
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let name = entry.name().to_owned();
        if entry.is_dir()
            || !name.ends_with(".class")
            || name.starts_with(MULTI_RELEASE_PREFIX)
            || name.ends_with("module-info.class")
        {
            continue;
        }

        // The declared size comes from the jar itself, so it can't be trusted for pre-sizing
        let mut class_bytes = vec![];
        entry
            .read_to_end(&mut class_bytes)
            .map_err(|err| Error::MalformedArtifact(format!("{}: {}", name, err)))?;
        let class_file = ClassFile::parse(&class_bytes)
            .map_err(|err| Error::MalformedArtifact(format!("{}: {}", name, err)))?;
        classes.push(class_file);
    }
    Ok(classes)
}
