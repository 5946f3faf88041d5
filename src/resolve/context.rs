use super::{read_classes, ClassDescriptor};
use crate::jvm::class_file::ClassFile;
use crate::jvm::{self, BinaryName, Name};
use crate::Error;
use std::collections::HashMap;

/// Closed world of classes, built from exactly one set of artifacts
///
/// Nothing outside of the artifacts is ever consulted, with the sole exception of a built-in
/// description of `java/lang/Object` (see [`ClassDescriptor::object`]). The context is never
/// modified after construction: verifying a different library version means building a fresh
/// context.
#[derive(Debug)]
pub struct ResolutionContext {
    classes: HashMap<BinaryName, ClassDescriptor>,
}

impl ResolutionContext {
    /// Parse every class out of the given artifacts (jars or raw class files)
    ///
    /// When the same class is defined in more than one artifact, the definition in the earliest
    /// artifact wins, the same way it would on a classpath.
    pub fn from_artifacts<B: AsRef<[u8]>>(artifacts: &[B]) -> Result<ResolutionContext, Error> {
        let mut context = ResolutionContext {
            classes: HashMap::new(),
        };
        for (artifact_idx, artifact) in artifacts.iter().enumerate() {
            let class_files = read_classes(artifact.as_ref())?;
            log::trace!(
                "Artifact #{} contains {} classes",
                artifact_idx,
                class_files.len()
            );
            for class_file in &class_files {
                context.insert(class_file, artifact_idx).map_err(|err| {
                    Error::MalformedArtifact(format!("artifact #{}: {}", artifact_idx, err))
                })?;
            }
        }
        context.finish();
        log::debug!(
            "Built resolution context with {} classes from {} artifacts",
            context.classes.len(),
            artifacts.len()
        );
        Ok(context)
    }

    /// Build a context directly out of parsed class files
    pub fn from_class_files<'a>(
        class_files: impl IntoIterator<Item = &'a ClassFile>,
    ) -> Result<ResolutionContext, Error> {
        let mut context = ResolutionContext {
            classes: HashMap::new(),
        };
        for class_file in class_files {
            context.insert(class_file, 0)?;
        }
        context.finish();
        Ok(context)
    }

    fn insert(&mut self, class_file: &ClassFile, artifact_idx: usize) -> Result<(), jvm::Error> {
        let descriptor = ClassDescriptor::from_class_file(class_file)?;
        if self.classes.contains_key(&descriptor.name) {
            log::debug!(
                "Ignoring duplicate definition of {} in artifact #{}",
                descriptor.name,
                artifact_idx
            );
        } else {
            self.classes.insert(descriptor.name.clone(), descriptor);
        }
        Ok(())
    }

    fn finish(&mut self) {
        self.classes
            .entry(BinaryName::OBJECT)
            .or_insert_with(ClassDescriptor::object);
    }

    /// Look up a class by its binary name (eg. `java/lang/Object`)
    pub fn lookup_class(&self, name: &str) -> Option<&ClassDescriptor> {
        self.classes.get(name)
    }

    pub fn contains(&self, name: &BinaryName) -> bool {
        self.classes.contains_key(name.as_str())
    }

    /// Number of classes (including the built-in `java/lang/Object`)
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn class_names(&self) -> impl Iterator<Item = &BinaryName> + '_ {
        self.classes.keys()
    }
}
