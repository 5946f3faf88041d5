use crate::jvm::class_file::ClassFile;
use crate::jvm::BinaryName;
use crate::resolve::{read_classes, Platform};
use crate::Error;

/// Instrumentation code that gets woven into a library at runtime
///
/// The classes of a module are everything that ships with it, so references between them are
/// never checked against the library.
#[derive(Debug)]
pub struct InstrumentationModule {
    name: String,
    classes: Vec<ClassFile>,
}

impl InstrumentationModule {
    pub fn new(name: impl Into<String>, classes: Vec<ClassFile>) -> InstrumentationModule {
        InstrumentationModule {
            name: name.into(),
            classes,
        }
    }

    /// Module made out of raw class files
    pub fn from_class_bytes<B: AsRef<[u8]>>(
        name: impl Into<String>,
        class_bytes: &[B],
    ) -> Result<InstrumentationModule, Error> {
        let classes = class_bytes
            .iter()
            .map(|bytes| ClassFile::parse(bytes.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(InstrumentationModule::new(name, classes))
    }

    /// Module made out of every class in a jar
    pub fn from_jar(name: impl Into<String>, jar: &[u8]) -> Result<InstrumentationModule, Error> {
        Ok(InstrumentationModule::new(name, read_classes(jar)?))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn classes(&self) -> &[ClassFile] {
        &self.classes
    }
}

/// What counts as "outside of the library" when collecting references
#[derive(Clone, Debug, Default)]
pub struct ModuleConfig {
    pub platform: Platform,

    /// Internal-form prefixes of classes provided by the instrumentation framework itself (eg.
    /// `io/opentelemetry/javaagent/`)
    pub framework_prefixes: Vec<String>,
}

impl ModuleConfig {
    pub fn new(platform: Platform) -> ModuleConfig {
        ModuleConfig {
            platform,
            framework_prefixes: vec![],
        }
    }

    pub fn with_framework_prefix(mut self, prefix: &str) -> ModuleConfig {
        self.framework_prefixes.push(prefix.to_owned());
        self
    }

    /// Is this class provided by something other than the library being checked?
    pub fn is_provided(&self, class: &BinaryName) -> bool {
        self.platform.provides(class) || class.has_prefix(self.framework_prefixes.as_slice())
    }
}
