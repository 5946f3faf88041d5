#![allow(dead_code)]

use refguard::assertion::{
    ArtifactCoordinate, ArtifactResolver, ResolvedArtifact, ResolverFailure,
};
use refguard::jvm::code::{Instruction, InvokeType};
use refguard::jvm::{BinaryName, ClassAccessFlags, ClassBuilder, MethodAccessFlags, Name};
use refguard::reference::InstrumentationModule;
use refguard::version::VersionRange;
use std::collections::HashMap;
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn name(name: &str) -> BinaryName {
    BinaryName::from_string(name.to_owned()).unwrap()
}

/// Library class with public, body-less methods
pub struct LibraryClass {
    builder: ClassBuilder,
    name: String,
}

impl LibraryClass {
    pub fn new(class: &str) -> LibraryClass {
        LibraryClass::with_super(class, "java/lang/Object")
    }

    pub fn with_super(class: &str, super_class: &str) -> LibraryClass {
        LibraryClass::with_flags(ClassAccessFlags::PUBLIC, class, super_class)
    }

    pub fn interface(class: &str) -> LibraryClass {
        let flags =
            ClassAccessFlags::PUBLIC | ClassAccessFlags::INTERFACE | ClassAccessFlags::ABSTRACT;
        LibraryClass::with_flags(flags, class, "java/lang/Object")
    }

    pub fn with_flags(flags: ClassAccessFlags, class: &str, super_class: &str) -> LibraryClass {
        LibraryClass {
            builder: ClassBuilder::new(flags, &name(class), Some(&name(super_class))).unwrap(),
            name: class.to_owned(),
        }
    }

    pub fn implements(mut self, interface: &str) -> LibraryClass {
        self.builder.add_interface(interface).unwrap();
        self
    }

    pub fn method(self, method: &str, descriptor: &str) -> LibraryClass {
        self.method_with_flags(MethodAccessFlags::PUBLIC, method, descriptor)
    }

    pub fn method_with_flags(
        mut self,
        flags: MethodAccessFlags,
        method: &str,
        descriptor: &str,
    ) -> LibraryClass {
        self.builder
            .add_abstract_method(flags, method, descriptor)
            .unwrap();
        self
    }

    /// Jar entry name and class bytes
    pub fn entry(self) -> (String, Vec<u8>) {
        (format!("{}.class", self.name), self.builder.to_bytes().unwrap())
    }
}

pub fn jar(classes: Vec<LibraryClass>) -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    zip.start_file("META-INF/MANIFEST.MF", options).unwrap();
    zip.write_all(b"Manifest-Version: 1.0\n").unwrap();
    for class in classes {
        let (entry, bytes) = class.entry();
        zip.start_file(entry, options).unwrap();
        zip.write_all(&bytes).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

/// Instrumentation module with a single advice class whose one method makes the given calls
///
/// Each call is `(owner, method, descriptor)`. Calls to `<init>` are preceded by a `new` of the
/// owner, and every other call is an `invokevirtual`.
pub fn module(module_name: &str, calls: &[(&str, &str, &str)]) -> InstrumentationModule {
    let advice_name = format!("agent/{}/Advice", module_name.replace('-', "_"));
    let mut builder = ClassBuilder::new(
        ClassAccessFlags::PUBLIC,
        &name(&advice_name),
        Some(&BinaryName::OBJECT),
    )
    .unwrap();

    let mut body = vec![];
    for (owner, method, descriptor) in calls {
        let method_ref = builder
            .constants
            .get_method_ref(owner, method, descriptor, false)
            .unwrap();
        if *method == "<init>" {
            let class = builder.constants.get_class(owner).unwrap();
            body.push(Instruction::New(class));
            body.push(Instruction::DUP);
            body.push(Instruction::Invoke(InvokeType::Special, method_ref));
        } else {
            body.push(Instruction::ACONST_NULL);
            body.push(Instruction::Invoke(InvokeType::Virtual, method_ref));
        }
    }
    body.push(Instruction::RETURN);
    builder
        .add_method(
            MethodAccessFlags::PUBLIC | MethodAccessFlags::STATIC,
            "onEnter",
            "()V",
            &body,
        )
        .unwrap();

    let bytes = builder.to_bytes().unwrap();
    InstrumentationModule::from_class_bytes(module_name, &[bytes]).unwrap()
}

/// Artifact resolver backed by jars held in memory
#[derive(Default)]
pub struct InMemoryResolver {
    /// `group:artifact` to versions, in publication order
    versions: HashMap<String, Vec<String>>,

    /// `group:artifact:version` to jar bytes
    jars: HashMap<String, Vec<u8>>,

    /// `group:artifact:version` to runtime dependencies
    dependencies: HashMap<String, Vec<ArtifactCoordinate>>,
}

impl InMemoryResolver {
    pub fn new() -> InMemoryResolver {
        InMemoryResolver::default()
    }

    pub fn publish(mut self, coordinate: &str, jar: Vec<u8>) -> InMemoryResolver {
        let coordinate = ArtifactCoordinate::parse(coordinate).unwrap();
        let version = coordinate.version.clone().unwrap();
        self.versions
            .entry(format!("{}:{}", coordinate.group, coordinate.artifact))
            .or_default()
            .push(version);
        self.jars.insert(coordinate.to_string(), jar);
        self
    }

    pub fn depends_on(mut self, coordinate: &str, dependency: &str) -> InMemoryResolver {
        self.dependencies
            .entry(coordinate.to_owned())
            .or_default()
            .push(ArtifactCoordinate::parse(dependency).unwrap());
        self
    }

    fn fetch_one(
        &self,
        coordinate: &ArtifactCoordinate,
    ) -> Result<ResolvedArtifact, ResolverFailure> {
        match self.jars.get(&coordinate.to_string()) {
            Some(bytes) => Ok(ResolvedArtifact {
                coordinate: coordinate.clone(),
                bytes: bytes.clone(),
            }),
            None => Err(ResolverFailure::new(format!("{} not found", coordinate))),
        }
    }
}

impl ArtifactResolver for InMemoryResolver {
    fn resolve_candidate_versions(
        &self,
        group: &str,
        artifact: &str,
        range: &VersionRange,
    ) -> Result<Vec<String>, ResolverFailure> {
        match self.versions.get(&format!("{}:{}", group, artifact)) {
            Some(versions) => Ok(versions
                .iter()
                .filter(|version| range.contains(version))
                .cloned()
                .collect()),
            None => Err(ResolverFailure::new(format!(
                "no versions of {}:{}",
                group, artifact
            ))),
        }
    }

    fn fetch_artifact_bytes(
        &self,
        coordinate: &ArtifactCoordinate,
    ) -> Result<Vec<ResolvedArtifact>, ResolverFailure> {
        let mut artifacts = vec![self.fetch_one(coordinate)?];
        if let Some(dependencies) = self.dependencies.get(&coordinate.to_string()) {
            for dependency in dependencies {
                artifacts.push(self.fetch_one(dependency)?);
            }
        }
        Ok(artifacts)
    }
}
