use super::{
    ClassRef, FieldRef, InstrumentationModule, MethodRef, ModuleConfig, Reference,
    ReferenceManifest,
};
use crate::jvm::class_file::ClassFile;
use crate::jvm::code::{Instruction, Instructions, InvokeType};
use crate::jvm::{
    self, BinaryName, Constant, ConstantIndex, ConstantPool, FieldType, MemberRefKind,
    MethodDescriptor, Name, ParseDescriptor, RefType, UnqualifiedName, Visibility,
};
use crate::Error;
use std::collections::{HashMap, HashSet};

/// Extracts the external references made by the bytecode of an instrumentation module
///
/// A class is external if it is not one of the module's own classes and is not provided by the
/// platform or the instrumentation framework (see [`ModuleConfig`]). Only references to
/// external classes (or to members of external classes) end up in the manifest.
#[derive(Clone, Debug, Default)]
pub struct ReferenceCollector {
    config: ModuleConfig,
}

impl ReferenceCollector {
    pub fn new(config: ModuleConfig) -> ReferenceCollector {
        ReferenceCollector { config }
    }

    pub fn config(&self) -> &ModuleConfig {
        &self.config
    }

    pub fn collect(&self, module: &InstrumentationModule) -> Result<ReferenceManifest, Error> {
        let mut module_classes: HashMap<BinaryName, ModuleClass> = HashMap::new();
        for class_file in module.classes() {
            let name = binary_name(class_file.this_class_name()?)?;
            module_classes.insert(name, ModuleClass::new(class_file)?);
        }

        let mut manifest = ReferenceManifest::new();
        for class_file in module.classes() {
            let class = binary_name(class_file.this_class_name()?)?;
            let superclasses = superclass_chain(&class, &module_classes);
            let mut visitor = ClassVisitor {
                config: &self.config,
                module_classes: &module_classes,
                class,
                superclasses,
                constants: &class_file.constants,
                manifest: &mut manifest,
            };
            visitor.visit(class_file)?;
        }

        log::debug!(
            "Collected {} references from {} classes in module '{}'",
            manifest.len(),
            module.classes().len(),
            module.name()
        );
        Ok(manifest)
    }
}

/// What the collector needs to know about one of the module's own classes
struct ModuleClass {
    super_class: Option<BinaryName>,

    /// Declared fields and methods, as `(name, descriptor)`
    members: HashSet<(String, String)>,
}

impl ModuleClass {
    fn new(class_file: &ClassFile) -> Result<ModuleClass, jvm::Error> {
        let constants = &class_file.constants;
        let super_class = class_file
            .super_class_name()?
            .map(binary_name)
            .transpose()?;
        let mut members = HashSet::new();
        for field in &class_file.fields {
            let name = constants.utf8(field.name_index)?;
            let descriptor = constants.utf8(field.descriptor_index)?;
            members.insert((name.to_owned(), descriptor.to_owned()));
        }
        for method in &class_file.methods {
            let name = constants.utf8(method.name_index)?;
            let descriptor = constants.utf8(method.descriptor_index)?;
            members.insert((name.to_owned(), descriptor.to_owned()));
        }
        Ok(ModuleClass {
            super_class,
            members,
        })
    }

    fn declares(&self, name: &str, descriptor: &str) -> bool {
        self.members
            .contains(&(name.to_owned(), descriptor.to_owned()))
    }
}

fn binary_name(name: &str) -> Result<BinaryName, jvm::Error> {
    BinaryName::from_string(name.to_owned()).map_err(jvm::Error::MalformedName)
}

/// Superclasses of a module class, as far as the module's own classes reveal them
///
/// The chain ends with the first superclass that isn't part of the module.
fn superclass_chain(
    class: &BinaryName,
    module_classes: &HashMap<BinaryName, ModuleClass>,
) -> Vec<BinaryName> {
    let mut chain: Vec<BinaryName> = vec![];
    let mut next = super_class_of(class, module_classes);
    while let Some(super_class) = next {
        if &super_class == class || chain.contains(&super_class) {
            break;
        }
        next = super_class_of(&super_class, module_classes);
        chain.push(super_class);
    }
    chain
}

fn super_class_of(
    class: &BinaryName,
    module_classes: &HashMap<BinaryName, ModuleClass>,
) -> Option<BinaryName> {
    module_classes
        .get(class)
        .and_then(|module_class| module_class.super_class.clone())
}

/// Class in which linking of a member referenced through a module class actually starts
///
/// A call like `this.helper()` names the module class as the owner even when `helper` is only
/// inherited from a library superclass. `None` means a module class declares the member (or the
/// chain ends without leaving the module).
fn inherited_owner(
    owner: &BinaryName,
    name: &str,
    descriptor: &str,
    module_classes: &HashMap<BinaryName, ModuleClass>,
) -> Option<BinaryName> {
    let mut visited: HashSet<&BinaryName> = HashSet::new();
    let mut current = owner;
    loop {
        let module_class = match module_classes.get(current) {
            Some(module_class) => module_class,
            None => return Some(current.clone()),
        };
        if module_class.declares(name, descriptor) || !visited.insert(current) {
            return None;
        }
        current = module_class.super_class.as_ref()?;
    }
}

/// Class named by a `CONSTANT_Class`, looking through array types
///
/// Primitive arrays (eg. `[I`) don't name any class.
fn class_constant(raw: &str) -> Result<Option<BinaryName>, jvm::Error> {
    if raw.starts_with('[') {
        let array: RefType<BinaryName> = ParseDescriptor::parse(raw)?;
        Ok(array.element_class().cloned())
    } else {
        binary_name(raw).map(Some)
    }
}

/// Collection state while visiting a single module class
struct ClassVisitor<'a> {
    config: &'a ModuleConfig,
    module_classes: &'a HashMap<BinaryName, ModuleClass>,

    /// Class making the references
    class: BinaryName,
    superclasses: Vec<BinaryName>,
    constants: &'a ConstantPool,
    manifest: &'a mut ReferenceManifest,
}

impl<'a> ClassVisitor<'a> {
    fn visit(&mut self, class_file: &ClassFile) -> Result<(), jvm::Error> {
        if let Some(super_class) = class_file.super_class_name()? {
            self.class_constant(super_class)?;
        }
        for interface in class_file.interface_names()? {
            self.class_constant(interface)?;
        }

        for field in &class_file.fields {
            let field_type: FieldType<BinaryName> =
                ParseDescriptor::parse(self.constants.utf8(field.descriptor_index)?)?;
            self.existence_only(field_type.class());
        }

        for method in &class_file.methods {
            let descriptor: MethodDescriptor<BinaryName> =
                ParseDescriptor::parse(self.constants.utf8(method.descriptor_index)?)?;
            for class in descriptor.classes() {
                self.existence_only(Some(class));
            }

            if let Some(code) = method.code(self.constants)? {
                for instruction in Instructions::new(&code.code_array) {
                    let (_, instruction) = instruction?;
                    self.instruction(instruction)?;
                }
                for handler in &code.exception_table {
                    if let Some(catch_type) = handler.catch_type {
                        self.class_constant(self.constants.class_name(catch_type)?)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn instruction(&mut self, instruction: Instruction) -> Result<(), jvm::Error> {
        match instruction {
            Instruction::GetStatic(index) | Instruction::PutStatic(index) => {
                self.member(index, true, None)
            }
            Instruction::GetField(index) | Instruction::PutField(index) => {
                self.member(index, false, None)
            }
            Instruction::Invoke(invoke_type, index) => {
                self.member(index, invoke_type == InvokeType::Static, Some(invoke_type))
            }
            Instruction::New(class)
            | Instruction::ANewArray(class)
            | Instruction::CheckCast(class)
            | Instruction::InstanceOf(class)
            | Instruction::MultiANewArray(class, _) => {
                self.class_constant(self.constants.class_name(class)?)
            }
            Instruction::Ldc(index) => match self.constants.get(index) {
                Some(Constant::Class(name)) => self.class_constant(self.constants.utf8(*name)?),
                _ => Ok(()),
            },
            Instruction::InvokeDynamic(_) | Instruction::Ldc2W(_) | Instruction::Other { .. } => {
                Ok(())
            }
        }
    }

    fn is_external(&self, class: &BinaryName) -> bool {
        !self.module_classes.contains_key(class) && !self.config.is_provided(class)
    }

    /// Access needed to use a class from the current class
    fn class_visibility(&self, class: &BinaryName) -> Visibility {
        if class.same_package(&self.class) {
            Visibility::PackagePrivate
        } else {
            Visibility::Public
        }
    }

    /// Access needed to use a member of `owner` from the current class
    fn member_visibility(&self, owner: &BinaryName) -> Visibility {
        if owner.same_package(&self.class) {
            Visibility::PackagePrivate
        } else if self.superclasses.contains(owner) {
            Visibility::Protected
        } else {
            Visibility::Public
        }
    }

    fn add(&mut self, reference: Reference) {
        log::trace!("{} references {}", self.class, reference);
        self.manifest.add(reference, &self.class);
    }

    fn existence_only(&mut self, class: Option<&BinaryName>) {
        if let Some(class) = class {
            if self.is_external(class) {
                self.add(Reference::Class(ClassRef {
                    name: class.clone(),
                    minimum_visibility: Visibility::Private,
                }));
            }
        }
    }

    fn class_constant(&mut self, raw: &str) -> Result<(), jvm::Error> {
        if let Some(class) = class_constant(raw)? {
            if self.is_external(&class) {
                let minimum_visibility = self.class_visibility(&class);
                self.add(Reference::Class(ClassRef {
                    name: class,
                    minimum_visibility,
                }));
            }
        }
        Ok(())
    }

    fn member(
        &mut self,
        index: ConstantIndex,
        is_static: bool,
        invoke_type: Option<InvokeType>,
    ) -> Result<(), jvm::Error> {
        let member = self.constants.member_ref(index)?;

        // Members of array types (eg. `clone`) all come from `java/lang/Object`
        if member.class_name.starts_with('[') {
            return self.class_constant(member.class_name);
        }

        let named_owner = binary_name(member.class_name)?;
        let owner = if self.module_classes.contains_key(&named_owner) {
            match inherited_owner(
                &named_owner,
                member.name,
                member.descriptor,
                self.module_classes,
            ) {
                Some(owner) => owner,
                None => return Ok(()),
            }
        } else {
            named_owner
        };
        let name = UnqualifiedName::from_string(member.name.to_owned())
            .map_err(jvm::Error::MalformedName)?;
        let minimum_visibility = self.member_visibility(&owner);

        let reference = match member.kind {
            MemberRefKind::Field => {
                let descriptor: FieldType<BinaryName> = ParseDescriptor::parse(member.descriptor)?;
                self.existence_only(descriptor.class());
                Reference::Field(FieldRef {
                    owner,
                    name,
                    descriptor,
                    minimum_visibility,
                    is_static,
                })
            }
            MemberRefKind::Method { is_interface } => {
                let descriptor: MethodDescriptor<BinaryName> =
                    ParseDescriptor::parse(member.descriptor)?;
                for class in descriptor.classes() {
                    self.existence_only(Some(class));
                }
                Reference::Method(MethodRef {
                    owner,
                    name,
                    descriptor,
                    minimum_visibility,
                    is_static,
                    is_interface: is_interface
                        || matches!(invoke_type, Some(InvokeType::Interface(_))),
                })
            }
        };

        if self.is_external(reference.owner()) {
            self.add(reference);
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::jvm::class_file::ExceptionHandler;
    use crate::jvm::{ClassAccessFlags, ClassBuilder, MethodAccessFlags};

    fn name(name: &str) -> BinaryName {
        BinaryName::from_string(name.to_owned()).unwrap()
    }

    /// `agent/Advice extends lib/Base`, touching a bit of everything
    fn advice() -> ClassFile {
        let (advice, base) = (name("agent/Advice"), name("lib/Base"));
        let mut builder =
            ClassBuilder::new(ClassAccessFlags::PUBLIC, &advice, Some(&base)).unwrap();
        builder.add_interface("lib/Listener").unwrap();
        let c = &mut builder.constants;
        let level = c.get_field_ref("lib/Config", "LEVEL", "I").unwrap();
        let helper = c.get_method_ref("lib/Base", "helper", "()V", false).unwrap();
        let internal = c.get_method_ref("agent/Helper", "run", "()V", false).unwrap();
        let length = c
            .get_method_ref("java/lang/String", "length", "()I", false)
            .unwrap();
        let client = c.get_class("lib/Client").unwrap();
        let client_init = c
            .get_method_ref("lib/Client", "<init>", "(Llib/Options;)V", false)
            .unwrap();
        let items = c.get_class("[[Llib/Item;").unwrap();
        let ints = c.get_class("[I").unwrap();
        let on_event = c
            .get_method_ref("lib/Listener", "onEvent", "(Ljava/lang/Object;)V", true)
            .unwrap();
        let token = c.get_class("lib/Token").unwrap();
        let exception = c.get_class("lib/ClientException").unwrap();
        let text = c.get_string("lib/NotAClass").unwrap();
        let indy = c.get_name_and_type("apply", "()Llib/Lambda;").unwrap();

        let body = [
            Instruction::GetStatic(level),
            Instruction::POP,
            Instruction::ALOAD_0,
            Instruction::Invoke(InvokeType::Special, helper),
            Instruction::Invoke(InvokeType::Static, internal),
            Instruction::ACONST_NULL,
            Instruction::Invoke(InvokeType::Virtual, length),
            Instruction::POP,
            Instruction::New(client),
            Instruction::DUP,
            Instruction::ACONST_NULL,
            Instruction::Invoke(InvokeType::Special, client_init),
            Instruction::CheckCast(items),
            Instruction::CheckCast(ints),
            Instruction::ACONST_NULL,
            Instruction::Invoke(InvokeType::Interface(2), on_event),
            Instruction::Ldc(token.0),
            Instruction::Ldc(text),
            Instruction::InvokeDynamic(indy.0),
            Instruction::RETURN,
        ];
        let handlers = vec![ExceptionHandler {
            start_pc: 0,
            end_pc: 1,
            handler_pc: 1,
            catch_type: Some(exception),
        }];
        builder
            .add_method_with_handlers(
                MethodAccessFlags::PUBLIC,
                "onEnter",
                "(Llib/Request;)V",
                &body,
                handlers,
            )
            .unwrap();
        builder.result()
    }

    fn helper() -> ClassFile {
        let helper = name("agent/Helper");
        ClassBuilder::new(ClassAccessFlags::PUBLIC, &helper, Some(&BinaryName::OBJECT))
            .unwrap()
            .result()
    }

    /// Lives in the library's package, so it can see package-private members
    fn injected() -> ClassFile {
        let injected = name("lib/Injected");
        let mut builder =
            ClassBuilder::new(ClassAccessFlags::PUBLIC, &injected, Some(&BinaryName::OBJECT))
                .unwrap();
        let hidden = builder
            .constants
            .get_method_ref("lib/Client", "hidden", "()V", false)
            .unwrap();
        builder
            .add_method(
                MethodAccessFlags::STATIC,
                "poke",
                "()V",
                &[
                    Instruction::Invoke(InvokeType::Static, hidden),
                    Instruction::RETURN,
                ],
            )
            .unwrap();
        builder.result()
    }

    fn collect() -> ReferenceManifest {
        let module = InstrumentationModule::new("test", vec![advice(), helper(), injected()]);
        ReferenceCollector::default().collect(&module).unwrap()
    }

    fn visibility(manifest: &ReferenceManifest, key: &str) -> Visibility {
        manifest
            .get(key)
            .unwrap_or_else(|| panic!("missing {}", key))
            .reference
            .minimum_visibility()
    }

    #[test]
    fn collects_external_references() {
        let manifest = collect();
        let keys: Vec<String> = manifest.references().map(Reference::key).collect();
        assert_eq!(
            keys,
            vec![
                "lib/Base",
                "lib/Base#helper()V",
                "lib/Client",
                "lib/Client#<init>(Llib/Options;)V",
                "lib/Client#hidden()V",
                "lib/ClientException",
                "lib/Config#LEVEL:I",
                "lib/Item",
                "lib/Listener",
                "lib/Listener#onEvent(Ljava/lang/Object;)V",
                "lib/Options",
                "lib/Request",
                "lib/Token",
            ]
        );
    }

    #[test]
    fn minimum_visibilities() {
        let manifest = collect();
        assert_eq!(visibility(&manifest, "lib/Base#helper()V"), Visibility::Protected);
        assert_eq!(visibility(&manifest, "lib/Config#LEVEL:I"), Visibility::Public);
        assert_eq!(
            visibility(&manifest, "lib/Client#hidden()V"),
            Visibility::PackagePrivate
        );
        assert_eq!(visibility(&manifest, "lib/Request"), Visibility::Private);
        assert_eq!(visibility(&manifest, "lib/Options"), Visibility::Private);
        assert_eq!(visibility(&manifest, "lib/Item"), Visibility::Public);
        assert_eq!(visibility(&manifest, "lib/Client"), Visibility::Public);

        let sources = &manifest.get("lib/Client").unwrap().sources;
        assert_eq!(sources.iter().collect::<Vec<_>>(), vec![&name("agent/Advice")]);
    }

    #[test]
    fn static_and_interface_flags() {
        let manifest = collect();
        match &manifest.get("lib/Config#LEVEL:I").unwrap().reference {
            Reference::Field(field) => assert!(field.is_static),
            other => panic!("unexpected {:?}", other),
        }
        let on_event = manifest.get("lib/Listener#onEvent(Ljava/lang/Object;)V");
        match &on_event.unwrap().reference {
            Reference::Method(method) => {
                assert!(method.is_interface);
                assert!(!method.is_static);
            }
            other => panic!("unexpected {:?}", other),
        }
        match &manifest.get("lib/Client#hidden()V").unwrap().reference {
            Reference::Method(method) => assert!(method.is_static),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn collection_is_deterministic() {
        assert_eq!(collect(), collect());
    }

    #[test]
    fn framework_classes_are_not_collected() {
        let module = InstrumentationModule::new("test", vec![advice(), helper()]);
        let config = ModuleConfig::default().with_framework_prefix("lib/Con");
        let manifest = ReferenceCollector::new(config).collect(&module).unwrap();
        assert!(manifest.get("lib/Config#LEVEL:I").is_none());
        assert!(manifest.get("lib/Base").is_some());
    }

    #[test]
    fn inherited_members_are_checked_against_the_library() {
        // `agent/Sub extends agent/Parent extends lib/Base`, and only `agent/Parent` declares
        // `own()V`
        let parent = {
            let mut builder = ClassBuilder::new(
                ClassAccessFlags::PUBLIC,
                &name("agent/Parent"),
                Some(&name("lib/Base")),
            )
            .unwrap();
            builder
                .add_abstract_method(MethodAccessFlags::PUBLIC, "own", "()V")
                .unwrap();
            builder.result()
        };
        let sub = {
            let mut builder = ClassBuilder::new(
                ClassAccessFlags::PUBLIC,
                &name("agent/Sub"),
                Some(&name("agent/Parent")),
            )
            .unwrap();
            let c = &mut builder.constants;
            let helper = c.get_method_ref("agent/Sub", "helper", "()V", false).unwrap();
            let own = c.get_method_ref("agent/Sub", "own", "()V", false).unwrap();
            let count = c.get_field_ref("agent/Parent", "count", "I").unwrap();
            let body = [
                Instruction::ALOAD_0,
                Instruction::Invoke(InvokeType::Virtual, helper),
                Instruction::ALOAD_0,
                Instruction::Invoke(InvokeType::Virtual, own),
                Instruction::ALOAD_0,
                Instruction::GetField(count),
                Instruction::POP,
                Instruction::RETURN,
            ];
            builder
                .add_method(MethodAccessFlags::PUBLIC, "run", "()V", &body)
                .unwrap();
            builder.result()
        };

        let module = InstrumentationModule::new("test", vec![parent, sub]);
        let manifest = ReferenceCollector::default().collect(&module).unwrap();
        let keys: Vec<String> = manifest.references().map(Reference::key).collect();
        assert_eq!(keys, vec!["lib/Base", "lib/Base#count:I", "lib/Base#helper()V"]);
        assert_eq!(visibility(&manifest, "lib/Base#helper()V"), Visibility::Protected);
        assert_eq!(visibility(&manifest, "lib/Base#count:I"), Visibility::Protected);
    }
}
