//! Check collected references against one isolated resolution context

use crate::jvm::{BinaryName, Name};
use crate::reference::{ClassRef, FieldRef, MethodRef, Reference, ReferenceManifest};
use crate::resolve::{Platform, ResolutionContext};
use std::collections::{HashSet, VecDeque};
use std::fmt;

/// What happened when trying to resolve a single reference
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Outcome {
    Resolved,

    /// The class (or the owner of the member) isn't in the context
    MissingClass,

    /// Nothing in the owner's hierarchy has a member of this name
    MissingMember,

    /// Members of this name exist, but with a different descriptor or static-ness (or the owner
    /// changed between being a class and being an interface)
    SignatureMismatch,

    /// Matching members exist, but none are accessible from the referencing code
    VisibilityViolation,
}

impl Outcome {
    pub fn is_resolved(self) -> bool {
        self == Outcome::Resolved
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Outcome::Resolved => "resolved",
            Outcome::MissingClass => "missing class",
            Outcome::MissingMember => "missing member",
            Outcome::SignatureMismatch => "signature mismatch",
            Outcome::VisibilityViolation => "visibility violation",
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReferenceOutcome {
    pub reference: Reference,
    pub outcome: Outcome,
}

/// Outcome of every reference in a manifest, in manifest order
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MismatchReport {
    pub outcomes: Vec<ReferenceOutcome>,
}

impl MismatchReport {
    pub fn all_resolved(&self) -> bool {
        self.outcomes.iter().all(|outcome| outcome.outcome.is_resolved())
    }

    /// Only the references that did not resolve
    pub fn mismatches(&self) -> impl Iterator<Item = &ReferenceOutcome> + '_ {
        self.outcomes
            .iter()
            .filter(|outcome| !outcome.outcome.is_resolved())
    }
}

impl fmt::Display for MismatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for mismatch in self.mismatches() {
            writeln!(f, "{}: {}", mismatch.outcome, mismatch.reference)?;
        }
        Ok(())
    }
}

/// Accumulated evidence while walking a type hierarchy for a member
#[derive(Default)]
struct Search {
    /// Found a matching member that isn't accessible
    too_restrictive: bool,

    /// Found a member with the right name but the wrong shape
    same_name: bool,

    /// The superclass chain ended in a platform class that isn't modelled
    opaque: bool,
}

impl Search {
    /// Evidence found on modelled classes always wins over an unmodelled platform superclass
    fn outcome(self) -> Outcome {
        if self.too_restrictive {
            Outcome::VisibilityViolation
        } else if self.same_name {
            Outcome::SignatureMismatch
        } else if self.opaque {
            Outcome::Resolved
        } else {
            Outcome::MissingMember
        }
    }
}

/// Classes still to visit, each tagged with whether it is on the superclass chain of the owner
type Pending<'a> = VecDeque<(&'a BinaryName, bool)>;

/// Resolves references the way the JVM linker would, but against a [`ResolutionContext`]
///
/// Platform classes are never in the context. When the superclass chain of an owner runs into
/// one (eg. `lib/MyList extends java/util/AbstractList`) and no class in the context has a member
/// of the right name, the member is assumed to be inherited from the platform. Platform
/// interfaces never get that benefit of the doubt.
pub struct ReferenceMatcher<'a> {
    context: &'a ResolutionContext,
    platform: &'a Platform,
}

impl<'a> ReferenceMatcher<'a> {
    pub fn new(context: &'a ResolutionContext, platform: &'a Platform) -> ReferenceMatcher<'a> {
        ReferenceMatcher { context, platform }
    }

    /// Check every reference in the manifest (this never stops early)
    pub fn check_all(&self, manifest: &ReferenceManifest) -> MismatchReport {
        let outcomes = manifest
            .references()
            .map(|reference| {
                let outcome = self.check(reference);
                log::trace!("{}: {}", reference, outcome);
                ReferenceOutcome {
                    reference: reference.clone(),
                    outcome,
                }
            })
            .collect();
        MismatchReport { outcomes }
    }

    pub fn check(&self, reference: &Reference) -> Outcome {
        match reference {
            Reference::Class(class) => self.check_class(class),
            Reference::Method(method) => self.check_method(method),
            Reference::Field(field) => self.check_field(field),
        }
    }

    fn check_class(&self, class: &ClassRef) -> Outcome {
        match self.context.lookup_class(class.name.as_str()) {
            None => Outcome::MissingClass,
            Some(descriptor) if !descriptor.visibility.satisfies(class.minimum_visibility) => {
                Outcome::VisibilityViolation
            }
            Some(_) => Outcome::Resolved,
        }
    }

    fn check_method(&self, method: &MethodRef) -> Outcome {
        let owner = match self.context.lookup_class(method.owner.as_str()) {
            Some(owner) => owner,
            None => return Outcome::MissingClass,
        };

        // `invokeinterface` on a class (or `invokevirtual` on an interface) fails to link
        if owner.is_interface != method.is_interface {
            return Outcome::SignatureMismatch;
        }

        let mut search = Search::default();
        let mut visited: HashSet<&BinaryName> = HashSet::new();
        let mut pending: Pending = VecDeque::from(vec![(&method.owner, true)]);
        while let Some((class_name, superclass_chain)) = pending.pop_front() {
            if !visited.insert(class_name) {
                continue;
            }
            let class = match self.context.lookup_class(class_name.as_str()) {
                Some(class) => class,
                None => {
                    search.opaque |= superclass_chain && self.platform.provides(class_name);
                    continue;
                }
            };

            for declared in class.methods_named(&method.name) {
                let compatible = declared.descriptor == method.descriptor
                    && declared.is_static == method.is_static;
                if !compatible {
                    search.same_name = true;
                } else if declared.visibility.satisfies(method.minimum_visibility) {
                    return Outcome::Resolved;
                } else {
                    search.too_restrictive = true;
                }
            }
            if let Some(super_class) = &class.super_class {
                pending.push_back((super_class, superclass_chain));
            }
            pending.extend(class.interfaces.iter().map(|interface| (interface, false)));
        }
        search.outcome()
    }

    fn check_field(&self, field: &FieldRef) -> Outcome {
        if !self.context.contains(&field.owner) {
            return Outcome::MissingClass;
        }

        let mut search = Search::default();
        let mut visited: HashSet<&BinaryName> = HashSet::new();
        let mut pending: Pending = VecDeque::from(vec![(&field.owner, true)]);
        while let Some((class_name, superclass_chain)) = pending.pop_front() {
            if !visited.insert(class_name) {
                continue;
            }
            let class = match self.context.lookup_class(class_name.as_str()) {
                Some(class) => class,
                None => {
                    search.opaque |= superclass_chain && self.platform.provides(class_name);
                    continue;
                }
            };

            for declared in class.fields_named(&field.name) {
                let compatible = declared.descriptor == field.descriptor
                    && declared.is_static == field.is_static;
                if !compatible {
                    search.same_name = true;
                } else if declared.visibility.satisfies(field.minimum_visibility) {
                    return Outcome::Resolved;
                } else {
                    search.too_restrictive = true;
                }
            }

            // Interfaces only declare constants
            if let Some(super_class) = &class.super_class {
                pending.push_back((super_class, superclass_chain));
            }
            if field.is_static {
                pending.extend(class.interfaces.iter().map(|interface| (interface, false)));
            }
        }
        search.outcome()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::jvm::class_file::ClassFile;
    use crate::jvm::{
        ClassAccessFlags, ClassBuilder, FieldAccessFlags, FieldType, MethodAccessFlags,
        MethodDescriptor, ParseDescriptor, UnqualifiedName, Visibility,
    };

    fn name(name: &str) -> BinaryName {
        BinaryName::from_string(name.to_owned()).unwrap()
    }

    fn class(
        flags: ClassAccessFlags,
        class: &str,
        super_class: &str,
        interfaces: &[&str],
        methods: &[(MethodAccessFlags, &str, &str)],
        fields: &[(FieldAccessFlags, &str, &str)],
    ) -> ClassFile {
        let mut builder = ClassBuilder::new(flags, &name(class), Some(&name(super_class))).unwrap();
        for interface in interfaces {
            builder.add_interface(interface).unwrap();
        }
        for (flags, method, descriptor) in methods {
            builder
                .add_abstract_method(*flags, method, descriptor)
                .unwrap();
        }
        for (flags, field, descriptor) in fields {
            builder.add_field(*flags, field, descriptor).unwrap();
        }
        builder.result()
    }

    const PUBLIC: MethodAccessFlags = MethodAccessFlags::PUBLIC;

    fn interface() -> ClassAccessFlags {
        ClassAccessFlags::PUBLIC | ClassAccessFlags::INTERFACE | ClassAccessFlags::ABSTRACT
    }

    /// Small library:
    ///
    ///   - `lib/Base` (public) with `size()I`, a private `secret()V`, and a static `create()`
    ///   - `lib/Client extends lib/Base implements lib/Greeter`, with a field `count:I`
    ///   - `lib/Greeter` interface with a default method `greet()V` and a constant `NAME`
    ///   - `lib/Hidden` (package-private)
    ///   - `lib/MyList extends java/util/AbstractList`, overloading `get`
    ///   - `lib/Named implements java/io/Serializable`, with `name()Ljava/lang/String;`
    ///   - `lib/Loop1` and `lib/Loop2`, interfaces extending each other
    fn context() -> ResolutionContext {
        let classes = vec![
            class(
                ClassAccessFlags::PUBLIC,
                "lib/Base",
                "java/lang/Object",
                &[],
                &[
                    (PUBLIC, "size", "()I"),
                    (MethodAccessFlags::PRIVATE, "secret", "()V"),
                    (PUBLIC | MethodAccessFlags::STATIC, "create", "()Llib/Base;"),
                ],
                &[],
            ),
            class(
                ClassAccessFlags::PUBLIC,
                "lib/Client",
                "lib/Base",
                &["lib/Greeter"],
                &[],
                &[(FieldAccessFlags::PUBLIC, "count", "I")],
            ),
            class(
                interface(),
                "lib/Greeter",
                "java/lang/Object",
                &[],
                &[(PUBLIC, "greet", "()V")],
                &[(
                    FieldAccessFlags::PUBLIC | FieldAccessFlags::STATIC | FieldAccessFlags::FINAL,
                    "NAME",
                    "Ljava/lang/String;",
                )],
            ),
            class(
                ClassAccessFlags::empty(),
                "lib/Hidden",
                "java/lang/Object",
                &[],
                &[],
                &[],
            ),
            class(
                ClassAccessFlags::PUBLIC,
                "lib/MyList",
                "java/util/AbstractList",
                &[],
                &[(PUBLIC, "get", "(II)Ljava/lang/Object;")],
                &[],
            ),
            class(
                ClassAccessFlags::PUBLIC,
                "lib/Named",
                "java/lang/Object",
                &["java/io/Serializable"],
                &[(PUBLIC, "name", "()Ljava/lang/String;")],
                &[],
            ),
            class(interface(), "lib/Loop1", "java/lang/Object", &["lib/Loop2"], &[], &[]),
            class(interface(), "lib/Loop2", "java/lang/Object", &["lib/Loop1"], &[], &[]),
        ];
        ResolutionContext::from_class_files(&classes).unwrap()
    }

    fn class_ref(class: &str, visibility: Visibility) -> Reference {
        Reference::Class(ClassRef {
            name: name(class),
            minimum_visibility: visibility,
        })
    }

    fn method_ref(owner: &str, method: &str, descriptor: &str, is_static: bool) -> Reference {
        Reference::Method(MethodRef {
            owner: name(owner),
            name: UnqualifiedName::from_string(method.to_owned()).unwrap(),
            descriptor: MethodDescriptor::parse(descriptor).unwrap(),
            minimum_visibility: Visibility::Public,
            is_static,
            is_interface: false,
        })
    }

    fn interface_method_ref(owner: &str, method: &str, descriptor: &str) -> Reference {
        match method_ref(owner, method, descriptor, false) {
            Reference::Method(method) => Reference::Method(MethodRef {
                is_interface: true,
                ..method
            }),
            _ => unreachable!(),
        }
    }

    fn field_ref(owner: &str, field: &str, descriptor: &str, is_static: bool) -> Reference {
        Reference::Field(FieldRef {
            owner: name(owner),
            name: UnqualifiedName::from_string(field.to_owned()).unwrap(),
            descriptor: FieldType::parse(descriptor).unwrap(),
            minimum_visibility: Visibility::Public,
            is_static,
        })
    }

    #[test]
    fn class_references() {
        let context = context();
        let platform = Platform::default();
        let matcher = ReferenceMatcher::new(&context, &platform);

        let check = |class: &str, visibility| matcher.check(&class_ref(class, visibility));
        assert_eq!(check("lib/Client", Visibility::Public), Outcome::Resolved);
        assert_eq!(check("lib/Missing", Visibility::Private), Outcome::MissingClass);
        assert_eq!(check("lib/Hidden", Visibility::Private), Outcome::Resolved);
        assert_eq!(
            check("lib/Hidden", Visibility::PackagePrivate),
            Outcome::Resolved
        );
        assert_eq!(
            check("lib/Hidden", Visibility::Public),
            Outcome::VisibilityViolation
        );
    }

    #[test]
    fn method_references() {
        let context = context();
        let platform = Platform::default();
        let matcher = ReferenceMatcher::new(&context, &platform);

        let check = |owner, method, descriptor, is_static| {
            matcher.check(&method_ref(owner, method, descriptor, is_static))
        };
        assert_eq!(check("lib/Base", "size", "()I", false), Outcome::Resolved);
        assert_eq!(check("lib/Client", "size", "()I", false), Outcome::Resolved);
        assert_eq!(check("lib/Client", "greet", "()V", false), Outcome::Resolved);
        assert_eq!(
            check("lib/Client", "toString", "()Ljava/lang/String;", false),
            Outcome::Resolved
        );
        assert_eq!(
            check("lib/Base", "create", "()Llib/Base;", true),
            Outcome::Resolved
        );
        assert_eq!(
            check("lib/Missing", "size", "()I", false),
            Outcome::MissingClass
        );
        assert_eq!(
            check("lib/Client", "absent", "()V", false),
            Outcome::MissingMember
        );
        assert_eq!(
            check("lib/Client", "size", "()J", false),
            Outcome::SignatureMismatch
        );
        assert_eq!(
            check("lib/Base", "size", "()I", true),
            Outcome::SignatureMismatch
        );
        assert_eq!(
            check("lib/Client", "secret", "()V", false),
            Outcome::VisibilityViolation
        );
    }

    #[test]
    fn opaque_platform_supertypes() {
        let context = context();
        let platform = Platform::default();
        let matcher = ReferenceMatcher::new(&context, &platform);

        let add = method_ref("lib/MyList", "add", "(Ljava/lang/Object;)Z", false);
        assert_eq!(matcher.check(&add), Outcome::Resolved);

        // A same-name member in the context outranks the unmodelled superclass
        let get = method_ref("lib/MyList", "get", "(I)Ljava/lang/Object;", false);
        assert_eq!(matcher.check(&get), Outcome::SignatureMismatch);

        let nothing = Platform::new(Vec::<String>::new());
        let matcher = ReferenceMatcher::new(&context, &nothing);
        assert_eq!(matcher.check(&add), Outcome::MissingMember);
    }

    #[test]
    fn platform_interfaces_are_not_opaque() {
        let context = context();
        let platform = Platform::default();
        let matcher = ReferenceMatcher::new(&context, &platform);

        let check = |method, descriptor| {
            matcher.check(&method_ref("lib/Named", method, descriptor, false))
        };
        assert_eq!(check("name", "()Ljava/lang/String;"), Outcome::Resolved);
        assert_eq!(check("name", "()I"), Outcome::SignatureMismatch);
        assert_eq!(check("absent", "()V"), Outcome::MissingMember);
        assert_eq!(
            matcher.check(&field_ref("lib/Named", "serialVersionUID", "J", true)),
            Outcome::MissingMember
        );
    }

    #[test]
    fn owner_kind_must_match() {
        let context = context();
        let platform = Platform::default();
        let matcher = ReferenceMatcher::new(&context, &platform);

        assert_eq!(
            matcher.check(&interface_method_ref("lib/Greeter", "greet", "()V")),
            Outcome::Resolved
        );
        assert_eq!(
            matcher.check(&method_ref("lib/Greeter", "greet", "()V", false)),
            Outcome::SignatureMismatch
        );
        assert_eq!(
            matcher.check(&interface_method_ref("lib/Base", "size", "()I")),
            Outcome::SignatureMismatch
        );
    }

    #[test]
    fn cyclic_interfaces_terminate() {
        let context = context();
        let platform = Platform::default();
        let matcher = ReferenceMatcher::new(&context, &platform);
        assert_eq!(
            matcher.check(&interface_method_ref("lib/Loop1", "spin", "()V")),
            Outcome::MissingMember
        );
    }

    #[test]
    fn field_references() {
        let context = context();
        let platform = Platform::default();
        let matcher = ReferenceMatcher::new(&context, &platform);

        let check = |owner, field, descriptor, is_static| {
            matcher.check(&field_ref(owner, field, descriptor, is_static))
        };
        assert_eq!(check("lib/Client", "count", "I", false), Outcome::Resolved);
        assert_eq!(
            check("lib/Client", "count", "J", false),
            Outcome::SignatureMismatch
        );
        assert_eq!(
            check("lib/Client", "count", "I", true),
            Outcome::SignatureMismatch
        );
        assert_eq!(
            check("lib/Client", "NAME", "Ljava/lang/String;", true),
            Outcome::Resolved
        );
        assert_eq!(
            check("lib/Base", "count", "I", false),
            Outcome::MissingMember
        );
    }

    #[test]
    fn reports_are_complete() {
        let context = context();
        let platform = Platform::default();
        let matcher = ReferenceMatcher::new(&context, &platform);

        let source = name("agent/Advice");
        let mut manifest = ReferenceManifest::new();
        manifest.add(class_ref("lib/Missing", Visibility::Public), &source);
        manifest.add(method_ref("lib/Client", "size", "()I", false), &source);
        manifest.add(method_ref("lib/Client", "absent", "()V", false), &source);

        let report = matcher.check_all(&manifest);
        assert_eq!(report.outcomes.len(), 3);
        assert!(!report.all_resolved());
        assert_eq!(report.mismatches().count(), 2);
        assert_eq!(
            report.to_string(),
            "missing member: method lib.Client#absent()V\nmissing class: class lib.Missing\n"
        );
    }
}
