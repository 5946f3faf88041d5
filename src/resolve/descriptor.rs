use crate::jvm::class_file::ClassFile;
use crate::jvm::{
    BinaryName, Error, FieldAccessFlags, FieldType, MethodAccessFlags, MethodDescriptor, Name,
    ParseDescriptor, UnqualifiedName, Visibility,
};

/// Shape of a class, as far as linking against it is concerned
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassDescriptor {
    pub name: BinaryName,

    /// Only `java/lang/Object` has no superclass
    pub super_class: Option<BinaryName>,
    pub interfaces: Vec<BinaryName>,
    pub is_interface: bool,
    pub visibility: Visibility,
    pub methods: Vec<DeclaredMethod>,
    pub fields: Vec<DeclaredField>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeclaredMethod {
    pub name: UnqualifiedName,
    pub descriptor: MethodDescriptor<BinaryName>,
    pub visibility: Visibility,
    pub is_static: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeclaredField {
    pub name: UnqualifiedName,
    pub descriptor: FieldType<BinaryName>,
    pub visibility: Visibility,
    pub is_static: bool,
}

fn binary_name(name: &str) -> Result<BinaryName, Error> {
    BinaryName::from_string(name.to_owned()).map_err(Error::MalformedName)
}

fn unqualified_name(name: &str) -> Result<UnqualifiedName, Error> {
    UnqualifiedName::from_string(name.to_owned()).map_err(Error::MalformedName)
}

impl ClassDescriptor {
    pub fn from_class_file(class_file: &ClassFile) -> Result<ClassDescriptor, Error> {
        let constants = &class_file.constants;

        let methods = class_file
            .methods
            .iter()
            .map(|method| -> Result<DeclaredMethod, Error> {
                Ok(DeclaredMethod {
                    name: unqualified_name(constants.utf8(method.name_index)?)?,
                    descriptor: ParseDescriptor::parse(constants.utf8(method.descriptor_index)?)?,
                    visibility: method.access_flags.visibility(),
                    is_static: method.access_flags.contains(MethodAccessFlags::STATIC),
                })
            })
            .collect::<Result<_, Error>>()?;

        let fields = class_file
            .fields
            .iter()
            .map(|field| -> Result<DeclaredField, Error> {
                Ok(DeclaredField {
                    name: unqualified_name(constants.utf8(field.name_index)?)?,
                    descriptor: ParseDescriptor::parse(constants.utf8(field.descriptor_index)?)?,
                    visibility: field.access_flags.visibility(),
                    is_static: field.access_flags.contains(FieldAccessFlags::STATIC),
                })
            })
            .collect::<Result<_, Error>>()?;

        Ok(ClassDescriptor {
            name: binary_name(class_file.this_class_name()?)?,
            super_class: class_file
                .super_class_name()?
                .map(binary_name)
                .transpose()?,
            interfaces: class_file
                .interface_names()?
                .into_iter()
                .map(binary_name)
                .collect::<Result<_, _>>()?,
            is_interface: class_file.is_interface(),
            visibility: class_file.access_flags.visibility(),
            methods,
            fields,
        })
    }

    /// Built-in shape of `java/lang/Object`
    ///
    /// Every class (and, for method lookup purposes, every interface) eventually inherits from
    /// `Object`, but the runtime library is never part of an artifact set.
    pub fn object() -> ClassDescriptor {
        let method = |name: UnqualifiedName,
                      parameters: Vec<FieldType<BinaryName>>,
                      return_type: Option<FieldType<BinaryName>>,
                      visibility: Visibility| DeclaredMethod {
            name,
            descriptor: MethodDescriptor {
                parameters,
                return_type,
            },
            visibility,
            is_static: false,
        };
        let object = FieldType::object(BinaryName::OBJECT);
        let long = FieldType::long();

        ClassDescriptor {
            name: BinaryName::OBJECT,
            super_class: None,
            interfaces: vec![],
            is_interface: false,
            visibility: Visibility::Public,
            methods: vec![
                method(UnqualifiedName::INIT, vec![], None, Visibility::Public),
                method(
                    UnqualifiedName::CLONE,
                    vec![],
                    Some(object.clone()),
                    Visibility::Protected,
                ),
                method(
                    UnqualifiedName::EQUALS,
                    vec![object],
                    Some(FieldType::boolean()),
                    Visibility::Public,
                ),
                method(UnqualifiedName::FINALIZE, vec![], None, Visibility::Protected),
                method(
                    UnqualifiedName::GETCLASS,
                    vec![],
                    Some(FieldType::object(BinaryName::CLASS)),
                    Visibility::Public,
                ),
                method(
                    UnqualifiedName::HASHCODE,
                    vec![],
                    Some(FieldType::int()),
                    Visibility::Public,
                ),
                method(UnqualifiedName::NOTIFY, vec![], None, Visibility::Public),
                method(UnqualifiedName::NOTIFYALL, vec![], None, Visibility::Public),
                method(
                    UnqualifiedName::TOSTRING,
                    vec![],
                    Some(FieldType::object(BinaryName::STRING)),
                    Visibility::Public,
                ),
                method(UnqualifiedName::WAIT, vec![], None, Visibility::Public),
                method(UnqualifiedName::WAIT, vec![long.clone()], None, Visibility::Public),
                method(
                    UnqualifiedName::WAIT,
                    vec![long, FieldType::int()],
                    None,
                    Visibility::Public,
                ),
            ],
            fields: vec![],
        }
    }

    /// Declared methods with the given name
    pub fn methods_named<'a>(
        &'a self,
        name: &'a UnqualifiedName,
    ) -> impl Iterator<Item = &'a DeclaredMethod> + 'a {
        self.methods.iter().filter(move |method| &method.name == name)
    }

    /// Declared fields with the given name
    pub fn fields_named<'a>(
        &'a self,
        name: &'a UnqualifiedName,
    ) -> impl Iterator<Item = &'a DeclaredField> + 'a {
        self.fields.iter().filter(move |field| &field.name == name)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::jvm::{ClassAccessFlags, ClassBuilder};

    #[test]
    fn descriptor_of_class_file() {
        let name = BinaryName::from_string(String::from("lib/Widget")).unwrap();
        let mut builder =
            ClassBuilder::new(ClassAccessFlags::SUPER, &name, Some(&BinaryName::OBJECT)).unwrap();
        builder.add_interface("lib/Shape").unwrap();
        builder
            .add_field(
                FieldAccessFlags::PUBLIC | FieldAccessFlags::STATIC,
                "COUNT",
                "I",
            )
            .unwrap();
        builder
            .add_abstract_method(
                MethodAccessFlags::PROTECTED | MethodAccessFlags::ABSTRACT,
                "area",
                "(D)[Ljava/lang/String;",
            )
            .unwrap();
        let descriptor = ClassDescriptor::from_class_file(&builder.result()).unwrap();

        assert_eq!(descriptor.name.as_str(), "lib/Widget");
        assert_eq!(descriptor.super_class, Some(BinaryName::OBJECT));
        assert_eq!(descriptor.visibility, Visibility::PackagePrivate);
        assert!(!descriptor.is_interface);
        let interfaces: Vec<&str> = descriptor
            .interfaces
            .iter()
            .map(|name| name.as_str())
            .collect();
        assert_eq!(interfaces, vec!["lib/Shape"]);

        let field = &descriptor.fields[0];
        assert_eq!(field.name.as_str(), "COUNT");
        assert_eq!(field.descriptor, FieldType::int());
        assert!(field.is_static);

        let method = &descriptor.methods[0];
        assert_eq!(method.visibility, Visibility::Protected);
        assert_eq!(method.descriptor.parameters.len(), 1);
        assert!(!method.is_static);
    }

    #[test]
    fn malformed_descriptor() {
        let name = BinaryName::from_string(String::from("lib/Bad")).unwrap();
        let mut builder =
            ClassBuilder::new(ClassAccessFlags::PUBLIC, &name, Some(&BinaryName::OBJECT)).unwrap();
        builder
            .add_field(FieldAccessFlags::PUBLIC, "oops", "Ljava/lang/String")
            .unwrap();
        assert!(matches!(
            ClassDescriptor::from_class_file(&builder.result()),
            Err(Error::MalformedDescriptor(_))
        ));
    }

    #[test]
    fn object_baseline() {
        let object = ClassDescriptor::object();
        assert_eq!(object.methods_named(&UnqualifiedName::WAIT).count(), 3);
        let to_string_name = UnqualifiedName::TOSTRING;
        let to_string = object
            .methods_named(&to_string_name)
            .next()
            .unwrap();
        assert_eq!(
            to_string.descriptor.return_type,
            Some(FieldType::object(BinaryName::STRING))
        );
    }
}
