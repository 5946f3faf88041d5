use crate::jvm::class_file::{
    Attribute, AttributeLike, ClassFile, Code, ExceptionHandler, Field, Method, Version,
};
use crate::jvm::code::{encode, Instruction};
use crate::jvm::{
    BinaryName, ClassAccessFlags, ClassConstantIndex, Constant, ConstantIndex, ConstantPool,
    Error, FieldAccessFlags, MethodAccessFlags, Name, NameAndTypeConstantIndex,
    Utf8ConstantIndex,
};
use crate::util::{Offset, OffsetVec, Width};
use std::collections::HashMap;

/// Class file constants pool builder
///
/// The pool is append only, and identical constants are only ever inserted once. Once the pool
/// is fully built up, it gets consumed into a regular [`ConstantPool`].
pub struct ConstantPoolBuilder {
    constants: OffsetVec<Constant>,

    utf8s: HashMap<String, Utf8ConstantIndex>,
    classes: HashMap<Utf8ConstantIndex, ClassConstantIndex>,
    strings: HashMap<Utf8ConstantIndex, ConstantIndex>,
    integers: HashMap<i32, ConstantIndex>,
    longs: HashMap<i64, ConstantIndex>,
    name_and_types: HashMap<(Utf8ConstantIndex, Utf8ConstantIndex), NameAndTypeConstantIndex>,
    fieldrefs: HashMap<(ClassConstantIndex, NameAndTypeConstantIndex), ConstantIndex>,
    methodrefs: HashMap<(ClassConstantIndex, NameAndTypeConstantIndex, bool), ConstantIndex>,
}

impl Default for ConstantPoolBuilder {
    fn default() -> Self {
        ConstantPoolBuilder::new()
    }
}

impl ConstantPoolBuilder {
    pub fn new() -> ConstantPoolBuilder {
        ConstantPoolBuilder {
            constants: OffsetVec::new_starting_at(Offset(1)),
            utf8s: HashMap::new(),
            classes: HashMap::new(),
            strings: HashMap::new(),
            integers: HashMap::new(),
            longs: HashMap::new(),
            name_and_types: HashMap::new(),
            fieldrefs: HashMap::new(),
            methodrefs: HashMap::new(),
        }
    }

    /// Push a constant into the constant pool, provided there is space for it
    ///
    /// Note: the largest valid index is 65535, indexing starts at 1, and some constants take two
    /// spaces.
    fn push_constant(&mut self, constant: Constant) -> Result<ConstantIndex, Error> {
        let offset: u16 = self.constants.offset_len().0 as u16;
        if offset.checked_add(constant.width() as u16).is_none() {
            return Err(Error::ConstantPoolOverflow { constant, offset });
        }

        self.constants.push(constant);
        Ok(ConstantIndex(offset))
    }

    /// Consume the builder and return the final pool
    pub fn into_pool(self) -> ConstantPool {
        ConstantPool::from_offset_vec(self.constants)
    }

    pub fn get_utf8(&mut self, utf8: &str) -> Result<Utf8ConstantIndex, Error> {
        if let Some(idx) = self.utf8s.get(utf8) {
            return Ok(*idx);
        }
        let idx = Utf8ConstantIndex(self.push_constant(Constant::Utf8(utf8.to_owned()))?);
        self.utf8s.insert(utf8.to_owned(), idx);
        Ok(idx)
    }

    /// Get or insert a class constant (array classes are named by their descriptor, eg. `[I`)
    pub fn get_class(&mut self, class_name: &str) -> Result<ClassConstantIndex, Error> {
        let name = self.get_utf8(class_name)?;
        if let Some(idx) = self.classes.get(&name) {
            return Ok(*idx);
        }
        let idx = ClassConstantIndex(self.push_constant(Constant::Class(name))?);
        self.classes.insert(name, idx);
        Ok(idx)
    }

    pub fn get_string(&mut self, string: &str) -> Result<ConstantIndex, Error> {
        let utf8 = self.get_utf8(string)?;
        if let Some(idx) = self.strings.get(&utf8) {
            return Ok(*idx);
        }
        let idx = self.push_constant(Constant::String(utf8))?;
        self.strings.insert(utf8, idx);
        Ok(idx)
    }

    pub fn get_integer(&mut self, integer: i32) -> Result<ConstantIndex, Error> {
        if let Some(idx) = self.integers.get(&integer) {
            return Ok(*idx);
        }
        let idx = self.push_constant(Constant::Integer(integer))?;
        self.integers.insert(integer, idx);
        Ok(idx)
    }

    pub fn get_long(&mut self, long: i64) -> Result<ConstantIndex, Error> {
        if let Some(idx) = self.longs.get(&long) {
            return Ok(*idx);
        }
        let idx = self.push_constant(Constant::Long(long))?;
        self.longs.insert(long, idx);
        Ok(idx)
    }

    pub fn get_name_and_type(
        &mut self,
        name: &str,
        descriptor: &str,
    ) -> Result<NameAndTypeConstantIndex, Error> {
        let key = (self.get_utf8(name)?, self.get_utf8(descriptor)?);
        if let Some(idx) = self.name_and_types.get(&key) {
            return Ok(*idx);
        }
        let constant = Constant::NameAndType {
            name: key.0,
            descriptor: key.1,
        };
        let idx = NameAndTypeConstantIndex(self.push_constant(constant)?);
        self.name_and_types.insert(key, idx);
        Ok(idx)
    }

    pub fn get_field_ref(
        &mut self,
        class_name: &str,
        name: &str,
        descriptor: &str,
    ) -> Result<ConstantIndex, Error> {
        let key = (
            self.get_class(class_name)?,
            self.get_name_and_type(name, descriptor)?,
        );
        if let Some(idx) = self.fieldrefs.get(&key) {
            return Ok(*idx);
        }
        let idx = self.push_constant(Constant::FieldRef(key.0, key.1))?;
        self.fieldrefs.insert(key, idx);
        Ok(idx)
    }

    pub fn get_method_ref(
        &mut self,
        class_name: &str,
        name: &str,
        descriptor: &str,
        is_interface: bool,
    ) -> Result<ConstantIndex, Error> {
        let key = (
            self.get_class(class_name)?,
            self.get_name_and_type(name, descriptor)?,
            is_interface,
        );
        if let Some(idx) = self.methodrefs.get(&key) {
            return Ok(*idx);
        }
        let constant = Constant::MethodRef {
            class: key.0,
            name_and_type: key.1,
            is_interface,
        };
        let idx = self.push_constant(constant)?;
        self.methodrefs.insert(key, idx);
        Ok(idx)
    }

    /// Serialize an attribute, registering its name in the pool
    pub fn get_attribute<A: AttributeLike>(&mut self, attribute: A) -> Result<Attribute, Error> {
        let name_index = self.get_utf8(A::NAME)?;
        let mut info = vec![];
        attribute.serialize(&mut info)?;
        Ok(Attribute { name_index, info })
    }
}

/// Incrementally assembles a [`ClassFile`]
///
/// This only goes as far as emitting structurally valid class files: there is no stack map
/// generation and the `max_stack`/`max_locals` of method bodies are not computed.
pub struct ClassBuilder {
    version: Version,
    pub constants: ConstantPoolBuilder,
    access_flags: ClassAccessFlags,
    this_class: ClassConstantIndex,
    super_class: Option<ClassConstantIndex>,
    interfaces: Vec<ClassConstantIndex>,
    fields: Vec<Field>,
    methods: Vec<Method>,
}

impl ClassBuilder {
    pub fn new(
        access_flags: ClassAccessFlags,
        this_class: &BinaryName,
        super_class: Option<&BinaryName>,
    ) -> Result<ClassBuilder, Error> {
        let mut constants = ConstantPoolBuilder::new();
        let this_class = constants.get_class(this_class.as_str())?;
        let super_class = super_class
            .map(|super_class| constants.get_class(super_class.as_str()))
            .transpose()?;

        Ok(ClassBuilder {
            version: Version::JAVA8,
            constants,
            access_flags,
            this_class,
            super_class,
            interfaces: vec![],
            fields: vec![],
            methods: vec![],
        })
    }

    pub fn add_interface(&mut self, interface: &str) -> Result<(), Error> {
        let interface = self.constants.get_class(interface)?;
        self.interfaces.push(interface);
        Ok(())
    }

    pub fn add_field(
        &mut self,
        access_flags: FieldAccessFlags,
        name: &str,
        descriptor: &str,
    ) -> Result<(), Error> {
        let name_index = self.constants.get_utf8(name)?;
        let descriptor_index = self.constants.get_utf8(descriptor)?;
        self.fields.push(Field {
            access_flags,
            name_index,
            descriptor_index,
            attributes: vec![],
        });
        Ok(())
    }

    /// Add a method without a body (for abstract and native methods)
    pub fn add_abstract_method(
        &mut self,
        access_flags: MethodAccessFlags,
        name: &str,
        descriptor: &str,
    ) -> Result<(), Error> {
        self.push_method(access_flags, name, descriptor, vec![])
    }

    pub fn add_method(
        &mut self,
        access_flags: MethodAccessFlags,
        name: &str,
        descriptor: &str,
        instructions: &[Instruction],
    ) -> Result<(), Error> {
        self.add_method_with_handlers(access_flags, name, descriptor, instructions, vec![])
    }

    pub fn add_method_with_handlers(
        &mut self,
        access_flags: MethodAccessFlags,
        name: &str,
        descriptor: &str,
        instructions: &[Instruction],
        exception_table: Vec<ExceptionHandler>,
    ) -> Result<(), Error> {
        let code = Code {
            max_stack: 16,
            max_locals: 16,
            code_array: encode(instructions)?,
            exception_table,
            attributes: vec![],
        };
        let code = self.constants.get_attribute(code)?;
        self.push_method(access_flags, name, descriptor, vec![code])
    }

    fn push_method(
        &mut self,
        access_flags: MethodAccessFlags,
        name: &str,
        descriptor: &str,
        attributes: Vec<Attribute>,
    ) -> Result<(), Error> {
        let name_index = self.constants.get_utf8(name)?;
        let descriptor_index = self.constants.get_utf8(descriptor)?;
        self.methods.push(Method {
            access_flags,
            name_index,
            descriptor_index,
            attributes,
        });
        Ok(())
    }

    pub fn result(self) -> ClassFile {
        ClassFile {
            version: self.version,
            constants: self.constants.into_pool(),
            access_flags: self.access_flags,
            this_class: self.this_class,
            super_class: self.super_class,
            interfaces: self.interfaces,
            fields: self.fields,
            methods: self.methods,
            attributes: vec![],
        }
    }

    pub fn to_bytes(self) -> Result<Vec<u8>, Error> {
        self.result().to_bytes()
    }
}
