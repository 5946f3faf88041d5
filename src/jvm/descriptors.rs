//! Field and method descriptors, as they appear in the constant pool
//!
//! Descriptors are generic over how classes are represented so that the same shapes can be used
//! for parsing (`BinaryName`) and for anything that interns classes differently.

use super::{BinaryName, Error, Name};
use std::iter::Peekable;
use std::str::Chars;

/// Cursor over the characters of a descriptor
pub type DescriptorChars<'a> = Peekable<Chars<'a>>;

/// Reason a descriptor was rejected (without the full descriptor text, which gets added by
/// [`ParseDescriptor::parse`])
pub type Rejection = String;

pub trait RenderDescriptor {
    fn render(&self) -> String {
        let mut rendered = String::new();
        self.render_to(&mut rendered);
        rendered
    }

    fn render_to(&self, out: &mut String);
}

pub trait ParseDescriptor: Sized {
    /// Parse a complete descriptor
    fn parse(source: &str) -> Result<Self, Error> {
        let mut chars = source.chars().peekable();
        Self::parse_from(&mut chars)
            .and_then(|parsed| match chars.next() {
                None => Ok(parsed),
                Some(c) => Err(format!("trailing '{}'", c)),
            })
            .map_err(|reason| Error::MalformedDescriptor(format!("'{}': {}", source, reason)))
    }

    /// Parse a prefix of the remaining characters
    fn parse_from(chars: &mut DescriptorChars) -> Result<Self, Rejection>;
}

/// Primitive value types
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub enum BaseType {
    Byte,
    Char,
    Double,
    Float,
    Int,
    Long,
    Short,
    Boolean,
}

impl BaseType {
    const ALL: [(char, BaseType); 8] = [
        ('B', BaseType::Byte),
        ('C', BaseType::Char),
        ('D', BaseType::Double),
        ('F', BaseType::Float),
        ('I', BaseType::Int),
        ('J', BaseType::Long),
        ('S', BaseType::Short),
        ('Z', BaseType::Boolean),
    ];

    fn from_char(c: char) -> Option<BaseType> {
        BaseType::ALL
            .iter()
            .find(|(tag, _)| *tag == c)
            .map(|(_, base_type)| *base_type)
    }

    fn to_char(self) -> char {
        BaseType::ALL
            .iter()
            .find(|(_, base_type)| *base_type == self)
            .map_or('?', |(tag, _)| *tag)
    }
}

impl RenderDescriptor for BaseType {
    fn render_to(&self, out: &mut String) {
        out.push(self.to_char());
    }
}

impl ParseDescriptor for BaseType {
    fn parse_from(chars: &mut DescriptorChars) -> Result<Self, Rejection> {
        match chars.next() {
            Some(c) => BaseType::from_char(c).ok_or_else(|| format!("'{}' is not a base type", c)),
            None => Err(String::from("expected a base type")),
        }
    }
}

/// Reference type
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub enum RefType<Class> {
    Object(Class),
    ObjectArray(ArrayType<Class>),
    PrimitiveArray(ArrayType<BaseType>),
}

/// Array of some element type
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct ArrayType<T> {
    /// Dimensions beyond the first (`A[]` has 0, `A[][][][]` has 3)
    pub additional_dimensions: usize,
    pub element_type: T,
}

impl<T: RenderDescriptor> RenderDescriptor for ArrayType<T> {
    fn render_to(&self, out: &mut String) {
        out.extend(std::iter::repeat('[').take(self.additional_dimensions + 1));
        self.element_type.render_to(out);
    }
}

impl RenderDescriptor for BinaryName {
    fn render_to(&self, out: &mut String) {
        out.push('L');
        out.push_str(self.as_str());
        out.push(';');
    }
}

impl ParseDescriptor for BinaryName {
    fn parse_from(chars: &mut DescriptorChars) -> Result<Self, Rejection> {
        if chars.next_if_eq(&'L').is_none() {
            return Err(String::from("expected 'L' to start a class"));
        }
        let mut class_name = String::new();
        for c in chars.by_ref() {
            if c == ';' {
                return BinaryName::from_string(class_name);
            }
            class_name.push(c);
        }
        Err(format!("class 'L{}' is missing its ';'", class_name))
    }
}

impl<C: RenderDescriptor> RenderDescriptor for RefType<C> {
    fn render_to(&self, out: &mut String) {
        match self {
            RefType::Object(class) => class.render_to(out),
            RefType::PrimitiveArray(array) => array.render_to(out),
            RefType::ObjectArray(array) => array.render_to(out),
        }
    }
}

impl<C: ParseDescriptor> ParseDescriptor for RefType<C> {
    fn parse_from(chars: &mut DescriptorChars) -> Result<Self, Rejection> {
        let mut dimensions = 0;
        while chars.next_if_eq(&'[').is_some() {
            dimensions += 1;
        }
        if dimensions == 0 {
            return C::parse_from(chars).map(RefType::Object);
        }

        let additional_dimensions = dimensions - 1;
        if chars.peek() == Some(&'L') {
            let element_type = C::parse_from(chars)?;
            Ok(RefType::ObjectArray(ArrayType {
                additional_dimensions,
                element_type,
            }))
        } else {
            let element_type = BaseType::parse_from(chars)?;
            Ok(RefType::PrimitiveArray(ArrayType {
                additional_dimensions,
                element_type,
            }))
        }
    }
}

impl<C> RefType<C> {
    /// Class at the bottom of the type, if there is one (`Foo` for both `Foo` and `Foo[][]`)
    pub fn element_class(&self) -> Option<&C> {
        match self {
            RefType::Object(class) => Some(class),
            RefType::ObjectArray(array) => Some(&array.element_type),
            RefType::PrimitiveArray(_) => None,
        }
    }
}

/// Type of a field, parameter, or return value
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub enum FieldType<Class> {
    Base(BaseType),
    Ref(RefType<Class>),
}

impl<C> FieldType<C> {
    pub const fn object(class_name: C) -> FieldType<C> {
        FieldType::Ref(RefType::Object(class_name))
    }

    pub const fn int() -> FieldType<C> {
        FieldType::Base(BaseType::Int)
    }

    pub const fn long() -> FieldType<C> {
        FieldType::Base(BaseType::Long)
    }

    pub const fn boolean() -> FieldType<C> {
        FieldType::Base(BaseType::Boolean)
    }

    /// Class mentioned by this type (if any)
    pub fn class(&self) -> Option<&C> {
        match self {
            FieldType::Base(_) => None,
            FieldType::Ref(ref_type) => ref_type.element_class(),
        }
    }
}

impl<C: RenderDescriptor> RenderDescriptor for FieldType<C> {
    fn render_to(&self, out: &mut String) {
        match self {
            FieldType::Base(base_type) => base_type.render_to(out),
            FieldType::Ref(ref_type) => ref_type.render_to(out),
        }
    }
}

impl<C: ParseDescriptor> ParseDescriptor for FieldType<C> {
    fn parse_from(chars: &mut DescriptorChars) -> Result<Self, Rejection> {
        match chars.peek().copied() {
            Some('L' | '[') => RefType::parse_from(chars).map(FieldType::Ref),
            Some(_) => BaseType::parse_from(chars).map(FieldType::Base),
            None => Err(String::from("expected a field type")),
        }
    }
}

/// Signature of a method
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct MethodDescriptor<Class> {
    pub parameters: Vec<FieldType<Class>>,

    /// `None` for `void`
    pub return_type: Option<FieldType<Class>>,
}

impl<C> MethodDescriptor<C> {
    /// Every class mentioned in the parameters or the return type
    pub fn classes(&self) -> impl Iterator<Item = &C> + '_ {
        self.parameters
            .iter()
            .chain(self.return_type.iter())
            .filter_map(FieldType::class)
    }
}

impl<C: RenderDescriptor> RenderDescriptor for MethodDescriptor<C> {
    fn render_to(&self, out: &mut String) {
        out.push('(');
        for parameter in &self.parameters {
            parameter.render_to(out);
        }
        out.push(')');
        match &self.return_type {
            Some(return_type) => return_type.render_to(out),
            None => out.push('V'),
        }
    }
}

impl<C: ParseDescriptor> ParseDescriptor for MethodDescriptor<C> {
    fn parse_from(chars: &mut DescriptorChars) -> Result<Self, Rejection> {
        if chars.next_if_eq(&'(').is_none() {
            return Err(String::from("expected '(' to start the parameters"));
        }

        let mut parameters = vec![];
        while chars.next_if_eq(&')').is_none() {
            if chars.peek().is_none() {
                return Err(String::from("parameters are missing their ')'"));
            }
            parameters.push(FieldType::parse_from(chars)?);
        }

        let return_type = match chars.next_if_eq(&'V') {
            Some(_) => None,
            None => Some(FieldType::parse_from(chars)?),
        };
        Ok(MethodDescriptor {
            parameters,
            return_type,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    type FT = FieldType<BinaryName>;
    type MD = MethodDescriptor<BinaryName>;

    #[test]
    fn arrays() {
        let matrix = FT::parse("[[[D").unwrap();
        assert_eq!(
            matrix,
            FieldType::Ref(RefType::PrimitiveArray(ArrayType {
                additional_dimensions: 2,
                element_type: BaseType::Double,
            }))
        );
        assert_eq!(matrix.class(), None);
        assert_eq!(matrix.render(), "[[[D");

        let strings = FT::parse("[Ljava/lang/String;").unwrap();
        assert_eq!(strings.class(), Some(&BinaryName::STRING));
        assert_eq!(strings.render(), "[Ljava/lang/String;");
    }

    #[test]
    fn method_descriptors() {
        let descriptor = MD::parse("(IDLjava/lang/String;)Ljava/lang/Object;").unwrap();
        assert_eq!(
            descriptor,
            MethodDescriptor {
                parameters: vec![
                    FieldType::int(),
                    FieldType::Base(BaseType::Double),
                    FieldType::object(BinaryName::STRING),
                ],
                return_type: Some(FieldType::object(BinaryName::OBJECT)),
            }
        );
        assert_eq!(descriptor.render(), "(IDLjava/lang/String;)Ljava/lang/Object;");

        let void = MD::parse("()V").unwrap();
        assert!(void.parameters.is_empty());
        assert_eq!(void.return_type, None);
    }

    #[test]
    fn malformed_descriptors() {
        for bad in ["(I", "I)V", "()VV", "()", "(Q)V"] {
            assert!(
                matches!(MD::parse(bad), Err(Error::MalformedDescriptor(_))),
                "{} should be rejected",
                bad
            );
        }
        for bad in ["Ljava/lang/Object", "Q", "[", "L;", ""] {
            assert!(FT::parse(bad).is_err(), "{} should be rejected", bad);
        }

        match MD::parse("(Ljava/lang/Object)V") {
            Err(Error::MalformedDescriptor(msg)) => {
                assert!(msg.starts_with("'(Ljava/lang/Object)V'"), "{}", msg)
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn mentioned_classes() {
        let desc = MD::parse("(I[[Ljava/lang/String;[J)Ljava/lang/Integer;").unwrap();
        let classes: Vec<&BinaryName> = desc.classes().collect();
        assert_eq!(classes, vec![&BinaryName::STRING, &BinaryName::INTEGER]);
    }
}
