//! Type and method descriptors
//!
//! Descriptors are immutable views of a candidate built once at discovery
//! time. Matchers evaluate over these plain values and never re-inspect the
//! host, which keeps every evaluation a pure function of its input.

use std::collections::BTreeSet;
use std::fmt;

/// Visibility and kind modifiers (1 byte)
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Modifiers(pub u8);

impl Modifiers {
    pub const NONE: Modifiers = Modifiers(0);

    // Modifier bits
    pub const PUBLIC: u8 = 0b0000_0001;
    pub const STATIC: u8 = 0b0000_0010;
    pub const CONSTRUCTOR: u8 = 0b0000_0100;
    pub const ABSTRACT: u8 = 0b0000_1000;

    #[inline]
    pub fn new(bits: u8) -> Self {
        Modifiers(bits)
    }

    /// Public instance member, the common case
    #[inline]
    pub fn public() -> Self {
        Modifiers(Self::PUBLIC)
    }

    #[inline]
    pub fn is_public(self) -> bool {
        self.0 & Self::PUBLIC != 0
    }

    #[inline]
    pub fn is_static(self) -> bool {
        self.0 & Self::STATIC != 0
    }

    #[inline]
    pub fn is_constructor(self) -> bool {
        self.0 & Self::CONSTRUCTOR != 0
    }

    #[inline]
    pub fn is_abstract(self) -> bool {
        self.0 & Self::ABSTRACT != 0
    }

    #[inline]
    pub fn with(self, bits: u8) -> Self {
        Modifiers(self.0 | bits)
    }

    #[inline]
    pub fn without(self, bits: u8) -> Self {
        Modifiers(self.0 & !bits)
    }
}

impl fmt::Display for Modifiers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if self.is_public() {
            parts.push("public");
        }
        if self.is_static() {
            parts.push("static");
        }
        if self.is_abstract() {
            parts.push("abstract");
        }
        f.write_str(&parts.join(" "))
    }
}

/// Common view over type and method descriptors
///
/// Name-based matchers read `name()`: the fully qualified name for types and
/// the simple name for methods.
pub trait Element {
    fn name(&self) -> &str;

    fn annotations(&self) -> &BTreeSet<String>;

    fn modifiers(&self) -> Modifiers;

    fn is_annotated_with(&self, annotation: &str) -> bool {
        self.annotations().contains(annotation)
    }

    /// Return type name, for elements that have one
    fn return_type(&self) -> Option<&str> {
        None
    }

    /// Ordered parameter type names, for elements that have them
    fn parameter_types(&self) -> Option<&[String]> {
        None
    }

    /// Whether `name` is a direct super class or interface
    fn has_super_type(&self, _name: &str) -> bool {
        false
    }
}

/// Read-only view of a candidate method
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MethodDescriptor {
    /// Simple method name
    pub name: String,
    /// Fully qualified name of the declaring type
    pub declaring_type: String,
    /// Parameter type names, in declaration order
    pub parameter_types: Vec<String>,
    /// Return type name (`void` for none)
    pub return_type: String,
    pub modifiers: Modifiers,
    pub annotations: BTreeSet<String>,
}

impl MethodDescriptor {
    /// Create a public, parameterless `void` method
    pub fn new(name: impl Into<String>) -> Self {
        MethodDescriptor {
            name: name.into(),
            declaring_type: String::new(),
            parameter_types: Vec::new(),
            return_type: "void".to_string(),
            modifiers: Modifiers::public(),
            annotations: BTreeSet::new(),
        }
    }

    /// Create a public constructor
    pub fn constructor() -> Self {
        MethodDescriptor::new("<init>")
            .with_modifiers(Modifiers::public().with(Modifiers::CONSTRUCTOR))
    }

    pub fn with_parameter(mut self, type_name: impl Into<String>) -> Self {
        self.parameter_types.push(type_name.into());
        self
    }

    pub fn returning(mut self, type_name: impl Into<String>) -> Self {
        self.return_type = type_name.into();
        self
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    pub fn with_annotation(mut self, annotation: impl Into<String>) -> Self {
        self.annotations.insert(annotation.into());
        self
    }

    /// Set the declaring type
    pub fn declared_by(mut self, type_name: impl Into<String>) -> Self {
        self.declaring_type = type_name.into();
        self
    }

    pub fn is_void(&self) -> bool {
        self.return_type == "void"
    }

    /// Full signature, e.g. `public java.lang.String a.B.get(java.lang.Long)`
    pub fn signature(&self) -> String {
        let modifiers = self.modifiers.to_string();
        let params = self.parameter_types.join(",");
        let mut out = String::new();
        if !modifiers.is_empty() {
            out.push_str(&modifiers);
            out.push(' ');
        }
        if !self.modifiers.is_constructor() {
            out.push_str(&self.return_type);
            out.push(' ');
        }
        if !self.declaring_type.is_empty() {
            out.push_str(&self.declaring_type);
            out.push('.');
        }
        out.push_str(&self.name);
        out.push('(');
        out.push_str(&params);
        out.push(')');
        out
    }
}

impl Element for MethodDescriptor {
    fn name(&self) -> &str {
        &self.name
    }

    fn annotations(&self) -> &BTreeSet<String> {
        &self.annotations
    }

    fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    fn return_type(&self) -> Option<&str> {
        Some(&self.return_type)
    }

    fn parameter_types(&self) -> Option<&[String]> {
        Some(&self.parameter_types)
    }
}

/// Read-only view of a candidate type
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TypeDescriptor {
    /// Fully qualified name
    pub name: String,
    /// Package (namespace) part of the name, empty for the default package
    pub package: String,
    pub annotations: BTreeSet<String>,
    pub super_class: Option<String>,
    pub interfaces: Vec<String>,
    pub modifiers: Modifiers,
    /// Declared methods, in declaration order
    pub methods: Vec<MethodDescriptor>,
}

impl TypeDescriptor {
    /// Create a public type with no annotations or methods
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let package = match name.rfind('.') {
            Some(pos) => name[..pos].to_string(),
            None => String::new(),
        };
        TypeDescriptor {
            name,
            package,
            annotations: BTreeSet::new(),
            super_class: None,
            interfaces: Vec::new(),
            modifiers: Modifiers::public(),
            methods: Vec::new(),
        }
    }

    pub fn with_annotation(mut self, annotation: impl Into<String>) -> Self {
        self.annotations.insert(annotation.into());
        self
    }

    pub fn with_super_class(mut self, name: impl Into<String>) -> Self {
        self.super_class = Some(name.into());
        self
    }

    pub fn with_interface(mut self, name: impl Into<String>) -> Self {
        self.interfaces.push(name.into());
        self
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// Add a method; its declaring type is set to this type
    pub fn with_method(mut self, method: MethodDescriptor) -> Self {
        self.methods.push(method.declared_by(self.name.clone()));
        self
    }

    /// Name without the package prefix
    pub fn simple_name(&self) -> &str {
        match self.name.rfind('.') {
            Some(pos) => &self.name[pos + 1..],
            None => &self.name,
        }
    }

    /// Find a declared method by name
    pub fn method(&self, name: &str) -> Option<&MethodDescriptor> {
        self.methods.iter().find(|m| m.name == name)
    }
}

impl Element for TypeDescriptor {
    fn name(&self) -> &str {
        &self.name
    }

    fn annotations(&self) -> &BTreeSet<String> {
        &self.annotations
    }

    fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    fn has_super_type(&self, name: &str) -> bool {
        self.super_class.as_deref() == Some(name) || self.interfaces.iter().any(|i| i == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_package_and_simple_name() {
        let ty = TypeDescriptor::new("org.example.service.UserService");
        assert_eq!(ty.package, "org.example.service");
        assert_eq!(ty.simple_name(), "UserService");

        let bare = TypeDescriptor::new("Main");
        assert_eq!(bare.package, "");
        assert_eq!(bare.simple_name(), "Main");
    }

    #[test]
    fn test_with_method_sets_declaring_type() {
        let ty = TypeDescriptor::new("org.example.dao.UserDao")
            .with_method(MethodDescriptor::new("insert").with_parameter("java.lang.String"));

        let insert = ty.method("insert").unwrap();
        assert_eq!(insert.declaring_type, "org.example.dao.UserDao");
        assert!(insert.is_void());
    }

    #[test]
    fn test_signature() {
        let m = MethodDescriptor::new("getUserById")
            .with_parameter("java.lang.Long")
            .returning("java.lang.String")
            .declared_by("org.example.service.UserService");

        assert_eq!(
            m.signature(),
            "public java.lang.String org.example.service.UserService.getUserById(java.lang.Long)"
        );
    }

    #[test]
    fn test_modifier_bits() {
        let m = Modifiers::public().with(Modifiers::STATIC);
        assert!(m.is_public());
        assert!(m.is_static());
        assert!(!m.is_constructor());
        assert!(!m.without(Modifiers::PUBLIC).is_public());
        assert!(MethodDescriptor::constructor().modifiers.is_constructor());
    }

    #[test]
    fn test_super_types() {
        let ty = TypeDescriptor::new("a.B")
            .with_super_class("a.Base")
            .with_interface("a.Api");
        assert!(ty.has_super_type("a.Base"));
        assert!(ty.has_super_type("a.Api"));
        assert!(!ty.has_super_type("a.Other"));
    }
}
