//! Matcher algebra

use std::fmt;
use std::ops;
use std::sync::Arc;

use interpose_core::{ConfigurationError, Element};

use crate::Pattern;

/// Boolean predicate over a type or method descriptor
///
/// Name predicates read `Element::name()`: the fully qualified name for
/// types, the simple name for methods. Predicates that need data an element
/// does not carry (e.g. `Returns` on a type) evaluate to false.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Matcher {
    /// Matches everything
    Any,
    /// Matches nothing
    None,
    /// Exact name
    Named(String),
    NameStartsWith(String),
    NameEndsWith(String),
    NameContains(String),
    /// Whole-name regular expression
    NameMatches(Pattern),
    /// Annotation name is in the element's annotation set
    AnnotatedWith(String),
    IsPublic,
    IsStatic,
    IsConstructor,
    /// Return type name
    Returns(String),
    /// Exact ordered parameter type names
    TakesArguments(Vec<String>),
    TakesArgumentCount(usize),
    /// Direct super class or interface
    HasSuperType(String),
    /// Short-circuits left to right
    And(Arc<Matcher>, Arc<Matcher>),
    /// Short-circuits left to right
    Or(Arc<Matcher>, Arc<Matcher>),
    Not(Arc<Matcher>),
}

impl Matcher {
    pub fn named(name: impl Into<String>) -> Self {
        Matcher::Named(name.into())
    }

    pub fn name_starts_with(prefix: impl Into<String>) -> Self {
        Matcher::NameStartsWith(prefix.into())
    }

    pub fn name_ends_with(suffix: impl Into<String>) -> Self {
        Matcher::NameEndsWith(suffix.into())
    }

    pub fn name_contains(infix: impl Into<String>) -> Self {
        Matcher::NameContains(infix.into())
    }

    /// Whole-name regex; fails on a malformed pattern
    pub fn name_matches(pattern: &str) -> Result<Self, ConfigurationError> {
        Ok(Matcher::NameMatches(Pattern::new(pattern)?))
    }

    pub fn annotated_with(annotation: impl Into<String>) -> Self {
        Matcher::AnnotatedWith(annotation.into())
    }

    pub fn returns(type_name: impl Into<String>) -> Self {
        Matcher::Returns(type_name.into())
    }

    pub fn takes_arguments<I, S>(type_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Matcher::TakesArguments(type_names.into_iter().map(Into::into).collect())
    }

    pub fn has_super_type(name: impl Into<String>) -> Self {
        Matcher::HasSuperType(name.into())
    }

    pub fn and(self, other: Matcher) -> Self {
        Matcher::And(Arc::new(self), Arc::new(other))
    }

    pub fn or(self, other: Matcher) -> Self {
        Matcher::Or(Arc::new(self), Arc::new(other))
    }

    pub fn negate(self) -> Self {
        Matcher::Not(Arc::new(self))
    }

    /// Disjunction of all `matchers`; `None` when empty
    pub fn any_of(matchers: impl IntoIterator<Item = Matcher>) -> Self {
        matchers
            .into_iter()
            .reduce(Matcher::or)
            .unwrap_or(Matcher::None)
    }

    /// Conjunction of all `matchers`; `Any` when empty
    pub fn all_of(matchers: impl IntoIterator<Item = Matcher>) -> Self {
        matchers
            .into_iter()
            .reduce(Matcher::and)
            .unwrap_or(Matcher::Any)
    }

    /// Evaluate against a descriptor
    pub fn matches<E: Element + ?Sized>(&self, element: &E) -> bool {
        match self {
            Matcher::Any => true,
            Matcher::None => false,
            Matcher::Named(name) => element.name() == name.as_str(),
            Matcher::NameStartsWith(prefix) => element.name().starts_with(prefix.as_str()),
            Matcher::NameEndsWith(suffix) => element.name().ends_with(suffix.as_str()),
            Matcher::NameContains(infix) => element.name().contains(infix.as_str()),
            Matcher::NameMatches(pattern) => pattern.is_match(element.name()),
            Matcher::AnnotatedWith(annotation) => element.is_annotated_with(annotation),
            Matcher::IsPublic => element.modifiers().is_public(),
            Matcher::IsStatic => element.modifiers().is_static(),
            Matcher::IsConstructor => element.modifiers().is_constructor(),
            Matcher::Returns(type_name) => element.return_type() == Some(type_name.as_str()),
            Matcher::TakesArguments(types) => element
                .parameter_types()
                .is_some_and(|params| params == types.as_slice()),
            Matcher::TakesArgumentCount(count) => element
                .parameter_types()
                .is_some_and(|params| params.len() == *count),
            Matcher::HasSuperType(name) => element.has_super_type(name),
            Matcher::And(left, right) => left.matches(element) && right.matches(element),
            Matcher::Or(left, right) => left.matches(element) || right.matches(element),
            Matcher::Not(inner) => !inner.matches(element),
        }
    }
}

impl Default for Matcher {
    fn default() -> Self {
        Matcher::Any
    }
}

impl ops::BitAnd for Matcher {
    type Output = Matcher;

    fn bitand(self, rhs: Matcher) -> Matcher {
        self.and(rhs)
    }
}

impl ops::BitOr for Matcher {
    type Output = Matcher;

    fn bitor(self, rhs: Matcher) -> Matcher {
        self.or(rhs)
    }
}

impl ops::Not for Matcher {
    type Output = Matcher;

    fn not(self) -> Matcher {
        self.negate()
    }
}

impl fmt::Display for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Matcher::Any => f.write_str("any()"),
            Matcher::None => f.write_str("none()"),
            Matcher::Named(n) => write!(f, "name({:?})", n),
            Matcher::NameStartsWith(p) => write!(f, "name().startsWith({:?})", p),
            Matcher::NameEndsWith(s) => write!(f, "name().endsWith({:?})", s),
            Matcher::NameContains(s) => write!(f, "name().contains({:?})", s),
            Matcher::NameMatches(p) => write!(f, "name().matches({:?})", p.source()),
            Matcher::AnnotatedWith(a) => write!(f, "isAnnotatedWith({})", a),
            Matcher::IsPublic => f.write_str("isPublic()"),
            Matcher::IsStatic => f.write_str("isStatic()"),
            Matcher::IsConstructor => f.write_str("isConstructor()"),
            Matcher::Returns(t) => write!(f, "returns({})", t),
            Matcher::TakesArguments(ts) => write!(f, "takesArguments({})", ts.join(", ")),
            Matcher::TakesArgumentCount(n) => write!(f, "takesArguments({})", n),
            Matcher::HasSuperType(t) => write!(f, "hasSuperType({})", t),
            Matcher::And(l, r) => write!(f, "({} and {})", l, r),
            Matcher::Or(l, r) => write!(f, "({} or {})", l, r),
            Matcher::Not(m) => write!(f, "not({})", m),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use interpose_core::{MethodDescriptor, Modifiers, TypeDescriptor};
    use proptest::prelude::*;

    fn user_service() -> TypeDescriptor {
        TypeDescriptor::new("org.example.service.UserService")
            .with_annotation("org.springframework.stereotype.Service")
            .with_interface("org.example.service.Api")
    }

    #[test]
    fn test_name_predicates() {
        let ty = user_service();
        assert!(Matcher::name_starts_with("org.example").matches(&ty));
        assert!(Matcher::name_ends_with("Service").matches(&ty));
        assert!(Matcher::name_contains(".service.").matches(&ty));
        assert!(Matcher::named("org.example.service.UserService").matches(&ty));
        assert!(!Matcher::named("UserService").matches(&ty));
        assert!(Matcher::name_matches(r"org\.example\..*Service")
            .unwrap()
            .matches(&ty));
    }

    #[test]
    fn test_annotation_is_set_membership() {
        let ty = user_service();
        assert!(Matcher::annotated_with("org.springframework.stereotype.Service").matches(&ty));
        assert!(!Matcher::annotated_with("Service").matches(&ty));
    }

    #[test]
    fn test_method_predicates() {
        let get = MethodDescriptor::new("getUserById")
            .with_parameter("java.lang.Long")
            .returning("java.lang.String");
        let ctor = MethodDescriptor::constructor();
        let util = MethodDescriptor::new("of").with_modifiers(Modifiers::public().with(Modifiers::STATIC));

        let interceptable = Matcher::IsPublic & !Matcher::IsStatic & !Matcher::IsConstructor;
        assert!(interceptable.matches(&get));
        assert!(!interceptable.matches(&ctor));
        assert!(!interceptable.matches(&util));

        assert!(Matcher::returns("java.lang.String").matches(&get));
        assert!(Matcher::takes_arguments(["java.lang.Long"]).matches(&get));
        assert!(!Matcher::takes_arguments(["java.lang.String"]).matches(&get));
        assert!(Matcher::TakesArgumentCount(1).matches(&get));
        assert!(Matcher::TakesArgumentCount(0).matches(&ctor));
    }

    #[test]
    fn test_method_only_predicates_are_false_on_types() {
        let ty = user_service();
        assert!(!Matcher::returns("void").matches(&ty));
        assert!(!Matcher::TakesArgumentCount(0).matches(&ty));
        assert!(Matcher::has_super_type("org.example.service.Api").matches(&ty));
    }

    #[test]
    fn test_empty_folds() {
        let ty = user_service();
        assert!(Matcher::all_of([]).matches(&ty));
        assert!(!Matcher::any_of([]).matches(&ty));
    }

    #[test]
    fn test_shared_subtrees_compare_structurally() {
        let shared = Matcher::name_starts_with("com.x");
        let a = shared.clone().and(Matcher::IsPublic);
        let b = Matcher::name_starts_with("com.x").and(Matcher::IsPublic);
        assert_eq!(a, b);
        assert_eq!(a.to_string(), r#"(name().startsWith("com.x") and isPublic())"#);
    }

    fn arb_leaf() -> impl Strategy<Value = Matcher> {
        prop_oneof![
            Just(Matcher::Any),
            Just(Matcher::None),
            Just(Matcher::IsPublic),
            Just(Matcher::IsStatic),
            Just(Matcher::IsConstructor),
            "[ab.]{0,3}".prop_map(Matcher::NameStartsWith),
            "[ab.]{0,3}".prop_map(Matcher::NameEndsWith),
            "[ab.]{0,2}".prop_map(Matcher::NameContains),
            prop_oneof![Just("A"), Just("B")].prop_map(Matcher::annotated_with),
        ]
    }

    fn arb_matcher() -> impl Strategy<Value = Matcher> {
        arb_leaf().prop_recursive(4, 24, 2, |inner| {
            prop_oneof![
                (inner.clone(), inner.clone()).prop_map(|(a, b)| a.and(b)),
                (inner.clone(), inner.clone()).prop_map(|(a, b)| a.or(b)),
                inner.prop_map(Matcher::negate),
            ]
        })
    }

    fn arb_type() -> impl Strategy<Value = TypeDescriptor> {
        ("[ab.]{0,6}", 0u8..16, any::<bool>(), any::<bool>()).prop_map(|(name, bits, a, b)| {
            let mut ty = TypeDescriptor::new(name).with_modifiers(Modifiers::new(bits));
            if a {
                ty = ty.with_annotation("A");
            }
            if b {
                ty = ty.with_annotation("B");
            }
            ty
        })
    }

    proptest! {
        #[test]
        fn and_is_conjunction(a in arb_matcher(), b in arb_matcher(), ty in arb_type()) {
            prop_assert_eq!(a.clone().and(b.clone()).matches(&ty), a.matches(&ty) && b.matches(&ty));
        }

        #[test]
        fn or_is_disjunction(a in arb_matcher(), b in arb_matcher(), ty in arb_type()) {
            prop_assert_eq!(a.clone().or(b.clone()).matches(&ty), a.matches(&ty) || b.matches(&ty));
        }

        #[test]
        fn not_inverts(a in arb_matcher(), ty in arb_type()) {
            prop_assert_eq!((!a.clone()).matches(&ty), !a.matches(&ty));
            prop_assert_eq!((!!a.clone()).matches(&ty), a.matches(&ty));
        }

        #[test]
        fn de_morgan(a in arb_matcher(), b in arb_matcher(), ty in arb_type()) {
            let lhs = !(a.clone() & b.clone());
            let rhs = !a.clone() | !b.clone();
            prop_assert_eq!(lhs.matches(&ty), rhs.matches(&ty));

            let lhs = !(a.clone() | b.clone());
            let rhs = !a & !b;
            prop_assert_eq!(lhs.matches(&ty), rhs.matches(&ty));
        }

        #[test]
        fn evaluation_is_deterministic(a in arb_matcher(), ty in arb_type()) {
            prop_assert_eq!(a.matches(&ty), a.matches(&ty.clone()));
        }
    }
}
