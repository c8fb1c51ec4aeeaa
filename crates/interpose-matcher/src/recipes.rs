//! Common selection recipes

use interpose_core::ConfigurationError;

use crate::Matcher;

/// REST entry-point annotation
pub const REST_CONTROLLER: &str = "org.springframework.web.bind.annotation.RestController";

/// MVC entry-point annotation
pub const CONTROLLER: &str = "org.springframework.stereotype.Controller";

/// Types under a namespace prefix, e.g. `org.example.service`
pub fn package_starts_with(prefix: &str) -> Matcher {
    Matcher::name_starts_with(prefix)
}

/// Types whose name matches a regex, e.g. `.*\.service\..*`
pub fn package_matches(pattern: &str) -> Result<Matcher, ConfigurationError> {
    Matcher::name_matches(pattern)
}

pub fn class_name_ends_with(suffix: &str) -> Matcher {
    Matcher::name_ends_with(suffix)
}

pub fn class_name_contains(infix: &str) -> Matcher {
    Matcher::name_contains(infix)
}

/// Types under `prefix` whose name ends with `suffix`
pub fn package_and_class(prefix: &str, suffix: &str) -> Matcher {
    Matcher::name_starts_with(prefix).and(Matcher::name_ends_with(suffix))
}

pub fn method_name_starts_with(prefix: &str) -> Matcher {
    Matcher::name_starts_with(prefix)
}

pub fn method_name_ends_with(suffix: &str) -> Matcher {
    Matcher::name_ends_with(suffix)
}

pub fn method_name_matches(pattern: &str) -> Result<Matcher, ConfigurationError> {
    Matcher::name_matches(pattern)
}

pub fn returns_type(type_name: &str) -> Matcher {
    Matcher::returns(type_name)
}

pub fn takes_arguments(type_names: &[&str]) -> Matcher {
    Matcher::takes_arguments(type_names.iter().copied())
}

/// Web entry-point classes (REST controllers and MVC controllers)
pub fn web_entry_point() -> Matcher {
    Matcher::annotated_with(REST_CONTROLLER).or(Matcher::annotated_with(CONTROLLER))
}

/// Public instance methods, constructors excluded
pub fn interceptable_method() -> Matcher {
    Matcher::IsPublic & !Matcher::IsStatic & !Matcher::IsConstructor
}
