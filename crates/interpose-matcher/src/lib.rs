//! interpose matcher - Selection predicates
//!
//! A `Matcher` is a pure boolean predicate over a descriptor. Matchers compose
//! with `and` / `or` / `not` (or `&`, `|`, `!`), share subtrees by reference,
//! and never fail at evaluation time: a malformed pattern is rejected when the
//! matcher is built.

pub mod matcher;
pub mod pattern;
pub mod namespaces;
pub mod recipes;

pub use matcher::*;
pub use pattern::*;
pub use namespaces::*;
pub use recipes::*;
