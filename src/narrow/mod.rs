//! Narrow filter engine.
//!
//! Data flows one direction: raw query string -> parsed terms ->
//! canonicalized terms -> term types -> compiled predicate + derived view
//! metadata. The compiled predicate decides inclusion of already-fetched
//! messages in an in-memory cache; the server independently filters full
//! history and stays authoritative.
//!
//! - **[`term`]**: operator vocabulary, terms, canonicalization.
//! - **[`parser`]**: query string <-> term list.
//! - **[`term_type`]**: term-type tags and their priority ordering.
//! - **[`filter`]**: the immutable [`Filter`] value object and predicate.
//! - **[`view`]**: title/icon/redirect and other shape-derived queries.

pub mod filter;
pub(crate) mod matcher;
pub mod parser;
pub mod term;
pub mod term_type;
pub mod view;

pub use filter::Filter;
pub use term::{Operator, Term, canonicalize_term};
pub use view::NarrowIcon;
