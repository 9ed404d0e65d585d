//! The immutable narrow filter value object.
//!
//! A [`Filter`] is constructed once per view change and never mutates:
//! terms are canonicalized and every derived value (sorted term types,
//! mark-read eligibility, the compiled predicate) is computed up front. If
//! the realm data a filter closes over changes, construct a new filter.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::directory::{Directory, Subscription};
use crate::model::types::Message;
use crate::narrow::matcher::{self, CompiledTerm};
use crate::narrow::parser;
use crate::narrow::term::{Operator, Term, canonicalize_term};
use crate::narrow::term_type::{sorted_term_types, term_type};
use crate::narrow::view;

/// Compiled filtering strategy.
#[derive(Clone)]
enum Predicate {
    /// Local evaluation cannot be trusted; the server's result set is
    /// authoritative and everything matches.
    TrustServer,
    Conjunction(Vec<CompiledTerm>),
}

#[derive(Clone)]
pub struct Filter {
    terms: Vec<Term>,
    directory: Arc<dyn Directory>,
    sub: Option<Subscription>,
    sorted_term_types: Vec<String>,
    can_mark_messages_read: bool,
    predicate: Predicate,
}

impl Filter {
    /// Build a filter from pre-parsed terms.
    ///
    /// Terms are canonicalized against the directory, a redundant `is:dm`
    /// alongside a `dm` term is stripped, and the stream subscription is
    /// resolved once (a later stream rename does not refresh it).
    pub fn new(terms: Vec<Term>, directory: Arc<dyn Directory>) -> Filter {
        let mut terms: Vec<Term> = terms
            .into_iter()
            .map(|term| canonicalize_term(term, directory.as_ref()))
            .collect();
        if terms.iter().any(|term| term_type(term) == "dm") {
            terms.retain(|term| term_type(term) != "is-dm");
        }

        let sub = terms
            .iter()
            .find(|term| term.operator == Operator::Stream && !term.negated)
            .and_then(|term| directory.subscription(&term.operand));

        let types: Vec<String> = terms.iter().map(term_type).collect();
        let sorted = sorted_term_types(&types);
        let can_mark_messages_read = view::shape_can_mark_messages_read(&sorted);
        let predicate = compile_predicate(&terms, directory.as_ref());
        debug!(
            terms = terms.len(),
            locally_evaluable = matches!(predicate, Predicate::Conjunction(_)),
            "filter_built"
        );

        Filter {
            terms,
            directory,
            sub,
            sorted_term_types: sorted,
            can_mark_messages_read,
            predicate,
        }
    }

    /// Parse a query string and build a filter from it.
    pub fn from_query(query: &str, directory: Arc<dyn Directory>) -> Filter {
        Filter::new(parser::parse(query), directory)
    }

    pub fn operators(&self) -> &[Term] {
        &self.terms
    }

    /// Operands of every non-negated term with this operator.
    pub fn operands(&self, operator: &Operator) -> Vec<String> {
        self.terms
            .iter()
            .filter(|term| !term.negated && term.operator == *operator)
            .map(|term| term.operand.clone())
            .collect()
    }

    pub fn terms_with<'a>(&'a self, operator: &'a Operator) -> impl Iterator<Item = &'a Term> {
        self.terms
            .iter()
            .filter(move |term| term.operator == *operator)
    }

    /// True when a non-negated term with this operator is present.
    pub fn has_operator(&self, operator: &Operator) -> bool {
        self.terms
            .iter()
            .any(|term| !term.negated && term.operator == *operator)
    }

    pub fn has_operand(&self, operator: &Operator, operand: &str) -> bool {
        self.terms
            .iter()
            .any(|term| !term.negated && term.operator == *operator && term.operand == operand)
    }

    pub fn has_negated_operand(&self, operator: &Operator, operand: &str) -> bool {
        self.terms
            .iter()
            .any(|term| term.negated && term.operator == *operator && term.operand == operand)
    }

    /// The stream subscription resolved at construction, if any.
    pub fn sub(&self) -> Option<&Subscription> {
        self.sub.as_ref()
    }

    pub fn sorted_term_types(&self) -> &[String] {
        &self.sorted_term_types
    }

    pub fn can_mark_messages_read(&self) -> bool {
        self.can_mark_messages_read
    }

    pub fn is_search_view(&self) -> bool {
        self.has_operator(&Operator::Search)
    }

    pub fn contains_only_private_messages(&self) -> bool {
        (self.has_operator(&Operator::Dm) || self.has_operand(&Operator::Is, "dm"))
            && !self.has_operator(&Operator::Stream)
    }

    pub fn has_topic(&self, stream: &str, topic: &str) -> bool {
        self.has_operand(&Operator::Stream, stream) && self.has_operand(&Operator::Topic, topic)
    }

    /// Whether the compiled predicate is trustworthy for this message
    /// state. `has:` needs fully rendered content, so local echo defeats it.
    pub fn can_apply_locally(&self, is_local_echo: bool) -> bool {
        if matches!(self.predicate, Predicate::TrustServer) {
            return false;
        }
        if is_local_echo && self.terms.iter().any(|term| term.operator == Operator::Has) {
            return false;
        }
        true
    }

    /// Evaluate the compiled predicate against one message.
    pub fn matches(&self, message: &Message) -> bool {
        match &self.predicate {
            Predicate::TrustServer => true,
            Predicate::Conjunction(compiled) => {
                if message.locally_echoed
                    && compiled
                        .iter()
                        .any(|ct| ct.term.operator == Operator::Has)
                {
                    // Attachment/link detection needs server-rendered
                    // content; include the message until the server settles
                    // it.
                    return true;
                }
                compiled.iter().all(|ct| {
                    matcher::matches_term(ct, message, self.directory.as_ref()) != ct.term.negated
                })
            }
        }
    }

    /// The predicate as a callable, for collaborators that sweep a message
    /// cache.
    pub fn predicate(&self) -> impl Fn(&Message) -> bool + '_ {
        move |message| self.matches(message)
    }

    /// Order-insensitive semantic equality over canonicalized terms.
    pub fn equals(&self, other: &Filter) -> bool {
        sorted_for_comparison(&self.terms) == sorted_for_comparison(&other.terms)
    }

    pub(crate) fn directory(&self) -> &dyn Directory {
        self.directory.as_ref()
    }
}

impl fmt::Debug for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Filter({})", parser::unparse(&self.terms))
    }
}

fn compile_predicate(terms: &[Term], directory: &dyn Directory) -> Predicate {
    let deferred = terms
        .iter()
        .any(|term| matches!(term.operator, Operator::Search | Operator::Streams));
    if deferred {
        return Predicate::TrustServer;
    }
    Predicate::Conjunction(
        terms
            .iter()
            .map(|term| CompiledTerm::compile(term.clone(), directory))
            .collect(),
    )
}

fn sorted_for_comparison(terms: &[Term]) -> Vec<&Term> {
    let mut sorted: Vec<&Term> = terms.iter().collect();
    sorted.sort_by(|a, b| {
        a.operator
            .as_str()
            .cmp(b.operator.as_str())
            .then_with(|| a.operand.cmp(&b.operand))
            .then_with(|| a.negated.cmp(&b.negated))
    });
    sorted
}
