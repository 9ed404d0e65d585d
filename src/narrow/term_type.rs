//! Term-type tags and their fixed priority ordering.
//!
//! A term type summarizes a term for shape matching: most operators map to
//! their own name, while `is`, `has`, `in`, and `streams` fold their operand
//! in (`is:starred` -> `is-starred`). Shapes of sorted term types identify
//! narrows regardless of the order the terms were typed in.

use crate::narrow::term::{Operator, Term};

/// Canonical tag for one term. Negation prefixes `not-`, except for
/// `search` and `has`, which never carry it.
pub fn term_type(term: &Term) -> String {
    let mut out = String::new();
    if term.negated && !matches!(term.operator, Operator::Search | Operator::Has) {
        out.push_str("not-");
    }
    out.push_str(term.operator.as_str());
    if matches!(
        term.operator,
        Operator::Is | Operator::Has | Operator::In | Operator::Streams
    ) {
        out.push('-');
        out.push_str(&term.operand);
    }
    out
}

// Narrow-scope first, content-match last. Operand-carrying tags rank by
// their operator stem unless listed outright.
const LEVELS: &[&str] = &[
    "in",
    "streams-public",
    "stream",
    "topic",
    "dm",
    "dm-including",
    "sender",
    "near",
    "id",
    "is",
    "has",
    "search",
];

fn level(term_type: &str) -> usize {
    LEVELS
        .iter()
        .position(|candidate| *candidate == term_type)
        .or_else(|| {
            let stem = term_type.split('-').next().unwrap_or(term_type);
            LEVELS.iter().position(|candidate| *candidate == stem)
        })
        .unwrap_or(LEVELS.len())
}

/// Stable sort by the priority table; ties break lexicographically.
pub fn sorted_term_types(term_types: &[String]) -> Vec<String> {
    let mut sorted = term_types.to_vec();
    sorted.sort_by(|a, b| level(a).cmp(&level(b)).then_with(|| a.cmp(b)));
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operand_folds_into_the_tag_for_flag_operators() {
        assert_eq!(term_type(&Term::new(Operator::Is, "starred")), "is-starred");
        assert_eq!(term_type(&Term::new(Operator::Has, "image")), "has-image");
        assert_eq!(term_type(&Term::new(Operator::In, "home")), "in-home");
        assert_eq!(
            term_type(&Term::new(Operator::Streams, "public")),
            "streams-public"
        );
        // Stream and topic tags are operand-independent.
        assert_eq!(term_type(&Term::new(Operator::Stream, "general")), "stream");
        assert_eq!(term_type(&Term::new(Operator::Topic, "bugs")), "topic");
    }

    #[test]
    fn negation_prefixes_not_except_search_and_has() {
        assert_eq!(
            term_type(&Term::negated(Operator::Stream, "general")),
            "not-stream"
        );
        assert_eq!(
            term_type(&Term::negated(Operator::Is, "starred")),
            "not-is-starred"
        );
        assert_eq!(term_type(&Term::negated(Operator::Search, "x")), "search");
        assert_eq!(
            term_type(&Term::negated(Operator::Has, "image")),
            "has-image"
        );
    }

    #[test]
    fn sorting_follows_the_priority_table() {
        let types: Vec<String> = ["search", "topic", "is-starred", "stream", "in-home"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(
            sorted_term_types(&types),
            vec!["in-home", "stream", "topic", "is-starred", "search"]
        );
    }

    #[test]
    fn ties_break_lexicographically() {
        let types: Vec<String> = ["is-starred", "is-mentioned", "is-dm"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(
            sorted_term_types(&types),
            vec!["is-dm", "is-mentioned", "is-starred"]
        );
    }

    #[test]
    fn unknown_tags_sort_last() {
        let types: Vec<String> = ["glorb", "stream"].iter().map(|s| s.to_string()).collect();
        assert_eq!(sorted_term_types(&types), vec!["stream", "glorb"]);
    }

    #[test]
    fn sorting_is_the_same_for_either_input_order() {
        let a: Vec<String> = vec!["stream".into(), "topic".into()];
        let b: Vec<String> = vec!["topic".into(), "stream".into()];
        assert_eq!(sorted_term_types(&a), sorted_term_types(&b));
    }
}
