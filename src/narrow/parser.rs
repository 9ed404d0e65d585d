//! Narrow query parsing and unparsing.
//!
//! A query is whitespace-separated tokens. A token may carry an
//! `operator:` prefix (one space allowed after the colon) and a
//! double-quoted operand spanning spaces. Tokens that do not name a known
//! operator are literal search text; consecutive search tokens accumulate
//! into one space-joined `search` term, flushed in position so collaborators
//! can still tell which operator was typed last.

use tracing::debug;

use crate::narrow::term::{Operator, Term};

/// Parse a query into terms. Whitespace-only input parses to `[]`;
/// nothing here ever fails.
pub fn parse(input: &str) -> Vec<Term> {
    let mut terms: Vec<Term> = Vec::new();
    let mut search_buf: Vec<String> = Vec::new();

    for token in tokenize(input) {
        if token.starts_with('"') || !token.contains(':') {
            search_buf.push(token);
            continue;
        }
        let Some((prefix, remainder)) = token.split_once(':') else {
            search_buf.push(token);
            continue;
        };
        let (negated, raw_operator) = match prefix.strip_prefix('-') {
            Some(stripped) => (true, stripped),
            None => (false, prefix),
        };
        let operator = Operator::from_raw(raw_operator);
        if operator.prefix(negated).is_none() {
            // Not a real operator: the whole original token is search text,
            // colon and all.
            search_buf.push(token);
            continue;
        }
        let operand = decode_operand(remainder, &operator);
        flush_search(&mut search_buf, &mut terms);
        terms.push(Term {
            operator,
            operand,
            negated,
        });
    }
    flush_search(&mut search_buf, &mut terms);

    debug!(query = input, terms = terms.len(), "narrow_parsed");
    terms
}

/// Render terms back into a query string. `search` terms render as their
/// raw operand; everything else as `[-]operator:encoded-operand`.
pub fn unparse(terms: &[Term]) -> String {
    let parts: Vec<String> = terms
        .iter()
        .map(|term| {
            if term.operator == Operator::Search || term.operator.as_str().is_empty() {
                term.operand.clone()
            } else {
                let sign = if term.negated { "-" } else { "" };
                format!("{sign}{}:{}", term.operator, encode_operand(&term.operand))
            }
        })
        .collect();
    parts.join(" ")
}

/// Percent-encode an operand so it survives a round trip through a query
/// string or URL fragment: `%`, `+`, and `"` are escaped, spaces become `+`.
pub fn encode_operand(operand: &str) -> String {
    operand
        .replace('%', "%25")
        .replace('+', "%2B")
        .replace(' ', "+")
        .replace('"', "%22")
}

/// Undo [`encode_operand`] as far as the grammar allows: strip quotes, map
/// `+` back to space for non-recipient operators, percent-decode
/// tolerantly, and trim.
pub fn decode_operand(encoded: &str, operator: &Operator) -> String {
    let mut operand = encoded.replace('"', "");
    if !operator.is_recipient_operator() {
        operand = operand.replace('+', " ");
    }
    // A decode producing invalid UTF-8 keeps the raw text.
    let decoded = urlencoding::decode(&operand)
        .map(|cow| cow.into_owned())
        .unwrap_or(operand);
    decoded.trim().to_string()
}

fn flush_search(search_buf: &mut Vec<String>, terms: &mut Vec<Term>) {
    if search_buf.is_empty() {
        return;
    }
    terms.push(Term::new(Operator::Search, search_buf.join(" ")));
    search_buf.clear();
}

/// Split a query into raw tokens.
///
/// Scanner equivalent of the token grammar: an optional `name:` prefix (a
/// run of non-space, non-colon characters, a colon, then at most one space
/// when an operand follows), then either a double-quoted span with at least
/// one inner character and an optional closing quote, or a run of
/// non-whitespace characters. The raw matched text is preserved so an
/// invalid operator token can be re-read as literal search text.
fn tokenize(input: &str) -> Vec<String> {
    let chars: Vec<char> = input.chars().collect();
    let n = chars.len();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < n {
        if chars[i].is_whitespace() {
            i += 1;
            continue;
        }
        let start = i;

        // Operator-prefix attempt: `name:` then the operand, preferring to
        // absorb the single optional space after the colon.
        let mut end = None;
        let mut j = i;
        while j < n && !chars[j].is_whitespace() && chars[j] != ':' {
            j += 1;
        }
        if j > i && j < n && chars[j] == ':' {
            let after_colon = j + 1;
            if after_colon < n && chars[after_colon] == ' ' {
                end = match_operand(&chars, after_colon + 1);
            }
            if end.is_none() {
                end = match_operand(&chars, after_colon);
            }
        }

        // Bare token: quoted span or plain non-whitespace run.
        let end = end.or_else(|| match_operand(&chars, i));
        match end {
            Some(end) => {
                tokens.push(chars[start..end].iter().collect());
                i = end;
            }
            None => i += 1,
        }
    }
    tokens
}

/// Match one operand at `pos`: a quoted span (`"` + at least one non-quote
/// character + optional closing `"`) or a non-whitespace run. Returns the
/// exclusive end index.
fn match_operand(chars: &[char], pos: usize) -> Option<usize> {
    let n = chars.len();
    if pos >= n || chars[pos].is_whitespace() {
        return None;
    }
    if chars[pos] == '"' {
        let mut j = pos + 1;
        while j < n && chars[j] != '"' {
            j += 1;
        }
        // An unclosed quote swallows the rest of the input.
        if j > pos + 1 {
            return Some(if j < n { j + 1 } else { j });
        }
    }
    let mut j = pos;
    while j < n && !chars[j].is_whitespace() {
        j += 1;
    }
    if j > pos { Some(j) } else { None }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn term(operator: Operator, operand: &str) -> Term {
        Term::new(operator, operand)
    }

    #[test]
    fn whitespace_parses_to_nothing() {
        assert!(parse("").is_empty());
        assert!(parse("   \t  ").is_empty());
    }

    #[test]
    fn parses_operator_terms() {
        assert_eq!(
            parse("stream:general topic:bugs"),
            vec![
                term(Operator::Stream, "general"),
                term(Operator::Topic, "bugs"),
            ]
        );
    }

    #[test]
    fn parses_negation() {
        assert_eq!(
            parse("-stream:general"),
            vec![Term::negated(Operator::Stream, "general")]
        );
    }

    #[test]
    fn one_space_is_allowed_after_the_colon() {
        assert_eq!(parse("stream: general"), vec![term(Operator::Stream, "general")]);
        // A second space severs the operand from the prefix.
        assert_eq!(
            parse("stream:  general"),
            vec![
                term(Operator::Stream, ""),
                term(Operator::Search, "general"),
            ]
        );
    }

    #[test]
    fn quoted_operands_span_spaces() {
        assert_eq!(
            parse(r#"topic:"release planning""#),
            vec![term(Operator::Topic, "release planning")]
        );
    }

    #[test]
    fn plain_tokens_accumulate_into_one_search_term() {
        assert_eq!(
            parse("hello world again"),
            vec![term(Operator::Search, "hello world again")]
        );
    }

    #[test]
    fn search_text_flushes_in_position() {
        assert_eq!(
            parse("hello stream:general world"),
            vec![
                term(Operator::Search, "hello"),
                term(Operator::Stream, "general"),
                term(Operator::Search, "world"),
            ]
        );
    }

    #[test]
    fn unknown_operator_degrades_to_literal_search_text() {
        assert_eq!(
            parse("http://example.com/path"),
            vec![term(Operator::Search, "http://example.com/path")]
        );
        assert_eq!(
            parse("stream:general foo:bar"),
            vec![
                term(Operator::Stream, "general"),
                term(Operator::Search, "foo:bar"),
            ]
        );
    }

    #[test]
    fn quoted_tokens_are_search_text_even_with_colons() {
        assert_eq!(
            parse(r#""stream:general""#),
            vec![term(Operator::Search, r#""stream:general""#)]
        );
    }

    #[test]
    fn aliases_parse_to_canonical_operators() {
        assert_eq!(
            parse("from:iago@example.com subject:lunch"),
            vec![
                term(Operator::Sender, "iago@example.com"),
                term(Operator::Topic, "lunch"),
            ]
        );
    }

    #[test]
    fn plus_decodes_to_space_except_for_recipients() {
        assert_eq!(
            parse("topic:release+planning"),
            vec![term(Operator::Topic, "release planning")]
        );
        assert_eq!(
            parse("dm:iago+news@example.com"),
            vec![term(Operator::Dm, "iago+news@example.com")]
        );
    }

    #[test]
    fn percent_escapes_decode_tolerantly() {
        assert_eq!(parse("topic:50%25"), vec![term(Operator::Topic, "50%")]);
        // Malformed escapes pass through unchanged.
        assert_eq!(parse("topic:50%"), vec![term(Operator::Topic, "50%")]);
    }

    #[test]
    fn unclosed_quote_swallows_the_rest() {
        assert_eq!(
            parse(r#"topic:"a b c"#),
            vec![term(Operator::Topic, "a b c")]
        );
    }

    #[test]
    fn empty_operand_is_kept() {
        assert_eq!(parse("is:"), vec![term(Operator::Is, "")]);
    }

    #[test]
    fn unparse_renders_search_raw_and_encodes_operands() {
        let terms = vec![
            term(Operator::Stream, "general chat"),
            Term::negated(Operator::Is, "starred"),
            term(Operator::Search, "hello world"),
        ];
        assert_eq!(unparse(&terms), "stream:general+chat -is:starred hello world");
    }

    #[test]
    fn unparse_escapes_the_encoding_alphabet() {
        let terms = vec![term(Operator::Topic, r#"50% + "done""#)];
        assert_eq!(unparse(&terms), "topic:50%25+%2B+%22done%22");
    }

    #[test]
    fn parse_unparse_round_trip_is_stable() {
        let queries = [
            "stream:general topic:bugs",
            "hello world stream: denmark -is:starred",
            r#"topic:"release planning" near:123"#,
            "dm:iago+news@example.com id:42",
            "foo:bar baz http://example.com",
            "topic:50%25 has:links",
        ];
        for query in queries {
            let first = parse(query);
            let second = parse(&unparse(&first));
            assert_eq!(first, second, "round trip diverged for {query:?}");
        }
    }
}
