//! View classification: derived queries over a filter's term-type shape.
//!
//! Everything here is a pure function of the sorted term types (plus the
//! directory for names), consumed by navigation-bar, recipient-header, and
//! browser-history collaborators.

use itertools::Itertools;

use crate::narrow::filter::Filter;
use crate::narrow::term::{Operator, Term};

/// Icon identifiers for the navigation bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NarrowIcon {
    Hashtag,
    Lock,
    Globe,
    User,
    UserGroup,
    Star,
    AtSign,
    Check,
    AllMessages,
}

impl NarrowIcon {
    pub fn as_str(&self) -> &'static str {
        match self {
            NarrowIcon::Hashtag => "hashtag",
            NarrowIcon::Lock => "lock",
            NarrowIcon::Globe => "globe",
            NarrowIcon::User => "user",
            NarrowIcon::UserGroup => "user-group",
            NarrowIcon::Star => "star",
            NarrowIcon::AtSign => "at-sign",
            NarrowIcon::Check => "check",
            NarrowIcon::AllMessages => "all-messages",
        }
    }
}

// Term types under which any two messages with the same recipient are
// either both in or both out of the view.
const COLLAPSIBLE_TERM_TYPES: &[&str] = &[
    "stream",
    "topic",
    "dm",
    "dm-including",
    "is-dm",
    "is-resolved",
    "in-home",
    "in-all",
    "streams-public",
    "streams-web-public",
    "near",
    "not-stream",
    "not-topic",
    "not-dm",
    "not-dm-including",
    "not-is-dm",
    "not-is-resolved",
    "not-in-home",
    "not-in-all",
    "not-streams-public",
    "not-streams-web-public",
    "not-near",
];

// Shapes that describe a complete conversation, where reading to the end
// means everything shown has been read.
const MARK_READ_SHAPES: &[&[&str]] = &[
    &[],
    &["stream"],
    &["stream", "topic"],
    &["dm"],
    &["is-dm"],
    &["is-resolved"],
    &["in-home"],
    &["in-all"],
];

const COMMON_NARROW_SHAPES: &[&[&str]] = &[
    &[],
    &["stream"],
    &["stream", "topic"],
    &["dm"],
    &["is-dm"],
    &["is-resolved"],
    &["is-mentioned"],
    &["is-starred"],
    &["streams-public"],
    &["sender"],
    &["in-home"],
    &["in-all"],
];

pub(crate) fn shape_can_mark_messages_read(sorted: &[String]) -> bool {
    MARK_READ_SHAPES.iter().any(|shape| shape_eq(shape, sorted))
}

fn shape_eq(shape: &[&str], sorted: &[String]) -> bool {
    shape.len() == sorted.len() && shape.iter().zip(sorted).all(|(a, b)| *a == b.as_str())
}

/// Hash-fragment encoding: percent-encode, then dots stand in for the
/// percent signs so fragments survive a browser's own escaping.
fn encode_hash_component(value: &str) -> String {
    urlencoding::encode(value)
        .replace('.', "%2E")
        .replace('%', ".")
}

impl Filter {
    /// True when consecutive same-recipient headers may be collapsed: every
    /// term type is recipient-stable.
    pub fn supports_collapsing_recipients(&self) -> bool {
        self.sorted_term_types()
            .iter()
            .all(|tt| COLLAPSIBLE_TERM_TYPES.contains(&tt.as_str()))
    }

    /// True for the handful of views common enough to get dedicated
    /// navigation treatment.
    pub fn is_common_narrow(&self) -> bool {
        COMMON_NARROW_SHAPES
            .iter()
            .any(|shape| shape_eq(shape, self.sorted_term_types()))
    }

    /// The canonical parent URL to fall back to when exiting a search
    /// overlay. Unrecognized shapes fall back to the root view.
    pub fn generate_redirect_url(&self) -> String {
        let mut shape: Vec<&str> = self
            .sorted_term_types()
            .iter()
            .map(String::as_str)
            .collect();
        if shape.last() == Some(&"search") {
            shape.pop();
        }
        match shape.as_slice() {
            [] | ["in-home"] => "#".to_string(),
            ["stream"] => format!("#narrow/stream/{}", self.stream_slug()),
            ["stream", "topic"] => {
                let topic = self
                    .operands(&Operator::Topic)
                    .into_iter()
                    .next()
                    .unwrap_or_default();
                format!(
                    "#narrow/stream/{}/topic/{}",
                    self.stream_slug(),
                    encode_hash_component(&topic)
                )
            }
            ["dm"] => {
                let operand = self
                    .operands(&Operator::Dm)
                    .into_iter()
                    .next()
                    .unwrap_or_default();
                format!("#narrow/dm/{}", encode_hash_component(&operand))
            }
            ["is-dm"] => "#narrow/is/dm".to_string(),
            ["is-starred"] => "#narrow/is/starred".to_string(),
            ["is-mentioned"] => "#narrow/is/mentioned".to_string(),
            ["is-resolved"] => "#narrow/is/resolved".to_string(),
            ["in-all"] => "#narrow/in/all".to_string(),
            ["sender"] => {
                let operand = self
                    .operands(&Operator::Sender)
                    .into_iter()
                    .next()
                    .unwrap_or_default();
                format!("#narrow/sender/{}", encode_hash_component(&operand))
            }
            ["streams-public"] => "#narrow/streams/public".to_string(),
            _ => "#".to_string(),
        }
    }

    /// Human-readable view title. `None` for shapes without one (searches
    /// and compound narrows); the caller renders its own header then.
    pub fn get_title(&self) -> Option<String> {
        let shape: Vec<&str> = self
            .sorted_term_types()
            .iter()
            .map(String::as_str)
            .collect();
        match shape.as_slice() {
            ["stream"] | ["stream", "topic"] => Some(match self.sub() {
                Some(sub) => sub.name.clone(),
                None => self
                    .operands(&Operator::Stream)
                    .into_iter()
                    .next()
                    .unwrap_or_default(),
            }),
            ["dm"] => {
                let operand = self
                    .operands(&Operator::Dm)
                    .into_iter()
                    .next()
                    .unwrap_or_default();
                let names = operand
                    .split(',')
                    .map(|email| {
                        let email = email.trim();
                        self.directory()
                            .user_id_for_email(email)
                            .and_then(|id| self.directory().user_full_name(id))
                            .unwrap_or_else(|| email.to_string())
                    })
                    .join(", ");
                Some(names)
            }
            ["sender"] => {
                let operand = self
                    .operands(&Operator::Sender)
                    .into_iter()
                    .next()
                    .unwrap_or_default();
                Some(
                    self.directory()
                        .user_id_for_email(&operand)
                        .and_then(|id| self.directory().user_full_name(id))
                        .unwrap_or(operand),
                )
            }
            ["is-dm"] => Some("Direct message feed".to_string()),
            ["is-starred"] => Some("Starred messages".to_string()),
            ["is-mentioned"] => Some("Mentions".to_string()),
            ["is-resolved"] => Some("Topics marked as resolved".to_string()),
            [] | ["in-home"] => Some("All messages".to_string()),
            ["in-all"] => Some("All messages including muted streams".to_string()),
            ["streams-public"] => Some("Messages in all public streams".to_string()),
            _ => None,
        }
    }

    /// Navigation-bar icon for the view. `None` mirrors [`Filter::get_title`].
    pub fn icon(&self) -> Option<NarrowIcon> {
        let shape: Vec<&str> = self
            .sorted_term_types()
            .iter()
            .map(String::as_str)
            .collect();
        match shape.as_slice() {
            ["stream"] | ["stream", "topic"] => Some(match self.sub() {
                Some(sub) if sub.invite_only => NarrowIcon::Lock,
                Some(sub) if sub.is_web_public => NarrowIcon::Globe,
                _ => NarrowIcon::Hashtag,
            }),
            ["dm"] => {
                let operand = self
                    .operands(&Operator::Dm)
                    .into_iter()
                    .next()
                    .unwrap_or_default();
                if operand.contains(',') {
                    Some(NarrowIcon::UserGroup)
                } else {
                    Some(NarrowIcon::User)
                }
            }
            ["sender"] => Some(NarrowIcon::User),
            ["is-dm"] => Some(NarrowIcon::UserGroup),
            ["is-starred"] => Some(NarrowIcon::Star),
            ["is-mentioned"] => Some(NarrowIcon::AtSign),
            ["is-resolved"] => Some(NarrowIcon::Check),
            [] | ["in-home"] | ["in-all"] => Some(NarrowIcon::AllMessages),
            ["streams-public"] => Some(NarrowIcon::Globe),
            _ => None,
        }
    }

    /// Comma-joined human description of the narrow, e.g.
    /// `stream general, topic bugs, exclude starred messages`.
    pub fn describe(&self) -> String {
        if self.operators().is_empty() {
            return "all messages".to_string();
        }
        self.operators().iter().map(describe_term).join(", ")
    }

    fn stream_slug(&self) -> String {
        let name = self
            .operands(&Operator::Stream)
            .into_iter()
            .next()
            .unwrap_or_default();
        let dashed = name.replace(' ', "-");
        match self.sub() {
            Some(sub) => encode_hash_component(&format!("{}-{}", sub.stream_id, dashed)),
            None => encode_hash_component(&dashed),
        }
    }
}

fn describe_term(term: &Term) -> String {
    if term.operator == Operator::Is {
        let verb = if term.negated { "exclude " } else { "" };
        return match term.operand.as_str() {
            "starred" | "alerted" | "unread" => format!("{verb}{} messages", term.operand),
            "dm" => format!("{verb}direct messages"),
            "mentioned" => format!("{verb}@-mentions"),
            "resolved" => format!("{verb}topics marked as resolved"),
            other => format!("invalid {other} operand for is operator"),
        };
    }
    if term.operator == Operator::Has
        && !matches!(term.operand.as_str(), "image" | "link" | "attachment")
    {
        return format!("invalid {} operand for has operator", term.operand);
    }
    match term.operator.prefix(term.negated) {
        Some(prefix) => format!("{prefix} {}", term.operand),
        None => "unknown operator".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::directory::{InMemoryDirectory, Subscription};
    use crate::narrow::term::Term;

    fn directory() -> Arc<InMemoryDirectory> {
        Arc::new(
            InMemoryDirectory::default()
                .with_current_user(1, "hamlet@example.com", "Hamlet")
                .with_user(2, "iago@example.com", "Iago")
                .with_user(3, "zoe@example.com", "Zoe")
                .with_stream(Subscription::new(5, "general"))
                .with_stream(Subscription {
                    invite_only: true,
                    ..Subscription::new(6, "core team")
                }),
        )
    }

    fn filter(query: &str) -> Filter {
        Filter::from_query(query, directory())
    }

    #[test]
    fn collapsing_allowed_only_for_recipient_stable_terms() {
        assert!(filter("stream:general topic:bugs").supports_collapsing_recipients());
        assert!(filter("-stream:general near:10").supports_collapsing_recipients());
        assert!(!filter("is:starred stream:general").supports_collapsing_recipients());
        assert!(!filter("sender:iago@example.com").supports_collapsing_recipients());
    }

    #[test]
    fn common_narrows_cover_the_usual_views() {
        for query in [
            "",
            "stream:general",
            "stream:general topic:bugs",
            "is:starred",
            "is:mentioned",
            "sender:iago@example.com",
            "in:home",
        ] {
            assert!(filter(query).is_common_narrow(), "expected common: {query:?}");
        }
        assert!(!filter("stream:general is:starred").is_common_narrow());
        assert!(!filter("near:15").is_common_narrow());
    }

    #[test]
    fn redirect_url_drops_a_trailing_search_term() {
        assert_eq!(
            filter("stream:general topic:bugs needle").generate_redirect_url(),
            "#narrow/stream/5-general/topic/bugs"
        );
        assert_eq!(
            filter("stream:general needle").generate_redirect_url(),
            "#narrow/stream/5-general"
        );
        assert_eq!(filter("is:starred").generate_redirect_url(), "#narrow/is/starred");
        assert_eq!(filter("needle").generate_redirect_url(), "#");
    }

    #[test]
    fn redirect_url_falls_back_to_root_for_compound_shapes() {
        assert_eq!(
            filter("stream:general sender:iago@example.com is:starred").generate_redirect_url(),
            "#"
        );
    }

    #[test]
    fn redirect_url_encodes_fragment_components() {
        let url = filter(r#"stream:"core team" topic:"a.b c""#).generate_redirect_url();
        assert_eq!(url, "#narrow/stream/6-core-team/topic/a.2Eb.20c");
    }

    #[test]
    fn titles_match_view_shapes() {
        assert_eq!(filter("stream:general").get_title().as_deref(), Some("general"));
        assert_eq!(
            filter("stream:general topic:bugs").get_title().as_deref(),
            Some("general")
        );
        assert_eq!(
            filter("dm:iago@example.com").get_title().as_deref(),
            Some("Iago")
        );
        assert_eq!(
            filter("dm:iago@example.com,zoe@example.com").get_title().as_deref(),
            Some("Iago, Zoe")
        );
        assert_eq!(
            filter("sender:iago@example.com").get_title().as_deref(),
            Some("Iago")
        );
        assert_eq!(filter("is:dm").get_title().as_deref(), Some("Direct message feed"));
        assert_eq!(filter("").get_title().as_deref(), Some("All messages"));
        // Unrecognized shapes have no title; the caller handles it.
        assert_eq!(filter("stream:general is:starred").get_title(), None);
        assert_eq!(filter("needle").get_title(), None);
    }

    #[test]
    fn title_for_unknown_stream_uses_the_operand() {
        assert_eq!(filter("stream:Ghosts").get_title().as_deref(), Some("Ghosts"));
    }

    #[test]
    fn title_for_unknown_dm_address_uses_the_address() {
        assert_eq!(
            filter("dm:ghost@example.com").get_title().as_deref(),
            Some("ghost@example.com")
        );
    }

    #[test]
    fn icons_match_view_shapes() {
        assert_eq!(filter("stream:general").icon(), Some(NarrowIcon::Hashtag));
        assert_eq!(filter(r#"stream:"core team""#).icon(), Some(NarrowIcon::Lock));
        assert_eq!(filter("dm:iago@example.com").icon(), Some(NarrowIcon::User));
        assert_eq!(
            filter("dm:iago@example.com,zoe@example.com").icon(),
            Some(NarrowIcon::UserGroup)
        );
        assert_eq!(filter("is:starred").icon(), Some(NarrowIcon::Star));
        assert_eq!(filter("is:mentioned").icon(), Some(NarrowIcon::AtSign));
        assert_eq!(filter("").icon(), Some(NarrowIcon::AllMessages));
        assert_eq!(filter("needle").icon(), None);
    }

    #[test]
    fn describe_renders_operator_prefixes() {
        assert_eq!(
            filter("stream:general topic:bugs").describe(),
            "stream general, topic bugs"
        );
        assert_eq!(
            filter("-is:starred has:link").describe(),
            "exclude starred messages, messages with one or more link"
        );
        assert_eq!(filter("").describe(), "all messages");
        assert_eq!(
            filter("has:bogus").describe(),
            "invalid bogu operand for has operator"
        );
    }

    #[test]
    fn describe_includes_search_terms() {
        assert_eq!(
            Filter::new(
                vec![
                    Term::new(Operator::Stream, "general"),
                    Term::new(Operator::Search, "needle"),
                ],
                directory()
            )
            .describe(),
            "stream general, search for needle"
        );
    }
}
