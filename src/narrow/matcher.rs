//! Per-operator message matching.
//!
//! Every matcher is pure. Negation is applied by the caller. Recognized
//! operators with unrecognized operands fail closed (`false`); unrecognized
//! operators fail open (`true`) so a forward-compatible term can never hide
//! messages.

use regex::{Regex, RegexBuilder};
use smallvec::SmallVec;

use crate::directory::Directory;
use crate::model::content;
use crate::model::types::{Message, Recipient};
use crate::narrow::term::{Operator, Term};

pub(crate) type UserIdSet = SmallVec<[u64; 8]>;

/// A term plus whatever was precomputed for the hot path, so predicate
/// evaluation allocates nothing per message.
#[derive(Debug, Clone)]
pub(crate) struct CompiledTerm {
    pub(crate) term: Term,
    /// Prebuilt relaxed matcher for stream/topic terms on zephyr realms.
    zephyr_regex: Option<Regex>,
}

impl CompiledTerm {
    pub(crate) fn compile(term: Term, directory: &dyn Directory) -> CompiledTerm {
        let zephyr_regex = if directory.is_zephyr_mirror_realm() {
            match term.operator {
                Operator::Stream => zephyr_stream_regex(&term.operand),
                Operator::Topic => zephyr_topic_regex(&term.operand),
                _ => None,
            }
        } else {
            None
        };
        CompiledTerm { term, zephyr_regex }
    }
}

/// Evaluate one compiled term against a message.
pub(crate) fn matches_term(
    compiled: &CompiledTerm,
    message: &Message,
    directory: &dyn Directory,
) -> bool {
    let term = &compiled.term;
    let operand = term.operand.as_str();
    match &term.operator {
        Operator::Has => match operand {
            "image" => content::has_image(message),
            "link" => content::has_link(message),
            "attachment" => content::has_attachment(message),
            _ => false,
        },
        Operator::Is => match operand {
            "dm" => message.is_direct(),
            "starred" => message.starred,
            "mentioned" => message.mentioned,
            "alerted" => message.alerted,
            "unread" => message.unread,
            "resolved" => message.topic_resolved(),
            _ => false,
        },
        Operator::In => match operand {
            "home" => message_in_home(message, directory),
            "all" => true,
            _ => false,
        },
        // Proximity is a scroll-position hint, not a filter.
        Operator::Near => true,
        Operator::Id => operand == message.id.to_string(),
        Operator::Stream => {
            let Some(stream_name) = message.stream_name() else {
                return false;
            };
            if let Some(regex) = &compiled.zephyr_regex {
                return regex.is_match(stream_name);
            }
            match directory.stream_id(operand) {
                Some(stream_id) => message.stream_id() == Some(stream_id),
                None => false,
            }
        }
        Operator::Topic => {
            let Some(topic) = message.topic() else {
                return false;
            };
            if let Some(regex) = &compiled.zephyr_regex {
                return regex.is_match(topic);
            }
            topic.to_lowercase() == operand.to_lowercase()
        }
        Operator::Sender => directory
            .user_id_for_email(operand)
            .is_some_and(|user_id| user_id == message.sender_id),
        Operator::Dm => matches_dm(operand, message, directory),
        Operator::DmIncluding => matches_dm_including(operand, message, directory),
        // `search` and `streams` never reach local evaluation; like
        // unrecognized operators, they match everything.
        Operator::Search | Operator::Streams | Operator::Unknown(_) => true,
    }
}

/// The operand's resolved recipient set must equal the message's, not
/// merely overlap it.
fn matches_dm(operand: &str, message: &Message, directory: &dyn Directory) -> bool {
    let Recipient::Direct { user_ids } = &message.recipient else {
        return false;
    };
    let Some(operand_ids) = dm_operand_ids(operand, directory) else {
        return false;
    };
    operand_ids == dm_partner_ids(user_ids, directory.current_user_id())
}

/// The resolved operand must be among the message's full participant set.
fn matches_dm_including(operand: &str, message: &Message, directory: &dyn Directory) -> bool {
    let Recipient::Direct { user_ids } = &message.recipient else {
        return false;
    };
    let Some(target) = directory.user_id_for_email(operand.trim()) else {
        return false;
    };
    user_ids.contains(&target)
}

/// Resolve a comma-separated address list. The current user's own id is
/// dropped from multi-party lists. `None` when any address is unknown.
fn dm_operand_ids(operand: &str, directory: &dyn Directory) -> Option<UserIdSet> {
    let mut ids = UserIdSet::new();
    for email in operand.split(',') {
        ids.push(directory.user_id_for_email(email.trim())?);
    }
    if ids.len() > 1 {
        let me = directory.current_user_id();
        ids.retain(|id| *id != me);
    }
    ids.sort_unstable();
    ids.dedup();
    Some(ids)
}

/// Conversation partners: all participants minus the current user. A
/// message to yourself keeps your own id.
fn dm_partner_ids(user_ids: &[u64], me: u64) -> UserIdSet {
    let mut ids: UserIdSet = user_ids.iter().copied().filter(|id| *id != me).collect();
    if ids.is_empty() {
        ids.push(me);
    }
    ids.sort_unstable();
    ids.dedup();
    ids
}

/// Visibility in the default aggregate view: direct messages and mentions
/// always count, the realm's narrow-stream override wins next, and
/// otherwise the stream must be unmuted and the topic not muted.
fn message_in_home(message: &Message, directory: &dyn Directory) -> bool {
    let Recipient::Stream {
        stream_id,
        stream_name,
        topic,
    } = &message.recipient
    else {
        return true;
    };
    if message.mentioned {
        return true;
    }
    if let Some(narrow_stream) = directory.narrow_stream() {
        if narrow_stream.to_lowercase() == stream_name.to_lowercase() {
            return true;
        }
    }
    directory.is_stream_in_home_view(*stream_id) && !directory.is_topic_muted(*stream_id, topic)
}

/// Zephyr realms treat `(un)*name(.d)*` as one conversation: narrowing to
/// `social` also shows `unsocial` and `social.d`.
fn zephyr_stream_regex(operand: &str) -> Option<Regex> {
    let lowered = operand.to_lowercase();
    let mut base = lowered.as_str();
    while let Some(rest) = base.strip_prefix("un") {
        if rest.is_empty() {
            break;
        }
        base = rest;
    }
    while let Some(rest) = base.strip_suffix(".d") {
        if rest.is_empty() {
            break;
        }
        base = rest;
    }
    RegexBuilder::new(&format!("^(un)*{}(\\.d)*$", regex::escape(base)))
        .case_insensitive(true)
        .build()
        .ok()
}

/// Topic `foo` also matches `foo.d`, `foo.d.d`; the empty instance,
/// `personal`, and `(instance "")` are interchangeable.
fn zephyr_topic_regex(operand: &str) -> Option<Regex> {
    let lowered = operand.to_lowercase();
    let mut base = lowered.as_str();
    while let Some(rest) = base.strip_suffix(".d") {
        base = rest;
    }
    let pattern = if base.is_empty() || base == "personal" || base == "(instance \"\")" {
        r#"^(|personal|\(instance ""\))(\.d)*$"#.to_string()
    } else {
        format!("^{}(\\.d)*$", regex::escape(base))
    };
    RegexBuilder::new(&pattern).case_insensitive(true).build().ok()
}
