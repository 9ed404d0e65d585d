//! Term model: operators, negation, canonicalization.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::directory::Directory;

/// Search operator vocabulary.
///
/// Deprecated spellings (`from`, `subject`, `pm-with`, `group-pm-with`) are
/// resolved by [`Operator::from_raw`], so no constructed term ever carries
/// an alias. `Unknown` preserves anything else lower-cased; downstream it
/// matches every message, so an unrecognized operator can never hide one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Operator {
    Stream,
    Topic,
    Dm,
    DmIncluding,
    Sender,
    Is,
    Has,
    In,
    Near,
    Id,
    Search,
    Streams,
    Unknown(String),
}

impl Operator {
    /// Resolve a raw operator spelling, including deprecated aliases.
    /// Total over all strings.
    pub fn from_raw(raw: &str) -> Operator {
        match raw.to_lowercase().as_str() {
            "stream" => Operator::Stream,
            "topic" | "subject" => Operator::Topic,
            "dm" | "pm-with" => Operator::Dm,
            "dm-including" | "group-pm-with" => Operator::DmIncluding,
            "sender" | "from" => Operator::Sender,
            "is" => Operator::Is,
            "has" => Operator::Has,
            "in" => Operator::In,
            "near" => Operator::Near,
            "id" => Operator::Id,
            "search" => Operator::Search,
            "streams" => Operator::Streams,
            other => Operator::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Operator::Stream => "stream",
            Operator::Topic => "topic",
            Operator::Dm => "dm",
            Operator::DmIncluding => "dm-including",
            Operator::Sender => "sender",
            Operator::Is => "is",
            Operator::Has => "has",
            Operator::In => "in",
            Operator::Near => "near",
            Operator::Id => "id",
            Operator::Search => "search",
            Operator::Streams => "streams",
            Operator::Unknown(raw) => raw,
        }
    }

    /// Operand decoding keeps `+` literal for these: their operands carry
    /// addresses, where `+` is meaningful.
    pub fn is_recipient_operator(&self) -> bool {
        matches!(
            self,
            Operator::Dm | Operator::DmIncluding | Operator::Sender
        )
    }

    /// Human-readable prefix used by describe, and by the parser to decide
    /// whether a token names a real operator. `None` for unknown operators.
    pub fn prefix(&self, negated: bool) -> Option<String> {
        let noun = match self {
            Operator::Search => {
                return Some(if negated { "exclude" } else { "search for" }.to_string());
            }
            Operator::Unknown(_) => return None,
            Operator::Stream => "stream",
            Operator::Streams => "streams",
            Operator::Topic => "topic",
            Operator::Sender => "sent by",
            Operator::Dm => "direct messages with",
            Operator::DmIncluding => "direct messages including",
            Operator::In => "messages in",
            Operator::Is => "messages that are",
            Operator::Has => "messages with one or more",
            Operator::Near => "messages around",
            Operator::Id => "message ID",
        };
        Some(if negated {
            format!("exclude {noun}")
        } else {
            noun.to_string()
        })
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for Operator {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Operator {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Operator, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Operator::from_raw(&raw))
    }
}

/// One operator:operand unit of a narrow query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Term {
    pub operator: Operator,
    pub operand: String,
    #[serde(default)]
    pub negated: bool,
}

impl Term {
    pub fn new(operator: Operator, operand: impl Into<String>) -> Term {
        Term {
            operator,
            operand: operand.into(),
            negated: false,
        }
    }

    pub fn negated(operator: Operator, operand: impl Into<String>) -> Term {
        Term {
            operator,
            operand: operand.into(),
            negated: true,
        }
    }
}

/// Canonicalize a term against the realm directory.
///
/// Operator aliases are already resolved by [`Operator::from_raw`]; this
/// applies the per-operator operand rules. Idempotent and total: malformed
/// operands are left to fail during matching, never here.
pub fn canonicalize_term(term: Term, directory: &dyn Directory) -> Term {
    let Term {
        operator,
        operand,
        negated,
    } = term;
    let operand = match &operator {
        Operator::Is => {
            let low = operand.to_lowercase();
            if low == "private" { "dm".to_string() } else { low }
        }
        // Blunt singularization: images -> image, links -> link. Any operand
        // ending in a literal "s" loses it.
        Operator::Has => {
            let low = operand.to_lowercase();
            match low.strip_suffix('s') {
                Some(stripped) => stripped.to_string(),
                None => low,
            }
        }
        Operator::Stream => directory
            .canonical_stream_name(&operand)
            .unwrap_or(operand),
        // Topic operands keep their case; matching is case-insensitive.
        Operator::Topic => operand,
        Operator::Sender | Operator::Dm => {
            let low = operand.to_lowercase();
            if low == "me" {
                directory.current_user_email()
            } else {
                low
            }
        }
        Operator::DmIncluding => operand.to_lowercase(),
        // Straighten smart quotes so phrases from autocorrect-happy input
        // methods still parse as quoted.
        Operator::Search => operand
            .to_lowercase()
            .replace(['\u{201C}', '\u{201D}'], "\""),
        _ => operand.to_lowercase(),
    };
    Term {
        operator,
        operand,
        negated,
    }
}
