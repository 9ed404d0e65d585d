//! Rendered-content inspectors backing `has:` matching.
//!
//! These look only at the server-rendered HTML of a message, which is why
//! `has:` cannot be trusted against a locally-echoed message: its content
//! has not been through the server's markdown pipeline yet.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::model::types::Message;

static INLINE_IMAGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"class="message_inline_image""#).expect("static regex"));

static LINK: Lazy<Regex> = Lazy::new(|| Regex::new(r"<a\s").expect("static regex"));

static ATTACHMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<a\s[^>]*href="/user_uploads/"#).expect("static regex"));

pub fn has_image(message: &Message) -> bool {
    INLINE_IMAGE.is_match(&message.content)
}

pub fn has_link(message: &Message) -> bool {
    LINK.is_match(&message.content)
}

pub fn has_attachment(message: &Message) -> bool {
    ATTACHMENT.is_match(&message.content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::types::Recipient;

    fn message_with_content(content: &str) -> Message {
        Message {
            id: 1,
            sender_id: 1,
            recipient: Recipient::Direct { user_ids: vec![1] },
            content: content.into(),
            timestamp: 0,
            starred: false,
            mentioned: false,
            alerted: false,
            unread: false,
            locally_echoed: false,
        }
    }

    #[test]
    fn detects_inline_images() {
        let msg = message_with_content(
            r#"<div class="message_inline_image"><a href="/user_uploads/2/ab/x.png"><img src="/user_uploads/2/ab/x.png"></a></div>"#,
        );
        assert!(has_image(&msg));
        assert!(!has_image(&message_with_content("<p>plain text</p>")));
    }

    #[test]
    fn detects_links_and_attachments() {
        let link = message_with_content(r#"<p><a href="https://example.com">here</a></p>"#);
        assert!(has_link(&link));
        assert!(!has_attachment(&link));

        let upload =
            message_with_content(r#"<p><a href="/user_uploads/2/ab/notes.pdf">notes.pdf</a></p>"#);
        assert!(has_link(&upload));
        assert!(has_attachment(&upload));
    }
}
