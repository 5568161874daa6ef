//! Identifier and text normalization shared by the builder.

/// Title-case a string: a cased character following another cased
/// character is lowercased, every other cased character is uppercased.
///
/// `"on_message"` becomes `"On_Message"`, `"chat room"` becomes `"Chat Room"`.
pub fn titleize(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_cased = false;
    for c in s.chars() {
        let cased = c.is_lowercase() || c.is_uppercase();
        if cased && prev_cased {
            out.extend(c.to_lowercase());
        } else if cased {
            out.extend(c.to_uppercase());
        } else {
            out.push(c);
        }
        prev_cased = cased;
    }
    out
}

/// Property title for a field name (`user_id` -> `User Id`)
pub fn titleize_field(name: &str) -> String {
    titleize(&name.replace('_', " "))
}

/// Prefix for synthesized model names (`chat_message` -> `ChatMessage`)
pub fn model_prefix(event_id: &str) -> String {
    titleize(event_id).replace('_', "")
}

/// Channel ids never contain `/`
pub fn sanitize_id(id: &str) -> String {
    id.replace('/', "")
}

/// Drop a leading `on_` handler convention prefix, case-insensitively
pub fn strip_handler_prefix(id: &str) -> &str {
    match id.get(..3) {
        Some(prefix) if prefix.eq_ignore_ascii_case("on_") => &id[3..],
        _ => id,
    }
}

/// Normalize a handler doc string for the document.
///
/// A single leading space is ensured on the first line, then the common
/// leading whitespace of all non-blank lines is removed. Whitespace-only
/// lines become empty.
pub fn dedent_description(doc: &str) -> String {
    let text = if doc.starts_with(' ') {
        doc.to_string()
    } else {
        format!(" {doc}")
    };

    let margin = text
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| &l[..l.len() - l.trim_start_matches([' ', '\t']).len()])
        .fold(None::<&str>, |acc, indent| match acc {
            None => Some(indent),
            Some(common) => {
                let shared = common
                    .char_indices()
                    .zip(indent.chars())
                    .take_while(|((_, a), b)| a == b)
                    .last()
                    .map_or(0, |((i, a), _)| i + a.len_utf8());
                Some(&common[..shared])
            }
        })
        .unwrap_or("");

    let mut out: Vec<&str> = Vec::new();
    for line in text.split('\n') {
        if line.trim().is_empty() {
            out.push("");
        } else {
            out.push(line.strip_prefix(margin).unwrap_or(line));
        }
    }
    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_titleize_matches_word_boundaries() {
        assert_eq!(titleize("message"), "Message");
        assert_eq!(titleize("on_message"), "On_Message");
        assert_eq!(titleize("chat room"), "Chat Room");
        assert_eq!(titleize("HELLO world"), "Hello World");
        assert_eq!(titleize("user2name"), "User2Name");
    }

    #[test]
    fn test_model_prefix_and_field_titles() {
        assert_eq!(model_prefix("message"), "Message");
        assert_eq!(model_prefix("join_room"), "JoinRoom");
        assert_eq!(titleize_field("user_id"), "User Id");
    }

    #[test]
    fn test_handler_prefix_and_sanitize() {
        assert_eq!(strip_handler_prefix("on_message"), "message");
        assert_eq!(strip_handler_prefix("ON_join"), "join");
        assert_eq!(strip_handler_prefix("online"), "online");
        assert_eq!(strip_handler_prefix("on"), "on");
        assert_eq!(sanitize_id("/chat/room"), "chatroom");
    }

    #[test]
    fn test_dedent_description() {
        assert_eq!(dedent_description("Send a message"), "Send a message");
        assert_eq!(
            dedent_description("Send a message.\n\n    Args:\n        text: body\n    "),
            "Send a message.\n\n   Args:\n       text: body\n"
        );
        assert_eq!(
            dedent_description("\n    Join a room.\n    Returns ok.\n"),
            "\nJoin a room.\nReturns ok.\n"
        );
    }
}
