//! Validation for the strings the bot puts on the wire: resource labels,
//! command names, room identifiers and the command prefix.

use std::collections::HashSet;

use crate::error::BotError;

/// Command prefix characters accepted in configuration.
pub const ALLOWED_PREFIXES: &[char] = &['!', '^', '+', '$', '/', '>'];
pub const DEFAULT_COMMAND_PREFIX: char = '!';

const MAX_RESOURCE_LEN: usize = 64;
const MAX_COMMAND_LEN: usize = 32;

/// Resource label (nickname) validation errors
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ResourceError {
    #[error("Resource label cannot be empty")]
    Empty,

    #[error("Resource label is too long (maximum {max} characters)")]
    TooLong { max: usize },

    #[error("Resource label cannot contain whitespace")]
    InvalidWhitespace,

    #[error("Resource label contains invalid characters: {chars}")]
    InvalidCharacters { chars: String },
}

/// Validate a resource label used as the bot's session resource or room nickname.
///
/// Labels travel inside addresses and are matched against message bodies
/// (`"<label>, cmd"`), so whitespace and control characters are refused.
pub fn validate_resource(label: &str) -> Result<String, ResourceError> {
    if label.is_empty() {
        return Err(ResourceError::Empty);
    }
    if label.chars().count() > MAX_RESOURCE_LEN {
        return Err(ResourceError::TooLong {
            max: MAX_RESOURCE_LEN,
        });
    }
    if label.chars().any(char::is_whitespace) {
        return Err(ResourceError::InvalidWhitespace);
    }
    let invalid: HashSet<char> = label
        .chars()
        .filter(|c| c.is_control() || *c == '@' || *c == '/')
        .collect();
    if !invalid.is_empty() {
        let mut chars: Vec<char> = invalid.into_iter().collect();
        chars.sort_unstable();
        let chars = chars
            .into_iter()
            .map(|c| {
                if c.is_control() {
                    format!("\\u{{{:04x}}}", c as u32)
                } else {
                    c.to_string()
                }
            })
            .collect();
        return Err(ResourceError::InvalidCharacters { chars });
    }
    Ok(label.to_string())
}

/// Command names are a single token: non-empty, no whitespace or control characters.
pub fn validate_command_name(name: &str) -> Result<String, BotError> {
    let invalid = name.is_empty()
        || name.chars().count() > MAX_COMMAND_LEN
        || name.chars().any(|c| c.is_whitespace() || c.is_control());
    if invalid {
        return Err(BotError::InvalidCommandName(name.to_string()));
    }
    Ok(name.to_string())
}

/// Split `room@server` into its two halves. Exactly one `@` with both sides non-empty.
pub fn split_room_id(room_id: &str) -> Result<(String, String), BotError> {
    let malformed = || BotError::MalformedRoomIdentifier(room_id.to_string());
    let mut parts = room_id.split('@');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(room), Some(server), None)
            if !room.is_empty()
                && !server.is_empty()
                && !room_id.contains('/')
                && !room_id.chars().any(char::is_whitespace) =>
        {
            Ok((room.to_lowercase(), server.to_lowercase()))
        }
        _ => Err(malformed()),
    }
}

/// Pick the configured command prefix if it is one allowed character, else the default.
pub fn normalize_prefix(configured: Option<&str>) -> char {
    let mut chars = match configured {
        Some(s) => s.trim().chars(),
        None => return DEFAULT_COMMAND_PREFIX,
    };
    match (chars.next(), chars.next()) {
        (Some(c), None) if ALLOWED_PREFIXES.contains(&c) => c,
        _ => DEFAULT_COMMAND_PREFIX,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_rules() {
        assert_eq!(validate_resource("bot_"), Ok("bot_".to_string()));
        assert_eq!(validate_resource(""), Err(ResourceError::Empty));
        assert_eq!(validate_resource("my bot"), Err(ResourceError::InvalidWhitespace));
        assert_eq!(
            validate_resource(&"x".repeat(65)),
            Err(ResourceError::TooLong { max: 64 })
        );
        assert_eq!(
            validate_resource("a@b/c"),
            Err(ResourceError::InvalidCharacters { chars: "/@".into() })
        );
    }

    #[test]
    fn command_names() {
        assert!(validate_command_name("echo").is_ok());
        assert!(validate_command_name("list_rooms").is_ok());
        assert!(validate_command_name("").is_err());
        assert!(validate_command_name("two words").is_err());
    }

    #[test]
    fn room_ids_need_exactly_one_at() {
        assert_eq!(
            split_room_id("abc@conf.example.com").unwrap(),
            ("abc".to_string(), "conf.example.com".to_string())
        );
        for bad in ["abc", "a@b@c", "@conf", "abc@", "abc@conf/nick", "a c@conf"] {
            assert!(
                matches!(split_room_id(bad), Err(BotError::MalformedRoomIdentifier(_))),
                "expected {bad:?} to be malformed"
            );
        }
    }

    #[test]
    fn prefix_falls_back_to_bang() {
        assert_eq!(normalize_prefix(None), '!');
        assert_eq!(normalize_prefix(Some("^")), '^');
        assert_eq!(normalize_prefix(Some("#")), '!');
        assert_eq!(normalize_prefix(Some("!!")), '!');
    }
}
