//! Prompt assembly for persona-driven replies.
//!
//! Deterministic: identical (persona, character, text) inputs yield
//! identical prompt text. Randomizing the voice is the generator's
//! job, not ours.

use crate::persona::{Character, Persona};

/// Maximum number of style hint phrases included in a prompt.
pub const MAX_STYLE_HINTS: usize = 6;

/// Build the instruction sent to the generator for one viewer message.
///
/// Names the persona and character, caps the requested length (the
/// watcher hard-truncates the output regardless), asks for exactly one
/// reply, and folds in up to [`MAX_STYLE_HINTS`] of the character's
/// configured reply phrases as tone guidance.
pub fn build_reply_prompt(
    persona: &Persona,
    character: &Character,
    user_text: &str,
    max_chars: usize,
) -> String {
    let replies = &character.greetings.replies;
    let style = if replies.is_empty() {
        "friendly".to_string()
    } else {
        replies
            .iter()
            .take(MAX_STYLE_HINTS)
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" / ")
    };

    format!(
        "You are replying as character '{}' of persona '{}'. \
         Return exactly one short reply of at most {max_chars} characters. \
         Keep emoji to a minimum. \
         Reference phrases: {style}\n\
         Viewer: {user_text}",
        character.name, persona.name,
    )
}

/// Truncate text to at most `max_chars` characters, on a char
/// boundary. Backs up the length cap requested in the prompt.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persona::Greetings;

    fn test_pair() -> (Persona, Character) {
        let character = Character {
            name: "Main".to_string(),
            greetings: Greetings {
                start: "hi".to_string(),
                end: "bye".to_string(),
                replies: vec!["Nice!".to_string(), "Wow!".to_string()],
            },
        };
        let persona = Persona {
            name: "Streamer".to_string(),
            characters: vec![character.clone()],
        };
        (persona, character)
    }

    #[test]
    fn test_prompt_is_deterministic() {
        let (persona, character) = test_pair();
        let a = build_reply_prompt(&persona, &character, "hello there", 50);
        let b = build_reply_prompt(&persona, &character, "hello there", 50);
        assert_eq!(a, b);
    }

    #[test]
    fn test_prompt_names_persona_and_character() {
        let (persona, character) = test_pair();
        let prompt = build_reply_prompt(&persona, &character, "hello", 50);
        assert!(prompt.contains("'Streamer'"));
        assert!(prompt.contains("'Main'"));
        assert!(prompt.contains("at most 50 characters"));
        assert!(prompt.contains("Nice! / Wow!"));
        assert!(prompt.ends_with("Viewer: hello"));
    }

    #[test]
    fn test_prompt_without_style_hints_uses_friendly() {
        let (persona, mut character) = test_pair();
        character.greetings.replies.clear();
        let prompt = build_reply_prompt(&persona, &character, "hello", 50);
        assert!(prompt.contains("Reference phrases: friendly"));
    }

    #[test]
    fn test_prompt_caps_style_hints() {
        let (persona, mut character) = test_pair();
        character.greetings.replies = (0..10).map(|i| format!("hint{i}")).collect();
        let prompt = build_reply_prompt(&persona, &character, "hello", 50);
        assert!(prompt.contains("hint5"));
        assert!(!prompt.contains("hint6"), "only the first 6 hints are used");
    }

    #[test]
    fn test_truncate_chars_ascii() {
        assert_eq!(truncate_chars("hello world", 5), "hello");
        assert_eq!(truncate_chars("hi", 5), "hi");
        assert_eq!(truncate_chars("", 5), "");
    }

    #[test]
    fn test_truncate_chars_multibyte() {
        // Counts characters, not bytes.
        let text = "こんにちは世界";
        assert_eq!(truncate_chars(text, 5), "こんにちは");
    }
}
