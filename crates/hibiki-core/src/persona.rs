//! Persona catalog: the voices the bot can speak as.
//!
//! Loaded once per watcher start from `personas.json` and held
//! immutable for the session; edits on disk only apply to a fresh
//! start.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::warn;

use crate::error::HibikiError;

/// Greeting texts and reply style hints for one character.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Greetings {
    /// Sent when the chat feed connects.
    #[serde(default)]
    pub start: String,
    /// Sent when the feed disconnects or the watcher stops.
    #[serde(default)]
    pub end: String,
    /// Style hint phrases used to bias generated replies. May be empty.
    #[serde(default)]
    pub replies: Vec<String>,
}

/// One voice within a persona.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Character {
    pub name: String,
    #[serde(default)]
    pub greetings: Greetings,
}

/// A named persona with an ordered list of characters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Persona {
    pub name: String,
    #[serde(default)]
    pub characters: Vec<Character>,
}

/// On-disk shape of `personas.json`.
#[derive(Debug, Deserialize)]
struct PersonaFile {
    #[serde(default)]
    personas: Vec<Persona>,
}

/// Immutable view of the configured personas for one session.
#[derive(Debug, Clone)]
pub struct PersonaCatalog {
    personas: Vec<Persona>,
}

const DEFAULT_START: &str = "Hello everyone, welcome to the stream! Let's have fun together!";
const DEFAULT_END: &str = "Thanks for watching today! See you next stream!";

impl PersonaCatalog {
    /// Load the catalog from a JSON file.
    ///
    /// A missing file yields the built-in default catalog. A file that
    /// exists but is malformed (bad JSON, duplicate names) is
    /// rejected; there are no permissive fallback keys beyond the
    /// single normalization pass.
    pub fn load(path: &str) -> Result<Self, HibikiError> {
        let path = Path::new(path);
        if !path.exists() {
            warn!(
                "persona file not found at {}, using default catalog",
                path.display()
            );
            return Ok(Self::default_catalog());
        }

        let content = std::fs::read_to_string(path)?;
        let file: PersonaFile = serde_json::from_str(&content)
            .map_err(|e| HibikiError::Persona(format!("failed to parse {}: {e}", path.display())))?;

        Self::from_personas(file.personas)
    }

    /// Build a catalog from already-parsed personas, applying the
    /// normalization pass and rejecting duplicates.
    pub fn from_personas(mut personas: Vec<Persona>) -> Result<Self, HibikiError> {
        if personas.is_empty() {
            return Ok(Self::default_catalog());
        }

        let mut seen = HashSet::new();
        for persona in &mut personas {
            if persona.name.trim().is_empty() {
                return Err(HibikiError::Persona("persona with empty name".into()));
            }
            if !seen.insert(persona.name.clone()) {
                return Err(HibikiError::Persona(format!(
                    "duplicate persona name '{}'",
                    persona.name
                )));
            }
            if persona.characters.is_empty() {
                return Err(HibikiError::Persona(format!(
                    "persona '{}' has no characters",
                    persona.name
                )));
            }

            let mut char_seen = HashSet::new();
            for character in &mut persona.characters {
                if character.name.trim().is_empty() {
                    return Err(HibikiError::Persona(format!(
                        "persona '{}' has a character with an empty name",
                        persona.name
                    )));
                }
                if !char_seen.insert(character.name.clone()) {
                    return Err(HibikiError::Persona(format!(
                        "duplicate character name '{}' in persona '{}'",
                        character.name, persona.name
                    )));
                }
                normalize_greetings(&mut character.greetings);
            }
        }

        Ok(Self { personas })
    }

    /// The built-in fallback catalog: one persona, one character.
    pub fn default_catalog() -> Self {
        Self {
            personas: vec![Persona {
                name: "Default".to_string(),
                characters: vec![Character {
                    name: "Streamer".to_string(),
                    greetings: Greetings {
                        start: DEFAULT_START.to_string(),
                        end: DEFAULT_END.to_string(),
                        replies: vec![
                            "Awesome!".to_string(),
                            "Good point!".to_string(),
                            "That's fun!".to_string(),
                            "Cheering for you!".to_string(),
                        ],
                    },
                }],
            }],
        }
    }

    /// All personas, in catalog order.
    pub fn personas(&self) -> &[Persona] {
        &self.personas
    }

    /// Look up a persona by name; empty name selects the first one.
    pub fn find(&self, name: &str) -> Option<&Persona> {
        if name.is_empty() {
            return self.personas.first();
        }
        self.personas.iter().find(|p| p.name == name)
    }

    /// Resolve a (persona, character) selection, as named in config.
    pub fn select(
        &self,
        persona_name: &str,
        character_name: &str,
    ) -> Result<(Persona, Character), HibikiError> {
        let persona = self.find(persona_name).ok_or_else(|| {
            HibikiError::Config(format!("persona '{persona_name}' not found in catalog"))
        })?;

        let character = if character_name.is_empty() {
            persona.characters.first()
        } else {
            persona.characters.iter().find(|c| c.name == character_name)
        }
        .ok_or_else(|| {
            HibikiError::Config(format!(
                "character '{character_name}' not found in persona '{}'",
                persona.name
            ))
        })?;

        Ok((persona.clone(), character.clone()))
    }
}

/// Fill empty greeting texts with the stock defaults. This is the one
/// normalization step applied at load time.
fn normalize_greetings(greetings: &mut Greetings) {
    if greetings.start.trim().is_empty() {
        greetings.start = DEFAULT_START.to_string();
    }
    if greetings.end.trim().is_empty() {
        greetings.end = DEFAULT_END.to_string();
    }
}
