//! # Sound Catalog
//!
//! Catalog documents shipped in the voice pack (`metadata/categories.json`
//! and `metadata/voice_files.json`) and the flattened [`AudioFile`] entries
//! the UI renders as buttons.
//!
//! Parsing is tolerant: a malformed document degrades to an empty list with
//! a warning, and a record with a missing string field keeps an empty value.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::identifier::AudioIdentifier;

/// Category assigned to entries that carry no `cat` field.
pub const DEFAULT_CATEGORY: &str = "other";

/// Category used for user-imported sounds.
pub const CUSTOM_CATEGORY: &str = "custom";

/// A category record from `categories.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    #[serde(default)]
    pub id: String,
}

/// A raw record from `voice_files.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceFile {
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub internal: String,
    #[serde(default)]
    pub cat: Option<String>,
}

/// A playable catalog entry.
///
/// For bundled/downloaded sounds `filename` is relative to the voice pack's
/// `voice/` directory; for custom sounds it is an absolute path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioFile {
    pub filename: String,
    pub label: String,
    pub internal: String,
    #[serde(rename = "cat", default)]
    pub category: Option<String>,
    #[serde(default)]
    pub is_custom: bool,
}

impl AudioFile {
    /// Identifier the queue stores for this entry.
    pub fn to_identifier(&self) -> AudioIdentifier {
        if self.is_custom {
            AudioIdentifier::file(&self.filename)
        } else {
            AudioIdentifier::voice(&self.filename)
        }
    }

    pub fn category_or_other(&self) -> &str {
        self.category.as_deref().unwrap_or(DEFAULT_CATEGORY)
    }
}

impl From<VoiceFile> for AudioFile {
    fn from(file: VoiceFile) -> Self {
        AudioFile {
            filename: file.filename,
            label: file.label,
            internal: file.internal,
            category: file.cat.map(|c| c.to_lowercase()),
            is_custom: false,
        }
    }
}

/// Both catalog documents of one voice pack.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    pub categories: Vec<Category>,
    pub voice_files: Vec<VoiceFile>,
}

impl Catalog {
    pub fn parse(categories_json: &str, voice_files_json: &str) -> Self {
        Catalog {
            categories: parse_categories(categories_json),
            voice_files: parse_voice_files(voice_files_json),
        }
    }

    /// Flatten into playable entries, normalizing category names to lowercase.
    pub fn audio_files(&self) -> Vec<AudioFile> {
        self.voice_files.iter().cloned().map(AudioFile::from).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.voice_files.is_empty()
    }
}

fn parse_list<T: serde::de::DeserializeOwned>(json: &str, document: &str) -> Vec<T> {
    match serde_json::from_str::<Vec<T>>(json) {
        Ok(items) => {
            debug!(document, count = items.len(), "Parsed catalog document");
            items
        }
        Err(e) => {
            warn!(document, error = %e, "Failed to parse catalog document");
            Vec::new()
        }
    }
}

/// Parse `categories.json`. Malformed input yields an empty list.
pub fn parse_categories(json: &str) -> Vec<Category> {
    parse_list(json, "categories")
}

/// Parse `voice_files.json`. Malformed input yields an empty list.
pub fn parse_voice_files(json: &str) -> Vec<VoiceFile> {
    parse_list(json, "voice_files")
}

/// Parse `voice_files.json` into catalog entries and append the custom sounds.
pub fn parse_audio_files(voice_files_json: &str, custom: &[AudioFile]) -> Vec<AudioFile> {
    let mut files: Vec<AudioFile> = parse_voice_files(voice_files_json)
        .into_iter()
        .map(AudioFile::from)
        .collect();
    files.extend(custom.iter().cloned());
    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const VOICE_FILES: &str = r#"[
        {"filename": "hello.mp3", "label": "Hello", "internal": "hello", "cat": "Greetings"},
        {"filename": "bye.mp3", "label": "Bye", "internal": "bye", "extra": 42},
        {"label": "Nameless"}
    ]"#;

    #[test]
    fn parses_voice_files_with_defaults() {
        let files = parse_voice_files(VOICE_FILES);
        assert_eq!(files.len(), 3);
        assert_eq!(files[0].cat.as_deref(), Some("Greetings"));
        assert_eq!(files[1].cat, None);
        assert_eq!(files[2].filename, "");
        assert_eq!(files[2].label, "Nameless");
    }

    #[test]
    fn malformed_documents_are_empty() {
        assert!(parse_voice_files("{not json").is_empty());
        assert!(parse_categories(r#"{"id": "not-an-array"}"#).is_empty());
    }

    #[test]
    fn categories_keep_ids() {
        let cats = parse_categories(r#"[{"id": "memes"}, {"id": "greetings", "icon": "x"}]"#);
        assert_eq!(
            cats,
            vec![
                Category { id: "memes".into() },
                Category {
                    id: "greetings".into()
                }
            ]
        );
    }

    #[test]
    fn audio_files_lowercase_categories() {
        let catalog = Catalog::parse("[]", VOICE_FILES);
        let files = catalog.audio_files();
        assert_eq!(files[0].category.as_deref(), Some("greetings"));
        assert_eq!(files[1].category_or_other(), "other");
        assert!(files.iter().all(|f| !f.is_custom));
    }

    #[test]
    fn identifiers_follow_origin() {
        let bundled = AudioFile {
            filename: "a.mp3".into(),
            label: "A".into(),
            internal: "a".into(),
            category: None,
            is_custom: false,
        };
        assert_eq!(bundled.to_identifier(), AudioIdentifier::voice("a.mp3"));

        let custom = AudioFile {
            filename: "/data/custom_sounds/b.mp3".into(),
            is_custom: true,
            ..bundled
        };
        assert_eq!(
            custom.to_identifier(),
            AudioIdentifier::FileReference(PathBuf::from("/data/custom_sounds/b.mp3"))
        );
    }

    #[test]
    fn custom_sounds_are_appended() {
        let custom = AudioFile {
            filename: "/tmp/x.mp3".into(),
            label: "x.mp3".into(),
            internal: "x.mp3".into(),
            category: Some(CUSTOM_CATEGORY.into()),
            is_custom: true,
        };
        let files = parse_audio_files(VOICE_FILES, std::slice::from_ref(&custom));
        assert_eq!(files.len(), 4);
        assert_eq!(files.last(), Some(&custom));
    }
}
