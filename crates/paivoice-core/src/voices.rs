//! Voice personalities and pronunciation data.
//!
//! The voices file is a markdown document whose first fenced JSON block
//! holds `{"voices": {"<name>": {…}}}`; the surrounding prose is for
//! humans and ignored here. The pronunciations file is a flat JSON object
//! of term → replacement.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::domain::ProsodyOverride;
use crate::text::Pronunciations;

/// One entry of the voices file: a named voice with its upstream id and
/// prosody preferences.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct VoicePersona {
    /// Upstream (ElevenLabs) voice identifier.
    pub voice_id: Option<String>,
    /// Prosody preferences for this voice, applied under request overrides.
    #[serde(flatten)]
    pub settings: ProsodyOverride,
    /// Free-text description, never spoken.
    pub description: Option<String>,
}

/// All configured voices, looked up by name or by upstream id.
#[derive(Debug, Default)]
pub struct VoiceCatalog {
    voices: BTreeMap<String, VoicePersona>,
}

#[derive(Debug, Deserialize)]
struct VoicesDocument {
    voices: BTreeMap<String, VoicePersona>,
}

impl VoiceCatalog {
    /// Load the catalog from the voices markdown file.
    ///
    /// A missing or unparsable file yields an empty catalog; voice lookups
    /// then fall through to defaults.
    #[must_use]
    pub fn load(path: &Path) -> Self {
        let Ok(contents) = std::fs::read_to_string(path) else {
            debug!(path = %path.display(), "No voices file, using empty catalog");
            return Self::default();
        };
        let Some(block) = first_fenced_json_block(&contents) else {
            warn!(path = %path.display(), "Voices file has no fenced JSON block");
            return Self::default();
        };
        match serde_json::from_str::<VoicesDocument>(block) {
            Ok(doc) => {
                info!(voices = doc.voices.len(), "Loaded voice catalog");
                Self { voices: doc.voices }
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Unreadable voices block");
                Self::default()
            }
        }
    }

    #[must_use]
    pub fn from_map(voices: BTreeMap<String, VoicePersona>) -> Self {
        Self { voices }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.voices.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.voices.is_empty()
    }

    /// Look up a voice by its human name, case-insensitively.
    #[must_use]
    pub fn by_name(&self, name: &str) -> Option<&VoicePersona> {
        self.voices
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, persona)| persona)
    }

    /// Look up a voice by its upstream id.
    #[must_use]
    pub fn by_id(&self, voice_id: &str) -> Option<&VoicePersona> {
        self.voices
            .values()
            .find(|p| p.voice_id.as_deref() == Some(voice_id))
    }

    /// Resolve the upstream voice id for a human name.
    #[must_use]
    pub fn id_for_name(&self, name: &str) -> Option<&str> {
        self.by_name(name).and_then(|p| p.voice_id.as_deref())
    }
}

/// Extract the contents of the first fenced code block that parses as JSON
/// (` ``` ` or ` ```json `).
fn first_fenced_json_block(markdown: &str) -> Option<&str> {
    let mut rest = markdown;
    loop {
        let open = rest.find("```")?;
        let after_fence = &rest[open + 3..];
        let line_end = after_fence.find('\n')?;
        let body = &after_fence[line_end + 1..];
        let close = body.find("```")?;
        let block = body[..close].trim();
        if block.starts_with('{') {
            return Some(block);
        }
        rest = &body[close + 3..];
    }
}

/// Load the pronunciations file into a compiled replacement set.
#[must_use]
pub fn load_pronunciations(path: &Path) -> Pronunciations {
    let Ok(contents) = std::fs::read_to_string(path) else {
        debug!(path = %path.display(), "No pronunciations file");
        return Pronunciations::default();
    };
    match serde_json::from_str::<BTreeMap<String, String>>(&contents) {
        Ok(map) => {
            info!(terms = map.len(), "Loaded pronunciation map");
            Pronunciations::from_map(&map)
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Unreadable pronunciations file");
            Pronunciations::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const VOICES_MD: &str = r#"# Voice personalities

Intro prose that should be ignored.

```json
{
  "voices": {
    "Ash": {
      "voice_id": "el-ash-01",
      "stability": 0.6,
      "volume": 0.8,
      "description": "Calm narrator"
    },
    "Nova": {
      "voice_id": "el-nova-02",
      "speed": 1.15
    }
  }
}
```

Trailing prose.
"#;

    #[test]
    fn parses_first_fenced_block() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("voices.md");
        fs::write(&path, VOICES_MD).unwrap();

        let catalog = VoiceCatalog::load(&path);
        assert_eq!(catalog.len(), 2);

        let ash = catalog.by_name("ash").unwrap();
        assert_eq!(ash.voice_id.as_deref(), Some("el-ash-01"));
        assert_eq!(ash.settings.stability, Some(0.6));
        assert_eq!(ash.settings.volume, Some(0.8));

        assert!(catalog.by_id("el-nova-02").is_some());
        assert_eq!(catalog.id_for_name("Nova"), Some("el-nova-02"));
        assert!(catalog.by_name("missing").is_none());
    }

    #[test]
    fn skips_non_json_fences() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("voices.md");
        fs::write(
            &path,
            "```bash\necho hi\n```\n\n```json\n{\"voices\":{\"A\":{\"voice_id\":\"x\"}}}\n```\n",
        )
        .unwrap();

        let catalog = VoiceCatalog::load(&path);
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.id_for_name("A"), Some("x"));
    }

    #[test]
    fn missing_file_is_empty_catalog() {
        let catalog = VoiceCatalog::load(Path::new("/nonexistent/voices.md"));
        assert!(catalog.is_empty());
    }

    #[test]
    fn pronunciations_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pronunciations.json");
        fs::write(&path, r#"{"sql": "sequel"}"#).unwrap();

        let pron = load_pronunciations(&path);
        assert_eq!(pron.len(), 1);
        assert_eq!(pron.apply("run SQL now"), "run sequel now");
    }
}
