use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const PLACEHOLDER_PROMPT: &str = "Create an instrumental track";
pub const MAX_TITLE_CHARS: usize = 100;
pub const MAX_LYRICS_CHARS: usize = 500;

pub const DEFAULT_TRACK_TITLE: &str = "Demo Track";
pub const DEFAULT_TRACK_STYLE: &str = "Lo-fi";

pub const STYLE_PRESETS: [&str; 8] = [
    "Lo-fi Hip Hop",
    "Synthwave",
    "Epic Orchestral",
    "Jazz Fusion",
    "Acoustic Folk",
    "Electronic Dance",
    "Cinematic Ambient",
    "Rock Ballad",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurprisePrompt {
    pub title: &'static str,
    pub style: &'static str,
    pub lyrics: &'static str,
}

pub const SURPRISE_PROMPTS: [SurprisePrompt; 5] = [
    SurprisePrompt {
        title: "Neon Dreams",
        style: "Synthwave",
        lyrics: "City lights, endless nights, chasing electric dreams",
    },
    SurprisePrompt {
        title: "Ocean Whispers",
        style: "Ambient",
        lyrics: "Waves of calm, washing over me, peaceful serenity",
    },
    SurprisePrompt {
        title: "Midnight Drive",
        style: "Lo-fi",
        lyrics: "Empty roads, starlit sky, just you and I",
    },
    SurprisePrompt {
        title: "Phoenix Rising",
        style: "Epic Orchestral",
        lyrics: "From the ashes we rise, reaching for the skies",
    },
    SurprisePrompt {
        title: "Coffee Shop Vibes",
        style: "Jazz",
        lyrics: "Warm cup of memories, rainy afternoon melodies",
    },
];

/// Lifecycle of a generation job.
///
/// The simulated flow only ever produces `Idle` and `Starting`; the remaining
/// variants are driven through [`crate::session::GenerationSession::advance`]
/// once a real backend reports progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GenerationStatus {
    #[default]
    Idle,
    Starting,
    Pending,
    Processing,
    Success,
    Failed,
}

impl GenerationStatus {
    pub fn is_active(&self) -> bool {
        !matches!(self, Self::Idle)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Failed)
    }

    pub fn progress_percent(&self) -> u16 {
        match self {
            Self::Starting => 15,
            Self::Pending => 35,
            Self::Processing => 75,
            _ => 0,
        }
    }

    pub fn status_message(&self, elapsed_seconds: u64) -> String {
        let time = format!("[{elapsed_seconds}s]");
        match self {
            Self::Starting => format!("{time} >> Initializing AI composer..."),
            Self::Pending => format!("{time} >> Request queued, AI is warming up..."),
            Self::Processing => format!("{time} >> Composing your masterpiece..."),
            _ => ">> Ready to create music...".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationRequest {
    pub title: String,
    pub style: String,
    pub lyrics: String,
}

impl GenerationRequest {
    pub fn new(
        title: impl Into<String>,
        style: impl Into<String>,
        lyrics: impl Into<String>,
    ) -> Self {
        Self {
            title: truncate_chars(title.into(), MAX_TITLE_CHARS),
            style: style.into(),
            lyrics: truncate_chars(lyrics.into(), MAX_LYRICS_CHARS),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_empty() && self.style.is_empty() && self.lyrics.is_empty()
    }

    /// Joins the non-empty fields into the display prompt, falling back to
    /// [`PLACEHOLDER_PROMPT`] when nothing was filled in.
    pub fn compose_prompt(&self) -> String {
        let mut parts = Vec::new();
        if !self.title.is_empty() {
            parts.push(format!("Title: {}", self.title));
        }
        if !self.style.is_empty() {
            parts.push(format!("Style: {}", self.style));
        }
        if !self.lyrics.is_empty() {
            parts.push(format!("Lyrics: {}", self.lyrics));
        }
        if parts.is_empty() {
            PLACEHOLDER_PROMPT.to_string()
        } else {
            parts.join(". ")
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: String,
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lyrics: Option<String>,
    pub file_url: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
}

impl Track {
    pub fn display_title(&self) -> String {
        if let Some(title) = self.title.as_deref().filter(|title| !title.is_empty()) {
            return title.to_string();
        }
        self.prompt
            .split('.')
            .next()
            .filter(|segment| !segment.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| "Untitled Track".to_string())
    }

    pub fn display_timestamp(&self) -> String {
        let local = self.created_at.with_timezone(&chrono::Local);
        format!("{} • {}", local.format("%Y-%m-%d"), local.format("%H:%M"))
    }
}

pub fn truncate_chars(value: String, max: usize) -> String {
    match value.char_indices().nth(max) {
        Some((byte_index, _)) => value[..byte_index].to_string(),
        None => value,
    }
}
