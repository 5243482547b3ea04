//! Reasoning modes and the generation presets derived from them.

use serde::{Deserialize, Serialize};

/// Coarse knob selecting generation effort.
///
/// Inbound requests say `standard | thinking | fast`; `standard` (and
/// anything unrecognised) normalises to [`ReasoningMode::Normal`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReasoningMode {
    #[default]
    #[serde(alias = "standard")]
    Normal,
    Thinking,
    Fast,
}

impl ReasoningMode {
    /// Normalise an inbound selector.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "thinking" => Self::Thinking,
            "fast" => Self::Fast,
            _ => Self::Normal,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Thinking => "thinking",
            Self::Fast => "fast",
        }
    }

    /// The generation preset for this mode.
    pub fn options(&self) -> GenerationOptions {
        match self {
            Self::Normal => GenerationOptions {
                temperature: 0.7,
                reasoning_effort: "medium".into(),
                image_quality: "medium".into(),
            },
            Self::Thinking => GenerationOptions {
                temperature: 0.3,
                reasoning_effort: "high".into(),
                image_quality: "high".into(),
            },
            Self::Fast => GenerationOptions {
                temperature: 0.7,
                reasoning_effort: "low".into(),
                image_quality: "low".into(),
            },
        }
    }
}

/// Generation parameters shared by completion calls and the built-in tools.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationOptions {
    pub temperature: f32,
    pub reasoning_effort: String,
    pub image_quality: String,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        ReasoningMode::Normal.options()
    }
}
