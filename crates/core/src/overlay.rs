//! Text-overlay layout types.
//!
//! An [`OverlayLayout`] is the complete, resolved description of a piece of
//! styled text composited onto a base image. Every field is always set; the
//! overlay resolver guarantees that by falling back to remembered state.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HorizontalAlign {
    Left,
    #[default]
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerticalAlign {
    Top,
    #[default]
    Middle,
    Bottom,
}

/// Named text size, ordered `small < medium < large < xlarge`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SizeBucket {
    Small,
    Medium,
    #[default]
    Large,
    Xlarge,
}

/// A relative size request ("a bit bigger", "smaller").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SizeAdjust {
    Larger,
    Smaller,
}

impl SizeBucket {
    pub const SCALE: [SizeBucket; 4] = [
        SizeBucket::Small,
        SizeBucket::Medium,
        SizeBucket::Large,
        SizeBucket::Xlarge,
    ];

    /// Step one position along the scale, clamped at both ends.
    pub fn step(self, adjust: SizeAdjust) -> Self {
        let idx = Self::SCALE.iter().position(|s| *s == self).unwrap_or(2);
        let next = match adjust {
            SizeAdjust::Larger => (idx + 1).min(Self::SCALE.len() - 1),
            SizeAdjust::Smaller => idx.saturating_sub(1),
        };
        Self::SCALE[next]
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "small" | "s" => Some(Self::Small),
            "medium" | "m" => Some(Self::Medium),
            "large" | "l" => Some(Self::Large),
            "xlarge" | "x-large" | "xl" | "extra-large" => Some(Self::Xlarge),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Small => "small",
            Self::Medium => "medium",
            Self::Large => "large",
            Self::Xlarge => "xlarge",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontFamily {
    #[default]
    Gothic,
    Mincho,
    Meiryo,
}

impl FontFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gothic => "gothic",
            Self::Mincho => "mincho",
            Self::Meiryo => "meiryo",
        }
    }
}

pub const DEFAULT_COLOR: &str = "#FFFFFF";

/// The complete resolved overlay for a thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlayLayout {
    pub text: String,
    pub h_align: HorizontalAlign,
    pub v_align: VerticalAlign,
    /// Horizontal nudge in pixels, positive = right
    pub offset_x: i32,
    /// Vertical nudge in pixels, positive = down
    pub offset_y: i32,
    pub size: SizeBucket,
    pub color: String,
    pub font: FontFamily,
    pub bold: bool,
    pub italic: bool,
}

impl OverlayLayout {
    /// A layout carrying `text` with every other field at its default.
    pub fn with_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            h_align: HorizontalAlign::default(),
            v_align: VerticalAlign::default(),
            offset_x: 0,
            offset_y: 0,
            size: SizeBucket::default(),
            color: DEFAULT_COLOR.into(),
            font: FontFamily::default(),
            bold: false,
            italic: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_step_clamps_at_both_ends() {
        assert_eq!(SizeBucket::Xlarge.step(SizeAdjust::Larger), SizeBucket::Xlarge);
        assert_eq!(SizeBucket::Small.step(SizeAdjust::Smaller), SizeBucket::Small);
        assert_eq!(SizeBucket::Medium.step(SizeAdjust::Larger), SizeBucket::Large);
        assert_eq!(SizeBucket::Large.step(SizeAdjust::Smaller), SizeBucket::Medium);
    }

    #[test]
    fn size_step_is_monotonic() {
        for s in SizeBucket::SCALE {
            assert!(s.step(SizeAdjust::Larger) >= s);
            assert!(s.step(SizeAdjust::Smaller) <= s);
        }
    }

    #[test]
    fn size_parse_accepts_aliases() {
        assert_eq!(SizeBucket::parse("XL"), Some(SizeBucket::Xlarge));
        assert_eq!(SizeBucket::parse("medium"), Some(SizeBucket::Medium));
        assert_eq!(SizeBucket::parse("giant"), None);
    }

    #[test]
    fn default_layout_is_centered_large_white() {
        let layout = OverlayLayout::with_text("SALE");
        assert_eq!(layout.h_align, HorizontalAlign::Center);
        assert_eq!(layout.v_align, VerticalAlign::Middle);
        assert_eq!(layout.size, SizeBucket::Large);
        assert_eq!(layout.color, "#FFFFFF");
        assert_eq!(layout.font, FontFamily::Gothic);
        assert!(!layout.bold && !layout.italic);
    }
}
