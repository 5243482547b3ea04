//! Free-text styling instruction parser.
//!
//! [`parse`] is a pure function from instruction text to [`StyleHints`]:
//! everything the text asks for, and nothing it does not. Merging with the
//! caller's explicit arguments and the remembered layout happens in the
//! resolver.

use switchyard_core::overlay::{FontFamily, HorizontalAlign, SizeAdjust, SizeBucket, VerticalAlign};

use crate::vocab::{self, first_match};

/// What an instruction explicitly requested. `None` means "not mentioned".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StyleHints {
    pub h_align: Option<HorizontalAlign>,
    pub v_align: Option<VerticalAlign>,
    pub size: Option<SizeBucket>,
    pub size_adjust: Option<SizeAdjust>,
    /// Bare "大きく"/"小さく"; the resolver decides between a step and a bucket.
    pub size_verb: Option<SizeAdjust>,
    pub color: Option<String>,
    pub font: Option<FontFamily>,
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    /// Accumulated nudge delta in pixels.
    pub dx: i32,
    pub dy: i32,
    /// An alignment, corner or placement reset was named, so remembered
    /// offsets no longer apply.
    pub repositioned: bool,
}

impl StyleHints {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Parse a styling instruction.
pub fn parse(text: &str) -> StyleHints {
    let mut hints = StyleHints::default();
    let lowered = text.to_lowercase();
    if lowered.trim().is_empty() {
        return hints;
    }

    // Nudges first. Their phrases are blanked out so "a little to the right"
    // does not also read as right alignment.
    let mut rest = lowered;
    for rule in vocab::NUDGES.iter() {
        let hits = rule.pattern.find_iter(&rest).count() as i32;
        if hits > 0 {
            hints.dx += rule.outcome.0 * hits;
            hints.dy += rule.outcome.1 * hits;
            rest = rule.pattern.replace_all(&rest, " ").into_owned();
        }
    }
    let text = rest.as_str();

    if let Some(rule) = first_match(&vocab::RELATIVE_SIZES, text) {
        hints.size_adjust = Some(rule.outcome);
    } else if let Some(rule) = first_match(&vocab::ABSOLUTE_SIZES, text) {
        hints.size = Some(rule.outcome);
    } else if let Some(rule) = first_match(&vocab::SIZE_VERBS, text) {
        hints.size_verb = Some(rule.outcome);
    }

    let corner = first_match(&vocab::CORNERS, text).map(|r| r.outcome);
    if let Some((h, v)) = corner {
        hints.h_align = Some(h);
        hints.v_align = Some(v);
    } else {
        hints.v_align = first_match(&vocab::VERTICAL, text).map(|r| r.outcome);
        if hints.v_align.is_none() && vocab::MIDDLE.pattern.is_match(text) {
            hints.v_align = Some(vocab::MIDDLE.outcome);
        }
        hints.h_align = first_match(&vocab::HORIZONTAL, text).map(|r| r.outcome);
        if hints.h_align.is_none() && vocab::CENTER.pattern.is_match(text) {
            hints.h_align = Some(vocab::CENTER.outcome);
        }
    }

    hints.repositioned = hints.h_align.is_some()
        || hints.v_align.is_some()
        || vocab::PLACEMENT_RESET.is_match(text);

    hints.font = first_match(&vocab::FONTS, text).map(|r| r.outcome);
    hints.color = first_match(&vocab::COLORS, text).map(|r| r.outcome.to_string());
    hints.bold = first_match(&vocab::BOLD, text).map(|r| r.outcome);
    hints.italic = first_match(&vocab::ITALIC, text).map(|r| r.outcome);

    hints
}

/// Whether the raw instruction explicitly asks for new wording.
pub fn requests_text_change(instruction: &str) -> bool {
    vocab::TEXT_CHANGE.is_match(&instruction.to_lowercase())
}

/// Map a caller-supplied size string onto a bucket, accepting both the
/// canonical names and instruction vocabulary ("特大", "bigger").
pub fn size_from_arg(value: &str) -> (Option<SizeBucket>, Option<SizeAdjust>) {
    if let Some(bucket) = SizeBucket::parse(value) {
        return (Some(bucket), None);
    }
    let lowered = value.to_lowercase();
    if let Some(rule) = first_match(&vocab::RELATIVE_SIZES, &lowered) {
        return (None, Some(rule.outcome));
    }
    if let Some(rule) = first_match(&vocab::SIZE_VERBS, &lowered) {
        return (None, Some(rule.outcome));
    }
    (first_match(&vocab::ABSOLUTE_SIZES, &lowered).map(|r| r.outcome), None)
}

/// Normalise a caller-supplied color: named colors map to their hex value,
/// anything else passes through trimmed.
pub fn color_from_arg(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.starts_with('#') {
        return Some(trimmed.to_ascii_uppercase());
    }
    let lowered = trimmed.to_lowercase();
    Some(
        first_match(&vocab::COLORS, &lowered)
            .map(|r| r.outcome.to_string())
            .unwrap_or_else(|| trimmed.to_string()),
    )
}
