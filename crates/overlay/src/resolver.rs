//! Merge parsed hints, explicit arguments and remembered state into a
//! complete [`OverlayLayout`].

use std::sync::Arc;

use serde::Serialize;
use switchyard_core::overlay::{
    DEFAULT_COLOR, FontFamily, HorizontalAlign, OverlayLayout, SizeAdjust, SizeBucket,
    VerticalAlign,
};
use switchyard_core::{LayoutStore, ThreadId};
use thiserror::Error;
use tracing::debug;

use crate::hints::{self, StyleHints};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("no overlay text given and nothing remembered for this thread")]
    MissingText,
}

/// One overlay edit as requested by the model's tool call.
#[derive(Debug, Clone, Copy, Default)]
pub struct OverlayRequest<'a> {
    pub text: Option<&'a str>,
    pub instruction: Option<&'a str>,
    pub position: Option<&'a str>,
    pub size: Option<&'a str>,
    pub color: Option<&'a str>,
    pub font: Option<&'a str>,
    pub style: Option<&'a str>,
}

impl OverlayRequest<'_> {
    /// All free-text fields that may carry styling vocabulary.
    fn hint_text(&self) -> String {
        [self.instruction, self.position, self.style, self.font]
            .into_iter()
            .flatten()
            .filter(|s| !s.trim().is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Size before and after a resolution, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SizeNote {
    pub before: Option<SizeBucket>,
    pub after: SizeBucket,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub layout: OverlayLayout,
    pub size_note: SizeNote,
    /// The remembered text was kept over a different incoming text.
    pub text_preserved: bool,
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

/// Resolve a request against already-parsed hints and the remembered layout.
pub fn resolve(
    hints: &StyleHints,
    request: &OverlayRequest<'_>,
    previous: Option<&OverlayLayout>,
) -> Result<Resolution, ResolveError> {
    let incoming = non_blank(request.text);
    let change_requested = request
        .instruction
        .is_some_and(hints::requests_text_change);

    let (text, text_preserved) = match (previous, incoming) {
        (Some(prev), Some(new)) if !change_requested => (prev.text.clone(), new != prev.text),
        (_, Some(new)) => (new.to_string(), false),
        (Some(prev), None) => (prev.text.clone(), false),
        (None, None) => return Err(ResolveError::MissingText),
    };

    let h_align = hints
        .h_align
        .or(previous.map(|p| p.h_align))
        .unwrap_or(HorizontalAlign::Center);
    let v_align = hints
        .v_align
        .or(previous.map(|p| p.v_align))
        .unwrap_or(VerticalAlign::Middle);

    let (arg_size, arg_adjust) = non_blank(request.size)
        .map(hints::size_from_arg)
        .unwrap_or((None, None));
    let before = previous.map(|p| p.size);
    // A bare size verb picks a bucket on a first placement and steps otherwise.
    let (verb_bucket, verb_adjust) = match (hints.size_verb, previous) {
        (Some(SizeAdjust::Larger), None) => (Some(SizeBucket::Large), None),
        (Some(SizeAdjust::Smaller), None) => (Some(SizeBucket::Small), None),
        (verb, _) => (None, verb),
    };
    let absolute = hints.size.or(verb_bucket);
    let base = absolute.or(arg_size).or(before).unwrap_or(SizeBucket::Large);
    let size = match hints.size_adjust.or(verb_adjust).or(arg_adjust) {
        Some(adjust) if absolute.is_none() => base.step(adjust),
        _ => base,
    };

    let color = non_blank(request.color)
        .and_then(hints::color_from_arg)
        .or_else(|| hints.color.clone())
        .or_else(|| previous.map(|p| p.color.clone()))
        .unwrap_or_else(|| DEFAULT_COLOR.to_string());

    let font = hints
        .font
        .or(previous.map(|p| p.font))
        .unwrap_or(FontFamily::Gothic);
    let bold = hints.bold.or(previous.map(|p| p.bold)).unwrap_or(false);
    let italic = hints.italic.or(previous.map(|p| p.italic)).unwrap_or(false);

    let (base_x, base_y) = match previous {
        Some(p) if !hints.repositioned => (p.offset_x, p.offset_y),
        _ => (0, 0),
    };

    Ok(Resolution {
        layout: OverlayLayout {
            text,
            h_align,
            v_align,
            offset_x: base_x + hints.dx,
            offset_y: base_y + hints.dy,
            size,
            color,
            font,
            bold,
            italic,
        },
        size_note: SizeNote { before, after: size },
        text_preserved,
    })
}

/// Stateful resolver: reads the thread's remembered layout, resolves the
/// request against it and remembers the outcome.
#[derive(Clone)]
pub struct OverlayResolver {
    store: Arc<dyn LayoutStore>,
}

impl OverlayResolver {
    pub fn new(store: Arc<dyn LayoutStore>) -> Self {
        Self { store }
    }

    /// Resolve against the remembered layout and remember the outcome.
    pub async fn resolve(
        &self,
        thread_id: &ThreadId,
        request: &OverlayRequest<'_>,
    ) -> Result<Resolution, ResolveError> {
        let previous = self.store.get(thread_id).await;
        let hints = hints::parse(&request.hint_text());
        let resolution = resolve(&hints, request, previous.as_ref())?;

        debug!(
            thread_id = %thread_id,
            size_before = resolution.size_note.before.map(|s| s.as_str()),
            size_after = resolution.size_note.after.as_str(),
            text_preserved = resolution.text_preserved,
            offset_x = resolution.layout.offset_x,
            offset_y = resolution.layout.offset_y,
            "Resolved overlay layout"
        );
        self.store.set(thread_id, resolution.layout.clone()).await;
        Ok(resolution)
    }

    /// Forget the remembered layout, e.g. after a new base image.
    pub async fn forget(&self, thread_id: &ThreadId) {
        self.store.clear(thread_id).await;
    }
}
