//! # Switchyard Overlay
//!
//! Turns loose styling instructions ("もう少し右に", "make it bigger and
//! red", "右上に太字で") into a complete [`OverlayLayout`], remembering the
//! last result per thread so follow-up edits are incremental.
//!
//! - [`hints::parse`] reads an instruction into [`StyleHints`]
//! - [`resolver::resolve`] merges hints, explicit arguments and memory
//! - [`OverlayResolver`] wraps both around a [`LayoutStore`]
//!
//! [`OverlayLayout`]: switchyard_core::OverlayLayout
//! [`LayoutStore`]: switchyard_core::LayoutStore

pub mod hints;
pub mod resolver;
pub mod vocab;

pub use hints::{StyleHints, parse};
pub use resolver::{OverlayRequest, OverlayResolver, Resolution, ResolveError, SizeNote, resolve};
