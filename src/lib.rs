//! polynotes - live inline markdown rendering for plain-text notes
//!
//! The core scans a note for markdown constructs and replaces every construct
//! the caret is not touching with rendered HTML, restoring the raw source as
//! soon as the caret enters it. The document itself always stays plain text;
//! rendering happens purely through replacement marks on a host text surface.
//!
//! # Example
//! ```ignore
//! use polynotes::{config::Settings, NoteEditor, RopeSurface};
//!
//! let surface = RopeSurface::from_str("Hello *world*!");
//! let mut note = NoteEditor::new(surface, &Settings::default())?;
//! note.update_rendering();
//! assert_eq!(note.snapshot().len(), 1);
//! ```

pub mod autopair;
pub mod config;
pub mod error;
pub mod markdown;
pub mod note;
pub mod render;
pub mod string_utils;
pub mod surface;

pub use autopair::AutoPairHandler;
pub use error::{Error, Result};
pub use note::NoteEditor;
pub use render::{RenderManager, RenderedElement};
pub use surface::{Position, RopeSurface, SurfaceEvent, TextSurface};
