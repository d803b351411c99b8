//! Annotated, hierarchically-scoped text.
//!
//! This crate models text decorated with scope and diff metadata and the
//! algorithms over it: canonical normalization, a structural leaf mapper
//! with offset tracking, and a word-level diff whose result is re-injected
//! into the hierarchical shape of the newer text. The text itself is
//! opaque: nothing here interprets its content, only its structure.
//!
//! ## Core types
//!
//! - [`AnnotatedText`] - the recursive text model (plain text, sequences,
//!   scope wrappers, annotated leaves)
//! - [`Annotation`] / [`DiffStatus`] - leaf metadata
//! - [`TextDiff`] / [`DiffChunk`] - word-diff results
//!
//! ## Example
//!
//! ```
//! use annotated_text::{diff, AnnotatedText};
//!
//! let old = AnnotatedText::from("aa aa");
//! let new = AnnotatedText::from("aa bb aa");
//!
//! let result = diff(Some(&old), &new)?;
//! assert!(result.changed);
//! assert_eq!(result.text.display_string(), "aa bb aa");
//! # Ok::<(), annotated_text::DiffError>(())
//! ```
//!
//! All operations are pure functions over immutable trees: they may be
//! called concurrently on shared values without locking.

mod diff;
mod map;
mod normalize;
mod text;

pub use diff::{diff, word_diff, ChunkKind, DiffChunk, DiffError, TextDiff};
pub use text::{Annotation, AnnotatedText, DiffStatus};
