//! The annotated text model and its traversal/measurement functions.
//!
//! `AnnotatedText` is a recursive value type: raw text, ordered
//! concatenations, named scope wrappers, and annotated leaves. Trees are
//! immutable; every transformation in this crate produces a new tree.
//!
//! Two string projections exist side by side. The *plain* string is the
//! logical source content (leaf `text` fields, left to right). The *display*
//! string is what a viewer sees: a leaf with a non-empty substitution shows
//! the substitution instead of its text. Scope wrappers are transparent to
//! both projections, with one deliberate asymmetry: the display string of a
//! `Scoped` node is the **plain** string of its inner text, so substitutions
//! below a scope do not surface.

use serde::{Deserialize, Serialize};

/// Relationship a span of text has to a prior version of the text.
///
/// There is no `Removed` variant: removed content is simply absent from the
/// newer tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffStatus {
    Added,
}

/// Metadata carried by an annotated leaf.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    /// Marks the span as newly added relative to a prior version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diff: Option<DiffStatus>,
    /// Text to display in place of the leaf's text. The leaf's `text`
    /// remains the logical content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub substitution: Option<String>,
}

impl Annotation {
    /// Number of metadata fields that are set at all. An empty-string
    /// substitution counts as set.
    pub(crate) fn field_count(&self) -> usize {
        self.diff.is_some() as usize + self.substitution.is_some() as usize
    }

    /// Whether two adjacent leaves carrying these annotations may merge:
    /// identical diff status, and either neither has a substitution or at
    /// least one substitution is the empty string (which passes through
    /// silently, absorbed by the other side).
    pub fn mergeable_with(&self, other: &Annotation) -> bool {
        self.diff == other.diff
            && ((self.substitution.is_none() && other.substitution.is_none())
                || self.substitution.as_deref() == Some("")
                || other.substitution.as_deref() == Some(""))
    }
}

/// Annotated, hierarchically-scoped text.
///
/// Serializes as an untagged union mirroring the protocol wire shape:
/// a bare string, an array, `{scope, text}`, or `{text, diff?, substitution?}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnnotatedText {
    /// Raw text with no metadata.
    Plain(String),
    /// Concatenation; order defines adjacency for merging and diffing.
    Sequence(Vec<AnnotatedText>),
    /// A named wrapper grouping a sub-tree under an identifier. Does not
    /// alter rendered content.
    Scoped {
        scope: String,
        text: Box<AnnotatedText>,
    },
    /// A leaf span carrying metadata.
    Annotated {
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        diff: Option<DiffStatus>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        substitution: Option<String>,
    },
}

impl AnnotatedText {
    /// Empty text (the canonical empty string).
    pub fn empty() -> Self {
        AnnotatedText::Plain(String::new())
    }

    /// A scope wrapper around `text`.
    pub fn scoped(scope: impl Into<String>, text: AnnotatedText) -> Self {
        AnnotatedText::Scoped {
            scope: scope.into(),
            text: Box::new(text),
        }
    }

    /// An annotated leaf. A leaf whose annotation has no fields set at all
    /// degrades to `Plain` immediately (there is nothing to carry).
    pub fn annotated(text: impl Into<String>, annotation: Annotation) -> Self {
        let text = text.into();
        if annotation.field_count() == 0 {
            AnnotatedText::Plain(text)
        } else {
            AnnotatedText::Annotated {
                text,
                diff: annotation.diff,
                substitution: annotation.substitution,
            }
        }
    }

    /// The logical source content: all leaf `text` fields, left to right.
    /// Scope wrappers are transparent.
    pub fn plain_string(&self) -> String {
        let mut out = String::with_capacity(self.plain_len());
        self.write_plain(&mut out);
        out
    }

    /// The string a viewer sees: leaves with a non-empty substitution emit
    /// the substitution verbatim, all others their text. The inner text of
    /// a `Scoped` node is rendered via [`plain_string`](Self::plain_string)
    /// (substitutions below a scope do not surface).
    pub fn display_string(&self) -> String {
        let mut out = String::with_capacity(self.display_len());
        self.write_display(&mut out);
        out
    }

    /// Byte length of [`plain_string`](Self::plain_string), computed without
    /// building the string.
    pub fn plain_len(&self) -> usize {
        match self {
            AnnotatedText::Plain(s) => s.len(),
            AnnotatedText::Sequence(items) => items.iter().map(AnnotatedText::plain_len).sum(),
            AnnotatedText::Scoped { text, .. } => text.plain_len(),
            AnnotatedText::Annotated { text, .. } => text.len(),
        }
    }

    /// Byte length of [`display_string`](Self::display_string), computed
    /// without building the string.
    pub fn display_len(&self) -> usize {
        match self {
            AnnotatedText::Plain(s) => s.len(),
            AnnotatedText::Sequence(items) => items.iter().map(AnnotatedText::display_len).sum(),
            // Display resolves scoped content through the plain projection.
            AnnotatedText::Scoped { text, .. } => text.plain_len(),
            AnnotatedText::Annotated {
                text, substitution, ..
            } => match substitution.as_deref() {
                Some(sub) if !sub.is_empty() => sub.len(),
                _ => text.len(),
            },
        }
    }

    /// True if the plain string is empty.
    pub fn is_empty(&self) -> bool {
        self.plain_len() == 0
    }

    /// The annotation of this node, if it is an annotated leaf.
    pub(crate) fn annotation(&self) -> Option<Annotation> {
        match self {
            AnnotatedText::Annotated {
                diff, substitution, ..
            } => Some(Annotation {
                diff: *diff,
                substitution: substitution.clone(),
            }),
            _ => None,
        }
    }

    fn write_plain(&self, out: &mut String) {
        match self {
            AnnotatedText::Plain(s) => out.push_str(s),
            AnnotatedText::Sequence(items) => {
                for item in items {
                    item.write_plain(out);
                }
            }
            AnnotatedText::Scoped { text, .. } => text.write_plain(out),
            AnnotatedText::Annotated { text, .. } => out.push_str(text),
        }
    }

    fn write_display(&self, out: &mut String) {
        match self {
            AnnotatedText::Plain(s) => out.push_str(s),
            AnnotatedText::Sequence(items) => {
                for item in items {
                    item.write_display(out);
                }
            }
            AnnotatedText::Scoped { text, .. } => text.write_plain(out),
            AnnotatedText::Annotated {
                text, substitution, ..
            } => match substitution.as_deref() {
                Some(sub) if !sub.is_empty() => out.push_str(sub),
                _ => out.push_str(text),
            },
        }
    }
}

impl std::fmt::Display for AnnotatedText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.display_string())
    }
}

impl From<&str> for AnnotatedText {
    fn from(s: &str) -> Self {
        AnnotatedText::Plain(s.to_string())
    }
}

impl From<String> for AnnotatedText {
    fn from(s: String) -> Self {
        AnnotatedText::Plain(s)
    }
}

impl From<Vec<AnnotatedText>> for AnnotatedText {
    fn from(items: Vec<AnnotatedText>) -> Self {
        AnnotatedText::Sequence(items)
    }
}
