//! Structural mapper: a fold over every leaf span of an annotated text.
//!
//! This is the one traversal extension point in the crate; the diff aligner
//! is built on top of it. The mapper visits each leaf exactly once, left to
//! right, handing the callback the leaf's raw text, a copy of its
//! annotation (empty for `Plain` leaves), and the running plain/display
//! byte offsets of everything visited so far. The replacement returned by
//! the callback is spliced into the tree in place of the leaf; a returned
//! `Sequence` is flattened directly into the parent.
//!
//! Running offsets advance by the *replacement's* plain/display lengths,
//! not the original leaf's, so later callbacks see offsets consistent with
//! the evolving output.

use std::convert::Infallible;

use crate::text::{Annotation, AnnotatedText};

impl AnnotatedText {
    /// Map every leaf through `f`, splicing the results back into the
    /// tree's shape. Scope wrappers are preserved around their mapped
    /// content; scope identifiers are never passed to `f`.
    pub fn map_leaves<F>(&self, mut f: F) -> AnnotatedText
    where
        F: FnMut(&str, &Annotation, usize, usize) -> AnnotatedText,
    {
        match self.try_map_leaves::<_, Infallible>(|text, ann, plain, display| {
            Ok(f(text, ann, plain, display))
        }) {
            Ok(text) => text,
            Err(infallible) => match infallible {},
        }
    }

    /// Fallible variant of [`map_leaves`](Self::map_leaves): the first
    /// error aborts the traversal.
    pub fn try_map_leaves<F, E>(&self, mut f: F) -> Result<AnnotatedText, E>
    where
        F: FnMut(&str, &Annotation, usize, usize) -> Result<AnnotatedText, E>,
    {
        let mut offsets = Offsets {
            plain: 0,
            display: 0,
        };
        map_node(self, &mut f, &mut offsets)
    }
}

/// Running byte offsets threaded through the traversal.
struct Offsets {
    plain: usize,
    display: usize,
}

impl Offsets {
    fn advance_by(&mut self, replacement: &AnnotatedText) {
        self.plain += replacement.plain_len();
        self.display += replacement.display_len();
    }
}

fn map_node<F, E>(
    node: &AnnotatedText,
    f: &mut F,
    offsets: &mut Offsets,
) -> Result<AnnotatedText, E>
where
    F: FnMut(&str, &Annotation, usize, usize) -> Result<AnnotatedText, E>,
{
    match node {
        AnnotatedText::Plain(text) => {
            let replacement = f(text, &Annotation::default(), offsets.plain, offsets.display)?;
            offsets.advance_by(&replacement);
            Ok(replacement)
        }
        AnnotatedText::Sequence(items) => {
            let mut results = Vec::with_capacity(items.len());
            for item in items {
                match map_node(item, f, offsets)? {
                    // Flatten, so callbacks returning sequences never
                    // introduce nesting.
                    AnnotatedText::Sequence(inner) => results.extend(inner),
                    other => results.push(other),
                }
            }
            Ok(AnnotatedText::Sequence(results))
        }
        AnnotatedText::Scoped { scope, text } => {
            let mapped = map_node(text, f, offsets)?;
            Ok(AnnotatedText::Scoped {
                scope: scope.clone(),
                text: Box::new(mapped),
            })
        }
        AnnotatedText::Annotated { text, .. } => {
            let annotation = node.annotation().unwrap_or_default();
            let replacement = f(text, &annotation, offsets.plain, offsets.display)?;
            offsets.advance_by(&replacement);
            Ok(replacement)
        }
    }
}
