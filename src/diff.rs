//! Word-level diffing of annotated texts.
//!
//! `diff` compares the *display* strings of two annotated texts with a
//! word-level diff, then re-walks the structure of the newer text through
//! the structural mapper, splitting and retagging each leaf into sub-spans
//! that carry added/unchanged status. Removed content does not exist in the
//! newer tree and contributes nothing; the corresponding chunks are
//! consumed silently.
//!
//! The alignment between the chunk stream and the tree walk is a small
//! state machine, [`DiffCursor`]: a chunk index, the stream offset of the
//! current chunk's start, and an offset into the current chunk for chunks
//! that span several leaves. Desynchronization between the two is a bug,
//! never user error, and surfaces as a [`DiffError`].

use serde::{Deserialize, Serialize};
use thiserror::Error;
use unicode_segmentation::UnicodeSegmentation;

use crate::text::{Annotation, AnnotatedText, DiffStatus};

/// Classification of one contiguous segment of a word diff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkKind {
    /// Present in both texts.
    Unchanged,
    /// Present only in the new text.
    Added,
    /// Present only in the old text.
    Removed,
}

/// One contiguous segment produced by the word diff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffChunk {
    pub kind: ChunkKind,
    pub value: String,
}

impl DiffChunk {
    fn new(kind: ChunkKind, value: String) -> Self {
        Self { kind, value }
    }
}

/// Internal-consistency failures of the diff aligner. Both indicate a bug
/// in chunk generation or offset bookkeeping, not bad input; the diff must
/// abort rather than produce silently corrupted output.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiffError {
    /// The chunk stream's running offset did not line up with the position
    /// of the leaf being processed.
    #[error("diff does not line up with text position: stream is at {expected}, leaf starts at {found}")]
    Misaligned { expected: usize, found: usize },
    /// The chunk stream ran out while leaf text remained to be aligned.
    #[error("diff stream exhausted with text remaining at offset {offset}")]
    Exhausted { offset: usize },
}

/// Result of diffing two annotated texts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextDiff {
    /// The new text, re-annotated with added/unchanged spans.
    pub text: AnnotatedText,
    /// Whether any difference was found between the display strings.
    pub changed: bool,
}

/// Diff `old` against `new`, re-annotating `new`'s structure with the
/// result.
///
/// With no prior version (`None`, or an old text that is the empty plain
/// string) the new text is returned untouched and `changed` is false.
///
/// The returned tree is the mapper's output as-is; callers wanting the
/// canonical minimal shape normalize it themselves.
pub fn diff(old: Option<&AnnotatedText>, new: &AnnotatedText) -> Result<TextDiff, DiffError> {
    // No prior version: nothing to diff against.
    let no_prior = match old {
        None => true,
        Some(AnnotatedText::Plain(s)) => s.is_empty(),
        Some(_) => false,
    };
    let old = match old {
        Some(old) if !no_prior => old,
        _ => {
            return Ok(TextDiff {
                text: new.clone(),
                changed: false,
            })
        }
    };

    let chunks = word_diff(&old.display_string(), &new.display_string());
    let changed = chunks.len() > 1;

    let mut cursor = DiffCursor::default();
    let text = new.try_map_leaves(|leaf, annotation, plain_start, display_start| {
        cursor.align_leaf(&chunks, leaf, annotation, plain_start, display_start)
    })?;

    Ok(TextDiff { text, changed })
}

/// Word-level diff of two strings.
///
/// Both strings are segmented into word, whitespace, and punctuation
/// tokens; tokens are aligned with a longest-common-subsequence walk that
/// prefers the earliest match (and removals before additions within a
/// replacement region); adjacent tokens of the same classification coalesce
/// into one chunk. Identical inputs yield a single unchanged chunk.
pub fn word_diff(old: &str, new: &str) -> Vec<DiffChunk> {
    let old_tokens: Vec<&str> = old.split_word_bounds().collect();
    let new_tokens: Vec<&str> = new.split_word_bounds().collect();
    coalesce(&align_tokens(&old_tokens, &new_tokens), &old_tokens, &new_tokens)
}

enum TokenOp {
    Equal(usize),
    Delete(usize),
    Insert(usize),
}

/// LCS alignment over token slices, walked front to back so that common
/// tokens bind to their earliest occurrence.
fn align_tokens(left: &[&str], right: &[&str]) -> Vec<TokenOp> {
    let n = left.len();
    let m = right.len();

    // lcs[i][j] = length of the LCS of left[i..] and right[j..].
    let mut lcs = vec![vec![0usize; m + 1]; n + 1];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            lcs[i][j] = if left[i] == right[j] {
                lcs[i + 1][j + 1] + 1
            } else {
                lcs[i + 1][j].max(lcs[i][j + 1])
            };
        }
    }

    let mut ops = Vec::with_capacity(n + m);
    let (mut i, mut j) = (0, 0);
    while i < n && j < m {
        if left[i] == right[j] {
            ops.push(TokenOp::Equal(i));
            i += 1;
            j += 1;
        } else if lcs[i + 1][j] >= lcs[i][j + 1] {
            ops.push(TokenOp::Delete(i));
            i += 1;
        } else {
            ops.push(TokenOp::Insert(j));
            j += 1;
        }
    }
    ops.extend((i..n).map(TokenOp::Delete));
    ops.extend((j..m).map(TokenOp::Insert));
    ops
}

fn coalesce(ops: &[TokenOp], left: &[&str], right: &[&str]) -> Vec<DiffChunk> {
    let mut chunks = Vec::new();
    let mut unchanged = String::new();
    let mut removed = String::new();
    let mut added = String::new();

    fn flush(chunks: &mut Vec<DiffChunk>, kind: ChunkKind, value: &mut String) {
        if !value.is_empty() {
            chunks.push(DiffChunk::new(kind, std::mem::take(value)));
        }
    }

    for op in ops {
        match op {
            TokenOp::Equal(i) => {
                flush(&mut chunks, ChunkKind::Removed, &mut removed);
                flush(&mut chunks, ChunkKind::Added, &mut added);
                unchanged.push_str(left[*i]);
            }
            TokenOp::Delete(i) => {
                flush(&mut chunks, ChunkKind::Unchanged, &mut unchanged);
                removed.push_str(left[*i]);
            }
            TokenOp::Insert(j) => {
                flush(&mut chunks, ChunkKind::Unchanged, &mut unchanged);
                added.push_str(right[*j]);
            }
        }
    }
    flush(&mut chunks, ChunkKind::Unchanged, &mut unchanged);
    flush(&mut chunks, ChunkKind::Removed, &mut removed);
    flush(&mut chunks, ChunkKind::Added, &mut added);
    chunks
}

fn added_status(kind: ChunkKind) -> Option<DiffStatus> {
    match kind {
        ChunkKind::Added => Some(DiffStatus::Added),
        _ => None,
    }
}

/// Alignment state between the chunk stream and the tree walk.
///
/// `offset` is the position (in the comparison stream, which follows the
/// display string) where the current chunk starts; `chunk_offset` is how
/// far into that chunk previous leaves have already consumed. The position
/// of the next unaligned text is always `offset + chunk_offset`.
#[derive(Debug, Default)]
struct DiffCursor {
    chunk: usize,
    offset: usize,
    chunk_offset: usize,
}

impl DiffCursor {
    /// Align one leaf against the chunk stream, producing its replacement:
    /// zero or more sub-spans tagged added or unchanged.
    ///
    /// A leaf carrying a non-empty substitution is aligned against the
    /// display stream and its substitution is distributed piece by piece
    /// over the emitted sub-spans; the plain text rides on the first piece
    /// only, so nothing is duplicated when pieces are later merged or
    /// rendered. All other leaves are aligned against the plain stream.
    fn align_leaf(
        &mut self,
        chunks: &[DiffChunk],
        plain_text: &str,
        annotation: &Annotation,
        plain_start: usize,
        display_start: usize,
    ) -> Result<AnnotatedText, DiffError> {
        let substitution = annotation.substitution.as_deref().filter(|s| !s.is_empty());
        let (text, start) = match substitution {
            Some(sub) => (sub, display_start),
            None => (plain_text, plain_start),
        };
        let end = start + text.len();

        if self.offset + self.chunk_offset != start {
            return Err(DiffError::Misaligned {
                expected: self.offset + self.chunk_offset,
                found: start,
            });
        }

        let mut parts: Vec<AnnotatedText> = Vec::new();
        let mut remaining_plain = plain_text;
        let base_substitution = annotation.substitution.clone();

        // Chunks ending within this leaf. A removed chunk's length lives in
        // the old stream and takes nothing from this leaf, so it is consumed
        // regardless of the length gate.
        while self.chunk < chunks.len()
            && (chunks[self.chunk].kind == ChunkKind::Removed
                || self.offset + chunks[self.chunk].value.len() <= end)
        {
            let chunk = &chunks[self.chunk];
            if chunk.kind == ChunkKind::Removed {
                self.chunk_offset = 0;
                self.chunk += 1;
                continue;
            }
            let piece = &chunk.value[self.chunk_offset..];
            if substitution.is_some() {
                parts.push(AnnotatedText::annotated(
                    remaining_plain,
                    Annotation {
                        diff: added_status(chunk.kind),
                        substitution: Some(piece.to_string()),
                    },
                ));
                remaining_plain = "";
            } else {
                parts.push(AnnotatedText::annotated(
                    piece,
                    Annotation {
                        diff: added_status(chunk.kind),
                        substitution: base_substitution.clone(),
                    },
                ));
            }
            // The chunk began at `offset` even if earlier leaves consumed
            // part of it, so the next chunk starts a full chunk later.
            self.offset += chunk.value.len();
            self.chunk_offset = 0;
            self.chunk += 1;
        }

        // A chunk extending past this leaf: emit the leaf's remainder and
        // leave the chunk in place for the following leaves.
        if self.chunk < chunks.len() && self.offset < end {
            let piece = &text[self.offset + self.chunk_offset - start..];
            if substitution.is_some() {
                parts.push(AnnotatedText::annotated(
                    remaining_plain,
                    Annotation {
                        diff: added_status(chunks[self.chunk].kind),
                        substitution: Some(piece.to_string()),
                    },
                ));
            } else {
                parts.push(AnnotatedText::annotated(
                    piece,
                    Annotation {
                        diff: added_status(chunks[self.chunk].kind),
                        substitution: base_substitution,
                    },
                ));
            }
            self.chunk_offset = end - self.offset;
        }

        if self.chunk >= chunks.len() && self.offset < end {
            return Err(DiffError::Exhausted { offset: self.offset });
        }

        Ok(if parts.len() <= 1 {
            parts.pop().unwrap_or_else(AnnotatedText::empty)
        } else {
            AnnotatedText::Sequence(parts)
        })
    }
}
