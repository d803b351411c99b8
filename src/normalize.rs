//! Canonicalization of annotated text trees.
//!
//! `normalize` produces a minimal representative of a tree: nested
//! sequences are flattened, adjacent mergeable leaves are merged, vacuous
//! wrappers are dropped, and single-element sequences collapse to their
//! element. Normalization never changes the plain or display string of a
//! tree, and it is idempotent.

use crate::text::AnnotatedText;

impl AnnotatedText {
    /// Canonical minimal form of this tree.
    ///
    /// - `Plain` is untouched.
    /// - `Sequence`: children are normalized and flattened; each element is
    ///   merged into the previous one when the merge rules allow; an empty
    ///   sequence becomes the empty string and a single-element sequence
    ///   collapses to that element.
    /// - `Scoped`: dropped when the scope name is empty or the normalized
    ///   inner text is the empty string.
    /// - `Annotated`: a leaf needs **more than one** set metadata field to
    ///   keep its wrapper; with zero or one it degrades to `Plain`,
    ///   discarding the field. A leaf carrying only a substitution thus
    ///   loses it (long-standing quirk, kept for compatibility).
    pub fn normalize(&self) -> AnnotatedText {
        match self {
            AnnotatedText::Plain(_) => self.clone(),
            AnnotatedText::Sequence(items) => normalize_sequence(items),
            AnnotatedText::Scoped { scope, text } => {
                let inner = text.normalize();
                if scope.is_empty() || matches!(&inner, AnnotatedText::Plain(s) if s.is_empty()) {
                    inner
                } else {
                    AnnotatedText::Scoped {
                        scope: scope.clone(),
                        text: Box::new(inner),
                    }
                }
            }
            AnnotatedText::Annotated { text, .. } => {
                let annotation = self.annotation().unwrap_or_default();
                if annotation.field_count() > 1 {
                    self.clone()
                } else {
                    AnnotatedText::Plain(text.clone())
                }
            }
        }
    }
}

fn normalize_sequence(items: &[AnnotatedText]) -> AnnotatedText {
    let mut results: Vec<AnnotatedText> = Vec::with_capacity(items.len());
    for item in items {
        match item.normalize() {
            AnnotatedText::Sequence(inner) => {
                for element in inner {
                    merge_or_append(&mut results, element);
                }
            }
            element => merge_or_append(&mut results, element),
        }
    }
    if results.len() <= 1 {
        return results.pop().unwrap_or_else(AnnotatedText::empty);
    }
    AnnotatedText::Sequence(results)
}

/// Merge `next` into the last accumulated element when the rules allow,
/// otherwise append it.
fn merge_or_append(results: &mut Vec<AnnotatedText>, next: AnnotatedText) {
    if let Some(last) = results.last_mut() {
        if let Some(merged) = try_merge(last, &next) {
            *last = merged;
            return;
        }
    }
    results.push(next);
}

/// The pure merge decision for two adjacent normalized elements.
///
/// - Two `Plain` nodes concatenate.
/// - Two `Scoped` nodes with the same scope merge into one scope over the
///   normalized concatenation of their inner texts.
/// - Two `Annotated` leaves merge when their annotations are compatible
///   (see [`crate::Annotation::mergeable_with`]); text concatenates and the
///   surviving substitution is the first non-empty one.
fn try_merge(a: &AnnotatedText, b: &AnnotatedText) -> Option<AnnotatedText> {
    match (a, b) {
        (AnnotatedText::Plain(x), AnnotatedText::Plain(y)) => {
            Some(AnnotatedText::Plain(format!("{x}{y}")))
        }
        (
            AnnotatedText::Scoped { scope: sa, text: ta },
            AnnotatedText::Scoped { scope: sb, text: tb },
        ) if sa == sb => {
            let joined =
                AnnotatedText::Sequence(vec![ta.as_ref().clone(), tb.as_ref().clone()]).normalize();
            Some(AnnotatedText::Scoped {
                scope: sa.clone(),
                text: Box::new(joined),
            })
        }
        (
            AnnotatedText::Annotated { text: xa, .. },
            AnnotatedText::Annotated { text: xb, .. },
        ) => {
            let ann_a = a.annotation().unwrap_or_default();
            let ann_b = b.annotation().unwrap_or_default();
            if !ann_a.mergeable_with(&ann_b) {
                return None;
            }
            Some(AnnotatedText::Annotated {
                text: format!("{xa}{xb}"),
                diff: ann_a.diff,
                substitution: pick_substitution(ann_a.substitution, ann_b.substitution),
            })
        }
        _ => None,
    }
}

/// An empty substitution passes through silently: the first non-empty side
/// wins, otherwise the second side (which may itself be empty or absent).
fn pick_substitution(a: Option<String>, b: Option<String>) -> Option<String> {
    match a {
        Some(s) if !s.is_empty() => Some(s),
        _ => b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::DiffStatus;

    fn seq(items: Vec<AnnotatedText>) -> AnnotatedText {
        AnnotatedText::Sequence(items)
    }

    #[test]
    fn plain_and_simple_sequences() {
        assert_eq!(
            AnnotatedText::from("foo").normalize(),
            AnnotatedText::from("foo")
        );
        assert_eq!(
            seq(vec!["foo".into(), "bar".into()]).normalize(),
            AnnotatedText::from("foobar")
        );
        assert_eq!(seq(vec![]).normalize(), AnnotatedText::empty());
    }

    #[test]
    fn nested_sequences_flatten() {
        let t = seq(vec![
            seq(vec!["a".into(), seq(vec!["b".into(), "c".into()])]),
            "d".into(),
        ]);
        assert_eq!(t.normalize(), AnnotatedText::from("abcd"));
    }

    #[test]
    fn scoped_neighbors_keep_their_boundaries() {
        // [{scope:"aa", text:"foo"}, "bar"] stays a two-element sequence.
        let t = seq(vec![AnnotatedText::scoped("aa", "foo".into()), "bar".into()]);
        assert_eq!(t.normalize(), t);
    }

    #[test]
    fn scoped_inner_sequences_collapse() {
        let t = seq(vec![
            AnnotatedText::scoped("aa", seq(vec!["foo".into(), "!!".into()])),
            "bar".into(),
        ]);
        assert_eq!(
            t.normalize(),
            seq(vec![AnnotatedText::scoped("aa", "foo!!".into()), "bar".into()])
        );
    }

    #[test]
    fn equal_scopes_merge_and_unwrap() {
        let t = seq(vec![
            AnnotatedText::scoped("aa", seq(vec!["foo".into(), "!!".into()])),
            AnnotatedText::scoped("aa", seq(vec!["bar".into()])),
        ]);
        assert_eq!(
            t.normalize(),
            AnnotatedText::scoped("aa", "foo!!bar".into())
        );
    }

    #[test]
    fn empty_scope_is_transparent() {
        let t = seq(vec![
            AnnotatedText::scoped(
                "aa",
                AnnotatedText::scoped("", seq(vec!["foo".into(), "!!".into()])),
            ),
            AnnotatedText::scoped("aa", seq(vec!["bar".into()])),
        ]);
        assert_eq!(
            t.normalize(),
            AnnotatedText::scoped("aa", "foo!!bar".into())
        );
    }

    #[test]
    fn scope_over_empty_text_is_dropped() {
        let t = AnnotatedText::scoped("aa", "".into());
        assert_eq!(t.normalize(), AnnotatedText::empty());
    }

    #[test]
    fn leaf_with_two_fields_survives() {
        let t = seq(vec![
            AnnotatedText::Annotated {
                text: "foo".to_string(),
                diff: Some(DiffStatus::Added),
                substitution: Some("FOO!!".to_string()),
            },
            "bar".into(),
        ]);
        assert_eq!(t.normalize(), t);
    }

    #[test]
    fn single_field_leaf_collapses_to_plain() {
        // One set field is not enough to keep the wrapper; a lone
        // substitution is discarded by normalization.
        let only_diff = AnnotatedText::Annotated {
            text: "foo".to_string(),
            diff: Some(DiffStatus::Added),
            substitution: None,
        };
        assert_eq!(only_diff.normalize(), AnnotatedText::from("foo"));

        let only_sub = AnnotatedText::Annotated {
            text: "foo".to_string(),
            diff: None,
            substitution: Some("FOO".to_string()),
        };
        assert_eq!(only_sub.normalize(), AnnotatedText::from("foo"));
    }

    #[test]
    fn compatible_annotated_leaves_merge() {
        let t = seq(vec![
            AnnotatedText::Annotated {
                text: "aa".to_string(),
                diff: Some(DiffStatus::Added),
                substitution: Some("AA".to_string()),
            },
            AnnotatedText::Annotated {
                text: "bb".to_string(),
                diff: Some(DiffStatus::Added),
                substitution: Some(String::new()),
            },
        ]);
        assert_eq!(
            t.normalize(),
            AnnotatedText::Annotated {
                text: "aabb".to_string(),
                diff: Some(DiffStatus::Added),
                substitution: Some("AA".to_string()),
            }
        );
    }

    #[test]
    fn single_element_sequence_unwraps() {
        let t = seq(vec![AnnotatedText::scoped("aa", "foo".into())]);
        assert_eq!(t.normalize(), AnnotatedText::scoped("aa", "foo".into()));
    }

    #[test]
    fn normalize_is_idempotent_and_preserves_projections() {
        let fixtures = [
            seq(vec![
                AnnotatedText::scoped("aa", AnnotatedText::scoped("", seq(vec!["x".into()]))),
                seq(vec!["y".into(), "z".into()]),
                AnnotatedText::Annotated {
                    text: "q".to_string(),
                    diff: Some(DiffStatus::Added),
                    substitution: Some("Q".to_string()),
                },
            ]),
            seq(vec![]),
            AnnotatedText::scoped("", "foo".into()),
        ];
        for t in fixtures {
            let once = t.normalize();
            assert_eq!(once.normalize(), once);
            assert_eq!(once.plain_string(), t.plain_string());
            assert_eq!(once.display_string(), t.display_string());
        }
    }
}
