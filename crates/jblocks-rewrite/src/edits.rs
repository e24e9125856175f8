use jblocks_source::Span;

/// One text splice: `span` in the old text is replaced by
/// `replacement`. An empty span is a pure insertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TextEdit {
    pub span: Span,
    pub replacement: String,
}

impl TextEdit {
    pub(crate) fn replace(span: Span, replacement: impl Into<String>) -> Self {
        Self {
            span,
            replacement: replacement.into(),
        }
    }

    pub(crate) fn insert(offset: usize, text: impl Into<String>) -> Self {
        Self {
            span: Span::from_bounds(offset, offset),
            replacement: text.into(),
        }
    }

    pub(crate) fn delete(span: Span) -> Self {
        Self {
            span,
            replacement: String::new(),
        }
    }
}

/// Apply non-overlapping edits. Splicing back-to-front keeps every
/// earlier offset valid, so bytes outside the edited spans come
/// through identical to the input.
pub(crate) fn apply_edits(text: &str, mut edits: Vec<TextEdit>) -> String {
    edits.sort_by_key(|edit| std::cmp::Reverse(edit.span.start()));
    let mut result = text.to_string();
    for edit in edits {
        result.replace_range(edit.span.start_usize()..edit.span.end_usize(), &edit.replacement);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edits_apply_back_to_front() {
        let text = "abc def ghi";
        let edits = vec![
            TextEdit::replace(Span::from_bounds(0, 3), "ABC"),
            TextEdit::delete(Span::from_bounds(3, 7)),
            TextEdit::insert(11, "!"),
        ];
        assert_eq!(apply_edits(text, edits), "ABC ghi!");
    }

    #[test]
    fn untouched_bytes_are_identical() {
        let text = "left MIDDLE right";
        let edits = vec![TextEdit::replace(Span::from_bounds(5, 11), "mid")];
        let result = apply_edits(text, edits);
        assert!(result.starts_with("left "));
        assert!(result.ends_with(" right"));
    }
}
