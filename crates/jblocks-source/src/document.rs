use serde::Serialize;

use crate::LineIndex;

/// The authoritative text of the program being edited.
///
/// Replaced wholesale on every committed edit; the version counter
/// increments on each commit so downstream consumers can detect stale
/// snapshots.
#[derive(Clone, Debug, Serialize)]
pub struct TextDocument {
    uri: String,
    text: String,
    version: u64,
    #[serde(skip)]
    index: LineIndex,
}

impl TextDocument {
    #[must_use]
    pub fn new(uri: String, text: String) -> Self {
        let index = LineIndex::new(&text);
        Self {
            uri,
            text,
            version: 0,
            index,
        }
    }

    #[must_use]
    pub fn uri(&self) -> &str {
        &self.uri
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }

    #[must_use]
    pub fn line_index(&self) -> &LineIndex {
        &self.index
    }

    /// Commit a full replacement of the document text.
    pub fn commit(&mut self, new_text: String) {
        self.text = new_text;
        self.index = LineIndex::new(&self.text);
        self.version += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commit_bumps_version_and_reindexes() {
        let mut doc = TextDocument::new("file:///Demo.java".to_string(), "a\nb".to_string());
        assert_eq!(doc.version(), 0);
        assert_eq!(doc.line_index().line_count(), 2);

        doc.commit("a\nb\nc\n".to_string());
        assert_eq!(doc.version(), 1);
        assert_eq!(doc.text(), "a\nb\nc\n");
        assert_eq!(doc.line_index().line_count(), 4);
    }
}
