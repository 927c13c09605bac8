#[derive(Debug, Clone, Default)]
pub struct DocumentMetadata {
    pub source: String,
    pub content_type: String,
    /// Core document properties (`title`, `creator`, ...) in file order.
    pub properties: Vec<(String, String)>,
}

#[derive(Debug, Clone, Default)]
pub struct Document {
    pub paragraphs: Vec<String>,
    pub metadata: DocumentMetadata,
}

impl Document {
    /// Paragraph text joined with newlines.
    #[must_use]
    pub fn text(&self) -> String {
        self.paragraphs.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_joins_paragraphs() {
        let doc = Document {
            paragraphs: vec!["one".into(), "two".into()],
            metadata: DocumentMetadata::default(),
        };
        assert_eq!(doc.text(), "one\ntwo");
    }

    #[test]
    fn text_empty_document() {
        assert!(Document::default().text().is_empty());
    }
}
