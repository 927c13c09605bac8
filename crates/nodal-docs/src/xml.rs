use std::fmt::Write as _;
use std::path::Path;

use quick_xml::escape::escape;

use crate::{Document, DocumentError, DocumentLoader, DocxLoader};

/// Render a loaded document as a flat XML string.
///
/// Empty properties and empty paragraphs are skipped. Property names become element
/// names; values and paragraph text are escaped.
#[must_use]
pub fn render_xml(doc: &Document) -> String {
    let mut xml = String::from("<?xml version='1.0' encoding='UTF-8'?>\n<document>\n");

    xml.push_str("<metadata>\n");
    for (key, value) in &doc.metadata.properties {
        if !value.is_empty() {
            let _ = writeln!(xml, "<{key}>{}</{key}>", escape(value.as_str()));
        }
    }
    xml.push_str("</metadata>\n");

    xml.push_str("<content>\n");
    for paragraph in &doc.paragraphs {
        if !paragraph.is_empty() {
            let _ = writeln!(xml, "<paragraph>{}</paragraph>", escape(paragraph.as_str()));
        }
    }
    xml.push_str("</content>\n");
    xml.push_str("</document>");
    xml
}

/// Load a `.docx` file and render it with [`render_xml`].
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not a valid DOCX archive.
pub async fn convert_docx_to_xml(path: &Path) -> Result<String, DocumentError> {
    let docs = DocxLoader::default().load(path).await.inspect_err(|e| {
        tracing::error!(path = %path.display(), "error converting DOCX to XML: {e}");
    })?;
    Ok(docs.iter().map(render_xml).collect::<Vec<_>>().join("\n"))
}
