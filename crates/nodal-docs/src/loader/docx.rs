use std::io::Read;
use std::path::Path;
use std::pin::Pin;

use quick_xml::Reader;
use quick_xml::events::Event;
use zip::ZipArchive;

use super::super::{
    DEFAULT_MAX_FILE_SIZE, Document, DocumentError, DocumentLoader, DocumentMetadata,
};

const DOCUMENT_PART: &str = "word/document.xml";
const CORE_PROPERTIES_PART: &str = "docProps/core.xml";
const DOCX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

pub struct DocxLoader {
    pub max_file_size: u64,
}

impl Default for DocxLoader {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

impl DocumentLoader for DocxLoader {
    fn load(
        &self,
        path: &Path,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<Vec<Document>, DocumentError>> + Send + '_>>
    {
        let path = path.to_path_buf();
        let max_size = self.max_file_size;
        Box::pin(async move {
            let path = std::fs::canonicalize(&path)?;

            let ext = path
                .extension()
                .and_then(|e| e.to_str())
                .map(str::to_ascii_lowercase)
                .unwrap_or_default();
            if ext != "docx" {
                return Err(DocumentError::UnsupportedFormat(path.display().to_string()));
            }

            let meta = tokio::fs::metadata(&path).await?;
            if meta.len() > max_size {
                return Err(DocumentError::FileTooLarge(meta.len()));
            }

            let source = path.display().to_string();
            let (properties, paragraphs) = tokio::task::spawn_blocking(move || read_docx(&path))
                .await
                .map_err(|e| DocumentError::Io(std::io::Error::other(e)))??;

            Ok(vec![Document {
                paragraphs,
                metadata: DocumentMetadata {
                    source,
                    content_type: DOCX_CONTENT_TYPE.to_owned(),
                    properties,
                },
            }])
        })
    }

    fn supported_extensions(&self) -> &[&str] {
        &["docx"]
    }
}

type DocxParts = (Vec<(String, String)>, Vec<String>);

fn read_docx(path: &Path) -> Result<DocxParts, DocumentError> {
    let file = std::fs::File::open(path)?;
    let mut archive = ZipArchive::new(file)?;

    let body = read_part(&mut archive, DOCUMENT_PART)?.ok_or(DocumentError::MissingPart(DOCUMENT_PART))?;
    let paragraphs = parse_paragraphs(&body)?;

    let properties = match read_part(&mut archive, CORE_PROPERTIES_PART)? {
        Some(core) => parse_core_properties(&core)?,
        None => Vec::new(),
    };

    Ok((properties, paragraphs))
}

fn read_part<R: Read + std::io::Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
) -> Result<Option<String>, DocumentError> {
    match archive.by_name(name) {
        Ok(mut part) => {
            let mut content = String::new();
            part.read_to_string(&mut content)?;
            Ok(Some(content))
        }
        Err(zip::result::ZipError::FileNotFound) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Extract paragraph text from `word/document.xml`.
///
/// Only text inside runs counts: `w:t` contributes its text, `w:tab` a tab and
/// `w:br`/`w:cr` a newline. Tab stops declared in paragraph properties are ignored.
/// Paragraphs nested in text boxes are emitted before the paragraph holding them.
pub(crate) fn parse_paragraphs(xml: &str) -> Result<Vec<String>, DocumentError> {
    let mut reader = Reader::from_str(xml);
    let mut paragraphs = Vec::new();
    let mut open: Vec<String> = Vec::new();
    let mut run_depth = 0usize;
    let mut in_text = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"p" => open.push(String::new()),
                b"r" => run_depth += 1,
                b"t" if run_depth > 0 => in_text = true,
                _ => {}
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                b"p" => paragraphs.push(String::new()),
                b"tab" if run_depth > 0 => {
                    if let Some(p) = open.last_mut() {
                        p.push('\t');
                    }
                }
                b"br" | b"cr" if run_depth > 0 => {
                    if let Some(p) = open.last_mut() {
                        p.push('\n');
                    }
                }
                _ => {}
            },
            Event::Text(t) if in_text => {
                let text = t.unescape()?;
                if let Some(p) = open.last_mut() {
                    p.push_str(&text);
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"r" => run_depth = run_depth.saturating_sub(1),
                b"p" => {
                    if let Some(p) = open.pop() {
                        paragraphs.push(p);
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(paragraphs)
}

/// Extract `(name, value)` pairs from `docProps/core.xml`, keyed by local element name.
pub(crate) fn parse_core_properties(xml: &str) -> Result<Vec<(String, String)>, DocumentError> {
    let mut reader = Reader::from_str(xml);
    let mut properties = Vec::new();
    let mut depth = 0usize;
    let mut open: Option<(String, String)> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                depth += 1;
                // depth 1 is <cp:coreProperties>
                if depth == 2 {
                    let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                    open = Some((name, String::new()));
                }
            }
            Event::Text(t) => {
                if let Some((_, value)) = open.as_mut() {
                    value.push_str(&t.unescape()?);
                }
            }
            Event::End(_) => {
                if depth == 2
                    && let Some((name, value)) = open.take()
                {
                    properties.push((name, value.trim().to_owned()));
                }
                depth = depth.saturating_sub(1);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(properties)
}

#[cfg(test)]
pub(crate) mod tests {
    use std::io::Write;

    use zip::write::SimpleFileOptions;

    use super::*;

    pub(crate) const BODY: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:body>
    <w:p><w:pPr><w:tabs><w:tab w:val="left" w:pos="720"/></w:tabs></w:pPr><w:r><w:t>Quarterly report</w:t></w:r></w:p>
    <w:p/>
    <w:p><w:r><w:t xml:space="preserve">Revenue </w:t></w:r><w:r><w:t>&amp; costs</w:t><w:tab/><w:t>up</w:t></w:r></w:p>
    <w:p><w:r><w:t>line one</w:t><w:br/><w:t>line two</w:t></w:r></w:p>
  </w:body>
</w:document>"#;

    pub(crate) const CORE: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/">
  <dc:title>Q3 Report</dc:title>
  <dc:subject></dc:subject>
  <dc:creator>Finance Team</dc:creator>
  <cp:lastModifiedBy>Finance Team</cp:lastModifiedBy>
</cp:coreProperties>"#;

    pub(crate) fn write_docx(path: &Path, body: &str, core: Option<&str>) {
        let file = std::fs::File::create(path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        let options = SimpleFileOptions::default();
        zip.start_file(DOCUMENT_PART, options).unwrap();
        zip.write_all(body.as_bytes()).unwrap();
        if let Some(core) = core {
            zip.start_file(CORE_PROPERTIES_PART, options).unwrap();
            zip.write_all(core.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
    }

    #[test]
    fn parse_paragraphs_extracts_run_text() {
        let paragraphs = parse_paragraphs(BODY).unwrap();
        assert_eq!(
            paragraphs,
            vec![
                "Quarterly report".to_owned(),
                String::new(),
                "Revenue & costs\tup".to_owned(),
                "line one\nline two".to_owned(),
            ]
        );
    }

    #[test]
    fn parse_paragraphs_ignores_tab_stops() {
        let paragraphs = parse_paragraphs(BODY).unwrap();
        assert!(!paragraphs[0].contains('\t'));
    }

    #[test]
    fn text_box_paragraphs_keep_surrounding_text() {
        let xml = r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main" xmlns:wps="http://schemas.microsoft.com/office/word/2010/wordprocessingShape"><w:body>
<w:p><w:r><w:t xml:space="preserve">Before box </w:t></w:r><w:r><w:drawing><wps:txbx><w:txbxContent><w:p><w:r><w:t>inside</w:t></w:r></w:p></w:txbxContent></wps:txbx></w:drawing><w:t>after box</w:t></w:r></w:p>
<w:p><w:r><w:t>next</w:t></w:r></w:p>
</w:body></w:document>"#;
        let paragraphs = parse_paragraphs(xml).unwrap();
        assert_eq!(
            paragraphs,
            vec![
                "inside".to_owned(),
                "Before box after box".to_owned(),
                "next".to_owned(),
            ]
        );
    }

    #[test]
    fn parse_core_properties_keeps_order_and_empty_values() {
        let props = parse_core_properties(CORE).unwrap();
        let names: Vec<&str> = props.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(names, ["title", "subject", "creator", "lastModifiedBy"]);
        assert_eq!(props[0].1, "Q3 Report");
        assert!(props[1].1.is_empty());
    }

    #[tokio::test]
    async fn load_docx_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("report.docx");
        write_docx(&file, BODY, Some(CORE));

        let docs = DocxLoader::default().load(&file).await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].paragraphs.len(), 4);
        assert_eq!(docs[0].metadata.content_type, DOCX_CONTENT_TYPE);
        assert_eq!(docs[0].metadata.properties.len(), 4);
    }

    #[tokio::test]
    async fn load_docx_without_core_properties() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("bare.docx");
        write_docx(&file, BODY, None);

        let docs = DocxLoader::default().load(&file).await.unwrap();
        assert!(docs[0].metadata.properties.is_empty());
    }

    #[tokio::test]
    async fn load_archive_without_body_fails() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("empty.docx");
        let zip = zip::ZipWriter::new(std::fs::File::create(&file).unwrap());
        zip.finish().unwrap();

        let result = DocxLoader::default().load(&file).await;
        assert!(matches!(result, Err(DocumentError::MissingPart(DOCUMENT_PART))));
    }

    #[tokio::test]
    async fn load_non_zip_fails() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("fake.docx");
        std::fs::write(&file, "not a zip").unwrap();

        let result = DocxLoader::default().load(&file).await;
        assert!(matches!(result, Err(DocumentError::Archive(_))));
    }

    #[tokio::test]
    async fn load_wrong_extension_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("notes.txt");
        std::fs::write(&file, "plain").unwrap();

        let result = DocxLoader::default().load(&file).await;
        assert!(matches!(result, Err(DocumentError::UnsupportedFormat(_))));
    }

    #[tokio::test]
    async fn load_nonexistent_file() {
        let result = DocxLoader::default()
            .load(Path::new("/nonexistent/file.docx"))
            .await;
        assert!(matches!(result, Err(DocumentError::Io(_))));
    }

    #[tokio::test]
    async fn file_too_large_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("big.docx");
        write_docx(&file, BODY, None);

        let loader = DocxLoader { max_file_size: 0 };
        let result = loader.load(&file).await;
        assert!(matches!(result, Err(DocumentError::FileTooLarge(_))));
    }

    #[test]
    fn supported_extensions_list() {
        assert_eq!(DocxLoader::default().supported_extensions(), &["docx"]);
    }
}
