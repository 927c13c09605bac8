//! Turning URL variables into multimodal content parts.

use std::path::{Path, PathBuf};

use base64::{Engine, engine::general_purpose::STANDARD};

use crate::error::{LlmError, Result};
use crate::provider::ContentPart;

#[must_use]
pub fn is_external_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

/// Resolve an attachment path: absolute paths as-is, relative ones under `root`.
///
/// # Errors
///
/// Returns [`LlmError::Io`] with `NotFound` when the file does not exist.
pub fn resolve_file_path(root: &Path, s: &str) -> Result<PathBuf> {
    let candidate = Path::new(s);
    let path = if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        root.join(candidate)
    };
    if !path.is_file() {
        return Err(LlmError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("attachment not found: {}", path.display()),
        )));
    }
    Ok(path)
}

/// Read a file into a `data:` URL with a MIME type guessed from its extension.
///
/// # Errors
///
/// Returns an error if the file cannot be read.
pub async fn encode_file_to_data_url(path: &Path) -> Result<String> {
    let bytes = tokio::fs::read(path).await?;
    let mime = mime_guess::from_path(path).first_or_octet_stream();
    Ok(format!("data:{mime};base64,{}", STANDARD.encode(bytes)))
}

fn is_docx(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("docx"))
}

/// Build the content part for one attachment value.
///
/// External and `data:` URLs pass through. Anything else is read from disk; DOCX
/// files are converted to XML first.
///
/// # Errors
///
/// Returns an error if a local file is missing, unreadable or not a valid DOCX.
pub async fn attachment_part(root: &Path, value: &str) -> Result<ContentPart> {
    if is_external_url(value) || value.starts_with("data:") {
        return Ok(ContentPart::image_url(value));
    }

    let path = resolve_file_path(root, value)
        .inspect_err(|e| tracing::error!("error reading file {value}: {e}"))?;
    tracing::info!(path = %path.display(), "reading attachment");

    let data_url = if is_docx(&path) {
        let xml = nodal_docs::convert_docx_to_xml(&path)
            .await
            .inspect_err(|e| tracing::error!("error reading file {value}: {e}"))?;
        format!("data:text/xml;base64,{}", STANDARD.encode(xml.as_bytes()))
    } else {
        encode_file_to_data_url(&path)
            .await
            .inspect_err(|e| tracing::error!("error reading file {value}: {e}"))?
    };
    Ok(ContentPart::image_url(data_url))
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use super::*;

    fn write_docx(path: &Path, paragraph: &str) {
        let file = std::fs::File::create(path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        let options = zip::write::SimpleFileOptions::default();
        zip.start_file("word/document.xml", options).unwrap();
        write!(
            zip,
            r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body><w:p><w:r><w:t>{paragraph}</w:t></w:r></w:p></w:body></w:document>"#
        )
        .unwrap();
        zip.finish().unwrap();
    }

    fn url_of(part: ContentPart) -> String {
        match part {
            ContentPart::ImageUrl { image_url } => image_url.url,
            ContentPart::Text { .. } => panic!("expected image part"),
        }
    }

    #[test]
    fn external_url_detection() {
        assert!(is_external_url("https://x.test/a.png"));
        assert!(is_external_url("http://x.test"));
        assert!(!is_external_url("ftp://x.test"));
        assert!(!is_external_url("data:image/png;base64,AA"));
        assert!(!is_external_url("docs/a.pdf"));
    }

    #[test]
    fn relative_paths_resolve_under_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "x").unwrap();
        assert_eq!(
            resolve_file_path(dir.path(), "a.txt").unwrap(),
            dir.path().join("a.txt")
        );
        let abs = dir.path().join("a.txt");
        let other = tempfile::tempdir().unwrap();
        assert_eq!(
            resolve_file_path(other.path(), abs.to_str().unwrap()).unwrap(),
            abs
        );
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = resolve_file_path(dir.path(), "nope.png").unwrap_err();
        assert!(matches!(err, LlmError::Io(ref e) if e.kind() == std::io::ErrorKind::NotFound));
        assert!(!err.is_retryable());
        assert_eq!(err.kind(), "io");
    }

    #[tokio::test]
    async fn data_url_guesses_mime() {
        let dir = tempfile::tempdir().unwrap();
        let png = dir.path().join("pixel.png");
        std::fs::write(&png, [1u8, 2, 3]).unwrap();
        assert_eq!(
            encode_file_to_data_url(&png).await.unwrap(),
            "data:image/png;base64,AQID"
        );

        let unknown = dir.path().join("blob.zzzunknown");
        std::fs::write(&unknown, b"hi").unwrap();
        assert_eq!(
            encode_file_to_data_url(&unknown).await.unwrap(),
            "data:application/octet-stream;base64,aGk="
        );
    }

    #[tokio::test]
    async fn urls_pass_through() {
        let root = Path::new("/nonexistent");
        let part = attachment_part(root, "https://x.test/a.png").await.unwrap();
        assert_eq!(url_of(part), "https://x.test/a.png");
        let part = attachment_part(root, "data:text/plain;base64,aGk=").await.unwrap();
        assert_eq!(url_of(part), "data:text/plain;base64,aGk=");
    }

    #[tokio::test]
    async fn docx_is_sent_as_xml() {
        let dir = tempfile::tempdir().unwrap();
        write_docx(&dir.path().join("brief.docx"), "Quarterly plan");

        let url = url_of(attachment_part(dir.path(), "brief.docx").await.unwrap());
        let encoded = url.strip_prefix("data:text/xml;base64,").unwrap();
        let xml = String::from_utf8(STANDARD.decode(encoded).unwrap()).unwrap();
        assert!(xml.starts_with("<?xml version='1.0' encoding='UTF-8'?>"));
        assert!(xml.contains("<paragraph>Quarterly plan</paragraph>"));
    }

    #[tokio::test]
    async fn missing_attachment_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(attachment_part(dir.path(), "gone.pdf").await.is_err());
    }
}
