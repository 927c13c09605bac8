#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("file too large: {0} bytes")]
    FileTooLarge(u64),

    #[error("archive error: {0}")]
    Archive(String),

    #[error("XML error: {0}")]
    Xml(String),

    #[error("missing document part: {0}")]
    MissingPart(&'static str),
}

impl From<zip::result::ZipError> for DocumentError {
    fn from(e: zip::result::ZipError) -> Self {
        match e {
            zip::result::ZipError::Io(io) => Self::Io(io),
            other => Self::Archive(other.to_string()),
        }
    }
}

impl From<quick_xml::Error> for DocumentError {
    fn from(e: quick_xml::Error) -> Self {
        Self::Xml(e.to_string())
    }
}
