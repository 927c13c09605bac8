//! DOCX loading and XML rendering for prompt attachments.

pub mod error;
pub mod loader;
pub mod types;
pub mod xml;

pub use error::DocumentError;
pub use loader::DocxLoader;
pub use types::{Document, DocumentMetadata};
pub use xml::{convert_docx_to_xml, render_xml};

/// Default maximum file size: 50 MiB.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 50 * 1024 * 1024;

pub trait DocumentLoader: Send + Sync {
    fn load(
        &self,
        path: &std::path::Path,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Vec<Document>, DocumentError>> + Send + '_>,
    >;

    fn supported_extensions(&self) -> &[&str];
}
