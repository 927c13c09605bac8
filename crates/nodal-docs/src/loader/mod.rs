pub(crate) mod docx;

pub use docx::DocxLoader;
