//! Page sources: where page content comes from.
//!
//! A [`PageSource`] is either *static* (a document whose page count is known
//! up front and any page can be fetched by number) or *navigable* (a live
//! reader that only shows the current page and must be turned forward).
//! The driver treats both the same way except for resume and stop rules.

use crate::error::TranslateError;
use crate::pipeline::input;
use async_trait::async_trait;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Raw content of one page before translation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageContent {
    /// Text that can be translated directly.
    Text(String),
    /// A captured page image that needs OCR first.
    Image(PathBuf),
}

#[async_trait]
pub trait PageSource: Send {
    /// Total pages when known; `None` for live readers.
    fn page_count(&self) -> Option<usize>;

    /// Whether this source must be turned page by page.
    fn is_navigable(&self) -> bool {
        false
    }

    /// Produce the content of `page_number` (1-indexed). For navigable
    /// sources this is whatever page is currently displayed.
    async fn fetch(&mut self, page_number: usize) -> Result<PageContent, TranslateError>;

    /// Move to the next page. `false` means navigation failed.
    async fn advance(&mut self) -> bool {
        true
    }

    /// Whether the current page is the last one.
    async fn is_terminal(&mut self) -> bool {
        false
    }
}

/// Static source backed by the text layer of a PDF.
///
/// All page texts are extracted once at open time; pdfium is not
/// thread-safe, so the work runs in `spawn_blocking`.
#[derive(Debug)]
pub struct PdfTextSource {
    path: PathBuf,
    pages: Vec<String>,
}

impl PdfTextSource {
    /// Resolve `input` (path or URL) and extract every page's text.
    ///
    /// Fails with [`TranslateError::EmptyDocument`] when the document has
    /// no pages at all.
    pub async fn open(
        input_str: &str,
        password: Option<&str>,
        download_timeout_secs: u64,
    ) -> Result<Self, TranslateError> {
        let resolved = input::resolve_input(input_str, download_timeout_secs).await?;
        let path = resolved.path().to_path_buf();
        let pwd = password.map(str::to_string);

        let blocking_path = path.clone();
        let pages = tokio::task::spawn_blocking(move || {
            extract_texts_blocking(&blocking_path, pwd.as_deref())
        })
        .await
        .map_err(|e| TranslateError::Internal(format!("Extraction task panicked: {}", e)))??;

        // `resolved` (and any temp download) can go now; the texts are in memory.
        drop(resolved);
        Self::from_pages(PathBuf::from(input_str), pages)
    }

    /// Build a source from already-extracted page texts.
    pub fn from_pages(path: PathBuf, pages: Vec<String>) -> Result<Self, TranslateError> {
        if pages.is_empty() {
            return Err(TranslateError::EmptyDocument { path });
        }
        info!("{}: {} pages", path.display(), pages.len());
        Ok(Self { path, pages })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl PageSource for PdfTextSource {
    fn page_count(&self) -> Option<usize> {
        Some(self.pages.len())
    }

    async fn fetch(&mut self, page_number: usize) -> Result<PageContent, TranslateError> {
        page_number
            .checked_sub(1)
            .and_then(|idx| self.pages.get(idx))
            .map(|text| PageContent::Text(text.clone()))
            .ok_or_else(|| TranslateError::PageUnavailable {
                page: page_number,
                detail: format!("document has {} pages", self.pages.len()),
            })
    }
}

/// Bind to pdfium: `PDFIUM_LIB_PATH` first, then the working directory,
/// then the system library path.
pub fn bind_pdfium() -> Result<Pdfium, TranslateError> {
    let bindings = match std::env::var("PDFIUM_LIB_PATH") {
        Ok(p) if !p.is_empty() => Pdfium::bind_to_library(p),
        _ => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library()),
    }
    .map_err(|e| TranslateError::PdfiumBindingFailed(format!("{:?}", e)))?;
    Ok(Pdfium::new(bindings))
}

fn extract_texts_blocking(
    pdf_path: &Path,
    password: Option<&str>,
) -> Result<Vec<String>, TranslateError> {
    let pdfium = bind_pdfium()?;

    let document = pdfium.load_pdf_from_file(pdf_path, password).map_err(|e| {
        let err_str = format!("{:?}", e);
        if err_str.to_lowercase().contains("password") {
            if password.is_some() {
                TranslateError::WrongPassword {
                    path: pdf_path.to_path_buf(),
                }
            } else {
                TranslateError::PasswordRequired {
                    path: pdf_path.to_path_buf(),
                }
            }
        } else {
            TranslateError::CorruptPdf {
                path: pdf_path.to_path_buf(),
                detail: err_str,
            }
        }
    })?;

    let mut texts = Vec::new();
    for (idx, page) in document.pages().iter().enumerate() {
        // A page without a text layer reads as blank and is skipped downstream.
        let text = page.text().map(|t| t.all()).unwrap_or_default();
        debug!("Extracted page {} → {} chars", idx + 1, text.chars().count());
        texts.push(text);
    }
    Ok(texts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_page_list_is_empty_document() {
        let err = PdfTextSource::from_pages(PathBuf::from("blank.pdf"), vec![]).unwrap_err();
        assert!(err.to_string().contains("does not contain any pages"));
    }

    #[tokio::test]
    async fn fetch_is_one_indexed() {
        let mut src = PdfTextSource::from_pages(
            PathBuf::from("book.pdf"),
            vec!["uno".into(), "due".into()],
        )
        .unwrap();

        assert_eq!(src.page_count(), Some(2));
        assert!(!src.is_navigable());
        assert_eq!(src.fetch(1).await.unwrap(), PageContent::Text("uno".into()));
        assert_eq!(src.fetch(2).await.unwrap(), PageContent::Text("due".into()));
        assert!(matches!(
            src.fetch(0).await,
            Err(TranslateError::PageUnavailable { page: 0, .. })
        ));
        assert!(matches!(
            src.fetch(3).await,
            Err(TranslateError::PageUnavailable { page: 3, .. })
        ));
    }
}
