//! Pipeline stages for page-by-page translation.
//!
//! Each submodule implements one step and is testable on its own.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ source ──▶ encode ──▶ llm ──▶ postprocess
//! (URL/path) (pdfium /  (image →   (model,  (cleanup)
//!            kindle)    base64)    retry)
//! ```
//!
//! 1. [`input`]: canonicalise the user-supplied path or URL to a local file
//! 2. [`source`]: the [`source::PageSource`] seam and the PDF text source;
//!    [`kindle`] adds the live reader behind the `kindle` feature
//! 3. [`encode`]: wrap a captured screenshot for a vision request
//! 4. [`llm`]: the [`llm::ModelClient`] seam and its edgequake-llm adapter;
//!    [`retry`] holds the backoff policy
//! 5. [`postprocess`]: deterministic cleanup of model replies

pub mod encode;
pub mod input;
#[cfg(feature = "kindle")]
pub mod kindle;
pub mod llm;
pub mod postprocess;
pub mod retry;
pub mod source;
