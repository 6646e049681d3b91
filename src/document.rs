//! Resume text extraction
//!
//! Accepts PDF or plain UTF-8 text and returns text bounded to
//! `MAX_RESUME_CHARS` so prompts stay a predictable size.

use thiserror::Error;

pub const MAX_RESUME_CHARS: usize = 20_000;
const TRUNCATION_MARKER: &str = "\n[TRUNCATED]";
const PDF_MAGIC: &[u8] = b"%PDF";

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("document contains no text")]
    Empty,
    #[error("failed to extract PDF text: {0}")]
    Pdf(String),
    #[error("document is neither a PDF nor UTF-8 text")]
    Unsupported,
}

/// Extract resume text from uploaded bytes
///
/// PDF parsing is CPU-bound; call from a blocking context.
pub fn extract_text(bytes: &[u8]) -> Result<String, DocumentError> {
    let text = if bytes.starts_with(PDF_MAGIC) {
        // pdf-extract panics on some malformed files
        std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem(bytes))
            .map_err(|_| DocumentError::Pdf("malformed PDF".to_string()))?
            .map_err(|e| DocumentError::Pdf(e.to_string()))?
    } else {
        String::from_utf8(bytes.to_vec()).map_err(|_| DocumentError::Unsupported)?
    };

    let text = truncate(text.trim());
    if text.is_empty() {
        return Err(DocumentError::Empty);
    }
    Ok(text)
}

/// Cap `text` at `MAX_RESUME_CHARS` characters, marking the cut
pub fn truncate(text: &str) -> String {
    match text.char_indices().nth(MAX_RESUME_CHARS) {
        Some((cut, _)) => {
            let mut out = text.get(..cut).unwrap_or(text).to_string();
            out.push_str(TRUNCATION_MARKER);
            out
        }
        None => text.to_string(),
    }
}
