use anyhow::{Context, Result};
use std::sync::Arc;

pub const CHUNK_SIZE: usize = 1000;

/// Converts raw PDF bytes into page texts, in page order.
pub trait TextExtractor: Send + Sync {
    fn extract_pages(&self, bytes: &[u8]) -> Result<Vec<String>>;
}

/// Extractor backed by the `pdf-extract` crate. The crate yields the whole
/// document as one string, so the result is a single "page".
pub struct PdfTextExtractor;

impl TextExtractor for PdfTextExtractor {
    fn extract_pages(&self, bytes: &[u8]) -> Result<Vec<String>> {
        let text = pdf_extract::extract_text_from_mem(bytes)
            .context("failed to extract text from PDF bytes")?;
        Ok(vec![text])
    }
}

#[derive(Clone)]
pub struct DocumentProcessor {
    extractor: Arc<dyn TextExtractor>,
    chunk_size: usize,
}

impl DocumentProcessor {
    pub fn new(extractor: Arc<dyn TextExtractor>) -> Self {
        Self {
            extractor,
            chunk_size: CHUNK_SIZE,
        }
    }

    /// Extracts and chunks an uploaded document. Extraction is CPU bound, so
    /// it runs on the blocking pool.
    pub async fn process_upload(&self, bytes: Vec<u8>) -> Result<Vec<String>> {
        let extractor = self.extractor.clone();
        let pages = tokio::task::spawn_blocking(move || extractor.extract_pages(&bytes))
            .await
            .context("text extraction task failed")??;

        let full_text = pages.join("\n");
        let chunks = create_chunks(&full_text, self.chunk_size);
        log::info!(
            "Extracted {} characters into {} chunks",
            full_text.chars().count(),
            chunks.len()
        );
        Ok(chunks)
    }
}

/// Splits `text` into consecutive pieces of at most `chunk_size` characters.
///
/// Concatenating the result gives back `text`. Empty input yields no chunks.
pub fn create_chunks(text: &str, chunk_size: usize) -> Vec<String> {
    let chunk_size = chunk_size.max(1);
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(chunk_size)
        .map(|piece| piece.iter().collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedExtractor(Vec<String>);

    impl TextExtractor for FixedExtractor {
        fn extract_pages(&self, _bytes: &[u8]) -> Result<Vec<String>> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn chunks_reconstruct_input() {
        let text = "lorem ipsum dolor sit amet ".repeat(150);
        let chunks = create_chunks(&text, CHUNK_SIZE);

        assert_eq!(chunks.concat(), text);
        assert!(chunks.iter().all(|c| c.chars().count() <= CHUNK_SIZE));
        let expected = text.chars().count().div_ceil(CHUNK_SIZE);
        assert_eq!(chunks.len(), expected);
    }

    #[test]
    fn empty_text_has_no_chunks() {
        assert!(create_chunks("", CHUNK_SIZE).is_empty());
    }

    #[test]
    fn exact_multiple_has_no_trailing_empty_chunk() {
        let text = "x".repeat(2000);
        let chunks = create_chunks(&text, CHUNK_SIZE);
        assert_eq!(chunks.len(), 2);
        assert!(chunks.iter().all(|c| !c.is_empty()));
    }

    #[test]
    fn chunks_count_characters_not_bytes() {
        let text = "é".repeat(1500);
        let chunks = create_chunks(&text, CHUNK_SIZE);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].chars().count(), 1000);
        assert_eq!(chunks[1].chars().count(), 500);
    }

    #[tokio::test]
    async fn upload_joins_pages_with_newline() {
        let processor = DocumentProcessor::new(Arc::new(FixedExtractor(vec![
            "first".to_string(),
            "second".to_string(),
        ])));

        let chunks = processor.process_upload(b"%PDF-".to_vec()).await.unwrap();
        assert_eq!(chunks, vec!["first\nsecond".to_string()]);
    }

    #[tokio::test]
    async fn unreadable_pdf_is_an_error() {
        let processor = DocumentProcessor::new(Arc::new(PdfTextExtractor));
        let result = processor.process_upload(b"definitely not a pdf".to_vec()).await;
        assert!(result.is_err());
    }
}
